//! HTML parser for dictionary pages
//!
//! Pure functions from fetched markup to domain records:
//! - entry pages (`/entri/<word>`) into `Entry` values with their senses
//! - alphabet index pages into headwords and pagination info
//!
//! All site-specific selectors live in this module.

use scraper::node::Node;
use scraper::{ElementRef, Html, Selector};

/// Word class label used for uninflected (prakategorial) entries
pub const PRAKATEGORIAL_CLASS: &str = "prakategorial[kata tidak dipakai dalam bentuk dasarnya]";

const QUOTA_MARKER: &str = "Batas Sehari";
const NOT_FOUND_MARKER: &str = "tidak ditemukan";
const MESSAGE_MARKER: &str = "Pesan";
const PRAKATEGORIAL_MARKER: &str = "prakategorial";
const NEXT_PAGE_TITLE: &str = "Ke halaman berikutnya";

/// One meaning of an entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sense {
    /// Inline class tags, each rendered as `text[title]`
    pub word_class: String,
    pub gloss: String,
}

/// A headword returned for a query, with its senses in page order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub lemma: String,
    pub senses: Vec<Sense>,
}

/// How an entry page should be treated
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryPage {
    /// The site served its daily-limit page
    QuotaExceeded,
    /// The site explicitly reported that the phrase was not found
    NotFound,
    /// Parsed entries; may be empty when the expected structure is absent
    Entries(Vec<Entry>),
}

/// Headwords and pagination of one alphabet index page
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndexPage {
    pub words: Vec<String>,
    /// Page indicator, `(current, total)`
    pub position: Option<(u32, u32)>,
    pub has_next: bool,
}

/// Classifies an entry page and parses it when it holds entries
///
/// Both markers are only looked for in the content region, between the
/// search form and the message block. The daily-limit marker is checked
/// first; such a page is never parsed.
pub fn classify_entry_page(body: &str) -> EntryPage {
    let document = Html::parse_document(body);
    let content = content_region(&document)
        .map(content_elements)
        .unwrap_or_default();

    if has_marker(&content, "h1", QUOTA_MARKER) {
        return EntryPage::QuotaExceeded;
    }
    if has_marker(&content, "h4", NOT_FOUND_MARKER) {
        return EntryPage::NotFound;
    }

    EntryPage::Entries(parse_entries(&document))
}

/// Returns true if `body` is the site's daily-limit page
///
/// The limit page can replace any page of the site, index pages included.
pub fn is_quota_page(body: &str) -> bool {
    contains_marker(&Html::parse_document(body), "h1", QUOTA_MARKER)
}

/// Extracts every entry from the main content region of `document`
///
/// Entries without any sense are left out.
pub fn parse_entries(document: &Html) -> Vec<Entry> {
    let Some(region) = content_region(document) else {
        return Vec::new();
    };

    content_elements(region)
        .into_iter()
        .filter(|el| el.value().name() == "h2")
        .filter_map(|heading| {
            let entry = parse_entry(heading);
            if entry.senses.is_empty() {
                tracing::debug!("Heading '{}' has no senses, skipping", entry.lemma);
                None
            } else {
                Some(entry)
            }
        })
        .collect()
}

/// Parses an alphabet index page
pub fn parse_index_page(body: &str) -> IndexPage {
    let document = Html::parse_document(body);

    let words = match Selector::parse(".row .col-md-3 a") {
        Ok(selector) => document
            .select(&selector)
            .map(|link| text_without(link, &["sup"]))
            .filter(|word| !word.is_empty())
            .collect(),
        Err(_) => Vec::new(),
    };

    let position = Selector::parse("#currentPageId").ok().and_then(|selector| {
        document
            .select(&selector)
            .next()
            .and_then(|indicator| parse_page_indicator(&indicator.text().collect::<String>()))
    });

    let next_selector = format!("a[title='{}']", NEXT_PAGE_TITLE);
    let has_next = Selector::parse(&next_selector)
        .map(|selector| {
            document
                .select(&selector)
                .any(|link| link.value().attr("href").is_some_and(|h| !h.trim().is_empty()))
        })
        .unwrap_or(false);

    IndexPage {
        words,
        position,
        has_next,
    }
}

/// Parses "current / total"
fn parse_page_indicator(text: &str) -> Option<(u32, u32)> {
    let (current, total) = text.split_once('/')?;
    let current = current.trim().parse().ok()?;
    let total = total.trim().parse().ok()?;
    Some((current, total))
}

fn contains_marker(document: &Html, tag: &str, marker: &str) -> bool {
    let Ok(selector) = Selector::parse(tag) else {
        return false;
    };
    document
        .select(&selector)
        .any(|el| el.text().collect::<String>().contains(marker))
}

/// `.body-content`, or the whole body when the page has no such block
fn content_region(document: &Html) -> Option<ElementRef<'_>> {
    [".body-content", "body"]
        .iter()
        .filter_map(|s| Selector::parse(s).ok())
        .find_map(|selector| document.select(&selector).next())
}

fn has_marker(elements: &[ElementRef<'_>], tag: &str, marker: &str) -> bool {
    elements
        .iter()
        .any(|el| el.value().name() == tag && el.text().collect::<String>().contains(marker))
}

/// Elements between the search form and the message block
///
/// Page chrome and the search form itself are left out. Without a search
/// form the walk starts at the top of `region`.
fn content_elements(region: ElementRef<'_>) -> Vec<ElementRef<'_>> {
    let has_search_form = Selector::parse("form#searchForm")
        .map(|selector| region.select(&selector).next().is_some())
        .unwrap_or(false);

    let mut started = !has_search_form;
    let mut found = Vec::new();

    for element in region.descendants().filter_map(ElementRef::wrap) {
        let name = element.value().name();

        if name == "form" && element.value().id() == Some("searchForm") {
            started = true;
            continue;
        }
        if name == "h4" && element.text().collect::<String>().contains(MESSAGE_MARKER) {
            break;
        }
        if started && !inside_excluded_block(element) {
            found.push(element);
        }
    }

    found
}

fn inside_excluded_block(element: ElementRef<'_>) -> bool {
    element.ancestors().filter_map(ElementRef::wrap).any(|ancestor| {
        let value = ancestor.value();
        matches!(value.name(), "header" | "nav" | "footer")
            || (value.name() == "form" && value.id() == Some("searchForm"))
    })
}

fn parse_entry(heading: ElementRef<'_>) -> Entry {
    let lemma = text_without(heading, &["sup", "small", "span.rootword"]);

    if let Some(spelling) = non_standard_spelling(heading) {
        tracing::debug!("'{}' has non-standard spelling '{}'", lemma, spelling);
    }

    let section = section_after(heading);

    let mut senses: Vec<Sense> = section
        .iter()
        .filter(|el| matches!(el.value().name(), "ul" | "ol"))
        .flat_map(|list| list_senses(*list))
        .collect();

    if senses.is_empty() {
        senses.extend(
            std::iter::once(heading)
                .chain(section.iter().copied())
                .find_map(prakategorial_sense),
        );
    }

    Entry { lemma, senses }
}

/// Element siblings after `heading`, up to the next heading or the message block
fn section_after(heading: ElementRef<'_>) -> Vec<ElementRef<'_>> {
    heading
        .next_siblings()
        .filter_map(ElementRef::wrap)
        .take_while(|el| match el.value().name() {
            "h2" => false,
            "h4" => !el.text().collect::<String>().contains(MESSAGE_MARKER),
            _ => true,
        })
        .collect()
}

fn list_senses(list: ElementRef<'_>) -> Vec<Sense> {
    let Ok(li) = Selector::parse("li") else {
        return Vec::new();
    };
    list.select(&li).map(item_sense).collect()
}

fn item_sense(item: ElementRef<'_>) -> Sense {
    let word_class = Selector::parse("span")
        .map(|span| {
            item.select(&span)
                .map(|tag| {
                    format!(
                        "{}[{}]",
                        collapse_whitespace(&tag.text().collect::<String>()),
                        tag.value().attr("title").unwrap_or_default()
                    )
                })
                .collect::<Vec<_>>()
                .join(" ")
        })
        .unwrap_or_default();

    if word_class.is_empty() && has_prakategorial_marker(item) {
        if let Some(sense) = prakategorial_sense(item) {
            return sense;
        }
    }

    Sense {
        word_class,
        gloss: text_without(item, &["span"]),
    }
}

fn has_prakategorial_marker(element: ElementRef<'_>) -> bool {
    element
        .descendants()
        .filter_map(ElementRef::wrap)
        .any(|el| {
            el.value().name() == "i"
                && el.text().collect::<String>().contains(PRAKATEGORIAL_MARKER)
        })
}

/// Synthesizes the single sense of an uninflected entry, when `element` carries the marker
fn prakategorial_sense(element: ElementRef<'_>) -> Option<Sense> {
    if !has_prakategorial_marker(element) {
        return None;
    }

    let mut example = strip_leading_colon(&text_without(element, &["i", "sup", "small"]));
    if example.is_empty() {
        example = Selector::parse("a")
            .map(|a| {
                element
                    .select(&a)
                    .map(|link| collapse_whitespace(&link.text().collect::<String>()))
                    .filter(|t| !t.is_empty())
                    .collect::<Vec<_>>()
                    .join(", ")
            })
            .unwrap_or_default();
    }

    Some(Sense {
        word_class: PRAKATEGORIAL_CLASS.to_string(),
        gloss: example,
    })
}

/// The form after ':' in the heading's `<small>` annotation
fn non_standard_spelling(heading: ElementRef<'_>) -> Option<String> {
    let selector = Selector::parse("small").ok()?;
    let small = heading.select(&selector).next()?;
    let text = text_without(small, &["sup"]);
    let (_, spelling) = text.split_once(':')?;
    let spelling = spelling.trim();
    (!spelling.is_empty()).then(|| spelling.to_string())
}

/// Text of `element`, skipping every subtree that matches one of `excluded`
///
/// Whitespace runs, newlines included, are collapsed to single spaces.
fn text_without(element: ElementRef<'_>, excluded: &[&str]) -> String {
    let selectors: Vec<Selector> = excluded
        .iter()
        .filter_map(|s| Selector::parse(s).ok())
        .collect();

    let mut out = String::new();
    collect_text(element, &selectors, &mut out);
    collapse_whitespace(&out)
}

fn collect_text(element: ElementRef<'_>, excluded: &[Selector], out: &mut String) {
    for child in element.children() {
        if let Node::Text(text) = child.value() {
            out.push_str(text);
        } else if let Some(child) = ElementRef::wrap(child) {
            if !excluded.iter().any(|selector| selector.matches(&child)) {
                collect_text(child, excluded, out);
            }
        }
    }
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn strip_leading_colon(text: &str) -> String {
    text.trim_start_matches(|c: char| c == ':' || c.is_whitespace())
        .trim()
        .to_string()
}
