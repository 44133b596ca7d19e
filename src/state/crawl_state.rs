//! Per-letter state machine of the alphabet index crawl

use std::fmt;

/// Where a single letter's crawl currently stands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CrawlState {
    /// About to fetch (or fetching) this index page
    FetchingPage { page: u32 },

    /// The page was stored and a next page exists; checkpoint before moving on
    AdvancingPage { next: u32 },

    /// Last page reached
    Done,

    /// A page fetch failed; progress was checkpointed at `page`
    Failed { page: u32 },
}

impl CrawlState {
    /// Initial state for a letter resuming at `page`
    pub fn start(page: u32) -> Self {
        Self::FetchingPage { page: page.max(1) }
    }

    /// Decides what follows a successfully extracted page
    ///
    /// The letter is done when there is no "next" link, or when the page
    /// indicator says the current page is the last one.
    pub fn after_page(page: u32, has_next: bool, position: Option<(u32, u32)>) -> Self {
        if !has_next {
            return Self::Done;
        }
        match position {
            Some((current, total)) if total > 0 && current >= total => Self::Done,
            _ => Self::AdvancingPage { next: page + 1 },
        }
    }

    /// Moves an advancing letter on to fetching its next page
    pub fn advance(self) -> Self {
        match self {
            Self::AdvancingPage { next } => Self::FetchingPage { page: next },
            other => other,
        }
    }

    /// Returns true once the letter needs no further work in this run
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Failed { .. })
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::FetchingPage { .. } => "fetching_page",
            Self::AdvancingPage { .. } => "advancing_page",
            Self::Done => "done",
            Self::Failed { .. } => "failed",
        }
    }
}

impl fmt::Display for CrawlState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FetchingPage { page } => write!(f, "{} (page {})", self.name(), page),
            Self::AdvancingPage { next } => write!(f, "{} (next {})", self.name(), next),
            Self::Done => write!(f, "{}", self.name()),
            Self::Failed { page } => write!(f, "{} (page {})", self.name(), page),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_start_clamps_to_first_page() {
        assert_eq!(CrawlState::start(0), CrawlState::FetchingPage { page: 1 });
        assert_eq!(CrawlState::start(4), CrawlState::FetchingPage { page: 4 });
    }

    #[test]
    fn test_after_page_with_next_link() {
        assert_eq!(
            CrawlState::after_page(2, true, Some((2, 5))),
            CrawlState::AdvancingPage { next: 3 }
        );
        assert_eq!(
            CrawlState::after_page(2, true, None),
            CrawlState::AdvancingPage { next: 3 }
        );
    }

    #[test]
    fn test_after_page_terminates() {
        assert_eq!(CrawlState::after_page(5, false, Some((5, 5))), CrawlState::Done);
        assert_eq!(CrawlState::after_page(3, false, None), CrawlState::Done);
        // a stray next link on the last page does not keep the crawl going
        assert_eq!(CrawlState::after_page(5, true, Some((5, 5))), CrawlState::Done);
    }

    #[test]
    fn test_advance() {
        let state = CrawlState::AdvancingPage { next: 7 }.advance();
        assert_eq!(state, CrawlState::FetchingPage { page: 7 });
        assert_eq!(CrawlState::Done.advance(), CrawlState::Done);
    }

    #[test]
    fn test_is_terminal() {
        assert!(CrawlState::Done.is_terminal());
        assert!(CrawlState::Failed { page: 3 }.is_terminal());
        assert!(!CrawlState::FetchingPage { page: 1 }.is_terminal());
        assert!(!CrawlState::AdvancingPage { next: 2 }.is_terminal());
    }

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", CrawlState::Done), "done");
        assert_eq!(
            format!("{}", CrawlState::Failed { page: 4 }),
            "failed (page 4)"
        );
    }
}
