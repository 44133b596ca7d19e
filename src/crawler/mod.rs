//! Crawler module for the dictionary site
//!
//! This module contains the network-facing logic, including:
//! - Entry page fetching with proxy transports and retry
//! - HTML parsing of entry and alphabet index pages
//! - Batch scheduling of enrichment work
//! - The alphabet index harvest and the site login

pub mod fetcher;
pub mod harvester;
pub mod headers;
pub mod parser;
pub mod retry;
pub mod scheduler;
pub mod session;

pub use fetcher::{build_http_client, entry_url, EntryFetcher, EntryLookup};
pub use harvester::{index_url, HarvestSummary, Harvester, LetterReport};
pub use headers::HeaderPool;
pub use parser::{
    classify_entry_page, parse_entries, parse_index_page, Entry, EntryPage, IndexPage, Sense,
};
pub use retry::{RetryFailure, RetryPolicy};
pub use scheduler::{BatchScheduler, EnrichSummary};
pub use session::Session;

use crate::storage::EnrichedRecord;

/// Flattens the entries found for `queried_word` into one row per sense
pub fn enriched_records(queried_word: &str, entries: &[Entry]) -> Vec<EnrichedRecord> {
    entries
        .iter()
        .flat_map(|entry| {
            entry.senses.iter().map(move |sense| EnrichedRecord {
                queried_word: queried_word.to_string(),
                lemma: entry.lemma.clone(),
                word_class: sense.word_class.clone(),
                gloss: sense.gloss.clone(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enriched_records_one_row_per_sense() {
        let entries = vec![
            Entry {
                lemma: "rumah".to_string(),
                senses: vec![
                    Sense {
                        word_class: "n[nomina]".to_string(),
                        gloss: "bangunan untuk tempat tinggal".to_string(),
                    },
                    Sense {
                        word_class: "v[verba]".to_string(),
                        gloss: "berumah".to_string(),
                    },
                ],
            },
            Entry {
                lemma: "rumah-rumah".to_string(),
                senses: vec![Sense {
                    word_class: "n[nomina]".to_string(),
                    gloss: "tiruan rumah".to_string(),
                }],
            },
        ];

        let records = enriched_records("rumah", &entries);
        assert_eq!(records.len(), 3);
        assert!(records.iter().all(|r| r.queried_word == "rumah"));
        assert_eq!(records[1].word_class, "v[verba]");
        assert_eq!(records[2].lemma, "rumah-rumah");
    }
}
