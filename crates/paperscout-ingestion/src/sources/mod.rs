//! Literature source clients.

pub mod arxiv;
pub mod pubmed;

use std::fmt;

use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, warn};

use paperscout_common::{PaperRecord, PaperscoutError, RecordError, Result, Source};
use paperscout_config::SourceConfig;

/// Common interface for all literature source clients.
#[async_trait]
pub trait LiteratureSource: Send + Sync {
    fn source(&self) -> Source;

    /// Search for papers matching `query`, returning at most `max_results`
    /// records. Items the source returns malformed are dropped, not errors.
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<PaperRecord>>;

    /// Release the client's network session. Idempotent; a later `search`
    /// opens a new one.
    fn close(&self);
}

// ── Fetch sizing ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct SearchLimits {
    /// Upper bound on any single request.
    pub ceiling: usize,
    pub oversample_factor: usize,
    pub min_abstract_tokens: usize,
}

impl Default for SearchLimits {
    fn default() -> Self {
        Self::from_config(&SourceConfig::default())
    }
}

impl SearchLimits {
    pub fn from_config(cfg: &SourceConfig) -> Self {
        Self {
            ceiling: cfg.max_results,
            oversample_factor: cfg.oversample_factor.max(1),
            min_abstract_tokens: cfg.min_abstract_tokens,
        }
    }

    /// Number of results a caller can actually get back.
    pub fn requested(&self, max_results: usize) -> usize {
        max_results.min(self.ceiling)
    }

    /// Number of raw items to ask the upstream for.
    pub fn fetch_count(&self, max_results: usize) -> usize {
        self.requested(max_results)
            .saturating_mul(self.oversample_factor)
            .min(self.ceiling)
    }
}

pub(crate) fn validate_query(query: &str) -> Result<&str> {
    let trimmed = query.trim();
    if trimmed.is_empty() {
        return Err(PaperscoutError::InvalidInput("query must not be empty".into()));
    }
    Ok(trimmed)
}

// ── Per-item parse outcomes ─────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SkipReason {
    MissingField,
    MalformedDate,
    InvalidRecord,
    /// The upstream reported an error in place of a result item.
    ApiError,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SkipReason::MissingField  => "missing field",
            SkipReason::MalformedDate => "malformed date",
            SkipReason::InvalidRecord => "invalid record",
            SkipReason::ApiError      => "api error",
        };
        f.write_str(s)
    }
}

/// Why one raw result item did not become a record.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{reason}: {detail}")]
pub struct Skip {
    pub reason: SkipReason,
    pub detail: String,
}

impl Skip {
    pub fn new(reason: SkipReason, detail: impl Into<String>) -> Self {
        Self { reason, detail: detail.into() }
    }

    pub fn missing(field: &str) -> Self {
        Self::new(SkipReason::MissingField, field)
    }
}

impl From<RecordError> for Skip {
    fn from(e: RecordError) -> Self {
        Self::new(SkipReason::InvalidRecord, e.to_string())
    }
}

/// Everything one upstream response yielded.
#[derive(Debug, Default)]
pub struct ParsedBatch {
    pub records: Vec<PaperRecord>,
    pub skipped: Vec<Skip>,
}

impl ParsedBatch {
    pub fn push(&mut self, item: std::result::Result<PaperRecord, Skip>) {
        match item {
            Ok(record) => self.records.push(record),
            Err(skip) => self.skipped.push(skip),
        }
    }
}

impl FromIterator<std::result::Result<PaperRecord, Skip>> for ParsedBatch {
    fn from_iter<I: IntoIterator<Item = std::result::Result<PaperRecord, Skip>>>(iter: I) -> Self {
        let mut batch = ParsedBatch::default();
        for item in iter {
            batch.push(item);
        }
        batch
    }
}

fn matches_query(paper: &PaperRecord, query_lower: &str) -> bool {
    paper.title().to_lowercase().contains(query_lower)
        || paper.abstract_text().to_lowercase().contains(query_lower)
}

/// Post-parse step shared by every source: report skips, drop thin
/// abstracts, put literal query matches first, trim to `max_results`.
pub(crate) fn finish_batch(
    source: Source,
    batch: ParsedBatch,
    query: &str,
    limits: &SearchLimits,
    max_results: usize,
) -> Vec<PaperRecord> {
    let ParsedBatch { records, skipped } = batch;

    if !skipped.is_empty() {
        warn!(source = %source, skipped = skipped.len(), "Dropped malformed result items");
        for skip in &skipped {
            debug!(source = %source, %skip, "Skipped item");
        }
    }

    let parsed = records.len();
    let mut papers: Vec<PaperRecord> = records
        .into_iter()
        .filter(|p| paperscout_text::words(p.abstract_text()).len() >= limits.min_abstract_tokens)
        .collect();
    let thin = parsed - papers.len();
    if thin > 0 {
        debug!(source = %source, dropped = thin, min_tokens = limits.min_abstract_tokens,
               "Dropped records with short abstracts");
    }

    let query_lower = query.to_lowercase();
    papers.sort_by_key(|p| !matches_query(p, &query_lower));
    papers.truncate(limits.requested(max_results));
    papers
}

#[cfg(test)]
mod tests {
    use super::*;
    use paperscout_test_utils::paper;
    use pretty_assertions::assert_eq;

    const LONG: &str = "This abstract easily has more than ten word tokens in it, so it stays.";

    fn limits() -> SearchLimits {
        SearchLimits { ceiling: 100, oversample_factor: 2, min_abstract_tokens: 10 }
    }

    #[test]
    fn test_fetch_count_oversamples_within_ceiling() {
        let l = limits();
        assert_eq!(l.fetch_count(5), 10);
        assert_eq!(l.fetch_count(80), 100);
        assert_eq!(l.fetch_count(500), 100);
        assert_eq!(l.requested(500), 100);
    }

    #[test]
    fn test_blank_query_rejected() {
        assert!(matches!(validate_query("   "), Err(PaperscoutError::InvalidInput(_))));
        assert_eq!(validate_query(" gnn ").unwrap(), "gnn");
    }

    #[test]
    fn test_batch_collects_skips() {
        let batch: ParsedBatch = vec![
            Ok(paper("A", LONG)),
            Err(Skip::missing("title")),
            Err(Skip::from(RecordError::EmptyTitle)),
        ]
        .into_iter()
        .collect();
        assert_eq!(batch.records.len(), 1);
        assert_eq!(batch.skipped.len(), 2);
        assert_eq!(batch.skipped[1].reason, SkipReason::InvalidRecord);
    }

    #[test]
    fn test_finish_batch_filters_sorts_and_truncates() {
        let batch = ParsedBatch {
            records: vec![
                paper("Unrelated first", LONG),
                paper("Too short", "Only five words in here."),
                paper("All about Graph Neural Networks", LONG),
                paper("Another unrelated", LONG),
                paper("Third", "We study graph neural networks for chemistry and for physics today."),
            ],
            skipped: vec![],
        };
        let out = finish_batch(Source::Arxiv, batch, "graph neural networks", &limits(), 3);
        let titles: Vec<&str> = out.iter().map(|p| p.title()).collect();
        assert_eq!(titles, vec!["All about Graph Neural Networks", "Third", "Unrelated first"]);
    }

    #[test]
    fn test_min_abstract_tokens_is_configurable() {
        let batch = ParsedBatch { records: vec![paper("Short", "Two words.")], skipped: vec![] };
        let relaxed = SearchLimits { min_abstract_tokens: 0, ..limits() };
        assert_eq!(finish_batch(Source::PubMed, batch, "x", &relaxed, 5).len(), 1);
    }
}
