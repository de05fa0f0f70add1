//! The normalised paper record shared by adapters, ranker and summarizer.

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

/// Placeholder author used when a source lists nobody.
pub const UNKNOWN_AUTHOR: &str = "Unknown Author";

/// Provenance of a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    Arxiv,
    PubMed,
}

impl Source {
    pub fn as_str(&self) -> &'static str {
        match self {
            Source::Arxiv  => "arxiv",
            Source::PubMed => "pubmed",
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum RecordError {
    #[error("title is empty")]
    EmptyTitle,

    #[error("invalid url {url:?}: {reason}")]
    InvalidUrl { url: String, reason: String },
}

/// Raw fields an adapter has pulled out of one result item.
#[derive(Debug, Clone, Default)]
pub struct PaperDraft {
    pub title: String,
    pub authors: Vec<String>,
    pub abstract_text: String,
    pub url: String,
    pub published: NaiveDate,
    pub doi: Option<String>,
}

/// One paper, normalised across sources.
///
/// `source` is fixed at construction. `relevance_score`, `keywords` and
/// `summary` start empty and are filled in by the ranker and summarizer.
/// Field order is the serialised artifact order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaperRecord {
    title: String,
    authors: Vec<String>,
    #[serde(rename = "abstract")]
    abstract_text: String,
    url: String,
    published: NaiveDate,
    source: Source,
    doi: Option<String>,
    keywords: Option<Vec<String>>,
    summary: Option<String>,
    relevance_score: Option<f64>,
}

impl PaperRecord {
    pub fn new(source: Source, draft: PaperDraft) -> Result<Self, RecordError> {
        let title = normalize_whitespace(&draft.title);
        if title.is_empty() {
            return Err(RecordError::EmptyTitle);
        }

        let url = draft.url.trim().to_string();
        match Url::parse(&url) {
            Ok(parsed) if parsed.has_host() => {}
            Ok(_) => {
                return Err(RecordError::InvalidUrl { url, reason: "missing host".into() });
            }
            Err(e) => {
                return Err(RecordError::InvalidUrl { url, reason: e.to_string() });
            }
        }

        let mut authors: Vec<String> = draft.authors
            .iter()
            .map(|a| normalize_whitespace(a))
            .filter(|a| !a.is_empty())
            .collect();
        if authors.is_empty() {
            authors.push(UNKNOWN_AUTHOR.to_string());
        }

        Ok(Self {
            title,
            authors,
            abstract_text: normalize_whitespace(&draft.abstract_text),
            url,
            published: draft.published,
            source,
            doi: draft.doi.map(|d| d.trim().to_string()).filter(|d| !d.is_empty()),
            keywords: None,
            summary: None,
            relevance_score: None,
        })
    }

    pub fn title(&self) -> &str { &self.title }
    pub fn authors(&self) -> &[String] { &self.authors }
    pub fn abstract_text(&self) -> &str { &self.abstract_text }
    pub fn url(&self) -> &str { &self.url }
    pub fn published(&self) -> NaiveDate { self.published }
    pub fn source(&self) -> Source { self.source }
    pub fn doi(&self) -> Option<&str> { self.doi.as_deref() }
    pub fn keywords(&self) -> Option<&[String]> { self.keywords.as_deref() }
    pub fn summary(&self) -> Option<&str> { self.summary.as_deref() }
    pub fn relevance_score(&self) -> Option<f64> { self.relevance_score }

    /// Record the ranker's score. Values are clamped to [0, 1]; anything
    /// non-finite is stored as 0.
    pub fn set_relevance_score(&mut self, score: f64) {
        self.relevance_score = Some(if score.is_finite() { score.clamp(0.0, 1.0) } else { 0.0 });
    }

    pub fn set_summary(&mut self, summary: String) {
        self.summary = Some(summary);
    }

    pub fn set_keywords(&mut self, keywords: Vec<String>) {
        self.keywords = Some(keywords);
    }

    /// Case-insensitive title key used for deduplication.
    pub fn title_key(&self) -> String {
        self.title.to_lowercase()
    }
}

/// Collapse every whitespace run to one space and trim the ends.
pub fn normalize_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}
