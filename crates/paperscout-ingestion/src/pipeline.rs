//! End-to-end query pipeline.
//!
//! Orchestrates the full flow for a single query:
//!   1. Search every configured source concurrently
//!   2. Merge the per-source results in source order
//!   3. Deduplicate by case-insensitive title
//!   4. Rank by TF-IDF similarity to the query
//!   5. Extract keywords and summarize the top K abstracts
//!
//! A failing source contributes nothing and is recorded in the report; it
//! never fails the run.

use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::future::join_all;
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use paperscout_common::{PaperRecord, Result, Source};
use paperscout_config::Config;
use paperscout_ranker::rank;
use paperscout_text::Summarizer;

use crate::dedup::dedup_by_title;
use crate::sources::arxiv::ArxivClient;
use crate::sources::pubmed::PubMedClient;
use crate::sources::LiteratureSource;

// ── Result summary ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct SourceOutcome {
    pub source: Source,
    pub retrieved: usize,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct QueryReport {
    pub query: String,
    pub papers: Vec<PaperRecord>,
    pub sources: Vec<SourceOutcome>,
    pub duplicates_removed: usize,
    pub timed_out: bool,
    pub duration_ms: u64,
}

impl QueryReport {
    /// True when there was at least one source and none of them answered.
    /// Distinguishes "everything failed" from "nothing matched".
    pub fn all_sources_failed(&self) -> bool {
        !self.sources.is_empty() && self.sources.iter().all(|s| s.error.is_some())
    }

    pub fn failed_sources(&self) -> usize {
        self.sources.iter().filter(|s| s.error.is_some()).count()
    }
}

// ── Pipeline orchestrator ─────────────────────────────────────────────────────

/// Closes every source session when dropped, unless disarmed. Covers the
/// caller dropping a `run_query_report` future mid-flight.
struct SessionGuard<'a> {
    sources: &'a [Arc<dyn LiteratureSource>],
    armed: bool,
}

impl Drop for SessionGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            debug!("Query abandoned, releasing source sessions");
            for source in self.sources {
                source.close();
            }
        }
    }
}

pub struct Pipeline {
    sources: Vec<Arc<dyn LiteratureSource>>,
    summarizer: Summarizer,
    summarize_top_k: usize,
    query_timeout: Option<Duration>,
}

impl Pipeline {
    pub fn new(sources: Vec<Arc<dyn LiteratureSource>>) -> Self {
        Self {
            sources,
            summarizer: Summarizer::default(),
            summarize_top_k: 5,
            query_timeout: None,
        }
    }

    /// Build the arXiv and PubMed clients enabled in `config`, in that
    /// order.
    pub fn from_config(config: &Config) -> Result<Self> {
        let mut sources: Vec<Arc<dyn LiteratureSource>> = Vec::new();
        if config.sources.arxiv.enabled {
            sources.push(Arc::new(ArxivClient::from_config(&config.sources.arxiv)?));
        }
        if config.sources.pubmed.enabled {
            sources.push(Arc::new(PubMedClient::from_config(&config.sources.pubmed)?));
        }
        if sources.is_empty() {
            warn!("No literature sources enabled; every query will come back empty");
        }

        let text = &config.text;
        Ok(Self::new(sources)
            .with_summarizer(Summarizer::new(text.num_sentences, text.num_keywords, text.min_word_length))
            .with_summarize_top_k(config.pipeline.summarize_top_k)
            .with_query_timeout(config.pipeline.query_timeout()))
    }

    pub fn with_summarizer(mut self, summarizer: Summarizer) -> Self {
        self.summarizer = summarizer;
        self
    }

    pub fn with_summarize_top_k(mut self, k: usize) -> Self {
        self.summarize_top_k = k;
        self
    }

    pub fn with_query_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.query_timeout = timeout;
        self
    }

    pub fn sources(&self) -> impl Iterator<Item = Source> + '_ {
        self.sources.iter().map(|s| s.source())
    }

    /// Ranked, partially summarized papers for `query`.
    pub async fn run_query(&self, query: &str, max_results_per_source: usize) -> Vec<PaperRecord> {
        self.run_query_report(query, max_results_per_source).await.papers
    }

    /// Like [`Pipeline::run_query`], with per-source outcomes and timing.
    #[instrument(skip(self))]
    pub async fn run_query_report(&self, query: &str, max_results_per_source: usize) -> QueryReport {
        let t0 = Instant::now();
        info!(sources = self.sources.len(), "Starting query");

        let mut guard = SessionGuard { sources: &self.sources, armed: true };

        let fan_out = join_all(self.sources.iter().map(|source| async move {
            (source.source(), source.search(query, max_results_per_source).await)
        }));

        let results = match self.query_timeout {
            None => fan_out.await,
            Some(limit) => match tokio::time::timeout(limit, fan_out).await {
                Ok(results) => results,
                Err(_) => {
                    warn!(timeout_secs = limit.as_secs(), "Query timed out, abandoning sources");
                    drop(guard);
                    return QueryReport {
                        query: query.to_string(),
                        papers: Vec::new(),
                        sources: self
                            .sources
                            .iter()
                            .map(|s| SourceOutcome {
                                source: s.source(),
                                retrieved: 0,
                                error: Some(format!("timed out after {}s", limit.as_secs())),
                            })
                            .collect(),
                        duplicates_removed: 0,
                        timed_out: true,
                        duration_ms: t0.elapsed().as_millis() as u64,
                    };
                }
            },
        };
        guard.armed = false;

        // ── 1. Merge in source order ─────────────────────────────────────────
        let mut merged = Vec::new();
        let mut outcomes = Vec::with_capacity(results.len());
        for (source, result) in results {
            match result {
                Ok(papers) => {
                    info!(source = %source, n = papers.len(), "Papers retrieved");
                    outcomes.push(SourceOutcome { source, retrieved: papers.len(), error: None });
                    merged.extend(papers);
                }
                Err(e) => {
                    warn!(source = %source, error = %e, "Source failed, continuing without it");
                    outcomes.push(SourceOutcome { source, retrieved: 0, error: Some(e.to_string()) });
                }
            }
        }
        let found = merged.len();

        // ── 2. Dedup, rank, summarize ────────────────────────────────────────
        let deduped = dedup_by_title(merged);
        let mut papers = rank(deduped.papers, query);
        self.annotate_top(&mut papers);

        let report = QueryReport {
            query: query.to_string(),
            papers,
            sources: outcomes,
            duplicates_removed: deduped.duplicates_removed,
            timed_out: false,
            duration_ms: t0.elapsed().as_millis() as u64,
        };
        info!(
            found,
            unique = report.papers.len(),
            duplicates = report.duplicates_removed,
            failed_sources = report.failed_sources(),
            duration_ms = report.duration_ms,
            "Query complete"
        );
        if report.all_sources_failed() {
            warn!("Every source failed; the empty result is not a 'no matches' answer");
        }
        report
    }

    /// Keywords and summary for each of the first `summarize_top_k` papers.
    /// Papers without an abstract are left bare.
    fn annotate_top(&self, papers: &mut [PaperRecord]) {
        for paper in papers.iter_mut().take(self.summarize_top_k) {
            if paper.abstract_text().trim().is_empty() {
                continue;
            }
            let keywords = self.summarizer.keywords(paper.abstract_text());
            let summary = self.summarizer.summarize(paper.abstract_text());
            paper.set_keywords(keywords);
            paper.set_summary(summary);
        }
    }

    /// Close every source session. Safe to call repeatedly.
    pub fn shutdown(&self) {
        for source in &self.sources {
            source.close();
        }
        debug!("Pipeline sessions closed");
    }
}
