//! paperscout-ingestion: literature retrieval and aggregation.
//!
//! Source adapters for arXiv and PubMed, title deduplication, and the
//! pipeline that fans a query out to every adapter, merges, ranks and
//! summarizes the results.

pub mod dedup;
pub mod pipeline;
pub mod sources;

pub use dedup::{dedup_by_title, Deduplicated};
pub use pipeline::{Pipeline, QueryReport, SourceOutcome};
pub use sources::arxiv::ArxivClient;
pub use sources::pubmed::PubMedClient;
pub use sources::{LiteratureSource, ParsedBatch, SearchLimits, Skip, SkipReason};
