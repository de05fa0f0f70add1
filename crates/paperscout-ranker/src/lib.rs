//! paperscout-ranker: query relevance scoring.
//! TF-IDF vectors over the query and the candidate abstracts, compared by
//! cosine similarity.

pub mod relevance;
pub mod tfidf;

pub use relevance::{rank, relevance_scores};
pub use tfidf::{cosine, RankError, SparseVector, TfidfModel};
