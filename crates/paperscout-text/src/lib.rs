//! paperscout-text: extractive summarization toolkit.
//!
//! Pure functions over text: cleaning, keyword extraction, sentence
//! splitting, sentence scoring and summarization. No network or file I/O;
//! the only process-wide state is the stopword and abbreviation tables
//! behind [`ensure_ready`].

pub mod clean;
pub mod error;
pub mod keywords;
pub mod resources;
pub mod sentences;
pub mod summarize;

pub use clean::{clean, word_count, words};
pub use error::TextError;
pub use keywords::{extract_keywords, extract_keywords_with};
pub use resources::{ensure_ready, TextResources};
pub use sentences::split_sentences;
pub use summarize::{
    fallback_summary, score_sentences, summarize, try_summarize, SentenceScore, Summarizer,
};

pub const DEFAULT_NUM_SENTENCES: usize = 3;
pub const DEFAULT_NUM_KEYWORDS: usize = 10;
pub const DEFAULT_MIN_WORD_LENGTH: usize = 3;
