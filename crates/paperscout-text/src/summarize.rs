//! Extractive summarization: keyword, position and length scoring over the
//! sentences of a text.

use std::cmp::Ordering;
use std::collections::HashSet;

use tracing::warn;

use crate::clean::{word_count, words};
use crate::error::TextError;
use crate::keywords::extract_keywords_with;
use crate::sentences::split_sentences;
use crate::{DEFAULT_MIN_WORD_LENGTH, DEFAULT_NUM_KEYWORDS, DEFAULT_NUM_SENTENCES};

const KEYWORD_WEIGHT: f64 = 0.5;
const POSITION_WEIGHT: f64 = 0.3;
const LENGTH_WEIGHT: f64 = 0.2;

/// Sentence length (in words) that gets the full length score.
const IDEAL_SENTENCE_WORDS: usize = 15;

/// Characters kept by the fallback summary.
const FALLBACK_CHARS: usize = 500;

#[derive(Debug, Clone, PartialEq)]
pub struct SentenceScore<'a> {
    /// 0-based position in the source text.
    pub index: usize,
    pub text: &'a str,
    pub score: f64,
}

/// Score each sentence as
/// `0.5 * keyword hits + 0.3 / (index + 1) + 0.2 / (|words - 15| + 1)`.
///
/// Results are in input order. Identical sentences at different positions
/// score separately.
pub fn score_sentences<'a, S: AsRef<str>>(sentences: &'a [S], keywords: &[String]) -> Vec<SentenceScore<'a>> {
    let keywords: HashSet<&str> = keywords.iter().map(String::as_str).collect();

    sentences
        .iter()
        .enumerate()
        .map(|(index, sentence)| {
            let text = sentence.as_ref();
            let hits = words(text).iter().filter(|w| keywords.contains(w.as_str())).count();
            let position = 1.0 / (index as f64 + 1.0);
            let length = 1.0 / (word_count(text).abs_diff(IDEAL_SENTENCE_WORDS) as f64 + 1.0);
            SentenceScore {
                index,
                text,
                score: KEYWORD_WEIGHT * hits as f64 + POSITION_WEIGHT * position + LENGTH_WEIGHT * length,
            }
        })
        .collect()
}

/// Summarization settings.
#[derive(Debug, Clone, PartialEq)]
pub struct Summarizer {
    pub num_sentences: usize,
    pub num_keywords: usize,
    pub min_word_length: usize,
}

impl Default for Summarizer {
    fn default() -> Self {
        Self {
            num_sentences: DEFAULT_NUM_SENTENCES,
            num_keywords: DEFAULT_NUM_KEYWORDS,
            min_word_length: DEFAULT_MIN_WORD_LENGTH,
        }
    }
}

impl Summarizer {
    pub fn new(num_sentences: usize, num_keywords: usize, min_word_length: usize) -> Self {
        Self { num_sentences, num_keywords, min_word_length }
    }

    pub fn keywords(&self, text: &str) -> Vec<String> {
        extract_keywords_with(text, self.num_keywords, self.min_word_length)
    }

    /// Pick the best `num_sentences` sentences and return them in their
    /// original order, joined by single spaces. Text with no more sentences
    /// than that is returned unchanged.
    pub fn try_summarize(&self, text: &str) -> Result<String, TextError> {
        let sentences = split_sentences(text);
        if sentences.len() <= self.num_sentences {
            return Ok(text.to_string());
        }

        let keywords = self.keywords(text);
        let mut scored = score_sentences(&sentences, &keywords);
        if let Some(bad) = scored.iter().find(|s| !s.score.is_finite()) {
            return Err(TextError::NonFiniteScore { index: bad.index });
        }

        scored.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(Ordering::Equal)
                .then(a.index.cmp(&b.index))
        });
        scored.truncate(self.num_sentences);
        scored.sort_by_key(|s| s.index);

        Ok(scored.iter().map(|s| s.text).collect::<Vec<_>>().join(" "))
    }

    /// Infallible variant of [`Summarizer::try_summarize`]; on error returns
    /// [`fallback_summary`].
    pub fn summarize(&self, text: &str) -> String {
        match self.try_summarize(text) {
            Ok(summary) => summary,
            Err(e) => {
                warn!(error = %e, "Summarization failed, using truncated text");
                fallback_summary(text)
            }
        }
    }
}

/// First 500 characters of `text` followed by `...`.
pub fn fallback_summary(text: &str) -> String {
    let mut out: String = text.chars().take(FALLBACK_CHARS).collect();
    out.push_str("...");
    out
}

pub fn try_summarize(text: &str, num_sentences: usize) -> Result<String, TextError> {
    Summarizer { num_sentences, ..Summarizer::default() }.try_summarize(text)
}

pub fn summarize(text: &str, num_sentences: usize) -> String {
    Summarizer { num_sentences, ..Summarizer::default() }.summarize(text)
}
