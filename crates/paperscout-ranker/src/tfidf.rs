//! Term-frequency / inverse-document-frequency vectoriser.
//!
//! idf(t) = ln((1 + n) / (1 + df(t))) + 1, term weights are raw counts times
//! idf, and every vector is L2-normalised so cosine similarity is a dot
//! product.

use std::collections::{BTreeMap, HashMap};
use std::sync::OnceLock;

use regex::Regex;
use thiserror::Error;

use paperscout_text::ensure_ready;

#[derive(Debug, Error, PartialEq)]
pub enum RankError {
    #[error("empty vocabulary; documents contain only stopwords or are empty")]
    EmptyVocabulary,
}

/// Term index -> weight. Unit length unless all weights are zero.
pub type SparseVector = BTreeMap<usize, f64>;

fn token_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\w\w+").unwrap_or_else(|_| unreachable!()))
}

/// Lowercased runs of two or more word characters, stopwords removed.
pub fn tokenize(text: &str) -> Vec<String> {
    let resources = ensure_ready();
    let lowered = text.to_lowercase();
    token_regex()
        .find_iter(&lowered)
        .map(|m| m.as_str())
        .filter(|t| !resources.is_stopword(t))
        .map(str::to_string)
        .collect()
}

#[derive(Debug, Clone)]
pub struct TfidfModel {
    vocabulary: HashMap<String, usize>,
    idf: Vec<f64>,
}

impl TfidfModel {
    /// Learn vocabulary and idf weights from `documents`.
    pub fn fit<S: AsRef<str>>(documents: &[S]) -> Result<Self, RankError> {
        let mut vocabulary: HashMap<String, usize> = HashMap::new();
        let mut df: Vec<usize> = Vec::new();

        for doc in documents {
            let mut seen = Vec::new();
            for token in tokenize(doc.as_ref()) {
                let next = vocabulary.len();
                let idx = *vocabulary.entry(token).or_insert(next);
                if idx == df.len() {
                    df.push(0);
                }
                if !seen.contains(&idx) {
                    seen.push(idx);
                    df[idx] += 1;
                }
            }
        }

        if vocabulary.is_empty() {
            return Err(RankError::EmptyVocabulary);
        }

        let n = documents.len() as f64;
        let idf = df
            .iter()
            .map(|&d| ((1.0 + n) / (1.0 + d as f64)).ln() + 1.0)
            .collect();
        Ok(Self { vocabulary, idf })
    }

    pub fn vocabulary_len(&self) -> usize {
        self.vocabulary.len()
    }

    /// Normalised TF-IDF vector of `document`. Terms outside the fitted
    /// vocabulary are ignored.
    pub fn transform(&self, document: &str) -> SparseVector {
        let mut vector = SparseVector::new();
        for token in tokenize(document) {
            if let Some(&idx) = self.vocabulary.get(&token) {
                *vector.entry(idx).or_insert(0.0) += 1.0;
            }
        }
        for (idx, weight) in vector.iter_mut() {
            *weight *= self.idf[*idx];
        }

        let norm = vector.values().map(|w| w * w).sum::<f64>().sqrt();
        if norm > 0.0 {
            for weight in vector.values_mut() {
                *weight /= norm;
            }
        }
        vector
    }
}

/// Cosine similarity of two normalised vectors, clamped to [0, 1]. A zero
/// vector is similar to nothing.
pub fn cosine(a: &SparseVector, b: &SparseVector) -> f64 {
    let (small, large) = if a.len() <= b.len() { (a, b) } else { (b, a) };
    let dot: f64 = small
        .iter()
        .filter_map(|(idx, w)| large.get(idx).map(|v| w * v))
        .sum();
    if dot.is_finite() { dot.clamp(0.0, 1.0) } else { 0.0 }
}
