use std::collections::HashMap;

use crate::clean::words;
use crate::resources::ensure_ready;
use crate::DEFAULT_MIN_WORD_LENGTH;

/// The `n` most frequent non-stopword tokens of `text`, ties broken by first
/// occurrence.
pub fn extract_keywords(text: &str, n: usize) -> Vec<String> {
    extract_keywords_with(text, n, DEFAULT_MIN_WORD_LENGTH)
}

/// Like [`extract_keywords`] with an explicit minimum token length.
pub fn extract_keywords_with(text: &str, n: usize, min_word_length: usize) -> Vec<String> {
    let resources = ensure_ready();

    // token -> (count, first position)
    let mut freq: HashMap<String, (usize, usize)> = HashMap::new();
    for (pos, word) in words(text).into_iter().enumerate() {
        if word.len() < min_word_length || resources.is_stopword(&word) {
            continue;
        }
        freq.entry(word).or_insert((0, pos)).0 += 1;
    }

    let mut ranked: Vec<(String, usize, usize)> =
        freq.into_iter().map(|(w, (count, first))| (w, count, first)).collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.2.cmp(&b.2)));
    ranked.into_iter().take(n).map(|(w, _, _)| w).collect()
}
