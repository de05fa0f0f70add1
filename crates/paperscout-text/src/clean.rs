/// Lowercase, keep only ASCII letters and whitespace, collapse whitespace
/// runs to a single space.
pub fn clean(text: &str) -> String {
    let kept: String = text
        .chars()
        .filter(|c| c.is_ascii_alphabetic() || c.is_whitespace())
        .map(|c| c.to_ascii_lowercase())
        .collect();
    kept.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Word tokens of the cleaned text.
pub fn words(text: &str) -> Vec<String> {
    clean(text).split_whitespace().map(str::to_string).collect()
}

/// Number of whitespace-separated pieces in the raw text.
pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}
