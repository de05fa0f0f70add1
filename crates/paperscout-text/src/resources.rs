//! Process-wide language resources, built once on first use.

use std::collections::HashSet;
use std::sync::OnceLock;

use tracing::debug;

/// Standard English function words. Contracted forms appear without their
/// apostrophes since [`crate::clean`] strips punctuation before lookup.
const STOP_WORDS: &[&str] = &[
    "i", "me", "my", "myself", "we", "our", "ours", "ourselves", "you", "your",
    "yours", "yourself", "yourselves", "he", "him", "his", "himself", "she",
    "her", "hers", "herself", "it", "its", "itself", "they", "them", "their",
    "theirs", "themselves", "what", "which", "who", "whom", "this", "that",
    "these", "those", "am", "is", "are", "was", "were", "be", "been", "being",
    "have", "has", "had", "having", "do", "does", "did", "doing", "a", "an",
    "the", "and", "but", "if", "or", "because", "as", "until", "while", "of",
    "at", "by", "for", "with", "about", "against", "between", "into", "through",
    "during", "before", "after", "above", "below", "to", "from", "up", "down",
    "in", "out", "on", "off", "over", "under", "again", "further", "then",
    "once", "here", "there", "when", "where", "why", "how", "all", "any",
    "both", "each", "few", "more", "most", "other", "some", "such", "no", "nor",
    "not", "only", "own", "same", "so", "than", "too", "very", "s", "t", "can",
    "will", "just", "don", "dont", "should", "shouldve", "now", "d", "ll", "m",
    "o", "re", "ve", "y", "ain", "aren", "arent", "couldn", "couldnt", "didn",
    "didnt", "doesn", "doesnt", "hadn", "hadnt", "hasn", "hasnt", "haven",
    "havent", "isn", "isnt", "ma", "mightn", "mightnt", "mustn", "mustnt",
    "needn", "neednt", "shan", "shant", "shouldn", "shouldnt", "wasn", "wasnt",
    "weren", "werent", "won", "wont", "wouldn", "wouldnt", "youd", "youll",
    "youre", "youve", "shes", "thatll", "itll", "im", "ive", "theyd",
    "theyll", "theyre", "theyve", "weve",
];

/// Tokens (lowercase, without the trailing period) after which a period does
/// not end a sentence.
const ABBREVIATIONS: &[&str] = &[
    "e.g", "i.e", "al", "etc", "cf", "vs", "viz", "approx", "ca",
    "fig", "figs", "eq", "eqs", "ref", "refs", "sec", "no", "vol", "pp", "p",
    "ch", "dr", "mr", "mrs", "ms", "prof", "st", "jr", "sr", "inc", "ltd",
    "co", "corp", "dept", "univ", "resp", "min", "max", "jan", "feb",
    "mar", "apr", "jun", "jul", "aug", "sep", "sept", "oct", "nov", "dec",
];

#[derive(Debug)]
pub struct TextResources {
    stopwords: HashSet<&'static str>,
    abbreviations: HashSet<&'static str>,
}

impl TextResources {
    fn build() -> Self {
        let resources = Self {
            stopwords: STOP_WORDS.iter().copied().collect(),
            abbreviations: ABBREVIATIONS.iter().copied().collect(),
        };
        debug!(
            stopwords = resources.stopwords.len(),
            abbreviations = resources.abbreviations.len(),
            "Text resources initialised"
        );
        resources
    }

    pub fn is_stopword(&self, word: &str) -> bool {
        self.stopwords.contains(word)
    }

    /// `token` is the lowercase word preceding a period, period excluded.
    pub fn is_abbreviation(&self, token: &str) -> bool {
        self.abbreviations.contains(token)
    }
}

/// Initialise the shared resources if needed and return them. Safe to call
/// from any thread, any number of times.
pub fn ensure_ready() -> &'static TextResources {
    static RESOURCES: OnceLock<TextResources> = OnceLock::new();
    RESOURCES.get_or_init(TextResources::build)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ensure_ready_is_idempotent() {
        let a = ensure_ready();
        let b = ensure_ready();
        assert!(std::ptr::eq(a, b));
    }

    #[test]
    fn test_common_function_words_are_stopwords() {
        let r = ensure_ready();
        for w in ["the", "and", "of", "with", "dont"] {
            assert!(r.is_stopword(w), "{w} should be a stopword");
        }
        assert!(!r.is_stopword("graph"));
    }

    #[test]
    fn test_abbreviations() {
        let r = ensure_ready();
        assert!(r.is_abbreviation("e.g"));
        assert!(r.is_abbreviation("fig"));
        assert!(!r.is_abbreviation("networks"));
    }
}
