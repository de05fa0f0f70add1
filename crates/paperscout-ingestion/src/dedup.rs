//! Deduplication of merged search results.

use std::collections::HashSet;

use paperscout_common::PaperRecord;

/// Result of a deduplication pass.
#[derive(Debug)]
pub struct Deduplicated {
    pub papers: Vec<PaperRecord>,
    pub duplicates_removed: usize,
}

/// Keep the first paper for each case-insensitive title; later ones are
/// dropped. Input order is otherwise preserved, so earlier sources win.
pub fn dedup_by_title(papers: Vec<PaperRecord>) -> Deduplicated {
    let total = papers.len();
    let mut seen: HashSet<String> = HashSet::with_capacity(total);
    let papers: Vec<PaperRecord> = papers
        .into_iter()
        .filter(|p| seen.insert(p.title_key()))
        .collect();
    Deduplicated { duplicates_removed: total - papers.len(), papers }
}
