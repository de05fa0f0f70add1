use std::cmp::Ordering;

use tracing::{debug, warn};

use paperscout_common::PaperRecord;

use crate::tfidf::{cosine, RankError, TfidfModel};

/// Cosine similarity of each paper's abstract to `query`, in input order.
/// The vector space is fitted over the query plus every abstract.
pub fn relevance_scores(papers: &[PaperRecord], query: &str) -> Result<Vec<f64>, RankError> {
    let mut corpus: Vec<&str> = Vec::with_capacity(papers.len() + 1);
    corpus.push(query);
    corpus.extend(papers.iter().map(|p| p.abstract_text()));

    let model = TfidfModel::fit(&corpus)?;
    let query_vec = model.transform(query);
    Ok(papers
        .iter()
        .map(|p| cosine(&query_vec, &model.transform(p.abstract_text())))
        .collect())
}

/// Score every paper against `query` and sort by descending relevance.
///
/// Equal scores keep their input order. If the corpus has no usable terms
/// the papers come back untouched, unscored and in input order.
pub fn rank(mut papers: Vec<PaperRecord>, query: &str) -> Vec<PaperRecord> {
    if papers.is_empty() {
        return papers;
    }

    let scores = match relevance_scores(&papers, query) {
        Ok(scores) => scores,
        Err(e) => {
            warn!(error = %e, papers = papers.len(), "Relevance ranking skipped");
            return papers;
        }
    };

    for (paper, score) in papers.iter_mut().zip(scores) {
        paper.set_relevance_score(score);
    }
    papers.sort_by(|a, b| {
        let sa = a.relevance_score().unwrap_or(0.0);
        let sb = b.relevance_score().unwrap_or(0.0);
        sb.partial_cmp(&sa).unwrap_or(Ordering::Equal)
    });
    debug!(
        papers = papers.len(),
        top = papers.first().and_then(|p| p.relevance_score()).unwrap_or(0.0),
        "Papers ranked"
    );
    papers
}
