//! JSON artifact for a finished query.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::{Local, NaiveDateTime};
use tracing::info;

use paperscout_common::PaperRecord;

/// `search_<query>_<YYYYmmdd_HHMMSS>.json`, with whitespace and path
/// separators in the query turned into underscores.
pub fn artifact_name(query: &str, at: NaiveDateTime) -> String {
    let slug: String = query
        .trim()
        .chars()
        .map(|c| if c.is_whitespace() || c == '/' || c == '\\' { '_' } else { c })
        .collect();
    format!("search_{slug}_{}.json", at.format("%Y%m%d_%H%M%S"))
}

/// Write `papers` as a pretty-printed JSON array under `dir`, creating the
/// directory if needed. Returns the path written.
pub fn write_results(dir: &Path, query: &str, papers: &[PaperRecord]) -> anyhow::Result<PathBuf> {
    write_results_at(dir, query, papers, Local::now().naive_local())
}

fn write_results_at(
    dir: &Path,
    query: &str,
    papers: &[PaperRecord],
    at: NaiveDateTime,
) -> anyhow::Result<PathBuf> {
    fs::create_dir_all(dir)
        .with_context(|| format!("creating output directory {}", dir.display()))?;

    let path = dir.join(artifact_name(query, at));
    let json = serde_json::to_string_pretty(papers)?;
    fs::write(&path, json).with_context(|| format!("writing {}", path.display()))?;

    info!(path = %path.display(), papers = papers.len(), "Results saved");
    Ok(path)
}
