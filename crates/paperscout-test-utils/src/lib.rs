//! Shared test helpers: record builders, upstream payload fixtures and an
//! in-process mock HTTP server.

pub mod fixtures;

use axum::Router;
use chrono::NaiveDate;

use paperscout_common::{PaperDraft, PaperRecord, Source};

pub use fixtures::{atom_feed, esearch_json, pubmed_article_set, AtomEntry, PubmedArticle};

/// An arXiv record with the given title and abstract.
pub fn paper(title: &str, abstract_text: &str) -> PaperRecord {
    paper_from(Source::Arxiv, title, abstract_text)
}

pub fn paper_from(source: Source, title: &str, abstract_text: &str) -> PaperRecord {
    let slug: String = title
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '-' })
        .collect();
    let draft = PaperDraft {
        title: title.to_string(),
        authors: vec!["Ada Lovelace".to_string()],
        abstract_text: abstract_text.to_string(),
        url: format!("https://papers.example.org/{}/{slug}", source.as_str()),
        published: NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(),
        doi: None,
    };
    PaperRecord::new(source, draft).unwrap()
}

/// Serve `router` on an ephemeral localhost port and return its base URL
/// (`http://127.0.0.1:<port>`). The server runs until the test runtime
/// shuts down.
pub async fn spawn_mock(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}")
}
