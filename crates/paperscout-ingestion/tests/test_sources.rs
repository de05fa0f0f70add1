//! Source adapters against mock arXiv and NCBI servers.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use axum::extract::Query;
use axum::http::StatusCode;
use axum::routing::get;
use axum::Router;
use chrono::NaiveDate;
use pretty_assertions::assert_eq;

use paperscout_common::{PaperscoutError, Source};
use paperscout_config::{Config, SourceConfig};
use paperscout_ingestion::{ArxivClient, LiteratureSource, Pipeline, PubMedClient};
use paperscout_test_utils::{atom_feed, esearch_json, pubmed_article_set, spawn_mock, AtomEntry, PubmedArticle};

const GNN_ABSTRACT: &str = "We study graph neural networks for molecular property prediction \
    and report strong results on standard benchmarks.";
const OTHER_ABSTRACT: &str = "Message passing models are evaluated on citation datasets \
    with careful ablations of depth and width.";

type Seen = Arc<Mutex<Vec<HashMap<String, String>>>>;

fn fast_source(base_url: String) -> SourceConfig {
    SourceConfig {
        base_url: Some(base_url),
        retry_delay_ms: 1,
        retry_max_delay_ms: 5,
        ..SourceConfig::default()
    }
}

/// A GET route that records each request's query string and answers `body`.
fn recording(seen: Seen, body: String) -> axum::routing::MethodRouter {
    get(move |Query(params): Query<HashMap<String, String>>| {
        let seen = seen.clone();
        let body = body.clone();
        async move {
            seen.lock().unwrap().push(params);
            body
        }
    })
}

fn unavailable(hits: Arc<AtomicUsize>) -> axum::routing::MethodRouter {
    get(move || {
        hits.fetch_add(1, Ordering::SeqCst);
        async { (StatusCode::SERVICE_UNAVAILABLE, "try again later") }
    })
}

// ── arXiv ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_arxiv_search_parses_and_prioritises_literal_matches() {
    let feed = atom_feed(&[
        AtomEntry::new("2403.00001v1", "Message passing at scale", OTHER_ABSTRACT),
        AtomEntry::new("2403.00002v2", "Graph neural networks for chemistry", GNN_ABSTRACT)
            .with_doi("10.1000/gnn.2024"),
    ]);
    let seen: Seen = Arc::default();
    let base = spawn_mock(Router::new().route("/api/query", recording(seen.clone(), feed))).await;

    let client = ArxivClient::from_config(&fast_source(format!("{base}/api/query"))).unwrap();
    let papers = client.search("graph neural networks", 1).await.unwrap();

    assert_eq!(papers.len(), 1);
    let p = &papers[0];
    assert_eq!(p.title(), "Graph neural networks for chemistry");
    assert_eq!(p.source(), Source::Arxiv);
    assert_eq!(p.url(), "http://arxiv.org/abs/2403.00002v2");
    assert_eq!(p.authors(), ["Ada Lovelace", "Alan Turing"]);
    assert_eq!(p.published(), NaiveDate::from_ymd_opt(2024, 3, 1).unwrap());
    assert_eq!(p.doi(), Some("10.1000/gnn.2024"));

    let requests = seen.lock().unwrap();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0]["search_query"], "all:graph neural networks");
    assert_eq!(requests[0]["max_results"], "2");
    assert_eq!(requests[0]["sortBy"], "submittedDate");
}

#[tokio::test]
async fn test_arxiv_session_reopens_after_close() {
    let feed = atom_feed(&[AtomEntry::new("2403.00002v1", "Graph neural networks", GNN_ABSTRACT)]);
    let seen: Seen = Arc::default();
    let base = spawn_mock(Router::new().route("/api/query", recording(seen.clone(), feed))).await;
    let client = ArxivClient::from_config(&fast_source(format!("{base}/api/query"))).unwrap();

    assert_eq!(client.search("graph", 5).await.unwrap().len(), 1);
    assert!(client.session().is_open());

    client.close();
    client.close();
    assert!(!client.session().is_open());

    assert_eq!(client.search("graph", 5).await.unwrap().len(), 1);
    assert_eq!(seen.lock().unwrap().len(), 2);
}

#[tokio::test]
async fn test_arxiv_retries_then_gives_up() {
    let hits = Arc::new(AtomicUsize::new(0));
    let base = spawn_mock(Router::new().route("/api/query", unavailable(hits.clone()))).await;
    let client = ArxivClient::from_config(&fast_source(format!("{base}/api/query"))).unwrap();

    let err = client.search("graph", 5).await.unwrap_err();
    assert!(matches!(err, PaperscoutError::Status { status: 503, .. }), "got {err:?}");
    assert_eq!(hits.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_zero_results_and_blank_query_skip_the_network() {
    let seen: Seen = Arc::default();
    let base = spawn_mock(Router::new().route("/api/query", recording(seen.clone(), atom_feed(&[])))).await;
    let client = ArxivClient::from_config(&fast_source(format!("{base}/api/query"))).unwrap();

    assert!(client.search("graph", 0).await.unwrap().is_empty());
    let err = client.search("   ", 5).await.unwrap_err();
    assert!(matches!(err, PaperscoutError::InvalidInput(_)));
    assert!(seen.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_requests_outside_configured_host_are_refused() {
    let client = ArxivClient::from_config(&fast_source("http://127.0.0.1:9/api/query".into())).unwrap();
    assert!(client.session().is_allowed("http://127.0.0.1:9/api/query"));
    assert!(!client.session().is_allowed("http://evil.example.com/api/query"));
}

// ── PubMed ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_pubmed_two_step_flow() {
    let esearch_seen: Seen = Arc::default();
    let efetch_seen: Seen = Arc::default();
    let articles = pubmed_article_set(&[
        PubmedArticle::new("38000001", "Graph neural networks in oncology", GNN_ABSTRACT),
        PubmedArticle::new("38000002", "Citation graphs revisited", OTHER_ABSTRACT),
    ]);
    let router = Router::new()
        .route("/esearch.fcgi", recording(esearch_seen.clone(), esearch_json(&["38000001", "38000002"])))
        .route("/efetch.fcgi", recording(efetch_seen.clone(), articles));
    let base = spawn_mock(router).await;

    let cfg = SourceConfig { api_key: Some("secret".into()), ..fast_source(format!("{base}/")) };
    let client = PubMedClient::from_config(&cfg).unwrap();
    let papers = client.search("graph neural networks", 5).await.unwrap();

    let titles: Vec<&str> = papers.iter().map(|p| p.title()).collect();
    assert_eq!(titles, vec!["Graph neural networks in oncology", "Citation graphs revisited"]);
    assert_eq!(papers[0].url(), "https://pubmed.ncbi.nlm.nih.gov/38000001/");
    assert_eq!(papers[0].authors(), ["Jane Smith"]);
    assert_eq!(papers[0].source(), Source::PubMed);

    let search = esearch_seen.lock().unwrap();
    assert_eq!(search[0]["db"], "pubmed");
    assert_eq!(search[0]["term"], "graph neural networks");
    assert_eq!(search[0]["retmax"], "10");
    assert_eq!(search[0]["retmode"], "json");
    assert_eq!(search[0]["api_key"], "secret");

    let fetch = efetch_seen.lock().unwrap();
    assert_eq!(fetch.len(), 1);
    assert_eq!(fetch[0]["id"], "38000001,38000002");
    assert_eq!(fetch[0]["rettype"], "abstract");
    assert_eq!(fetch[0]["retmode"], "xml");
}

#[tokio::test]
async fn test_pubmed_empty_idlist_skips_efetch() {
    let efetch_seen: Seen = Arc::default();
    let router = Router::new()
        .route("/esearch.fcgi", get(|| async { esearch_json(&[]) }))
        .route("/efetch.fcgi", recording(efetch_seen.clone(), pubmed_article_set(&[])));
    let base = spawn_mock(router).await;

    let client = PubMedClient::from_config(&fast_source(base)).unwrap();
    assert!(client.search("nothing matches this", 5).await.unwrap().is_empty());
    assert!(efetch_seen.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_pubmed_esearch_error_field_fails_search() {
    let router = Router::new().route(
        "/esearch.fcgi",
        get(|| async { r#"{"esearchresult":{"ERROR":"Invalid query"}}"# }),
    );
    let base = spawn_mock(router).await;

    let client = PubMedClient::from_config(&fast_source(base)).unwrap();
    let err = client.search("((", 5).await.unwrap_err();
    assert!(err.to_string().contains("Invalid query"));
}

#[tokio::test]
async fn test_pubmed_efetch_failure_is_retried() {
    let hits = Arc::new(AtomicUsize::new(0));
    let router = Router::new()
        .route("/esearch.fcgi", get(|| async { esearch_json(&["1"]) }))
        .route("/efetch.fcgi", unavailable(hits.clone()));
    let base = spawn_mock(router).await;

    let client = PubMedClient::from_config(&fast_source(base)).unwrap();
    assert!(client.search("graph", 5).await.is_err());
    assert_eq!(hits.load(Ordering::SeqCst), 3);
}

// ── Pipeline over HTTP ──────────────────────────────────────────────────────

#[tokio::test]
async fn test_pipeline_survives_one_upstream_down() {
    let arxiv_hits = Arc::new(AtomicUsize::new(0));
    let arxiv = spawn_mock(Router::new().route("/api/query", unavailable(arxiv_hits.clone()))).await;
    let pubmed = spawn_mock(
        Router::new()
            .route("/esearch.fcgi", get(|| async { esearch_json(&["38000001"]) }))
            .route(
                "/efetch.fcgi",
                get(|| async {
                    pubmed_article_set(&[PubmedArticle::new(
                        "38000001",
                        "Graph neural networks in oncology",
                        GNN_ABSTRACT,
                    )])
                }),
            ),
    )
    .await;

    let mut config = Config::default();
    config.sources.arxiv = fast_source(format!("{arxiv}/api/query"));
    config.sources.pubmed = fast_source(pubmed);
    let pipeline = Pipeline::from_config(&config).unwrap();
    assert_eq!(pipeline.sources().collect::<Vec<_>>(), vec![Source::Arxiv, Source::PubMed]);

    let report = pipeline.run_query_report("graph neural networks", 5).await;
    pipeline.shutdown();

    assert_eq!(arxiv_hits.load(Ordering::SeqCst), 3);
    assert_eq!(report.failed_sources(), 1);
    assert_eq!(report.papers.len(), 1);
    let top = &report.papers[0];
    assert_eq!(top.source(), Source::PubMed);
    assert!(top.relevance_score().unwrap() > 0.0);
    assert!(top.summary().is_some());
}
