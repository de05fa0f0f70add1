//! arXiv API client.
//!
//! One GET against the export API returns an Atom feed; every `entry`
//! becomes a record.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate};
use quick_xml::events::Event;
use quick_xml::name::{Namespace, ResolveResult};
use quick_xml::NsReader;
use tracing::{debug, instrument, warn};

use paperscout_common::paper::normalize_whitespace;
use paperscout_common::{
    HttpSession, PaperDraft, PaperRecord, Result, RetryPolicy, SessionConfig, Source,
};
use paperscout_config::SourceConfig;

use super::{finish_batch, validate_query, LiteratureSource, ParsedBatch, SearchLimits, Skip, SkipReason};

pub const ARXIV_API_URL: &str = "http://export.arxiv.org/api/query";

const ATOM_NS: &[u8] = b"http://www.w3.org/2005/Atom";
const ARXIV_NS: &[u8] = b"http://arxiv.org/schemas/atom";

pub struct ArxivClient {
    base_url: String,
    session: HttpSession,
    limits: SearchLimits,
}

impl ArxivClient {
    pub fn new() -> Result<Self> {
        Self::from_config(&SourceConfig::default())
    }

    pub fn from_config(cfg: &SourceConfig) -> Result<Self> {
        let base_url = cfg.base_url.clone().unwrap_or_else(|| ARXIV_API_URL.to_string());
        let session = HttpSession::for_base_url(
            &base_url,
            SessionConfig { timeout: cfg.timeout(), ..SessionConfig::default() },
            RetryPolicy::new(cfg.retry_attempts, cfg.retry_delay(), cfg.retry_max_delay()),
        )?;
        Ok(Self { base_url, session, limits: SearchLimits::from_config(cfg) })
    }

    pub fn session(&self) -> &HttpSession {
        &self.session
    }

    fn query_params(query: &str, fetch: usize) -> Vec<(&'static str, String)> {
        vec![
            ("search_query", format!("all:{query}")),
            ("start", "0".to_string()),
            ("max_results", fetch.to_string()),
            ("sortBy", "submittedDate".to_string()),
            ("sortOrder", "descending".to_string()),
        ]
    }

    #[instrument(skip(self))]
    async fn fetch_feed(&self, query: &str, fetch: usize) -> Result<String> {
        let xml = self
            .session
            .get_text(&self.base_url, &Self::query_params(query, fetch))
            .await?;
        debug!(bytes = xml.len(), "arXiv feed received");
        Ok(xml)
    }
}

#[async_trait]
impl LiteratureSource for ArxivClient {
    fn source(&self) -> Source {
        Source::Arxiv
    }

    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<PaperRecord>> {
        let query = validate_query(query)?;
        if max_results == 0 {
            return Ok(Vec::new());
        }
        let xml = self.fetch_feed(query, self.limits.fetch_count(max_results)).await?;
        let batch = parse_feed(&xml);
        Ok(finish_batch(Source::Arxiv, batch, query, &self.limits, max_results))
    }

    fn close(&self) {
        self.session.close();
    }
}

// ── Atom parsing ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq)]
enum Field {
    Id,
    Title,
    Summary,
    Published,
    AuthorName,
    Doi,
}

#[derive(Debug, Default)]
struct Entry {
    id: String,
    title: String,
    summary: String,
    published: String,
    authors: Vec<String>,
    doi: Option<String>,
}

impl Entry {
    fn commit(&mut self, field: Field, text: &str) {
        let text = normalize_whitespace(text);
        match field {
            Field::Id        => self.id = text,
            Field::Title     => self.title = text,
            Field::Summary   => self.summary = text,
            Field::Published => self.published = text,
            Field::AuthorName if !text.is_empty() => self.authors.push(text),
            Field::Doi if !text.is_empty() => self.doi = Some(text),
            _ => {}
        }
    }

    fn into_record(self) -> std::result::Result<PaperRecord, Skip> {
        if self.id.contains("/api/errors") {
            return Err(Skip::new(SkipReason::ApiError, self.summary));
        }
        if self.id.is_empty() {
            return Err(Skip::missing("id"));
        }
        if self.title.is_empty() {
            return Err(Skip::missing("title"));
        }
        if self.published.is_empty() {
            return Err(Skip::missing("published"));
        }
        let published = parse_published(&self.published)
            .ok_or_else(|| Skip::new(SkipReason::MalformedDate, self.published.clone()))?;

        let draft = PaperDraft {
            title: self.title,
            authors: self.authors,
            abstract_text: self.summary,
            url: self.id,
            published,
            doi: self.doi,
        };
        Ok(PaperRecord::new(Source::Arxiv, draft)?)
    }
}

fn parse_published(s: &str) -> Option<NaiveDate> {
    DateTime::parse_from_rfc3339(s)
        .map(|d| d.date_naive())
        .ok()
        .or_else(|| NaiveDate::parse_from_str(s.get(..10)?, "%Y-%m-%d").ok())
}

fn entry_field(ns: &ResolveResult, local: &[u8], in_author: bool) -> Option<Field> {
    match ns {
        ResolveResult::Bound(Namespace(n)) if *n == ATOM_NS => match local {
            b"name" if in_author => Some(Field::AuthorName),
            b"id" if !in_author => Some(Field::Id),
            b"title" if !in_author => Some(Field::Title),
            b"summary" if !in_author => Some(Field::Summary),
            b"published" if !in_author => Some(Field::Published),
            _ => None,
        },
        ResolveResult::Bound(Namespace(n)) if *n == ARXIV_NS && local == b"doi" => Some(Field::Doi),
        _ => None,
    }
}

fn is_atom(ns: &ResolveResult, local: &[u8], name: &[u8]) -> bool {
    matches!(ns, ResolveResult::Bound(Namespace(n)) if *n == ATOM_NS) && local == name
}

/// Parse an arXiv Atom feed. A document-level XML error ends parsing and
/// keeps the entries completed before it.
pub fn parse_feed(xml: &str) -> ParsedBatch {
    let mut reader = NsReader::from_str(xml);
    let mut buf = Vec::new();

    let mut batch = ParsedBatch::default();
    let mut entry: Option<Entry> = None;
    let mut in_author = false;
    let mut field: Option<(Field, usize)> = None;
    let mut depth = 0usize;
    let mut text = String::new();

    loop {
        match reader.read_resolved_event_into(&mut buf) {
            Ok((ns, Event::Start(e))) => {
                depth += 1;
                let local = e.local_name();
                if is_atom(&ns, local.as_ref(), b"entry") {
                    entry = Some(Entry::default());
                    in_author = false;
                } else if entry.is_some() && field.is_none() {
                    if is_atom(&ns, local.as_ref(), b"author") {
                        in_author = true;
                    } else if let Some(f) = entry_field(&ns, local.as_ref(), in_author) {
                        field = Some((f, depth));
                        text.clear();
                    }
                }
            }
            Ok((_, Event::Text(e))) => {
                if field.is_some() {
                    match e.unescape() {
                        Ok(t) => text.push_str(&t),
                        Err(err) => debug!(error = %err, "Unescapable text in arXiv entry"),
                    }
                }
            }
            Ok((_, Event::CData(e))) => {
                if field.is_some() {
                    text.push_str(&String::from_utf8_lossy(&e));
                }
            }
            Ok((ns, Event::End(e))) => {
                let local = e.local_name();
                if let Some((f, at)) = field {
                    if at == depth {
                        if let Some(cur) = entry.as_mut() {
                            cur.commit(f, &text);
                        }
                        field = None;
                    }
                } else if is_atom(&ns, local.as_ref(), b"author") {
                    in_author = false;
                } else if is_atom(&ns, local.as_ref(), b"entry") {
                    if let Some(done) = entry.take() {
                        batch.push(done.into_record());
                    }
                }
                depth = depth.saturating_sub(1);
            }
            Ok((_, Event::Eof)) => break,
            Err(e) => {
                warn!("arXiv feed XML parse error: {}", e);
                break;
            }
            _ => {}
        }
        buf.clear();
    }

    debug!(records = batch.records.len(), skipped = batch.skipped.len(), "Parsed arXiv feed");
    batch
}

#[cfg(test)]
mod tests {
    use super::*;
    use paperscout_common::UNKNOWN_AUTHOR;
    use paperscout_test_utils::{atom_feed, AtomEntry};
    use pretty_assertions::assert_eq;

    const ABSTRACT: &str = "We present a method for learning on graphs that scales to very large inputs.";

    #[test]
    fn test_parse_feed_entries() {
        let xml = atom_feed(&[
            AtomEntry::new("2403.00001v1", "Scalable   Graph\n Learning", ABSTRACT)
                .with_doi("10.1000/xyz123"),
            AtomEntry::new("2403.00002v2", "Second Paper", ABSTRACT)
                .with_authors(&["Grace Hopper"])
                .with_published("2024-02-29T23:59:59Z"),
        ]);
        let batch = parse_feed(&xml);
        assert!(batch.skipped.is_empty());
        assert_eq!(batch.records.len(), 2);

        let first = &batch.records[0];
        assert_eq!(first.title(), "Scalable Graph Learning");
        assert_eq!(first.authors(), ["Ada Lovelace", "Alan Turing"]);
        assert_eq!(first.abstract_text(), ABSTRACT);
        assert_eq!(first.url(), "http://arxiv.org/abs/2403.00001v1");
        assert_eq!(first.published(), NaiveDate::from_ymd_opt(2024, 3, 1).unwrap());
        assert_eq!(first.doi(), Some("10.1000/xyz123"));
        assert_eq!(first.source(), Source::Arxiv);

        let second = &batch.records[1];
        assert_eq!(second.authors(), ["Grace Hopper"]);
        assert_eq!(second.published(), NaiveDate::from_ymd_opt(2024, 2, 29).unwrap());
        assert_eq!(second.doi(), None);
    }

    #[test]
    fn test_feed_title_and_id_are_not_entries() {
        let batch = parse_feed(&atom_feed(&[]));
        assert!(batch.records.is_empty());
        assert!(batch.skipped.is_empty());
    }

    #[test]
    fn test_bad_entries_are_skipped_not_fatal() {
        let xml = atom_feed(&[
            AtomEntry::new("1", "Good", ABSTRACT),
            AtomEntry::new("2", "Bad date", ABSTRACT).with_published("last tuesday"),
            AtomEntry::new("3", "   ", ABSTRACT),
            AtomEntry::api_error("incorrect id format for 1234"),
            AtomEntry::new("4", "No authors", ABSTRACT).with_authors(&[]),
        ]);
        let batch = parse_feed(&xml);
        let titles: Vec<&str> = batch.records.iter().map(|p| p.title()).collect();
        assert_eq!(titles, vec!["Good", "No authors"]);
        assert_eq!(batch.records[1].authors(), [UNKNOWN_AUTHOR]);

        let reasons: Vec<SkipReason> = batch.skipped.iter().map(|s| s.reason).collect();
        assert_eq!(
            reasons,
            vec![SkipReason::MalformedDate, SkipReason::MissingField, SkipReason::ApiError]
        );
    }

    #[test]
    fn test_prefixed_atom_namespace() {
        let xml = r#"<a:feed xmlns:a="http://www.w3.org/2005/Atom" xmlns:x="http://arxiv.org/schemas/atom">
  <a:entry>
    <a:id>http://arxiv.org/abs/9999.0001v1</a:id>
    <a:published>2023-07-04T00:00:00Z</a:published>
    <a:title>Prefixed &amp; Namespaced</a:title>
    <a:summary><![CDATA[Raw <b>cdata</b> abstract]]></a:summary>
    <a:author><a:name>Emmy Noether</a:name></a:author>
    <x:doi>10.1/abc</x:doi>
    <other:title xmlns:other="urn:other">ignored</other:title>
  </a:entry>
</a:feed>"#;
        let batch = parse_feed(xml);
        assert_eq!(batch.records.len(), 1);
        let p = &batch.records[0];
        assert_eq!(p.title(), "Prefixed & Namespaced");
        assert_eq!(p.abstract_text(), "Raw <b>cdata</b> abstract");
        assert_eq!(p.authors(), ["Emmy Noether"]);
        assert_eq!(p.doi(), Some("10.1/abc"));
    }

    #[test]
    fn test_truncated_document_keeps_completed_entries() {
        let full = atom_feed(&[AtomEntry::new("1", "Complete", ABSTRACT), AtomEntry::new("2", "Cut", ABSTRACT)]);
        let cut = &full[..full.find("<title>Cut").unwrap() + 12];
        let batch = parse_feed(cut);
        let titles: Vec<&str> = batch.records.iter().map(|p| p.title()).collect();
        assert_eq!(titles, vec!["Complete"]);
    }

    #[test]
    fn test_query_params() {
        let params = ArxivClient::query_params("graph neural networks", 10);
        assert_eq!(params[0], ("search_query", "all:graph neural networks".to_string()));
        assert_eq!(params[2], ("max_results", "10".to_string()));
        assert_eq!(params[3], ("sortBy", "submittedDate".to_string()));
    }
}
