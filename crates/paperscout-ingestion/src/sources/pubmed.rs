//! PubMed E-utilities client.
//!
//! Endpoints used:
//!   esearch: https://eutils.ncbi.nlm.nih.gov/entrez/eutils/esearch.fcgi
//!   efetch:  https://eutils.ncbi.nlm.nih.gov/entrez/eutils/efetch.fcgi

use anyhow::anyhow;
use async_trait::async_trait;
use chrono::NaiveDate;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use serde::Deserialize;
use tracing::{debug, instrument, warn};

use paperscout_common::paper::normalize_whitespace;
use paperscout_common::{
    HttpSession, PaperDraft, PaperRecord, PaperscoutError, Result, RetryPolicy, SessionConfig,
    Source,
};
use paperscout_config::SourceConfig;

use super::{finish_batch, validate_query, LiteratureSource, ParsedBatch, SearchLimits, Skip, SkipReason};

pub const EUTILS_BASE_URL: &str = "https://eutils.ncbi.nlm.nih.gov/entrez/eutils";

pub struct PubMedClient {
    base_url: String,
    session: HttpSession,
    limits: SearchLimits,
    api_key: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ESearchResponse {
    esearchresult: ESearchResult,
}

#[derive(Debug, Deserialize)]
struct ESearchResult {
    #[serde(default)]
    idlist: Vec<String>,
    #[serde(default, rename = "ERROR")]
    error: Option<String>,
}

impl PubMedClient {
    pub fn new(api_key: Option<String>) -> Result<Self> {
        Self::from_config(&SourceConfig { api_key, ..SourceConfig::default() })
    }

    pub fn from_config(cfg: &SourceConfig) -> Result<Self> {
        let base_url = cfg
            .base_url
            .clone()
            .unwrap_or_else(|| EUTILS_BASE_URL.to_string())
            .trim_end_matches('/')
            .to_string();
        let session = HttpSession::for_base_url(
            &base_url,
            SessionConfig { timeout: cfg.timeout(), ..SessionConfig::default() },
            RetryPolicy::new(cfg.retry_attempts, cfg.retry_delay(), cfg.retry_max_delay()),
        )?;
        Ok(Self {
            base_url,
            session,
            limits: SearchLimits::from_config(cfg),
            api_key: cfg.api_key.clone(),
        })
    }

    pub fn session(&self) -> &HttpSession {
        &self.session
    }

    fn with_api_key(&self, mut params: Vec<(&'static str, String)>) -> Vec<(&'static str, String)> {
        if let Some(key) = &self.api_key {
            params.push(("api_key", key.clone()));
        }
        params
    }

    /// Search PubMed and return a list of PMIDs, newest first.
    #[instrument(skip(self))]
    async fn esearch(&self, query: &str, retmax: usize) -> Result<Vec<String>> {
        let params = self.with_api_key(vec![
            ("db", "pubmed".to_string()),
            ("term", query.to_string()),
            ("retmax", retmax.to_string()),
            ("retmode", "json".to_string()),
            ("sort", "date".to_string()),
        ]);
        let body = self
            .session
            .get_text(&format!("{}/esearch.fcgi", self.base_url), &params)
            .await?;

        let resp: ESearchResponse = serde_json::from_str(&body)?;
        if let Some(err) = resp.esearchresult.error {
            return Err(PaperscoutError::Other(anyhow!("PubMed esearch error: {err}")));
        }
        let ids = resp.esearchresult.idlist;
        debug!(?ids, "PubMed esearch returned PMIDs");
        Ok(ids)
    }

    /// Fetch PubMed XML for a list of PMIDs.
    #[instrument(skip(self, pmids), fields(count = pmids.len()))]
    async fn efetch(&self, pmids: &[String]) -> Result<String> {
        let params = self.with_api_key(vec![
            ("db", "pubmed".to_string()),
            ("id", pmids.join(",")),
            ("rettype", "abstract".to_string()),
            ("retmode", "xml".to_string()),
        ]);
        self.session
            .get_text(&format!("{}/efetch.fcgi", self.base_url), &params)
            .await
    }
}

#[async_trait]
impl LiteratureSource for PubMedClient {
    fn source(&self) -> Source {
        Source::PubMed
    }

    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<PaperRecord>> {
        let query = validate_query(query)?;
        if max_results == 0 {
            return Ok(Vec::new());
        }

        let pmids = self.esearch(query, self.limits.fetch_count(max_results)).await?;
        if pmids.is_empty() {
            debug!("No PMIDs for query, skipping efetch");
            return Ok(Vec::new());
        }

        let xml = self.efetch(&pmids).await?;
        let batch = parse_pubmed_xml(&xml);
        Ok(finish_batch(Source::PubMed, batch, query, &self.limits, max_results))
    }

    fn close(&self) {
        self.session.close();
    }
}

// ── efetch XML parsing ──────────────────────────────────────────────────────

#[derive(Debug, Default)]
struct DateParts {
    year: String,
    month: String,
    day: String,
    medline: String,
}

#[derive(Debug, Default)]
struct Article {
    pmid: String,
    title: String,
    sections: Vec<String>,
    authors: Vec<String>,
    date: DateParts,
    doi: Option<String>,
    elocation_doi: Option<String>,
}

#[derive(Debug, Default)]
struct AuthorParts {
    last: String,
    fore: String,
    collective: String,
}

impl AuthorParts {
    fn render(&self) -> Option<String> {
        let last = normalize_whitespace(&self.last);
        let fore = normalize_whitespace(&self.fore);
        let collective = normalize_whitespace(&self.collective);
        match (fore.is_empty(), last.is_empty()) {
            (false, false) => Some(format!("{fore} {last}")),
            (true, false) => Some(last),
            (false, true) => Some(fore),
            (true, true) if !collective.is_empty() => Some(collective),
            _ => None,
        }
    }
}

/// Which text sink the reader is currently filling.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Sink {
    Pmid,
    Title,
    Abstract,
    LastName,
    ForeName,
    CollectiveName,
    Year,
    Month,
    Day,
    MedlineDate,
    Doi,
    ElocationDoi,
}

fn month_number(s: &str) -> Option<u32> {
    let s = s.trim();
    if let Ok(n) = s.parse::<u32>() {
        return (1..=12).contains(&n).then_some(n);
    }
    const MONTHS: [&str; 12] = ["jan", "feb", "mar", "apr", "may", "jun", "jul", "aug", "sep", "oct", "nov", "dec"];
    let prefix = s.get(..3)?.to_ascii_lowercase();
    MONTHS.iter().position(|m| *m == prefix).map(|i| i as u32 + 1)
}

impl DateParts {
    /// Missing month -> January, missing day -> 1st.
    fn resolve(&self) -> std::result::Result<NaiveDate, Skip> {
        let malformed = || Skip::new(SkipReason::MalformedDate, self.describe());

        let (year, month, day) = if !self.year.trim().is_empty() {
            let month = match self.month.trim() {
                "" => 1,
                m => month_number(m).ok_or_else(malformed)?,
            };
            let day = match self.day.trim() {
                "" => 1,
                d => d.parse::<u32>().map_err(|_| malformed())?,
            };
            (self.year.trim().to_string(), month, day)
        } else if !self.medline.trim().is_empty() {
            // e.g. "2023 Jan-Feb", "2022 Winter", "2021-2022"
            let mut parts = self.medline.split_whitespace();
            let year = parts.next().and_then(|y| y.get(..4)).unwrap_or("").to_string();
            let month = parts
                .next()
                .and_then(|m| month_number(m.split('-').next().unwrap_or(m)))
                .unwrap_or(1);
            (year, month, 1)
        } else {
            return Err(malformed());
        };

        let year: i32 = year.parse().map_err(|_| malformed())?;
        NaiveDate::from_ymd_opt(year, month, day).ok_or_else(malformed)
    }

    fn describe(&self) -> String {
        if self.medline.is_empty() {
            format!("year={:?} month={:?} day={:?}", self.year, self.month, self.day)
        } else {
            format!("medline={:?}", self.medline)
        }
    }
}

impl Article {
    fn into_record(self) -> std::result::Result<PaperRecord, Skip> {
        let pmid = self.pmid.trim().to_string();
        if pmid.is_empty() {
            return Err(Skip::missing("PMID"));
        }
        if normalize_whitespace(&self.title).is_empty() {
            return Err(Skip::new(SkipReason::MissingField, format!("ArticleTitle (PMID {pmid})")));
        }
        let published = self.date.resolve()?;
        let abstract_text = self
            .sections
            .iter()
            .map(|s| normalize_whitespace(s))
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(" ");

        let draft = PaperDraft {
            title: self.title,
            authors: self.authors,
            abstract_text,
            url: format!("https://pubmed.ncbi.nlm.nih.gov/{pmid}/"),
            published,
            doi: self.doi.or(self.elocation_doi),
        };
        Ok(PaperRecord::new(Source::PubMed, draft)?)
    }
}

fn has_attr(e: &BytesStart, key: &[u8], value: &str) -> bool {
    e.attributes().flatten().any(|a| {
        a.key.as_ref() == key && a.unescape_value().map(|v| v == value).unwrap_or(false)
    })
}

/// Parse PubMed XML (efetch abstract mode) into records.
///
/// Handles the `<PubmedArticleSet><PubmedArticle>` structure. Inline markup
/// in titles and abstracts is flattened to its text. Identifiers inside
/// `ReferenceList` and `CommentsCorrections` belong to other papers and are
/// ignored.
pub fn parse_pubmed_xml(xml: &str) -> ParsedBatch {
    let mut batch = ParsedBatch::default();
    let mut reader = Reader::from_str(xml);
    let mut buf = Vec::new();

    let mut stack: Vec<Vec<u8>> = Vec::new();
    let mut current: Option<Article> = None;
    let mut author = AuthorParts::default();
    let mut section = String::new();
    // Sink plus the stack depth of the element that opened it.
    let mut sink: Option<(Sink, usize)> = None;

    let inside = |stack: &[Vec<u8>], name: &[u8]| stack.iter().any(|s| s.as_slice() == name);

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                let name = e.local_name().as_ref().to_vec();
                let parent = stack.last().map(|p| p.as_slice());

                if name == b"PubmedArticle" {
                    current = Some(Article::default());
                } else if current.is_some() && sink.is_none() {
                    let foreign = inside(&stack, b"ReferenceList") || inside(&stack, b"CommentsCorrectionsList");
                    let next = match name.as_slice() {
                        b"PMID" if parent == Some(b"MedlineCitation".as_slice()) => Some(Sink::Pmid),
                        b"ArticleTitle" => Some(Sink::Title),
                        b"AbstractText" if inside(&stack, b"Abstract") => {
                            section.clear();
                            Some(Sink::Abstract)
                        }
                        b"Author" if parent == Some(b"AuthorList".as_slice()) => {
                            author = AuthorParts::default();
                            None
                        }
                        b"LastName" if parent == Some(b"Author".as_slice()) => Some(Sink::LastName),
                        b"ForeName" if parent == Some(b"Author".as_slice()) => Some(Sink::ForeName),
                        b"CollectiveName" if parent == Some(b"Author".as_slice()) => Some(Sink::CollectiveName),
                        b"Year" if parent == Some(b"PubDate".as_slice()) => Some(Sink::Year),
                        b"Month" if parent == Some(b"PubDate".as_slice()) => Some(Sink::Month),
                        b"Day" if parent == Some(b"PubDate".as_slice()) => Some(Sink::Day),
                        b"MedlineDate" if parent == Some(b"PubDate".as_slice()) => Some(Sink::MedlineDate),
                        b"ArticleId" if !foreign && has_attr(&e, b"IdType", "doi") => Some(Sink::Doi),
                        b"ELocationID" if has_attr(&e, b"EIdType", "doi") => Some(Sink::ElocationDoi),
                        _ => None,
                    };
                    sink = next.map(|s| (s, stack.len()));
                }
                stack.push(name);
            }
            Ok(Event::Text(e)) => {
                if let (Some((s, _)), Some(article)) = (sink, current.as_mut()) {
                    match e.unescape() {
                        Ok(text) => match s {
                            Sink::Pmid           => article.pmid.push_str(&text),
                            Sink::Title          => article.title.push_str(&text),
                            Sink::Abstract       => section.push_str(&text),
                            Sink::LastName       => author.last.push_str(&text),
                            Sink::ForeName       => author.fore.push_str(&text),
                            Sink::CollectiveName => author.collective.push_str(&text),
                            Sink::Year           => article.date.year.push_str(&text),
                            Sink::Month          => article.date.month.push_str(&text),
                            Sink::Day            => article.date.day.push_str(&text),
                            Sink::MedlineDate    => article.date.medline.push_str(&text),
                            Sink::Doi            => article.doi.get_or_insert_with(String::new).push_str(&text),
                            Sink::ElocationDoi   => article.elocation_doi.get_or_insert_with(String::new).push_str(&text),
                        },
                        Err(err) => debug!(error = %err, "Unescapable text in PubMed article"),
                    }
                }
            }
            Ok(Event::End(e)) => {
                stack.pop();
                let depth = stack.len();
                if let Some((s, at)) = sink {
                    if at == depth {
                        if s == Sink::Abstract {
                            if let Some(article) = current.as_mut() {
                                article.sections.push(std::mem::take(&mut section));
                            }
                        }
                        sink = None;
                    }
                } else {
                    match e.local_name().as_ref() {
                        b"Author" if current.is_some() => {
                            if let (Some(article), Some(name)) = (current.as_mut(), author.render()) {
                                article.authors.push(name);
                            }
                        }
                        b"PubmedArticle" => {
                            if let Some(article) = current.take() {
                                batch.push(article.into_record());
                            }
                        }
                        _ => {}
                    }
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                warn!("PubMed XML parse error: {}", e);
                break;
            }
            _ => {}
        }
        buf.clear();
    }

    debug!(records = batch.records.len(), skipped = batch.skipped.len(), "Parsed PubMed articles");
    batch
}

#[cfg(test)]
mod tests {
    use super::*;
    use paperscout_common::UNKNOWN_AUTHOR;
    use paperscout_test_utils::{pubmed_article_set, PubmedArticle};
    use pretty_assertions::assert_eq;

    const ABSTRACT: &str = "KRAS mutations drive a large share of pancreatic tumours in adults.";

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_parse_minimal_pubmed_xml() {
        let xml = r#"<?xml version="1.0"?>
<PubmedArticleSet>
  <PubmedArticle>
    <MedlineCitation>
      <PMID>12345678</PMID>
      <Article>
        <Journal><JournalIssue><PubDate><Year>2021</Year></PubDate></JournalIssue><Title>Nature</Title></Journal>
        <ArticleTitle>KRAS G12D in pancreatic cancer</ArticleTitle>
        <Abstract><AbstractText>Test abstract.</AbstractText></Abstract>
        <AuthorList>
          <Author><LastName>Smith</LastName><ForeName>John</ForeName></Author>
        </AuthorList>
      </Article>
    </MedlineCitation>
  </PubmedArticle>
</PubmedArticleSet>"#;

        let batch = parse_pubmed_xml(xml);
        assert_eq!(batch.records.len(), 1);
        let p = &batch.records[0];
        assert_eq!(p.title(), "KRAS G12D in pancreatic cancer");
        assert_eq!(p.authors(), ["John Smith"]);
        assert_eq!(p.abstract_text(), "Test abstract.");
        assert_eq!(p.url(), "https://pubmed.ncbi.nlm.nih.gov/12345678/");
        assert_eq!(p.published(), date(2021, 1, 1));
        assert_eq!(p.source(), Source::PubMed);
    }

    #[test]
    fn test_full_article_fields() {
        let xml = pubmed_article_set(&[PubmedArticle::new("100", "Targeting KRAS", ABSTRACT)
            .with_authors(&[("Jane", "Smith"), ("", "Pancreatic Cancer Consortium")])
            .with_doi("10.1000/kras.1")
            .with_reference_doi("10.9999/someone-else")]);
        let batch = parse_pubmed_xml(&xml);
        assert!(batch.skipped.is_empty());
        let p = &batch.records[0];
        assert_eq!(p.authors(), ["Jane Smith", "Pancreatic Cancer Consortium"]);
        assert_eq!(p.published(), date(2023, 3, 5));
        assert_eq!(p.doi(), Some("10.1000/kras.1"));
    }

    #[test]
    fn test_reference_ids_are_ignored() {
        let xml = pubmed_article_set(&[PubmedArticle::new("101", "No own DOI", ABSTRACT)
            .with_reference_doi("10.9999/someone-else")]);
        let batch = parse_pubmed_xml(&xml);
        let p = &batch.records[0];
        assert_eq!(p.doi(), None);
        // CommentsCorrections carries its own PMID
        assert_eq!(p.url(), "https://pubmed.ncbi.nlm.nih.gov/101/");
    }

    #[test]
    fn test_sections_joined_and_markup_flattened() {
        let xml = pubmed_article_set(&[PubmedArticle::new("102", "", "")
            .with_title_xml("Role of <i>TP53</i> in H<sub>2</sub>O stress")
            .with_abstract_sections(&[
                "Background text about <b>TP53</b>.",
                "   ",
                "Methods &amp; results follow.",
            ])]);
        let batch = parse_pubmed_xml(&xml);
        let p = &batch.records[0];
        assert_eq!(p.title(), "Role of TP53 in H2O stress");
        assert_eq!(p.abstract_text(), "Background text about TP53. Methods & results follow.");
    }

    #[test]
    fn test_missing_abstract_is_empty_not_skipped() {
        let xml = pubmed_article_set(&[PubmedArticle::new("103", "Letter", "").with_abstract_sections(&[])]);
        let batch = parse_pubmed_xml(&xml);
        assert_eq!(batch.records.len(), 1);
        assert_eq!(batch.records[0].abstract_text(), "");
    }

    #[test]
    fn test_no_authors_gets_placeholder() {
        let xml = pubmed_article_set(&[PubmedArticle::new("104", "Anonymous", ABSTRACT).with_authors(&[])]);
        let batch = parse_pubmed_xml(&xml);
        assert_eq!(batch.records[0].authors(), [UNKNOWN_AUTHOR]);
    }

    #[test]
    fn test_pub_date_variants() {
        let cases = [
            ("<Year>2020</Year><Month>11</Month><Day>3</Day>", date(2020, 11, 3)),
            ("<Year>2019</Year><Month>Dec</Month>", date(2019, 12, 1)),
            ("<Year>2018</Year>", date(2018, 1, 1)),
            ("<MedlineDate>2023 Jan-Feb</MedlineDate>", date(2023, 1, 1)),
            ("<MedlineDate>2022 Winter</MedlineDate>", date(2022, 1, 1)),
            ("<MedlineDate>2021-2022</MedlineDate>", date(2021, 1, 1)),
        ];
        for (i, (xml_date, expected)) in cases.into_iter().enumerate() {
            let xml = pubmed_article_set(&[PubmedArticle::new(&format!("{}", 200 + i), "Dated", ABSTRACT)
                .with_pub_date_xml(xml_date)]);
            let batch = parse_pubmed_xml(&xml);
            assert_eq!(batch.records.len(), 1, "{xml_date}");
            assert_eq!(batch.records[0].published(), expected, "{xml_date}");
        }
    }

    #[test]
    fn test_bad_items_are_skipped_with_reason() {
        let xml = pubmed_article_set(&[
            PubmedArticle::new("300", "Fine", ABSTRACT),
            PubmedArticle::new("301", "No date", ABSTRACT).with_pub_date_xml(""),
            PubmedArticle::new("302", "Bad day", ABSTRACT)
                .with_pub_date_xml("<Year>2020</Year><Month>Feb</Month><Day>30</Day>"),
            PubmedArticle::new("303", "  ", ABSTRACT),
        ]);
        let batch = parse_pubmed_xml(&xml);
        let titles: Vec<&str> = batch.records.iter().map(|p| p.title()).collect();
        assert_eq!(titles, vec!["Fine"]);
        let reasons: Vec<SkipReason> = batch.skipped.iter().map(|s| s.reason).collect();
        assert_eq!(
            reasons,
            vec![SkipReason::MalformedDate, SkipReason::MalformedDate, SkipReason::MissingField]
        );
    }

    #[test]
    fn test_month_number() {
        assert_eq!(month_number("Sep"), Some(9));
        assert_eq!(month_number("september"), Some(9));
        assert_eq!(month_number("07"), Some(7));
        assert_eq!(month_number("13"), None);
        assert_eq!(month_number("Q3"), None);
    }
}
