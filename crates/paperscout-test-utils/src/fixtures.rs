//! Builders for upstream payloads shaped like the real arXiv and NCBI
//! responses.

fn escape(s: &str) -> String {
    s.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}

// ── arXiv Atom ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct AtomEntry {
    pub id: String,
    pub title: String,
    pub summary: String,
    pub authors: Vec<String>,
    pub published: String,
    pub doi: Option<String>,
}

impl AtomEntry {
    pub fn new(arxiv_id: &str, title: &str, summary: &str) -> Self {
        Self {
            id: format!("http://arxiv.org/abs/{arxiv_id}"),
            title: title.to_string(),
            summary: summary.to_string(),
            authors: vec!["Ada Lovelace".to_string(), "Alan Turing".to_string()],
            published: "2024-03-01T12:00:00Z".to_string(),
            doi: None,
        }
    }

    /// The entry arXiv returns in place of results for a malformed query.
    pub fn api_error(message: &str) -> Self {
        Self {
            id: "http://arxiv.org/api/errors#incorrect_id_format".to_string(),
            title: "Error".to_string(),
            summary: message.to_string(),
            authors: vec!["arXiv api core".to_string()],
            published: "2024-03-01T00:00:00-05:00".to_string(),
            doi: None,
        }
    }

    pub fn with_authors(mut self, authors: &[&str]) -> Self {
        self.authors = authors.iter().map(|a| a.to_string()).collect();
        self
    }

    pub fn with_published(mut self, published: &str) -> Self {
        self.published = published.to_string();
        self
    }

    pub fn with_doi(mut self, doi: &str) -> Self {
        self.doi = Some(doi.to_string());
        self
    }

    fn render(&self) -> String {
        let authors: String = self
            .authors
            .iter()
            .map(|a| format!("    <author><name>{}</name></author>\n", escape(a)))
            .collect();
        let doi = self
            .doi
            .as_ref()
            .map(|d| format!("    <arxiv:doi>{}</arxiv:doi>\n", escape(d)))
            .unwrap_or_default();
        format!(
            "  <entry>\n    <id>{id}</id>\n    <updated>{published}</updated>\n    <published>{published}</published>\n    <title>{title}</title>\n    <summary>{summary}</summary>\n{authors}{doi}    <link href=\"{id}\" rel=\"alternate\" type=\"text/html\"/>\n    <arxiv:primary_category term=\"cs.LG\" scheme=\"http://arxiv.org/schemas/atom\"/>\n  </entry>\n",
            id = escape(&self.id),
            published = escape(&self.published),
            title = escape(&self.title),
            summary = escape(&self.summary),
        )
    }
}

pub fn atom_feed(entries: &[AtomEntry]) -> String {
    let body: String = entries.iter().map(AtomEntry::render).collect();
    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
<feed xmlns=\"http://www.w3.org/2005/Atom\" xmlns:opensearch=\"http://a9.com/-/spec/opensearch/1.1/\" xmlns:arxiv=\"http://arxiv.org/schemas/atom\">\n\
  <link href=\"http://arxiv.org/api/query\" rel=\"self\" type=\"application/atom+xml\"/>\n\
  <title type=\"html\">ArXiv Query: search_query=all</title>\n\
  <id>http://arxiv.org/api/feed</id>\n\
  <updated>2024-03-02T00:00:00-05:00</updated>\n\
  <opensearch:totalResults>{n}</opensearch:totalResults>\n\
  <opensearch:startIndex>0</opensearch:startIndex>\n\
{body}</feed>\n",
        n = entries.len(),
    )
}

// ── PubMed E-utilities ──────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct PubmedArticle {
    pub pmid: String,
    /// Raw XML allowed, so inline markup can be exercised.
    pub title_xml: String,
    /// One `AbstractText` element per section, raw XML allowed.
    pub abstract_sections: Vec<String>,
    /// `(fore_name, last_name)`; an empty fore name renders a
    /// `CollectiveName` author instead.
    pub authors: Vec<(String, String)>,
    /// Inner XML of `PubDate`.
    pub pub_date_xml: String,
    pub doi: Option<String>,
    pub reference_doi: Option<String>,
}

impl PubmedArticle {
    pub fn new(pmid: &str, title: &str, abstract_text: &str) -> Self {
        Self {
            pmid: pmid.to_string(),
            title_xml: escape(title),
            abstract_sections: vec![escape(abstract_text)],
            authors: vec![("Jane".to_string(), "Smith".to_string())],
            pub_date_xml: "<Year>2023</Year><Month>Mar</Month><Day>05</Day>".to_string(),
            doi: None,
            reference_doi: None,
        }
    }

    pub fn with_title_xml(mut self, xml: &str) -> Self {
        self.title_xml = xml.to_string();
        self
    }

    pub fn with_abstract_sections(mut self, sections: &[&str]) -> Self {
        self.abstract_sections = sections.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn with_authors(mut self, authors: &[(&str, &str)]) -> Self {
        self.authors = authors.iter().map(|(f, l)| (f.to_string(), l.to_string())).collect();
        self
    }

    pub fn with_pub_date_xml(mut self, xml: &str) -> Self {
        self.pub_date_xml = xml.to_string();
        self
    }

    pub fn with_doi(mut self, doi: &str) -> Self {
        self.doi = Some(doi.to_string());
        self
    }

    pub fn with_reference_doi(mut self, doi: &str) -> Self {
        self.reference_doi = Some(doi.to_string());
        self
    }

    fn render(&self) -> String {
        let abstract_xml = if self.abstract_sections.is_empty() {
            String::new()
        } else {
            let sections: String = self
                .abstract_sections
                .iter()
                .enumerate()
                .map(|(i, s)| format!("<AbstractText Label=\"S{i}\" NlmCategory=\"UNASSIGNED\">{s}</AbstractText>"))
                .collect();
            format!("<Abstract>{sections}</Abstract>")
        };
        let authors: String = self
            .authors
            .iter()
            .map(|(fore, last)| {
                if fore.is_empty() {
                    format!("<Author ValidYN=\"Y\"><CollectiveName>{}</CollectiveName></Author>", escape(last))
                } else {
                    format!(
                        "<Author ValidYN=\"Y\"><LastName>{}</LastName><ForeName>{}</ForeName><Initials>{}</Initials></Author>",
                        escape(last),
                        escape(fore),
                        fore.chars().next().unwrap_or('X'),
                    )
                }
            })
            .collect();
        let doi = self
            .doi
            .as_ref()
            .map(|d| format!("<ArticleId IdType=\"doi\">{}</ArticleId>", escape(d)))
            .unwrap_or_default();
        let references = self
            .reference_doi
            .as_ref()
            .map(|d| {
                format!(
                    "<ReferenceList><Reference><Citation>Prior work.</Citation><ArticleIdList>\
<ArticleId IdType=\"doi\">{}</ArticleId><ArticleId IdType=\"pubmed\">99999999</ArticleId>\
</ArticleIdList></Reference></ReferenceList>",
                    escape(d)
                )
            })
            .unwrap_or_default();

        format!(
            "<PubmedArticle>\
<MedlineCitation Status=\"MEDLINE\" Owner=\"NLM\">\
<PMID Version=\"1\">{pmid}</PMID>\
<DateCompleted><Year>2024</Year><Month>01</Month><Day>10</Day></DateCompleted>\
<Article PubModel=\"Print\">\
<Journal><JournalIssue CitedMedium=\"Internet\"><Volume>12</Volume><PubDate>{date}</PubDate></JournalIssue>\
<Title>Journal of Examples</Title></Journal>\
<ArticleTitle>{title}</ArticleTitle>\
{abstract_xml}\
<AuthorList CompleteYN=\"Y\">{authors}</AuthorList>\
</Article>\
<CommentsCorrectionsList><CommentsCorrections RefType=\"CommentIn\"><RefSource>Other</RefSource><PMID Version=\"1\">11111111</PMID></CommentsCorrections></CommentsCorrectionsList>\
</MedlineCitation>\
<PubmedData>\
<History><PubMedPubDate PubStatus=\"received\"><Year>2022</Year><Month>11</Month><Day>1</Day></PubMedPubDate></History>\
<ArticleIdList><ArticleId IdType=\"pubmed\">{pmid}</ArticleId>{doi}</ArticleIdList>\
{references}\
</PubmedData>\
</PubmedArticle>\n",
            pmid = self.pmid,
            date = self.pub_date_xml,
            title = self.title_xml,
        )
    }
}

pub fn pubmed_article_set(articles: &[PubmedArticle]) -> String {
    let body: String = articles.iter().map(PubmedArticle::render).collect();
    format!(
        "<?xml version=\"1.0\" ?>\n\
<!DOCTYPE PubmedArticleSet PUBLIC \"-//NLM//DTD PubMedArticle, 1st January 2024//EN\" \"https://dtd.nlm.nih.gov/ncbi/pubmed/out/pubmed_240101.dtd\">\n\
<PubmedArticleSet>\n{body}</PubmedArticleSet>\n"
    )
}

/// An `esearch.fcgi?retmode=json` response listing `ids`.
pub fn esearch_json(ids: &[&str]) -> String {
    serde_json::json!({
        "header": { "type": "esearch", "version": "0.3" },
        "esearchresult": {
            "count": ids.len().to_string(),
            "retmax": ids.len().to_string(),
            "retstart": "0",
            "idlist": ids,
            "translationset": [],
            "querytranslation": "",
        }
    })
    .to_string()
}
