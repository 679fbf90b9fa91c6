//! arXiv Atom API client.

use std::sync::LazyLock;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Datelike, Utc};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use regex::Regex;
use reqwest::Url;

use super::{SearchError, SearchRequest, SearchService};
use crate::config::SearchConfig;
use crate::models::{CandidatePaper, PaperLink};

pub const SOURCE_TAG: &str = "arxiv";

static RE_ABS_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^https?://(?:export\.)?arxiv\.org/abs/(.+?)(?:v\d+)?$").unwrap());

/// Client for `export.arxiv.org/api/query`. One HTTP request per search.
#[derive(Debug, Clone)]
pub struct ArxivClient {
    http: reqwest::Client,
    base_url: String,
}

impl ArxivClient {
    pub fn new(config: &SearchConfig) -> Result<Self, SearchError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(concat!("litbrief/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| SearchError::Transport(e.to_string()))?;
        Ok(Self::with_client(http, &config.base_url))
    }

    pub fn with_client(http: reqwest::Client, base_url: &str) -> Self {
        Self {
            http,
            base_url: base_url.to_string(),
        }
    }

    /// Builds the request URL for one query.
    pub fn request_url(&self, request: SearchRequest<'_>) -> Result<Url, SearchError> {
        let query = request.query.trim();
        if query.is_empty() {
            return Err(SearchError::InvalidRequest("empty query".to_string()));
        }
        let search_query = render_search_query(request);
        let max_results = request.options.max_results.to_string();

        Url::parse_with_params(
            &self.base_url,
            &[
                ("search_query", search_query.as_str()),
                ("start", "0"),
                ("max_results", max_results.as_str()),
                ("sortBy", request.options.sort_by.as_str()),
                ("sortOrder", request.options.sort_order.as_str()),
            ],
        )
        .map_err(|e| SearchError::InvalidRequest(format!("bad base url '{}': {}", self.base_url, e)))
    }
}

#[async_trait]
impl SearchService for ArxivClient {
    async fn search(&self, request: SearchRequest<'_>) -> Result<Vec<CandidatePaper>, SearchError> {
        let url = self.request_url(request)?;
        log::debug!("arXiv request: {}", url);

        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| SearchError::Transport(e.to_string()))?;

        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(SearchError::RateLimited);
        }

        let body = response
            .text()
            .await
            .map_err(|e| SearchError::Transport(e.to_string()))?;

        if !status.is_success() {
            return Err(SearchError::Http {
                status: status.as_u16(),
                message: body.chars().take(200).collect(),
            });
        }

        parse_feed(&body, request.query)
    }

    fn name(&self) -> &str {
        SOURCE_TAG
    }
}

/// Query text with the optional date range appended as a `submittedDate` clause.
fn render_search_query(request: SearchRequest<'_>) -> String {
    let query = request.query.trim();
    match request.options.date_range {
        Some(range) => format!(
            "({}) AND submittedDate:[{} TO {}]",
            query,
            range.from.format("%Y%m%d0000"),
            range.to.format("%Y%m%d2359")
        ),
        None => query.to_string(),
    }
}

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
struct EntryBuilder {
    id: String,
    title: String,
    summary: String,
    published: String,
    authors: Vec<String>,
    links: Vec<PaperLink>,
    doi: Option<String>,
}

impl EntryBuilder {
    fn set(&mut self, field: Field, text: &str) {
        let value = collapse_whitespace(text);
        match field {
            Field::Id => self.id = value,
            Field::Title => self.title = value,
            Field::Summary => self.summary = value,
            Field::Published => self.published = value,
            Field::AuthorName => {
                if !value.is_empty() {
                    self.authors.push(value);
                }
            }
            Field::Doi => self.doi = (!value.is_empty()).then_some(value),
        }
    }

    fn build(self, query: &str) -> Result<Option<CandidatePaper>, SearchError> {
        if self.id.contains("/api/errors") {
            return Err(SearchError::Api(if self.summary.is_empty() {
                self.title
            } else {
                self.summary
            }));
        }

        let Some(external_id) = normalize_id(&self.id) else {
            log::warn!("Skipping arXiv entry with unrecognised id '{}'", self.id);
            return Ok(None);
        };

        let submitted_at = DateTime::parse_from_rfc3339(&self.published)
            .ok()
            .map(|d| d.with_timezone(&Utc));

        let mut candidate = CandidatePaper {
            external_id,
            title: self.title,
            abstract_text: self.summary,
            authors: self.authors,
            year: submitted_at.map(|d| d.year()),
            links: self.links,
            doi: self.doi,
            bibtex: None,
            submitted_at,
            source: SOURCE_TAG.to_string(),
            query: query.to_string(),
        };
        candidate.bibtex = Some(candidate.render_bibtex());
        Ok(Some(candidate))
    }
}

/// `http://arxiv.org/abs/1706.03762v7` becomes `1706.03762`.
pub fn normalize_id(raw: &str) -> Option<String> {
    let raw = raw.trim();
    RE_ABS_ID
        .captures(raw)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
        .filter(|id| !id.is_empty())
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn field_for(name: &[u8], in_author: bool) -> Option<Field> {
    match name {
        b"id" => Some(Field::Id),
        b"title" => Some(Field::Title),
        b"summary" => Some(Field::Summary),
        b"published" => Some(Field::Published),
        b"name" if in_author => Some(Field::AuthorName),
        b"arxiv:doi" => Some(Field::Doi),
        _ => None,
    }
}

fn parse_link(e: &BytesStart<'_>) -> Option<PaperLink> {
    let mut link = PaperLink {
        href: String::new(),
        title: None,
        rel: None,
    };
    for attr in e.attributes().flatten() {
        let value = attr
            .unescape_value()
            .map(|v| v.into_owned())
            .unwrap_or_else(|_| String::from_utf8_lossy(&attr.value).into_owned());
        match attr.key.as_ref() {
            b"href" => link.href = value,
            b"title" => link.title = Some(value),
            b"rel" => link.rel = Some(value),
            _ => {}
        }
    }
    (!link.href.is_empty()).then_some(link)
}

fn resolve_entity(name: &str) -> Option<String> {
    let resolved = match name {
        "amp" => '&',
        "lt" => '<',
        "gt" => '>',
        "quot" => '"',
        "apos" => '\'',
        _ => {
            let code = name.strip_prefix('#')?;
            let value = match code.strip_prefix('x').or_else(|| code.strip_prefix('X')) {
                Some(hex) => u32::from_str_radix(hex, 16).ok()?,
                None => code.parse().ok()?,
            };
            char::from_u32(value)?
        }
    };
    Some(resolved.to_string())
}

/// Parses an arXiv Atom feed into candidates tagged with `query`.
pub fn parse_feed(xml: &str, query: &str) -> Result<Vec<CandidatePaper>, SearchError> {
    let mut reader = Reader::from_str(xml);

    let mut candidates = Vec::new();
    let mut entry: Option<EntryBuilder> = None;
    let mut field: Option<Field> = None;
    let mut in_author = false;
    let mut text = String::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) => {
                if entry.is_none() {
                    if e.name().as_ref() == b"entry" {
                        entry = Some(EntryBuilder::default());
                    }
                    continue;
                }
                match e.name().as_ref() {
                    b"author" => in_author = true,
                    b"link" => {
                        if let (Some(builder), Some(link)) = (entry.as_mut(), parse_link(e)) {
                            builder.links.push(link);
                        }
                    }
                    name => {
                        field = field_for(name, in_author);
                        text.clear();
                    }
                }
            }
            Ok(Event::Empty(ref e)) => {
                if e.name().as_ref() == b"link" {
                    if let (Some(builder), Some(link)) = (entry.as_mut(), parse_link(e)) {
                        builder.links.push(link);
                    }
                }
            }
            Ok(Event::Text(e)) => {
                if field.is_some() {
                    let decoded = e
                        .decode()
                        .map_err(|err| SearchError::Parse(err.to_string()))?;
                    text.push_str(&decoded);
                }
            }
            Ok(Event::GeneralRef(e)) => {
                if field.is_some() {
                    let name = String::from_utf8_lossy(&e);
                    match resolve_entity(&name) {
                        Some(resolved) => text.push_str(&resolved),
                        None => {
                            return Err(SearchError::Parse(format!("unknown entity '&{};'", name)))
                        }
                    }
                }
            }
            Ok(Event::CData(e)) => {
                if field.is_some() {
                    text.push_str(&String::from_utf8_lossy(&e));
                }
            }
            Ok(Event::End(ref e)) => match e.name().as_ref() {
                b"entry" => {
                    if let Some(builder) = entry.take() {
                        if let Some(candidate) = builder.build(query)? {
                            candidates.push(candidate);
                        }
                    }
                    field = None;
                    in_author = false;
                }
                b"author" => in_author = false,
                _ => {
                    if let (Some(f), Some(builder)) = (field.take(), entry.as_mut()) {
                        builder.set(f, &text);
                    }
                    text.clear();
                }
            },
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(SearchError::Parse(format!(
                    "at position {}: {}",
                    reader.buffer_position(),
                    e
                )))
            }
            _ => {}
        }
    }

    if entry.is_some() {
        return Err(SearchError::Parse("feed ended inside an entry".to_string()));
    }

    Ok(candidates)
}
