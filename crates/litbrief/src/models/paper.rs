use std::fmt::Write;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A link attached to a paper (abstract page, PDF, DOI resolver).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PaperLink {
    pub href: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rel: Option<String>,
}

/// A paper as returned by one query execution. Never stored directly.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CandidatePaper {
    /// Identifier in the search service's own ID space (e.g. `1706.03762`).
    pub external_id: String,
    pub title: String,
    pub abstract_text: String,
    pub authors: Vec<String>,
    pub year: Option<i32>,
    pub links: Vec<PaperLink>,
    pub doi: Option<String>,
    pub bibtex: Option<String>,
    pub submitted_at: Option<DateTime<Utc>>,
    /// Tag of the service that produced this candidate.
    pub source: String,
    /// Text of the query that produced this candidate.
    pub query: String,
}

impl CandidatePaper {
    /// Renders a BibTeX `@misc` entry for this candidate.
    pub fn render_bibtex(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "@misc{{{},", self.citation_key());
        let _ = writeln!(out, "  title = {{{}}},", self.title);
        if !self.authors.is_empty() {
            let _ = writeln!(out, "  author = {{{}}},", self.authors.join(" and "));
        }
        if let Some(year) = self.year {
            let _ = writeln!(out, "  year = {{{}}},", year);
        }
        let _ = writeln!(out, "  eprint = {{{}}},", self.external_id);
        if self.source == "arxiv" {
            let _ = writeln!(out, "  archivePrefix = {{arXiv}},");
        }
        if let Some(ref doi) = self.doi {
            let _ = writeln!(out, "  doi = {{{}}},", doi);
        }
        if let Some(link) = self.links.first() {
            let _ = writeln!(out, "  url = {{{}}},", link.href);
        }
        out.push('}');
        out
    }

    /// `<lastname><year><firstword>`, lowercase ASCII alphanumerics only.
    fn citation_key(&self) -> String {
        let last_name = self
            .authors
            .first()
            .and_then(|a| a.split_whitespace().last())
            .unwrap_or("anon");
        let first_word = self
            .title
            .split_whitespace()
            .find(|w| w.chars().filter(|c| c.is_alphanumeric()).count() > 3)
            .unwrap_or("");
        let year = self.year.map(|y| y.to_string()).unwrap_or_default();

        format!("{}{}{}", last_name, year, first_word)
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .flat_map(|c| c.to_lowercase())
            .collect()
    }
}

/// Canonical, persisted paper. One row per external identifier.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Paper {
    pub id: i64,
    pub external_id: String,
    pub title: String,
    pub abstract_text: String,
    pub authors: Vec<String>,
    pub year: Option<i32>,
    pub links: Vec<PaperLink>,
    pub doi: Option<String>,
    pub bibtex: Option<String>,
    pub source: String,
    pub submitted_at: Option<String>,
    pub enriched_at: String,
    pub created_at: String,
    pub updated_at: String,
}

#[cfg(test)]
pub(crate) fn sample_candidate(external_id: &str, query: &str) -> CandidatePaper {
    CandidatePaper {
        external_id: external_id.to_string(),
        title: format!("Paper {}", external_id),
        abstract_text: format!("Abstract of {}", external_id),
        authors: vec!["Ashish Vaswani".to_string(), "Noam Shazeer".to_string()],
        year: Some(2017),
        links: vec![PaperLink {
            href: format!("http://arxiv.org/abs/{}", external_id),
            title: None,
            rel: Some("alternate".to_string()),
        }],
        doi: None,
        bibtex: None,
        submitted_at: None,
        source: "arxiv".to_string(),
        query: query.to_string(),
    }
}
