#![allow(dead_code)]

use litbrief::models::{CandidatePaper, PaperLink};
use litbrief::SearchQuery;

/// A candidate paper with deterministic metadata derived from its id.
pub fn candidate(external_id: &str, query: &str) -> CandidatePaper {
    CandidatePaper {
        external_id: external_id.to_string(),
        title: format!("Paper {}", external_id),
        abstract_text: format!("Abstract of {}", external_id),
        authors: vec!["Ada Lovelace".to_string()],
        year: Some(2020),
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

/// `count` candidates with ids `{prefix}.00000`, `{prefix}.00001`, ...
pub fn candidates(prefix: &str, count: usize, query: &str) -> Vec<CandidatePaper> {
    (0..count)
        .map(|i| candidate(&format!("{}.{:05}", prefix, i), query))
        .collect()
}

pub fn queries(texts: &[&str]) -> Vec<SearchQuery> {
    texts.iter().map(|t| SearchQuery::new(*t)).collect()
}
