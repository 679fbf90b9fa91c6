use std::collections::HashSet;
use std::sync::{Arc, LazyLock};

use regex::Regex;

use crate::llm::{ChatMessage, CompletionOptions, LanguageModel};
use crate::models::SearchQuery;
use crate::resilience::CallGuard;
use crate::search::DateRange;

use super::error::GenerationError;

static RE_LIST_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*(?:[-*•]|\d+[.)]|\(\d+\))\s+").unwrap());

const SYSTEM_PROMPT: &str = "You write search queries for the arXiv API. \
Use field prefixes: ti: (title), abs: (abstract), au: (author), cat: (category). \
Combine terms with AND, OR and ANDNOT, and group with parentheses. \
Put multi-word phrases in double quotes. \
Return one query per line with no numbering, bullets, commentary or code fences.";

/// Turns a research question into field-prefixed search queries with one model call.
pub struct QueryGenerator {
    model: Arc<dyn LanguageModel>,
    guard: CallGuard,
    max_queries: usize,
}

impl QueryGenerator {
    pub fn new(model: Arc<dyn LanguageModel>, guard: CallGuard, max_queries: usize) -> Self {
        Self {
            model,
            guard,
            max_queries: max_queries.max(1),
        }
    }

    pub fn max_queries(&self) -> usize {
        self.max_queries
    }

    /// Returns at most `max_queries` new, selected queries in `waiting` state.
    pub async fn generate(
        &self,
        question: &str,
        date_range: Option<DateRange>,
    ) -> Result<Vec<SearchQuery>, GenerationError> {
        let question = question.trim();
        if question.is_empty() {
            return Err(GenerationError::EmptyQuestion);
        }

        let messages = vec![
            ChatMessage::system(SYSTEM_PROMPT),
            ChatMessage::user(self.user_prompt(question, date_range)),
        ];
        let options = CompletionOptions::default();

        let response = self
            .guard
            .run("query generation", || {
                self.model.complete(&messages, &options)
            })
            .await?;

        let queries = parse_queries(&response, self.max_queries);
        if queries.is_empty() {
            return Err(GenerationError::NoQueries);
        }

        log::info!(
            "Generated {} search queries with {}",
            queries.len(),
            self.model.model_name()
        );
        Ok(queries.into_iter().map(SearchQuery::new).collect())
    }

    fn user_prompt(&self, question: &str, date_range: Option<DateRange>) -> String {
        let mut prompt = format!(
            "Write {} different search queries for this research question:\n\n{}",
            self.max_queries, question
        );
        if let Some(range) = date_range {
            prompt.push_str(&format!(
                "\n\nOnly papers submitted between {} and {} are wanted. \
                 The date filter is applied separately; do not put dates in the queries.",
                range.from, range.to
            ));
        }
        prompt
    }
}

/// Keeps the first `max` distinct non-empty lines, stripped of list markers.
pub fn parse_queries(response: &str, max: usize) -> Vec<String> {
    let mut seen = HashSet::new();
    response
        .lines()
        .filter(|line| !line.trim_start().starts_with("```"))
        .map(|line| RE_LIST_MARKER.replace(line, "").trim().trim_matches('`').trim().to_string())
        .filter(|line| !line.is_empty())
        .filter(|line| seen.insert(line.clone()))
        .take(max)
        .collect()
}
