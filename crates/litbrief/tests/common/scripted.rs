//! Deterministic stand-ins for the search service and the language model.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;

use litbrief::llm::{ChatMessage, CompletionOptions};
use litbrief::models::CandidatePaper;
use litbrief::search::{SearchError, SearchRequest};
use litbrief::{LanguageModel, LlmError, SearchService};

/// Search double answering from a fixed table, recording every dispatch.
#[derive(Default)]
pub struct ScriptedSearch {
    results: HashMap<String, Vec<CandidatePaper>>,
    failing: HashSet<String>,
    latency: Option<Duration>,
    dispatches: Mutex<Vec<(String, Instant)>>,
}

impl ScriptedSearch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_results(mut self, query: &str, results: Vec<CandidatePaper>) -> Self {
        self.results.insert(query.to_string(), results);
        self
    }

    /// Every attempt of `query` fails with a retryable 503.
    pub fn with_failure(mut self, query: &str) -> Self {
        self.failing.insert(query.to_string());
        self
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    pub fn dispatches(&self) -> Vec<(String, Instant)> {
        self.dispatches.lock().unwrap().clone()
    }

    pub fn dispatch_count(&self, query: &str) -> usize {
        self.dispatches().iter().filter(|(q, _)| q == query).count()
    }
}

#[async_trait]
impl SearchService for ScriptedSearch {
    async fn search(&self, request: SearchRequest<'_>) -> Result<Vec<CandidatePaper>, SearchError> {
        self.dispatches
            .lock()
            .unwrap()
            .push((request.query.to_string(), Instant::now()));

        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        if self.failing.contains(request.query) {
            return Err(SearchError::Http {
                status: 503,
                message: "service unavailable".to_string(),
            });
        }
        Ok(self.results.get(request.query).cloned().unwrap_or_default())
    }

    fn name(&self) -> &str {
        "arxiv"
    }
}

/// Language-model double.
///
/// Generation prompts get `generation_reply`. Scoring prompts are answered
/// by reading the paper ids back out of the prompt and scoring each with
/// `score_for`, except for batches listed in `malformed_batches`.
pub struct ScriptedModel {
    generation_reply: String,
    score_for: Box<dyn Fn(&str) -> u8 + Send + Sync>,
    malformed_batches: HashSet<usize>,
    scoring_calls: AtomicUsize,
    generation_calls: AtomicUsize,
}

impl ScriptedModel {
    pub fn new() -> Self {
        Self {
            generation_reply: String::new(),
            score_for: Box::new(|_| 70),
            malformed_batches: HashSet::new(),
            scoring_calls: AtomicUsize::new(0),
            generation_calls: AtomicUsize::new(0),
        }
    }

    pub fn with_generation_reply(mut self, reply: &str) -> Self {
        self.generation_reply = reply.to_string();
        self
    }

    pub fn with_scores(mut self, f: impl Fn(&str) -> u8 + Send + Sync + 'static) -> Self {
        self.score_for = Box::new(f);
        self
    }

    /// Zero-based scoring call indexes that get a non-JSON reply.
    pub fn with_malformed_batch(mut self, index: usize) -> Self {
        self.malformed_batches.insert(index);
        self
    }

    pub fn scoring_calls(&self) -> usize {
        self.scoring_calls.load(Ordering::SeqCst)
    }

    pub fn generation_calls(&self) -> usize {
        self.generation_calls.load(Ordering::SeqCst)
    }

    fn reply_to_scoring(&self, prompt: &str) -> String {
        let index = self.scoring_calls.fetch_add(1, Ordering::SeqCst);
        if self.malformed_batches.contains(&index) {
            return "I am sorry, I cannot rate these papers.".to_string();
        }

        let papers_json = prompt.split("Papers:\n").nth(1).unwrap_or("[]");
        let papers: Vec<serde_json::Value> = serde_json::from_str(papers_json).unwrap();
        let scores: Vec<serde_json::Value> = papers
            .iter()
            .map(|p| {
                let id = p["id"].as_str().unwrap_or_default();
                serde_json::json!({
                    "paperId": id,
                    "score": (self.score_for)(id),
                    "justification": "scripted",
                })
            })
            .collect();
        serde_json::json!({ "scores": scores }).to_string()
    }
}

#[async_trait]
impl LanguageModel for ScriptedModel {
    async fn complete(
        &self,
        messages: &[ChatMessage],
        _options: &CompletionOptions,
    ) -> Result<String, LlmError> {
        let prompt = messages.last().map(|m| m.content.as_str()).unwrap_or_default();
        if prompt.contains("Papers:\n") {
            Ok(self.reply_to_scoring(prompt))
        } else {
            self.generation_calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.generation_reply.clone())
        }
    }

    fn model_name(&self) -> &str {
        "scripted"
    }
}
