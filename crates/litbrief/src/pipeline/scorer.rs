//! Batched relevancy scoring.
//!
//! Papers are split into a fixed number of contiguous batches, each scored by
//! one strict-JSON model call. A batch whose call fails or whose response does
//! not parse is discarded and the remaining batches still run.

use std::collections::{HashMap, HashSet};
use std::ops::Range;
use std::sync::Arc;

use serde::{Deserialize, Deserializer, Serialize};
use tokio_util::sync::CancellationToken;

use crate::db::{association_repo, Database};
use crate::llm::{extract_json, ChatMessage, CompletionOptions, LanguageModel};
use crate::models::MAX_SCORE;
use crate::resilience::CallGuard;

use super::error::ScoringError;
use super::progress::{ProgressReporter, RunEvent};

const SYSTEM_PROMPT: &str = "You rate how relevant research papers are to a research question. \
Score each paper from 0 to 100: \
0-20 not relevant, 21-40 slightly relevant, 41-60 moderately relevant, \
61-80 highly relevant, 81-100 extremely relevant. \
Give a one-sentence justification per paper. \
Respond with JSON only, exactly in this shape: \
{\"scores\": [{\"paperId\": \"<id>\", \"score\": <0-100>, \"justification\": \"<text>\"}]}";

/// A stored paper to be scored for a brief.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoringTarget {
    pub paper_id: i64,
    /// Identifier shown to the model and expected back as `paperId`.
    pub external_id: String,
    pub title: String,
    pub abstract_text: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "status", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum BatchStatus {
    Scored { updated: usize },
    Failed { error: String },
    /// Not dispatched because the run was cancelled.
    Skipped,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BatchOutcome {
    pub index: usize,
    pub size: usize,
    pub status: BatchStatus,
}

#[derive(Debug, Clone, Default, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ScoringReport {
    /// Associations whose score was written.
    pub updated: usize,
    pub batches: Vec<BatchOutcome>,
    /// External ids of targets that received no score in this pass.
    pub unscored: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct ScoreResponse {
    scores: Vec<ScoreEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ScoreEntry {
    #[serde(deserialize_with = "id_as_string")]
    paper_id: String,
    score: f64,
    #[serde(default)]
    justification: String,
}

fn id_as_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "paperId must be a string, got {}",
            other
        ))),
    }
}

/// Contiguous ranges covering `len` items in at most `batch_count` batches.
///
/// Batch size is `ceil(len / batch_count)`, at least one, so 40 papers in
/// 4 batches gives four batches of 10.
pub fn partition(len: usize, batch_count: usize) -> Vec<Range<usize>> {
    if len == 0 {
        return Vec::new();
    }
    let size = len.div_ceil(batch_count.max(1)).max(1);
    (0..len)
        .step_by(size)
        .map(|start| start..(start + size).min(len))
        .collect()
}

/// Maps a model score onto the stored integer range.
fn normalize_score(raw: f64) -> Option<u8> {
    raw.is_finite()
        .then(|| raw.round().clamp(0.0, f64::from(MAX_SCORE)) as u8)
}

/// Parses one batch response into `(paperId, score, justification)` triples.
pub fn parse_scores(response: &str) -> Result<Vec<(String, u8, String)>, ScoringError> {
    let json = extract_json(response)
        .ok_or_else(|| ScoringError::Parse("no JSON object in response".to_string()))?;
    let parsed: ScoreResponse =
        serde_json::from_str(json).map_err(|e| ScoringError::Parse(e.to_string()))?;

    Ok(parsed
        .scores
        .into_iter()
        .filter_map(|entry| {
            normalize_score(entry.score).map(|score| (entry.paper_id, score, entry.justification))
        })
        .collect())
}

pub struct RelevancyScorer {
    model: Arc<dyn LanguageModel>,
    guard: CallGuard,
    db: Database,
    batch_count: usize,
}

impl RelevancyScorer {
    pub fn new(
        model: Arc<dyn LanguageModel>,
        guard: CallGuard,
        db: Database,
        batch_count: usize,
    ) -> Self {
        Self {
            model,
            guard,
            db,
            batch_count: batch_count.max(1),
        }
    }

    pub fn batch_count(&self) -> usize {
        self.batch_count
    }

    /// Scores `targets` for `brief_id`, one model call per batch, in order.
    ///
    /// Never fails as a whole: every problem is contained to its batch and
    /// shows up in the returned report.
    pub async fn score(
        &self,
        run_id: &str,
        brief_id: &str,
        question: &str,
        targets: &[ScoringTarget],
        progress: &dyn ProgressReporter,
        cancel: &CancellationToken,
    ) -> ScoringReport {
        let mut report = ScoringReport::default();
        let mut scored: HashSet<i64> = HashSet::new();

        for (index, range) in partition(targets.len(), self.batch_count)
            .into_iter()
            .enumerate()
        {
            let batch = &targets[range];

            if cancel.is_cancelled() {
                report.batches.push(BatchOutcome {
                    index,
                    size: batch.len(),
                    status: BatchStatus::Skipped,
                });
                continue;
            }

            let status = match self.score_batch(brief_id, question, batch).await {
                Ok(updated_ids) => {
                    let updated = updated_ids.len();
                    scored.extend(updated_ids);
                    log::info!(
                        "Scoring batch {} updated {}/{} papers",
                        index + 1,
                        updated,
                        batch.len()
                    );
                    progress.report(RunEvent::BatchScored {
                        run_id: run_id.to_string(),
                        batch: index,
                        updated,
                    });
                    BatchStatus::Scored { updated }
                }
                Err(e) => {
                    log::warn!("Scoring batch {} discarded: {}", index + 1, e);
                    progress.report(RunEvent::BatchFailed {
                        run_id: run_id.to_string(),
                        batch: index,
                        error: e.to_string(),
                    });
                    BatchStatus::Failed {
                        error: e.to_string(),
                    }
                }
            };
            report.batches.push(BatchOutcome {
                index,
                size: batch.len(),
                status,
            });
        }

        report.updated = scored.len();
        report.unscored = targets
            .iter()
            .filter(|t| !scored.contains(&t.paper_id))
            .map(|t| t.external_id.clone())
            .collect();
        report
    }

    /// Returns the paper ids whose association was updated.
    async fn score_batch(
        &self,
        brief_id: &str,
        question: &str,
        batch: &[ScoringTarget],
    ) -> Result<Vec<i64>, ScoringError> {
        let messages = vec![
            ChatMessage::system(SYSTEM_PROMPT),
            ChatMessage::user(user_prompt(question, batch)),
        ];
        let options = CompletionOptions::json();

        let response = self
            .guard
            .run("relevancy scoring", || {
                self.model.complete(&messages, &options)
            })
            .await?;

        let entries = parse_scores(&response)?;

        // paperId is only matched within this batch.
        let by_external: HashMap<&str, i64> = batch
            .iter()
            .map(|t| (t.external_id.as_str(), t.paper_id))
            .collect();

        let mut updated = Vec::new();
        for (external_id, score, justification) in entries {
            let Some(&paper_id) = by_external.get(external_id.trim()) else {
                log::debug!("Ignoring score for unknown paper '{}'", external_id);
                continue;
            };
            match association_repo::update_relevancy(
                &self.db,
                brief_id,
                paper_id,
                score,
                &justification,
            ) {
                Ok(true) => {
                    if !updated.contains(&paper_id) {
                        updated.push(paper_id);
                    }
                }
                Ok(false) => log::warn!("No association for paper {} in brief {}", paper_id, brief_id),
                Err(e) => log::error!("Failed to store score for paper {}: {}", paper_id, e),
            }
        }
        Ok(updated)
    }
}

fn user_prompt(question: &str, batch: &[ScoringTarget]) -> String {
    let papers: Vec<serde_json::Value> = batch
        .iter()
        .map(|t| {
            serde_json::json!({
                "id": t.external_id,
                "title": t.title,
                "abstract": t.abstract_text,
            })
        })
        .collect();
    format!(
        "Research question: {}\n\nPapers:\n{}",
        question,
        serde_json::Value::Array(papers)
    )
}
