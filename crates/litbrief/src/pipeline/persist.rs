use serde::Serialize;

use crate::db::{association_repo, now_rfc3339, paper_repo, Database, DatabaseError};
use crate::models::CandidatePaper;

use super::error::PersistenceError;
use super::progress::{ProgressReporter, RunEvent};

/// A candidate that is now stored and associated with the brief.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PersistedPaper {
    pub paper_id: i64,
    pub external_id: String,
    pub title: String,
    pub abstract_text: String,
    /// False when the paper already existed from an earlier run or brief.
    pub paper_created: bool,
    pub association_created: bool,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PersistFailure {
    pub external_id: String,
    pub error: String,
}

impl From<&PersistenceError> for PersistFailure {
    fn from(e: &PersistenceError) -> Self {
        Self {
            external_id: e.external_id.clone(),
            error: e.source.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PersistReport {
    pub persisted: Vec<PersistedPaper>,
    pub failures: Vec<PersistFailure>,
}

impl PersistReport {
    pub fn new_papers(&self) -> usize {
        self.persisted.iter().filter(|p| p.paper_created).count()
    }

    pub fn new_associations(&self) -> usize {
        self.persisted.iter().filter(|p| p.association_created).count()
    }
}

/// Stores candidates as Papers and brief Associations, insert-if-absent.
pub struct PersistenceLayer {
    db: Database,
    max_attempts: u32,
}

impl PersistenceLayer {
    pub fn new(db: Database, max_attempts: u32) -> Self {
        Self {
            db,
            max_attempts: max_attempts.max(1),
        }
    }

    /// Persists each candidate in its own transaction. A failing candidate is
    /// retried, then reported; the others are unaffected.
    pub fn persist(
        &self,
        run_id: &str,
        brief_id: &str,
        candidates: &[CandidatePaper],
        progress: &dyn ProgressReporter,
    ) -> PersistReport {
        let mut report = PersistReport::default();

        for candidate in candidates {
            match self.persist_one(brief_id, candidate) {
                Ok(paper) => report.persisted.push(paper),
                Err(e) => {
                    log::error!("{}", e);
                    progress.report(RunEvent::PersistFailed {
                        run_id: run_id.to_string(),
                        external_id: e.external_id.clone(),
                        error: e.source.to_string(),
                    });
                    report.failures.push(PersistFailure::from(&e));
                }
            }
        }

        log::info!(
            "Persisted {} papers for brief {} ({} new, {} failed)",
            report.persisted.len(),
            brief_id,
            report.new_papers(),
            report.failures.len()
        );
        report
    }

    fn persist_one(
        &self,
        brief_id: &str,
        candidate: &CandidatePaper,
    ) -> Result<PersistedPaper, PersistenceError> {
        let mut attempt = 1;
        loop {
            match self.store(brief_id, candidate) {
                Ok(paper) => return Ok(paper),
                Err(e) if attempt < self.max_attempts => {
                    log::warn!(
                        "Persisting {} failed (attempt {}/{}): {}",
                        candidate.external_id,
                        attempt,
                        self.max_attempts,
                        e
                    );
                    attempt += 1;
                }
                Err(e) => {
                    return Err(PersistenceError {
                        external_id: candidate.external_id.clone(),
                        attempts: attempt,
                        source: e,
                    })
                }
            }
        }
    }

    fn store(
        &self,
        brief_id: &str,
        candidate: &CandidatePaper,
    ) -> Result<PersistedPaper, DatabaseError> {
        let now = now_rfc3339();
        self.db.with_transaction(|conn| {
            let (paper_id, paper_created) = paper_repo::insert_if_absent(conn, candidate, &now)?;
            let (_, association_created) = association_repo::insert_if_absent(
                conn,
                brief_id,
                paper_id,
                std::slice::from_ref(&candidate.query),
                None,
                &now,
            )?;
            Ok(PersistedPaper {
                paper_id,
                external_id: candidate.external_id.clone(),
                title: candidate.title.clone(),
                abstract_text: candidate.abstract_text.clone(),
                paper_created,
                association_created,
            })
        })
    }
}
