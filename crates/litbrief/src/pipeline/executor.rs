use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::models::{CandidatePaper, QueryStatus, SearchQuery};
use crate::resilience::CallGuard;
use crate::search::{SearchOptions, SearchRequest, SearchService};

use super::error::QueryExecutionError;
use super::progress::{ProgressReporter, RunEvent};

/// Result of running a run's selected queries.
#[derive(Debug, Default)]
pub struct ExecutionReport {
    /// Candidates of all completed queries, in dispatch order.
    pub candidates: Vec<CandidatePaper>,
    pub failures: Vec<QueryExecutionError>,
    /// Number of queries dispatched (completed or failed).
    pub dispatched: usize,
    /// Set when cancellation stopped dispatch before every selected query ran.
    pub cancelled: bool,
}

/// Runs queries one at a time through a shared rate limiter and retry policy.
pub struct SearchExecutor {
    service: Arc<dyn SearchService>,
    guard: CallGuard,
}

impl SearchExecutor {
    pub fn new(service: Arc<dyn SearchService>, guard: CallGuard) -> Self {
        Self { service, guard }
    }

    /// Executes the selected queries in order, mutating each one's status.
    /// Only `waiting` queries are dispatched; pass [`SearchQuery::fresh_copy`]
    /// to rerun queries from an earlier run.
    ///
    /// A failed query is recorded and the next one still runs. Unselected
    /// queries and queries left behind by cancellation stay `waiting`.
    pub async fn execute(
        &self,
        run_id: &str,
        queries: &mut [SearchQuery],
        options: &SearchOptions,
        progress: &dyn ProgressReporter,
        cancel: &CancellationToken,
    ) -> ExecutionReport {
        let mut report = ExecutionReport::default();

        for query in queries.iter_mut().filter(|q| q.is_selected) {
            if query.status != QueryStatus::Waiting {
                log::debug!(
                    "Skipping query '{}' already {} in run {}",
                    query.query,
                    query.status,
                    run_id
                );
                continue;
            }

            // Wait for the limiter here so cancellation can interrupt the gap.
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {}
                _ = self.guard.limiter().ready() => {}
            }
            if cancel.is_cancelled() {
                log::info!("Run {} cancelled before query '{}'", run_id, query.query);
                report.cancelled = true;
                break;
            }

            query.mark_processing();
            report_status(progress, run_id, query);

            let text = query.query.clone();
            let result = self
                .guard
                .run(&format!("search '{}'", text), || {
                    self.service.search(SearchRequest {
                        query: &text,
                        options,
                    })
                })
                .await;
            report.dispatched += 1;

            match result {
                Ok(candidates) => {
                    log::info!("Query '{}' returned {} papers", text, candidates.len());
                    query.mark_completed();
                    progress.report(RunEvent::CandidatesFound {
                        run_id: run_id.to_string(),
                        query_id: query.id.clone(),
                        count: candidates.len(),
                    });
                    report.candidates.extend(candidates);
                }
                Err(e) => {
                    log::warn!("Query '{}' failed: {}", text, e);
                    query.mark_failed(e.to_string());
                    report.failures.push(QueryExecutionError {
                        query_id: query.id.clone(),
                        query: text,
                        source: e,
                    });
                }
            }
            report_status(progress, run_id, query);
        }

        report
    }
}

fn report_status(progress: &dyn ProgressReporter, run_id: &str, query: &SearchQuery) {
    progress.report(RunEvent::QueryStatusChanged {
        run_id: run_id.to_string(),
        query_id: query.id.clone(),
        query: query.query.clone(),
        status: query.status,
        error: query.error.clone(),
    });
}
