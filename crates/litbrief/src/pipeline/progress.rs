use std::sync::{Arc, Mutex};

use serde::Serialize;
use tokio::sync::broadcast;

use crate::db::{query_repo, Database};
use crate::models::QueryStatus;

use super::context::{RunPhase, RunSummary};

/// Events emitted while a run progresses.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum RunEvent {
    PhaseChanged {
        run_id: String,
        phase: RunPhase,
    },
    QueryStatusChanged {
        run_id: String,
        query_id: String,
        query: String,
        status: QueryStatus,
        error: Option<String>,
    },
    CandidatesFound {
        run_id: String,
        query_id: String,
        count: usize,
    },
    PersistFailed {
        run_id: String,
        external_id: String,
        error: String,
    },
    BatchScored {
        run_id: String,
        batch: usize,
        updated: usize,
    },
    BatchFailed {
        run_id: String,
        batch: usize,
        error: String,
    },
    Completed {
        summary: Box<RunSummary>,
    },
    Failed {
        run_id: String,
        error: String,
    },
}

pub trait ProgressReporter: Send + Sync {
    fn report(&self, event: RunEvent);
}

/// No-op reporter for tests and fire-and-forget callers.
pub struct NoopProgress;

impl ProgressReporter for NoopProgress {
    fn report(&self, _event: RunEvent) {}
}

/// Fans run events out to any number of subscribers.
#[derive(Clone)]
pub struct BroadcastProgress {
    sender: Arc<broadcast::Sender<RunEvent>>,
}

impl BroadcastProgress {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender: Arc::new(sender),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<RunEvent> {
        self.sender.subscribe()
    }
}

impl ProgressReporter for BroadcastProgress {
    fn report(&self, event: RunEvent) {
        // No active receivers is fine
        let _ = self.sender.send(event);
    }
}

/// Collects events in memory.
#[derive(Default)]
pub struct CollectingProgress {
    events: Mutex<Vec<RunEvent>>,
}

impl CollectingProgress {
    pub fn events(&self) -> Vec<RunEvent> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }
}

impl ProgressReporter for CollectingProgress {
    fn report(&self, event: RunEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}

/// Writes query status transitions to the store before forwarding every event.
pub(crate) struct QueryStatusRecorder<'a> {
    db: &'a Database,
    inner: &'a dyn ProgressReporter,
}

impl<'a> QueryStatusRecorder<'a> {
    pub(crate) fn new(db: &'a Database, inner: &'a dyn ProgressReporter) -> Self {
        Self { db, inner }
    }
}

impl ProgressReporter for QueryStatusRecorder<'_> {
    fn report(&self, event: RunEvent) {
        if let RunEvent::QueryStatusChanged {
            ref query_id,
            status,
            ref error,
            ..
        } = event
        {
            match query_repo::update_status(self.db, query_id, status, error.as_deref()) {
                Ok(true) => {}
                Ok(false) => log::warn!("Status change for unknown query {}", query_id),
                Err(e) => log::error!("Failed to record status of query {}: {}", query_id, e),
            }
        }
        self.inner.report(event);
    }
}
