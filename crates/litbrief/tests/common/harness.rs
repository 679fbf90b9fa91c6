//! Test harness for isolated orchestrator runs.

#![allow(dead_code)]

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use litbrief::pipeline::{CollectingProgress, PipelineError, RunRequest, RunSummary};
use litbrief::{Config, Database, Orchestrator, SearchQuery};

use super::scripted::{ScriptedModel, ScriptedSearch};

pub struct TestHarness {
    pub orchestrator: Orchestrator,
    pub search: Arc<ScriptedSearch>,
    pub model: Arc<ScriptedModel>,
    pub progress: CollectingProgress,
}

impl TestHarness {
    /// Default config: 3000 ms search spacing, 3 attempts, 4 scoring batches.
    pub fn new(search: ScriptedSearch, model: ScriptedModel) -> Self {
        Self::with_config(search, model, Config::default())
    }

    pub fn with_config(search: ScriptedSearch, model: ScriptedModel, config: Config) -> Self {
        let db = Database::open_in_memory().expect("Failed to open in-memory database");
        let search = Arc::new(search);
        let model = Arc::new(model);
        let orchestrator = Orchestrator::new(db, model.clone(), search.clone(), &config);
        Self {
            orchestrator,
            search,
            model,
            progress: CollectingProgress::default(),
        }
    }

    pub fn db(&self) -> &Database {
        self.orchestrator.database()
    }

    pub fn request(&self, brief_id: &str, queries: Vec<SearchQuery>) -> RunRequest {
        RunRequest {
            brief_id: brief_id.to_string(),
            question: "How do transformers scale?".to_string(),
            queries,
            options: self.orchestrator.default_options(),
        }
    }

    pub async fn run(
        &self,
        brief_id: &str,
        queries: Vec<SearchQuery>,
    ) -> Result<RunSummary, PipelineError> {
        let request = self.request(brief_id, queries);
        self.orchestrator
            .run(request, &self.progress, &CancellationToken::new())
            .await
    }
}
