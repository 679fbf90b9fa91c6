use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{info_span, Instrument};

use crate::config::schema::MIN_SEARCH_INTERVAL_MS;
use crate::config::Config;
use crate::db::{paper_repo, query_repo, Database};
use crate::error::LitbriefError;
use crate::llm::{LanguageModel, OpenAiCompatibleClient};
use crate::models::SearchQuery;
use crate::resilience::{CallGuard, RateLimiter};
use crate::search::{ArxivClient, DateRange, SearchOptions, SearchService};

use super::context::{RunContext, RunPhase, RunSummary};
use super::dedup::deduplicate;
use super::error::PipelineError;
use super::executor::SearchExecutor;
use super::generator::QueryGenerator;
use super::persist::PersistenceLayer;
use super::progress::{ProgressReporter, QueryStatusRecorder, RunEvent};
use super::scorer::{RelevancyScorer, ScoringReport, ScoringTarget};

/// Input of one run.
#[derive(Debug, Clone)]
pub struct RunRequest {
    pub brief_id: String,
    pub question: String,
    /// Queries as the user left them; only selected ones are executed.
    pub queries: Vec<SearchQuery>,
    pub options: SearchOptions,
}

/// Releases a brief's single-flight slot on drop.
struct ActiveRun<'a> {
    active: &'a Mutex<HashSet<String>>,
    brief_id: String,
}

impl Drop for ActiveRun<'_> {
    fn drop(&mut self) {
        if let Ok(mut active) = self.active.lock() {
            active.remove(&self.brief_id);
        }
    }
}

/// Sequences generation, search, dedup, persistence and scoring for a brief.
pub struct Orchestrator {
    db: Database,
    generator: QueryGenerator,
    executor: SearchExecutor,
    persistence: PersistenceLayer,
    scorer: RelevancyScorer,
    default_options: SearchOptions,
    active: Mutex<HashSet<String>>,
}

impl Orchestrator {
    /// Builds an orchestrator around injected services.
    ///
    /// Search calls share one rate limiter; language-model calls share another.
    pub fn new(
        db: Database,
        model: Arc<dyn LanguageModel>,
        search: Arc<dyn SearchService>,
        config: &Config,
    ) -> Self {
        let search_guard = CallGuard::new(
            Arc::new(RateLimiter::new(Duration::from_millis(
                config.search.min_interval_ms.max(MIN_SEARCH_INTERVAL_MS),
            ))),
            config.retry.policy(config.search.timeout_secs),
        );
        let llm_guard = CallGuard::new(
            Arc::new(RateLimiter::new(Duration::from_millis(
                config.llm.min_interval_ms,
            ))),
            config.retry.policy(config.llm.timeout_secs),
        );

        Self {
            generator: QueryGenerator::new(
                Arc::clone(&model),
                llm_guard.clone(),
                config.generation.max_queries,
            ),
            executor: SearchExecutor::new(search, search_guard),
            persistence: PersistenceLayer::new(db.clone(), config.persistence.max_attempts),
            scorer: RelevancyScorer::new(model, llm_guard, db.clone(), config.scoring.batch_count),
            default_options: SearchOptions::from_config(&config.search),
            db,
            active: Mutex::new(HashSet::new()),
        }
    }

    /// Production constructor: opens the database and builds the arXiv and
    /// OpenAI-compatible clients from config.
    pub fn from_config(config: &Config) -> Result<Self, LitbriefError> {
        let path = match config.database.path.clone() {
            Some(path) => path,
            None => crate::db::default_database_path().ok_or_else(|| {
                crate::error::ConfigError::Validation {
                    message: "database.path is unset and no home directory was found".to_string(),
                }
            })?,
        };
        let db = Database::open(&path)?;
        let model = Arc::new(OpenAiCompatibleClient::new(&config.llm)?);
        let search = Arc::new(ArxivClient::new(&config.search)?);
        Ok(Self::new(db, model, search, config))
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    /// Search options built from config, for callers assembling a [`RunRequest`].
    pub fn default_options(&self) -> SearchOptions {
        self.default_options.clone()
    }

    /// Generates candidate queries. On failure nothing is mutated.
    pub async fn generate_queries(
        &self,
        question: &str,
        date_range: Option<DateRange>,
    ) -> Result<Vec<SearchQuery>, PipelineError> {
        let queries = self
            .generator
            .generate(question, date_range)
            .instrument(info_span!("generate_queries"))
            .await?;
        Ok(queries)
    }

    /// Runs search, dedup, persistence and scoring for one brief.
    ///
    /// Only one run per brief may be active. Query failures, persistence
    /// failures and scoring failures are contained and show up in the summary.
    pub async fn run(
        &self,
        request: RunRequest,
        progress: &dyn ProgressReporter,
        cancel: &CancellationToken,
    ) -> Result<RunSummary, PipelineError> {
        if request.brief_id.trim().is_empty() {
            return Err(PipelineError::InvalidRequest("brief id is empty".to_string()));
        }
        let _active = self.claim(&request.brief_id)?;

        let run_id = uuid::Uuid::new_v4().to_string();
        let span = info_span!("run", run_id = %run_id, brief_id = %request.brief_id);

        let result = self
            .run_stages(run_id.clone(), request, progress, cancel)
            .instrument(span)
            .await;

        if let Err(ref e) = result {
            progress.report(RunEvent::Failed {
                run_id,
                error: e.to_string(),
            });
        }
        result
    }

    fn claim(&self, brief_id: &str) -> Result<ActiveRun<'_>, PipelineError> {
        let mut active = self.active.lock().map_err(|_| PipelineError::LockPoisoned)?;
        if !active.insert(brief_id.to_string()) {
            log::info!("Run for brief {} refused: another run is in progress", brief_id);
            return Err(PipelineError::RunInProgress(brief_id.to_string()));
        }
        Ok(ActiveRun {
            active: &self.active,
            brief_id: brief_id.to_string(),
        })
    }

    async fn run_stages(
        &self,
        run_id: String,
        request: RunRequest,
        progress: &dyn ProgressReporter,
        cancel: &CancellationToken,
    ) -> Result<RunSummary, PipelineError> {
        let queries: Vec<SearchQuery> = request.queries.iter().map(SearchQuery::fresh_copy).collect();
        for (position, query) in queries.iter().enumerate() {
            query_repo::insert(&self.db, &request.brief_id, &run_id, position as u32, query)?;
        }

        let mut ctx = RunContext::new(
            run_id,
            request.brief_id,
            request.question,
            request.options,
            queries,
        );
        let recorder = QueryStatusRecorder::new(&self.db, progress);

        // Step 1: Search
        let selected = ctx.queries.iter().filter(|q| q.is_selected).count();
        set_phase(
            &mut ctx,
            progress,
            RunPhase::Searching {
                total_queries: selected,
            },
        );
        let execution = self
            .executor
            .execute(&ctx.run_id, &mut ctx.queries, &ctx.options, &recorder, cancel)
            .instrument(info_span!("search"))
            .await;
        ctx.candidates = execution.candidates;
        ctx.cancelled = execution.cancelled;

        // Step 2: Deduplicate
        {
            let _step = info_span!("deduplicate").entered();
            let candidates = ctx.candidates.len();
            set_phase(&mut ctx, progress, RunPhase::Deduplicating { candidates });
            ctx.unique = deduplicate(ctx.candidates.clone());
        }

        // Step 3: Persist
        {
            let _step = info_span!("persist").entered();
            let unique = ctx.unique.len();
            set_phase(&mut ctx, progress, RunPhase::Persisting { unique });
            ctx.persisted = self
                .persistence
                .persist(&ctx.run_id, &ctx.brief_id, &ctx.unique, progress);
        }

        // Step 4: Score
        let targets: Vec<ScoringTarget> = ctx
            .persisted
            .persisted
            .iter()
            .map(|p| ScoringTarget {
                paper_id: p.paper_id,
                external_id: p.external_id.clone(),
                title: p.title.clone(),
                abstract_text: p.abstract_text.clone(),
            })
            .collect();
        let batches = super::scorer::partition(targets.len(), self.scorer.batch_count()).len();
        set_phase(
            &mut ctx,
            progress,
            RunPhase::Scoring {
                papers: targets.len(),
                batches,
            },
        );
        ctx.scoring = self
            .scorer
            .score(
                &ctx.run_id,
                &ctx.brief_id,
                &ctx.question,
                &targets,
                progress,
                cancel,
            )
            .instrument(info_span!("score"))
            .await;
        ctx.cancelled |= cancel.is_cancelled();

        let final_phase = if ctx.cancelled {
            RunPhase::Cancelled
        } else {
            RunPhase::Completed
        };
        set_phase(&mut ctx, progress, final_phase);

        let summary = ctx.into_summary();
        log::info!(
            "Run {} finished: {} found, {} unique, {} new, {} scored, {} failed queries",
            summary.run_id,
            summary.papers_found,
            summary.unique_papers,
            summary.new_papers,
            summary.scoring.updated,
            summary.failed_queries
        );
        progress.report(RunEvent::Completed {
            summary: Box::new(summary.clone()),
        });
        Ok(summary)
    }

    /// Scores a caller-chosen subset of a brief's papers, e.g. to rescore
    /// papers left unscored by an earlier run. Unknown paper ids are skipped.
    pub async fn score_papers(
        &self,
        brief_id: &str,
        question: &str,
        paper_ids: &[i64],
        progress: &dyn ProgressReporter,
        cancel: &CancellationToken,
    ) -> Result<ScoringReport, PipelineError> {
        let _active = self.claim(brief_id)?;

        let mut seen = HashSet::new();
        let mut targets = Vec::with_capacity(paper_ids.len());
        for &paper_id in paper_ids {
            if !seen.insert(paper_id) {
                continue;
            }
            match paper_repo::find_by_id(&self.db, paper_id)? {
                Some(paper) => targets.push(ScoringTarget {
                    paper_id,
                    external_id: paper.external_id,
                    title: paper.title,
                    abstract_text: paper.abstract_text,
                }),
                None => log::warn!("Skipping unknown paper {}", paper_id),
            }
        }

        let run_id = uuid::Uuid::new_v4().to_string();
        let report = self
            .scorer
            .score(&run_id, brief_id, question, &targets, progress, cancel)
            .instrument(info_span!("score", run_id = %run_id, brief_id = %brief_id))
            .await;
        Ok(report)
    }

    /// Brief ids with a run in flight.
    pub fn active_briefs(&self) -> Vec<String> {
        self.active
            .lock()
            .map(|a| a.iter().cloned().collect())
            .unwrap_or_default()
    }
}

fn set_phase(ctx: &mut RunContext, progress: &dyn ProgressReporter, phase: RunPhase) {
    ctx.phase = phase.clone();
    progress.report(RunEvent::PhaseChanged {
        run_id: ctx.run_id.clone(),
        phase,
    });
}
