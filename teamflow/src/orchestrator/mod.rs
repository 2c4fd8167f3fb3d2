//! Run coordination.
//!
//! The [`Orchestrator`] owns the only write path into the
//! [`ProjectStore`]. A run resolves its stages, invokes each capability
//! once its dependencies have succeeded, retries transient failures,
//! and skips every dependent of a stage that failed.
//!
//! ```rust,ignore
//! let team = Orchestrator::new(CapabilityRegistry::standard(generator, search));
//! let summary = team.orchestrate("Build a todo app", Some("planning")).await?;
//! assert_eq!(summary.status, RunStatus::Completed);
//! ```

mod summary;

pub use summary::{PlannedStage, RunPlan, RunSummary, StageReport};

use crate::agents::{Capability, CapabilityRegistry, StageInput};
use crate::cancellation::CancellationToken;
use crate::config::{ExecutionStrategy, TeamConfig};
use crate::core::{Artifact, ErrorClass, ExecutionMode, ProjectRequest, StageId, StageResult, StageStatus};
use crate::errors::{CapabilityError, ConcurrentRunError, TeamflowError};
use crate::events::{EventSink, NoOpEventSink, TeamEvent};
use crate::export::{write_to_directory, ExportedFile, Exporter, WriteReport};
use crate::observability::{run_span, stage_span, SpanTimer};
use crate::pipeline::{overall_status, with_retry, FailureCollector, ModeResolver};
use crate::state::{ProjectState, ProjectStore, StatusSummary};
use futures::stream::{FuturesUnordered, StreamExt};
use serde_json::json;
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn, Instrument};
use uuid::Uuid;

/// Published under the `active` lock together with taking the run lock,
/// so a reset that sees the run lock held always finds the token.
#[derive(Debug)]
struct ActiveRun {
    run_id: Option<Uuid>,
    token: Arc<CancellationToken>,
}

/// Coordinates the team: one run at a time over a shared project store.
pub struct Orchestrator {
    registry: CapabilityRegistry,
    resolver: ModeResolver,
    store: Arc<ProjectStore>,
    config: TeamConfig,
    events: Arc<dyn EventSink>,
    run_lock: tokio::sync::Mutex<()>,
    active: parking_lot::Mutex<Option<ActiveRun>>,
}

impl fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Orchestrator")
            .field("registry", &self.registry)
            .field("config", &self.config)
            .field("active_run", &self.active_run_id())
            .finish_non_exhaustive()
    }
}

impl Orchestrator {
    /// Creates an orchestrator over `registry` with default configuration.
    #[must_use]
    pub fn new(registry: CapabilityRegistry) -> Self {
        Self {
            registry,
            resolver: ModeResolver::default(),
            store: Arc::new(ProjectStore::new()),
            config: TeamConfig::default(),
            events: Arc::new(NoOpEventSink),
            run_lock: tokio::sync::Mutex::new(()),
            active: parking_lot::Mutex::new(None),
        }
    }

    /// Sets the configuration.
    #[must_use]
    pub fn with_config(mut self, config: TeamConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the mode resolver.
    #[must_use]
    pub fn with_resolver(mut self, resolver: ModeResolver) -> Self {
        self.resolver = resolver;
        self
    }

    /// Sets the event sink.
    #[must_use]
    pub fn with_event_sink(mut self, events: Arc<dyn EventSink>) -> Self {
        self.events = events;
        self
    }

    /// Shares an existing store.
    #[must_use]
    pub fn with_store(mut self, store: Arc<ProjectStore>) -> Self {
        self.store = store;
        self
    }

    /// The configuration.
    #[must_use]
    pub fn config(&self) -> &TeamConfig {
        &self.config
    }

    /// The capability registry.
    #[must_use]
    pub fn registry(&self) -> &CapabilityRegistry {
        &self.registry
    }

    /// The mode resolver.
    #[must_use]
    pub fn resolver(&self) -> &ModeResolver {
        &self.resolver
    }

    /// The project store.
    #[must_use]
    pub fn store(&self) -> &Arc<ProjectStore> {
        &self.store
    }

    /// Current project state.
    #[must_use]
    pub fn snapshot(&self) -> Arc<ProjectState> {
        self.store.snapshot()
    }

    /// Status view of the current project. Never blocks on a run.
    #[must_use]
    pub fn status(&self) -> StatusSummary {
        self.store.snapshot().status_summary()
    }

    /// Human-readable summary of the current project.
    #[must_use]
    pub fn project_summary(&self) -> String {
        self.status().render_text()
    }

    /// Id of the run or stage call in progress, if any.
    #[must_use]
    pub fn active_run_id(&self) -> Option<Uuid> {
        self.active.lock().as_ref().and_then(|a| a.run_id)
    }

    /// Resolves what `orchestrate` would run, without running it.
    ///
    /// Takes no lock, leaves the project state untouched, and invokes no
    /// capability, so it may be called during a run.
    ///
    /// # Errors
    ///
    /// Returns [`TeamflowError::InvalidMode`] for an unrecognized mode.
    pub fn plan(&self, request_text: &str, mode: Option<&str>) -> Result<RunPlan, TeamflowError> {
        let mode = parse_mode(mode)?;
        let effective = self.resolver.effective_mode(mode, request_text);
        let resolved = self.resolver.resolve(effective, request_text);
        Ok(RunPlan::new(
            request_text,
            mode,
            effective,
            self.resolver.complexity(request_text),
            self.resolver.graph(),
            &resolved,
        ))
    }

    /// Runs the team on `request_text`.
    ///
    /// `mode` defaults to `full`. Stage failures never abort the run; they
    /// are reported per stage in the returned summary.
    ///
    /// # Errors
    ///
    /// - [`TeamflowError::InvalidMode`] for an unrecognized mode
    /// - [`TeamflowError::ConcurrentRun`] while another run is active
    ///
    /// Neither touches the project state.
    pub async fn orchestrate(&self, request_text: &str, mode: Option<&str>) -> Result<RunSummary, TeamflowError> {
        let mode = parse_mode(mode)?;
        let effective = self.resolver.effective_mode(mode, request_text);
        let resolved = self.resolver.resolve(effective, request_text);
        let request = ProjectRequest::new(request_text, mode);
        let run_id = request.run_id;
        let (_guard, token) = self.acquire(Some(run_id))?;
        self.store.begin(request, resolved.clone());

        let timer = SpanTimer::start();
        let input = StageInput::new(request_text);
        async {
            info!(%effective, stages = resolved.len(), "Run started");
            self.events
                .emit(
                    TeamEvent::RunStarted.as_str(),
                    Some(json!({
                        "run_id": run_id,
                        "mode": mode,
                        "effective_mode": effective,
                        "stages": resolved,
                    })),
                )
                .await;

            self.execute_run(run_id, &resolved, &input, &token).await;

            let status = overall_status(&self.store.snapshot().results);
            self.store.set_status(status);
            info!(%status, duration_ms = timer.elapsed_ms(), "Run finished");
        }
        .instrument(run_span(run_id, mode))
        .await;

        self.deactivate();
        let summary = RunSummary::from_state(
            &self.store.snapshot(),
            mode,
            effective,
            self.config.export.preview_chars,
            timer.elapsed_ms(),
        );
        self.events
            .emit(
                TeamEvent::RunCompleted.as_str(),
                Some(json!({ "run_id": run_id, "status": summary.status })),
            )
            .await;
        Ok(summary)
    }

    /// Runs a single stage against the current project, creating an
    /// ad-hoc project from `input.request_text` when idle.
    ///
    /// The result replaces any earlier result for the stage. A missing
    /// dependency or capability failure comes back as a failed
    /// [`StageResult`], not an error.
    ///
    /// # Errors
    ///
    /// - [`TeamflowError::ConcurrentRun`] while a run is active
    /// - [`TeamflowError::InvalidArguments`] for a blank request while idle
    pub async fn run_stage(&self, stage: StageId, input: StageInput) -> Result<StageResult, TeamflowError> {
        let (_guard, token) = self.acquire(None)?;

        if input.request_text.trim().is_empty() && self.store.snapshot().is_idle() {
            self.deactivate();
            return Err(TeamflowError::InvalidArguments {
                tool: stage.agent_name().to_string(),
                message: "a request is required when no project is active".to_string(),
            });
        }

        let state = self.store.ensure_project(&input.request_text);
        let run_id = state.request.as_ref().map_or_else(Uuid::new_v4, |r| r.run_id);
        if let Some(active) = self.active.lock().as_mut() {
            active.run_id = Some(run_id);
        }
        let input = if input.request_text.trim().is_empty() {
            StageInput {
                request_text: state.description().unwrap_or_default().to_string(),
                ..input
            }
        } else {
            input
        };

        let result = self.execute_stage(run_id, stage, state, &input, &token).await;
        self.deactivate();

        self.record(run_id, result.clone()).await;
        self.store
            .set_status(overall_status(&self.store.snapshot().results));
        Ok(result)
    }

    /// Clears the project back to idle.
    ///
    /// Cancels the active run, if any, and waits for it to stop before
    /// clearing.
    pub async fn reset(&self) {
        let held = {
            let active = self.active.lock();
            match self.run_lock.try_lock() {
                Ok(guard) => Some(guard),
                Err(_) => {
                    if let Some(run) = active.as_ref() {
                        info!("Cancelling active run for project reset");
                        run.token.cancel("project reset");
                    }
                    None
                }
            }
        };
        let _guard = match held {
            Some(guard) => guard,
            None => self.run_lock.lock().await,
        };
        self.store.reset();
        info!("Project reset");
        self.events.emit(TeamEvent::ProjectReset.as_str(), None).await;
    }

    /// Export file set for the current project.
    ///
    /// `include_docs` overrides the configured default.
    ///
    /// # Errors
    ///
    /// Returns [`TeamflowError::NothingToExport`] when idle.
    pub fn export(&self, include_docs: Option<bool>) -> Result<Vec<ExportedFile>, TeamflowError> {
        let mut config = self.config.export.clone();
        if let Some(include_docs) = include_docs {
            config.include_docs = include_docs;
        }
        Ok(Exporter::new(config).export(&self.store.snapshot())?)
    }

    /// Exports and writes the project under `dir`, or the configured
    /// output directory.
    ///
    /// # Errors
    ///
    /// Returns [`TeamflowError::NothingToExport`] when idle, or an IO error.
    pub async fn write_export(
        &self,
        dir: Option<&Path>,
        include_docs: Option<bool>,
    ) -> Result<WriteReport, TeamflowError> {
        let files = self.export(include_docs)?;
        let dir = dir.unwrap_or(&self.config.export.output_directory);
        write_to_directory(dir, &files).await
    }

    /// Takes the run lock and publishes a fresh token in one step.
    fn acquire(
        &self,
        run_id: Option<Uuid>,
    ) -> Result<(tokio::sync::MutexGuard<'_, ()>, Arc<CancellationToken>), ConcurrentRunError> {
        let mut active = self.active.lock();
        let guard = self
            .run_lock
            .try_lock()
            .map_err(|_| ConcurrentRunError::new(active.as_ref().and_then(|a| a.run_id)))?;
        let token = Arc::new(CancellationToken::new());
        *active = Some(ActiveRun {
            run_id,
            token: Arc::clone(&token),
        });
        Ok((guard, token))
    }

    fn deactivate(&self) {
        self.active.lock().take();
    }

    /// Schedules `resolved` until every stage has a result.
    ///
    /// Only this loop writes to the store. Sequential strategy walks the
    /// resolved order one stage at a time; parallel launches every ready
    /// stage and records results in completion order.
    async fn execute_run(
        &self,
        run_id: Uuid,
        resolved: &[StageId],
        input: &StageInput,
        token: &CancellationToken,
    ) {
        let in_order = self.config.strategy == ExecutionStrategy::Sequential;
        let max_in_flight = self.config.strategy.max_in_flight();
        let mut collector = FailureCollector::new();
        let mut pending: Vec<StageId> = resolved.to_vec();
        let mut in_flight = FuturesUnordered::new();

        loop {
            let mut index = 0;
            while index < pending.len() {
                let stage = pending[index];
                let dependencies = self.resolver.graph().dependencies(stage);

                if token.is_cancelled() {
                    pending.remove(index);
                    let result = StageResult::skipped(stage, cancelled_reason(token));
                    collector.record(&result);
                    self.record(run_id, result).await;
                    continue;
                }

                if let Some(blocked) = collector.blocking_dependency(dependencies) {
                    pending.remove(index);
                    collector.record_skip(stage, &blocked);
                    self.record(run_id, StageResult::skipped(stage, blocked.reason()))
                        .await;
                    continue;
                }

                if collector.dependencies_met(dependencies) && in_flight.len() < max_in_flight {
                    pending.remove(index);
                    let state = self.store.snapshot();
                    in_flight.push(self.execute_stage(run_id, stage, state, input, token));
                    if in_order {
                        break;
                    }
                    continue;
                }

                if in_order {
                    break;
                }
                index += 1;
            }

            let Some(result) = in_flight.next().await else {
                break;
            };
            collector.record(&result);
            self.record(run_id, result).await;
        }

        for stage in pending {
            let result = StageResult::skipped(stage, "dependency was not scheduled in this run");
            self.record(run_id, result).await;
        }
    }

    /// Invokes one stage with retry, timeout, and cancellation.
    async fn execute_stage(
        &self,
        run_id: Uuid,
        stage: StageId,
        state: Arc<ProjectState>,
        input: &StageInput,
        token: &CancellationToken,
    ) -> StageResult {
        async move {
            let Some(capability) = self.registry.get(stage) else {
                warn!("No capability registered");
                return StageResult::failed(
                    stage,
                    ErrorClass::Permanent,
                    format!("no capability registered for stage '{stage}'"),
                );
            };

            self.events
                .emit(
                    TeamEvent::StageStarted.as_str(),
                    Some(json!({ "run_id": run_id, "stage": stage })),
                )
                .await;

            let timer = SpanTimer::start();
            let outcome = with_retry(&self.config.retry, stage.as_str(), token, |attempt| {
                let capability = Arc::clone(&capability);
                let state = Arc::clone(&state);
                async move {
                    if attempt > 1 {
                        self.events
                            .emit(
                                TeamEvent::StageRetrying.as_str(),
                                Some(json!({ "run_id": run_id, "stage": stage, "attempt": attempt })),
                            )
                            .await;
                    }
                    self.attempt(capability.as_ref(), &state, input, token).await
                }
            })
            .await;

            let result = match outcome.result {
                Ok(artifact) => StageResult::succeeded(stage, artifact),
                Err(err) if err.class == ErrorClass::Cancelled => {
                    StageResult::skipped(stage, format!("run cancelled: {}", err.message))
                }
                Err(err) => StageResult::from_error(stage, &err),
            };
            result
                .with_attempts(outcome.attempts)
                .with_duration_ms(timer.elapsed_ms())
        }
        .instrument(stage_span(run_id, stage))
        .await
    }

    /// One capability call, raced against the token and the attempt timeout.
    async fn attempt(
        &self,
        capability: &dyn Capability,
        state: &ProjectState,
        input: &StageInput,
        token: &CancellationToken,
    ) -> Result<Artifact, CapabilityError> {
        let call = async {
            match self.config.stage_timeout() {
                Some(limit) => tokio::time::timeout(limit, capability.invoke(state, input))
                    .await
                    .unwrap_or_else(|_| {
                        Err(CapabilityError::transient(format!(
                            "attempt timed out after {} ms",
                            limit.as_millis()
                        )))
                    }),
                None => capability.invoke(state, input).await,
            }
        };

        tokio::select! {
            result = call => result,
            () = token.cancelled() => Err(CapabilityError::cancelled(
                token.reason().unwrap_or_else(|| "run cancelled".to_string()),
            )),
        }
    }

    /// Writes a result and reports it.
    async fn record(&self, run_id: Uuid, result: StageResult) {
        let stage = result.stage;
        let reason = result.reason();
        let event = match result.status {
            StageStatus::Succeeded => {
                info!(%stage, attempts = result.attempts, duration_ms = result.duration_ms, "Stage succeeded");
                TeamEvent::StageSucceeded
            }
            StageStatus::Failed => {
                warn!(%stage, attempts = result.attempts, reason = reason.as_deref(), "Stage failed");
                TeamEvent::StageFailed
            }
            StageStatus::Skipped => {
                warn!(%stage, reason = reason.as_deref(), "Stage skipped");
                TeamEvent::StageSkipped
            }
        };
        let payload = json!({
            "run_id": run_id,
            "stage": stage,
            "attempts": result.attempts,
            "reason": reason,
        });

        self.store.record(result);
        self.events.emit(event.as_str(), Some(payload)).await;
    }
}

fn parse_mode(mode: Option<&str>) -> Result<ExecutionMode, TeamflowError> {
    Ok(match mode {
        Some(raw) => raw.parse::<ExecutionMode>()?,
        None => ExecutionMode::default(),
    })
}

fn cancelled_reason(token: &CancellationToken) -> String {
    format!(
        "run cancelled: {}",
        token.reason().unwrap_or_else(|| "cancelled".to_string())
    )
}
