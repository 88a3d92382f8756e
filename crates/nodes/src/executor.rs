//! The pipeline controller.
//!
//! [`PipelineExecutor`] is the only thing that creates or mutates a
//! [`RequestState`]. A run moves strictly forward through
//! generation → syntax check → reference check → (review) and ends in exactly
//! one terminal transition. Every fault is folded into the returned
//! [`FinalResponse`]; `submit` itself cannot fail.

use std::sync::Arc;

use pipeline::{
    compile_failure, compile_success, render_markdown, CodeGenerator, CodeReviewer,
    FinalResponse, PipelineConfig, PipelineError, ReferenceVerifier, RequestId, RequestState,
    SyntaxValidator,
};
use tracing::{info, info_span, Instrument};

use crate::registry::StateRegistry;
use crate::stages::{Collaborators, StageRunner};

/// Per-run switches that override the configured defaults.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunOptions {
    pub enable_review: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            enable_review: true,
        }
    }
}

impl From<&PipelineConfig> for RunOptions {
    fn from(config: &PipelineConfig) -> Self {
        Self {
            enable_review: config.enable_review,
        }
    }
}

// ---------------------------------------------------------------------------
// Executor
// ---------------------------------------------------------------------------

pub struct PipelineExecutor {
    collaborators: Collaborators,
    config: PipelineConfig,
    registry: Arc<StateRegistry>,
}

impl std::fmt::Debug for PipelineExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineExecutor")
            .field("config", &self.config)
            .field("review_available", &self.collaborators.reviewer.is_some())
            .finish_non_exhaustive()
    }
}

impl PipelineExecutor {
    /// Starts a builder with the three collaborators every run needs.
    pub fn builder(
        generator: Arc<dyn CodeGenerator>,
        syntax: Arc<dyn SyntaxValidator>,
        references: Arc<dyn ReferenceVerifier>,
    ) -> PipelineExecutorBuilder {
        PipelineExecutorBuilder {
            collaborators: Collaborators {
                generator,
                syntax,
                references,
                reviewer: None,
            },
            config: PipelineConfig::default(),
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Runs `request` through the pipeline with the configured defaults.
    pub async fn submit(&self, request: &str) -> FinalResponse {
        self.submit_with(request, RunOptions::from(&self.config))
            .await
    }

    /// Runs `request` through the pipeline.
    ///
    /// A snapshot is published when the run starts and replaced when it ends,
    /// so [`lookup`](Self::lookup) can observe in-flight requests.
    ///
    /// Dropping the returned future mid-run publishes the snapshot as failed.
    pub async fn submit_with(&self, request: &str, options: RunOptions) -> FinalResponse {
        let mut run = InFlight::new(RequestState::new(request), self.registry.clone());
        let span = info_span!(
            "pipeline_run",
            request_id = %run.state.request_id(),
            review = options.enable_review,
        );

        async move {
            info!(request_chars = request.chars().count(), "starting request");
            run.publish().await;

            let state = &mut run.state;
            let response = match self.drive(state, options).await {
                Ok(()) => {
                    state.complete();
                    info!(
                        total_attempts = state.attempts().total(),
                        generation_attempts = state.attempts().generation,
                        "request completed"
                    );
                    compile_success(state)
                }
                Err(err) => {
                    state.fail();
                    tracing::error!(
                        error = %err,
                        failed_at_stage = ?state.failed_at_stage(),
                        "request failed"
                    );
                    compile_failure(state, &err)
                }
            };

            run.publish().await;
            run.settled = true;
            response
        }
        .instrument(span)
        .await
    }

    /// Read-only snapshot of a request, if it is still retained.
    pub async fn lookup(&self, id: RequestId) -> Option<RequestState> {
        self.registry.get(id).await
    }

    /// Renders a response as a markdown document.
    pub fn render(&self, response: &FinalResponse) -> String {
        render_markdown(response)
    }

    async fn drive(
        &self,
        state: &mut RequestState,
        options: RunOptions,
    ) -> Result<(), PipelineError> {
        let runner = StageRunner::new(&self.collaborators, &self.config);

        runner.generate(state).await?;
        runner.validate_syntax(state).await?;
        runner.verify_references(state).await?;

        if options.enable_review {
            match self.collaborators.reviewer.as_deref() {
                Some(reviewer) => runner.review(state, reviewer).await,
                None => tracing::debug!("review requested but no reviewer is configured"),
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// In-flight guard
// ---------------------------------------------------------------------------

pub(crate) const CANCELLED: &str = "Request cancelled before completion";

/// Owns the state of a running request until its final snapshot is
/// published. If dropped before that, the run was abandoned by its caller and
/// the snapshot is failed and republished so lookups do not see it running.
struct InFlight {
    state: RequestState,
    registry: Arc<StateRegistry>,
    settled: bool,
}

impl InFlight {
    fn new(state: RequestState, registry: Arc<StateRegistry>) -> Self {
        Self {
            state,
            registry,
            settled: false,
        }
    }

    async fn publish(&self) {
        self.registry.publish(self.state.clone()).await;
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        if self.settled {
            return;
        }
        let mut state = self.state.clone();
        if !state.is_terminal() {
            state.log_error(CANCELLED);
            state.fail();
        }
        tracing::warn!(
            request_id = %state.request_id(),
            failed_at_stage = ?state.failed_at_stage(),
            "request dropped before completion"
        );

        let Err(state) = self.registry.try_publish(state) else {
            return;
        };
        let registry = self.registry.clone();
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move { registry.publish(state).await });
            }
            Err(_) => tracing::warn!(
                request_id = %state.request_id(),
                "no runtime to publish cancelled snapshot"
            ),
        }
    }
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

pub struct PipelineExecutorBuilder {
    collaborators: Collaborators,
    config: PipelineConfig,
}

impl PipelineExecutorBuilder {
    pub fn reviewer(mut self, reviewer: Arc<dyn CodeReviewer>) -> Self {
        self.collaborators.reviewer = Some(reviewer);
        self
    }

    pub fn config(mut self, config: PipelineConfig) -> Self {
        self.config = config;
        self
    }

    /// Validates the configuration and builds the executor.
    pub fn build(self) -> Result<PipelineExecutor, PipelineError> {
        self.config.validate()?;
        let registry = Arc::new(StateRegistry::new(self.config.state_retention_limit));
        info!(
            max_generation_retries = self.config.max_generation_retries,
            max_syntax_retries = self.config.max_syntax_retries,
            max_hallucination_retries = self.config.max_hallucination_retries,
            global_cap = ?self.config.max_total_generation_attempts,
            review_available = self.collaborators.reviewer.is_some(),
            "pipeline executor ready"
        );
        Ok(PipelineExecutor {
            collaborators: self.collaborators,
            config: self.config,
            registry,
        })
    }
}
