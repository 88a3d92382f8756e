//! Stage runners.
//!
//! Each runner owns one stage's retry loop and mutates the run's
//! [`pipeline::RequestState`] through an exclusive borrow. A runner returns
//! `Ok(())` when its stage succeeded and the [`pipeline::PipelineError`] that
//! ends the run otherwise. Collaborator faults never escape a runner: they are
//! logged into the state and consume the attempt.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use pipeline::{
    CodeGenerator, CodeReviewer, PipelineConfig, ReferenceVerifier, ServiceError, SyntaxValidator,
};

mod generation;
mod reference;
mod review;
mod syntax;

/// The collaborators a run talks to, chosen once at construction.
pub(crate) struct Collaborators {
    pub generator: Arc<dyn CodeGenerator>,
    pub syntax: Arc<dyn SyntaxValidator>,
    pub references: Arc<dyn ReferenceVerifier>,
    pub reviewer: Option<Arc<dyn CodeReviewer>>,
}

/// Borrowed view over everything a stage runner needs.
#[derive(Clone, Copy)]
pub(crate) struct StageRunner<'a> {
    collaborators: &'a Collaborators,
    config: &'a PipelineConfig,
}

impl<'a> StageRunner<'a> {
    pub fn new(collaborators: &'a Collaborators, config: &'a PipelineConfig) -> Self {
        Self {
            collaborators,
            config,
        }
    }

    fn timeout(&self) -> Duration {
        self.config.collaborator_timeout()
    }
}

/// Bounds one collaborator call; running out of time is a fault like any other.
async fn bounded<T, F>(limit: Duration, call: F) -> Result<T, ServiceError>
where
    F: Future<Output = Result<T, ServiceError>>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result,
        Err(_) => Err(ServiceError::Timeout { after: limit }),
    }
}
