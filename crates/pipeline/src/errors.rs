//! Top-level error and retry-policy types for the Codesmith pipeline domain.
//!
//! [`PipelineError`] covers conditions that terminate a run. [`ServiceError`]
//! is what a collaborator port returns when the call itself failed (transport,
//! timeout, unparseable output); the stage runners treat it exactly like a
//! semantic failure for retry purposes and never let it escape a run.
//!
//! [`RetryPolicy`] is a cross-cutting concern: infrastructure error types that
//! participate in transport-level retry decisions produce one.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::Stage;

// ---------------------------------------------------------------------------
// Retry semantics
// ---------------------------------------------------------------------------

/// Whether an error condition is safe to retry and, if so, after what delay.
///
/// - `Retryable` errors: timeouts, connection resets, rate-limit responses.
/// - `NonRetryable` errors: authentication failures, malformed requests.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RetryPolicy {
    /// The operation may be retried.
    Retryable {
        /// Minimum back-off before the next attempt (e.g. from `Retry-After`).
        /// `None` means apply the caller's own back-off schedule.
        after: Option<Duration>,
    },
    /// The operation must not be retried.
    NonRetryable,
}

impl RetryPolicy {
    /// Returns `true` for [`RetryPolicy::Retryable`].
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Retryable { .. })
    }
}

// ---------------------------------------------------------------------------
// Collaborator faults
// ---------------------------------------------------------------------------

/// A collaborator call that did not produce a verdict.
#[derive(Debug, Clone, Error, PartialEq, Serialize, Deserialize)]
pub enum ServiceError {
    /// The request never reached the service or the connection failed.
    #[error("transport failure: {message}")]
    Transport {
        /// Underlying error text.
        message: String,
    },

    /// The call did not complete within the configured limit.
    #[error("call timed out after {}s", after.as_secs())]
    Timeout {
        /// The limit that was exceeded.
        after: Duration,
    },

    /// The service answered but the answer could not be interpreted.
    #[error("malformed response: {message}")]
    MalformedResponse {
        /// What was wrong with the response.
        message: String,
    },

    /// The service is not usable (misconfigured, missing credentials, ...).
    #[error("service unavailable: {message}")]
    Unavailable {
        /// Why the service cannot be used.
        message: String,
    },
}

// ---------------------------------------------------------------------------
// Pipeline-level errors
// ---------------------------------------------------------------------------

/// Errors that terminate a run or prevent the pipeline from starting.
#[derive(Debug, Clone, Error, PartialEq, Serialize, Deserialize)]
pub enum PipelineError {
    /// A stage used every attempt of its local budget without succeeding.
    #[error("{stage} stage exhausted its budget of {limit} attempt(s)")]
    BudgetExhausted {
        /// The stage whose budget ran out.
        stage: Stage,
        /// Configured local budget for that stage.
        limit: u32,
    },

    /// The run-wide cap on generation attempts was reached.
    #[error("global generation cap reached: {attempts} of {limit} attempt(s) used")]
    GlobalBudgetExhausted {
        /// Generation attempts made so far.
        attempts: u32,
        /// Configured cap.
        limit: u32,
    },

    /// The pipeline configuration is invalid.
    ///
    /// Produced at load time; the pipeline never starts with an invalid config.
    #[error("Configuration error: {message}")]
    Configuration {
        /// Description of the configuration problem.
        message: String,
    },
}
