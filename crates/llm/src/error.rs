//! Provider-level errors and how they map onto pipeline faults.

use std::time::Duration;

use pipeline::{RetryPolicy, ServiceError};

/// Errors from LLM provider calls.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("rate limited (retry after {retry_after:?}s)")]
    RateLimited { retry_after: Option<u64> },

    #[error("invalid response: {0}")]
    InvalidResponse(String),

    #[error("missing API key: {0}")]
    MissingApiKey(String),

    #[error("invalid provider configuration: {0}")]
    Configuration(String),
}

impl LlmError {
    /// Whether re-sending the same request could succeed.
    pub fn retry_policy(&self) -> RetryPolicy {
        match self {
            Self::Http(_) => RetryPolicy::Retryable { after: None },
            Self::Api { status, .. } if *status >= 500 => RetryPolicy::Retryable { after: None },
            Self::RateLimited { retry_after } => RetryPolicy::Retryable {
                after: retry_after.map(Duration::from_secs),
            },
            Self::Api { .. }
            | Self::InvalidResponse(_)
            | Self::MissingApiKey(_)
            | Self::Configuration(_) => RetryPolicy::NonRetryable,
        }
    }
}

impl From<LlmError> for ServiceError {
    fn from(err: LlmError) -> Self {
        match err {
            LlmError::Http(e) if e.is_timeout() => ServiceError::Transport {
                message: format!("request timed out: {e}"),
            },
            LlmError::Api { status, .. } if status == 401 || status == 403 => {
                ServiceError::Unavailable {
                    message: err.to_string(),
                }
            }
            LlmError::InvalidResponse(message) => ServiceError::MalformedResponse { message },
            LlmError::MissingApiKey(_) | LlmError::Configuration(_) => ServiceError::Unavailable {
                message: err.to_string(),
            },
            other => ServiceError::Transport {
                message: other.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_limit_carries_delay() {
        let err = LlmError::RateLimited {
            retry_after: Some(30),
        };
        assert_eq!(
            err.retry_policy(),
            RetryPolicy::Retryable {
                after: Some(Duration::from_secs(30))
            }
        );
    }

    #[test]
    fn client_errors_are_not_retried() {
        let err = LlmError::Api {
            status: 400,
            message: "bad request".into(),
        };
        assert_eq!(err.retry_policy(), RetryPolicy::NonRetryable);

        let err = LlmError::Api {
            status: 503,
            message: "overloaded".into(),
        };
        assert!(err.retry_policy().is_retryable());
    }

    #[test]
    fn auth_failure_maps_to_unavailable() {
        let err = LlmError::Api {
            status: 401,
            message: "invalid api key".into(),
        };
        let service: ServiceError = err.into();
        assert!(matches!(service, ServiceError::Unavailable { .. }));
        assert!(service.to_string().contains("401"));
    }

    #[test]
    fn invalid_response_maps_to_malformed() {
        let service: ServiceError = LlmError::InvalidResponse("no choices".into()).into();
        assert_eq!(
            service,
            ServiceError::MalformedResponse {
                message: "no choices".into()
            }
        );
    }
}
