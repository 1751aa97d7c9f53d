//! Error taxonomy.
//!
//! Batch-level problems (`ValidationError`) are returned to the caller.
//! Per-task problems (`TaskError`) are captured inside the report and never
//! propagate out of a fan-out batch.

use crate::models::AnalysisKind;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Kind of failure reported by the completion service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceErrorKind {
    /// Missing or rejected credentials.
    Auth,
    /// The provider asked us to slow down.
    RateLimited,
    /// Connection problems and 5xx responses.
    TransientNetwork,
    /// Malformed request, unknown model and other 4xx responses.
    InvalidRequest,
    /// The call did not finish within its timeout.
    Timeout,
}

impl ServiceErrorKind {
    /// Whether a call failing with this kind may be retried.
    pub fn is_transient(self) -> bool {
        matches!(
            self,
            ServiceErrorKind::RateLimited
                | ServiceErrorKind::TransientNetwork
                | ServiceErrorKind::Timeout
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ServiceErrorKind::Auth => "auth",
            ServiceErrorKind::RateLimited => "rate_limited",
            ServiceErrorKind::TransientNetwork => "transient_network",
            ServiceErrorKind::InvalidRequest => "invalid_request",
            ServiceErrorKind::Timeout => "timeout",
        }
    }
}

impl fmt::Display for ServiceErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned by a single completion call.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{kind}: {message}")]
pub struct ServiceError {
    pub kind: ServiceErrorKind,
    pub message: String,
}

impl ServiceError {
    pub fn new(kind: ServiceErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn auth(message: impl Into<String>) -> Self {
        Self::new(ServiceErrorKind::Auth, message)
    }

    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self::new(ServiceErrorKind::RateLimited, message)
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(ServiceErrorKind::TransientNetwork, message)
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(ServiceErrorKind::InvalidRequest, message)
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(ServiceErrorKind::Timeout, message)
    }

    pub fn is_transient(&self) -> bool {
        self.kind.is_transient()
    }
}

/// Bad caller input for a fan-out batch. Fatal, never retried.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("at least one work item is required")]
    NoWorkItems,

    #[error("at least one analysis kind is required")]
    NoAnalysisKinds,

    #[error("concurrency limit must be at least 1")]
    ZeroConcurrency,

    #[error("work item '{0}' appears more than once")]
    DuplicateWorkItem(String),

    #[error("analysis kind '{0}' appears more than once")]
    DuplicateAnalysisKind(AnalysisKind),
}

/// Settled failure of one fan-out task.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "error", rename_all = "snake_case")]
pub enum TaskError {
    /// Retryable failure that was still failing after the last attempt.
    #[error("transient service error after {attempts} attempt(s): {source}")]
    TransientServiceError { attempts: u32, source: ServiceError },

    /// Non-retryable failure; the call was made exactly once.
    #[error("permanent service error: {source}")]
    PermanentServiceError { source: ServiceError },
}

impl TaskError {
    /// Classify the final error of a call that made `attempts` attempts.
    pub fn from_service(source: ServiceError, attempts: u32) -> Self {
        if source.is_transient() {
            TaskError::TransientServiceError { attempts, source }
        } else {
            TaskError::PermanentServiceError { source }
        }
    }

    pub fn service_error(&self) -> &ServiceError {
        match self {
            TaskError::TransientServiceError { source, .. } => source,
            TaskError::PermanentServiceError { source } => source,
        }
    }

    pub fn is_permanent(&self) -> bool {
        matches!(self, TaskError::PermanentServiceError { .. })
    }
}

/// The decision step could not turn a reply into a known action.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClassificationError {
    #[error("reply contains no action number: {reply:?}")]
    Unparseable { reply: String },

    #[error("action {value} is outside the known range {min}-{max}")]
    OutOfRange { value: i64, min: u8, max: u8 },

    #[error("classification call failed: {0}")]
    Service(ServiceError),
}

/// A stage of a sequential pipeline failed; later stages were not run.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("chain aborted at stage {stage} ({stage_name}): {source}")]
pub struct ChainAbortError {
    /// 1-based position of the failing stage.
    pub stage: usize,
    pub stage_name: String,
    pub source: ServiceError,
}

/// Failure of a work source. Always reported for the whole fetch.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("work source returned no items")]
    Empty,

    #[error("request for {ticker} failed: {source}")]
    Http {
        ticker: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("quote service returned {status} for {ticker}")]
    Status { ticker: String, status: u16 },

    #[error("quote for {ticker} is missing {field}")]
    MissingField { ticker: String, field: &'static str },

    #[error("quote service error for {ticker}: {message}")]
    Upstream { ticker: String, message: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_kinds() {
        assert!(ServiceErrorKind::RateLimited.is_transient());
        assert!(ServiceErrorKind::TransientNetwork.is_transient());
        assert!(ServiceErrorKind::Timeout.is_transient());
        assert!(!ServiceErrorKind::Auth.is_transient());
        assert!(!ServiceErrorKind::InvalidRequest.is_transient());
    }

    #[test]
    fn test_task_error_classification() {
        let err = TaskError::from_service(ServiceError::rate_limited("slow down"), 3);
        assert_eq!(
            err,
            TaskError::TransientServiceError {
                attempts: 3,
                source: ServiceError::rate_limited("slow down"),
            }
        );

        let err = TaskError::from_service(ServiceError::auth("bad key"), 1);
        assert!(err.is_permanent());
        assert_eq!(err.service_error().kind, ServiceErrorKind::Auth);
    }

    #[test]
    fn test_task_error_serializes_with_tag() {
        let err = TaskError::PermanentServiceError {
            source: ServiceError::invalid_request("unknown model"),
        };
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["error"], "permanent_service_error");
        assert_eq!(json["source"]["kind"], "invalid_request");
    }

    #[test]
    fn test_chain_abort_message() {
        let err = ChainAbortError {
            stage: 2,
            stage_name: "generate_solution".to_string(),
            source: ServiceError::auth("revoked"),
        };
        assert_eq!(
            err.to_string(),
            "chain aborted at stage 2 (generate_solution): auth: revoked"
        );
    }
}
