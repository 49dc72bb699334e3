//! Error types for dispatch operations and their collaborators.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::WorkloadKind;

/// Errors reported to a dispatch caller.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// The user is not known to the authorizer.
    #[error("authentication failed for user `{0}`")]
    AuthenticationFailed(String),
    /// The user lacks the capability the workload kind requires.
    #[error("permission denied: user `{user}` lacks capability `{capability}`")]
    PermissionDenied {
        /// Requesting user.
        user: String,
        /// Missing capability.
        capability: String,
    },
    /// The workload kind is not recognized or has no pool.
    #[error("unknown workload kind `{0}`")]
    UnknownWorkloadKind(String),
    /// Admission gate for the kind is at capacity.
    #[error("maximum number of active executions reached for {0}")]
    CapacityExceeded(WorkloadKind),
    /// No live execution unit could be checked out.
    #[error("no available execution unit for {0}")]
    NoAvailableUnit(WorkloadKind),
    /// The engine failed while running the workload.
    #[error("an error occurred while executing {0}")]
    ExecutionFailed(WorkloadKind),
    /// The caller cancelled the request.
    #[error("dispatch cancelled")]
    Cancelled,
}

/// Serializable classification of [`DispatchError`] used at the API boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorKind {
    /// See [`DispatchError::AuthenticationFailed`].
    AuthenticationFailed,
    /// See [`DispatchError::PermissionDenied`].
    PermissionDenied,
    /// See [`DispatchError::UnknownWorkloadKind`].
    UnknownWorkloadKind,
    /// See [`DispatchError::CapacityExceeded`].
    CapacityExceeded,
    /// See [`DispatchError::NoAvailableUnit`].
    NoAvailableUnit,
    /// See [`DispatchError::ExecutionFailed`].
    ExecutionFailed,
    /// See [`DispatchError::Cancelled`].
    Cancelled,
}

impl DispatchError {
    /// Classification without the per-request detail.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::AuthenticationFailed(_) => ErrorKind::AuthenticationFailed,
            Self::PermissionDenied { .. } => ErrorKind::PermissionDenied,
            Self::UnknownWorkloadKind(_) => ErrorKind::UnknownWorkloadKind,
            Self::CapacityExceeded(_) => ErrorKind::CapacityExceeded,
            Self::NoAvailableUnit(_) => ErrorKind::NoAvailableUnit,
            Self::ExecutionFailed(_) => ErrorKind::ExecutionFailed,
            Self::Cancelled => ErrorKind::Cancelled,
        }
    }
}

/// Errors raised by an execution unit engine.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum EngineError {
    /// The named unit does not exist.
    #[error("execution unit not found: {0}")]
    NotFound(String),
    /// Engine-specific failure with context.
    #[error("engine failure: {0}")]
    Failed(String),
}

/// Errors raised by a usage ledger backend.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// Underlying storage failed.
    #[error("ledger io error: {0}")]
    Io(#[from] std::io::Error),
    /// Record could not be encoded.
    #[error("ledger encode error: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Application-facing result using anyhow for higher-level contexts.
pub type AppResult<T> = Result<T, anyhow::Error>;
