use roadwatch_store::StoreError;
use roadwatch_types::{IdentityError, ValidationError};
use roadwatch_verification::LifecycleError;
use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Why an operation conflicted with the current state.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictReason {
    DuplicateVote,
    SelfVote,
    ReportClosed,
    ReportIdTaken,
    RejectionDisabled,
    InsufficientBalance,
}

impl ConflictReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConflictReason::DuplicateVote => "duplicate_vote",
            ConflictReason::SelfVote => "self_vote",
            ConflictReason::ReportClosed => "report_closed",
            ConflictReason::ReportIdTaken => "report_id_taken",
            ConflictReason::RejectionDisabled => "rejection_disabled",
            ConflictReason::InsufficientBalance => "insufficient_balance",
        }
    }
}

impl fmt::Display for ConflictReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("conflict ({reason}): {detail}")]
    Conflict {
        reason: ConflictReason,
        detail: String,
    },

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("backend unavailable: {0}")]
    BackendUnavailable(String),

    /// A state transition produced a record that fails its own invariants.
    /// Nothing was written.
    #[error("internal error: {0}")]
    Internal(String),
}

impl EngineError {
    pub fn conflict(reason: ConflictReason, detail: impl Into<String>) -> Self {
        EngineError::Conflict {
            reason,
            detail: detail.into(),
        }
    }

    /// Machine-readable code for API responses and logs.
    pub fn reason_code(&self) -> &'static str {
        match self {
            EngineError::NotFound(_) => "not_found",
            EngineError::Conflict { reason, .. } => reason.as_str(),
            EngineError::Unauthorized(_) => "unauthorized",
            EngineError::InvalidInput(_) => "invalid_input",
            EngineError::BackendUnavailable(_) => "backend_unavailable",
            EngineError::Internal(_) => "internal",
        }
    }

    /// HTTP-equivalent status.
    pub fn status_code(&self) -> u16 {
        match self {
            EngineError::NotFound(_) => 404,
            EngineError::Conflict { .. } => 409,
            EngineError::Unauthorized(_) => 403,
            EngineError::InvalidInput(_) => 422,
            EngineError::BackendUnavailable(_) => 503,
            EngineError::Internal(_) => 500,
        }
    }

    /// Whether repeating the same request may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, EngineError::BackendUnavailable(_))
    }

    pub fn conflict_reason(&self) -> Option<ConflictReason> {
        match self {
            EngineError::Conflict { reason, .. } => Some(*reason),
            _ => None,
        }
    }
}

impl From<StoreError> for EngineError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound(key) => EngineError::NotFound(key),
            other => EngineError::BackendUnavailable(other.to_string()),
        }
    }
}

impl From<IdentityError> for EngineError {
    fn from(e: IdentityError) -> Self {
        EngineError::BackendUnavailable(e.to_string())
    }
}

impl From<ValidationError> for EngineError {
    fn from(e: ValidationError) -> Self {
        EngineError::InvalidInput(e.to_string())
    }
}

impl From<LifecycleError> for EngineError {
    fn from(e: LifecycleError) -> Self {
        let reason = match &e {
            LifecycleError::DuplicateVote(_) => ConflictReason::DuplicateVote,
            LifecycleError::SelfVote(_) => ConflictReason::SelfVote,
            LifecycleError::ReportClosed { .. } => ConflictReason::ReportClosed,
            LifecycleError::RejectionDisabled => ConflictReason::RejectionDisabled,
            LifecycleError::InvariantViolated { .. } => return EngineError::Internal(e.to_string()),
        };
        EngineError::conflict(reason, e.to_string())
    }
}
