//! Error types for the receivables-advance ledger.
//!
//! All errors use the `LG_ERR_` prefix convention for easy grepping in logs.
//! Error codes are grouped by subsystem:
//! - 1xx: Caller input errors
//! - 2xx: Missing entities
//! - 3xx: Operation state errors
//! - 8xx: Ledger invariant errors
//! - 9xx: Storage / general / internal errors

use thiserror::Error;

use crate::{OperationId, ReceiverId};

/// Central error enum for all ledger operations.
#[derive(Debug, Error)]
pub enum LedgerError {
    // =================================================================
    // Input Errors (1xx)
    // =================================================================
    /// A caller-supplied field is missing or malformed.
    #[error("LG_ERR_100: Invalid {field}: {reason}")]
    InvalidInput { field: &'static str, reason: String },

    // =================================================================
    // Not Found Errors (2xx)
    // =================================================================
    /// The referenced receiver does not exist.
    #[error("LG_ERR_200: Receiver not found: {0}")]
    ReceiverNotFound(ReceiverId),

    /// The referenced operation does not exist.
    #[error("LG_ERR_201: Operation not found: {0}")]
    OperationNotFound(OperationId),

    // =================================================================
    // State Errors (3xx)
    // =================================================================
    /// The operation has already been confirmed.
    #[error("LG_ERR_300: Operation already confirmed: {0}")]
    AlreadyConfirmed(OperationId),

    /// The stored status is neither `pending` nor `confirmed`.
    #[error("LG_ERR_301: Operation in invalid state for confirmation: {status}")]
    InvalidState { status: String },

    // =================================================================
    // Invariant Errors (8xx)
    // =================================================================
    /// Receiver balance no longer equals the sum of its confirmed net values.
    #[error("LG_ERR_800: Balance invariant violation: {reason}")]
    BalanceInvariantViolation { reason: String },

    // =================================================================
    // Storage / General / Internal (9xx)
    // =================================================================
    /// The persistence layer failed.
    #[error("LG_ERR_900: Store failure: {0}")]
    StoreFailure(String),

    /// Unrecoverable internal error.
    #[error("LG_ERR_901: Internal error: {0}")]
    Internal(String),

    /// Configuration error (invalid config file, missing fields, etc.).
    #[error("LG_ERR_902: Configuration error: {0}")]
    Configuration(String),
}

impl LedgerError {
    /// Status code a request-handling layer should answer with.
    #[must_use]
    pub fn http_status(&self) -> u16 {
        match self {
            Self::InvalidInput { .. } | Self::AlreadyConfirmed(_) => 400,
            Self::ReceiverNotFound(_) | Self::OperationNotFound(_) => 404,
            Self::InvalidState { .. } => 409,
            Self::BalanceInvariantViolation { .. }
            | Self::StoreFailure(_)
            | Self::Internal(_)
            | Self::Configuration(_) => 500,
        }
    }

    /// Whether the error names an entity that does not exist.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::ReceiverNotFound(_) | Self::OperationNotFound(_))
    }
}

/// Crate-wide `Result` alias.
pub type Result<T> = std::result::Result<T, LedgerError>;

// Conversion from std::io::Error
impl From<std::io::Error> for LedgerError {
    fn from(err: std::io::Error) -> Self {
        Self::StoreFailure(err.to_string())
    }
}
