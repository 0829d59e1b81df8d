//! Error types for the observation ledger.
//!
//! Every failure is a typed result; no operation panics on bad input.
//! Domain failures carry a stable numeric wire code (see
//! [`LedgerError::code`]) so independent reimplementations and
//! conformance suites agree on what went wrong. Infrastructure failures
//! (`Database`) have no wire code.

use thiserror::Error;

/// Errors that can occur during ledger operations.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum LedgerError {
    /// Caller may not perform the attempted operation.
    #[error("caller is not authorized")]
    NotAuthorized,

    /// A submitted field failed structural validation.
    #[error("invalid field data: {reason}")]
    InvalidData {
        /// Which bound was violated.
        reason: &'static str,
    },

    /// A certificate was already minted for the record.
    #[error("certificate already minted for record {record_id}")]
    DataExists {
        /// The record that already carries a certificate.
        record_id: u64,
    },

    /// No record exists with the referenced id.
    #[error("record not found: id={record_id}")]
    NotFound {
        /// The id that was not found.
        record_id: u64,
    },

    /// The circuit breaker is engaged; all writes are refused.
    #[error("ledger is paused")]
    Paused,

    /// Observation timestamp must be a positive number of seconds.
    #[error("invalid timestamp: must be positive")]
    InvalidTimestamp,

    /// Latitude or longitude outside the representable range.
    #[error("invalid location: coordinates out of bounds")]
    InvalidLocation,

    /// Evidence digest was all-zero.
    #[error("invalid evidence: hash must not be all-zero")]
    InvalidEvidence,

    /// The null principal was supplied where an identity is stored.
    #[error("invalid principal: the null identity is not allowed")]
    InvalidPrincipal,

    /// Token ids are externally assigned and must be positive.
    #[error("invalid token id: {token_id}")]
    InvalidTokenId {
        /// The rejected token id.
        token_id: i64,
    },

    /// Database error from `SQLite`.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),
}

impl LedgerError {
    /// The stable numeric wire code for this failure.
    ///
    /// Codes are part of the external contract and must not change
    /// between releases. `Database` failures are host-local and carry
    /// no wire code.
    #[must_use]
    pub const fn code(&self) -> Option<u16> {
        match self {
            Self::NotAuthorized => Some(100),
            Self::InvalidData { .. } => Some(101),
            Self::DataExists { .. } => Some(102),
            Self::NotFound { .. } => Some(104),
            Self::Paused => Some(105),
            Self::InvalidTimestamp => Some(106),
            Self::InvalidLocation => Some(107),
            Self::InvalidEvidence => Some(108),
            Self::InvalidPrincipal => Some(109),
            Self::InvalidTokenId { .. } => Some(110),
            Self::Database(_) => None,
        }
    }
}
