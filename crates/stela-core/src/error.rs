//! Error types for Stela Core
//!
//! This module defines all error types used throughout the ledger core.
//! We use `thiserror` for ergonomic error definitions with automatic
//! Display/Error implementations.

use thiserror::Error;

/// Result type alias for ledger operations
pub type Result<T> = std::result::Result<T, LedgerError>;

/// Main error type for ledger operations
#[derive(Error, Debug)]
pub enum LedgerError {
    /// A candidate commit was rejected at one of the admission gates
    #[error("admission rejected: {0}")]
    Admission(#[from] AdmissionError),

    /// Storage-level errors
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Serialization errors
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Rejection reasons for a candidate commit.
///
/// Every rejection is terminal for that submission attempt: the client must
/// fix the candidate (or search a new nonce) and resubmit. None of these
/// variants leaves partial state behind.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AdmissionError {
    /// A required field is missing or empty
    #[error("malformed candidate: {0}")]
    MalformedCandidate(String),

    /// The public key is not a valid hex-encoded 32-byte key
    #[error("invalid public key: {0}")]
    InvalidPublicKey(String),

    /// The signature does not verify against the canonical payload
    #[error("signature verification failed")]
    InvalidSignature,

    /// The work hash does not satisfy the configured difficulty.
    /// Carries the active difficulty so the client can retry with a
    /// satisfying nonce.
    #[error("difficulty not met, current difficulty is {difficulty}")]
    DifficultyNotMet {
        /// The difficulty currently enforced by the admission pipeline
        difficulty: u32,
    },
}

/// Storage failures.
///
/// `DuplicateKey` is the only expected, non-fatal failure; everything else
/// the storage engine reports is surfaced as `Unavailable` and aborts the
/// current operation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// A commit with this signature already exists; the stored record is
    /// left untouched
    #[error("duplicate signature: {0}")]
    DuplicateKey(String),

    /// The storage engine failed (I/O, corruption, lock timeout)
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

impl From<rusqlite::Error> for StoreError {
    fn from(e: rusqlite::Error) -> Self {
        StoreError::Unavailable(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn difficulty_not_met_reports_active_difficulty() {
        let err = AdmissionError::DifficultyNotMet { difficulty: 4 };
        assert!(err.to_string().contains("current difficulty is 4"));
    }

    #[test]
    fn duplicate_key_is_distinguishable_from_unavailable() {
        let dup = StoreError::DuplicateKey("abc".to_string());
        let io = StoreError::Unavailable("disk on fire".to_string());
        assert!(matches!(dup, StoreError::DuplicateKey(_)));
        assert!(matches!(io, StoreError::Unavailable(_)));
    }

    #[test]
    fn admission_error_wraps_into_ledger_error() {
        let err: LedgerError = AdmissionError::InvalidSignature.into();
        assert!(err.to_string().contains("admission rejected"));
    }
}
