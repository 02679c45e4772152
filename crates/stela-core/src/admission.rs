//! Admission pipeline — the security boundary of the ledger
//!
//! A candidate passes four hard gates, in order, before it may be persisted:
//! shape check, identity derivation, signature verification, proof-of-work
//! check. Each gate fails fast; a candidate failing any gate never reaches
//! storage. The pipeline is stateless apart from the configured difficulty,
//! so the same candidate always gets the same decision.

use chrono::Utc;

use crate::commit::{Commit, CommitCandidate};
use crate::crypto;
use crate::error::AdmissionError;

/// Validates candidate commits against the admission gates.
#[derive(Debug, Clone)]
pub struct AdmissionPipeline {
    difficulty: u32,
}

impl AdmissionPipeline {
    /// Pipeline enforcing the given proof-of-work difficulty
    pub fn new(difficulty: u32) -> Self {
        Self { difficulty }
    }

    /// The difficulty this pipeline enforces
    pub fn difficulty(&self) -> u32 {
        self.difficulty
    }

    /// Run the candidate through all gates and, on success, construct the
    /// immutable commit with its derived address and server-assigned
    /// timestamps. The caller hands the result to the store; this function
    /// itself has no side effects.
    pub fn admit(&self, candidate: CommitCandidate) -> Result<Commit, AdmissionError> {
        check_shape(&candidate)?;

        let address = crypto::derive_address(&candidate.public_key)?;

        if !crypto::verify_signature(&candidate) {
            return Err(AdmissionError::InvalidSignature);
        }

        if !crypto::meets_difficulty(&candidate, self.difficulty) {
            return Err(AdmissionError::DifficultyNotMet {
                difficulty: self.difficulty,
            });
        }

        let now = Utc::now();
        Ok(Commit {
            data: candidate.data,
            kind: candidate.kind,
            nonce: candidate.nonce,
            public_key: candidate.public_key,
            address,
            signature: candidate.signature,
            commit_at: candidate.commit_at,
            created_at: now,
            updated_at: now,
        })
    }
}

fn check_shape(candidate: &CommitCandidate) -> Result<(), AdmissionError> {
    if candidate.kind.is_empty() {
        return Err(AdmissionError::MalformedCandidate(
            "type must be non-empty".to_string(),
        ));
    }
    if candidate.public_key.is_empty() {
        return Err(AdmissionError::MalformedCandidate(
            "publicKey must be non-empty".to_string(),
        ));
    }
    if candidate.signature.is_empty() {
        return Err(AdmissionError::MalformedCandidate(
            "signature must be non-empty".to_string(),
        ));
    }
    if candidate.nonce < 0 {
        return Err(AdmissionError::MalformedCandidate(
            "nonce must be non-negative".to_string(),
        ));
    }
    Ok(())
}
