//! Cryptographic provider for the ledger
//!
//! Identity derivation, signature verification and the proof-of-work
//! predicate, all as pure functions over the canonical commit payload.
//! Keys and signatures travel hex-encoded; the canonical payload is JSON
//! with a fixed field order (`data`, `type`, `nonce`, `publicKey`, and
//! `commitAt` only when the candidate carries one). Nested `data` objects
//! serialize with sorted keys, so signer and verifier always hash the same
//! bytes.
//!
//! The same `meets_difficulty` predicate runs on both sides: the client
//! searches a nonce with it, the admission pipeline re-checks it. Checking
//! is one hash; searching is expected `16^difficulty` hashes.

use chrono::{DateTime, Utc};
use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use rand_core::{OsRng, RngCore};
use serde::Serialize;
use serde_json::Value;

use crate::commit::CommitCandidate;
use crate::error::{AdmissionError, LedgerError};

/// Canonical signed field set. Field order here is the canonical encoding.
#[derive(Serialize)]
struct SigningPayload<'a> {
    data: &'a Option<Value>,
    #[serde(rename = "type")]
    kind: &'a str,
    nonce: i64,
    #[serde(rename = "publicKey")]
    public_key: &'a str,
    #[serde(rename = "commitAt", skip_serializing_if = "Option::is_none")]
    commit_at: Option<DateTime<Utc>>,
}

/// Canonical serialization of the signed fields of a candidate.
///
/// The signature and the work hash are both computed over these bytes.
pub fn signing_payload(candidate: &CommitCandidate) -> serde_json::Result<Vec<u8>> {
    serde_json::to_vec(&SigningPayload {
        data: &candidate.data,
        kind: &candidate.kind,
        nonce: candidate.nonce,
        public_key: &candidate.public_key,
        commit_at: candidate.commit_at,
    })
}

/// Derive the public address from a hex-encoded verifying key.
///
/// Deterministic and one-way: the blake3 hash of the raw key bytes,
/// hex-encoded. Errors on anything that is not valid hex of the right
/// length.
pub fn derive_address(public_key: &str) -> Result<String, AdmissionError> {
    let bytes = decode_key_bytes(public_key)?;
    Ok(blake3::hash(&bytes).to_hex().to_string())
}

fn decode_key_bytes(public_key: &str) -> Result<[u8; 32], AdmissionError> {
    let bytes = hex::decode(public_key)
        .map_err(|_| AdmissionError::InvalidPublicKey("not valid hex".to_string()))?;
    bytes
        .try_into()
        .map_err(|_| AdmissionError::InvalidPublicKey("key must be 32 bytes".to_string()))
}

/// Verify the candidate's signature against its canonical payload.
pub fn verify_signature(candidate: &CommitCandidate) -> bool {
    let Ok(key_bytes) = decode_key_bytes(&candidate.public_key) else {
        return false;
    };
    let Ok(verifying_key) = VerifyingKey::from_bytes(&key_bytes) else {
        return false;
    };
    let Ok(signature_bytes) = hex::decode(&candidate.signature) else {
        return false;
    };
    let Ok(signature) = Signature::from_slice(&signature_bytes) else {
        return false;
    };
    let Ok(payload) = signing_payload(candidate) else {
        return false;
    };

    verifying_key.verify(&payload, &signature).is_ok()
}

/// Hex-encoded blake3 work hash of the candidate's canonical payload.
pub fn work_hash(candidate: &CommitCandidate) -> serde_json::Result<String> {
    let payload = signing_payload(candidate)?;
    Ok(blake3::hash(&payload).to_hex().to_string())
}

/// Whether the candidate's work hash carries at least `difficulty` leading
/// `'0'` hex characters. Monotonic in `difficulty` for a fixed candidate.
pub fn meets_difficulty(candidate: &CommitCandidate, difficulty: u32) -> bool {
    match work_hash(candidate) {
        Ok(hash) => leading_zero_hex(&hash) >= difficulty,
        Err(_) => false,
    }
}

pub(crate) fn leading_zero_hex(hash: &str) -> u32 {
    hash.chars().take_while(|c| *c == '0').count() as u32
}

/// A client-side signing identity: an ed25519 keypair held in memory.
///
/// This is the submitter's half of the protocol; the server only ever sees
/// the hex-encoded verifying key. Used by the CLI and by tests to produce
/// admissible candidates.
pub struct ClientIdentity {
    signing_key: SigningKey,
    /// Hex-encoded verifying key, as transmitted in `publicKey`
    pub public_key_hex: String,
}

impl ClientIdentity {
    /// Generate a fresh identity from the OS entropy source.
    pub fn generate() -> Self {
        let mut secret_bytes = [0u8; 32];
        OsRng.fill_bytes(&mut secret_bytes);
        Self::from_signing_key(SigningKey::from_bytes(&secret_bytes))
    }

    /// Rebuild an identity from a hex-encoded secret key, or `None` when the
    /// encoding is not a 32-byte hex string.
    pub fn from_secret_hex(secret: &str) -> Option<Self> {
        let bytes: [u8; 32] = hex::decode(secret).ok()?.try_into().ok()?;
        Some(Self::from_signing_key(SigningKey::from_bytes(&bytes)))
    }

    fn from_signing_key(signing_key: SigningKey) -> Self {
        let public_key_hex = hex::encode(signing_key.verifying_key().to_bytes());
        Self {
            signing_key,
            public_key_hex,
        }
    }

    /// Hex-encoded secret key, for writing to a key file.
    pub fn secret_hex(&self) -> String {
        hex::encode(self.signing_key.to_bytes())
    }

    /// Sign the candidate's canonical payload and fill in its signature.
    pub fn sign(&self, candidate: &mut CommitCandidate) -> Result<(), LedgerError> {
        let payload = signing_payload(candidate)?;
        let signature = self.signing_key.sign(&payload);
        candidate.signature = hex::encode(signature.to_bytes());
        Ok(())
    }

    /// Build an admissible candidate: search nonces from 0 until the work
    /// hash satisfies `difficulty`, then sign the winning payload.
    ///
    /// The nonce is inside the signed field set, so the signature is applied
    /// once, after the search. Expected cost is `16^difficulty` hashes.
    pub fn create_commit(
        &self,
        data: Option<Value>,
        kind: &str,
        commit_at: Option<DateTime<Utc>>,
        difficulty: u32,
    ) -> Result<CommitCandidate, LedgerError> {
        let mut candidate = CommitCandidate {
            data,
            kind: kind.to_string(),
            nonce: 0,
            public_key: self.public_key_hex.clone(),
            signature: String::new(),
            commit_at,
        };

        while !meets_difficulty(&candidate, difficulty) {
            candidate.nonce += 1;
        }
        self.sign(&mut candidate)?;
        Ok(candidate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    fn mined(difficulty: u32) -> (ClientIdentity, CommitCandidate) {
        let identity = ClientIdentity::generate();
        let candidate = identity
            .create_commit(Some(json!({"message": "hello"})), "post", None, difficulty)
            .expect("mining should succeed");
        (identity, candidate)
    }

    #[test]
    fn derive_address_is_deterministic() {
        let identity = ClientIdentity::generate();
        let a1 = derive_address(&identity.public_key_hex).unwrap();
        let a2 = derive_address(&identity.public_key_hex).unwrap();
        assert_eq!(a1, a2);
        assert_eq!(a1.len(), 64);
    }

    #[test]
    fn derive_address_rejects_malformed_keys() {
        assert!(matches!(
            derive_address("zz-not-hex"),
            Err(AdmissionError::InvalidPublicKey(_))
        ));
        assert!(matches!(
            derive_address("abcd"),
            Err(AdmissionError::InvalidPublicKey(_))
        ));
    }

    #[test]
    fn signed_candidate_verifies() {
        let (_, candidate) = mined(1);
        assert!(verify_signature(&candidate));
    }

    #[test]
    fn any_field_mutation_breaks_the_signature() {
        let (_, candidate) = mined(1);

        let mut tampered = candidate.clone();
        tampered.data = Some(json!({"message": "hellp"}));
        assert!(!verify_signature(&tampered));

        let mut tampered = candidate.clone();
        tampered.kind = "pots".to_string();
        assert!(!verify_signature(&tampered));

        let mut tampered = candidate.clone();
        tampered.nonce += 1;
        assert!(!verify_signature(&tampered));

        let mut tampered = candidate.clone();
        let other = ClientIdentity::generate();
        tampered.public_key = other.public_key_hex;
        assert!(!verify_signature(&tampered));
    }

    #[test]
    fn commit_at_participates_in_the_signature_when_present() {
        let identity = ClientIdentity::generate();
        let candidate = identity
            .create_commit(None, "post", Some(chrono::Utc::now()), 0)
            .unwrap();
        assert!(verify_signature(&candidate));

        let mut tampered = candidate.clone();
        tampered.commit_at = None;
        assert!(!verify_signature(&tampered));
    }

    #[test]
    fn secret_hex_roundtrips_the_identity() {
        let identity = ClientIdentity::generate();
        let restored = ClientIdentity::from_secret_hex(&identity.secret_hex()).unwrap();
        assert_eq!(identity.public_key_hex, restored.public_key_hex);
    }

    #[test]
    fn mined_candidate_satisfies_its_difficulty() {
        let (_, candidate) = mined(2);
        let hash = work_hash(&candidate).unwrap();
        assert!(hash.starts_with("00"), "hash was {hash}");
        assert!(meets_difficulty(&candidate, 2));
        assert!(meets_difficulty(&candidate, 1));
        assert!(meets_difficulty(&candidate, 0));
    }

    #[test]
    fn leading_zero_count() {
        assert_eq!(leading_zero_hex("000abc"), 3);
        assert_eq!(leading_zero_hex("abc"), 0);
        assert_eq!(leading_zero_hex("0"), 1);
    }

    proptest! {
        // Raising difficulty never turns a failing candidate into a passing
        // one: the predicate is exactly `difficulty <= leading zeros`.
        #[test]
        fn difficulty_predicate_is_monotonic(message in ".{0,64}", nonce in 0i64..1_000_000) {
            let candidate = CommitCandidate {
                data: Some(json!({ "message": message })),
                kind: "post".to_string(),
                nonce,
                public_key: "ee".repeat(32),
                signature: String::new(),
                commit_at: None,
            };
            let zeros = leading_zero_hex(&work_hash(&candidate).unwrap());
            for difficulty in 0..=8u32 {
                prop_assert_eq!(
                    meets_difficulty(&candidate, difficulty),
                    difficulty <= zeros
                );
            }
        }
    }
}
