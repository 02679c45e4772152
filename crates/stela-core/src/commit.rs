//! Commit records — the atomic unit of the ledger
//!
//! A `CommitCandidate` is what a client submits; a `Commit` is what the
//! admission pipeline produces and the store persists. Wire field names are
//! camelCase (`publicKey`, `createdAt`, ...) and `type` keeps its original
//! name, so both structs serialize to the exact shape clients already speak.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Record kind that participates in the reply relation
pub const POST_KIND: &str = "post";

/// Timestamp type alias
pub type Timestamp = DateTime<Utc>;

/// A candidate commit as submitted by a client, before admission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitCandidate {
    /// Opaque structured payload; nullable
    #[serde(default)]
    pub data: Option<Value>,

    /// Application-level record kind, e.g. `"post"`
    #[serde(rename = "type")]
    pub kind: String,

    /// Proof-of-work counter chosen by the client
    pub nonce: i64,

    /// Hex-encoded ed25519 verifying key of the submitter
    pub public_key: String,

    /// Hex-encoded ed25519 signature over the canonical payload
    pub signature: String,

    /// Client-declared creation time. Present only in deployments that
    /// include it in the signed payload; never trusted for ordering.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commit_at: Option<Timestamp>,
}

impl CommitCandidate {
    /// Signature of the commit this record replies to, if any.
    ///
    /// Only `"post"` records participate in the reply relation; for them the
    /// target is the `signature` sub-field of `data`. The reference is not
    /// checked against the store; dangling targets are legal.
    pub fn parent_signature(&self) -> Option<&str> {
        parent_of(&self.kind, self.data.as_ref())
    }
}

/// An admitted, immutable commit.
///
/// Produced exactly once, at successful admission; `address` is derived from
/// `publicKey` at that moment and `createdAt`/`updatedAt` are server-assigned.
/// `createdAt` is the authoritative ordering key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Commit {
    /// Opaque structured payload; nullable
    #[serde(default)]
    pub data: Option<Value>,

    /// Application-level record kind
    #[serde(rename = "type")]
    pub kind: String,

    /// Proof-of-work counter
    pub nonce: i64,

    /// Hex-encoded verifying key of the submitter
    pub public_key: String,

    /// One-way derivation of `publicKey`; the public identity of the
    /// submitter, stored redundantly so identity queries need no re-derivation
    pub address: String,

    /// Primary key of the record
    pub signature: String,

    /// Client-declared creation time, when the deployment carries one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commit_at: Option<Timestamp>,

    /// Server-assigned admission time; authoritative ordering key
    pub created_at: Timestamp,

    /// Server-assigned; equals `createdAt` since commits are never updated
    pub updated_at: Timestamp,
}

impl Commit {
    /// Signature of the commit this record replies to, if any.
    pub fn parent_signature(&self) -> Option<&str> {
        parent_of(&self.kind, self.data.as_ref())
    }
}

fn parent_of<'a>(kind: &str, data: Option<&'a Value>) -> Option<&'a str> {
    if kind != POST_KIND {
        return None;
    }
    data?.get("signature")?.as_str()
}
