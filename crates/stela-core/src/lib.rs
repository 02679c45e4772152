//! Stela Core - append-only public commit ledger engine
//!
//! Stela accepts, verifies, stores, and serves small signed "commit"
//! records: an append-only, content-addressed log gated by a proof-of-work
//! admission check. This crate is the security boundary of the system;
//! everything between a submitted candidate and a durable record lives here.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                       Stela Core                         │
//! ├──────────────────────────────────────────────────────────┤
//! │                                                          │
//! │   candidate ──► AdmissionPipeline ──► Commit ──► insert  │
//! │                  │  shape check                    │     │
//! │                  │  derive address                 ▼     │
//! │                  │  verify signature         CommitStore │
//! │                  │  check proof-of-work     (SQLite WAL) │
//! │                                                 ▲   │    │
//! │   queries ──────────────────────────────────────┘   │    │
//! │   (recency / identity / parent / stats)             │    │
//! │                                                     │    │
//! │   RetentionSweeper ── interval ── delete_older_than ┘    │
//! │                                                          │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! # Design Principles
//!
//! 1. **Fail-fast admission**: a candidate failing any gate never reaches
//!    storage (no quarantine, no partial writes)
//! 2. **Immutability**: admitted commits are never mutated; only the
//!    retention sweeper deletes
//! 3. **Explicit configuration**: difficulty, identity scheme, and retention
//!    are constructor arguments, never ambient globals
//! 4. **Typed failures**: every rejection carries enough detail for the
//!    caller to act on

#![deny(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, clippy::all)]

pub mod admission;
pub mod commit;
pub mod config;
pub mod crypto;
pub mod error;
pub mod store;
pub mod sweeper;

// Re-export commonly used types for convenience
pub use admission::AdmissionPipeline;
pub use commit::{Commit, CommitCandidate, Timestamp, POST_KIND};
pub use config::{IdentityScheme, LedgerConfig, RetentionField, RetentionPolicy};
pub use crypto::ClientIdentity;
pub use error::{AdmissionError, LedgerError, Result, StoreError};
pub use store::{CommitStore, LedgerStats};
pub use sweeper::RetentionSweeper;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
