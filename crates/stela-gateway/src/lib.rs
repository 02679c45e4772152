//! Stela Gateway - HTTP query surface for the commit ledger
//!
//! This crate puts an HTTP/JSON face on the stela-core ledger: one write
//! endpoint that funnels candidates through the admission pipeline, the read
//! endpoints of the commit store, and a statistics endpoint. It also owns
//! the service lifecycle: the retention sweeper starts with the server and
//! stops on shutdown.
//!
//! # Endpoints
//!
//! - `POST /commits` — submit a candidate commit
//! - `GET  /commits?page&perPage` — most recent commits
//! - `GET  /commits/random` — one random commit
//! - `GET  /commits/:signature` — a single commit
//! - `GET  /commits/:signature/replies` — post-type replies to a commit
//! - `GET  /identities` — all distinct submitting identities
//! - `GET  /identities/:identity/commits?page&perPage` — commits by identity
//! - `GET  /info` — difficulty, totals, oldest entry
//! - `GET  /health` — liveness

pub mod api;
pub mod config;
pub mod error;

pub use api::{Gateway, GatewayState, PageQuery, ServerInfo};
pub use config::GatewayConfig;
pub use error::{GatewayError, Result};

/// Gateway version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default port
pub const DEFAULT_PORT: u16 = 4000;

/// Default host
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Default SQLite database path
pub const DEFAULT_DATABASE: &str = "./data/commits.db";
