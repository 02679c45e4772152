//! Error types for the gateway
//!
//! Maps core admission and storage failures onto HTTP responses. Every
//! rejection reaches the client as a JSON body with the error text; a
//! proof-of-work rejection additionally carries the active difficulty so
//! the client can search a satisfying nonce and resubmit.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use stela_core::{AdmissionError, StoreError};
use thiserror::Error;

/// Gateway error type
#[derive(Error, Debug)]
pub enum GatewayError {
    /// A candidate was rejected at an admission gate
    #[error(transparent)]
    Admission(#[from] AdmissionError),

    /// The commit store failed
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Pagination or path parameters outside the documented bounds
    #[error("invalid query: {0}")]
    InvalidQuery(String),

    /// The requested record does not exist
    #[error("not found")]
    NotFound,

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for gateway operations
pub type Result<T> = std::result::Result<T, GatewayError>;

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = match &self {
            GatewayError::Admission(AdmissionError::MalformedCandidate(_)) => {
                StatusCode::BAD_REQUEST
            }
            GatewayError::Admission(
                AdmissionError::InvalidPublicKey(_) | AdmissionError::InvalidSignature,
            ) => StatusCode::UNAUTHORIZED,
            GatewayError::Admission(AdmissionError::DifficultyNotMet { .. }) => {
                StatusCode::FORBIDDEN
            }
            GatewayError::Store(StoreError::DuplicateKey(_)) => StatusCode::CONFLICT,
            GatewayError::Store(StoreError::Unavailable(_)) => StatusCode::SERVICE_UNAVAILABLE,
            GatewayError::InvalidQuery(_) => StatusCode::BAD_REQUEST,
            GatewayError::NotFound => StatusCode::NOT_FOUND,
            GatewayError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let mut body = json!({ "error": self.to_string() });
        if let GatewayError::Admission(AdmissionError::DifficultyNotMet { difficulty }) = &self {
            body["difficulty"] = json!(difficulty);
        }

        (status, Json(body)).into_response()
    }
}
