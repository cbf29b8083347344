//! Error taxonomy.
//!
//! Mirrors the kinds named in the mediator specification, not a 1:1 map of
//! language exceptions. Errors arising inside the forwarding path
//! (`MalformedFrame`, `PeerClosed`, `PeerError`, `UpstreamUnavailable`) never
//! escape the session as a `Result::Err` — they degrade behavior in place.
//! Only `ChargerNotConnected`, `Persistence`, and `ValidationError` propagate
//! to control-surface callers.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

/// Errors surfaced from the persistence interface.
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

/// Errors surfaced from the session mediator's public operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MediatorError {
    #[error("charge point {0} is not connected")]
    ChargerNotConnected(String),
}

/// Errors surfaced by the registry on session creation.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("a live session already exists for charge point {0}")]
    DuplicateSession(String),
}

/// Malformed operator-facing request (missing fields, non-ws URL, etc).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("{0}")]
    Message(String),
}

/// Top-level error returned by the control surface.
#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Mediator(#[from] MediatorError),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Persistence(#[from] PersistenceError),
}

/// Status mapping per `spec.md` §7: `ChargerNotConnected` is a 503 (the
/// charger may reconnect at any moment), a rejected duplicate upgrade is a
/// 409 (the existing session is the authoritative one), bad operator
/// input is a 400, and anything downstream of persistence is a 500.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::Mediator(MediatorError::ChargerNotConnected(_)) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Registry(RegistryError::DuplicateSession(_)) => StatusCode::CONFLICT,
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Persistence(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let body = Json(json!({ "error": self.to_string() }));
        (status, body).into_response()
    }
}
