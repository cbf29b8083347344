//! Handlers for the four control-surface routes (`SPEC_FULL.md` §4.6).
//! Thin by design: each one validates its body, calls through to the
//! mediator or the config store, and lets `AppError`'s `IntoResponse`
//! impl do the status-code mapping.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use tracing::info;
use validator::Validate;

use crate::config::{ConfigSnapshot, RuntimeConfig};
use crate::control::dto::{InjectRequest, InjectResponse, SessionLimitRequest, SetLimitRequest};
use crate::session::Mediator;
use crate::support::errors::{AppError, ValidationError};

pub async fn inject(
    State(mediator): State<Mediator>,
    Path(charge_point_id): Path<String>,
    Json(body): Json<InjectRequest>,
) -> Result<Json<InjectResponse>, AppError> {
    let message_id = mediator.inject(&charge_point_id, &body.action, body.payload).await?;
    Ok(Json(InjectResponse { message_id }))
}

pub async fn set_limit(
    State(mediator): State<Mediator>,
    Path(charge_point_id): Path<String>,
    Json(body): Json<SetLimitRequest>,
) -> Result<Json<InjectResponse>, AppError> {
    let message_id = mediator.set_persistent_limit(&charge_point_id, body.amperes).await?;
    Ok(Json(InjectResponse { message_id }))
}

pub async fn session_limit(
    State(mediator): State<Mediator>,
    Path(charge_point_id): Path<String>,
    Json(body): Json<SessionLimitRequest>,
) -> Result<Json<InjectResponse>, AppError> {
    let message_id = mediator
        .apply_session_limit(&charge_point_id, body.amperes, body.transaction_id)
        .await?;
    Ok(Json(InjectResponse { message_id }))
}

pub async fn get_config(State(mediator): State<Mediator>) -> Json<ConfigSnapshot> {
    Json((*mediator.config().load()).clone())
}

/// `deny_unknown_fields` on `RuntimeConfig` turns an unrecognized key into
/// a deserialization failure before this handler ever runs; `validator`
/// catches malformed-but-recognized values (a non-URL `target_csms_url`,
/// an out-of-range knob) here.
pub async fn set_config(
    State(mediator): State<Mediator>,
    Json(body): Json<RuntimeConfig>,
) -> Result<StatusCode, AppError> {
    body.validate()
        .map_err(|e| ValidationError::Message(format!("config validation failed: {e}")))?;

    mediator.persistence().save_config(&body).await?;
    mediator.config().swap(body);
    info!("configuration updated via control surface");
    Ok(StatusCode::OK)
}
