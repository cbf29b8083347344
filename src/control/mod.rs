//! The operator-facing control surface: four unauthenticated Axum routes
//! for command injection, current-limit control, and config read/write
//! (`SPEC_FULL.md` §4.6). No auth layer and no OpenAPI generation — both
//! are out of scope here; the dashboard that would sit in front of this is
//! a separate system.

pub mod dto;
pub mod handlers;

use axum::routing::{get, post, put};
use axum::Router;

use crate::session::Mediator;

pub fn router(mediator: Mediator) -> Router {
    Router::new()
        .route("/chargers/{id}/inject", post(handlers::inject))
        .route("/chargers/{id}/limit", put(handlers::set_limit))
        .route("/chargers/{id}/session-limit", post(handlers::session_limit))
        .route("/config", get(handlers::get_config).put(handlers::set_config))
        .with_state(mediator)
}
