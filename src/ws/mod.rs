//! Charger-facing WebSocket acceptor: the only component that creates or
//! removes a `Session` (`spec.md` §4.2's single-removal-site invariant).

pub mod acceptor;

use axum::routing::get;
use axum::Router;

use crate::session::Mediator;

/// Build the router for the charger-facing upgrade endpoint. Any path
/// other than `/ocpp/{chargePointId}` falls through to Axum's default 404.
pub fn router(mediator: Mediator) -> Router {
    Router::new()
        .route("/ocpp/{charge_point_id}", get(acceptor::ws_handler))
        .with_state(mediator)
}
