//! Charger-facing WebSocket acceptor.
//!
//! Accepts upgrades at `/ocpp/{chargePointId}` (any other path falls
//! through to Axum's default 404), captures the `Authorization` and
//! `Sec-WebSocket-Protocol` headers into a `HandshakeMeta` snapshot, and
//! hands the session off to the mediator. Grounded in the teacher's
//! `interfaces::ws::ocpp_server::handle_connection`: one outbound channel
//! per charger socket, a dedicated writer task draining it, and a reader
//! loop that feeds every text frame to the mediator.

use axum::extract::ws::{CloseFrame, Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, State};
use axum::http::{header, HeaderMap};
use axum::response::Response;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tracing::{error, info, warn};

use crate::domain::handshake::HandshakeMeta;
use crate::session::Mediator;
use crate::support::errors::{AppError, RegistryError};

/// Subprotocols this proxy is willing to echo back to the charger. The
/// charger, not the proxy, decides which OCPP version is in play — we
/// just accept whichever of these it offered (`spec.md` §9's "subprotocol
/// echo" open question, resolved as pass-through).
const SUPPORTED_SUBPROTOCOLS: [&str; 2] = ["ocpp1.6", "ocpp2.0.1"];

pub async fn ws_handler(
    Path(charge_point_id): Path<String>,
    State(mediator): State<Mediator>,
    headers: HeaderMap,
    ws: WebSocketUpgrade,
) -> Response {
    let authorization = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    let subprotocol = headers
        .get("sec-websocket-protocol")
        .and_then(|v| v.to_str().ok())
        .and_then(|raw| raw.split(',').map(str::trim).next())
        .filter(|s| !s.is_empty())
        .map(str::to_string);

    let handshake = HandshakeMeta {
        authorization,
        subprotocol: subprotocol.clone(),
    };

    let mut upgrade = ws;
    if subprotocol.is_some() {
        upgrade = upgrade.protocols(SUPPORTED_SUBPROTOCOLS);
    }

    upgrade.on_upgrade(move |socket| handle_socket(socket, charge_point_id, handshake, mediator))
}

async fn handle_socket(socket: WebSocket, charge_point_id: String, handshake: HandshakeMeta, mediator: Mediator) {
    let (mut sink, mut stream) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<String>();

    let session = match mediator.create_session(charge_point_id.clone(), tx, handshake).await {
        Ok(session) => session,
        Err(AppError::Registry(RegistryError::DuplicateSession(_))) => {
            warn!(charge_point_id, "rejecting duplicate upgrade, existing session left undisturbed");
            let _ = sink
                .send(Message::Close(Some(CloseFrame {
                    code: 1008,
                    reason: "duplicate session".into(),
                })))
                .await;
            return;
        }
        Err(e) => {
            error!(charge_point_id, error = %e, "failed to create session");
            let _ = sink.close().await;
            return;
        }
    };

    info!(charge_point_id, "charger connected");

    let writer = tokio::spawn(async move {
        while let Some(text) = rx.recv().await {
            if sink.send(Message::Text(text)).await.is_err() {
                break;
            }
        }
    });

    while let Some(message) = stream.next().await {
        match message {
            Ok(Message::Text(text)) => {
                mediator.handle_charger_frame(&session, text).await;
            }
            Ok(Message::Close(_)) => break,
            Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => {}
            Ok(Message::Binary(data)) => {
                warn!(charge_point_id, bytes = data.len(), "binary frame from charger, ignoring");
            }
            Err(e) => {
                warn!(charge_point_id, error = %e, "charger socket error");
                break;
            }
        }
    }

    writer.abort();
    mediator.teardown(&charge_point_id).await;
    info!(charge_point_id, "charger disconnected");
}
