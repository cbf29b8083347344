//! The standalone responder: what the mediator says on the charger's
//! behalf when the request can neither be forwarded nor buffered.

use std::time::Duration;

use serde_json::{json, Value};

use crate::config::ConfigSnapshot;
use crate::domain::frame::OcppFrame;
use crate::domain::messages::{
    AuthorizationStatus, AuthorizeResponse, BootNotificationResponse, HeartbeatResponse, IdTagInfo,
    RegistrationStatus, RemoteStartTransactionRequest, StartTransactionResponse, StopTransactionResponse,
};

/// A Call the mediator should inject toward the charger shortly after
/// responding — used only for the auto-start-on-`Preparing` policy.
pub struct ScheduledInjection {
    pub delay: Duration,
    pub action: String,
    pub payload: Value,
}

pub struct StandaloneOutcome {
    /// `None` means the action is not in the synthesis table: the Request
    /// is silently dropped, nothing is sent back to the charger.
    pub response: Option<OcppFrame>,
    /// Set when the matched `idTag` should be removed from
    /// `pendingAuthTags` — Authorize only.
    pub consume_auth_tag: bool,
    pub schedule: Option<ScheduledInjection>,
}

impl StandaloneOutcome {
    fn respond(response: OcppFrame) -> Self {
        Self {
            response: Some(response),
            consume_auth_tag: false,
            schedule: None,
        }
    }

    fn drop_silently() -> Self {
        Self {
            response: None,
            consume_auth_tag: false,
            schedule: None,
        }
    }
}

/// Next process-wide transaction id; starts at 100000 per the protocol's
/// convention that small integers are reserved.
pub const FIRST_TRANSACTION_ID: i64 = 100_000;

/// Synthesize a response for an upstream-bound Call that cannot be
/// forwarded right now. `id` is the incoming Call's message id,
/// `auth_tag_pending` reports whether the request's `idTag` (if any) is
/// currently in `pendingAuthTags`, and `next_transaction_id` is called at
/// most once, only for `StartTransaction`.
pub fn respond(
    id: &str,
    action: &str,
    payload: &Value,
    config: &ConfigSnapshot,
    auth_tag_pending: impl FnOnce(&str) -> bool,
    next_transaction_id: impl FnOnce() -> i64,
) -> StandaloneOutcome {
    let now = chrono::Utc::now();

    match action {
        "BootNotification" => StandaloneOutcome::respond(result_frame(
            id,
            BootNotificationResponse {
                status: RegistrationStatus::Accepted,
                current_time: now,
                interval: 300,
            },
        )),

        "Heartbeat" => StandaloneOutcome::respond(result_frame(id, HeartbeatResponse { current_time: now })),

        "Authorize" => {
            let id_tag = payload.get("idTag").and_then(Value::as_str).unwrap_or("");
            let pending = auth_tag_pending(id_tag);
            let accepted = config.auto_charge_enabled || pending;
            let status = if accepted {
                AuthorizationStatus::Accepted
            } else {
                AuthorizationStatus::Invalid
            };
            StandaloneOutcome {
                response: Some(result_frame(
                    id,
                    AuthorizeResponse {
                        id_tag_info: IdTagInfo { status },
                    },
                )),
                consume_auth_tag: pending,
                schedule: None,
            }
        }

        "StatusNotification" => {
            let mut outcome = StandaloneOutcome::respond(OcppFrame::CallResult {
                id: id.to_string(),
                payload: json!({}),
            });
            let incoming_status = payload.get("status").and_then(Value::as_str);
            if config.auto_charge_enabled && incoming_status == Some("Preparing") {
                let connector_id = payload.get("connectorId").and_then(Value::as_i64).unwrap_or(1);
                outcome.schedule = Some(ScheduledInjection {
                    delay: Duration::from_millis(100),
                    action: "RemoteStartTransaction".to_string(),
                    payload: serde_json::to_value(RemoteStartTransactionRequest {
                        connector_id: connector_id as i32,
                        id_tag: config.default_id_tag.clone(),
                    })
                    .expect("RemoteStartTransactionRequest always serializes"),
                });
            }
            outcome
        }

        "MeterValues" => StandaloneOutcome::respond(OcppFrame::CallResult {
            id: id.to_string(),
            payload: json!({}),
        }),

        "StartTransaction" => StandaloneOutcome::respond(result_frame(
            id,
            StartTransactionResponse {
                transaction_id: next_transaction_id(),
                id_tag_info: IdTagInfo {
                    status: AuthorizationStatus::Accepted,
                },
            },
        )),

        "StopTransaction" => StandaloneOutcome::respond(result_frame(
            id,
            StopTransactionResponse {
                id_tag_info: IdTagInfo {
                    status: AuthorizationStatus::Accepted,
                },
            },
        )),

        _ => StandaloneOutcome::drop_silently(),
    }
}

fn result_frame<T: serde::Serialize>(id: &str, payload: T) -> OcppFrame {
    OcppFrame::CallResult {
        id: id.to_string(),
        payload: serde_json::to_value(payload).expect("standalone response payloads always serialize"),
    }
}
