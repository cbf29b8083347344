//! Request/response bodies for the control surface. Kept separate from the
//! domain payload types in `domain::messages` — these describe the shape of
//! the operator-facing HTTP API, not the OCPP wire format.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Deserialize)]
pub struct InjectRequest {
    pub action: String,
    #[serde(default = "default_payload")]
    pub payload: Value,
}

fn default_payload() -> Value {
    Value::Object(Default::default())
}

#[derive(Debug, Serialize)]
pub struct InjectResponse {
    pub message_id: String,
}

/// `amperes: null` (or the field omitted) clears the persistent limit;
/// `amperes: <value>` sets it.
#[derive(Debug, Deserialize)]
pub struct SetLimitRequest {
    #[serde(default)]
    pub amperes: Option<Decimal>,
}

#[derive(Debug, Deserialize)]
pub struct SessionLimitRequest {
    pub amperes: Decimal,
    #[serde(default)]
    pub transaction_id: Option<i64>,
}
