//! The structured message-log record the mediator appends for every frame
//! it sees or synthesizes, regardless of direction.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Why a frame ended up in the log — mirrors the five tags a reviewer needs
/// to reconstruct what actually crossed the wire versus what the proxy
/// produced on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Direction {
    /// Charger → proxy, on its way (or attempted) upstream.
    Upstream,
    /// CSMS → proxy, on its way to the charger.
    Downstream,
    /// Operator-initiated Call sent toward the charger.
    InjectionRequest,
    /// The charger's response to an injected Call, intercepted and never
    /// forwarded to the CSMS.
    InjectionResponse,
    /// A response the proxy synthesized itself, in standalone mode.
    ProxyResponse,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageLogRecord {
    pub charge_point_id: String,
    pub direction: Direction,
    /// The decoded frame re-encoded to JSON, or the raw text for frames
    /// that failed to decode.
    pub payload: Value,
    pub recorded_at: DateTime<Utc>,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Upstream => "UPSTREAM",
            Self::Downstream => "DOWNSTREAM",
            Self::InjectionRequest => "INJECTION_REQUEST",
            Self::InjectionResponse => "INJECTION_RESPONSE",
            Self::ProxyResponse => "PROXY_RESPONSE",
        }
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl MessageLogRecord {
    pub fn new(charge_point_id: impl Into<String>, direction: Direction, payload: Value) -> Self {
        Self {
            charge_point_id: charge_point_id.into(),
            direction,
            payload,
            recorded_at: Utc::now(),
        }
    }
}
