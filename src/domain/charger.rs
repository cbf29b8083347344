//! The persistent charger row — the durable facts the mediator consults on
//! the hot path, as opposed to the in-memory `Session` it drives.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Connectivity status recorded alongside the charger row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChargerStatus {
    Online,
    Offline,
}

/// Durable per-charger state: identity, last-seen, and the persistent
/// current limit re-applied on every reconnect.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChargerRow {
    pub charge_point_id: String,
    pub status: ChargerStatus,
    pub last_seen: DateTime<Utc>,
    /// Persistent current limit in amperes, if the owner has set one.
    pub max_power: Option<Decimal>,
}

impl ChargerRow {
    pub fn new(charge_point_id: impl Into<String>) -> Self {
        Self {
            charge_point_id: charge_point_id.into(),
            status: ChargerStatus::Offline,
            last_seen: Utc::now(),
            max_power: None,
        }
    }
}
