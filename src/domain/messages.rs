//! Typed payload shapes used on the two hot paths that need them: the
//! standalone responder's synthesized replies, and the SetChargingProfile /
//! ClearChargingProfile Calls the mediator injects to apply a current limit.
//!
//! Every other payload is carried as an opaque `serde_json::Value` — the
//! mediator forwards verbatim and never needs a typed view of it.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// `{status: "Accepted", currentTime: now, interval: 300}`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BootNotificationResponse {
    pub status: RegistrationStatus,
    pub current_time: DateTime<Utc>,
    pub interval: i32,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum RegistrationStatus {
    Accepted,
    Pending,
    Rejected,
}

/// `{currentTime: now}`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeartbeatResponse {
    pub current_time: DateTime<Utc>,
}

/// `{idTagInfo: {status}}`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorizeResponse {
    pub id_tag_info: IdTagInfo,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdTagInfo {
    pub status: AuthorizationStatus,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum AuthorizationStatus {
    Accepted,
    Invalid,
    Blocked,
    Expired,
    ConcurrentTx,
}

/// `{transactionId, idTagInfo: {status: "Accepted"}}`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartTransactionResponse {
    pub transaction_id: i64,
    pub id_tag_info: IdTagInfo,
}

/// `{idTagInfo: {status: "Accepted"}}`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StopTransactionResponse {
    pub id_tag_info: IdTagInfo,
}

/// `{connectorId, idTag}` — payload of an injected RemoteStartTransaction.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteStartTransactionRequest {
    pub connector_id: i32,
    pub id_tag: String,
}

/// Payload of an injected SetChargingProfile Call.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetChargingProfileRequest {
    pub connector_id: i32,
    pub cs_charging_profiles: ChargingProfile,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChargingProfile {
    pub charging_profile_id: i32,
    pub stack_level: i32,
    pub charging_profile_purpose: ChargingProfilePurpose,
    pub charging_profile_kind: ChargingProfileKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub valid_from: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub valid_to: Option<DateTime<Utc>>,
    pub charging_schedule: ChargingSchedule,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ChargingProfilePurpose {
    ChargePointMaxProfile,
    TxDefaultProfile,
    TxProfile,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ChargingProfileKind {
    Absolute,
    Recurring,
    Relative,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChargingSchedule {
    pub charging_rate_unit: ChargingRateUnit,
    pub charging_schedule_period: Vec<ChargingSchedulePeriod>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ChargingRateUnit {
    W,
    A,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChargingSchedulePeriod {
    pub start_period: i32,
    pub limit: Decimal,
}

/// Payload of an injected ClearChargingProfile Call, used when an owner
/// clears a persistent limit.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClearChargingProfileRequest {
    pub id: i32,
}

/// The persistent charge-point-max profile id/stack level reserved for the
/// durable current limit; session-scoped limits use a different id so they
/// never collide with it.
pub const PERSISTENT_PROFILE_ID: i32 = 1;
pub const PERSISTENT_STACK_LEVEL: i32 = 1;

impl ChargingProfile {
    /// Build the `ChargePointMaxProfile` Absolute profile the mediator
    /// re-asserts on every reconnect when a persistent limit is set.
    pub fn persistent_limit(amperes: Decimal) -> Self {
        Self {
            charging_profile_id: PERSISTENT_PROFILE_ID,
            stack_level: PERSISTENT_STACK_LEVEL,
            charging_profile_purpose: ChargingProfilePurpose::ChargePointMaxProfile,
            charging_profile_kind: ChargingProfileKind::Absolute,
            valid_from: None,
            valid_to: None,
            charging_schedule: ChargingSchedule {
                charging_rate_unit: ChargingRateUnit::A,
                charging_schedule_period: vec![ChargingSchedulePeriod {
                    start_period: 0,
                    limit: amperes,
                }],
            },
        }
    }

    /// Build a one-shot session limit profile, `TxProfile` scoped to a
    /// transaction when one is given, else `TxDefaultProfile`.
    pub fn session_limit(amperes: Decimal, transaction_id: Option<i64>, profile_id: i32) -> Self {
        let purpose = if transaction_id.is_some() {
            ChargingProfilePurpose::TxProfile
        } else {
            ChargingProfilePurpose::TxDefaultProfile
        };
        Self {
            charging_profile_id: profile_id,
            stack_level: PERSISTENT_STACK_LEVEL,
            charging_profile_purpose: purpose,
            charging_profile_kind: ChargingProfileKind::Absolute,
            valid_from: None,
            valid_to: None,
            charging_schedule: ChargingSchedule {
                charging_rate_unit: ChargingRateUnit::A,
                charging_schedule_period: vec![ChargingSchedulePeriod {
                    start_period: 0,
                    limit: amperes,
                }],
            },
        }
    }
}
