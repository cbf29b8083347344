//! OCPP-J message framing.
//!
//! OCPP-J framing is a JSON array of one of three shapes, identical across
//! OCPP 1.6 and 2.0.1:
//!
//! - **Call**       `[2, "<id>", "<action>", {<payload>}]`
//! - **CallResult** `[3, "<id>", {<payload>}]`
//! - **CallError**  `[4, "<id>", "<errorCode>", "<errorDescription>", {<errorDetails>}]`
//!
//! The mediator never interprets payloads beyond extracting a handful of
//! named fields (`idTag`, `connectorId`, `status`, ...) for the standalone
//! responder — transforming payloads further is explicitly out of scope.

use serde_json::Value;
use std::fmt;

const MSG_TYPE_CALL: u64 = 2;
const MSG_TYPE_CALL_RESULT: u64 = 3;
const MSG_TYPE_CALL_ERROR: u64 = 4;

/// A parsed OCPP-J frame.
#[derive(Debug, Clone, PartialEq)]
pub enum OcppFrame {
    /// `[2, id, action, payload]` — a request, originated by either peer.
    Call {
        id: String,
        action: String,
        payload: Value,
    },
    /// `[3, id, payload]` — a successful response to a prior Call.
    CallResult { id: String, payload: Value },
    /// `[4, id, code, description, details]` — a failed response to a prior Call.
    CallError {
        id: String,
        code: String,
        description: String,
        details: Value,
    },
}

impl OcppFrame {
    /// Parse a raw text frame. Any failure to match one of the three shapes
    /// yields `MalformedFrame` rather than propagating a decode error —
    /// callers decide what "drop and continue" means for their direction.
    pub fn parse(text: &str) -> Result<Self, MalformedFrame> {
        let arr: Vec<Value> = serde_json::from_str(text)
            .map_err(|e| MalformedFrame::InvalidJson(e.to_string()))?;

        let msg_type = arr
            .first()
            .and_then(Value::as_u64)
            .ok_or(MalformedFrame::NotAnOcppArray)?;

        match msg_type {
            MSG_TYPE_CALL => Self::parse_call(&arr),
            MSG_TYPE_CALL_RESULT => Self::parse_call_result(&arr),
            MSG_TYPE_CALL_ERROR => Self::parse_call_error(&arr),
            other => Err(MalformedFrame::UnknownMessageType(other)),
        }
    }

    fn parse_call(arr: &[Value]) -> Result<Self, MalformedFrame> {
        if arr.len() < 4 {
            return Err(MalformedFrame::MissingFields {
                expected: 4,
                got: arr.len(),
            });
        }
        Ok(Self::Call {
            id: str_field(&arr[1], "id")?,
            action: str_field(&arr[2], "action")?,
            payload: arr[3].clone(),
        })
    }

    fn parse_call_result(arr: &[Value]) -> Result<Self, MalformedFrame> {
        if arr.len() < 3 {
            return Err(MalformedFrame::MissingFields {
                expected: 3,
                got: arr.len(),
            });
        }
        Ok(Self::CallResult {
            id: str_field(&arr[1], "id")?,
            payload: arr[2].clone(),
        })
    }

    fn parse_call_error(arr: &[Value]) -> Result<Self, MalformedFrame> {
        if arr.len() < 4 {
            return Err(MalformedFrame::MissingFields {
                expected: 4,
                got: arr.len(),
            });
        }
        Ok(Self::CallError {
            id: str_field(&arr[1], "id")?,
            code: str_field(&arr[2], "code")?,
            description: arr.get(3).and_then(Value::as_str).unwrap_or("").to_string(),
            details: arr.get(4).cloned().unwrap_or(Value::Object(Default::default())),
        })
    }

    /// Serialize to the canonical OCPP-J JSON array text.
    pub fn serialize(&self) -> String {
        let arr = match self {
            Self::Call { id, action, payload } => Value::Array(vec![
                Value::from(MSG_TYPE_CALL),
                Value::String(id.clone()),
                Value::String(action.clone()),
                payload.clone(),
            ]),
            Self::CallResult { id, payload } => Value::Array(vec![
                Value::from(MSG_TYPE_CALL_RESULT),
                Value::String(id.clone()),
                payload.clone(),
            ]),
            Self::CallError {
                id,
                code,
                description,
                details,
            } => Value::Array(vec![
                Value::from(MSG_TYPE_CALL_ERROR),
                Value::String(id.clone()),
                Value::String(code.clone()),
                Value::String(description.clone()),
                details.clone(),
            ]),
        };
        // serde_json::to_string on a Value never fails.
        serde_json::to_string(&arr).unwrap()
    }

    pub fn id(&self) -> &str {
        match self {
            Self::Call { id, .. } | Self::CallResult { id, .. } | Self::CallError { id, .. } => id,
        }
    }

    pub fn is_call(&self) -> bool {
        matches!(self, Self::Call { .. })
    }

    pub fn is_call_result(&self) -> bool {
        matches!(self, Self::CallResult { .. })
    }

    pub fn is_call_error(&self) -> bool {
        matches!(self, Self::CallError { .. })
    }

    /// True for either response shape (CallResult or CallError) — i.e. a
    /// frame that can match an entry in `pendingInjections`.
    pub fn is_any_response(&self) -> bool {
        self.is_call_result() || self.is_call_error()
    }

    pub fn error_response(id: impl Into<String>, code: impl Into<String>, description: impl Into<String>) -> Self {
        Self::CallError {
            id: id.into(),
            code: code.into(),
            description: description.into(),
            details: Value::Object(Default::default()),
        }
    }
}

fn str_field(v: &Value, name: &'static str) -> Result<String, MalformedFrame> {
    v.as_str()
        .map(str::to_string)
        .ok_or(MalformedFrame::FieldTypeMismatch(name))
}

/// Decode failure on either direction of the splice. The caller drops the
/// single offending frame and keeps the session alive.
#[derive(Debug, Clone, PartialEq)]
pub enum MalformedFrame {
    InvalidJson(String),
    NotAnOcppArray,
    UnknownMessageType(u64),
    MissingFields { expected: usize, got: usize },
    FieldTypeMismatch(&'static str),
}

impl fmt::Display for MalformedFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidJson(msg) => write!(f, "invalid JSON: {msg}"),
            Self::NotAnOcppArray => write!(f, "not a [type, ...] OCPP array"),
            Self::UnknownMessageType(t) => write!(f, "unknown message type: {t}"),
            Self::MissingFields { expected, got } => {
                write!(f, "expected at least {expected} fields, got {got}")
            }
            Self::FieldTypeMismatch(field) => write!(f, "field type mismatch: {field}"),
        }
    }
}

impl std::error::Error for MalformedFrame {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_call() {
        let text = r#"[2,"abc123","BootNotification",{"chargePointVendor":"Vendor"}]"#;
        let frame = OcppFrame::parse(text).unwrap();
        match frame {
            OcppFrame::Call { id, action, payload } => {
                assert_eq!(id, "abc123");
                assert_eq!(action, "BootNotification");
                assert_eq!(payload["chargePointVendor"], "Vendor");
            }
            _ => panic!("expected Call"),
        }
    }

    #[test]
    fn parse_call_result() {
        let text = r#"[3,"abc123",{"status":"Accepted"}]"#;
        let frame = OcppFrame::parse(text).unwrap();
        assert!(frame.is_call_result());
        assert_eq!(frame.id(), "abc123");
    }

    #[test]
    fn parse_call_error() {
        let text = r#"[4,"abc123","NotImplemented","no such action",{}]"#;
        let frame = OcppFrame::parse(text).unwrap();
        assert!(frame.is_call_error());
    }

    #[test]
    fn parse_call_error_tolerates_missing_trailing_fields() {
        let text = r#"[4,"abc123","NotImplemented"]"#;
        let frame = OcppFrame::parse(text).unwrap();
        match frame {
            OcppFrame::CallError { description, details, .. } => {
                assert_eq!(description, "");
                assert_eq!(details, Value::Object(Default::default()));
            }
            _ => panic!("expected CallError"),
        }
    }

    #[test]
    fn unknown_message_type_is_malformed() {
        let err = OcppFrame::parse("[9,\"x\"]").unwrap_err();
        assert_eq!(err, MalformedFrame::UnknownMessageType(9));
    }

    #[test]
    fn non_array_is_malformed() {
        let err = OcppFrame::parse("{}").unwrap_err();
        assert!(matches!(err, MalformedFrame::InvalidJson(_)));
    }

    #[test]
    fn roundtrip_call() {
        let frame = OcppFrame::Call {
            id: "id1".into(),
            action: "Heartbeat".into(),
            payload: serde_json::json!({}),
        };
        let parsed = OcppFrame::parse(&frame.serialize()).unwrap();
        assert_eq!(parsed, frame);
    }

    #[test]
    fn roundtrip_call_result() {
        let frame = OcppFrame::CallResult {
            id: "id2".into(),
            payload: serde_json::json!({"currentTime": "2024-01-01T00:00:00Z"}),
        };
        let parsed = OcppFrame::parse(&frame.serialize()).unwrap();
        assert_eq!(parsed, frame);
    }

    #[test]
    fn roundtrip_call_error() {
        let frame = OcppFrame::error_response("id3", "GenericError", "boom");
        let parsed = OcppFrame::parse(&frame.serialize()).unwrap();
        assert_eq!(parsed, frame);
    }
}
