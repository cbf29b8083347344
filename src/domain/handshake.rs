//! The pieces of a charger's upgrade request the mediator must replay
//! verbatim on every upstream (re)connect.

/// Immutable snapshot of the charger's WebSocket upgrade, captured once by
/// the acceptor and reused for the lifetime of the session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HandshakeMeta {
    /// The charger's `Authorization` header, if it sent one. Forwarded
    /// verbatim to the CSMS — Basic Auth is common for OCPP Security
    /// Profile 1 and the proxy does not interpret it.
    pub authorization: Option<String>,
    /// The subprotocol negotiated with the charger (e.g. `ocpp1.6`).
    /// Forwarded as the requested subprotocol upstream without checking
    /// that the CSMS accepts it — the charger picked it, not the proxy.
    pub subprotocol: Option<String>,
}
