//! Connecting to the upstream CSMS.
//!
//! This module only knows how to open one connection; the reconnect
//! schedule, backoff math, and egress buffering live in `session::mediator`
//! where the rest of the per-session state already is.

use std::time::Duration;

use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::{Connector, MaybeTlsStream, WebSocketStream};

use crate::domain::handshake::HandshakeMeta;

pub type UpstreamStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

#[derive(Debug, thiserror::Error)]
pub enum UpstreamConnectError {
    #[error("connect timed out after {0:?}")]
    Timeout(Duration),
    #[error("websocket handshake failed: {0}")]
    Handshake(#[from] tokio_tungstenite::tungstenite::Error),
    #[error("invalid upstream url: {0}")]
    InvalidUrl(String),
}

/// Open a WebSocket connection to the CSMS at `url`, replaying the
/// charger's handshake metadata verbatim and bounding the attempt by
/// `timeout`.
///
/// TLS hostname verification is intentionally disabled: self-signed CSMS
/// endpoints are expected, and operators who need verification are meant to
/// terminate TLS in front of this proxy.
pub async fn connect(
    url: &str,
    handshake: &HandshakeMeta,
    timeout: Duration,
) -> Result<UpstreamStream, UpstreamConnectError> {
    let mut request = url
        .into_client_request()
        .map_err(|e| UpstreamConnectError::InvalidUrl(e.to_string()))?;

    if let Some(auth) = &handshake.authorization {
        if let Ok(value) = HeaderValue::from_str(auth) {
            request.headers_mut().insert("Authorization", value);
        }
    }
    if let Some(subprotocol) = &handshake.subprotocol {
        if let Ok(value) = HeaderValue::from_str(subprotocol) {
            request.headers_mut().insert("Sec-WebSocket-Protocol", value);
        }
    }

    let connector = Connector::NativeTls(
        native_tls::TlsConnector::builder()
            .danger_accept_invalid_certs(true)
            .danger_accept_invalid_hostnames(true)
            .build()
            .expect("native-tls connector configuration is static and always valid"),
    );

    let connect_fut =
        tokio_tungstenite::connect_async_tls_with_config(request, None, false, Some(connector));

    match tokio::time::timeout(timeout, connect_fut).await {
        Ok(Ok((stream, _response))) => Ok(stream),
        Ok(Err(e)) => Err(UpstreamConnectError::Handshake(e)),
        Err(_) => Err(UpstreamConnectError::Timeout(timeout)),
    }
}
