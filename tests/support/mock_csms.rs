#![allow(dead_code)]
//! A single-connection fake CSMS, grounded in the pack's own
//! `modbus_mock_server.rs` pattern: bind a real loopback listener, accept
//! one connection, and give the test a handle to send/receive frames on
//! it. The mediator's upstream client only knows how to dial a real
//! WebSocket, so scenarios that exercise the forwarding path need a real
//! (if tiny) server on the other end rather than an in-process fake.

use std::net::SocketAddr;

use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::WebSocketStream;

pub struct MockCsms {
    listener: TcpListener,
    addr: SocketAddr,
}

impl MockCsms {
    pub async fn bind() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind mock csms listener");
        let addr = listener.local_addr().expect("mock csms local addr");
        Self { listener, addr }
    }

    /// Base URL a `RuntimeConfig::target_csms_url` can point at; the
    /// mediator appends `/{chargePointId}` itself.
    pub fn base_url(&self) -> String {
        format!("ws://{}", self.addr)
    }

    /// Accept the next inbound connection and complete its WebSocket
    /// handshake. Resolves once the mediator's `upstream::connect` call is
    /// far enough along that the TCP+WS handshake has round-tripped.
    pub async fn accept(&self) -> MockCsmsConnection {
        let (stream, _) = self.listener.accept().await.expect("accept tcp connection");
        let ws = tokio_tungstenite::accept_async(stream).await.expect("complete ws handshake");
        MockCsmsConnection { ws }
    }
}

pub struct MockCsmsConnection {
    ws: WebSocketStream<TcpStream>,
}

impl MockCsmsConnection {
    pub async fn send_text(&mut self, text: impl Into<String>) {
        self.ws.send(Message::Text(text.into())).await.expect("send frame to charger via mock csms");
    }

    /// Next text frame, skipping pings/pongs. `None` if the connection
    /// closed without sending one.
    pub async fn recv_text(&mut self) -> Option<String> {
        loop {
            match self.ws.next().await {
                Some(Ok(Message::Text(text))) => return Some(text),
                Some(Ok(_)) => continue,
                Some(Err(_)) | None => return None,
            }
        }
    }

    pub async fn close(mut self) {
        let _ = self.ws.close(None).await;
    }
}
