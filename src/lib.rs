//! # OCPP Mediating Proxy
//!
//! A transparent man-in-the-middle proxy for OCPP 1.6J/2.0.1 over WebSocket,
//! splicing traffic between charging stations and a CSMS while recording
//! every frame, enforcing owner policy, and allowing owner-initiated command
//! injection invisible to the CSMS.
//!
//! ## Architecture
//!
//! - **support**: cross-cutting utilities (errors, shutdown, id generation)
//! - **domain**: frames, session data model, persistence contract
//! - **infrastructure**: SeaORM-backed persistence, upstream WS client
//! - **session**: the session mediator — the hard part
//! - **ws**: charger-facing WebSocket acceptor
//! - **control**: thin REST surface consumed by the (external) dashboard
//! - **config**: TOML-based configuration with hot reload

pub mod config;
pub mod control;
pub mod domain;
pub mod infrastructure;
pub mod session;
pub mod support;
pub mod ws;

pub use config::{ConfigSnapshot, RuntimeConfig};
pub use domain::frame::OcppFrame;
pub use session::mediator::Mediator;
pub use session::registry::SessionRegistry;
