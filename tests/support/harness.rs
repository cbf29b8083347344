#![allow(dead_code)]
//! Builds a `Mediator` wired to an `InMemoryPersistence` and a real
//! background log worker, the way `main.rs` wires one to the SeaORM
//! backend. Scenario tests drive the mediator's public API directly and
//! talk to the simulated charger over a plain `mpsc` channel instead of a
//! WebSocket, per `SPEC_FULL.md` §8's "in-process fake sockets" testing
//! note — only the upstream side needs a real socket, since that's the
//! only connection the mediator itself opens.

use std::sync::Arc;

use ocpp_proxy::config::{ConfigStore, RuntimeConfig};
use ocpp_proxy::domain::PersistenceProvider;
use ocpp_proxy::infrastructure::InMemoryPersistence;
use ocpp_proxy::session::log_queue::{run_log_worker, LogQueue};
use ocpp_proxy::session::Mediator;
use ocpp_proxy::support::shutdown::ShutdownSignal;

pub struct Harness {
    pub mediator: Mediator,
    pub persistence: Arc<InMemoryPersistence>,
}

pub async fn build(config: RuntimeConfig) -> Harness {
    let persistence = Arc::new(InMemoryPersistence::new());
    let persistence_for_mediator: Arc<dyn PersistenceProvider> = persistence.clone();
    let persistence_for_worker: Arc<dyn PersistenceProvider> = persistence.clone();

    let config_store = Arc::new(ConfigStore::new(config));
    let log_queue = Arc::new(LogQueue::new(4096));

    let shutdown = ShutdownSignal::new();
    tokio::spawn(run_log_worker(log_queue.clone(), persistence_for_worker, shutdown));

    let mediator = Mediator::new(config_store, persistence_for_mediator, log_queue);
    Harness { mediator, persistence }
}

/// Extract the OCPP message id (array index 1) from a logged frame's JSON
/// payload — the log stores the decoded frame re-encoded as a JSON array,
/// not an object with a named `id` field.
pub fn logged_id(payload: &serde_json::Value) -> &str {
    payload
        .as_array()
        .and_then(|arr| arr.get(1))
        .and_then(serde_json::Value::as_str)
        .expect("logged payload is an OCPP frame array with a string id at index 1")
}
