//! The session mediator — the hard part. Per-charger state (`mediator`),
//! the process-wide registry keyed by charge point id (`registry`), the
//! standalone CSMS-absent responder (`standalone`), TTL bookkeeping
//! (`ttl`), reconnect backoff math (`reconnect`), and the off-hot-path log
//! write queue (`log_queue`).

pub mod log_queue;
pub mod mediator;
pub mod reconnect;
pub mod registry;
pub mod standalone;
pub mod ttl;

pub use mediator::{Mediator, Session, UpstreamStatus};
pub use registry::SessionRegistry;
