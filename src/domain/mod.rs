//! Core data model: frames, the persistent charger row, typed message
//! payloads, the message log, and the persistence contract they're all
//! read and written through.

pub mod charger;
pub mod frame;
pub mod handshake;
pub mod log;
pub mod messages;
pub mod persistence;
pub mod user;

pub use charger::{ChargerRow, ChargerStatus};
pub use frame::{MalformedFrame, OcppFrame};
pub use handshake::HandshakeMeta;
pub use log::{Direction, MessageLogRecord};
pub use persistence::PersistenceProvider;
