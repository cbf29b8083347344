//! Outward-facing adapters: the SeaORM/SQLite persistence backend and the
//! upstream CSMS WebSocket client.

pub mod database;
pub mod memory;
pub mod upstream;

pub use database::SeaOrmPersistence;
pub use memory::InMemoryPersistence;
