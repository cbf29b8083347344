//! Database entities module

pub mod charger;
pub mod config_entry;
pub mod message_log;
pub mod user;

pub use charger::Entity as Charger;
pub use config_entry::Entity as ConfigEntry;
pub use message_log::Entity as MessageLog;
pub use user::Entity as User;
