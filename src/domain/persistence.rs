//! The narrow persistence contract the mediator depends on. Any backend
//! that honors it is acceptable; the crate ships a SeaORM/SQLite one under
//! `infrastructure`, but nothing above this trait knows that.

use async_trait::async_trait;
use rust_decimal::Decimal;

use crate::config::ConfigSnapshot;
use crate::support::errors::PersistenceError;

use super::charger::{ChargerRow, ChargerStatus};
use super::log::MessageLogRecord;
use super::user::UserRecord;

#[async_trait]
pub trait PersistenceProvider: Send + Sync {
    /// Load the current configuration, seeding defaults on first boot.
    async fn load_config(&self) -> Result<ConfigSnapshot, PersistenceError>;

    /// Persist a full configuration snapshot.
    async fn save_config(&self, config: &ConfigSnapshot) -> Result<(), PersistenceError>;

    /// Seed persistence with `seed` on first boot only. "First boot" is
    /// detected by `load_config` handing back the literal `RuntimeConfig`
    /// default — the only value it invents on its own when no row exists
    /// yet. If an operator's TOML seed happens to equal the hardcoded
    /// default, the two are indistinguishable anyway, so treating that
    /// case as "already seeded" costs nothing.
    async fn seed_config(&self, seed: &ConfigSnapshot) -> Result<ConfigSnapshot, PersistenceError> {
        let current = self.load_config().await?;
        if current == ConfigSnapshot::default() {
            self.save_config(seed).await?;
            return Ok(seed.clone());
        }
        Ok(current)
    }

    /// Insert the row for a charger if absent, otherwise leave existing
    /// fields (status/last_seen/max_power) untouched.
    async fn ensure_charger(&self, charge_point_id: &str) -> Result<ChargerRow, PersistenceError>;

    async fn get_charger(&self, charge_point_id: &str) -> Result<Option<ChargerRow>, PersistenceError>;

    async fn mark_status(
        &self,
        charge_point_id: &str,
        status: ChargerStatus,
    ) -> Result<(), PersistenceError>;

    /// Set or clear the durable per-charger current limit.
    async fn set_max_power(
        &self,
        charge_point_id: &str,
        amperes: Option<Decimal>,
    ) -> Result<(), PersistenceError>;

    /// Append a record to the structured message log. Never allowed to
    /// block the forwarding path — callers hand this off via a queue.
    async fn append_log(&self, record: MessageLogRecord) -> Result<(), PersistenceError>;

    async fn find_user(&self, username: &str) -> Result<Option<UserRecord>, PersistenceError>;
}
