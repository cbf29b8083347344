//! An in-memory `PersistenceProvider`, used by the mediator's own unit
//! tests and by the `tests/mediator_scenarios.rs` integration suite in
//! place of the SeaORM backend. Not behind `#[cfg(test)]` since the
//! integration test crate links against this library as a dependency and
//! needs the same type.

use std::sync::Mutex;

use async_trait::async_trait;
use rust_decimal::Decimal;

use crate::config::ConfigSnapshot;
use crate::domain::charger::{ChargerRow, ChargerStatus};
use crate::domain::log::MessageLogRecord;
use crate::domain::persistence::PersistenceProvider;
use crate::domain::user::UserRecord;
use crate::support::errors::PersistenceError;

#[derive(Default)]
struct State {
    config: Option<ConfigSnapshot>,
    chargers: std::collections::HashMap<String, ChargerRow>,
    log: Vec<MessageLogRecord>,
    users: std::collections::HashMap<String, UserRecord>,
}

/// A process-local, non-durable stand-in for the SeaORM/SQLite backend.
pub struct InMemoryPersistence {
    state: Mutex<State>,
}

impl InMemoryPersistence {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State::default()),
        }
    }

    pub fn with_user(self, user: UserRecord) -> Self {
        self.state.lock().unwrap().users.insert(user.username.clone(), user);
        self
    }

    /// Snapshot of every logged record, in append order — used by the
    /// scenario tests to assert on direction tags.
    pub fn log_snapshot(&self) -> Vec<MessageLogRecord> {
        self.state.lock().unwrap().log.clone()
    }

    pub fn seed_charger(&self, row: ChargerRow) {
        self.state.lock().unwrap().chargers.insert(row.charge_point_id.clone(), row);
    }
}

impl Default for InMemoryPersistence {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PersistenceProvider for InMemoryPersistence {
    async fn load_config(&self) -> Result<ConfigSnapshot, PersistenceError> {
        let mut state = self.state.lock().unwrap();
        if let Some(config) = &state.config {
            return Ok(config.clone());
        }
        let default = ConfigSnapshot::default();
        state.config = Some(default.clone());
        Ok(default)
    }

    async fn save_config(&self, config: &ConfigSnapshot) -> Result<(), PersistenceError> {
        self.state.lock().unwrap().config = Some(config.clone());
        Ok(())
    }

    async fn ensure_charger(&self, charge_point_id: &str) -> Result<ChargerRow, PersistenceError> {
        let mut state = self.state.lock().unwrap();
        Ok(state
            .chargers
            .entry(charge_point_id.to_string())
            .or_insert_with(|| ChargerRow::new(charge_point_id))
            .clone())
    }

    async fn get_charger(&self, charge_point_id: &str) -> Result<Option<ChargerRow>, PersistenceError> {
        Ok(self.state.lock().unwrap().chargers.get(charge_point_id).cloned())
    }

    async fn mark_status(&self, charge_point_id: &str, status: ChargerStatus) -> Result<(), PersistenceError> {
        let mut state = self.state.lock().unwrap();
        if let Some(row) = state.chargers.get_mut(charge_point_id) {
            row.status = status;
            row.last_seen = chrono::Utc::now();
        }
        Ok(())
    }

    async fn set_max_power(&self, charge_point_id: &str, amperes: Option<Decimal>) -> Result<(), PersistenceError> {
        let mut state = self.state.lock().unwrap();
        let Some(row) = state.chargers.get_mut(charge_point_id) else {
            return Err(PersistenceError::Other(format!(
                "cannot set persistent limit: charger {charge_point_id} has no row"
            )));
        };
        row.max_power = amperes;
        Ok(())
    }

    async fn append_log(&self, record: MessageLogRecord) -> Result<(), PersistenceError> {
        self.state.lock().unwrap().log.push(record);
        Ok(())
    }

    async fn find_user(&self, username: &str) -> Result<Option<UserRecord>, PersistenceError> {
        Ok(self.state.lock().unwrap().users.get(username).cloned())
    }
}
