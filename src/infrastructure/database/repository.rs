//! SeaORM implementation of `PersistenceProvider`.

use std::str::FromStr;

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, ActiveValue::NotSet, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};
use tracing::{debug, warn};

use crate::config::ConfigSnapshot;
use crate::domain::charger::{ChargerRow, ChargerStatus};
use crate::domain::log::MessageLogRecord;
use crate::domain::persistence::PersistenceProvider;
use crate::domain::user::UserRecord;
use crate::support::errors::PersistenceError;

use super::entities::{charger, config_entry, message_log, user};

pub struct SeaOrmPersistence {
    db: DatabaseConnection,
}

impl SeaOrmPersistence {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

fn status_to_string(status: ChargerStatus) -> String {
    match status {
        ChargerStatus::Online => "ONLINE".to_string(),
        ChargerStatus::Offline => "OFFLINE".to_string(),
    }
}

fn string_to_status(s: &str) -> ChargerStatus {
    match s {
        "ONLINE" => ChargerStatus::Online,
        _ => ChargerStatus::Offline,
    }
}

fn row_from_model(model: charger::Model) -> Result<ChargerRow, PersistenceError> {
    let max_power = model
        .max_power
        .as_deref()
        .map(Decimal::from_str)
        .transpose()
        .map_err(|e| PersistenceError::Other(format!("stored max_power is not a valid decimal: {e}")))?;

    Ok(ChargerRow {
        charge_point_id: model.charge_point_id,
        status: string_to_status(&model.status),
        last_seen: model.last_seen,
        max_power,
    })
}

#[async_trait]
impl PersistenceProvider for SeaOrmPersistence {
    async fn load_config(&self) -> Result<ConfigSnapshot, PersistenceError> {
        let row = config_entry::Entity::find_by_id(config_entry::SINGLETON_ID)
            .one(&self.db)
            .await?;

        match row {
            Some(row) => {
                let config: ConfigSnapshot = toml::from_str(&row.body)
                    .map_err(|e| PersistenceError::Other(format!("stored config is not valid TOML: {e}")))?;
                Ok(config)
            }
            None => {
                let default = ConfigSnapshot::default();
                self.save_config(&default).await?;
                Ok(default)
            }
        }
    }

    async fn save_config(&self, config: &ConfigSnapshot) -> Result<(), PersistenceError> {
        let body = toml::to_string(config)
            .map_err(|e| PersistenceError::Other(format!("failed to serialize config: {e}")))?;

        let existing = config_entry::Entity::find_by_id(config_entry::SINGLETON_ID)
            .one(&self.db)
            .await?;

        let model = config_entry::ActiveModel {
            id: Set(config_entry::SINGLETON_ID),
            body: Set(body),
        };

        if existing.is_some() {
            model.update(&self.db).await?;
        } else {
            model.insert(&self.db).await?;
        }
        Ok(())
    }

    async fn ensure_charger(&self, charge_point_id: &str) -> Result<ChargerRow, PersistenceError> {
        if let Some(model) = charger::Entity::find_by_id(charge_point_id).one(&self.db).await? {
            return row_from_model(model);
        }

        debug!(charge_point_id, "creating new charger row");
        let row = ChargerRow::new(charge_point_id);
        let model = charger::ActiveModel {
            charge_point_id: Set(row.charge_point_id.clone()),
            status: Set(status_to_string(row.status)),
            last_seen: Set(row.last_seen),
            max_power: Set(None),
        };
        model.insert(&self.db).await?;
        Ok(row)
    }

    async fn get_charger(&self, charge_point_id: &str) -> Result<Option<ChargerRow>, PersistenceError> {
        match charger::Entity::find_by_id(charge_point_id).one(&self.db).await? {
            Some(model) => Ok(Some(row_from_model(model)?)),
            None => Ok(None),
        }
    }

    async fn mark_status(&self, charge_point_id: &str, status: ChargerStatus) -> Result<(), PersistenceError> {
        let existing = charger::Entity::find_by_id(charge_point_id).one(&self.db).await?;
        let Some(existing) = existing else {
            warn!(charge_point_id, "mark_status on unknown charger; ignoring");
            return Ok(());
        };

        let model = charger::ActiveModel {
            charge_point_id: Set(existing.charge_point_id),
            status: Set(status_to_string(status)),
            last_seen: Set(Utc::now()),
            max_power: NotSet,
        };
        model.update(&self.db).await?;
        Ok(())
    }

    async fn set_max_power(
        &self,
        charge_point_id: &str,
        amperes: Option<Decimal>,
    ) -> Result<(), PersistenceError> {
        let existing = charger::Entity::find_by_id(charge_point_id).one(&self.db).await?;
        let Some(existing) = existing else {
            return Err(PersistenceError::Other(format!(
                "cannot set persistent limit: charger {charge_point_id} has no row"
            )));
        };

        let model = charger::ActiveModel {
            charge_point_id: Set(existing.charge_point_id),
            status: NotSet,
            last_seen: NotSet,
            max_power: Set(amperes.map(|d| d.to_string())),
        };
        model.update(&self.db).await?;
        Ok(())
    }

    async fn append_log(&self, record: MessageLogRecord) -> Result<(), PersistenceError> {
        let model = message_log::ActiveModel {
            id: NotSet,
            charge_point_id: Set(record.charge_point_id),
            direction: Set(record.direction.to_string()),
            payload: Set(record.payload.to_string()),
            recorded_at: Set(record.recorded_at),
        };
        model.insert(&self.db).await?;
        Ok(())
    }

    async fn find_user(&self, username: &str) -> Result<Option<UserRecord>, PersistenceError> {
        let model = user::Entity::find()
            .filter(user::Column::Username.eq(username))
            .one(&self.db)
            .await?;

        Ok(model.map(|m| UserRecord {
            username: m.username,
            password_hash: m.password_hash,
        }))
    }
}
