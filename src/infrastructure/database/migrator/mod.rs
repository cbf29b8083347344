//! Database migrations module

pub use sea_orm_migration::prelude::*;

mod m20240101_000001_create_chargers;
mod m20240101_000002_create_config_entries;
mod m20240101_000003_create_message_log;
mod m20240101_000004_create_users;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240101_000001_create_chargers::Migration),
            Box::new(m20240101_000002_create_config_entries::Migration),
            Box::new(m20240101_000003_create_message_log::Migration),
            Box::new(m20240101_000004_create_users::Migration),
        ]
    }
}
