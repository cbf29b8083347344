pub mod entities;
pub mod migrator;
pub mod repository;

pub use repository::SeaOrmPersistence;

use sea_orm::{Database, DatabaseConnection, DbErr};
use sea_orm_migration::MigratorTrait;
use tracing::info;

/// Open the database connection and run any pending migrations.
pub async fn connect_and_migrate(url: &str) -> Result<DatabaseConnection, DbErr> {
    info!(url, "connecting to database");
    let db = Database::connect(url).await?;
    migrator::Migrator::up(&db, None).await?;
    Ok(db)
}
