//! Create message_log table

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(MessageLog::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(MessageLog::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(MessageLog::ChargePointId).string().not_null())
                    .col(ColumnDef::new(MessageLog::Direction).string().not_null())
                    .col(ColumnDef::new(MessageLog::Payload).text().not_null())
                    .col(
                        ColumnDef::new(MessageLog::RecordedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_message_log_charge_point_id")
                    .table(MessageLog::Table)
                    .col(MessageLog::ChargePointId)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(MessageLog::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
pub enum MessageLog {
    Table,
    Id,
    ChargePointId,
    Direction,
    Payload,
    RecordedAt,
}
