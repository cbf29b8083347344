//! Charger row entity.

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "chargers")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub charge_point_id: String,

    pub status: String,
    pub last_seen: DateTimeUtc,

    /// Persistent current limit in amperes, stored as text to preserve
    /// `rust_decimal` precision across the sqlite round trip.
    #[sea_orm(nullable)]
    pub max_power: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
