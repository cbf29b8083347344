//! A single persisted configuration row. The whole table holds exactly one
//! row, keyed by a constant id — simpler than a key/value table for a
//! config object that is always read and written as a single snapshot.

use sea_orm::entity::prelude::*;

pub const SINGLETON_ID: i32 = 1;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "config_entries")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: i32,

    /// The full `RuntimeConfig`, serialized as TOML.
    pub body: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
