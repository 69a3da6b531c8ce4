//! Genre entity model
//!
//! Shared reference data. Genres first seen during an import are created with
//! origin `imported`.

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use sea_orm::prelude::DateTimeWithTimeZone;
use uuid::Uuid;

/// Origin value for genres created by the import pipeline
pub const GENRE_ORIGIN_IMPORTED: &str = "imported";

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "genres")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    /// Numeric identifier in the game database, unique when present
    pub external_id: Option<i64>,
    /// Where the row came from (`manual` or `imported`)
    pub origin: String,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
