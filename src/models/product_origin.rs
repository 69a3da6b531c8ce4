//! ProductOrigin entity model
//!
//! Provenance of an imported product. The pair (origin, external_id) is unique
//! and acts as the import idempotency key.

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use sea_orm::prelude::DateTimeWithTimeZone;
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "product_origins")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// Product this origin belongs to (one origin per product)
    pub product_id: Uuid,

    /// Origin tag, e.g. `EXTERNAL_DB`
    pub origin: String,

    /// Identifier of the record in the external source
    pub external_id: String,

    /// Public page of the record in the external source
    pub external_url: Option<String>,

    /// Timestamp of the first import
    pub imported_at: DateTimeWithTimeZone,

    /// Timestamp of the last successful re-sync
    pub last_synced_at: Option<DateTimeWithTimeZone>,

    /// Incremented on every successful re-sync
    pub data_version: i32,

    /// Cleared when the external record disappears
    pub sync_enabled: bool,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::product::Entity",
        from = "Column::ProductId",
        to = "super::product::Column::Id"
    )]
    Product,
}

impl Related<super::product::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Product.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
