//! Product entity model
//!
//! This module contains the SeaORM entity model for the products table,
//! the storefront's game entity.

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use sea_orm::prelude::DateTimeWithTimeZone;
use serde_json::Value as JsonValue;
use uuid::Uuid;

/// Product entity representing a sellable game
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "products")]
pub struct Model {
    /// Unique identifier for the product (primary key)
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// Display name
    pub name: String,

    /// URL slug, copied from the source record
    pub slug: String,

    /// Short description, at most 500 characters
    pub description: Option<String>,

    /// Long-form description
    pub long_description: Option<String>,

    /// First release date
    pub release_date: Option<Date>,

    /// Rating on a 0-10 scale with two decimals
    pub rating: Option<f64>,

    /// Lifecycle status (see [`crate::mapper::GameStatus`])
    pub status: String,

    /// Whether the product may be exposed at checkout
    pub activated_for_sale: bool,

    /// Price in minor currency units
    pub price_cents: i64,

    /// Units in stock
    pub stock: i32,

    /// Store and website links keyed by display label
    #[sea_orm(column_type = "JsonBinary")]
    pub external_links: Option<JsonValue>,

    /// Timestamp when the product was created
    pub created_at: DateTimeWithTimeZone,

    /// Timestamp when the product was last updated
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_one = "super::product_origin::Entity")]
    Origin,
    #[sea_orm(has_many = "super::product_image::Entity")]
    Images,
    #[sea_orm(has_many = "super::product_video::Entity")]
    Videos,
}

impl Related<super::product_origin::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Origin.def()
    }
}

impl Related<super::product_image::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Images.def()
    }
}

impl Related<super::product_video::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Videos.def()
    }
}

impl Related<super::platform::Entity> for Entity {
    fn to() -> RelationDef {
        super::product_platform::Relation::Platform.def()
    }

    fn via() -> Option<RelationDef> {
        Some(super::product_platform::Relation::Product.def().rev())
    }
}

impl Related<super::genre::Entity> for Entity {
    fn to() -> RelationDef {
        super::product_genre::Relation::Genre.def()
    }

    fn via() -> Option<RelationDef> {
        Some(super::product_genre::Relation::Product.def().rev())
    }
}

impl ActiveModelBehavior for ActiveModel {}
