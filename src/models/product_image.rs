//! ProductImage entity model
//!
//! Ordered image attachments. The external image id is kept so size variants
//! can be derived on demand instead of storing every variant.

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use uuid::Uuid;

/// Image kind for the cover art
pub const IMAGE_KIND_COVER: &str = "cover";
/// Image kind for screenshots
pub const IMAGE_KIND_SCREENSHOT: &str = "screenshot";

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "product_images")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub product_id: Uuid,
    /// `cover` or `screenshot`
    pub kind: String,
    pub external_image_id: Option<String>,
    /// Default-size URL
    pub url: String,
    pub width: Option<i32>,
    pub height: Option<i32>,
    /// 1-based display order
    pub position: i32,
    pub is_primary: bool,
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
