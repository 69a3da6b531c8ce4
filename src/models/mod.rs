//! # Data Models
//!
//! SeaORM entities for the storefront catalog tables touched by the import
//! pipeline.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

pub mod genre;
pub mod platform;
pub mod product;
pub mod product_genre;
pub mod product_image;
pub mod product_origin;
pub mod product_platform;
pub mod product_video;

pub use genre::Entity as Genre;
pub use platform::Entity as Platform;
pub use product::Entity as Product;
pub use product_image::Entity as ProductImage;
pub use product_origin::Entity as ProductOrigin;
pub use product_video::Entity as ProductVideo;

/// Basic service information response
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ServiceInfo {
    /// The name of the service
    pub service: String,
    /// The version of the service
    pub version: String,
}

impl Default for ServiceInfo {
    fn default() -> Self {
        Self {
            service: "catalog-sync".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}
