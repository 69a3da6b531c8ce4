//! Platform seeding functionality
//!
//! Installs the platforms most imported games reference, keyed by their
//! game database ids.

use anyhow::Result;
use sea_orm::DatabaseConnection;
use std::sync::Arc;

use crate::repositories::SeaOrmCatalogStore;

struct PlatformSeed {
    name: &'static str,
    slug: &'static str,
    external_id: i64,
}

impl PlatformSeed {
    const fn new(name: &'static str, slug: &'static str, external_id: i64) -> Self {
        Self {
            name,
            slug,
            external_id,
        }
    }
}

const PLATFORMS: &[PlatformSeed] = &[
    PlatformSeed::new("PC (Microsoft Windows)", "win", 6),
    PlatformSeed::new("Mac", "mac", 14),
    PlatformSeed::new("Linux", "linux", 3),
    PlatformSeed::new("PlayStation 3", "ps3", 9),
    PlatformSeed::new("PlayStation 4", "ps4--1", 48),
    PlatformSeed::new("PlayStation 5", "ps5", 167),
    PlatformSeed::new("Xbox 360", "xbox360", 12),
    PlatformSeed::new("Xbox One", "xboxone", 49),
    PlatformSeed::new("Xbox Series X|S", "series-x-s", 169),
    PlatformSeed::new("Nintendo Switch", "switch", 130),
    PlatformSeed::new("Wii U", "wiiu", 41),
    PlatformSeed::new("Nintendo 3DS", "3ds", 37),
    PlatformSeed::new("iOS", "ios", 39),
    PlatformSeed::new("Android", "android", 34),
];

/// Seeds the platforms table with common gaming platforms
///
/// Existing rows (matched by external id) are left untouched, so the
/// function is safe to run on every start. Returns the number of rows created.
pub async fn seed_platforms(db: &DatabaseConnection) -> Result<usize> {
    let store = SeaOrmCatalogStore::new(Arc::new(db.clone()));
    let mut created = 0;

    for seed in PLATFORMS {
        if store
            .insert_platform_if_missing(seed.name, seed.slug, seed.external_id)
            .await?
        {
            log::info!("Created platform: {}", seed.slug);
            created += 1;
        } else {
            log::debug!("Platform '{}' already exists, skipping", seed.slug);
        }
    }

    log::info!("Platform seeding completed ({} created)", created);
    Ok(created)
}
