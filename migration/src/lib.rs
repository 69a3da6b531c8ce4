//! Database migrations for the catalog sync service.
//!
//! This module contains all database migrations using SeaORM Migration.

pub use sea_orm_migration::prelude::*;

mod m2025_06_01_000100_create_reference_tables;
mod m2025_06_01_000200_create_products;
mod m2025_06_01_000300_create_product_origins;
mod m2025_06_01_000400_create_product_media;
mod m2025_06_01_000500_create_product_links;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m2025_06_01_000100_create_reference_tables::Migration),
            Box::new(m2025_06_01_000200_create_products::Migration),
            Box::new(m2025_06_01_000300_create_product_origins::Migration),
            Box::new(m2025_06_01_000400_create_product_media::Migration),
            Box::new(m2025_06_01_000500_create_product_links::Migration),
        ]
    }
}
