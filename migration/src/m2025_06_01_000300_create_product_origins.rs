//! Migration to create the product_origins table.
//!
//! One row per imported product recording where it came from. The pair
//! (origin, external_id) is the import idempotency key.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(ProductOrigins::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ProductOrigins::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(ProductOrigins::ProductId).uuid().not_null())
                    .col(ColumnDef::new(ProductOrigins::Origin).text().not_null())
                    .col(ColumnDef::new(ProductOrigins::ExternalId).text().not_null())
                    .col(ColumnDef::new(ProductOrigins::ExternalUrl).text().null())
                    .col(
                        ColumnDef::new(ProductOrigins::ImportedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(ProductOrigins::LastSyncedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(ProductOrigins::DataVersion)
                            .integer()
                            .not_null()
                            .default(1),
                    )
                    .col(
                        ColumnDef::new(ProductOrigins::SyncEnabled)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_product_origins_product_id")
                            .from(ProductOrigins::Table, ProductOrigins::ProductId)
                            .to(Products::Table, Products::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_product_origins_origin_external")
                    .table(ProductOrigins::Table)
                    .col(ProductOrigins::Origin)
                    .col(ProductOrigins::ExternalId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_product_origins_product_id")
                    .table(ProductOrigins::Table)
                    .col(ProductOrigins::ProductId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // Stale selection scans by origin and last sync time
        manager
            .create_index(
                Index::create()
                    .name("idx_product_origins_stale")
                    .table(ProductOrigins::Table)
                    .col(ProductOrigins::Origin)
                    .col(ProductOrigins::SyncEnabled)
                    .col(ProductOrigins::LastSyncedAt)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        for index in [
            "idx_product_origins_stale",
            "idx_product_origins_product_id",
            "idx_product_origins_origin_external",
        ] {
            manager
                .drop_index(Index::drop().name(index).to_owned())
                .await?;
        }

        manager
            .drop_table(Table::drop().table(ProductOrigins::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum ProductOrigins {
    Table,
    Id,
    ProductId,
    Origin,
    ExternalId,
    ExternalUrl,
    ImportedAt,
    LastSyncedAt,
    DataVersion,
    SyncEnabled,
}

#[derive(DeriveIden)]
enum Products {
    Table,
    Id,
}
