//! Migration to create the product_platforms and product_genres join tables.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(ProductPlatforms::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(ProductPlatforms::ProductId).uuid().not_null())
                    .col(ColumnDef::new(ProductPlatforms::PlatformId).uuid().not_null())
                    .primary_key(
                        Index::create()
                            .col(ProductPlatforms::ProductId)
                            .col(ProductPlatforms::PlatformId),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_product_platforms_product_id")
                            .from(ProductPlatforms::Table, ProductPlatforms::ProductId)
                            .to(Products::Table, Products::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_product_platforms_platform_id")
                            .from(ProductPlatforms::Table, ProductPlatforms::PlatformId)
                            .to(Platforms::Table, Platforms::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(ProductGenres::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(ProductGenres::ProductId).uuid().not_null())
                    .col(ColumnDef::new(ProductGenres::GenreId).uuid().not_null())
                    .primary_key(
                        Index::create()
                            .col(ProductGenres::ProductId)
                            .col(ProductGenres::GenreId),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_product_genres_product_id")
                            .from(ProductGenres::Table, ProductGenres::ProductId)
                            .to(Products::Table, Products::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_product_genres_genre_id")
                            .from(ProductGenres::Table, ProductGenres::GenreId)
                            .to(Genres::Table, Genres::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(ProductGenres::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(ProductPlatforms::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum ProductPlatforms {
    Table,
    ProductId,
    PlatformId,
}

#[derive(DeriveIden)]
enum ProductGenres {
    Table,
    ProductId,
    GenreId,
}

#[derive(DeriveIden)]
enum Products {
    Table,
    Id,
}

#[derive(DeriveIden)]
enum Platforms {
    Table,
    Id,
}

#[derive(DeriveIden)]
enum Genres {
    Table,
    Id,
}
