//! Migration to create the product_images and product_videos tables.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(ProductImages::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ProductImages::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(ProductImages::ProductId).uuid().not_null())
                    .col(ColumnDef::new(ProductImages::Kind).text().not_null())
                    .col(ColumnDef::new(ProductImages::ExternalImageId).text().null())
                    .col(ColumnDef::new(ProductImages::Url).text().not_null())
                    .col(ColumnDef::new(ProductImages::Width).integer().null())
                    .col(ColumnDef::new(ProductImages::Height).integer().null())
                    .col(ColumnDef::new(ProductImages::Position).integer().not_null())
                    .col(
                        ColumnDef::new(ProductImages::IsPrimary)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_product_images_product_id")
                            .from(ProductImages::Table, ProductImages::ProductId)
                            .to(Products::Table, Products::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_product_images_product_id")
                    .table(ProductImages::Table)
                    .col(ProductImages::ProductId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(ProductVideos::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ProductVideos::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(ProductVideos::ProductId).uuid().not_null())
                    .col(ColumnDef::new(ProductVideos::Kind).text().not_null())
                    .col(ColumnDef::new(ProductVideos::Name).text().null())
                    .col(ColumnDef::new(ProductVideos::ExternalVideoId).text().not_null())
                    .col(ColumnDef::new(ProductVideos::Url).text().not_null())
                    .col(ColumnDef::new(ProductVideos::Position).integer().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_product_videos_product_id")
                            .from(ProductVideos::Table, ProductVideos::ProductId)
                            .to(Products::Table, Products::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_product_videos_product_id")
                    .table(ProductVideos::Table)
                    .col(ProductVideos::ProductId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(Index::drop().name("idx_product_videos_product_id").to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(ProductVideos::Table).to_owned())
            .await?;
        manager
            .drop_index(Index::drop().name("idx_product_images_product_id").to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(ProductImages::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum ProductImages {
    Table,
    Id,
    ProductId,
    Kind,
    ExternalImageId,
    Url,
    Width,
    Height,
    Position,
    IsPrimary,
}

#[derive(DeriveIden)]
enum ProductVideos {
    Table,
    Id,
    ProductId,
    Kind,
    Name,
    ExternalVideoId,
    Url,
    Position,
}

#[derive(DeriveIden)]
enum Products {
    Table,
    Id,
}
