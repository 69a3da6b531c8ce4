//! Migration to create the platforms and genres reference tables.
//!
//! Both tables are shared lookup data referenced by many products. Rows that
//! came from the game database carry its numeric identifier, which is unique.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Platforms::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Platforms::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Platforms::Name).text().not_null())
                    .col(ColumnDef::new(Platforms::Slug).text().not_null())
                    .col(ColumnDef::new(Platforms::ExternalId).big_integer().null())
                    .col(
                        ColumnDef::new(Platforms::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_platforms_external_id")
                    .table(Platforms::Table)
                    .col(Platforms::ExternalId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Genres::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Genres::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Genres::Name).text().not_null())
                    .col(ColumnDef::new(Genres::Slug).text().not_null())
                    .col(ColumnDef::new(Genres::ExternalId).big_integer().null())
                    .col(
                        ColumnDef::new(Genres::Origin)
                            .text()
                            .not_null()
                            .default("manual"),
                    )
                    .col(
                        ColumnDef::new(Genres::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_genres_external_id")
                    .table(Genres::Table)
                    .col(Genres::ExternalId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(Index::drop().name("idx_genres_external_id").to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Genres::Table).to_owned())
            .await?;
        manager
            .drop_index(Index::drop().name("idx_platforms_external_id").to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Platforms::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Platforms {
    Table,
    Id,
    Name,
    Slug,
    ExternalId,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Genres {
    Table,
    Id,
    Name,
    Slug,
    ExternalId,
    Origin,
    CreatedAt,
}
