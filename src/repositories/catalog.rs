//! Catalog repository for the import pipeline
//!
//! [`CatalogStore`] is the persistence contract the import orchestrator and
//! the metadata mapper depend on; [`SeaOrmCatalogStore`] implements it over
//! the product, origin, media and reference tables.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::prelude::DateTimeWithTimeZone;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, DatabaseConnection, DbErr,
    EntityTrait, IntoActiveModel, ModelTrait, PaginatorTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};
use uuid::Uuid;

use crate::error::is_unique_violation;
use crate::models::{
    Genre, Platform, Product, ProductImage, ProductOrigin, ProductVideo, genre, platform, product,
    product_genre, product_image, product_origin, product_platform, product_video,
};

/// A product with everything that is persisted alongside it in one transaction.
#[derive(Debug, Clone, PartialEq)]
pub struct ProductGraph {
    pub product: product::Model,
    pub origin: product_origin::Model,
    pub images: Vec<product_image::Model>,
    pub videos: Vec<product_video::Model>,
    pub platform_ids: Vec<Uuid>,
    pub genre_ids: Vec<Uuid>,
    /// Genres first seen in this import; inserted before the product.
    pub new_genres: Vec<genre::Model>,
}

impl ProductGraph {
    /// Moves the graph onto another product id, rewriting every child row.
    pub fn reassign_product_id(&mut self, product_id: Uuid) {
        self.product.id = product_id;
        self.origin.product_id = product_id;
        for image in &mut self.images {
            image.product_id = product_id;
        }
        for video in &mut self.videos {
            video.product_id = product_id;
        }
    }
}

/// A persisted product with its related rows, for API responses.
#[derive(Debug, Clone)]
pub struct ProductDetails {
    pub product: product::Model,
    pub origin: Option<product_origin::Model>,
    pub images: Vec<product_image::Model>,
    pub videos: Vec<product_video::Model>,
    pub platforms: Vec<platform::Model>,
    pub genres: Vec<genre::Model>,
}

/// Administrative fields the import pipeline never overwrites.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CommercialFields {
    pub price_cents: Option<i64>,
    pub stock: Option<i32>,
    pub activated_for_sale: Option<bool>,
}

/// Persistence operations used by the import pipeline.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// Product imported from `external_id` of `origin`, if any.
    async fn find_by_origin_and_external_id(
        &self,
        origin: &str,
        external_id: &str,
    ) -> Result<Option<product::Model>, DbErr>;

    async fn exists_by_origin_and_external_id(
        &self,
        origin: &str,
        external_id: &str,
    ) -> Result<bool, DbErr>;

    /// Sync-enabled origin links of `origin` never synced or last synced before `cutoff`.
    async fn find_stale_for_origin(
        &self,
        origin: &str,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<product_origin::Model>, DbErr>;

    async fn count_by_origin(&self, origin: &str) -> Result<u64, DbErr>;

    async fn find_platform_by_external_id(
        &self,
        external_id: i64,
    ) -> Result<Option<platform::Model>, DbErr>;

    async fn find_genre_by_external_id(
        &self,
        external_id: i64,
    ) -> Result<Option<genre::Model>, DbErr>;

    /// Inserts a genre; when another writer already stored the same external id,
    /// that row is returned instead.
    async fn save_genre(&self, genre: genre::Model) -> Result<genre::Model, DbErr>;

    /// Inserts or replaces the product, its media, links and origin in one transaction.
    async fn save_product_graph(&self, graph: ProductGraph) -> Result<product::Model, DbErr>;

    async fn save_origin_link(
        &self,
        origin: product_origin::Model,
    ) -> Result<product_origin::Model, DbErr>;

    async fn find_product(&self, id: Uuid) -> Result<Option<product::Model>, DbErr>;

    async fn find_origin_for_product(
        &self,
        product_id: Uuid,
    ) -> Result<Option<product_origin::Model>, DbErr>;

    /// Updates price, stock and sale activation; `None` when the product does not exist.
    async fn set_commercial_fields(
        &self,
        product_id: Uuid,
        fields: CommercialFields,
    ) -> Result<Option<product::Model>, DbErr>;

    async fn load_product_details(&self, product_id: Uuid)
    -> Result<Option<ProductDetails>, DbErr>;
}

/// SeaORM-backed catalog store
#[derive(Debug, Clone)]
pub struct SeaOrmCatalogStore {
    /// Database connection pool
    pub db: Arc<DatabaseConnection>,
}

impl SeaOrmCatalogStore {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Inserts a platform unless one with the same external id exists.
    ///
    /// Returns `true` when a row was created.
    pub async fn insert_platform_if_missing(
        &self,
        name: &str,
        slug: &str,
        external_id: i64,
    ) -> Result<bool, DbErr> {
        if self.find_platform_by_external_id(external_id).await?.is_some() {
            return Ok(false);
        }

        let platform = platform::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(name.to_string()),
            slug: Set(slug.to_string()),
            external_id: Set(Some(external_id)),
            created_at: Set(now()),
        };

        match Platform::insert(platform)
            .exec_without_returning(self.db.as_ref())
            .await
        {
            Ok(_) => Ok(true),
            Err(err) if is_unique_violation(&err) => Ok(false),
            Err(err) => Err(err),
        }
    }

    async fn upsert_product<C: ConnectionTrait>(
        conn: &C,
        model: product::Model,
    ) -> Result<product::Model, DbErr> {
        let exists = Product::find_by_id(model.id).one(conn).await?.is_some();
        let active = model.into_active_model().reset_all();
        if exists {
            active.update(conn).await
        } else {
            active.insert(conn).await
        }
    }

    async fn upsert_origin<C: ConnectionTrait>(
        conn: &C,
        model: product_origin::Model,
    ) -> Result<product_origin::Model, DbErr> {
        let exists = ProductOrigin::find_by_id(model.id).one(conn).await?.is_some();
        let active = model.into_active_model().reset_all();
        if exists {
            active.update(conn).await
        } else {
            active.insert(conn).await
        }
    }

    async fn replace_children<C: ConnectionTrait>(
        conn: &C,
        graph: &ProductGraph,
        genre_ids: &[Uuid],
    ) -> Result<(), DbErr> {
        let product_id = graph.product.id;

        ProductImage::delete_many()
            .filter(product_image::Column::ProductId.eq(product_id))
            .exec(conn)
            .await?;
        ProductVideo::delete_many()
            .filter(product_video::Column::ProductId.eq(product_id))
            .exec(conn)
            .await?;
        product_platform::Entity::delete_many()
            .filter(product_platform::Column::ProductId.eq(product_id))
            .exec(conn)
            .await?;
        product_genre::Entity::delete_many()
            .filter(product_genre::Column::ProductId.eq(product_id))
            .exec(conn)
            .await?;

        if !graph.images.is_empty() {
            ProductImage::insert_many(
                graph
                    .images
                    .iter()
                    .cloned()
                    .map(|image| image.into_active_model().reset_all()),
            )
            .exec_without_returning(conn)
            .await?;
        }

        if !graph.videos.is_empty() {
            ProductVideo::insert_many(
                graph
                    .videos
                    .iter()
                    .cloned()
                    .map(|video| video.into_active_model().reset_all()),
            )
            .exec_without_returning(conn)
            .await?;
        }

        let platform_links: Vec<product_platform::ActiveModel> = dedup(&graph.platform_ids)
            .into_iter()
            .map(|platform_id| product_platform::ActiveModel {
                product_id: Set(product_id),
                platform_id: Set(platform_id),
            })
            .collect();
        if !platform_links.is_empty() {
            product_platform::Entity::insert_many(platform_links)
                .exec_without_returning(conn)
                .await?;
        }

        let genre_links: Vec<product_genre::ActiveModel> = dedup(genre_ids)
            .into_iter()
            .map(|genre_id| product_genre::ActiveModel {
                product_id: Set(product_id),
                genre_id: Set(genre_id),
            })
            .collect();
        if !genre_links.is_empty() {
            product_genre::Entity::insert_many(genre_links)
                .exec_without_returning(conn)
                .await?;
        }

        Ok(())
    }
}

#[async_trait]
impl CatalogStore for SeaOrmCatalogStore {
    async fn find_by_origin_and_external_id(
        &self,
        origin: &str,
        external_id: &str,
    ) -> Result<Option<product::Model>, DbErr> {
        let Some(link) = ProductOrigin::find()
            .filter(product_origin::Column::Origin.eq(origin))
            .filter(product_origin::Column::ExternalId.eq(external_id))
            .one(self.db.as_ref())
            .await?
        else {
            return Ok(None);
        };

        Product::find_by_id(link.product_id)
            .one(self.db.as_ref())
            .await
    }

    async fn exists_by_origin_and_external_id(
        &self,
        origin: &str,
        external_id: &str,
    ) -> Result<bool, DbErr> {
        let count = ProductOrigin::find()
            .filter(product_origin::Column::Origin.eq(origin))
            .filter(product_origin::Column::ExternalId.eq(external_id))
            .count(self.db.as_ref())
            .await?;
        Ok(count > 0)
    }

    async fn find_stale_for_origin(
        &self,
        origin: &str,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<product_origin::Model>, DbErr> {
        let cutoff: DateTimeWithTimeZone = cutoff.into();

        ProductOrigin::find()
            .filter(product_origin::Column::Origin.eq(origin))
            .filter(product_origin::Column::SyncEnabled.eq(true))
            .filter(
                Condition::any()
                    .add(product_origin::Column::LastSyncedAt.is_null())
                    .add(product_origin::Column::LastSyncedAt.lt(cutoff)),
            )
            .order_by_asc(product_origin::Column::ImportedAt)
            .all(self.db.as_ref())
            .await
    }

    async fn count_by_origin(&self, origin: &str) -> Result<u64, DbErr> {
        ProductOrigin::find()
            .filter(product_origin::Column::Origin.eq(origin))
            .count(self.db.as_ref())
            .await
    }

    async fn find_platform_by_external_id(
        &self,
        external_id: i64,
    ) -> Result<Option<platform::Model>, DbErr> {
        Platform::find()
            .filter(platform::Column::ExternalId.eq(external_id))
            .one(self.db.as_ref())
            .await
    }

    async fn find_genre_by_external_id(
        &self,
        external_id: i64,
    ) -> Result<Option<genre::Model>, DbErr> {
        Genre::find()
            .filter(genre::Column::ExternalId.eq(external_id))
            .one(self.db.as_ref())
            .await
    }

    async fn save_genre(&self, model: genre::Model) -> Result<genre::Model, DbErr> {
        let external_id = model.external_id;
        match model
            .into_active_model()
            .reset_all()
            .insert(self.db.as_ref())
            .await
        {
            Ok(saved) => Ok(saved),
            Err(err) if is_unique_violation(&err) => {
                let Some(external_id) = external_id else {
                    return Err(err);
                };
                tracing::debug!(external_id, "Genre already stored by another writer");
                self.find_genre_by_external_id(external_id)
                    .await?
                    .ok_or(err)
            }
            Err(err) => Err(err),
        }
    }

    async fn save_product_graph(&self, graph: ProductGraph) -> Result<product::Model, DbErr> {
        let txn = self.db.begin().await?;

        // Genres first: the product_genres rows reference them.
        let mut genre_ids = graph.genre_ids.clone();
        for new_genre in &graph.new_genres {
            let existing = match new_genre.external_id {
                Some(external_id) => {
                    Genre::find()
                        .filter(genre::Column::ExternalId.eq(external_id))
                        .one(&txn)
                        .await?
                }
                None => None,
            };

            let stored_id = match existing {
                Some(existing) => existing.id,
                None => {
                    new_genre
                        .clone()
                        .into_active_model()
                        .reset_all()
                        .insert(&txn)
                        .await?
                        .id
                }
            };

            if stored_id != new_genre.id {
                for id in &mut genre_ids {
                    if *id == new_genre.id {
                        *id = stored_id;
                    }
                }
            }
        }

        let product = Self::upsert_product(&txn, graph.product.clone()).await?;
        Self::replace_children(&txn, &graph, &genre_ids).await?;
        Self::upsert_origin(&txn, graph.origin.clone()).await?;

        txn.commit().await?;
        Ok(product)
    }

    async fn save_origin_link(
        &self,
        origin: product_origin::Model,
    ) -> Result<product_origin::Model, DbErr> {
        Self::upsert_origin(self.db.as_ref(), origin).await
    }

    async fn find_product(&self, id: Uuid) -> Result<Option<product::Model>, DbErr> {
        Product::find_by_id(id).one(self.db.as_ref()).await
    }

    async fn find_origin_for_product(
        &self,
        product_id: Uuid,
    ) -> Result<Option<product_origin::Model>, DbErr> {
        ProductOrigin::find()
            .filter(product_origin::Column::ProductId.eq(product_id))
            .one(self.db.as_ref())
            .await
    }

    async fn set_commercial_fields(
        &self,
        product_id: Uuid,
        fields: CommercialFields,
    ) -> Result<Option<product::Model>, DbErr> {
        let Some(existing) = self.find_product(product_id).await? else {
            return Ok(None);
        };

        let mut active: product::ActiveModel = existing.into();
        if let Some(price_cents) = fields.price_cents {
            active.price_cents = Set(price_cents);
        }
        if let Some(stock) = fields.stock {
            active.stock = Set(stock);
        }
        if let Some(activated) = fields.activated_for_sale {
            active.activated_for_sale = Set(activated);
        }
        active.updated_at = Set(now());

        active.update(self.db.as_ref()).await.map(Some)
    }

    async fn load_product_details(
        &self,
        product_id: Uuid,
    ) -> Result<Option<ProductDetails>, DbErr> {
        let db = self.db.as_ref();
        let Some(product) = self.find_product(product_id).await? else {
            return Ok(None);
        };

        let origin = self.find_origin_for_product(product_id).await?;
        let images = product
            .find_related(ProductImage)
            .order_by_asc(product_image::Column::Position)
            .all(db)
            .await?;
        let videos = product
            .find_related(ProductVideo)
            .order_by_asc(product_video::Column::Position)
            .all(db)
            .await?;
        let platforms = product
            .find_related(Platform)
            .order_by_asc(platform::Column::Name)
            .all(db)
            .await?;
        let genres = product
            .find_related(Genre)
            .order_by_asc(genre::Column::Name)
            .all(db)
            .await?;

        Ok(Some(ProductDetails {
            product,
            origin,
            images,
            videos,
            platforms,
            genres,
        }))
    }
}

fn now() -> DateTimeWithTimeZone {
    Utc::now().into()
}

fn dedup(ids: &[Uuid]) -> Vec<Uuid> {
    let mut unique = Vec::with_capacity(ids.len());
    for id in ids {
        if !unique.contains(id) {
            unique.push(*id);
        }
    }
    unique
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reassign_rewrites_children() {
        let old_id = Uuid::new_v4();
        let new_id = Uuid::new_v4();
        let timestamp = now();

        let mut graph = ProductGraph {
            product: product::Model {
                id: old_id,
                name: "Hades".to_string(),
                slug: "hades".to_string(),
                description: None,
                long_description: None,
                release_date: None,
                rating: None,
                status: "released".to_string(),
                activated_for_sale: true,
                price_cents: 0,
                stock: 0,
                external_links: None,
                created_at: timestamp,
                updated_at: timestamp,
            },
            origin: product_origin::Model {
                id: Uuid::new_v4(),
                product_id: old_id,
                origin: "EXTERNAL_DB".to_string(),
                external_id: "113112".to_string(),
                external_url: None,
                imported_at: timestamp,
                last_synced_at: None,
                data_version: 1,
                sync_enabled: true,
            },
            images: vec![product_image::Model {
                id: Uuid::new_v4(),
                product_id: old_id,
                kind: "cover".to_string(),
                external_image_id: Some("co39vc".to_string()),
                url: "https://cdn.test/t_cover_big/co39vc.jpg".to_string(),
                width: None,
                height: None,
                position: 1,
                is_primary: true,
            }],
            videos: vec![product_video::Model {
                id: Uuid::new_v4(),
                product_id: old_id,
                kind: "trailer".to_string(),
                name: None,
                external_video_id: "91t0ha9x0AE".to_string(),
                url: "https://www.youtube.com/watch?v=91t0ha9x0AE".to_string(),
                position: 1,
            }],
            platform_ids: vec![],
            genre_ids: vec![],
            new_genres: vec![],
        };

        graph.reassign_product_id(new_id);

        assert_eq!(graph.product.id, new_id);
        assert_eq!(graph.origin.product_id, new_id);
        assert!(graph.images.iter().all(|image| image.product_id == new_id));
        assert!(graph.videos.iter().all(|video| video.product_id == new_id));
    }

    #[test]
    fn dedup_keeps_first_occurrence_order() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        assert_eq!(dedup(&[a, b, a, b]), vec![a, b]);
    }
}
