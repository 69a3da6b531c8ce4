//! # Import Orchestrator
//!
//! Business rules of the catalog import pipeline. A product is imported at
//! most once per (origin, external id); re-syncs replace everything the game
//! database owns and keep the commercially managed fields.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use chrono::{Duration, NaiveDate, Utc};
use metrics::{counter, histogram};
use tokio::sync::Mutex;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use crate::error::{CatalogError, is_unique_violation};
use crate::igdb::types::IgdbGame;
use crate::igdb::{IgdbClient, ImageSize, image_url};
use crate::mapper::{
    GameStatus, MetadataMapper, ORIGIN_EXTERNAL_DB, convert_rating, new_imported_genre,
    release_date_from_epoch, status_from_code,
};
use crate::models::product;
use crate::repositories::catalog::CatalogStore;

/// Result of importing one external id.
#[derive(Debug, Clone)]
pub struct ImportResult {
    pub product: product::Model,
    /// `false` when the id had already been imported
    pub created: bool,
}

/// Per-id outcome of a batch import.
#[derive(Debug, Clone)]
pub enum ImportOutcome {
    Imported {
        external_id: i64,
        product: product::Model,
    },
    Existing {
        external_id: i64,
        product: product::Model,
    },
    Failed {
        external_id: i64,
        reason: String,
    },
}

impl ImportOutcome {
    pub fn external_id(&self) -> i64 {
        match self {
            ImportOutcome::Imported { external_id, .. }
            | ImportOutcome::Existing { external_id, .. }
            | ImportOutcome::Failed { external_id, .. } => *external_id,
        }
    }

    pub fn product(&self) -> Option<&product::Model> {
        match self {
            ImportOutcome::Imported { product, .. } | ImportOutcome::Existing { product, .. } => {
                Some(product)
            }
            ImportOutcome::Failed { .. } => None,
        }
    }

    pub fn is_success(&self) -> bool {
        !matches!(self, ImportOutcome::Failed { .. })
    }
}

/// Outcomes of a batch import, in input order.
#[derive(Debug, Clone, Default)]
pub struct BatchImportReport {
    pub outcomes: Vec<ImportOutcome>,
}

impl BatchImportReport {
    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_success()).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.succeeded()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncStatus {
    /// Fresh data was fetched and stored
    Synced,
    /// Sync is disabled for this product; nothing was fetched
    Skipped,
    /// The external record is gone; sync has been disabled
    Deactivated,
}

impl SyncStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            SyncStatus::Synced => "synced",
            SyncStatus::Skipped => "skipped",
            SyncStatus::Deactivated => "deactivated",
        }
    }
}

#[derive(Debug, Clone)]
pub struct SyncResult {
    pub product: product::Model,
    pub status: SyncStatus,
}

/// A game database record offered for import.
#[derive(Debug, Clone, PartialEq)]
pub struct ImportCandidate {
    pub external_id: i64,
    pub name: String,
    pub slug: Option<String>,
    pub release_date: Option<NaiveDate>,
    pub rating: Option<f64>,
    pub status: GameStatus,
    pub cover_url: Option<String>,
    pub already_imported: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportStats {
    pub origin: String,
    pub imported: u64,
    pub stale: u64,
    pub sync_in_progress: bool,
}

/// Drives imports and re-syncs. The only writer of products, origin links and genres.
pub struct ImportOrchestrator {
    client: IgdbClient,
    store: Arc<dyn CatalogStore>,
    mapper: MetadataMapper,
    image_base: String,
    sync_guard: Mutex<()>,
    sync_running: AtomicBool,
}

/// Clears the running flag when a bulk sync ends, however it ends.
struct RunningFlag<'a>(&'a AtomicBool);

impl<'a> RunningFlag<'a> {
    fn raise(flag: &'a AtomicBool) -> Self {
        flag.store(true, Ordering::Release);
        Self(flag)
    }
}

impl Drop for RunningFlag<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl ImportOrchestrator {
    pub fn new(client: IgdbClient, store: Arc<dyn CatalogStore>, image_base: &str) -> Self {
        Self {
            client,
            store,
            mapper: MetadataMapper::new(image_base),
            image_base: image_base.to_string(),
            sync_guard: Mutex::new(()),
            sync_running: AtomicBool::new(false),
        }
    }

    pub fn client(&self) -> &IgdbClient {
        &self.client
    }

    pub fn store(&self) -> &Arc<dyn CatalogStore> {
        &self.store
    }

    /// Imports one game. Returns the existing product without contacting the
    /// game database when the id was imported before.
    #[instrument(skip(self))]
    pub async fn import_by_id(&self, external_id: i64) -> Result<ImportResult, CatalogError> {
        let key = external_id.to_string();
        if let Some(product) = self
            .store
            .find_by_origin_and_external_id(ORIGIN_EXTERNAL_DB, &key)
            .await?
        {
            debug!(product_id = %product.id, "Game already imported");
            counter!("catalog_import_total", "outcome" => "existing").increment(1);
            return Ok(ImportResult {
                product,
                created: false,
            });
        }

        let game = self
            .client
            .get_game_by_id(external_id)
            .await?
            .ok_or_else(|| CatalogError::NotFoundInExternalSource {
                external_id: key.clone(),
            })?;

        let bundle = self.client.fetch_game_bundle(game).await?;
        let graph = self
            .mapper
            .map_game_to_product(&bundle, self.store.as_ref())
            .await?;

        match self.store.save_product_graph(graph).await {
            Ok(product) => {
                info!(product_id = %product.id, name = %product.name, "Imported game");
                counter!("catalog_import_total", "outcome" => "imported").increment(1);
                Ok(ImportResult {
                    product,
                    created: true,
                })
            }
            Err(err) if is_unique_violation(&err) => {
                // Lost a race with a concurrent import of the same id.
                let product = self
                    .store
                    .find_by_origin_and_external_id(ORIGIN_EXTERNAL_DB, &key)
                    .await?
                    .ok_or(CatalogError::Database(err))?;
                counter!("catalog_import_total", "outcome" => "existing").increment(1);
                Ok(ImportResult {
                    product,
                    created: false,
                })
            }
            Err(err) => {
                counter!("catalog_import_total", "outcome" => "error").increment(1);
                Err(err.into())
            }
        }
    }

    /// Imports each id in order. Failures are recorded per id and never abort the batch.
    #[instrument(skip_all, fields(count = external_ids.len()))]
    pub async fn import_games_batch(&self, external_ids: &[i64]) -> BatchImportReport {
        let mut report = BatchImportReport {
            outcomes: Vec::with_capacity(external_ids.len()),
        };

        for &external_id in external_ids {
            let outcome = match self.import_by_id(external_id).await {
                Ok(ImportResult {
                    product,
                    created: true,
                }) => ImportOutcome::Imported {
                    external_id,
                    product,
                },
                Ok(ImportResult { product, .. }) => ImportOutcome::Existing {
                    external_id,
                    product,
                },
                Err(err) => {
                    error!(external_id, error = %err, "Failed to import game");
                    ImportOutcome::Failed {
                        external_id,
                        reason: err.to_string(),
                    }
                }
            };
            report.outcomes.push(outcome);
        }

        info!(
            succeeded = report.succeeded(),
            failed = report.failed(),
            "Batch import finished"
        );
        report
    }

    /// Imports the `limit` most rated games.
    #[instrument(skip(self))]
    pub async fn import_popular(&self, limit: u32) -> Result<BatchImportReport, CatalogError> {
        let games = self.client.get_popular_games(1, limit).await?;
        let ids: Vec<i64> = games.iter().map(|game| game.id).collect();
        Ok(self.import_games_batch(&ids).await)
    }

    /// Name search, flagged with whether each result is already imported.
    pub async fn search_for_import(
        &self,
        name: &str,
        page: u32,
        limit: u32,
    ) -> Result<Vec<ImportCandidate>, CatalogError> {
        let games = self.client.search_games_by_name(name, page, limit).await?;
        self.to_candidates(games).await
    }

    /// Most rated games, flagged with whether each result is already imported.
    pub async fn popular_for_import(
        &self,
        page: u32,
        limit: u32,
    ) -> Result<Vec<ImportCandidate>, CatalogError> {
        let games = self.client.get_popular_games(page, limit).await?;
        self.to_candidates(games).await
    }

    async fn to_candidates(
        &self,
        games: Vec<IgdbGame>,
    ) -> Result<Vec<ImportCandidate>, CatalogError> {
        let mut candidates = Vec::with_capacity(games.len());
        for game in games {
            let already_imported = self
                .store
                .exists_by_origin_and_external_id(ORIGIN_EXTERNAL_DB, &game.id.to_string())
                .await?;
            let cover_url = game
                .cover
                .as_ref()
                .and_then(|cover| cover.as_object())
                .and_then(|cover| cover.image_id.as_deref())
                .map(|image_id| image_url(&self.image_base, image_id, ImageSize::CoverSmall));

            candidates.push(ImportCandidate {
                external_id: game.id,
                release_date: release_date_from_epoch(game.first_release_date),
                rating: convert_rating(game.total_rating.or(game.rating)),
                status: status_from_code(game.status),
                name: game.name,
                slug: game.slug,
                cover_url,
                already_imported,
            });
        }
        Ok(candidates)
    }

    /// Re-fetches one imported product and replaces the data the game
    /// database owns. Price, stock and sale activation are kept.
    #[instrument(skip(self))]
    pub async fn sync_product(&self, product_id: Uuid) -> Result<SyncResult, CatalogError> {
        let existing = self
            .store
            .find_product(product_id)
            .await?
            .ok_or(CatalogError::ProductNotFound { product_id })?;

        let origin = self
            .store
            .find_origin_for_product(product_id)
            .await?
            .filter(|origin| origin.origin == ORIGIN_EXTERNAL_DB)
            .ok_or_else(|| {
                CatalogError::business(format!(
                    "product {product_id} was not imported from {ORIGIN_EXTERNAL_DB}"
                ))
            })?;

        if !origin.sync_enabled {
            debug!("Sync disabled for product, skipping");
            return Ok(SyncResult {
                product: existing,
                status: SyncStatus::Skipped,
            });
        }

        let external_id: i64 = origin.external_id.parse().map_err(|_| {
            CatalogError::business(format!(
                "origin link of product {product_id} has a malformed external id '{}'",
                origin.external_id
            ))
        })?;

        let Some(game) = self.client.get_game_by_id(external_id).await? else {
            warn!(external_id, "Game vanished from the game database; disabling sync");
            let mut origin = origin;
            origin.sync_enabled = false;
            self.store.save_origin_link(origin).await?;
            return Ok(SyncResult {
                product: existing,
                status: SyncStatus::Deactivated,
            });
        };

        let bundle = self.client.fetch_game_bundle(game).await?;
        let mut graph = self
            .mapper
            .map_game_to_product(&bundle, self.store.as_ref())
            .await?;

        graph.reassign_product_id(existing.id);
        graph.product.created_at = existing.created_at;
        graph.product.price_cents = existing.price_cents;
        graph.product.stock = existing.stock;
        graph.product.activated_for_sale = existing.activated_for_sale;

        let now = Utc::now();
        let external_url = graph.origin.external_url.take().or(origin.external_url.clone());
        graph.origin = origin;
        graph.origin.external_url = external_url;
        graph.origin.last_synced_at = Some(now.into());
        graph.origin.data_version += 1;

        let data_version = graph.origin.data_version;
        let product = self.store.save_product_graph(graph).await?;
        info!(data_version, "Synced product");

        Ok(SyncResult {
            product,
            status: SyncStatus::Synced,
        })
    }

    /// Syncs every stale product of the game database origin, one at a time.
    ///
    /// Fails with [`CatalogError::SyncInProgress`] when another bulk sync is
    /// running. Per-product failures are logged and skipped; the return value
    /// is the number of products processed without error.
    #[instrument(skip(self))]
    pub async fn sync_stale_products(&self, stale_after_days: u32) -> Result<usize, CatalogError> {
        let _guard = self
            .sync_guard
            .try_lock()
            .map_err(|_| CatalogError::SyncInProgress)?;
        let _running = RunningFlag::raise(&self.sync_running);

        let started = Instant::now();
        let cutoff = Utc::now() - Duration::days(i64::from(stale_after_days));
        let stale = self
            .store
            .find_stale_for_origin(ORIGIN_EXTERNAL_DB, cutoff)
            .await?;
        info!(stale = stale.len(), %cutoff, "Starting bulk sync");

        let mut succeeded = 0usize;
        for origin in &stale {
            match self.sync_product(origin.product_id).await {
                Ok(result) => {
                    succeeded += 1;
                    counter!("catalog_sync_success_total", "status" => result.status.as_str())
                        .increment(1);
                }
                Err(err) => {
                    counter!("catalog_sync_failure_total").increment(1);
                    error!(
                        product_id = %origin.product_id,
                        external_id = %origin.external_id,
                        error = %err,
                        "Failed to sync product"
                    );
                }
            }
        }

        histogram!("catalog_bulk_sync_duration_seconds").record(started.elapsed().as_secs_f64());
        info!(
            succeeded,
            failed = stale.len() - succeeded,
            "Bulk sync finished"
        );
        Ok(succeeded)
    }

    /// Inserts every game database genre missing locally. Returns the number created.
    #[instrument(skip(self))]
    pub async fn refresh_genres(&self) -> Result<usize, CatalogError> {
        let genres = self.client.get_all_genres().await?;
        let now = Utc::now().into();

        let mut created = 0;
        for external in &genres {
            if self
                .store
                .find_genre_by_external_id(external.id)
                .await?
                .is_some()
            {
                continue;
            }
            self.store
                .save_genre(new_imported_genre(external, now))
                .await?;
            created += 1;
        }

        info!(total = genres.len(), created, "Genre refresh finished");
        Ok(created)
    }

    pub async fn import_stats(&self, stale_after_days: u32) -> Result<ImportStats, CatalogError> {
        let imported = self.store.count_by_origin(ORIGIN_EXTERNAL_DB).await?;
        let cutoff = Utc::now() - Duration::days(i64::from(stale_after_days));
        let stale = self
            .store
            .find_stale_for_origin(ORIGIN_EXTERNAL_DB, cutoff)
            .await?
            .len() as u64;

        Ok(ImportStats {
            origin: ORIGIN_EXTERNAL_DB.to_string(),
            imported,
            stale,
            sync_in_progress: self.sync_running.load(Ordering::Acquire),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn product_model() -> product::Model {
        let now = Utc::now().into();
        product::Model {
            id: Uuid::new_v4(),
            name: "Celeste".to_string(),
            slug: "celeste".to_string(),
            description: None,
            long_description: None,
            release_date: None,
            rating: None,
            status: "released".to_string(),
            activated_for_sale: true,
            price_cents: 1999,
            stock: 3,
            external_links: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn batch_report_counts_outcomes() {
        let report = BatchImportReport {
            outcomes: vec![
                ImportOutcome::Imported {
                    external_id: 1,
                    product: product_model(),
                },
                ImportOutcome::Existing {
                    external_id: 2,
                    product: product_model(),
                },
                ImportOutcome::Failed {
                    external_id: 3,
                    reason: "boom".to_string(),
                },
            ],
        };

        assert_eq!(report.succeeded(), 2);
        assert_eq!(report.failed(), 1);
        assert_eq!(report.outcomes[2].external_id(), 3);
        assert!(report.outcomes[2].product().is_none());
        assert!(report.outcomes[1].product().is_some());
    }

    #[test]
    fn running_flag_clears_on_drop() {
        let flag = AtomicBool::new(false);
        {
            let _running = RunningFlag::raise(&flag);
            assert!(flag.load(Ordering::Acquire));
        }
        assert!(!flag.load(Ordering::Acquire));
    }
}
