//! # Catalog Admin Handlers
//!
//! Administrative trigger surface for the import pipeline. Handlers validate
//! input, call the orchestrator or scheduler, and translate the outcome into
//! HTTP responses.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::error::{ApiError, CatalogError, not_found, validation_error};
use crate::igdb::youtube_thumbnail_url;
use crate::import::{ImportCandidate, ImportOutcome, ImportResult, SyncResult};
use crate::models::{genre, platform, product, product_image, product_origin, product_video};
use crate::repositories::catalog::{CommercialFields, ProductDetails};
use crate::server::AppState;

const DEFAULT_PAGE_LIMIT: u32 = 20;
const MAX_PAGE_LIMIT: u32 = 100;
const DEFAULT_POPULAR_IMPORT_LIMIT: u32 = 10;

/// Imported product summary
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ProductInfo {
    #[schema(example = "550e8400-e29b-41d4-a716-446655440000")]
    pub id: Uuid,
    #[schema(example = "The Witcher 3: Wild Hunt")]
    pub name: String,
    #[schema(example = "the-witcher-3-wild-hunt")]
    pub slug: String,
    pub description: Option<String>,
    pub long_description: Option<String>,
    /// First release date (YYYY-MM-DD)
    #[schema(example = "2015-05-19")]
    pub release_date: Option<String>,
    /// Rating on a 0-10 scale
    #[schema(example = 9.32)]
    pub rating: Option<f64>,
    #[schema(example = "released")]
    pub status: String,
    pub activated_for_sale: bool,
    /// Price in minor currency units
    #[schema(example = 2999)]
    pub price_cents: i64,
    pub stock: i32,
    /// Store and website links keyed by label
    #[schema(value_type = Object)]
    pub external_links: serde_json::Value,
    pub created_at: String,
    pub updated_at: String,
}

impl From<product::Model> for ProductInfo {
    fn from(model: product::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            slug: model.slug,
            description: model.description,
            long_description: model.long_description,
            release_date: model.release_date.map(|date| date.to_string()),
            rating: model.rating,
            status: model.status,
            activated_for_sale: model.activated_for_sale,
            price_cents: model.price_cents,
            stock: model.stock,
            external_links: model.external_links.unwrap_or_else(|| serde_json::json!({})),
            created_at: model.created_at.to_rfc3339(),
            updated_at: model.updated_at.to_rfc3339(),
        }
    }
}

/// Provenance of an imported product
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct OriginInfo {
    #[schema(example = "EXTERNAL_DB")]
    pub origin: String,
    #[schema(example = "1942")]
    pub external_id: String,
    pub external_url: Option<String>,
    pub imported_at: String,
    pub last_synced_at: Option<String>,
    pub data_version: i32,
    pub sync_enabled: bool,
}

impl From<product_origin::Model> for OriginInfo {
    fn from(model: product_origin::Model) -> Self {
        Self {
            origin: model.origin,
            external_id: model.external_id,
            external_url: model.external_url,
            imported_at: model.imported_at.to_rfc3339(),
            last_synced_at: model.last_synced_at.map(|dt| dt.to_rfc3339()),
            data_version: model.data_version,
            sync_enabled: model.sync_enabled,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ImageInfo {
    /// `cover` or `screenshot`
    pub kind: String,
    pub url: String,
    pub width: Option<i32>,
    pub height: Option<i32>,
    pub position: i32,
    pub is_primary: bool,
}

impl From<product_image::Model> for ImageInfo {
    fn from(model: product_image::Model) -> Self {
        Self {
            kind: model.kind,
            url: model.url,
            width: model.width,
            height: model.height,
            position: model.position,
            is_primary: model.is_primary,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct VideoInfo {
    pub kind: String,
    pub name: Option<String>,
    pub url: String,
    pub thumbnail_url: String,
    pub position: i32,
}

impl From<product_video::Model> for VideoInfo {
    fn from(model: product_video::Model) -> Self {
        Self {
            kind: model.kind,
            name: model.name,
            url: model.url,
            thumbnail_url: youtube_thumbnail_url(&model.external_video_id),
            position: model.position,
        }
    }
}

/// Platform or genre reference
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ReferenceInfo {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub external_id: Option<i64>,
}

impl From<platform::Model> for ReferenceInfo {
    fn from(model: platform::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            slug: model.slug,
            external_id: model.external_id,
        }
    }
}

impl From<genre::Model> for ReferenceInfo {
    fn from(model: genre::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            slug: model.slug,
            external_id: model.external_id,
        }
    }
}

/// Full product view including media and references
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ProductDetailsResponse {
    pub product: ProductInfo,
    pub origin: Option<OriginInfo>,
    pub images: Vec<ImageInfo>,
    pub videos: Vec<VideoInfo>,
    pub platforms: Vec<ReferenceInfo>,
    pub genres: Vec<ReferenceInfo>,
}

impl From<ProductDetails> for ProductDetailsResponse {
    fn from(details: ProductDetails) -> Self {
        Self {
            product: details.product.into(),
            origin: details.origin.map(Into::into),
            images: details.images.into_iter().map(Into::into).collect(),
            videos: details.videos.into_iter().map(Into::into).collect(),
            platforms: details.platforms.into_iter().map(Into::into).collect(),
            genres: details.genres.into_iter().map(Into::into).collect(),
        }
    }
}

/// Result of a single import
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ImportResponse {
    /// `false` when the game had already been imported
    pub created: bool,
    pub product: ProductInfo,
}

impl From<ImportResult> for ImportResponse {
    fn from(result: ImportResult) -> Self {
        Self {
            created: result.created,
            product: result.product.into(),
        }
    }
}

/// Request body for batch imports
#[derive(Debug, Deserialize, ToSchema)]
pub struct BatchImportRequest {
    /// Game database ids to import
    #[schema(example = json!([1942, 1020]))]
    pub ids: Vec<i64>,
}

/// Per-id batch outcome
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ImportOutcomeInfo {
    Imported {
        external_id: i64,
        product: ProductInfo,
    },
    Existing {
        external_id: i64,
        product: ProductInfo,
    },
    Failed {
        external_id: i64,
        reason: String,
    },
}

impl From<ImportOutcome> for ImportOutcomeInfo {
    fn from(outcome: ImportOutcome) -> Self {
        match outcome {
            ImportOutcome::Imported {
                external_id,
                product,
            } => Self::Imported {
                external_id,
                product: product.into(),
            },
            ImportOutcome::Existing {
                external_id,
                product,
            } => Self::Existing {
                external_id,
                product: product.into(),
            },
            ImportOutcome::Failed {
                external_id,
                reason,
            } => Self::Failed {
                external_id,
                reason,
            },
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct BatchImportResponse {
    pub succeeded: usize,
    pub failed: usize,
    /// Outcomes in request order
    pub results: Vec<ImportOutcomeInfo>,
}

/// Import candidate from a search or popularity listing
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CandidateInfo {
    #[schema(example = 1942)]
    pub external_id: i64,
    pub name: String,
    pub slug: Option<String>,
    pub release_date: Option<String>,
    pub rating: Option<f64>,
    pub status: String,
    pub cover_url: Option<String>,
    pub already_imported: bool,
}

impl From<ImportCandidate> for CandidateInfo {
    fn from(candidate: ImportCandidate) -> Self {
        Self {
            external_id: candidate.external_id,
            name: candidate.name,
            slug: candidate.slug,
            release_date: candidate.release_date.map(|date| date.to_string()),
            rating: candidate.rating,
            status: candidate.status.as_str().to_string(),
            cover_url: candidate.cover_url,
            already_imported: candidate.already_imported,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CandidatesResponse {
    pub candidates: Vec<CandidateInfo>,
    pub page: u32,
    pub limit: u32,
}

/// Result of syncing one product
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SyncResponse {
    /// `synced`, `skipped` or `deactivated`
    #[schema(example = "synced")]
    pub status: String,
    pub product: ProductInfo,
}

impl From<SyncResult> for SyncResponse {
    fn from(result: SyncResult) -> Self {
        Self {
            status: result.status.as_str().to_string(),
            product: result.product.into(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SyncRunResponse {
    /// Products processed without error
    pub synced: usize,
}

/// Pipeline and scheduler status
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CatalogStatusResponse {
    pub sync_enabled: bool,
    pub credentials_configured: bool,
    pub api_available: bool,
    pub run_hour: u32,
    pub stale_after_days: u32,
    pub last_run_at: Option<String>,
    /// Products synced by the last run, `-1` when it failed
    pub last_count: Option<i64>,
    pub next_run_at: Option<String>,
    pub imported: u64,
    pub stale: u64,
    pub sync_in_progress: bool,
}

/// Partial update of commercially managed fields
#[derive(Debug, Deserialize, ToSchema)]
pub struct CommercialUpdateRequest {
    #[schema(example = 2999)]
    pub price_cents: Option<i64>,
    pub stock: Option<i32>,
    pub activated_for_sale: Option<bool>,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct ExternalIdPath {
    /// Game database id
    pub external_id: i64,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct ProductIdPath {
    pub product_id: Uuid,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct SearchQuery {
    /// Name to search for
    pub q: Option<String>,
    /// 1-based page (default 1)
    pub page: Option<u32>,
    /// Page size (default 20, max 100)
    pub limit: Option<u32>,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct PageQuery {
    /// 1-based page (default 1)
    pub page: Option<u32>,
    /// Page size (default 20, max 100)
    pub limit: Option<u32>,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct PopularImportQuery {
    /// Number of games to import (default 10, max the configured batch size)
    pub limit: Option<u32>,
}

/// Import one game by its game database id
#[utoipa::path(
    post,
    path = "/admin/catalog/import/{external_id}",
    params(ExternalIdPath),
    responses(
        (status = 201, description = "Game imported", body = ImportResponse),
        (status = 200, description = "Game was already imported", body = ImportResponse),
        (status = 404, description = "Game not found in the game database", body = ApiError),
        (status = 503, description = "Game database unavailable or not configured", body = ApiError)
    ),
    tag = "catalog"
)]
pub async fn import_game(
    State(state): State<AppState>,
    Path(path): Path<ExternalIdPath>,
) -> Result<(StatusCode, Json<ImportResponse>), ApiError> {
    let result = state.orchestrator.import_by_id(path.external_id).await?;
    let status = if result.created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((status, Json(result.into())))
}

/// Import several games; failures are reported per id
#[utoipa::path(
    post,
    path = "/admin/catalog/import/batch",
    request_body = BatchImportRequest,
    responses(
        (status = 200, description = "Batch processed", body = BatchImportResponse),
        (status = 400, description = "Invalid id list", body = ApiError)
    ),
    tag = "catalog"
)]
pub async fn import_batch(
    State(state): State<AppState>,
    Json(request): Json<BatchImportRequest>,
) -> Result<Json<BatchImportResponse>, ApiError> {
    let max = state.config.sync.batch_size;
    if request.ids.is_empty() || request.ids.len() > max {
        return Err(validation_error(
            "Invalid batch size",
            serde_json::json!({ "ids": format!("Provide between 1 and {max} ids") }),
        ));
    }

    let report = state.orchestrator.import_games_batch(&request.ids).await;
    Ok(Json(BatchImportResponse {
        succeeded: report.succeeded(),
        failed: report.failed(),
        results: report.outcomes.into_iter().map(Into::into).collect(),
    }))
}

/// Import the most popular games
#[utoipa::path(
    post,
    path = "/admin/catalog/import/popular",
    params(PopularImportQuery),
    responses(
        (status = 200, description = "Batch processed", body = BatchImportResponse),
        (status = 400, description = "Invalid limit", body = ApiError),
        (status = 503, description = "Game database unavailable or not configured", body = ApiError)
    ),
    tag = "catalog"
)]
pub async fn import_popular(
    State(state): State<AppState>,
    Query(params): Query<PopularImportQuery>,
) -> Result<Json<BatchImportResponse>, ApiError> {
    let max = state.config.sync.batch_size as u32;
    let limit = params.limit.unwrap_or(DEFAULT_POPULAR_IMPORT_LIMIT.min(max));
    if limit == 0 || limit > max {
        return Err(validation_error(
            "Invalid limit",
            serde_json::json!({ "limit": format!("Must be between 1 and {max}") }),
        ));
    }

    let report = state.orchestrator.import_popular(limit).await?;
    Ok(Json(BatchImportResponse {
        succeeded: report.succeeded(),
        failed: report.failed(),
        results: report.outcomes.into_iter().map(Into::into).collect(),
    }))
}

/// Search the game database for import candidates
#[utoipa::path(
    get,
    path = "/admin/catalog/search",
    params(SearchQuery),
    responses(
        (status = 200, description = "Matching games", body = CandidatesResponse),
        (status = 400, description = "Invalid query parameters", body = ApiError),
        (status = 503, description = "Game database unavailable or not configured", body = ApiError)
    ),
    tag = "catalog"
)]
pub async fn search_games(
    State(state): State<AppState>,
    Query(params): Query<SearchQuery>,
) -> Result<Json<CandidatesResponse>, ApiError> {
    let name = params
        .q
        .as_deref()
        .map(str::trim)
        .filter(|q| !q.is_empty())
        .ok_or_else(|| {
            validation_error(
                "Missing search term",
                serde_json::json!({ "q": "Must not be empty" }),
            )
        })?;
    let (page, limit) = page_params(params.page, params.limit)?;
    debug!(name, page, limit, "Searching import candidates");

    let candidates = state
        .orchestrator
        .search_for_import(name, page, limit)
        .await?;
    Ok(Json(CandidatesResponse {
        candidates: candidates.into_iter().map(Into::into).collect(),
        page,
        limit,
    }))
}

/// List popular games as import candidates
#[utoipa::path(
    get,
    path = "/admin/catalog/popular",
    params(PageQuery),
    responses(
        (status = 200, description = "Popular games", body = CandidatesResponse),
        (status = 400, description = "Invalid query parameters", body = ApiError),
        (status = 503, description = "Game database unavailable or not configured", body = ApiError)
    ),
    tag = "catalog"
)]
pub async fn popular_games(
    State(state): State<AppState>,
    Query(params): Query<PageQuery>,
) -> Result<Json<CandidatesResponse>, ApiError> {
    let (page, limit) = page_params(params.page, params.limit)?;
    let candidates = state.orchestrator.popular_for_import(page, limit).await?;
    Ok(Json(CandidatesResponse {
        candidates: candidates.into_iter().map(Into::into).collect(),
        page,
        limit,
    }))
}

/// Re-sync one imported product
#[utoipa::path(
    post,
    path = "/admin/catalog/sync/{product_id}",
    params(ProductIdPath),
    responses(
        (status = 200, description = "Product synced, skipped or deactivated", body = SyncResponse),
        (status = 400, description = "Product was not imported from the game database", body = ApiError),
        (status = 404, description = "Product not found", body = ApiError),
        (status = 503, description = "Game database unavailable or not configured", body = ApiError)
    ),
    tag = "catalog"
)]
pub async fn sync_product(
    State(state): State<AppState>,
    Path(path): Path<ProductIdPath>,
) -> Result<Json<SyncResponse>, ApiError> {
    let result = state.orchestrator.sync_product(path.product_id).await?;
    Ok(Json(result.into()))
}

/// Sync every stale product now
#[utoipa::path(
    post,
    path = "/admin/catalog/sync",
    responses(
        (status = 200, description = "Bulk sync finished", body = SyncRunResponse),
        (status = 409, description = "A sync is already running", body = ApiError)
    ),
    tag = "catalog"
)]
pub async fn sync_all(State(state): State<AppState>) -> Result<Json<SyncRunResponse>, ApiError> {
    let synced = state
        .orchestrator
        .sync_stale_products(state.config.sync.interval_days)
        .await?;
    info!(synced, "Bulk sync requested through admin surface finished");
    Ok(Json(SyncRunResponse { synced }))
}

/// Run the scheduler's bulk sync immediately
#[utoipa::path(
    post,
    path = "/admin/catalog/sync/manual",
    responses(
        (status = 200, description = "Manual sync finished", body = SyncRunResponse),
        (status = 409, description = "A sync is already running", body = ApiError),
        (status = 503, description = "Game database not configured", body = ApiError)
    ),
    tag = "catalog"
)]
pub async fn manual_sync(
    State(state): State<AppState>,
) -> Result<Json<SyncRunResponse>, ApiError> {
    let synced = state.scheduler.manual_trigger().await?;
    Ok(Json(SyncRunResponse { synced }))
}

/// Pipeline status
#[utoipa::path(
    get,
    path = "/admin/catalog/status",
    responses(
        (status = 200, description = "Pipeline status", body = CatalogStatusResponse)
    ),
    tag = "catalog"
)]
pub async fn catalog_status(
    State(state): State<AppState>,
) -> Result<Json<CatalogStatusResponse>, ApiError> {
    let scheduler = state.scheduler.status().await;
    let stats = state
        .orchestrator
        .import_stats(state.config.sync.interval_days)
        .await?;

    let client = state.orchestrator.client();
    let credentials_configured = client.has_credentials();
    let api_available = credentials_configured && client.is_api_available().await;

    Ok(Json(CatalogStatusResponse {
        sync_enabled: scheduler.enabled,
        credentials_configured,
        api_available,
        run_hour: scheduler.run_hour,
        stale_after_days: scheduler.stale_after_days,
        last_run_at: scheduler.last_run_at.map(|dt| dt.to_rfc3339()),
        last_count: scheduler.last_count,
        next_run_at: scheduler.next_run_at.map(|dt| dt.to_rfc3339()),
        imported: stats.imported,
        stale: stats.stale,
        sync_in_progress: stats.sync_in_progress,
    }))
}

/// Product with media, references and origin link
#[utoipa::path(
    get,
    path = "/admin/catalog/products/{product_id}",
    params(ProductIdPath),
    responses(
        (status = 200, description = "Product details", body = ProductDetailsResponse),
        (status = 404, description = "Product not found", body = ApiError)
    ),
    tag = "catalog"
)]
pub async fn get_product(
    State(state): State<AppState>,
    Path(path): Path<ProductIdPath>,
) -> Result<Json<ProductDetailsResponse>, ApiError> {
    let details = state
        .orchestrator
        .store()
        .load_product_details(path.product_id)
        .await?
        .ok_or_else(|| not_found(format!("Product {} not found", path.product_id)))?;
    Ok(Json(details.into()))
}

/// Set price, stock or sale activation; these survive every re-sync
#[utoipa::path(
    patch,
    path = "/admin/catalog/products/{product_id}/commercial",
    params(ProductIdPath),
    request_body = CommercialUpdateRequest,
    responses(
        (status = 200, description = "Product updated", body = ProductInfo),
        (status = 400, description = "Invalid values", body = ApiError),
        (status = 404, description = "Product not found", body = ApiError)
    ),
    tag = "catalog"
)]
pub async fn update_commercial_fields(
    State(state): State<AppState>,
    Path(path): Path<ProductIdPath>,
    Json(request): Json<CommercialUpdateRequest>,
) -> Result<Json<ProductInfo>, ApiError> {
    if request.price_cents.is_none()
        && request.stock.is_none()
        && request.activated_for_sale.is_none()
    {
        return Err(validation_error(
            "Nothing to update",
            serde_json::json!({ "body": "Provide price_cents, stock or activated_for_sale" }),
        ));
    }
    if request.price_cents.is_some_and(|price| price < 0) {
        return Err(validation_error(
            "Invalid price",
            serde_json::json!({ "price_cents": "Must not be negative" }),
        ));
    }
    if request.stock.is_some_and(|stock| stock < 0) {
        return Err(validation_error(
            "Invalid stock",
            serde_json::json!({ "stock": "Must not be negative" }),
        ));
    }

    let fields = CommercialFields {
        price_cents: request.price_cents,
        stock: request.stock,
        activated_for_sale: request.activated_for_sale,
    };
    let product = state
        .orchestrator
        .store()
        .set_commercial_fields(path.product_id, fields)
        .await
        .map_err(CatalogError::from)?
        .ok_or(CatalogError::ProductNotFound {
            product_id: path.product_id,
        })?;

    info!(product_id = %product.id, price_cents = product.price_cents, "Commercial fields updated");
    Ok(Json(product.into()))
}

fn page_params(page: Option<u32>, limit: Option<u32>) -> Result<(u32, u32), ApiError> {
    let page = page.unwrap_or(1);
    let limit = limit.unwrap_or(DEFAULT_PAGE_LIMIT);

    if page == 0 {
        return Err(validation_error(
            "Invalid page",
            serde_json::json!({ "page": "Pages start at 1" }),
        ));
    }
    if limit == 0 || limit > MAX_PAGE_LIMIT {
        return Err(validation_error(
            "Invalid limit",
            serde_json::json!({ "limit": format!("Must be between 1 and {MAX_PAGE_LIMIT}") }),
        ));
    }
    Ok((page, limit))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_params_defaults_and_bounds() {
        assert_eq!(page_params(None, None).unwrap(), (1, DEFAULT_PAGE_LIMIT));
        assert_eq!(page_params(Some(3), Some(100)).unwrap(), (3, 100));
        assert!(page_params(Some(0), None).is_err());
        assert!(page_params(None, Some(0)).is_err());
        assert!(page_params(None, Some(101)).is_err());
    }

    #[test]
    fn outcome_serializes_with_status_tag() {
        let json = serde_json::to_value(ImportOutcomeInfo::Failed {
            external_id: 7,
            reason: "game 7 was not found in the game database".to_string(),
        })
        .unwrap();

        assert_eq!(json["status"], "failed");
        assert_eq!(json["external_id"], 7);
        assert!(json["reason"].as_str().unwrap().contains("not found"));
    }
}
