//! # Server Configuration
//!
//! Application state, router and HTTP server for the catalog sync service.

use std::sync::Arc;

use anyhow::Context;
use axum::{
    Router, middleware,
    routing::{get, patch, post},
};
use sea_orm::DatabaseConnection;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;
use tracing::info;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::config::AppConfig;
use crate::error::CatalogError;
use crate::handlers::{self, catalog};
use crate::igdb::IgdbClient;
use crate::import::ImportOrchestrator;
use crate::repositories::{CatalogStore, SeaOrmCatalogStore};
use crate::scheduler::CatalogSyncScheduler;
use crate::telemetry;

/// Application state containing shared resources
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub db: DatabaseConnection,
    pub orchestrator: Arc<ImportOrchestrator>,
    pub scheduler: Arc<CatalogSyncScheduler>,
}

impl AppState {
    /// Wires the game database client, store, orchestrator and scheduler.
    pub fn new(config: AppConfig, db: DatabaseConnection) -> Result<Self, CatalogError> {
        let client = IgdbClient::new(&config.igdb)?;
        let store: Arc<dyn CatalogStore> = Arc::new(SeaOrmCatalogStore::new(Arc::new(db.clone())));
        let orchestrator = Arc::new(ImportOrchestrator::new(
            client,
            store,
            &config.igdb.image_base,
        ));
        let scheduler = Arc::new(CatalogSyncScheduler::new(
            Arc::clone(&orchestrator),
            config.sync.clone(),
        ));

        Ok(Self {
            config: Arc::new(config),
            db,
            orchestrator,
            scheduler,
        })
    }
}

/// Creates and configures the Axum application router
pub fn create_app(state: AppState) -> Router {
    let admin = Router::new()
        .route("/import/batch", post(catalog::import_batch))
        .route("/import/popular", post(catalog::import_popular))
        .route("/import/{external_id}", post(catalog::import_game))
        .route("/search", get(catalog::search_games))
        .route("/popular", get(catalog::popular_games))
        .route("/sync", post(catalog::sync_all))
        .route("/sync/manual", post(catalog::manual_sync))
        .route("/sync/{product_id}", post(catalog::sync_product))
        .route("/status", get(catalog::catalog_status))
        .route("/products/{product_id}", get(catalog::get_product))
        .route(
            "/products/{product_id}/commercial",
            patch(catalog::update_commercial_fields),
        );

    Router::new()
        .route("/", get(handlers::root))
        .route("/healthz", get(handlers::healthz))
        .nest("/admin/catalog", admin)
        .with_state(state)
        .merge(SwaggerUi::new("/docs").url("/openapi.json", ApiDoc::openapi()))
        .layer(middleware::from_fn(telemetry::trace_context_middleware))
        .layer(TraceLayer::new_for_http())
}

/// Serves the API until `shutdown` fires
pub async fn run_server(state: AppState, shutdown: CancellationToken) -> anyhow::Result<()> {
    let addr = state
        .config
        .bind_addr()
        .with_context(|| format!("Invalid server address: {}", state.config.api_bind_addr))?;
    let profile = state.config.profile.clone();
    let app = create_app(state);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!(%addr, %profile, "Server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown.cancelled_owned())
        .await
        .context("Server error")?;

    Ok(())
}

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    paths(
        crate::handlers::root,
        crate::handlers::healthz,
        catalog::import_game,
        catalog::import_batch,
        catalog::import_popular,
        catalog::search_games,
        catalog::popular_games,
        catalog::sync_product,
        catalog::sync_all,
        catalog::manual_sync,
        catalog::catalog_status,
        catalog::get_product,
        catalog::update_commercial_fields,
    ),
    components(
        schemas(
            crate::models::ServiceInfo,
            crate::error::ApiError,
            crate::igdb::ImageSize,
            crate::mapper::GameStatus,
            catalog::ProductInfo,
            catalog::OriginInfo,
            catalog::ImageInfo,
            catalog::VideoInfo,
            catalog::ReferenceInfo,
            catalog::ProductDetailsResponse,
            catalog::ImportResponse,
            catalog::BatchImportRequest,
            catalog::ImportOutcomeInfo,
            catalog::BatchImportResponse,
            catalog::CandidateInfo,
            catalog::CandidatesResponse,
            catalog::SyncResponse,
            catalog::SyncRunResponse,
            catalog::CatalogStatusResponse,
            catalog::CommercialUpdateRequest,
        )
    ),
    tags(
        (name = "root", description = "Service information"),
        (name = "catalog", description = "Game catalog import and sync administration")
    ),
    info(
        title = "Catalog Sync API",
        description = "Imports games from the external game database into the storefront catalog and keeps them in sync",
        version = env!("CARGO_PKG_VERSION"),
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openapi_lists_admin_routes() {
        let doc = ApiDoc::openapi();
        let paths = &doc.paths.paths;
        assert!(paths.contains_key("/admin/catalog/import/{external_id}"));
        assert!(paths.contains_key("/admin/catalog/sync/manual"));
        assert!(paths.contains_key("/admin/catalog/products/{product_id}/commercial"));
    }
}
