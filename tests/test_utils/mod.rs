//! Test utilities for the catalog pipeline.
//!
//! Provides an in-memory SQLite database with all migrations applied, a
//! wiremock stand-in for the token and query endpoints, and builders for
//! orchestrator instances wired to both.

use std::sync::Arc;

use anyhow::Result;
use catalog_sync::config::IgdbConfig;
use catalog_sync::igdb::IgdbClient;
use catalog_sync::import::ImportOrchestrator;
use catalog_sync::mapper::ORIGIN_EXTERNAL_DB;
use catalog_sync::models::{product, product_origin};
use catalog_sync::repositories::{CatalogStore, ProductGraph, SeaOrmCatalogStore};
use chrono::{DateTime, Utc};
use migration::{Migrator, MigratorTrait};
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, Statement};
use serde_json::{Value, json};
use uuid::Uuid;
use wiremock::matchers::{body_string_contains, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const TEST_ACCESS_TOKEN: &str = "test-access-token";
pub const TEST_CLIENT_ID: &str = "test-client-id";
pub const TEST_IMAGE_BASE: &str = "https://images.test/igdb/image/upload";

/// Sets up an in-memory SQLite database with all migrations applied.
///
/// The pool is limited to one connection so every query sees the same
/// in-memory database.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    let mut options = ConnectOptions::new("sqlite::memory:");
    options
        .max_connections(1)
        .min_connections(1)
        .sqlx_logging(false);
    let db = Database::connect(options).await?;

    Migrator::up(&db, None).await?;

    // Product graphs must be written parents first.
    db.execute(Statement::from_string(
        db.get_database_backend(),
        "PRAGMA foreign_keys = ON".to_string(),
    ))
    .await?;

    Ok(db)
}

/// Game database configuration pointing at `server`.
#[allow(dead_code)]
pub fn igdb_config(server: &MockServer) -> IgdbConfig {
    IgdbConfig {
        client_id: Some(TEST_CLIENT_ID.to_string()),
        client_secret: Some("test-client-secret".to_string()),
        api_base: format!("{}/v4", server.uri()),
        auth_url: format!("{}/oauth2/token", server.uri()),
        image_base: TEST_IMAGE_BASE.to_string(),
        timeout_seconds: 5,
    }
}

/// Orchestrator over `db` talking to the game database described by `config`.
#[allow(dead_code)]
pub fn build_orchestrator(
    db: &DatabaseConnection,
    config: &IgdbConfig,
) -> (Arc<ImportOrchestrator>, Arc<SeaOrmCatalogStore>) {
    let store = Arc::new(SeaOrmCatalogStore::new(Arc::new(db.clone())));
    let client = IgdbClient::new(config).expect("client builds");
    let dyn_store: Arc<dyn CatalogStore> = store.clone();
    let orchestrator = Arc::new(ImportOrchestrator::new(
        client,
        dyn_store,
        &config.image_base,
    ));
    (orchestrator, store)
}

/// Token endpoint answering every client-credentials request.
#[allow(dead_code)]
pub async fn mount_token_endpoint(server: &MockServer) {
    token_mock().mount(server).await;
}

/// Token endpoint that must be called exactly `times` times.
#[allow(dead_code)]
pub async fn mount_token_endpoint_expecting(server: &MockServer, times: u64) {
    token_mock().expect(times).mount(server).await;
}

fn token_mock() -> Mock {
    Mock::given(method("POST"))
        .and(path("/oauth2/token"))
        .and(query_param("client_id", TEST_CLIENT_ID))
        .and(query_param("grant_type", "client_credentials"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": TEST_ACCESS_TOKEN,
            "expires_in": 5_587_808,
            "token_type": "bearer"
        })))
}

/// Detail-query mock for one game id.
#[allow(dead_code)]
pub fn game_mock(external_id: i64, body: Value) -> Mock {
    Mock::given(method("POST"))
        .and(path("/v4/games"))
        .and(body_string_contains(format!("where id = {external_id};")))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
}

/// Serves `game` for its id together with its cover.
#[allow(dead_code)]
pub async fn mount_game(server: &MockServer, game: Value) {
    let id = game["id"].as_i64().expect("fixture has id");
    game_mock(id, json!([game])).mount(server).await;
    mount_cover(server, id).await;
}

/// The game id is unknown to the game database.
#[allow(dead_code)]
pub async fn mount_missing_game(server: &MockServer, external_id: i64) {
    game_mock(external_id, json!([])).mount(server).await;
}

/// The game database fails for this game id.
#[allow(dead_code)]
pub async fn mount_failing_game(server: &MockServer, external_id: i64) {
    Mock::given(method("POST"))
        .and(path("/v4/games"))
        .and(body_string_contains(format!("where id = {external_id};")))
        .respond_with(ResponseTemplate::new(500).set_body_string("upstream exploded"))
        .mount(server)
        .await;
}

#[allow(dead_code)]
async fn mount_cover(server: &MockServer, external_id: i64) {
    Mock::given(method("POST"))
        .and(path("/v4/covers"))
        .and(body_string_contains(format!(
            "where id = ({});",
            cover_id(external_id)
        )))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
            "id": cover_id(external_id),
            "image_id": format!("co{external_id}"),
            "width": 264,
            "height": 374
        }])))
        .mount(server)
        .await;
}

/// Reference endpoints returning every genre and platform the fixtures use.
#[allow(dead_code)]
pub async fn mount_reference_endpoints(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/v4/genres"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "id": 5, "name": "Shooter", "slug": "shooter" },
            { "id": 12, "name": "Role-playing (RPG)", "slug": "role-playing-rpg" },
            { "id": 31, "name": "Adventure", "slug": "adventure" }
        ])))
        .mount(server)
        .await;

    Mock::given(method("POST"))
        .and(path("/v4/platforms"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "id": 6, "name": "PC (Microsoft Windows)", "slug": "win", "abbreviation": "PC" },
            { "id": 48, "name": "PlayStation 4", "slug": "ps4--1", "abbreviation": "PS4" },
            { "id": 999, "name": "Obscure Handheld", "slug": "obscure" }
        ])))
        .mount(server)
        .await;
}

#[allow(dead_code)]
pub fn cover_id(external_id: i64) -> i64 {
    100_000 + external_id
}

/// A released game with a cover, one trailer, links, and the given references.
#[allow(dead_code)]
pub fn game_fixture(external_id: i64, name: &str, genres: &[i64], platforms: &[i64]) -> Value {
    json!({
        "id": external_id,
        "name": name,
        "slug": name.to_lowercase().replace(' ', "-"),
        "summary": format!("{name} summary"),
        "storyline": format!("{name} storyline"),
        "first_release_date": 1_431_993_600,
        "rating": 90.0,
        "total_rating": 93.456,
        "total_rating_count": 2500,
        "status": 0,
        "cover": cover_id(external_id),
        "videos": [{
            "id": 7000 + external_id,
            "video_id": format!("yt{external_id}"),
            "name": "Launch Trailer"
        }],
        "platforms": platforms,
        "genres": genres,
        "external_games": [{
            "id": 1,
            "category": 1,
            "url": format!("https://store.steampowered.com/app/{external_id}")
        }],
        "websites": [{
            "id": 2,
            "category": 1,
            "url": format!("https://{external_id}.example.com")
        }]
    })
}

/// Stores an imported product directly, bypassing the game database.
#[allow(dead_code)]
pub async fn insert_imported_product(
    store: &SeaOrmCatalogStore,
    external_id: &str,
    last_synced_at: Option<DateTime<Utc>>,
    sync_enabled: bool,
) -> Result<product::Model> {
    let graph = bare_product_graph(external_id, last_synced_at, sync_enabled);
    Ok(store.save_product_graph(graph).await?)
}

/// An imported product without media or references.
#[allow(dead_code)]
pub fn bare_product_graph(
    external_id: &str,
    last_synced_at: Option<DateTime<Utc>>,
    sync_enabled: bool,
) -> ProductGraph {
    let now = Utc::now().into();
    let product_id = Uuid::new_v4();
    let product = product::Model {
        id: product_id,
        name: format!("Game {external_id}"),
        slug: format!("game-{external_id}"),
        description: None,
        long_description: None,
        release_date: None,
        rating: None,
        status: "released".to_string(),
        activated_for_sale: true,
        price_cents: 0,
        stock: 0,
        external_links: None,
        created_at: now,
        updated_at: now,
    };
    let origin = product_origin::Model {
        id: Uuid::new_v4(),
        product_id,
        origin: ORIGIN_EXTERNAL_DB.to_string(),
        external_id: external_id.to_string(),
        external_url: None,
        imported_at: now,
        last_synced_at: last_synced_at.map(Into::into),
        data_version: 1,
        sync_enabled,
    };

    ProductGraph {
        product,
        origin,
        images: Vec::new(),
        videos: Vec::new(),
        platform_ids: Vec::new(),
        genre_ids: Vec::new(),
        new_genres: Vec::new(),
    }
}
