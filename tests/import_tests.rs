//! Integration tests for the import orchestrator against an in-memory
//! database and a mocked game database.

mod test_utils;

use catalog_sync::error::CatalogError;
use catalog_sync::import::{ImportOutcome, SyncStatus};
use catalog_sync::models::{Genre, Product, ProductImage, ProductOrigin, ProductVideo};
use catalog_sync::models::{genre, product_genre, product_image, product_platform};
use catalog_sync::repositories::{CatalogStore, CommercialFields};
use sea_orm::{ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter};
use serde_json::json;
use test_utils::*;
use uuid::Uuid;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn mocked_game_database() -> MockServer {
    let server = MockServer::start().await;
    mount_token_endpoint(&server).await;
    mount_reference_endpoints(&server).await;
    server
}

#[tokio::test]
async fn import_maps_and_persists_the_full_product_graph() {
    let db = setup_test_db().await.unwrap();
    catalog_sync::seeds::seed_platforms(&db).await.unwrap();
    let server = mocked_game_database().await;
    mount_game(&server, game_fixture(1942, "The Witcher 3", &[12, 31], &[6, 48, 999])).await;
    let (orchestrator, store) = build_orchestrator(&db, &igdb_config(&server));

    let result = orchestrator.import_by_id(1942).await.unwrap();
    assert!(result.created);

    let product = result.product;
    assert_eq!(product.name, "The Witcher 3");
    assert_eq!(product.slug, "the-witcher-3");
    assert_eq!(product.rating, Some(9.35));
    assert_eq!(product.status, "released");
    assert!(product.activated_for_sale);
    assert_eq!(product.price_cents, 0);
    assert_eq!(
        product.release_date.map(|date| date.to_string()),
        Some("2015-05-19".to_string())
    );
    let links = product.external_links.clone().unwrap();
    assert_eq!(links["Steam"], "https://store.steampowered.com/app/1942");
    assert_eq!(links["Official Site"], "https://1942.example.com");

    let details = store.load_product_details(product.id).await.unwrap().unwrap();
    let origin = details.origin.unwrap();
    assert_eq!(origin.origin, "EXTERNAL_DB");
    assert_eq!(origin.external_id, "1942");
    assert!(origin.sync_enabled);
    assert_eq!(
        origin.external_url.as_deref(),
        Some("https://www.igdb.com/games/the-witcher-3")
    );

    assert_eq!(details.images.len(), 1);
    assert!(details.images[0].is_primary);
    assert_eq!(details.images[0].position, 1);
    assert_eq!(
        details.images[0].url,
        format!("{TEST_IMAGE_BASE}/t_cover_big/co1942.jpg")
    );

    assert_eq!(details.videos.len(), 1);
    assert_eq!(details.videos[0].kind, "trailer");
    assert_eq!(details.videos[0].url, "https://www.youtube.com/watch?v=yt1942");

    // Platform 999 has no local row and is skipped.
    let platform_ids: Vec<Option<i64>> = details.platforms.iter().map(|p| p.external_id).collect();
    assert_eq!(platform_ids.len(), 2);
    assert!(platform_ids.contains(&Some(6)));
    assert!(platform_ids.contains(&Some(48)));

    assert_eq!(details.genres.len(), 2);
    assert!(details.genres.iter().all(|genre| genre.origin == "imported"));
}

#[tokio::test]
async fn importing_twice_is_idempotent_and_skips_the_game_database() {
    let db = setup_test_db().await.unwrap();
    let server = MockServer::start().await;
    mount_token_endpoint_expecting(&server, 1).await;
    mount_reference_endpoints(&server).await;
    game_mock(1942, json!([game_fixture(1942, "The Witcher 3", &[12], &[])]))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v4/covers"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;
    let (orchestrator, _store) = build_orchestrator(&db, &igdb_config(&server));

    let first = orchestrator.import_by_id(1942).await.unwrap();
    let second = orchestrator.import_by_id(1942).await.unwrap();

    assert!(first.created);
    assert!(!second.created);
    assert_eq!(first.product, second.product);
    assert_eq!(Product::find().count(&db).await.unwrap(), 1);
    assert_eq!(ProductOrigin::find().count(&db).await.unwrap(), 1);

    server.verify().await;
}

#[tokio::test]
async fn unknown_game_is_reported_as_not_found() {
    let db = setup_test_db().await.unwrap();
    let server = mocked_game_database().await;
    mount_missing_game(&server, 77).await;
    let (orchestrator, _store) = build_orchestrator(&db, &igdb_config(&server));

    let err = orchestrator.import_by_id(77).await.unwrap_err();

    assert!(matches!(
        err,
        CatalogError::NotFoundInExternalSource { ref external_id } if external_id == "77"
    ));
    assert_eq!(Product::find().count(&db).await.unwrap(), 0);
}

#[tokio::test]
async fn shared_genres_are_stored_once() {
    let db = setup_test_db().await.unwrap();
    let server = mocked_game_database().await;
    mount_game(&server, game_fixture(10, "First Game", &[12], &[])).await;
    mount_game(&server, game_fixture(20, "Second Game", &[12, 31], &[])).await;
    let (orchestrator, _store) = build_orchestrator(&db, &igdb_config(&server));

    orchestrator.import_by_id(10).await.unwrap();
    orchestrator.import_by_id(20).await.unwrap();

    let rpg: Vec<genre::Model> = Genre::find()
        .filter(genre::Column::ExternalId.eq(12))
        .all(&db)
        .await
        .unwrap();
    assert_eq!(rpg.len(), 1);
    assert_eq!(Genre::find().count(&db).await.unwrap(), 2);

    let links = product_genre::Entity::find()
        .filter(product_genre::Column::GenreId.eq(rpg[0].id))
        .count(&db)
        .await
        .unwrap();
    assert_eq!(links, 2);
}

#[tokio::test]
async fn graph_linking_an_unknown_genre_is_rolled_back() {
    let db = setup_test_db().await.unwrap();
    let server = MockServer::start().await;
    let (_orchestrator, store) = build_orchestrator(&db, &igdb_config(&server));

    let mut graph = bare_product_graph("77", None, true);
    graph.genre_ids = vec![Uuid::new_v4()];

    assert!(store.save_product_graph(graph).await.is_err());
    assert_eq!(Product::find().count(&db).await.unwrap(), 0);
    assert_eq!(ProductOrigin::find().count(&db).await.unwrap(), 0);
}

#[tokio::test]
async fn new_genres_are_written_before_their_links() {
    let db = setup_test_db().await.unwrap();
    let server = MockServer::start().await;
    let (_orchestrator, store) = build_orchestrator(&db, &igdb_config(&server));

    let mut graph = bare_product_graph("78", None, true);
    let now = graph.product.created_at;
    let fresh = genre::Model {
        id: Uuid::new_v4(),
        name: "Puzzle".to_string(),
        slug: "puzzle".to_string(),
        external_id: Some(9),
        origin: genre::GENRE_ORIGIN_IMPORTED.to_string(),
        created_at: now,
    };
    graph.genre_ids = vec![fresh.id];
    graph.new_genres = vec![fresh];

    let product = store.save_product_graph(graph).await.unwrap();

    let links = product_genre::Entity::find()
        .filter(product_genre::Column::ProductId.eq(product.id))
        .count(&db)
        .await
        .unwrap();
    assert_eq!(links, 1);
    assert!(store.find_genre_by_external_id(9).await.unwrap().is_some());
}

#[tokio::test]
async fn batch_import_isolates_failures() {
    let db = setup_test_db().await.unwrap();
    let server = mocked_game_database().await;
    for id in [1, 2, 4, 5] {
        mount_game(&server, game_fixture(id, &format!("Game {id}"), &[5], &[])).await;
    }
    mount_failing_game(&server, 3).await;
    let (orchestrator, _store) = build_orchestrator(&db, &igdb_config(&server));

    let report = orchestrator.import_games_batch(&[1, 2, 3, 4, 5]).await;

    assert_eq!(report.outcomes.len(), 5);
    assert_eq!(report.succeeded(), 4);
    assert_eq!(report.failed(), 1);
    let order: Vec<i64> = report.outcomes.iter().map(|o| o.external_id()).collect();
    assert_eq!(order, vec![1, 2, 3, 4, 5]);
    assert!(matches!(
        &report.outcomes[2],
        ImportOutcome::Failed { external_id: 3, reason } if reason.contains("500")
    ));
    assert_eq!(Product::find().count(&db).await.unwrap(), 4);
}

#[tokio::test]
async fn batch_import_reports_existing_products() {
    let db = setup_test_db().await.unwrap();
    let server = mocked_game_database().await;
    mount_game(&server, game_fixture(1, "Game 1", &[], &[])).await;
    mount_game(&server, game_fixture(2, "Game 2", &[], &[])).await;
    let (orchestrator, _store) = build_orchestrator(&db, &igdb_config(&server));
    orchestrator.import_by_id(1).await.unwrap();

    let report = orchestrator.import_games_batch(&[1, 2]).await;

    assert!(matches!(report.outcomes[0], ImportOutcome::Existing { external_id: 1, .. }));
    assert!(matches!(report.outcomes[1], ImportOutcome::Imported { external_id: 2, .. }));
}

#[tokio::test]
async fn sync_refreshes_metadata_and_preserves_commercial_fields() {
    let db = setup_test_db().await.unwrap();
    let server = mocked_game_database().await;
    mount_game(&server, game_fixture(1942, "The Witcher 3", &[12], &[])).await;
    let (orchestrator, store) = build_orchestrator(&db, &igdb_config(&server));

    let imported = orchestrator.import_by_id(1942).await.unwrap().product;
    store
        .set_commercial_fields(
            imported.id,
            CommercialFields {
                price_cents: Some(2999),
                stock: Some(12),
                activated_for_sale: Some(false),
            },
        )
        .await
        .unwrap()
        .unwrap();

    server.reset().await;
    mount_token_endpoint(&server).await;
    mount_reference_endpoints(&server).await;
    let mut updated = game_fixture(1942, "The Witcher 3: Wild Hunt", &[12, 31], &[]);
    updated["total_rating"] = json!(97.5);
    updated["summary"] = json!("x".repeat(600));
    mount_game(&server, updated).await;

    let result = orchestrator.sync_product(imported.id).await.unwrap();

    assert_eq!(result.status, SyncStatus::Synced);
    let product = result.product;
    assert_eq!(product.id, imported.id);
    assert_eq!(product.name, "The Witcher 3: Wild Hunt");
    assert_eq!(product.rating, Some(9.75));
    assert_eq!(product.price_cents, 2999);
    assert_eq!(product.stock, 12);
    assert!(!product.activated_for_sale);
    assert_eq!(product.created_at, imported.created_at);
    let description = product.description.unwrap();
    assert_eq!(description.chars().count(), 500);
    assert!(description.ends_with("..."));

    let origin = store.find_origin_for_product(imported.id).await.unwrap().unwrap();
    assert_eq!(origin.data_version, 2);
    assert!(origin.last_synced_at.is_some());
    assert_eq!(ProductOrigin::find().count(&db).await.unwrap(), 1);

    // Media and links are replaced, not appended.
    let images = ProductImage::find()
        .filter(product_image::Column::ProductId.eq(imported.id))
        .count(&db)
        .await
        .unwrap();
    assert_eq!(images, 1);
    assert_eq!(ProductVideo::find().count(&db).await.unwrap(), 1);
    let genre_links = product_genre::Entity::find()
        .filter(product_genre::Column::ProductId.eq(imported.id))
        .count(&db)
        .await
        .unwrap();
    assert_eq!(genre_links, 2);
    assert_eq!(
        product_platform::Entity::find().count(&db).await.unwrap(),
        0
    );
}

#[tokio::test]
async fn sync_disables_products_that_vanished_upstream() {
    let db = setup_test_db().await.unwrap();
    let server = mocked_game_database().await;
    mount_missing_game(&server, 4040).await;
    let (orchestrator, store) = build_orchestrator(&db, &igdb_config(&server));
    let product = insert_imported_product(&store, "4040", None, true).await.unwrap();

    let result = orchestrator.sync_product(product.id).await.unwrap();

    assert_eq!(result.status, SyncStatus::Deactivated);
    assert_eq!(result.product, product);
    let origin = store.find_origin_for_product(product.id).await.unwrap().unwrap();
    assert!(!origin.sync_enabled);
    assert_eq!(origin.data_version, 1);
    assert!(store.find_product(product.id).await.unwrap().is_some());
}

#[tokio::test]
async fn sync_skips_products_with_sync_disabled() {
    let db = setup_test_db().await.unwrap();
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;
    let (orchestrator, store) = build_orchestrator(&db, &igdb_config(&server));
    let product = insert_imported_product(&store, "55", None, false).await.unwrap();

    let result = orchestrator.sync_product(product.id).await.unwrap();

    assert_eq!(result.status, SyncStatus::Skipped);
    server.verify().await;
}

#[tokio::test]
async fn sync_rejects_products_from_other_origins() {
    let db = setup_test_db().await.unwrap();
    let server = mocked_game_database().await;
    let (orchestrator, store) = build_orchestrator(&db, &igdb_config(&server));
    let product = insert_imported_product(&store, "55", None, true).await.unwrap();
    let mut origin = store.find_origin_for_product(product.id).await.unwrap().unwrap();
    origin.origin = "MANUAL".to_string();
    store.save_origin_link(origin).await.unwrap();

    let err = orchestrator.sync_product(product.id).await.unwrap_err();
    assert!(matches!(err, CatalogError::Business(_)));

    let err = orchestrator.sync_product(Uuid::new_v4()).await.unwrap_err();
    assert!(matches!(err, CatalogError::ProductNotFound { .. }));
}

#[tokio::test]
async fn search_candidates_flag_imported_games() {
    let db = setup_test_db().await.unwrap();
    let server = mocked_game_database().await;
    Mock::given(method("POST"))
        .and(path("/v4/games"))
        .and(body_string_contains("search \"witcher\";"))
        .and(body_string_contains("limit 2; offset 2;"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "id": 1942, "name": "The Witcher 3", "slug": "the-witcher-3", "status": 0,
              "total_rating": 93.4, "cover": { "id": 1, "image_id": "coabc" } },
            { "id": 80, "name": "The Witcher", "status": 42 }
        ])))
        .mount(&server)
        .await;
    let (orchestrator, store) = build_orchestrator(&db, &igdb_config(&server));
    insert_imported_product(&store, "1942", None, true).await.unwrap();

    let candidates = orchestrator.search_for_import("witcher", 2, 2).await.unwrap();

    assert_eq!(candidates.len(), 2);
    assert!(candidates[0].already_imported);
    assert_eq!(candidates[0].rating, Some(9.34));
    assert_eq!(
        candidates[0].cover_url.as_deref(),
        Some("https://images.test/igdb/image/upload/t_cover_small/coabc.jpg")
    );
    assert!(!candidates[1].already_imported);
    assert_eq!(candidates[1].cover_url, None);
    assert_eq!(candidates[1].status.as_str(), "upcoming");
    assert_eq!(Product::find().count(&db).await.unwrap(), 1);
}

#[tokio::test]
async fn import_popular_imports_the_most_rated_games() {
    let db = setup_test_db().await.unwrap();
    let server = mocked_game_database().await;
    Mock::given(method("POST"))
        .and(path("/v4/games"))
        .and(body_string_contains("sort total_rating_count desc;"))
        .and(body_string_contains("limit 2;"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "id": 10, "name": "First Game" },
            { "id": 20, "name": "Second Game" }
        ])))
        .mount(&server)
        .await;
    mount_game(&server, game_fixture(10, "First Game", &[5], &[])).await;
    mount_game(&server, game_fixture(20, "Second Game", &[5], &[])).await;
    let (orchestrator, _store) = build_orchestrator(&db, &igdb_config(&server));

    let report = orchestrator.import_popular(2).await.unwrap();

    assert_eq!(report.succeeded(), 2);
    assert_eq!(Product::find().count(&db).await.unwrap(), 2);
}

#[tokio::test]
async fn refresh_genres_inserts_only_missing_rows() {
    let db = setup_test_db().await.unwrap();
    let server = mocked_game_database().await;
    let (orchestrator, _store) = build_orchestrator(&db, &igdb_config(&server));

    assert_eq!(orchestrator.refresh_genres().await.unwrap(), 3);
    assert_eq!(orchestrator.refresh_genres().await.unwrap(), 0);
    assert_eq!(Genre::find().count(&db).await.unwrap(), 3);
}
