//! # Metadata Mapper
//!
//! Converts a resolved [`GameBundle`] into an unpersisted [`ProductGraph`].
//! Apart from the platform and genre lookups it is a pure function of its
//! inputs; nothing is written here.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::prelude::DateTimeWithTimeZone;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::CatalogError;
use crate::igdb::types::{GameBundle, IgdbGame, IgdbGenre, IgdbImage, IgdbPlatform, IgdbVideo};
use crate::igdb::{ImageSize, image_url, youtube_watch_url};
use crate::models::genre::GENRE_ORIGIN_IMPORTED;
use crate::models::product_image::{IMAGE_KIND_COVER, IMAGE_KIND_SCREENSHOT};
use crate::models::product_video::VIDEO_KIND_TRAILER;
use crate::models::{genre, product, product_image, product_origin, product_video};
use crate::repositories::catalog::{CatalogStore, ProductGraph};

/// Origin tag of products imported from the game database.
pub const ORIGIN_EXTERNAL_DB: &str = "EXTERNAL_DB";

/// Storage limit of `products.description`, in characters.
pub const DESCRIPTION_MAX_CHARS: usize = 500;

const TRUNCATION_MARKER: &str = "...";

const EXTERNAL_PAGE_BASE: &str = "https://www.igdb.com/games";

/// Local lifecycle status of a game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum GameStatus {
    Released,
    Alpha,
    Beta,
    EarlyAccess,
    Cancelled,
    Discontinued,
    Upcoming,
}

impl GameStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            GameStatus::Released => "released",
            GameStatus::Alpha => "alpha",
            GameStatus::Beta => "beta",
            GameStatus::EarlyAccess => "early_access",
            GameStatus::Cancelled => "cancelled",
            GameStatus::Discontinued => "discontinued",
            GameStatus::Upcoming => "upcoming",
        }
    }

    /// Only released games start out purchasable.
    pub fn activates_for_sale(self) -> bool {
        self == GameStatus::Released
    }
}

impl fmt::Display for GameStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// External status code to local status. Unlisted codes are `Upcoming`.
const STATUS_CODES: &[(i32, GameStatus)] = &[
    (0, GameStatus::Released),
    (2, GameStatus::Alpha),
    (3, GameStatus::Beta),
    (4, GameStatus::EarlyAccess),
    (6, GameStatus::Cancelled),
    (7, GameStatus::Discontinued),
    (8, GameStatus::Discontinued),
];

/// Store listing category codes.
const STORE_CATEGORIES: &[(i32, &str)] = &[
    (1, "Steam"),
    (5, "GOG"),
    (20, "Amazon"),
    (26, "Epic Games Store"),
];

/// Website category codes.
const WEBSITE_CATEGORIES: &[(i32, &str)] = &[
    (1, "Official Site"),
    (2, "Fandom Wiki"),
    (3, "Wikipedia"),
    (4, "Facebook"),
    (5, "Twitter"),
    (6, "Twitch"),
    (8, "Instagram"),
    (9, "YouTube"),
    (10, "App Store (iPhone)"),
    (11, "App Store (iPad)"),
    (12, "Google Play"),
    (13, "Steam"),
    (14, "Reddit"),
    (15, "itch.io"),
    (16, "Epic Games Store"),
    (17, "GOG"),
    (18, "Discord"),
];

pub fn status_from_code(code: Option<i32>) -> GameStatus {
    code.and_then(|code| {
        STATUS_CODES
            .iter()
            .find(|(known, _)| *known == code)
            .map(|(_, status)| *status)
    })
    .unwrap_or(GameStatus::Upcoming)
}

pub fn store_label(category: i32) -> String {
    lookup_label(STORE_CATEGORIES, category).unwrap_or_else(|| format!("Store {category}"))
}

pub fn website_label(category: i32) -> String {
    lookup_label(WEBSITE_CATEGORIES, category).unwrap_or_else(|| format!("Website {category}"))
}

fn lookup_label(table: &[(i32, &str)], code: i32) -> Option<String> {
    table
        .iter()
        .find(|(known, _)| *known == code)
        .map(|(_, label)| (*label).to_string())
}

/// Cuts `text` to `max_chars` characters, ending with `...` when shortened.
pub fn truncate_description(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let keep = max_chars.saturating_sub(TRUNCATION_MARKER.chars().count());
    let mut truncated: String = text.chars().take(keep).collect();
    truncated.push_str(TRUNCATION_MARKER);
    truncated
}

/// 0-100 scale to 0-10 scale, two decimals.
pub fn convert_rating(rating: Option<f64>) -> Option<f64> {
    rating
        .filter(|value| value.is_finite())
        .map(|value| (value / 10.0 * 100.0).round() / 100.0)
}

/// Epoch seconds to a calendar date (UTC).
pub fn release_date_from_epoch(seconds: Option<i64>) -> Option<NaiveDate> {
    seconds
        .and_then(|seconds| DateTime::<Utc>::from_timestamp(seconds, 0))
        .map(|timestamp| timestamp.date_naive())
}

pub fn external_page_url(slug: &str) -> String {
    format!("{EXTERNAL_PAGE_BASE}/{slug}")
}

/// Lowercase ASCII slug for names that come without one.
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut pending_dash = false;
    for ch in name.chars() {
        if ch.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(ch.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
    }
    slug
}

/// Store listings and websites merged into one label to URL map.
///
/// Store listings win over websites that share a label.
pub fn merge_external_links(game: &IgdbGame) -> BTreeMap<String, String> {
    let mut links = BTreeMap::new();

    for website in game.websites.iter().filter_map(|site| site.as_object()) {
        if let Some(url) = website.url.as_deref().filter(|url| !url.is_empty()) {
            let label = website
                .category
                .map(website_label)
                .unwrap_or_else(|| "Website".to_string());
            links.insert(label, url.to_string());
        }
    }

    for listing in game.external_games.iter().filter_map(|game| game.as_object()) {
        if let Some(url) = listing.url.as_deref().filter(|url| !url.is_empty()) {
            let label = listing
                .category
                .map(store_label)
                .unwrap_or_else(|| "Store".to_string());
            links.insert(label, url.to_string());
        }
    }

    links
}

/// Maps game database records onto the product graph.
#[derive(Debug, Clone)]
pub struct MetadataMapper {
    image_base: String,
}

impl MetadataMapper {
    pub fn new(image_base: impl Into<String>) -> Self {
        Self {
            image_base: image_base.into(),
        }
    }

    /// Builds a fresh graph for `bundle`. Platforms and genres are resolved
    /// against `store`: unknown genres become new rows, unknown platforms are
    /// skipped.
    pub async fn map_game_to_product(
        &self,
        bundle: &GameBundle,
        store: &dyn CatalogStore,
    ) -> Result<ProductGraph, CatalogError> {
        let game = &bundle.game;
        let now: DateTimeWithTimeZone = Utc::now().into();
        let product_id = Uuid::new_v4();
        let status = status_from_code(game.status);
        let slug = game
            .slug
            .clone()
            .filter(|slug| !slug.is_empty())
            .unwrap_or_else(|| slugify(&game.name));

        let description = game
            .summary
            .as_deref()
            .map(|summary| truncate_description(summary, DESCRIPTION_MAX_CHARS));
        let long_description = game
            .storyline
            .clone()
            .filter(|storyline| !storyline.trim().is_empty())
            .or_else(|| game.summary.clone());

        let links = merge_external_links(game);
        let external_links = if links.is_empty() {
            None
        } else {
            Some(serde_json::json!(links))
        };

        let product = product::Model {
            id: product_id,
            name: game.name.clone(),
            slug: slug.clone(),
            description,
            long_description,
            release_date: release_date_from_epoch(game.first_release_date),
            rating: convert_rating(game.total_rating.or(game.rating)),
            status: status.as_str().to_string(),
            activated_for_sale: status.activates_for_sale(),
            price_cents: 0,
            stock: 0,
            external_links,
            created_at: now,
            updated_at: now,
        };

        let origin = product_origin::Model {
            id: Uuid::new_v4(),
            product_id,
            origin: ORIGIN_EXTERNAL_DB.to_string(),
            external_id: game.id.to_string(),
            external_url: Some(external_page_url(&slug)),
            imported_at: now,
            last_synced_at: None,
            data_version: 1,
            sync_enabled: true,
        };

        let images = self.map_images(product_id, bundle.cover.as_ref(), &bundle.screenshots);
        let videos = map_videos(product_id, &bundle.videos);
        let platform_ids = resolve_platforms(&bundle.platforms, game.id, store).await?;
        let (genre_ids, new_genres) = resolve_genres(&bundle.genres, store, now).await?;

        debug!(
            external_id = game.id,
            status = %status,
            images = images.len(),
            videos = videos.len(),
            platforms = platform_ids.len(),
            genres = genre_ids.len(),
            new_genres = new_genres.len(),
            "Mapped game to product"
        );

        Ok(ProductGraph {
            product,
            origin,
            images,
            videos,
            platform_ids,
            genre_ids,
            new_genres,
        })
    }

    fn map_images(
        &self,
        product_id: Uuid,
        cover: Option<&IgdbImage>,
        screenshots: &[IgdbImage],
    ) -> Vec<product_image::Model> {
        let mut images = Vec::with_capacity(screenshots.len() + 1);
        let mut position = 1;

        if let Some(cover) = cover
            && let Some(url) = self.image_source(cover, ImageSize::CoverBig)
        {
            images.push(product_image::Model {
                id: Uuid::new_v4(),
                product_id,
                kind: IMAGE_KIND_COVER.to_string(),
                external_image_id: cover.image_id.clone(),
                url,
                width: cover.width,
                height: cover.height,
                position,
                is_primary: true,
            });
            position += 1;
        }

        for screenshot in screenshots {
            let Some(url) = self.image_source(screenshot, ImageSize::ScreenshotBig) else {
                continue;
            };
            images.push(product_image::Model {
                id: Uuid::new_v4(),
                product_id,
                kind: IMAGE_KIND_SCREENSHOT.to_string(),
                external_image_id: screenshot.image_id.clone(),
                url,
                width: screenshot.width,
                height: screenshot.height,
                position,
                is_primary: false,
            });
            position += 1;
        }

        images
    }

    /// Sized CDN URL from the image id, or the raw URL when no id came back.
    fn image_source(&self, image: &IgdbImage, size: ImageSize) -> Option<String> {
        match image.image_id.as_deref().filter(|id| !id.is_empty()) {
            Some(image_id) => Some(image_url(&self.image_base, image_id, size)),
            None => image.url.as_deref().map(|url| {
                if url.starts_with("//") {
                    format!("https:{url}")
                } else {
                    url.to_string()
                }
            }),
        }
    }
}

fn map_videos(product_id: Uuid, videos: &[IgdbVideo]) -> Vec<product_video::Model> {
    videos
        .iter()
        .filter_map(|video| {
            video
                .video_id
                .as_deref()
                .filter(|id| !id.is_empty())
                .map(|video_id| (video, video_id))
        })
        .enumerate()
        .map(|(index, (video, video_id))| product_video::Model {
            id: Uuid::new_v4(),
            product_id,
            kind: VIDEO_KIND_TRAILER.to_string(),
            name: video.name.clone(),
            external_video_id: video_id.to_string(),
            url: youtube_watch_url(video_id),
            position: index as i32 + 1,
        })
        .collect()
}

async fn resolve_platforms(
    platforms: &[IgdbPlatform],
    game_id: i64,
    store: &dyn CatalogStore,
) -> Result<Vec<Uuid>, CatalogError> {
    let mut ids = Vec::with_capacity(platforms.len());
    for platform in platforms {
        match store.find_platform_by_external_id(platform.id).await? {
            Some(local) => {
                if !ids.contains(&local.id) {
                    ids.push(local.id);
                }
            }
            None => warn!(
                external_id = game_id,
                platform_external_id = platform.id,
                platform_name = platform.name.as_deref().unwrap_or("unknown"),
                "Skipping platform without a local row"
            ),
        }
    }
    Ok(ids)
}

async fn resolve_genres(
    genres: &[IgdbGenre],
    store: &dyn CatalogStore,
    now: DateTimeWithTimeZone,
) -> Result<(Vec<Uuid>, Vec<genre::Model>), CatalogError> {
    let mut ids = Vec::with_capacity(genres.len());
    let mut created: Vec<genre::Model> = Vec::new();

    for external in genres {
        if let Some(pending) = created
            .iter()
            .find(|genre| genre.external_id == Some(external.id))
        {
            if !ids.contains(&pending.id) {
                ids.push(pending.id);
            }
            continue;
        }

        match store.find_genre_by_external_id(external.id).await? {
            Some(local) => {
                if !ids.contains(&local.id) {
                    ids.push(local.id);
                }
            }
            None => {
                let genre = new_imported_genre(external, now);
                ids.push(genre.id);
                created.push(genre);
            }
        }
    }

    Ok((ids, created))
}

/// An unpersisted genre row tagged as imported.
pub fn new_imported_genre(external: &IgdbGenre, now: DateTimeWithTimeZone) -> genre::Model {
    let name = external
        .name
        .clone()
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| format!("Genre {}", external.id));
    let slug = external
        .slug
        .clone()
        .filter(|slug| !slug.is_empty())
        .unwrap_or_else(|| slugify(&name));

    genre::Model {
        id: Uuid::new_v4(),
        name,
        slug,
        external_id: Some(external.id),
        origin: GENRE_ORIGIN_IMPORTED.to_string(),
        created_at: now,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::igdb::types::{Expandable, IgdbExternalGame, IgdbWebsite};

    #[test]
    fn rating_is_rescaled_to_two_decimals() {
        assert_eq!(convert_rating(Some(97.5)), Some(9.75));
        assert_eq!(convert_rating(Some(86.6666)), Some(8.67));
        assert_eq!(convert_rating(Some(0.0)), Some(0.0));
        assert_eq!(convert_rating(None), None);
    }

    #[test]
    fn only_released_status_activates_sale() {
        assert_eq!(status_from_code(Some(0)), GameStatus::Released);
        assert!(status_from_code(Some(0)).activates_for_sale());

        let expected = [
            (2, GameStatus::Alpha),
            (3, GameStatus::Beta),
            (4, GameStatus::EarlyAccess),
            (6, GameStatus::Cancelled),
            (7, GameStatus::Discontinued),
            (8, GameStatus::Discontinued),
            (5, GameStatus::Upcoming),
            (42, GameStatus::Upcoming),
        ];
        for (code, status) in expected {
            assert_eq!(status_from_code(Some(code)), status);
            assert!(!status.activates_for_sale());
        }
        assert_eq!(status_from_code(None), GameStatus::Upcoming);
    }

    #[test]
    fn long_summary_is_cut_to_exactly_the_limit() {
        let summary = "a".repeat(600);
        let description = truncate_description(&summary, DESCRIPTION_MAX_CHARS);
        assert_eq!(description.chars().count(), 500);
        assert!(description.ends_with("..."));

        let short = "b".repeat(500);
        assert_eq!(truncate_description(&short, DESCRIPTION_MAX_CHARS), short);
    }

    #[test]
    fn truncation_counts_characters_not_bytes() {
        let summary = "ü".repeat(501);
        let description = truncate_description(&summary, DESCRIPTION_MAX_CHARS);
        assert_eq!(description.chars().count(), 500);
    }

    #[test]
    fn release_date_from_epoch_seconds() {
        assert_eq!(
            release_date_from_epoch(Some(1_431_993_600)),
            NaiveDate::from_ymd_opt(2015, 5, 19)
        );
        assert_eq!(release_date_from_epoch(None), None);
    }

    #[test]
    fn unmapped_categories_get_synthesized_labels() {
        assert_eq!(store_label(1), "Steam");
        assert_eq!(store_label(26), "Epic Games Store");
        assert_eq!(store_label(99), "Store 99");
        assert_eq!(website_label(1), "Official Site");
        assert_eq!(website_label(77), "Website 77");
    }

    #[test]
    fn external_links_merge_stores_and_websites() {
        let game = IgdbGame {
            id: 1,
            websites: vec![
                Expandable::Object(IgdbWebsite {
                    id: 10,
                    category: Some(1),
                    url: Some("https://thewitcher.com".to_string()),
                }),
                Expandable::Object(IgdbWebsite {
                    id: 11,
                    category: Some(13),
                    url: Some("https://store.steampowered.com/app/old".to_string()),
                }),
                Expandable::Id(12),
            ],
            external_games: vec![
                Expandable::Object(IgdbExternalGame {
                    id: 20,
                    category: Some(1),
                    url: Some("https://store.steampowered.com/app/292030".to_string()),
                    uid: Some("292030".to_string()),
                }),
                Expandable::Object(IgdbExternalGame {
                    id: 21,
                    category: Some(31),
                    url: Some("https://xbox.test/witcher".to_string()),
                    uid: None,
                }),
            ],
            ..Default::default()
        };

        let links = merge_external_links(&game);
        assert_eq!(links.len(), 3);
        assert_eq!(links["Official Site"], "https://thewitcher.com");
        assert_eq!(links["Steam"], "https://store.steampowered.com/app/292030");
        assert_eq!(links["Store 31"], "https://xbox.test/witcher");
    }

    #[test]
    fn slugify_collapses_separators() {
        assert_eq!(slugify("The Witcher 3: Wild Hunt"), "the-witcher-3-wild-hunt");
        assert_eq!(slugify("  Role-playing (RPG) "), "role-playing-rpg");
    }

    #[test]
    fn cover_is_primary_and_screenshots_follow() {
        let mapper = MetadataMapper::new("https://cdn.test");
        let product_id = Uuid::new_v4();
        let cover = IgdbImage {
            id: 1,
            image_id: Some("co1".to_string()),
            ..Default::default()
        };
        let screenshots: Vec<IgdbImage> = (0..12)
            .map(|index| IgdbImage {
                id: 100 + index,
                image_id: Some(format!("sc{index}")),
                ..Default::default()
            })
            .collect();

        let images = mapper.map_images(product_id, Some(&cover), &screenshots);

        assert_eq!(images.len(), 13);
        assert!(images[0].is_primary);
        assert_eq!(images[0].position, 1);
        assert_eq!(images[0].url, "https://cdn.test/t_cover_big/co1.jpg");
        assert!(images[1..].iter().all(|image| !image.is_primary));
        assert_eq!(images[12].position, 13);
        assert_eq!(images[12].url, "https://cdn.test/t_screenshot_big/sc11.jpg");
    }

    #[test]
    fn videos_are_trailers_with_watch_urls() {
        let videos = map_videos(
            Uuid::new_v4(),
            &[
                IgdbVideo {
                    id: 1,
                    video_id: Some("abc123".to_string()),
                    name: Some("Launch Trailer".to_string()),
                },
                IgdbVideo {
                    id: 2,
                    video_id: None,
                    name: None,
                },
            ],
        );

        assert_eq!(videos.len(), 1);
        assert_eq!(videos[0].kind, "trailer");
        assert_eq!(videos[0].url, "https://www.youtube.com/watch?v=abc123");
        assert_eq!(videos[0].position, 1);
    }
}
