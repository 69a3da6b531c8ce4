//! HTTP client for the game database query endpoints.

use std::sync::Arc;

use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{debug, instrument, warn};

use crate::config::IgdbConfig;
use crate::error::CatalogError;
use crate::igdb::query::{MAX_LIMIT, Query, SortOrder};
use crate::igdb::token::TokenManager;
use crate::igdb::types::{
    Expandable, GameBundle, IgdbGame, IgdbGenre, IgdbImage, IgdbPlatform, IgdbVideo,
    merge_resolved, unresolved_ids,
};

pub const GAMES_ENDPOINT: &str = "games";
pub const COVERS_ENDPOINT: &str = "covers";
pub const SCREENSHOTS_ENDPOINT: &str = "screenshots";
pub const VIDEOS_ENDPOINT: &str = "game_videos";
pub const PLATFORMS_ENDPOINT: &str = "platforms";
pub const GENRES_ENDPOINT: &str = "genres";

/// Projection used when a game is fetched for import or sync. Media and
/// reference sub-resources come back as ids and are resolved separately.
const GAME_DETAIL_FIELDS: &str = "id,name,slug,summary,storyline,first_release_date,rating,\
    total_rating,total_rating_count,status,cover,screenshots,videos,platforms,genres,\
    external_games.category,external_games.url,external_games.uid,\
    websites.category,websites.url";

/// Projection used for import candidates.
const GAME_LISTING_FIELDS: &str =
    "id,name,slug,summary,first_release_date,rating,total_rating,total_rating_count,status,\
    cover.image_id";

const IMAGE_FIELDS: &str = "id,image_id,url,width,height";
const VIDEO_FIELDS: &str = "id,video_id,name";
const PLATFORM_FIELDS: &str = "id,name,slug,abbreviation";
const GENRE_FIELDS: &str = "id,name,slug";

/// Client for the game database API.
#[derive(Clone)]
pub struct IgdbClient {
    http: Client,
    api_base: String,
    tokens: Arc<TokenManager>,
}

impl IgdbClient {
    /// Builds the client and its token manager from configuration; both share
    /// one HTTP client carrying the configured timeout.
    pub fn new(config: &IgdbConfig) -> Result<Self, CatalogError> {
        let http = Client::builder()
            .timeout(config.timeout())
            .user_agent(concat!("catalog-sync/", env!("CARGO_PKG_VERSION")))
            .build()?;
        let tokens = Arc::new(TokenManager::new(config, http.clone()));

        Ok(Self {
            http,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            tokens,
        })
    }

    pub fn tokens(&self) -> &TokenManager {
        &self.tokens
    }

    pub fn has_credentials(&self) -> bool {
        self.tokens.has_credentials()
    }

    /// Sends `query` to `{api_base}/{endpoint}` and decodes the JSON array response.
    #[instrument(skip(self, query), fields(endpoint = %endpoint))]
    pub async fn execute_query<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        query: &str,
    ) -> Result<Vec<T>, CatalogError> {
        let client_id = self.tokens.client_id()?;
        let token = self.tokens.access_token().await?;

        let response = self
            .http
            .post(format!("{}/{}", self.api_base, endpoint))
            .header("Client-ID", client_id)
            .header("Authorization", format!("Bearer {token}"))
            .header("Content-Type", "text/plain")
            .header("Accept", "application/json")
            .body(query.to_string())
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            if status == StatusCode::UNAUTHORIZED {
                // The cached token was revoked; the next call requests a new one.
                self.tokens.clear_cache().await;
            }
            let body = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), "Game database query failed");
            return Err(CatalogError::external(
                Some(status.as_u16()),
                snippet(&body),
            ));
        }

        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|err| {
            CatalogError::external(
                Some(status.as_u16()),
                format!("unexpected response payload: {err}"),
            )
        })
    }

    /// Fetches one game, `None` when the id is unknown.
    pub async fn get_game_by_id(&self, id: i64) -> Result<Option<IgdbGame>, CatalogError> {
        let query = Query::new()
            .fields(GAME_DETAIL_FIELDS)
            .filter(format!("id = {id}"))
            .limit(1)
            .build();
        let games: Vec<IgdbGame> = self.execute_query(GAMES_ENDPOINT, &query).await?;
        Ok(games.into_iter().next())
    }

    pub async fn search_games_by_name(
        &self,
        name: &str,
        page: u32,
        limit: u32,
    ) -> Result<Vec<IgdbGame>, CatalogError> {
        let query = Query::new()
            .fields(GAME_LISTING_FIELDS)
            .search(name)
            .page(page, limit)
            .build();
        self.execute_query(GAMES_ENDPOINT, &query).await
    }

    /// Games ordered by number of ratings, most rated first.
    pub async fn get_popular_games(
        &self,
        page: u32,
        limit: u32,
    ) -> Result<Vec<IgdbGame>, CatalogError> {
        let query = Query::new()
            .fields(GAME_LISTING_FIELDS)
            .filter("total_rating_count != null")
            .sort("total_rating_count", SortOrder::Desc)
            .page(page, limit)
            .build();
        self.execute_query(GAMES_ENDPOINT, &query).await
    }

    pub async fn get_covers_by_ids(&self, ids: &[i64]) -> Result<Vec<IgdbImage>, CatalogError> {
        self.get_by_ids(COVERS_ENDPOINT, IMAGE_FIELDS, ids).await
    }

    pub async fn get_screenshots_by_ids(
        &self,
        ids: &[i64],
    ) -> Result<Vec<IgdbImage>, CatalogError> {
        self.get_by_ids(SCREENSHOTS_ENDPOINT, IMAGE_FIELDS, ids).await
    }

    pub async fn get_videos_by_ids(&self, ids: &[i64]) -> Result<Vec<IgdbVideo>, CatalogError> {
        self.get_by_ids(VIDEOS_ENDPOINT, VIDEO_FIELDS, ids).await
    }

    pub async fn get_platforms_by_ids(
        &self,
        ids: &[i64],
    ) -> Result<Vec<IgdbPlatform>, CatalogError> {
        self.get_by_ids(PLATFORMS_ENDPOINT, PLATFORM_FIELDS, ids).await
    }

    pub async fn get_genres_by_ids(&self, ids: &[i64]) -> Result<Vec<IgdbGenre>, CatalogError> {
        self.get_by_ids(GENRES_ENDPOINT, GENRE_FIELDS, ids).await
    }

    /// Every genre the game database knows (a few dozen), ordered by id.
    pub async fn get_all_genres(&self) -> Result<Vec<IgdbGenre>, CatalogError> {
        let query = Query::new()
            .fields(GENRE_FIELDS)
            .sort("id", SortOrder::Asc)
            .limit(MAX_LIMIT)
            .build();
        self.execute_query(GENRES_ENDPOINT, &query).await
    }

    /// Runs a one-row query; never returns an error.
    pub async fn is_api_available(&self) -> bool {
        let query = Query::new().fields("id").limit(1).build();
        match self
            .execute_query::<serde_json::Value>(GAMES_ENDPOINT, &query)
            .await
        {
            Ok(_) => true,
            Err(err) => {
                warn!(error = %err, "Game database availability probe failed");
                false
            }
        }
    }

    /// Resolves every id-only sub-resource of `game` so the mapper only sees
    /// full records.
    #[instrument(skip_all, fields(external_id = game.id))]
    pub async fn fetch_game_bundle(&self, mut game: IgdbGame) -> Result<GameBundle, CatalogError> {
        let cover = match game.cover.take() {
            Some(Expandable::Object(cover)) => Some(cover),
            Some(Expandable::Id(id)) => self.get_covers_by_ids(&[id]).await?.into_iter().next(),
            None => None,
        };

        let fetched = self
            .get_screenshots_by_ids(&unresolved_ids(&game.screenshots))
            .await?;
        let screenshots = merge_resolved(std::mem::take(&mut game.screenshots), fetched);

        let fetched = self
            .get_videos_by_ids(&unresolved_ids(&game.videos))
            .await?;
        let videos = merge_resolved(std::mem::take(&mut game.videos), fetched);

        let fetched = self
            .get_platforms_by_ids(&unresolved_ids(&game.platforms))
            .await?;
        let platforms = merge_resolved(std::mem::take(&mut game.platforms), fetched);

        let fetched = self
            .get_genres_by_ids(&unresolved_ids(&game.genres))
            .await?;
        let genres = merge_resolved(std::mem::take(&mut game.genres), fetched);

        debug!(
            screenshots = screenshots.len(),
            videos = videos.len(),
            platforms = platforms.len(),
            genres = genres.len(),
            "Resolved game sub-resources"
        );

        Ok(GameBundle {
            game,
            cover,
            screenshots,
            videos,
            platforms,
            genres,
        })
    }

    async fn get_by_ids<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        fields: &str,
        ids: &[i64],
    ) -> Result<Vec<T>, CatalogError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut records = Vec::with_capacity(ids.len());
        for chunk in ids.chunks(MAX_LIMIT as usize) {
            let query = Query::new()
                .fields(fields)
                .ids(chunk)
                .limit(chunk.len() as u32)
                .build();
            records.extend(self.execute_query::<T>(endpoint, &query).await?);
        }
        Ok(records)
    }
}

fn snippet(body: &str) -> String {
    const MAX_CHARS: usize = 200;
    if body.chars().count() > MAX_CHARS {
        let truncated: String = body.chars().take(MAX_CHARS).collect();
        format!("{truncated}...")
    } else {
        body.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snippet_truncates_on_char_boundaries() {
        let body = "é".repeat(300);
        let cut = snippet(&body);
        assert_eq!(cut.chars().count(), 203);
        assert!(cut.ends_with("..."));
        assert_eq!(snippet("short"), "short");
    }

    #[tokio::test]
    async fn id_lookups_short_circuit_without_credentials() {
        let client = IgdbClient::new(&IgdbConfig::default()).unwrap();

        assert!(client.get_platforms_by_ids(&[]).await.unwrap().is_empty());
        assert!(client.get_genres_by_ids(&[]).await.unwrap().is_empty());
        assert!(matches!(
            client.get_genres_by_ids(&[12]).await,
            Err(CatalogError::AuthConfiguration)
        ));
        assert!(!client.is_api_available().await);
    }
}
