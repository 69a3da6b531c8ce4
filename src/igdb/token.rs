//! OAuth2 client-credentials token cache for the game database.
//!
//! One [`TokenManager`] owns the cached token. The cache lock is held across
//! check-and-refresh, so concurrent callers trigger at most one token request.

use chrono::{DateTime, Duration, Utc};
use metrics::counter;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

use crate::config::IgdbConfig;
use crate::error::CatalogError;
use crate::igdb::types::TokenResponse;

/// A token is reused only while it stays valid for at least this long.
pub const REFRESH_MARGIN_SECONDS: i64 = 5 * 60;

const MAX_TOKEN_LIFETIME_SECONDS: u64 = 365 * 24 * 60 * 60;

#[derive(Clone)]
pub struct CachedToken {
    pub access_token: String,
    pub expires_at: DateTime<Utc>,
}

impl CachedToken {
    pub fn is_usable_at(&self, now: DateTime<Utc>) -> bool {
        now + Duration::seconds(REFRESH_MARGIN_SECONDS) < self.expires_at
    }
}

impl std::fmt::Debug for CachedToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CachedToken")
            .field("access_token", &"[REDACTED]")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

#[derive(Clone)]
struct Credentials {
    client_id: String,
    client_secret: String,
}

pub struct TokenManager {
    http: reqwest::Client,
    auth_url: String,
    credentials: Option<Credentials>,
    cache: Mutex<Option<CachedToken>>,
}

impl TokenManager {
    pub fn new(config: &IgdbConfig, http: reqwest::Client) -> Self {
        let credentials = config.credentials().map(|(id, secret)| Credentials {
            client_id: id.to_string(),
            client_secret: secret.to_string(),
        });

        Self {
            http,
            auth_url: config.auth_url.clone(),
            credentials,
            cache: Mutex::new(None),
        }
    }

    pub fn has_credentials(&self) -> bool {
        self.credentials.is_some()
    }

    /// Client id sent alongside the bearer token on every query.
    pub fn client_id(&self) -> Result<&str, CatalogError> {
        self.credentials
            .as_ref()
            .map(|credentials| credentials.client_id.as_str())
            .ok_or(CatalogError::AuthConfiguration)
    }

    /// Returns the cached token, requesting a new one when it is missing or
    /// within the refresh margin of its expiry.
    pub async fn access_token(&self) -> Result<String, CatalogError> {
        let credentials = self
            .credentials
            .as_ref()
            .ok_or(CatalogError::AuthConfiguration)?;

        let mut cache = self.cache.lock().await;
        if let Some(token) = cache.as_ref()
            && token.is_usable_at(Utc::now())
        {
            return Ok(token.access_token.clone());
        }

        debug!("Cached access token missing or about to expire");
        let token = self.request_token(credentials).await?;
        let access_token = token.access_token.clone();
        *cache = Some(token);
        Ok(access_token)
    }

    /// Requests a new token regardless of the cached one.
    pub async fn force_refresh(&self) -> Result<String, CatalogError> {
        let credentials = self
            .credentials
            .as_ref()
            .ok_or(CatalogError::AuthConfiguration)?;

        let mut cache = self.cache.lock().await;
        let token = self.request_token(credentials).await?;
        let access_token = token.access_token.clone();
        *cache = Some(token);
        Ok(access_token)
    }

    /// Drops the cached token; the next call to [`Self::access_token`] requests a new one.
    pub async fn clear_cache(&self) {
        self.cache.lock().await.take();
    }

    /// Expiry of the cached token, if any.
    pub async fn cached_expiry(&self) -> Option<DateTime<Utc>> {
        self.cache.lock().await.as_ref().map(|token| token.expires_at)
    }

    #[instrument(skip_all)]
    async fn request_token(&self, credentials: &Credentials) -> Result<CachedToken, CatalogError> {
        let response = self
            .http
            .post(&self.auth_url)
            .query(&[
                ("client_id", credentials.client_id.as_str()),
                ("client_secret", credentials.client_secret.as_str()),
                ("grant_type", "client_credentials"),
            ])
            .send()
            .await
            .map_err(|err| {
                // The request url carries the client secret.
                let err = err.without_url();
                counter!("igdb_token_refresh_total", "outcome" => "error").increment(1);
                warn!(error = %err, "Token endpoint unreachable");
                CatalogError::AuthenticationFailed {
                    source: Box::new(err),
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            counter!("igdb_token_refresh_total", "outcome" => "rejected").increment(1);
            let body = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), "Token endpoint rejected the request");
            return Err(CatalogError::AuthenticationFailed {
                source: format!("token endpoint returned {status}: {body}").into(),
            });
        }

        let payload: TokenResponse =
            response
                .json()
                .await
                .map_err(|err| CatalogError::AuthenticationFailed {
                    source: Box::new(err.without_url()),
                })?;

        counter!("igdb_token_refresh_total", "outcome" => "success").increment(1);
        let expires_in = payload.expires_in.min(MAX_TOKEN_LIFETIME_SECONDS) as i64;
        let expires_at = Utc::now() + Duration::seconds(expires_in);
        info!(%expires_at, "Obtained game database access token");

        Ok(CachedToken {
            access_token: payload.access_token,
            expires_at,
        })
    }
}
