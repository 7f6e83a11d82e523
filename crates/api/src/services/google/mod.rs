//! Google Calendar, Gmail and Drive REST clients.
//!
//! All calls act on behalf of one office user, authorized with the access
//! token stored for that user. Base URLs come from configuration so the
//! clients can be pointed at a mock server.

pub mod calendar;
pub mod drive;
pub mod gmail;

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use domain::models::google::{token_cache_key, GoogleToken};
use persistence::repositories::KvCacheRepository;
use persistence::SqlitePool;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::GoogleConfig;

pub use calendar::CalendarApi;
pub use drive::DriveApi;
pub use gmail::GmailApi;

/// Errors raised by the provider clients.
#[derive(Debug, Error)]
pub enum GoogleApiError {
    #[error("Google account is not connected")]
    NotConnected,

    #[error("Google rejected the access token")]
    TokenRejected,

    #[error("Google resource not found: {0}")]
    NotFound(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Google API returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Invalid response from Google: {0}")]
    InvalidResponse(String),

    #[error("Token store error: {0}")]
    Store(#[from] sqlx::Error),
}

/// Per-user access tokens kept in the key-value cache.
#[derive(Clone)]
pub struct TokenStore {
    cache: KvCacheRepository,
}

impl TokenStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            cache: KvCacheRepository::new(pool),
        }
    }

    /// The user's live token.
    pub async fn get(&self, user_id: i64, now: DateTime<Utc>) -> Result<GoogleToken, GoogleApiError> {
        let raw = self
            .cache
            .get(&token_cache_key(user_id), now)
            .await?
            .ok_or(GoogleApiError::NotConnected)?;

        let token: GoogleToken = serde_json::from_str(&raw).map_err(|e| {
            warn!(user_id, error = %e, "Discarding unreadable stored token");
            GoogleApiError::NotConnected
        })?;

        if token.is_expired(now) {
            return Err(GoogleApiError::NotConnected);
        }
        Ok(token)
    }

    pub async fn put(
        &self,
        user_id: i64,
        token: &GoogleToken,
        now: DateTime<Utc>,
    ) -> Result<(), GoogleApiError> {
        let value = serde_json::to_string(token)
            .map_err(|e| GoogleApiError::InvalidRequest(e.to_string()))?;
        self.cache
            .put(&token_cache_key(user_id), &value, token.expires_at, now)
            .await?;
        Ok(())
    }

    /// Returns false when no token was stored.
    pub async fn remove(&self, user_id: i64) -> Result<bool, GoogleApiError> {
        Ok(self.cache.delete(&token_cache_key(user_id)).await?)
    }
}

/// Shared HTTP client and settings for all provider APIs.
#[derive(Clone)]
pub struct GoogleClient {
    http: Client,
    config: Arc<GoogleConfig>,
    tokens: TokenStore,
}

impl GoogleClient {
    pub fn new(config: GoogleConfig, pool: SqlitePool) -> Result<Self, GoogleApiError> {
        let http = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()?;

        Ok(Self {
            http,
            config: Arc::new(config),
            tokens: TokenStore::new(pool),
        })
    }

    pub fn config(&self) -> &GoogleConfig {
        &self.config
    }

    pub fn tokens(&self) -> &TokenStore {
        &self.tokens
    }

    async fn session(&self, user_id: i64) -> Result<Session, GoogleApiError> {
        let token = self.tokens.get(user_id, Utc::now()).await?;
        Ok(Session {
            http: self.http.clone(),
            access_token: token.access_token,
            user_id,
        })
    }

    /// Calendar API bound to the user's token.
    pub async fn calendar(&self, user_id: i64) -> Result<CalendarApi, GoogleApiError> {
        Ok(CalendarApi::new(
            self.session(user_id).await?,
            &self.config.calendar_base_url,
            &self.config.calendar_id,
        ))
    }

    /// Gmail API bound to the user's token.
    pub async fn gmail(&self, user_id: i64) -> Result<GmailApi, GoogleApiError> {
        Ok(GmailApi::new(
            self.session(user_id).await?,
            &self.config.gmail_base_url,
        ))
    }

    /// Drive API bound to the user's token.
    pub async fn drive(&self, user_id: i64) -> Result<DriveApi, GoogleApiError> {
        Ok(DriveApi::new(
            self.session(user_id).await?,
            &self.config.drive_base_url,
            &self.config.drive_upload_url,
        ))
    }
}

/// An authorized connection for one user.
#[derive(Clone)]
pub(crate) struct Session {
    http: Client,
    access_token: String,
    user_id: i64,
}

impl Session {
    pub(crate) fn request(&self, method: Method, url: Url) -> RequestBuilder {
        debug!(user_id = self.user_id, %method, path = url.path(), "Google API call");
        self.http
            .request(method, url)
            .bearer_auth(&self.access_token)
    }

    /// Sends and decodes a JSON response.
    pub(crate) async fn json<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
    ) -> Result<T, GoogleApiError> {
        let response = check(request.send().await?).await?;
        response
            .json::<T>()
            .await
            .map_err(|e| GoogleApiError::InvalidResponse(e.to_string()))
    }

    /// Sends a request whose response body is not needed.
    pub(crate) async fn empty(&self, request: RequestBuilder) -> Result<(), GoogleApiError> {
        check(request.send().await?).await.map(|_| ())
    }

    pub(crate) async fn bytes(&self, request: RequestBuilder) -> Result<Vec<u8>, GoogleApiError> {
        let response = check(request.send().await?).await?;
        Ok(response.bytes().await?.to_vec())
    }
}

/// Maps provider status codes onto [`GoogleApiError`].
async fn check(response: Response) -> Result<Response, GoogleApiError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let path = response.url().path().to_string();
    let body = response.text().await.unwrap_or_default();
    match status {
        StatusCode::UNAUTHORIZED => Err(GoogleApiError::TokenRejected),
        StatusCode::NOT_FOUND | StatusCode::GONE => Err(GoogleApiError::NotFound(path)),
        StatusCode::BAD_REQUEST => Err(GoogleApiError::InvalidRequest(body)),
        _ => Err(GoogleApiError::Status {
            status: status.as_u16(),
            body,
        }),
    }
}

/// Joins path segments onto a base URL, escaping each segment.
pub(crate) fn endpoint(base: &str, segments: &[&str]) -> Result<Url, GoogleApiError> {
    let mut url = Url::parse(base)
        .map_err(|e| GoogleApiError::InvalidRequest(format!("bad base URL {}: {}", base, e)))?;
    url.path_segments_mut()
        .map_err(|_| GoogleApiError::InvalidRequest(format!("bad base URL {}", base)))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration as ChronoDuration;

    #[test]
    fn test_endpoint_escapes_segments() {
        let url = endpoint(
            "https://www.googleapis.com/calendar/v3/",
            &["calendars", "office@example.com", "events", "a b"],
        )
        .unwrap();
        assert_eq!(
            url.as_str(),
            "https://www.googleapis.com/calendar/v3/calendars/office@example.com/events/a%20b"
        );
    }

    #[test]
    fn test_endpoint_rejects_bad_base() {
        assert!(endpoint("not a url", &["x"]).is_err());
    }

    #[tokio::test]
    async fn test_token_store_round_trip() {
        let pool = persistence::db::create_memory_pool().await.unwrap();
        let store = TokenStore::new(pool);
        let now = Utc::now();

        assert!(matches!(
            store.get(3, now).await,
            Err(GoogleApiError::NotConnected)
        ));

        let token = GoogleToken {
            access_token: "ya29.test".into(),
            expires_at: Some(now + ChronoDuration::hours(1)),
        };
        store.put(3, &token, now).await.unwrap();
        assert_eq!(store.get(3, now).await.unwrap(), token);

        assert!(matches!(
            store.get(3, now + ChronoDuration::hours(2)).await,
            Err(GoogleApiError::NotConnected)
        ));

        assert!(store.remove(3).await.unwrap());
        assert!(!store.remove(3).await.unwrap());
    }
}
