//! IBM Cloud IAM authentication
//!
//! Exchanges an API key for a bearer token at the IAM token endpoint and
//! caches the token until shortly before it expires. A fixed token can be
//! supplied instead, which skips the exchange entirely.

use super::http::{IbmHttpClient, RemoteError};
use serde::Deserialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

/// Default IAM endpoint
pub const DEFAULT_IAM_URL: &str = "https://iam.cloud.ibm.com";

/// Grant type for API key exchange
const APIKEY_GRANT_TYPE: &str = "urn:ibm:params:oauth:grant-type:apikey";

/// Token expiry buffer - refresh tokens this much before they actually expire
const TOKEN_EXPIRY_BUFFER: Duration = Duration::from_secs(60);

/// Used when IAM does not report `expires_in`
const DEFAULT_TOKEN_TTL: Duration = Duration::from_secs(60 * 60);

/// Where bearer tokens come from
#[derive(Clone)]
pub enum TokenSource {
    /// Exchange an API key at `{iam_url}/identity/token`
    ApiKey { api_key: String, iam_url: String },
    /// Use a pre-issued bearer token as-is
    Static(String),
}

impl std::fmt::Debug for TokenSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Never print credentials
        match self {
            TokenSource::ApiKey { iam_url, .. } => f
                .debug_struct("ApiKey")
                .field("iam_url", iam_url)
                .finish_non_exhaustive(),
            TokenSource::Static(_) => f.write_str("Static(..)"),
        }
    }
}

#[derive(Deserialize)]
struct IamTokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<u64>,
}

#[derive(Clone)]
struct CachedToken {
    token: String,
    /// When this token expires (with buffer applied)
    expires_at: Instant,
}

impl CachedToken {
    fn is_valid(&self) -> bool {
        Instant::now() < self.expires_at
    }
}

/// IAM credentials holder with token caching
#[derive(Clone)]
pub struct IamCredentials {
    source: Arc<TokenSource>,
    http: IbmHttpClient,
    token_cache: Arc<RwLock<Option<CachedToken>>>,
}

impl IamCredentials {
    pub fn new(source: TokenSource, http: IbmHttpClient) -> Self {
        Self {
            source: Arc::new(source),
            http,
            token_cache: Arc::new(RwLock::new(None)),
        }
    }

    /// Get an access token for API calls
    pub async fn get_token(&self) -> Result<String, RemoteError> {
        let (api_key, iam_url) = match self.source.as_ref() {
            TokenSource::Static(token) => return Ok(token.clone()),
            TokenSource::ApiKey { api_key, iam_url } => (api_key, iam_url),
        };

        {
            let cache = self.token_cache.read().await;
            if let Some(cached) = cache.as_ref() {
                if cached.is_valid() {
                    return Ok(cached.token.clone());
                }
                tracing::debug!("Cached IAM token expired, fetching new token");
            }
        }

        let url = format!("{}/identity/token", iam_url.trim_end_matches('/'));
        let response: IamTokenResponse = self
            .http
            .post_form(
                &url,
                &[("grant_type", APIKEY_GRANT_TYPE), ("apikey", api_key.as_str())],
            )
            .await
            .map_err(|err| match err {
                RemoteError::Status { status, message } => {
                    RemoteError::Auth(format!("IAM token exchange failed ({}): {}", status, message))
                }
                other => other,
            })?;

        let ttl = response
            .expires_in
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_TOKEN_TTL);
        let expires_at = Instant::now() + ttl.saturating_sub(TOKEN_EXPIRY_BUFFER);

        {
            let mut cache = self.token_cache.write().await;
            *cache = Some(CachedToken {
                token: response.access_token.clone(),
                expires_at,
            });
        }

        tracing::debug!(
            "New IAM token cached, expires in ~{} minutes",
            ttl.saturating_sub(TOKEN_EXPIRY_BUFFER).as_secs() / 60
        );

        Ok(response.access_token)
    }

    /// Whether a new token can be obtained (false for a fixed token)
    pub fn can_refresh(&self) -> bool {
        matches!(self.source.as_ref(), TokenSource::ApiKey { .. })
    }

    /// Drop the cached token and exchange the API key again
    pub async fn refresh_token(&self) -> Result<String, RemoteError> {
        {
            let mut cache = self.token_cache.write().await;
            *cache = None;
        }

        self.get_token().await
    }
}

/// Read an API key from the environment
/// Checks the provider's variable names in order of precedence
pub fn get_default_api_key() -> Option<String> {
    ["IC_API_KEY", "IBMCLOUD_API_KEY"]
        .iter()
        .filter_map(|name| std::env::var(name).ok())
        .map(|key| key.trim().to_string())
        .find(|key| !key.is_empty())
}

/// Read a pre-issued bearer token from the environment
pub fn get_default_iam_token() -> Option<String> {
    std::env::var("IC_IAM_TOKEN")
        .ok()
        .map(|token| token.trim().trim_start_matches("Bearer ").to_string())
        .filter(|token| !token.is_empty())
}
