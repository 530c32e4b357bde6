//! IBM Cloud Client
//!
//! Session handle shared by every data source: credentials, HTTP client and
//! the resolved service endpoints. It is passed explicitly to whatever needs
//! it; there is no global session.

use super::auth::IamCredentials;
use super::http::{IbmHttpClient, RemoteError};
use crate::config::{Config, Endpoints};
use anyhow::{Context, Result};
use serde::de::DeserializeOwned;

/// VPC API version date sent with every VPC request
pub const VPC_API_VERSION: &str = "2024-11-12";

/// VPC API generation (2 = VPC infrastructure)
const VPC_GENERATION: &str = "2";

/// Main IBM Cloud client
#[derive(Clone)]
pub struct IbmClient {
    pub credentials: IamCredentials,
    pub http: IbmHttpClient,
    pub region: String,
    pub endpoints: Endpoints,
}

impl IbmClient {
    /// Create a new client from configuration
    pub fn new(config: &Config) -> Result<Self> {
        let http = IbmHttpClient::new(config.timeout())?;
        let source = config
            .token_source()
            .context("Failed to initialize IBM Cloud credentials")?;

        Ok(Self {
            credentials: IamCredentials::new(source, http.clone()),
            http,
            region: config.effective_region(),
            endpoints: config.endpoints(),
        })
    }

    /// Get the current access token
    pub async fn get_token(&self) -> Result<String, RemoteError> {
        self.credentials.get_token().await
    }

    /// Make an authenticated GET request
    ///
    /// A 401 with an exchanged token is retried once with a fresh token.
    pub async fn get<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, String)],
    ) -> Result<T, RemoteError> {
        let token = self.get_token().await?;
        match self.http.get_json(url, query, &token).await {
            Err(err) if err.status() == Some(401) && self.credentials.can_refresh() => {
                tracing::debug!("Token rejected for {}, refreshing", url);
                let token = self.credentials.refresh_token().await?;
                self.http.get_json(url, query, &token).await
            }
            result => result,
        }
    }

    // =========================================================================
    // VPC API helpers
    // =========================================================================

    /// Build VPC API URL
    pub fn vpc_url(&self, path: &str) -> String {
        format!("{}/v1/{}", self.endpoints.vpc.trim_end_matches('/'), path)
    }

    /// GET against the VPC API, adding the version and generation parameters
    pub async fn vpc_get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, RemoteError> {
        let mut params = vec![
            ("version", VPC_API_VERSION.to_string()),
            ("generation", VPC_GENERATION.to_string()),
        ];
        params.extend(query.iter().cloned());
        self.get(&self.vpc_url(path), &params).await
    }

    // =========================================================================
    // Event Notifications API helpers
    // =========================================================================

    /// Build Event Notifications API URL
    pub fn en_url(&self, path: &str) -> String {
        format!(
            "{}/v1/{}",
            self.endpoints.event_notifications.trim_end_matches('/'),
            path
        )
    }

    /// Build URL scoped to one Event Notifications instance
    pub fn en_instance_url(&self, instance_id: &str, resource: &str) -> String {
        self.en_url(&format!(
            "instances/{}/{}",
            urlencoding::encode(instance_id),
            resource
        ))
    }
}
