//! Configuration Management
//!
//! Handles persistent configuration storage for tfibm and the precedence
//! rules between command-line flags, environment variables and the file.

use crate::ibm::auth::{self, TokenSource, DEFAULT_IAM_URL};
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_REGION: &str = "us-south";

const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// User configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Region used to build service endpoints
    #[serde(default)]
    pub region: Option<String>,
    /// IAM API key
    #[serde(default)]
    pub api_key: Option<String>,
    /// IAM endpoint override
    #[serde(default)]
    pub iam_url: Option<String>,
    /// VPC API endpoint override (e.g. a private endpoint)
    #[serde(default)]
    pub vpc_endpoint: Option<String>,
    /// Event Notifications endpoint override
    #[serde(default)]
    pub en_endpoint: Option<String>,
    /// Per-request timeout in seconds
    #[serde(default)]
    pub timeout_secs: Option<u64>,
    /// Pre-issued bearer token, never written to disk
    #[serde(skip)]
    pub iam_token: Option<String>,
}

/// Settings layered over the config file.
///
/// The environment is applied first and command-line flags last, so flags
/// beat the environment and the environment beats the file.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub region: Option<String>,
    pub api_key: Option<String>,
    pub iam_token: Option<String>,
    pub timeout_secs: Option<u64>,
}

impl Overrides {
    /// Read `IC_REGION`/`IBMCLOUD_REGION`, `IC_API_KEY`/`IBMCLOUD_API_KEY`
    /// and `IC_IAM_TOKEN`
    pub fn from_env() -> Self {
        Self {
            region: get_default_region(),
            api_key: auth::get_default_api_key(),
            iam_token: auth::get_default_iam_token(),
            timeout_secs: None,
        }
    }
}

/// Service endpoints resolved for one region
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    pub vpc: String,
    pub event_notifications: String,
}

impl Config {
    /// Get the config file path
    fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("tfibm").join("config.json"))
    }

    /// Load configuration from disk
    pub fn load() -> Self {
        let Some(path) = Self::config_path() else {
            return Self::default();
        };

        if !path.exists() {
            return Self::default();
        }

        match std::fs::read_to_string(&path) {
            Ok(content) => Self::parse(&content).unwrap_or_else(|e| {
                tracing::warn!("Ignoring unreadable config {:?}: {}", path, e);
                Self::default()
            }),
            Err(_) => Self::default(),
        }
    }

    /// Parse the config file, dropping a malformed region
    fn parse(content: &str) -> serde_json::Result<Self> {
        let mut config: Self = serde_json::from_str(content)?;
        if let Some(region) = config.region.take() {
            if validate_region(&region) {
                config.region = Some(region);
            } else {
                tracing::warn!("Invalid region format in config file");
            }
        }
        Ok(config)
    }

    /// Layer overrides on top of the current values
    pub fn apply(&mut self, overrides: Overrides) {
        if overrides.region.is_some() {
            self.region = overrides.region;
        }
        if overrides.api_key.is_some() {
            self.api_key = overrides.api_key;
        }
        if overrides.iam_token.is_some() {
            self.iam_token = overrides.iam_token;
        }
        if overrides.timeout_secs.is_some() {
            self.timeout_secs = overrides.timeout_secs;
        }
    }

    /// Save configuration to disk
    pub fn save(&self) -> Result<()> {
        let Some(path) = Self::config_path() else {
            return Ok(());
        };

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(&path, content)?;

        Ok(())
    }

    /// Get effective region
    pub fn effective_region(&self) -> String {
        self.region
            .clone()
            .unwrap_or_else(|| DEFAULT_REGION.to_string())
    }

    /// Get effective request timeout
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS))
    }

    /// Service endpoints for the effective region, honouring overrides
    pub fn endpoints(&self) -> Endpoints {
        let region = self.effective_region();
        Endpoints {
            vpc: self
                .vpc_endpoint
                .clone()
                .unwrap_or_else(|| format!("https://{}.iaas.cloud.ibm.com", region)),
            event_notifications: self.en_endpoint.clone().unwrap_or_else(|| {
                format!(
                    "https://{}.event-notifications.cloud.ibm.com/event-notifications",
                    region
                )
            }),
        }
    }

    /// Work out how to authenticate (static token > API key)
    pub fn token_source(&self) -> Result<TokenSource> {
        if let Some(token) = self.iam_token.clone() {
            return Ok(TokenSource::Static(token));
        }

        let api_key = self.api_key.clone().ok_or_else(|| {
            anyhow::anyhow!("No IBM Cloud API key configured. Set IC_API_KEY or use --api-key")
        })?;

        Ok(TokenSource::ApiKey {
            api_key,
            iam_url: self
                .iam_url
                .clone()
                .unwrap_or_else(|| DEFAULT_IAM_URL.to_string()),
        })
    }

    /// Set region and save
    pub fn set_region(&mut self, region: &str) -> Result<()> {
        if !validate_region(region) {
            anyhow::bail!("Invalid region name: {}", region);
        }
        self.region = Some(region.to_string());
        self.save()
    }
}

/// Validate an IBM Cloud region name such as `us-south` or `eu-de`
/// Lowercase letters separated by single hyphens
pub fn validate_region(region: &str) -> bool {
    if region.is_empty() || region.len() > 32 {
        return false;
    }
    region
        .split('-')
        .all(|part| !part.is_empty() && part.chars().all(|c| c.is_ascii_lowercase()))
}

/// Read the region from the environment
fn get_default_region() -> Option<String> {
    for name in ["IC_REGION", "IBMCLOUD_REGION"] {
        if let Ok(region) = std::env::var(name) {
            if validate_region(&region) {
                return Some(region);
            }
            tracing::warn!("Invalid region format in {}", name);
        }
    }
    None
}
