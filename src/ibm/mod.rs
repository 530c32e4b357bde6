//! IBM Cloud API interaction module
//!
//! # Module Structure
//!
//! - [`auth`] - IAM API key exchange and token caching
//! - [`client`] - Session handle used for every API request
//! - [`http`] - HTTP utilities and the [`http::RemoteError`] type
//! - [`vpc`] - VPC API records and paginated collections
//! - [`event_notifications`] - Event Notifications records and collections
//!
//! # Example
//!
//! ```ignore
//! use tfibm::config::Config;
//! use tfibm::ibm::client::IbmClient;
//!
//! async fn example() -> anyhow::Result<()> {
//!     let client = IbmClient::new(&Config::load())?;
//!     let vpcs: serde_json::Value = client.vpc_get("vpcs", &[]).await?;
//!     Ok(())
//! }
//! ```

pub mod auth;
pub mod client;
pub mod event_notifications;
pub mod http;
pub mod vpc;
