//! HTTP utilities for IBM Cloud REST API calls

use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

/// Maximum length of response body to log (to avoid logging sensitive data)
const MAX_LOG_BODY_LENGTH: usize = 200;

/// Error returned by a remote IBM Cloud call
#[derive(Debug, Error)]
pub enum RemoteError {
    /// The API answered with a non-success status
    #[error("API request failed: {status} {message}")]
    Status { status: u16, message: String },

    #[error("failed to send request: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("failed to parse response JSON: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("authentication failed: {0}")]
    Auth(String),

    /// A continuation token could not be interpreted
    #[error("invalid page cursor: {0}")]
    Cursor(String),
}

impl RemoteError {
    /// HTTP status code, if the server answered at all
    pub fn status(&self) -> Option<u16> {
        match self {
            RemoteError::Status { status, .. } => Some(*status),
            RemoteError::Transport(err) => err.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

/// Sanitize response body for logging
/// Truncates long responses and strips control characters
fn sanitize_for_log(body: &str) -> String {
    let char_count = body.chars().count();
    let truncated = if char_count > MAX_LOG_BODY_LENGTH {
        let head: String = body.chars().take(MAX_LOG_BODY_LENGTH).collect();
        format!("{}... [truncated, {} bytes total]", head, body.len())
    } else {
        body.to_string()
    };

    truncated.replace(|c: char| !c.is_ascii_graphic() && c != ' ', "")
}

/// Pull the first human-readable message out of an IBM Cloud error body.
///
/// Both the VPC and Event Notifications APIs answer with
/// `{"errors": [{"code": "...", "message": "..."}], ...}`.
fn extract_error_message(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    let first = value.get("errors")?.as_array()?.first()?;
    let message = first.get("message").and_then(|m| m.as_str())?;
    let code = first.get("code").and_then(|c| c.as_str());

    Some(match code {
        Some(code) => format!("{}: {}", code, sanitize_for_log(message)),
        None => sanitize_for_log(message),
    })
}

/// HTTP client wrapper for IBM Cloud API calls
#[derive(Clone)]
pub struct IbmHttpClient {
    client: Client,
}

impl IbmHttpClient {
    /// Create a new HTTP client with a per-request timeout
    pub fn new(timeout: Duration) -> anyhow::Result<Self> {
        use anyhow::Context;

        let client = Client::builder()
            .user_agent(concat!("tfibm/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self { client })
    }

    /// Make an authenticated GET request and decode the JSON body
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, String)],
        token: &str,
    ) -> Result<T, RemoteError> {
        tracing::debug!("GET {} {:?}", url, query);

        let request = self.client.get(url).query(query).bearer_auth(token);
        self.send(request).await
    }

    /// POST a form body without bearer auth (used for the IAM token exchange)
    pub async fn post_form<T: DeserializeOwned>(
        &self,
        url: &str,
        form: &[(&str, &str)],
    ) -> Result<T, RemoteError> {
        tracing::debug!("POST {}", url);

        let request = self
            .client
            .post(url)
            .header(reqwest::header::ACCEPT, "application/json")
            .form(form);
        self.send(request).await
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, RemoteError> {
        let request_id = uuid::Uuid::new_v4().to_string();
        let response = request.header("X-Request-ID", &request_id).send().await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            // Only log sanitized/truncated error body to avoid leaking sensitive data
            tracing::error!(
                request_id = %request_id,
                "API error: {} - {}",
                status,
                sanitize_for_log(&body)
            );
            let message = extract_error_message(&body)
                .unwrap_or_else(|| status.canonical_reason().unwrap_or("").to_string());
            return Err(RemoteError::Status {
                status: status.as_u16(),
                message,
            });
        }

        Ok(serde_json::from_str(&body)?)
    }
}

/// Format a remote error for display
/// Maps common status codes to short explanations instead of raw API output
pub fn format_ibm_error(error: &RemoteError) -> String {
    match error.status() {
        Some(401) => {
            return "Authentication failed. Check IC_API_KEY or run with --api-key.".to_string()
        }
        Some(403) => return "Permission denied. Check your IAM access policies.".to_string(),
        Some(404) => return "Resource not found.".to_string(),
        Some(409) => {
            return "Resource conflict. The resource may already exist or be in use.".to_string()
        }
        Some(429) => return "Rate limit exceeded. Please try again later.".to_string(),
        Some(400) => return "Invalid request. Check your parameters.".to_string(),
        Some(500) | Some(502) | Some(503) => {
            return "IBM Cloud service temporarily unavailable. Please try again.".to_string()
        }
        _ => {}
    }

    if let RemoteError::Transport(err) = error {
        if err.is_timeout() {
            return "Request timed out. Check your network connection or raise --timeout."
                .to_string();
        }
        return "Request failed. Check your network connection and try again.".to_string();
    }

    let error_str = error.to_string();
    let sanitized = error_str
        .chars()
        .filter(|c| c.is_ascii_graphic() || *c == ' ')
        .take(80)
        .collect::<String>();

    if sanitized.len() < error_str.len() {
        format!("{}...", sanitized)
    } else {
        sanitized
    }
}
