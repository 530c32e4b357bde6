//! Event Notifications API
//!
//! Subscriptions of an Event Notifications instance. Listings paginate by
//! `offset`/`limit`; the cursor handed to the resolver is the next offset.

use super::client::IbmClient;
use super::http::RemoteError;
use crate::lookup::{Collection, Named, Page};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::{Map, Value};

/// Records requested per page
pub const PAGE_LIMIT: u64 = 50;

/// Subscription linking a topic to a destination
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Subscription {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub updated_at: Option<DateTime<Utc>>,
    pub destination_type: Option<String>,
    pub destination_id: Option<String>,
    pub destination_name: Option<String>,
    pub topic_id: Option<String>,
    pub topic_name: Option<String>,
    /// Destination-specific settings; the shape varies by destination type
    pub attributes: Option<Map<String, Value>>,
}

impl Named for Subscription {
    fn id(&self) -> &str {
        &self.id
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[derive(Debug, Deserialize)]
struct SubscriptionPage {
    total_count: Option<u64>,
    #[serde(default)]
    subscriptions: Vec<Subscription>,
}

/// Offset of the page after one that started at `offset` and held
/// `returned` records, or `None` when the listing is complete.
pub fn next_offset(offset: u64, returned: usize, total_count: Option<u64>) -> Option<String> {
    if returned == 0 {
        return None;
    }

    let next = offset + returned as u64;
    match total_count {
        Some(total) if next >= total => None,
        // Without a total, a short page is the last one
        None if (returned as u64) < PAGE_LIMIT => None,
        _ => Some(next.to_string()),
    }
}

fn parse_offset(cursor: Option<&str>) -> Result<u64, RemoteError> {
    match cursor {
        None => Ok(0),
        Some(cursor) => cursor
            .parse()
            .map_err(|_| RemoteError::Cursor(cursor.to_string())),
    }
}

/// Subscriptions of one Event Notifications instance
pub struct Subscriptions<'a> {
    client: &'a IbmClient,
    instance_id: String,
}

impl<'a> Subscriptions<'a> {
    pub fn new(client: &'a IbmClient, instance_id: &str) -> Self {
        Self {
            client,
            instance_id: instance_id.to_string(),
        }
    }
}

impl Collection for Subscriptions<'_> {
    type Record = Subscription;
    const ENTITY: &'static str = "Subscription";

    async fn fetch_page(&self, cursor: Option<&str>) -> Result<Page<Subscription>, RemoteError> {
        let offset = parse_offset(cursor)?;
        let url = self
            .client
            .en_instance_url(&self.instance_id, "subscriptions");
        let query = [
            ("offset", offset.to_string()),
            ("limit", PAGE_LIMIT.to_string()),
        ];

        let page: SubscriptionPage = self.client.get(&url, &query).await?;
        let next = next_offset(offset, page.subscriptions.len(), page.total_count);
        Ok(Page::new(page.subscriptions, next))
    }

    async fn fetch_by_id(&self, id: &str) -> Result<Subscription, RemoteError> {
        let url = self.client.en_instance_url(
            &self.instance_id,
            &format!("subscriptions/{}", urlencoding::encode(id)),
        );
        self.client.get(&url, &[]).await
    }
}
