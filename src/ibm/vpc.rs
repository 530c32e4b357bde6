//! VPC API
//!
//! Records and paginated collections for VPCs and their address prefixes.
//! VPC listings paginate with a `next.href` link whose `start` query
//! parameter is the opaque cursor for the following page.

use super::client::IbmClient;
use super::http::RemoteError;
use crate::lookup::{Collection, Named, Page};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use url::Url;

/// Records requested per page
const PAGE_LIMIT: u32 = 50;

/// Link to the next page of a VPC listing
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PageLink {
    pub href: String,
}

/// Extract the `start` token from a `next` link.
/// A link without `start` means there is nothing more to fetch.
pub fn next_start(link: Option<&PageLink>) -> Result<Option<String>, RemoteError> {
    let Some(link) = link else {
        return Ok(None);
    };

    let url = Url::parse(&link.href)
        .map_err(|e| RemoteError::Cursor(format!("{}: {}", link.href, e)))?;

    Ok(url
        .query_pairs()
        .find(|(key, _)| key == "start")
        .map(|(_, value)| value.into_owned())
        .filter(|start| !start.is_empty()))
}

fn page_query(cursor: Option<&str>) -> Vec<(&'static str, String)> {
    let mut query = vec![("limit", PAGE_LIMIT.to_string())];
    if let Some(start) = cursor {
        query.push(("start", start.to_string()));
    }
    query
}

/// VPC
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Vpc {
    pub id: String,
    pub name: String,
    pub crn: Option<String>,
    pub href: Option<String>,
    pub status: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
}

impl Named for Vpc {
    fn id(&self) -> &str {
        &self.id
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[derive(Debug, Deserialize)]
struct VpcPage {
    #[serde(default)]
    vpcs: Vec<Vpc>,
    next: Option<PageLink>,
}

/// Reference to a zone embedded in other records
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ZoneReference {
    pub href: Option<String>,
    pub name: Option<String>,
}

/// Address prefix of a VPC
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AddressPrefix {
    pub id: String,
    pub name: String,
    pub cidr: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub has_subnets: Option<bool>,
    pub href: Option<String>,
    pub is_default: Option<bool>,
    pub zone: Option<ZoneReference>,
}

impl Named for AddressPrefix {
    fn id(&self) -> &str {
        &self.id
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[derive(Debug, Deserialize)]
struct AddressPrefixPage {
    #[serde(default)]
    address_prefixes: Vec<AddressPrefix>,
    next: Option<PageLink>,
}

/// All VPCs in the client's region
pub struct Vpcs<'a> {
    client: &'a IbmClient,
}

impl<'a> Vpcs<'a> {
    pub fn new(client: &'a IbmClient) -> Self {
        Self { client }
    }
}

impl Collection for Vpcs<'_> {
    type Record = Vpc;
    const ENTITY: &'static str = "VPC";

    async fn fetch_page(&self, cursor: Option<&str>) -> Result<Page<Vpc>, RemoteError> {
        let page: VpcPage = self.client.vpc_get("vpcs", &page_query(cursor)).await?;
        Ok(Page::new(page.vpcs, next_start(page.next.as_ref())?))
    }

    async fn fetch_by_id(&self, id: &str) -> Result<Vpc, RemoteError> {
        self.client
            .vpc_get(&format!("vpcs/{}", urlencoding::encode(id)), &[])
            .await
    }
}

/// Address prefixes of one VPC
pub struct AddressPrefixes<'a> {
    client: &'a IbmClient,
    vpc_id: String,
}

impl<'a> AddressPrefixes<'a> {
    pub fn new(client: &'a IbmClient, vpc_id: &str) -> Self {
        Self {
            client,
            vpc_id: vpc_id.to_string(),
        }
    }

    fn path(&self, suffix: &str) -> String {
        format!(
            "vpcs/{}/address_prefixes{}",
            urlencoding::encode(&self.vpc_id),
            suffix
        )
    }
}

impl Collection for AddressPrefixes<'_> {
    type Record = AddressPrefix;
    const ENTITY: &'static str = "Address Prefix";

    async fn fetch_page(&self, cursor: Option<&str>) -> Result<Page<AddressPrefix>, RemoteError> {
        let page: AddressPrefixPage = self
            .client
            .vpc_get(&self.path(""), &page_query(cursor))
            .await?;
        Ok(Page::new(
            page.address_prefixes,
            next_start(page.next.as_ref())?,
        ))
    }

    async fn fetch_by_id(&self, id: &str) -> Result<AddressPrefix, RemoteError> {
        let suffix = format!("/{}", urlencoding::encode(id));
        self.client.vpc_get(&self.path(&suffix), &[]).await
    }
}
