//! Data sources
//!
//! Each data source validates its arguments against the registered schema,
//! resolves the records it needs through [`crate::lookup`], and flattens the
//! result into attributes.
//!
//! - [`registry`] - schemas loaded from embedded JSON
//! - [`vpc_address_prefix`] - `ibm_is_vpc_address_prefix`
//! - [`en_subscription`] - `ibm_en_subscription`

pub mod en_subscription;
pub mod registry;
pub mod vpc_address_prefix;

use crate::ibm::client::IbmClient;
use crate::lookup::{Attributes, LookupContext, LookupError};
use registry::SchemaError;
use std::collections::BTreeMap;
use thiserror::Error;

/// User-supplied arguments of a data source block
pub type Arguments = BTreeMap<String, String>;

#[derive(Debug, Error)]
pub enum ReadError {
    #[error("unknown data source: {0}")]
    UnknownDataSource(String),

    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error(transparent)]
    Lookup(#[from] LookupError),
}

/// Non-empty argument value
pub fn argument<'a>(args: &'a Arguments, key: &str) -> Option<&'a str> {
    args.get(key).map(String::as_str).filter(|v| !v.is_empty())
}

/// Validate, resolve and flatten one data source read
pub async fn read_data_source(
    name: &str,
    client: &IbmClient,
    ctx: &LookupContext,
    args: &Arguments,
) -> Result<Attributes, ReadError> {
    let Some((name, def)) = registry::get_data_source(name) else {
        return Err(ReadError::UnknownDataSource(name.to_string()));
    };

    def.validate(name, args)?;
    tracing::info!("Reading data source {} with {:?}", name, args.keys());

    let attrs = match name {
        vpc_address_prefix::DATA_SOURCE => vpc_address_prefix::read(client, ctx, args).await?,
        en_subscription::DATA_SOURCE => en_subscription::read(client, ctx, args).await?,
        _ => return Err(ReadError::UnknownDataSource(name.to_string())),
    };

    Ok(def.project(name, attrs))
}
