//! tfibm - declarative IBM Cloud data sources
//!
//! Reads IBM Cloud records the way a Terraform data source does: arguments
//! are validated against a declared schema, the target record is resolved by
//! id or by a paginated name scan, and the result is flattened into a map of
//! attributes.
//!
//! # Module Structure
//!
//! - [`config`] - persistent configuration and endpoint resolution
//! - [`ibm`] - IAM auth, HTTP client and the VPC / Event Notifications APIs
//! - [`lookup`] - generic paginated resolver and record flattener
//! - [`datasource`] - schema registry and the data source read handlers

pub mod config;
pub mod datasource;
pub mod ibm;
pub mod lookup;
