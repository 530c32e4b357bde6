//! Record lookup layer
//!
//! Generic pieces shared by every data source:
//!
//! - [`resolver`] - resolve a record by id or by paginated name scan
//! - [`flatten`] - turn nested records into flat attribute maps
//! - [`error`] - the [`LookupError`] taxonomy
//!
//! # Example
//!
//! ```ignore
//! use tfibm::lookup::{resolve, Lookup, LookupContext};
//! use tfibm::ibm::vpc::Vpcs;
//!
//! async fn vpc_id(client: &tfibm::ibm::client::IbmClient) -> anyhow::Result<String> {
//!     let vpc = resolve(&LookupContext::new(), &Vpcs::new(client), &Lookup::Name("main".into())).await?;
//!     Ok(vpc.id)
//! }
//! ```

pub mod error;
pub mod flatten;
pub mod resolver;

pub use error::LookupError;
pub use flatten::{nested_list, Attributes, AttributesBuilder, Flatten};
pub use resolver::{
    find_by_name, list_all, resolve, CancelHandle, Collection, Lookup, LookupContext, Named, Page,
};
