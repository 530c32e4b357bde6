//! `ibm_is_vpc_address_prefix`
//!
//! Resolves the VPC (by id, or by name through the paginated VPC listing),
//! then the address prefix inside it, and flattens the prefix.

use super::{argument, Arguments};
use crate::ibm::client::IbmClient;
use crate::ibm::vpc::{AddressPrefix, AddressPrefixes, Vpcs, ZoneReference};
use crate::lookup::{
    resolve, Attributes, AttributesBuilder, Collection, Flatten, Lookup, LookupContext,
    LookupError,
};

pub const DATA_SOURCE: &str = "ibm_is_vpc_address_prefix";

impl Flatten for ZoneReference {
    fn flatten(&self) -> Attributes {
        AttributesBuilder::new()
            .set_opt("href", self.href.clone())
            .set_opt("name", self.name.clone())
            .build()
    }
}

impl Flatten for AddressPrefix {
    fn flatten(&self) -> Attributes {
        AttributesBuilder::new()
            .set("id", self.id.clone())
            .set("name", self.name.clone())
            .set_opt("cidr", self.cidr.clone())
            .set_timestamp("created_at", self.created_at.as_ref())
            .set_opt("has_subnets", self.has_subnets)
            .set_opt("href", self.href.clone())
            .set_opt("is_default", self.is_default)
            .set_nested("zone", self.zone.as_ref())
            .build()
    }
}

/// Read the data source
pub async fn read(
    client: &IbmClient,
    ctx: &LookupContext,
    args: &Arguments,
) -> Result<Attributes, LookupError> {
    let vpc_lookup = Lookup::exactly_one_of(
        Vpcs::ENTITY,
        ("vpc", "vpc_name"),
        argument(args, "vpc"),
        argument(args, "vpc_name"),
    )?;
    let prefix_lookup = Lookup::exactly_one_of(
        AddressPrefixes::ENTITY,
        ("address_prefix", "address_prefix_name"),
        argument(args, "address_prefix"),
        argument(args, "address_prefix_name"),
    )?;

    let vpc_id = match &vpc_lookup {
        Lookup::Id(id) => id.clone(),
        Lookup::Name(_) => resolve(ctx, &Vpcs::new(client), &vpc_lookup).await?.id,
    };

    let prefix = resolve(ctx, &AddressPrefixes::new(client, &vpc_id), &prefix_lookup).await?;
    tracing::debug!("Address prefix {} found in VPC {}", prefix.id, vpc_id);

    Ok(to_attributes(&prefix, &vpc_id, args))
}

/// Flattened prefix plus the resolved and user-supplied arguments
fn to_attributes(prefix: &AddressPrefix, vpc_id: &str, args: &Arguments) -> Attributes {
    let mut attrs = prefix.flatten();
    attrs.insert("vpc".to_string(), vpc_id.into());
    attrs.insert("address_prefix".to_string(), prefix.id.clone().into());
    for key in ["vpc_name", "address_prefix_name"] {
        if let Some(value) = argument(args, key) {
            attrs.insert(key.to_string(), value.into());
        }
    }
    attrs
}
