//! `ibm_en_subscription`

use super::registry::SchemaError;
use super::{argument, Arguments, ReadError};
use crate::ibm::client::IbmClient;
use crate::ibm::event_notifications::{Subscription, Subscriptions};
use crate::lookup::{
    resolve, Attributes, AttributesBuilder, Collection, Flatten, Lookup, LookupContext,
};
use serde_json::{Map, Value};

pub const DATA_SOURCE: &str = "ibm_en_subscription";

/// Destination-specific attributes; nulls are dropped like any absent field
impl Flatten for Map<String, Value> {
    fn flatten(&self) -> Attributes {
        self.iter()
            .filter(|(_, value)| !value.is_null())
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect()
    }
}

impl Flatten for Subscription {
    fn flatten(&self) -> Attributes {
        AttributesBuilder::new()
            .set("subscription_id", self.id.clone())
            .set("name", self.name.clone())
            .set_opt("description", self.description.clone())
            .set_timestamp("updated_at", self.updated_at.as_ref())
            .set_opt("destination_type", self.destination_type.clone())
            .set_opt("destination_id", self.destination_id.clone())
            .set_opt("destination_name", self.destination_name.clone())
            .set_opt("topic_id", self.topic_id.clone())
            .set_opt("topic_name", self.topic_name.clone())
            .set_nested("attributes", self.attributes.as_ref())
            .build()
    }
}

/// Read the data source
pub async fn read(
    client: &IbmClient,
    ctx: &LookupContext,
    args: &Arguments,
) -> Result<Attributes, ReadError> {
    let Some(instance_guid) = argument(args, "instance_guid") else {
        return Err(SchemaError::MissingRequired {
            data_source: DATA_SOURCE,
            field: "instance_guid".to_string(),
        }
        .into());
    };
    let lookup = Lookup::exactly_one_of(
        Subscriptions::ENTITY,
        ("subscription_id", "name"),
        argument(args, "subscription_id"),
        argument(args, "name"),
    )?;

    let subscription = resolve(ctx, &Subscriptions::new(client, instance_guid), &lookup).await?;

    Ok(to_attributes(&subscription, instance_guid))
}

fn to_attributes(subscription: &Subscription, instance_guid: &str) -> Attributes {
    let mut attrs = subscription.flatten();
    attrs.insert(
        "id".to_string(),
        format!("{}/{}", instance_guid, subscription.id).into(),
    );
    attrs.insert("instance_guid".to_string(), instance_guid.into());
    attrs
}
