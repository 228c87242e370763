//! storage_config resource
//!
//! A backup target (S3, GCS, Azure or NFS) registered as a customer config
//! of type `STORAGE`.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use yugaform_core::provider::ResourceType;
use yugaform_core::resource::{Resource, ResourceId, State};
use yugaform_core::schema::{AttributeSchema, AttributeType, ResourceSchema};

use super::{
    OperationContext, carry_meta_attributes, decode_attributes, encode_attributes, string_map,
    with_common_attributes,
};
use crate::credentials::{fill_storage_credentials, process_env};
use crate::error::ApiError;
use crate::models::{CustomerConfig, StringMap};

pub const RESOURCE_TYPE: &str = "storage_config";

const STORAGE_TYPE: &str = "STORAGE";
const STORAGE_CODES: &[&str] = &["S3", "GCS", "AZ", "NFS"];

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct StorageConfigSpec {
    pub config_name: String,
    #[serde(default)]
    pub data: StringMap,
    pub name: String,
}

impl StorageConfigSpec {
    fn to_request(&self, customer_uuid: &str, data: &StringMap) -> CustomerConfig {
        CustomerConfig {
            config_uuid: None,
            config_name: self.config_name.clone(),
            customer_uuid: Some(customer_uuid.to_string()),
            data: data
                .iter()
                .map(|(k, v)| (k.clone(), serde_json::Value::String(v.clone())))
                .collect(),
            name: self.name.clone(),
            config_type: STORAGE_TYPE.to_string(),
            state: None,
        }
    }

    fn from_remote(config: &CustomerConfig) -> Self {
        StorageConfigSpec {
            config_name: config.config_name.clone(),
            data: flatten_data(&config.data),
            name: config.name.clone(),
        }
    }

    /// Data with environment credentials filled in
    async fn request_data(&self) -> Result<StringMap, ApiError> {
        let mut data = self.data.clone();
        fill_storage_credentials(&self.name, &mut data, process_env)
            .await
            .map_err(ApiError::InvalidConfig)?;
        Ok(data)
    }
}

fn flatten_data(data: &BTreeMap<String, serde_json::Value>) -> StringMap {
    data.iter()
        .map(|(key, value)| {
            let value = match value {
                serde_json::Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            (key.clone(), value)
        })
        .collect()
}

/// The platform masks secrets (`AKIA********`) in responses
fn is_masked(value: &str) -> bool {
    value.contains("**")
}

pub struct StorageConfigType;

impl ResourceType for StorageConfigType {
    fn name(&self) -> &'static str {
        RESOURCE_TYPE
    }

    fn schema(&self) -> ResourceSchema {
        let schema = ResourceSchema::new(RESOURCE_TYPE)
            .with_description("Storage Config Resource")
            .attribute(
                AttributeSchema::new(
                    "name",
                    AttributeType::Enum(STORAGE_CODES.iter().map(|c| c.to_string()).collect()),
                )
                .required()
                .force_new()
                .with_description("Storage type: S3, GCS, AZ or NFS"),
            )
            .attribute(
                AttributeSchema::new("config_name", AttributeType::String)
                    .required()
                    .with_description("Name of the storage config"),
            )
            .attribute(
                AttributeSchema::new("data", string_map())
                    .required()
                    .sensitive()
                    .with_description("Location and credentials of the backup target"),
            );
        with_common_attributes(schema)
    }
}

// =============================================================================
// Lifecycle
// =============================================================================

pub async fn create(ctx: &OperationContext, resource: &Resource) -> Result<State, ApiError> {
    let desired: StorageConfigSpec = decode_attributes(RESOURCE_TYPE, &resource.attributes)?;
    let data = desired.request_data().await?;
    let request = desired.to_request(ctx.api.customer_uuid(), &data);

    let created = ctx.api.create_customer_config(&request).await?;
    let config_uuid = created
        .config_uuid
        .ok_or_else(|| ApiError::missing("Create customer config", "configUUID"))?;

    let prior = State::existing(resource.id.clone(), resource.attributes.clone());
    read(ctx, &resource.id, &config_uuid, Some(&prior)).await
}

pub async fn read(
    ctx: &OperationContext,
    id: &ResourceId,
    identifier: &str,
    prior: Option<&State>,
) -> Result<State, ApiError> {
    let configs = ctx.api.list_customer_configs().await?;
    let Some(config) = configs
        .iter()
        .find(|c| c.config_uuid.as_deref() == Some(identifier))
    else {
        return Ok(State::not_found(id.clone()));
    };

    let mut current = StorageConfigSpec::from_remote(config);
    if let Some(prior) = prior {
        let recorded: StorageConfigSpec = decode_attributes(RESOURCE_TYPE, &prior.attributes)?;
        for (key, value) in current.data.iter_mut() {
            if is_masked(value)
                && let Some(known) = recorded.data.get(key)
            {
                value.clone_from(known);
            }
        }
    }

    let mut attributes = encode_attributes(RESOURCE_TYPE, &current)?;
    if let Some(prior) = prior {
        carry_meta_attributes(&mut attributes, &prior.attributes);
    }
    Ok(State::existing(id.clone(), attributes).with_identifier(identifier))
}

pub async fn update(
    ctx: &OperationContext,
    id: &ResourceId,
    identifier: &str,
    to: &Resource,
) -> Result<State, ApiError> {
    let desired: StorageConfigSpec = decode_attributes(RESOURCE_TYPE, &to.attributes)?;
    let data = desired.request_data().await?;
    let request = desired.to_request(ctx.api.customer_uuid(), &data);
    ctx.api.edit_customer_config(identifier, &request).await?;

    let prior = State::existing(to.id.clone(), to.attributes.clone());
    read(ctx, id, identifier, Some(&prior)).await
}

pub async fn delete(ctx: &OperationContext, identifier: &str) -> Result<(), ApiError> {
    match ctx.api.delete_customer_config(identifier).await {
        Ok(_) => Ok(()),
        Err(e) if e.is_not_found() => Ok(()),
        Err(e) => Err(e),
    }
}
