//! cloud_provider resource
//!
//! A registered cloud account (AWS, GCP or Azure) with its regions and
//! zones. The platform cannot edit a provider in place, so every change
//! replaces it.

use std::collections::HashMap;
use std::time::Duration;

use log::debug;
use serde::{Deserialize, Serialize};
use yugaform_core::provider::{ResourceType, Timeouts};
use yugaform_core::resource::{Resource, ResourceId, State, Value};
use yugaform_core::schema::{AttributeSchema, AttributeType, ResourceSchema, types};

use super::{
    OperationContext, carry_meta_attributes, decode_attributes, encode_attributes, string_map,
    with_common_attributes,
};
use crate::credentials::{build_config, check_env_for_code, process_env};
use crate::error::ApiError;
use crate::models::{AvailabilityZone, Provider, Region, StringMap};

pub const RESOURCE_TYPE: &str = "cloud_provider";

const CLOUD_CODES: &[&str] = &["gcp", "aws", "azu"];

// =============================================================================
// Configuration
// =============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CloudProviderConfig {
    pub air_gap_install: Option<bool>,
    pub code: Option<String>,
    pub config: Option<StringMap>,
    pub dest_vpc_id: Option<String>,
    pub host_vpc_id: Option<String>,
    pub host_vpc_region: Option<String>,
    pub key_pair_name: Option<String>,
    pub name: Option<String>,
    #[serde(default)]
    pub regions: Vec<RegionConfig>,
    pub ssh_port: Option<i64>,
    pub ssh_private_key_content: Option<String>,
    pub ssh_user: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RegionConfig {
    pub uuid: Option<String>,
    pub code: Option<String>,
    pub name: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub security_group_id: Option<String>,
    pub vnet_name: Option<String>,
    pub yb_image: Option<String>,
    pub config: Option<StringMap>,
    #[serde(default)]
    pub zones: Vec<ZoneConfig>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ZoneConfig {
    pub uuid: Option<String>,
    pub code: Option<String>,
    pub name: Option<String>,
    pub subnet: Option<String>,
    pub secondary_subnet: Option<String>,
    pub config: Option<StringMap>,
}

impl From<&RegionConfig> for Region {
    fn from(region: &RegionConfig) -> Self {
        Region {
            uuid: None,
            code: region.code.clone(),
            name: region.name.clone(),
            latitude: region.latitude,
            longitude: region.longitude,
            security_group_id: region.security_group_id.clone(),
            vnet_name: region.vnet_name.clone(),
            yb_image: region.yb_image.clone(),
            config: region.config.clone(),
            zones: region.zones.iter().map(AvailabilityZone::from).collect(),
        }
    }
}

impl From<&ZoneConfig> for AvailabilityZone {
    fn from(zone: &ZoneConfig) -> Self {
        AvailabilityZone {
            uuid: None,
            code: zone.code.clone(),
            name: zone.name.clone(),
            subnet: zone.subnet.clone(),
            secondary_subnet: zone.secondary_subnet.clone(),
            config: zone.config.clone(),
        }
    }
}

impl From<&Region> for RegionConfig {
    fn from(region: &Region) -> Self {
        RegionConfig {
            uuid: region.uuid.clone(),
            code: region.code.clone(),
            name: region.name.clone(),
            latitude: region.latitude,
            longitude: region.longitude,
            security_group_id: region.security_group_id.clone(),
            vnet_name: region.vnet_name.clone(),
            yb_image: region.yb_image.clone(),
            config: region.config.clone(),
            zones: region.zones.iter().map(ZoneConfig::from).collect(),
        }
    }
}

impl From<&AvailabilityZone> for ZoneConfig {
    fn from(zone: &AvailabilityZone) -> Self {
        ZoneConfig {
            uuid: zone.uuid.clone(),
            code: zone.code.clone(),
            name: zone.name.clone(),
            subnet: zone.subnet.clone(),
            secondary_subnet: zone.secondary_subnet.clone(),
            config: zone.config.clone(),
        }
    }
}

impl CloudProviderConfig {
    /// Build the create request; `config` is the assembled credential map
    fn to_request(&self, config: StringMap) -> Provider {
        Provider {
            uuid: None,
            code: self.code.clone(),
            name: self.name.clone(),
            config: Some(config),
            air_gap_install: self.air_gap_install,
            dest_vpc_id: self.dest_vpc_id.clone(),
            host_vpc_id: self.host_vpc_id.clone(),
            host_vpc_region: self.host_vpc_region.clone(),
            key_pair_name: self.key_pair_name.clone(),
            ssh_port: self.ssh_port,
            ssh_private_key_content: self.ssh_private_key_content.clone(),
            ssh_user: self.ssh_user.clone(),
            regions: self.regions.iter().map(Region::from).collect(),
        }
    }

    fn from_remote(provider: &Provider) -> Self {
        CloudProviderConfig {
            air_gap_install: provider.air_gap_install,
            code: provider.code.clone(),
            config: provider.config.clone(),
            dest_vpc_id: provider.dest_vpc_id.clone(),
            host_vpc_id: provider.host_vpc_id.clone(),
            host_vpc_region: provider.host_vpc_region.clone(),
            key_pair_name: provider.key_pair_name.clone(),
            name: provider.name.clone(),
            regions: provider.regions.iter().map(RegionConfig::from).collect(),
            ssh_port: provider.ssh_port,
            ssh_private_key_content: provider.ssh_private_key_content.clone(),
            ssh_user: provider.ssh_user.clone(),
        }
    }
}

// =============================================================================
// Resource type
// =============================================================================

pub struct CloudProviderType;

fn zone_schema() -> AttributeType {
    AttributeType::Struct {
        name: "Zone".to_string(),
        fields: vec![
            AttributeSchema::new("uuid", AttributeType::String)
                .computed()
                .with_description("Zone UUID"),
            AttributeSchema::new("code", AttributeType::String).with_description("Zone code"),
            AttributeSchema::new("name", AttributeType::String).with_description("Zone name"),
            AttributeSchema::new("subnet", AttributeType::String)
                .with_description("Subnet to use for this zone"),
            AttributeSchema::new("secondary_subnet", AttributeType::String)
                .with_description("Secondary subnet to use for this zone"),
            AttributeSchema::new("config", string_map()),
        ],
    }
}

fn region_schema() -> AttributeType {
    AttributeType::Struct {
        name: "Region".to_string(),
        fields: vec![
            AttributeSchema::new("uuid", AttributeType::String)
                .computed()
                .with_description("Region UUID"),
            AttributeSchema::new("code", AttributeType::String).with_description("Region code"),
            AttributeSchema::new("name", AttributeType::String).with_description("Region name"),
            AttributeSchema::new("latitude", AttributeType::Float),
            AttributeSchema::new("longitude", AttributeType::Float),
            AttributeSchema::new("security_group_id", AttributeType::String),
            AttributeSchema::new("vnet_name", AttributeType::String),
            AttributeSchema::new("yb_image", AttributeType::String),
            AttributeSchema::new("config", string_map()),
            AttributeSchema::new("zones", AttributeType::List(Box::new(zone_schema())))
                .with_description("Availability zones of the region"),
        ],
    }
}

impl ResourceType for CloudProviderType {
    fn name(&self) -> &'static str {
        RESOURCE_TYPE
    }

    fn schema(&self) -> ResourceSchema {
        let schema = ResourceSchema::new(RESOURCE_TYPE)
            .with_description("Cloud Provider Resource")
            .attribute(
                AttributeSchema::new("air_gap_install", AttributeType::Bool)
                    .force_new()
                    .with_description("Whether universes use an air-gapped installation"),
            )
            .attribute(
                AttributeSchema::new(
                    "code",
                    AttributeType::Enum(CLOUD_CODES.iter().map(|c| c.to_string()).collect()),
                )
                .force_new()
                .with_description("Code of the cloud provider. Permitted values: gcp, aws, azu"),
            )
            .attribute(
                AttributeSchema::new("config", string_map())
                    .computed()
                    .force_new()
                    .sensitive()
                    .with_description(
                        "Configuration values for the provider. Keys not set here are taken \
                         from the cloud's credential environment variables",
                    ),
            )
            .attribute(AttributeSchema::new("dest_vpc_id", AttributeType::String).force_new())
            .attribute(AttributeSchema::new("host_vpc_id", AttributeType::String).force_new())
            .attribute(AttributeSchema::new("host_vpc_region", AttributeType::String).force_new())
            .attribute(AttributeSchema::new("key_pair_name", AttributeType::String).force_new())
            .attribute(
                AttributeSchema::new("name", AttributeType::String)
                    .force_new()
                    .with_description("Name of the provider"),
            )
            .attribute(
                AttributeSchema::new("regions", AttributeType::List(Box::new(region_schema())))
                    .force_new(),
            )
            .attribute(
                AttributeSchema::new("ssh_port", types::port())
                    .computed()
                    .force_new()
                    .with_description("Port to use for ssh commands"),
            )
            .attribute(
                AttributeSchema::new("ssh_private_key_content", AttributeType::String)
                    .force_new()
                    .sensitive()
                    .with_description("Private key to use for ssh commands"),
            )
            .attribute(
                AttributeSchema::new("ssh_user", AttributeType::String)
                    .force_new()
                    .with_description("User to use for ssh commands"),
            );
        with_common_attributes(schema)
    }

    fn timeouts(&self) -> Timeouts {
        Timeouts::new(
            Duration::from_secs(10 * 60),
            Duration::from_secs(10 * 60),
            Duration::from_secs(5 * 60),
        )
    }

    fn supports_update(&self) -> bool {
        false
    }

    fn validate_diff(
        &self,
        old: Option<&HashMap<String, Value>>,
        new: &HashMap<String, Value>,
    ) -> Result<(), Vec<String>> {
        validate_credentials(old, new, process_env)
    }
}

/// Check that credentials can be assembled whenever a provider is about to be
/// (re)created.
pub fn validate_credentials(
    old: Option<&HashMap<String, Value>>,
    new: &HashMap<String, Value>,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<(), Vec<String>> {
    let unchanged = |key: &str| match (old.and_then(|o| o.get(key)), new.get(key)) {
        (_, None) => true,
        (Some(current), Some(desired)) => desired.satisfied_by(current),
        (None, Some(_)) => false,
    };
    if old.is_some() && ["code", "config"].into_iter().all(unchanged) {
        return Ok(());
    }

    let Some(code) = new.get("code").and_then(Value::as_str) else {
        return Ok(());
    };
    let declared: StringMap = new
        .get("config")
        .and_then(Value::as_map)
        .map(|m| {
            m.iter()
                .filter_map(|(k, v)| v.as_str().map(|v| (k.clone(), v.to_string())))
                .collect()
        })
        .unwrap_or_default();

    check_env_for_code(code, &declared, lookup).map_err(|e| vec![e])
}

// =============================================================================
// Lifecycle
// =============================================================================

pub async fn create(ctx: &OperationContext, resource: &Resource) -> Result<State, ApiError> {
    let desired: CloudProviderConfig = decode_attributes(RESOURCE_TYPE, &resource.attributes)?;
    let code = desired.code.clone().unwrap_or_default();
    let config = build_config(&code, &desired.config.clone().unwrap_or_default(), process_env)
        .await
        .map_err(ApiError::InvalidConfig)?;

    let task = ctx.api.create_provider(&desired.to_request(config)).await?;
    let provider_uuid = task
        .resource_uuid
        .clone()
        .ok_or_else(|| ApiError::missing("Create provider", "resourceUUID"))?;

    if let Some(task_uuid) = &task.task_uuid {
        debug!("Waiting for provider {} to be active", provider_uuid);
        ctx.wait(task_uuid, ctx.timeouts.create).await?;
    }

    let prior = State::existing(resource.id.clone(), resource.attributes.clone());
    read(ctx, &resource.id, &provider_uuid, Some(&prior)).await
}

pub async fn read(
    ctx: &OperationContext,
    id: &ResourceId,
    identifier: &str,
    prior: Option<&State>,
) -> Result<State, ApiError> {
    let providers = ctx.api.list_providers().await?;
    let Some(provider) = providers
        .iter()
        .find(|p| p.uuid.as_deref() == Some(identifier))
    else {
        return Ok(State::not_found(id.clone()));
    };

    let mut current = CloudProviderConfig::from_remote(provider);
    if let Some(prior) = prior {
        let recorded: CloudProviderConfig = decode_attributes(RESOURCE_TYPE, &prior.attributes)?;
        // The platform masks credentials and keys in list responses
        if recorded.config.is_some() {
            current.config = recorded.config;
        }
        if recorded.ssh_private_key_content.is_some() {
            current.ssh_private_key_content = recorded.ssh_private_key_content;
        }
    }

    let mut attributes = encode_attributes(RESOURCE_TYPE, &current)?;
    if let Some(prior) = prior {
        carry_meta_attributes(&mut attributes, &prior.attributes);
    }
    Ok(State::existing(id.clone(), attributes).with_identifier(identifier))
}

pub async fn delete(ctx: &OperationContext, identifier: &str) -> Result<(), ApiError> {
    let task = ctx.api.delete_provider(identifier).await?;
    if let Some(task_uuid) = &task.task_uuid {
        debug!("Waiting for provider {} to be deleted", identifier);
        ctx.wait(task_uuid, ctx.timeouts.delete).await?;
    }
    Ok(())
}
