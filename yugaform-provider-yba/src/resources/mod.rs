//! Resource types managed on the platform
//!
//! Each submodule defines a [`ResourceType`] (schema, timeouts, diff
//! validation) and the lifecycle functions the provider dispatches to. The
//! lifecycle functions receive an [`OperationContext`] holding the customer
//! scoped API and the timeouts in force for this invocation.

pub mod backup_schedule;
pub mod cloud_provider;
pub mod release;
pub mod storage_config;
pub mod universe;

use std::collections::HashMap;
use std::time::Duration;

use serde::Serialize;
use serde::de::DeserializeOwned;
use yugaform_core::provider::{ResourceType, Timeouts};
use yugaform_core::resource::{Value, attributes_from_json, attributes_to_json};
use yugaform_core::schema::{AttributeSchema, AttributeType, ResourceSchema, types};

use crate::client::CustomerApi;
use crate::connection::connection_info_schema;
use crate::error::ApiError;
use crate::models::YbpTask;
use crate::task::wait_for_task;

/// Returns all resource types supported by this provider
pub fn resource_types() -> Vec<Box<dyn ResourceType>> {
    vec![
        Box::new(cloud_provider::CloudProviderType),
        Box::new(universe::UniverseType),
        Box::new(storage_config::StorageConfigType),
        Box::new(backup_schedule::BackupScheduleType),
        Box::new(release::ReleaseType),
    ]
}

/// Everything one lifecycle call needs to reach the platform
#[derive(Debug, Clone)]
pub struct OperationContext {
    pub api: CustomerApi,
    pub timeouts: Timeouts,
    pub poll_interval: Duration,
}

impl OperationContext {
    pub fn new(api: CustomerApi, timeouts: Timeouts, poll_interval: Duration) -> Self {
        Self {
            api,
            timeouts,
            poll_interval,
        }
    }

    /// Block on the task a platform call started
    pub async fn wait(&self, task_uuid: &str, timeout: Duration) -> Result<(), ApiError> {
        wait_for_task(&self.api, task_uuid, timeout, self.poll_interval).await
    }

    /// Block on `task` when the call returned one
    pub async fn wait_if_started(&self, task: &YbpTask, timeout: Duration) -> Result<(), ApiError> {
        match &task.task_uuid {
            Some(task_uuid) => self.wait(task_uuid, timeout).await,
            None => Ok(()),
        }
    }
}

// =============================================================================
// Attribute mapping
// =============================================================================

/// Decode an attribute map into a typed configuration struct
pub(crate) fn decode_attributes<T: DeserializeOwned>(
    resource_type: &str,
    attributes: &HashMap<String, Value>,
) -> Result<T, ApiError> {
    serde_json::from_value(attributes_to_json(attributes))
        .map_err(|e| ApiError::InvalidConfig(format!("Invalid {} attributes: {}", resource_type, e)))
}

/// Encode a typed struct back into attributes. `None` fields are dropped.
pub(crate) fn encode_attributes<T: Serialize>(
    resource_type: &str,
    value: &T,
) -> Result<HashMap<String, Value>, ApiError> {
    let json = serde_json::to_value(value)
        .map_err(|e| ApiError::decode(format!("Encode {} attributes", resource_type), e))?;
    Ok(attributes_from_json(&json))
}

/// Copy the tool-only blocks (`connection_info`, `timeouts`) from declared or
/// recorded attributes into a freshly read state.
pub(crate) fn carry_meta_attributes(
    attributes: &mut HashMap<String, Value>,
    source: &HashMap<String, Value>,
) {
    for key in ["connection_info", "timeouts"] {
        if let Some(value) = source.get(key) {
            attributes.insert(key.to_string(), value.clone());
        }
    }
}

// =============================================================================
// Shared schema blocks
// =============================================================================

pub(crate) fn timeouts_schema() -> AttributeSchema {
    AttributeSchema::new(
        "timeouts",
        AttributeType::Struct {
            name: "Timeouts".to_string(),
            fields: vec![
                AttributeSchema::new("create", types::duration()),
                AttributeSchema::new("update", types::duration()),
                AttributeSchema::new("delete", types::duration()),
            ],
        },
    )
    .with_description("Time limits for create, update and delete")
}

/// Add the attributes every resource accepts
pub(crate) fn with_common_attributes(schema: ResourceSchema) -> ResourceSchema {
    schema
        .attribute(connection_info_schema())
        .attribute(timeouts_schema())
}

/// Map of strings
pub(crate) fn string_map() -> AttributeType {
    AttributeType::Map(Box::new(AttributeType::String))
}

pub(crate) fn string_list() -> AttributeType {
    AttributeType::List(Box::new(AttributeType::String))
}
