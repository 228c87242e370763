//! backup_schedule resource
//!
//! Periodic backups of one universe into one storage config. Only the
//! schedule itself (frequency or cron expression) can be edited; everything
//! else replaces the schedule.

use std::collections::HashMap;
use std::time::Duration;

use log::debug;
use serde::{Deserialize, Serialize};
use yugaform_core::provider::{ResourceType, Timeouts};
use yugaform_core::resource::{Resource, ResourceId, State, Value};
use yugaform_core::schema::{AttributeSchema, AttributeType, ResourceSchema, types};

use super::{
    OperationContext, carry_meta_attributes, decode_attributes, encode_attributes,
    with_common_attributes,
};
use crate::error::ApiError;
use crate::models::{BackupScheduleParams, EditBackupScheduleParams, KeyspaceTable, Schedule};
use crate::version::{BACKUP_MIN_VERSION, ensure_min_version};

pub const RESOURCE_TYPE: &str = "backup_schedule";

const BACKUP_TYPES: &[&str] = &["YQL_TABLE_TYPE", "PGSQL_TABLE_TYPE", "REDIS_TABLE_TYPE"];

const ACTIVE: &str = "Active";

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct BackupScheduleConfig {
    pub universe_uuid: String,
    pub storage_config_uuid: String,
    pub keyspace: Option<String>,
    pub backup_type: Option<String>,
    pub sse: Option<bool>,
    pub transactional_backup: Option<bool>,
    pub parallelism: Option<i64>,
    pub time_before_delete: Option<i64>,
    pub frequency: Option<i64>,
    pub cron_expression: Option<String>,
    pub schedule_name: Option<String>,
    pub status: Option<String>,
}

impl BackupScheduleConfig {
    fn to_request(&self) -> BackupScheduleParams {
        BackupScheduleParams {
            storage_config_uuid: self.storage_config_uuid.clone(),
            universe_uuid: self.universe_uuid.clone(),
            backup_type: self.backup_type.clone(),
            keyspace_table_list: self
                .keyspace
                .iter()
                .map(|keyspace| KeyspaceTable {
                    keyspace: Some(keyspace.clone()),
                    table_name_list: Vec::new(),
                })
                .collect(),
            sse: self.sse,
            transactional_backup: self.transactional_backup,
            parallelism: self.parallelism,
            time_before_delete: self.time_before_delete,
            scheduling_frequency: self.frequency,
            cron_expression: self.cron_expression.clone(),
            schedule_name: self.schedule_name.clone(),
        }
    }

    fn from_remote(schedule: &Schedule) -> Self {
        let params = &schedule.task_params;
        BackupScheduleConfig {
            universe_uuid: params.universe_uuid.clone().unwrap_or_default(),
            storage_config_uuid: params.storage_config_uuid.clone().unwrap_or_default(),
            keyspace: params
                .keyspace_list
                .iter()
                .find_map(|entry| entry.keyspace.clone()),
            backup_type: params.backup_type.clone(),
            sse: params.sse,
            transactional_backup: params.transactional_backup,
            parallelism: params.parallelism,
            time_before_delete: params.time_before_delete,
            // Cron schedules come back with a zero frequency
            frequency: schedule.frequency.filter(|f| *f > 0),
            cron_expression: schedule.cron_expression.clone().filter(|c| !c.is_empty()),
            schedule_name: schedule.schedule_name.clone(),
            status: schedule.status.clone(),
        }
    }

    fn to_edit(&self) -> EditBackupScheduleParams {
        EditBackupScheduleParams {
            frequency: self.frequency,
            cron_expression: self.cron_expression.clone(),
            status: ACTIVE.to_string(),
        }
    }
}

pub struct BackupScheduleType;

impl ResourceType for BackupScheduleType {
    fn name(&self) -> &'static str {
        RESOURCE_TYPE
    }

    fn schema(&self) -> ResourceSchema {
        let schema = ResourceSchema::new(RESOURCE_TYPE)
            .with_description("Scheduled Backup Resource")
            .attribute(
                AttributeSchema::new("universe_uuid", AttributeType::String)
                    .required()
                    .force_new()
                    .with_description("UUID of the universe to back up"),
            )
            .attribute(
                AttributeSchema::new("storage_config_uuid", AttributeType::String)
                    .required()
                    .force_new()
                    .with_description("UUID of the storage config to back up into"),
            )
            .attribute(
                AttributeSchema::new("keyspace", AttributeType::String)
                    .force_new()
                    .with_description("Keyspace to back up. All keyspaces when unset"),
            )
            .attribute(
                AttributeSchema::new(
                    "backup_type",
                    AttributeType::Enum(BACKUP_TYPES.iter().map(|t| t.to_string()).collect()),
                )
                .force_new(),
            )
            .attribute(
                AttributeSchema::new("sse", AttributeType::Bool)
                    .force_new()
                    .with_description("Server side encryption of the backup"),
            )
            .attribute(AttributeSchema::new("transactional_backup", AttributeType::Bool).force_new())
            .attribute(
                AttributeSchema::new("parallelism", types::positive_int())
                    .force_new()
                    .with_description("Number of concurrent commands to run on nodes"),
            )
            .attribute(
                AttributeSchema::new("time_before_delete", types::positive_int())
                    .force_new()
                    .with_description("Time in milliseconds before a backup is deleted"),
            )
            .attribute(
                AttributeSchema::new("frequency", types::positive_int())
                    .with_description("Interval between backups in milliseconds"),
            )
            .attribute(
                AttributeSchema::new("cron_expression", AttributeType::String)
                    .with_description("Cron expression scheduling the backups"),
            )
            .attribute(AttributeSchema::new("schedule_name", AttributeType::String).force_new())
            .attribute(AttributeSchema::new("status", AttributeType::String).computed());
        with_common_attributes(schema)
    }

    fn timeouts(&self) -> Timeouts {
        Timeouts::new(
            Duration::from_secs(5 * 60),
            Duration::from_secs(5 * 60),
            Duration::from_secs(5 * 60),
        )
    }

    fn validate_diff(
        &self,
        _old: Option<&HashMap<String, Value>>,
        new: &HashMap<String, Value>,
    ) -> Result<(), Vec<String>> {
        match (new.get("frequency"), new.get("cron_expression")) {
            (Some(_), None) | (None, Some(_)) => Ok(()),
            _ => Err(vec![
                "Exactly one of frequency or cron_expression must be set".to_string(),
            ]),
        }
    }
}

// =============================================================================
// Lifecycle
// =============================================================================

async fn check_version(ctx: &OperationContext) -> Result<(), ApiError> {
    let version = ctx.api.app_version().await?;
    ensure_min_version(&version, BACKUP_MIN_VERSION, "Scheduling backups")
}

pub async fn create(ctx: &OperationContext, resource: &Resource) -> Result<State, ApiError> {
    check_version(ctx).await?;

    let desired: BackupScheduleConfig = decode_attributes(RESOURCE_TYPE, &resource.attributes)?;
    let schedule = ctx.api.create_backup_schedule(&desired.to_request()).await?;
    let schedule_uuid = schedule
        .schedule_uuid
        .ok_or_else(|| ApiError::missing("Create backup schedule", "scheduleUUID"))?;
    debug!(
        "Created backup schedule {} for universe {}",
        schedule_uuid, desired.universe_uuid
    );

    let prior = State::existing(resource.id.clone(), resource.attributes.clone());
    read(ctx, &resource.id, &schedule_uuid, Some(&prior)).await
}

pub async fn read(
    ctx: &OperationContext,
    id: &ResourceId,
    identifier: &str,
    prior: Option<&State>,
) -> Result<State, ApiError> {
    let schedule = match ctx.api.get_schedule(identifier).await {
        Ok(schedule) => schedule,
        Err(e) if e.is_not_found() => return Ok(State::not_found(id.clone())),
        Err(e) => return Err(e),
    };

    let current = BackupScheduleConfig::from_remote(&schedule);
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
    check_version(ctx).await?;

    let desired: BackupScheduleConfig = decode_attributes(RESOURCE_TYPE, &to.attributes)?;
    ctx.api
        .edit_backup_schedule(identifier, &desired.to_edit())
        .await?;

    let prior = State::existing(to.id.clone(), to.attributes.clone());
    read(ctx, id, identifier, Some(&prior)).await
}

pub async fn delete(ctx: &OperationContext, identifier: &str) -> Result<(), ApiError> {
    match ctx.api.delete_backup_schedule(identifier).await {
        Ok(_) => Ok(()),
        Err(e) if e.is_not_found() => Ok(()),
        Err(e) => Err(e),
    }
}
