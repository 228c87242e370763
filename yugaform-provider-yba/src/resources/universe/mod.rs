//! universe resource
//!
//! A YugabyteDB universe: one PRIMARY cluster and at most one ASYNC read
//! replica. Creation and deletion are single platform tasks; edits go
//! through the multi-step pipeline in [`update`].

pub mod config;
pub mod update;
pub mod validation;

use std::collections::HashMap;
use std::time::Duration;

use log::{debug, warn};
use yugaform_core::provider::{ResourceType, Timeouts};
use yugaform_core::resource::{Resource, ResourceId, State, Value};
use yugaform_core::schema::{AttributeSchema, AttributeType, ResourceSchema, types};

use super::{
    OperationContext, carry_meta_attributes, decode_attributes, encode_attributes, string_list,
    string_map, with_common_attributes,
};
use crate::error::ApiError;
use crate::models::{ClusterType, DeleteUniverseOptions};
use crate::version::{UNIVERSE_MIN_VERSION, ensure_min_version};
use config::UniverseConfig;
use update::apply_cluster_changes;
use validation::validate_clusters;

pub const RESOURCE_TYPE: &str = "universe";

// =============================================================================
// Resource type
// =============================================================================

pub struct UniverseType;

fn device_info_schema() -> AttributeType {
    AttributeType::Struct {
        name: "DeviceInfo".to_string(),
        fields: vec![
            AttributeSchema::new("disk_iops", AttributeType::Int),
            AttributeSchema::new("mount_points", AttributeType::String),
            AttributeSchema::new("storage_class", AttributeType::String),
            AttributeSchema::new("throughput", AttributeType::Int),
            AttributeSchema::new("num_volumes", types::positive_int()),
            AttributeSchema::new("volume_size", types::positive_int()),
            AttributeSchema::new("storage_type", AttributeType::String),
        ],
    }
}

fn user_intent_schema() -> AttributeType {
    AttributeType::Struct {
        name: "UserIntent".to_string(),
        fields: vec![
            AttributeSchema::new("assign_static_ip", AttributeType::Bool),
            AttributeSchema::new("aws_arn_string", AttributeType::String),
            AttributeSchema::new("enable_exposing_service", AttributeType::String).computed(),
            AttributeSchema::new("enable_ipv6", AttributeType::Bool),
            AttributeSchema::new("enable_ycql", AttributeType::Bool).computed(),
            AttributeSchema::new("enable_ycql_auth", AttributeType::Bool),
            AttributeSchema::new("enable_ysql_auth", AttributeType::Bool),
            AttributeSchema::new("instance_tags", string_map()),
            AttributeSchema::new("preferred_region", AttributeType::String),
            AttributeSchema::new("use_host_name", AttributeType::Bool),
            AttributeSchema::new("use_systemd", AttributeType::Bool),
            AttributeSchema::new("ysql_password", AttributeType::String).sensitive(),
            AttributeSchema::new("ycql_password", AttributeType::String).sensitive(),
            AttributeSchema::new("universe_name", AttributeType::String),
            AttributeSchema::new("provider_type", AttributeType::String),
            AttributeSchema::new("provider", AttributeType::String)
                .with_description("UUID of the cloud provider hosting the cluster"),
            AttributeSchema::new("region_list", string_list()),
            AttributeSchema::new("num_nodes", types::positive_int()),
            AttributeSchema::new("replication_factor", types::positive_int()),
            AttributeSchema::new("instance_type", AttributeType::String),
            AttributeSchema::new("device_info", device_info_schema())
                .required()
                .with_description("Configuration values associated with the machines used for this universe"),
            AttributeSchema::new("assign_public_ip", AttributeType::Bool),
            AttributeSchema::new("use_time_sync", AttributeType::Bool),
            AttributeSchema::new("enable_ysql", AttributeType::Bool).computed(),
            AttributeSchema::new("enable_yedis", AttributeType::Bool).computed(),
            AttributeSchema::new("enable_node_to_node_encrypt", AttributeType::Bool),
            AttributeSchema::new("enable_client_to_node_encrypt", AttributeType::Bool),
            AttributeSchema::new("enable_volume_encryption", AttributeType::Bool),
            AttributeSchema::new("yb_software_version", AttributeType::String),
            AttributeSchema::new("access_key_code", AttributeType::String),
            AttributeSchema::new("tserver_gflags", string_map()),
            AttributeSchema::new("master_gflags", string_map()),
        ],
    }
}

fn cloud_list_schema() -> AttributeType {
    let az = AttributeType::Struct {
        name: "PlacementAz".to_string(),
        fields: vec![
            AttributeSchema::new("uuid", AttributeType::String),
            AttributeSchema::new("is_affinitized", AttributeType::Bool),
            AttributeSchema::new("name", AttributeType::String),
            AttributeSchema::new("num_nodes", AttributeType::Int),
            AttributeSchema::new("replication_factor", AttributeType::Int),
            AttributeSchema::new("secondary_subnet", AttributeType::String),
            AttributeSchema::new("subnet", AttributeType::String),
        ],
    };
    let region = AttributeType::Struct {
        name: "PlacementRegion".to_string(),
        fields: vec![
            AttributeSchema::new("uuid", AttributeType::String),
            AttributeSchema::new("code", AttributeType::String),
            AttributeSchema::new("az_list", AttributeType::List(Box::new(az))),
        ],
    };
    AttributeType::List(Box::new(AttributeType::Struct {
        name: "PlacementCloud".to_string(),
        fields: vec![
            AttributeSchema::new("uuid", AttributeType::String),
            AttributeSchema::new("code", AttributeType::String),
            AttributeSchema::new("region_list", AttributeType::List(Box::new(region))),
        ],
    }))
}

fn cluster_schema() -> AttributeType {
    AttributeType::Struct {
        name: "Cluster".to_string(),
        fields: vec![
            AttributeSchema::new("uuid", AttributeType::String).computed(),
            AttributeSchema::new(
                "cluster_type",
                AttributeType::Enum(vec!["PRIMARY".to_string(), "ASYNC".to_string()]),
            )
            .required()
            .with_description("The type of cluster: PRIMARY or ASYNC"),
            AttributeSchema::new("user_intent", user_intent_schema())
                .required()
                .with_description("Configuration values used in universe creation"),
            AttributeSchema::new("cloud_list", cloud_list_schema()).computed(),
        ],
    }
}

fn communication_ports_schema() -> AttributeType {
    let ports = [
        "master_http_port",
        "master_rpc_port",
        "node_exporter_port",
        "redis_server_http_port",
        "redis_server_rpc_port",
        "tserver_http_port",
        "tserver_rpc_port",
        "yql_server_http_port",
        "yql_server_rpc_port",
        "ysql_server_http_port",
        "ysql_server_rpc_port",
    ];
    AttributeType::Struct {
        name: "CommunicationPorts".to_string(),
        fields: ports
            .into_iter()
            .map(|name| AttributeSchema::new(name, types::port()))
            .collect(),
    }
}

fn delete_options_schema() -> AttributeType {
    AttributeType::Struct {
        name: "DeleteOptions".to_string(),
        fields: vec![
            AttributeSchema::new("delete_certs", AttributeType::Bool)
                .with_description("Delete certificates associated with the universe"),
            AttributeSchema::new("delete_backups", AttributeType::Bool)
                .with_description("Delete backups of the universe"),
            AttributeSchema::new("force_delete", AttributeType::Bool)
                .with_description("Force delete the universe"),
        ],
    }
}

impl ResourceType for UniverseType {
    fn name(&self) -> &'static str {
        RESOURCE_TYPE
    }

    fn schema(&self) -> ResourceSchema {
        let schema = ResourceSchema::new(RESOURCE_TYPE)
            .with_description("Universe Resource")
            .attribute(
                AttributeSchema::new("delete_options", delete_options_schema())
                    .with_description("Options applied when the universe is deleted"),
            )
            .attribute(
                AttributeSchema::new("client_root_ca", AttributeType::String)
                    .computed()
                    .with_description("UUID of the client root CA certificate"),
            )
            .attribute(
                AttributeSchema::new("clusters", AttributeType::List(Box::new(cluster_schema())))
                    .required()
                    .with_description("The PRIMARY cluster and an optional ASYNC read replica"),
            )
            .attribute(
                AttributeSchema::new("communication_ports", communication_ports_schema())
                    .computed()
                    .with_description("Communication ports of the universe's processes"),
            );
        with_common_attributes(schema)
    }

    fn timeouts(&self) -> Timeouts {
        Timeouts::new(
            Duration::from_secs(60 * 60),
            Duration::from_secs(60 * 60),
            Duration::from_secs(30 * 60),
        )
    }

    fn validate_diff(
        &self,
        old: Option<&HashMap<String, Value>>,
        new: &HashMap<String, Value>,
    ) -> Result<(), Vec<String>> {
        // Malformed attributes are reported by schema validation
        let Ok(desired) = decode_attributes::<UniverseConfig>(RESOURCE_TYPE, new) else {
            return Ok(());
        };
        let recorded =
            old.and_then(|o| decode_attributes::<UniverseConfig>(RESOURCE_TYPE, o).ok());

        let errors = validate_clusters(
            recorded.as_ref().map(|r| r.clusters.as_slice()),
            &desired.clusters,
        );
        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }
}

// =============================================================================
// Lifecycle
// =============================================================================

pub async fn create(ctx: &OperationContext, resource: &Resource) -> Result<State, ApiError> {
    let version = ctx.api.app_version().await?;
    ensure_min_version(&version, UNIVERSE_MIN_VERSION, "Creating universes")?;

    let desired: UniverseConfig = decode_attributes(RESOURCE_TYPE, &resource.attributes)?;
    let task = ctx.api.create_all_clusters(&desired.to_create_params()).await?;
    let universe_uuid = task
        .resource_uuid
        .clone()
        .ok_or_else(|| ApiError::missing("Create universe", "resourceUUID"))?;
    let task_uuid = task
        .task_uuid
        .ok_or_else(|| ApiError::missing("Create universe", "taskUUID"))?;

    debug!("Waiting for universe {} to be active", universe_uuid);
    ctx.wait(&task_uuid, ctx.timeouts.create).await?;

    let prior = State::existing(resource.id.clone(), resource.attributes.clone());
    read(ctx, &resource.id, &universe_uuid, Some(&prior)).await
}

pub async fn read(
    ctx: &OperationContext,
    id: &ResourceId,
    identifier: &str,
    prior: Option<&State>,
) -> Result<State, ApiError> {
    let universe = match ctx.api.get_universe(identifier).await {
        Ok(universe) => universe,
        Err(e) if e.is_not_found() => return Ok(State::not_found(id.clone())),
        Err(e) => return Err(e),
    };

    let recorded: Option<UniverseConfig> = prior
        .map(|p| decode_attributes(RESOURCE_TYPE, &p.attributes))
        .transpose()?;
    let order: Vec<ClusterType> = recorded
        .iter()
        .flat_map(|r| r.clusters.iter().map(|c| c.cluster_type))
        .collect();

    let mut current = UniverseConfig::from_remote(&universe, &order);
    if let Some(recorded) = &recorded {
        current.delete_options = recorded.delete_options;
        // Passwords are write-only
        for cluster in current.clusters.iter_mut() {
            if let Some(declared) = recorded.cluster(cluster.cluster_type) {
                let intent = &mut cluster.user_intent;
                intent.ysql_password = intent
                    .ysql_password
                    .take()
                    .or_else(|| declared.user_intent.ysql_password.clone());
                intent.ycql_password = intent
                    .ycql_password
                    .take()
                    .or_else(|| declared.user_intent.ycql_password.clone());
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
    let version = ctx.api.app_version().await?;
    ensure_min_version(&version, UNIVERSE_MIN_VERSION, "Editing universes")?;

    let desired: UniverseConfig = decode_attributes(RESOURCE_TYPE, &to.attributes)?;
    let force_delete = DeleteUniverseOptions::from(desired.delete_options).force_delete;
    let report = apply_cluster_changes(
        &ctx.api,
        identifier,
        &desired.declared_intents(),
        force_delete,
        ctx.timeouts.update,
        ctx.poll_interval,
    )
    .await?;

    debug!(
        "Universe {} updated with {} task(s)",
        identifier,
        report.issued.len()
    );
    if !report.ignored.is_empty() {
        warn!(
            "Universe {}: {} requested change(s) were not applied",
            identifier,
            report.ignored.len()
        );
    }

    let prior = State::existing(to.id.clone(), to.attributes.clone());
    read(ctx, id, identifier, Some(&prior)).await
}

pub async fn delete(ctx: &OperationContext, identifier: &str, from: &State) -> Result<(), ApiError> {
    let recorded: UniverseConfig = decode_attributes(RESOURCE_TYPE, &from.attributes)?;
    let options = DeleteUniverseOptions::from(recorded.delete_options);

    let task = match ctx.api.delete_universe(identifier, options).await {
        Ok(task) => task,
        Err(e) if e.is_not_found() => {
            debug!("Universe {} is already gone", identifier);
            return Ok(());
        }
        Err(e) => return Err(e),
    };
    debug!("Waiting for universe {} to be deleted", identifier);
    ctx.wait_if_started(&task, ctx.timeouts.delete).await
}
