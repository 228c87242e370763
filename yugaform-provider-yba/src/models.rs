//! Request and response bodies of the YBA REST API
//!
//! Field names follow the platform's camelCase JSON. Everything the platform
//! may omit is an `Option`; unknown members of the cluster and user intent
//! objects are kept in `extra` so a fetched universe can be sent back in an
//! edit request without losing server-side settings.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

pub type StringMap = BTreeMap<String, String>;

// =============================================================================
// Session / tasks
// =============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct AppVersion {
    pub version: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SessionInfo {
    #[serde(rename = "customerUUID")]
    pub customer_uuid: Option<String>,
}

/// Response of every endpoint that starts a platform task
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct YbpTask {
    #[serde(rename = "taskUUID", default, skip_serializing_if = "Option::is_none")]
    pub task_uuid: Option<String>,
    #[serde(rename = "resourceUUID", default, skip_serializing_if = "Option::is_none")]
    pub resource_uuid: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TaskStatus {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub percent: Option<f64>,
    #[serde(default)]
    pub title: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FailedSubtasks {
    #[serde(default)]
    pub failed_sub_tasks: Vec<SubtaskFailure>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SubtaskFailure {
    #[serde(default)]
    pub error_string: Option<String>,
    #[serde(default)]
    pub sub_task_type: Option<String>,
}

// =============================================================================
// Cloud providers
// =============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Provider {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uuid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<StringMap>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub air_gap_install: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dest_vpc_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host_vpc_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host_vpc_region: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_pair_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ssh_port: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ssh_private_key_content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ssh_user: Option<String>,
    #[serde(default)]
    pub regions: Vec<Region>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Region {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uuid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub security_group_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vnet_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub yb_image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<StringMap>,
    #[serde(default)]
    pub zones: Vec<AvailabilityZone>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AvailabilityZone {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uuid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subnet: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secondary_subnet: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<StringMap>,
}

// =============================================================================
// Universes
// =============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UniverseResp {
    #[serde(rename = "universeUUID", default)]
    pub universe_uuid: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub universe_details: UniverseDetails,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UniverseDetails {
    #[serde(default)]
    pub clusters: Vec<Cluster>,
    #[serde(rename = "clientRootCA", default)]
    pub client_root_ca: Option<String>,
    #[serde(default)]
    pub communication_ports: Option<CommunicationPorts>,
    #[serde(default)]
    pub node_details_set: Vec<serde_json::Value>,
}

impl UniverseDetails {
    pub fn cluster(&self, cluster_type: ClusterType) -> Option<&Cluster> {
        self.clusters.iter().find(|c| c.cluster_type == cluster_type)
    }

    pub fn cluster_mut(&mut self, cluster_type: ClusterType) -> Option<&mut Cluster> {
        self.clusters
            .iter_mut()
            .find(|c| c.cluster_type == cluster_type)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ClusterType {
    Primary,
    Async,
}

impl ClusterType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClusterType::Primary => "PRIMARY",
            ClusterType::Async => "ASYNC",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "PRIMARY" => Some(ClusterType::Primary),
            "ASYNC" => Some(ClusterType::Async),
            _ => None,
        }
    }
}

impl fmt::Display for ClusterType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Cluster {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uuid: Option<String>,
    pub cluster_type: ClusterType,
    #[serde(default)]
    pub user_intent: UserIntent,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placement_info: Option<PlacementInfo>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Cluster {
    pub fn new(cluster_type: ClusterType, user_intent: UserIntent) -> Self {
        Self {
            uuid: None,
            cluster_type,
            user_intent,
            placement_info: None,
            extra: serde_json::Map::new(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UserIntent {
    #[serde(rename = "assignStaticPublicIP", default, skip_serializing_if = "Option::is_none")]
    pub assign_static_public_ip: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aws_arn_string: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enable_exposing_service: Option<String>,
    #[serde(rename = "enableIPV6", default, skip_serializing_if = "Option::is_none")]
    pub enable_ipv6: Option<bool>,
    #[serde(rename = "enableYCQL", default, skip_serializing_if = "Option::is_none")]
    pub enable_ycql: Option<bool>,
    #[serde(rename = "enableYCQLAuth", default, skip_serializing_if = "Option::is_none")]
    pub enable_ycql_auth: Option<bool>,
    #[serde(rename = "enableYSQLAuth", default, skip_serializing_if = "Option::is_none")]
    pub enable_ysql_auth: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instance_tags: Option<StringMap>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preferred_region: Option<String>,
    #[serde(rename = "useHostname", default, skip_serializing_if = "Option::is_none")]
    pub use_hostname: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub use_systemd: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ysql_password: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ycql_password: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub universe_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region_list: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub num_nodes: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replication_factor: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instance_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_info: Option<DeviceInfo>,
    #[serde(rename = "assignPublicIP", default, skip_serializing_if = "Option::is_none")]
    pub assign_public_ip: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub use_time_sync: Option<bool>,
    #[serde(rename = "enableYSQL", default, skip_serializing_if = "Option::is_none")]
    pub enable_ysql: Option<bool>,
    #[serde(rename = "enableYEDIS", default, skip_serializing_if = "Option::is_none")]
    pub enable_yedis: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enable_node_to_node_encrypt: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enable_client_to_node_encrypt: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enable_volume_encryption: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub yb_software_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_key_code: Option<String>,
    #[serde(rename = "tserverGFlags", default, skip_serializing_if = "Option::is_none")]
    pub tserver_gflags: Option<StringMap>,
    #[serde(rename = "masterGFlags", default, skip_serializing_if = "Option::is_none")]
    pub master_gflags: Option<StringMap>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Absent values compare as their zero value, the way the platform treats
/// them.
impl UserIntent {
    pub fn software_version(&self) -> &str {
        self.yb_software_version.as_deref().unwrap_or_default()
    }

    pub fn instance_type(&self) -> &str {
        self.instance_type.as_deref().unwrap_or_default()
    }

    pub fn systemd(&self) -> bool {
        self.use_systemd.unwrap_or_default()
    }

    pub fn node_to_node_encrypt(&self) -> bool {
        self.enable_node_to_node_encrypt.unwrap_or_default()
    }

    pub fn client_to_node_encrypt(&self) -> bool {
        self.enable_client_to_node_encrypt.unwrap_or_default()
    }

    pub fn master_gflags(&self) -> StringMap {
        self.master_gflags.clone().unwrap_or_default()
    }

    pub fn tserver_gflags(&self) -> StringMap {
        self.tserver_gflags.clone().unwrap_or_default()
    }

    pub fn instance_tags(&self) -> StringMap {
        self.instance_tags.clone().unwrap_or_default()
    }

    pub fn region_list(&self) -> &[String] {
        self.region_list.as_deref().unwrap_or_default()
    }

    pub fn num_nodes(&self) -> i64 {
        self.num_nodes.unwrap_or_default()
    }

    pub fn volume_size(&self) -> i64 {
        self.device_info
            .as_ref()
            .and_then(|d| d.volume_size)
            .unwrap_or_default()
    }

    pub fn num_volumes(&self) -> i64 {
        self.device_info
            .as_ref()
            .and_then(|d| d.num_volumes)
            .unwrap_or_default()
    }

    /// Lay the declared intent over this (remote) one.
    ///
    /// Every value the declaration carries wins; anything it leaves out keeps
    /// the remote value. `deviceInfo` merges field by field, maps and lists
    /// are replaced whole.
    pub fn overlay(&self, declared: &UserIntent) -> Result<UserIntent, serde_json::Error> {
        let mut base = serde_json::to_value(self)?;
        let top = serde_json::to_value(declared)?;
        if let (Some(base), serde_json::Value::Object(top)) = (base.as_object_mut(), top) {
            for (key, value) in top {
                match (base.get_mut(&key), value) {
                    (Some(serde_json::Value::Object(current)), serde_json::Value::Object(fields))
                        if key == "deviceInfo" =>
                    {
                        current.extend(fields);
                    }
                    (_, value) => {
                        base.insert(key, value);
                    }
                }
            }
        }
        serde_json::from_value(base)
    }

    pub fn set_volume_size(&mut self, volume_size: Option<i64>) {
        self.device_info.get_or_insert_with(DeviceInfo::default).volume_size = volume_size;
    }

    pub fn set_num_volumes(&mut self, num_volumes: Option<i64>) {
        self.device_info.get_or_insert_with(DeviceInfo::default).num_volumes = num_volumes;
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DeviceInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disk_iops: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mount_points: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_class: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub throughput: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub num_volumes: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volume_size: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_type: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PlacementInfo {
    #[serde(default)]
    pub cloud_list: Vec<PlacementCloud>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PlacementCloud {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uuid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(default)]
    pub region_list: Vec<PlacementRegion>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PlacementRegion {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uuid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(default)]
    pub az_list: Vec<PlacementAz>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PlacementAz {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uuid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_affinitized: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "numNodesInAZ", default, skip_serializing_if = "Option::is_none")]
    pub num_nodes_in_az: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replication_factor: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secondary_subnet: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subnet: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CommunicationPorts {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub master_http_port: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub master_rpc_port: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_exporter_port: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub redis_server_http_port: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub redis_server_rpc_port: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tserver_http_port: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tserver_rpc_port: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub yql_server_http_port: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub yql_server_rpc_port: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ysql_server_http_port: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ysql_server_rpc_port: Option<i64>,
}

/// Body of create and edit requests for universe clusters
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UniverseConfigureTaskParams {
    #[serde(rename = "universeUUID", default, skip_serializing_if = "Option::is_none")]
    pub universe_uuid: Option<String>,
    pub clusters: Vec<Cluster>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub node_details_set: Vec<serde_json::Value>,
    #[serde(rename = "clientRootCA", default, skip_serializing_if = "Option::is_none")]
    pub client_root_ca: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub communication_ports: Option<CommunicationPorts>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UpgradeOption {
    Rolling,
    #[serde(rename = "Non-Rolling")]
    NonRolling,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SoftwareUpgradeParams {
    pub yb_software_version: String,
    pub clusters: Vec<Cluster>,
    pub upgrade_option: UpgradeOption,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GFlagsUpgradeParams {
    #[serde(rename = "masterGFlags")]
    pub master_gflags: StringMap,
    #[serde(rename = "tserverGFlags")]
    pub tserver_gflags: StringMap,
    pub clusters: Vec<Cluster>,
    pub upgrade_option: UpgradeOption,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TlsToggleParams {
    pub enable_client_to_node_encrypt: bool,
    pub enable_node_to_node_encrypt: bool,
    pub clusters: Vec<Cluster>,
    pub upgrade_option: UpgradeOption,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SystemdUpgradeParams {
    pub clusters: Vec<Cluster>,
    pub upgrade_option: UpgradeOption,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ResizeNodeParams {
    pub upgrade_option: UpgradeOption,
    pub clusters: Vec<Cluster>,
    pub node_details_set: Vec<serde_json::Value>,
}

/// Query flags of a universe delete
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeleteUniverseOptions {
    pub force_delete: bool,
    pub delete_backups: bool,
    pub delete_certs: bool,
}

// =============================================================================
// Customer configs (storage)
// =============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CustomerConfig {
    #[serde(rename = "configUUID", default, skip_serializing_if = "Option::is_none")]
    pub config_uuid: Option<String>,
    #[serde(default)]
    pub config_name: String,
    #[serde(rename = "customerUUID", default, skip_serializing_if = "Option::is_none")]
    pub customer_uuid: Option<String>,
    #[serde(default)]
    pub data: BTreeMap<String, serde_json::Value>,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type", default)]
    pub config_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
}

// =============================================================================
// Backup schedules
// =============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct KeyspaceTable {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keyspace: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub table_name_list: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BackupScheduleParams {
    #[serde(rename = "storageConfigUUID")]
    pub storage_config_uuid: String,
    #[serde(rename = "universeUUID")]
    pub universe_uuid: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backup_type: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub keyspace_table_list: Vec<KeyspaceTable>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sse: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transactional_backup: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parallelism: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_before_delete: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scheduling_frequency: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cron_expression: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schedule_name: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Schedule {
    #[serde(rename = "scheduleUUID", default)]
    pub schedule_uuid: Option<String>,
    #[serde(default)]
    pub schedule_name: Option<String>,
    #[serde(default)]
    pub frequency: Option<i64>,
    #[serde(default)]
    pub cron_expression: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub task_params: ScheduleTaskParams,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleTaskParams {
    #[serde(rename = "storageConfigUUID", default)]
    pub storage_config_uuid: Option<String>,
    #[serde(rename = "universeUUID", default)]
    pub universe_uuid: Option<String>,
    #[serde(default)]
    pub backup_type: Option<String>,
    #[serde(default)]
    pub keyspace_list: Vec<KeyspaceTable>,
    #[serde(default)]
    pub sse: Option<bool>,
    #[serde(default)]
    pub transactional_backup: Option<bool>,
    #[serde(default)]
    pub parallelism: Option<i64>,
    #[serde(default)]
    pub time_before_delete: Option<i64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EditBackupScheduleParams {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frequency: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cron_expression: Option<String>,
    pub status: String,
}

// =============================================================================
// Releases
// =============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PackagePaths {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x86_64: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x86_64_checksum: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct S3Location {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub paths: PackagePaths,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GcsLocation {
    pub credentials_json: String,
    pub paths: PackagePaths,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct HttpLocation {
    pub paths: PackagePaths,
}

/// One entry of the release map, keyed by version on the wire
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ReleaseSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub s3: Option<S3Location>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gcs: Option<GcsLocation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub http: Option<HttpLocation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_tag: Option<String>,
}
