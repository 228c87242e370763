//! Typed universe configuration
//!
//! The attribute tree of a universe is decoded once into these structs and
//! mapped to and from the platform's camelCase models.

use serde::{Deserialize, Serialize};

use crate::models::{
    Cluster, ClusterType, CommunicationPorts, DeleteUniverseOptions, DeviceInfo, PlacementAz,
    PlacementCloud, PlacementInfo, PlacementRegion, StringMap, UniverseConfigureTaskParams,
    UniverseResp, UserIntent,
};

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct UniverseConfig {
    pub delete_options: Option<DeleteOptionsConfig>,
    pub client_root_ca: Option<String>,
    #[serde(default)]
    pub clusters: Vec<ClusterConfig>,
    pub communication_ports: Option<PortsConfig>,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct DeleteOptionsConfig {
    pub delete_certs: Option<bool>,
    pub delete_backups: Option<bool>,
    pub force_delete: Option<bool>,
}

impl From<Option<DeleteOptionsConfig>> for DeleteUniverseOptions {
    fn from(options: Option<DeleteOptionsConfig>) -> Self {
        let options = options.unwrap_or_default();
        DeleteUniverseOptions {
            force_delete: options.force_delete.unwrap_or_default(),
            delete_backups: options.delete_backups.unwrap_or_default(),
            delete_certs: options.delete_certs.unwrap_or_default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClusterConfig {
    pub uuid: Option<String>,
    pub cluster_type: ClusterType,
    pub user_intent: UserIntentConfig,
    #[serde(default)]
    pub cloud_list: Vec<CloudConfig>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct UserIntentConfig {
    pub assign_static_ip: Option<bool>,
    pub aws_arn_string: Option<String>,
    pub enable_exposing_service: Option<String>,
    pub enable_ipv6: Option<bool>,
    pub enable_ycql: Option<bool>,
    pub enable_ycql_auth: Option<bool>,
    pub enable_ysql_auth: Option<bool>,
    pub instance_tags: Option<StringMap>,
    pub preferred_region: Option<String>,
    pub use_host_name: Option<bool>,
    pub use_systemd: Option<bool>,
    pub ysql_password: Option<String>,
    pub ycql_password: Option<String>,
    pub universe_name: Option<String>,
    pub provider_type: Option<String>,
    pub provider: Option<String>,
    pub region_list: Option<Vec<String>>,
    pub num_nodes: Option<i64>,
    pub replication_factor: Option<i64>,
    pub instance_type: Option<String>,
    pub device_info: Option<DeviceInfoConfig>,
    pub assign_public_ip: Option<bool>,
    pub use_time_sync: Option<bool>,
    pub enable_ysql: Option<bool>,
    pub enable_yedis: Option<bool>,
    pub enable_node_to_node_encrypt: Option<bool>,
    pub enable_client_to_node_encrypt: Option<bool>,
    pub enable_volume_encryption: Option<bool>,
    pub yb_software_version: Option<String>,
    pub access_key_code: Option<String>,
    pub tserver_gflags: Option<StringMap>,
    pub master_gflags: Option<StringMap>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct DeviceInfoConfig {
    pub disk_iops: Option<i64>,
    pub mount_points: Option<String>,
    pub storage_class: Option<String>,
    pub throughput: Option<i64>,
    pub num_volumes: Option<i64>,
    pub volume_size: Option<i64>,
    pub storage_type: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CloudConfig {
    pub uuid: Option<String>,
    pub code: Option<String>,
    #[serde(default)]
    pub region_list: Vec<RegionPlacementConfig>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RegionPlacementConfig {
    pub uuid: Option<String>,
    pub code: Option<String>,
    #[serde(default)]
    pub az_list: Vec<AzConfig>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AzConfig {
    pub uuid: Option<String>,
    pub is_affinitized: Option<bool>,
    pub name: Option<String>,
    pub num_nodes: Option<i64>,
    pub replication_factor: Option<i64>,
    pub secondary_subnet: Option<String>,
    pub subnet: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PortsConfig {
    pub master_http_port: Option<i64>,
    pub master_rpc_port: Option<i64>,
    pub node_exporter_port: Option<i64>,
    pub redis_server_http_port: Option<i64>,
    pub redis_server_rpc_port: Option<i64>,
    pub tserver_http_port: Option<i64>,
    pub tserver_rpc_port: Option<i64>,
    pub yql_server_http_port: Option<i64>,
    pub yql_server_rpc_port: Option<i64>,
    pub ysql_server_http_port: Option<i64>,
    pub ysql_server_rpc_port: Option<i64>,
}

// =============================================================================
// Configuration -> API
// =============================================================================

impl From<&UserIntentConfig> for UserIntent {
    fn from(intent: &UserIntentConfig) -> Self {
        UserIntent {
            assign_static_public_ip: intent.assign_static_ip,
            aws_arn_string: intent.aws_arn_string.clone(),
            enable_exposing_service: intent.enable_exposing_service.clone(),
            enable_ipv6: intent.enable_ipv6,
            enable_ycql: intent.enable_ycql,
            enable_ycql_auth: intent.enable_ycql_auth,
            enable_ysql_auth: intent.enable_ysql_auth,
            instance_tags: intent.instance_tags.clone(),
            preferred_region: intent.preferred_region.clone(),
            use_hostname: intent.use_host_name,
            use_systemd: intent.use_systemd,
            ysql_password: intent.ysql_password.clone(),
            ycql_password: intent.ycql_password.clone(),
            universe_name: intent.universe_name.clone(),
            provider_type: intent.provider_type.clone(),
            provider: intent.provider.clone(),
            region_list: intent.region_list.clone(),
            num_nodes: intent.num_nodes,
            replication_factor: intent.replication_factor,
            instance_type: intent.instance_type.clone(),
            device_info: intent.device_info.as_ref().map(DeviceInfo::from),
            assign_public_ip: intent.assign_public_ip,
            use_time_sync: intent.use_time_sync,
            enable_ysql: intent.enable_ysql,
            enable_yedis: intent.enable_yedis,
            enable_node_to_node_encrypt: intent.enable_node_to_node_encrypt,
            enable_client_to_node_encrypt: intent.enable_client_to_node_encrypt,
            enable_volume_encryption: intent.enable_volume_encryption,
            yb_software_version: intent.yb_software_version.clone(),
            access_key_code: intent.access_key_code.clone(),
            tserver_gflags: intent.tserver_gflags.clone(),
            master_gflags: intent.master_gflags.clone(),
            extra: serde_json::Map::new(),
        }
    }
}

impl From<&DeviceInfoConfig> for DeviceInfo {
    fn from(device: &DeviceInfoConfig) -> Self {
        DeviceInfo {
            disk_iops: device.disk_iops,
            mount_points: device.mount_points.clone(),
            storage_class: device.storage_class.clone(),
            throughput: device.throughput,
            num_volumes: device.num_volumes,
            volume_size: device.volume_size,
            storage_type: device.storage_type.clone(),
        }
    }
}

impl From<&CloudConfig> for PlacementCloud {
    fn from(cloud: &CloudConfig) -> Self {
        PlacementCloud {
            uuid: cloud.uuid.clone(),
            code: cloud.code.clone(),
            region_list: cloud
                .region_list
                .iter()
                .map(|region| PlacementRegion {
                    uuid: region.uuid.clone(),
                    code: region.code.clone(),
                    az_list: region.az_list.iter().map(PlacementAz::from).collect(),
                })
                .collect(),
        }
    }
}

impl From<&AzConfig> for PlacementAz {
    fn from(az: &AzConfig) -> Self {
        PlacementAz {
            uuid: az.uuid.clone(),
            is_affinitized: az.is_affinitized,
            name: az.name.clone(),
            num_nodes_in_az: az.num_nodes,
            replication_factor: az.replication_factor,
            secondary_subnet: az.secondary_subnet.clone(),
            subnet: az.subnet.clone(),
        }
    }
}

impl From<&PortsConfig> for CommunicationPorts {
    fn from(ports: &PortsConfig) -> Self {
        CommunicationPorts {
            master_http_port: ports.master_http_port,
            master_rpc_port: ports.master_rpc_port,
            node_exporter_port: ports.node_exporter_port,
            redis_server_http_port: ports.redis_server_http_port,
            redis_server_rpc_port: ports.redis_server_rpc_port,
            tserver_http_port: ports.tserver_http_port,
            tserver_rpc_port: ports.tserver_rpc_port,
            yql_server_http_port: ports.yql_server_http_port,
            yql_server_rpc_port: ports.yql_server_rpc_port,
            ysql_server_http_port: ports.ysql_server_http_port,
            ysql_server_rpc_port: ports.ysql_server_rpc_port,
        }
    }
}

impl ClusterConfig {
    pub fn to_cluster(&self) -> Cluster {
        let mut cluster = Cluster::new(self.cluster_type, UserIntent::from(&self.user_intent));
        if !self.cloud_list.is_empty() {
            cluster.placement_info = Some(PlacementInfo {
                cloud_list: self.cloud_list.iter().map(PlacementCloud::from).collect(),
            });
        }
        cluster
    }
}

impl UniverseConfig {
    /// Body of the create request
    pub fn to_create_params(&self) -> UniverseConfigureTaskParams {
        UniverseConfigureTaskParams {
            universe_uuid: None,
            clusters: self.clusters.iter().map(ClusterConfig::to_cluster).collect(),
            node_details_set: Vec::new(),
            client_root_ca: self.client_root_ca.clone(),
            communication_ports: self.communication_ports.as_ref().map(CommunicationPorts::from),
        }
    }

    /// Declared user intent of each cluster, in declaration order
    pub fn declared_intents(&self) -> Vec<(ClusterType, UserIntent)> {
        self.clusters
            .iter()
            .map(|c| (c.cluster_type, UserIntent::from(&c.user_intent)))
            .collect()
    }

    pub fn cluster(&self, cluster_type: ClusterType) -> Option<&ClusterConfig> {
        self.clusters.iter().find(|c| c.cluster_type == cluster_type)
    }
}

// =============================================================================
// API -> configuration
// =============================================================================

impl From<&UserIntent> for UserIntentConfig {
    fn from(intent: &UserIntent) -> Self {
        UserIntentConfig {
            assign_static_ip: intent.assign_static_public_ip,
            aws_arn_string: intent.aws_arn_string.clone(),
            enable_exposing_service: intent.enable_exposing_service.clone(),
            enable_ipv6: intent.enable_ipv6,
            enable_ycql: intent.enable_ycql,
            enable_ycql_auth: intent.enable_ycql_auth,
            enable_ysql_auth: intent.enable_ysql_auth,
            instance_tags: intent.instance_tags.clone(),
            preferred_region: intent.preferred_region.clone(),
            use_host_name: intent.use_hostname,
            use_systemd: intent.use_systemd,
            ysql_password: intent.ysql_password.clone(),
            ycql_password: intent.ycql_password.clone(),
            universe_name: intent.universe_name.clone(),
            provider_type: intent.provider_type.clone(),
            provider: intent.provider.clone(),
            region_list: intent.region_list.clone(),
            num_nodes: intent.num_nodes,
            replication_factor: intent.replication_factor,
            instance_type: intent.instance_type.clone(),
            device_info: intent.device_info.as_ref().map(|d| DeviceInfoConfig {
                disk_iops: d.disk_iops,
                mount_points: d.mount_points.clone(),
                storage_class: d.storage_class.clone(),
                throughput: d.throughput,
                num_volumes: d.num_volumes,
                volume_size: d.volume_size,
                storage_type: d.storage_type.clone(),
            }),
            assign_public_ip: intent.assign_public_ip,
            use_time_sync: intent.use_time_sync,
            enable_ysql: intent.enable_ysql,
            enable_yedis: intent.enable_yedis,
            enable_node_to_node_encrypt: intent.enable_node_to_node_encrypt,
            enable_client_to_node_encrypt: intent.enable_client_to_node_encrypt,
            enable_volume_encryption: intent.enable_volume_encryption,
            yb_software_version: intent.yb_software_version.clone(),
            access_key_code: intent.access_key_code.clone(),
            tserver_gflags: intent.tserver_gflags.clone(),
            master_gflags: intent.master_gflags.clone(),
        }
    }
}

impl From<&PlacementCloud> for CloudConfig {
    fn from(cloud: &PlacementCloud) -> Self {
        CloudConfig {
            uuid: cloud.uuid.clone(),
            code: cloud.code.clone(),
            region_list: cloud
                .region_list
                .iter()
                .map(|region| RegionPlacementConfig {
                    uuid: region.uuid.clone(),
                    code: region.code.clone(),
                    az_list: region
                        .az_list
                        .iter()
                        .map(|az| AzConfig {
                            uuid: az.uuid.clone(),
                            is_affinitized: az.is_affinitized,
                            name: az.name.clone(),
                            num_nodes: az.num_nodes_in_az,
                            replication_factor: az.replication_factor,
                            secondary_subnet: az.secondary_subnet.clone(),
                            subnet: az.subnet.clone(),
                        })
                        .collect(),
                })
                .collect(),
        }
    }
}

impl From<&CommunicationPorts> for PortsConfig {
    fn from(ports: &CommunicationPorts) -> Self {
        PortsConfig {
            master_http_port: ports.master_http_port,
            master_rpc_port: ports.master_rpc_port,
            node_exporter_port: ports.node_exporter_port,
            redis_server_http_port: ports.redis_server_http_port,
            redis_server_rpc_port: ports.redis_server_rpc_port,
            tserver_http_port: ports.tserver_http_port,
            tserver_rpc_port: ports.tserver_rpc_port,
            yql_server_http_port: ports.yql_server_http_port,
            yql_server_rpc_port: ports.yql_server_rpc_port,
            ysql_server_http_port: ports.ysql_server_http_port,
            ysql_server_rpc_port: ports.ysql_server_rpc_port,
        }
    }
}

impl From<&Cluster> for ClusterConfig {
    fn from(cluster: &Cluster) -> Self {
        ClusterConfig {
            uuid: cluster.uuid.clone(),
            cluster_type: cluster.cluster_type,
            user_intent: UserIntentConfig::from(&cluster.user_intent),
            cloud_list: cluster
                .placement_info
                .as_ref()
                .map(|p| p.cloud_list.iter().map(CloudConfig::from).collect())
                .unwrap_or_default(),
        }
    }
}

impl UniverseConfig {
    /// Flatten a fetched universe. Clusters follow `order` (the recorded
    /// declaration order) and fall back to PRIMARY first.
    pub fn from_remote(universe: &UniverseResp, order: &[ClusterType]) -> Self {
        let details = &universe.universe_details;
        let rank = |cluster_type: ClusterType| {
            order
                .iter()
                .position(|t| *t == cluster_type)
                .unwrap_or(match cluster_type {
                    ClusterType::Primary => order.len(),
                    ClusterType::Async => order.len() + 1,
                })
        };
        let mut clusters: Vec<ClusterConfig> =
            details.clusters.iter().map(ClusterConfig::from).collect();
        clusters.sort_by_key(|c| rank(c.cluster_type));

        UniverseConfig {
            delete_options: None,
            client_root_ca: details.client_root_ca.clone(),
            clusters,
            communication_ports: details.communication_ports.as_ref().map(PortsConfig::from),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn remote_universe() -> UniverseResp {
        serde_json::from_value(json!({
            "universeUUID": "u-1",
            "name": "app",
            "universeDetails": {
                "clientRootCA": "ca-1",
                "communicationPorts": {"masterHttpPort": 7000, "ysqlServerRpcPort": 5433},
                "clusters": [
                    {
                        "uuid": "c-2",
                        "clusterType": "ASYNC",
                        "userIntent": {"universeName": "app", "numNodes": 1}
                    },
                    {
                        "uuid": "c-1",
                        "clusterType": "PRIMARY",
                        "userIntent": {
                            "universeName": "app",
                            "numNodes": 3,
                            "useHostname": true,
                            "assignStaticPublicIP": false,
                            "deviceInfo": {"volumeSize": 375, "numVolumes": 1}
                        },
                        "placementInfo": {"cloudList": [{
                            "uuid": "p-1",
                            "code": "gcp",
                            "regionList": [{
                                "uuid": "r-1",
                                "code": "us-west1",
                                "azList": [{"uuid": "z-1", "name": "us-west1-a", "numNodesInAZ": 3}]
                            }]
                        }]}
                    }
                ]
            }
        }))
        .unwrap()
    }

    #[test]
    fn test_from_remote_orders_primary_first() {
        let config = UniverseConfig::from_remote(&remote_universe(), &[]);
        assert_eq!(config.clusters[0].cluster_type, ClusterType::Primary);
        assert_eq!(config.clusters[1].cluster_type, ClusterType::Async);
        assert_eq!(config.client_root_ca.as_deref(), Some("ca-1"));
        assert_eq!(
            config.communication_ports.as_ref().unwrap().master_http_port,
            Some(7000)
        );

        let primary = &config.clusters[0];
        assert_eq!(primary.user_intent.use_host_name, Some(true));
        assert_eq!(primary.user_intent.assign_static_ip, Some(false));
        let az = &primary.cloud_list[0].region_list[0].az_list[0];
        assert_eq!(az.num_nodes, Some(3));
    }

    #[test]
    fn test_from_remote_follows_recorded_order() {
        let config = UniverseConfig::from_remote(
            &remote_universe(),
            &[ClusterType::Async, ClusterType::Primary],
        );
        assert_eq!(config.clusters[0].cluster_type, ClusterType::Async);
    }

    #[test]
    fn test_create_params_use_platform_names() {
        let config: UniverseConfig = serde_json::from_value(json!({
            "clusters": [{
                "cluster_type": "PRIMARY",
                "user_intent": {
                    "universe_name": "app",
                    "use_host_name": true,
                    "num_nodes": 3,
                    "master_gflags": {"max_log_size": "256"},
                    "device_info": {"volume_size": 100, "num_volumes": 1}
                },
                "cloud_list": [{"code": "gcp", "region_list": [{"code": "us-west1", "az_list": [{"name": "us-west1-a", "num_nodes": 3}]}]}]
            }],
            "communication_ports": {"master_http_port": 7000}
        }))
        .unwrap();

        let params = serde_json::to_value(config.to_create_params()).unwrap();
        let cluster = &params["clusters"][0];
        assert_eq!(cluster["clusterType"], json!("PRIMARY"));
        assert_eq!(cluster["userIntent"]["useHostname"], json!(true));
        assert_eq!(cluster["userIntent"]["masterGFlags"]["max_log_size"], json!("256"));
        assert_eq!(cluster["userIntent"]["deviceInfo"]["volumeSize"], json!(100));
        assert_eq!(
            cluster["placementInfo"]["cloudList"][0]["regionList"][0]["azList"][0]["numNodesInAZ"],
            json!(3)
        );
        assert_eq!(params["communicationPorts"]["masterHttpPort"], json!(7000));
        assert!(params.get("universeUUID").is_none());
        assert!(params.get("nodeDetailsSet").is_none());
    }

    #[test]
    fn test_delete_options_default_to_false() {
        let options = DeleteUniverseOptions::from(None);
        assert_eq!(options, DeleteUniverseOptions::default());

        let options = DeleteUniverseOptions::from(Some(DeleteOptionsConfig {
            force_delete: Some(true),
            ..Default::default()
        }));
        assert!(options.force_delete);
        assert!(!options.delete_backups);
    }
}
