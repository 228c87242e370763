//! Universe update reconciliation
//!
//! The platform cannot apply an arbitrary edit to a universe in one call.
//! Changes are split into dedicated tasks (software, gflags, TLS, systemd,
//! node resize, cluster edit) issued one after the other; the universe is
//! fetched again after every task so each step starts from what the
//! platform actually holds.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use log::{debug, error, info};

use crate::client::CustomerApi;
use crate::error::ApiError;
use crate::models::{
    Cluster, ClusterType, GFlagsUpgradeParams, ResizeNodeParams, SoftwareUpgradeParams,
    SystemdUpgradeParams, TlsToggleParams, UniverseConfigureTaskParams, UniverseResp,
    UpgradeOption, UserIntent, YbpTask,
};
use crate::task::{TaskApi, wait_for_task};

/// Universe endpoints used by the update pipeline
#[async_trait]
pub trait UniverseApi: TaskApi {
    async fn fetch_universe(&self, universe_uuid: &str) -> Result<UniverseResp, ApiError>;

    async fn delete_read_replica(
        &self,
        universe_uuid: &str,
        cluster_uuid: &str,
        force_delete: bool,
    ) -> Result<YbpTask, ApiError>;

    async fn software_upgrade(
        &self,
        universe_uuid: &str,
        params: &SoftwareUpgradeParams,
    ) -> Result<YbpTask, ApiError>;

    async fn gflags_upgrade(
        &self,
        universe_uuid: &str,
        params: &GFlagsUpgradeParams,
    ) -> Result<YbpTask, ApiError>;

    async fn tls_toggle(
        &self,
        universe_uuid: &str,
        params: &TlsToggleParams,
    ) -> Result<YbpTask, ApiError>;

    async fn systemd_upgrade(
        &self,
        universe_uuid: &str,
        params: &SystemdUpgradeParams,
    ) -> Result<YbpTask, ApiError>;

    async fn node_resize(
        &self,
        universe_uuid: &str,
        params: &ResizeNodeParams,
    ) -> Result<YbpTask, ApiError>;

    async fn edit_primary_cluster(
        &self,
        universe_uuid: &str,
        params: &UniverseConfigureTaskParams,
    ) -> Result<YbpTask, ApiError>;

    async fn edit_read_replica(
        &self,
        universe_uuid: &str,
        params: &UniverseConfigureTaskParams,
    ) -> Result<YbpTask, ApiError>;
}

#[async_trait]
impl UniverseApi for CustomerApi {
    async fn fetch_universe(&self, universe_uuid: &str) -> Result<UniverseResp, ApiError> {
        self.get_universe(universe_uuid).await
    }

    async fn delete_read_replica(
        &self,
        universe_uuid: &str,
        cluster_uuid: &str,
        force_delete: bool,
    ) -> Result<YbpTask, ApiError> {
        self.delete_read_only_cluster(universe_uuid, cluster_uuid, force_delete)
            .await
    }

    async fn software_upgrade(
        &self,
        universe_uuid: &str,
        params: &SoftwareUpgradeParams,
    ) -> Result<YbpTask, ApiError> {
        self.upgrade_software(universe_uuid, params).await
    }

    async fn gflags_upgrade(
        &self,
        universe_uuid: &str,
        params: &GFlagsUpgradeParams,
    ) -> Result<YbpTask, ApiError> {
        self.upgrade_gflags(universe_uuid, params).await
    }

    async fn tls_toggle(
        &self,
        universe_uuid: &str,
        params: &TlsToggleParams,
    ) -> Result<YbpTask, ApiError> {
        self.upgrade_tls(universe_uuid, params).await
    }

    async fn systemd_upgrade(
        &self,
        universe_uuid: &str,
        params: &SystemdUpgradeParams,
    ) -> Result<YbpTask, ApiError> {
        self.upgrade_systemd(universe_uuid, params).await
    }

    async fn node_resize(
        &self,
        universe_uuid: &str,
        params: &ResizeNodeParams,
    ) -> Result<YbpTask, ApiError> {
        self.resize_node(universe_uuid, params).await
    }

    async fn edit_primary_cluster(
        &self,
        universe_uuid: &str,
        params: &UniverseConfigureTaskParams,
    ) -> Result<YbpTask, ApiError> {
        self.update_primary_cluster(universe_uuid, params).await
    }

    async fn edit_read_replica(
        &self,
        universe_uuid: &str,
        params: &UniverseConfigureTaskParams,
    ) -> Result<YbpTask, ApiError> {
        self.update_read_only_cluster(universe_uuid, params).await
    }
}

/// Platform task issued by the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UniverseOperation {
    DeleteReadOnlyCluster,
    UpgradeSoftware,
    UpgradeGFlags,
    UpgradeTls,
    UpgradeSystemd,
    ResizeNode,
    UpdatePrimaryCluster,
    UpdateReadOnlyCluster,
}

impl fmt::Display for UniverseOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            UniverseOperation::DeleteReadOnlyCluster => "DeleteReadOnlyCluster",
            UniverseOperation::UpgradeSoftware => "UpgradeSoftware",
            UniverseOperation::UpgradeGFlags => "UpgradeGFlags",
            UniverseOperation::UpgradeTls => "UpgradeTLS",
            UniverseOperation::UpgradeSystemd => "UpgradeSystemd",
            UniverseOperation::ResizeNode => "ResizeNode",
            UniverseOperation::UpdatePrimaryCluster => "UpdatePrimaryCluster",
            UniverseOperation::UpdateReadOnlyCluster => "UpdateReadOnlyCluster",
        };
        f.write_str(name)
    }
}

/// What an update did: the tasks it ran, in order, and the requested
/// changes it left alone.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpdateReport {
    pub issued: Vec<UniverseOperation>,
    pub ignored: Vec<String>,
}

// =============================================================================
// Step decisions
// =============================================================================

/// Decision of a single pipeline step for one cluster
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    Skip,
    Issue,
    Refuse(&'static str),
}

pub fn software_step(current: &UserIntent, target: &UserIntent) -> Step {
    if current.software_version() != target.software_version() {
        Step::Issue
    } else {
        Step::Skip
    }
}

pub fn gflags_step(current: &UserIntent, target: &UserIntent) -> Step {
    if current.master_gflags() != target.master_gflags()
        || current.tserver_gflags() != target.tserver_gflags()
    {
        Step::Issue
    } else {
        Step::Skip
    }
}

pub fn tls_step(current: &UserIntent, target: &UserIntent) -> Step {
    if current.node_to_node_encrypt() != target.node_to_node_encrypt()
        || current.client_to_node_encrypt() != target.client_to_node_encrypt()
    {
        Step::Issue
    } else {
        Step::Skip
    }
}

pub fn systemd_step(current: &UserIntent, target: &UserIntent) -> Step {
    match (current.systemd(), target.systemd()) {
        (false, true) => Step::Issue,
        (true, false) => Step::Refuse("Cannot disable Systemd"),
        _ => Step::Skip,
    }
}

/// Volumes grow in place only while the instance type stays the same
pub fn resize_step(current: &UserIntent, target: &UserIntent) -> Step {
    if current.instance_type() != target.instance_type()
        || current.volume_size() == target.volume_size()
    {
        Step::Skip
    } else if target.volume_size() > current.volume_size() {
        Step::Issue
    } else {
        Step::Refuse("Volume Size cannot be decreased")
    }
}

pub const NUM_VOLUMES_IGNORED: &str =
    "Cannot edit Number of Volumes per instance without an edit to Instance Type, Ignoring Change";
pub const VOLUME_SIZE_IGNORED: &str = "Cannot edit Volume size per instance without an edit to Instance Type, Ignoring Change for ReadOnly Cluster";

/// Logged after [`VOLUME_SIZE_IGNORED`] when a primary cluster update hits it
const VOLUME_RESIZE_NOTE: &str =
    "Above error is not for Primary Cluster. Node resize applied through a separate task";
pub const VOLUME_DECREASE_IGNORED: &str =
    "Cannot decrease volume size per instance, Ignoring Change";

/// Outcome of the cluster edit step
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EditPlan {
    /// Intent to send, `None` when nothing editable changed
    pub intent: Option<UserIntent>,
    pub ignored: Vec<&'static str>,
}

fn topology_changed(a: &UserIntent, b: &UserIntent) -> bool {
    a.instance_tags() != b.instance_tags()
        || a.region_list() != b.region_list()
        || a.num_nodes() != b.num_nodes()
        || a.instance_type() != b.instance_type()
        || a.num_volumes() != b.num_volumes()
        || a.volume_size() != b.volume_size()
}

/// Decide the intent of a cluster edit (tags, regions, node count,
/// instance type, volumes). Volume changes the platform cannot apply keep
/// the current value.
pub fn edit_parameters(current: &UserIntent, target: &UserIntent) -> EditPlan {
    if !topology_changed(current, target) {
        return EditPlan::default();
    }

    let mut intent = target.clone();
    let mut ignored = Vec::new();
    let current_device = current.device_info.clone().unwrap_or_default();

    if current.instance_type() == target.instance_type() {
        if current.num_volumes() != target.num_volumes() {
            ignored.push(NUM_VOLUMES_IGNORED);
            intent.set_num_volumes(current_device.num_volumes);
        }
        if current.volume_size() != target.volume_size() {
            ignored.push(VOLUME_SIZE_IGNORED);
            intent.set_volume_size(current_device.volume_size);
        }
    } else if target.volume_size() < current.volume_size() {
        ignored.push(VOLUME_DECREASE_IGNORED);
        intent.set_volume_size(current_device.volume_size);
    }

    EditPlan {
        intent: topology_changed(current, &intent).then_some(intent),
        ignored,
    }
}

// =============================================================================
// Pipeline
// =============================================================================

/// Bring the universe's clusters to the declared intents.
///
/// `declared` holds the configured intent of each cluster type; values it
/// leaves out keep their remote value. Every task wait gets the full
/// `timeout`.
pub async fn apply_cluster_changes<A: UniverseApi + ?Sized>(
    api: &A,
    universe_uuid: &str,
    declared: &[(ClusterType, UserIntent)],
    force_delete: bool,
    timeout: Duration,
    interval: Duration,
) -> Result<UpdateReport, ApiError> {
    let mut pipeline = Pipeline {
        api,
        universe_uuid,
        timeout,
        interval,
        report: UpdateReport::default(),
    };
    pipeline.run(declared, force_delete).await?;
    Ok(pipeline.report)
}

struct Pipeline<'a, A: ?Sized> {
    api: &'a A,
    universe_uuid: &'a str,
    timeout: Duration,
    interval: Duration,
    report: UpdateReport,
}

impl<A: UniverseApi + ?Sized> Pipeline<'_, A> {
    async fn run(
        &mut self,
        declared: &[(ClusterType, UserIntent)],
        force_delete: bool,
    ) -> Result<(), ApiError> {
        let mut universe = self.fetch().await?;

        if declared.len() > 2 {
            self.refuse("Cannot have more than 1 Read only cluster");
        }

        let declares_replica = declared.iter().any(|(t, _)| *t == ClusterType::Async);
        let remote_replica = universe
            .universe_details
            .cluster(ClusterType::Async)
            .map(|c| c.uuid.clone());
        match (declares_replica, remote_replica) {
            (false, Some(cluster_uuid)) => {
                let cluster_uuid =
                    cluster_uuid.ok_or_else(|| ApiError::missing("Get universe", "cluster uuid"))?;
                let task = self
                    .api
                    .delete_read_replica(self.universe_uuid, &cluster_uuid, force_delete)
                    .await?;
                self.finish(UniverseOperation::DeleteReadOnlyCluster, task)
                    .await?;
                universe = self.fetch().await?;
            }
            (true, None) => {
                self.refuse("Currently not supporting adding Read Replicas after universe creation")
            }
            _ => {}
        }

        for (cluster_type, declared_intent) in declared {
            let Some(remote) = universe.universe_details.cluster(*cluster_type) else {
                continue;
            };
            let target = remote
                .user_intent
                .overlay(declared_intent)
                .map_err(|e| ApiError::decode("Get universe", e))?;
            if target == remote.user_intent {
                debug!("No changes to the {} cluster", cluster_type);
                continue;
            }
            universe = match cluster_type {
                ClusterType::Primary => self.update_primary(universe, &target).await?,
                ClusterType::Async => self.update_read_replica(universe, &target).await?,
            };
        }
        Ok(())
    }

    async fn update_primary(
        &mut self,
        mut universe: UniverseResp,
        target: &UserIntent,
    ) -> Result<UniverseResp, ApiError> {
        let primary = ClusterType::Primary;

        if software_step(current_intent(&universe, primary)?, target) == Step::Issue {
            let params = SoftwareUpgradeParams {
                yb_software_version: target.software_version().to_string(),
                clusters: clusters_with(&universe, primary, |i| *i = target.clone()),
                upgrade_option: UpgradeOption::Rolling,
            };
            let task = self
                .api
                .software_upgrade(self.universe_uuid, &params)
                .await?;
            self.finish(UniverseOperation::UpgradeSoftware, task).await?;
            universe = self.fetch().await?;
        }

        if gflags_step(current_intent(&universe, primary)?, target) == Step::Issue {
            let params = GFlagsUpgradeParams {
                master_gflags: target.master_gflags(),
                tserver_gflags: target.tserver_gflags(),
                clusters: clusters_with(&universe, primary, |i| *i = target.clone()),
                upgrade_option: UpgradeOption::Rolling,
            };
            let task = self.api.gflags_upgrade(self.universe_uuid, &params).await?;
            self.finish(UniverseOperation::UpgradeGFlags, task).await?;
            universe = self.fetch().await?;
        }

        if tls_step(current_intent(&universe, primary)?, target) == Step::Issue {
            let params = TlsToggleParams {
                enable_client_to_node_encrypt: target.client_to_node_encrypt(),
                enable_node_to_node_encrypt: target.node_to_node_encrypt(),
                clusters: clusters_with(&universe, primary, |i| {
                    i.enable_client_to_node_encrypt = target.enable_client_to_node_encrypt;
                    i.enable_node_to_node_encrypt = target.enable_node_to_node_encrypt;
                }),
                upgrade_option: UpgradeOption::NonRolling,
            };
            let task = self.api.tls_toggle(self.universe_uuid, &params).await?;
            self.finish(UniverseOperation::UpgradeTls, task).await?;
            universe = self.fetch().await?;
        }

        match systemd_step(current_intent(&universe, primary)?, target) {
            Step::Issue => {
                let params = SystemdUpgradeParams {
                    clusters: clusters_with(&universe, primary, |i| *i = target.clone()),
                    upgrade_option: UpgradeOption::Rolling,
                };
                let task = self
                    .api
                    .systemd_upgrade(self.universe_uuid, &params)
                    .await?;
                self.finish(UniverseOperation::UpgradeSystemd, task).await?;
                universe = self.fetch().await?;
            }
            Step::Refuse(message) => self.refuse(message),
            Step::Skip => {}
        }

        match resize_step(current_intent(&universe, primary)?, target) {
            Step::Issue => {
                let volume_size = target.device_info.as_ref().and_then(|d| d.volume_size);
                let params = ResizeNodeParams {
                    upgrade_option: UpgradeOption::Rolling,
                    clusters: clusters_with(&universe, primary, |i| i.set_volume_size(volume_size)),
                    node_details_set: universe.universe_details.node_details_set.clone(),
                };
                let task = self.api.node_resize(self.universe_uuid, &params).await?;
                self.finish(UniverseOperation::ResizeNode, task).await?;
                universe = self.fetch().await?;
            }
            Step::Refuse(message) => self.refuse(message),
            Step::Skip => {}
        }

        let plan = edit_parameters(current_intent(&universe, primary)?, target);
        for message in &plan.ignored {
            self.refuse(message);
            if *message == VOLUME_SIZE_IGNORED {
                info!("{}", VOLUME_RESIZE_NOTE);
            }
        }
        if let Some(intent) = plan.intent {
            let params = self.configure_params(&universe, primary, intent);
            let task = self
                .api
                .edit_primary_cluster(self.universe_uuid, &params)
                .await?;
            self.finish(UniverseOperation::UpdatePrimaryCluster, task)
                .await?;
            universe = self.fetch().await?;
        }

        Ok(universe)
    }

    async fn update_read_replica(
        &mut self,
        mut universe: UniverseResp,
        target: &UserIntent,
    ) -> Result<UniverseResp, ApiError> {
        let replica = ClusterType::Async;
        let current = current_intent(&universe, replica)?.clone();

        if software_step(&current, target) == Step::Issue {
            self.note(
                "Software Upgrade is applied only via change in Primary Cluster User Intent, ignoring",
            );
        }
        if gflags_step(&current, target) == Step::Issue {
            self.note(
                "GFlags Upgrade is applied only via change in Primary Cluster User Intent, ignoring",
            );
        }
        if current.systemd() != target.systemd() {
            self.note(
                "System Upgrade is applied only via change in Primary Cluster User Intent, ignoring",
            );
        }
        if tls_step(&current, target) == Step::Issue {
            self.note(
                "TLS Toggle is applied only via change in Primary Cluster User Intent, ignoring",
            );
        }

        let plan = edit_parameters(&current, target);
        for message in &plan.ignored {
            self.refuse(message);
        }
        if let Some(intent) = plan.intent {
            let params = self.configure_params(&universe, replica, intent);
            let task = self
                .api
                .edit_read_replica(self.universe_uuid, &params)
                .await?;
            self.finish(UniverseOperation::UpdateReadOnlyCluster, task)
                .await?;
            universe = self.fetch().await?;
        }

        Ok(universe)
    }

    fn configure_params(
        &self,
        universe: &UniverseResp,
        cluster_type: ClusterType,
        intent: UserIntent,
    ) -> UniverseConfigureTaskParams {
        UniverseConfigureTaskParams {
            universe_uuid: Some(self.universe_uuid.to_string()),
            clusters: clusters_with(universe, cluster_type, |i| *i = intent),
            node_details_set: universe.universe_details.node_details_set.clone(),
            ..Default::default()
        }
    }

    async fn fetch(&self) -> Result<UniverseResp, ApiError> {
        self.api.fetch_universe(self.universe_uuid).await
    }

    async fn finish(&mut self, operation: UniverseOperation, task: YbpTask) -> Result<(), ApiError> {
        let task_uuid = task
            .task_uuid
            .ok_or_else(|| ApiError::missing(operation.to_string(), "taskUUID"))?;
        info!("{} task is executing", operation);
        wait_for_task(self.api, &task_uuid, self.timeout, self.interval).await?;
        self.report.issued.push(operation);
        Ok(())
    }

    /// A requested change the platform cannot apply
    fn refuse(&mut self, message: &str) {
        error!("{}", message);
        self.report.ignored.push(message.to_string());
    }

    /// A requested change that only takes effect through another cluster
    fn note(&mut self, message: &str) {
        info!("{}", message);
        self.report.ignored.push(message.to_string());
    }
}

fn current_intent(universe: &UniverseResp, cluster_type: ClusterType) -> Result<&UserIntent, ApiError> {
    universe
        .universe_details
        .cluster(cluster_type)
        .map(|c| &c.user_intent)
        .ok_or_else(|| {
            ApiError::missing(
                "Get universe",
                match cluster_type {
                    ClusterType::Primary => "PRIMARY cluster",
                    ClusterType::Async => "ASYNC cluster",
                },
            )
        })
}

/// The universe's clusters with the intent of `cluster_type` modified
fn clusters_with(
    universe: &UniverseResp,
    cluster_type: ClusterType,
    edit: impl FnOnce(&mut UserIntent),
) -> Vec<Cluster> {
    let mut clusters = universe.universe_details.clusters.clone();
    if let Some(cluster) = clusters.iter_mut().find(|c| c.cluster_type == cluster_type) {
        edit(&mut cluster.user_intent);
    }
    clusters
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{SubtaskFailure, TaskStatus};
    use serde_json::{Value, json};
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// In-memory platform that applies each task to its universe
    struct StubPlatform {
        universe: Mutex<UniverseResp>,
        calls: Mutex<Vec<(UniverseOperation, Value)>>,
        fetches: AtomicUsize,
        task_status: &'static str,
    }

    impl StubPlatform {
        fn new(universe: UniverseResp) -> Self {
            Self {
                universe: Mutex::new(universe),
                calls: Mutex::new(Vec::new()),
                fetches: AtomicUsize::new(0),
                task_status: "Success",
            }
        }

        fn record(&self, operation: UniverseOperation, body: Value) -> Result<YbpTask, ApiError> {
            self.calls.lock().unwrap().push((operation, body));
            Ok(YbpTask {
                task_uuid: Some(format!("t-{}", self.calls.lock().unwrap().len())),
                resource_uuid: None,
            })
        }

        fn apply_all(&self, edit: impl Fn(&mut UserIntent)) {
            let mut universe = self.universe.lock().unwrap();
            for cluster in universe.universe_details.clusters.iter_mut() {
                edit(&mut cluster.user_intent);
            }
        }

        fn apply_cluster(&self, cluster_type: ClusterType, clusters: &[Cluster]) {
            let Some(sent) = clusters.iter().find(|c| c.cluster_type == cluster_type) else {
                return;
            };
            let mut universe = self.universe.lock().unwrap();
            if let Some(cluster) = universe.universe_details.cluster_mut(cluster_type) {
                cluster.user_intent = sent.user_intent.clone();
            }
        }

        fn operations(&self) -> Vec<UniverseOperation> {
            self.calls.lock().unwrap().iter().map(|(op, _)| *op).collect()
        }

        fn body(&self, index: usize) -> Value {
            self.calls.lock().unwrap()[index].1.clone()
        }
    }

    #[async_trait]
    impl TaskApi for StubPlatform {
        async fn task_status(&self, _task_uuid: &str) -> Result<TaskStatus, ApiError> {
            Ok(TaskStatus {
                status: self.task_status.to_string(),
                percent: Some(100.0),
                title: None,
            })
        }

        async fn failed_subtasks(&self, _task_uuid: &str) -> Result<Vec<SubtaskFailure>, ApiError> {
            Ok(vec![SubtaskFailure {
                error_string: Some("node n1 unreachable".to_string()),
                sub_task_type: None,
            }])
        }
    }

    #[async_trait]
    impl UniverseApi for StubPlatform {
        async fn fetch_universe(&self, _universe_uuid: &str) -> Result<UniverseResp, ApiError> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            Ok(self.universe.lock().unwrap().clone())
        }

        async fn delete_read_replica(
            &self,
            _universe_uuid: &str,
            cluster_uuid: &str,
            force_delete: bool,
        ) -> Result<YbpTask, ApiError> {
            self.universe
                .lock()
                .unwrap()
                .universe_details
                .clusters
                .retain(|c| c.cluster_type != ClusterType::Async);
            self.record(
                UniverseOperation::DeleteReadOnlyCluster,
                json!({"cluster": cluster_uuid, "force": force_delete}),
            )
        }

        async fn software_upgrade(
            &self,
            _universe_uuid: &str,
            params: &SoftwareUpgradeParams,
        ) -> Result<YbpTask, ApiError> {
            let version = params.yb_software_version.clone();
            self.apply_all(|i| i.yb_software_version = Some(version.clone()));
            self.record(
                UniverseOperation::UpgradeSoftware,
                serde_json::to_value(params).unwrap(),
            )
        }

        async fn gflags_upgrade(
            &self,
            _universe_uuid: &str,
            params: &GFlagsUpgradeParams,
        ) -> Result<YbpTask, ApiError> {
            self.apply_all(|i| {
                i.master_gflags = Some(params.master_gflags.clone());
                i.tserver_gflags = Some(params.tserver_gflags.clone());
            });
            self.record(
                UniverseOperation::UpgradeGFlags,
                serde_json::to_value(params).unwrap(),
            )
        }

        async fn tls_toggle(
            &self,
            _universe_uuid: &str,
            params: &TlsToggleParams,
        ) -> Result<YbpTask, ApiError> {
            self.apply_all(|i| {
                i.enable_client_to_node_encrypt = Some(params.enable_client_to_node_encrypt);
                i.enable_node_to_node_encrypt = Some(params.enable_node_to_node_encrypt);
            });
            self.record(
                UniverseOperation::UpgradeTls,
                serde_json::to_value(params).unwrap(),
            )
        }

        async fn systemd_upgrade(
            &self,
            _universe_uuid: &str,
            params: &SystemdUpgradeParams,
        ) -> Result<YbpTask, ApiError> {
            self.apply_all(|i| i.use_systemd = Some(true));
            self.record(
                UniverseOperation::UpgradeSystemd,
                serde_json::to_value(params).unwrap(),
            )
        }

        async fn node_resize(
            &self,
            _universe_uuid: &str,
            params: &ResizeNodeParams,
        ) -> Result<YbpTask, ApiError> {
            self.apply_cluster(ClusterType::Primary, &params.clusters);
            self.record(
                UniverseOperation::ResizeNode,
                serde_json::to_value(params).unwrap(),
            )
        }

        async fn edit_primary_cluster(
            &self,
            _universe_uuid: &str,
            params: &UniverseConfigureTaskParams,
        ) -> Result<YbpTask, ApiError> {
            self.apply_cluster(ClusterType::Primary, &params.clusters);
            self.record(
                UniverseOperation::UpdatePrimaryCluster,
                serde_json::to_value(params).unwrap(),
            )
        }

        async fn edit_read_replica(
            &self,
            _universe_uuid: &str,
            params: &UniverseConfigureTaskParams,
        ) -> Result<YbpTask, ApiError> {
            self.apply_cluster(ClusterType::Async, &params.clusters);
            self.record(
                UniverseOperation::UpdateReadOnlyCluster,
                serde_json::to_value(params).unwrap(),
            )
        }
    }

    fn base_intent() -> Value {
        json!({
            "universeName": "app",
            "instanceType": "c5.large",
            "numNodes": 3,
            "ybSoftwareVersion": "2.18.0.0-b1",
            "useSystemd": false,
            "masterGFlags": {},
            "tserverGFlags": {},
            "deviceInfo": {"volumeSize": 100, "numVolumes": 1}
        })
    }

    fn universe(primary: Value, replica: Option<Value>) -> UniverseResp {
        let mut clusters = vec![json!({"uuid": "c-1", "clusterType": "PRIMARY", "userIntent": primary})];
        if let Some(replica) = replica {
            clusters.push(json!({"uuid": "c-2", "clusterType": "ASYNC", "userIntent": replica}));
        }
        serde_json::from_value(json!({
            "universeUUID": "u-1",
            "universeDetails": {"clusters": clusters, "nodeDetailsSet": [{"nodeName": "n1"}]}
        }))
        .unwrap()
    }

    fn intent(value: Value) -> UserIntent {
        serde_json::from_value(value).unwrap()
    }

    fn primary(value: Value) -> Vec<(ClusterType, UserIntent)> {
        vec![(ClusterType::Primary, intent(value))]
    }

    async fn run(
        platform: &StubPlatform,
        declared: Vec<(ClusterType, UserIntent)>,
        force_delete: bool,
    ) -> Result<UpdateReport, ApiError> {
        apply_cluster_changes(
            platform,
            "u-1",
            &declared,
            force_delete,
            Duration::from_secs(5),
            Duration::from_millis(1),
        )
        .await
    }

    #[tokio::test]
    async fn test_no_changes_issue_nothing() {
        let platform = StubPlatform::new(universe(base_intent(), None));
        let report = run(&platform, primary(json!({"numNodes": 3})), false)
            .await
            .unwrap();
        assert_eq!(report, UpdateReport::default());
        assert_eq!(platform.fetches.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_software_upgrade_is_rolling() {
        let platform = StubPlatform::new(universe(base_intent(), None));
        let report = run(
            &platform,
            primary(json!({"ybSoftwareVersion": "2.20.0.0-b50"})),
            false,
        )
        .await
        .unwrap();

        assert_eq!(report.issued, vec![UniverseOperation::UpgradeSoftware]);
        let body = platform.body(0);
        assert_eq!(body["ybSoftwareVersion"], json!("2.20.0.0-b50"));
        assert_eq!(body["upgradeOption"], json!("Rolling"));
        assert_eq!(
            body["clusters"][0]["userIntent"]["ybSoftwareVersion"],
            json!("2.20.0.0-b50")
        );
    }

    #[tokio::test]
    async fn test_gflags_upgrade() {
        let platform = StubPlatform::new(universe(base_intent(), None));
        let report = run(
            &platform,
            primary(json!({"tserverGFlags": {"ysql_max_connections": "400"}})),
            false,
        )
        .await
        .unwrap();

        assert_eq!(report.issued, vec![UniverseOperation::UpgradeGFlags]);
        let body = platform.body(0);
        assert_eq!(body["tserverGFlags"], json!({"ysql_max_connections": "400"}));
        assert_eq!(body["masterGFlags"], json!({}));
    }

    #[tokio::test]
    async fn test_tls_toggle_is_non_rolling_and_touches_only_tls() {
        let platform = StubPlatform::new(universe(base_intent(), None));
        let report = run(
            &platform,
            primary(json!({"enableNodeToNodeEncrypt": true, "numNodes": 5})),
            false,
        )
        .await
        .unwrap();

        assert_eq!(
            report.issued,
            vec![
                UniverseOperation::UpgradeTls,
                UniverseOperation::UpdatePrimaryCluster
            ]
        );
        let tls = platform.body(0);
        assert_eq!(tls["upgradeOption"], json!("Non-Rolling"));
        assert_eq!(tls["enableNodeToNodeEncrypt"], json!(true));
        assert_eq!(tls["enableClientToNodeEncrypt"], json!(false));
        assert_eq!(tls["clusters"][0]["userIntent"]["numNodes"], json!(3));

        let edit = platform.body(1);
        assert_eq!(edit["universeUUID"], json!("u-1"));
        assert_eq!(edit["clusters"][0]["userIntent"]["numNodes"], json!(5));
        assert_eq!(edit["nodeDetailsSet"], json!([{"nodeName": "n1"}]));
    }

    #[tokio::test]
    async fn test_systemd_can_only_be_enabled() {
        let platform = StubPlatform::new(universe(base_intent(), None));
        let report = run(&platform, primary(json!({"useSystemd": true})), false)
            .await
            .unwrap();
        assert_eq!(report.issued, vec![UniverseOperation::UpgradeSystemd]);

        let mut enabled = base_intent();
        enabled["useSystemd"] = json!(true);
        let platform = StubPlatform::new(universe(enabled, None));
        let report = run(&platform, primary(json!({"useSystemd": false})), false)
            .await
            .unwrap();
        assert!(report.issued.is_empty());
        assert_eq!(report.ignored, vec!["Cannot disable Systemd"]);
    }

    #[tokio::test]
    async fn test_volume_growth_resizes_nodes() {
        let platform = StubPlatform::new(universe(base_intent(), None));
        let report = run(
            &platform,
            primary(json!({"deviceInfo": {"volumeSize": 250}})),
            false,
        )
        .await
        .unwrap();

        assert_eq!(report.issued, vec![UniverseOperation::ResizeNode]);
        let body = platform.body(0);
        assert_eq!(body["upgradeOption"], json!("Rolling"));
        assert_eq!(
            body["clusters"][0]["userIntent"]["deviceInfo"],
            json!({"volumeSize": 250, "numVolumes": 1})
        );
        assert_eq!(body["nodeDetailsSet"], json!([{"nodeName": "n1"}]));
    }

    #[tokio::test]
    async fn test_volume_shrink_is_refused() {
        let platform = StubPlatform::new(universe(base_intent(), None));
        let report = run(
            &platform,
            primary(json!({"deviceInfo": {"volumeSize": 50}})),
            false,
        )
        .await
        .unwrap();

        assert!(report.issued.is_empty());
        assert_eq!(
            report.ignored,
            vec!["Volume Size cannot be decreased", VOLUME_SIZE_IGNORED]
        );
    }

    #[tokio::test]
    async fn test_num_volumes_needs_instance_type_change() {
        let platform = StubPlatform::new(universe(base_intent(), None));
        let report = run(
            &platform,
            primary(json!({"deviceInfo": {"numVolumes": 2}})),
            false,
        )
        .await
        .unwrap();
        assert!(report.issued.is_empty());
        assert_eq!(report.ignored, vec![NUM_VOLUMES_IGNORED]);

        let platform = StubPlatform::new(universe(base_intent(), None));
        let report = run(
            &platform,
            primary(json!({"instanceType": "c5.xlarge", "deviceInfo": {"numVolumes": 2, "volumeSize": 80}})),
            false,
        )
        .await
        .unwrap();
        assert_eq!(report.issued, vec![UniverseOperation::UpdatePrimaryCluster]);
        assert_eq!(report.ignored, vec![VOLUME_DECREASE_IGNORED]);
        let device = &platform.body(0)["clusters"][0]["userIntent"]["deviceInfo"];
        assert_eq!(device["numVolumes"], json!(2));
        assert_eq!(device["volumeSize"], json!(100));
    }

    #[tokio::test]
    async fn test_steps_run_in_order_with_refetch() {
        let platform = StubPlatform::new(universe(base_intent(), None));
        let report = run(
            &platform,
            primary(json!({
                "ybSoftwareVersion": "2.20.0.0-b50",
                "masterGFlags": {"a": "1"},
                "useSystemd": true,
                "numNodes": 6
            })),
            false,
        )
        .await
        .unwrap();

        assert_eq!(
            report.issued,
            vec![
                UniverseOperation::UpgradeSoftware,
                UniverseOperation::UpgradeGFlags,
                UniverseOperation::UpgradeSystemd,
                UniverseOperation::UpdatePrimaryCluster
            ]
        );
        assert_eq!(platform.operations(), report.issued);
        // initial fetch plus one after every task
        assert_eq!(platform.fetches.load(Ordering::SeqCst), 5);
    }

    #[tokio::test]
    async fn test_removed_read_replica_is_deleted() {
        let platform = StubPlatform::new(universe(base_intent(), Some(base_intent())));
        let report = run(&platform, primary(json!({})), true).await.unwrap();

        assert_eq!(report.issued, vec![UniverseOperation::DeleteReadOnlyCluster]);
        assert_eq!(platform.body(0), json!({"cluster": "c-2", "force": true}));
    }

    #[tokio::test]
    async fn test_adding_read_replica_is_refused() {
        let platform = StubPlatform::new(universe(base_intent(), None));
        let mut declared = primary(json!({}));
        declared.push((ClusterType::Async, intent(base_intent())));

        let report = run(&platform, declared, false).await.unwrap();
        assert!(report.issued.is_empty());
        assert_eq!(
            report.ignored,
            vec!["Currently not supporting adding Read Replicas after universe creation"]
        );
    }

    #[tokio::test]
    async fn test_read_replica_only_edits_topology() {
        let platform = StubPlatform::new(universe(base_intent(), Some(base_intent())));
        let declared = vec![
            (ClusterType::Primary, intent(json!({}))),
            (
                ClusterType::Async,
                intent(json!({"ybSoftwareVersion": "2.20.0.0-b50", "numNodes": 2})),
            ),
        ];

        let report = run(&platform, declared, false).await.unwrap();
        assert_eq!(report.issued, vec![UniverseOperation::UpdateReadOnlyCluster]);
        assert_eq!(
            report.ignored,
            vec![
                "Software Upgrade is applied only via change in Primary Cluster User Intent, ignoring"
            ]
        );
        let body = platform.body(0);
        assert_eq!(body["clusters"][1]["clusterType"], json!("ASYNC"));
        assert_eq!(body["clusters"][1]["userIntent"]["numNodes"], json!(2));
    }

    #[tokio::test]
    async fn test_failed_task_stops_the_pipeline() {
        let mut platform = StubPlatform::new(universe(base_intent(), None));
        platform.task_status = "Failure";
        let err = run(
            &platform,
            primary(json!({"ybSoftwareVersion": "2.20.0.0-b50", "numNodes": 6})),
            false,
        )
        .await
        .unwrap_err();

        assert!(err.to_string().contains("node n1 unreachable"));
        assert_eq!(platform.operations(), vec![UniverseOperation::UpgradeSoftware]);
    }

    #[test]
    fn test_edit_parameters_without_topology_change() {
        let current = intent(base_intent());
        let mut target = current.clone();
        target.yb_software_version = Some("2.20.0.0-b50".to_string());
        assert_eq!(edit_parameters(&current, &target), EditPlan::default());
    }

    #[test]
    fn test_resize_step_ignores_instance_type_changes() {
        let current = intent(base_intent());
        let mut target = current.clone();
        target.instance_type = Some("c5.xlarge".to_string());
        target.set_volume_size(Some(500));
        assert_eq!(resize_step(&current, &target), Step::Skip);
    }

    #[test]
    fn test_volume_resize_note_wording() {
        assert_eq!(
            VOLUME_RESIZE_NOTE,
            "Above error is not for Primary Cluster. Node resize applied through a separate task"
        );
    }
}
