//! Typed REST bindings for the YBA platform
//!
//! [`YbaClient`] holds the base URL and the shared HTTP connection pool.
//! [`CustomerApi`] scopes it to one customer and API token; every lifecycle
//! call builds its own `CustomerApi` so no request state is shared.

use std::collections::BTreeMap;

use async_trait::async_trait;
use reqwest::RequestBuilder;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::ApiError;
use crate::models::*;
use crate::task::TaskApi;

type Result<T> = std::result::Result<T, ApiError>;

/// Header carrying the customer API token
pub const AUTH_HEADER: &str = "X-AUTH-YW-API-TOKEN";

#[derive(Debug, Clone)]
pub struct YbaClient {
    base_url: String,
    http: reqwest::Client,
}

impl YbaClient {
    /// Client for `host` (`name[:port]`). A host that already carries a
    /// scheme is used as is.
    pub fn new(host: &str, use_secure: bool) -> Result<Self> {
        let host = host.trim_end_matches('/');
        if host.is_empty() {
            return Err(ApiError::InvalidConfig("Platform host is empty".to_string()));
        }
        let base_url = if host.starts_with("http://") || host.starts_with("https://") {
            host.to_string()
        } else if use_secure {
            format!("https://{}", host)
        } else {
            format!("http://{}", host)
        };
        Ok(Self::with_base_url(base_url))
    }

    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            http: reqwest::Client::new(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Scope the client to one customer
    pub fn customer(&self, customer_uuid: impl Into<String>, api_token: impl Into<String>) -> CustomerApi {
        CustomerApi {
            client: self.clone(),
            customer_uuid: customer_uuid.into(),
            api_token: api_token.into(),
        }
    }

    pub async fn session_info(&self, api_token: &str) -> Result<SessionInfo> {
        let builder = self.http.get(self.build_url("/api/v1/session_info"));
        self.send("Get session info", builder, api_token).await
    }

    /// Build a full URL from a path.
    fn build_url(&self, path: &str) -> String {
        self.base_url.to_owned() + path
    }

    async fn send<T: DeserializeOwned>(
        &self,
        operation: &str,
        builder: RequestBuilder,
        api_token: &str,
    ) -> Result<T> {
        let response = builder.header(AUTH_HEADER, api_token).send().await?;
        let status = response.status();
        let body = response.bytes().await?;
        if !status.is_success() {
            return Err(ApiError::http(
                operation,
                status,
                &String::from_utf8_lossy(&body),
            ));
        }
        serde_json::from_slice(&body).map_err(|e| ApiError::decode(operation, e))
    }
}

/// Platform API scoped to one customer
#[derive(Debug, Clone)]
pub struct CustomerApi {
    client: YbaClient,
    customer_uuid: String,
    api_token: String,
}

impl CustomerApi {
    pub fn customer_uuid(&self) -> &str {
        &self.customer_uuid
    }

    fn url(&self, path: &str) -> String {
        self.client
            .build_url(&format!("/api/v1/customers/{}{}", self.customer_uuid, path))
    }

    async fn get<T: DeserializeOwned>(&self, operation: &str, path: &str) -> Result<T> {
        let builder = self.client.http.get(self.url(path));
        self.client.send(operation, builder, &self.api_token).await
    }

    async fn post<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        operation: &str,
        path: &str,
        body: &B,
    ) -> Result<T> {
        let builder = self.client.http.post(self.url(path)).json(body);
        self.client.send(operation, builder, &self.api_token).await
    }

    async fn put<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        operation: &str,
        path: &str,
        body: &B,
    ) -> Result<T> {
        let builder = self.client.http.put(self.url(path)).json(body);
        self.client.send(operation, builder, &self.api_token).await
    }

    async fn delete<T: DeserializeOwned>(
        &self,
        operation: &str,
        path: &str,
        query: &[(&str, bool)],
    ) -> Result<T> {
        let builder = self.client.http.delete(self.url(path)).query(query);
        self.client.send(operation, builder, &self.api_token).await
    }

    // =========================================================================
    // Platform
    // =========================================================================

    /// Version string of the platform, e.g. `2.18.1.0-b84`
    pub async fn app_version(&self) -> Result<String> {
        let builder = self.client.http.get(self.client.build_url("/api/v1/app_version"));
        let version: AppVersion = self
            .client
            .send("Get platform version", builder, &self.api_token)
            .await?;
        Ok(version.version)
    }

    pub async fn get_task(&self, task_uuid: &str) -> Result<TaskStatus> {
        self.get("Get task", &format!("/tasks/{}", task_uuid)).await
    }

    pub async fn get_failed_subtasks(&self, task_uuid: &str) -> Result<FailedSubtasks> {
        self.get("Get failed subtasks", &format!("/tasks/{}/failed", task_uuid))
            .await
    }

    // =========================================================================
    // Cloud providers
    // =========================================================================

    pub async fn create_provider(&self, provider: &Provider) -> Result<YbpTask> {
        self.post("Create provider", "/providers", provider).await
    }

    pub async fn list_providers(&self) -> Result<Vec<Provider>> {
        self.get("List providers", "/providers").await
    }

    pub async fn delete_provider(&self, provider_uuid: &str) -> Result<YbpTask> {
        self.delete(
            "Delete provider",
            &format!("/providers/{}", provider_uuid),
            &[],
        )
        .await
    }

    // =========================================================================
    // Universes
    // =========================================================================

    pub async fn create_all_clusters(&self, params: &UniverseConfigureTaskParams) -> Result<YbpTask> {
        self.post("Create universe", "/universes/clusters", params)
            .await
    }

    pub async fn get_universe(&self, universe_uuid: &str) -> Result<UniverseResp> {
        self.get("Get universe", &format!("/universes/{}", universe_uuid))
            .await
    }

    pub async fn delete_universe(
        &self,
        universe_uuid: &str,
        options: DeleteUniverseOptions,
    ) -> Result<YbpTask> {
        self.delete(
            "Delete universe",
            &format!("/universes/{}", universe_uuid),
            &[
                ("isForceDelete", options.force_delete),
                ("isDeleteBackups", options.delete_backups),
                ("isDeleteAssociatedCerts", options.delete_certs),
            ],
        )
        .await
    }

    pub async fn update_primary_cluster(
        &self,
        universe_uuid: &str,
        params: &UniverseConfigureTaskParams,
    ) -> Result<YbpTask> {
        self.put(
            "Update primary cluster",
            &format!("/universes/{}/clusters/primary", universe_uuid),
            params,
        )
        .await
    }

    pub async fn update_read_only_cluster(
        &self,
        universe_uuid: &str,
        params: &UniverseConfigureTaskParams,
    ) -> Result<YbpTask> {
        self.put(
            "Update read replica cluster",
            &format!("/universes/{}/clusters/read_only", universe_uuid),
            params,
        )
        .await
    }

    pub async fn delete_read_only_cluster(
        &self,
        universe_uuid: &str,
        cluster_uuid: &str,
        force_delete: bool,
    ) -> Result<YbpTask> {
        self.delete(
            "Delete read replica cluster",
            &format!(
                "/universes/{}/clusters/read_only/{}",
                universe_uuid, cluster_uuid
            ),
            &[("isForceDelete", force_delete)],
        )
        .await
    }

    pub async fn upgrade_software(
        &self,
        universe_uuid: &str,
        params: &SoftwareUpgradeParams,
    ) -> Result<YbpTask> {
        self.post(
            "Upgrade software",
            &format!("/universes/{}/upgrade/software", universe_uuid),
            params,
        )
        .await
    }

    pub async fn upgrade_gflags(
        &self,
        universe_uuid: &str,
        params: &GFlagsUpgradeParams,
    ) -> Result<YbpTask> {
        self.post(
            "Upgrade gflags",
            &format!("/universes/{}/upgrade/gflags", universe_uuid),
            params,
        )
        .await
    }

    pub async fn upgrade_tls(&self, universe_uuid: &str, params: &TlsToggleParams) -> Result<YbpTask> {
        self.post(
            "Toggle TLS",
            &format!("/universes/{}/upgrade/tls", universe_uuid),
            params,
        )
        .await
    }

    pub async fn upgrade_systemd(
        &self,
        universe_uuid: &str,
        params: &SystemdUpgradeParams,
    ) -> Result<YbpTask> {
        self.post(
            "Upgrade systemd",
            &format!("/universes/{}/upgrade/systemd", universe_uuid),
            params,
        )
        .await
    }

    pub async fn resize_node(&self, universe_uuid: &str, params: &ResizeNodeParams) -> Result<YbpTask> {
        self.post(
            "Resize nodes",
            &format!("/universes/{}/upgrade/resize_node", universe_uuid),
            params,
        )
        .await
    }

    // =========================================================================
    // Customer configs
    // =========================================================================

    pub async fn create_customer_config(&self, config: &CustomerConfig) -> Result<CustomerConfig> {
        self.post("Create customer config", "/configs", config).await
    }

    pub async fn list_customer_configs(&self) -> Result<Vec<CustomerConfig>> {
        self.get("List customer configs", "/configs").await
    }

    pub async fn edit_customer_config(
        &self,
        config_uuid: &str,
        config: &CustomerConfig,
    ) -> Result<CustomerConfig> {
        self.put(
            "Edit customer config",
            &format!("/configs/{}", config_uuid),
            config,
        )
        .await
    }

    pub async fn delete_customer_config(&self, config_uuid: &str) -> Result<serde_json::Value> {
        self.delete(
            "Delete customer config",
            &format!("/configs/{}", config_uuid),
            &[],
        )
        .await
    }

    // =========================================================================
    // Backup schedules
    // =========================================================================

    pub async fn create_backup_schedule(&self, params: &BackupScheduleParams) -> Result<Schedule> {
        self.post("Create backup schedule", "/create_backup_schedule", params)
            .await
    }

    pub async fn get_schedule(&self, schedule_uuid: &str) -> Result<Schedule> {
        self.get("Get schedule", &format!("/schedules/{}", schedule_uuid))
            .await
    }

    pub async fn edit_backup_schedule(
        &self,
        schedule_uuid: &str,
        params: &EditBackupScheduleParams,
    ) -> Result<Schedule> {
        self.put(
            "Edit backup schedule",
            &format!("/schedules/{}/update_backup_schedule", schedule_uuid),
            params,
        )
        .await
    }

    pub async fn delete_backup_schedule(&self, schedule_uuid: &str) -> Result<serde_json::Value> {
        self.delete(
            "Delete backup schedule",
            &format!("/schedules/{}/delete_backup_schedule", schedule_uuid),
            &[],
        )
        .await
    }

    // =========================================================================
    // Releases
    // =========================================================================

    pub async fn create_release(&self, version: &str, spec: &ReleaseSpec) -> Result<serde_json::Value> {
        let body = BTreeMap::from([(version, spec)]);
        self.post("Create release", "/releases", &body).await
    }

    pub async fn list_releases(&self) -> Result<BTreeMap<String, ReleaseSpec>> {
        self.get("List releases", "/releases").await
    }

    pub async fn delete_release(&self, version: &str) -> Result<serde_json::Value> {
        self.delete("Delete release", &format!("/releases/{}", version), &[])
            .await
    }
}

#[async_trait]
impl TaskApi for CustomerApi {
    async fn task_status(&self, task_uuid: &str) -> Result<TaskStatus> {
        self.get_task(task_uuid).await
    }

    async fn failed_subtasks(&self, task_uuid: &str) -> Result<Vec<SubtaskFailure>> {
        Ok(self.get_failed_subtasks(task_uuid).await?.failed_sub_tasks)
    }
}
