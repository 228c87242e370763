//! YugabyteDB Anywhere provider implementation
//!
//! Routes lifecycle calls to the resource modules. Every call builds its own
//! customer scoped API from the provider settings and the resource's
//! `connection_info` block, and its own timeouts from the resource type's
//! defaults and the `timeouts` block.

use std::collections::HashMap;

use log::debug;
use tokio::sync::OnceCell;
use yugaform_core::provider::{ProviderError, ProviderResult, ResourceType};
use yugaform_core::resource::{Resource, ResourceId, State, Value};

use crate::client::{CustomerApi, YbaClient};
use crate::connection::{ConnectionInfo, ProviderConfig};
use crate::error::ApiError;
use crate::resources::{
    OperationContext, backup_schedule, cloud_provider, release, resource_types, storage_config,
    universe,
};

/// YugabyteDB Anywhere provider
pub struct YbaProvider {
    client: YbaClient,
    config: ProviderConfig,
    /// Customer of the provider token, looked up once
    default_customer: OnceCell<String>,
}

impl YbaProvider {
    pub fn new(config: ProviderConfig) -> Result<Self, ApiError> {
        let client = YbaClient::new(&config.host, config.use_secure)?;
        Ok(Self::with_client(client, config))
    }

    pub fn with_client(client: YbaClient, config: ProviderConfig) -> Self {
        let default_customer = match &config.customer_uuid {
            Some(uuid) => OnceCell::new_with(Some(uuid.clone())),
            None => OnceCell::new(),
        };
        Self {
            client,
            config,
            default_customer,
        }
    }

    pub fn config(&self) -> &ProviderConfig {
        &self.config
    }

    async fn discover_customer(&self, api_token: &str) -> Result<String, ApiError> {
        let session = self.client.session_info(api_token).await?;
        session
            .customer_uuid
            .ok_or_else(|| ApiError::missing("Get session info", "customerUUID"))
    }

    /// Customer scoped API for a resource, honouring its `connection_info`
    pub async fn api_for(
        &self,
        attributes: &HashMap<String, Value>,
    ) -> Result<CustomerApi, ApiError> {
        let info = ConnectionInfo::from_attributes(attributes);
        let api_token = info
            .api_token
            .clone()
            .unwrap_or_else(|| self.config.api_token.clone());

        let customer_uuid = match (info.customer_uuid, info.api_token) {
            (Some(uuid), _) => uuid,
            (None, Some(token)) => self.discover_customer(&token).await?,
            (None, None) => self
                .default_customer
                .get_or_try_init(|| self.discover_customer(&self.config.api_token))
                .await?
                .clone(),
        };
        Ok(self.client.customer(customer_uuid, api_token))
    }

    fn resource_type(&self, id: &ResourceId) -> ProviderResult<Box<dyn ResourceType>> {
        resource_types()
            .into_iter()
            .find(|t| t.name() == id.resource_type)
            .ok_or_else(|| {
                ProviderError::new(format!("Unknown resource type: {}", id.resource_type))
                    .for_resource(id.clone())
            })
    }

    async fn context(
        &self,
        id: &ResourceId,
        attributes: &HashMap<String, Value>,
    ) -> ProviderResult<OperationContext> {
        let resource_type = self.resource_type(id)?;
        let timeouts = resource_type
            .timeouts()
            .with_overrides(attributes)
            .map_err(|e| ProviderError::new(e).for_resource(id.clone()))?;
        let api = self
            .api_for(attributes)
            .await
            .map_err(|e| ProviderError::from(e).for_resource(id.clone()))?;
        Ok(OperationContext::new(api, timeouts, self.config.poll_interval))
    }

    // =========================================================================
    // Resource Operations
    // =========================================================================

    pub async fn read_resource(
        &self,
        id: &ResourceId,
        identifier: Option<&str>,
        prior: Option<&State>,
    ) -> ProviderResult<State> {
        let Some(identifier) = identifier else {
            return Ok(State::not_found(id.clone()));
        };
        let empty = HashMap::new();
        let attributes = prior.map(|p| &p.attributes).unwrap_or(&empty);
        let ctx = self.context(id, attributes).await?;

        let result = match id.resource_type.as_str() {
            cloud_provider::RESOURCE_TYPE => cloud_provider::read(&ctx, id, identifier, prior).await,
            universe::RESOURCE_TYPE => universe::read(&ctx, id, identifier, prior).await,
            storage_config::RESOURCE_TYPE => storage_config::read(&ctx, id, identifier, prior).await,
            backup_schedule::RESOURCE_TYPE => {
                backup_schedule::read(&ctx, id, identifier, prior).await
            }
            release::RESOURCE_TYPE => release::read(&ctx, id, identifier, prior).await,
            other => return Err(unknown_type(id, other)),
        };
        result.map_err(|e| ProviderError::from(e).for_resource(id.clone()))
    }

    pub async fn create_resource(&self, resource: &Resource) -> ProviderResult<State> {
        let id = &resource.id;
        let ctx = self.context(id, &resource.attributes).await?;
        debug!("Creating {}", id);

        let result = match id.resource_type.as_str() {
            cloud_provider::RESOURCE_TYPE => cloud_provider::create(&ctx, resource).await,
            universe::RESOURCE_TYPE => universe::create(&ctx, resource).await,
            storage_config::RESOURCE_TYPE => storage_config::create(&ctx, resource).await,
            backup_schedule::RESOURCE_TYPE => backup_schedule::create(&ctx, resource).await,
            release::RESOURCE_TYPE => release::create(&ctx, resource).await,
            other => return Err(unknown_type(id, other)),
        };
        result.map_err(|e| ProviderError::from(e).for_resource(id.clone()))
    }

    pub async fn update_resource(
        &self,
        id: &ResourceId,
        identifier: &str,
        to: &Resource,
    ) -> ProviderResult<State> {
        if !self.resource_type(id)?.supports_update() {
            return Err(ProviderError::new(format!(
                "Update not supported for {}, delete and recreate",
                id.resource_type
            ))
            .for_resource(id.clone()));
        }
        let ctx = self.context(id, &to.attributes).await?;
        debug!("Updating {} ({})", id, identifier);

        let result = match id.resource_type.as_str() {
            universe::RESOURCE_TYPE => universe::update(&ctx, id, identifier, to).await,
            storage_config::RESOURCE_TYPE => storage_config::update(&ctx, id, identifier, to).await,
            backup_schedule::RESOURCE_TYPE => {
                backup_schedule::update(&ctx, id, identifier, to).await
            }
            other => return Err(unknown_type(id, other)),
        };
        result.map_err(|e| ProviderError::from(e).for_resource(id.clone()))
    }

    pub async fn delete_resource(
        &self,
        id: &ResourceId,
        identifier: &str,
        from: &State,
    ) -> ProviderResult<()> {
        let ctx = self.context(id, &from.attributes).await?;
        debug!("Deleting {} ({})", id, identifier);

        let result = match id.resource_type.as_str() {
            cloud_provider::RESOURCE_TYPE => cloud_provider::delete(&ctx, identifier).await,
            universe::RESOURCE_TYPE => universe::delete(&ctx, identifier, from).await,
            storage_config::RESOURCE_TYPE => storage_config::delete(&ctx, identifier).await,
            backup_schedule::RESOURCE_TYPE => backup_schedule::delete(&ctx, identifier).await,
            release::RESOURCE_TYPE => release::delete(&ctx, identifier).await,
            other => return Err(unknown_type(id, other)),
        };
        result.map_err(|e| ProviderError::from(e).for_resource(id.clone()))
    }
}

fn unknown_type(id: &ResourceId, resource_type: &str) -> ProviderError {
    ProviderError::new(format!("Unknown resource type: {}", resource_type)).for_resource(id.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ::httpmock::prelude::*;
    use serde_json::json;
    use std::time::Duration;
    use yugaform_core::provider::Provider;
    use yugaform_core::resource::attributes_from_json;

    fn provider(server: &MockServer, customer_uuid: Option<&str>) -> YbaProvider {
        let mut config = ProviderConfig::new(server.base_url(), "provider-token");
        config.customer_uuid = customer_uuid.map(str::to_string);
        config.poll_interval = Duration::from_millis(10);
        YbaProvider::with_client(YbaClient::with_base_url(server.base_url()), config)
    }

    #[tokio::test]
    async fn test_customer_discovered_once() {
        let server = MockServer::start();
        let session = server.mock(|when, then| {
            when.method(GET)
                .path("/api/v1/session_info")
                .header("X-AUTH-YW-API-TOKEN", "provider-token");
            then.status(200).json_body(json!({"customerUUID": "c-1"}));
        });

        let provider = provider(&server, None);
        let api = provider.api_for(&HashMap::new()).await.unwrap();
        assert_eq!(api.customer_uuid(), "c-1");
        provider.api_for(&HashMap::new()).await.unwrap();

        session.assert_hits(1);
    }

    #[tokio::test]
    async fn test_connection_info_overrides_customer() {
        let server = MockServer::start();
        let session = server.mock(|when, then| {
            when.method(GET)
                .path("/api/v1/session_info")
                .header("X-AUTH-YW-API-TOKEN", "other-token");
            then.status(200).json_body(json!({"customerUUID": "c-2"}));
        });

        let provider = provider(&server, Some("c-1"));
        let attributes = attributes_from_json(&json!({
            "connection_info": {"cuuid": "c-3"}
        }));
        assert_eq!(provider.api_for(&attributes).await.unwrap().customer_uuid(), "c-3");

        let attributes = attributes_from_json(&json!({
            "connection_info": {"api_token": "other-token"}
        }));
        assert_eq!(provider.api_for(&attributes).await.unwrap().customer_uuid(), "c-2");
        session.assert();

        assert_eq!(
            provider.api_for(&HashMap::new()).await.unwrap().customer_uuid(),
            "c-1"
        );
    }

    #[tokio::test]
    async fn test_read_without_identifier_is_not_found() {
        let server = MockServer::start();
        let provider = provider(&server, Some("c-1"));
        let id = ResourceId::new("universe", "app");
        let state = provider.read(&id, None, None).await.unwrap();
        assert!(!state.exists);
    }

    #[tokio::test]
    async fn test_replace_only_types_refuse_update() {
        let server = MockServer::start();
        let provider = provider(&server, Some("c-1"));
        let to = Resource::new("release", "lts");
        let from = State::existing(to.id.clone(), HashMap::new());

        let err = provider
            .update(&to.id, "2.20.1.3-b3", &from, &to)
            .await
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "[release.lts] Update not supported for release, delete and recreate"
        );
    }

    #[tokio::test]
    async fn test_errors_carry_resource_id() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/api/v1/customers/c-1/configs");
            then.status(500)
                .json_body(json!({"success": false, "error": "database unavailable"}));
        });

        let provider = provider(&server, Some("c-1"));
        let id = ResourceId::new("storage_config", "backups");
        let err = provider.read(&id, Some("cfg-1"), None).await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "[storage_config.backups] List customer configs failed (500): database unavailable"
        );
    }

    #[tokio::test]
    async fn test_invalid_timeouts_block() {
        let server = MockServer::start();
        let provider = provider(&server, Some("c-1"));
        let resource = Resource {
            id: ResourceId::new("universe", "app"),
            attributes: attributes_from_json(&json!({"timeouts": {"create": "soon"}})),
        };
        let err = provider.create(&resource).await.unwrap_err();
        assert!(err.to_string().contains("Invalid duration 'soon'"));
    }
}
