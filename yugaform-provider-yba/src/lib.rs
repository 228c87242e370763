//! YugabyteDB Anywhere provider for yugaform
//!
//! Manages cloud providers, universes, storage configs, backup schedules and
//! software releases through the platform's REST API.
//!
//! ## Module Structure
//!
//! - `client` - Typed REST bindings, scoped per customer
//! - `models` - Request and response bodies
//! - `task` - Waiting on asynchronous platform tasks
//! - `version` - Platform version gates
//! - `credentials` - Cloud credentials from the environment
//! - `connection` - Provider settings and per-resource overrides
//! - `resources` - Resource type definitions and lifecycle functions
//! - `provider` - YbaProvider implementation

pub mod client;
pub mod connection;
pub mod credentials;
pub mod error;
pub mod models;
pub mod provider;
pub mod resources;
pub mod task;
pub mod version;

pub use client::{CustomerApi, YbaClient};
pub use connection::{ConnectionInfo, ProviderConfig};
pub use error::ApiError;
pub use provider::YbaProvider;

use yugaform_core::provider::{BoxFuture, Provider, ProviderResult, ResourceType};
use yugaform_core::resource::{Resource, ResourceId, State};

use resources::resource_types;

/// Provider name used in state files
pub const PROVIDER_NAME: &str = "yba";

// =============================================================================
// Provider Trait Implementation
// =============================================================================

impl Provider for YbaProvider {
    fn name(&self) -> &'static str {
        PROVIDER_NAME
    }

    fn resource_types(&self) -> Vec<Box<dyn ResourceType>> {
        resource_types()
    }

    fn read(
        &self,
        id: &ResourceId,
        identifier: Option<&str>,
        prior: Option<&State>,
    ) -> BoxFuture<'_, ProviderResult<State>> {
        let id = id.clone();
        let identifier = identifier.map(|s| s.to_string());
        let prior = prior.cloned();
        Box::pin(async move {
            self.read_resource(&id, identifier.as_deref(), prior.as_ref())
                .await
        })
    }

    fn create(&self, resource: &Resource) -> BoxFuture<'_, ProviderResult<State>> {
        let resource = resource.clone();
        Box::pin(async move { self.create_resource(&resource).await })
    }

    fn update(
        &self,
        id: &ResourceId,
        identifier: &str,
        _from: &State,
        to: &Resource,
    ) -> BoxFuture<'_, ProviderResult<State>> {
        let id = id.clone();
        let identifier = identifier.to_string();
        let to = to.clone();
        Box::pin(async move { self.update_resource(&id, &identifier, &to).await })
    }

    fn delete(
        &self,
        id: &ResourceId,
        identifier: &str,
        from: &State,
    ) -> BoxFuture<'_, ProviderResult<()>> {
        let id = id.clone();
        let identifier = identifier.to_string();
        let from = from.clone();
        Box::pin(async move { self.delete_resource(&id, &identifier, &from).await })
    }
}
