//! State file structures for persisting managed resources

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use yugaform_core::resource::{ResourceId, State, Value};

/// The main state file structure that persists to the backend
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateFile {
    /// State file format version
    pub version: u32,
    /// Monotonically increasing number for each state modification
    pub serial: u64,
    /// Unique identifier for this state lineage (prevents accidental overwrites)
    pub lineage: String,
    /// Version of yugaform that last modified this state
    pub yugaform_version: String,
    /// Managed resources in the order they were recorded
    pub resources: Vec<ResourceState>,
}

impl StateFile {
    pub const CURRENT_VERSION: u32 = 1;

    pub fn new() -> Self {
        Self {
            version: Self::CURRENT_VERSION,
            serial: 0,
            lineage: uuid::Uuid::new_v4().to_string(),
            yugaform_version: env!("CARGO_PKG_VERSION").to_string(),
            resources: Vec::new(),
        }
    }

    /// Increment serial and stamp the current version for a new state write
    pub fn increment_serial(&mut self) {
        self.serial += 1;
        self.yugaform_version = env!("CARGO_PKG_VERSION").to_string();
    }

    pub fn find_resource(&self, id: &ResourceId) -> Option<&ResourceState> {
        self.resources
            .iter()
            .find(|r| r.resource_type == id.resource_type && r.name == id.name)
    }

    fn find_resource_mut(&mut self, id: &ResourceId) -> Option<&mut ResourceState> {
        self.resources
            .iter_mut()
            .find(|r| r.resource_type == id.resource_type && r.name == id.name)
    }

    /// Add or update a resource, keeping its original position
    pub fn upsert_resource(&mut self, resource: ResourceState) {
        let id = resource.resource_id();
        if let Some(existing) = self.find_resource_mut(&id) {
            *existing = resource;
        } else {
            self.resources.push(resource);
        }
    }

    /// Record the outcome of an operation. A state that no longer exists
    /// removes the entry.
    pub fn record(&mut self, state: &State, provider: &str) {
        if state.exists {
            self.upsert_resource(ResourceState::from_state(state, provider));
        } else {
            self.remove_resource(&state.id);
        }
    }

    pub fn remove_resource(&mut self, id: &ResourceId) -> Option<ResourceState> {
        let pos = self
            .resources
            .iter()
            .position(|r| r.resource_type == id.resource_type && r.name == id.name)?;
        Some(self.resources.remove(pos))
    }

    /// All recorded resources as core states, in recorded order
    pub fn to_states(&self) -> Vec<State> {
        self.resources.iter().map(ResourceState::to_state).collect()
    }
}

impl Default for StateFile {
    fn default() -> Self {
        Self::new()
    }
}

/// State of a single managed resource
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceState {
    /// Resource type (e.g., "universe", "storage_config")
    pub resource_type: String,
    /// Resource name from the configuration
    pub name: String,
    /// Provider name (e.g., "yba")
    pub provider: String,
    /// Platform identifier (UUID, or the version for releases)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identifier: Option<String>,
    /// Last known attributes as JSON values
    #[serde(default)]
    pub attributes: HashMap<String, serde_json::Value>,
}

impl ResourceState {
    pub fn new(
        resource_type: impl Into<String>,
        name: impl Into<String>,
        provider: impl Into<String>,
    ) -> Self {
        Self {
            resource_type: resource_type.into(),
            name: name.into(),
            provider: provider.into(),
            identifier: None,
            attributes: HashMap::new(),
        }
    }

    pub fn with_identifier(mut self, identifier: impl Into<String>) -> Self {
        self.identifier = Some(identifier.into());
        self
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.attributes.insert(key.into(), value);
        self
    }

    pub fn resource_id(&self) -> ResourceId {
        ResourceId::new(&self.resource_type, &self.name)
    }

    pub fn from_state(state: &State, provider: &str) -> Self {
        Self {
            resource_type: state.id.resource_type.clone(),
            name: state.id.name.clone(),
            provider: provider.to_string(),
            identifier: state.identifier.clone(),
            attributes: state
                .attributes
                .iter()
                .map(|(k, v)| (k.clone(), v.to_json()))
                .collect(),
        }
    }

    pub fn to_state(&self) -> State {
        let attributes = self
            .attributes
            .iter()
            .filter_map(|(k, v)| Value::from_json(v).map(|v| (k.clone(), v)))
            .collect();
        let state = State::existing(self.resource_id(), attributes);
        match &self.identifier {
            Some(identifier) => state.with_identifier(identifier),
            None => state,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_state_file_new() {
        let state = StateFile::new();
        assert_eq!(state.version, StateFile::CURRENT_VERSION);
        assert_eq!(state.serial, 0);
        assert!(!state.lineage.is_empty());
        assert!(state.resources.is_empty());
    }

    #[test]
    fn test_state_file_increment_serial() {
        let mut state = StateFile::new();
        state.increment_serial();
        state.increment_serial();
        assert_eq!(state.serial, 2);
    }

    #[test]
    fn test_upsert_keeps_position() {
        let mut state = StateFile::new();
        state.upsert_resource(ResourceState::new("cloud_provider", "aws", "yba"));
        state.upsert_resource(
            ResourceState::new("universe", "main", "yba").with_attribute("name", json!("u1")),
        );
        state.upsert_resource(
            ResourceState::new("cloud_provider", "aws", "yba").with_identifier("p-1"),
        );

        assert_eq!(state.resources.len(), 2);
        assert_eq!(state.resources[0].identifier.as_deref(), Some("p-1"));
        assert_eq!(state.resources[1].name, "main");
    }

    #[test]
    fn test_record_removes_missing_resources() {
        let mut state = StateFile::new();
        let id = ResourceId::new("release", "v2");
        state.record(
            &State::existing(id.clone(), HashMap::new()).with_identifier("2.18.0.0"),
            "yba",
        );
        assert!(state.find_resource(&id).is_some());

        state.record(&State::not_found(id.clone()), "yba");
        assert!(state.find_resource(&id).is_none());
        assert!(state.remove_resource(&id).is_none());
    }

    #[test]
    fn test_state_conversion_keeps_identifier_and_refs() {
        let id = ResourceId::new("backup_schedule", "daily");
        let attributes = HashMap::from([
            ("frequency".to_string(), Value::Int(86_400_000)),
            (
                "universe_uuid".to_string(),
                Value::ResourceRef("universe.main".to_string(), "id".to_string()),
            ),
        ]);
        let state = State::existing(id, attributes).with_identifier("s-1");

        let recorded = ResourceState::from_state(&state, "yba");
        assert_eq!(recorded.attributes["universe_uuid"], json!("${universe.main.id}"));
        assert_eq!(recorded.to_state(), state);
    }

    #[test]
    fn test_state_file_serialization() {
        let mut state = StateFile::new();
        state.upsert_resource(
            ResourceState::new("storage_config", "s3", "yba")
                .with_identifier("c-1")
                .with_attribute("config_name", json!("S3")),
        );

        let json = serde_json::to_string_pretty(&state).unwrap();
        let deserialized: StateFile = serde_json::from_str(&json).unwrap();

        assert_eq!(deserialized.lineage, state.lineage);
        assert_eq!(deserialized.resources, state.resources);
    }
}
