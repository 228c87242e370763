//! Interpreter - Execute Effects using a Provider
//!
//! The Interpreter executes Effects contained in a Plan in order,
//! collecting the results. This is where side effects actually occur.
//! References between resources are resolved right before each Effect runs,
//! so a resource created earlier in the same Plan can feed its identifier to
//! the ones that follow.

use std::collections::HashMap;

use log::{debug, info};

use crate::effect::Effect;
use crate::plan::Plan;
use crate::provider::{Provider, ProviderError, ProviderResult};
use crate::resource::{Resource, ResourceId, State, Value, fill_missing_attributes};

/// Attribute values of known resources, keyed by binding (`type.name`)
#[derive(Debug, Clone, Default)]
pub struct Bindings {
    map: HashMap<String, HashMap<String, Value>>,
}

impl Bindings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_states<'a>(states: impl IntoIterator<Item = &'a State>) -> Self {
        let mut bindings = Self::new();
        for state in states {
            bindings.insert_state(state);
        }
        bindings
    }

    /// Record a state; its identifier is exposed as the `id` attribute
    pub fn insert_state(&mut self, state: &State) {
        if !state.exists {
            return;
        }
        let mut attrs = state.attributes.clone();
        if let Some(identifier) = &state.identifier {
            attrs.insert("id".to_string(), Value::String(identifier.clone()));
        }
        self.map.insert(state.id.binding(), attrs);
    }

    pub fn remove(&mut self, id: &ResourceId) {
        self.map.remove(&id.binding());
    }

    /// Replace every reference that can be resolved; unknown ones are kept
    pub fn resolve(&self, value: &Value) -> Value {
        match value {
            Value::ResourceRef(binding, attr) => {
                match self.map.get(binding).and_then(|attrs| attrs.get(attr)) {
                    Some(resolved) => self.resolve(resolved),
                    None => value.clone(),
                }
            }
            Value::List(items) => Value::List(items.iter().map(|v| self.resolve(v)).collect()),
            Value::Map(map) => Value::Map(
                map.iter()
                    .map(|(k, v)| (k.clone(), self.resolve(v)))
                    .collect(),
            ),
            _ => value.clone(),
        }
    }

    /// Resolve all references of a resource, failing if any remain
    pub fn resolve_resource(&self, resource: &Resource) -> ProviderResult<Resource> {
        let mut resolved = resource.clone();
        for (key, value) in &resource.attributes {
            let value = self.resolve(value);
            if value.has_references() {
                return Err(ProviderError::new(format!(
                    "Attribute '{}' references a value that is not known yet",
                    key
                ))
                .for_resource(resource.id.clone()));
            }
            resolved.attributes.insert(key.clone(), value);
        }
        Ok(resolved)
    }
}

/// Result of executing each Effect
#[derive(Debug)]
pub enum EffectOutcome {
    /// Read succeeded
    Read { state: State },
    /// Create succeeded
    Created { state: State },
    /// Update succeeded
    Updated { state: State },
    /// Delete and recreate succeeded
    Replaced { state: State },
    /// Delete succeeded
    Deleted { id: ResourceId },
    /// Skipped (e.g., dry-run)
    Skipped { reason: String },
}

impl EffectOutcome {
    /// State produced by this outcome, if any
    pub fn state(&self) -> Option<&State> {
        match self {
            EffectOutcome::Read { state }
            | EffectOutcome::Created { state }
            | EffectOutcome::Updated { state }
            | EffectOutcome::Replaced { state } => Some(state),
            EffectOutcome::Deleted { .. } | EffectOutcome::Skipped { .. } => None,
        }
    }
}

/// Result of executing the entire Plan
#[derive(Debug)]
pub struct ApplyResult {
    pub outcomes: Vec<Result<EffectOutcome, ProviderError>>,
    pub success_count: usize,
    pub failure_count: usize,
}

impl ApplyResult {
    pub fn is_success(&self) -> bool {
        self.failure_count == 0
    }
}

/// Interpreter configuration
#[derive(Debug, Clone, Default)]
pub struct InterpreterConfig {
    /// If true, skip actual side effects
    pub dry_run: bool,
    /// Continue on error
    pub continue_on_error: bool,
}

/// Interpreter that executes Effects using a Provider
pub struct Interpreter<P: Provider> {
    provider: P,
    config: InterpreterConfig,
    bindings: Bindings,
}

impl<P: Provider> Interpreter<P> {
    pub fn new(provider: P) -> Self {
        Self {
            provider,
            config: InterpreterConfig::default(),
            bindings: Bindings::new(),
        }
    }

    pub fn with_config(mut self, config: InterpreterConfig) -> Self {
        self.config = config;
        self
    }

    /// Seed reference resolution with already known states
    pub fn with_bindings(mut self, bindings: Bindings) -> Self {
        self.bindings = bindings;
        self
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Execute a Plan, interpreting all Effects and causing side effects
    pub async fn apply(&mut self, plan: &Plan) -> ApplyResult {
        let mut outcomes = Vec::new();
        let mut success_count = 0;
        let mut failure_count = 0;

        for effect in plan.effects() {
            let result = self.execute_effect(effect).await;

            match &result {
                Ok(_) => success_count += 1,
                Err(_) => {
                    failure_count += 1;
                    if !self.config.continue_on_error {
                        outcomes.push(result);
                        break;
                    }
                }
            }

            outcomes.push(result);
        }

        ApplyResult {
            outcomes,
            success_count,
            failure_count,
        }
    }

    /// Execute a single Effect
    pub async fn execute_effect(&mut self, effect: &Effect) -> ProviderResult<EffectOutcome> {
        if self.config.dry_run {
            return Ok(EffectOutcome::Skipped {
                reason: "dry-run mode".to_string(),
            });
        }

        debug!("Executing effect on {}", effect.resource_id());

        match effect {
            Effect::Read(id) => {
                let state = self.provider.read(id, None, None).await?;
                self.bindings.insert_state(&state);
                Ok(EffectOutcome::Read { state })
            }
            Effect::Create(resource) => {
                let state = self.create(resource).await?;
                Ok(EffectOutcome::Created { state })
            }
            Effect::Update { id, from, to } => {
                let identifier = require_identifier(id, from)?;
                let resolved = self.bindings.resolve_resource(to)?;
                let mut state = self
                    .provider
                    .update(id, identifier, from, &resolved)
                    .await?;
                fill_missing_attributes(&mut state.attributes, &resolved.attributes);
                if state.identifier.is_none() {
                    state.identifier = from.identifier.clone();
                }
                self.bindings.insert_state(&state);
                Ok(EffectOutcome::Updated { state })
            }
            Effect::Replace { id, from, to } => {
                let identifier = require_identifier(id, from)?;
                info!("Replacing {}: deleting {}", id, identifier);
                self.provider.delete(id, identifier, from).await?;
                self.bindings.remove(id);
                let state = self.create(to).await?;
                Ok(EffectOutcome::Replaced { state })
            }
            Effect::Delete { id, from } => {
                let identifier = require_identifier(id, from)?;
                self.provider.delete(id, identifier, from).await?;
                self.bindings.remove(id);
                Ok(EffectOutcome::Deleted { id: id.clone() })
            }
        }
    }

    async fn create(&mut self, resource: &Resource) -> ProviderResult<State> {
        let resolved = self.bindings.resolve_resource(resource)?;
        let mut state = self.provider.create(&resolved).await?;
        // Declared values the platform never echoes back (secrets, options)
        fill_missing_attributes(&mut state.attributes, &resolved.attributes);
        self.bindings.insert_state(&state);
        Ok(state)
    }
}

fn require_identifier<'a>(id: &ResourceId, state: &'a State) -> ProviderResult<&'a str> {
    state.identifier.as_deref().ok_or_else(|| {
        ProviderError::new("No identifier recorded for resource").for_resource(id.clone())
    })
}
