//! Differ - Compare desired state with current state to generate a Plan
//!
//! Compares the "desired state" declared in configuration with the "current
//! state" fetched from the Provider, and generates a list of required Effects
//! (Plan). Schema and diff validation run here so that every rejected change
//! surfaces before any remote call is made.

use std::collections::{HashMap, HashSet};

use crate::effect::Effect;
use crate::plan::Plan;
use crate::provider::ResourceType;
use crate::resource::{Resource, ResourceId, State, Value};
use crate::schema::ResourceSchema;

/// Result of a diff operation
#[derive(Debug, Clone, PartialEq)]
pub enum Diff {
    /// Resource does not exist -> needs creation
    Create(Resource),
    /// Resource exists with differences -> needs update
    Update {
        id: ResourceId,
        from: State,
        to: Resource,
        changed_attributes: Vec<String>,
    },
    /// Resource exists with differences the platform cannot apply in place
    Replace {
        id: ResourceId,
        from: State,
        to: Resource,
        changed_attributes: Vec<String>,
    },
    /// Resource exists with no differences -> no action needed
    NoChange(ResourceId),
}

impl Diff {
    /// Returns whether this Diff involves a change
    pub fn is_change(&self) -> bool {
        !matches!(self, Diff::NoChange(_))
    }
}

/// A single validation failure tied to the resource it was raised for
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationIssue {
    pub id: ResourceId,
    pub message: String,
}

impl std::fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.id, self.message)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PlanError {
    #[error("{} validation error(s):\n{}", .0.len(), format_issues(.0))]
    Validation(Vec<ValidationIssue>),
}

fn format_issues(issues: &[ValidationIssue]) -> String {
    issues
        .iter()
        .map(|i| format!("  - {}", i))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Compare desired state with current state to compute a Diff
pub fn diff(desired: &Resource, current: &State, resource_type: &dyn ResourceType) -> Diff {
    if !current.exists {
        return Diff::Create(desired.clone());
    }

    let changed = find_changed_attributes(&desired.attributes, &current.attributes);

    if changed.is_empty() {
        return Diff::NoChange(desired.id.clone());
    }

    let schema = resource_type.schema();
    let replace =
        !resource_type.supports_update() || changed.iter().any(|k| schema.is_force_new(k));

    if replace {
        Diff::Replace {
            id: desired.id.clone(),
            from: current.clone(),
            to: desired.clone(),
            changed_attributes: changed,
        }
    } else {
        Diff::Update {
            id: desired.id.clone(),
            from: current.clone(),
            to: desired.clone(),
            changed_attributes: changed,
        }
    }
}

/// Attributes that only steer the tool itself and never reach the platform
fn is_meta_attribute(key: &str) -> bool {
    key.starts_with('_') || key == "timeouts"
}

/// Find changed attributes between desired and current state
pub fn find_changed_attributes(
    desired: &HashMap<String, Value>,
    current: &HashMap<String, Value>,
) -> Vec<String> {
    let mut changed = Vec::new();

    for (key, desired_value) in desired {
        if is_meta_attribute(key) {
            continue;
        }

        match current.get(key) {
            Some(current_value) if desired_value.satisfied_by(current_value) => {}
            _ => changed.push(key.clone()),
        }
    }

    changed.sort();
    changed
}

/// Run schema validation and the type's diff validation for one resource
pub fn validate_resource(
    resource: &Resource,
    current: Option<&State>,
    resource_type: &dyn ResourceType,
    schema: &ResourceSchema,
) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();
    let issue = |message: String| ValidationIssue {
        id: resource.id.clone(),
        message,
    };

    if let Err(errors) = schema.validate(&resource.attributes) {
        issues.extend(errors.into_iter().map(|e| issue(e.to_string())));
    }

    let old = current.filter(|s| s.exists).map(|s| &s.attributes);
    if let Err(messages) = resource_type.validate_diff(old, &resource.attributes) {
        issues.extend(messages.into_iter().map(issue));
    }

    issues
}

/// Compute Diff for multiple resources and generate a Plan
///
/// Recorded resources that are no longer declared are deleted first, in
/// reverse recorded order. Validation failures from every resource are
/// collected into a single error.
pub fn create_plan(
    desired: &[Resource],
    recorded: &[State],
    resource_types: &[Box<dyn ResourceType>],
) -> Result<Plan, PlanError> {
    let mut plan = Plan::new();
    let mut issues = Vec::new();

    let find_type = |name: &str| resource_types.iter().find(|t| t.name() == name);
    let current_states: HashMap<&ResourceId, &State> =
        recorded.iter().map(|s| (&s.id, s)).collect();
    let declared: HashSet<&ResourceId> = desired.iter().map(|r| &r.id).collect();

    for state in recorded.iter().rev() {
        if !declared.contains(&state.id) && state.exists {
            plan.add(Effect::Delete {
                id: state.id.clone(),
                from: state.clone(),
            });
        }
    }

    for resource in desired {
        let Some(resource_type) = find_type(&resource.id.resource_type) else {
            issues.push(ValidationIssue {
                id: resource.id.clone(),
                message: format!("Unknown resource type '{}'", resource.id.resource_type),
            });
            continue;
        };

        let current = current_states
            .get(&resource.id)
            .map(|s| (*s).clone())
            .unwrap_or_else(|| State::not_found(resource.id.clone()));

        let schema = resource_type.schema();
        let found = validate_resource(resource, Some(&current), resource_type.as_ref(), &schema);
        if !found.is_empty() {
            issues.extend(found);
            continue;
        }

        match diff(resource, &current, resource_type.as_ref()) {
            Diff::Create(r) => plan.add(Effect::Create(r)),
            Diff::Update { id, from, to, .. } => plan.add(Effect::Update { id, from, to }),
            Diff::Replace { id, from, to, .. } => plan.add(Effect::Replace { id, from, to }),
            Diff::NoChange(_) => {}
        }
    }

    if issues.is_empty() {
        Ok(plan)
    } else {
        Err(PlanError::Validation(issues))
    }
}
