//! Loading the declarative configuration file

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;

use serde::Deserialize;
use yugaform_core::resource::{Resource, ResourceId, Value, attributes_from_json};
use yugaform_state::{BackendConfig, LocalBackend};

pub const DEFAULT_CONFIG_FILE: &str = "main.yb.json";

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    #[serde(default)]
    provider: Option<serde_json::Value>,
    #[serde(default)]
    backend: Option<BackendBlock>,
    #[serde(default)]
    resources: Vec<ResourceBlock>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct BackendBlock {
    #[serde(rename = "type")]
    backend_type: String,
    #[serde(default)]
    path: Option<String>,
    #[serde(default)]
    lock_timeout_secs: Option<i64>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ResourceBlock {
    #[serde(rename = "type")]
    resource_type: String,
    name: String,
    #[serde(default)]
    attributes: serde_json::Value,
}

/// A loaded configuration
#[derive(Debug)]
pub struct Configuration {
    /// Raw `provider` block
    pub provider: Option<serde_json::Value>,
    pub backend: BackendConfig,
    /// Declared resources, dependencies first
    pub resources: Vec<Resource>,
}

/// Read and parse a configuration file. A relative state path is taken
/// relative to the file's directory.
pub fn load(path: &Path) -> Result<Configuration, String> {
    let content = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read {}: {}", path.display(), e))?;
    let mut config =
        parse(&content).map_err(|e| format!("Invalid configuration {}: {}", path.display(), e))?;

    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty())
        && let Some(Value::String(state_path)) = config.backend.attributes.get_mut("path")
        && Path::new(state_path.as_str()).is_relative()
    {
        *state_path = dir.join(state_path.as_str()).to_string_lossy().into_owned();
    }
    Ok(config)
}

pub fn parse(content: &str) -> Result<Configuration, String> {
    let file: ConfigFile = serde_json::from_str(content).map_err(|e| e.to_string())?;

    let backend = match file.backend {
        Some(block) => {
            let mut attributes = HashMap::new();
            if let Some(path) = block.path {
                attributes.insert("path".to_string(), Value::String(path));
            }
            if let Some(secs) = block.lock_timeout_secs {
                attributes.insert("lock_timeout_secs".to_string(), Value::Int(secs));
            }
            BackendConfig {
                backend_type: block.backend_type,
                attributes,
            }
        }
        None => BackendConfig::local(LocalBackend::DEFAULT_STATE_FILE),
    };

    let mut seen = HashSet::new();
    let mut resources = Vec::new();
    for block in file.resources {
        if block.name.is_empty() {
            return Err(format!("Resource of type {} has no name", block.resource_type));
        }
        let id = ResourceId::new(&block.resource_type, &block.name);
        if !seen.insert(id.clone()) {
            return Err(format!("Duplicate resource {}", id));
        }
        if !block.attributes.is_object() && !block.attributes.is_null() {
            return Err(format!("Attributes of {} must be an object", id));
        }
        resources.push(Resource {
            id,
            attributes: attributes_from_json(&block.attributes),
        });
    }

    Ok(Configuration {
        provider: file.provider,
        backend,
        resources: sort_by_dependencies(&resources)?,
    })
}

/// Order resources so that every referenced resource comes first.
/// Declaration order is kept otherwise.
pub fn sort_by_dependencies(resources: &[Resource]) -> Result<Vec<Resource>, String> {
    let by_binding: HashMap<String, &Resource> =
        resources.iter().map(|r| (r.id.binding(), r)).collect();

    let mut sorted = Vec::new();
    let mut visited: HashSet<String> = HashSet::new();
    let mut visiting: Vec<String> = Vec::new();

    fn visit<'a>(
        resource: &'a Resource,
        by_binding: &HashMap<String, &'a Resource>,
        visited: &mut HashSet<String>,
        visiting: &mut Vec<String>,
        sorted: &mut Vec<Resource>,
    ) -> Result<(), String> {
        let binding = resource.id.binding();
        if visited.contains(&binding) {
            return Ok(());
        }
        if let Some(start) = visiting.iter().position(|b| *b == binding) {
            let mut cycle = visiting[start..].to_vec();
            cycle.push(binding);
            return Err(format!("Circular reference: {}", cycle.join(" -> ")));
        }

        visiting.push(binding.clone());
        let mut deps: Vec<String> = resource.dependencies().into_iter().collect();
        deps.sort();
        for dep in deps {
            match by_binding.get(&dep) {
                Some(dep_resource) => visit(dep_resource, by_binding, visited, visiting, sorted)?,
                None => {
                    return Err(format!(
                        "{} references undeclared resource {}",
                        resource.id, dep
                    ));
                }
            }
        }
        visiting.pop();
        visited.insert(binding);
        sorted.push(resource.clone());
        Ok(())
    }

    for resource in resources {
        visit(resource, &by_binding, &mut visited, &mut visiting, &mut sorted)?;
    }
    Ok(sorted)
}
