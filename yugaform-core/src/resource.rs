//! Resource - Representing resources and their state

use std::collections::{HashMap, HashSet};
use std::fmt;

/// Unique identifier for a resource
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceId {
    /// Resource type (e.g., "universe", "cloud_provider")
    pub resource_type: String,
    /// Resource name (identifier given in the configuration)
    pub name: String,
}

impl ResourceId {
    pub fn new(resource_type: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            resource_type: resource_type.into(),
            name: name.into(),
        }
    }

    /// Binding name other resources use to reference this one (`type.name`)
    pub fn binding(&self) -> String {
        format!("{}.{}", self.resource_type, self.name)
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.resource_type, self.name)
    }
}

/// Attribute value of a resource
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    String(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    List(Vec<Value>),
    Map(HashMap<String, Value>),
    /// Reference to another resource's attribute (binding_name, attribute_name)
    ResourceRef(String, String),
}

impl Value {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&HashMap<String, Value>> {
        match self {
            Value::Map(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    /// Convert a JSON value into an attribute value.
    ///
    /// `null` has no attribute representation and yields `None`; null members
    /// of objects and arrays are dropped. Strings of the form
    /// `${type.name.attr}` become [`Value::ResourceRef`].
    pub fn from_json(value: &serde_json::Value) -> Option<Value> {
        match value {
            serde_json::Value::Null => None,
            serde_json::Value::Bool(b) => Some(Value::Bool(*b)),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Some(Value::Int(i)),
                None => n.as_f64().map(Value::Float),
            },
            serde_json::Value::String(s) => {
                Some(parse_reference(s).unwrap_or_else(|| Value::String(s.clone())))
            }
            serde_json::Value::Array(items) => {
                Some(Value::List(items.iter().filter_map(Value::from_json).collect()))
            }
            serde_json::Value::Object(map) => Some(Value::Map(
                map.iter()
                    .filter_map(|(k, v)| Value::from_json(v).map(|v| (k.clone(), v)))
                    .collect(),
            )),
        }
    }

    /// Convert an attribute value into JSON. References are written back in
    /// their `${binding.attr}` form.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::String(s) => serde_json::Value::String(s.clone()),
            Value::Int(i) => serde_json::Value::from(*i),
            Value::Float(f) => serde_json::Number::from_f64(*f)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::List(items) => {
                serde_json::Value::Array(items.iter().map(Value::to_json).collect())
            }
            Value::Map(map) => serde_json::Value::Object(
                map.iter().map(|(k, v)| (k.clone(), v.to_json())).collect(),
            ),
            Value::ResourceRef(binding, attr) => {
                serde_json::Value::String(format!("${{{}.{}}}", binding, attr))
            }
        }
    }

    /// Whether `current` matches everything this (desired) value declares.
    ///
    /// Map keys absent from the desired value are ignored, so attributes only
    /// the server reports never show up as changes. Lists compare element by
    /// element and must have the same length.
    pub fn satisfied_by(&self, current: &Value) -> bool {
        match (self, current) {
            (Value::Map(desired), Value::Map(current)) => desired
                .iter()
                .all(|(k, v)| current.get(k).is_some_and(|c| v.satisfied_by(c))),
            (Value::List(desired), Value::List(current)) => {
                desired.len() == current.len()
                    && desired.iter().zip(current).all(|(d, c)| d.satisfied_by(c))
            }
            (Value::Int(i), Value::Float(f)) | (Value::Float(f), Value::Int(i)) => *i as f64 == *f,
            _ => self == current,
        }
    }

    /// Copy map entries present in `prior` but missing here, recursively.
    ///
    /// Write-only attributes (passwords, credentials) are never echoed by the
    /// platform; this keeps them in recorded state across refreshes.
    pub fn fill_missing(&mut self, prior: &Value) {
        match (self, prior) {
            (Value::Map(current), Value::Map(prior)) => fill_missing_attributes(current, prior),
            (Value::List(current), Value::List(prior)) if current.len() == prior.len() => {
                for (c, p) in current.iter_mut().zip(prior) {
                    c.fill_missing(p);
                }
            }
            _ => {}
        }
    }

    /// Collect binding names referenced anywhere inside this value
    pub fn collect_references(&self, out: &mut HashSet<String>) {
        match self {
            Value::ResourceRef(binding, _) => {
                out.insert(binding.clone());
            }
            Value::List(items) => items.iter().for_each(|v| v.collect_references(out)),
            Value::Map(map) => map.values().for_each(|v| v.collect_references(out)),
            _ => {}
        }
    }

    /// Whether any unresolved reference remains inside this value
    pub fn has_references(&self) -> bool {
        let mut refs = HashSet::new();
        self.collect_references(&mut refs);
        !refs.is_empty()
    }
}

/// Parse `${type.name.attr}` into a reference. The binding is everything
/// before the last dot.
fn parse_reference(s: &str) -> Option<Value> {
    let inner = s.strip_prefix("${")?.strip_suffix('}')?;
    let (binding, attr) = inner.rsplit_once('.')?;
    if !binding.contains('.') || attr.is_empty() {
        return None;
    }
    Some(Value::ResourceRef(binding.to_string(), attr.to_string()))
}

/// Fill attributes missing from `current` with the values recorded in `prior`
pub fn fill_missing_attributes(
    current: &mut HashMap<String, Value>,
    prior: &HashMap<String, Value>,
) {
    for (key, prior_value) in prior {
        match current.get_mut(key) {
            Some(value) => value.fill_missing(prior_value),
            None => {
                current.insert(key.clone(), prior_value.clone());
            }
        }
    }
}

/// Build an attribute map from a JSON object (non-objects yield an empty map)
pub fn attributes_from_json(value: &serde_json::Value) -> HashMap<String, Value> {
    match Value::from_json(value) {
        Some(Value::Map(map)) => map,
        _ => HashMap::new(),
    }
}

/// Serialize an attribute map as a JSON object
pub fn attributes_to_json(attributes: &HashMap<String, Value>) -> serde_json::Value {
    serde_json::Value::Object(
        attributes
            .iter()
            .map(|(k, v)| (k.clone(), v.to_json()))
            .collect(),
    )
}

/// Desired state declared in configuration
#[derive(Debug, Clone, PartialEq)]
pub struct Resource {
    pub id: ResourceId,
    pub attributes: HashMap<String, Value>,
}

impl Resource {
    pub fn new(resource_type: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: ResourceId::new(resource_type, name),
            attributes: HashMap::new(),
        }
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: Value) -> Self {
        self.attributes.insert(key.into(), value);
        self
    }

    /// Binding names this resource depends on
    pub fn dependencies(&self) -> HashSet<String> {
        let mut deps = HashSet::new();
        for value in self.attributes.values() {
            value.collect_references(&mut deps);
        }
        deps
    }
}

/// Current state fetched from the platform
#[derive(Debug, Clone, PartialEq)]
pub struct State {
    pub id: ResourceId,
    /// Platform identifier (resource UUID, release version, ...)
    pub identifier: Option<String>,
    pub attributes: HashMap<String, Value>,
    /// Whether this state exists
    pub exists: bool,
}

impl State {
    pub fn not_found(id: ResourceId) -> Self {
        Self {
            id,
            identifier: None,
            attributes: HashMap::new(),
            exists: false,
        }
    }

    pub fn existing(id: ResourceId, attributes: HashMap<String, Value>) -> Self {
        Self {
            id,
            identifier: None,
            attributes,
            exists: true,
        }
    }

    pub fn with_identifier(mut self, identifier: impl Into<String>) -> Self {
        self.identifier = Some(identifier.into());
        self
    }
}
