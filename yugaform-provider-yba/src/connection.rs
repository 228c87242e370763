//! Provider settings and per-resource connection overrides

use std::collections::HashMap;
use std::time::Duration;

use serde::Deserialize;
use yugaform_core::resource::Value;
use yugaform_core::schema::{AttributeSchema, AttributeType};

use crate::error::ApiError;
use crate::task::DEFAULT_POLL_INTERVAL;

pub const HOST_ENV: &str = "YB_HOST";
pub const API_KEY_ENV: &str = "YB_API_KEY";

fn default_use_secure() -> bool {
    true
}

fn default_poll_interval_secs() -> u64 {
    DEFAULT_POLL_INTERVAL.as_secs()
}

/// The `provider` block of the configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
struct ProviderBlock {
    host: Option<String>,
    api_token: Option<String>,
    #[serde(default = "default_use_secure")]
    use_secure: bool,
    customer_uuid: Option<String>,
    #[serde(default = "default_poll_interval_secs")]
    poll_interval_secs: u64,
}

/// Resolved provider settings
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderConfig {
    pub host: String,
    pub api_token: String,
    pub use_secure: bool,
    /// Discovered from the session when not set
    pub customer_uuid: Option<String>,
    pub poll_interval: Duration,
}

impl ProviderConfig {
    pub fn new(host: impl Into<String>, api_token: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            api_token: api_token.into(),
            use_secure: true,
            customer_uuid: None,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    /// Read the `provider` block; `host` and `api_token` fall back to
    /// `YB_HOST` and `YB_API_KEY`.
    pub fn from_json(
        block: Option<&serde_json::Value>,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ApiError> {
        let block: ProviderBlock = match block {
            Some(value) => serde_json::from_value(value.clone())
                .map_err(|e| ApiError::InvalidConfig(format!("Invalid provider block: {}", e)))?,
            None => serde_json::from_value(serde_json::json!({}))
                .map_err(|e| ApiError::InvalidConfig(e.to_string()))?,
        };

        let host = block
            .host
            .or_else(|| lookup(HOST_ENV))
            .filter(|h| !h.is_empty())
            .ok_or_else(|| {
                ApiError::InvalidConfig(format!("Platform host not set (provider.host or {})", HOST_ENV))
            })?;
        let api_token = block
            .api_token
            .or_else(|| lookup(API_KEY_ENV))
            .filter(|t| !t.is_empty())
            .ok_or_else(|| {
                ApiError::InvalidConfig(format!(
                    "API token not set (provider.api_token or {})",
                    API_KEY_ENV
                ))
            })?;
        if block.poll_interval_secs == 0 {
            return Err(ApiError::InvalidConfig(
                "poll_interval_secs must be positive".to_string(),
            ));
        }

        Ok(Self {
            host,
            api_token,
            use_secure: block.use_secure,
            customer_uuid: block.customer_uuid,
            poll_interval: Duration::from_secs(block.poll_interval_secs),
        })
    }
}

/// Customer id and token overriding the provider's for one resource
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConnectionInfo {
    pub customer_uuid: Option<String>,
    pub api_token: Option<String>,
}

impl ConnectionInfo {
    /// Extract the `connection_info { cuuid, api_token }` block
    pub fn from_attributes(attributes: &HashMap<String, Value>) -> Self {
        let Some(block) = attributes.get("connection_info").and_then(Value::as_map) else {
            return Self::default();
        };
        let field = |name: &str| {
            block
                .get(name)
                .and_then(Value::as_str)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };
        Self {
            customer_uuid: field("cuuid"),
            api_token: field("api_token"),
        }
    }
}

pub fn connection_info_schema() -> AttributeSchema {
    AttributeSchema::new(
        "connection_info",
        AttributeType::Struct {
            name: "ConnectionInfo".to_string(),
            fields: vec![
                AttributeSchema::new("cuuid", AttributeType::String)
                    .with_description("Customer UUID"),
                AttributeSchema::new("api_token", AttributeType::String)
                    .sensitive()
                    .with_description("Customer API token"),
            ],
        },
    )
    .with_description("Customer and token to use instead of the provider's")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn test_provider_block_defaults() {
        let config = ProviderConfig::from_json(
            Some(&json!({"host": "yba.local", "api_token": "t"})),
            no_env,
        )
        .unwrap();
        assert_eq!(config.host, "yba.local");
        assert!(config.use_secure);
        assert_eq!(config.customer_uuid, None);
        assert_eq!(config.poll_interval, Duration::from_secs(10));
    }

    #[test]
    fn test_provider_block_env_fallback() {
        let lookup = |name: &str| match name {
            HOST_ENV => Some("10.1.1.1:9000".to_string()),
            API_KEY_ENV => Some("env-token".to_string()),
            _ => None,
        };
        let config =
            ProviderConfig::from_json(Some(&json!({"use_secure": false})), lookup).unwrap();
        assert_eq!(config.host, "10.1.1.1:9000");
        assert_eq!(config.api_token, "env-token");
        assert!(!config.use_secure);

        let config = ProviderConfig::from_json(None, lookup).unwrap();
        assert_eq!(config.api_token, "env-token");
    }

    #[test]
    fn test_provider_block_errors() {
        assert!(ProviderConfig::from_json(Some(&json!({"api_token": "t"})), no_env).is_err());
        assert!(ProviderConfig::from_json(Some(&json!({"host": "h"})), no_env).is_err());
        assert!(
            ProviderConfig::from_json(
                Some(&json!({"host": "h", "api_token": "t", "poll_interval_secs": 0})),
                no_env
            )
            .is_err()
        );
        assert!(
            ProviderConfig::from_json(
                Some(&json!({"host": "h", "api_token": "t", "region": "us"})),
                no_env
            )
            .is_err()
        );
    }

    #[test]
    fn test_connection_info_from_attributes() {
        let attributes = HashMap::from([(
            "connection_info".to_string(),
            Value::Map(HashMap::from([
                ("cuuid".to_string(), Value::String("c-2".to_string())),
                ("api_token".to_string(), Value::String(String::new())),
            ])),
        )]);
        let info = ConnectionInfo::from_attributes(&attributes);
        assert_eq!(info.customer_uuid.as_deref(), Some("c-2"));
        assert_eq!(info.api_token, None);

        assert_eq!(
            ConnectionInfo::from_attributes(&HashMap::new()),
            ConnectionInfo::default()
        );
    }
}
