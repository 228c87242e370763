//! Cloud credentials taken from the environment
//!
//! A cloud provider's `config` map falls back to these variables for every
//! key the configuration does not declare. Lookups go through a closure so
//! the rules can be exercised without touching the process environment.

use std::collections::BTreeMap;

use crate::models::StringMap;

pub const GCP_CREDENTIALS_ENV: &str = "GOOGLE_APPLICATION_CREDENTIALS";

pub const AWS_ACCESS_KEY_ENV: &str = "AWS_ACCESS_KEY_ID";
pub const AWS_SECRET_ACCESS_KEY_ENV: &str = "AWS_SECRET_ACCESS_KEY";

pub const AZURE_SUBSCRIPTION_ID_ENV: &str = "AZURE_SUBSCRIPTION_ID";
pub const AZURE_RG_ENV: &str = "AZURE_RG";
pub const AZURE_TENANT_ID_ENV: &str = "AZURE_TENANT_ID";
pub const AZURE_CLIENT_ID_ENV: &str = "AZURE_CLIENT_ID";
pub const AZURE_CLIENT_SECRET_ENV: &str = "AZURE_CLIENT_SECRET";

/// SAS token for Azure storage configs
pub const AZURE_STORAGE_SAS_TOKEN_ENV: &str = "AZURE_STORAGE_SAS_TOKEN";

const AWS_KEYS: &[&str] = &[AWS_ACCESS_KEY_ENV, AWS_SECRET_ACCESS_KEY_ENV];

const AZURE_KEYS: &[&str] = &[
    AZURE_CLIENT_ID_ENV,
    AZURE_CLIENT_SECRET_ENV,
    AZURE_SUBSCRIPTION_ID_ENV,
    AZURE_TENANT_ID_ENV,
    AZURE_RG_ENV,
];

/// Read a variable from the process environment
pub fn process_env(name: &str) -> Option<String> {
    std::env::var(name).ok()
}

/// Variables a cloud code needs, in reporting order
pub fn required_env(code: &str) -> &'static [&'static str] {
    match code {
        "gcp" => &[GCP_CREDENTIALS_ENV],
        "aws" => AWS_KEYS,
        "azu" => AZURE_KEYS,
        _ => &[],
    }
}

fn missing_message(missing: &[&str]) -> String {
    format!("Empty env variable: {}", missing.join(" "))
}

/// Check that credentials for `code` can be assembled.
///
/// A key declared in `declared` (the provider's `config` block) satisfies the
/// requirement on its own. A GCP provider with a non-empty declared config
/// is taken to carry its credentials inline.
pub fn check_env_for_code(
    code: &str,
    declared: &StringMap,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<(), String> {
    if code == "gcp" && !declared.is_empty() {
        return Ok(());
    }
    let missing: Vec<&str> = required_env(code)
        .iter()
        .copied()
        .filter(|key| !declared.contains_key(*key) && lookup(key).is_none())
        .collect();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(missing_message(&missing))
    }
}

/// Assemble the provider config for `code`: environment defaults with the
/// declared keys on top.
pub async fn build_config(
    code: &str,
    declared: &StringMap,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<StringMap, String> {
    check_env_for_code(code, declared, &lookup)?;

    let mut config = match code {
        "gcp" => match lookup(GCP_CREDENTIALS_ENV) {
            Some(path) => gcp_credentials_from_file(&path).await?,
            None => StringMap::new(),
        },
        _ => required_env(code)
            .iter()
            .filter_map(|key| lookup(key).map(|value| (key.to_string(), value)))
            .collect(),
    };
    config.extend(declared.iter().map(|(k, v)| (k.clone(), v.clone())));
    Ok(config)
}

/// Key of the service account JSON in a GCS storage config
pub const GCS_CREDENTIALS_JSON_KEY: &str = "GCS_CREDENTIALS_JSON";

/// Complete a storage config's `data` with credentials from the
/// environment. Declared keys are never overwritten.
pub async fn fill_storage_credentials(
    code: &str,
    data: &mut StringMap,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<(), String> {
    match code {
        "S3" => {
            if data.get("IAM_INSTANCE_PROFILE").is_some_and(|v| v == "true") {
                return Ok(());
            }
            for key in AWS_KEYS {
                if !data.contains_key(*key)
                    && let Some(value) = lookup(key)
                {
                    data.insert(key.to_string(), value);
                }
            }
        }
        "GCS" => {
            if !data.contains_key(GCS_CREDENTIALS_JSON_KEY)
                && let Some(path) = lookup(GCP_CREDENTIALS_ENV)
            {
                let content = tokio::fs::read_to_string(&path)
                    .await
                    .map_err(|e| format!("Failed to read GCP credentials file {}: {}", path, e))?;
                data.insert(GCS_CREDENTIALS_JSON_KEY.to_string(), content);
            }
        }
        "AZ" => {
            if !data.contains_key(AZURE_STORAGE_SAS_TOKEN_ENV)
                && let Some(token) = lookup(AZURE_STORAGE_SAS_TOKEN_ENV)
            {
                data.insert(AZURE_STORAGE_SAS_TOKEN_ENV.to_string(), token);
            }
        }
        _ => {}
    }
    Ok(())
}

/// Flatten a service account JSON file into a string map
pub async fn gcp_credentials_from_file(path: &str) -> Result<StringMap, String> {
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| format!("Failed to read GCP credentials file {}: {}", path, e))?;
    let json: BTreeMap<String, serde_json::Value> = serde_json::from_str(&content)
        .map_err(|e| format!("Failed to parse GCP credentials file {}: {}", path, e))?;
    Ok(json
        .into_iter()
        .map(|(key, value)| {
            let value = match value {
                serde_json::Value::String(s) => s,
                other => other.to_string(),
            };
            (key, value)
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn env(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn test_missing_aws_env() {
        let err = check_env_for_code("aws", &StringMap::new(), env(&[])).unwrap_err();
        assert_eq!(
            err,
            "Empty env variable: AWS_ACCESS_KEY_ID AWS_SECRET_ACCESS_KEY"
        );

        let err = check_env_for_code(
            "aws",
            &StringMap::new(),
            env(&[(AWS_ACCESS_KEY_ENV, "AKIA")]),
        )
        .unwrap_err();
        assert_eq!(err, "Empty env variable: AWS_SECRET_ACCESS_KEY");
    }

    #[test]
    fn test_missing_azure_env_in_order() {
        let err = check_env_for_code(
            "azu",
            &StringMap::new(),
            env(&[(AZURE_CLIENT_SECRET_ENV, "s"), (AZURE_TENANT_ID_ENV, "t")]),
        )
        .unwrap_err();
        assert_eq!(
            err,
            "Empty env variable: AZURE_CLIENT_ID AZURE_SUBSCRIPTION_ID AZURE_RG"
        );
    }

    #[test]
    fn test_declared_config_satisfies_requirement() {
        let declared = StringMap::from([
            (AWS_ACCESS_KEY_ENV.to_string(), "AKIA".to_string()),
            (AWS_SECRET_ACCESS_KEY_ENV.to_string(), "secret".to_string()),
        ]);
        assert!(check_env_for_code("aws", &declared, env(&[])).is_ok());
        assert!(check_env_for_code("onprem", &StringMap::new(), env(&[])).is_ok());
    }

    #[tokio::test]
    async fn test_build_config_declared_wins() {
        let declared = StringMap::from([(AWS_ACCESS_KEY_ENV.to_string(), "declared".to_string())]);
        let config = build_config(
            "aws",
            &declared,
            env(&[
                (AWS_ACCESS_KEY_ENV, "from-env"),
                (AWS_SECRET_ACCESS_KEY_ENV, "secret"),
            ]),
        )
        .await
        .unwrap();

        assert_eq!(config[AWS_ACCESS_KEY_ENV], "declared");
        assert_eq!(config[AWS_SECRET_ACCESS_KEY_ENV], "secret");
    }

    #[tokio::test]
    async fn test_gcp_credentials_are_flattened() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"type": "service_account", "project_id": "yb-dev", "port": 443}}"#
        )
        .unwrap();
        let path = file.path().to_str().unwrap().to_string();

        let config = build_config(
            "gcp",
            &StringMap::new(),
            env(&[(GCP_CREDENTIALS_ENV, path.as_str())]),
        )
        .await
        .unwrap();

        assert_eq!(config["project_id"], "yb-dev");
        assert_eq!(config["type"], "service_account");
        assert_eq!(config["port"], "443");
    }

    #[tokio::test]
    async fn test_storage_credentials_from_env() {
        let mut data = StringMap::from([(
            "BACKUP_LOCATION".to_string(),
            "https://acct.blob.core.windows.net/backups".to_string(),
        )]);
        fill_storage_credentials("AZ", &mut data, env(&[(AZURE_STORAGE_SAS_TOKEN_ENV, "sv=2021")]))
            .await
            .unwrap();
        assert_eq!(data[AZURE_STORAGE_SAS_TOKEN_ENV], "sv=2021");

        let mut data = StringMap::from([(AWS_ACCESS_KEY_ENV.to_string(), "declared".to_string())]);
        fill_storage_credentials(
            "S3",
            &mut data,
            env(&[(AWS_ACCESS_KEY_ENV, "env"), (AWS_SECRET_ACCESS_KEY_ENV, "secret")]),
        )
        .await
        .unwrap();
        assert_eq!(data[AWS_ACCESS_KEY_ENV], "declared");
        assert_eq!(data[AWS_SECRET_ACCESS_KEY_ENV], "secret");

        let mut data = StringMap::from([("IAM_INSTANCE_PROFILE".to_string(), "true".to_string())]);
        fill_storage_credentials("S3", &mut data, env(&[(AWS_ACCESS_KEY_ENV, "env")])).await.unwrap();
        assert_eq!(data.len(), 1);

        let mut data = StringMap::new();
        fill_storage_credentials("NFS", &mut data, env(&[(AWS_ACCESS_KEY_ENV, "env")])).await.unwrap();
        assert!(data.is_empty());
    }

    #[tokio::test]
    async fn test_gcs_credentials_read_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"type": "service_account"}}"#).unwrap();
        let path = file.path().to_str().unwrap().to_string();

        let mut data = StringMap::new();
        fill_storage_credentials("GCS", &mut data, env(&[(GCP_CREDENTIALS_ENV, path.as_str())]))
            .await
            .unwrap();
        assert_eq!(data[GCS_CREDENTIALS_JSON_KEY], r#"{"type": "service_account"}"#);
    }

    #[tokio::test]
    async fn test_gcp_without_credentials() {
        let err = build_config("gcp", &StringMap::new(), env(&[])).await.unwrap_err();
        assert_eq!(err, "Empty env variable: GOOGLE_APPLICATION_CREDENTIALS");

        let err = build_config(
            "gcp",
            &StringMap::new(),
            env(&[(GCP_CREDENTIALS_ENV, "/does/not/exist.json")]),
        )
        .await
        .unwrap_err();
        assert!(err.starts_with("Failed to read GCP credentials file"));
    }
}
