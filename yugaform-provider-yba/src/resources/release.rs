//! release resource
//!
//! A YugabyteDB software release imported into the platform from S3, GCS or
//! an HTTP location, identified by its version string.

use std::collections::HashMap;

use log::debug;
use serde::{Deserialize, Serialize};
use yugaform_core::provider::ResourceType;
use yugaform_core::resource::{Resource, ResourceId, State, Value};
use yugaform_core::schema::{AttributeSchema, AttributeType, ResourceSchema};

use super::{
    OperationContext, carry_meta_attributes, decode_attributes, encode_attributes,
    with_common_attributes,
};
use crate::error::ApiError;
use crate::models::{GcsLocation, HttpLocation, PackagePaths, ReleaseSpec, S3Location};

pub const RESOURCE_TYPE: &str = "release";

const LOCATIONS: &[&str] = &["s3", "gcs", "http"];

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ReleaseConfig {
    pub version: String,
    pub s3: Option<S3Config>,
    pub gcs: Option<GcsConfig>,
    pub http: Option<HttpConfig>,
    pub state: Option<String>,
    pub image_tag: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct S3Config {
    pub access_key_id: String,
    pub secret_access_key: String,
    #[serde(default)]
    pub paths: PackagePaths,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct GcsConfig {
    pub credentials_json: String,
    #[serde(default)]
    pub paths: PackagePaths,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct HttpConfig {
    #[serde(default)]
    pub paths: PackagePaths,
}

impl ReleaseConfig {
    fn to_request(&self) -> ReleaseSpec {
        ReleaseSpec {
            s3: self.s3.as_ref().map(|s3| S3Location {
                access_key_id: s3.access_key_id.clone(),
                secret_access_key: s3.secret_access_key.clone(),
                paths: s3.paths.clone(),
            }),
            gcs: self.gcs.as_ref().map(|gcs| GcsLocation {
                credentials_json: gcs.credentials_json.clone(),
                paths: gcs.paths.clone(),
            }),
            http: self.http.as_ref().map(|http| HttpLocation {
                paths: http.paths.clone(),
            }),
            state: None,
            image_tag: None,
        }
    }

    fn from_remote(version: &str, spec: &ReleaseSpec) -> Self {
        ReleaseConfig {
            version: version.to_string(),
            s3: spec.s3.as_ref().map(|s3| S3Config {
                access_key_id: s3.access_key_id.clone(),
                secret_access_key: s3.secret_access_key.clone(),
                paths: s3.paths.clone(),
            }),
            gcs: spec.gcs.as_ref().map(|gcs| GcsConfig {
                credentials_json: gcs.credentials_json.clone(),
                paths: gcs.paths.clone(),
            }),
            http: spec.http.as_ref().map(|http| HttpConfig {
                paths: http.paths.clone(),
            }),
            state: spec.state.clone(),
            image_tag: spec.image_tag.clone(),
        }
    }

    /// Replace masked credentials with the recorded ones
    fn restore_secrets(&mut self, recorded: &ReleaseConfig) {
        if let (Some(current), Some(recorded)) = (&mut self.s3, &recorded.s3) {
            restore(&mut current.access_key_id, &recorded.access_key_id);
            restore(&mut current.secret_access_key, &recorded.secret_access_key);
        }
        if let (Some(current), Some(recorded)) = (&mut self.gcs, &recorded.gcs) {
            restore(&mut current.credentials_json, &recorded.credentials_json);
        }
    }
}

fn restore(value: &mut String, recorded: &str) {
    if value.is_empty() || value.contains("**") {
        *value = recorded.to_string();
    }
}

fn paths_schema() -> AttributeSchema {
    AttributeSchema::new(
        "paths",
        AttributeType::Struct {
            name: "PackagePaths".to_string(),
            fields: vec![
                AttributeSchema::new("x86_64", AttributeType::String)
                    .required()
                    .with_description("Path to the x86_64 package"),
                AttributeSchema::new("x86_64_checksum", AttributeType::String)
                    .with_description("Checksum of the x86_64 package"),
            ],
        },
    )
    .required()
    .with_description("Package path and checksum")
}

pub struct ReleaseType;

impl ResourceType for ReleaseType {
    fn name(&self) -> &'static str {
        RESOURCE_TYPE
    }

    fn schema(&self) -> ResourceSchema {
        let schema = ResourceSchema::new(RESOURCE_TYPE)
            .with_description("YugabyteDB Release Resource")
            .attribute(
                AttributeSchema::new("version", AttributeType::String)
                    .required()
                    .force_new()
                    .with_description("Version of the release"),
            )
            .attribute(
                AttributeSchema::new(
                    "s3",
                    AttributeType::Struct {
                        name: "S3".to_string(),
                        fields: vec![
                            AttributeSchema::new("access_key_id", AttributeType::String)
                                .required()
                                .sensitive()
                                .with_description("S3 Access Key ID"),
                            AttributeSchema::new("secret_access_key", AttributeType::String)
                                .required()
                                .sensitive()
                                .with_description("S3 Secret Access Key"),
                            paths_schema(),
                        ],
                    },
                )
                .force_new()
                .sensitive()
                .with_description("Location of the release in S3"),
            )
            .attribute(
                AttributeSchema::new(
                    "gcs",
                    AttributeType::Struct {
                        name: "GCS".to_string(),
                        fields: vec![
                            AttributeSchema::new("credentials_json", AttributeType::String)
                                .required()
                                .sensitive()
                                .with_description("GCS service account credentials"),
                            paths_schema(),
                        ],
                    },
                )
                .force_new()
                .sensitive()
                .with_description("Location of the release in GCS"),
            )
            .attribute(
                AttributeSchema::new(
                    "http",
                    AttributeType::Struct {
                        name: "HTTP".to_string(),
                        fields: vec![paths_schema()],
                    },
                )
                .force_new()
                .with_description("HTTP location of the release"),
            )
            .attribute(
                AttributeSchema::new("state", AttributeType::String)
                    .computed()
                    .with_description("State of the release on the platform"),
            )
            .attribute(
                AttributeSchema::new("image_tag", AttributeType::String)
                    .computed()
                    .with_description("Docker image tag of the release"),
            );
        with_common_attributes(schema)
    }

    fn supports_update(&self) -> bool {
        false
    }

    fn validate_diff(
        &self,
        _old: Option<&HashMap<String, Value>>,
        new: &HashMap<String, Value>,
    ) -> Result<(), Vec<String>> {
        let declared = LOCATIONS
            .iter()
            .filter(|key| new.contains_key(**key))
            .count();
        if declared == 1 {
            Ok(())
        } else {
            Err(vec!["Exactly one of s3, gcs or http must be set".to_string()])
        }
    }
}

// =============================================================================
// Lifecycle
// =============================================================================

pub async fn create(ctx: &OperationContext, resource: &Resource) -> Result<State, ApiError> {
    let desired: ReleaseConfig = decode_attributes(RESOURCE_TYPE, &resource.attributes)?;
    ctx.api
        .create_release(&desired.version, &desired.to_request())
        .await?;
    debug!("Imported release {}", desired.version);

    let prior = State::existing(resource.id.clone(), resource.attributes.clone());
    read(ctx, &resource.id, &desired.version, Some(&prior)).await
}

pub async fn read(
    ctx: &OperationContext,
    id: &ResourceId,
    version: &str,
    prior: Option<&State>,
) -> Result<State, ApiError> {
    let releases = ctx.api.list_releases().await?;
    let Some(spec) = releases.get(version) else {
        return Ok(State::not_found(id.clone()));
    };

    let mut current = ReleaseConfig::from_remote(version, spec);
    if let Some(prior) = prior {
        let recorded: ReleaseConfig = decode_attributes(RESOURCE_TYPE, &prior.attributes)?;
        current.restore_secrets(&recorded);
    }

    let mut attributes = encode_attributes(RESOURCE_TYPE, &current)?;
    if let Some(prior) = prior {
        carry_meta_attributes(&mut attributes, &prior.attributes);
    }
    Ok(State::existing(id.clone(), attributes).with_identifier(version))
}

pub async fn delete(ctx: &OperationContext, version: &str) -> Result<(), ApiError> {
    match ctx.api.delete_release(version).await {
        Ok(_) => Ok(()),
        Err(e) if e.is_not_found() => Ok(()),
        Err(e) => Err(e),
    }
}
