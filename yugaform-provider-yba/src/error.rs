//! Errors returned by the YBA REST client and the task helpers

use std::time::Duration;

use reqwest::StatusCode;
use thiserror::Error;
use yugaform_core::provider::ProviderError;

#[derive(Debug, Error)]
pub enum ApiError {
    /// The platform answered with a non-success status
    #[error("{operation} failed ({status}): {message}")]
    Http {
        operation: String,
        status: u16,
        message: String,
    },

    #[error("Request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Failed to decode response of {operation}: {message}")]
    Decode { operation: String, message: String },

    /// A platform task reached a terminal failure status
    #[error("Task {task_uuid} ended with status {status}: {details}")]
    TaskFailed {
        task_uuid: String,
        status: String,
        details: String,
    },

    #[error("Timed out after {timeout:?} waiting for task {task_uuid}")]
    TaskTimeout { task_uuid: String, timeout: Duration },

    #[error("{action} below version {min} is not supported, currently on {current}")]
    UnsupportedVersion {
        action: String,
        min: String,
        current: String,
    },

    #[error("Invalid platform version '{0}'")]
    InvalidVersion(String),

    #[error("Response of {operation} is missing {field}")]
    MissingField {
        operation: String,
        field: &'static str,
    },

    #[error("{0}")]
    InvalidConfig(String),
}

impl ApiError {
    /// Build an HTTP error from a failed response body.
    ///
    /// The platform reports failures as `{"success": false, "error": ...}`;
    /// the `error` member is used when present, the raw body otherwise.
    pub fn http(operation: impl Into<String>, status: StatusCode, body: &str) -> Self {
        let message = match serde_json::from_str::<serde_json::Value>(body) {
            Ok(json) => match json.get("error") {
                Some(serde_json::Value::String(s)) => s.clone(),
                Some(other) => other.to_string(),
                None => body.trim().to_string(),
            },
            Err(_) => body.trim().to_string(),
        };
        let message = if message.is_empty() {
            status
                .canonical_reason()
                .unwrap_or("no response body")
                .to_string()
        } else {
            message
        };
        Self::Http {
            operation: operation.into(),
            status: status.as_u16(),
            message,
        }
    }

    pub fn decode(operation: impl Into<String>, message: impl ToString) -> Self {
        Self::Decode {
            operation: operation.into(),
            message: message.to_string(),
        }
    }

    pub fn missing(operation: impl Into<String>, field: &'static str) -> Self {
        Self::MissingField {
            operation: operation.into(),
            field,
        }
    }

    /// Whether the platform reports the addressed object as unknown.
    ///
    /// Lookups by UUID answer 400 "Cannot find ..." / "Invalid ... UUID"
    /// rather than 404 on most endpoints.
    pub fn is_not_found(&self) -> bool {
        match self {
            ApiError::Http {
                status: 404, ..
            } => true,
            ApiError::Http {
                status: 400,
                message,
                ..
            } => {
                message.contains("Cannot find")
                    || (message.starts_with("Invalid") && message.contains("UUID"))
            }
            _ => false,
        }
    }
}

impl From<ApiError> for ProviderError {
    fn from(error: ApiError) -> Self {
        ProviderError::new(error.to_string()).with_cause(error)
    }
}
