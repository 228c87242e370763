//! State lock records

use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Two hours; a universe create alone may wait 60m on its task
pub const DEFAULT_LOCK_TIMEOUT_SECS: i64 = 2 * 60 * 60;

/// Command that holds the state lock
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Plan,
    Apply,
    Destroy,
    Import,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Plan => "plan",
            Operation::Apply => "apply",
            Operation::Destroy => "destroy",
            Operation::Import => "import",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Contents of the lock file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LockInfo {
    pub id: String,
    pub operation: Operation,
    /// user@host
    pub who: String,
    /// yugaform version that took the lock
    pub version: String,
    pub created: DateTime<Utc>,
    pub expires: DateTime<Utc>,
}

impl LockInfo {
    pub fn new(operation: Operation) -> Self {
        Self::with_timeout(operation, DEFAULT_LOCK_TIMEOUT_SECS)
    }

    pub fn with_timeout(operation: Operation, timeout_secs: i64) -> Self {
        let created = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            operation,
            who: lock_owner(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            created,
            expires: created + Duration::seconds(timeout_secs),
        }
    }

    pub fn is_expired(&self) -> bool {
        Utc::now() > self.expires
    }

    pub fn time_remaining(&self) -> Duration {
        self.expires - Utc::now()
    }
}

impl fmt::Display for LockInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} running {} since {} (lock ID: {}, expires in {}m)",
            self.who,
            self.operation,
            self.created.format("%Y-%m-%d %H:%M:%S UTC"),
            self.id,
            self.time_remaining().num_minutes().max(0)
        )
    }
}

fn lock_owner() -> String {
    let user = ["USER", "USERNAME"]
        .iter()
        .find_map(|name| std::env::var(name).ok())
        .unwrap_or_else(|| "unknown".to_string());
    let host = hostname::get()
        .ok()
        .and_then(|h| h.into_string().ok())
        .unwrap_or_else(|| "unknown".to_string());
    format!("{}@{}", user, host)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_lock() {
        let lock = LockInfo::new(Operation::Apply);
        assert_eq!(lock.operation, Operation::Apply);
        assert!(!lock.id.is_empty());
        assert!(lock.who.contains('@'));
        assert_eq!(lock.version, env!("CARGO_PKG_VERSION"));
        assert!(!lock.is_expired());
        assert!(lock.time_remaining().num_minutes() > 60);
    }

    #[test]
    fn test_negative_timeout_is_already_expired() {
        assert!(LockInfo::with_timeout(Operation::Import, -1).is_expired());
    }

    #[test]
    fn test_lock_file_format() {
        let lock = LockInfo::with_timeout(Operation::Destroy, 60);
        let json = serde_json::to_value(&lock).unwrap();
        assert_eq!(json["operation"], "destroy");

        let parsed: LockInfo = serde_json::from_value(json).unwrap();
        assert_eq!(parsed, lock);
    }

    #[test]
    fn test_display_names_holder_and_operation() {
        let mut lock = LockInfo::with_timeout(Operation::Apply, 600);
        lock.who = "ops@bastion".to_string();
        lock.id = "l-1".to_string();
        let text = lock.to_string();
        assert!(text.starts_with("ops@bastion running apply since "));
        assert!(text.contains("(lock ID: l-1, expires in "));
    }
}
