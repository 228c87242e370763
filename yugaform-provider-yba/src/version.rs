//! Platform version gates

use std::cmp::Ordering;
use std::fmt;
use std::sync::OnceLock;

use regex::Regex;

use crate::error::ApiError;

/// Minimum platform version to create or edit universes
pub const UNIVERSE_MIN_VERSION: &str = "2.17.1.0-b371";

/// Minimum platform version to manage backup schedules
pub const BACKUP_MIN_VERSION: &str = "2.17.3.0-b43";

fn version_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"^(\d+)\.(\d+)\.(\d+)\.(\d+)(?:-(.+))?$").ok())
        .as_ref()
}

/// Build suffix of a version (`-b371`)
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Build {
    Number(u64),
    /// Non-numeric builds (`-PRE_RELEASE`, `-customer`) are local builds of
    /// the release line and order after every numbered build
    Other(String),
}

impl Ord for Build {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Build::Number(a), Build::Number(b)) => a.cmp(b),
            (Build::Number(_), Build::Other(_)) => Ordering::Less,
            (Build::Other(_), Build::Number(_)) => Ordering::Greater,
            (Build::Other(a), Build::Other(b)) => a.cmp(b),
        }
    }
}

impl PartialOrd for Build {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// A platform version `A.B.C.D[-bN]`
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct YbaVersion {
    parts: [u64; 4],
    build: Build,
}

impl YbaVersion {
    pub fn parse(text: &str) -> Result<Self, ApiError> {
        let text = text.trim();
        let captures = version_pattern()
            .and_then(|pattern| pattern.captures(text))
            .ok_or_else(|| ApiError::InvalidVersion(text.to_string()))?;

        let mut parts = [0u64; 4];
        for (i, part) in parts.iter_mut().enumerate() {
            *part = captures[i + 1]
                .parse()
                .map_err(|_| ApiError::InvalidVersion(text.to_string()))?;
        }

        let build = match captures.get(5).map(|m| m.as_str()) {
            None => Build::Number(0),
            Some(suffix) => match suffix.strip_prefix('b').and_then(|n| n.parse().ok()) {
                Some(n) => Build::Number(n),
                None => Build::Other(suffix.to_string()),
            },
        };

        Ok(Self { parts, build })
    }
}

impl fmt::Display for YbaVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d] = self.parts;
        write!(f, "{}.{}.{}.{}", a, b, c, d)?;
        match &self.build {
            Build::Number(0) => Ok(()),
            Build::Number(n) => write!(f, "-b{}", n),
            Build::Other(s) => write!(f, "-{}", s),
        }
    }
}

/// Fail unless `current` is at least `min`.
///
/// `action` names the refused operation ("Creating universes").
pub fn ensure_min_version(current: &str, min: &str, action: &str) -> Result<(), ApiError> {
    let current_version = YbaVersion::parse(current)?;
    let min_version = YbaVersion::parse(min)?;
    if current_version >= min_version {
        Ok(())
    } else {
        Err(ApiError::UnsupportedVersion {
            action: action.to_string(),
            min: min.to_string(),
            current: current.to_string(),
        })
    }
}
