//! RecoveryConfig - 失敗時のポリシー設定
//!
//! ```toml
//! on_malformed  = "abort"   # or "skip"
//! on_unresolved = "abort"   # or "skip"
//! ```
//!
//! キーが無い場合はどちらも `abort`（どんな失敗も致命的）。

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// What to do with a collected, record-scoped failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    /// Stop the pass; the outcome is FAILED.
    #[default]
    Abort,
    /// Log, skip the record and keep going.
    Skip,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RecoveryConfig {
    /// Malformed records and unknown types.
    pub on_malformed: FailurePolicy,

    /// Objects still waiting when the record stream is exhausted.
    pub on_unresolved: FailurePolicy,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse recovery config: {0}")]
    Parse(#[from] toml::de::Error),
}

impl RecoveryConfig {
    /// Skip-and-log for every collected failure.
    pub fn permissive() -> Self {
        Self {
            on_malformed: FailurePolicy::Skip,
            on_unresolved: FailurePolicy::Skip,
        }
    }

    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(contents)?)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&contents)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_are_fatal() {
        let config = RecoveryConfig::default();
        assert_eq!(config.on_malformed, FailurePolicy::Abort);
        assert_eq!(config.on_unresolved, FailurePolicy::Abort);
    }

    #[test]
    fn missing_keys_fall_back_to_abort() {
        let config = RecoveryConfig::from_toml_str("on_unresolved = \"skip\"\n").unwrap();
        assert_eq!(config.on_malformed, FailurePolicy::Abort);
        assert_eq!(config.on_unresolved, FailurePolicy::Skip);
    }

    #[test]
    fn unknown_policy_is_a_parse_error() {
        let err = RecoveryConfig::from_toml_str("on_malformed = \"ignore\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn loads_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "on_malformed = \"skip\"").unwrap();

        let config = RecoveryConfig::load(file.path()).unwrap();
        assert_eq!(config.on_malformed, FailurePolicy::Skip);
        assert_eq!(config.on_unresolved, FailurePolicy::Abort);
    }

    #[test]
    fn missing_file_is_a_read_error() {
        let err = RecoveryConfig::load(Path::new("/nonexistent/recovery.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
