//! Alarm service configuration.
//!
//! Loaded from TOML:
//!
//! ```toml
//! endpoint = "http://metering.internal:8777"
//! auth_token = "secret"
//! timeout_secs = 30
//! watch_rule_path = "/var/lib/stackform/watch-rules"
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{AlarmError, Result};

/// Where the alarm service lives and how to reach it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlarmServiceConfig {
    /// Base URL of the alarm service.
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    /// Token sent as `X-Auth-Token`.
    #[serde(default)]
    pub auth_token: Option<String>,
    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Directory of the file-backed watch rule store.
    #[serde(default)]
    pub watch_rule_path: Option<PathBuf>,
}

fn default_endpoint() -> String {
    "http://localhost:8777".to_string()
}

const fn default_timeout_secs() -> u64 {
    30
}

impl Default for AlarmServiceConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            auth_token: None,
            timeout_secs: default_timeout_secs(),
            watch_rule_path: None,
        }
    }
}

impl AlarmServiceConfig {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            AlarmError::Config(format!(
                "failed to read config file '{}': {}",
                path.as_ref().display(),
                e
            ))
        })?;

        Self::from_toml(&content)
    }

    /// Parse configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML is invalid.
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Sets the endpoint.
    #[must_use]
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// Returns the request timeout.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid.
    pub fn validate(&self) -> Result<()> {
        if self.endpoint.is_empty() {
            return Err(AlarmError::Config("endpoint cannot be empty".to_string()));
        }

        if !self.endpoint.starts_with("http://") && !self.endpoint.starts_with("https://") {
            return Err(AlarmError::Config(format!(
                "endpoint must start with http:// or https://, got '{}'",
                self.endpoint
            )));
        }

        if self.timeout_secs == 0 {
            return Err(AlarmError::Config(
                "timeout_secs must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = AlarmServiceConfig::default();
        assert_eq!(config.endpoint, "http://localhost:8777");
        assert_eq!(config.timeout(), Duration::from_secs(30));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn parse_full_toml() {
        let config = AlarmServiceConfig::from_toml(
            r#"
            endpoint = "https://metering.internal:8777"
            auth_token = "secret"
            timeout_secs = 5
            watch_rule_path = "/var/lib/stackform/watch-rules"
            "#,
        )
        .unwrap();

        assert_eq!(config.endpoint, "https://metering.internal:8777");
        assert_eq!(config.auth_token.as_deref(), Some("secret"));
        assert_eq!(config.timeout_secs, 5);
        assert_eq!(
            config.watch_rule_path,
            Some(PathBuf::from("/var/lib/stackform/watch-rules"))
        );
    }

    #[test]
    fn parse_empty_toml_uses_defaults() {
        let config = AlarmServiceConfig::from_toml("").unwrap();
        assert_eq!(config, AlarmServiceConfig::default());
    }

    #[test]
    fn rejects_invalid_toml() {
        let err = AlarmServiceConfig::from_toml("endpoint = ").unwrap_err();
        assert!(matches!(err, AlarmError::Config(_)));
    }

    #[test]
    fn rejects_bad_endpoint() {
        let err = AlarmServiceConfig::from_toml(r#"endpoint = "ftp://x""#).unwrap_err();
        assert!(err.to_string().contains("http://"));

        let config = AlarmServiceConfig::default().with_endpoint("");
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_zero_timeout() {
        let err = AlarmServiceConfig::from_toml("timeout_secs = 0").unwrap_err();
        assert!(err.to_string().contains("timeout_secs"));
    }

    #[test]
    fn from_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("alarms.toml");
        std::fs::write(&path, "endpoint = \"http://10.0.0.5:8777\"\n").unwrap();

        let config = AlarmServiceConfig::from_file(&path).unwrap();
        assert_eq!(config.endpoint, "http://10.0.0.5:8777");

        let missing = AlarmServiceConfig::from_file(dir.path().join("missing.toml"));
        assert!(matches!(missing, Err(AlarmError::Config(_))));
    }
}
