//! Error types for the stackform-alarms crate.

use thiserror::Error;

/// Errors raised by the alarm adapters and their collaborators.
#[derive(Debug, Error)]
pub enum AlarmError {
    /// The external alarm does not exist (anymore).
    #[error("alarm not found: {id}")]
    AlarmNotFound {
        /// The alarm identifier that was not found.
        id: String,
    },

    /// No legacy watch rule is stored under the given name.
    #[error("watch rule not found: {name}")]
    WatchRuleNotFound {
        /// The watch rule name that was not found.
        name: String,
    },

    /// A watch rule with the given name is already stored.
    #[error("watch rule already exists: {name}")]
    WatchRuleExists {
        /// The conflicting watch rule name.
        name: String,
    },

    /// A property value cannot be used.
    #[error("invalid property {name}: {reason}")]
    InvalidProperty {
        /// The property name.
        name: String,
        /// Why the value was rejected.
        reason: String,
    },

    /// The operation needs an external alarm but none was created yet.
    #[error("resource {resource} has no alarm yet")]
    NotCreated {
        /// Physical name of the resource.
        resource: String,
    },

    /// The alarm service answered with a non-success status.
    #[error("alarm API error (status {status}): {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Response body or reason phrase.
        message: String,
    },

    /// The request never reached the alarm service.
    #[error("transport error: {0}")]
    Transport(String),

    /// Invalid configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// The on-disk watch rule snapshot could not be read or written.
    #[error("persistence error: {0}")]
    Persistence(String),
}

impl AlarmError {
    /// Creates an invalid property error.
    #[must_use]
    pub fn invalid_property(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidProperty {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// Returns true for the "already gone" family of errors.
    ///
    /// Delete paths treat these as success.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::AlarmNotFound { .. } | Self::WatchRuleNotFound { .. }
        )
    }
}

impl From<serde_json::Error> for AlarmError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<reqwest::Error> for AlarmError {
    fn from(err: reqwest::Error) -> Self {
        Self::Transport(err.to_string())
    }
}

impl From<std::io::Error> for AlarmError {
    fn from(err: std::io::Error) -> Self {
        Self::Persistence(err.to_string())
    }
}

impl From<toml::de::Error> for AlarmError {
    fn from(err: toml::de::Error) -> Self {
        Self::Config(format!("invalid TOML: {err}"))
    }
}

/// Result type for alarm operations.
pub type Result<T> = std::result::Result<T, AlarmError>;

/// Swallows not-found errors, passing every other outcome through.
///
/// # Errors
///
/// Returns the original error unless [`AlarmError::is_not_found`] holds.
pub fn ignore_not_found(result: Result<()>) -> Result<()> {
    match result {
        Err(err) if err.is_not_found() => {
            tracing::debug!(error = %err, "ignoring not found");
            Ok(())
        }
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_alarm_not_found() {
        let err = AlarmError::AlarmNotFound {
            id: "abc-123".to_string(),
        };
        assert_eq!(err.to_string(), "alarm not found: abc-123");
    }

    #[test]
    fn error_display_invalid_property() {
        let err = AlarmError::invalid_property("threshold", "must be a number");
        assert_eq!(
            err.to_string(),
            "invalid property threshold: must be a number"
        );
    }

    #[test]
    fn error_display_api() {
        let err = AlarmError::Api {
            status: 503,
            message: "service unavailable".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "alarm API error (status 503): service unavailable"
        );
    }

    #[test]
    fn not_found_classification() {
        assert!(AlarmError::AlarmNotFound { id: "a".into() }.is_not_found());
        assert!(AlarmError::WatchRuleNotFound { name: "w".into() }.is_not_found());
        assert!(!AlarmError::WatchRuleExists { name: "w".into() }.is_not_found());
        assert!(!AlarmError::Transport("refused".into()).is_not_found());
        assert!(
            !AlarmError::Api {
                status: 500,
                message: String::new()
            }
            .is_not_found()
        );
    }

    #[test]
    fn ignore_not_found_swallows_only_not_found() {
        assert!(ignore_not_found(Ok(())).is_ok());
        assert!(ignore_not_found(Err(AlarmError::AlarmNotFound { id: "x".into() })).is_ok());
        assert!(ignore_not_found(Err(AlarmError::WatchRuleNotFound { name: "x".into() })).is_ok());

        let kept = ignore_not_found(Err(AlarmError::Transport("reset".into())));
        assert!(matches!(kept, Err(AlarmError::Transport(_))));
    }

    #[test]
    fn error_from_serde_json() {
        let json_err = serde_json::from_str::<String>("invalid json");
        assert!(json_err.is_err());
        let err: AlarmError = json_err.unwrap_err().into();
        assert!(matches!(err, AlarmError::Serialization(_)));
    }

    #[test]
    fn error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err = AlarmError::from(io_err);
        assert!(matches!(err, AlarmError::Persistence(_)));
    }
}
