//! Error types for the vigil-config crate.

use thiserror::Error;

/// Errors that can occur while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read config file '{path}': {reason}")]
    Read {
        /// The path that was read.
        path: String,
        /// The underlying I/O error.
        reason: String,
    },

    /// The file is not valid TOML or does not match the expected shape.
    #[error("invalid TOML: {reason}")]
    Parse {
        /// The parser's message.
        reason: String,
    },

    /// The configuration parsed but a value is unusable.
    #[error("invalid configuration: {reason}")]
    Invalid {
        /// What is wrong.
        reason: String,
    },
}

impl ConfigError {
    pub(crate) fn invalid(reason: impl Into<String>) -> Self {
        Self::Invalid {
            reason: reason.into(),
        }
    }
}

impl From<toml::de::Error> for ConfigError {
    fn from(err: toml::de::Error) -> Self {
        Self::Parse {
            reason: err.to_string(),
        }
    }
}

/// Result type for configuration operations.
pub type Result<T> = std::result::Result<T, ConfigError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_read() {
        let err = ConfigError::Read {
            path: "vigil.toml".to_string(),
            reason: "not found".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "failed to read config file 'vigil.toml': not found"
        );
    }

    #[test]
    fn error_display_invalid() {
        let err = ConfigError::invalid("at least one alert rule is required");
        assert_eq!(
            err.to_string(),
            "invalid configuration: at least one alert rule is required"
        );
    }

    #[test]
    fn error_from_toml() {
        let parsed: std::result::Result<toml::Value, _> = toml::from_str("key = ");
        let err: ConfigError = parsed.unwrap_err().into();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }
}
