//! Error types for the vigil-alerts crate.

use thiserror::Error;

/// Errors that can occur in the alerting system.
#[derive(Debug, Error)]
pub enum AlertError {
    /// Invalid alert rule configuration.
    #[error("invalid alert rule: {reason}")]
    InvalidRule {
        /// The reason the rule is invalid.
        reason: String,
    },

    /// The rule's comparison operator is not one of the supported symbols.
    #[error("unknown comparison operator: '{operator}'")]
    UnknownOperator {
        /// The operator text as configured.
        operator: String,
    },

    /// The metric source could not supply a value.
    #[error("sample unavailable: {0}")]
    SampleUnavailable(#[from] vigil_metrics::MetricsError),

    /// Notification delivery failed.
    #[error("notification failed: {reason}")]
    NotificationFailed {
        /// The reason the notification failed.
        reason: String,
    },

    /// Rule evaluation failed unexpectedly.
    #[error("rule evaluation failed: {reason}")]
    EvaluationFailed {
        /// What went wrong.
        reason: String,
    },

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    SerializationError(String),
}

impl AlertError {
    /// Returns true if this error reflects a configuration mistake rather than
    /// a runtime condition.
    #[must_use]
    pub const fn is_configuration(&self) -> bool {
        matches!(self, Self::InvalidRule { .. } | Self::UnknownOperator { .. })
    }
}

impl From<serde_json::Error> for AlertError {
    fn from(err: serde_json::Error) -> Self {
        Self::SerializationError(err.to_string())
    }
}

/// Result type for alert operations.
pub type Result<T> = std::result::Result<T, AlertError>;

#[cfg(test)]
mod tests {
    use super::*;
    use vigil_metrics::MetricsError;

    #[test]
    fn error_display_invalid_rule() {
        let err = AlertError::InvalidRule {
            reason: "empty name".to_string(),
        };
        assert_eq!(err.to_string(), "invalid alert rule: empty name");
        assert!(err.is_configuration());
    }

    #[test]
    fn error_display_unknown_operator() {
        let err = AlertError::UnknownOperator {
            operator: "=~".to_string(),
        };
        assert_eq!(err.to_string(), "unknown comparison operator: '=~'");
        assert!(err.is_configuration());
    }

    #[test]
    fn error_from_metrics_error() {
        let err: AlertError = MetricsError::Unavailable {
            name: "up".to_string(),
        }
        .into();
        assert!(matches!(err, AlertError::SampleUnavailable(_)));
        assert!(!err.is_configuration());
        assert_eq!(err.to_string(), "sample unavailable: no data for metric: up");
    }

    #[test]
    fn error_display_notification_failed() {
        let err = AlertError::NotificationFailed {
            reason: "connection refused".to_string(),
        };
        assert_eq!(err.to_string(), "notification failed: connection refused");
    }

    #[test]
    fn error_from_serde_json() {
        let json_err = serde_json::from_str::<String>("invalid json");
        assert!(json_err.is_err());
        let alert_err: AlertError = json_err.unwrap_err().into();
        assert!(matches!(alert_err, AlertError::SerializationError(_)));
    }
}
