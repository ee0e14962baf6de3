//! Error types for the vigil-metrics crate.

use thiserror::Error;

/// Errors that can occur while sampling a metric.
#[derive(Debug, Error)]
pub enum MetricsError {
    /// The source answered but had no data for the metric.
    #[error("no data for metric: {name}")]
    Unavailable {
        /// The metric name that had no data.
        name: String,
    },

    /// The metric name is invalid (empty).
    #[error("invalid metric name: {reason}")]
    InvalidMetricName {
        /// The reason the name is invalid.
        reason: String,
    },

    /// The request to the metric backend failed.
    #[error("metric query failed: {reason}")]
    QueryFailed {
        /// The reason the query failed.
        reason: String,
    },

    /// The backend returned a payload that could not be interpreted.
    #[error("invalid metric response: {reason}")]
    InvalidResponse {
        /// What was wrong with the payload.
        reason: String,
    },

    /// The sample did not complete in time.
    #[error("timed out sampling metric: {name}")]
    Timeout {
        /// The metric name being sampled.
        name: String,
    },
}

impl MetricsError {
    /// Returns true if the source simply had no data, as opposed to failing.
    #[must_use]
    pub const fn is_unavailable(&self) -> bool {
        matches!(self, Self::Unavailable { .. })
    }
}

impl From<reqwest::Error> for MetricsError {
    fn from(err: reqwest::Error) -> Self {
        Self::QueryFailed {
            reason: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for MetricsError {
    fn from(err: serde_json::Error) -> Self {
        Self::InvalidResponse {
            reason: err.to_string(),
        }
    }
}

/// Result type for metrics operations.
pub type Result<T> = std::result::Result<T, MetricsError>;
