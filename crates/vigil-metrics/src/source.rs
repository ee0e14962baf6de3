//! The [`MetricSource`] trait and an in-memory implementation.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::error::{MetricsError, Result};

/// Supplies the current value of a named metric.
///
/// Implementations must not hold locks across awaits; the evaluation loop
/// calls [`sample`](Self::sample) outside of any alert-store critical section.
pub trait MetricSource: Send + Sync {
    /// Returns the current value for `metric`.
    ///
    /// # Errors
    ///
    /// Returns [`MetricsError::Unavailable`] when there is no data, or another
    /// variant when the backend could not be queried.
    fn sample(&self, metric: &str) -> impl Future<Output = Result<f64>> + Send;

    /// Returns true if the backend is reachable.
    fn health_check(&self) -> impl Future<Output = bool> + Send {
        async { true }
    }
}

impl<T: MetricSource> MetricSource for Arc<T> {
    fn sample(&self, metric: &str) -> impl Future<Output = Result<f64>> + Send {
        (**self).sample(metric)
    }

    fn health_check(&self) -> impl Future<Output = bool> + Send {
        (**self).health_check()
    }
}

/// Metric source backed by a map of fixed values.
///
/// Values can be changed at any time from another task, which makes this the
/// source of choice for driving the evaluator in tests.
#[derive(Debug)]
pub struct InMemorySource {
    values: RwLock<HashMap<String, f64>>,
    healthy: RwLock<bool>,
}

impl InMemorySource {
    /// Creates an empty, healthy source.
    #[must_use]
    pub fn new() -> Self {
        Self {
            values: RwLock::new(HashMap::new()),
            healthy: RwLock::new(true),
        }
    }

    /// Sets the value returned for `metric`.
    pub fn set(&self, metric: impl Into<String>, value: f64) {
        self.values.write().insert(metric.into(), value);
    }

    /// Removes `metric`, making subsequent samples unavailable.
    pub fn remove(&self, metric: &str) -> Option<f64> {
        self.values.write().remove(metric)
    }

    /// Sets what [`MetricSource::health_check`] reports.
    pub fn set_healthy(&self, healthy: bool) {
        *self.healthy.write() = healthy;
    }
}

impl Default for InMemorySource {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricSource for InMemorySource {
    fn sample(&self, metric: &str) -> impl Future<Output = Result<f64>> + Send {
        let result = self
            .values
            .read()
            .get(metric)
            .copied()
            .ok_or_else(|| MetricsError::Unavailable {
                name: metric.to_string(),
            });
        async move { result }
    }

    fn health_check(&self) -> impl Future<Output = bool> + Send {
        let healthy = *self.healthy.read();
        async move { healthy }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn sample_returns_set_value() {
        let source = InMemorySource::new();
        source.set("cpu_usage", 42.0);

        let value = source.sample("cpu_usage").await;
        assert!(value.is_ok());
        assert!((value.unwrap() - 42.0).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn sample_missing_metric_is_unavailable() {
        let source = InMemorySource::new();

        let err = source.sample("missing").await.unwrap_err();
        assert!(err.is_unavailable());
    }

    #[tokio::test]
    async fn remove_makes_metric_unavailable() {
        let source = InMemorySource::new();
        source.set("battery_percent", 12.0);
        assert_eq!(source.remove("battery_percent"), Some(12.0));

        assert!(source.sample("battery_percent").await.is_err());
    }

    #[tokio::test]
    async fn health_check_follows_flag() {
        let source = InMemorySource::new();
        assert!(source.health_check().await);

        source.set_healthy(false);
        assert!(!source.health_check().await);
    }

    #[tokio::test]
    async fn arc_source_delegates() {
        let source = Arc::new(InMemorySource::new());
        source.set("humidity_percent", 55.0);

        let value = MetricSource::sample(&source, "humidity_percent").await;
        assert!(value.is_ok());
    }
}
