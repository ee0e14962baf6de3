//! Metric source backed by the Prometheus HTTP query API.
//!
//! Each sample is an instant query (`GET /api/v1/query?query=<metric>`); the
//! first series in the result vector supplies the value.

use std::future::Future;
use std::time::Duration;

use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::{MetricsError, Result};
use crate::source::MetricSource;

/// Configuration for a [`PrometheusSource`].
#[derive(Debug, Clone)]
pub struct PrometheusSourceConfig {
    /// Base URL of the Prometheus server, e.g. `http://localhost:9090`.
    pub url: String,
    /// Timeout applied to every query.
    pub query_timeout: Duration,
    /// Timeout applied to health checks.
    pub health_timeout: Duration,
}

impl PrometheusSourceConfig {
    /// Creates a configuration with default timeouts.
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            query_timeout: Duration::from_secs(10),
            health_timeout: Duration::from_secs(5),
        }
    }

    /// Sets the query timeout.
    #[must_use]
    pub const fn with_query_timeout(mut self, timeout: Duration) -> Self {
        self.query_timeout = timeout;
        self
    }
}

/// Queries metric values from a Prometheus server.
#[derive(Debug, Clone)]
pub struct PrometheusSource {
    base_url: String,
    client: reqwest::Client,
    config: PrometheusSourceConfig,
}

impl PrometheusSource {
    /// Creates a new source.
    ///
    /// # Errors
    ///
    /// Returns [`MetricsError::QueryFailed`] if the URL is empty or the HTTP
    /// client cannot be built.
    pub fn new(config: PrometheusSourceConfig) -> Result<Self> {
        let base_url = config.url.trim_end_matches('/').to_string();
        if base_url.is_empty() {
            return Err(MetricsError::QueryFailed {
                reason: "prometheus URL cannot be empty".to_string(),
            });
        }

        let client = reqwest::Client::builder()
            .timeout(config.query_timeout)
            .build()?;

        Ok(Self {
            base_url,
            client,
            config,
        })
    }

    /// Returns the instant-query endpoint.
    #[must_use]
    pub fn query_url(&self) -> String {
        format!("{}/api/v1/query", self.base_url)
    }

    async fn query(&self, metric: &str) -> Result<f64> {
        if metric.is_empty() {
            return Err(MetricsError::InvalidMetricName {
                reason: "metric name cannot be empty".to_string(),
            });
        }

        let response = self
            .client
            .get(self.query_url())
            .query(&[("query", metric)])
            .send()
            .await?
            .error_for_status()?;

        let body = response.text().await?;
        parse_query_response(&body, metric)
    }
}

impl MetricSource for PrometheusSource {
    fn sample(&self, metric: &str) -> impl Future<Output = Result<f64>> + Send {
        async move {
            let value = self.query(metric).await;
            match &value {
                Ok(v) => debug!(metric = %metric, value = %v, "sampled metric"),
                Err(e) if e.is_unavailable() => {}
                Err(e) => warn!(metric = %metric, error = %e, "prometheus query failed"),
            }
            value
        }
    }

    fn health_check(&self) -> impl Future<Output = bool> + Send {
        async move {
            let url = format!("{}/-/healthy", self.base_url);
            match self
                .client
                .get(url)
                .timeout(self.config.health_timeout)
                .send()
                .await
            {
                Ok(resp) => resp.status().is_success(),
                Err(e) => {
                    debug!(error = %e, "prometheus health check failed");
                    false
                }
            }
        }
    }
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    status: String,
    #[serde(default)]
    data: Option<QueryData>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct QueryData {
    #[serde(default)]
    result: Vec<QuerySeries>,
}

#[derive(Debug, Deserialize)]
struct QuerySeries {
    /// `[<unix timestamp>, "<value>"]`
    value: (serde_json::Value, String),
}

/// Extracts the first sample value from an instant-query response body.
///
/// # Errors
///
/// Returns [`MetricsError::Unavailable`] if the result vector is empty and
/// [`MetricsError::InvalidResponse`] if the body is malformed or the query
/// status is not `success`.
pub fn parse_query_response(body: &str, metric: &str) -> Result<f64> {
    let response: QueryResponse = serde_json::from_str(body)?;

    if response.status != "success" {
        return Err(MetricsError::InvalidResponse {
            reason: format!(
                "query status '{}': {}",
                response.status,
                response.error.unwrap_or_default()
            ),
        });
    }

    let series = response
        .data
        .and_then(|d| d.result.into_iter().next())
        .ok_or_else(|| MetricsError::Unavailable {
            name: metric.to_string(),
        })?;

    series
        .value
        .1
        .parse::<f64>()
        .map_err(|e| MetricsError::InvalidResponse {
            reason: format!("value '{}' is not a number: {e}", series.value.1),
        })
}
