//! Response bodies for the HTTP API.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use vigil_alerts::{AlertRule, AlertStatus, StatsSnapshot};

/// Body of `GET /`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceInfo {
    /// Service name.
    pub service: String,
    /// Always `running`.
    pub status: String,
    /// Response time.
    pub timestamp: DateTime<Utc>,
}

/// Overall health derived from the component checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    /// Every component check passed.
    Healthy,
    /// At least one component check failed.
    Degraded,
}

/// Individual component checks reported by `GET /health`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthComponents {
    /// The metric backend answered its health probe.
    pub metric_source: bool,
    /// A notification sink is configured.
    pub notifier: bool,
    /// The evaluation loop is scheduling passes.
    pub evaluation_loop: bool,
}

impl HealthComponents {
    /// Returns true if every component is healthy.
    #[must_use]
    pub const fn all_healthy(&self) -> bool {
        self.metric_source && self.notifier && self.evaluation_loop
    }
}

/// Body of `GET /health`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Overall status.
    pub status: HealthStatus,
    /// Component checks.
    pub components: HealthComponents,
    /// Server uptime in seconds.
    pub uptime_secs: u64,
    /// Response time.
    pub timestamp: DateTime<Utc>,
}

/// One alert as shown by the API: the stored status plus the rule severity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertView {
    /// Stored state of the alert.
    #[serde(flatten)]
    pub status: AlertStatus,
    /// Severity of the rule, `unknown` if the rule is not in the catalog.
    pub severity: String,
}

/// Body of `GET /alerts`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertsResponse {
    /// Alerts keyed by rule name.
    pub alerts: BTreeMap<String, AlertView>,
    /// Response time.
    pub timestamp: DateTime<Utc>,
}

/// Notification delivery counters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationStats {
    /// Name of the configured sink.
    pub sink: String,
    /// Whether the sink delivers to a remote endpoint.
    pub remote: bool,
    /// Notifications delivered.
    pub sent: u64,
    /// Notifications that failed.
    pub failed: u64,
}

/// Body of `GET /history`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryResponse {
    /// Alerts keyed by rule name.
    pub history: BTreeMap<String, AlertView>,
    /// Evaluator counters.
    pub stats: StatsSnapshot,
    /// Delivery counters.
    pub notification_stats: NotificationStats,
    /// Response time.
    pub timestamp: DateTime<Utc>,
}

/// Body of `GET /rules`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RulesResponse {
    /// The rule catalog in evaluation order.
    pub rules: Vec<AlertRule>,
    /// Number of rules.
    pub count: usize,
}

/// Body of `POST /reset`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResetResponse {
    /// Always `reset`.
    pub status: String,
}

/// Body of a successful `POST /test-notification`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestNotificationResponse {
    /// Always `success`.
    pub status: String,
    /// Human readable result.
    pub message: String,
}
