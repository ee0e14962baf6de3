//! Prometheus exposition of the engine's own activity.
//!
//! # Example
//!
//! ```rust
//! use vigil_metrics::{EngineMetrics, SkipReason};
//!
//! let metrics = EngineMetrics::new();
//! metrics.inc_alerts_fired("high_temperature", "critical");
//! metrics.inc_notifications(true);
//! metrics.inc_rule_skips(SkipReason::SampleUnavailable);
//!
//! let output = metrics.encode();
//! assert!(output.contains("vigil_alerts_fired_total"));
//! ```

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::AtomicU64;

use parking_lot::RwLock;
use prometheus_client::encoding::EncodeLabelSet;
use prometheus_client::encoding::text::encode;
use prometheus_client::metrics::counter::Counter;
use prometheus_client::metrics::family::Family;
use prometheus_client::metrics::gauge::Gauge;
use prometheus_client::registry::Registry;

/// Labels for fired alerts.
#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct AlertLabels {
    /// The rule that fired.
    pub rule_name: String,
    /// The rule's severity tag.
    pub severity: String,
}

/// Labels for notification deliveries.
#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct DeliveryLabels {
    /// `success` or `failed`.
    pub status: String,
}

/// Labels for skipped rule evaluations.
#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct SkipLabels {
    /// Why the rule was skipped.
    pub reason: String,
}

/// Why a rule evaluation was skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The metric source had no value.
    SampleUnavailable,
    /// The rule definition could not be evaluated.
    InvalidConfiguration,
    /// The rule evaluation failed unexpectedly.
    Failure,
}

impl SkipReason {
    /// Returns the label value for this reason.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::SampleUnavailable => "sample_unavailable",
            Self::InvalidConfiguration => "invalid_configuration",
            Self::Failure => "failure",
        }
    }
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Counters and gauges describing the alert engine itself.
///
/// Cloning is cheap; clones share the same underlying registry.
#[derive(Clone)]
pub struct EngineMetrics {
    registry: Arc<RwLock<Registry>>,
    alerts_fired: Family<AlertLabels, Counter>,
    notifications: Family<DeliveryLabels, Counter>,
    rules_evaluated: Counter,
    rule_skips: Family<SkipLabels, Counter>,
    last_evaluation: Gauge<f64, AtomicU64>,
}

impl fmt::Debug for EngineMetrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EngineMetrics")
            .field("rules_evaluated", &self.rules_evaluated.get())
            .finish_non_exhaustive()
    }
}

impl Default for EngineMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl EngineMetrics {
    /// Creates a registry with all engine metrics registered.
    #[must_use]
    pub fn new() -> Self {
        let mut registry = Registry::default();

        let alerts_fired = Family::<AlertLabels, Counter>::default();
        registry.register(
            "vigil_alerts_fired",
            "Total number of alerts fired",
            alerts_fired.clone(),
        );

        let notifications = Family::<DeliveryLabels, Counter>::default();
        registry.register(
            "vigil_notifications",
            "Total number of notification deliveries by outcome",
            notifications.clone(),
        );

        let rules_evaluated = Counter::default();
        registry.register(
            "vigil_rules_evaluated",
            "Total number of rule evaluations",
            rules_evaluated.clone(),
        );

        let rule_skips = Family::<SkipLabels, Counter>::default();
        registry.register(
            "vigil_rule_skips",
            "Total number of rule evaluations skipped by reason",
            rule_skips.clone(),
        );

        let last_evaluation = Gauge::<f64, AtomicU64>::default();
        registry.register(
            "vigil_last_evaluation_timestamp_seconds",
            "Unix timestamp of the last completed evaluation pass",
            last_evaluation.clone(),
        );

        Self {
            registry: Arc::new(RwLock::new(registry)),
            alerts_fired,
            notifications,
            rules_evaluated,
            rule_skips,
            last_evaluation,
        }
    }

    /// Records a fired alert.
    pub fn inc_alerts_fired(&self, rule_name: &str, severity: &str) {
        let labels = AlertLabels {
            rule_name: rule_name.to_string(),
            severity: severity.to_string(),
        };
        self.alerts_fired.get_or_create(&labels).inc();
    }

    /// Returns how many times `rule_name` fired with `severity`.
    #[must_use]
    pub fn alerts_fired(&self, rule_name: &str, severity: &str) -> u64 {
        let labels = AlertLabels {
            rule_name: rule_name.to_string(),
            severity: severity.to_string(),
        };
        self.alerts_fired.get_or_create(&labels).get()
    }

    /// Records a notification delivery outcome.
    pub fn inc_notifications(&self, success: bool) {
        let labels = DeliveryLabels {
            status: if success { "success" } else { "failed" }.to_string(),
        };
        self.notifications.get_or_create(&labels).inc();
    }

    /// Records `count` rule evaluations.
    pub fn inc_rules_evaluated(&self, count: u64) {
        self.rules_evaluated.inc_by(count);
    }

    /// Returns the total number of rule evaluations.
    #[must_use]
    pub fn rules_evaluated(&self) -> u64 {
        self.rules_evaluated.get()
    }

    /// Records a skipped rule evaluation.
    pub fn inc_rule_skips(&self, reason: SkipReason) {
        let labels = SkipLabels {
            reason: reason.as_str().to_string(),
        };
        self.rule_skips.get_or_create(&labels).inc();
    }

    /// Returns how many evaluations were skipped for `reason`.
    #[must_use]
    pub fn rule_skips(&self, reason: SkipReason) -> u64 {
        let labels = SkipLabels {
            reason: reason.as_str().to_string(),
        };
        self.rule_skips.get_or_create(&labels).get()
    }

    /// Sets the timestamp of the last completed pass.
    pub fn set_last_evaluation(&self, unix_seconds: f64) {
        self.last_evaluation.set(unix_seconds);
    }

    /// Encodes all metrics in Prometheus text format.
    #[must_use]
    pub fn encode(&self) -> String {
        let registry = self.registry.read();
        let mut buffer = String::new();
        if encode(&mut buffer, &registry).is_err() {
            tracing::error!("failed to encode prometheus metrics");
            return String::new();
        }
        buffer
    }

    /// Returns the Content-Type header value for the text format.
    #[must_use]
    pub const fn content_type() -> &'static str {
        "text/plain; version=0.0.4; charset=utf-8"
    }
}
