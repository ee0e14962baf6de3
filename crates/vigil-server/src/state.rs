//! Shared state for the HTTP server.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use vigil_alerts::{
    AlertRule, AlertStatus, Clock, Evaluator, LoopStatus, NotificationSink, SeverityIndex,
    SystemClock,
};
use vigil_metrics::{EngineMetrics, MetricSource};

use crate::config::ServerConfig;
use crate::types::{AlertView, NotificationStats};

/// Shared state for the HTTP server.
///
/// The server only reads engine state; the evaluation loop is the single
/// writer apart from `POST /reset`.
pub struct AppState<S, N, C = SystemClock> {
    config: ServerConfig,
    evaluator: Arc<Evaluator<S, N, C>>,
    rules: Arc<[AlertRule]>,
    severities: SeverityIndex,
    metrics: EngineMetrics,
    loop_status: LoopStatus,
    start_time: Instant,
}

impl<S, N, C> std::fmt::Debug for AppState<S, N, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("config", &self.config)
            .field("rules", &self.rules.len())
            .field("loop_status", &self.loop_status)
            .finish_non_exhaustive()
    }
}

impl<S, N, C> AppState<S, N, C>
where
    S: MetricSource,
    N: NotificationSink,
    C: Clock,
{
    /// Create the server state.
    ///
    /// The severity index is built once from `rules`. Engine metrics are
    /// shared with the evaluator when it has them attached.
    pub fn new(
        config: ServerConfig,
        evaluator: Arc<Evaluator<S, N, C>>,
        rules: Arc<[AlertRule]>,
        loop_status: LoopStatus,
    ) -> Self {
        let severities = SeverityIndex::from_rules(&rules);
        let metrics = evaluator.metrics().cloned().unwrap_or_default();
        Self {
            config,
            evaluator,
            rules,
            severities,
            metrics,
            loop_status,
            start_time: Instant::now(),
        }
    }

    /// Get the configuration.
    pub const fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Get the evaluator.
    pub const fn evaluator(&self) -> &Arc<Evaluator<S, N, C>> {
        &self.evaluator
    }

    /// Get the rule catalog.
    pub fn rules(&self) -> &[AlertRule] {
        &self.rules
    }

    /// Get the engine metrics.
    pub const fn metrics(&self) -> &EngineMetrics {
        &self.metrics
    }

    /// Get the evaluation loop status.
    pub const fn loop_status(&self) -> &LoopStatus {
        &self.loop_status
    }

    /// Get server uptime in seconds.
    pub fn uptime_secs(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    /// Get every stored alert with its rule severity.
    pub fn alert_views(&self) -> BTreeMap<String, AlertView> {
        self.evaluator
            .store()
            .statuses()
            .into_iter()
            .map(|(name, status)| {
                let view = self.view(&name, status);
                (name, view)
            })
            .collect()
    }

    /// Get one stored alert, if the rule has been evaluated.
    pub fn alert_view(&self, rule_name: &str) -> Option<AlertView> {
        self.evaluator
            .store()
            .get_record(rule_name)
            .map(|record| self.view(rule_name, AlertStatus::from(&record)))
    }

    /// Get the notification delivery counters.
    pub fn notification_stats(&self) -> NotificationStats {
        let stats = self.evaluator.stats().snapshot();
        let sink = self.evaluator.sink();
        NotificationStats {
            sink: sink.name().to_string(),
            remote: sink.is_remote(),
            sent: stats.notifications_sent,
            failed: stats.notifications_failed,
        }
    }

    fn view(&self, rule_name: &str, status: AlertStatus) -> AlertView {
        AlertView {
            status,
            severity: self.severities.label(rule_name).to_string(),
        }
    }
}
