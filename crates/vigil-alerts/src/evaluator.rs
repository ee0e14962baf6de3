//! One evaluation pass over the rule catalog.
//!
//! The [`Evaluator`] owns everything a pass needs: the metric source, the
//! notification sink, the clock and a handle to the [`AlertStore`]. Each
//! rule is sampled, checked, transitioned and, if the transition emitted an
//! event, announced. A rule that cannot be evaluated is skipped; a rule that
//! panics is logged and the pass moves on.

use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::time::Duration as StdDuration;

use chrono::{DateTime, Duration, Utc};
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};
use vigil_metrics::{EngineMetrics, MetricSource, MetricsError, SkipReason};

use crate::channels::NotificationSink;
use crate::clock::{Clock, SystemClock};
use crate::condition::check_condition;
use crate::state::AlertEvent;
use crate::store::AlertStore;
use crate::types::AlertRule;

/// Default cooldown between repeated fires of the same rule.
pub const DEFAULT_COOLDOWN: Duration = Duration::minutes(15);

/// Default bound on a single metric sample.
pub const DEFAULT_SAMPLE_TIMEOUT: StdDuration = StdDuration::from_secs(10);

/// Settings shared by every rule in a pass.
#[derive(Debug, Clone, Copy)]
pub struct EvaluatorConfig {
    /// Minimum time between fires of a rule that stays `Firing`.
    pub cooldown: Duration,
    /// Upper bound on one sample; `None` leaves timing to the source.
    pub sample_timeout: Option<StdDuration>,
}

impl Default for EvaluatorConfig {
    fn default() -> Self {
        Self {
            cooldown: DEFAULT_COOLDOWN,
            sample_timeout: Some(DEFAULT_SAMPLE_TIMEOUT),
        }
    }
}

/// What happened during one pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PassReport {
    /// Rules attempted, including those later skipped.
    pub rules_evaluated: usize,
    /// Rules skipped because their metric was unavailable.
    pub skipped: usize,
    /// Rules skipped because their definition could not be evaluated.
    pub config_errors: usize,
    /// Rules whose evaluation panicked.
    pub failures: usize,
    /// Rules that fired, in catalog order.
    pub fired: Vec<String>,
    /// Rules that resolved, in catalog order.
    pub resolved: Vec<String>,
    /// Notifications delivered.
    pub notifications_sent: usize,
    /// Notifications the sink reported as failed.
    pub notification_failures: usize,
}

/// Process-wide counters across all passes.
#[derive(Debug)]
pub struct EvaluatorStats {
    passes: AtomicU64,
    rules_evaluated: AtomicU64,
    alerts_fired: AtomicU64,
    alerts_resolved: AtomicU64,
    notifications_sent: AtomicU64,
    notifications_failed: AtomicU64,
    skipped: AtomicU64,
    config_errors: AtomicU64,
    failures: AtomicU64,
    last_pass_millis: AtomicI64,
}

impl Default for EvaluatorStats {
    fn default() -> Self {
        Self {
            passes: AtomicU64::new(0),
            rules_evaluated: AtomicU64::new(0),
            alerts_fired: AtomicU64::new(0),
            alerts_resolved: AtomicU64::new(0),
            notifications_sent: AtomicU64::new(0),
            notifications_failed: AtomicU64::new(0),
            skipped: AtomicU64::new(0),
            config_errors: AtomicU64::new(0),
            failures: AtomicU64::new(0),
            last_pass_millis: AtomicI64::new(i64::MIN),
        }
    }
}

impl EvaluatorStats {
    fn record(&self, report: &PassReport, finished_at: DateTime<Utc>) {
        let add = |counter: &AtomicU64, n: usize| {
            counter.fetch_add(n as u64, Ordering::Relaxed);
        };
        self.passes.fetch_add(1, Ordering::Relaxed);
        add(&self.rules_evaluated, report.rules_evaluated);
        add(&self.alerts_fired, report.fired.len());
        add(&self.alerts_resolved, report.resolved.len());
        add(&self.notifications_sent, report.notifications_sent);
        add(&self.notifications_failed, report.notification_failures);
        add(&self.skipped, report.skipped);
        add(&self.config_errors, report.config_errors);
        add(&self.failures, report.failures);
        self.last_pass_millis
            .store(finished_at.timestamp_millis(), Ordering::Relaxed);
    }

    /// Returns the number of completed passes.
    #[must_use]
    pub fn passes(&self) -> u64 {
        self.passes.load(Ordering::Relaxed)
    }

    /// Returns a point-in-time copy of all counters.
    #[must_use]
    pub fn snapshot(&self) -> StatsSnapshot {
        let last = self.last_pass_millis.load(Ordering::Relaxed);
        StatsSnapshot {
            passes: self.passes(),
            rules_evaluated: self.rules_evaluated.load(Ordering::Relaxed),
            alerts_fired: self.alerts_fired.load(Ordering::Relaxed),
            alerts_resolved: self.alerts_resolved.load(Ordering::Relaxed),
            notifications_sent: self.notifications_sent.load(Ordering::Relaxed),
            notifications_failed: self.notifications_failed.load(Ordering::Relaxed),
            skipped: self.skipped.load(Ordering::Relaxed),
            config_errors: self.config_errors.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
            last_pass_at: if last == i64::MIN {
                None
            } else {
                DateTime::from_timestamp_millis(last)
            },
        }
    }
}

/// Serializable copy of [`EvaluatorStats`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsSnapshot {
    /// Completed passes.
    pub passes: u64,
    /// Rules attempted across all passes.
    pub rules_evaluated: u64,
    /// Fire events.
    pub alerts_fired: u64,
    /// Resolve events.
    pub alerts_resolved: u64,
    /// Notifications delivered.
    pub notifications_sent: u64,
    /// Notifications that failed.
    pub notifications_failed: u64,
    /// Rules skipped for missing samples.
    pub skipped: u64,
    /// Rules skipped for configuration errors.
    pub config_errors: u64,
    /// Rules whose evaluation panicked.
    pub failures: u64,
    /// End of the most recent pass.
    pub last_pass_at: Option<DateTime<Utc>>,
}

enum RuleOutcome {
    Evaluated {
        event: AlertEvent,
        delivered: Option<bool>,
    },
    Unavailable,
    InvalidConfiguration,
}

/// Runs evaluation passes against a shared [`AlertStore`].
pub struct Evaluator<S, N, C = SystemClock> {
    source: S,
    sink: N,
    clock: C,
    store: AlertStore,
    config: EvaluatorConfig,
    metrics: Option<EngineMetrics>,
    stats: EvaluatorStats,
}

impl<S, N, C> std::fmt::Debug for Evaluator<S, N, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Evaluator")
            .field("config", &self.config)
            .field("tracked_rules", &self.store.len())
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}

impl<S: MetricSource, N: NotificationSink> Evaluator<S, N, SystemClock> {
    /// Creates an evaluator using wall-clock time.
    #[must_use]
    pub fn new(source: S, sink: N, store: AlertStore) -> Self {
        Self::with_clock(source, sink, SystemClock, store)
    }
}

impl<S: MetricSource, N: NotificationSink, C: Clock> Evaluator<S, N, C> {
    /// Creates an evaluator that reads time from `clock`.
    #[must_use]
    pub fn with_clock(source: S, sink: N, clock: C, store: AlertStore) -> Self {
        Self {
            source,
            sink,
            clock,
            store,
            config: EvaluatorConfig::default(),
            metrics: None,
            stats: EvaluatorStats::default(),
        }
    }

    /// Sets the cooldown shared by all rules.
    #[must_use]
    pub fn with_cooldown(mut self, cooldown: Duration) -> Self {
        self.config.cooldown = cooldown;
        self
    }

    /// Sets the per-sample timeout.
    #[must_use]
    pub fn with_sample_timeout(mut self, timeout: Option<StdDuration>) -> Self {
        self.config.sample_timeout = timeout;
        self
    }

    /// Records engine activity into `metrics`.
    #[must_use]
    pub fn with_metrics(mut self, metrics: EngineMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Returns the store this evaluator writes to.
    #[must_use]
    pub const fn store(&self) -> &AlertStore {
        &self.store
    }

    /// Returns the metric source.
    #[must_use]
    pub const fn source(&self) -> &S {
        &self.source
    }

    /// Returns the notification sink.
    #[must_use]
    pub const fn sink(&self) -> &N {
        &self.sink
    }

    /// Returns the engine metrics, if attached.
    #[must_use]
    pub const fn metrics(&self) -> Option<&EngineMetrics> {
        self.metrics.as_ref()
    }

    /// Returns the evaluator settings.
    #[must_use]
    pub const fn config(&self) -> &EvaluatorConfig {
        &self.config
    }

    /// Returns the cumulative counters.
    #[must_use]
    pub const fn stats(&self) -> &EvaluatorStats {
        &self.stats
    }

    /// Evaluates every rule once, in order.
    ///
    /// Never fails: unavailable samples, bad rule definitions, delivery
    /// failures and panics are all contained to the rule they occur in.
    pub async fn evaluate_pass(&self, rules: &[AlertRule]) -> PassReport {
        let mut report = PassReport::default();
        debug!(rules = rules.len(), "starting evaluation pass");

        for rule in rules {
            report.rules_evaluated += 1;

            let outcome = AssertUnwindSafe(self.evaluate_rule(rule))
                .catch_unwind()
                .await;

            match outcome {
                Ok(RuleOutcome::Evaluated { event, delivered }) => {
                    match event {
                        AlertEvent::Fire => report.fired.push(rule.name.clone()),
                        AlertEvent::Resolve => report.resolved.push(rule.name.clone()),
                        AlertEvent::None => {}
                    }
                    match delivered {
                        Some(true) => report.notifications_sent += 1,
                        Some(false) => report.notification_failures += 1,
                        None => {}
                    }
                    if let (Some(metrics), Some(success)) = (&self.metrics, delivered) {
                        metrics.inc_notifications(success);
                    }
                }
                Ok(RuleOutcome::Unavailable) => {
                    report.skipped += 1;
                    self.count_skip(SkipReason::SampleUnavailable);
                }
                Ok(RuleOutcome::InvalidConfiguration) => {
                    report.config_errors += 1;
                    self.count_skip(SkipReason::InvalidConfiguration);
                }
                Err(panic) => {
                    error!(
                        rule = %rule.name,
                        panic = %panic_message(panic.as_ref()),
                        "rule evaluation panicked"
                    );
                    report.failures += 1;
                    self.count_skip(SkipReason::Failure);
                }
            }
        }

        let finished_at = self.clock.now();
        self.stats.record(&report, finished_at);
        if let Some(metrics) = &self.metrics {
            metrics.inc_rules_evaluated(report.rules_evaluated as u64);
            #[allow(clippy::cast_precision_loss)]
            let unix_seconds = finished_at.timestamp_millis() as f64 / 1000.0;
            metrics.set_last_evaluation(unix_seconds);
        }

        info!(
            rules = report.rules_evaluated,
            fired = report.fired.len(),
            resolved = report.resolved.len(),
            skipped = report.skipped,
            config_errors = report.config_errors,
            failures = report.failures,
            "evaluation pass complete"
        );
        report
    }

    async fn evaluate_rule(&self, rule: &AlertRule) -> RuleOutcome {
        let value = match self.sample(&rule.metric).await {
            Ok(value) => value,
            Err(e) => {
                warn!(
                    rule = %rule.name,
                    metric = %rule.metric,
                    error = %e,
                    "metric unavailable, skipping rule"
                );
                return RuleOutcome::Unavailable;
            }
        };

        let condition_met = match check_condition(value, &rule.condition, rule.threshold) {
            Ok(met) => met,
            Err(e) => {
                error!(rule = %rule.name, error = %e, "invalid rule configuration, skipping rule");
                return RuleOutcome::InvalidConfiguration;
            }
        };

        let (record, event) = self.store.apply_transition(
            &rule.name,
            condition_met,
            value,
            rule.required_duration(),
            self.config.cooldown,
            self.clock.now(),
        );

        debug!(
            rule = %rule.name,
            metric = %rule.metric,
            value,
            condition_met,
            state = %record.state,
            "rule evaluated"
        );

        let delivered = match event {
            AlertEvent::Fire => {
                info!(
                    rule = %rule.name,
                    severity = %rule.severity,
                    value,
                    fire_count = record.fire_count,
                    "alert fired"
                );
                if let Some(metrics) = &self.metrics {
                    metrics.inc_alerts_fired(&rule.name, rule.severity.as_str());
                }
                Some(self.deliver(rule, self.sink.notify_fire(rule, value)).await)
            }
            AlertEvent::Resolve => {
                info!(rule = %rule.name, value, "alert resolved");
                if rule.resolution_notification {
                    Some(self.deliver(rule, self.sink.notify_resolve(rule, value)).await)
                } else {
                    debug!(rule = %rule.name, "resolution notification disabled");
                    None
                }
            }
            AlertEvent::None => None,
        };

        RuleOutcome::Evaluated { event, delivered }
    }

    /// Awaits one sink call. A panicking sink counts as a failed delivery.
    async fn deliver(&self, rule: &AlertRule, send: impl Future<Output = bool>) -> bool {
        match AssertUnwindSafe(send).catch_unwind().await {
            Ok(delivered) => delivered,
            Err(panic) => {
                error!(
                    rule = %rule.name,
                    sink = %self.sink.name(),
                    panic = %panic_message(panic.as_ref()),
                    "notification sink panicked"
                );
                false
            }
        }
    }

    async fn sample(&self, metric: &str) -> Result<f64, MetricsError> {
        match self.config.sample_timeout {
            Some(limit) => tokio::time::timeout(limit, self.source.sample(metric))
                .await
                .unwrap_or_else(|_| {
                    Err(MetricsError::Timeout {
                        name: metric.to_string(),
                    })
                }),
            None => self.source.sample(metric).await,
        }
    }

    fn count_skip(&self, reason: SkipReason) {
        if let Some(metrics) = &self.metrics {
            metrics.inc_rule_skips(reason);
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
