//! The background evaluation loop.
//!
//! Scheduling is fixed-delay: a pass runs to completion, then the loop waits
//! the configured interval before starting the next one. Passes never
//! overlap, so the effective period is pass duration plus interval.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};
use vigil_metrics::MetricSource;

use crate::channels::NotificationSink;
use crate::clock::Clock;
use crate::evaluator::Evaluator;
use crate::types::AlertRule;

/// Whether the evaluation loop is currently scheduling passes.
#[derive(Debug, Clone, Default)]
pub struct LoopStatus {
    running: Arc<AtomicBool>,
}

impl LoopStatus {
    /// Returns true while the loop is running.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    fn set(&self, running: bool) {
        self.running.store(running, Ordering::Release);
    }
}

/// Drives [`Evaluator::evaluate_pass`] on a fixed delay until shut down.
pub struct EvaluationLoop<S, N, C> {
    evaluator: Arc<Evaluator<S, N, C>>,
    rules: Arc<[AlertRule]>,
    interval: Duration,
    status: LoopStatus,
}

impl<S, N, C> std::fmt::Debug for EvaluationLoop<S, N, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EvaluationLoop")
            .field("rules", &self.rules.len())
            .field("interval", &self.interval)
            .field("status", &self.status)
            .finish_non_exhaustive()
    }
}

impl<S, N, C> EvaluationLoop<S, N, C>
where
    S: MetricSource + 'static,
    N: NotificationSink + 'static,
    C: Clock + 'static,
{
    /// Creates a loop evaluating `rules` every `interval`.
    #[must_use]
    pub fn new(evaluator: Arc<Evaluator<S, N, C>>, rules: Arc<[AlertRule]>, interval: Duration) -> Self {
        Self {
            evaluator,
            rules,
            interval,
            status: LoopStatus::default(),
        }
    }

    /// Returns a handle reporting whether the loop is running.
    #[must_use]
    pub fn status(&self) -> LoopStatus {
        self.status.clone()
    }

    /// Spawns the loop onto the current runtime.
    pub fn spawn(self, shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        tokio::spawn(self.run(shutdown))
    }

    /// Runs passes until `shutdown` becomes true or its sender is dropped.
    ///
    /// A pass already in flight when shutdown is signalled runs to
    /// completion.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        self.status.set(true);
        info!(
            rules = self.rules.len(),
            interval_secs = self.interval.as_secs_f64(),
            "evaluation loop started"
        );

        while !*shutdown.borrow() {
            let evaluator = Arc::clone(&self.evaluator);
            let rules = Arc::clone(&self.rules);
            let pass = tokio::spawn(async move { evaluator.evaluate_pass(&rules).await });

            match pass.await {
                Ok(report) => debug!(
                    fired = report.fired.len(),
                    resolved = report.resolved.len(),
                    "pass finished"
                ),
                Err(e) => error!(error = %e, "evaluation pass aborted"),
            }

            if wait_or_shutdown(self.interval, &mut shutdown).await {
                break;
            }
        }

        self.status.set(false);
        info!("evaluation loop stopped");
    }
}

/// Sleeps for `interval`. Returns true if shutdown was requested first.
async fn wait_or_shutdown(interval: Duration, shutdown: &mut watch::Receiver<bool>) -> bool {
    let sleep = tokio::time::sleep(interval);
    tokio::pin!(sleep);

    loop {
        tokio::select! {
            () = &mut sleep => return false,
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    return true;
                }
            }
        }
    }
}
