//! Notification sinks for alert delivery.
//!
//! This module provides the [`NotificationSink`] trait the evaluator calls on
//! fire and resolve events, and the sinks the engine ships with:
//!
//! - [`LogSink`]: writes the notification to the log (used when delivery is
//!   disabled)
//! - [`WebhookSink`]: POSTs the notification as JSON to a URL
//! - [`FanoutSink`]: delivers to several sinks concurrently
//! - [`ConfiguredSink`]: whichever of these the configuration selected

use std::fmt;
use std::future::Future;
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{AlertError, Result};
use crate::types::{AlertRule, AlertSeverity};

/// What a notification announces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    /// An alert fired.
    Firing,
    /// An alert resolved.
    Resolved,
    /// A delivery check requested by an operator.
    Test,
}

impl fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Firing => write!(f, "firing"),
            Self::Resolved => write!(f, "resolved"),
            Self::Test => write!(f, "test"),
        }
    }
}

/// The rule and sample a notification refers to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertContext {
    /// The rule's name.
    pub rule_name: String,
    /// The sampled metric.
    pub metric: String,
    /// The rule's severity.
    pub severity: AlertSeverity,
    /// The configured operator.
    pub condition: String,
    /// The configured threshold.
    pub threshold: f64,
    /// The sample that caused the event.
    pub value: f64,
}

/// A notification to be delivered through a sink.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    /// Unique delivery identifier.
    pub id: Uuid,
    /// What this notification announces.
    pub kind: NotificationKind,
    /// Short title.
    pub title: String,
    /// Optional longer text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// The alert this notification is about; absent for test messages.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alert: Option<AlertContext>,
    /// When the notification was created.
    pub timestamp: DateTime<Utc>,
}

impl Notification {
    /// Creates a fire notification for `rule` at `value`.
    #[must_use]
    pub fn firing(rule: &AlertRule, value: f64) -> Self {
        Self::for_rule(NotificationKind::Firing, rule, value)
    }

    /// Creates a resolve notification for `rule` at `value`.
    #[must_use]
    pub fn resolved(rule: &AlertRule, value: f64) -> Self {
        Self::for_rule(NotificationKind::Resolved, rule, value)
    }

    /// Creates a test notification.
    #[must_use]
    pub fn test() -> Self {
        Self {
            id: Uuid::new_v4(),
            kind: NotificationKind::Test,
            title: "Test notification from Vigil".to_string(),
            description: Some(
                "If you received this, notification delivery is working.".to_string(),
            ),
            alert: None,
            timestamp: Utc::now(),
        }
    }

    fn for_rule(kind: NotificationKind, rule: &AlertRule, value: f64) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            title: rule.title().to_string(),
            description: rule.description.clone(),
            alert: Some(AlertContext {
                rule_name: rule.name.clone(),
                metric: rule.metric.clone(),
                severity: rule.severity,
                condition: rule.condition.clone(),
                threshold: rule.threshold,
                value,
            }),
            timestamp: Utc::now(),
        }
    }

    /// Renders a one-line plain text summary.
    #[must_use]
    pub fn render_text(&self) -> String {
        match (&self.kind, &self.alert) {
            (NotificationKind::Firing, Some(ctx)) => format!(
                "[{}] {}: {} = {} (threshold: {} {})",
                ctx.severity.as_str().to_uppercase(),
                self.title,
                ctx.metric,
                ctx.value,
                ctx.condition,
                ctx.threshold
            ),
            (NotificationKind::Resolved, Some(ctx)) => format!(
                "[RESOLVED] {}: {} = {}",
                self.title, ctx.metric, ctx.value
            ),
            _ => self.title.clone(),
        }
    }
}

/// Delivers fire and resolve notifications.
///
/// Delivery outcome is reported as a boolean. A failed delivery never rolls
/// back the state transition that triggered it.
pub trait NotificationSink: Send + Sync {
    /// Returns the name of this sink.
    fn name(&self) -> &str;

    /// Announces that `rule` fired at `value`.
    fn notify_fire(&self, rule: &AlertRule, value: f64) -> impl Future<Output = bool> + Send;

    /// Announces that `rule` resolved at `value`.
    fn notify_resolve(&self, rule: &AlertRule, value: f64) -> impl Future<Output = bool> + Send;

    /// Sends a test message to check delivery.
    fn send_test(&self) -> impl Future<Output = bool> + Send;

    /// Returns true if this sink delivers to an external system.
    fn is_remote(&self) -> bool {
        false
    }
}

/// A sink that only logs.
#[derive(Debug, Clone)]
pub struct LogSink {
    name: String,
}

impl LogSink {
    /// Creates a new log sink.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    fn log(&self, notification: &Notification) {
        let rule = notification.alert.as_ref().map_or("", |a| a.rule_name.as_str());
        info!(
            sink = %self.name,
            id = %notification.id,
            kind = %notification.kind,
            rule = %rule,
            "{}",
            notification.render_text()
        );
    }
}

impl Default for LogSink {
    fn default() -> Self {
        Self::new("log")
    }
}

impl NotificationSink for LogSink {
    fn name(&self) -> &str {
        &self.name
    }

    async fn notify_fire(&self, rule: &AlertRule, value: f64) -> bool {
        self.log(&Notification::firing(rule, value));
        true
    }

    async fn notify_resolve(&self, rule: &AlertRule, value: f64) -> bool {
        self.log(&Notification::resolved(rule, value));
        true
    }

    async fn send_test(&self) -> bool {
        self.log(&Notification::test());
        true
    }
}

/// Configuration for a webhook sink.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookConfig {
    /// The name of this webhook.
    pub name: String,
    /// The URL to send notifications to.
    pub url: String,
    /// Timeout in seconds for HTTP requests.
    pub timeout_secs: u64,
}

impl WebhookConfig {
    /// Creates a new webhook configuration.
    ///
    /// # Errors
    ///
    /// Returns `AlertError::InvalidRule` if the URL is empty.
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Result<Self> {
        let url = url.into();
        if url.trim().is_empty() {
            return Err(AlertError::InvalidRule {
                reason: "webhook URL cannot be empty".to_string(),
            });
        }

        Ok(Self {
            name: name.into(),
            url,
            timeout_secs: 10,
        })
    }

    /// Sets the timeout.
    #[must_use]
    pub const fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }
}

/// A sink that POSTs each notification as JSON.
#[derive(Debug, Clone)]
pub struct WebhookSink {
    config: WebhookConfig,
    client: reqwest::Client,
}

impl WebhookSink {
    /// Creates a new webhook sink.
    ///
    /// # Errors
    ///
    /// Returns `AlertError::NotificationFailed` if the HTTP client cannot be built.
    pub fn new(config: WebhookConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AlertError::NotificationFailed {
                reason: format!("failed to build HTTP client: {e}"),
            })?;
        Ok(Self { config, client })
    }

    /// Returns the webhook URL.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.config.url
    }

    /// Delivers `notification`.
    ///
    /// # Errors
    ///
    /// Returns `AlertError::NotificationFailed` on transport errors and
    /// non-success responses.
    pub async fn deliver(&self, notification: &Notification) -> Result<()> {
        let response = self
            .client
            .post(&self.config.url)
            .json(notification)
            .send()
            .await
            .map_err(|e| AlertError::NotificationFailed {
                reason: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(AlertError::NotificationFailed {
                reason: format!("webhook returned HTTP {status}"),
            });
        }

        debug!(sink = %self.config.name, id = %notification.id, %status, "webhook delivered");
        Ok(())
    }

    async fn deliver_logged(&self, notification: Notification) -> bool {
        match self.deliver(&notification).await {
            Ok(()) => {
                info!(
                    sink = %self.config.name,
                    kind = %notification.kind,
                    "{}",
                    notification.render_text()
                );
                true
            }
            Err(e) => {
                warn!(
                    sink = %self.config.name,
                    url = %self.config.url,
                    kind = %notification.kind,
                    error = %e,
                    "notification delivery failed"
                );
                false
            }
        }
    }
}

impl NotificationSink for WebhookSink {
    fn name(&self) -> &str {
        &self.config.name
    }

    async fn notify_fire(&self, rule: &AlertRule, value: f64) -> bool {
        self.deliver_logged(Notification::firing(rule, value)).await
    }

    async fn notify_resolve(&self, rule: &AlertRule, value: f64) -> bool {
        self.deliver_logged(Notification::resolved(rule, value)).await
    }

    async fn send_test(&self) -> bool {
        self.deliver_logged(Notification::test()).await
    }

    fn is_remote(&self) -> bool {
        true
    }
}

/// Delivers every notification to all of its sinks concurrently.
///
/// A delivery succeeds only if every sink succeeded. An empty fan-out
/// succeeds trivially.
#[derive(Debug, Clone)]
pub struct FanoutSink<N> {
    name: String,
    sinks: Vec<N>,
}

impl<N: NotificationSink> FanoutSink<N> {
    /// Creates a fan-out over `sinks`.
    #[must_use]
    pub fn new(name: impl Into<String>, sinks: Vec<N>) -> Self {
        Self {
            name: name.into(),
            sinks,
        }
    }

    /// Returns the wrapped sinks.
    #[must_use]
    pub fn sinks(&self) -> &[N] {
        &self.sinks
    }

    /// Returns the number of wrapped sinks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    /// Returns true if there are no wrapped sinks.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }

    fn summarize(&self, results: &[bool]) -> bool {
        let failed = results.iter().filter(|ok| !**ok).count();
        if failed > 0 {
            warn!(
                sink = %self.name,
                failed,
                total = results.len(),
                "fan-out delivery incomplete"
            );
        }
        failed == 0
    }
}

impl<N: NotificationSink> NotificationSink for FanoutSink<N> {
    fn name(&self) -> &str {
        &self.name
    }

    async fn notify_fire(&self, rule: &AlertRule, value: f64) -> bool {
        let results = join_all(self.sinks.iter().map(|s| s.notify_fire(rule, value))).await;
        self.summarize(&results)
    }

    async fn notify_resolve(&self, rule: &AlertRule, value: f64) -> bool {
        let results = join_all(self.sinks.iter().map(|s| s.notify_resolve(rule, value))).await;
        self.summarize(&results)
    }

    async fn send_test(&self) -> bool {
        let results = join_all(self.sinks.iter().map(NotificationSink::send_test)).await;
        self.summarize(&results)
    }

    fn is_remote(&self) -> bool {
        self.sinks.iter().any(NotificationSink::is_remote)
    }
}

/// The sink chosen by configuration.
#[derive(Debug, Clone)]
pub enum ConfiguredSink {
    /// Delivery disabled; notifications are only logged.
    Log(LogSink),
    /// Notifications are POSTed to a webhook.
    Webhook(WebhookSink),
    /// Notifications are POSTed to several webhooks.
    Fanout(FanoutSink<WebhookSink>),
}

impl ConfiguredSink {
    /// Picks a sink from the notification settings.
    ///
    /// Webhooks are used only when delivery is enabled and at least one URL
    /// is set. Several URLs produce a fan-out.
    ///
    /// # Errors
    ///
    /// Returns an error if a webhook sink cannot be created.
    pub fn from_settings(enabled: bool, webhook_urls: &[String], timeout_secs: u64) -> Result<Self> {
        if !enabled || webhook_urls.is_empty() {
            return Ok(Self::Log(LogSink::default()));
        }

        let webhook = |name: String, url: &str| -> Result<WebhookSink> {
            let config = WebhookConfig::new(name, url)?.with_timeout_secs(timeout_secs);
            WebhookSink::new(config)
        };

        if let [url] = webhook_urls {
            return Ok(Self::Webhook(webhook("webhook".to_string(), url)?));
        }

        let sinks = webhook_urls
            .iter()
            .enumerate()
            .map(|(i, url)| webhook(format!("webhook-{}", i + 1), url))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self::Fanout(FanoutSink::new("webhooks", sinks)))
    }
}

impl NotificationSink for ConfiguredSink {
    fn name(&self) -> &str {
        match self {
            Self::Log(sink) => sink.name(),
            Self::Webhook(sink) => sink.name(),
            Self::Fanout(sink) => sink.name(),
        }
    }

    async fn notify_fire(&self, rule: &AlertRule, value: f64) -> bool {
        match self {
            Self::Log(sink) => sink.notify_fire(rule, value).await,
            Self::Webhook(sink) => sink.notify_fire(rule, value).await,
            Self::Fanout(sink) => sink.notify_fire(rule, value).await,
        }
    }

    async fn notify_resolve(&self, rule: &AlertRule, value: f64) -> bool {
        match self {
            Self::Log(sink) => sink.notify_resolve(rule, value).await,
            Self::Webhook(sink) => sink.notify_resolve(rule, value).await,
            Self::Fanout(sink) => sink.notify_resolve(rule, value).await,
        }
    }

    async fn send_test(&self) -> bool {
        match self {
            Self::Log(sink) => sink.send_test().await,
            Self::Webhook(sink) => sink.send_test().await,
            Self::Fanout(sink) => sink.send_test().await,
        }
    }

    fn is_remote(&self) -> bool {
        match self {
            Self::Log(_) => false,
            Self::Webhook(_) => true,
            Self::Fanout(sink) => sink.is_remote(),
        }
    }
}
