//! Core types for the alerting system.
//!
//! - [`AlertSeverity`]: how urgent a rule's alerts are
//! - [`AlertState`]: where a rule currently sits in its lifecycle
//! - [`AlertRule`]: a rule definition as supplied by the rule catalog
//! - [`SeverityIndex`]: rule name to severity lookup, built once per catalog

use std::collections::HashMap;

use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::condition::ComparisonOperator;
use crate::error::{AlertError, Result};

/// The severity level of an alert.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertSeverity {
    /// Informational alert, no action required.
    Info,
    /// Warning alert, should be investigated.
    #[default]
    Warning,
    /// Critical alert, requires immediate attention.
    Critical,
}

impl AlertSeverity {
    /// Returns the severity as a string.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Critical => "critical",
        }
    }
}

impl std::fmt::Display for AlertSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The current state of a rule's alert.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertState {
    /// The condition is not met and nothing happened recently.
    #[default]
    Normal,
    /// The condition is met but hasn't held long enough to fire.
    Pending,
    /// The alert has fired and the condition still holds.
    Firing,
    /// The condition stopped holding within the last few minutes.
    Resolved,
}

impl AlertState {
    /// Returns the state as a string.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::Pending => "pending",
            Self::Firing => "firing",
            Self::Resolved => "resolved",
        }
    }

    /// Returns true if the condition is currently believed to hold.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        matches!(self, Self::Pending | Self::Firing)
    }
}

impl std::fmt::Display for AlertState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

const fn default_true() -> bool {
    true
}

/// A monitoring rule.
///
/// The comparison operator is kept as configured; it is parsed when the rule
/// is evaluated so that a bad operator shows up as a configuration error on
/// every pass instead of silently disabling the rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertRule {
    /// Unique name of the rule; also the alert store key.
    pub name: String,
    /// The metric to sample.
    pub metric: String,
    /// Comparison operator text (`>`, `<`, `>=`, `<=`, `==`, `!=`).
    pub condition: String,
    /// The threshold value to compare against.
    pub threshold: f64,
    /// Seconds the condition must hold before the first fire.
    #[serde(default)]
    pub duration: u64,
    /// The severity of alerts generated by this rule.
    #[serde(default)]
    pub severity: AlertSeverity,
    /// Whether to notify when the alert resolves.
    #[serde(default = "default_true")]
    pub resolution_notification: bool,
    /// One-line summary used as the notification title.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    /// Longer description included in notifications.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl AlertRule {
    /// Maximum allowed length for rule names.
    pub const MAX_NAME_LENGTH: usize = 256;

    /// Maximum allowed sustained duration, one year in seconds.
    pub const MAX_DURATION_SECS: u64 = 365 * 24 * 60 * 60;

    /// Creates a new alert rule builder.
    pub fn builder(
        name: impl Into<String>,
        metric: impl Into<String>,
        operator: ComparisonOperator,
        threshold: f64,
    ) -> AlertRuleBuilder {
        AlertRuleBuilder::new(name, metric, operator.as_symbol(), threshold)
    }

    /// Parses the configured operator.
    ///
    /// # Errors
    ///
    /// Returns [`AlertError::UnknownOperator`] if the operator is not supported.
    pub fn operator(&self) -> Result<ComparisonOperator> {
        self.condition.parse()
    }

    /// Returns the required sustained duration.
    #[must_use]
    pub fn required_duration(&self) -> Duration {
        i64::try_from(self.duration)
            .ok()
            .and_then(Duration::try_seconds)
            .unwrap_or(Duration::MAX)
    }

    /// Returns the notification title, falling back to the rule name.
    #[must_use]
    pub fn title(&self) -> &str {
        self.summary.as_deref().unwrap_or(&self.name)
    }

    /// Checks the rule definition for problems that make it unusable.
    ///
    /// The operator is deliberately not checked here; see
    /// [`operator`](Self::operator).
    ///
    /// # Errors
    ///
    /// Returns [`AlertError::InvalidRule`] describing the first problem found.
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(AlertError::InvalidRule {
                reason: "rule name cannot be empty".to_string(),
            });
        }

        if self.name.len() > Self::MAX_NAME_LENGTH {
            return Err(AlertError::InvalidRule {
                reason: format!(
                    "rule name exceeds maximum length of {} characters",
                    Self::MAX_NAME_LENGTH
                ),
            });
        }

        if self.metric.trim().is_empty() {
            return Err(AlertError::InvalidRule {
                reason: format!("rule '{}': metric name cannot be empty", self.name),
            });
        }

        if !self.threshold.is_finite() {
            return Err(AlertError::InvalidRule {
                reason: format!("rule '{}': threshold must be finite", self.name),
            });
        }

        if self.duration > Self::MAX_DURATION_SECS {
            return Err(AlertError::InvalidRule {
                reason: format!(
                    "rule '{}': duration exceeds maximum of {} seconds",
                    self.name,
                    Self::MAX_DURATION_SECS
                ),
            });
        }

        Ok(())
    }
}

impl std::fmt::Display for AlertRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}: {} {} {}",
            self.name, self.metric, self.condition, self.threshold
        )
    }
}

/// Builder for creating [`AlertRule`] instances.
#[derive(Debug)]
pub struct AlertRuleBuilder {
    rule: AlertRule,
}

impl AlertRuleBuilder {
    fn new(
        name: impl Into<String>,
        metric: impl Into<String>,
        condition: impl Into<String>,
        threshold: f64,
    ) -> Self {
        Self {
            rule: AlertRule {
                name: name.into(),
                metric: metric.into(),
                condition: condition.into(),
                threshold,
                duration: 0,
                severity: AlertSeverity::Warning,
                resolution_notification: true,
                summary: None,
                description: None,
            },
        }
    }

    /// Sets the duration in seconds the condition must hold.
    #[must_use]
    pub const fn duration_secs(mut self, secs: u64) -> Self {
        self.rule.duration = secs;
        self
    }

    /// Sets the severity level.
    #[must_use]
    pub const fn severity(mut self, severity: AlertSeverity) -> Self {
        self.rule.severity = severity;
        self
    }

    /// Sets whether resolve notifications are sent.
    #[must_use]
    pub const fn resolution_notification(mut self, enabled: bool) -> Self {
        self.rule.resolution_notification = enabled;
        self
    }

    /// Sets the summary line.
    #[must_use]
    pub fn summary(mut self, summary: impl Into<String>) -> Self {
        self.rule.summary = Some(summary.into());
        self
    }

    /// Sets the description.
    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.rule.description = Some(description.into());
        self
    }

    /// Overrides the operator text; lets tests build rules with operators
    /// that [`ComparisonOperator`] cannot represent.
    #[must_use]
    pub fn raw_condition(mut self, condition: impl Into<String>) -> Self {
        self.rule.condition = condition.into();
        self
    }

    /// Builds the [`AlertRule`].
    ///
    /// # Errors
    ///
    /// Returns `AlertError::InvalidRule` if the rule fails
    /// [`AlertRule::validate`].
    pub fn build(self) -> Result<AlertRule> {
        self.rule.validate()?;
        Ok(self.rule)
    }
}

/// Rule name to severity mapping, built once per catalog load.
#[derive(Debug, Clone, Default)]
pub struct SeverityIndex {
    by_rule: HashMap<String, AlertSeverity>,
}

impl SeverityIndex {
    /// Builds the index from a rule catalog.
    #[must_use]
    pub fn from_rules(rules: &[AlertRule]) -> Self {
        Self {
            by_rule: rules
                .iter()
                .map(|r| (r.name.clone(), r.severity))
                .collect(),
        }
    }

    /// Returns the severity of `rule_name`.
    #[must_use]
    pub fn get(&self, rule_name: &str) -> Option<AlertSeverity> {
        self.by_rule.get(rule_name).copied()
    }

    /// Returns the severity label of `rule_name`, or `unknown`.
    #[must_use]
    pub fn label(&self, rule_name: &str) -> &'static str {
        self.get(rule_name).map_or("unknown", |s| s.as_str())
    }

    /// Returns the number of indexed rules.
    #[must_use]
    pub fn len(&self) -> usize {
        self.by_rule.len()
    }

    /// Returns true if no rules are indexed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_rule.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temperature_rule() -> AlertRule {
        AlertRule::builder(
            "high_temperature",
            "iot_temperature_celsius",
            ComparisonOperator::GreaterThan,
            30.0,
        )
        .duration_secs(120)
        .severity(AlertSeverity::Critical)
        .summary("Temperature too high")
        .build()
        .unwrap()
    }

    mod severity_tests {
        use super::*;

        #[test]
        fn severity_as_str() {
            assert_eq!(AlertSeverity::Info.as_str(), "info");
            assert_eq!(AlertSeverity::Warning.as_str(), "warning");
            assert_eq!(AlertSeverity::Critical.as_str(), "critical");
        }

        #[test]
        fn severity_default() {
            assert_eq!(AlertSeverity::default(), AlertSeverity::Warning);
        }

        #[test]
        fn severity_deserializes_lowercase() {
            let sev: serde_json::Result<AlertSeverity> = serde_json::from_str("\"critical\"");
            assert_eq!(sev.ok(), Some(AlertSeverity::Critical));
        }
    }

    mod state_tests {
        use super::*;

        #[test]
        fn state_as_str() {
            assert_eq!(AlertState::Normal.as_str(), "normal");
            assert_eq!(AlertState::Pending.as_str(), "pending");
            assert_eq!(AlertState::Firing.as_str(), "firing");
            assert_eq!(AlertState::Resolved.as_str(), "resolved");
        }

        #[test]
        fn state_is_active() {
            assert!(!AlertState::Normal.is_active());
            assert!(AlertState::Pending.is_active());
            assert!(AlertState::Firing.is_active());
            assert!(!AlertState::Resolved.is_active());
        }

        #[test]
        fn state_default_is_normal() {
            assert_eq!(AlertState::default(), AlertState::Normal);
        }

        #[test]
        fn state_serializes_lowercase() {
            let json = serde_json::to_string(&AlertState::Firing);
            assert_eq!(json.ok().as_deref(), Some("\"firing\""));
        }
    }

    mod rule_tests {
        use super::*;

        #[test]
        fn builder_sets_fields() {
            let rule = temperature_rule();
            assert_eq!(rule.name, "high_temperature");
            assert_eq!(rule.condition, ">");
            assert_eq!(rule.duration, 120);
            assert_eq!(rule.required_duration(), Duration::seconds(120));
            assert_eq!(rule.severity, AlertSeverity::Critical);
            assert!(rule.resolution_notification);
            assert_eq!(rule.title(), "Temperature too high");
        }

        #[test]
        fn title_falls_back_to_name() {
            let rule = AlertRule::builder("low_battery", "battery", ComparisonOperator::LessThan, 20.0)
                .build()
                .unwrap();
            assert_eq!(rule.title(), "low_battery");
        }

        #[test]
        fn operator_parses_configured_text() {
            let rule = temperature_rule();
            assert_eq!(rule.operator().ok(), Some(ComparisonOperator::GreaterThan));
        }

        #[test]
        fn unknown_operator_survives_build() {
            let rule = AlertRule::builder("regex", "up", ComparisonOperator::Equal, 1.0)
                .raw_condition("=~")
                .build();
            assert!(rule.is_ok());
            assert!(rule.unwrap().operator().is_err());
        }

        #[test]
        fn build_rejects_empty_name() {
            let result = AlertRule::builder("", "up", ComparisonOperator::Equal, 1.0).build();
            assert!(matches!(result, Err(AlertError::InvalidRule { .. })));
        }

        #[test]
        fn build_rejects_long_name() {
            let name = "x".repeat(AlertRule::MAX_NAME_LENGTH + 1);
            let result = AlertRule::builder(name, "up", ComparisonOperator::Equal, 1.0).build();
            assert!(result.is_err());
        }

        #[test]
        fn build_rejects_empty_metric() {
            let result = AlertRule::builder("r", " ", ComparisonOperator::Equal, 1.0).build();
            assert!(result.is_err());
        }

        #[test]
        fn build_rejects_nan_threshold() {
            let result = AlertRule::builder("r", "up", ComparisonOperator::Equal, f64::NAN).build();
            assert!(result.is_err());
        }

        #[test]
        fn build_rejects_oversized_duration() {
            let result = AlertRule::builder("r", "up", ComparisonOperator::Equal, 1.0)
                .duration_secs(AlertRule::MAX_DURATION_SECS + 1)
                .build();
            assert!(matches!(result, Err(AlertError::InvalidRule { .. })));

            let result = AlertRule::builder("r", "up", ComparisonOperator::Equal, 1.0)
                .duration_secs(AlertRule::MAX_DURATION_SECS)
                .build();
            assert!(result.is_ok());
        }

        #[test]
        fn huge_duration_is_rejected_not_panicking() {
            let json = r#"{"name":"r","metric":"up","condition":">","threshold":0,"duration":10000000000000000}"#;
            let rule: AlertRule = serde_json::from_str(json).unwrap();
            assert!(rule.validate().is_err());
            assert_eq!(rule.required_duration(), Duration::MAX);

            let mut rule = rule;
            rule.duration = u64::MAX;
            assert_eq!(rule.required_duration(), Duration::MAX);
        }

        #[test]
        fn deserialize_applies_defaults() {
            let json = r#"{"name":"r","metric":"up","condition":"==","threshold":0}"#;
            let rule: AlertRule = serde_json::from_str(json).unwrap();
            assert_eq!(rule.duration, 0);
            assert_eq!(rule.severity, AlertSeverity::Warning);
            assert!(rule.resolution_notification);
            assert!(rule.summary.is_none());
        }

        #[test]
        fn display() {
            let rule = temperature_rule();
            assert_eq!(rule.to_string(), "high_temperature: iot_temperature_celsius > 30");
        }
    }

    mod severity_index_tests {
        use super::*;

        #[test]
        fn index_maps_names_to_severity() {
            let rules = vec![
                temperature_rule(),
                AlertRule::builder("low_battery", "battery", ComparisonOperator::LessThan, 20.0)
                    .severity(AlertSeverity::Info)
                    .build()
                    .unwrap(),
            ];
            let index = SeverityIndex::from_rules(&rules);

            assert_eq!(index.len(), 2);
            assert_eq!(index.get("high_temperature"), Some(AlertSeverity::Critical));
            assert_eq!(index.label("low_battery"), "info");
            assert_eq!(index.label("missing"), "unknown");
        }

        #[test]
        fn empty_index() {
            let index = SeverityIndex::default();
            assert!(index.is_empty());
        }
    }
}
