//! The engine configuration file.

use std::collections::HashSet;
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use vigil_alerts::{AlertRule, ConfiguredSink};
use vigil_metrics::PrometheusSourceConfig;

use crate::error::{ConfigError, Result};

/// Default configuration file path.
pub const DEFAULT_CONFIG_PATH: &str = "vigil.toml";

/// Where metric samples come from.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PrometheusSettings {
    /// Base URL of the Prometheus server.
    pub url: String,
    /// Delay between evaluation passes, in seconds.
    #[serde(default = "default_scrape_interval")]
    pub scrape_interval_secs: u64,
    /// Timeout for a single query, in seconds.
    #[serde(default = "default_query_timeout")]
    pub query_timeout_secs: u64,
}

const fn default_scrape_interval() -> u64 {
    30
}

const fn default_query_timeout() -> u64 {
    10
}

/// Settings shared by every rule.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct AlertSettings {
    /// Minimum minutes between repeated fires of a rule that stays firing.
    pub cooldown_minutes: u64,
}

impl Default for AlertSettings {
    fn default() -> Self {
        Self {
            cooldown_minutes: 15,
        }
    }
}

/// Notification delivery.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct NotificationSettings {
    /// Whether notifications leave the process. When false they are only logged.
    pub enabled: bool,
    /// Webhook receiving fire and resolve notifications.
    pub webhook_url: Option<String>,
    /// Further webhooks; notifications fan out to all of them.
    pub webhook_urls: Vec<String>,
    /// Timeout for one delivery, in seconds.
    pub timeout_secs: u64,
}

impl Default for NotificationSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            webhook_url: None,
            webhook_urls: Vec::new(),
            timeout_secs: 10,
        }
    }
}

impl NotificationSettings {
    /// Returns every configured webhook URL, `webhook_url` first, without
    /// duplicates.
    #[must_use]
    pub fn webhook_targets(&self) -> Vec<String> {
        let mut targets: Vec<String> = Vec::new();
        for url in self.webhook_url.iter().chain(&self.webhook_urls) {
            let url = url.trim();
            if !targets.iter().any(|t| t == url) {
                targets.push(url.to_string());
            }
        }
        targets
    }
}

/// The HTTP status server.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ServerSettings {
    /// Listen address.
    pub bind_addr: SocketAddr,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8087)),
        }
    }
}

/// Complete engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EngineConfig {
    /// Metric source.
    pub prometheus: PrometheusSettings,
    /// Alerting behaviour.
    #[serde(default)]
    pub alert_settings: AlertSettings,
    /// Notification delivery.
    #[serde(default)]
    pub notifications: NotificationSettings,
    /// Status server.
    #[serde(default)]
    pub server: ServerSettings,
    /// The rule catalog, in evaluation order.
    #[serde(default)]
    pub alert_rules: Vec<AlertRule>,
}

impl EngineConfig {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed or validated.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;

        let config = Self::from_toml(&content)?;
        info!(
            path = %path.display(),
            rules = config.alert_rules.len(),
            "loaded configuration"
        );
        Ok(config)
    }

    /// Parse configuration from a TOML string.
    ///
    /// Rules whose operator cannot be parsed are kept and reported with a
    /// warning; the evaluator reports them again on every pass.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML is invalid or fails validation.
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;

        for rule in config.rules_with_unknown_operators() {
            warn!(
                rule = %rule.name,
                condition = %rule.condition,
                "rule has an unknown comparison operator and will never be evaluated"
            );
        }

        Ok(config)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid.
    pub fn validate(&self) -> Result<()> {
        let url = self.prometheus.url.trim();
        if url.is_empty() {
            return Err(ConfigError::invalid("prometheus.url cannot be empty"));
        }

        if !url.starts_with("http://") && !url.starts_with("https://") {
            return Err(ConfigError::invalid(
                "prometheus.url must start with http:// or https://",
            ));
        }

        if self.prometheus.scrape_interval_secs == 0 {
            return Err(ConfigError::invalid(
                "prometheus.scrape_interval_secs must be greater than 0",
            ));
        }

        if self.prometheus.query_timeout_secs == 0 {
            return Err(ConfigError::invalid(
                "prometheus.query_timeout_secs must be greater than 0",
            ));
        }

        let bad_webhook = self
            .notifications
            .webhook_targets()
            .into_iter()
            .find(|url| !url.starts_with("http://") && !url.starts_with("https://"));
        if let Some(url) = bad_webhook {
            return Err(ConfigError::invalid(format!(
                "webhook url '{url}' must start with http:// or https://"
            )));
        }

        if self.alert_rules.is_empty() {
            return Err(ConfigError::invalid("at least one alert rule is required"));
        }

        let mut seen = HashSet::new();
        for rule in &self.alert_rules {
            rule.validate()
                .map_err(|e| ConfigError::invalid(e.to_string()))?;

            if !seen.insert(rule.name.as_str()) {
                return Err(ConfigError::invalid(format!(
                    "duplicate alert rule name '{}'",
                    rule.name
                )));
            }
        }

        Ok(())
    }

    /// Applies command-line overrides.
    pub fn apply_overrides(&mut self, bind_addr: Option<SocketAddr>, interval_secs: Option<u64>) {
        if let Some(addr) = bind_addr {
            self.server.bind_addr = addr;
        }
        if let Some(secs) = interval_secs {
            self.prometheus.scrape_interval_secs = secs;
        }
    }

    /// Returns the rules whose operator is not recognized.
    pub fn rules_with_unknown_operators(&self) -> impl Iterator<Item = &AlertRule> {
        self.alert_rules.iter().filter(|r| r.operator().is_err())
    }

    /// Returns the delay between passes.
    #[must_use]
    pub const fn scrape_interval(&self) -> Duration {
        Duration::from_secs(self.prometheus.scrape_interval_secs)
    }

    /// Returns the query timeout.
    #[must_use]
    pub const fn query_timeout(&self) -> Duration {
        Duration::from_secs(self.prometheus.query_timeout_secs)
    }

    /// Returns the cooldown shared by all rules.
    #[must_use]
    pub fn cooldown(&self) -> chrono::Duration {
        i64::try_from(self.alert_settings.cooldown_minutes)
            .ok()
            .and_then(chrono::Duration::try_minutes)
            .unwrap_or(chrono::Duration::MAX)
    }

    /// Returns the Prometheus source settings.
    #[must_use]
    pub fn prometheus_source(&self) -> PrometheusSourceConfig {
        PrometheusSourceConfig::new(self.prometheus.url.trim()).with_query_timeout(self.query_timeout())
    }

    /// Builds the notification sink selected by the settings.
    ///
    /// # Errors
    ///
    /// Returns an error if the webhook sink cannot be created.
    pub fn notification_sink(&self) -> Result<ConfiguredSink> {
        ConfiguredSink::from_settings(
            self.notifications.enabled,
            &self.notifications.webhook_targets(),
            self.notifications.timeout_secs,
        )
        .map_err(|e| ConfigError::invalid(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;
    use test_case::test_case;
    use vigil_alerts::{AlertSeverity, NotificationSink};

    const MINIMAL: &str = r#"
        [prometheus]
        url = "http://localhost:9090"

        [[alert_rules]]
        name = "high_temperature"
        metric = "iot_temperature_celsius"
        condition = ">"
        threshold = 30.0
    "#;

    const FULL: &str = r#"
        [prometheus]
        url = "http://prometheus:9090"
        scrape_interval_secs = 15
        query_timeout_secs = 5

        [alert_settings]
        cooldown_minutes = 30

        [notifications]
        enabled = true
        webhook_url = "https://hooks.example.com/alerts"

        [server]
        bind_addr = "127.0.0.1:9187"

        [[alert_rules]]
        name = "high_temperature"
        metric = "iot_temperature_celsius"
        condition = ">"
        threshold = 30.0
        duration = 120
        severity = "critical"
        summary = "Temperature too high"
        description = "Sensor temperature exceeded 30C for two minutes"

        [[alert_rules]]
        name = "low_battery"
        metric = "iot_battery_percent"
        condition = "<"
        threshold = 20
        duration = 300
        severity = "warning"
        resolution_notification = false
    "#;

    fn create_temp_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().expect("failed to create temp file");
        file.write_all(content.as_bytes())
            .expect("failed to write temp file");
        file
    }

    fn with_rules(rules: &str) -> String {
        format!("[prometheus]\nurl = \"http://localhost:9090\"\n{rules}")
    }

    #[test]
    fn parse_minimal_config() {
        let config = EngineConfig::from_toml(MINIMAL).expect("should parse minimal config");

        assert_eq!(config.prometheus.scrape_interval_secs, 30);
        assert_eq!(config.prometheus.query_timeout_secs, 10);
        assert_eq!(config.alert_settings.cooldown_minutes, 15);
        assert!(!config.notifications.enabled);
        assert_eq!(config.server.bind_addr, SocketAddr::from(([0, 0, 0, 0], 8087)));

        let rule = &config.alert_rules[0];
        assert_eq!(rule.duration, 0);
        assert_eq!(rule.severity, AlertSeverity::Warning);
        assert!(rule.resolution_notification);
    }

    #[test]
    fn parse_full_config() {
        let config = EngineConfig::from_toml(FULL).expect("should parse full config");

        assert_eq!(config.scrape_interval(), Duration::from_secs(15));
        assert_eq!(config.query_timeout(), Duration::from_secs(5));
        assert_eq!(config.cooldown(), chrono::Duration::minutes(30));
        assert_eq!(config.server.bind_addr.port(), 9187);
        assert_eq!(config.alert_rules.len(), 2);
        assert_eq!(config.alert_rules[0].title(), "Temperature too high");
        assert!(!config.alert_rules[1].resolution_notification);
        assert!((config.alert_rules[1].threshold - 20.0).abs() < f64::EPSILON);
    }

    #[test]
    fn from_file_reads_toml() {
        let file = create_temp_config(FULL);
        let config = EngineConfig::from_file(file.path()).expect("should load file");
        assert_eq!(config.alert_rules.len(), 2);
    }

    #[test]
    fn from_file_missing() {
        let err = EngineConfig::from_file("/nonexistent/vigil.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn invalid_toml_is_parse_error() {
        let err = EngineConfig::from_toml("[prometheus\nurl = ").unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn missing_prometheus_section_is_parse_error() {
        let err = EngineConfig::from_toml("alert_rules = []").unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test_case("[prometheus]\nurl = \"\"" ; "empty url")]
    #[test_case("[prometheus]\nurl = \"localhost:9090\"" ; "url without scheme")]
    #[test_case("[prometheus]\nurl = \"http://p:9090\"\nscrape_interval_secs = 0" ; "zero interval")]
    #[test_case("[prometheus]\nurl = \"http://p:9090\"\nquery_timeout_secs = 0" ; "zero timeout")]
    fn invalid_prometheus_settings(prometheus: &str) {
        let content = format!(
            "{prometheus}\n[[alert_rules]]\nname = \"r\"\nmetric = \"m\"\ncondition = \">\"\nthreshold = 1.0\n"
        );
        let err = EngineConfig::from_toml(&content).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { .. }), "{err}");
    }

    #[test]
    fn no_rules_is_invalid() {
        let err = EngineConfig::from_toml("[prometheus]\nurl = \"http://p:9090\"").unwrap_err();
        assert!(err.to_string().contains("at least one alert rule"));
    }

    #[test]
    fn duplicate_rule_names_are_invalid() {
        let rule = "[[alert_rules]]\nname = \"dup\"\nmetric = \"m\"\ncondition = \">\"\nthreshold = 1.0\n";
        let err = EngineConfig::from_toml(&with_rules(&format!("{rule}{rule}"))).unwrap_err();
        assert!(err.to_string().contains("duplicate alert rule name 'dup'"));
    }

    #[test]
    fn empty_metric_is_invalid() {
        let rule = "[[alert_rules]]\nname = \"r\"\nmetric = \"\"\ncondition = \">\"\nthreshold = 1.0\n";
        assert!(EngineConfig::from_toml(&with_rules(rule)).is_err());
    }

    #[test]
    fn nan_threshold_is_invalid() {
        let rule = "[[alert_rules]]\nname = \"r\"\nmetric = \"m\"\ncondition = \">\"\nthreshold = nan\n";
        assert!(EngineConfig::from_toml(&with_rules(rule)).is_err());
    }

    #[test]
    fn oversized_duration_is_invalid() {
        let rule = "[[alert_rules]]\nname = \"r\"\nmetric = \"m\"\ncondition = \">\"\nthreshold = 1.0\nduration = 10000000000000000\n";
        let err = EngineConfig::from_toml(&with_rules(rule)).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { .. }), "{err}");
        assert!(err.to_string().contains("duration exceeds maximum"));
    }

    #[test]
    fn unknown_severity_is_parse_error() {
        let rule = "[[alert_rules]]\nname = \"r\"\nmetric = \"m\"\ncondition = \">\"\nthreshold = 1.0\nseverity = \"page\"\n";
        let err = EngineConfig::from_toml(&with_rules(rule)).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn unknown_operator_is_kept() {
        let rule = "[[alert_rules]]\nname = \"regex\"\nmetric = \"m\"\ncondition = \"=~\"\nthreshold = 1.0\n";
        let config = EngineConfig::from_toml(&with_rules(rule)).expect("operator is checked per pass");
        let unknown: Vec<_> = config.rules_with_unknown_operators().map(|r| r.name.as_str()).collect();
        assert_eq!(unknown, vec!["regex"]);
    }

    #[test]
    fn webhook_url_needs_scheme() {
        let content = MINIMAL.replace(
            "[[alert_rules]]",
            "[notifications]\nenabled = true\nwebhook_url = \"hooks.example.com\"\n\n[[alert_rules]]",
        );
        assert!(EngineConfig::from_toml(&content).is_err());
    }

    #[test]
    fn webhook_targets_merge_and_dedupe() {
        let settings = NotificationSettings {
            enabled: true,
            webhook_url: Some("https://a.example.com/hook".to_string()),
            webhook_urls: vec![
                "https://b.example.com/hook".to_string(),
                " https://a.example.com/hook ".to_string(),
            ],
            ..NotificationSettings::default()
        };
        assert_eq!(
            settings.webhook_targets(),
            vec!["https://a.example.com/hook", "https://b.example.com/hook"]
        );
    }

    #[test]
    fn several_webhooks_fan_out() {
        let content = MINIMAL.replace(
            "[[alert_rules]]",
            "[notifications]\nenabled = true\nwebhook_urls = [\"http://a/hook\", \"http://b/hook\"]\n\n[[alert_rules]]",
        );
        let config = EngineConfig::from_toml(&content).unwrap();
        let sink = config.notification_sink().unwrap();
        assert_eq!(sink.name(), "webhooks");
        assert!(sink.is_remote());
    }

    #[test]
    fn fanout_webhook_needs_scheme() {
        let content = MINIMAL.replace(
            "[[alert_rules]]",
            "[notifications]\nwebhook_urls = [\"http://a/hook\", \"b/hook\"]\n\n[[alert_rules]]",
        );
        let err = EngineConfig::from_toml(&content).unwrap_err();
        assert!(err.to_string().contains("b/hook"));
    }

    #[test]
    fn overrides_replace_file_values() {
        let mut config = EngineConfig::from_toml(MINIMAL).unwrap();
        let addr: SocketAddr = "127.0.0.1:18087".parse().unwrap();
        config.apply_overrides(Some(addr), Some(5));
        assert_eq!(config.server.bind_addr, addr);
        assert_eq!(config.scrape_interval(), Duration::from_secs(5));

        config.apply_overrides(None, None);
        assert_eq!(config.server.bind_addr, addr);
    }

    #[test]
    fn huge_cooldown_saturates() {
        let mut config = EngineConfig::from_toml(MINIMAL).unwrap();
        config.alert_settings.cooldown_minutes = u64::MAX;
        assert_eq!(config.cooldown(), chrono::Duration::MAX);
    }

    #[test]
    fn derived_components() {
        let config = EngineConfig::from_toml(FULL).unwrap();

        let source = config.prometheus_source();
        assert_eq!(source.url, "http://prometheus:9090");
        assert_eq!(source.query_timeout, Duration::from_secs(5));

        let sink = config.notification_sink().unwrap();
        assert!(sink.is_remote());

        let minimal = EngineConfig::from_toml(MINIMAL).unwrap();
        assert!(!minimal.notification_sink().unwrap().is_remote());
    }
}
