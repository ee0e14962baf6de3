//! Configuration loading and validation for Vigil.
//!
//! The engine reads a single TOML file describing the Prometheus server to
//! sample, the shared alert settings, notification delivery, the status
//! server and the rule catalog.
//!
//! # Example
//!
//! ```rust
//! use vigil_config::EngineConfig;
//!
//! let config = EngineConfig::from_toml(r#"
//!     [prometheus]
//!     url = "http://localhost:9090"
//!
//!     [[alert_rules]]
//!     name = "high_temperature"
//!     metric = "iot_temperature_celsius"
//!     condition = ">"
//!     threshold = 30.0
//!     duration = 120
//!     severity = "critical"
//! "#).unwrap();
//!
//! assert_eq!(config.alert_rules.len(), 1);
//! assert_eq!(config.alert_settings.cooldown_minutes, 15);
//! ```

#![forbid(unsafe_code)]
#![doc(html_root_url = "https://docs.rs/vigil-config/0.1.0")]
#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod engine;
pub mod error;

pub use engine::{
    AlertSettings, DEFAULT_CONFIG_PATH, EngineConfig, NotificationSettings, PrometheusSettings,
    ServerSettings,
};
pub use error::{ConfigError, Result};
