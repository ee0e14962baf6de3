//! Metric sources and engine self-metrics for Vigil.
//!
//! `vigil-metrics` covers both directions of metric traffic for the alert
//! engine:
//!
//! - **Inbound**: the [`MetricSource`] trait supplies the current value of a
//!   named metric. [`PrometheusSource`] queries a Prometheus server over HTTP,
//!   [`InMemorySource`] serves fixed values for tests and demos.
//! - **Outbound**: [`EngineMetrics`] records what the engine itself did
//!   (alerts fired, notifications sent, rules skipped) and encodes it in the
//!   Prometheus text format.
//!
//! # Example
//!
//! ```rust
//! use vigil_metrics::{InMemorySource, MetricSource};
//!
//! # tokio_test_block_on(async {
//! let source = InMemorySource::new();
//! source.set("iot_temperature_celsius", 31.5);
//!
//! let value = source.sample("iot_temperature_celsius").await.unwrap();
//! assert!((value - 31.5).abs() < f64::EPSILON);
//! assert!(source.sample("iot_humidity_percent").await.is_err());
//! # });
//! # fn tokio_test_block_on<F: std::future::Future>(f: F) -> F::Output {
//! #     tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(f)
//! # }
//! ```

#![forbid(unsafe_code)]
#![doc(html_root_url = "https://docs.rs/vigil-metrics/0.1.0")]
#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod error;
pub mod exposition;
pub mod prometheus;
pub mod source;

// Re-export main types at crate root
pub use error::{MetricsError, Result};
pub use exposition::{EngineMetrics, SkipReason};
pub use prometheus::{PrometheusSource, PrometheusSourceConfig};
pub use source::{InMemorySource, MetricSource};
