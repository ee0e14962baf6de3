//! Alert state machine and evaluation loop for Vigil.
//!
//! `vigil-alerts` turns a noisy "condition currently true/false" signal into
//! discrete fire and resolve events:
//!
//! - **Debounce**: a rule must hold for its `duration` before the first fire
//! - **Cooldown**: a rule that keeps holding refires at most once per cooldown
//! - **Auto-reset**: a resolved rule returns to normal after five quiet minutes
//!
//! The pure [`transition`] function implements the state machine. The
//! [`AlertStore`] holds one [`AlertRecord`] per rule, the [`Evaluator`] runs a
//! pass over the rule catalog and the [`EvaluationLoop`] schedules passes.
//!
//! # Example
//!
//! ```rust
//! use vigil_alerts::{
//!     AlertRule, AlertSeverity, AlertState, AlertStore, ComparisonOperator, Evaluator,
//!     LogSink, ManualClock,
//! };
//! use vigil_metrics::InMemorySource;
//!
//! # tokio::runtime::Builder::new_current_thread().enable_time().build().unwrap().block_on(async {
//! let clock = ManualClock::default();
//! let evaluator = Evaluator::with_clock(
//!     InMemorySource::new(),
//!     LogSink::default(),
//!     clock.clone(),
//!     AlertStore::new(),
//! );
//!
//! // Fire once the temperature has stayed above 30 for two minutes
//! let rule = AlertRule::builder(
//!     "high_temperature",
//!     "iot_temperature_celsius",
//!     ComparisonOperator::GreaterThan,
//!     30.0,
//! )
//! .duration_secs(120)
//! .severity(AlertSeverity::Critical)
//! .build()
//! .unwrap();
//! let rules = vec![rule];
//!
//! evaluator.source().set("iot_temperature_celsius", 34.0);
//! evaluator.evaluate_pass(&rules).await;
//! clock.advance_secs(120);
//! let report = evaluator.evaluate_pass(&rules).await;
//!
//! assert_eq!(report.fired, vec!["high_temperature"]);
//! let record = evaluator.store().get_record("high_temperature").unwrap();
//! assert_eq!(record.state, AlertState::Firing);
//! # });
//! ```

#![forbid(unsafe_code)]
#![doc(html_root_url = "https://docs.rs/vigil-alerts/0.1.0")]
#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod channels;
pub mod clock;
pub mod condition;
pub mod error;
pub mod evaluator;
pub mod scheduler;
pub mod state;
pub mod store;
pub mod types;

// Re-export main types at crate root
pub use channels::{
    AlertContext, ConfiguredSink, FanoutSink, LogSink, Notification, NotificationKind,
    NotificationSink, WebhookConfig, WebhookSink,
};
pub use clock::{Clock, ManualClock, SystemClock};
pub use condition::{ComparisonOperator, check_condition};
pub use error::{AlertError, Result};
pub use evaluator::{
    DEFAULT_COOLDOWN, DEFAULT_SAMPLE_TIMEOUT, Evaluator, EvaluatorConfig, EvaluatorStats,
    PassReport, StatsSnapshot,
};
pub use scheduler::{EvaluationLoop, LoopStatus};
pub use state::{AlertEvent, AlertRecord, RESOLVED_RESET_WINDOW, transition};
pub use store::{AlertStatus, AlertStore};
pub use types::{AlertRule, AlertRuleBuilder, AlertSeverity, AlertState, SeverityIndex};
