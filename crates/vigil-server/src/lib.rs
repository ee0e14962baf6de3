//! # vigil-server
//!
//! HTTP status and control API for the Vigil alert engine.
//!
//! The server exposes the alert store, the rule catalog and the engine's own
//! counters, built on the axum HTTP framework. It never drives evaluation
//! itself; the `vigil` binary runs an [`EvaluationLoop`](vigil_alerts::EvaluationLoop)
//! next to it and both share one [`Evaluator`](vigil_alerts::Evaluator).
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use vigil_alerts::{AlertRule, AlertStore, ComparisonOperator, Evaluator, LogSink, LoopStatus};
//! use vigil_metrics::InMemorySource;
//! use vigil_server::{ServerConfig, VigilServer};
//!
//! #[tokio::main]
//! async fn main() {
//!     let evaluator = Arc::new(Evaluator::new(
//!         InMemorySource::new(),
//!         LogSink::default(),
//!         AlertStore::new(),
//!     ));
//!     let rules: Arc<[AlertRule]> = Vec::new().into();
//!
//!     let _server = VigilServer::new(ServerConfig::default(), evaluator, rules, LoopStatus::default());
//!     // _server.serve("0.0.0.0:8087".parse().unwrap()).await.unwrap();
//! }
//! ```
//!
//! ## API Endpoints
//!
//! | Endpoint | Method | Description |
//! |----------|--------|-------------|
//! | `/` | GET | Service banner |
//! | `/health` | GET | Component health, 503 when degraded |
//! | `/metrics` | GET | Prometheus text exposition of engine counters |
//! | `/alerts` | GET | Every tracked alert |
//! | `/alerts/{name}` | GET | One tracked alert |
//! | `/history` | GET | Alerts plus evaluator and delivery counters |
//! | `/rules` | GET | The configured rule catalog |
//! | `/reset` | POST | Clear every alert record |
//! | `/test-notification` | POST | Send a test message through the sink |

#![forbid(unsafe_code)]
#![doc(html_root_url = "https://docs.rs/vigil-server/0.1.0")]
#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod config;
pub mod error;
pub mod handlers;
pub mod routes;
pub mod server;
pub mod state;
pub mod types;

// Re-export main types
pub use config::{DEFAULT_SERVICE_NAME, ServerConfig};
pub use error::{ServerError, ServerResult};
pub use routes::create_router;
pub use server::VigilServer;
pub use state::AppState;
pub use types::{
    AlertView, AlertsResponse, HealthComponents, HealthResponse, HealthStatus, HistoryResponse,
    NotificationStats, ResetResponse, RulesResponse, ServiceInfo, TestNotificationResponse,
};
