//! Route configuration for the HTTP API.

use std::sync::Arc;

use axum::routing::{Router, get, post};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use vigil_alerts::{Clock, NotificationSink};
use vigil_metrics::MetricSource;

use crate::config::ServerConfig;
use crate::handlers::{
    get_alert, get_history, get_metrics, health_check, home, list_alerts, list_rules,
    reset_alerts, test_notification,
};
use crate::state::AppState;

/// Create the API router.
pub fn create_router<S, N, C>(state: Arc<AppState<S, N, C>>) -> Router
where
    S: MetricSource + 'static,
    N: NotificationSink + 'static,
    C: Clock + 'static,
{
    let cors = build_cors_layer(state.config());

    Router::new()
        .route("/", get(home::<S, N, C>))
        .route("/health", get(health_check::<S, N, C>))
        .route("/metrics", get(get_metrics::<S, N, C>))
        // Alert status
        .route("/alerts", get(list_alerts::<S, N, C>))
        .route("/alerts/{name}", get(get_alert::<S, N, C>))
        .route("/history", get(get_history::<S, N, C>))
        .route("/rules", get(list_rules::<S, N, C>))
        // Operator actions
        .route("/reset", post(reset_alerts::<S, N, C>))
        .route("/test-notification", post(test_notification::<S, N, C>))
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

/// Build the CORS layer based on configuration.
fn build_cors_layer(config: &ServerConfig) -> CorsLayer {
    if config.cors_origins.is_empty() {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let origins: Vec<_> = config
            .cors_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any)
    }
}
