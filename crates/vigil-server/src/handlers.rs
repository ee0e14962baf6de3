//! HTTP request handlers.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::{StatusCode, header};
use axum::response::IntoResponse;
use chrono::Utc;
use tracing::{info, warn};
use vigil_alerts::{Clock, NotificationSink};
use vigil_metrics::{EngineMetrics, MetricSource};

use crate::error::{ServerError, ServerResult};
use crate::state::AppState;
use crate::types::{
    AlertView, AlertsResponse, HealthComponents, HealthResponse, HealthStatus, HistoryResponse,
    ResetResponse, RulesResponse, ServiceInfo, TestNotificationResponse,
};

type SharedState<S, N, C> = State<Arc<AppState<S, N, C>>>;

/// Handle GET / - service banner.
pub async fn home<S, N, C>(State(state): SharedState<S, N, C>) -> Json<ServiceInfo>
where
    S: MetricSource + 'static,
    N: NotificationSink + 'static,
    C: Clock + 'static,
{
    Json(ServiceInfo {
        service: state.config().service_name.clone(),
        status: "running".to_string(),
        timestamp: Utc::now(),
    })
}

/// Handle GET /health - component health, 503 when any check fails.
pub async fn health_check<S, N, C>(
    State(state): SharedState<S, N, C>,
) -> (StatusCode, Json<HealthResponse>)
where
    S: MetricSource + 'static,
    N: NotificationSink + 'static,
    C: Clock + 'static,
{
    let components = HealthComponents {
        metric_source: state.evaluator().source().health_check().await,
        // The sink is built at startup, so one is always present.
        notifier: true,
        evaluation_loop: state.loop_status().is_running(),
    };

    let (code, status) = if components.all_healthy() {
        (StatusCode::OK, HealthStatus::Healthy)
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, HealthStatus::Degraded)
    };

    (
        code,
        Json(HealthResponse {
            status,
            components,
            uptime_secs: state.uptime_secs(),
            timestamp: Utc::now(),
        }),
    )
}

/// Handle GET /metrics - Prometheus text exposition.
pub async fn get_metrics<S, N, C>(State(state): SharedState<S, N, C>) -> impl IntoResponse
where
    S: MetricSource + 'static,
    N: NotificationSink + 'static,
    C: Clock + 'static,
{
    (
        [(header::CONTENT_TYPE, EngineMetrics::content_type())],
        state.metrics().encode(),
    )
}

/// Handle GET /alerts - every tracked alert.
pub async fn list_alerts<S, N, C>(State(state): SharedState<S, N, C>) -> Json<AlertsResponse>
where
    S: MetricSource + 'static,
    N: NotificationSink + 'static,
    C: Clock + 'static,
{
    Json(AlertsResponse {
        alerts: state.alert_views(),
        timestamp: Utc::now(),
    })
}

/// Handle GET /alerts/{name} - one tracked alert.
pub async fn get_alert<S, N, C>(
    State(state): SharedState<S, N, C>,
    Path(name): Path<String>,
) -> ServerResult<Json<AlertView>>
where
    S: MetricSource + 'static,
    N: NotificationSink + 'static,
    C: Clock + 'static,
{
    state
        .alert_view(&name)
        .map(Json)
        .ok_or_else(|| ServerError::NotFound("alert".to_string(), name))
}

/// Handle GET /history - alerts plus evaluator and delivery counters.
pub async fn get_history<S, N, C>(State(state): SharedState<S, N, C>) -> Json<HistoryResponse>
where
    S: MetricSource + 'static,
    N: NotificationSink + 'static,
    C: Clock + 'static,
{
    Json(HistoryResponse {
        history: state.alert_views(),
        stats: state.evaluator().stats().snapshot(),
        notification_stats: state.notification_stats(),
        timestamp: Utc::now(),
    })
}

/// Handle GET /rules - the configured rule catalog.
pub async fn list_rules<S, N, C>(State(state): SharedState<S, N, C>) -> Json<RulesResponse>
where
    S: MetricSource + 'static,
    N: NotificationSink + 'static,
    C: Clock + 'static,
{
    let rules = state.rules().to_vec();
    let count = rules.len();
    Json(RulesResponse { rules, count })
}

/// Handle POST /reset - clear every alert record.
pub async fn reset_alerts<S, N, C>(State(state): SharedState<S, N, C>) -> Json<ResetResponse>
where
    S: MetricSource + 'static,
    N: NotificationSink + 'static,
    C: Clock + 'static,
{
    state.evaluator().store().reset();
    info!("alert store reset via api");
    Json(ResetResponse {
        status: "reset".to_string(),
    })
}

/// Handle POST /test-notification - send a test message through the sink.
pub async fn test_notification<S, N, C>(
    State(state): SharedState<S, N, C>,
) -> ServerResult<Json<TestNotificationResponse>>
where
    S: MetricSource + 'static,
    N: NotificationSink + 'static,
    C: Clock + 'static,
{
    let sink = state.evaluator().sink();
    if sink.send_test().await {
        Ok(Json(TestNotificationResponse {
            status: "success".to_string(),
            message: format!("test notification sent via {}", sink.name()),
        }))
    } else {
        warn!(sink = %sink.name(), "test notification failed");
        Err(ServerError::NotificationFailed(format!(
            "sink {} could not deliver the test notification",
            sink.name()
        )))
    }
}
