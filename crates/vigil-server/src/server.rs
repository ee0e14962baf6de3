//! HTTP server implementation.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;
use tracing::info;
use vigil_alerts::{AlertRule, Clock, Evaluator, LoopStatus, NotificationSink, SystemClock};
use vigil_metrics::MetricSource;

use crate::config::ServerConfig;
use crate::error::{ServerError, ServerResult};
use crate::routes::create_router;
use crate::state::AppState;

/// Status and control API for a running alert engine.
pub struct VigilServer<S, N, C = SystemClock> {
    state: Arc<AppState<S, N, C>>,
}

impl<S, N, C> Clone for VigilServer<S, N, C> {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
        }
    }
}

impl<S, N, C> std::fmt::Debug for VigilServer<S, N, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VigilServer")
            .field("state", &self.state)
            .finish()
    }
}

impl<S, N, C> VigilServer<S, N, C>
where
    S: MetricSource + 'static,
    N: NotificationSink + 'static,
    C: Clock + 'static,
{
    /// Create a server over the given evaluator and rule catalog.
    #[must_use]
    pub fn new(
        config: ServerConfig,
        evaluator: Arc<Evaluator<S, N, C>>,
        rules: Arc<[AlertRule]>,
        loop_status: LoopStatus,
    ) -> Self {
        let state = Arc::new(AppState::new(config, evaluator, rules, loop_status));
        Self { state }
    }

    /// Get the server state for external access.
    #[must_use]
    pub fn state(&self) -> Arc<AppState<S, N, C>> {
        Arc::clone(&self.state)
    }

    /// Start the server and listen for connections.
    ///
    /// This method runs until the server encounters a fatal error.
    ///
    /// # Errors
    ///
    /// Returns an error if binding to the address fails.
    pub async fn serve(&self, addr: SocketAddr) -> ServerResult<()> {
        self.serve_with_shutdown(addr, std::future::pending::<()>())
            .await
    }

    /// Start the server with graceful shutdown support.
    ///
    /// The server will shut down when the provided future completes.
    ///
    /// # Errors
    ///
    /// Returns an error if binding to the address fails.
    pub async fn serve_with_shutdown<F>(&self, addr: SocketAddr, shutdown: F) -> ServerResult<()>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| ServerError::BindFailed(addr, e))?;

        info!(addr = %addr, "Vigil API listening");

        axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown)
            .await
            .map_err(|e| ServerError::Internal(e.to_string()))?;

        info!("Vigil API shut down");
        Ok(())
    }

    /// Create the router without starting the server.
    pub fn router(&self) -> axum::Router {
        create_router(Arc::clone(&self.state))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use vigil_alerts::{AlertStore, ComparisonOperator, LogSink};
    use vigil_metrics::InMemorySource;

    fn make_test_server() -> VigilServer<InMemorySource, LogSink> {
        let evaluator = Arc::new(Evaluator::new(
            InMemorySource::new(),
            LogSink::default(),
            AlertStore::new(),
        ));
        let rules: Arc<[AlertRule]> = vec![
            AlertRule::builder(
                "high_humidity",
                "iot_humidity_percent",
                ComparisonOperator::GreaterThanOrEqual,
                85.0,
            )
            .build()
            .unwrap(),
        ]
        .into();
        VigilServer::new(ServerConfig::default(), evaluator, rules, LoopStatus::default())
    }

    #[test]
    fn test_server_clone_shares_state() {
        let server = make_test_server();
        let cloned = server.clone();

        assert!(Arc::ptr_eq(&server.state(), &cloned.state()));
        assert_eq!(cloned.state().rules().len(), 1);
    }

    #[tokio::test]
    async fn test_serve_with_shutdown() {
        let server = make_test_server();
        let addr = SocketAddr::from(([127, 0, 0, 1], 0));
        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();

        let server_handle = tokio::spawn(async move {
            server
                .serve_with_shutdown(addr, async move {
                    let _ = shutdown_rx.await;
                })
                .await
        });

        tokio::time::sleep(Duration::from_millis(50)).await;
        let _ = shutdown_tx.send(());

        let result = tokio::time::timeout(Duration::from_secs(1), server_handle)
            .await
            .unwrap()
            .unwrap();
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_serve_bind_failure() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let result = make_test_server().serve(addr).await;

        assert!(matches!(result, Err(ServerError::BindFailed(a, _)) if a == addr));
    }
}
