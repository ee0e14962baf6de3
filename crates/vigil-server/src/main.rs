//! vigil - alert evaluation engine
//!
//! Samples metrics from Prometheus, runs the alert state machine over the
//! configured rules and serves the status API.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tokio::sync::watch;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;
use vigil_alerts::{AlertRule, AlertStore, EvaluationLoop, Evaluator, NotificationSink};
use vigil_config::{DEFAULT_CONFIG_PATH, EngineConfig};
use vigil_metrics::{EngineMetrics, MetricSource, PrometheusSource};
use vigil_server::{ServerConfig, VigilServer};

#[derive(Parser, Debug)]
#[command(name = "vigil")]
#[command(about = "Vigil alert evaluation engine")]
#[command(version)]
struct Cli {
    /// Path to config file
    #[arg(short, long, env = "VIGIL_CONFIG", default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Address for the HTTP API (overrides the config file)
    #[arg(long)]
    bind: Option<SocketAddr>,

    /// Seconds between evaluation passes (overrides the config file)
    #[arg(long)]
    interval: Option<u64>,

    /// Emit logs as JSON
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.json);

    if let Err(e) = run(cli).await {
        error!(error = %format!("{e:#}"), "vigil failed");
        std::process::exit(1);
    }
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if json {
        tracing_subscriber::fmt().with_env_filter(filter).json().init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    info!(config = %cli.config.display(), "starting vigil");

    let mut config = EngineConfig::from_file(&cli.config)
        .with_context(|| format!("loading {}", cli.config.display()))?;
    config.apply_overrides(cli.bind, cli.interval);
    config.validate().context("invalid command-line override")?;

    let source = PrometheusSource::new(config.prometheus_source())?;
    if !source.health_check().await {
        warn!(url = %config.prometheus.url, "prometheus is not reachable yet");
    }

    let sink = config.notification_sink()?;
    let evaluator = Arc::new(
        Evaluator::new(source, sink, AlertStore::new())
            .with_cooldown(config.cooldown())
            .with_sample_timeout(Some(config.query_timeout()))
            .with_metrics(EngineMetrics::new()),
    );
    let rules: Arc<[AlertRule]> = config.alert_rules.clone().into();
    info!(
        rules = rules.len(),
        sink = %evaluator.sink().name(),
        interval_secs = config.prometheus.scrape_interval_secs,
        cooldown_minutes = config.alert_settings.cooldown_minutes,
        "alert engine configured"
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let evaluation_loop = EvaluationLoop::new(
        Arc::clone(&evaluator),
        Arc::clone(&rules),
        config.scrape_interval(),
    );
    let loop_status = evaluation_loop.status();
    let loop_handle = evaluation_loop.spawn(shutdown_rx);

    let server = VigilServer::new(ServerConfig::default(), evaluator, rules, loop_status);
    let served = server
        .serve_with_shutdown(config.server.bind_addr, shutdown_signal())
        .await;

    let _ = shutdown_tx.send(true);
    if let Err(e) = loop_handle.await {
        error!(error = %e, "evaluation loop task failed");
    }

    served?;
    info!("vigil stopped");
    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("shutdown signal received"),
        Err(e) => {
            error!(error = %e, "failed to listen for shutdown signal");
            std::future::pending::<()>().await;
        }
    }
}
