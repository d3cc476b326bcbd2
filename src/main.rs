//! Foundation service
//!
//! Example service built on the foundation.
//!
//! # Architecture Overview
//!
//! ```text
//!   config (file / env JSON)
//!        │
//!        ▼
//!   FoundationOptions ──▶ Foundation ──┬── processors (heartbeat)
//!                            ▲         ├── gRPC listener (tonic)
//!                            │         └── HTTP listener (axum, /status)
//!                     SIGINT/SIGTERM
//!                    cancel run token
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::Duration;

use anyhow::{bail, Context};
use async_trait::async_trait;
use clap::Parser;
use tokio_util::sync::CancellationToken;

use service_foundation::config::{self, AppConfig, Environment, FoundationOptions};
use service_foundation::http::handlers::status_router;
use service_foundation::http::middleware::{BasicAuth, ForceSsl};
use service_foundation::lifecycle::{BoxError, Processor, StopHandle};
use service_foundation::observability::{logging, metrics};
use service_foundation::Foundation;

#[derive(Parser)]
#[command(name = "foundation-service")]
#[command(about = "Example service running on the service foundation", long_about = None)]
struct Cli {
    /// Path to a JSON or TOML config file.
    #[arg(short, long, env = "LOCAL_CONFIG_FILE")]
    config: Option<PathBuf>,

    /// Inline JSON config.
    #[arg(long, env = "config", hide_env_values = true)]
    config_json: Option<String>,

    /// gRPC port override, honoured outside development.
    #[arg(long, env = "PORT")]
    port: Option<String>,

    /// Expose Prometheus metrics on this address.
    #[arg(long)]
    metrics_address: Option<SocketAddr>,

    /// Abort startup when a processor fails to start.
    #[arg(long)]
    stop_on_processor_start_failure: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let mut app_config = load_configuration(&cli)?;

    if app_config.environment != Environment::Development.as_str() {
        if let Some(port) = &cli.port {
            app_config.grpc_server_config.port = port.clone();
        }
    }

    let mut options = FoundationOptions::from_config(&app_config);
    options.stop_on_processor_start_failure = cli.stop_on_processor_start_failure;
    options.log_skip_paths = vec!["/status".to_string()];

    logging::init_logging(options.environment).context("failed to initialize logging")?;
    tracing::info!(
        app = %app_config.app_name,
        environment = %options.environment,
        http_enabled = options.http.enabled,
        grpc_enabled = options.grpc.enabled,
        shutdown_wait_secs = options.shutdown_wait.as_secs(),
        "Configuration loaded"
    );

    if let Some(addr) = cli.metrics_address {
        metrics::init_metrics(addr).context("failed to start metrics endpoint")?;
    }

    let environment = options.environment;
    let mut foundation = Foundation::new(options);
    // Load balancer health checks arrive over plain HTTP.
    foundation.http_router(status_router());
    if !app_config.basic_auth_users.is_empty() {
        let auth = BasicAuth::new(environment, app_config.basic_auth_users.clone());
        let app_name = app_config.app_name.clone();
        let whoami = auth.protect(axum::Router::new().route(
            "/whoami",
            axum::routing::get(move || async move { app_name }),
        ));
        foundation.http_router(ForceSsl::new(environment).protect(whoami));
    }
    foundation.add_processor(Heartbeat::new(Duration::from_secs(30)));

    foundation
        .run_until_signal()
        .await
        .context("failed running or shutting down service")?;

    tracing::info!("Shutdown complete");
    Ok(())
}

fn load_configuration(cli: &Cli) -> anyhow::Result<AppConfig> {
    if let Some(path) = &cli.config {
        return config::load_config(path)
            .with_context(|| format!("failed to load config from {}", path.display()));
    }
    if let Some(json) = &cli.config_json {
        return config::load_from_str(json, true).context("failed to load inline config");
    }
    bail!("either LOCAL_CONFIG_FILE or config must be set")
}

/// Logs a heartbeat on a fixed interval until stopped.
struct Heartbeat {
    interval: Duration,
    running: Mutex<Option<(CancellationToken, tokio::task::JoinHandle<()>)>>,
}

impl Heartbeat {
    fn new(interval: Duration) -> Self {
        Self {
            interval,
            running: Mutex::new(None),
        }
    }
}

#[async_trait]
impl Processor for Heartbeat {
    fn name(&self) -> &str {
        "heartbeat"
    }

    async fn start(&self, _ctx: CancellationToken) -> Result<(), BoxError> {
        let stop = CancellationToken::new();
        let interval = self.interval;
        let loop_stop = stop.clone();
        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                tokio::select! {
                    _ = ticker.tick() => tracing::debug!("heartbeat"),
                    _ = loop_stop.cancelled() => break,
                }
            }
        });

        let mut running = self.running.lock().map_err(|e| e.to_string())?;
        *running = Some((stop, task));
        Ok(())
    }

    async fn stop(&self, done: StopHandle) -> Result<(), BoxError> {
        let running = self.running.lock().map_err(|e| e.to_string())?.take();
        if let Some((stop, task)) = running {
            stop.cancel();
            tokio::spawn(async move {
                let _ = task.await;
                done.done();
            });
        }
        Ok(())
    }
}
