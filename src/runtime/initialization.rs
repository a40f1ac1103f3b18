//! # Initialization
//!
//! Controller initialization logic including rustls setup, tracing, metrics,
//! server startup, shutdown signal handling, and Kubernetes client setup.

use crate::config::{ControllerConfig, ServerConfig};
use crate::observability;
use crate::server::{start_server, ServerState};
use anyhow::{anyhow, Context, Result};
use kube::Client;
use std::sync::Arc;
use tokio::time::Instant;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

/// Everything the controller loop needs once startup is done
pub struct InitializationResult {
    /// Kubernetes client
    pub client: Client,
    /// Controller configuration
    pub config: ControllerConfig,
    /// Server state for health checks
    pub server_state: Arc<ServerState>,
    /// HTTP server task
    pub server_handle: JoinHandle<()>,
    /// Flips to `true` on SIGTERM or Ctrl-C
    pub shutdown: watch::Receiver<bool>,
}

impl std::fmt::Debug for InitializationResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InitializationResult")
            .field("config", &self.config)
            .field("server_ready", &self.server_state.is_ready())
            .finish_non_exhaustive()
    }
}

/// Initialize the controller runtime
///
/// This function handles:
/// - rustls crypto provider setup
/// - Tracing subscriber setup
/// - Metrics registration
/// - HTTP server startup
/// - Shutdown signal handling
/// - Kubernetes client creation
pub async fn initialize() -> Result<InitializationResult> {
    // Must happen before anything opens a TLS connection
    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|_provider| anyhow!("failed to install rustls crypto provider"))?;

    let config = ControllerConfig::from_env();
    let server_config = ServerConfig::from_env();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.env_filter_directive().into()),
        )
        .with_ansi(config.log_enable_color)
        .init();

    info!("Starting Service Catalog Templates Controller");
    info!(
        "Build info: timestamp={}, datetime={}, git_hash={}",
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_DATETIME"),
        env!("BUILD_GIT_HASH")
    );
    info!(?config, ?server_config, "configuration loaded");

    if config.enable_metrics {
        observability::metrics::register_metrics()?;
    } else {
        info!("metrics disabled, /metrics will be empty");
    }

    let server_state = Arc::new(ServerState::default());
    let (shutdown_tx, shutdown) = watch::channel(false);

    // Start server in background task, then wait for it to bind before proceeding
    let server_handle = {
        let state = Arc::clone(&server_state);
        let shutdown = shutdown.clone();
        let port = server_config.metrics_port;
        tokio::spawn(async move {
            if let Err(e) = start_server(port, state, shutdown).await {
                error!(error = %e, "HTTP server error");
            }
        })
    };
    wait_for_server_ready(&server_state, &server_handle, &server_config).await?;

    spawn_shutdown_listener(Arc::clone(&server_state), shutdown_tx);

    let client = Client::try_default()
        .await
        .context("failed to create Kubernetes client")?;

    info!("Controller initialized, starting caches...");

    Ok(InitializationResult {
        client,
        config,
        server_state,
        server_handle,
        shutdown,
    })
}

/// Wait for the HTTP server to bind its listener
async fn wait_for_server_ready(
    server_state: &Arc<ServerState>,
    server_handle: &JoinHandle<()>,
    server_config: &ServerConfig,
) -> Result<()> {
    let startup_timeout = server_config.startup_timeout();
    let poll_interval = server_config.poll_interval();
    let start_time = Instant::now();

    loop {
        if server_handle.is_finished() {
            return Err(anyhow!("HTTP server failed to start"));
        }

        if server_state.is_serving() {
            info!("HTTP server is ready and accepting connections");
            return Ok(());
        }

        if start_time.elapsed() > startup_timeout {
            return Err(anyhow!(
                "HTTP server failed to become ready within {} seconds",
                startup_timeout.as_secs()
            ));
        }

        tokio::time::sleep(poll_interval).await;
    }
}

/// Mark the controller not ready and broadcast shutdown on SIGTERM or Ctrl-C
fn spawn_shutdown_listener(server_state: Arc<ServerState>, shutdown: watch::Sender<bool>) {
    tokio::spawn(async move {
        wait_for_signal().await;
        info!("shutdown signal received, stopping controllers");
        server_state.mark_not_ready();
        if shutdown.send(true).is_err() {
            warn!("nothing left listening for shutdown");
        }
    });
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    match signal(SignalKind::terminate()) {
        Ok(mut terminate) => {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {}
                _ = terminate.recv() => {}
            }
        }
        Err(e) => {
            warn!(error = %e, "failed to install SIGTERM handler, only Ctrl-C will stop the controller");
            let _ = tokio::signal::ctrl_c().await;
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    let _ = tokio::signal::ctrl_c().await;
}
