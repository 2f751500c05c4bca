use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;

mod handlers;
mod middleware;
mod routes;
mod state;
mod templates;

use common::actions::JobService;
use common::auth::{CredentialVerifier, StaticCredentialVerifier};
use common::command::CommandBuilder;
use common::config::Settings;
use common::scheduler::CronicleClient;
use common::telemetry;
use state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration
    let config = Settings::load()?;
    config
        .validate()
        .map_err(|e| anyhow::anyhow!("Invalid configuration: {}", e))?;

    telemetry::init_logging(
        &config.observability.log_level,
        config.observability.json_logs,
    )?;

    tracing::info!(
        host = %config.server.host,
        port = %config.server.port,
        scheduler = %config.scheduler.url,
        target = %config.scheduler.target_host,
        container = %config.runtime.container,
        "Configuration loaded"
    );

    if !config.has_api_key() {
        tracing::warn!("No scheduler API key configured; create and run actions will fail");
    }

    let metrics_handle = telemetry::init_metrics()?;

    // Folders as seen inside the portal container
    if !config.scripts.scripts_dir.is_dir() {
        tracing::error!(
            scripts_dir = %config.scripts.scripts_dir.display(),
            "Scripts base folder not found"
        );
    }
    if let Err(e) = std::fs::create_dir_all(&config.scripts.outputs_dir) {
        tracing::warn!(
            outputs_dir = %config.scripts.outputs_dir.display(),
            error = %e,
            "Failed to create outputs folder"
        );
    }

    let client = CronicleClient::new(&config.scheduler)?;
    let jobs = JobService::new(Arc::new(client), CommandBuilder::new(&config.runtime));

    let verifier = StaticCredentialVerifier::from_config(&config.auth);
    if verifier.is_empty() {
        tracing::warn!("No users configured; nobody can sign in");
    }
    let verifier: Arc<dyn CredentialVerifier> = Arc::new(verifier);

    let addr = SocketAddr::from((
        config.server.host.parse::<std::net::IpAddr>()?,
        config.server.port,
    ));

    // Create application state
    let state = AppState::new(config, jobs, verifier, Some(metrics_handle));
    let app = routes::create_router(state);

    tracing::info!(addr = %addr, "Starting HTTP server");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("PythonHub portal stopped");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C signal");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM signal");
        },
    }

    tracing::info!("Initiating graceful shutdown");
}
