use anyhow::Context;
use dotenv::dotenv;
use hadoop_ha_monitor::{
    config::ConfigManager,
    core::logging::init_logging,
    infrastructure::{DockerExecCommandExecutor, HttpClusterProbe},
    presentation::create_router,
    AppState,
};
use std::{sync::Arc, time::Duration};
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    let mut config_manager = ConfigManager::new();
    config_manager
        .load()
        .await
        .context("Failed to load configuration")?;
    let config = config_manager.get().await;

    init_logging(&config.observability.logging).context("Failed to initialize logging")?;

    info!("🚀 Starting Hadoop HA monitor...");

    let probe = Arc::new(
        HttpClusterProbe::new(config.cluster.clone(), &config.probe)
            .context("Failed to create cluster probe")?,
    );
    let executor = Arc::new(DockerExecCommandExecutor::new(config.commands.clone()));

    let state = AppState::new(config.clone(), probe, executor);
    state.monitor.start().await?;

    let app = create_router(state.clone());

    let address = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .with_context(|| format!("Failed to bind {}", address))?;

    info!(address = %address, "🌐 Server listening");
    info!("📊 Health check: http://{}/health", address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("🛑 Shutting down Hadoop HA monitor...");
    let grace = Duration::from_secs(config.server.graceful_shutdown_timeout_seconds);
    match tokio::time::timeout(grace, state.monitor.stop()).await {
        Ok(Ok(())) => info!("✅ Cluster monitoring stopped"),
        Ok(Err(e)) => error!(error = %e, "Cluster monitoring stopped with an error"),
        Err(_) => warn!("Timed out waiting for cluster monitoring to stop"),
    }

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
