// Main entry point for the icon server

use anyhow::{Context, Result};
use icon_core::{
    kernel::{jobs::JobManager, jobs::ManagerConfig, ServerDeps},
    server::{build_app, AppState},
    Config,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,icon_core=debug,itunes_client=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting icon server");

    // Load configuration
    let config = Config::from_env().context("Failed to load configuration")?;
    tracing::info!(
        work_dir = %config.work_dir.display(),
        lookup_url = %config.lookup_url,
        app_list_command = %config.app_list_command,
        "Configuration loaded"
    );

    tokio::fs::create_dir_all(&config.work_dir)
        .await
        .with_context(|| format!("Failed to create work dir {}", config.work_dir.display()))?;

    let http_client = reqwest::Client::builder()
        .user_agent(concat!("icon-server/", env!("CARGO_PKG_VERSION")))
        .build()
        .context("Failed to build HTTP client")?;

    let deps = ServerDeps::from_config(&config, http_client);
    let jobs = JobManager::new(
        deps,
        ManagerConfig::builder()
            .work_dir(config.work_dir.clone())
            .palette(config.palette)
            .target_size(config.target_size)
            .item_concurrency(config.item_concurrency)
            .build(),
    );

    let port = config.port;
    let app = build_app(AppState::new(jobs.clone(), config));

    // Start server
    let addr = format!("0.0.0.0:{}", port);
    tracing::info!("Starting server on {}", addr);
    tracing::info!("Health check: http://localhost:{}/health", port);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .context("Failed to bind to address")?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    jobs.shutdown().await;
    tracing::info!("Server stopped");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
