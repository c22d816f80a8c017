use podium::analysis::SimulatedAnalyzer;
use podium::config::Config;
use podium::db::MemStorage;
use podium::lifecycle::EvaluationDriver;
use podium::{routes, state};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "podium=info,tower_http=info".into()),
        )
        .init();

    let config = Config::from_env()?;
    let config = Arc::new(config);

    podium::storage::ensure_dirs(&config.upload_folder)?;

    let pool = MemStorage::shared();
    let analyzer = Arc::new(SimulatedAnalyzer::new(config.analyzer_seed));
    let cancel = CancellationToken::new();
    let (driver, dispatcher) =
        EvaluationDriver::start(pool.clone(), analyzer, config.analysis_delay, cancel.clone());

    let state = Arc::new(state::AppState {
        pool,
        config: config.clone(),
        driver,
    });

    let app = routes::build_router(state);

    let addr = format!("{}:{}", config.host, config.port);
    tracing::info!(
        upload_folder = %config.upload_folder.display(),
        analysis_delay_secs = config.analysis_delay.as_secs(),
        "Podium listening on http://{}",
        addr
    );

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    cancel.cancel();
    let _ = tokio::time::timeout(Duration::from_secs(5), dispatcher).await;
    tracing::info!("Shutdown complete");

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl-C handler");
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
        () = ctrl_c => tracing::info!("Received SIGINT, shutting down"),
        () = terminate => tracing::info!("Received SIGTERM, shutting down"),
    }
}
