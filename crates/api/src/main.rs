//! API server entry point.

use std::sync::Arc;

use api::config::Config;
use api::{AppState, create_app};
use checkout::{CheckoutOrchestrator, Collaborators};
use telemetry::{ObservabilityConfig, describe_checkout_metrics, init_observability};
use tokio::signal;

/// Waits for a shutdown signal (SIGINT or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install SIGINT handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("received SIGINT, starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("received SIGTERM, starting graceful shutdown");
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Logging and the Prometheus recorder
    let observability = ObservabilityConfig::from_env()?;
    let telemetry = init_observability("checkout", &observability)?;
    describe_checkout_metrics();

    // 2. Collaborator clients sharing one connection pool
    let config = Config::from_env()?;
    let client = reqwest::Client::builder().build()?;
    let collaborators = Collaborators::http(client, &config.urls, &config.checkout.timeouts);
    tracing::info!(urls = ?config.urls, "collaborators configured");

    // 3. Orchestrator and router
    let orchestrator = Arc::new(CheckoutOrchestrator::new(
        collaborators,
        config.checkout.clone(),
    ));
    let app = create_app(AppState::new(Arc::clone(&orchestrator)), telemetry.metrics());

    // 4. Serve until signalled
    let addr = config.addr();
    tracing::info!(%addr, "starting checkout API");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // 5. Let detached follow-ups finish before flushing telemetry
    let pending = orchestrator.background().pending();
    if pending > 0 {
        tracing::info!(pending, "waiting for background tasks");
    }
    orchestrator.background().wait_idle().await;

    tracing::info!("server shut down gracefully");
    telemetry.shutdown();
    Ok(())
}
