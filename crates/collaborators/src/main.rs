//! Runs every simulated collaborator on consecutive ports.

use collaborators::{SimulatorConfig, routers, seed};
use telemetry::{ObservabilityConfig, init_observability};
use tokio::signal;
use tokio::sync::watch;

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
            tracing::info!("received SIGINT, stopping collaborators");
        }
        () = terminate => {
            tracing::info!("received SIGTERM, stopping collaborators");
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let observability = ObservabilityConfig::from_env()?;
    let handle = init_observability("collaborators", &observability)?;

    let config = SimulatorConfig::from_env()?;
    let services = seed(&config)?;

    let (stop_tx, stop_rx) = watch::channel(false);
    let mut servers = Vec::new();
    for (index, (name, router)) in (0u16..).zip(routers(&services)) {
        let addr = config.addr(index);
        let listener = tokio::net::TcpListener::bind(&addr).await?;
        tracing::info!(service = name, %addr, "collaborator listening");

        let mut stop = stop_rx.clone();
        servers.push(tokio::spawn(async move {
            let result = axum::serve(listener, router)
                .with_graceful_shutdown(async move {
                    let _ = stop.wait_for(|stopped| *stopped).await;
                })
                .await;
            if let Err(error) = result {
                tracing::error!(service = name, %error, "collaborator failed");
            }
        }));
    }

    shutdown_signal().await;
    let _ = stop_tx.send(true);
    for server in servers {
        if let Err(error) = server.await {
            tracing::error!(%error, "collaborator task panicked");
        }
    }

    tracing::info!("collaborators shut down gracefully");
    handle.shutdown();
    Ok(())
}
