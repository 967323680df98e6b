//! imgproxy
//!
//! Pull-through image cache server. Serves `GET /?url=<image url>` from a
//! sharded on-disk cache, fetching and validating the image from its origin
//! on first access.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use imgcache::{HttpOrigin, OriginConfig, Resolver, ShardedCache};
use imgproxy::{api, config::Config, metrics::RequestCounters, state::AppState};
use tokio::sync::watch;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Grace period for in-flight requests after a shutdown signal.
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(10);

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::parse();

    // Initialize tracing (prefer RUST_LOG, fallback to IMGPROXY_LOG_LEVEL)
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| config.log_level.clone().into()))
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    info!("Starting imgproxy");
    info!(
        address = %config.address,
        cache_dir = %config.cache_dir.display(),
        fetch_timeout_secs = config.fetch_timeout_secs,
        "Configuration loaded"
    );

    let origin = HttpOrigin::new(OriginConfig {
        timeout: config.fetch_timeout(),
        ..Default::default()
    })
    .context("building HTTP client")?;
    let resolver = Resolver::new(ShardedCache::new(&config.cache_dir), Arc::new(origin));

    let counters = Arc::new(RequestCounters::new());
    let state = AppState::new(resolver, counters.clone());
    let app = api::create_router(state);

    let listener = tokio::net::TcpListener::bind(config.address)
        .await
        .with_context(|| format!("binding {}", config.address))?;
    info!(addr = %config.address, "Listening for connections");

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let mut server_handle = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let mut shutdown_rx = shutdown_rx;
                loop {
                    if *shutdown_rx.borrow() {
                        break;
                    }
                    if shutdown_rx.changed().await.is_err() {
                        break;
                    }
                }
                info!("HTTP server shutting down");
            })
            .await
    });

    let server_result = tokio::select! {
        _ = shutdown_signal() => {
            info!("Received shutdown signal");
            let _ = shutdown_tx.send(true);
            tokio::time::timeout(SHUTDOWN_TIMEOUT, &mut server_handle).await.ok()
        }
        result = &mut server_handle => Some(result),
    };

    match server_result {
        Some(Ok(Ok(()))) => info!("Server exited normally"),
        Some(Ok(Err(e))) => error!(error = %e, "Server error"),
        Some(Err(e)) => error!(error = %e, "Server task panicked"),
        None => warn!("Server did not shut down in time"),
    }

    let totals = counters.snapshot();
    info!(
        requests_success = totals.success,
        requests_error = totals.error,
        "imgproxy shutdown complete"
    );
    Ok(())
}

/// Resolves on Ctrl-C, or SIGTERM on unix.
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {}
                    _ = term.recv() => {}
                }
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
