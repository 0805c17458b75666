// src/main.rs
extern crate anyhow;
extern crate navbartemp_rs;

use anyhow::Result;
use navbartemp_rs::core::config::Config;
use navbartemp_rs::core::controller::Controller;
use navbartemp_rs::core::notifier::StdoutSink;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr; stdout carries the plugin messages
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| "navbartemp_rs=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = Config::load()?;
    let controller = Controller::from_config(&config, Arc::new(StdoutSink));
    controller.on_startup().await;

    let status = controller.status().await;
    info!(
        supported = status.supported,
        running = status.running,
        source = ?status.source,
        "Startup complete"
    );

    wait_for_shutdown(&controller).await?;
    controller.shutdown().await;
    Ok(())
}

// SIGHUP re-reads the configuration and hands it over as a settings change
#[cfg(unix)]
async fn wait_for_shutdown(controller: &Controller) -> Result<()> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut hangup = signal(SignalKind::hangup())?;
    let mut terminate = signal(SignalKind::terminate())?;
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            _ = terminate.recv() => break,
            _ = hangup.recv() => {
                info!("SIGHUP received; reloading configuration");
                match Config::load() {
                    Ok(cfg) => {
                        if let Err(e) = controller.on_settings_changed(cfg.sampling).await {
                            error!(error = %e, "Rejected reloaded settings");
                        }
                    }
                    Err(e) => error!(error = ?e, "Reloading configuration failed"),
                }
            }
        }
    }
    info!("Shutting down");
    Ok(())
}

#[cfg(not(unix))]
async fn wait_for_shutdown(_controller: &Controller) -> Result<()> {
    tokio::signal::ctrl_c().await?;
    info!("Shutting down");
    Ok(())
}
