//! Jukebox entry point.
//!
//! # Startup sequence
//!
//! 1. Initialise logging.
//! 2. Load [`AppConfig`] (`--config` or the platform default) and overlay
//!    API keys from the environment.
//! 3. Build the generation gateway and the local media sink.
//! 4. Spawn the [`SongQueue`] poll loop.
//! 5. Serve the web front end until Ctrl-C.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tokio::net::TcpListener;

use rowdy_radio::config::AppConfig;
use rowdy_radio::gateway::SunoGateway;
use rowdy_radio::playback::LocalMediaSink;
use rowdy_radio::queue::SongQueue;
use rowdy_radio::server::{self, AppState};
use rowdy_radio::shutdown;

#[derive(Parser, Debug)]
#[command(name = "rowdy-radio", about = "Web jukebox for generated songs")]
struct Args {
    /// Path to settings.toml (defaults to the platform config directory)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Address to listen on, overrides `server.bind_addr`
    #[arg(short, long)]
    bind: Option<String>,
}

fn load_config(path: Option<&PathBuf>) -> anyhow::Result<AppConfig> {
    let mut config = match path {
        Some(path) => AppConfig::load_from(path)
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None => AppConfig::load().unwrap_or_else(|e| {
            log::warn!("Failed to load config ({e}); using defaults");
            AppConfig::default()
        }),
    };
    config.apply_env();
    Ok(config)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    log::info!("Rowdy Radio starting up");

    // 2. Configuration
    let args = Args::parse();
    let config = load_config(args.config.as_ref())?;
    if config.gateway.api_key.is_none() {
        log::warn!("No generation API key configured; submissions will be refused upstream");
    }

    // 3. Queue dependencies
    let gateway = Arc::new(SunoGateway::from_config(&config.gateway));
    let sink = Arc::new(LocalMediaSink::from_config(&config.playback));
    let queue = Arc::new(SongQueue::new(gateway, sink, &config.queue));

    // 4. Poll loop
    let (shutdown_tx, shutdown_rx) = shutdown::channel();
    let poller = tokio::spawn(Arc::clone(&queue).run(shutdown_rx.clone()));

    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            log::error!("Failed to listen for Ctrl-C: {e}");
            return;
        }
        log::info!("Shutdown requested");
        let _ = shutdown_tx.send(true);
    });

    // 5. Web front end
    let bind_addr = args.bind.unwrap_or(config.server.bind_addr);
    let listener = TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {bind_addr}"))?;
    server::serve(listener, AppState::new(queue), shutdown_rx).await?;

    if let Err(e) = poller.await {
        log::error!("Queue poller ended abnormally: {e}");
    }
    log::info!("Rowdy Radio stopped");
    Ok(())
}
