//! Ambient radio entry point.
//!
//! Records the room, turns what it heard into a song prompt and sends it to
//! the jukebox, in a loop until Ctrl-C.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;

use rowdy_radio::audio::{list_input_devices, RetryingSource};
use rowdy_radio::config::AppConfig;
use rowdy_radio::llm::ApiSummarizer;
use rowdy_radio::pipeline::{new_shared_state, CycleSettings, JukeboxClient, RadioOrchestrator};
use rowdy_radio::{shutdown, stt};

#[derive(Parser, Debug)]
#[command(name = "paranoid-radio", about = "Turns room conversation into songs")]
struct Args {
    /// Path to settings.toml (defaults to the platform config directory)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// List input devices and exit
    #[arg(long)]
    list_devices: bool,

    /// Run a single cycle and exit
    #[arg(long)]
    once: bool,
}

fn print_devices() -> anyhow::Result<()> {
    let devices = list_input_devices().context("failed to enumerate input devices")?;
    if devices.is_empty() {
        println!("No input devices found");
    }
    for device in devices {
        println!(
            "{:>2}: {}{} ({} ch, {} Hz)",
            device.index,
            device.name,
            if device.is_default { " [default]" } else { "" },
            device.channels,
            device.sample_rate,
        );
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    if args.list_devices {
        return print_devices();
    }

    let mut config = match &args.config {
        Some(path) => AppConfig::load_from(path)
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None => AppConfig::load().unwrap_or_else(|e| {
            log::warn!("Failed to load config ({e}); using defaults");
            AppConfig::default()
        }),
    };
    config.apply_env();
    if config.stt.api_key.is_none() {
        log::warn!("No OpenAI API key configured; transcription will fail");
    }

    let orchestrator = RadioOrchestrator::new(
        new_shared_state(),
        Arc::new(RetryingSource::from_config(&config.audio)),
        Arc::new(stt::from_config(&config.stt, &config.audio)),
        Arc::new(ApiSummarizer::from_config(&config.llm)),
        Arc::new(JukeboxClient::from_config(&config.radio)),
        CycleSettings::from_config(&config),
    );
    log::info!("Paranoid Radio tuned to {}", config.radio.jukebox_url);

    if args.once {
        let song_id = orchestrator.run_cycle().await?;
        println!("Queued song {song_id}");
        return Ok(());
    }

    let (shutdown_tx, shutdown_rx) = shutdown::channel();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            log::error!("Failed to listen for Ctrl-C: {e}");
            return;
        }
        log::info!("Shutdown requested");
        let _ = shutdown_tx.send(true);
    });

    orchestrator.run(shutdown_rx).await;
    log::info!("Paranoid Radio stopped");
    Ok(())
}
