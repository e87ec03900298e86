//! Endless AI image slideshow for a square SPI display
//!
//! An unattended boot-to-loop process that:
//! - Waits for the network link and the gallery storage
//! - Fetches a freshly generated image for a rotating prompt list
//! - Cross-fades each new image in and deletes the superseded file

mod compositor;
mod config;
mod display;
mod image_proc;
mod net;
mod prompts;
mod slideshow;
mod source;
mod storage;
mod transition;

use clap::Parser;
use compositor::LayerCompositor;
use config::Config;
use display::{Backlight, PwmBacklight, St7789};
use prompts::PromptCycle;
use slideshow::Slideshow;
use source::ImageSource;
use storage::GalleryStore;
use tokio::sync::broadcast;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use transition::TransitionEngine;

/// Command line arguments
#[derive(Parser, Debug)]
#[command(name = "endless-frame")]
#[command(about = "Endless AI image slideshow for a square SPI display")]
#[command(version)]
struct Args {
    /// Configuration file path
    #[arg(short, long, default_value = config::DEFAULT_CONFIG_PATH)]
    config: String,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Blank the panel, wipe the gallery, and exit
    #[arg(long)]
    clear: bool,
}

/// Using current_thread runtime for single-core boards; the slideshow is one
/// strictly sequential loop anyway
#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    init_logging(args.verbose);

    tracing::info!("Starting endless-frame");

    let config = Config::load(&args.config).unwrap_or_else(|e| {
        tracing::warn!("Failed to load config from {}: {}", args.config, e);
        tracing::info!("Using default configuration");
        Config::default()
    });

    // Bring up the panel and backlight so startup progress is visible
    let mut panel = St7789::new()?;
    panel.init()?;
    let mut backlight = PwmBacklight::new()?;
    backlight.set_brightness(1.0)?;

    if args.clear {
        tracing::info!("Clearing panel and gallery...");
        panel.blank()?;
        backlight.off()?;
        panel.sleep()?;
        if let Ok(store) = GalleryStore::open(&config.gallery_dir) {
            store.clear_all();
        }
        tracing::info!("Clear complete");
        return Ok(());
    }

    let mut compositor = LayerCompositor::new(panel);

    // Block until the generation endpoint is reachable
    net::wait_until_online(&config.endpoint_url, &mut compositor).await?;

    // No slideshow without storage: a mount failure is fatal
    compositor.status_screen("Mounting gallery storage...")?;
    let store = match GalleryStore::open(&config.gallery_dir) {
        Ok(store) => store,
        Err(e) => {
            tracing::error!("Gallery storage unavailable: {}", e);
            let _ = compositor.status_screen("Storage unavailable");
            return Err(e.into());
        }
    };

    // Discard images from a previous run; there is no bookkeeping across
    // restarts
    compositor.status_screen("Clearing gallery...")?;
    store.clear_all();

    let mut show = Slideshow::new(
        compositor,
        backlight,
        TransitionEngine::new(config.fade_duration(), config.fade_steps, config.fade_floor),
        ImageSource::new(config.endpoint_url.clone(), config.retry_policy()),
        store,
        PromptCycle::new(config.prompts.clone()),
        config.cycle_delay(),
    );

    // Forward SIGTERM/SIGINT into the slideshow loop
    let (shutdown_tx, shutdown_rx) = broadcast::channel::<()>(1);
    tokio::spawn(async move {
        wait_for_shutdown().await;
        let _ = shutdown_tx.send(());
    });

    show.run(shutdown_rx).await;

    tracing::info!("Shutdown complete");
    Ok(())
}

/// Initialize tracing/logging
///
/// Default level is "warn" to minimize flash wear from log writes.
/// Use --verbose flag for "debug" level during development/troubleshooting.
fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "warn" };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("endless_frame={}", level).into());

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();
}

/// Wait for shutdown signals (SIGTERM, SIGINT)
async fn wait_for_shutdown() {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigterm = signal(SignalKind::terminate()).expect("Failed to setup SIGTERM handler");
    let mut sigint = signal(SignalKind::interrupt()).expect("Failed to setup SIGINT handler");

    tokio::select! {
        _ = sigterm.recv() => {
            tracing::info!("Received SIGTERM");
        }
        _ = sigint.recv() => {
            tracing::info!("Received SIGINT");
        }
    }
}
