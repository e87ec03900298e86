//! The slideshow controller.
//!
//! Runs one cycle per cadence tick: Idle (pick the prompt, consume its
//! rotation slot) -> Fetching -> Saving -> Transitioning -> Cleaning, then
//! a fixed delay. A failure in any step skips the rest of the cycle and the
//! previous image stays on screen; the cadence loop itself is the retry
//! mechanism for the next prompt.
//!
//! Everything is sequential on one task: fetch, decode, ramp and delete
//! never overlap, and a file is never deleted before its successor has been
//! fully presented.

use crate::compositor::{LayerCompositor, LayerId};
use crate::display::{Backlight, DisplayError, Screen};
use crate::image_proc::DecodeError;
use crate::prompts::PromptCycle;
use crate::source::{FetchError, ImageFetcher};
use crate::storage::{GalleryStore, StorageError};
use crate::transition::TransitionEngine;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::broadcast;

/// Why a cycle was skipped
#[derive(Error, Debug)]
pub enum CycleError {
    #[error("Fetch failed: {0}")]
    Fetch(#[from] FetchError),

    #[error("Storage write failed: {0}")]
    Storage(#[from] StorageError),

    #[error("Image decode failed: {0}")]
    Decode(#[from] DecodeError),

    #[error("Display failed: {0}")]
    Display(#[from] DisplayError),
}

/// The image currently fully visible at rest
struct Settled {
    layer: LayerId,
    path: PathBuf,
}

/// Top-level slideshow state machine
pub struct Slideshow<S: Screen, B: Backlight, F: ImageFetcher> {
    compositor: LayerCompositor<S>,
    backlight: B,
    engine: TransitionEngine,
    fetcher: F,
    store: GalleryStore,
    prompts: PromptCycle,
    cycle_delay: Duration,
    settled: Option<Settled>,
    first_cycle: bool,
}

impl<S: Screen, B: Backlight, F: ImageFetcher> Slideshow<S, B, F> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        compositor: LayerCompositor<S>,
        backlight: B,
        engine: TransitionEngine,
        fetcher: F,
        store: GalleryStore,
        prompts: PromptCycle,
        cycle_delay: Duration,
    ) -> Self {
        Self {
            compositor,
            backlight,
            engine,
            fetcher,
            store,
            prompts,
            cycle_delay,
            settled: None,
            first_cycle: true,
        }
    }

    /// Run the endless loop until a shutdown signal arrives.
    ///
    /// Each iteration runs one cycle and then sleeps the inter-cycle delay
    /// (on top of whatever time the transition itself took).
    pub async fn run(&mut self, mut shutdown: broadcast::Receiver<()>) {
        tracing::info!(
            "Slideshow started: {} prompts, {:?} cadence",
            self.prompts.len(),
            self.cycle_delay
        );

        loop {
            match self.run_cycle().await {
                Ok(()) => tracing::debug!("Cycle complete"),
                Err(e) => tracing::warn!("Cycle skipped: {}", e),
            }

            tokio::select! {
                _ = tokio::time::sleep(self.cycle_delay) => {}
                _ = shutdown.recv() => {
                    tracing::info!("Slideshow shutting down");
                    break;
                }
            }
        }

        self.blank_on_exit().await;
    }

    /// One full pass of the state machine
    pub async fn run_cycle(&mut self) -> Result<(), CycleError> {
        // Idle: select the prompt and consume its rotation slot. The cursor
        // has moved even if everything after this fails.
        let request = self.prompts.next_request();

        if self.first_cycle {
            self.first_cycle = false;
            self.compositor.status_screen("Fetching image...")?;
            self.backlight.set_brightness(1.0)?;
        }

        // Fetching
        let bytes = self.fetcher.fetch(&request).await?;

        // Saving
        let path = self.store.save(&request.file_name(), &bytes)?;

        // Transitioning
        let incoming = self
            .settled
            .as_ref()
            .map(|s| s.layer.other())
            .unwrap_or(LayerId::A);
        if let Err(e) = self.transition_in(incoming, &path).await {
            // The saved file never became visible; drop it to keep the
            // gallery at its two-file budget.
            self.store.delete_one(&path);
            return Err(e);
        }

        // Cleaning: the incoming image is now the settled one and has been
        // fully presented, so its predecessor's file can go.
        let previous = self.settled.replace(Settled {
            layer: incoming,
            path,
        });
        if let Some(previous) = previous {
            self.store.delete_one(&previous.path);
        }

        Ok(())
    }

    /// Load the incoming layer and make it the visible image
    async fn transition_in(&mut self, incoming: LayerId, path: &Path) -> Result<(), CycleError> {
        self.compositor.load(incoming, path)?;

        match &self.settled {
            None => {
                // Bootstrap: nothing on screen yet, show directly with the
                // backlight already at full; the first fade would have
                // nothing to fade from.
                self.compositor.set_visible(incoming, true);
                self.compositor.present()?;
                self.backlight.set_brightness(1.0)?;
            }
            Some(settled) => {
                self.engine
                    .cross_fade(
                        &mut self.compositor,
                        &mut self.backlight,
                        settled.layer,
                        incoming,
                    )
                    .await?;
            }
        }

        Ok(())
    }

    /// Fade out and go dark on shutdown
    async fn blank_on_exit(&mut self) {
        if let Some(settled) = self.settled.take() {
            if let Err(e) = self
                .engine
                .fade_out(&mut self.compositor, &mut self.backlight, settled.layer)
                .await
            {
                tracing::warn!("Could not fade out on shutdown: {}", e);
            }
            self.store.delete_one(&settled.path);
        }

        if let Err(e) = self.backlight.set_brightness(0.0) {
            tracing::warn!("Could not switch off backlight: {}", e);
        }
    }

    #[cfg(test)]
    fn settled_path(&self) -> Option<&Path> {
        self.settled.as_ref().map(|s| s.path.as_path())
    }

    #[cfg(test)]
    fn compositor(&self) -> &LayerCompositor<S> {
        &self.compositor
    }

    #[cfg(test)]
    fn backlight(&self) -> &B {
        &self.backlight
    }
}
