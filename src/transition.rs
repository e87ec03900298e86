//! Timed backlight ramps between layers.
//!
//! All three ramps drive the single shared backlight through a fixed number
//! of discrete levels spaced evenly across the configured duration. The
//! backlight handle is borrowed exclusively for the whole ramp; a running
//! transition is not preemptible (the controller runs one per cycle and
//! awaits completion).
//!
//! Cross-fades use a single-pass brightness dip: both images stay fully
//! composited, the backlight ramps down to a floor, visibility swaps at the
//! floor, and the backlight ramps back up. The panel is never fully dark
//! mid-transition and never double-bright.

use crate::compositor::{LayerCompositor, LayerId};
use crate::display::{Backlight, DisplayError, Screen};
use std::time::Duration;
use tokio::time::sleep;

/// Defaults matching the slideshow's visual tuning
pub const DEFAULT_DURATION: Duration = Duration::from_millis(1500);
pub const DEFAULT_STEPS: u32 = 10;
pub const DEFAULT_FLOOR: f32 = 0.15;

/// Drives timed brightness ramps over the compositor's layers
pub struct TransitionEngine {
    /// Number of ramp increments; a ramp visits `steps + 1` levels
    steps: u32,
    /// Total wall time of one full ramp
    duration: Duration,
    /// Lowest brightness during a cross-fade, always above black
    floor: f32,
}

impl Default for TransitionEngine {
    fn default() -> Self {
        Self::new(DEFAULT_DURATION, DEFAULT_STEPS, DEFAULT_FLOOR)
    }
}

impl TransitionEngine {
    /// Create an engine. `steps` below 2 are raised to 2; the config layer
    /// validates user-supplied values before they get here.
    pub fn new(duration: Duration, steps: u32, floor: f32) -> Self {
        Self {
            steps: steps.max(2),
            duration,
            floor: floor.clamp(0.01, 0.95),
        }
    }

    fn step_delay(&self) -> Duration {
        self.duration / (self.steps + 1)
    }

    /// Ramp the backlight 0.0 -> 1.0 over the loaded `layer`.
    ///
    /// Makes the layer visible and presents it before the ramp starts. Ends
    /// pinned at exactly 1.0 regardless of floating-point drift.
    #[allow(dead_code)]
    pub async fn fade_in<S: Screen, B: Backlight>(
        &self,
        compositor: &mut LayerCompositor<S>,
        backlight: &mut B,
        layer: LayerId,
    ) -> Result<(), DisplayError> {
        debug_assert!(compositor.is_loaded(layer), "fade_in target must be loaded");

        compositor.set_visible(layer, true);
        compositor.present()?;

        let delay = self.step_delay();
        for i in 0..=self.steps {
            backlight.set_brightness(i as f32 / self.steps as f32)?;
            sleep(delay).await;
        }
        backlight.set_brightness(1.0)?;
        Ok(())
    }

    /// Ramp the backlight 1.0 -> 0.0, then blank and hide `layer`.
    ///
    /// The brightness control is restored to 1.0 afterwards; the blanked
    /// content keeps the panel dark. Shutdown turns the backlight off
    /// separately.
    pub async fn fade_out<S: Screen, B: Backlight>(
        &self,
        compositor: &mut LayerCompositor<S>,
        backlight: &mut B,
        layer: LayerId,
    ) -> Result<(), DisplayError> {
        let delay = self.step_delay();
        for i in (0..=self.steps).rev() {
            backlight.set_brightness(i as f32 / self.steps as f32)?;
            sleep(delay).await;
        }

        compositor.clear_layer(layer);
        compositor.set_visible(layer, false);
        compositor.present()?;

        backlight.set_brightness(1.0)?;
        Ok(())
    }

    /// Cross-fade from the settled `from` layer to the loaded `to` layer.
    ///
    /// Ends with `to` fully visible at full brightness and `from` hidden
    /// with its buffer blanked for reuse.
    pub async fn cross_fade<S: Screen, B: Backlight>(
        &self,
        compositor: &mut LayerCompositor<S>,
        backlight: &mut B,
        from: LayerId,
        to: LayerId,
    ) -> Result<(), DisplayError> {
        debug_assert!(compositor.is_loaded(to), "incoming layer must be loaded");

        let delay = self.step_delay();
        let half = (self.steps / 2).max(1);

        // Down to the floor
        for i in 0..=half {
            let level = 1.0 - (1.0 - self.floor) * (i as f32 / half as f32);
            backlight.set_brightness(level)?;
            sleep(delay).await;
        }

        // Swap at the floor: reveal the incoming image
        compositor.set_visible(to, true);
        compositor.set_visible(from, false);
        compositor.present()?;

        // Back up to full
        for i in 1..=half {
            let level = self.floor + (1.0 - self.floor) * (i as f32 / half as f32);
            backlight.set_brightness(level)?;
            sleep(delay).await;
        }
        backlight.set_brightness(1.0)?;

        compositor.clear_layer(from);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::display::mock::{self, TraceEvent};

    fn zero_time_engine() -> TransitionEngine {
        TransitionEngine::new(Duration::ZERO, DEFAULT_STEPS, DEFAULT_FLOOR)
    }

    fn loaded_layer(
        comp: &mut LayerCompositor<mock::MockScreen>,
        dir: &tempfile::TempDir,
        id: LayerId,
        rgb: [u8; 3],
    ) {
        let path = dir.path().join(format!("{:?}.png", id));
        image::RgbImage::from_pixel(8, 8, image::Rgb(rgb)).save(&path).unwrap();
        comp.load(id, &path).unwrap();
    }

    #[tokio::test]
    async fn fade_in_ends_pinned_at_full() {
        let dir = tempfile::tempdir().unwrap();
        let (screen, mut bl, _trace) = mock::pair(64, 64);
        let mut comp = LayerCompositor::new(screen);
        loaded_layer(&mut comp, &dir, LayerId::A, [255, 0, 0]);

        zero_time_engine()
            .fade_in(&mut comp, &mut bl, LayerId::A)
            .await
            .unwrap();

        assert_eq!(bl.level, 1.0);
        assert_eq!(bl.history.first(), Some(&0.0));
        assert!(comp.is_visible(LayerId::A));
        assert_eq!(comp.visible_count(), 1);
        // Monotonic ramp
        assert!(bl.history.windows(2).all(|w| w[0] <= w[1]));
    }

    #[tokio::test]
    async fn fade_in_presents_before_ramping() {
        let dir = tempfile::tempdir().unwrap();
        let (screen, mut bl, trace) = mock::pair(64, 64);
        let mut comp = LayerCompositor::new(screen);
        loaded_layer(&mut comp, &dir, LayerId::A, [255, 0, 0]);

        zero_time_engine()
            .fade_in(&mut comp, &mut bl, LayerId::A)
            .await
            .unwrap();

        let events = trace.borrow();
        assert_eq!(events.first(), Some(&TraceEvent::Present));
    }

    #[tokio::test]
    async fn fade_out_blanks_and_hides() {
        let dir = tempfile::tempdir().unwrap();
        let (screen, mut bl, _trace) = mock::pair(64, 64);
        let mut comp = LayerCompositor::new(screen);
        loaded_layer(&mut comp, &dir, LayerId::A, [255, 0, 0]);
        comp.set_visible(LayerId::A, true);
        comp.present().unwrap();

        zero_time_engine()
            .fade_out(&mut comp, &mut bl, LayerId::A)
            .await
            .unwrap();

        assert!(!comp.is_visible(LayerId::A));
        assert!(!comp.is_loaded(LayerId::A));
        assert!(bl.history.contains(&0.0));
        assert_eq!(bl.level, 1.0, "control restored after blanking");
        let frame = comp.screen().last_frame.clone().unwrap();
        assert!(frame.iter().all(|&px| px == 0));
    }

    #[tokio::test]
    async fn cross_fade_end_state_invariant() {
        let dir = tempfile::tempdir().unwrap();
        let (screen, mut bl, _trace) = mock::pair(64, 64);
        let mut comp = LayerCompositor::new(screen);
        loaded_layer(&mut comp, &dir, LayerId::A, [255, 0, 0]);
        comp.set_visible(LayerId::A, true);
        comp.present().unwrap();
        loaded_layer(&mut comp, &dir, LayerId::B, [0, 255, 0]);

        zero_time_engine()
            .cross_fade(&mut comp, &mut bl, LayerId::A, LayerId::B)
            .await
            .unwrap();

        assert!(comp.is_visible(LayerId::B));
        assert!(!comp.is_visible(LayerId::A));
        assert_eq!(comp.visible_count(), 1);
        assert_eq!(bl.level, 1.0);
        assert!(!comp.is_loaded(LayerId::A), "outgoing buffer released");
    }

    #[tokio::test]
    async fn cross_fade_never_reaches_black() {
        let dir = tempfile::tempdir().unwrap();
        let (screen, mut bl, _trace) = mock::pair(64, 64);
        let mut comp = LayerCompositor::new(screen);
        loaded_layer(&mut comp, &dir, LayerId::A, [255, 0, 0]);
        comp.set_visible(LayerId::A, true);
        loaded_layer(&mut comp, &dir, LayerId::B, [0, 255, 0]);

        zero_time_engine()
            .cross_fade(&mut comp, &mut bl, LayerId::A, LayerId::B)
            .await
            .unwrap();

        let min = bl.history.iter().cloned().fold(f32::INFINITY, f32::min);
        assert!(min > 0.0);
        assert!((min - DEFAULT_FLOOR).abs() < 1e-3, "dip bottoms out at the floor");
    }

    #[tokio::test]
    async fn cross_fade_swaps_at_the_floor() {
        let dir = tempfile::tempdir().unwrap();
        let (screen, mut bl, trace) = mock::pair(64, 64);
        let mut comp = LayerCompositor::new(screen);
        loaded_layer(&mut comp, &dir, LayerId::A, [255, 0, 0]);
        comp.set_visible(LayerId::A, true);
        loaded_layer(&mut comp, &dir, LayerId::B, [0, 255, 0]);

        zero_time_engine()
            .cross_fade(&mut comp, &mut bl, LayerId::A, LayerId::B)
            .await
            .unwrap();

        let events = trace.borrow();
        let present_idx = events
            .iter()
            .position(|e| *e == TraceEvent::Present)
            .expect("swap presents once");
        match events[present_idx - 1] {
            TraceEvent::Brightness(level) => {
                assert!((level - DEFAULT_FLOOR).abs() < 1e-3, "swap happens at the floor")
            }
            _ => panic!("expected a brightness step right before the swap"),
        }
        // Ramp continues upward after the swap
        assert!(matches!(events[present_idx + 1], TraceEvent::Brightness(l) if l > DEFAULT_FLOOR));
    }

    #[tokio::test]
    async fn ramps_use_eleven_levels_by_default() {
        let dir = tempfile::tempdir().unwrap();
        let (screen, mut bl, _trace) = mock::pair(64, 64);
        let mut comp = LayerCompositor::new(screen);
        loaded_layer(&mut comp, &dir, LayerId::A, [255, 0, 0]);

        zero_time_engine()
            .fade_in(&mut comp, &mut bl, LayerId::A)
            .await
            .unwrap();

        // 11 ramp levels plus the final pin
        assert_eq!(bl.history.len(), 12);
    }
}
