//! Layer compositor: the two display surfaces and their composition.
//!
//! The panel shows exactly one settled image at rest; during a transition
//! both layers exist and the engine flips visibility. Layers are opaque
//! full-frame RGB565 buffers composited in index order.
//!
//! Startup status messages are drawn onto a layer with embedded-graphics.

use crate::display::{DisplayError, Screen};
use crate::image_proc::{self, DecodeError, Placement};
use embedded_graphics::{
    mono_font::{ascii::FONT_9X15, MonoTextStyle},
    pixelcolor::Rgb565,
    prelude::*,
    text::{Baseline, Text},
};
use std::convert::Infallible;
use std::path::Path;

/// Background for status screens, a dark blue
const STATUS_BG: Rgb565 = Rgb565::new(1, 7, 10);

/// One of the two display surfaces
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayerId {
    A,
    B,
}

impl LayerId {
    /// The opposite surface; the two form a fixed ring of size two.
    pub fn other(self) -> Self {
        match self {
            LayerId::A => LayerId::B,
            LayerId::B => LayerId::A,
        }
    }

    fn index(self) -> usize {
        match self {
            LayerId::A => 0,
            LayerId::B => 1,
        }
    }
}

/// A full-frame pixel surface with a visibility flag
struct Layer {
    width: u32,
    height: u32,
    pixels: Vec<u16>,
    visible: bool,
    loaded: bool,
}

impl Layer {
    fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![0; (width * height) as usize],
            visible: false,
            loaded: false,
        }
    }

    fn clear(&mut self) {
        self.pixels.fill(0);
        self.loaded = false;
    }

    fn fill(&mut self, color: Rgb565) {
        self.pixels.fill(color.into_storage());
    }
}

impl OriginDimensions for Layer {
    fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }
}

impl DrawTarget for Layer {
    type Color = Rgb565;
    type Error = Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        for Pixel(point, color) in pixels {
            if point.x >= 0
                && point.y >= 0
                && (point.x as u32) < self.width
                && (point.y as u32) < self.height
            {
                let idx = point.y as usize * self.width as usize + point.x as usize;
                self.pixels[idx] = color.into_storage();
            }
        }
        Ok(())
    }
}

/// Owns the two layers and the physical screen
pub struct LayerCompositor<S: Screen> {
    screen: S,
    width: u32,
    height: u32,
    layers: [Layer; 2],
    frame: Vec<u16>,
}

impl<S: Screen> LayerCompositor<S> {
    pub fn new(screen: S) -> Self {
        let (width, height) = screen.bounds();
        Self {
            screen,
            width,
            height,
            layers: [Layer::new(width, height), Layer::new(width, height)],
            frame: vec![0; (width * height) as usize],
        }
    }

    /// Panel dimensions in pixels
    #[allow(dead_code)]
    pub fn bounds(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Decode an image file into a layer.
    ///
    /// The file is fully decoded, scaled and dithered before the layer is
    /// touched, so on failure the layer keeps its prior content and
    /// visibility. Loading does not change visibility.
    pub fn load(&mut self, id: LayerId, path: &Path) -> Result<Placement, DecodeError> {
        let prepared = image_proc::prepare(path, (self.width, self.height))?;
        let p = prepared.placement;

        let layer = &mut self.layers[id.index()];
        layer.clear();

        // Blit with clipping at the panel edge (placement offsets are
        // already clamped to zero for oversized images)
        let copy_w = p.width.min(self.width - p.x) as usize;
        let copy_h = p.height.min(self.height - p.y) as usize;
        for row in 0..copy_h {
            let src = row * p.width as usize;
            let dst = (p.y as usize + row) * self.width as usize + p.x as usize;
            layer.pixels[dst..dst + copy_w].copy_from_slice(&prepared.pixels[src..src + copy_w]);
        }
        layer.loaded = true;

        Ok(p)
    }

    /// Toggle whether a layer contributes to the composited frame.
    ///
    /// Pure state change; call `present` to make it observable.
    pub fn set_visible(&mut self, id: LayerId, visible: bool) {
        self.layers[id.index()].visible = visible;
    }

    #[allow(dead_code)]
    pub fn is_visible(&self, id: LayerId) -> bool {
        self.layers[id.index()].visible
    }

    pub fn is_loaded(&self, id: LayerId) -> bool {
        self.layers[id.index()].loaded
    }

    /// Number of currently visible layers
    #[allow(dead_code)]
    pub fn visible_count(&self) -> usize {
        self.layers.iter().filter(|l| l.visible).count()
    }

    /// Blank a layer's pixel content and mark it unloaded
    pub fn clear_layer(&mut self, id: LayerId) {
        self.layers[id.index()].clear();
    }

    /// Push the current composited state to the physical screen
    pub fn present(&mut self) -> Result<(), DisplayError> {
        self.frame.fill(0);
        for layer in &self.layers {
            if layer.visible {
                self.frame.copy_from_slice(&layer.pixels);
            }
        }
        self.screen.push_frame(&self.frame)
    }

    /// Draw a startup status message (white on dark blue) and present it.
    ///
    /// Uses layer A and hides layer B; only called outside the slideshow
    /// loop, where no image is settled yet.
    pub fn status_screen(&mut self, message: &str) -> Result<(), DisplayError> {
        let layer = &mut self.layers[0];
        layer.fill(STATUS_BG);

        let style = MonoTextStyle::new(&FONT_9X15, Rgb565::WHITE);
        let origin = Point::new(10, (self.height as i32 / 2) - 8);
        // Drawing into a Layer is infallible
        let _ = Text::with_baseline(message, origin, style, Baseline::Top).draw(layer);

        self.set_visible(LayerId::A, true);
        self.set_visible(LayerId::B, false);
        self.present()
    }

    /// Access the underlying screen (used by tests to inspect mock state)
    #[cfg(test)]
    pub fn screen(&self) -> &S {
        &self.screen
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::display::mock;

    fn png_fixture(dir: &tempfile::TempDir, name: &str, w: u32, h: u32, rgb: [u8; 3]) -> std::path::PathBuf {
        let path = dir.path().join(name);
        image::RgbImage::from_pixel(w, h, image::Rgb(rgb)).save(&path).unwrap();
        path
    }

    #[test]
    fn load_centers_content_without_changing_visibility() {
        let dir = tempfile::tempdir().unwrap();
        let path = png_fixture(&dir, "white.png", 10, 10, [255, 255, 255]);

        let (screen, _bl, _trace) = mock::pair(240, 240);
        let mut comp = LayerCompositor::new(screen);

        let p = comp.load(LayerId::A, &path).unwrap();
        assert_eq!((p.x, p.y), (115, 115));
        assert!(comp.is_loaded(LayerId::A));
        assert!(!comp.is_visible(LayerId::A));
        // Nothing presented yet
        assert_eq!(comp.screen().present_count, 0);
    }

    #[test]
    fn present_composites_only_visible_layers() {
        let dir = tempfile::tempdir().unwrap();
        let path = png_fixture(&dir, "white.png", 10, 10, [255, 255, 255]);

        let (screen, _bl, _trace) = mock::pair(240, 240);
        let mut comp = LayerCompositor::new(screen);
        comp.load(LayerId::A, &path).unwrap();

        comp.present().unwrap();
        let frame = comp.screen().last_frame.clone().unwrap();
        assert!(frame.iter().all(|&px| px == 0), "hidden layer must not show");

        comp.set_visible(LayerId::A, true);
        comp.present().unwrap();
        let frame = comp.screen().last_frame.clone().unwrap();
        let center = 120 * 240 + 120;
        assert_eq!(frame[center], 0xFFFF);
        assert_eq!(frame[0], 0x0000, "background stays black");
    }

    #[test]
    fn failed_load_keeps_prior_content_and_visibility() {
        let dir = tempfile::tempdir().unwrap();
        let good = png_fixture(&dir, "white.png", 10, 10, [255, 255, 255]);
        let bad = dir.path().join("missing.jpg");

        let (screen, _bl, _trace) = mock::pair(240, 240);
        let mut comp = LayerCompositor::new(screen);
        comp.load(LayerId::A, &good).unwrap();
        comp.set_visible(LayerId::A, true);

        assert!(comp.load(LayerId::A, &bad).is_err());
        assert!(comp.is_visible(LayerId::A));
        assert!(comp.is_loaded(LayerId::A));

        comp.present().unwrap();
        let frame = comp.screen().last_frame.clone().unwrap();
        assert_eq!(frame[120 * 240 + 120], 0xFFFF, "old pixels survive");
    }

    #[test]
    fn status_screen_shows_exactly_one_layer() {
        let (screen, _bl, _trace) = mock::pair(240, 240);
        let mut comp = LayerCompositor::new(screen);

        comp.status_screen("Connecting to network...").unwrap();
        assert_eq!(comp.visible_count(), 1);
        assert_eq!(comp.screen().present_count, 1);

        let frame = comp.screen().last_frame.clone().unwrap();
        assert!(frame.iter().any(|&px| px == 0xFFFF), "text pixels drawn");
        assert!(
            frame.iter().any(|&px| px == STATUS_BG.into_storage()),
            "background filled"
        );
    }

    #[test]
    fn layer_ring_flips() {
        assert_eq!(LayerId::A.other(), LayerId::B);
        assert_eq!(LayerId::B.other(), LayerId::A);
        assert_eq!(LayerId::A.other().other(), LayerId::A);
    }
}
