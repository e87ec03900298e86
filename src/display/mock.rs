//! Recording screen and backlight doubles for tests.
//!
//! Both halves share a single event trace so tests can assert ordering
//! between frame pushes and brightness changes.

use super::{Backlight, DisplayError, Screen};
use std::cell::RefCell;
use std::rc::Rc;

/// One observable hardware interaction
#[derive(Debug, Clone, PartialEq)]
pub enum TraceEvent {
    /// A full frame was pushed to the panel
    Present,
    /// The backlight was set to this level
    Brightness(f32),
}

/// Shared event log
pub type Trace = Rc<RefCell<Vec<TraceEvent>>>;

/// Screen double that records pushed frames
pub struct MockScreen {
    width: u32,
    height: u32,
    trace: Trace,
    /// Most recently pushed frame, if any
    pub last_frame: Option<Vec<u16>>,
    /// Number of frames pushed
    pub present_count: usize,
}

/// Backlight double that records every level set
pub struct MockBacklight {
    trace: Trace,
    /// Current level
    pub level: f32,
    /// Every level ever set, in order
    pub history: Vec<f32>,
}

/// Build a screen/backlight pair sharing one trace
pub fn pair(width: u32, height: u32) -> (MockScreen, MockBacklight, Trace) {
    let trace: Trace = Rc::new(RefCell::new(Vec::new()));
    let screen = MockScreen {
        width,
        height,
        trace: Rc::clone(&trace),
        last_frame: None,
        present_count: 0,
    };
    let backlight = MockBacklight {
        trace: Rc::clone(&trace),
        level: 1.0,
        history: Vec::new(),
    };
    (screen, backlight, trace)
}

impl Screen for MockScreen {
    fn bounds(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn push_frame(&mut self, frame: &[u16]) -> Result<(), DisplayError> {
        assert_eq!(
            frame.len(),
            (self.width * self.height) as usize,
            "frame size must match bounds"
        );
        self.last_frame = Some(frame.to_vec());
        self.present_count += 1;
        self.trace.borrow_mut().push(TraceEvent::Present);
        Ok(())
    }
}

impl Backlight for MockBacklight {
    fn set_brightness(&mut self, level: f32) -> Result<(), DisplayError> {
        let level = level.clamp(0.0, 1.0);
        self.level = level;
        self.history.push(level);
        self.trace.borrow_mut().push(TraceEvent::Brightness(level));
        Ok(())
    }
}
