//! GPIO controller for the LCD panel.
//!
//! Manages the control pins of the ST7789:
//! - RST (Reset): GPIO 27
//! - DC (Data/Command): GPIO 25

use rppal::gpio::{Gpio, OutputPin};
use std::thread;
use std::time::Duration;
use thiserror::Error;

/// GPIO pin assignments (BCM numbering)
pub mod pins {
    pub const RST: u8 = 27; // Reset pin
    pub const DC: u8 = 25; // Data/Command pin
}

/// GPIO-related errors
#[derive(Error, Debug)]
pub enum GpioError {
    #[error("GPIO initialization failed: {0}")]
    InitError(#[from] rppal::gpio::Error),
}

/// GPIO controller for the LCD panel
pub struct GpioController {
    rst: OutputPin,
    dc: OutputPin,
}

impl GpioController {
    /// Initialize GPIO pins for panel control
    pub fn new() -> Result<Self, GpioError> {
        let gpio = Gpio::new()?;

        let mut rst = gpio.get(pins::RST)?.into_output();
        let mut dc = gpio.get(pins::DC)?.into_output();

        // Initialize pins to known state
        rst.set_high();
        dc.set_low();

        tracing::debug!("GPIO initialized: RST={}, DC={}", pins::RST, pins::DC);

        Ok(Self { rst, dc })
    }

    /// Perform hardware reset sequence
    ///
    /// The ST7789 needs >=10us low and then ~120ms before it accepts the
    /// init sequence; generous margins are used here.
    pub fn reset(&mut self) {
        tracing::debug!("Performing hardware reset");

        self.rst.set_high();
        thread::sleep(Duration::from_millis(10));

        self.rst.set_low();
        thread::sleep(Duration::from_millis(10));

        self.rst.set_high();
        thread::sleep(Duration::from_millis(120));
    }

    /// Set DC pin low (command mode)
    #[inline]
    pub fn dc_low(&mut self) {
        self.dc.set_low();
    }

    /// Set DC pin high (data mode)
    #[inline]
    pub fn dc_high(&mut self) {
        self.dc.set_high();
    }
}
