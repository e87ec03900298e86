//! ST7789 240x240 square LCD panel driver.
//!
//! 16-bit RGB565 color, full-frame writes over SPI.
//!
//! The init sequence follows the Sitronix datasheet defaults used by the
//! common 1.3"/1.54" 240x240 breakout boards.

use super::gpio::{GpioController, GpioError};
use super::spi::{SpiDisplay, SpiError};
use super::Screen;
use std::thread;
use std::time::Duration;
use thiserror::Error;

/// Panel dimensions
pub const WIDTH: u32 = 240;
pub const HEIGHT: u32 = 240;

/// Frame size in pixels
pub const FRAME_PIXELS: usize = (WIDTH as usize) * (HEIGHT as usize);

/// ST7789 command set (subset used by this driver)
#[allow(dead_code)]
mod cmd {
    pub const SWRESET: u8 = 0x01; // Software reset
    pub const SLPIN: u8 = 0x10; // Sleep in
    pub const SLPOUT: u8 = 0x11; // Sleep out
    pub const NORON: u8 = 0x13; // Normal display mode on
    pub const INVON: u8 = 0x21; // Display inversion on (these panels want it)
    pub const DISPOFF: u8 = 0x28;
    pub const DISPON: u8 = 0x29;
    pub const CASET: u8 = 0x2A; // Column address set
    pub const RASET: u8 = 0x2B; // Row address set
    pub const RAMWR: u8 = 0x2C; // Memory write
    pub const MADCTL: u8 = 0x36; // Memory data access control
    pub const COLMOD: u8 = 0x3A; // Interface pixel format
}

/// Display driver errors
#[derive(Error, Debug)]
pub enum DisplayError {
    #[error("GPIO error: {0}")]
    Gpio(#[from] GpioError),

    #[error("SPI error: {0}")]
    Spi(#[from] SpiError),

    #[error("Backlight PWM error: {0}")]
    Pwm(#[from] rppal::pwm::Error),

    #[error("Display not initialized")]
    NotInitialized,

    #[error("Invalid frame size: expected {expected} pixels, got {actual}")]
    InvalidFrameSize { expected: usize, actual: usize },
}

/// ST7789 panel driver
pub struct St7789 {
    gpio: GpioController,
    spi: SpiDisplay,
    initialized: bool,
}

impl St7789 {
    /// Create a new panel driver instance
    pub fn new() -> Result<Self, DisplayError> {
        let gpio = GpioController::new()?;
        let spi = SpiDisplay::new()?;

        Ok(Self {
            gpio,
            spi,
            initialized: false,
        })
    }

    /// Initialize the panel hardware
    pub fn init(&mut self) -> Result<(), DisplayError> {
        tracing::info!("Initializing ST7789 panel ({}x{})", WIDTH, HEIGHT);

        self.gpio.reset();

        self.spi.write_command(&mut self.gpio, cmd::SWRESET)?;
        thread::sleep(Duration::from_millis(150));

        self.spi.write_command(&mut self.gpio, cmd::SLPOUT)?;
        thread::sleep(Duration::from_millis(120));

        // 16 bits per pixel, RGB565
        self.spi
            .write_command_data(&mut self.gpio, cmd::COLMOD, &[0x55])?;

        // Row-major, top-left origin, RGB channel order
        self.spi
            .write_command_data(&mut self.gpio, cmd::MADCTL, &[0x00])?;

        // IPS panels ship with inversion expected on
        self.spi.write_command(&mut self.gpio, cmd::INVON)?;
        self.spi.write_command(&mut self.gpio, cmd::NORON)?;
        thread::sleep(Duration::from_millis(10));

        self.spi.write_command(&mut self.gpio, cmd::DISPON)?;
        thread::sleep(Duration::from_millis(10));

        self.initialized = true;
        tracing::info!("Panel initialization complete");
        Ok(())
    }

    /// Set the full-screen address window
    fn set_window(&mut self) -> Result<(), DisplayError> {
        let x_end = (WIDTH - 1) as u16;
        let y_end = (HEIGHT - 1) as u16;

        self.spi.write_command_data(
            &mut self.gpio,
            cmd::CASET,
            &[0x00, 0x00, (x_end >> 8) as u8, (x_end & 0xFF) as u8],
        )?;
        self.spi.write_command_data(
            &mut self.gpio,
            cmd::RASET,
            &[0x00, 0x00, (y_end >> 8) as u8, (y_end & 0xFF) as u8],
        )?;
        Ok(())
    }

    /// Write a full RGB565 frame to panel memory
    pub fn write_frame(&mut self, frame: &[u16]) -> Result<(), DisplayError> {
        if !self.initialized {
            return Err(DisplayError::NotInitialized);
        }

        if frame.len() != FRAME_PIXELS {
            return Err(DisplayError::InvalidFrameSize {
                expected: FRAME_PIXELS,
                actual: frame.len(),
            });
        }

        self.set_window()?;

        // Panel expects big-endian pixel bytes
        let mut bytes = Vec::with_capacity(frame.len() * 2);
        for px in frame {
            bytes.extend_from_slice(&px.to_be_bytes());
        }

        self.spi
            .write_command_data(&mut self.gpio, cmd::RAMWR, &bytes)?;
        Ok(())
    }

    /// Blank the panel to black
    pub fn blank(&mut self) -> Result<(), DisplayError> {
        let frame = vec![0u16; FRAME_PIXELS];
        self.write_frame(&frame)
    }

    /// Put the panel to sleep
    pub fn sleep(&mut self) -> Result<(), DisplayError> {
        if self.initialized {
            self.spi.write_command(&mut self.gpio, cmd::DISPOFF)?;
            self.spi.write_command(&mut self.gpio, cmd::SLPIN)?;
            thread::sleep(Duration::from_millis(5));
            self.initialized = false;
        }
        Ok(())
    }
}

impl Screen for St7789 {
    fn bounds(&self) -> (u32, u32) {
        (WIDTH, HEIGHT)
    }

    fn push_frame(&mut self, frame: &[u16]) -> Result<(), DisplayError> {
        self.write_frame(frame)
    }
}
