//! PWM backlight control.
//!
//! The panel backlight LED is driven from the Pi's hardware PWM (GPIO 18,
//! channel 0). Brightness maps linearly onto the duty cycle; the transition
//! engine is the only writer during a ramp.

use super::{Backlight, DisplayError};
use rppal::pwm::{Channel, Polarity, Pwm};

/// PWM frequency in Hz. High enough to be flicker-free, low enough for the
/// Pi's PWM clock to resolve fine duty steps.
const PWM_FREQUENCY: f64 = 1000.0;

/// Hardware PWM backlight
pub struct PwmBacklight {
    pwm: Pwm,
}

impl PwmBacklight {
    /// Initialize the backlight at full brightness
    pub fn new() -> Result<Self, DisplayError> {
        let pwm = Pwm::with_frequency(Channel::Pwm0, PWM_FREQUENCY, 1.0, Polarity::Normal, true)?;

        tracing::debug!("Backlight PWM initialized at {}Hz", PWM_FREQUENCY);

        Ok(Self { pwm })
    }

    /// Turn the backlight fully off (used on shutdown)
    pub fn off(&mut self) -> Result<(), DisplayError> {
        self.set_brightness(0.0)
    }
}

impl Backlight for PwmBacklight {
    fn set_brightness(&mut self, level: f32) -> Result<(), DisplayError> {
        let level = level.clamp(0.0, 1.0);
        self.pwm.set_duty_cycle(level as f64)?;
        Ok(())
    }
}

impl Drop for PwmBacklight {
    fn drop(&mut self) {
        // Leave the LED dark rather than at whatever the last ramp step was
        let _ = self.pwm.set_duty_cycle(0.0);
    }
}
