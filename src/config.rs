//! Configuration management for the slideshow.
//!
//! Loads and validates the JSON configuration file. Every field has a
//! default, so a missing or partial file still yields a runnable setup.

use crate::source::RetryPolicy;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Default configuration file path
pub const DEFAULT_CONFIG_PATH: &str = "/opt/endless-frame/config.json";

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config JSON: {0}")]
    ParseError(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Image generation endpoint; the prompt is appended as a path segment
    #[serde(default = "default_endpoint_url")]
    pub endpoint_url: String,

    /// Prompt rotation, cycled in order forever
    #[serde(default = "default_prompts")]
    pub prompts: Vec<String>,

    /// Flat directory on the removable media holding the images
    #[serde(default = "default_gallery_dir")]
    pub gallery_dir: PathBuf,

    /// Pause between cycles, on top of the transition itself
    #[serde(default = "default_cycle_delay_secs")]
    pub cycle_delay_secs: u64,

    /// Total wall time of one fade ramp
    #[serde(default = "default_fade_duration_ms")]
    pub fade_duration_ms: u64,

    /// Ramp increments; a ramp visits fade_steps + 1 brightness levels
    #[serde(default = "default_fade_steps")]
    pub fade_steps: u32,

    /// Lowest cross-fade brightness; keeps the panel from going black
    #[serde(default = "default_fade_floor")]
    pub fade_floor: f32,

    /// Fetch attempts per cycle before the cycle is skipped
    #[serde(default = "default_fetch_attempts")]
    pub fetch_attempts: u32,

    /// Base delay between fetch attempts (doubled each retry)
    #[serde(default = "default_fetch_retry_delay_secs")]
    pub fetch_retry_delay_secs: u64,
}

fn default_endpoint_url() -> String {
    "https://image.pollinations.ai/prompt".to_string()
}

fn default_prompts() -> Vec<String> {
    [
        "synthwave style new retro wave city scapes at night",
        "vaporwave aesthetic city skyline with neon lights",
        "cyberpunk futuristic metropolis with glowing buildings",
        "retrofuturistic space station with vibrant colors",
        "neon-lit arcade scene with futuristic machines",
        "80s-style synthwave desert landscape with neon sun",
        "futuristic train station with glowing lights",
        "nighttime beach with neon palm trees and synthwave style",
        "cyberpunk city streets with vibrant holograms",
        "retro wave sci-fi space with glowing planets and stars",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_gallery_dir() -> PathBuf {
    PathBuf::from("/mnt/sd/gallery")
}

fn default_cycle_delay_secs() -> u64 {
    7
}

fn default_fade_duration_ms() -> u64 {
    1500
}

fn default_fade_steps() -> u32 {
    10
}

fn default_fade_floor() -> f32 {
    0.15
}

fn default_fetch_attempts() -> u32 {
    3
}

fn default_fetch_retry_delay_secs() -> u64 {
    2
}

impl Default for Config {
    fn default() -> Self {
        Self {
            endpoint_url: default_endpoint_url(),
            prompts: default_prompts(),
            gallery_dir: default_gallery_dir(),
            cycle_delay_secs: default_cycle_delay_secs(),
            fade_duration_ms: default_fade_duration_ms(),
            fade_steps: default_fade_steps(),
            fade_floor: default_fade_floor(),
            fetch_attempts: default_fetch_attempts(),
            fetch_retry_delay_secs: default_fetch_retry_delay_secs(),
        }
    }
}

impl Config {
    /// Load configuration from a JSON file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        let url = reqwest::Url::parse(&self.endpoint_url).map_err(|e| {
            ConfigError::ValidationError(format!("endpoint_url is not a valid URL: {e}"))
        })?;
        if url.host_str().is_none() {
            return Err(ConfigError::ValidationError(
                "endpoint_url must have a host".to_string(),
            ));
        }

        if self.prompts.is_empty() {
            return Err(ConfigError::ValidationError(
                "At least one prompt is required".to_string(),
            ));
        }
        if self.prompts.iter().any(|p| p.trim().is_empty()) {
            return Err(ConfigError::ValidationError(
                "Prompts must not be blank".to_string(),
            ));
        }

        if self.cycle_delay_secs == 0 {
            return Err(ConfigError::ValidationError(
                "cycle_delay_secs must be at least 1".to_string(),
            ));
        }

        if !(2..=100).contains(&self.fade_steps) {
            return Err(ConfigError::ValidationError(
                "fade_steps must be between 2 and 100".to_string(),
            ));
        }

        if !(self.fade_floor > 0.0 && self.fade_floor <= 0.9) {
            return Err(ConfigError::ValidationError(
                "fade_floor must be in (0.0, 0.9]".to_string(),
            ));
        }

        if self.fade_duration_ms == 0 || self.fade_duration_ms > 60_000 {
            return Err(ConfigError::ValidationError(
                "fade_duration_ms must be between 1 and 60000".to_string(),
            ));
        }

        if !(1..=10).contains(&self.fetch_attempts) {
            return Err(ConfigError::ValidationError(
                "fetch_attempts must be between 1 and 10".to_string(),
            ));
        }

        Ok(())
    }

    pub fn cycle_delay(&self) -> Duration {
        Duration::from_secs(self.cycle_delay_secs)
    }

    pub fn fade_duration(&self) -> Duration {
        Duration::from_millis(self.fade_duration_ms)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.fetch_attempts,
            base_delay: Duration::from_secs(self.fetch_retry_delay_secs),
        }
    }
}
