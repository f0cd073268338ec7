use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use super::platform;
use crate::MAX_CHANNELS;

/// Widest meter row the encoder lays out.
pub const MAX_WIDTH: usize = 40;

/// Peak-hold time the decay timeout is derived from.
const PEAK_HOLD_SECS: f32 = 1.6;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub meter: MeterConfig,
    #[serde(default)]
    pub display: DisplayConfig,
    #[serde(default)]
    pub control: ControlConfig,
    #[serde(default)]
    pub audio: AudioConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeterConfig {
    /// Render ticks per second.
    #[serde(default = "default_update_rate")]
    pub update_rate_hz: u32,
    /// Signal level (dBFS) that reads as 0 dB on the meter.
    #[serde(default)]
    pub reference_level_db: f32,
    #[serde(default = "default_width")]
    pub width: usize,
    #[serde(default = "default_meter_char")]
    pub meter_char: char,
    #[serde(default = "default_peak_char")]
    pub peak_char: char,
    /// Start in numeric dB mode instead of the bargraph.
    #[serde(default)]
    pub numeric: bool,
    /// Channel rows shown at startup. Defaults to every bound channel.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub show_channels: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisplayConfig {
    /// Character device the meter is drawn on; `-` means stdout.
    #[serde(default = "default_device")]
    pub device: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControlConfig {
    /// Named pipe the single-character commands arrive on.
    #[serde(default = "platform::default_fifo_path")]
    pub fifo: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioConfig {
    /// Audio host name (e.g. "alsa", "jack"). Defaults to the platform host.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    /// Input device name. Defaults to the host's default input.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device: Option<String>,
    /// How many input channels to bind.
    #[serde(default = "default_channels")]
    pub channels: usize,
}

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("update rate must be at least 1 Hz")]
    ZeroUpdateRate,

    #[error("meter width {0} is outside 1..={}", MAX_WIDTH)]
    Width(usize),

    #[error("{name} {value:?} is not a printable ASCII character")]
    NotAscii { name: &'static str, value: char },

    #[error("cannot bind {0} channels (at most {})", MAX_CHANNELS)]
    TooManyChannels(usize),

    #[error("cannot show {show} channels with only {bound} bound")]
    ShowExceedsBound { show: usize, bound: usize },
}

impl Default for MeterConfig {
    fn default() -> Self {
        Self {
            update_rate_hz: default_update_rate(),
            reference_level_db: 0.0,
            width: default_width(),
            meter_char: default_meter_char(),
            peak_char: default_peak_char(),
            numeric: false,
            show_channels: None,
        }
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            device: default_device(),
        }
    }
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            fifo: platform::default_fifo_path(),
        }
    }
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            host: None,
            device: None,
            channels: default_channels(),
        }
    }
}

fn default_update_rate() -> u32 {
    8
}

fn default_width() -> usize {
    20
}

fn default_meter_char() -> char {
    '#'
}

fn default_peak_char() -> char {
    'I'
}

fn default_device() -> PathBuf {
    PathBuf::from(platform::DEFAULT_LCD_DEVICE)
}

fn default_channels() -> usize {
    MAX_CHANNELS
}

impl MeterConfig {
    /// Linear gain that moves the configured reference level to 0 dB.
    pub fn bias(&self) -> f32 {
        10f32.powf(self.reference_level_db * -0.05)
    }

    /// Ticks a peak is held before the bar may fall back.
    pub fn decay_timeout_ticks(&self) -> u32 {
        (PEAK_HOLD_SECS / (1.0 / self.update_rate_hz as f32)).round() as u32
    }
}

impl Config {
    /// Load the config from the default location, writing the defaults
    /// there first if no file exists yet.
    pub fn load() -> anyhow::Result<Self> {
        Self::load_from(&Self::config_path())
    }

    pub fn load_from(config_path: &Path) -> anyhow::Result<Self> {
        if !config_path.exists() {
            let config = Self::default();
            config.save_to(config_path)?;
            return Ok(config);
        }

        let content = std::fs::read_to_string(config_path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn save_to(&self, config_path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(config_path, content)?;
        Ok(())
    }

    pub fn config_path() -> PathBuf {
        platform::config_dir().join("config.toml")
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let meter = &self.meter;
        if meter.update_rate_hz == 0 {
            return Err(ConfigError::ZeroUpdateRate);
        }
        if meter.width == 0 || meter.width > MAX_WIDTH {
            return Err(ConfigError::Width(meter.width));
        }
        for (name, value) in [("meter_char", meter.meter_char), ("peak_char", meter.peak_char)] {
            if !value.is_ascii_graphic() && value != ' ' {
                return Err(ConfigError::NotAscii { name, value });
            }
        }
        if self.audio.channels > MAX_CHANNELS {
            return Err(ConfigError::TooManyChannels(self.audio.channels));
        }
        if let Some(show) = meter.show_channels {
            if show > self.audio.channels {
                return Err(ConfigError::ShowExceedsBound {
                    show,
                    bound: self.audio.channels,
                });
            }
        }
        Ok(())
    }
}
