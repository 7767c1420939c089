//! Engine configuration
//!
//! The configuration blob sizes every fixed pool the engine owns: the
//! mixer output format, the real and virtual channel counts, and the
//! listener pool. Loaded once at engine construction.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{EngineError, EngineResult};

/// Engine configuration blob
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AudioConfig {
    /// Output sample rate in Hz
    pub output_frequency: u32,
    /// Output channel count (1 = mono, 2 = stereo)
    pub output_channels: u32,
    /// Mixer buffer size in sample frames
    pub output_buffer_size: u32,
    /// Number of real mixer channels (audible voices)
    pub mixer_channels: u32,
    /// Number of virtual channels (tracked but silent voices)
    pub mixer_virtual_channels: u32,
    /// Listener pool size
    pub listeners: u32,
    /// Bus definition file, relative to the config file
    pub bus_file: String,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            output_frequency: 48000,
            output_channels: 2,
            output_buffer_size: 1024,
            mixer_channels: 16,
            mixer_virtual_channels: 48,
            listeners: 4,
            bus_file: "buses.json".to_string(),
        }
    }
}

impl AudioConfig {
    /// Loads and validates a configuration from a JSON file.
    pub fn load_from<P: AsRef<Path>>(path: P) -> EngineResult<Self> {
        let content = fs::read_to_string(path)?;
        let config: AudioConfig = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks the configuration for values the engine cannot run with.
    pub fn validate(&self) -> EngineResult<()> {
        if self.output_frequency == 0 {
            return Err(EngineError::Config(
                "output_frequency must be non-zero".to_string(),
            ));
        }
        if self.output_channels == 0 || self.output_channels > 2 {
            return Err(EngineError::Config(format!(
                "output_channels must be 1 or 2, got {}",
                self.output_channels
            )));
        }
        if self.mixer_channels == 0 {
            return Err(EngineError::Config(
                "mixer_channels must be at least 1".to_string(),
            ));
        }
        if self.listeners == 0 {
            return Err(EngineError::Config(
                "listener pool must hold at least 1 listener".to_string(),
            ));
        }
        Ok(())
    }

    /// Total channel pool size (real + virtual).
    pub fn total_channels(&self) -> usize {
        (self.mixer_channels + self.mixer_virtual_channels) as usize
    }
}
