//! Definition blobs
//!
//! Three JSON blobs describe the static audio content: the bus tree
//! (`BusDefList`), individual sound collections (`SoundCollectionDef`),
//! and banks naming the collections to load together (`SoundBankDef`).
//! The engine consumes the parsed structs; file loading is a thin
//! `serde_json` wrapper.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{EngineError, EngineResult};

fn default_gain() -> f32 {
    1.0
}

fn default_priority() -> f32 {
    1.0
}

fn default_probability() -> f32 {
    1.0
}

fn default_curve_factor() -> f32 {
    1.0
}

fn default_roll_out_radius() -> f32 {
    1000.0
}

fn default_max_audible_radius() -> f32 {
    2000.0
}

/// How a collection's gain and pan respond to the listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AttenuationMode {
    /// Gain and pan are computed from the sound's world location.
    Positional,
    /// Constant gain, centered pan.
    #[default]
    Nonpositional,
}

/// One bus in the definition list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BusDef {
    pub name: String,
    /// Definition gain, multiplied into every gain computed on this bus.
    #[serde(default = "default_gain")]
    pub gain: f32,
    /// Names of buses whose gain is scaled by this bus's final gain.
    #[serde(default)]
    pub child_buses: Vec<String>,
    /// Names of buses attenuated while a sound plays on this bus.
    #[serde(default)]
    pub duck_buses: Vec<String>,
    /// Target attenuation applied to ducked buses, in [0, 1].
    #[serde(default = "default_gain")]
    pub duck_gain: f32,
    /// Seconds to reach full duck once this bus becomes active.
    #[serde(default)]
    pub duck_fade_in_time: f32,
    /// Seconds to recover once this bus goes quiet.
    #[serde(default)]
    pub duck_fade_out_time: f32,
}

impl BusDef {
    /// Creates a bus definition with default gain and no relationships.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            gain: 1.0,
            child_buses: Vec::new(),
            duck_buses: Vec::new(),
            duck_gain: 1.0,
            duck_fade_in_time: 0.0,
            duck_fade_out_time: 0.0,
        }
    }
}

/// The bus definition blob: a flat list of buses wired together by name.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BusDefList {
    #[serde(default)]
    pub buses: Vec<BusDef>,
}

impl BusDefList {
    /// Loads a bus definition list from a JSON file.
    pub fn load_from<P: AsRef<Path>>(path: P) -> EngineResult<Self> {
        let content = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }
}

/// A single audio file reference with its own gain.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioSampleDef {
    pub filename: String,
    #[serde(default = "default_gain")]
    pub gain: f32,
}

/// Sample-set entry: an audio file and its selection weight.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioSampleSetEntry {
    pub audio_sample: AudioSampleDef,
    #[serde(default = "default_probability")]
    pub playback_probability: f32,
}

impl AudioSampleSetEntry {
    /// Creates an entry with unit gain and unit weight.
    pub fn from_file(filename: impl Into<String>) -> Self {
        Self {
            audio_sample: AudioSampleDef {
                filename: filename.into(),
                gain: 1.0,
            },
            playback_probability: 1.0,
        }
    }
}

/// Sound collection definition: playback parameters plus the weighted
/// sample set the collection draws from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SoundCollectionDef {
    pub name: String,
    /// Bus this collection plays on.
    pub bus: String,
    /// Priority multiplier; higher wins channel admission.
    #[serde(default = "default_priority")]
    pub priority: f32,
    #[serde(default = "default_gain")]
    pub gain: f32,
    #[serde(rename = "loop", default)]
    pub looping: bool,
    /// Streamed collections are demand-read and occupy a stream slot.
    #[serde(default)]
    pub stream: bool,
    #[serde(default)]
    pub mode: AttenuationMode,
    /// Inside this radius the sound is silent (too close to hear).
    #[serde(default)]
    pub min_audible_radius: f32,
    /// Gain rolls in from `min_audible_radius` up to this radius.
    #[serde(default)]
    pub roll_in_radius: f32,
    /// Gain rolls off from this radius out to `max_audible_radius`.
    #[serde(default = "default_roll_out_radius")]
    pub roll_out_radius: f32,
    /// Beyond this radius the sound is silent.
    #[serde(default = "default_max_audible_radius")]
    pub max_audible_radius: f32,
    #[serde(default = "default_curve_factor")]
    pub roll_in_curve_factor: f32,
    #[serde(default = "default_curve_factor")]
    pub roll_out_curve_factor: f32,
    #[serde(default)]
    pub audio_sample_set: Vec<AudioSampleSetEntry>,
}

impl Default for SoundCollectionDef {
    fn default() -> Self {
        Self {
            name: String::new(),
            bus: "master".to_string(),
            priority: 1.0,
            gain: 1.0,
            looping: false,
            stream: false,
            mode: AttenuationMode::Nonpositional,
            min_audible_radius: 0.0,
            roll_in_radius: 0.0,
            roll_out_radius: default_roll_out_radius(),
            max_audible_radius: default_max_audible_radius(),
            roll_in_curve_factor: 1.0,
            roll_out_curve_factor: 1.0,
            audio_sample_set: Vec::new(),
        }
    }
}

impl SoundCollectionDef {
    /// Loads a sound collection definition from a JSON file.
    pub fn load_from<P: AsRef<Path>>(path: P) -> EngineResult<Self> {
        let content = fs::read_to_string(path)?;
        let def: SoundCollectionDef = serde_json::from_str(&content)?;
        def.validate()?;
        Ok(def)
    }

    /// Checks the definition's numeric contracts.
    pub fn validate(&self) -> EngineResult<()> {
        if self.gain < 0.0 {
            return Err(EngineError::Config(format!(
                "collection \"{}\": gain must be non-negative",
                self.name
            )));
        }
        let ordered = self.min_audible_radius <= self.roll_in_radius
            && self.roll_in_radius <= self.roll_out_radius
            && self.roll_out_radius <= self.max_audible_radius;
        if !ordered {
            return Err(EngineError::Config(format!(
                "collection \"{}\": radii must satisfy min <= roll_in <= roll_out <= max",
                self.name
            )));
        }
        if self.roll_in_curve_factor <= 0.0 || self.roll_out_curve_factor <= 0.0 {
            return Err(EngineError::Config(format!(
                "collection \"{}\": curve factors must be positive",
                self.name
            )));
        }
        for entry in &self.audio_sample_set {
            if entry.playback_probability < 0.0 {
                return Err(EngineError::Config(format!(
                    "collection \"{}\": sample \"{}\" has negative playback_probability",
                    self.name, entry.audio_sample.filename
                )));
            }
        }
        Ok(())
    }
}

/// Sound bank definition: the collection definition files to load together.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SoundBankDef {
    #[serde(default)]
    pub filenames: Vec<String>,
}

impl SoundBankDef {
    /// Loads a sound bank definition from a JSON file.
    pub fn load_from<P: AsRef<Path>>(path: P) -> EngineResult<Self> {
        let content = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }
}
