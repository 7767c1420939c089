//! Shared fixtures for the engine integration tests.
#![allow(dead_code)]

use polyphon_core::{
    AttenuationMode, AudioConfig, AudioSampleSetEntry, BusDef, BusDefList, SoundCollectionDef,
};
use polyphon_engine::{AudioEngine, MemoryLoader, NullMixer};

/// An engine wired to a [`NullMixer`]; the mixer clone shares state
/// with the one the engine drives, so tests can inspect slots and
/// simulate samples finishing.
pub struct TestEngine {
    pub engine: AudioEngine,
    pub mixer: NullMixer,
}

pub fn master_only() -> BusDefList {
    BusDefList {
        buses: vec![BusDef::named("master")],
    }
}

/// master -> { voice (ducks music), music } with the fade times used by
/// the ducking scenarios.
pub fn ducking_buses() -> BusDefList {
    let mut master = BusDef::named("master");
    master.child_buses = vec!["voice".to_string(), "music".to_string()];
    let mut voice = BusDef::named("voice");
    voice.duck_buses = vec!["music".to_string()];
    voice.duck_gain = 0.25;
    voice.duck_fade_in_time = 1.0;
    voice.duck_fade_out_time = 2.0;
    BusDefList {
        buses: vec![master, voice, BusDef::named("music")],
    }
}

pub fn engine_with(real: u32, virtual_channels: u32, bus_defs: &BusDefList) -> TestEngine {
    let config = AudioConfig {
        mixer_channels: real,
        mixer_virtual_channels: virtual_channels,
        listeners: 4,
        ..Default::default()
    };
    let mixer = NullMixer::new(real as usize);
    let engine = AudioEngine::new(
        config,
        bus_defs,
        Box::new(mixer.clone()),
        Box::new(MemoryLoader::permissive()),
    )
    .unwrap();
    TestEngine { engine, mixer }
}

/// A one-sample, non-positional collection on the master bus.
pub fn collection(name: &str, priority: f32) -> SoundCollectionDef {
    SoundCollectionDef {
        name: name.to_string(),
        priority,
        audio_sample_set: vec![AudioSampleSetEntry::from_file(format!("{name}.wav"))],
        ..Default::default()
    }
}

pub fn collection_on_bus(name: &str, priority: f32, bus: &str) -> SoundCollectionDef {
    SoundCollectionDef {
        bus: bus.to_string(),
        ..collection(name, priority)
    }
}

/// A positional collection audible out to 20 units with a roll-off
/// starting at 10.
pub fn positional_collection(name: &str) -> SoundCollectionDef {
    SoundCollectionDef {
        mode: AttenuationMode::Positional,
        min_audible_radius: 0.0,
        roll_in_radius: 0.0,
        roll_out_radius: 10.0,
        max_audible_radius: 20.0,
        ..collection(name, 1.0)
    }
}

pub fn streamed_collection(name: &str, priority: f32) -> SoundCollectionDef {
    SoundCollectionDef {
        stream: true,
        audio_sample_set: vec![AudioSampleSetEntry::from_file(format!("{name}.ogg"))],
        ..collection(name, priority)
    }
}
