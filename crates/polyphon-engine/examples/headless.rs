//! Headless demo: drives the engine against the null mixer for a few
//! simulated seconds and prints what the voice manager is doing.
//!
//! A looping song plays on the music bus, footsteps fire around the
//! listener, and a voice line ducks the music while it speaks.

use glam::Vec3;
use polyphon_core::{
    AttenuationMode, AudioConfig, AudioSampleSetEntry, BusDef, BusDefList, SoundCollectionDef,
};
use polyphon_engine::{AudioEngine, MemoryLoader, NullMixer};

fn buses() -> BusDefList {
    let mut master = BusDef::named("master");
    master.child_buses = vec!["voice".to_string(), "music".to_string(), "sfx".to_string()];
    let mut voice = BusDef::named("voice");
    voice.duck_buses = vec!["music".to_string()];
    voice.duck_gain = 0.3;
    voice.duck_fade_in_time = 0.25;
    voice.duck_fade_out_time = 1.0;
    BusDefList {
        buses: vec![master, voice, BusDef::named("music"), BusDef::named("sfx")],
    }
}

fn main() {
    let config = AudioConfig {
        mixer_channels: 4,
        mixer_virtual_channels: 12,
        listeners: 1,
        ..Default::default()
    };
    let mixer = NullMixer::new(config.mixer_channels as usize);
    let engine_result = AudioEngine::new(
        config,
        &buses(),
        Box::new(mixer.clone()),
        Box::new(MemoryLoader::permissive()),
    );
    let mut engine = match engine_result {
        Ok(engine) => engine,
        Err(err) => {
            eprintln!("engine setup failed: {err}");
            return;
        }
    };

    let song = engine
        .register_collection(SoundCollectionDef {
            name: "song".to_string(),
            bus: "music".to_string(),
            looping: true,
            stream: true,
            priority: 10.0,
            audio_sample_set: vec![AudioSampleSetEntry::from_file("song.ogg")],
            ..Default::default()
        })
        .unwrap();
    let footstep = engine
        .register_collection(SoundCollectionDef {
            name: "footstep".to_string(),
            bus: "sfx".to_string(),
            mode: AttenuationMode::Positional,
            roll_out_radius: 8.0,
            max_audible_radius: 16.0,
            audio_sample_set: vec![
                AudioSampleSetEntry::from_file("step1.wav"),
                AudioSampleSetEntry::from_file("step2.wav"),
                AudioSampleSetEntry::from_file("step3.wav"),
            ],
            ..Default::default()
        })
        .unwrap();
    let voice_line = engine
        .register_collection(SoundCollectionDef {
            name: "voice_line".to_string(),
            bus: "voice".to_string(),
            priority: 20.0,
            audio_sample_set: vec![AudioSampleSetEntry::from_file("line.wav")],
            ..Default::default()
        })
        .unwrap();

    let listener = engine.add_listener().expect("listener pool is empty");
    engine.set_listener_orientation(listener, Vec3::ZERO, Vec3::Y, Vec3::Z);

    engine.play(song);

    let music_bus = engine.find_bus("music").expect("music bus exists");
    let dt = 1.0 / 60.0;
    let mut spoken = false;

    for frame in 0..240u32 {
        let time = frame as f32 * dt;

        // A footstep every quarter second, walking a circle around the
        // listener.
        if frame % 15 == 0 {
            let angle = time * 1.5;
            let position = Vec3::new(angle.cos() * 4.0, angle.sin() * 4.0, 0.0);
            engine.play_at(footstep, position);
        }

        // One voice line at the two-second mark.
        if time >= 2.0 && !spoken {
            engine.play(voice_line);
            spoken = true;
        }

        engine.advance_frame(dt);

        if frame % 30 == 0 {
            println!(
                "t={time:4.2}s voices={:2} music_gain={:.3}",
                engine.active_channel_count(),
                engine.bus_final_gain(music_bus),
            );
        }
    }

    println!(
        "done: {} voices still scheduled after {} frames",
        engine.active_channel_count(),
        engine.current_frame()
    );
}
