//! Engine facade
//!
//! [`AudioEngine`] wires the subsystems together and exposes the public
//! surface: bank loading, playback, per-frame update, and handle-based
//! operations on channels, buses, and listeners. One logical owner
//! drives the engine; nothing here blocks or spawns threads.

use std::path::Path;

use glam::{Mat4, Vec3};

use polyphon_core::{
    AudioConfig, BusDefList, EngineResult, SoundBankDef, SoundCollectionDef,
};

use crate::backend::{Mixer, SlotId};
use crate::bank::SoundRegistry;
use crate::bus::{BusGraph, BusId};
use crate::channel::ChannelId;
use crate::collection::SoundHandle;
use crate::listener::{ListenerId, ListenerPool};
use crate::loader::AssetLoader;
use crate::scheduler::VoiceScheduler;

/// The Polyphon audio engine.
///
/// Owns the channel arena, bus graph, listener pool, and collection
/// registry; drives the mixer backend and asset loader handed in at
/// construction.
pub struct AudioEngine {
    config: AudioConfig,
    mixer: Box<dyn Mixer>,
    loader: Box<dyn AssetLoader>,
    buses: BusGraph,
    listeners: ListenerPool,
    registry: SoundRegistry,
    voices: VoiceScheduler,
    master_gain: f32,
    muted: bool,
    paused: bool,
    current_frame: u64,
}

impl AudioEngine {
    /// Builds an engine from an in-memory configuration and bus list.
    pub fn new(
        config: AudioConfig,
        bus_defs: &BusDefList,
        mixer: Box<dyn Mixer>,
        loader: Box<dyn AssetLoader>,
    ) -> EngineResult<Self> {
        config.validate()?;
        let buses = BusGraph::from_defs(bus_defs)?;
        let listeners = ListenerPool::new(config.listeners as usize);
        let voices = VoiceScheduler::new(
            config.mixer_channels as usize,
            config.mixer_virtual_channels as usize,
        );
        log::debug!(
            "engine up: {} real + {} virtual channels, {} buses",
            config.mixer_channels,
            config.mixer_virtual_channels,
            buses.len()
        );
        Ok(Self {
            config,
            mixer,
            loader,
            buses,
            listeners,
            registry: SoundRegistry::new(),
            voices,
            master_gain: 1.0,
            muted: false,
            paused: false,
            current_frame: 0,
        })
    }

    /// Builds an engine from a configuration file; the bus file named
    /// inside is resolved relative to the configuration's directory.
    pub fn from_config_file<P: AsRef<Path>>(
        path: P,
        mixer: Box<dyn Mixer>,
        loader: Box<dyn AssetLoader>,
    ) -> EngineResult<Self> {
        let path = path.as_ref();
        let config = AudioConfig::load_from(path)?;
        let bus_path = match path.parent() {
            Some(dir) => dir.join(&config.bus_file),
            None => Path::new(&config.bus_file).to_path_buf(),
        };
        let bus_defs = BusDefList::load_from(bus_path)?;
        Self::new(config, &bus_defs, mixer, loader)
    }

    pub fn config(&self) -> &AudioConfig {
        &self.config
    }

    /// Crate version, for host diagnostics.
    pub fn version(&self) -> &'static str {
        env!("CARGO_PKG_VERSION")
    }

    // ═══════════════════════════════════════════════════════════════════
    // FRAME UPDATE
    // ═══════════════════════════════════════════════════════════════════

    /// Advances the engine by `delta_time` seconds: reaps finished
    /// voices, updates the bus graph, recomputes gains and pans,
    /// re-sorts priorities, and reshuffles real/virtual backing.
    pub fn advance_frame(&mut self, delta_time: f32) {
        self.current_frame += 1;
        self.voices
            .sweep_finished(self.mixer.as_mut(), &mut self.buses);
        let master = if self.muted { 0.0 } else { self.master_gain };
        self.buses.advance(delta_time, master);
        self.voices.refresh(
            self.mixer.as_mut(),
            &self.buses,
            &self.registry,
            &self.listeners,
        );
        self.voices.resort();
        if !self.paused {
            self.voices.rebalance(self.mixer.as_mut());
        }
    }

    pub fn current_frame(&self) -> u64 {
        self.current_frame
    }

    // ═══════════════════════════════════════════════════════════════════
    // BANKS AND COLLECTIONS
    // ═══════════════════════════════════════════════════════════════════

    /// Loads a sound bank file, loading or re-referencing every
    /// collection it names. Loading the same bank again only bumps its
    /// reference count.
    pub fn load_sound_bank(&mut self, filename: &str) -> EngineResult<()> {
        if let Some(bank) = self.registry.bank_mut(filename) {
            bank.ref_count += 1;
            return Ok(());
        }
        let def = SoundBankDef::load_from(filename)?;
        let mut loaded: Vec<String> = Vec::new();
        for file in &def.filenames {
            match self
                .registry
                .load_collection_file(file, &self.buses, self.loader.as_mut())
            {
                Ok(_) => loaded.push(file.clone()),
                Err(err) => {
                    log::error!("sound bank \"{filename}\": failed to load \"{file}\": {err}");
                    // Roll back what this bank already referenced.
                    for prior in &loaded {
                        self.release_collection_file(prior);
                    }
                    return Err(err);
                }
            }
        }
        self.registry.insert_bank(filename, def);
        log::debug!("loaded sound bank \"{filename}\"");
        Ok(())
    }

    /// Unloads a sound bank, dropping one reference from each of its
    /// collections and destroying those that reach zero. Unloading a
    /// bank that was never loaded is a contract violation: logged, and
    /// the unload is abandoned.
    pub fn unload_sound_bank(&mut self, filename: &str) {
        let Some(bank) = self.registry.bank_mut(filename) else {
            log::error!("unload_sound_bank: \"{filename}\" is not loaded");
            debug_assert!(false, "unload of a sound bank that was never loaded");
            return;
        };
        bank.ref_count -= 1;
        if bank.ref_count > 0 {
            return;
        }
        let def = self
            .registry
            .remove_bank(filename)
            .expect("bank checked above")
            .def;
        for file in &def.filenames {
            self.release_collection_file(file);
        }
        log::debug!("unloaded sound bank \"{filename}\"");
    }

    /// Drops one reference from the collection behind a definition
    /// file, halting its voices if the collection is destroyed.
    fn release_collection_file(&mut self, filename: &str) {
        if let Some(index) = self.registry.release_file(filename) {
            self.voices
                .halt_collection(index, self.mixer.as_mut(), &mut self.buses);
        }
    }

    /// Registers a collection from an already-parsed definition,
    /// outside any bank. Registering an existing name re-references it.
    pub fn register_collection(&mut self, def: SoundCollectionDef) -> EngineResult<SoundHandle> {
        self.registry
            .insert_collection(def, &self.buses, self.loader.as_mut())
    }

    /// Resolves a collection name to a handle.
    pub fn get_handle(&self, name: &str) -> Option<SoundHandle> {
        self.registry.handle(name)
    }

    /// Resolves a collection-definition filename (as banks reference
    /// collections) to a handle.
    pub fn handle_from_file(&self, filename: &str) -> Option<SoundHandle> {
        self.registry.handle_from_file(filename)
    }

    /// Seeds the sample-selection RNG of one collection, for
    /// reproducible playback.
    pub fn seed_sound(&mut self, sound: SoundHandle, seed: u64) {
        if let Some(collection) = self.registry.get_mut(sound) {
            collection.seed(seed);
        }
    }

    // ═══════════════════════════════════════════════════════════════════
    // LOADER POLLING
    // ═══════════════════════════════════════════════════════════════════

    /// Kicks deferred asset loading.
    pub fn start_loading(&mut self) {
        self.loader.start_loading();
    }

    /// Whether all requested assets are ready to play.
    pub fn try_finalize(&mut self) -> bool {
        self.loader.try_finalize()
    }

    // ═══════════════════════════════════════════════════════════════════
    // PLAYBACK
    // ═══════════════════════════════════════════════════════════════════

    /// Plays a collection at the origin with unit gain.
    pub fn play(&mut self, sound: SoundHandle) -> Option<ChannelId> {
        self.play_with_gain(sound, Vec3::ZERO, 1.0)
    }

    /// Plays a collection at a world location with unit gain.
    pub fn play_at(&mut self, sound: SoundHandle, location: Vec3) -> Option<ChannelId> {
        self.play_with_gain(sound, location, 1.0)
    }

    /// Plays a collection at a world location with a user gain.
    /// Returns `None` when the request is refused or fails.
    pub fn play_with_gain(
        &mut self,
        sound: SoundHandle,
        location: Vec3,
        user_gain: f32,
    ) -> Option<ChannelId> {
        self.voices.play(
            sound,
            location,
            user_gain,
            self.paused,
            self.mixer.as_mut(),
            &mut self.buses,
            &mut self.registry,
            &self.listeners,
        )
    }

    /// Plays a collection by name.
    pub fn play_named(&mut self, name: &str) -> Option<ChannelId> {
        self.play_named_at(name, Vec3::ZERO, 1.0)
    }

    /// Plays a collection by name at a world location with a user gain.
    pub fn play_named_at(
        &mut self,
        name: &str,
        location: Vec3,
        user_gain: f32,
    ) -> Option<ChannelId> {
        match self.get_handle(name) {
            Some(sound) => self.play_with_gain(sound, location, user_gain),
            None => {
                log::warn!("play: no sound collection named \"{name}\"");
                None
            }
        }
    }

    // ═══════════════════════════════════════════════════════════════════
    // CHANNEL OPERATIONS
    // ═══════════════════════════════════════════════════════════════════

    fn resolve_channel(&self, id: ChannelId, op: &str) -> Option<u32> {
        let index = self.voices.resolve(id);
        if index.is_none() {
            log::warn!("{op}: stale channel handle");
        }
        index
    }

    /// Whether the handle still refers to a live voice.
    pub fn channel_valid(&self, id: ChannelId) -> bool {
        self.voices.resolve(id).is_some()
    }

    /// Whether the voice is playing (or fading out). Virtual voices
    /// count: they are playing, just not audible.
    pub fn channel_playing(&self, id: ChannelId) -> bool {
        match self.voices.resolve(id) {
            Some(index) => self.voices.channel(index).is_audible_state(),
            None => false,
        }
    }

    /// Stops a voice, fading briefly when audible to avoid a click.
    pub fn stop_channel(&mut self, id: ChannelId) {
        if let Some(index) = self.resolve_channel(id, "stop_channel") {
            self.voices
                .stop(index, self.mixer.as_mut(), &mut self.buses);
        }
    }

    /// Stops a voice immediately.
    pub fn halt_channel(&mut self, id: ChannelId) {
        if let Some(index) = self.resolve_channel(id, "halt_channel") {
            self.voices
                .halt(index, self.mixer.as_mut(), &mut self.buses);
        }
    }

    /// Fades a voice out over `milliseconds`; it is reaped once the
    /// backend reports the fade finished.
    pub fn fade_out_channel(&mut self, id: ChannelId, milliseconds: u32) {
        if let Some(index) = self.resolve_channel(id, "fade_out_channel") {
            self.voices
                .channel_mut(index)
                .fade_out(self.mixer.as_mut(), milliseconds);
        }
    }

    pub fn pause_channel(&mut self, id: ChannelId) {
        if let Some(index) = self.resolve_channel(id, "pause_channel") {
            self.voices.channel_mut(index).pause(self.mixer.as_mut());
        }
    }

    pub fn resume_channel(&mut self, id: ChannelId) {
        if let Some(index) = self.resolve_channel(id, "resume_channel") {
            self.voices.channel_mut(index).resume(self.mixer.as_mut());
        }
    }

    pub fn channel_location(&self, id: ChannelId) -> Option<Vec3> {
        self.voices
            .resolve(id)
            .map(|index| self.voices.channel(index).location)
    }

    pub fn set_channel_location(&mut self, id: ChannelId, location: Vec3) {
        if let Some(index) = self.resolve_channel(id, "set_channel_location") {
            self.voices.channel_mut(index).location = location;
        }
    }

    /// The voice's user gain (not the computed gain).
    pub fn channel_gain(&self, id: ChannelId) -> Option<f32> {
        self.voices
            .resolve(id)
            .map(|index| self.voices.channel(index).user_gain)
    }

    /// Sets the voice's user gain; the audible gain follows at the next
    /// frame's recompute.
    pub fn set_channel_gain(&mut self, id: ChannelId, gain: f32) {
        if let Some(index) = self.resolve_channel(id, "set_channel_gain") {
            self.voices.channel_mut(index).user_gain = gain;
        }
    }

    /// The mixer slot backing the voice, or `None` while it is virtual.
    pub fn channel_slot(&self, id: ChannelId) -> Option<SlotId> {
        self.voices
            .resolve(id)
            .and_then(|index| self.voices.channel(index).backing)
    }

    /// Number of scheduled (playing, paused, or fading) voices.
    pub fn active_channel_count(&self) -> usize {
        self.voices.playing_count()
    }

    // ═══════════════════════════════════════════════════════════════════
    // BUS OPERATIONS
    // ═══════════════════════════════════════════════════════════════════

    /// Finds a bus by name.
    pub fn find_bus(&self, name: &str) -> Option<BusId> {
        self.buses.find(name)
    }

    /// The bus's user gain.
    pub fn bus_gain(&self, bus: BusId) -> f32 {
        self.buses.user_gain(bus)
    }

    /// Sets the bus's user gain immediately, cancelling any fade.
    pub fn set_bus_gain(&mut self, bus: BusId, gain: f32) {
        self.buses.set_user_gain(bus, gain);
    }

    /// Fades the bus's user gain to `gain` over `duration` seconds.
    pub fn bus_fade_to(&mut self, bus: BusId, gain: f32, duration: f32) {
        self.buses.fade_to(bus, gain, duration);
    }

    /// The bus's folded gain as of the last `advance_frame`.
    pub fn bus_final_gain(&self, bus: BusId) -> f32 {
        self.buses.final_gain(bus.0)
    }

    // ═══════════════════════════════════════════════════════════════════
    // LISTENERS
    // ═══════════════════════════════════════════════════════════════════

    /// Acquires a listener from the pool, at the identity pose.
    pub fn add_listener(&mut self) -> Option<ListenerId> {
        self.listeners.add()
    }

    /// Returns a listener to the pool; its handle goes stale.
    pub fn remove_listener(&mut self, id: ListenerId) {
        if !self.listeners.remove(id) {
            log::warn!("remove_listener: stale listener handle");
        }
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.active_count()
    }

    pub fn listener_location(&self, id: ListenerId) -> Option<Vec3> {
        self.listeners.get(id).map(|listener| listener.location())
    }

    pub fn set_listener_location(&mut self, id: ListenerId, location: Vec3) {
        match self.listeners.get_mut(id) {
            Some(listener) => listener.set_location(location),
            None => log::warn!("set_listener_location: stale listener handle"),
        }
    }

    /// Poses the listener at `location` facing `forward`.
    pub fn set_listener_orientation(
        &mut self,
        id: ListenerId,
        location: Vec3,
        forward: Vec3,
        up: Vec3,
    ) {
        match self.listeners.get_mut(id) {
            Some(listener) => listener.set_orientation(location, forward, up),
            None => log::warn!("set_listener_orientation: stale listener handle"),
        }
    }

    pub fn listener_matrix(&self, id: ListenerId) -> Option<Mat4> {
        self.listeners.get(id).map(|listener| listener.matrix())
    }

    pub fn set_listener_matrix(&mut self, id: ListenerId, matrix: Mat4) {
        match self.listeners.get_mut(id) {
            Some(listener) => listener.set_matrix(matrix),
            None => log::warn!("set_listener_matrix: stale listener handle"),
        }
    }

    // ═══════════════════════════════════════════════════════════════════
    // MASTER CONTROLS
    // ═══════════════════════════════════════════════════════════════════

    /// Sets the master gain, clamped to [0, 1].
    pub fn set_master_gain(&mut self, gain: f32) {
        self.master_gain = gain.clamp(0.0, 1.0);
    }

    pub fn master_gain(&self) -> f32 {
        self.master_gain
    }

    pub fn set_mute(&mut self, muted: bool) {
        self.muted = muted;
    }

    pub fn muted(&self) -> bool {
        self.muted
    }

    /// Pauses or resumes the whole engine. Only backend playback is
    /// suspended; lifecycles are preserved so explicitly paused voices
    /// stay paused across an engine-level resume.
    pub fn pause(&mut self, paused: bool) {
        if self.paused == paused {
            return;
        }
        self.paused = paused;
        self.voices.set_engine_paused(paused, self.mixer.as_mut());
    }

    pub fn paused(&self) -> bool {
        self.paused
    }

    // ═══════════════════════════════════════════════════════════════════
    // DIAGNOSTICS
    // ═══════════════════════════════════════════════════════════════════

    /// Panics if the engine's internal bookkeeping invariants do not
    /// hold. Intended for tests and debug builds.
    pub fn check_consistency(&self) {
        if let Err(message) = self
            .voices
            .validate(&self.buses, self.config.mixer_channels as usize)
        {
            panic!("engine consistency violated: {message}");
        }
    }
}
