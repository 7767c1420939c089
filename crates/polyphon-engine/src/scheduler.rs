//! Voice scheduling
//!
//! The scheduler owns the channel arena and the three lists threaded
//! through it: the priority-ordered playing list and the real/virtual
//! free lists. It decides admission when a play is requested, evicts the
//! lowest-priority voice when the pools run dry, and reshuffles mixer
//! slots between voices every frame as priorities move.

use glam::{Vec2, Vec3};

use polyphon_core::{AttenuationMode, SoundCollectionDef};

use crate::backend::Mixer;
use crate::bank::SoundRegistry;
use crate::bus::BusGraph;
use crate::channel::{transfer_backing, Channel, ChannelId, Lifecycle};
use crate::collection::SoundHandle;
use crate::gain::{distance_attenuation, pan_from_listener_space};
use crate::list::{Hook, IndexList};
use crate::listener::ListenerPool;

/// Fade length used by `stop` to avoid clicks, in milliseconds.
const STOP_FADE_MS: u32 = 10;

/// Where a new voice lands in the playing list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum InsertPos {
    /// Highest priority: in front of the current head.
    Front,
    /// Immediately after this node.
    After(u32),
}

/// Gain and pan for a collection at a location, before the per-sample
/// gain is known. Positional collections with no listener are silent.
pub(crate) fn compute_gain_pan(
    def: &SoundCollectionDef,
    location: Vec3,
    listeners: &ListenerPool,
    user_gain: f32,
) -> (f32, Vec2) {
    let base = def.gain * user_gain;
    match def.mode {
        AttenuationMode::Positional => match listeners.nearest(location) {
            Some(nearest) => (
                base * distance_attenuation(nearest.distance_squared, def),
                pan_from_listener_space(nearest.listener_space),
            ),
            None => (0.0, Vec2::ZERO),
        },
        AttenuationMode::Nonpositional => (base, Vec2::ZERO),
    }
}

pub(crate) struct VoiceScheduler {
    channels: Vec<Channel>,
    /// Scheduled voices, descending priority.
    playing: IndexList,
    /// Idle channels that own a mixer slot.
    free_real: IndexList,
    /// Idle channels with no slot.
    free_virtual: IndexList,
}

impl VoiceScheduler {
    /// Builds the arena: the first `real` channels each own one mixer
    /// slot, the rest are virtual-only until a swap hands them one.
    pub fn new(real: usize, virtual_count: usize) -> Self {
        let total = real + virtual_count;
        let mut channels: Vec<Channel> = (0..total).map(|_| Channel::default()).collect();
        let playing = IndexList::new(Hook::Priority);
        let mut free_real = IndexList::new(Hook::Free);
        let mut free_virtual = IndexList::new(Hook::Free);
        for index in 0..total as u32 {
            if (index as usize) < real {
                channels[index as usize].backing = Some(crate::backend::SlotId(index));
                free_real.push_front(&mut channels, index);
            } else {
                free_virtual.push_front(&mut channels, index);
            }
        }
        Self {
            channels,
            playing,
            free_real,
            free_virtual,
        }
    }

    // ─── handle resolution ─────────────────────────────────────────────

    /// Resolves a channel handle against the current generation.
    pub fn resolve(&self, id: ChannelId) -> Option<u32> {
        let channel = self.channels.get(id.index as usize)?;
        let live = channel.generation == id.generation && channel.lifecycle != Lifecycle::Stopped;
        live.then_some(id.index)
    }

    pub fn channel(&self, index: u32) -> &Channel {
        &self.channels[index as usize]
    }

    pub fn channel_mut(&mut self, index: u32) -> &mut Channel {
        &mut self.channels[index as usize]
    }

    pub fn playing_count(&self) -> usize {
        self.playing.len()
    }

    pub fn playing_indices(&self) -> Vec<u32> {
        self.playing.collect(&self.channels)
    }

    // ─── admission ─────────────────────────────────────────────────────

    /// Scans from the tail for the first strictly higher priority node;
    /// the newcomer goes just after it. Equal-priority voices therefore
    /// insert in front of their peers, so the newest survives eviction.
    fn find_insertion_point(&self, priority: f32) -> InsertPos {
        let mut cursor = self.playing.tail();
        while let Some(index) = cursor {
            if self.channels[index as usize].priority() > priority {
                return InsertPos::After(index);
            }
            cursor = self.playing.prev_of(&self.channels, index);
        }
        InsertPos::Front
    }

    fn insert_at(&mut self, pos: InsertPos, index: u32) {
        match pos {
            InsertPos::Front => self.playing.push_front(&mut self.channels, index),
            InsertPos::After(at) => self.playing.insert_after(&mut self.channels, at, index),
        }
    }

    /// Requests playback of `sound`. Returns `None` when the request is
    /// refused (no channel beats the newcomer's priority), the backend
    /// refuses to start, or the collection has nothing to play.
    #[allow(clippy::too_many_arguments)]
    pub fn play(
        &mut self,
        sound: SoundHandle,
        location: Vec3,
        user_gain: f32,
        paused: bool,
        mixer: &mut dyn Mixer,
        buses: &mut BusGraph,
        registry: &mut SoundRegistry,
        listeners: &ListenerPool,
    ) -> Option<ChannelId> {
        let Some(collection) = registry.get(sound) else {
            log::warn!("play: stale or unknown sound handle");
            return None;
        };
        let def = collection.def();
        let name = def.name.clone();
        let stream = def.stream;
        let looping = def.looping;
        let base_priority = def.priority;
        let bus = collection.bus();
        let (gain, pan) = compute_gain_pan(def, location, listeners, user_gain);
        let priority = gain * base_priority;

        // The backend's stream slots are scarce; a new stream displaces
        // the playing one regardless of priority.
        if stream {
            self.displace_streams(mixer, buses);
        }

        let insert_pos = self.find_insertion_point(priority);

        let index = if !paused && !self.free_real.is_empty() {
            self.free_real.pop_front(&mut self.channels).unwrap()
        } else if !self.free_virtual.is_empty() {
            self.free_virtual.pop_front(&mut self.channels).unwrap()
        } else {
            // Both pools are dry: evict the lowest-priority voice,
            // unless the newcomer would itself be the lowest.
            let tail = self.playing.tail()?;
            if insert_pos == InsertPos::After(tail) {
                log::debug!("play \"{name}\" refused: below every playing channel");
                return None;
            }
            self.channels[tail as usize].halt(mixer);
            self.unlink(tail, buses);
            self.retire(tail);
            tail
        };

        self.insert_at(insert_pos, index);

        let Some(sample) = registry
            .get_mut(sound)
            .expect("collection checked above")
            .select()
        else {
            log::error!("play: collection \"{name}\" has no loadable samples");
            self.playing.remove(&mut self.channels, index);
            self.push_free(index);
            return None;
        };

        let channel = &mut self.channels[index as usize];
        channel.lifecycle = Lifecycle::Playing;
        channel.collection = Some(sound.index);
        channel.bus = bus;
        channel.user_gain = user_gain;
        channel.gain = gain * sample.gain();
        channel.pan = pan;
        channel.location = location;
        channel.looping = looping;
        channel.stream = stream;
        channel.base_priority = base_priority;
        channel.sample = Some(sample);

        buses
            .state_mut(bus)
            .playing
            .push_front(&mut self.channels, index);

        if !paused {
            if !self.channels[index as usize].start(mixer) {
                log::error!("play: backend refused to start \"{name}\"");
                self.release(index, buses);
                return None;
            }
            let channel = &self.channels[index as usize];
            if let Some(slot) = channel.backing {
                mixer.set_gain(slot, channel.gain * buses.final_gain(bus));
                mixer.set_pan(slot, channel.pan);
            }
        } else if self.channels[index as usize].is_real() {
            // Admitted while the engine is paused on a slot-owning
            // channel (eviction reuse): park the slot paused so the
            // engine-wide resume picks it up.
            if self.channels[index as usize].start(mixer) {
                let slot = self.channels[index as usize].backing.unwrap();
                mixer.pause(slot);
            }
        }

        Some(ChannelId {
            index,
            generation: self.channels[index as usize].generation,
        })
    }

    /// Halts enough playing streams to leave room for one more.
    fn displace_streams(&mut self, mixer: &mut dyn Mixer, buses: &mut BusGraph) {
        let capacity = mixer.stream_slots();
        let active: Vec<u32> = self
            .playing
            .collect(&self.channels)
            .into_iter()
            .filter(|&i| self.channels[i as usize].stream)
            .collect();
        if active.len() + 1 <= capacity {
            return;
        }
        let excess = active.len() + 1 - capacity;
        // The playing list is priority-ordered; displace from the back.
        for &index in active.iter().rev().take(excess) {
            log::debug!("displacing stream channel for a new stream");
            self.halt(index, mixer, buses);
        }
    }

    // ─── lifecycle plumbing ────────────────────────────────────────────

    fn unlink(&mut self, index: u32, buses: &mut BusGraph) {
        if self.playing.is_linked(&self.channels, index) {
            self.playing.remove(&mut self.channels, index);
        }
        let bus = self.channels[index as usize].bus;
        let bus_list = &mut buses.state_mut(bus).playing;
        if bus_list.is_linked(&self.channels, index) {
            bus_list.remove(&mut self.channels, index);
        }
    }

    /// Invalidates outstanding handles and clears per-play state.
    fn retire(&mut self, index: u32) {
        let channel = &mut self.channels[index as usize];
        channel.generation = channel.generation.wrapping_add(1);
        channel.clear_play_state();
    }

    fn push_free(&mut self, index: u32) {
        self.retire(index);
        if self.channels[index as usize].is_real() {
            self.free_real.push_front(&mut self.channels, index);
        } else {
            self.free_virtual.push_front(&mut self.channels, index);
        }
    }

    /// Detaches a stopped voice from every list and returns it to the
    /// free list matching its backing.
    fn release(&mut self, index: u32, buses: &mut BusGraph) {
        self.unlink(index, buses);
        self.push_free(index);
    }

    /// Stops a voice immediately.
    pub fn halt(&mut self, index: u32, mixer: &mut dyn Mixer, buses: &mut BusGraph) {
        self.channels[index as usize].halt(mixer);
        self.release(index, buses);
    }

    /// Stops a voice, fading briefly when it is audible to avoid a
    /// click. Faded voices are reaped once the backend finishes.
    pub fn stop(&mut self, index: u32, mixer: &mut dyn Mixer, buses: &mut BusGraph) {
        let audible = match self.channels[index as usize].backing {
            Some(slot) => mixer.gain(slot) > 0.0,
            None => false,
        };
        if audible {
            self.channels[index as usize].fade_out(mixer, STOP_FADE_MS);
        } else {
            self.halt(index, mixer, buses);
        }
    }

    /// Stops every voice playing the given collection (used before the
    /// collection is destroyed).
    pub fn halt_collection(&mut self, collection: u32, mixer: &mut dyn Mixer, buses: &mut BusGraph) {
        for index in self.playing.collect(&self.channels) {
            if self.channels[index as usize].collection == Some(collection) {
                self.halt(index, mixer, buses);
            }
        }
    }

    // ─── per-frame passes ──────────────────────────────────────────────

    /// Probes every scheduled voice and frees the ones whose backend
    /// slot finished since last frame.
    pub fn sweep_finished(&mut self, mixer: &mut dyn Mixer, buses: &mut BusGraph) {
        for index in self.playing.collect(&self.channels) {
            self.channels[index as usize].update_state(mixer);
            if self.channels[index as usize].lifecycle == Lifecycle::Stopped {
                self.release(index, buses);
            }
        }
    }

    /// Recomputes gain and pan for every scheduled voice and pushes the
    /// result (scaled by the bus's final gain) to real slots.
    pub fn refresh(
        &mut self,
        mixer: &mut dyn Mixer,
        buses: &BusGraph,
        registry: &SoundRegistry,
        listeners: &ListenerPool,
    ) {
        for index in self.playing.collect(&self.channels) {
            let channel = &self.channels[index as usize];
            let Some(collection) = channel.collection.and_then(|c| registry.get_by_index(c))
            else {
                continue;
            };
            let sample_gain = channel.sample.as_ref().map(|s| s.gain()).unwrap_or(1.0);
            let (gain, pan) =
                compute_gain_pan(collection.def(), channel.location, listeners, channel.user_gain);
            let gain = gain * sample_gain;

            let channel = &mut self.channels[index as usize];
            channel.gain = gain;
            channel.pan = pan;
            if let Some(slot) = channel.backing {
                mixer.set_gain(slot, gain * buses.final_gain(channel.bus));
                mixer.set_pan(slot, pan);
            }
        }
    }

    /// Stable descending re-sort of the playing list. Stability keeps
    /// newer equal-priority voices in front of older ones.
    pub fn resort(&mut self) {
        let mut order = self.playing.collect(&self.channels);
        order.sort_by(|&a, &b| {
            let pa = self.channels[a as usize].priority();
            let pb = self.channels[b as usize].priority();
            pb.partial_cmp(&pa).unwrap_or(std::cmp::Ordering::Equal)
        });
        self.playing.reorder(&mut self.channels, &order);
    }

    /// Applies the Resume transition to a voice that just regained a
    /// slot: a Paused voice returns to Playing. Voices in other states
    /// have no Resume transition and are left alone.
    fn resume_devirtualized(&mut self, index: u32, mixer: &mut dyn Mixer) {
        if self.channels[index as usize].lifecycle == Lifecycle::Paused {
            self.channels[index as usize].resume(mixer);
        }
    }

    /// Hands mixer slots to the highest-priority voices: free slots
    /// first, then slots stolen from strictly lower-priority voices,
    /// which keep playing virtually in place. A voice that regains a
    /// slot is resumed.
    pub fn rebalance(&mut self, mixer: &mut dyn Mixer) {
        let mut back_cursor = self.playing.tail();
        let mut cursor = self.playing.head();
        while let Some(index) = cursor {
            let next = self.playing.next_of(&self.channels, index);
            if !self.channels[index as usize].is_real() {
                if let Some(free) = self.free_real.pop_front(&mut self.channels) {
                    transfer_backing(&mut self.channels, index, free, mixer);
                    self.free_virtual.push_front(&mut self.channels, free);
                    self.resume_devirtualized(index, mixer);
                } else {
                    let priority = self.channels[index as usize].priority();
                    let donor = loop {
                        let Some(candidate) = back_cursor else {
                            break None;
                        };
                        if candidate == index {
                            break None;
                        }
                        let candidate_channel = &self.channels[candidate as usize];
                        let usable = candidate_channel.is_real()
                            && candidate_channel.priority() < priority;
                        back_cursor = self.playing.prev_of(&self.channels, candidate);
                        if usable {
                            break Some(candidate);
                        }
                    };
                    let Some(donor) = donor else {
                        // Nothing below is both real and lower priority;
                        // no further swap can help anyone.
                        return;
                    };
                    // Silence the donor before its slot restarts with
                    // the new voice. The donor stays scheduled, now
                    // tracked virtually.
                    if let Some(slot) = self.channels[donor as usize].backing {
                        mixer.halt(slot);
                    }
                    transfer_backing(&mut self.channels, index, donor, mixer);
                    self.resume_devirtualized(index, mixer);
                }
            }
            cursor = next;
        }
    }

    /// Engine-wide pause: freezes (or resumes) the backend slot of
    /// every voice that is not itself paused, leaving lifecycles alone
    /// so explicit pauses survive.
    pub fn set_engine_paused(&mut self, paused: bool, mixer: &mut dyn Mixer) {
        for index in self.playing.collect(&self.channels) {
            let channel = &self.channels[index as usize];
            if channel.lifecycle == Lifecycle::Paused {
                continue;
            }
            if let Some(slot) = channel.backing {
                if paused {
                    mixer.pause(slot);
                } else {
                    mixer.resume(slot);
                }
            }
        }
    }

    // ─── bookkeeping checks ────────────────────────────────────────────

    /// Verifies the structural invariants of the arena and lists.
    /// Intended for tests and debug builds.
    pub fn validate(&self, buses: &BusGraph, real_slots: usize) -> Result<(), String> {
        let playing = self.playing.collect(&self.channels);
        let free_real = self.free_real.collect(&self.channels);
        let free_virtual = self.free_virtual.collect(&self.channels);

        // Pool conservation: every channel is in exactly one list.
        let accounted = playing.len() + free_real.len() + free_virtual.len();
        if accounted != self.channels.len() {
            return Err(format!(
                "pool leak: {accounted} channels accounted, arena holds {}",
                self.channels.len()
            ));
        }

        // Free lists hold only stopped channels of the right backing.
        for &index in &free_real {
            let channel = &self.channels[index as usize];
            if !channel.is_real() || channel.lifecycle != Lifecycle::Stopped {
                return Err(format!("channel {index} misfiled in the real free list"));
            }
        }
        for &index in &free_virtual {
            let channel = &self.channels[index as usize];
            if channel.is_real() || channel.lifecycle != Lifecycle::Stopped {
                return Err(format!("channel {index} misfiled in the virtual free list"));
            }
        }

        // Slot conservation and uniqueness.
        let mut slots: Vec<u32> = self
            .channels
            .iter()
            .filter_map(|c| c.backing.map(|s| s.0))
            .collect();
        slots.sort_unstable();
        if slots.len() != real_slots {
            return Err(format!(
                "{} slots held, expected {real_slots}",
                slots.len()
            ));
        }
        if slots.windows(2).any(|w| w[0] == w[1]) {
            return Err("duplicate slot ownership".to_string());
        }

        // Playing list is sorted by non-increasing priority.
        for pair in playing.windows(2) {
            let (a, b) = (pair[0], pair[1]);
            if self.channels[a as usize].priority() < self.channels[b as usize].priority() {
                return Err(format!("priority order violated between {a} and {b}"));
            }
        }

        // Every scheduled voice sits in its bus's list, and bus lists
        // contain only voices scheduled on that bus.
        for &index in &playing {
            let channel = &self.channels[index as usize];
            if channel.lifecycle == Lifecycle::Stopped {
                return Err(format!("stopped channel {index} still scheduled"));
            }
            let bus_list = &buses.state(channel.bus).playing;
            if !bus_list.is_linked(&self.channels, index) {
                return Err(format!("channel {index} missing from bus list"));
            }
        }
        for bus in 0..buses.len() as u32 {
            for index in buses.state(bus).playing.collect(&self.channels) {
                let channel = &self.channels[index as usize];
                if channel.bus != bus || channel.lifecycle == Lifecycle::Stopped {
                    return Err(format!("bus {bus} list holds stray channel {index}"));
                }
            }
        }

        // No virtual voice outranks a real voice below it.
        for (i, &a) in playing.iter().enumerate() {
            if self.channels[a as usize].is_real() {
                continue;
            }
            let pa = self.channels[a as usize].priority();
            for &b in &playing[i + 1..] {
                if self.channels[b as usize].is_real()
                    && self.channels[b as usize].priority() < pa
                {
                    return Err(format!(
                        "virtual channel {a} outranks real channel {b}"
                    ));
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::NullMixer;
    use crate::loader::MemoryLoader;
    use polyphon_core::{AudioSampleSetEntry, BusDef, BusDefList};

    struct Rig {
        mixer: NullMixer,
        buses: BusGraph,
        registry: SoundRegistry,
        listeners: ListenerPool,
        voices: VoiceScheduler,
    }

    impl Rig {
        fn new(real: usize, virtual_count: usize) -> Self {
            let buses = BusGraph::from_defs(&BusDefList {
                buses: vec![BusDef::named("master")],
            })
            .unwrap();
            Self {
                mixer: NullMixer::new(real),
                buses,
                registry: SoundRegistry::new(),
                listeners: ListenerPool::new(1),
                voices: VoiceScheduler::new(real, virtual_count),
            }
        }

        fn add_sound(&mut self, name: &str, priority: f32) -> SoundHandle {
            let mut loader = MemoryLoader::permissive();
            let def = SoundCollectionDef {
                name: name.to_string(),
                priority,
                audio_sample_set: vec![AudioSampleSetEntry::from_file(format!("{name}.wav"))],
                ..Default::default()
            };
            self.registry
                .insert_collection(def, &self.buses, &mut loader)
                .unwrap()
        }

        fn play(&mut self, sound: SoundHandle) -> Option<ChannelId> {
            self.voices.play(
                sound,
                Vec3::ZERO,
                1.0,
                false,
                &mut self.mixer,
                &mut self.buses,
                &mut self.registry,
                &self.listeners,
            )
        }

        fn validate(&self, real: usize) {
            self.voices.validate(&self.buses, real).unwrap();
        }
    }

    #[test]
    fn test_admission_prefers_free_real_channels() {
        let mut rig = Rig::new(2, 2);
        let sound = rig.add_sound("a", 1.0);
        let first = rig.play(sound).unwrap();
        let second = rig.play(sound).unwrap();
        assert!(rig.voices.channel(rig.voices.resolve(first).unwrap()).is_real());
        assert!(rig.voices.channel(rig.voices.resolve(second).unwrap()).is_real());

        // Third play lands on a virtual channel.
        let third = rig.play(sound).unwrap();
        assert!(!rig.voices.channel(rig.voices.resolve(third).unwrap()).is_real());
        rig.validate(2);
    }

    #[test]
    fn test_playing_list_is_priority_ordered() {
        let mut rig = Rig::new(4, 0);
        let low = rig.add_sound("low", 1.0);
        let high = rig.add_sound("high", 5.0);
        let mid = rig.add_sound("mid", 3.0);
        rig.play(low).unwrap();
        rig.play(high).unwrap();
        rig.play(mid).unwrap();

        let order: Vec<f32> = rig
            .voices
            .playing_indices()
            .into_iter()
            .map(|i| rig.voices.channel(i).priority())
            .collect();
        assert_eq!(order, vec![5.0, 3.0, 1.0]);
        rig.validate(4);
    }

    #[test]
    fn test_full_pool_evicts_lowest_priority() {
        let mut rig = Rig::new(1, 0);
        let low = rig.add_sound("low", 1.0);
        let high = rig.add_sound("high", 10.0);

        let first = rig.play(low).unwrap();
        let second = rig.play(high).unwrap();
        // The low-priority voice was evicted; its handle is stale.
        assert!(rig.voices.resolve(first).is_none());
        assert!(rig.voices.resolve(second).is_some());
        rig.validate(1);
    }

    #[test]
    fn test_equal_priority_newcomer_wins_eviction() {
        let mut rig = Rig::new(1, 0);
        let sound = rig.add_sound("tied", 1.0);

        let first = rig.play(sound).unwrap();
        let second = rig.play(sound).unwrap();
        assert!(rig.voices.resolve(first).is_none());
        let index = rig.voices.resolve(second).unwrap();
        assert_eq!(rig.voices.channel(index).lifecycle, Lifecycle::Playing);
        rig.validate(1);
    }

    #[test]
    fn test_lower_priority_refused_when_full() {
        let mut rig = Rig::new(1, 0);
        let high = rig.add_sound("high", 10.0);
        let low = rig.add_sound("low", 1.0);

        let keeper = rig.play(high).unwrap();
        assert!(rig.play(low).is_none());
        assert!(rig.voices.resolve(keeper).is_some());
        rig.validate(1);
    }

    #[test]
    fn test_rebalance_promotes_virtual_when_slot_frees() {
        let mut rig = Rig::new(1, 1);
        let low = rig.add_sound("low", 1.0);
        let high = rig.add_sound("high", 10.0);

        let first = rig.play(low).unwrap();
        let second = rig.play(high).unwrap();
        // The higher-priority newcomer is virtual (no free slot)...
        let second_index = rig.voices.resolve(second).unwrap();
        assert!(!rig.voices.channel(second_index).is_real());

        // ...until rebalance steals the slot from the low voice, which
        // keeps playing virtually.
        rig.voices.resort();
        rig.voices.rebalance(&mut rig.mixer);
        assert!(rig.voices.channel(second_index).is_real());
        let first_index = rig.voices.resolve(first).unwrap();
        assert!(!rig.voices.channel(first_index).is_real());
        assert_eq!(rig.voices.channel(first_index).lifecycle, Lifecycle::Playing);
        rig.validate(1);
    }

    #[test]
    fn test_rebalance_does_not_steal_from_equal_priority() {
        let mut rig = Rig::new(1, 1);
        let sound = rig.add_sound("tied", 2.0);
        let real = rig.play(sound).unwrap();
        let virt = rig.play(sound).unwrap();

        rig.voices.resort();
        rig.voices.rebalance(&mut rig.mixer);

        // Equal priority: the holder keeps its slot.
        let real_index = rig.voices.resolve(real).unwrap();
        let virt_index = rig.voices.resolve(virt).unwrap();
        assert!(rig.voices.channel(real_index).is_real());
        assert!(!rig.voices.channel(virt_index).is_real());
        rig.validate(1);
    }

    #[test]
    fn test_sweep_reaps_finished_voices() {
        let mut rig = Rig::new(1, 0);
        let sound = rig.add_sound("oneshot", 1.0);
        let id = rig.play(sound).unwrap();
        let index = rig.voices.resolve(id).unwrap();
        let slot = rig.voices.channel(index).backing.unwrap();

        rig.mixer.finish(slot);
        rig.voices.sweep_finished(&mut rig.mixer, &mut rig.buses);

        assert!(rig.voices.resolve(id).is_none());
        assert_eq!(rig.voices.playing_count(), 0);
        rig.validate(1);
    }

    #[test]
    fn test_new_stream_displaces_playing_stream() {
        let mut rig = Rig::new(2, 0);
        let mut loader = MemoryLoader::permissive();
        let stream_def = |name: &str| SoundCollectionDef {
            name: name.to_string(),
            stream: true,
            priority: 10.0,
            audio_sample_set: vec![AudioSampleSetEntry::from_file(format!("{name}.ogg"))],
            ..Default::default()
        };
        let music_a = rig
            .registry
            .insert_collection(stream_def("music_a"), &rig.buses, &mut loader)
            .unwrap();
        let music_b = rig
            .registry
            .insert_collection(stream_def("music_b"), &rig.buses, &mut loader)
            .unwrap();

        let first = rig.play(music_a).unwrap();
        let second = rig.play(music_b).unwrap();

        // One stream slot: the old stream is gone even though its
        // priority matched the newcomer's.
        assert!(rig.voices.resolve(first).is_none());
        assert!(rig.voices.resolve(second).is_some());
        rig.validate(2);
    }

    #[test]
    fn test_halt_collection_stops_its_voices_only() {
        let mut rig = Rig::new(4, 0);
        let doomed = rig.add_sound("doomed", 1.0);
        let keeper = rig.add_sound("keeper", 1.0);
        rig.play(doomed).unwrap();
        rig.play(doomed).unwrap();
        let kept = rig.play(keeper).unwrap();

        rig.voices
            .halt_collection(doomed.index, &mut rig.mixer, &mut rig.buses);

        assert_eq!(rig.voices.playing_count(), 1);
        assert!(rig.voices.resolve(kept).is_some());
        rig.validate(4);
    }
}
