//! Mixer backend interface
//!
//! The engine never mixes audio itself. It drives a [`Mixer`]: a sink
//! exposing a fixed set of real channel slots that can each play one
//! sample at a time. Slot ownership is managed entirely by the engine;
//! the backend only ever sees one voice per slot.

use std::cell::RefCell;
use std::rc::Rc;

use glam::Vec2;

use crate::sample::Sample;

/// Identifier of one backend slot. Slots are numbered `0..slot_count`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SlotId(pub u32);

impl SlotId {
    /// Slot index as a usize, for table lookups.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Parameters for starting playback on a slot.
#[derive(Debug, Clone, Copy)]
pub struct StartParams {
    /// Loop forever instead of playing once.
    pub looping: bool,
    /// Demand-read the sample instead of playing a decoded buffer.
    pub stream: bool,
}

/// A mixer backend: the sink the engine pushes voices into.
///
/// Contract notes:
/// - `start` returns false when the backend cannot begin playback; the
///   engine treats that as a failed play and recycles the voice.
/// - `is_playing` reports whether the slot is occupied by an unfinished
///   sample. A paused slot is still "playing" in this sense; the engine
///   relies on that to keep paused voices alive across frames.
/// - `start` on a slot implicitly stops whatever the slot was playing.
pub trait Mixer {
    /// Begins playback of `sample` on `slot`.
    fn start(&mut self, slot: SlotId, sample: &Sample, params: StartParams) -> bool;

    /// Stops the slot immediately. May click; the engine fades when it
    /// can afford to.
    fn halt(&mut self, slot: SlotId);

    /// Freezes playback on the slot.
    fn pause(&mut self, slot: SlotId);

    /// Continues playback on a paused slot.
    fn resume(&mut self, slot: SlotId);

    /// Sets the slot's linear gain.
    fn set_gain(&mut self, slot: SlotId, gain: f32);

    /// Reads the slot's linear gain back.
    fn gain(&self, slot: SlotId) -> f32;

    /// Sets the slot's stereo pan from a unit-disc vector; the first
    /// component maps -1..+1 to left/right equal-power pan.
    fn set_pan(&mut self, slot: SlotId, pan: Vec2);

    /// Whether the slot holds an unfinished sample (paused counts).
    fn is_playing(&self, slot: SlotId) -> bool;

    /// Fades the slot to silence over `milliseconds`, then finishes it.
    fn fade_out(&mut self, slot: SlotId, milliseconds: u32);

    /// Number of simultaneous streamed samples the backend supports.
    fn stream_slots(&self) -> usize {
        1
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// NULL MIXER
// ═══════════════════════════════════════════════════════════════════════════

/// Per-slot state tracked by [`NullMixer`].
#[derive(Debug, Clone, Default)]
struct NullSlot {
    sample: Option<String>,
    active: bool,
    paused: bool,
    fading: bool,
    looping: bool,
    gain: f32,
    pan: Vec2,
    start_count: u32,
}

#[derive(Debug)]
struct NullMixerState {
    slots: Vec<NullSlot>,
    stream_slots: usize,
}

/// A state-tracking mixer that produces no audio.
///
/// The reference backend for tests and headless runs: every operation
/// updates bookkeeping that can be inspected afterwards, and
/// [`NullMixer::finish`] simulates a sample reaching its natural end.
/// Clones share state, so a host can hand one clone to the engine and
/// keep another for inspection.
#[derive(Debug, Clone)]
pub struct NullMixer {
    inner: Rc<RefCell<NullMixerState>>,
}

impl NullMixer {
    /// Creates a mixer with `slot_count` slots and one stream slot.
    pub fn new(slot_count: usize) -> Self {
        Self {
            inner: Rc::new(RefCell::new(NullMixerState {
                slots: vec![NullSlot::default(); slot_count],
                stream_slots: 1,
            })),
        }
    }

    /// Overrides the advertised stream slot count.
    pub fn with_stream_slots(self, stream_slots: usize) -> Self {
        self.inner.borrow_mut().stream_slots = stream_slots;
        self
    }

    /// Simulates the sample on `slot` finishing naturally.
    pub fn finish(&self, slot: SlotId) {
        let mut inner = self.inner.borrow_mut();
        let slot = &mut inner.slots[slot.index()];
        slot.active = false;
        slot.paused = false;
        slot.fading = false;
    }

    /// Filename of the sample most recently started on `slot`.
    pub fn started_sample(&self, slot: SlotId) -> Option<String> {
        self.inner.borrow().slots[slot.index()].sample.clone()
    }

    /// Whether the slot is currently paused.
    pub fn is_paused(&self, slot: SlotId) -> bool {
        self.inner.borrow().slots[slot.index()].paused
    }

    /// Whether the slot is fading to silence.
    pub fn is_fading(&self, slot: SlotId) -> bool {
        self.inner.borrow().slots[slot.index()].fading
    }

    /// The pan last pushed to `slot`.
    pub fn pan(&self, slot: SlotId) -> Vec2 {
        self.inner.borrow().slots[slot.index()].pan
    }

    /// How many times `start` has been called on `slot`.
    pub fn start_count(&self, slot: SlotId) -> u32 {
        self.inner.borrow().slots[slot.index()].start_count
    }
}

impl Mixer for NullMixer {
    fn start(&mut self, slot: SlotId, sample: &Sample, params: StartParams) -> bool {
        let mut inner = self.inner.borrow_mut();
        let slot = &mut inner.slots[slot.index()];
        slot.sample = Some(sample.filename().to_string());
        slot.active = true;
        slot.paused = false;
        slot.fading = false;
        slot.looping = params.looping;
        slot.start_count += 1;
        true
    }

    fn halt(&mut self, slot: SlotId) {
        let mut inner = self.inner.borrow_mut();
        let slot = &mut inner.slots[slot.index()];
        slot.active = false;
        slot.paused = false;
        slot.fading = false;
    }

    fn pause(&mut self, slot: SlotId) {
        self.inner.borrow_mut().slots[slot.index()].paused = true;
    }

    fn resume(&mut self, slot: SlotId) {
        self.inner.borrow_mut().slots[slot.index()].paused = false;
    }

    fn set_gain(&mut self, slot: SlotId, gain: f32) {
        self.inner.borrow_mut().slots[slot.index()].gain = gain;
    }

    fn gain(&self, slot: SlotId) -> f32 {
        self.inner.borrow().slots[slot.index()].gain
    }

    fn set_pan(&mut self, slot: SlotId, pan: Vec2) {
        self.inner.borrow_mut().slots[slot.index()].pan = pan;
    }

    fn is_playing(&self, slot: SlotId) -> bool {
        self.inner.borrow().slots[slot.index()].active
    }

    fn fade_out(&mut self, slot: SlotId, _milliseconds: u32) {
        self.inner.borrow_mut().slots[slot.index()].fading = true;
    }

    fn stream_slots(&self) -> usize {
        self.inner.borrow().stream_slots
    }
}
