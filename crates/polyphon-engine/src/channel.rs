//! Per-voice channel state
//!
//! A channel is the authoritative record of one playing sound. Its
//! lifecycle (stopped / playing / paused / fading out) is tracked
//! engine-side because not every channel is backed by a mixer slot:
//! virtual channels keep their full state while producing no audio, and
//! backing can move between channels as priorities shift.

use glam::{Vec2, Vec3};

use crate::backend::{Mixer, SlotId, StartParams};
use crate::list::{Hook, Link, Linked, HOOK_COUNT};
use crate::sample::Sample;

/// Handle to a playing (or formerly playing) channel.
///
/// Handles are generation-checked: once the voice stops and its arena
/// slot is recycled, old handles go stale and every operation on them is
/// a logged no-op.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChannelId {
    pub(crate) index: u32,
    pub(crate) generation: u32,
}

/// Lifecycle of a voice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Lifecycle {
    /// Not scheduled; parked on a free list.
    #[default]
    Stopped,
    /// Scheduled and audible (if real) or tracked (if virtual).
    Playing,
    /// Scheduled but frozen.
    Paused,
    /// Ramping to silence; reaped once the backend reports it done.
    FadingOut,
}

/// One voice in the channel arena.
#[derive(Debug, Default)]
pub(crate) struct Channel {
    pub generation: u32,
    pub lifecycle: Lifecycle,
    /// The mixer slot this channel owns, if any. `None` means virtual.
    pub backing: Option<SlotId>,
    /// Registry slot of the collection being played.
    pub collection: Option<u32>,
    /// The sample chosen from the collection's set.
    pub sample: Option<Sample>,
    /// Bus the collection plays on; valid while `collection` is set.
    pub bus: u32,
    pub user_gain: f32,
    /// Computed gain: collection gain x sample gain x user gain x
    /// distance attenuation. Bus gain is applied on the way to the
    /// backend, not here.
    pub gain: f32,
    pub pan: Vec2,
    pub location: Vec3,
    pub looping: bool,
    pub stream: bool,
    /// Collection priority multiplier, cached at play time.
    pub base_priority: f32,
    links: [Link; HOOK_COUNT],
}

impl Linked for Channel {
    fn link(&self, hook: Hook) -> &Link {
        &self.links[hook as usize]
    }
    fn link_mut(&mut self, hook: Hook) -> &mut Link {
        &mut self.links[hook as usize]
    }
}

impl Channel {
    pub fn is_real(&self) -> bool {
        self.backing.is_some()
    }

    /// Scheduling priority: computed gain times the collection's
    /// priority multiplier.
    pub fn priority(&self) -> f32 {
        self.gain * self.base_priority
    }

    /// Whether this voice counts as audible from the host's view.
    pub fn is_audible_state(&self) -> bool {
        matches!(self.lifecycle, Lifecycle::Playing | Lifecycle::FadingOut)
    }

    fn start_params(&self) -> StartParams {
        StartParams {
            looping: self.looping,
            stream: self.stream,
        }
    }

    /// Starts the backend slot for this channel's chosen sample.
    /// Virtual channels trivially succeed. A missing sample fails.
    pub fn start(&mut self, mixer: &mut dyn Mixer) -> bool {
        let Some(sample) = self.sample.as_ref() else {
            return false;
        };
        match self.backing {
            Some(slot) => mixer.start(slot, sample, self.start_params()),
            None => true,
        }
    }

    /// Stops the backend slot immediately and marks the voice stopped.
    pub fn halt(&mut self, mixer: &mut dyn Mixer) {
        if let Some(slot) = self.backing {
            mixer.halt(slot);
        }
        self.lifecycle = Lifecycle::Stopped;
    }

    pub fn pause(&mut self, mixer: &mut dyn Mixer) {
        if let Some(slot) = self.backing {
            mixer.pause(slot);
        }
        self.lifecycle = Lifecycle::Paused;
    }

    pub fn resume(&mut self, mixer: &mut dyn Mixer) {
        if let Some(slot) = self.backing {
            mixer.resume(slot);
        }
        self.lifecycle = Lifecycle::Playing;
    }

    /// Begins a backend fade; the voice is reaped at a later frame when
    /// the backend reports the slot finished. Virtual channels have
    /// nothing to fade and are reaped at the next frame.
    pub fn fade_out(&mut self, mixer: &mut dyn Mixer, milliseconds: u32) {
        if let Some(slot) = self.backing {
            mixer.fade_out(slot, milliseconds);
        }
        self.lifecycle = Lifecycle::FadingOut;
    }

    /// Frame probe: demotes the voice to Stopped when the backend says
    /// its slot finished. Virtual playing channels never finish on
    /// their own (nothing tracks their progress); virtual fade-outs
    /// finish immediately.
    pub fn update_state(&mut self, mixer: &dyn Mixer) {
        match self.lifecycle {
            Lifecycle::Stopped | Lifecycle::Paused => {}
            Lifecycle::Playing => {
                if let Some(slot) = self.backing {
                    if !mixer.is_playing(slot) {
                        self.lifecycle = Lifecycle::Stopped;
                    }
                }
            }
            Lifecycle::FadingOut => {
                let finished = match self.backing {
                    Some(slot) => !mixer.is_playing(slot),
                    None => true,
                };
                if finished {
                    self.lifecycle = Lifecycle::Stopped;
                }
            }
        }
    }

    /// Clears per-play state when the voice returns to a free list.
    /// The backing stays: it belongs to the channel object, not to the
    /// play.
    pub fn clear_play_state(&mut self) {
        self.lifecycle = Lifecycle::Stopped;
        self.collection = None;
        self.sample = None;
        self.user_gain = 0.0;
        self.gain = 0.0;
        self.pan = Vec2::ZERO;
        self.location = Vec3::ZERO;
        self.looping = false;
        self.stream = false;
        self.base_priority = 0.0;
    }
}

/// Moves the mixer slot from `source` to `target` and restarts playback
/// according to the target's lifecycle (start, or start-then-pause for
/// paused voices). The swap is atomic from the engine's perspective:
/// nothing observes a slot owned by both or neither.
pub(crate) fn transfer_backing(
    channels: &mut [Channel],
    target: u32,
    source: u32,
    mixer: &mut dyn Mixer,
) {
    debug_assert_ne!(target, source);
    debug_assert!(channels[source as usize].backing.is_some());
    debug_assert!(channels[target as usize].backing.is_none());

    let slot = channels[source as usize].backing.take();
    let target = &mut channels[target as usize];
    target.backing = slot;

    match target.lifecycle {
        Lifecycle::Playing => {
            if !target.start(mixer) {
                log::warn!(
                    "backend refused restart of \"{}\" during devirtualization",
                    target.sample.as_ref().map(|s| s.filename()).unwrap_or("?")
                );
            }
        }
        Lifecycle::Paused => {
            // The slot has to be playing before it can be paused.
            if target.start(mixer) {
                if let Some(slot) = target.backing {
                    mixer.pause(slot);
                }
            }
        }
        Lifecycle::Stopped | Lifecycle::FadingOut => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::NullMixer;

    fn playing_channel(slot: Option<SlotId>) -> Channel {
        Channel {
            backing: slot,
            sample: Some(Sample::streamed("test.wav", 1.0)),
            lifecycle: Lifecycle::Playing,
            user_gain: 1.0,
            gain: 1.0,
            base_priority: 1.0,
            ..Default::default()
        }
    }

    #[test]
    fn test_real_channel_drives_backend() {
        let mut mixer = NullMixer::new(1);
        let mut channel = playing_channel(Some(SlotId(0)));

        assert!(channel.start(&mut mixer));
        assert!(mixer.is_playing(SlotId(0)));

        channel.pause(&mut mixer);
        assert_eq!(channel.lifecycle, Lifecycle::Paused);
        assert!(mixer.is_paused(SlotId(0)));

        channel.resume(&mut mixer);
        assert_eq!(channel.lifecycle, Lifecycle::Playing);

        channel.halt(&mut mixer);
        assert_eq!(channel.lifecycle, Lifecycle::Stopped);
        assert!(!mixer.is_playing(SlotId(0)));
    }

    #[test]
    fn test_virtual_channel_tracks_lifecycle_without_backend() {
        let mut mixer = NullMixer::new(1);
        let mut channel = playing_channel(None);

        assert!(channel.start(&mut mixer));
        assert!(!mixer.is_playing(SlotId(0)));

        channel.pause(&mut mixer);
        assert_eq!(channel.lifecycle, Lifecycle::Paused);
        channel.resume(&mut mixer);
        channel.halt(&mut mixer);
        assert_eq!(channel.lifecycle, Lifecycle::Stopped);
    }

    #[test]
    fn test_update_state_reaps_finished_real_channel() {
        let mut mixer = NullMixer::new(1);
        let mut channel = playing_channel(Some(SlotId(0)));
        channel.start(&mut mixer);

        channel.update_state(&mixer);
        assert_eq!(channel.lifecycle, Lifecycle::Playing);

        mixer.finish(SlotId(0));
        channel.update_state(&mixer);
        assert_eq!(channel.lifecycle, Lifecycle::Stopped);
    }

    #[test]
    fn test_update_state_reaps_virtual_fade_out_immediately() {
        let mut mixer = NullMixer::new(1);
        let mut channel = playing_channel(None);
        channel.fade_out(&mut mixer, 250);
        channel.update_state(&mixer);
        assert_eq!(channel.lifecycle, Lifecycle::Stopped);
    }

    #[test]
    fn test_paused_channel_survives_update_state() {
        let mut mixer = NullMixer::new(1);
        let mut channel = playing_channel(Some(SlotId(0)));
        channel.start(&mut mixer);
        channel.pause(&mut mixer);
        channel.update_state(&mixer);
        assert_eq!(channel.lifecycle, Lifecycle::Paused);
    }

    #[test]
    fn test_transfer_backing_restarts_playing_target() {
        let mut mixer = NullMixer::new(1);
        let mut channels = vec![playing_channel(None), playing_channel(Some(SlotId(0)))];
        channels[0].sample = Some(Sample::streamed("promoted.wav", 1.0));

        transfer_backing(&mut channels, 0, 1, &mut mixer);

        assert_eq!(channels[0].backing, Some(SlotId(0)));
        assert!(channels[1].backing.is_none());
        assert_eq!(
            mixer.started_sample(SlotId(0)).as_deref(),
            Some("promoted.wav")
        );
    }

    #[test]
    fn test_transfer_backing_to_paused_target_starts_then_pauses() {
        let mut mixer = NullMixer::new(1);
        let mut channels = vec![playing_channel(None), playing_channel(Some(SlotId(0)))];
        channels[0].lifecycle = Lifecycle::Paused;

        transfer_backing(&mut channels, 0, 1, &mut mixer);

        assert!(mixer.is_playing(SlotId(0)));
        assert!(mixer.is_paused(SlotId(0)));
        assert_eq!(channels[0].lifecycle, Lifecycle::Paused);
    }
}
