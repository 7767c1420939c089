//! Sound collections
//!
//! A collection is one logical sound asset: playback parameters from its
//! definition, a binding to the bus it plays on, and the weighted sample
//! set a concrete sample is drawn from on every play. Collections are
//! reference-counted by the banks (and manual registrations) that name
//! them.

use polyphon_core::SoundCollectionDef;

use crate::loader::{load_sample, AssetLoader};
use crate::sample::{Sample, SampleSet};

/// Handle to a loaded sound collection. Generation-checked; goes stale
/// once the collection's reference count reaches zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SoundHandle {
    pub(crate) index: u32,
    pub(crate) generation: u32,
}

/// A loaded sound collection.
#[derive(Debug)]
pub(crate) struct SoundCollection {
    def: SoundCollectionDef,
    /// Resolved index of the bus named in the definition.
    bus: u32,
    samples: SampleSet,
    ref_count: u32,
}

impl SoundCollection {
    /// Builds a collection from its definition, pulling every sample in
    /// the set through the loader. A sample that fails to load is
    /// dropped from the set with a logged error; the collection itself
    /// survives so later plays can report the problem cheaply.
    pub fn load(def: SoundCollectionDef, bus: u32, loader: &mut dyn AssetLoader) -> Self {
        let mut samples = SampleSet::new();
        for entry in &def.audio_sample_set {
            let filename = &entry.audio_sample.filename;
            match load_sample(loader, filename, entry.audio_sample.gain, def.stream) {
                Ok(sample) => samples.push(sample, entry.playback_probability),
                Err(err) => {
                    log::error!(
                        "collection \"{}\": failed to load sample \"{}\": {}",
                        def.name,
                        filename,
                        err
                    );
                }
            }
        }
        Self {
            def,
            bus,
            samples,
            ref_count: 0,
        }
    }

    pub fn def(&self) -> &SoundCollectionDef {
        &self.def
    }

    pub fn name(&self) -> &str {
        &self.def.name
    }

    pub fn bus(&self) -> u32 {
        self.bus
    }

    /// Draws a sample from the set. `None` when nothing loaded.
    pub fn select(&mut self) -> Option<Sample> {
        self.samples.select()
    }

    /// Seeds the selection RNG (reproducible playback under test).
    pub fn seed(&mut self, seed: u64) {
        self.samples.seed(seed);
    }

    pub fn sample_count(&self) -> usize {
        self.samples.len()
    }

    pub fn ref_count(&self) -> u32 {
        self.ref_count
    }

    pub fn increment(&mut self) -> u32 {
        self.ref_count += 1;
        self.ref_count
    }

    pub fn decrement(&mut self) -> u32 {
        debug_assert!(self.ref_count > 0);
        self.ref_count = self.ref_count.saturating_sub(1);
        self.ref_count
    }
}
