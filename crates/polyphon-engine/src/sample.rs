//! Samples and weighted sample sets
//!
//! A [`Sample`] is one playable asset: either a fully decoded buffer or
//! a handle the backend streams from disk. A [`SampleSet`] is the
//! probability-weighted bag a collection draws from on every play.

use std::sync::Arc;

use smallvec::SmallVec;

/// Sample sets up to this size are stored inline.
const MAX_INLINE_SAMPLES: usize = 8;

/// Audio payload of a sample.
#[derive(Debug, Clone)]
pub enum SampleData {
    /// Fully decoded interleaved PCM frames.
    Buffered(Arc<[f32]>),
    /// Demand-read by the backend from the sample's filename.
    Streamed,
}

/// One playable audio asset. Cheap to clone; the payload is shared.
#[derive(Debug, Clone)]
pub struct Sample {
    filename: Arc<str>,
    gain: f32,
    data: SampleData,
}

impl Sample {
    /// Creates a buffered sample from decoded PCM frames.
    pub fn buffered(filename: impl Into<Arc<str>>, gain: f32, frames: Arc<[f32]>) -> Self {
        Self {
            filename: filename.into(),
            gain,
            data: SampleData::Buffered(frames),
        }
    }

    /// Creates a streamed sample; the backend reads it by filename.
    pub fn streamed(filename: impl Into<Arc<str>>, gain: f32) -> Self {
        Self {
            filename: filename.into(),
            gain,
            data: SampleData::Streamed,
        }
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    /// Per-sample gain, multiplied into the collection gain when this
    /// sample is the one chosen.
    pub fn gain(&self) -> f32 {
        self.gain
    }

    /// Replaces the per-sample gain, keeping the shared payload.
    pub fn with_gain(mut self, gain: f32) -> Self {
        self.gain = gain;
        self
    }

    pub fn data(&self) -> &SampleData {
        &self.data
    }

    pub fn is_stream(&self) -> bool {
        matches!(self.data, SampleData::Streamed)
    }
}

/// Entry in a sample set.
#[derive(Debug, Clone)]
struct SampleSetEntry {
    sample: Sample,
    probability: f32,
}

/// Probability-weighted set of samples.
///
/// Selection draws a uniform value in `[0, total)` and walks the entries
/// subtracting weights until it crosses zero. The RNG is a seedable
/// XorShift64 so playback is reproducible under test.
#[derive(Debug, Clone)]
pub struct SampleSet {
    entries: SmallVec<[SampleSetEntry; MAX_INLINE_SAMPLES]>,
    total_probability: f32,
    rng_state: u64,
}

impl Default for SampleSet {
    fn default() -> Self {
        Self::new()
    }
}

impl SampleSet {
    pub fn new() -> Self {
        Self {
            entries: SmallVec::new(),
            total_probability: 0.0,
            rng_state: 0x853c49e6748fea9b,
        }
    }

    /// Seeds the RNG. Zero is bumped to one to keep XorShift alive.
    pub fn seed(&mut self, seed: u64) {
        self.rng_state = seed.max(1);
    }

    /// Adds a sample with the given selection weight. Negative weights
    /// are clamped to zero.
    pub fn push(&mut self, sample: Sample, probability: f32) {
        let probability = probability.max(0.0);
        self.total_probability += probability;
        self.entries.push(SampleSetEntry {
            sample,
            probability,
        });
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Next random number in [0, 1) (XorShift64).
    #[inline]
    fn next_random(&mut self) -> f32 {
        let mut x = self.rng_state;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.rng_state = x;
        ((x >> 11) as f64 / (1u64 << 53) as f64) as f32
    }

    /// Picks a sample according to the weights. Returns `None` when the
    /// set is empty or every weight is zero.
    pub fn select(&mut self) -> Option<Sample> {
        if self.entries.is_empty() || self.total_probability <= 0.0 {
            return None;
        }
        let mut selection = self.next_random() * self.total_probability;
        for entry in &self.entries {
            selection -= entry.probability;
            if selection <= 0.0 {
                return Some(entry.sample.clone());
            }
        }
        // Floating rounding left a sliver; fall back to the last entry.
        self.entries.last().map(|entry| entry.sample.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(name: &str) -> Sample {
        Sample::streamed(name, 1.0)
    }

    #[test]
    fn test_empty_set_selects_nothing() {
        let mut set = SampleSet::new();
        assert!(set.select().is_none());
    }

    #[test]
    fn test_zero_weights_select_nothing() {
        let mut set = SampleSet::new();
        set.push(sample("a.wav"), 0.0);
        set.push(sample("b.wav"), 0.0);
        assert!(set.select().is_none());
    }

    #[test]
    fn test_single_entry_always_selected() {
        let mut set = SampleSet::new();
        set.push(sample("only.wav"), 0.5);
        for _ in 0..10 {
            assert_eq!(set.select().unwrap().filename(), "only.wav");
        }
    }

    #[test]
    fn test_selection_respects_weights() {
        let mut set = SampleSet::new();
        set.seed(12345);
        set.push(sample("common.wav"), 9.0);
        set.push(sample("rare.wav"), 1.0);

        let mut common = 0;
        let mut rare = 0;
        for _ in 0..1000 {
            match set.select().unwrap().filename() {
                "common.wav" => common += 1,
                _ => rare += 1,
            }
        }
        // With a 9:1 weighting the common sample should dominate.
        assert!(common > 800, "common selected {common} times");
        assert!(rare > 20, "rare selected {rare} times");
    }

    #[test]
    fn test_zero_weight_entry_never_selected() {
        let mut set = SampleSet::new();
        set.seed(99);
        set.push(sample("silent.wav"), 0.0);
        set.push(sample("audible.wav"), 1.0);
        for _ in 0..100 {
            assert_eq!(set.select().unwrap().filename(), "audible.wav");
        }
    }

    #[test]
    fn test_seed_makes_selection_reproducible() {
        let mut a = SampleSet::new();
        let mut b = SampleSet::new();
        for set in [&mut a, &mut b] {
            set.seed(777);
            set.push(sample("x.wav"), 1.0);
            set.push(sample("y.wav"), 1.0);
            set.push(sample("z.wav"), 1.0);
        }
        for _ in 0..50 {
            assert_eq!(
                a.select().unwrap().filename(),
                b.select().unwrap().filename()
            );
        }
    }
}
