//! Asset loader interface
//!
//! Decoding lives outside the engine. The [`AssetLoader`] turns
//! filenames into [`Sample`] payloads, and exposes the poll surface the
//! host spins on before playing: `start_loading` kicks background work,
//! `try_finalize` reports completion.

use std::collections::HashMap;
use std::sync::Arc;

use polyphon_core::{EngineError, EngineResult};

use crate::sample::{Sample, SampleData};

/// Source of sample payloads.
pub trait AssetLoader {
    /// Returns the payload for `filename`, loading it if necessary.
    /// Streamed assets return [`SampleData::Streamed`]; the backend
    /// reads them by name.
    fn ensure_loaded(&mut self, filename: &str, stream: bool) -> EngineResult<SampleData>;

    /// Kicks any deferred loading work. The default loader loads
    /// eagerly, so this is a no-op.
    fn start_loading(&mut self) {}

    /// Whether all requested assets are ready. Hosts spin on this
    /// before playing.
    fn try_finalize(&mut self) -> bool {
        true
    }
}

/// In-memory loader: a name-keyed cache of pre-decoded buffers.
///
/// Hosts (and tests) register decoded PCM up front with [`insert`];
/// `ensure_loaded` then serves from the cache. Unknown names are an
/// error unless the loader is made permissive, in which case they
/// resolve to an empty buffer.
///
/// [`insert`]: MemoryLoader::insert
#[derive(Debug, Default)]
pub struct MemoryLoader {
    buffers: HashMap<String, Arc<[f32]>>,
    allow_missing: bool,
}

impl MemoryLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Unknown filenames resolve to empty buffers instead of erroring.
    pub fn permissive() -> Self {
        Self {
            buffers: HashMap::new(),
            allow_missing: true,
        }
    }

    /// Registers decoded PCM frames under `filename`.
    pub fn insert(&mut self, filename: impl Into<String>, frames: impl Into<Arc<[f32]>>) {
        self.buffers.insert(filename.into(), frames.into());
    }

    /// Whether `filename` has been registered.
    pub fn contains(&self, filename: &str) -> bool {
        self.buffers.contains_key(filename)
    }
}

impl AssetLoader for MemoryLoader {
    fn ensure_loaded(&mut self, filename: &str, stream: bool) -> EngineResult<SampleData> {
        if stream {
            // Streamed assets are opened by the backend; nothing to cache.
            return Ok(SampleData::Streamed);
        }
        if let Some(frames) = self.buffers.get(filename) {
            log::debug!("serving \"{}\" from memory ({} frames)", filename, frames.len());
            return Ok(SampleData::Buffered(Arc::clone(frames)));
        }
        if self.allow_missing {
            log::debug!("substituting empty buffer for \"{}\"", filename);
            let empty: Arc<[f32]> = Arc::from(Vec::new());
            self.buffers.insert(filename.to_string(), Arc::clone(&empty));
            return Ok(SampleData::Buffered(empty));
        }
        Err(EngineError::Loader(format!(
            "no buffer registered for \"{filename}\""
        )))
    }
}

/// Convenience: build a buffered [`Sample`] straight from a loader.
pub fn load_sample(
    loader: &mut dyn AssetLoader,
    filename: &str,
    gain: f32,
    stream: bool,
) -> EngineResult<Sample> {
    let data = loader.ensure_loaded(filename, stream)?;
    Ok(match data {
        SampleData::Buffered(frames) => Sample::buffered(filename, gain, frames),
        SampleData::Streamed => Sample::streamed(filename, gain),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_loader_serves_registered_buffers() {
        let mut loader = MemoryLoader::new();
        loader.insert("tone.wav", vec![0.0_f32, 0.5, -0.5]);

        let sample = load_sample(&mut loader, "tone.wav", 1.0, false).unwrap();
        match sample.data() {
            SampleData::Buffered(frames) => assert_eq!(frames.len(), 3),
            SampleData::Streamed => panic!("expected a buffered sample"),
        }
    }

    #[test]
    fn test_memory_loader_rejects_unknown_names() {
        let mut loader = MemoryLoader::new();
        assert!(load_sample(&mut loader, "missing.wav", 1.0, false).is_err());
    }

    #[test]
    fn test_permissive_loader_substitutes_empty_buffers() {
        let mut loader = MemoryLoader::permissive();
        let sample = load_sample(&mut loader, "missing.wav", 1.0, false).unwrap();
        assert!(matches!(sample.data(), SampleData::Buffered(_)));
    }

    #[test]
    fn test_streamed_assets_skip_the_cache() {
        let mut loader = MemoryLoader::new();
        let sample = load_sample(&mut loader, "music.ogg", 1.0, true).unwrap();
        assert!(sample.is_stream());
    }
}
