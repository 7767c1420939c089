//! Sound banks and the collection registry
//!
//! The registry owns every loaded collection in a generation-slotted
//! arena, keyed by collection name and by the definition file that
//! produced it. Banks are named lists of collection files; loading a
//! bank loads (or re-references) each collection, and unloading a bank
//! releases them, destroying collections whose count reaches zero.

use std::collections::HashMap;

use polyphon_core::{EngineError, EngineResult, SoundBankDef, SoundCollectionDef};

use crate::bus::BusGraph;
use crate::collection::{SoundCollection, SoundHandle};
use crate::loader::AssetLoader;

struct CollectionSlot {
    generation: u32,
    data: Option<SoundCollection>,
}

/// A loaded bank: its definition plus how many times it was loaded.
pub(crate) struct SoundBank {
    pub def: SoundBankDef,
    pub ref_count: u32,
}

/// Registry of loaded collections and banks.
pub(crate) struct SoundRegistry {
    slots: Vec<CollectionSlot>,
    free_slots: Vec<u32>,
    by_name: HashMap<String, u32>,
    by_file: HashMap<String, u32>,
    banks: HashMap<String, SoundBank>,
}

impl SoundRegistry {
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            free_slots: Vec::new(),
            by_name: HashMap::new(),
            by_file: HashMap::new(),
            banks: HashMap::new(),
        }
    }

    // ─── collection access ─────────────────────────────────────────────

    pub fn get(&self, handle: SoundHandle) -> Option<&SoundCollection> {
        let slot = self.slots.get(handle.index as usize)?;
        if slot.generation != handle.generation {
            return None;
        }
        slot.data.as_ref()
    }

    pub fn get_mut(&mut self, handle: SoundHandle) -> Option<&mut SoundCollection> {
        let slot = self.slots.get_mut(handle.index as usize)?;
        if slot.generation != handle.generation {
            return None;
        }
        slot.data.as_mut()
    }

    /// Direct slot access for channels, which store bare indices and
    /// are halted before their collection can be destroyed.
    pub fn get_by_index(&self, index: u32) -> Option<&SoundCollection> {
        self.slots.get(index as usize)?.data.as_ref()
    }

    pub fn get_by_index_mut(&mut self, index: u32) -> Option<&mut SoundCollection> {
        self.slots.get_mut(index as usize)?.data.as_mut()
    }

    pub fn handle(&self, name: &str) -> Option<SoundHandle> {
        let &index = self.by_name.get(name)?;
        Some(SoundHandle {
            index,
            generation: self.slots[index as usize].generation,
        })
    }

    /// Resolves a collection-definition filename the way banks
    /// reference collections.
    pub fn handle_from_file(&self, filename: &str) -> Option<SoundHandle> {
        let &index = self.by_file.get(filename)?;
        Some(SoundHandle {
            index,
            generation: self.slots[index as usize].generation,
        })
    }

    pub fn collection_count(&self) -> usize {
        self.by_name.len()
    }

    // ─── loading ───────────────────────────────────────────────────────

    /// Registers a collection from an already-parsed definition. If a
    /// collection with the same name exists its reference count is
    /// incremented instead.
    pub fn insert_collection(
        &mut self,
        def: SoundCollectionDef,
        buses: &BusGraph,
        loader: &mut dyn AssetLoader,
    ) -> EngineResult<SoundHandle> {
        def.validate()?;
        if let Some(handle) = self.handle(&def.name) {
            self.get_mut(handle)
                .expect("handle from name map is live")
                .increment();
            return Ok(handle);
        }
        let bus = buses
            .find(&def.bus)
            .ok_or_else(|| EngineError::UnknownBus {
                bus: def.bus.clone(),
                referenced_by: format!("sound collection \"{}\"", def.name),
            })?;
        let name = def.name.clone();
        let mut collection = SoundCollection::load(def, bus.0, loader);
        collection.increment();

        let index = match self.free_slots.pop() {
            Some(index) => {
                self.slots[index as usize].data = Some(collection);
                index
            }
            None => {
                self.slots.push(CollectionSlot {
                    generation: 0,
                    data: Some(collection),
                });
                (self.slots.len() - 1) as u32
            }
        };
        self.by_name.insert(name, index);
        Ok(SoundHandle {
            index,
            generation: self.slots[index as usize].generation,
        })
    }

    /// Loads a collection definition file, or re-references it if this
    /// file was loaded before.
    pub fn load_collection_file(
        &mut self,
        filename: &str,
        buses: &BusGraph,
        loader: &mut dyn AssetLoader,
    ) -> EngineResult<SoundHandle> {
        if let Some(handle) = self.handle_from_file(filename) {
            self.get_mut(handle)
                .expect("handle from file map is live")
                .increment();
            return Ok(handle);
        }
        let def = SoundCollectionDef::load_from(filename)?;
        let handle = self.insert_collection(def, buses, loader)?;
        self.by_file.insert(filename.to_string(), handle.index);
        Ok(handle)
    }

    /// Drops one reference from the collection behind `filename`.
    /// Returns the arena index if the collection was destroyed.
    pub fn release_file(&mut self, filename: &str) -> Option<u32> {
        let &index = self.by_file.get(filename)?;
        self.release_index(index)
    }

    /// Drops one reference from the collection at `index`, destroying
    /// it when the count reaches zero.
    pub fn release_index(&mut self, index: u32) -> Option<u32> {
        let collection = self.slots[index as usize].data.as_mut()?;
        if collection.decrement() > 0 {
            return None;
        }
        let name = collection.name().to_string();
        log::debug!("destroying sound collection \"{name}\"");
        self.by_name.remove(&name);
        self.by_file.retain(|_, &mut i| i != index);
        let slot = &mut self.slots[index as usize];
        slot.data = None;
        slot.generation = slot.generation.wrapping_add(1);
        self.free_slots.push(index);
        Some(index)
    }

    // ─── banks ─────────────────────────────────────────────────────────

    pub fn bank(&self, filename: &str) -> Option<&SoundBank> {
        self.banks.get(filename)
    }

    pub fn bank_mut(&mut self, filename: &str) -> Option<&mut SoundBank> {
        self.banks.get_mut(filename)
    }

    pub fn insert_bank(&mut self, filename: &str, def: SoundBankDef) {
        self.banks.insert(
            filename.to_string(),
            SoundBank { def, ref_count: 1 },
        );
    }

    pub fn remove_bank(&mut self, filename: &str) -> Option<SoundBank> {
        self.banks.remove(filename)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::MemoryLoader;
    use polyphon_core::{BusDef, BusDefList};

    fn buses() -> BusGraph {
        BusGraph::from_defs(&BusDefList {
            buses: vec![BusDef::named("master")],
        })
        .unwrap()
    }

    fn named_def(name: &str) -> SoundCollectionDef {
        SoundCollectionDef {
            name: name.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_insert_and_lookup_by_name() {
        let buses = buses();
        let mut loader = MemoryLoader::new();
        let mut registry = SoundRegistry::new();

        let handle = registry
            .insert_collection(named_def("footstep"), &buses, &mut loader)
            .unwrap();
        assert_eq!(registry.handle("footstep"), Some(handle));
        assert_eq!(registry.get(handle).unwrap().ref_count(), 1);
    }

    #[test]
    fn test_insert_same_name_increments() {
        let buses = buses();
        let mut loader = MemoryLoader::new();
        let mut registry = SoundRegistry::new();

        let first = registry
            .insert_collection(named_def("footstep"), &buses, &mut loader)
            .unwrap();
        let second = registry
            .insert_collection(named_def("footstep"), &buses, &mut loader)
            .unwrap();
        assert_eq!(first, second);
        assert_eq!(registry.get(first).unwrap().ref_count(), 2);
    }

    #[test]
    fn test_unknown_bus_is_fatal() {
        let buses = buses();
        let mut loader = MemoryLoader::new();
        let mut registry = SoundRegistry::new();

        let mut def = named_def("stray");
        def.bus = "nonexistent".to_string();
        let result = registry.insert_collection(def, &buses, &mut loader);
        assert!(matches!(result, Err(EngineError::UnknownBus { .. })));
    }

    #[test]
    fn test_release_destroys_at_zero_and_stales_handles() {
        let buses = buses();
        let mut loader = MemoryLoader::new();
        let mut registry = SoundRegistry::new();

        let handle = registry
            .insert_collection(named_def("once"), &buses, &mut loader)
            .unwrap();
        registry.get_mut(handle).unwrap().increment();

        assert!(registry.release_index(handle.index).is_none());
        assert!(registry.get(handle).is_some());

        assert_eq!(registry.release_index(handle.index), Some(handle.index));
        assert!(registry.get(handle).is_none());
        assert!(registry.handle("once").is_none());

        // The freed slot is reused with a fresh generation.
        let replacement = registry
            .insert_collection(named_def("again"), &buses, &mut loader)
            .unwrap();
        assert_eq!(replacement.index, handle.index);
        assert_ne!(replacement.generation, handle.generation);
        assert!(registry.get(handle).is_none());
    }
}
