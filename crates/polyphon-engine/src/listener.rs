//! Listener pool
//!
//! Listeners are acquired from a fixed-capacity pool and queried every
//! frame for the closest one to each positional sound. Each listener
//! stores both its world matrix and the inverse; the inverse is what
//! transforms sounds into listener space, and keeping it precomputed
//! avoids inverting per query.

use glam::{Mat4, Vec3};

use polyphon_core::{inverse_listener_matrix, listener_matrix};

/// Handle to a pooled listener. Generation-checked: using a handle
/// after `remove_listener` is a logged no-op.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId {
    pub(crate) index: u32,
    pub(crate) generation: u32,
}

/// Pose of one active listener.
#[derive(Debug, Clone)]
pub(crate) struct ListenerState {
    world: Mat4,
    inverse: Mat4,
}

impl ListenerState {
    fn identity() -> Self {
        Self {
            world: Mat4::IDENTITY,
            inverse: Mat4::IDENTITY,
        }
    }

    pub fn location(&self) -> Vec3 {
        self.world.w_axis.truncate()
    }

    pub fn set_location(&mut self, location: Vec3) {
        self.world.w_axis = location.extend(1.0);
        self.inverse = self.world.inverse();
    }

    pub fn set_orientation(&mut self, location: Vec3, forward: Vec3, up: Vec3) {
        self.world = listener_matrix(location, forward, up);
        self.inverse = inverse_listener_matrix(location, forward, up);
    }

    pub fn matrix(&self) -> Mat4 {
        self.world
    }

    pub fn set_matrix(&mut self, matrix: Mat4) {
        self.world = matrix;
        self.inverse = matrix.inverse();
    }

    pub fn inverse_matrix(&self) -> Mat4 {
        self.inverse
    }
}

/// Best-listener query result.
#[derive(Debug, Clone, Copy)]
pub(crate) struct NearestListener {
    pub distance_squared: f32,
    /// The sound's location transformed into the listener's space.
    pub listener_space: Vec3,
}

struct ListenerSlot {
    generation: u32,
    state: Option<ListenerState>,
}

/// Fixed-capacity listener pool.
pub(crate) struct ListenerPool {
    slots: Vec<ListenerSlot>,
    free: Vec<u32>,
    /// Active listeners in acquisition order; ties in the nearest query
    /// resolve to the earliest, so selection is stable.
    active: Vec<u32>,
}

impl ListenerPool {
    pub fn new(capacity: usize) -> Self {
        let slots = (0..capacity)
            .map(|_| ListenerSlot {
                generation: 0,
                state: None,
            })
            .collect();
        // Hand out low indices first.
        let free = (0..capacity as u32).rev().collect();
        Self {
            slots,
            free,
            active: Vec::with_capacity(capacity),
        }
    }

    /// Acquires a listener at the identity pose, or `None` when the pool
    /// is exhausted.
    pub fn add(&mut self) -> Option<ListenerId> {
        let index = self.free.pop()?;
        let slot = &mut self.slots[index as usize];
        slot.state = Some(ListenerState::identity());
        self.active.push(index);
        Some(ListenerId {
            index,
            generation: slot.generation,
        })
    }

    /// Returns the listener to the pool. Stale handles are ignored.
    pub fn remove(&mut self, id: ListenerId) -> bool {
        match self.get(id) {
            Some(_) => {
                let slot = &mut self.slots[id.index as usize];
                slot.state = None;
                slot.generation = slot.generation.wrapping_add(1);
                self.active.retain(|&i| i != id.index);
                self.free.push(id.index);
                true
            }
            None => false,
        }
    }

    pub fn get(&self, id: ListenerId) -> Option<&ListenerState> {
        let slot = self.slots.get(id.index as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        slot.state.as_ref()
    }

    pub fn get_mut(&mut self, id: ListenerId) -> Option<&mut ListenerState> {
        let slot = self.slots.get_mut(id.index as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        slot.state.as_mut()
    }

    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    /// Finds the listener nearest to `location`. Ties keep the earliest
    /// acquired listener so the choice cannot flicker between
    /// equidistant listeners as others come and go.
    pub fn nearest(&self, location: Vec3) -> Option<NearestListener> {
        let mut best: Option<NearestListener> = None;
        for &index in &self.active {
            let Some(state) = self.slots[index as usize].state.as_ref() else {
                continue;
            };
            let listener_space = state.inverse_matrix().transform_point3(location);
            let distance_squared = listener_space.length_squared();
            let closer = match best {
                Some(ref current) => distance_squared < current.distance_squared,
                None => true,
            };
            if closer {
                best = Some(NearestListener {
                    distance_squared,
                    listener_space,
                });
            }
        }
        best
    }
}
