//! Bus graph
//!
//! Buses form a tree rooted at "master"; duck relationships form a
//! separate DAG over the same arena. Every frame runs three passes in
//! order: reset duck gains, advance duck transitions and apply them to
//! their targets, then fold gains down the tree from the master.

use std::collections::HashMap;

use smallvec::SmallVec;

use polyphon_core::{BusDef, BusDefList, EngineError, EngineResult};

use crate::list::{Hook, IndexList};

/// Name of the root bus every definition list must contain.
pub const MASTER_BUS_NAME: &str = "master";

/// Handle to a bus. Buses live for the life of the engine, so the
/// handle is a plain index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BusId(pub(crate) u32);

/// Runtime state of one bus.
#[derive(Debug)]
pub(crate) struct BusState {
    def: BusDef,
    children: SmallVec<[u32; 8]>,
    duck_targets: SmallVec<[u32; 4]>,
    /// Gain the host set or is fading toward.
    user_gain: f32,
    target_user_gain: f32,
    /// Per-second fade step; zero when no fade is running.
    user_gain_step: f32,
    /// Attenuation applied by other buses ducking this one. Reset to 1
    /// each frame before the duck pass.
    duck_gain: f32,
    /// Progress of this bus's own duck fade, 0 (inactive) to 1 (fully
    /// ducking its targets).
    duck_transition: f32,
    /// Folded gain after the tree pass.
    final_gain: f32,
    /// Channels currently playing on this bus (the bus hook list).
    pub playing: IndexList,
}

impl BusState {
    fn new(def: BusDef) -> Self {
        Self {
            def,
            children: SmallVec::new(),
            duck_targets: SmallVec::new(),
            user_gain: 1.0,
            target_user_gain: 1.0,
            user_gain_step: 0.0,
            duck_gain: 1.0,
            duck_transition: 0.0,
            final_gain: 0.0,
            playing: IndexList::new(Hook::Bus),
        }
    }

    pub fn name(&self) -> &str {
        &self.def.name
    }

    /// Number of channels currently playing on this bus.
    pub fn active_count(&self) -> usize {
        self.playing.len()
    }
}

fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

/// The bus arena plus name lookup.
#[derive(Debug)]
pub(crate) struct BusGraph {
    buses: Vec<BusState>,
    by_name: HashMap<String, u32>,
    master: u32,
}

impl BusGraph {
    /// Builds the graph from a definition list, resolving child and duck
    /// names and validating the tree shape.
    pub fn from_defs(defs: &BusDefList) -> EngineResult<Self> {
        let mut by_name = HashMap::new();
        for (i, def) in defs.buses.iter().enumerate() {
            if by_name.insert(def.name.clone(), i as u32).is_some() {
                return Err(EngineError::DuplicateBus(def.name.clone()));
            }
        }
        let master = *by_name
            .get(MASTER_BUS_NAME)
            .ok_or(EngineError::MissingMasterBus)?;

        let mut buses: Vec<BusState> = defs
            .buses
            .iter()
            .map(|def| BusState::new(def.clone()))
            .collect();

        let resolve = |names: &[String], list: &str, owner: &str| -> EngineResult<SmallVec<[u32; 4]>> {
            names
                .iter()
                .map(|name| {
                    by_name.get(name).copied().ok_or_else(|| EngineError::UnknownBus {
                        bus: name.clone(),
                        referenced_by: format!("{list} of \"{owner}\""),
                    })
                })
                .collect()
        };

        let mut parent_count = vec![0u32; buses.len()];
        for i in 0..buses.len() {
            let def = buses[i].def.clone();
            let children = resolve(&def.child_buses, "child_buses", &def.name)?;
            for &child in &children {
                parent_count[child as usize] += 1;
            }
            buses[i].children = children.into_iter().collect();
            buses[i].duck_targets = resolve(&def.duck_buses, "duck_buses", &def.name)?;
        }

        if parent_count[master as usize] > 0 {
            return Err(EngineError::Config(
                "master bus cannot be a child of another bus".to_string(),
            ));
        }
        for (i, &count) in parent_count.iter().enumerate() {
            if count > 1 {
                return Err(EngineError::Config(format!(
                    "bus \"{}\" is a child of multiple buses",
                    buses[i].name()
                )));
            }
        }

        Ok(Self {
            buses,
            by_name,
            master,
        })
    }

    pub fn find(&self, name: &str) -> Option<BusId> {
        self.by_name.get(name).map(|&i| BusId(i))
    }

    pub fn master(&self) -> BusId {
        BusId(self.master)
    }

    pub fn len(&self) -> usize {
        self.buses.len()
    }

    pub fn state(&self, bus: u32) -> &BusState {
        &self.buses[bus as usize]
    }

    pub fn state_mut(&mut self, bus: u32) -> &mut BusState {
        &mut self.buses[bus as usize]
    }

    pub fn user_gain(&self, bus: BusId) -> f32 {
        self.buses[bus.0 as usize].user_gain
    }

    /// Sets the user gain immediately, cancelling any running fade.
    pub fn set_user_gain(&mut self, bus: BusId, gain: f32) {
        let state = &mut self.buses[bus.0 as usize];
        state.user_gain = gain;
        state.target_user_gain = gain;
        state.user_gain_step = 0.0;
    }

    /// Fades the user gain to `gain` over `duration` seconds.
    pub fn fade_to(&mut self, bus: BusId, gain: f32, duration: f32) {
        let state = &mut self.buses[bus.0 as usize];
        if duration <= 0.0 {
            state.user_gain = gain;
            state.target_user_gain = gain;
            state.user_gain_step = 0.0;
        } else {
            state.target_user_gain = gain;
            state.user_gain_step = (gain - state.user_gain) / duration;
        }
    }

    pub fn final_gain(&self, bus: u32) -> f32 {
        self.buses[bus as usize].final_gain
    }

    /// Runs the three per-frame passes: duck reset, duck transitions,
    /// and the recursive gain fold from the master.
    pub fn advance(&mut self, delta_time: f32, master_gain: f32) {
        for bus in &mut self.buses {
            bus.duck_gain = 1.0;
        }
        for i in 0..self.buses.len() {
            self.update_duck(i, delta_time);
        }
        self.advance_bus(self.master, delta_time, master_gain);
    }

    /// Advances one bus's duck transition and applies the resulting
    /// attenuation to its targets (most aggressive ducker wins).
    fn update_duck(&mut self, index: usize, delta_time: f32) {
        let active = !self.buses[index].playing.is_empty();
        let (fade_in, fade_out, target_gain) = {
            let def = &self.buses[index].def;
            (def.duck_fade_in_time, def.duck_fade_out_time, def.duck_gain)
        };

        let transition = &mut self.buses[index].duck_transition;
        if active {
            if fade_in > 0.0 {
                *transition = (*transition + delta_time / fade_in).min(1.0);
            } else {
                *transition = 1.0;
            }
        } else if fade_out > 0.0 {
            *transition = (*transition - delta_time / fade_out).max(0.0);
        } else {
            *transition = 0.0;
        }

        let duck = lerp(1.0, target_gain, self.buses[index].duck_transition);
        let targets = self.buses[index].duck_targets.clone();
        for target in targets {
            let target = &mut self.buses[target as usize];
            target.duck_gain = target.duck_gain.min(duck);
        }
    }

    /// Folds gains down the tree: advance the user-gain fade, combine
    /// definition, parent, duck, and user gains, then recurse.
    fn advance_bus(&mut self, index: u32, delta_time: f32, parent_gain: f32) {
        let state = &mut self.buses[index as usize];

        if state.user_gain_step != 0.0 {
            state.user_gain += delta_time * state.user_gain_step;
            let crossed = (state.user_gain_step < 0.0 && state.user_gain < state.target_user_gain)
                || (state.user_gain_step > 0.0 && state.user_gain > state.target_user_gain);
            if crossed {
                state.user_gain = state.target_user_gain;
                state.user_gain_step = 0.0;
            }
        }

        state.final_gain = state.def.gain * parent_gain * state.duck_gain * state.user_gain;
        let gain = state.final_gain;
        let children = state.children.clone();
        for child in children {
            self.advance_bus(child, delta_time, gain);
        }
    }
}
