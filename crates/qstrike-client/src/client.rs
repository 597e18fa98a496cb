// client.rs -- per-slot client state

use qstrike_common::q_shared::*;

use crate::cl_chase::ChaseState;
use crate::cl_ents::EntityId;
use crate::cl_freeze::FreezeSequence;
use crate::cl_pred::PredictionErrorSmoother;
use crate::cl_spectator::ObserverState;

/// Renderer scene definition: the slice of the refresh setup this layer
/// owns. The renderer consumes it once per frame.
#[derive(Debug, Clone, Default)]
pub struct RefDef {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
    pub fov_x: f32,
    pub fov_y: f32,
    pub vieworg: Vec3,
    pub viewangles: Vec3,
    /// Drives the weapon/view-model render path: false while the active
    /// mode looks through someone's eyes.
    pub third_person: bool,
}

/// Per-viewer observer fields as last replicated. Written by the network
/// layer, read once per frame by the view setup.
#[derive(Debug, Clone, Copy, Default)]
pub struct ObserverNet {
    pub mode: i32,
    pub target_index: i32,
    pub target_serial: i32,
    pub cameraman_flags: u32,
}

impl ObserverNet {
    pub fn target(&self) -> EntityId {
        EntityId::new(self.target_index, self.target_serial)
    }
}

/// All mutable per-viewer state for one split-screen slot. Owned
/// exclusively by that slot; the active slot is always an explicit
/// parameter, never ambient state.
pub struct ClientState {
    /// Client render time, milliseconds.
    pub time: i32,

    /// The viewer's own entity.
    pub viewer_ent: EntityId,
    /// Whether this viewer is watched through a time-shifted broadcast;
    /// live-only replicated fields cannot be trusted then.
    pub hltv: bool,

    // the client maintains its own idea of view angles, driven by input
    pub viewangles: Vec3,
    /// Input-driven free camera position (roaming).
    pub free_origin: Vec3,
    /// Replicated stationary camera position (fixed mode).
    pub fixed_origin: Vec3,

    /// Last eye tuple actually handed to the renderer. Every degraded
    /// path falls back to this.
    pub last_eye_origin: Vec3,
    pub last_eye_angles: Vec3,

    // death presentation
    pub death_time: i32,
    pub pre_death_angles: Vec3,
    pub killer: EntityId,

    pub net: ObserverNet,
    pub observer: ObserverState,
    pub chase: ChaseState,
    pub freeze: Option<FreezeSequence>,
    pub smoothing: PredictionErrorSmoother,

    pub refdef: RefDef,
}

impl Default for ClientState {
    fn default() -> Self {
        Self::new()
    }
}

impl ClientState {
    pub fn new() -> Self {
        Self {
            time: 0,
            viewer_ent: EntityId::NONE,
            hltv: false,
            viewangles: [0.0; 3],
            free_origin: [0.0; 3],
            fixed_origin: [0.0; 3],
            last_eye_origin: [0.0; 3],
            last_eye_angles: [0.0; 3],
            death_time: 0,
            pre_death_angles: [0.0; 3],
            killer: EntityId::NONE,
            net: ObserverNet::default(),
            observer: ObserverState::new(),
            chase: ChaseState::default(),
            freeze: None,
            smoothing: PredictionErrorSmoother::new(),
            refdef: RefDef::default(),
        }
    }
}

/// The split-screen slot table. One `ClientState` per slot.
pub struct ClientSlots {
    slots: Vec<ClientState>,
}

impl Default for ClientSlots {
    fn default() -> Self {
        Self::new(1)
    }
}

impl ClientSlots {
    pub fn new(count: usize) -> Self {
        let count = count.clamp(1, MAX_SPLITSCREEN_SLOTS);
        let mut slots = Vec::with_capacity(count);
        for _ in 0..count {
            slots.push(ClientState::new());
        }
        Self { slots }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn get(&self, slot: usize) -> Option<&ClientState> {
        self.slots.get(slot)
    }

    pub fn get_mut(&mut self, slot: usize) -> Option<&mut ClientState> {
        self.slots.get_mut(slot)
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (usize, &mut ClientState)> {
        self.slots.iter_mut().enumerate()
    }
}
