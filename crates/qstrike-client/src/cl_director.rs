// cl_director.rs -- broadcast (HLTV) auto-director and cameraman UI state

use bitflags::bitflags;
use log::debug;

use crate::cl_ents::EntityId;
use crate::cl_events::ViewNotify;
use crate::cl_spectator::ObserverMode;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DirectorState {
    #[default]
    Off,
    On,
    Paused,
}

bitflags! {
    /// Replicated cameraman UI state. Each bit is an independent toggle.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct CameramanFlags: u32 {
        const XRAY       = 1 << 0;
        const OVERVIEW   = 1 << 1;
        const SCOREBOARD = 1 << 2;
        const GRAPHS     = 1 << 3;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CameramanToggle {
    XRay,
    Overview,
    Scoreboard,
    Graphs,
}

const TOGGLE_BITS: [(CameramanFlags, CameramanToggle); 4] = [
    (CameramanFlags::XRAY, CameramanToggle::XRay),
    (CameramanFlags::OVERVIEW, CameramanToggle::Overview),
    (CameramanFlags::SCOREBOARD, CameramanToggle::Scoreboard),
    (CameramanFlags::GRAPHS, CameramanToggle::Graphs),
];

/// The auto-director. When On it may reassign the observed target and mode
/// out-of-band from the viewer's own replicated fields; Paused freezes the
/// current assignment; Off defers entirely to the viewer.
pub struct DirectorPolicy {
    pub state: DirectorState,
    override_mode: ObserverMode,
    override_target: EntityId,
    /// An active cameraman takes precedence over the scripted override.
    cameraman: EntityId,
    /// Cameraman UI state as last replicated (possibly several updates
    /// within one frame; only the last one matters).
    flags: CameramanFlags,
    /// Cameraman UI state as last flushed to the UI layer.
    emitted_flags: CameramanFlags,
}

impl Default for DirectorPolicy {
    fn default() -> Self {
        Self::new()
    }
}

impl DirectorPolicy {
    pub fn new() -> Self {
        Self {
            state: DirectorState::Off,
            override_mode: ObserverMode::Chase,
            override_target: EntityId::NONE,
            cameraman: EntityId::NONE,
            flags: CameramanFlags::empty(),
            emitted_flags: CameramanFlags::empty(),
        }
    }

    pub fn set_state(&mut self, state: DirectorState) {
        if state != self.state {
            debug!("director state -> {:?}", state);
        }
        self.state = state;
    }

    /// Scripted director decision: observe `target` in `mode`. Ignored
    /// unless the director is running.
    pub fn assign(&mut self, mode: ObserverMode, target: EntityId) {
        if self.state != DirectorState::On {
            return;
        }
        self.override_mode = mode;
        self.override_target = target;
    }

    /// A cameraman went live (or NONE when they dropped).
    pub fn set_cameraman(&mut self, ent: EntityId) {
        if self.state != DirectorState::On {
            return;
        }
        self.cameraman = ent;
    }

    pub fn cameraman(&self) -> EntityId {
        self.cameraman
    }

    /// The mode/target pair the director imposes on the viewer, if any.
    /// On and Paused both impose (Paused simply stops accepting new
    /// assignments); Off imposes nothing.
    pub fn observer_override(&self) -> Option<(ObserverMode, EntityId)> {
        if self.state == DirectorState::Off {
            return None;
        }
        if !self.cameraman.is_none() {
            return Some((ObserverMode::InEye, self.cameraman));
        }
        if self.override_target.is_none() {
            return None;
        }
        Some((self.override_mode, self.override_target))
    }

    /// Record replicated cameraman UI state. Cheap; may run several times
    /// per frame and only the final state survives to the flush.
    pub fn set_cameraman_flags(&mut self, flags: CameramanFlags) {
        self.flags = flags;
    }

    pub fn set_cameraman_flag(&mut self, flag: CameramanFlags, enabled: bool) {
        self.flags.set(flag, enabled);
    }

    /// End-of-frame flush: diff against what the UI last saw and emit at
    /// most one state-change notification per toggle.
    pub fn flush_ui_changes(&mut self, notify: &mut dyn ViewNotify) {
        let changed = self.flags ^ self.emitted_flags;
        if changed.is_empty() {
            return;
        }
        for (bit, toggle) in TOGGLE_BITS {
            if changed.contains(bit) {
                notify.cameraman_ui_changed(toggle, self.flags.contains(bit));
            }
        }
        self.emitted_flags = self.flags;
    }
}
