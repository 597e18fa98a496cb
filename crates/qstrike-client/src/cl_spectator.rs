// cl_spectator.rs -- observer mode and target state for a spectating viewer

use log::debug;

use crate::cl_director::DirectorPolicy;
use crate::cl_ents::{EntityId, EntityList};
use crate::cl_events::ViewNotify;

/// The camera behavior a spectating viewer is currently in. Replicated as a
/// raw integer; the numbering is part of the wire contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ObserverMode {
    #[default]
    None = 0,
    DeathCam = 1,
    FreezeCam = 2,
    Fixed = 3,
    InEye = 4,
    Chase = 5,
    Roaming = 6,
}

impl ObserverMode {
    /// Decode a replicated mode value. Out-of-range values are not an
    /// error; they fall back to None.
    pub fn from_raw(raw: i32) -> Self {
        match raw {
            1 => ObserverMode::DeathCam,
            2 => ObserverMode::FreezeCam,
            3 => ObserverMode::Fixed,
            4 => ObserverMode::InEye,
            5 => ObserverMode::Chase,
            6 => ObserverMode::Roaming,
            _ => ObserverMode::None,
        }
    }

    pub fn as_raw(self) -> i32 {
        self as i32
    }

    /// Modes that bind to a target entity.
    pub fn targeted(self) -> bool {
        matches!(
            self,
            ObserverMode::InEye | ObserverMode::Chase | ObserverMode::DeathCam | ObserverMode::FreezeCam
        )
    }

    /// Whether the viewer's own weapon/view model should render.
    /// Consumed by the view-model render path.
    pub fn first_person(self) -> bool {
        matches!(self, ObserverMode::None | ObserverMode::InEye)
    }
}

/// Authoritative observer mode and target for one viewer slot.
pub struct ObserverState {
    mode: ObserverMode,
    target: EntityId,
    prev_target: EntityId,
    /// Target identity received while not yet in a targeted mode; adopted
    /// on the next transition into one.
    pending_target: EntityId,
}

impl Default for ObserverState {
    fn default() -> Self {
        Self::new()
    }
}

impl ObserverState {
    pub fn new() -> Self {
        Self {
            mode: ObserverMode::None,
            target: EntityId::NONE,
            prev_target: EntityId::NONE,
            pending_target: EntityId::NONE,
        }
    }

    pub fn mode(&self) -> ObserverMode {
        self.mode
    }

    pub fn target(&self) -> EntityId {
        self.target
    }

    pub fn prev_target(&self) -> EntityId {
        self.prev_target
    }

    /// Set the observer mode. Returns the previous mode so the caller can
    /// run exit sequencing (freeze-cam hold, chase reset).
    pub fn set_mode(&mut self, mode: ObserverMode) -> ObserverMode {
        let old = self.mode;
        if mode != old {
            debug!("observer mode {:?} -> {:?}", old, mode);
            self.mode = mode;
        }
        old
    }

    pub fn set_mode_raw(&mut self, raw: i32) -> ObserverMode {
        self.set_mode(ObserverMode::from_raw(raw))
    }

    /// Adopt a new target identity.
    ///
    /// The comparison is on the raw (entry, generation) fields, never on
    /// resolved references: during a streaming race both the old and the new
    /// identity may resolve to nothing, and a change must still be detected.
    /// Both the outgoing and incoming targets (where they resolve) get a
    /// visibility refresh, since being the observed target changes draw
    /// rules. Resolution failure is soft; the camera falls back to the
    /// viewer's last-known position until the entity streams in.
    pub fn set_target(
        &mut self,
        new: EntityId,
        ents: &EntityList,
        notify: &mut dyn ViewNotify,
    ) {
        if new == self.target {
            return;
        }
        debug!("spec target {:?} -> {:?}", self.target, new);

        let old = self.target;
        self.prev_target = old;
        self.target = new;
        self.pending_target = EntityId::NONE;

        if ents.resolve(old).is_some() {
            notify.entity_visibility_dirty(old);
        }
        if ents.resolve(new).is_some() {
            notify.entity_visibility_dirty(new);
        }
    }

    /// Per-frame update from the replicated observer fields.
    pub fn update_from_network(
        &mut self,
        raw_mode: i32,
        target: EntityId,
        ents: &EntityList,
        notify: &mut dyn ViewNotify,
    ) -> ObserverMode {
        let old = self.set_mode_raw(raw_mode);
        if self.mode.targeted() {
            if target.is_none() && !self.pending_target.is_none() {
                // a target arrived before the mode did; adopt it now
                let pending = self.pending_target;
                self.set_target(pending, ents, notify);
            } else {
                self.set_target(target, ents, notify);
            }
        } else if !target.is_none() {
            self.pending_target = target;
        }
        old
    }

    /// Mode and target actually in effect for this viewer. When the viewer
    /// is watched through a time-shifted broadcast, the director's choice
    /// overrides the viewer's own replicated fields unconditionally.
    pub fn effective(&self, director: &DirectorPolicy) -> (ObserverMode, EntityId) {
        if let Some((mode, target)) = director.observer_override() {
            return (mode, target);
        }
        (self.mode, self.target)
    }

    /// Cycle to the next observable target (wraps, skips spectators and
    /// dead slots).
    pub fn spec_next(&mut self, ents: &EntityList, notify: &mut dyn ViewNotify) {
        if let Some(next) = ents.next_observable(self.target) {
            self.set_target(next, ents, notify);
        }
    }

    pub fn spec_prev(&mut self, ents: &EntityList, notify: &mut dyn ViewNotify) {
        if let Some(prev) = ents.prev_observable(self.target) {
            self.set_target(prev, ents, notify);
        }
    }
}
