// cl_ents.rs -- client entity list and generation-checked entity handles

use qstrike_common::q_shared::*;

// standing / crouched eye heights, used when a live per-tick view offset
// is unavailable (broadcast replay scrubbing)
pub const EYE_HEIGHT_STAND: f32 = 64.0;
pub const EYE_HEIGHT_DUCK: f32 = 46.0;

/// A weak reference to an entity slot: (entry index, generation serial).
///
/// Equality is defined on the raw fields, never on what the fields currently
/// resolve to. During streaming races both the old and the new identity may
/// resolve to nothing, and they must still compare unequal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EntityId {
    pub index: i32,
    pub serial: i32,
}

impl EntityId {
    pub const NONE: EntityId = EntityId { index: 0, serial: 0 };

    pub fn new(index: i32, serial: i32) -> Self {
        Self { index, serial }
    }

    /// True for the all-zero "no target" identity. A non-zero identity that
    /// fails to resolve is *not* none.
    pub fn is_none(&self) -> bool {
        self.index == 0 && self.serial == 0
    }
}

/// Coarse entity classification; chase cameras size their pull-back
/// distance by it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EntityClass {
    #[default]
    Player,
    Vehicle,
    Projectile,
    Prop,
}

/// Per-entity replicated state the camera core reads.
#[derive(Debug, Clone, Default)]
pub struct EntityState {
    pub origin: Vec3,
    pub angles: Vec3, // view angles for players
    pub velocity: Vec3,
    pub view_offset: Vec3, // live per-tick eye offset
    pub punch_angles: Vec3,
    pub aim_punch_angles: Vec3,
    pub ducked: bool,
    pub alive: bool,
    pub spectator: bool,
    pub class: EntityClass,
    /// Where the ragdoll settled, once one exists for this entity.
    pub ragdoll_origin: Option<Vec3>,
}

impl EntityState {
    /// World-space eye position from the live view offset.
    pub fn eye_position(&self) -> Vec3 {
        vector_add(&self.origin, &self.view_offset)
    }

    /// Eye position from the fixed duck/stand constants. Used when the live
    /// offset cannot be trusted (time-shifted replay).
    pub fn eye_position_fixed(&self) -> Vec3 {
        let h = if self.ducked {
            EYE_HEIGHT_DUCK
        } else {
            EYE_HEIGHT_STAND
        };
        [self.origin[0], self.origin[1], self.origin[2] + h]
    }
}

struct EntitySlot {
    inuse: bool,
    serial: i32,
    state: EntityState,
}

/// The client-side entity table. Slots are reused; each reuse bumps the
/// slot serial so stale `EntityId`s stop resolving.
pub struct EntityList {
    slots: Vec<EntitySlot>,
}

impl Default for EntityList {
    fn default() -> Self {
        Self::new()
    }
}

impl EntityList {
    pub fn new() -> Self {
        let mut slots = Vec::with_capacity(MAX_EDICTS);
        for _ in 0..MAX_EDICTS {
            slots.push(EntitySlot {
                inuse: false,
                serial: 0,
                state: EntityState::default(),
            });
        }
        Self { slots }
    }

    /// Bring the slot at `index` into use, invalidating any identity that
    /// pointed at its previous occupant. Index 0 is reserved.
    pub fn spawn_at(&mut self, index: usize) -> EntityId {
        debug_assert!(index > 0 && index < MAX_EDICTS);
        let slot = &mut self.slots[index];
        slot.serial += 1;
        slot.inuse = true;
        slot.state = EntityState::default();
        slot.state.alive = true;
        EntityId::new(index as i32, slot.serial)
    }

    pub fn free(&mut self, index: usize) {
        if index > 0 && index < self.slots.len() {
            self.slots[index].inuse = false;
        }
    }

    /// Fallible weak-handle resolution. Fails when the slot is unused or has
    /// been reused since the identity was minted.
    pub fn resolve(&self, id: EntityId) -> Option<&EntityState> {
        if id.is_none() {
            return None;
        }
        let slot = self.slots.get(id.index as usize)?;
        if slot.inuse && slot.serial == id.serial {
            Some(&slot.state)
        } else {
            None
        }
    }

    pub fn resolve_mut(&mut self, id: EntityId) -> Option<&mut EntityState> {
        if id.is_none() {
            return None;
        }
        let slot = self.slots.get_mut(id.index as usize)?;
        if slot.inuse && slot.serial == id.serial {
            Some(&mut slot.state)
        } else {
            None
        }
    }

    /// Current identity of the occupant at `index`, or NONE.
    pub fn id_at(&self, index: usize) -> EntityId {
        match self.slots.get(index) {
            Some(slot) if slot.inuse => EntityId::new(index as i32, slot.serial),
            _ => EntityId::NONE,
        }
    }

    fn observable(&self, index: usize) -> bool {
        let slot = &self.slots[index];
        slot.inuse
            && slot.state.alive
            && !slot.state.spectator
            && slot.state.class == EntityClass::Player
    }

    /// Next observable entity after `from`, wrapping. Returns `from` itself
    /// when it is the only candidate, None when there are no candidates.
    pub fn next_observable(&self, from: EntityId) -> Option<EntityId> {
        self.cycle_observable(from, 1)
    }

    pub fn prev_observable(&self, from: EntityId) -> Option<EntityId> {
        self.cycle_observable(from, -1)
    }

    fn cycle_observable(&self, from: EntityId, dir: i32) -> Option<EntityId> {
        let len = self.slots.len() as i32;
        let start = if from.index > 0 && from.index < len {
            from.index
        } else {
            0
        };

        let mut i = start;
        loop {
            i += dir;
            if i >= len {
                i = 1;
            }
            if i < 1 {
                i = len - 1;
            }
            if self.observable(i as usize) {
                return Some(self.id_at(i as usize));
            }
            // walked the whole table without a candidate
            if i == start || (start == 0 && i == if dir > 0 { len - 1 } else { 1 }) {
                return None;
            }
        }
    }
}
