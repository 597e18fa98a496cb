// cl_events.rs -- game event types, event queueing, and outbound notifications
//
// The replication/game layer produces events on its own thread; the
// presentation layer drains them once per frame on the main thread. A bounded
// crossbeam channel decouples the two; when the queue is full the producer
// drops rather than blocks.

use crossbeam::channel::{bounded, Receiver, Sender, TrySendError};
use log::warn;

use crate::cl_director::CameramanToggle;
use crate::cl_ents::EntityId;

/// Pre-aggregated combat counters carried by the freeze panel event.
/// Display-only; the camera logic never reads them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CombatStats {
    pub hits_given: i32,
    pub damage_given: i32,
    pub hits_taken: i32,
    pub damage_taken: i32,
}

/// Events delivered from the game/replication layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GameEvent {
    PlayerDeath {
        victim: EntityId,
        killer: EntityId,
    },
    ShowFreezePanel {
        victim: EntityId,
        killer: EntityId,
        stats: CombatStats,
    },
    HideFreezePanel {
        victim: EntityId,
    },
    SpecTargetUpdated {
        slot: usize,
        target: EntityId,
    },
}

/// Bounded event queue between the replication thread and the frame loop.
pub struct EventQueue {
    sender: Sender<GameEvent>,
    receiver: Receiver<GameEvent>,
}

impl EventQueue {
    pub fn new(capacity: usize) -> Self {
        let (sender, receiver) = bounded(capacity);
        Self { sender, receiver }
    }

    /// Sender handle for the producing thread.
    pub fn sender(&self) -> EventSender {
        EventSender {
            sender: self.sender.clone(),
        }
    }

    /// Drain everything queued since the last frame, in arrival order.
    pub fn drain(&self) -> Vec<GameEvent> {
        let mut out = Vec::new();
        while let Ok(ev) = self.receiver.try_recv() {
            out.push(ev);
        }
        out
    }
}

#[derive(Clone)]
pub struct EventSender {
    sender: Sender<GameEvent>,
}

impl EventSender {
    /// Enqueue an event. Never blocks; drops on a full queue.
    pub fn send(&self, ev: GameEvent) -> bool {
        match self.sender.try_send(ev) {
            Ok(()) => true,
            Err(TrySendError::Full(ev)) => {
                warn!("event queue full, dropping {:?}", ev);
                false
            }
            Err(TrySendError::Disconnected(_)) => false,
        }
    }
}

/// Outbound notifications from the camera core to the rest of the client.
/// The production impl forwards into the UI / render layers; tests record.
pub trait ViewNotify {
    /// The draw rules for this entity changed (it became, or stopped being,
    /// an observed target); its world/view models must re-evaluate.
    fn entity_visibility_dirty(&mut self, ent: EntityId);

    /// The freeze camera finished its travel and the frame should hold.
    fn freeze_cam_started(&mut self, slot: usize, hold_ms: i32);

    /// A cameraman UI toggle changed state.
    fn cameraman_ui_changed(&mut self, toggle: CameramanToggle, enabled: bool);
}

/// No-op sink for paths that don't care about notifications.
pub struct NullNotify;

impl ViewNotify for NullNotify {
    fn entity_visibility_dirty(&mut self, _ent: EntityId) {}
    fn freeze_cam_started(&mut self, _slot: usize, _hold_ms: i32) {}
    fn cameraman_ui_changed(&mut self, _toggle: CameramanToggle, _enabled: bool) {}
}
