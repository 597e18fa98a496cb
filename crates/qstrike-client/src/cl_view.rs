// cl_view.rs -- per-frame view setup
//
// Runs once per simulation frame on the main thread: drain queued game
// events, fold the replicated observer fields into each slot, dispatch the
// active mode's evaluator, and hand the final eye tuple to the renderer.

use std::f32::consts::PI;

use log::warn;
use rand::Rng;

use crate::cl_camera::{calc_observer_view, CameraTuning, TraceOracle, ViewInputs};
use crate::cl_director::{CameramanFlags, DirectorPolicy};
use crate::cl_ents::EntityList;
use crate::cl_events::{EventQueue, GameEvent, ViewNotify};
use crate::cl_freeze::{freeze_expire, freeze_on_mode_exit, FreezePhase, FreezeSequence};
use crate::cl_spectator::ObserverMode;
use crate::client::{ClientSlots, ClientState};

/// Vertical field of view for a horizontal one at the given surface size.
pub fn calc_fov(fov_x: f32, width: f32, height: f32) -> f32 {
    let fov_x = if (1.0..=179.0).contains(&fov_x) {
        fov_x
    } else {
        warn!("bad fov: {}", fov_x);
        fov_x.clamp(1.0, 179.0)
    };

    let x = width / (fov_x / 360.0 * PI).tan();
    let a = (height / x).atan();
    a * 360.0 / PI
}

/// Fold one frame's worth of game events into the slot states.
fn apply_events<R: Rng>(
    events: &[GameEvent],
    slots: &mut ClientSlots,
    ents: &EntityList,
    tuning: &CameraTuning,
    time: i32,
    rng: &mut R,
    notify: &mut dyn ViewNotify,
) {
    for ev in events {
        match *ev {
            GameEvent::PlayerDeath { victim, killer } => {
                for (_, cl) in slots.iter_mut() {
                    if cl.viewer_ent == victim {
                        cl.death_time = time;
                        cl.pre_death_angles = cl.viewangles;
                        cl.killer = killer;
                    }
                }
            }
            GameEvent::ShowFreezePanel { victim, killer, stats } => {
                for (_, cl) in slots.iter_mut() {
                    if cl.viewer_ent == victim {
                        cl.freeze = Some(FreezeSequence::begin(
                            time,
                            cl.last_eye_origin,
                            victim,
                            killer,
                            stats,
                            tuning,
                            rng,
                        ));
                    }
                }
            }
            GameEvent::HideFreezePanel { victim } => {
                for (_, cl) in slots.iter_mut() {
                    if cl.viewer_ent == victim {
                        if let Some(seq) = cl.freeze.as_mut() {
                            seq.phase = FreezePhase::Hidden;
                        }
                    }
                }
            }
            GameEvent::SpecTargetUpdated { slot, target } => {
                if let Some(cl) = slots.get_mut(slot) {
                    cl.observer.set_target(target, ents, notify);
                }
            }
        }
    }
}

/// Update one slot's render definition from its observer state.
fn v_calc_refdef(
    cl: &mut ClientState,
    slot: usize,
    director: &DirectorPolicy,
    ents: &EntityList,
    oracle: &dyn TraceOracle,
    tuning: &CameraTuning,
    time: i32,
    frametime: f32,
    notify: &mut dyn ViewNotify,
) {
    cl.time = time;

    let old_mode =
        cl.observer
            .update_from_network(cl.net.mode, cl.net.target(), ents, notify);
    let (mode, target) = cl.observer.effective(director);

    if old_mode == ObserverMode::FreezeCam && mode != ObserverMode::FreezeCam {
        freeze_on_mode_exit(cl, tuning);
    }
    freeze_expire(cl, time, tuning);

    let inp = ViewInputs {
        ents,
        oracle,
        tuning,
        time,
        frametime,
    };
    let res = calc_observer_view(&inp, cl, slot, mode, target, cl.hltv, notify);

    cl.last_eye_origin = res.origin;
    cl.last_eye_angles = res.angles;

    cl.refdef.vieworg = res.origin;
    cl.refdef.viewangles = res.angles;
    cl.refdef.fov_x = res.fov;
    if cl.refdef.width > 0 && cl.refdef.height > 0 {
        cl.refdef.fov_y = calc_fov(res.fov, cl.refdef.width as f32, cl.refdef.height as f32);
    }
    cl.refdef.third_person = !mode.first_person();
}

/// Frame entry point for the camera core. Each slot is evaluated with an
/// explicit slot index; nothing here is ambient or global.
pub fn cl_frame<R: Rng>(
    slots: &mut ClientSlots,
    director: &mut DirectorPolicy,
    ents: &EntityList,
    oracle: &dyn TraceOracle,
    tuning: &CameraTuning,
    queue: &EventQueue,
    time: i32,
    frametime: f32,
    rng: &mut R,
    notify: &mut dyn ViewNotify,
) {
    let events = queue.drain();
    apply_events(&events, slots, ents, tuning, time, rng, notify);

    for slot in 0..slots.len() {
        // replicated cameraman state rides the per-slot fields; only the
        // final value this frame matters
        if let Some(cl) = slots.get(slot) {
            director
                .set_cameraman_flags(CameramanFlags::from_bits_truncate(cl.net.cameraman_flags));
        }
        if let Some(cl) = slots.get_mut(slot) {
            v_calc_refdef(
                cl, slot, director, ents, oracle, tuning, time, frametime, notify,
            );
        }
    }

    director.flush_ui_changes(notify);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cl_camera::test_support::OpenWorld;
    use crate::cl_director::CameramanToggle;
    use crate::cl_ents::EntityId;
    use crate::cl_events::{CombatStats, EventQueue};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    struct RecordingNotify {
        visibility: Vec<EntityId>,
        freeze_starts: Vec<(usize, i32)>,
        ui_changes: Vec<(CameramanToggle, bool)>,
    }

    impl RecordingNotify {
        fn new() -> Self {
            Self {
                visibility: Vec::new(),
                freeze_starts: Vec::new(),
                ui_changes: Vec::new(),
            }
        }
    }

    impl ViewNotify for RecordingNotify {
        fn entity_visibility_dirty(&mut self, ent: EntityId) {
            self.visibility.push(ent);
        }
        fn freeze_cam_started(&mut self, slot: usize, hold_ms: i32) {
            self.freeze_starts.push((slot, hold_ms));
        }
        fn cameraman_ui_changed(&mut self, toggle: CameramanToggle, enabled: bool) {
            self.ui_changes.push((toggle, enabled));
        }
    }

    fn assert_near(a: f32, b: f32, eps: f32) {
        assert!((a - b).abs() < eps, "{} !~ {}", a, b);
    }

    #[test]
    fn test_calc_fov_90_degree_4_3() {
        assert_near(calc_fov(90.0, 640.0, 480.0), 73.739, 0.01);
    }

    #[test]
    fn test_calc_fov_square_surface() {
        assert_near(calc_fov(90.0, 100.0, 100.0), 90.0, 0.001);
    }

    #[test]
    fn test_calc_fov_out_of_range_clamps() {
        // degenerate input degrades instead of failing
        let fov_y = calc_fov(500.0, 640.0, 480.0);
        assert!(fov_y.is_finite());
    }

    #[test]
    fn test_frame_chase_updates_refdef() {
        let mut ents = EntityList::new();
        let viewer = ents.spawn_at(1);
        let target = ents.spawn_at(2);
        {
            let t = ents.resolve_mut(target).unwrap();
            t.origin = [100.0, 0.0, 0.0];
            t.view_offset = [0.0, 0.0, 64.0];
        }

        let mut slots = ClientSlots::new(1);
        {
            let cl = slots.get_mut(0).unwrap();
            cl.viewer_ent = viewer;
            cl.net.mode = ObserverMode::Chase.as_raw();
            cl.net.target_index = target.index;
            cl.net.target_serial = target.serial;
            cl.refdef.width = 1920;
            cl.refdef.height = 1080;
        }

        let mut director = DirectorPolicy::new();
        let tuning = CameraTuning::default();
        let queue = EventQueue::new(8);
        let oracle = OpenWorld;
        let mut rng = StdRng::seed_from_u64(1);
        let mut rec = RecordingNotify::new();

        cl_frame(
            &mut slots,
            &mut director,
            &ents,
            &oracle,
            &tuning,
            &queue,
            100,
            0.016,
            &mut rng,
            &mut rec,
        );

        let cl = slots.get(0).unwrap();
        assert!(cl.refdef.third_person);
        assert_ne!(cl.refdef.vieworg, [0.0; 3]);
        assert_eq!(cl.refdef.fov_x, tuning.fov_x);
        assert!(cl.refdef.fov_y > 0.0);
        // new target got its visibility refresh
        assert_eq!(rec.visibility, vec![target]);
    }

    #[test]
    fn test_freeze_panel_event_drives_sequence_to_start() {
        let mut ents = EntityList::new();
        let viewer = ents.spawn_at(1);
        let killer = ents.spawn_at(2);
        {
            let k = ents.resolve_mut(killer).unwrap();
            k.origin = [200.0, 0.0, 0.0];
            k.view_offset = [0.0, 0.0, 64.0];
        }

        let mut slots = ClientSlots::new(1);
        {
            let cl = slots.get_mut(0).unwrap();
            cl.viewer_ent = viewer;
            cl.last_eye_origin = [0.0, 0.0, 64.0];
            cl.net.mode = ObserverMode::FreezeCam.as_raw();
        }

        let mut director = DirectorPolicy::new();
        let tuning = CameraTuning::default();
        let queue = EventQueue::new(8);
        queue.sender().send(GameEvent::ShowFreezePanel {
            victim: viewer,
            killer,
            stats: CombatStats {
                hits_given: 3,
                damage_given: 57,
                ..Default::default()
            },
        });
        let oracle = OpenWorld;
        let mut rng = StdRng::seed_from_u64(9);
        let mut rec = RecordingNotify::new();

        cl_frame(
            &mut slots, &mut director, &ents, &oracle, &tuning, &queue, 1000, 0.016, &mut rng,
            &mut rec,
        );
        assert!(slots.get(0).unwrap().freeze.is_some());
        assert!(rec.freeze_starts.is_empty());

        // travel duration later the hold begins, exactly once
        cl_frame(
            &mut slots,
            &mut director,
            &ents,
            &oracle,
            &tuning,
            &queue,
            1000 + tuning.freeze_travel_ms,
            0.016,
            &mut rng,
            &mut rec,
        );
        assert_eq!(rec.freeze_starts, vec![(0, tuning.freeze_hold_ms)]);
    }

    #[test]
    fn test_player_death_snapshots_view() {
        let mut ents = EntityList::new();
        let viewer = ents.spawn_at(1);
        let killer = ents.spawn_at(2);

        let mut slots = ClientSlots::new(1);
        {
            let cl = slots.get_mut(0).unwrap();
            cl.viewer_ent = viewer;
            cl.viewangles = [5.0, 270.0, 0.0];
        }

        let mut director = DirectorPolicy::new();
        let tuning = CameraTuning::default();
        let queue = EventQueue::new(8);
        queue
            .sender()
            .send(GameEvent::PlayerDeath { victim: viewer, killer });
        let oracle = OpenWorld;
        let mut rng = StdRng::seed_from_u64(2);
        let mut rec = RecordingNotify::new();

        cl_frame(
            &mut slots, &mut director, &ents, &oracle, &tuning, &queue, 777, 0.016, &mut rng,
            &mut rec,
        );

        let cl = slots.get(0).unwrap();
        assert_eq!(cl.death_time, 777);
        assert_eq!(cl.pre_death_angles, [5.0, 270.0, 0.0]);
        assert_eq!(cl.killer, killer);
    }

    #[test]
    fn test_unresolved_target_holds_last_eye_across_frames() {
        let mut ents = EntityList::new();
        let viewer = ents.spawn_at(1);

        let mut slots = ClientSlots::new(1);
        {
            let cl = slots.get_mut(0).unwrap();
            cl.viewer_ent = viewer;
            cl.last_eye_origin = [9.0, 9.0, 9.0];
            cl.last_eye_angles = [0.0, 45.0, 0.0];
            cl.net.mode = ObserverMode::InEye.as_raw();
            // target that has not streamed in yet
            cl.net.target_index = 30;
            cl.net.target_serial = 2;
        }

        let mut director = DirectorPolicy::new();
        let tuning = CameraTuning::default();
        let queue = EventQueue::new(8);
        let oracle = OpenWorld;
        let mut rng = StdRng::seed_from_u64(2);
        let mut rec = RecordingNotify::new();

        for t in [100, 200, 300] {
            cl_frame(
                &mut slots, &mut director, &ents, &oracle, &tuning, &queue, t, 0.1, &mut rng,
                &mut rec,
            );
            let cl = slots.get(0).unwrap();
            assert_eq!(cl.refdef.vieworg, [9.0, 9.0, 9.0]);
            assert_eq!(cl.refdef.viewangles, [0.0, 45.0, 0.0]);
        }
    }

    #[test]
    fn test_cameraman_flags_flush_once_per_frame() {
        let ents = EntityList::new();
        let mut slots = ClientSlots::new(1);
        slots.get_mut(0).unwrap().net.cameraman_flags = CameramanFlags::XRAY.bits();

        let mut director = DirectorPolicy::new();
        let tuning = CameraTuning::default();
        let queue = EventQueue::new(8);
        let oracle = OpenWorld;
        let mut rng = StdRng::seed_from_u64(2);
        let mut rec = RecordingNotify::new();

        cl_frame(
            &mut slots, &mut director, &ents, &oracle, &tuning, &queue, 1, 0.016, &mut rng,
            &mut rec,
        );
        assert_eq!(rec.ui_changes, vec![(CameramanToggle::XRay, true)]);

        // same state next frame: nothing re-sent
        cl_frame(
            &mut slots, &mut director, &ents, &oracle, &tuning, &queue, 2, 0.016, &mut rng,
            &mut rec,
        );
        assert_eq!(rec.ui_changes.len(), 1);
    }
}
