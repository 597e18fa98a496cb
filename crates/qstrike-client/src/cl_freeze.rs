// cl_freeze.rs -- post-kill freeze camera sequencing
//
// When the local viewer dies, the camera travels from the death eye
// position to a point near the killer's face, holds the frame there for the
// panel, then hides. The whole sequence is frame-polled off a stored start
// time; there are no scheduled callbacks to cancel.

use log::debug;
use rand::Rng;

use qstrike_common::q_shared::*;

use crate::cl_camera::{
    calc_death_cam_view, CameraResult, CameraTuning, ViewInputs, CAMERA_HULL_MAX, CAMERA_HULL_MIN,
};
use crate::cl_ents::EntityId;
use crate::cl_events::{CombatStats, ViewNotify};
use crate::client::ClientState;

// how far the stop point is pushed up when a blocked trace forces the
// camera in close, scaled by how much of the travel was cut off
const FREEZE_CLOSE_NUDGE_UP: f32 = 16.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FreezePhase {
    Starting,
    Traveling,
    Holding,
    ExtendedHold,
    Hidden,
}

/// One post-kill camera presentation. Created when the freeze panel event
/// names the local viewer as victim; destroyed when hidden. Idle is the
/// absence of a sequence.
#[derive(Debug, Clone)]
pub struct FreezeSequence {
    pub phase: FreezePhase,
    pub start_time: i32,
    /// Eye position when the sequence began; travel interpolates from here.
    pub travel_start: Vec3,
    /// The killer, or the victim itself for self-inflicted deaths.
    pub target: EntityId,
    /// Rolled once at creation so every frame resolves the same stop point.
    pub stop_distance: f32,
    pub jitter_z: f32,
    /// Display-only counters for the panel.
    pub stats: CombatStats,
    pub started_sent: bool,
    pub aborted: bool,
}

impl FreezeSequence {
    /// Snapshot a new sequence for a kill. `travel_start` is the current
    /// eye position of the victim's view.
    pub fn begin<R: Rng>(
        time: i32,
        travel_start: Vec3,
        victim: EntityId,
        killer: EntityId,
        stats: CombatStats,
        tuning: &CameraTuning,
        rng: &mut R,
    ) -> Self {
        let target = if killer.is_none() || killer == victim {
            victim
        } else {
            killer
        };
        let lo = tuning.freeze_distance_min.min(tuning.freeze_distance_max);
        let hi = tuning.freeze_distance_min.max(tuning.freeze_distance_max);
        let stop_distance = if hi > lo { rng.gen_range(lo..hi) } else { lo };
        let j = tuning.freeze_jitter_z.abs();
        let jitter_z = if j > 0.0 { rng.gen_range(-j..j) } else { 0.0 };

        debug!(
            "freeze sequence: target {:?}, stop {:.1}, jitter {:.1}",
            target, stop_distance, jitter_z
        );

        Self {
            phase: FreezePhase::Starting,
            start_time: time,
            travel_start,
            target,
            stop_distance,
            jitter_z,
            stats,
            started_sent: false,
            aborted: false,
        }
    }

    fn travel_frac(&self, time: i32, travel_ms: i32) -> f32 {
        if travel_ms <= 0 {
            return 1.0;
        }
        ((time - self.start_time) as f32 / travel_ms as f32).clamp(0.0, 1.0)
    }
}

fn smoothstep(t: f32) -> f32 {
    t * t * (3.0 - 2.0 * t)
}

/// Resolve where the travel stops this frame: a point at the rolled
/// distance from the target, at the target's eye height, pulled in and
/// nudged upward when geometry is in the way.
fn resolve_stop_point(inp: &ViewInputs, seq: &FreezeSequence, target_eye: &Vec3) -> Vec3 {
    let mut dir = vector_subtract(&seq.travel_start, target_eye);
    dir[2] = 0.0;
    if vector_normalize(&mut dir) < 1.0 {
        // died right on top of the killer; pick a fixed axis
        dir = [1.0, 0.0, 0.0];
    }

    let mut candidate = vector_ma(target_eye, seq.stop_distance, &dir);
    candidate[2] = target_eye[2] + seq.jitter_z;

    let tr = inp.oracle.trace(
        target_eye,
        &CAMERA_HULL_MIN,
        &CAMERA_HULL_MAX,
        &candidate,
        seq.target.index,
        MASK_SOLID,
    );
    if tr.fraction >= 1.0 {
        return candidate;
    }

    // close-quarters kill: re-aim at the literal eye position and lift the
    // stop proportionally so the shot doesn't look up through the floor
    let mut stop = tr.endpos;
    stop[2] += (1.0 - tr.fraction) * FREEZE_CLOSE_NUDGE_UP;
    stop
}

/// Freeze camera evaluator. Falls back to the generic death camera when no
/// sequence exists or the killer never resolved.
pub fn calc_freeze_cam_view(
    inp: &ViewInputs,
    cl: &mut ClientState,
    slot: usize,
    notify: &mut dyn ViewNotify,
) -> CameraResult {
    let Some(mut seq) = cl.freeze.take() else {
        return calc_death_cam_view(inp, cl);
    };

    let Some(targ) = inp.ents.resolve(seq.target) else {
        // killer never streamed in; don't stall the presentation
        seq.aborted = true;
        cl.freeze = Some(seq);
        return calc_death_cam_view(inp, cl);
    };
    let target_eye = targ.eye_position();

    if seq.phase == FreezePhase::Starting {
        seq.phase = FreezePhase::Traveling;
    }

    let stop = resolve_stop_point(inp, &seq, &target_eye);
    let frac = seq.travel_frac(inp.time, inp.tuning.freeze_travel_ms);
    let origin = vector_lerp(&seq.travel_start, &stop, smoothstep(frac));

    let mut angles = vectoangles_tuple(&vector_subtract(&target_eye, &origin));
    if vector_compare(&target_eye, &origin) {
        angles = cl.last_eye_angles;
    }

    if frac >= 1.0 && !seq.started_sent {
        // fires exactly once per sequence
        seq.started_sent = true;
        seq.phase = FreezePhase::Holding;
        notify.freeze_cam_started(slot, inp.tuning.freeze_hold_ms);
    }

    cl.freeze = Some(seq);
    CameraResult {
        origin,
        angles,
        fov: inp.tuning.fov_x,
    }
}

/// Sequencing when the observer mode moves away from FreezeCam: linger in
/// an extended hold when one is configured, otherwise hide immediately.
pub fn freeze_on_mode_exit(cl: &mut ClientState, tuning: &CameraTuning) {
    if let Some(seq) = cl.freeze.as_mut() {
        if tuning.freeze_extended_hold_ms > 0 && seq.phase != FreezePhase::Hidden {
            seq.phase = FreezePhase::ExtendedHold;
        } else {
            seq.phase = FreezePhase::Hidden;
        }
    }
}

/// Drop hidden and timed-out sequences. Runs once per frame.
pub fn freeze_expire(cl: &mut ClientState, time: i32, tuning: &CameraTuning) {
    let drop = match cl.freeze.as_ref() {
        None => false,
        Some(seq) => match seq.phase {
            FreezePhase::Hidden => true,
            FreezePhase::ExtendedHold => {
                // measured from sequence start; the mode change away from
                // FreezeCam can race the hold timer
                let end = seq.start_time
                    + tuning.freeze_travel_ms
                    + tuning.freeze_hold_ms
                    + tuning.freeze_extended_hold_ms;
                time >= end
            }
            _ => false,
        },
    };
    if drop {
        debug!("freeze sequence hidden");
        cl.freeze = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cl_camera::test_support::{OpenWorld, WallWorld};
    use crate::cl_camera::TraceOracle;
    use crate::cl_director::CameramanToggle;
    use crate::cl_ents::EntityList;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    struct RecordingNotify {
        freeze_starts: Vec<(usize, i32)>,
    }

    impl RecordingNotify {
        fn new() -> Self {
            Self { freeze_starts: Vec::new() }
        }
    }

    impl ViewNotify for RecordingNotify {
        fn entity_visibility_dirty(&mut self, _ent: EntityId) {}
        fn freeze_cam_started(&mut self, slot: usize, hold_ms: i32) {
            self.freeze_starts.push((slot, hold_ms));
        }
        fn cameraman_ui_changed(&mut self, _toggle: CameramanToggle, _enabled: bool) {}
    }

    fn make_inputs<'a>(
        ents: &'a EntityList,
        oracle: &'a dyn TraceOracle,
        tuning: &'a CameraTuning,
        time: i32,
    ) -> ViewInputs<'a> {
        ViewInputs {
            ents,
            oracle,
            tuning,
            time,
            frametime: 0.016,
        }
    }

    fn band_tuning() -> CameraTuning {
        CameraTuning {
            freeze_distance_min: 60.0,
            freeze_distance_max: 80.0,
            freeze_travel_ms: 400,
            freeze_hold_ms: 4000,
            ..Default::default()
        }
    }

    #[test]
    fn test_travel_reaches_stop_point_and_fires_once() {
        let mut ents = EntityList::new();
        let victim = ents.spawn_at(1);
        let killer = ents.spawn_at(2);
        {
            let k = ents.resolve_mut(killer).unwrap();
            k.origin = [300.0, 0.0, 0.0];
            k.view_offset = [0.0, 0.0, 64.0];
        }
        let tuning = band_tuning();
        let oracle = OpenWorld;
        let mut rng = StdRng::seed_from_u64(7);

        let mut cl = ClientState::new();
        cl.viewer_ent = victim;
        cl.last_eye_origin = [0.0, 0.0, 64.0];
        let seq = FreezeSequence::begin(
            1000,
            cl.last_eye_origin,
            victim,
            killer,
            CombatStats::default(),
            &tuning,
            &mut rng,
        );
        let stop_distance = seq.stop_distance;
        assert!((60.0..80.0).contains(&stop_distance));
        cl.freeze = Some(seq);

        let mut rec = RecordingNotify::new();

        // mid-travel: not arrived, nothing sent
        let inp = make_inputs(&ents, &oracle, &tuning, 1200);
        calc_freeze_cam_view(&inp, &mut cl, 0, &mut rec);
        assert!(rec.freeze_starts.is_empty());

        // travel complete: eye sits at the resolved stop point
        let inp = make_inputs(&ents, &oracle, &tuning, 1400);
        let res = calc_freeze_cam_view(&inp, &mut cl, 0, &mut rec);
        let killer_eye = [300.0, 0.0, 64.0];
        let flat = [
            res.origin[0] - killer_eye[0],
            res.origin[1] - killer_eye[1],
            0.0,
        ];
        assert!((vector_length(&flat) - stop_distance).abs() < 1e-2);
        assert_eq!(rec.freeze_starts, vec![(0, 4000)]);

        // later frames hold, and the notification does not repeat
        let inp = make_inputs(&ents, &oracle, &tuning, 2400);
        let res2 = calc_freeze_cam_view(&inp, &mut cl, 0, &mut rec);
        assert_eq!(res2.origin, res.origin);
        assert_eq!(rec.freeze_starts.len(), 1);
    }

    #[test]
    fn test_travel_start_is_exact_at_zero_elapsed() {
        let mut ents = EntityList::new();
        let victim = ents.spawn_at(1);
        let killer = ents.spawn_at(2);
        ents.resolve_mut(killer).unwrap().origin = [200.0, 50.0, 0.0];
        let tuning = band_tuning();
        let oracle = OpenWorld;
        let mut rng = StdRng::seed_from_u64(3);

        let mut cl = ClientState::new();
        let start = [10.0, 20.0, 64.0];
        cl.freeze = Some(FreezeSequence::begin(
            500,
            start,
            victim,
            killer,
            CombatStats::default(),
            &tuning,
            &mut rng,
        ));

        let inp = make_inputs(&ents, &oracle, &tuning, 500);
        let res = calc_freeze_cam_view(&inp, &mut cl, 0, &mut RecordingNotify::new());
        assert_eq!(res.origin, start);
    }

    #[test]
    fn test_blocked_stop_point_stays_within_hit_fraction() {
        let mut ents = EntityList::new();
        let victim = ents.spawn_at(1);
        let killer = ents.spawn_at(2);
        {
            let k = ents.resolve_mut(killer).unwrap();
            k.origin = [0.0, 0.0, 0.0];
            k.view_offset = [0.0, 0.0, 64.0];
        }
        let tuning = band_tuning();
        // killer against a wall 20 units toward the victim
        let oracle = WallWorld { axis: 0, plane: 20.0 };
        let mut rng = StdRng::seed_from_u64(11);

        let mut cl = ClientState::new();
        cl.freeze = Some(FreezeSequence::begin(
            0,
            [500.0, 0.0, 64.0],
            victim,
            killer,
            CombatStats::default(),
            &tuning,
            &mut rng,
        ));

        let inp = make_inputs(&ents, &oracle, &tuning, 400);
        let res = calc_freeze_cam_view(&inp, &mut cl, 0, &mut RecordingNotify::new());
        // never past the wall, and lifted rather than buried
        assert!(res.origin[0] <= 20.0 + 1e-3);
        assert!(res.origin[2] > 64.0);
    }

    #[test]
    fn test_unresolved_killer_falls_back_to_death_cam() {
        let mut ents = EntityList::new();
        let victim = ents.spawn_at(1);
        ents.resolve_mut(victim).unwrap().ragdoll_origin = Some([0.0, 0.0, 0.0]);
        let tuning = band_tuning();
        let oracle = OpenWorld;
        let mut rng = StdRng::seed_from_u64(1);

        let ghost_killer = EntityId::new(50, 9); // never streams in
        let mut cl = ClientState::new();
        cl.viewer_ent = victim;
        cl.pre_death_angles = [0.0, 90.0, 0.0];
        cl.death_time = 0;
        cl.freeze = Some(FreezeSequence::begin(
            0,
            [0.0, 0.0, 64.0],
            victim,
            ghost_killer,
            CombatStats::default(),
            &tuning,
            &mut rng,
        ));

        let inp = make_inputs(&ents, &oracle, &tuning, 100);
        let res = calc_freeze_cam_view(&inp, &mut cl, 0, &mut RecordingNotify::new());

        let mut cl2 = ClientState::new();
        cl2.viewer_ent = victim;
        cl2.pre_death_angles = [0.0, 90.0, 0.0];
        cl2.death_time = 0;
        let inp2 = make_inputs(&ents, &oracle, &tuning, 100);
        let expected = calc_death_cam_view(&inp2, &mut cl2);
        assert_eq!(res, expected);
    }

    #[test]
    fn test_self_inflicted_targets_victim() {
        let tuning = band_tuning();
        let mut rng = StdRng::seed_from_u64(2);
        let victim = EntityId::new(3, 1);
        let seq = FreezeSequence::begin(
            0,
            VEC3_ORIGIN,
            victim,
            EntityId::NONE,
            CombatStats::default(),
            &tuning,
            &mut rng,
        );
        assert_eq!(seq.target, victim);

        let seq2 = FreezeSequence::begin(
            0,
            VEC3_ORIGIN,
            victim,
            victim,
            CombatStats::default(),
            &tuning,
            &mut rng,
        );
        assert_eq!(seq2.target, victim);
    }

    #[test]
    fn test_mode_exit_with_extended_hold_lingers() {
        let tuning = CameraTuning {
            freeze_extended_hold_ms: 2000,
            ..band_tuning()
        };
        let mut rng = StdRng::seed_from_u64(5);
        let mut cl = ClientState::new();
        cl.freeze = Some(FreezeSequence::begin(
            1000,
            VEC3_ORIGIN,
            EntityId::new(1, 1),
            EntityId::new(2, 1),
            CombatStats::default(),
            &tuning,
            &mut rng,
        ));

        freeze_on_mode_exit(&mut cl, &tuning);
        assert_eq!(cl.freeze.as_ref().unwrap().phase, FreezePhase::ExtendedHold);

        // still lingering inside the extended window
        freeze_expire(&mut cl, 1000 + 400 + 4000 + 1999, &tuning);
        assert!(cl.freeze.is_some());

        freeze_expire(&mut cl, 1000 + 400 + 4000 + 2000, &tuning);
        assert!(cl.freeze.is_none());
    }

    #[test]
    fn test_mode_exit_without_extended_hold_hides() {
        let tuning = band_tuning();
        let mut rng = StdRng::seed_from_u64(5);
        let mut cl = ClientState::new();
        cl.freeze = Some(FreezeSequence::begin(
            0,
            VEC3_ORIGIN,
            EntityId::new(1, 1),
            EntityId::new(2, 1),
            CombatStats::default(),
            &tuning,
            &mut rng,
        ));

        freeze_on_mode_exit(&mut cl, &tuning);
        assert_eq!(cl.freeze.as_ref().unwrap().phase, FreezePhase::Hidden);
        freeze_expire(&mut cl, 1, &tuning);
        assert!(cl.freeze.is_none());
    }
}
