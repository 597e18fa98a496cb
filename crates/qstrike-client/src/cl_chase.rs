// cl_chase.rs -- chase camera approach control
//
// Chase-style cameras sit behind their target at a smoothed distance. The
// distance ramps out over time and is pulled in whenever world geometry
// blocks the line from the target to the desired eye point. The pulled-in
// distance becomes the new baseline, so a camera that backed into a wall
// stays put instead of oscillating.

use qstrike_common::q_shared::*;

use crate::cl_camera::{
    hold_last_eye, CameraResult, TraceOracle, ViewInputs, CAMERA_HULL_MAX, CAMERA_HULL_MIN,
};
use crate::cl_ents::{EntityClass, EntityId};
use crate::client::ClientState;

// chase pitch is clamped so the camera never swings underneath the target
const CHASE_PITCH_MAX: f32 = 56.0;

/// Smoothed per-viewer chase distance. Persists across frames.
#[derive(Debug, Clone)]
pub struct ChaseState {
    pub distance: f32,
}

impl Default for ChaseState {
    fn default() -> Self {
        Self { distance: 16.0 }
    }
}

impl ChaseState {
    pub fn reset(&mut self, min_distance: f32) {
        self.distance = min_distance;
    }

    /// Back the camera away at the configured rate, up to `max`.
    pub fn approach(&mut self, frametime: f32, rate: f32, max: f32) {
        self.distance = (self.distance + rate * frametime).min(max);
    }

    /// Adopt a collision-clamped distance as the new baseline.
    pub fn clamp_to(&mut self, distance: f32) {
        self.distance = distance;
    }
}

/// Maximum pull-back for a target class. Large entities need the camera
/// further out to stay in frame; small projectiles look wrong with a long
/// boom.
pub fn chase_max_distance(class: EntityClass, tuning: &crate::cl_camera::CameraTuning) -> f32 {
    match class {
        EntityClass::Vehicle => tuning.chase_distance_max * tuning.chase_vehicle_scale,
        EntityClass::Projectile => tuning.chase_projectile_max.min(tuning.chase_distance_max),
        EntityClass::Player | EntityClass::Prop => tuning.chase_distance_max,
    }
}

/// Sweep from `anchor` backward along `forward` and return the distance
/// actually available before the first blocking surface. The returned
/// distance never exceeds the blocked fraction of the request, so the
/// camera cannot render through the surface.
pub fn pull_in_distance(
    oracle: &dyn TraceOracle,
    anchor: &Vec3,
    forward: &Vec3,
    desired: f32,
    ignore_ent: i32,
) -> f32 {
    let end = vector_ma(anchor, -desired, forward);
    let tr = oracle.trace(anchor, &CAMERA_HULL_MIN, &CAMERA_HULL_MAX, &end, ignore_ent, MASK_SOLID);
    if tr.fraction < 1.0 {
        desired * tr.fraction
    } else {
        desired
    }
}

/// Third-person chase behind the target.
pub fn calc_chase_view(inp: &ViewInputs, cl: &mut ClientState, target: EntityId) -> CameraResult {
    let Some(targ) = inp.ents.resolve(target) else {
        // no live target: hold the last valid in-map position
        return hold_last_eye(cl, inp.tuning);
    };

    let mut angles = vector_copy(&cl.viewangles);
    if angles[PITCH] > CHASE_PITCH_MAX {
        angles[PITCH] = CHASE_PITCH_MAX;
    }
    let (forward, _, _) = angle_vectors_tuple(&angles);

    let anchor = targ.eye_position();
    let max = chase_max_distance(targ.class, inp.tuning);

    cl.chase
        .approach(inp.frametime, inp.tuning.chase_ramp_rate, max);

    let clamped = pull_in_distance(inp.oracle, &anchor, &forward, cl.chase.distance, target.index);
    if clamped < cl.chase.distance {
        cl.chase.clamp_to(clamped);
    }

    CameraResult {
        origin: vector_ma(&anchor, -cl.chase.distance, &forward),
        angles,
        fov: inp.tuning.fov_x,
    }
}
