// cl_camera.rs -- observer camera evaluators
//
// One evaluator per observer mode. Common contract: inputs are the viewer
// slot state, the (possibly unresolvable) target, and the frame clock;
// output is a CameraResult. Evaluators never fail -- missing inputs degrade
// to holding the last known eye position.

use log::warn;

use qstrike_common::cvar::{CvarContext, CVAR_ARCHIVE};
use qstrike_common::q_shared::*;

use crate::cl_chase::calc_chase_view;
use crate::cl_ents::EntityId;
use crate::cl_ents::EntityList;
use crate::cl_events::ViewNotify;
use crate::cl_freeze::calc_freeze_cam_view;
use crate::cl_spectator::ObserverMode;
use crate::client::ClientState;

/// First blocking surface along a hull sweep. Implemented by the collision
/// subsystem; mocked in tests.
pub trait TraceOracle {
    fn trace(
        &self,
        start: &Vec3,
        mins: &Vec3,
        maxs: &Vec3,
        end: &Vec3,
        ignore_ent: i32,
        contentmask: i32,
    ) -> Trace;
}

// hull swept for camera placement; keeps the near plane off surfaces
pub const CAMERA_HULL_MIN: Vec3 = [-4.0, -4.0, -4.0];
pub const CAMERA_HULL_MAX: Vec3 = [4.0, 4.0, 4.0];

/// Final per-frame camera output: where the eye sits, which way it looks,
/// and the field of view. Recomputed every frame.
#[derive(Debug, Clone, PartialEq)]
pub struct CameraResult {
    pub origin: Vec3,
    pub angles: Vec3,
    pub fov: f32,
}

/// Camera tuning values, snapshotted from the cvar system once per frame
/// and passed by reference into the evaluators.
#[derive(Debug, Clone)]
pub struct CameraTuning {
    pub fov_x: f32,

    pub chase_distance_min: f32,
    pub chase_distance_max: f32,
    /// Back-away rate, world units per second.
    pub chase_ramp_rate: f32,
    pub chase_vehicle_scale: f32,
    pub chase_projectile_max: f32,

    pub deathcam_ms: i32,

    pub freeze_travel_ms: i32,
    pub freeze_hold_ms: i32,
    pub freeze_extended_hold_ms: i32,
    pub freeze_distance_min: f32,
    pub freeze_distance_max: f32,
    pub freeze_jitter_z: f32,

    /// How much of the target's accumulated aim punch the in-eye camera
    /// follows. 0 = steady crosshair, 1 = full recoil.
    pub recoil_follow: f32,

    pub roll_angle: f32,
    pub roll_speed: f32,
    pub bob_pitch: f32,
    pub bob_roll: f32,
}

impl Default for CameraTuning {
    fn default() -> Self {
        Self {
            fov_x: 90.0,
            chase_distance_min: 16.0,
            chase_distance_max: 96.0,
            chase_ramp_rate: 48.0,
            chase_vehicle_scale: 4.0,
            chase_projectile_max: 32.0,
            deathcam_ms: 3000,
            freeze_travel_ms: 400,
            freeze_hold_ms: 4000,
            freeze_extended_hold_ms: 0,
            freeze_distance_min: 80.0,
            freeze_distance_max: 200.0,
            freeze_jitter_z: 8.0,
            recoil_follow: 1.0,
            roll_angle: 2.0,
            roll_speed: 200.0,
            bob_pitch: 0.002,
            bob_roll: 0.002,
        }
    }
}

/// Register the camera cvars with their defaults.
pub fn register_camera_cvars(ctx: &mut CvarContext) {
    let d = CameraTuning::default();
    ctx.get("fov", &format!("{}", d.fov_x), CVAR_ARCHIVE);
    ctx.get("cl_chasecam_min", &format!("{}", d.chase_distance_min), 0);
    ctx.get("cl_chasecam_max", &format!("{}", d.chase_distance_max), 0);
    ctx.get("cl_chasecam_speed", &format!("{}", d.chase_ramp_rate), 0);
    ctx.get("cl_chasecam_vehicle_scale", &format!("{}", d.chase_vehicle_scale), 0);
    ctx.get("cl_chasecam_projectile_max", &format!("{}", d.chase_projectile_max), 0);
    ctx.get("cl_deathcam_time", &format!("{}", d.deathcam_ms), 0);
    ctx.get("spec_freeze_traveltime", &format!("{}", d.freeze_travel_ms), 0);
    ctx.get("spec_freeze_time", &format!("{}", d.freeze_hold_ms), 0);
    ctx.get("spec_freeze_panel_extended_time", &format!("{}", d.freeze_extended_hold_ms), 0);
    ctx.get("spec_freeze_distance_min", &format!("{}", d.freeze_distance_min), 0);
    ctx.get("spec_freeze_distance_max", &format!("{}", d.freeze_distance_max), 0);
    ctx.get("spec_freeze_jitter", &format!("{}", d.freeze_jitter_z), 0);
    ctx.get("cl_spec_follow_recoil", &format!("{}", d.recoil_follow), CVAR_ARCHIVE);
    ctx.get("cl_rollangle", &format!("{}", d.roll_angle), 0);
    ctx.get("cl_rollspeed", &format!("{}", d.roll_speed), 0);
    ctx.get("cl_bob_pitch", &format!("{}", d.bob_pitch), 0);
    ctx.get("cl_bob_roll", &format!("{}", d.bob_roll), 0);
}

fn cvar_or(ctx: &CvarContext, name: &str, default: f32) -> f32 {
    ctx.find_var(name).map(|v| v.value).unwrap_or(default)
}

impl CameraTuning {
    /// Snapshot the tuning values from the cvar system.
    pub fn from_cvars(ctx: &CvarContext) -> Self {
        let d = CameraTuning::default();
        Self {
            fov_x: cvar_or(ctx, "fov", d.fov_x),
            chase_distance_min: cvar_or(ctx, "cl_chasecam_min", d.chase_distance_min),
            chase_distance_max: cvar_or(ctx, "cl_chasecam_max", d.chase_distance_max),
            chase_ramp_rate: cvar_or(ctx, "cl_chasecam_speed", d.chase_ramp_rate),
            chase_vehicle_scale: cvar_or(ctx, "cl_chasecam_vehicle_scale", d.chase_vehicle_scale),
            chase_projectile_max: cvar_or(ctx, "cl_chasecam_projectile_max", d.chase_projectile_max),
            deathcam_ms: cvar_or(ctx, "cl_deathcam_time", d.deathcam_ms as f32) as i32,
            freeze_travel_ms: cvar_or(ctx, "spec_freeze_traveltime", d.freeze_travel_ms as f32) as i32,
            freeze_hold_ms: cvar_or(ctx, "spec_freeze_time", d.freeze_hold_ms as f32) as i32,
            freeze_extended_hold_ms: cvar_or(
                ctx,
                "spec_freeze_panel_extended_time",
                d.freeze_extended_hold_ms as f32,
            ) as i32,
            freeze_distance_min: cvar_or(ctx, "spec_freeze_distance_min", d.freeze_distance_min),
            freeze_distance_max: cvar_or(ctx, "spec_freeze_distance_max", d.freeze_distance_max),
            freeze_jitter_z: cvar_or(ctx, "spec_freeze_jitter", d.freeze_jitter_z),
            recoil_follow: cvar_or(ctx, "cl_spec_follow_recoil", d.recoil_follow),
            roll_angle: cvar_or(ctx, "cl_rollangle", d.roll_angle),
            roll_speed: cvar_or(ctx, "cl_rollspeed", d.roll_speed),
            bob_pitch: cvar_or(ctx, "cl_bob_pitch", d.bob_pitch),
            bob_roll: cvar_or(ctx, "cl_bob_roll", d.bob_roll),
        }
    }
}

/// Immutable per-frame inputs shared by every evaluator.
pub struct ViewInputs<'a> {
    pub ents: &'a EntityList,
    pub oracle: &'a dyn TraceOracle,
    pub tuning: &'a CameraTuning,
    /// Client render time, milliseconds.
    pub time: i32,
    /// Frame delta, seconds.
    pub frametime: f32,
}

/// Degraded-path result: hold the viewer's last known eye position.
pub fn hold_last_eye(cl: &ClientState, tuning: &CameraTuning) -> CameraResult {
    CameraResult {
        origin: cl.last_eye_origin,
        angles: cl.last_eye_angles,
        fov: tuning.fov_x,
    }
}

/// View roll from lateral velocity.
fn calc_view_roll(velocity: &Vec3, right: &Vec3, tuning: &CameraTuning) -> f32 {
    let mut side = dot_product(velocity, right);
    let sign: f32 = if side < 0.0 { -1.0 } else { 1.0 };
    side = side.abs();

    if side < tuning.roll_speed {
        side = side * tuning.roll_angle / tuning.roll_speed;
    } else {
        side = tuning.roll_angle;
    }

    side * sign
}

/// First-person through the target's eyes.
///
/// A dead target cannot be watched first-person; the evaluator hands the
/// frame to chase immediately so the switch happens with no stale frame in
/// between. In the time-shifted broadcast case the live per-tick view
/// offset is not replicated, so a fixed duck/stand constant is used.
pub fn calc_in_eye_view(
    inp: &ViewInputs,
    cl: &mut ClientState,
    target: EntityId,
    hltv: bool,
) -> CameraResult {
    let Some(targ) = inp.ents.resolve(target) else {
        return hold_last_eye(cl, inp.tuning);
    };

    if !targ.alive {
        return calc_chase_view(inp, cl, target);
    }

    let origin = if hltv {
        targ.eye_position_fixed()
    } else {
        targ.eye_position()
    };

    let mut angles = vector_copy(&targ.angles);
    for i in 0..3 {
        angles[i] += targ.punch_angles[i] + targ.aim_punch_angles[i] * inp.tuning.recoil_follow;
    }

    let (_, right, _) = angle_vectors_tuple(&targ.angles);
    angles[ROLL] += calc_view_roll(&targ.velocity, &right, inp.tuning);

    // gait bob while the target is moving
    let xyspeed =
        (targ.velocity[0] * targ.velocity[0] + targ.velocity[1] * targ.velocity[1]).sqrt();
    let bobfracsin = (inp.time as f32 * 0.01).sin().abs();
    angles[PITCH] += bobfracsin * xyspeed * inp.tuning.bob_pitch;
    angles[ROLL] += bobfracsin * xyspeed * inp.tuning.bob_roll;

    CameraResult {
        origin,
        angles,
        fov: inp.tuning.fov_x,
    }
}

/// Free camera driven by local input. The prediction-error remainder is
/// added so a simulation correction doesn't jerk the view; at rest the
/// offset is exactly zero.
pub fn calc_roaming_view(inp: &ViewInputs, cl: &ClientState) -> CameraResult {
    let err = cl.smoothing.current(inp.time);
    CameraResult {
        origin: vector_add(&cl.free_origin, &err),
        angles: cl.viewangles,
        fov: inp.tuning.fov_x,
    }
}

/// Stationary camera at a replicated map position. One safety sweep keeps
/// it out of solid geometry when the replicated point is degenerate.
pub fn calc_fixed_view(inp: &ViewInputs, cl: &ClientState) -> CameraResult {
    let err = cl.smoothing.current(inp.time);
    let desired = vector_add(&cl.fixed_origin, &err);

    let tr = inp.oracle.trace(
        &cl.last_eye_origin,
        &CAMERA_HULL_MIN,
        &CAMERA_HULL_MAX,
        &desired,
        cl.viewer_ent.index,
        MASK_SOLID,
    );
    let origin = if tr.startsolid {
        warn!("fixed camera start inside solid, holding last eye position");
        cl.last_eye_origin
    } else {
        tr.endpos
    };

    CameraResult {
        origin,
        angles: cl.viewangles,
        fov: inp.tuning.fov_x,
    }
}

/// Post-death camera: pulls back from the ragdoll while blending the view
/// toward the killer.
pub fn calc_death_cam_view(inp: &ViewInputs, cl: &mut ClientState) -> CameraResult {
    // anchored to where the body actually is; the character origin stops
    // simulating at death
    let anchor = inp
        .ents
        .resolve(cl.viewer_ent)
        .and_then(|viewer| viewer.ragdoll_origin)
        .unwrap_or(cl.last_eye_origin);

    let t = inp.tuning;
    let elapsed = (inp.time - cl.death_time).max(0);
    let frac = if t.deathcam_ms > 0 {
        (elapsed as f32 / t.deathcam_ms as f32).clamp(0.0, 1.0)
    } else {
        1.0
    };

    let mut angles = cl.pre_death_angles;
    if let Some(killer) = inp.ents.resolve(cl.killer) {
        let to_killer = vector_subtract(&killer.eye_position(), &anchor);
        if vector_length(&to_killer) > 0.1 {
            let killer_angles = vectoangles_tuple(&to_killer);
            for i in 0..3 {
                angles[i] = lerp_angle(cl.pre_death_angles[i], killer_angles[i], frac);
            }
        }
    }

    // same collision-clamped pull-back as chase, ramping out as the blend
    // progresses
    let desired = t.chase_distance_min + (t.chase_distance_max - t.chase_distance_min) * frac;
    let (forward, _, _) = angle_vectors_tuple(&angles);
    let dist = crate::cl_chase::pull_in_distance(
        inp.oracle,
        &anchor,
        &forward,
        desired,
        cl.viewer_ent.index,
    );
    let origin = vector_ma(&anchor, -dist, &forward);

    CameraResult {
        origin,
        angles,
        fov: t.fov_x,
    }
}

/// View through the viewer's own (alive) entity; also the safe default for
/// unrecognized modes.
fn calc_own_view(inp: &ViewInputs, cl: &ClientState) -> CameraResult {
    let Some(own) = inp.ents.resolve(cl.viewer_ent) else {
        return hold_last_eye(cl, inp.tuning);
    };
    CameraResult {
        origin: own.eye_position(),
        angles: cl.viewangles,
        fov: inp.tuning.fov_x,
    }
}

/// Evaluator dispatch. `hltv` marks a time-shifted broadcast viewer;
/// `slot` is the split-screen slot being evaluated.
pub fn calc_observer_view(
    inp: &ViewInputs,
    cl: &mut ClientState,
    slot: usize,
    mode: ObserverMode,
    target: EntityId,
    hltv: bool,
    notify: &mut dyn ViewNotify,
) -> CameraResult {
    match mode {
        ObserverMode::None => calc_own_view(inp, cl),
        ObserverMode::InEye => calc_in_eye_view(inp, cl, target, hltv),
        ObserverMode::Chase => calc_chase_view(inp, cl, target),
        ObserverMode::Roaming => calc_roaming_view(inp, cl),
        ObserverMode::Fixed => calc_fixed_view(inp, cl),
        ObserverMode::DeathCam => calc_death_cam_view(inp, cl),
        ObserverMode::FreezeCam => calc_freeze_cam_view(inp, cl, slot, notify),
    }
}
