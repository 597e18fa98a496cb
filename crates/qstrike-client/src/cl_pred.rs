// cl_pred.rs -- prediction error smoothing
//
// When the simulation corrects the locally predicted origin, the raw
// correction would visibly snap a free camera. The error is recorded and
// bled off over a short window; the camera adds the remaining error each
// frame so the correction lands gradually.

use log::debug;

use qstrike_common::q_shared::*;

// corrections larger than this are a teleport or respawn; snap instead of
// smoothing through the map
pub const TELEPORT_ERROR_UNITS: f32 = 80.0;

pub struct PredictionErrorSmoother {
    pub enabled: bool,
    /// Window over which a recorded error decays to zero.
    pub decay_ms: i32,
    error: Vec3,
    set_time: i32,
}

impl Default for PredictionErrorSmoother {
    fn default() -> Self {
        Self::new()
    }
}

impl PredictionErrorSmoother {
    pub fn new() -> Self {
        Self {
            enabled: true,
            decay_ms: 100,
            error: VEC3_ORIGIN,
            set_time: 0,
        }
    }

    /// Record a correction. Oversized errors clear instead of smoothing.
    pub fn set_error(&mut self, error: Vec3, time: i32) {
        if vector_length(&error) > TELEPORT_ERROR_UNITS {
            debug!("prediction error {:.1} units, snapping", vector_length(&error));
            self.clear();
            return;
        }
        self.error = error;
        self.set_time = time;
    }

    pub fn clear(&mut self) {
        self.error = VEC3_ORIGIN;
        self.set_time = 0;
    }

    /// Remaining error to add to the view origin at `time`. Exactly zero
    /// when no error is pending, so smoothing at rest is a no-op.
    pub fn current(&self, time: i32) -> Vec3 {
        if !self.enabled || vector_compare(&self.error, &VEC3_ORIGIN) {
            return VEC3_ORIGIN;
        }
        let elapsed = (time - self.set_time).max(0);
        if elapsed >= self.decay_ms {
            return VEC3_ORIGIN;
        }
        let frac = 1.0 - elapsed as f32 / self.decay_ms as f32;
        vector_scale(&self.error, frac)
    }
}
