use nalgebra::Vector3;
use tracing::info;

use crate::dynamics::state::{ThrustCommand, VehicleState};
use crate::physics::{AeroLookup, CentralBodyProvider};
use super::config::PredictorConfig;
use super::controller::{air_retrograde, Policy};
use super::predictor::{Prediction, Predictor};

// ---------------------------------------------------------------------------
// Suicide-burn law
// ---------------------------------------------------------------------------

/// Deceleration left over after gravity, floored so the law never gives up.
pub fn net_deceleration(max_accel: f64, g: f64) -> f64 {
    (max_accel - g).max(0.1)
}

/// Desired vertical speed (negative = down) at `height` above the pad.
pub fn suicide_burn_descent_rate(height: f64, a_net: f64, margin: f64, touchdown_speed: f64) -> f64 {
    -((1.0 + margin) * a_net * height.max(0.0)).sqrt() - touchdown_speed
}

/// Deceleration (m/s^2, beyond gravity) that keeps a vehicle descending at
/// `vy` on the suicide-burn curve: the rate at which the desired speed falls
/// as height is lost. Zero at or below the pad height, capped at twice the
/// nominal `(1 + margin) * a_net / 2` where the curve steepens near the bottom.
pub fn suicide_burn_feedforward(height: f64, vy: f64, a_net: f64, margin: f64) -> f64 {
    let c = (1.0 + margin) * a_net;
    let root = (c * height.max(0.0)).sqrt();
    if root <= 1e-9 {
        return 0.0;
    }
    (c * (-vy).max(0.0) / (2.0 * root)).min(c)
}

/// Height at which a descent at `speed` m/s matches the suicide-burn law.
pub fn suicide_burn_height(speed: f64, a_net: f64, margin: f64, touchdown_speed: f64) -> f64 {
    let excess = (speed.abs() - touchdown_speed).max(0.0);
    excess * excess / ((1.0 + margin) * a_net)
}

/// Height at which the vehicle would stop if it held minimum thrust from now.
/// Negative infinity when minimum thrust cannot beat gravity.
pub fn min_height_at_min_thrust(height: f64, vy: f64, min_accel: f64, g: f64) -> f64 {
    let decel = min_accel - g;
    if decel <= 0.0 {
        return f64::NEG_INFINITY;
    }
    height - vy * vy / (2.0 * decel)
}

// ---------------------------------------------------------------------------
// Cached ignition height
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
pub struct LandingBurnState {
    /// Ignition height above the touchdown point (m), once solved.
    pub height: Option<f64>,
    /// Max thrust acceleration the height was solved for.
    pub max_accel: f64,
}

impl LandingBurnState {
    pub fn needs_update(&self, max_accel: f64, tolerance: f64) -> bool {
        match self.height {
            None => true,
            Some(_) => (max_accel - self.max_accel).abs() > tolerance,
        }
    }
}

/// Unpowered retrograde probe that remembers the last height at which the
/// suicide-burn speed still exceeded the airspeed.
struct TerminalBurnProbe {
    height_offset: f64,
    a_net: f64,
    margin: f64,
    touchdown_speed: f64,
    ignition_height: f64,
}

impl Policy for TerminalBurnProbe {
    fn command(&mut self, state: &VehicleState, body: &dyn CentralBodyProvider) -> ThrustCommand {
        let height = body.altitude(&state.pos) - self.height_offset;
        let airspeed = (state.vel - body.surface_velocity(&state.pos)).norm();
        let allowed = -suicide_burn_descent_rate(height, self.a_net, self.margin, self.touchdown_speed);
        if allowed > airspeed {
            self.ignition_height = height;
        }
        ThrustCommand::coast(air_retrograde(state, body))
    }

    fn name(&self) -> &str {
        "terminal-burn-probe"
    }
}

/// Inputs to one ignition-height solve.
pub struct LandingBurnRequest<'a> {
    pub body: &'a dyn CentralBodyProvider,
    pub aero: &'a dyn AeroLookup,
    pub predictor: &'a PredictorConfig,
    /// Altitude of the touchdown point including margins (m).
    pub height_offset: f64,
    pub margin: f64,
    pub touchdown_speed: f64,
    pub record: bool,
}

/// Solve for the ignition height and refresh `cache`.
pub fn solve_landing_burn(
    state: &VehicleState,
    req: &LandingBurnRequest<'_>,
    cache: &mut LandingBurnState,
) -> (f64, Prediction) {
    let (_, max_accel) = state.accel_bounds();
    let g = req.body.gravity(&state.pos).norm();
    let start_height = req.body.altitude(&state.pos) - req.height_offset;

    let mut probe = TerminalBurnProbe {
        height_offset: req.height_offset,
        a_net: net_deceleration(max_accel, g),
        margin: req.margin,
        touchdown_speed: req.touchdown_speed,
        ignition_height: start_height,
    };
    let mut probe_state = state.clone();
    probe_state.att = -(state.vel - req.body.surface_velocity(&state.pos))
        .try_normalize(1e-6)
        .unwrap_or_else(Vector3::z);

    // The probe steps at its own rate inside the atmosphere
    let probe_cfg = PredictorConfig { fine_dt: req.predictor.landing_burn_dt, ..req.predictor.clone() };
    let prediction = {
        let predictor = Predictor::new(req.body, req.aero, &probe_cfg);
        predictor.to_ground(
            &probe_state,
            req.height_offset,
            Some(&mut probe),
            req.predictor.landing_burn_max_time,
            req.record,
        )
    };

    info!(
        height = probe.ignition_height,
        max_accel,
        previous = ?cache.height,
        "landing burn ignition height recomputed"
    );
    cache.height = Some(probe.ignition_height);
    cache.max_accel = max_accel;
    (probe.ignition_height, prediction)
}
