use nalgebra::{Unit, UnitQuaternion, Vector3};

use crate::dynamics::state::{ThrustCommand, VehicleState, THRUST_EPS};
use crate::physics::CentralBodyProvider;
use super::config::ControllerConfig;
use super::controller::{air_retrograde, Policy};
use super::landing_burn::{
    min_height_at_min_thrust, net_deceleration, suicide_burn_descent_rate, suicide_burn_feedforward,
    LandingBurnState,
};
use super::phase::Phase;
use super::pid::ClampedPid;

/// Smallest throttle that keeps a burn lit; zero means engines off.
const RUNNING_THROTTLE: f64 = 1e-3;

// ---------------------------------------------------------------------------
// Per-tick kinematics
// ---------------------------------------------------------------------------

/// What every phase law reads, computed once per evaluation.
#[derive(Debug, Clone)]
pub struct Kinematics {
    pub altitude: f64,
    /// Height of the lowest point above the touchdown point, margins included.
    pub height: f64,
    /// Surface-relative vertical speed (negative = down).
    pub vy: f64,
    pub airspeed: f64,
    pub up: Vector3<f64>,
    /// Unit vector against the surface-relative velocity.
    pub retrograde: Vector3<f64>,
    pub attitude: Vector3<f64>,
    pub g: f64,
    pub min_accel: f64,
    pub max_accel: f64,
    pub max_thrust: f64,
}

impl Kinematics {
    pub fn new(state: &VehicleState, body: &dyn CentralBodyProvider, target_altitude: f64, cfg: &ControllerConfig) -> Self {
        let altitude = body.altitude(&state.pos);
        let up = body.up(&state.pos);
        let air = state.vel - body.surface_velocity(&state.pos);
        let (min_accel, max_accel) = state.accel_bounds();
        Kinematics {
            altitude,
            height: altitude - (target_altitude + cfg.touchdown_margin + state.lowest_point),
            vy: air.dot(&up),
            airspeed: air.norm(),
            up,
            retrograde: air_retrograde(state, body),
            attitude: state.att,
            g: body.gravity(&state.pos).norm(),
            min_accel,
            max_accel,
            max_thrust: state.max_thrust,
        }
    }

    /// Throttle that delivers `accel`, or 0 with no usable engines.
    fn throttle_for(&self, accel: f64, min_throttle: f64) -> f64 {
        if self.max_thrust <= THRUST_EPS {
            return 0.0;
        }
        let span = self.max_accel - self.min_accel;
        let t = if span > 1e-9 {
            (accel - self.min_accel) / span
        } else if accel >= self.min_accel {
            1.0
        } else {
            0.0
        };
        t.clamp(min_throttle, 1.0)
    }
}

// ---------------------------------------------------------------------------
// Mutable policy state (cloned into predictions)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct PolicyState {
    pub phase: Phase,
    /// Smallest boostback error seen since entering the phase.
    pub min_error: f64,
    pub reentry_pid: ClampedPid,
    pub aero_pid: ClampedPid,
    pub landing_pid: ClampedPid,
    pub landing_burn: LandingBurnState,
}

impl PolicyState {
    pub fn new(cfg: &ControllerConfig, phase: Phase) -> Self {
        Self {
            phase,
            min_error: f64::MAX,
            reentry_pid: ClampedPid::proportional(cfg.reentry_burn_steer_kp, cfg.reentry_burn_max_aoa),
            aero_pid: ClampedPid::proportional(cfg.aero_descent_steer_kp, cfg.aero_descent_max_aoa),
            landing_pid: ClampedPid::proportional(cfg.landing_burn_steer_kp, cfg.landing_burn_max_aoa),
            landing_burn: LandingBurnState::default(),
        }
    }

    pub fn enter(&mut self, phase: Phase) {
        self.phase = phase;
        self.min_error = f64::MAX;
        self.reentry_pid.reset();
        self.aero_pid.reset();
        self.landing_pid.reset();
    }

    /// Copy flown inside a prediction; boostback is never re-derived there.
    pub fn for_prediction(&self) -> Self {
        let mut sim = self.clone();
        if sim.phase == Phase::BoostBack {
            sim.phase = Phase::Coasting;
        }
        sim
    }
}

// ---------------------------------------------------------------------------
// Phase laws
// ---------------------------------------------------------------------------

/// Inputs that only a live tick has.
#[derive(Debug, Clone, Copy)]
pub struct LawContext {
    /// Nested evaluation inside a prediction: no correction, bail-out armed.
    pub simulate: bool,
    /// Horizontal miss vector (predicted impact minus target).
    pub target_error: Vector3<f64>,
    pub time_to_target: f64,
    pub steer_sign: f64,
    pub dt: f64,
}

impl LawContext {
    pub fn simulated(dt: f64) -> Self {
        Self { simulate: true, target_error: Vector3::zeros(), time_to_target: 0.0, steer_sign: 0.0, dt }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct LawOutput {
    pub throttle: f64,
    pub steer: Vector3<f64>,
    pub next_phase: Option<Phase>,
}

/// Run the current phase's law. At most one transition is proposed; the new
/// phase's law runs on the following evaluation.
pub fn evaluate(ps: &mut PolicyState, cfg: &ControllerConfig, k: &Kinematics, ctx: &LawContext) -> LawOutput {
    let mut out = match ps.phase {
        Phase::Unset => LawOutput { throttle: 0.0, steer: k.retrograde, next_phase: None },
        Phase::BoostBack => boostback(ps, cfg, k, ctx),
        Phase::Coasting => LawOutput {
            throttle: 0.0,
            steer: k.retrograde,
            next_phase: reentry_due(cfg, k).then_some(Phase::ReentryBurn),
        },
        Phase::ReentryBurn => reentry_burn(ps, cfg, k, ctx),
        Phase::AeroDescent => aero_descent(ps, cfg, k, ctx),
        Phase::LandingBurn => landing_burn(ps, cfg, k, ctx),
    };

    out.steer = out.steer.try_normalize(1e-12).unwrap_or(k.up);
    out.throttle = if k.max_thrust <= THRUST_EPS || !out.throttle.is_finite() {
        0.0
    } else {
        out.throttle.clamp(0.0, 1.0)
    };
    out
}

fn reentry_due(cfg: &ControllerConfig, k: &Kinematics) -> bool {
    k.altitude < cfg.reentry_burn_alt && k.vy < 0.0
}

fn boostback(ps: &mut PolicyState, cfg: &ControllerConfig, k: &Kinematics, ctx: &LawContext) -> LawOutput {
    if reentry_due(cfg, k) {
        return LawOutput { throttle: 0.0, steer: k.retrograde, next_phase: Some(Phase::ReentryBurn) };
    }
    let horizontal = ctx.target_error - k.up * ctx.target_error.dot(&k.up);
    let err = horizontal.norm();
    ps.min_error = ps.min_error.min(err);

    let diverging = err > 1.5 * ps.min_error && err > cfg.boostback_close_error;
    if err < cfg.boostback_done_error || diverging {
        return LawOutput { throttle: 0.0, steer: k.retrograde, next_phase: Some(Phase::Coasting) };
    }

    // Burn against the miss
    let steer = (-horizontal).try_normalize(1e-9).unwrap_or(k.retrograde);
    let t = ctx.time_to_target.max(1.0);
    let a_req = (cfg.boostback_gain * err / (t * t)).max(cfg.boostback_min_accel);
    LawOutput { throttle: k.throttle_for(a_req, RUNNING_THROTTLE), steer, next_phase: None }
}

fn reentry_burn(ps: &mut PolicyState, cfg: &ControllerConfig, k: &Kinematics, ctx: &LawContext) -> LawOutput {
    if k.airspeed <= cfg.reentry_burn_target_speed {
        return LawOutput { throttle: 0.0, steer: k.retrograde, next_phase: Some(Phase::AeroDescent) };
    }
    let excess = k.airspeed - cfg.reentry_burn_target_speed;
    let below = ((cfg.reentry_burn_alt - k.altitude) / cfg.reentry_burn_ramp_height).clamp(0.0, 1.0);
    let ramp = 0.25 + 0.75 * below;
    let a_req = (0.4 * excess).max(10.0) * ramp;

    let steer = corrected_steer(&mut ps.reentry_pid, cfg.reentry_burn_max_aoa, k, ctx);
    LawOutput { throttle: k.throttle_for(a_req, RUNNING_THROTTLE), steer, next_phase: None }
}

fn aero_descent(ps: &mut PolicyState, cfg: &ControllerConfig, k: &Kinematics, ctx: &LawContext) -> LawOutput {
    let steer = corrected_steer(&mut ps.aero_pid, cfg.aero_descent_max_aoa, k, ctx);
    let steer = blend(k, steer, cfg.attitude_blend);

    let ignite = ps
        .landing_burn
        .height
        .is_some_and(|h| k.height - k.airspeed * cfg.ignite_lead_time <= h);
    LawOutput { throttle: 0.0, steer, next_phase: ignite.then_some(Phase::LandingBurn) }
}

fn landing_burn(ps: &mut PolicyState, cfg: &ControllerConfig, k: &Kinematics, ctx: &LawContext) -> LawOutput {
    let a_net = net_deceleration(k.max_accel, k.g);
    let dvy = suicide_burn_descent_rate(k.height, a_net, cfg.landing_burn_margin, cfg.touchdown_speed);
    let track = suicide_burn_feedforward(k.height, k.vy, a_net, cfg.landing_burn_margin);
    let a_req = (k.g + track + cfg.landing_burn_speed_gain * (dvy - k.vy)) / k.attitude.dot(&k.up).max(0.1);
    let mut throttle = k.throttle_for(a_req, cfg.landing_burn_min_throttle);

    // Would stop short of the ground even at minimum thrust: let it fall
    if ctx.simulate
        && k.vy > -cfg.bailout_descent_speed
        && min_height_at_min_thrust(k.height, k.vy, k.min_accel, k.g) > 0.0
    {
        throttle = 0.0;
    }

    let steer = if k.height > cfg.no_steer_height {
        corrected_steer(&mut ps.landing_pid, cfg.landing_burn_max_aoa, k, ctx)
    } else {
        k.retrograde + k.up * cfg.upright_bias
    };
    LawOutput { throttle, steer: blend(k, steer, cfg.attitude_blend), next_phase: None }
}

/// Retrograde tilted toward (or away from) the miss by a PID on its size.
fn corrected_steer(pid: &mut ClampedPid, max_aoa_deg: f64, k: &Kinematics, ctx: &LawContext) -> Vector3<f64> {
    if ctx.simulate || ctx.steer_sign == 0.0 {
        return k.retrograde;
    }
    let lateral = ctx.target_error - k.retrograde * ctx.target_error.dot(&k.retrograde);
    let Some(dir) = lateral.try_normalize(1e-9) else {
        return k.retrograde;
    };
    let angle = (ctx.steer_sign * pid.update(lateral.norm(), ctx.dt))
        .clamp(-max_aoa_deg, max_aoa_deg)
        .to_radians();
    deflect(&k.retrograde, &dir, angle)
}

/// Rotate `from` by `angle` toward the perpendicular unit vector `toward`.
pub fn deflect(from: &Vector3<f64>, toward: &Vector3<f64>, angle: f64) -> Vector3<f64> {
    match Unit::try_new(from.cross(toward), 1e-12) {
        Some(axis) => UnitQuaternion::from_axis_angle(&axis, angle) * from,
        None => *from,
    }
}

fn blend(k: &Kinematics, steer: Vector3<f64>, keep: f64) -> Vector3<f64> {
    let s = steer.try_normalize(1e-12).unwrap_or(k.retrograde);
    (k.attitude * keep + s * (1.0 - keep)).try_normalize(1e-9).unwrap_or(s)
}

// ---------------------------------------------------------------------------
// The policy flown inside predictions
// ---------------------------------------------------------------------------

/// Clone of the live controller's state, evaluated in simulate mode.
pub struct SimulatedPolicy<'a> {
    pub state: PolicyState,
    pub config: &'a ControllerConfig,
    pub target_altitude: f64,
    pub dt: f64,
}

impl Policy for SimulatedPolicy<'_> {
    fn command(&mut self, state: &VehicleState, body: &dyn CentralBodyProvider) -> ThrustCommand {
        let k = Kinematics::new(state, body, self.target_altitude, self.config);
        let out = evaluate(&mut self.state, self.config, &k, &LawContext::simulated(self.dt));
        if let Some(next) = out.next_phase {
            self.state.enter(next);
        }
        ThrustCommand { throttle: out.throttle, steer: out.steer }
    }

    fn name(&self) -> &str {
        "simulated-controller"
    }
}
