//! The booster landing controller: one instance per guided vehicle.
//!
//! Each live tick re-predicts the rest of the flight with a copy of the
//! controller's own policy, measures the miss against the target, and runs
//! the current phase's law. Nested evaluations inside that prediction use
//! simulate mode, so prediction never recurses.

use std::sync::Arc;
use std::time::Instant;

use nalgebra::Vector3;
use tracing::{debug, info, warn};

use crate::dynamics::state::{TrajectorySample, VehicleState};
use crate::io::{TelemetrySink, TickRecord};
use crate::physics::aerodynamics::flow_geometry;
use crate::physics::{AeroForceCache, AeroLookup, CentralBodyProvider};
use super::config::ControllerConfig;
use super::guidance::{evaluate, Kinematics, LawContext, PolicyState, SimulatedPolicy};
use super::landing_burn::{solve_landing_burn, LandingBurnRequest};
use super::phase::Phase;
use super::predictor::{Prediction, Predictor};
use super::steer_gain::{estimate_steer_gain, lift_at_probe};
use super::target::Target;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TickTelemetry {
    pub attitude_error_deg: f64,
    pub target_error_m: f64,
    pub elapsed_ms: f64,
}

/// Commands for one tick.
#[derive(Debug, Clone, PartialEq)]
pub struct GuidanceOutput {
    pub throttle: f64,
    pub steer: Vector3<f64>,
    /// Latches true once the vehicle is low enough.
    pub deploy_landing_gear: bool,
    pub phase: Phase,
    pub predicted_impact: Option<Vector3<f64>>,
    pub telemetry: TickTelemetry,
}

#[derive(Debug, Clone, Copy)]
struct LastPrediction {
    impact: Vector3<f64>,
    time: f64,
}

pub struct BoosterController {
    name: String,
    config: ControllerConfig,
    target: Target,
    aero: Arc<AeroForceCache>,
    policy: PolicyState,
    prediction: Option<LastPrediction>,
    target_error: Vector3<f64>,
    steer_sign: f64,
    gear_latched: bool,
    last_tick: Option<f64>,
    last_output: Option<GuidanceOutput>,
    last_vel: Option<(f64, Vector3<f64>)>,
    /// Thrust bounds (N) of the engines saved for the landing burn.
    landing_thrust: Option<(f64, f64)>,
    sink: Option<Box<dyn TelemetrySink>>,
}

impl BoosterController {
    pub fn new(
        name: impl Into<String>,
        config: ControllerConfig,
        target: Target,
        aero: Arc<AeroForceCache>,
        phase: Phase,
    ) -> Self {
        let policy = PolicyState::new(&config, phase);
        Self {
            name: name.into(),
            config,
            target,
            aero,
            policy,
            prediction: None,
            target_error: Vector3::zeros(),
            steer_sign: 0.0,
            gear_latched: false,
            last_tick: None,
            last_output: None,
            last_vel: None,
            landing_thrust: None,
            sink: None,
        }
    }

    /// Phase to start in when none is requested.
    pub fn initial_phase(config: &ControllerConfig, altitude: f64) -> Phase {
        if altitude > config.reentry_burn_alt {
            Phase::BoostBack
        } else {
            Phase::AeroDescent
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn phase(&self) -> Phase {
        self.policy.phase
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    pub fn target(&self) -> &Target {
        &self.target
    }

    pub fn landing_burn_height(&self) -> Option<f64> {
        self.policy.landing_burn.height
    }

    pub fn set_telemetry(&mut self, sink: Box<dyn TelemetrySink>) {
        self.sink = Some(sink);
    }

    /// Thrust bounds (N) the landing burn will have once its engines are
    /// selected. `None` plans with whatever is active.
    pub fn set_landing_burn_thrust(&mut self, bounds: Option<(f64, f64)>) {
        self.landing_thrust = bounds;
    }

    pub fn take_telemetry(&mut self) -> Option<Box<dyn TelemetrySink>> {
        self.sink.take()
    }

    /// External override; the only way back to `Unset`.
    pub fn set_phase(&mut self, phase: Phase) {
        info!(vehicle = %self.name, from = %self.policy.phase, to = %phase, "phase set");
        self.policy.enter(phase);
        self.last_output = None;
    }

    pub fn reset(&mut self) {
        self.policy = PolicyState::new(&self.config, Phase::Unset);
        self.prediction = None;
        self.target_error = Vector3::zeros();
        self.steer_sign = 0.0;
        self.gear_latched = false;
        self.last_tick = None;
        self.last_output = None;
        self.last_vel = None;
    }

    /// `state` with the landing-burn engines' thrust bounds swapped in.
    fn with_landing_thrust(&self, state: &VehicleState) -> VehicleState {
        let mut planned = state.clone();
        if let Some((min_thrust, max_thrust)) = self.landing_thrust {
            planned.min_thrust = min_thrust;
            planned.max_thrust = max_thrust;
        }
        planned
    }

    /// Predict the rest of the flight under a copy of the current policy.
    pub fn predict(&self, state: &VehicleState, body: &dyn CentralBodyProvider, record: bool) -> Prediction {
        // From aero descent on, the only burn left is the landing burn
        let planned;
        let state = if self.policy.phase >= Phase::AeroDescent {
            planned = self.with_landing_thrust(state);
            &planned
        } else {
            state
        };
        let mut sim = SimulatedPolicy {
            state: self.policy.for_prediction(),
            config: &self.config,
            target_altitude: self.target.altitude,
            dt: self.config.predictor.fine_dt,
        };
        let aero: &dyn AeroLookup = self.aero.as_ref();
        Predictor::new(body, aero, &self.config.predictor).to_ground(
            state,
            self.target.altitude,
            Some(&mut sim),
            self.config.predictor.max_time,
            record,
        )
    }

    /// One control tick.
    ///
    /// With `simulate` set nothing is predicted or logged and steering
    /// correction is off; the last measured target error is reused.
    pub fn tick(&mut self, state: &VehicleState, body: &dyn CentralBodyProvider, simulate: bool) -> GuidanceOutput {
        let started = Instant::now();
        let k = Kinematics::new(state, body, self.target.altitude, &self.config);

        if !simulate && k.height > self.config.low_altitude_height {
            if let (Some(last), Some(out)) = (self.last_tick, &self.last_output) {
                let interval = 1.0 / self.config.max_ticks_per_sec;
                if state.time - last < interval - 1e-9 {
                    return out.clone();
                }
            }
        }
        let dt = self.last_tick.map_or(0.0, |t| (state.time - t).max(0.0));

        if !simulate {
            self.last_tick = Some(state.time);
            if self.config.deploy_landing_gear && k.height < self.config.gear_deploy_height {
                self.gear_latched = true;
            }
            self.update_landing_burn(state, body);
            let prediction = self.predict(state, body, false);
            self.store_prediction(&prediction, body);
            let thrust = state.thrust_at(self.last_output.as_ref().map_or(0.0, |o| o.throttle));
            self.steer_sign = estimate_steer_gain(
                self.aero.as_ref(),
                thrust,
                k.airspeed,
                k.altitude,
                state.mass,
                self.config.steer_probe_aoa.to_radians(),
            )
            .sign;
        }

        let ctx = LawContext {
            simulate,
            target_error: self.target_error,
            time_to_target: self.prediction.map_or(0.0, |p| p.time),
            steer_sign: if simulate { 0.0 } else { self.steer_sign },
            dt,
        };
        let law = evaluate(&mut self.policy, &self.config, &k, &ctx);
        if let Some(next) = law.next_phase {
            self.transition(next, state, body, simulate);
        }

        let attitude_error_deg = state.att.angle(&law.steer).to_degrees();
        let target_error_m = self.target_error.norm();
        let output = GuidanceOutput {
            throttle: law.throttle,
            steer: law.steer,
            deploy_landing_gear: self.gear_latched,
            phase: self.policy.phase,
            predicted_impact: self.prediction.map(|p| p.impact),
            telemetry: TickTelemetry {
                attitude_error_deg,
                target_error_m,
                elapsed_ms: started.elapsed().as_secs_f64() * 1_000.0,
            },
        };

        if !simulate {
            self.log_tick(state, body, &k, &output);
            self.last_output = Some(output.clone());
        }
        output
    }

    fn store_prediction(&mut self, prediction: &Prediction, body: &dyn CentralBodyProvider) {
        let target_pos = self.target.resolve(body);
        let up = body.up(&target_pos);
        let miss = prediction.impact - target_pos;
        self.target_error = miss - up * miss.dot(&up);
        self.prediction = Some(LastPrediction { impact: prediction.impact, time: prediction.time });
    }

    fn update_landing_burn(&mut self, state: &VehicleState, body: &dyn CentralBodyProvider) {
        let planned = self.with_landing_thrust(state);
        let (_, max_accel) = planned.accel_bounds();
        let burn = &self.policy.landing_burn;
        let due = match self.policy.phase {
            Phase::AeroDescent => burn.needs_update(max_accel, self.config.landing_burn_accel_tolerance),
            // The prediction flown during the re-entry burn needs some height to hand over at
            Phase::ReentryBurn => burn.height.is_none(),
            _ => false,
        };
        if !due {
            return;
        }
        let record = self.sink.is_some();
        let req = LandingBurnRequest {
            body,
            aero: self.aero.as_ref(),
            predictor: &self.config.predictor,
            height_offset: self.target.altitude + self.config.touchdown_margin + state.lowest_point,
            margin: self.config.landing_burn_margin,
            touchdown_speed: self.config.touchdown_speed,
            record,
        };
        let (_, prediction) = solve_landing_burn(&planned, &req, &mut self.policy.landing_burn);
        if record {
            self.dump("landing-burn", &prediction.samples);
        }
    }

    fn transition(&mut self, next: Phase, state: &VehicleState, body: &dyn CentralBodyProvider, simulate: bool) {
        let from = self.policy.phase;
        self.policy.enter(next);
        if simulate {
            return;
        }
        info!(
            vehicle = %self.name,
            %from,
            to = %next,
            altitude = body.altitude(&state.pos),
            time = state.time,
            "phase transition"
        );
        // Re-predict straight away so the new phase is logged from its first tick
        let prediction = self.predict(state, body, self.sink.is_some());
        self.store_prediction(&prediction, body);
        self.dump(next.label(), &prediction.samples);
    }

    fn dump(&mut self, label: &str, samples: &[TrajectorySample]) {
        if let Some(sink) = self.sink.as_mut() {
            if let Err(e) = sink.trajectory(label, samples) {
                warn!(vehicle = %self.name, error = %e, "telemetry sink failed, logging disabled");
                self.sink = None;
            }
        }
    }

    fn log_tick(&mut self, state: &VehicleState, body: &dyn CentralBodyProvider, k: &Kinematics, out: &GuidanceOutput) {
        debug!(
            vehicle = %self.name,
            phase = %out.phase,
            throttle = out.throttle,
            height = k.height,
            target_error = out.telemetry.target_error_m,
            compute_ms = out.telemetry.elapsed_ms,
            "guidance tick"
        );

        let accel = match self.last_vel {
            Some((t, v)) if state.time - t > 1e-9 => (state.vel - v) / (state.time - t),
            _ => Vector3::zeros(),
        };
        self.last_vel = Some((state.time, state.vel));

        let Some(sink) = self.sink.as_mut() else {
            return;
        };
        let air = state.vel - body.surface_velocity(&state.pos);
        let record = TickRecord {
            time: state.time,
            phase: out.phase,
            pos: state.pos,
            vel: state.vel,
            accel,
            attitude_error_deg: out.telemetry.attitude_error_deg,
            min_thrust: state.min_thrust,
            max_thrust: state.max_thrust,
            steer_gain: self.steer_sign,
            target_error: out.telemetry.target_error_m,
            mass: state.mass,
            aoa_deg: flow_geometry(&state.att, &air).map(|g| g.aoa.to_degrees()),
            probe_lift: (k.airspeed > 1.0).then(|| {
                lift_at_probe(self.aero.as_ref(), k.airspeed, k.altitude, self.config.lift_probe_aoa.to_radians())
            }),
        };
        if let Err(e) = sink.tick(&record) {
            warn!(vehicle = %self.name, error = %e, "telemetry sink failed, logging disabled");
            self.sink = None;
        }
    }
}
