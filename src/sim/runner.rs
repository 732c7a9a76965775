use nalgebra::Vector3;
use tracing::info;

use crate::dynamics::eom::Environment;
use crate::dynamics::state::{ThrustCommand, VehicleState};
use crate::errors::GuidanceError;
use crate::gnc::{Phase, Target};
use crate::physics::{AerodynamicForceProvider, CentralBodyProvider, DirectAero, SphericalBody};
use crate::session::{GuidanceSession, VehicleId};
use crate::vehicle::{SimBooster, VehicleStateProvider};
use super::integrator::rk4_step;

// ---------------------------------------------------------------------------
// Host loop configuration and record
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct SimConfig {
    pub dt: f64,       // s, host tick and truth-model step
    pub max_time: f64, // s
}

impl Default for SimConfig {
    fn default() -> Self {
        Self { dt: 0.1, max_time: 900.0 }
    }
}

#[derive(Debug, Clone)]
pub struct FlightStep {
    pub time: f64,
    pub phase: Phase,
    pub pos: Vector3<f64>,
    pub vel: Vector3<f64>,
    pub throttle: f64,
    pub mass: f64,
    pub compute_ms: f64,
}

#[derive(Debug, Clone, Default)]
pub struct FlightLog {
    pub steps: Vec<FlightStep>,
    /// Reached the target altitude before the time cap.
    pub landed: bool,
    pub final_airspeed: f64,
    pub final_vertical_speed: f64,
    /// Horizontal distance from the target at touchdown (m).
    pub miss_distance: f64,
    pub flight_time: f64,
    pub propellant_used: f64,
}

// ---------------------------------------------------------------------------
// Closed-loop descent
// ---------------------------------------------------------------------------

/// Fly a guided booster down with the session in the loop.
///
/// The truth model evaluates `truth_aero` directly (no cache), turns the
/// vehicle at its slew rate, burns propellant and rotates the body. Guidance
/// is disabled on touchdown.
pub fn fly_descent(
    session: &mut GuidanceSession,
    id: VehicleId,
    booster: &mut SimBooster,
    body: &mut SphericalBody,
    truth_aero: &dyn AerodynamicForceProvider,
    target: &Target,
    config: &SimConfig,
) -> Result<FlightLog, GuidanceError> {
    let aero = DirectAero(truth_aero);
    let start_propellant = booster.propellant_mass;
    let capacity = ((config.max_time / config.dt) as usize + 1).min(200_000);
    let mut log = FlightLog { steps: Vec::with_capacity(capacity), ..Default::default() };

    let mut t = 0.0;
    while t < config.max_time {
        let out = session.fly(id, booster, &*body, t)?;

        // Actuate
        booster.slew_toward(&out.steer, config.dt);
        let throttle = if booster.has_propellant() { out.throttle } else { 0.0 };
        let state = VehicleState::capture(booster, t);
        let cmd = ThrustCommand { throttle, steer: booster.att };

        // Integrate
        let next = {
            let env = Environment { body: &*body, aero: &aero, aero_factor: 1.0 };
            rk4_step(&state, &cmd, &env, config.dt)
        };
        booster.pos = next.pos;
        booster.vel = next.vel;
        booster.burn(throttle, config.dt);
        body.advance(config.dt);
        t += config.dt;

        log.steps.push(FlightStep {
            time: t,
            phase: out.phase,
            pos: booster.pos,
            vel: booster.vel,
            throttle,
            mass: booster.total_mass(),
            compute_ms: out.telemetry.elapsed_ms,
        });

        // Ground contact
        if body.altitude(&booster.pos) - booster.lowest_point <= target.altitude {
            log.landed = true;
            break;
        }
    }

    let air = booster.vel - body.surface_velocity(&booster.pos);
    let up = body.up(&booster.pos);
    let target_pos = target.resolve(&*body);
    let offset = booster.pos - target_pos;
    log.final_airspeed = air.norm();
    log.final_vertical_speed = air.dot(&up);
    log.miss_distance = (offset - up * offset.dot(&up)).norm();
    log.flight_time = t;
    log.propellant_used = start_propellant - booster.propellant_mass;

    if log.landed {
        info!(
            vehicle = booster.name(),
            speed = log.final_airspeed,
            miss = log.miss_distance,
            time = t,
            "touchdown"
        );
        session.disable(id);
    }
    Ok(log)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gnc::ControllerConfig;
    use crate::physics::{AeroCacheConfig, AeroForceCache, SlenderBodyModel};
    use crate::vehicle::{presets, EngineId, LandingBurnEngines};
    use std::sync::Arc;

    #[test]
    fn low_drop_lands_softly_near_target() {
        let mut body = SphericalBody::earth().non_rotating();
        let target = Target::new(0.0, 0.0, 1.0);
        let start = target.resolve(&body) + Vector3::new(6_000.0, 0.0, 0.0);
        let mut booster = presets::returning_booster(start, Vector3::new(-200.0, 0.0, 0.0));
        let model = SlenderBodyModel::default();
        let cache = Arc::new(AeroForceCache::new(&AeroCacheConfig::default(), Box::new(model.clone())));

        let mut session = GuidanceSession::new();
        let id = VehicleId(1);
        session
            .enable(id, ControllerConfig::default(), target, &booster, &body, None, cache)
            .unwrap();
        let log = fly_descent(
            &mut session,
            id,
            &mut booster,
            &mut body,
            &model,
            &target,
            &SimConfig { dt: 0.1, max_time: 300.0 },
        )
        .unwrap();

        assert!(log.landed);
        assert!(log.steps.iter().any(|s| s.phase == Phase::LandingBurn));
        assert!(log.steps.windows(2).all(|w| w[0].phase <= w[1].phase));
        let touchdown = ControllerConfig::default().touchdown_speed;
        assert!(log.final_vertical_speed > -5.0 * touchdown, "vy = {}", log.final_vertical_speed);
        assert!(log.propellant_used > 0.0);
        assert!(!session.is_enabled(id));
    }

    #[test]
    fn centre_engine_landing_plans_for_one_engine() {
        let mut body = SphericalBody::earth().non_rotating();
        let target = Target::new(0.0, 0.0, 1.0);
        let start = target.resolve(&body) + Vector3::new(8_000.0, 0.0, 0.0);
        let mut booster = presets::returning_booster(start, Vector3::new(-200.0, 0.0, 0.0));
        let model = SlenderBodyModel::default();
        let cache = Arc::new(AeroForceCache::new(&AeroCacheConfig::default(), Box::new(model.clone())));
        let config = ControllerConfig {
            landing_burn_engines: LandingBurnEngines::Subset(vec![EngineId(1)]),
            ..Default::default()
        };
        let touchdown = config.touchdown_speed;

        let mut session = GuidanceSession::new();
        let id = VehicleId(2);
        session.enable(id, config, target, &booster, &body, None, cache).unwrap();
        let log = fly_descent(
            &mut session,
            id,
            &mut booster,
            &mut body,
            &model,
            &target,
            &SimConfig { dt: 0.1, max_time: 300.0 },
        )
        .unwrap();

        assert!(log.landed);
        assert!(log.steps.iter().any(|s| s.phase == Phase::LandingBurn));
        assert!(log.final_vertical_speed > -5.0 * touchdown, "vy = {}", log.final_vertical_speed);
        let active: Vec<EngineId> = booster.engines.iter().filter(|e| e.active).map(|e| e.id).collect();
        assert_eq!(active, vec![EngineId(1)]);
    }

    #[test]
    fn unknown_vehicle_is_an_error() {
        let mut body = SphericalBody::earth().non_rotating();
        let mut booster = presets::returning_booster(Vector3::new(body.radius + 1_000.0, 0.0, 0.0), Vector3::new(-10.0, 0.0, 0.0));
        let model = SlenderBodyModel::default();
        let mut session = GuidanceSession::new();
        let r = fly_descent(
            &mut session,
            VehicleId(9),
            &mut booster,
            &mut body,
            &model,
            &Target::new(0.0, 0.0, 1.0),
            &SimConfig::default(),
        );
        assert!(matches!(r, Err(GuidanceError::UnknownVehicle(9))));
    }
}
