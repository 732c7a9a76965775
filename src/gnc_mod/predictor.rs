//! Forward simulation of the rest of the flight.
//!
//! Integrates gravity, (cached) aerodynamics and optional policy thrust until
//! the vehicle reaches the target altitude or the simulated-time cap. The
//! vehicle's mass is held constant over a prediction. The attitude is assumed
//! to follow the commanded steer instantly.

use nalgebra::{UnitQuaternion, Vector3};
use tracing::warn;

use crate::dynamics::eom::Environment;
use crate::dynamics::state::{TrajectorySample, VehicleState};
use crate::physics::{AeroLookup, CentralBodyProvider};
use crate::sim::integrator::rk4_step;
use super::config::PredictorConfig;
use super::controller::{Policy, RetrogradeCoast};

/// Where and when the vehicle comes down.
#[derive(Debug, Clone)]
pub struct Prediction {
    /// World position of the impact point as the surface sits *now*.
    pub impact: Vector3<f64>,
    /// Simulated seconds until impact.
    pub time: f64,
    /// The simulated-time cap was hit; `impact` is only a best estimate.
    pub time_capped: bool,
    pub samples: Vec<TrajectorySample>,
}

pub struct Predictor<'a> {
    pub body: &'a dyn CentralBodyProvider,
    pub aero: &'a dyn AeroLookup,
    pub config: &'a PredictorConfig,
}

impl<'a> Predictor<'a> {
    pub fn new(body: &'a dyn CentralBodyProvider, aero: &'a dyn AeroLookup, config: &'a PredictorConfig) -> Self {
        Self { body, aero, config }
    }

    /// Fly `start` down to `target_altitude` under `policy` (retrograde coast
    /// when `None`), for at most `max_time` simulated seconds.
    pub fn to_ground(
        &self,
        start: &VehicleState,
        target_altitude: f64,
        policy: Option<&mut dyn Policy>,
        max_time: f64,
        record: bool,
    ) -> Prediction {
        let mut coast = RetrogradeCoast;
        let policy: &mut dyn Policy = match policy {
            Some(p) => p,
            None => &mut coast,
        };
        let env = Environment { body: self.body, aero: self.aero, aero_factor: self.config.aero_factor };

        let mut samples = Vec::new();
        let mut state = start.clone();
        let mut alt = self.body.altitude(&state.pos);
        let mut elapsed = 0.0;

        if alt <= target_altitude {
            return Prediction { impact: state.pos, time: 0.0, time_capped: false, samples };
        }

        let mut time_capped = false;
        let mut prev = state.clone();
        let mut prev_alt = alt;
        let mut last_dt = 0.0;

        while alt > target_altitude {
            if elapsed >= max_time {
                time_capped = true;
                break;
            }
            let cmd = policy.command(&state, self.body);
            state.att = cmd.steer.try_normalize(1e-12).unwrap_or(state.att);

            let dt = if alt > self.config.interface_altitude {
                self.config.coarse_dt
            } else {
                self.config.fine_dt
            };
            let next = rk4_step(&state, &cmd, &env, dt);

            if record {
                let air = state.vel - self.body.surface_velocity(&state.pos);
                samples.push(TrajectorySample {
                    time: elapsed,
                    pos: state.pos,
                    vel: state.vel,
                    accel: (next.vel - state.vel) / dt,
                    airspeed: air.norm(),
                    mass: state.mass,
                    throttle: cmd.throttle,
                });
            }

            prev = state;
            prev_alt = alt;
            state = next;
            alt = self.body.altitude(&state.pos);
            elapsed += dt;
            last_dt = dt;
        }

        let (mut impact, time) = if time_capped {
            warn!(max_time, altitude = alt, "prediction hit its simulated-time cap");
            (state.pos, elapsed)
        } else {
            // Back up to the exact crossing, then sit it on the target sphere
            let span = prev_alt - alt;
            let frac = if span > 1e-9 { ((prev_alt - target_altitude) / span).clamp(0.0, 1.0) } else { 1.0 };
            let pos = prev.pos + (state.pos - prev.pos) * frac;
            let centre = self.body.position();
            let radial = (pos - centre).try_normalize(1e-9).unwrap_or_else(|| self.body.up(&pos));
            let on_sphere = centre + radial * (self.body.radius() + target_altitude);
            (on_sphere, elapsed - last_dt + frac * last_dt)
        };

        // The surface turns under the vehicle while it falls
        let spin = self.body.angular_velocity();
        if spin.norm() > 0.0 {
            let centre = self.body.position();
            let back = UnitQuaternion::from_scaled_axis(-spin * time);
            impact = centre + back * (impact - centre);
        }

        Prediction { impact, time, time_capped, samples }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dynamics::state::ThrustCommand;
    use crate::physics::aerodynamics::AeroForces;
    use crate::physics::{DirectAero, SlenderBodyModel, SphericalBody};

    struct Vacuum;

    impl AeroLookup for Vacuum {
        fn flow_forces(&self, _speed: f64, _aoa: f64, _altitude: f64) -> AeroForces {
            AeroForces::zero()
        }
    }

    fn start(body: &SphericalBody, alt: f64, vel: Vector3<f64>) -> VehicleState {
        VehicleState {
            time: 0.0,
            pos: Vector3::new(body.radius + alt, 0.0, 0.0),
            vel,
            att: -vel.normalize(),
            mass: 30_000.0,
            min_thrust: 300_000.0,
            max_thrust: 900_000.0,
            lowest_point: 0.0,
        }
    }

    #[test]
    fn vertical_drop_lands_below_start() {
        let body = SphericalBody::earth().non_rotating();
        let cfg = PredictorConfig::default();
        let p = Predictor::new(&body, &Vacuum, &cfg);
        let s = start(&body, 2_000.0, Vector3::new(-10.0, 0.0, 0.0));
        let pred = p.to_ground(&s, 0.0, None, 600.0, false);
        assert!(!pred.time_capped);
        assert!((body.altitude(&pred.impact)).abs() < 1e-6);
        assert!(pred.impact.y.abs() < 1e-6 && pred.impact.z.abs() < 1e-6);
        // h = v t + g t^2 / 2 with g ~ 9.8
        let t = (-10.0 + (100.0 + 2.0 * 9.8 * 2_000.0f64).sqrt()) / 9.8;
        assert!((pred.time - t).abs() < 0.2, "t = {}", pred.time);
    }

    #[test]
    fn repeated_predictions_are_identical() {
        let body = SphericalBody::earth();
        let model = SlenderBodyModel::default();
        let aero = DirectAero(&model);
        let cfg = PredictorConfig::default();
        let p = Predictor::new(&body, &aero, &cfg);
        let s = start(&body, 40_000.0, Vector3::new(-600.0, 150.0, 0.0));
        let a = p.to_ground(&s, 0.0, None, 600.0, false);
        let b = p.to_ground(&s, 0.0, None, 600.0, false);
        assert_eq!(a.impact, b.impact);
        assert_eq!(a.time, b.time);
    }

    #[test]
    fn time_cap_returns_best_estimate() {
        let body = SphericalBody::earth().non_rotating();
        let cfg = PredictorConfig::default();
        let p = Predictor::new(&body, &Vacuum, &cfg);
        let s = start(&body, 100_000.0, Vector3::new(-1.0, 0.0, 0.0));
        let pred = p.to_ground(&s, 0.0, None, 10.0, true);
        assert!(pred.time_capped);
        assert!(pred.time >= 10.0);
        assert!(body.altitude(&pred.impact) > 0.0);
        assert_eq!(pred.samples.len(), 5);
    }

    #[test]
    fn already_below_target_returns_immediately() {
        let body = SphericalBody::earth().non_rotating();
        let cfg = PredictorConfig::default();
        let p = Predictor::new(&body, &Vacuum, &cfg);
        let s = start(&body, 5.0, Vector3::new(-1.0, 0.0, 0.0));
        let pred = p.to_ground(&s, 10.0, None, 600.0, false);
        assert_eq!(pred.time, 0.0);
        assert_eq!(pred.impact, s.pos);
    }

    #[test]
    fn impact_is_rotated_back_for_a_spinning_body() {
        let still = SphericalBody::earth().non_rotating();
        let spinning = SphericalBody::earth();
        let cfg = PredictorConfig::default();
        let s = start(&still, 3_000.0, Vector3::new(-50.0, 0.0, 0.0));
        let a = Predictor::new(&still, &Vacuum, &cfg).to_ground(&s, 0.0, None, 600.0, false);
        let b = Predictor::new(&spinning, &Vacuum, &cfg).to_ground(&s, 0.0, None, 600.0, false);
        // Rotation about +Z moves a point on the +X axis toward -Y when undone
        assert!(a.impact.y.abs() < 1e-6);
        assert!(b.impact.y < -1.0, "y = {}", b.impact.y);
    }

    struct FullThrottleUp;

    impl Policy for FullThrottleUp {
        fn command(&mut self, state: &VehicleState, body: &dyn CentralBodyProvider) -> ThrustCommand {
            ThrustCommand { throttle: 1.0, steer: body.up(&state.pos) }
        }
    }

    #[test]
    fn policy_thrust_is_applied() {
        let body = SphericalBody::earth().non_rotating();
        let cfg = PredictorConfig::default();
        let p = Predictor::new(&body, &Vacuum, &cfg);
        let s = start(&body, 1_000.0, Vector3::new(-10.0, 0.0, 0.0));
        let mut up = FullThrottleUp;
        let pred = p.to_ground(&s, 0.0, Some(&mut up), 20.0, false);
        // 30 m/s^2 upward never comes down
        assert!(pred.time_capped);
    }
}
