use nalgebra::Vector3;

use crate::dynamics::state::{ThrustCommand, VehicleState};
use crate::physics::CentralBodyProvider;

/// Trait for control policies flown inside a prediction.
///
/// Implement this to plug a throttle/steer law into the trajectory
/// predictor. Policies evaluated there run in simulate mode: they must not
/// start another prediction of their own.
pub trait Policy {
    /// Command to hold over the next integration step.
    fn command(&mut self, state: &VehicleState, body: &dyn CentralBodyProvider) -> ThrustCommand;

    /// Human-readable name for logging.
    fn name(&self) -> &str {
        "unnamed"
    }
}

/// Unpowered flight with the thrust axis pointing into the relative wind.
#[derive(Debug, Clone, Copy, Default)]
pub struct RetrogradeCoast;

impl Policy for RetrogradeCoast {
    fn command(&mut self, state: &VehicleState, body: &dyn CentralBodyProvider) -> ThrustCommand {
        ThrustCommand::coast(air_retrograde(state, body))
    }

    fn name(&self) -> &str {
        "retrograde-coast"
    }
}

/// Unit vector against the surface-relative velocity; local up when at rest.
pub fn air_retrograde(state: &VehicleState, body: &dyn CentralBodyProvider) -> Vector3<f64> {
    let air = state.vel - body.surface_velocity(&state.pos);
    (-air).try_normalize(1e-6).unwrap_or_else(|| body.up(&state.pos))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physics::SphericalBody;

    #[test]
    fn retrograde_opposes_air_velocity() {
        let body = SphericalBody::earth().non_rotating();
        let state = VehicleState {
            time: 0.0,
            pos: Vector3::new(body.radius + 1_000.0, 0.0, 0.0),
            vel: Vector3::new(-100.0, 100.0, 0.0),
            att: Vector3::x(),
            mass: 1.0,
            min_thrust: 0.0,
            max_thrust: 0.0,
            lowest_point: 0.0,
        };
        let cmd = RetrogradeCoast.command(&state, &body);
        assert_eq!(cmd.throttle, 0.0);
        let expected = Vector3::new(1.0, -1.0, 0.0).normalize();
        assert!((cmd.steer - expected).norm() < 1e-12);
    }

    #[test]
    fn at_rest_points_up() {
        let body = SphericalBody::earth().non_rotating();
        let state = VehicleState {
            time: 0.0,
            pos: Vector3::new(0.0, body.radius, 0.0),
            vel: Vector3::zeros(),
            att: Vector3::x(),
            mass: 1.0,
            min_thrust: 0.0,
            max_thrust: 0.0,
            lowest_point: 0.0,
        };
        assert!((air_retrograde(&state, &body) - Vector3::y()).norm() < 1e-12);
    }
}
