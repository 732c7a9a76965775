use nalgebra::Vector3;

use crate::dynamics::state::{Deriv, ThrustCommand, VehicleState};
use crate::physics::aerodynamics::{world_aero_force, AeroLookup};
use crate::physics::CentralBodyProvider;

// ---------------------------------------------------------------------------
// Equations of motion (3DOF point mass around a rotating body)
// ---------------------------------------------------------------------------

/// Forces the integrator needs besides the vehicle itself.
pub struct Environment<'a, B: ?Sized> {
    pub body: &'a B,
    pub aero: &'a dyn AeroLookup,
    /// Multiplier on aerodynamic force; >1 makes predictions pessimistic.
    pub aero_factor: f64,
}

/// Translational derivatives.
///
/// Forces modelled:
///   1. Gravity: point mass, toward the body centre
///   2. Aerodynamics: relative to the co-rotating air, at the current attitude
///   3. Thrust: along `cmd.steer`, magnitude from the throttle mapping
pub fn derivatives<B: CentralBodyProvider + ?Sized>(
    state: &VehicleState,
    cmd: &ThrustCommand,
    env: &Environment<'_, B>,
) -> Deriv {
    let a_gravity = env.body.gravity(&state.pos);

    let (a_aero, a_thrust) = if state.mass > 1e-9 {
        let f_aero = world_aero_force(env.aero, env.body, &state.pos, &state.vel, &state.att, env.aero_factor);
        let f_thrust = cmd.steer * state.thrust_at(cmd.throttle);
        (f_aero / state.mass, f_thrust / state.mass)
    } else {
        (Vector3::zeros(), Vector3::zeros())
    };

    Deriv {
        dpos: state.vel,
        dvel: a_gravity + a_aero + a_thrust,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physics::{DirectAero, SlenderBodyModel, SphericalBody};

    fn falling(alt: f64, vz: f64) -> (SphericalBody, VehicleState) {
        let body = SphericalBody::earth().non_rotating();
        let pos = Vector3::new(0.0, 0.0, body.radius + alt);
        let state = VehicleState {
            time: 0.0,
            pos,
            vel: Vector3::new(0.0, 0.0, vz),
            att: Vector3::z(),
            mass: 30_000.0,
            min_thrust: 300_000.0,
            max_thrust: 900_000.0,
            lowest_point: 0.0,
        };
        (body, state)
    }

    #[test]
    fn drag_slows_a_falling_booster() {
        let (body, state) = falling(5_000.0, -250.0);
        let model = SlenderBodyModel::default();
        let aero = DirectAero(&model);
        let env = Environment { body: &body, aero: &aero, aero_factor: 1.0 };
        let d = derivatives(&state, &ThrustCommand::coast(Vector3::z()), &env);
        let g = body.gravity(&state.pos).z;
        assert!(d.dvel.z > g, "drag must oppose the fall");
    }

    #[test]
    fn full_throttle_beats_gravity() {
        let (body, state) = falling(100_000.0, 0.0);
        let model = SlenderBodyModel::default();
        let aero = DirectAero(&model);
        let env = Environment { body: &body, aero: &aero, aero_factor: 1.0 };
        let d = derivatives(&state, &ThrustCommand { throttle: 1.0, steer: Vector3::z() }, &env);
        assert!(d.dvel.z > 0.0);
    }
}
