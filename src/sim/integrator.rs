use crate::dynamics::eom::{derivatives, Environment};
use crate::dynamics::state::{ThrustCommand, VehicleState};
use crate::physics::CentralBodyProvider;

// ---------------------------------------------------------------------------
// RK4 with the engine command held constant over the step
// ---------------------------------------------------------------------------

/// Single RK4 step. Attitude, mass and thrust bounds are carried unchanged.
pub fn rk4_step<B: CentralBodyProvider + ?Sized>(
    state: &VehicleState,
    cmd: &ThrustCommand,
    env: &Environment<'_, B>,
    dt: f64,
) -> VehicleState {
    let k1 = derivatives(state, cmd, env);
    let k2 = derivatives(&state.apply(&k1, dt * 0.5), cmd, env);
    let k3 = derivatives(&state.apply(&k2, dt * 0.5), cmd, env);
    let k4 = derivatives(&state.apply(&k3, dt), cmd, env);

    VehicleState {
        time: state.time + dt,
        pos: state.pos + (k1.dpos + 2.0 * k2.dpos + 2.0 * k3.dpos + k4.dpos) * (dt / 6.0),
        vel: state.vel + (k1.dvel + 2.0 * k2.dvel + 2.0 * k3.dvel + k4.dvel) * (dt / 6.0),
        ..state.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physics::aerodynamics::AeroForces;
    use crate::physics::{AeroLookup, SphericalBody};
    use nalgebra::Vector3;

    struct Vacuum;

    impl AeroLookup for Vacuum {
        fn flow_forces(&self, _speed: f64, _aoa: f64, _altitude: f64) -> AeroForces {
            AeroForces::zero()
        }
    }

    #[test]
    fn vacuum_drop_matches_closed_form() {
        let body = SphericalBody::earth().non_rotating();
        let env = Environment { body: &body, aero: &Vacuum, aero_factor: 1.0 };
        let mut s = VehicleState {
            time: 0.0,
            pos: Vector3::new(0.0, 0.0, body.radius + 1_000.0),
            vel: Vector3::zeros(),
            att: Vector3::z(),
            mass: 1_000.0,
            min_thrust: 0.0,
            max_thrust: 0.0,
            lowest_point: 0.0,
        };
        let cmd = ThrustCommand::coast(Vector3::z());
        for _ in 0..100 {
            s = rk4_step(&s, &cmd, &env, 0.1);
        }
        // 10 s of ~9.82 m/s^2
        let dropped = body.radius + 1_000.0 - s.pos.z;
        assert!((dropped - 491.0).abs() < 2.0, "dropped {dropped}");
        assert!((s.time - 10.0).abs() < 1e-9);
    }
}
