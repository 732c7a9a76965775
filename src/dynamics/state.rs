use nalgebra::Vector3;

use crate::vehicle::VehicleStateProvider;

// ---------------------------------------------------------------------------
// Physical constants
// ---------------------------------------------------------------------------

pub const G0: f64 = 9.80665;

/// Thrust below this (N) counts as "no engine".
pub const THRUST_EPS: f64 = 1e-6;

// ---------------------------------------------------------------------------
// Vehicle snapshot
// ---------------------------------------------------------------------------

/// Everything the guidance core reads about the vehicle on one tick.
/// Frame: world (inertial), origin wherever the host puts it.
#[derive(Debug, Clone)]
pub struct VehicleState {
    pub time: f64,            // s, mission time
    pub pos: Vector3<f64>,    // m
    pub vel: Vector3<f64>,    // m/s, inertial
    pub att: Vector3<f64>,    // unit thrust axis
    pub mass: f64,            // kg
    pub min_thrust: f64,      // N, all active engines at minimum
    pub max_thrust: f64,      // N
    pub lowest_point: f64,    // m from CoM down to the lowest structure
}

impl VehicleState {
    pub fn capture<V: VehicleStateProvider + ?Sized>(vehicle: &V, time: f64) -> Self {
        let (min_thrust, max_thrust) = vehicle.thrust_bounds();
        VehicleState {
            time,
            pos: vehicle.position(),
            vel: vehicle.velocity(),
            att: vehicle.attitude().try_normalize(1e-12).unwrap_or_else(Vector3::z),
            mass: vehicle.total_mass(),
            min_thrust,
            max_thrust,
            lowest_point: vehicle.lowest_point_offset(),
        }
    }

    /// (min, max) thrust acceleration, zero for a massless or engineless vehicle.
    pub fn accel_bounds(&self) -> (f64, f64) {
        if self.mass <= 1e-9 {
            return (0.0, 0.0);
        }
        (self.min_thrust.max(0.0) / self.mass, self.max_thrust.max(0.0) / self.mass)
    }

    /// Thrust delivered for a throttle setting; zero throttle means engines off.
    pub fn thrust_at(&self, throttle: f64) -> f64 {
        if throttle <= 0.0 || self.max_thrust <= THRUST_EPS {
            0.0
        } else {
            let t = throttle.min(1.0);
            self.min_thrust + t * (self.max_thrust - self.min_thrust).max(0.0)
        }
    }

    /// Advance by a derivative scaled by dt (used inside RK4).
    pub fn apply(&self, d: &Deriv, dt: f64) -> VehicleState {
        VehicleState {
            time: self.time + dt,
            pos: self.pos + d.dpos * dt,
            vel: self.vel + d.dvel * dt,
            ..self.clone()
        }
    }
}

// ---------------------------------------------------------------------------
// State derivative
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Deriv {
    pub dpos: Vector3<f64>,
    pub dvel: Vector3<f64>,
}

// ---------------------------------------------------------------------------
// Engine command held over an integration step
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy)]
pub struct ThrustCommand {
    pub throttle: f64,          // [0, 1]
    pub steer: Vector3<f64>,    // unit
}

impl ThrustCommand {
    pub fn coast(steer: Vector3<f64>) -> Self {
        Self { throttle: 0.0, steer }
    }
}

// ---------------------------------------------------------------------------
// Predicted trajectory point
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct TrajectorySample {
    pub time: f64,
    pub pos: Vector3<f64>,
    pub vel: Vector3<f64>,
    pub accel: Vector3<f64>,
    pub airspeed: f64,
    pub mass: f64,
    pub throttle: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn booster(min_thrust: f64, max_thrust: f64) -> VehicleState {
        VehicleState {
            time: 0.0,
            pos: Vector3::zeros(),
            vel: Vector3::zeros(),
            att: Vector3::z(),
            mass: 30_000.0,
            min_thrust,
            max_thrust,
            lowest_point: 0.0,
        }
    }

    #[test]
    fn throttle_maps_between_min_and_max() {
        let v = booster(300_000.0, 900_000.0);
        assert_eq!(v.thrust_at(0.0), 0.0);
        assert!((v.thrust_at(0.5) - 600_000.0).abs() < 1e-6);
        assert!((v.thrust_at(2.0) - 900_000.0).abs() < 1e-6);
    }

    #[test]
    fn no_engine_no_thrust() {
        let v = booster(0.0, 0.0);
        assert_eq!(v.thrust_at(1.0), 0.0);
        assert_eq!(v.accel_bounds(), (0.0, 0.0));
    }
}
