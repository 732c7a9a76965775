pub mod eom;
pub mod state;

pub use eom::{derivatives, Environment};
pub use state::{Deriv, ThrustCommand, TrajectorySample, VehicleState, G0, THRUST_EPS};
