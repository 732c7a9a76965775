pub mod integrator;
pub mod runner;

pub use integrator::rk4_step;
pub use runner::{fly_descent, FlightLog, FlightStep, SimConfig};
