use crate::physics::AeroLookup;

/// Differences smaller than this (N) leave the correction direction undecided.
const LATERAL_EPS: f64 = 1e-6;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SteerGain {
    /// +1: tilting toward the error lets the air push the vehicle back.
    /// -1: thrust dominates, tilt away from the error. 0: undecided.
    pub sign: f64,
    pub aero_lateral: f64,
    pub thrust_lateral: f64,
}

/// Decide whether lateral correction comes from the airframe or the engines.
///
/// Only the sign of `mass / (aero - thrust)` is kept; its magnitude blows up
/// where the two effects cancel.
pub fn estimate_steer_gain(
    aero: &dyn AeroLookup,
    thrust: f64,
    airspeed: f64,
    altitude: f64,
    mass: f64,
    probe_aoa: f64,
) -> SteerGain {
    let forces = aero.flow_forces(airspeed, probe_aoa, altitude);
    let aero_lateral = forces.total().y.abs();
    let thrust_lateral = thrust.max(0.0) * probe_aoa.sin().abs();

    let denom = aero_lateral - thrust_lateral;
    let sign = if denom.abs() < LATERAL_EPS || !denom.is_finite() {
        0.0
    } else {
        (mass / denom).signum()
    };
    SteerGain { sign, aero_lateral, thrust_lateral }
}

/// Lift magnitude at the calibration probe angle (telemetry only).
pub fn lift_at_probe(aero: &dyn AeroLookup, airspeed: f64, altitude: f64, probe_aoa: f64) -> f64 {
    aero.flow_forces(airspeed, probe_aoa, altitude).lift.y.abs()
}
