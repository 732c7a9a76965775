use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

/// Stable identifier of one engine on a vehicle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EngineId(pub u32);

/// What the host reports about one engine right now.
#[derive(Debug, Clone)]
pub struct EngineInfo {
    pub id: EngineId,
    pub min_thrust: f64, // N at current conditions
    pub max_thrust: f64, // N at current conditions
    pub active: bool,
}

/// The host vehicle as the guidance core sees it.
///
/// Implement this over whatever owns the real vehicle; the core never
/// touches hardware except through `set_engine_active` and
/// `deploy_landing_gear`.
pub trait VehicleStateProvider {
    fn position(&self) -> Vector3<f64>;
    fn velocity(&self) -> Vector3<f64>;
    /// Unit vector along the thrust axis (nose direction).
    fn attitude(&self) -> Vector3<f64>;
    fn total_mass(&self) -> f64;
    fn engines(&self) -> Vec<EngineInfo>;
    fn set_engine_active(&mut self, id: EngineId, active: bool);
    /// Distance from the centre of mass down to the lowest structural point.
    fn lowest_point_offset(&self) -> f64;
    /// Returns true if the gear was not already down.
    fn deploy_landing_gear(&mut self) -> bool;

    /// Summed (min, max) thrust of the active engines.
    fn thrust_bounds(&self) -> (f64, f64) {
        self.engines()
            .iter()
            .filter(|e| e.active)
            .fold((0.0, 0.0), |(lo, hi), e| (lo + e.min_thrust, hi + e.max_thrust))
    }

    fn name(&self) -> &str {
        "vehicle"
    }
}
