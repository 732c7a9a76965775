use nalgebra::{Unit, UnitQuaternion, Vector3};

use crate::dynamics::state::G0;
use crate::physics::aerodynamics::any_perpendicular;
use super::provider::{EngineId, EngineInfo, VehicleStateProvider};

// ---------------------------------------------------------------------------
// Simulated booster (host side of the closed-loop runner and tests)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Engine {
    pub id: EngineId,
    pub min_thrust: f64, // N
    pub max_thrust: f64, // N
    pub isp: f64,        // s
    pub active: bool,
}

impl Engine {
    pub fn thrust_at(&self, throttle: f64) -> f64 {
        if !self.active || throttle <= 0.0 {
            0.0
        } else {
            self.min_thrust + throttle.min(1.0) * (self.max_thrust - self.min_thrust)
        }
    }
}

#[derive(Debug, Clone)]
pub struct SimBooster {
    pub name: String,
    pub dry_mass: f64,
    pub propellant_mass: f64,
    pub engines: Vec<Engine>,
    pub pos: Vector3<f64>,
    pub vel: Vector3<f64>,
    pub att: Vector3<f64>,
    pub slew_rate: f64,     // rad/s
    pub lowest_point: f64,  // m below CoM
    pub gear_deployed: bool,
}

impl SimBooster {
    pub fn has_propellant(&self) -> bool {
        self.propellant_mass > 1e-6
    }

    /// Thrust (N) actually produced for a throttle setting.
    pub fn thrust_at(&self, throttle: f64) -> f64 {
        if !self.has_propellant() {
            return 0.0;
        }
        self.engines.iter().map(|e| e.thrust_at(throttle)).sum()
    }

    /// Propellant consumption (kg/s) at a throttle setting.
    pub fn mass_flow(&self, throttle: f64) -> f64 {
        if !self.has_propellant() {
            return 0.0;
        }
        self.engines
            .iter()
            .filter(|e| e.isp > 0.0)
            .map(|e| e.thrust_at(throttle) / (e.isp * G0))
            .sum()
    }

    pub fn burn(&mut self, throttle: f64, dt: f64) -> f64 {
        let used = (self.mass_flow(throttle) * dt).min(self.propellant_mass);
        self.propellant_mass -= used;
        used
    }

    /// Turn the thrust axis toward `steer`, limited by the slew rate.
    pub fn slew_toward(&mut self, steer: &Vector3<f64>, dt: f64) {
        let Some(target) = steer.try_normalize(1e-12) else {
            return;
        };
        let angle = self.att.dot(&target).clamp(-1.0, 1.0).acos();
        let max_step = self.slew_rate * dt;
        if angle <= max_step {
            self.att = target;
            return;
        }
        let axis = self
            .att
            .cross(&target)
            .try_normalize(1e-12)
            .unwrap_or_else(|| any_perpendicular(&self.att));
        let rot = UnitQuaternion::from_axis_angle(&Unit::new_unchecked(axis), max_step);
        self.att = (rot * self.att).normalize();
    }
}

impl VehicleStateProvider for SimBooster {
    fn position(&self) -> Vector3<f64> {
        self.pos
    }

    fn velocity(&self) -> Vector3<f64> {
        self.vel
    }

    fn attitude(&self) -> Vector3<f64> {
        self.att
    }

    fn total_mass(&self) -> f64 {
        self.dry_mass + self.propellant_mass
    }

    fn engines(&self) -> Vec<EngineInfo> {
        // A dry tank reports zero thrust rather than hiding the engines.
        let scale = if self.has_propellant() { 1.0 } else { 0.0 };
        self.engines
            .iter()
            .map(|e| EngineInfo {
                id: e.id,
                min_thrust: e.min_thrust * scale,
                max_thrust: e.max_thrust * scale,
                active: e.active,
            })
            .collect()
    }

    fn set_engine_active(&mut self, id: EngineId, active: bool) {
        if let Some(e) = self.engines.iter_mut().find(|e| e.id == id) {
            e.active = active;
        }
    }

    fn lowest_point_offset(&self) -> f64 {
        self.lowest_point
    }

    fn deploy_landing_gear(&mut self) -> bool {
        let newly = !self.gear_deployed;
        self.gear_deployed = true;
        newly
    }

    fn name(&self) -> &str {
        &self.name
    }
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

pub struct SimBoosterBuilder {
    name: String,
    dry_mass: f64,
    propellant_mass: f64,
    engines: Vec<Engine>,
    slew_rate: f64,
    lowest_point: f64,
}

impl SimBoosterBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            dry_mass: 25_000.0,
            propellant_mass: 20_000.0,
            engines: vec![],
            slew_rate: 10f64.to_radians(),
            lowest_point: 20.0,
        }
    }

    pub fn dry_mass(mut self, v: f64) -> Self { self.dry_mass = v; self }
    pub fn propellant_mass(mut self, v: f64) -> Self { self.propellant_mass = v; self }
    pub fn slew_rate_deg(mut self, v: f64) -> Self { self.slew_rate = v.to_radians(); self }
    pub fn lowest_point(mut self, v: f64) -> Self { self.lowest_point = v; self }

    pub fn engine(mut self, min_thrust: f64, max_thrust: f64, isp: f64) -> Self {
        let id = EngineId(self.engines.len() as u32);
        self.engines.push(Engine { id, min_thrust, max_thrust, isp, active: true });
        self
    }

    /// Place the built booster in the world.
    pub fn build(self, pos: Vector3<f64>, vel: Vector3<f64>, att: Vector3<f64>) -> SimBooster {
        SimBooster {
            name: self.name,
            dry_mass: self.dry_mass,
            propellant_mass: self.propellant_mass,
            engines: self.engines,
            pos,
            vel,
            att: att.try_normalize(1e-12).unwrap_or_else(Vector3::z),
            slew_rate: self.slew_rate,
            lowest_point: self.lowest_point,
            gear_deployed: false,
        }
    }
}

pub mod presets {
    use super::*;

    /// Three-engine first stage returning with ~25 t of propellant.
    pub fn returning_booster(pos: Vector3<f64>, vel: Vector3<f64>) -> SimBooster {
        let att = -vel.try_normalize(1e-9).unwrap_or_else(Vector3::z);
        SimBoosterBuilder::new("B-1")
            .dry_mass(25_000.0)
            .propellant_mass(25_000.0)
            .engine(340_000.0, 850_000.0, 300.0)
            .engine(340_000.0, 850_000.0, 300.0)
            .engine(340_000.0, 850_000.0, 300.0)
            .slew_rate_deg(12.0)
            .lowest_point(21.0)
            .build(pos, vel, att)
    }
}
