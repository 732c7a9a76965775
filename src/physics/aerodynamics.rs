use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use super::atmosphere;
use super::body::CentralBodyProvider;

// ---------------------------------------------------------------------------
// Flow-frame forces
// ---------------------------------------------------------------------------

/// Drag and lift in the flow frame: +x along the air velocity, +y toward the
/// lift reference (the side the vehicle axis is tilted to), z unused.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AeroForces {
    pub drag: Vector3<f64>,
    pub lift: Vector3<f64>,
}

impl AeroForces {
    pub fn zero() -> Self {
        Self { drag: Vector3::zeros(), lift: Vector3::zeros() }
    }

    pub fn total(&self) -> Vector3<f64> {
        self.drag + self.lift
    }

    pub fn scaled(&self, k: f64) -> Self {
        Self { drag: self.drag * k, lift: self.lift * k }
    }

    /// Map the flow-frame total into world axes.
    pub fn to_world(&self, air_dir: &Vector3<f64>, lift_ref: &Vector3<f64>) -> Vector3<f64> {
        let f = self.total();
        air_dir * f.x + lift_ref * f.y
    }
}

/// The one aerodynamic capability the core consumes.
///
/// `air_velocity` is given in the flow frame, so only its magnitude matters
/// to well-behaved models. `aoa` is signed, radians, measured from retrograde.
pub trait AerodynamicForceProvider: Send + Sync {
    fn forces(&self, altitude: f64, air_velocity: &Vector3<f64>, aoa: f64) -> AeroForces;

    /// Air density used to non-dimensionalise cached forces.
    fn density(&self, altitude: f64) -> f64;

    fn name(&self) -> &str {
        "unnamed"
    }
}

// ---------------------------------------------------------------------------
// Models
// ---------------------------------------------------------------------------

/// Cylinder flying engines-first: axial drag grows with incidence and the
/// normal force pushes away from the side the axis is tilted to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlenderBodyModel {
    pub reference_area: f64, // m^2
    pub cd0: f64,
    pub cd_alpha: f64,
    pub cn_alpha: f64,
}

impl Default for SlenderBodyModel {
    fn default() -> Self {
        // 3.7 m diameter booster with grid fins.
        Self { reference_area: 10.75, cd0: 0.9, cd_alpha: 1.2, cn_alpha: 2.4 }
    }
}

impl AerodynamicForceProvider for SlenderBodyModel {
    fn forces(&self, altitude: f64, air_velocity: &Vector3<f64>, aoa: f64) -> AeroForces {
        let speed = air_velocity.norm();
        let q_dyn = 0.5 * atmosphere::density(altitude) * speed * speed;
        let (s, c) = aoa.sin_cos();
        let cd = self.cd0 + self.cd_alpha * s * s;
        let cn = self.cn_alpha * s * c;
        AeroForces {
            drag: Vector3::new(-q_dyn * self.reference_area * cd, 0.0, 0.0),
            lift: Vector3::new(0.0, -q_dyn * self.reference_area * cn, 0.0),
        }
    }

    fn density(&self, altitude: f64) -> f64 {
        atmosphere::density(altitude)
    }

    fn name(&self) -> &str {
        "slender-body"
    }
}

/// Drag only, independent of attitude.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BallisticModel {
    pub reference_area: f64,
    pub cd: f64,
}

impl Default for BallisticModel {
    fn default() -> Self {
        Self { reference_area: 10.75, cd: 1.0 }
    }
}

impl AerodynamicForceProvider for BallisticModel {
    fn forces(&self, altitude: f64, air_velocity: &Vector3<f64>, _aoa: f64) -> AeroForces {
        let speed = air_velocity.norm();
        let q_dyn = 0.5 * atmosphere::density(altitude) * speed * speed;
        AeroForces {
            drag: Vector3::new(-q_dyn * self.reference_area * self.cd, 0.0, 0.0),
            lift: Vector3::zeros(),
        }
    }

    fn density(&self, altitude: f64) -> f64 {
        atmosphere::density(altitude)
    }

    fn name(&self) -> &str {
        "ballistic"
    }
}

/// Closed set of aerodynamic backends, chosen once at configuration time.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AeroModelKind {
    SlenderBody(SlenderBodyModel),
    Ballistic(BallisticModel),
}

impl Default for AeroModelKind {
    fn default() -> Self {
        AeroModelKind::SlenderBody(SlenderBodyModel::default())
    }
}

impl AeroModelKind {
    pub fn build(&self) -> Box<dyn AerodynamicForceProvider> {
        match self {
            AeroModelKind::SlenderBody(m) => Box::new(m.clone()),
            AeroModelKind::Ballistic(m) => Box::new(m.clone()),
        }
    }
}

// ---------------------------------------------------------------------------
// Lookup seam shared by the cache and direct evaluation
// ---------------------------------------------------------------------------

/// Anything that can answer "forces at (speed, aoa, altitude)".
pub trait AeroLookup {
    fn flow_forces(&self, speed: f64, aoa: f64, altitude: f64) -> AeroForces;
}

/// Uncached evaluation, used by the truth model in the closed-loop runner.
pub struct DirectAero<'a>(pub &'a dyn AerodynamicForceProvider);

impl AeroLookup for DirectAero<'_> {
    fn flow_forces(&self, speed: f64, aoa: f64, altitude: f64) -> AeroForces {
        self.0.forces(altitude, &Vector3::new(speed, 0.0, 0.0), aoa)
    }
}

/// Air-relative geometry of the vehicle.
#[derive(Debug, Clone, Copy)]
pub struct FlowGeometry {
    pub speed: f64,
    pub aoa: f64,
    pub air_dir: Vector3<f64>,
    pub lift_ref: Vector3<f64>,
}

/// Angle between `attitude` and retrograde, and the direction it is tilted to.
pub fn flow_geometry(attitude: &Vector3<f64>, air_velocity: &Vector3<f64>) -> Option<FlowGeometry> {
    let speed = air_velocity.norm();
    if speed < 1e-3 {
        return None;
    }
    let air_dir = air_velocity / speed;
    let retro = -air_dir;
    let att = attitude.try_normalize(1e-12).unwrap_or(retro);
    let cos_a = att.dot(&retro).clamp(-1.0, 1.0);
    let lateral = att - retro * cos_a;
    let lift_ref = lateral
        .try_normalize(1e-9)
        .unwrap_or_else(|| any_perpendicular(&air_dir));
    Some(FlowGeometry { speed, aoa: cos_a.acos(), air_dir, lift_ref })
}

pub fn any_perpendicular(v: &Vector3<f64>) -> Vector3<f64> {
    let seed = if v.x.abs() < 0.9 { Vector3::x() } else { Vector3::y() };
    (seed - v * seed.dot(v)).normalize()
}

/// World-frame aerodynamic force on a vehicle at `pos` moving at `vel`.
pub fn world_aero_force<B: CentralBodyProvider + ?Sized>(
    aero: &dyn AeroLookup,
    body: &B,
    pos: &Vector3<f64>,
    vel: &Vector3<f64>,
    attitude: &Vector3<f64>,
    factor: f64,
) -> Vector3<f64> {
    let air = vel - body.surface_velocity(pos);
    match flow_geometry(attitude, &air) {
        Some(g) => {
            let alt = body.altitude(pos);
            aero.flow_forces(g.speed, g.aoa, alt)
                .scaled(factor)
                .to_world(&g.air_dir, &g.lift_ref)
        }
        None => Vector3::zeros(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn drag_opposes_airflow() {
        let m = SlenderBodyModel::default();
        let f = m.forces(5_000.0, &Vector3::new(300.0, 0.0, 0.0), 0.0);
        assert!(f.drag.x < 0.0);
        assert!(f.lift.norm() < 1e-9, "no normal force when flying straight retrograde");
    }

    #[test]
    fn normal_force_is_odd_in_aoa() {
        let m = SlenderBodyModel::default();
        let v = Vector3::new(400.0, 0.0, 0.0);
        let pos = m.forces(10_000.0, &v, 0.2);
        let neg = m.forces(10_000.0, &v, -0.2);
        assert_relative_eq!(pos.lift.y, -neg.lift.y, max_relative = 1e-12);
        assert_relative_eq!(pos.drag.x, neg.drag.x, max_relative = 1e-12);
        assert!(pos.lift.y < 0.0, "pushes away from the tilt");
    }

    #[test]
    fn flow_geometry_measures_tilt_from_retrograde() {
        let air = Vector3::new(0.0, 0.0, -100.0);
        let att = Vector3::new(15f64.to_radians().sin(), 0.0, 15f64.to_radians().cos());
        let g = flow_geometry(&att, &air).unwrap();
        assert_relative_eq!(g.aoa, 15f64.to_radians(), epsilon = 1e-12);
        assert_relative_eq!(g.lift_ref, Vector3::x(), epsilon = 1e-12);
        assert_relative_eq!(g.air_dir, -Vector3::z(), epsilon = 1e-12);
    }

    #[test]
    fn no_flow_no_geometry() {
        assert!(flow_geometry(&Vector3::z(), &Vector3::zeros()).is_none());
    }

    #[test]
    fn model_kind_builds_named_backend() {
        let model = AeroModelKind::Ballistic(BallisticModel::default()).build();
        assert_eq!(model.name(), "ballistic");
        let json = serde_json::to_string(&AeroModelKind::default()).unwrap();
        assert!(json.contains("slender_body"));
    }
}
