//! Memoised aerodynamic forces on a (velocity, angle of attack, altitude) grid.
//!
//! Cells hold forces divided by `rho * max(1, v^2)` so that trilinear
//! interpolation stays well behaved from the upper atmosphere down to the
//! pad. Each cell is filled at most once, on first touch, and is never
//! evicted; `OnceLock` serialises concurrent first touches of the same cell,
//! so one cache may be shared between vehicles flying the same model.

use std::sync::OnceLock;

use nalgebra::{Vector2, Vector3};
use serde::{Deserialize, Serialize};

use super::aerodynamics::{AeroForces, AeroLookup, AerodynamicForceProvider};

/// Grid extent and resolution.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AeroCacheConfig {
    pub max_velocity: f64,  // m/s
    pub max_aoa_deg: f64,   // grid spans [-max, +max]
    pub max_altitude: f64,  // m, top of the sensible atmosphere
    pub velocity_resolution: usize,
    pub aoa_resolution: usize,
    pub altitude_resolution: usize,
}

impl Default for AeroCacheConfig {
    fn default() -> Self {
        Self {
            max_velocity: 3_000.0,
            max_aoa_deg: 60.0,
            max_altitude: 90_000.0,
            velocity_resolution: 32,
            aoa_resolution: 33,
            altitude_resolution: 32,
        }
    }
}

/// Normalised drag and lift pair stored in one grid node.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PackedForces {
    pub drag: Vector2<f64>,
    pub lift: Vector2<f64>,
}

pub struct AeroForceCache {
    model: Box<dyn AerodynamicForceProvider>,
    max_velocity: f64,
    max_aoa: f64,
    max_altitude: f64,
    dims: [usize; 3],
    cells: Vec<OnceLock<PackedForces>>,
}

impl std::fmt::Debug for AeroForceCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AeroForceCache")
            .field("model", &self.model.name())
            .field("dims", &self.dims)
            .field("filled", &self.filled_cells())
            .finish()
    }
}

impl AeroForceCache {
    pub fn new(config: &AeroCacheConfig, model: Box<dyn AerodynamicForceProvider>) -> Self {
        let dims = [
            config.velocity_resolution.max(2),
            config.aoa_resolution.max(2),
            config.altitude_resolution.max(2),
        ];
        let cells = (0..dims[0] * dims[1] * dims[2]).map(|_| OnceLock::new()).collect();
        Self {
            model,
            max_velocity: config.max_velocity.max(1.0),
            max_aoa: config.max_aoa_deg.to_radians().max(1e-6),
            max_altitude: config.max_altitude.max(1.0),
            dims,
            cells,
        }
    }

    pub fn model(&self) -> &dyn AerodynamicForceProvider {
        self.model.as_ref()
    }

    pub fn filled_cells(&self) -> usize {
        self.cells.iter().filter(|c| c.get().is_some()).count()
    }

    /// Interpolated drag and lift, rescaled to newtons, in the flow frame.
    pub fn get_force(&self, velocity: f64, aoa: f64, altitude: f64) -> AeroForces {
        let packed = self.sample_normalized(velocity, aoa, altitude);
        let scale = self.scale(altitude, velocity);
        AeroForces {
            drag: Vector3::new(packed.drag.x, packed.drag.y, 0.0) * scale,
            lift: Vector3::new(packed.lift.x, packed.lift.y, 0.0) * scale,
        }
    }

    /// Trilinear blend of the eight surrounding nodes, before rescaling.
    pub fn sample_normalized(&self, velocity: f64, aoa: f64, altitude: f64) -> PackedForces {
        let (v0, fv) = self.axis(velocity / self.max_velocity, 0);
        let (a0, fa) = self.axis(aoa / self.max_aoa * 0.5 + 0.5, 1);
        let (m0, fm) = self.axis(altitude / self.max_altitude, 2);

        let mut drag = Vector2::zeros();
        let mut lift = Vector2::zeros();
        for (dv, wv) in [(0, 1.0 - fv), (1, fv)] {
            for (da, wa) in [(0, 1.0 - fa), (1, fa)] {
                for (dm, wm) in [(0, 1.0 - fm), (1, fm)] {
                    let w = wv * wa * wm;
                    if w == 0.0 {
                        continue;
                    }
                    let node = self.node(v0 + dv, a0 + da, m0 + dm);
                    drag += node.drag * w;
                    lift += node.lift * w;
                }
            }
        }
        PackedForces { drag, lift }
    }

    /// Packed value of one grid node, computing it on first access.
    pub fn node(&self, iv: usize, ia: usize, im: usize) -> PackedForces {
        let idx = (iv * self.dims[1] + ia) * self.dims[2] + im;
        *self.cells[idx].get_or_init(|| self.compute_node(iv, ia, im))
    }

    /// Grid coordinates of node (iv, ia, im): (velocity, aoa, altitude).
    pub fn node_coordinates(&self, iv: usize, ia: usize, im: usize) -> (f64, f64, f64) {
        let frac = |i: usize, axis: usize| i as f64 / (self.dims[axis] - 1) as f64;
        (
            self.max_velocity * frac(iv, 0),
            self.max_aoa * (frac(ia, 1) * 2.0 - 1.0),
            self.max_altitude * frac(im, 2),
        )
    }

    pub fn dims(&self) -> [usize; 3] {
        self.dims
    }

    fn compute_node(&self, iv: usize, ia: usize, im: usize) -> PackedForces {
        let (vel, aoa, alt) = self.node_coordinates(iv, ia, im);
        let f = self.model.forces(alt, &Vector3::new(vel, 0.0, 0.0), aoa);
        let scale = self.scale(alt, vel);
        let inv = if scale > 0.0 { 1.0 / scale } else { 0.0 };
        PackedForces {
            drag: Vector2::new(f.drag.x, f.drag.y) * inv,
            lift: Vector2::new(f.lift.x, f.lift.y) * inv,
        }
    }

    fn scale(&self, altitude: f64, velocity: f64) -> f64 {
        let rho = self.model.density(altitude.max(0.0));
        if rho < 1e-10 {
            0.0
        } else {
            rho * (velocity * velocity).max(1.0)
        }
    }

    /// Lower node index and in-cell fraction along one axis; out-of-range
    /// queries clamp to the edge cell.
    fn axis(&self, unit: f64, axis: usize) -> (usize, f64) {
        let n = self.dims[axis];
        let x = if unit.is_finite() { unit * (n - 1) as f64 } else { 0.0 };
        let floor = (x.floor().max(0.0) as usize).min(n - 2);
        (floor, (x - floor as f64).clamp(0.0, 1.0))
    }
}

impl AeroLookup for AeroForceCache {
    fn flow_forces(&self, speed: f64, aoa: f64, altitude: f64) -> AeroForces {
        self.get_force(speed, aoa, altitude)
    }
}
