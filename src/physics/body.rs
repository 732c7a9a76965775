use nalgebra::{UnitQuaternion, Vector3};

use super::gravity;

/// What the guidance core needs to know about the body it lands on.
///
/// Positions are world-frame; the world frame is inertial and the surface
/// rotates within it at `angular_velocity`.
pub trait CentralBodyProvider {
    fn position(&self) -> Vector3<f64>;
    fn radius(&self) -> f64;
    fn gravitational_parameter(&self) -> f64;
    /// Rotation vector (rad/s).
    fn angular_velocity(&self) -> Vector3<f64>;
    /// World position of a surface point *now*. Degrees, metres above radius.
    fn surface_position(&self, latitude: f64, longitude: f64, altitude: f64) -> Vector3<f64>;

    /// Local vertical at a world position.
    fn up(&self, world_pos: &Vector3<f64>) -> Vector3<f64> {
        let rel = world_pos - self.position();
        let r = rel.norm();
        if r > 1e-9 {
            rel / r
        } else {
            Vector3::z()
        }
    }

    /// Local north: the spin axis with the vertical component removed.
    fn north(&self, world_pos: &Vector3<f64>) -> Vector3<f64> {
        let up = self.up(world_pos);
        let axis = {
            let w = self.angular_velocity();
            if w.norm() > 1e-12 {
                w.normalize()
            } else {
                Vector3::z()
            }
        };
        let n = axis - up * axis.dot(&up);
        if n.norm() > 1e-9 {
            n.normalize()
        } else {
            // At a pole any horizontal direction will do.
            let alt = if up.x.abs() < 0.9 { Vector3::x() } else { Vector3::y() };
            (alt - up * alt.dot(&up)).normalize()
        }
    }

    fn altitude(&self, world_pos: &Vector3<f64>) -> f64 {
        (world_pos - self.position()).norm() - self.radius()
    }

    /// Velocity of the co-rotating atmosphere at a world position.
    fn surface_velocity(&self, world_pos: &Vector3<f64>) -> Vector3<f64> {
        self.angular_velocity().cross(&(world_pos - self.position()))
    }

    fn gravity(&self, world_pos: &Vector3<f64>) -> Vector3<f64> {
        gravity::gravity_accel(&(world_pos - self.position()), self.gravitational_parameter())
    }
}

// ---------------------------------------------------------------------------
// Rotating sphere
// ---------------------------------------------------------------------------

/// Uniform rotating sphere centred at the world origin, spinning about +Z.
///
/// `rotation_angle` is how far the surface has turned since epoch; the host
/// advances it with [`SphericalBody::advance`].
#[derive(Debug, Clone)]
pub struct SphericalBody {
    pub name: String,
    pub radius: f64,
    pub mu: f64,
    pub rotation_rate: f64, // rad/s about +Z
    pub rotation_angle: f64,
}

impl SphericalBody {
    pub fn earth() -> Self {
        Self {
            name: "Earth".into(),
            radius: 6_371_000.0,
            mu: 3.986_004_418e14,
            rotation_rate: 7.292_115e-5,
            rotation_angle: 0.0,
        }
    }

    /// Same body with the surface held still; used by headless tests.
    pub fn non_rotating(mut self) -> Self {
        self.rotation_rate = 0.0;
        self
    }

    pub fn advance(&mut self, dt: f64) {
        self.rotation_angle =
            (self.rotation_angle + self.rotation_rate * dt).rem_euclid(std::f64::consts::TAU);
    }

    /// Inverse of `surface_position`: (lat deg, lon deg, alt m).
    pub fn lat_lon_alt(&self, world_pos: &Vector3<f64>) -> (f64, f64, f64) {
        let spin = UnitQuaternion::from_axis_angle(&Vector3::z_axis(), -self.rotation_angle);
        let p = spin * world_pos;
        let r = p.norm();
        let lat = (p.z / r).clamp(-1.0, 1.0).asin().to_degrees();
        let lon = p.y.atan2(p.x).to_degrees();
        (lat, lon, r - self.radius)
    }
}

impl CentralBodyProvider for SphericalBody {
    fn position(&self) -> Vector3<f64> {
        Vector3::zeros()
    }

    fn radius(&self) -> f64 {
        self.radius
    }

    fn gravitational_parameter(&self) -> f64 {
        self.mu
    }

    fn angular_velocity(&self) -> Vector3<f64> {
        Vector3::new(0.0, 0.0, self.rotation_rate)
    }

    fn surface_position(&self, latitude: f64, longitude: f64, altitude: f64) -> Vector3<f64> {
        let (lat, lon) = (latitude.to_radians(), longitude.to_radians() + self.rotation_angle);
        let r = self.radius + altitude;
        Vector3::new(r * lat.cos() * lon.cos(), r * lat.cos() * lon.sin(), r * lat.sin())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn surface_position_round_trips_through_lat_lon() {
        let mut body = SphericalBody::earth();
        body.advance(3600.0);
        let p = body.surface_position(28.5, -80.6, 120.0);
        let (lat, lon, alt) = body.lat_lon_alt(&p);
        assert_relative_eq!(lat, 28.5, epsilon = 1e-9);
        assert_relative_eq!(lon, -80.6, epsilon = 1e-9);
        assert_relative_eq!(alt, 120.0, epsilon = 1e-6);
    }

    #[test]
    fn surface_moves_as_body_rotates() {
        let mut body = SphericalBody::earth();
        let before = body.surface_position(0.0, 0.0, 0.0);
        body.advance(1.0);
        let after = body.surface_position(0.0, 0.0, 0.0);
        let surface_speed = (after - before).norm();
        assert_relative_eq!(surface_speed, body.radius * body.rotation_rate, max_relative = 1e-6);
        let v = body.surface_velocity(&before);
        assert_relative_eq!(v.norm(), surface_speed, max_relative = 1e-4);
    }

    #[test]
    fn local_frame_is_orthonormal() {
        let body = SphericalBody::earth();
        let p = body.surface_position(45.0, 10.0, 0.0);
        let up = body.up(&p);
        let north = body.north(&p);
        assert_relative_eq!(up.norm(), 1.0, epsilon = 1e-12);
        assert_relative_eq!(north.norm(), 1.0, epsilon = 1e-12);
        assert!(up.dot(&north).abs() < 1e-12);
        assert!(north.z > 0.0);
    }
}
