use nalgebra::Vector3;

/// Point-mass gravity at `rel_pos` (position relative to the body centre).
pub fn gravity_accel(rel_pos: &Vector3<f64>, mu: f64) -> Vector3<f64> {
    let r = rel_pos.norm();
    if r < 1.0 {
        return Vector3::zeros();
    }
    -mu / (r * r * r) * rel_pos
}

/// Magnitude of surface-normal gravity at distance `r` from the centre.
pub fn gravity_magnitude(r: f64, mu: f64) -> f64 {
    if r < 1.0 {
        0.0
    } else {
        mu / (r * r)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MU_EARTH: f64 = 3.986_004_418e14;
    const R_EARTH: f64 = 6_371_000.0;

    #[test]
    fn surface_gravity_is_about_one_g() {
        let g = gravity_magnitude(R_EARTH, MU_EARTH);
        assert!((g - 9.82).abs() < 0.05, "got {g}");
    }

    #[test]
    fn points_at_centre() {
        let pos = Vector3::new(R_EARTH, 0.0, 0.0);
        let a = gravity_accel(&pos, MU_EARTH);
        assert!(a.x < 0.0);
        assert!(a.y.abs() < 1e-12 && a.z.abs() < 1e-12);
        assert!((a.norm() - gravity_magnitude(R_EARTH, MU_EARTH)).abs() < 1e-9);
    }
}
