use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use crate::errors::GuidanceError;
use crate::physics::CentralBodyProvider;

/// Landing site on the surface. Degrees, metres above the body radius.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Target {
    pub latitude: f64,
    pub longitude: f64,
    pub altitude: f64,
}

impl Target {
    pub fn new(latitude: f64, longitude: f64, altitude: f64) -> Self {
        Self { latitude, longitude, altitude }
    }

    /// All-zero coordinates mean "no target picked".
    pub fn is_unset(&self) -> bool {
        self.latitude == 0.0 && self.longitude == 0.0 && self.altitude == 0.0
    }

    pub fn validate(&self) -> Result<(), GuidanceError> {
        if self.is_unset() {
            return Err(GuidanceError::NoTarget);
        }
        if !(self.latitude.is_finite() && self.longitude.is_finite() && self.altitude.is_finite()) {
            return Err(GuidanceError::InvalidTarget("non-finite coordinate".into()));
        }
        if self.latitude.abs() > 90.0 {
            return Err(GuidanceError::InvalidTarget(format!("latitude {} out of range", self.latitude)));
        }
        Ok(())
    }

    /// World position now; changes every tick on a rotating body.
    pub fn resolve<B: CentralBodyProvider + ?Sized>(&self, body: &B) -> Vector3<f64> {
        body.surface_position(self.latitude, self.longitude, self.altitude)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physics::SphericalBody;

    #[test]
    fn zero_target_is_rejected() {
        assert_eq!(Target::default().validate(), Err(GuidanceError::NoTarget));
    }

    #[test]
    fn equator_prime_meridian_with_altitude_is_a_target() {
        assert!(Target::new(0.0, 0.0, 5.0).validate().is_ok());
    }

    #[test]
    fn bad_latitude_is_rejected() {
        assert!(matches!(
            Target::new(91.0, 0.0, 0.0).validate(),
            Err(GuidanceError::InvalidTarget(_))
        ));
        assert!(matches!(
            Target::new(f64::NAN, 0.0, 0.0).validate(),
            Err(GuidanceError::InvalidTarget(_))
        ));
    }

    #[test]
    fn resolves_on_surface() {
        let body = SphericalBody::earth();
        let p = Target::new(28.5, -80.6, 3.0).resolve(&body);
        assert!((body.altitude(&p) - 3.0).abs() < 1e-6);
    }
}
