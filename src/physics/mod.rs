pub mod aero_cache;
pub mod aerodynamics;
pub mod atmosphere;
pub mod body;
pub mod gravity;

pub use aero_cache::{AeroCacheConfig, AeroForceCache};
pub use aerodynamics::{
    AeroForces, AeroLookup, AeroModelKind, AerodynamicForceProvider, BallisticModel, DirectAero,
    SlenderBodyModel,
};
pub use body::{CentralBodyProvider, SphericalBody};
