pub mod physics;
pub mod dynamics;
pub mod vehicle;
mod gnc_mod;
pub mod sim;
pub mod io;
pub mod errors;
pub mod session;

// The gnc module: expose gnc_mod as `gnc` publicly
pub mod gnc {
    pub use crate::gnc_mod::*;
}

pub use errors::GuidanceError;
pub use session::{GuidanceSession, VehicleId};
