pub mod booster;
pub mod engines;
pub mod provider;

pub use booster::{presets, Engine, SimBooster, SimBoosterBuilder};
pub use engines::{resolve_landing_burn_engines, subset_thrust_bounds, LandingBurnEngines};
pub use provider::{EngineId, EngineInfo, VehicleStateProvider};
