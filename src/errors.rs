use thiserror::Error;

/// Failures at the configuration and enable boundary.
///
/// The per-tick path never fails; these only come back from enabling
/// guidance, validating a config, or addressing a vehicle the session does
/// not know.
#[derive(Debug, Error, PartialEq)]
pub enum GuidanceError {
    #[error("no target set")]
    NoTarget,
    #[error("invalid target: {0}")]
    InvalidTarget(String),
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("guidance is not enabled for vehicle {0}")]
    UnknownVehicle(u64),
}
