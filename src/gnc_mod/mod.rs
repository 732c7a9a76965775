pub mod booster;
pub mod config;
pub mod controller;
pub mod guidance;
pub mod landing_burn;
pub mod phase;
pub mod pid;
pub mod predictor;
pub mod steer_gain;
pub mod target;

pub use booster::{BoosterController, GuidanceOutput, TickTelemetry};
pub use config::{ControllerConfig, PredictorConfig};
pub use controller::{Policy, RetrogradeCoast};
pub use landing_burn::{
    min_height_at_min_thrust, suicide_burn_descent_rate, suicide_burn_feedforward, suicide_burn_height,
    LandingBurnState,
};
pub use phase::Phase;
pub use pid::ClampedPid;
pub use predictor::{Prediction, Predictor};
pub use steer_gain::{estimate_steer_gain, SteerGain};
pub use target::Target;
