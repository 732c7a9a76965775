use serde::{Deserialize, Serialize};

use crate::errors::GuidanceError;
use crate::physics::AeroCacheConfig;
use crate::vehicle::LandingBurnEngines;

// ---------------------------------------------------------------------------
// Predictor tuning
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PredictorConfig {
    /// Step above the atmospheric interface (s).
    pub coarse_dt: f64,
    /// Step below it (s).
    pub fine_dt: f64,
    pub interface_altitude: f64,
    /// Cap on simulated flight time (s).
    pub max_time: f64,
    /// Multiplier on predicted aerodynamic force.
    pub aero_factor: f64,
    /// Step used by the landing-burn probe (s).
    pub landing_burn_dt: f64,
    pub landing_burn_max_time: f64,
}

impl Default for PredictorConfig {
    fn default() -> Self {
        Self {
            coarse_dt: 2.0,
            fine_dt: 0.1,
            interface_altitude: 70_000.0,
            max_time: 600.0,
            aero_factor: 1.0,
            landing_burn_dt: 0.5,
            landing_burn_max_time: 600.0,
        }
    }
}

// ---------------------------------------------------------------------------
// Controller tuning
// ---------------------------------------------------------------------------

/// Everything tunable about the descent. Angles in degrees.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    // Boostback
    pub boostback_gain: f64,
    pub boostback_min_accel: f64,    // m/s^2
    pub boostback_done_error: f64,   // m
    pub boostback_close_error: f64,  // m, never abort on a rising error inside this

    // Re-entry burn
    pub reentry_burn_alt: f64,
    pub reentry_burn_target_speed: f64,
    pub reentry_burn_steer_kp: f64,
    pub reentry_burn_max_aoa: f64,
    pub reentry_burn_ramp_height: f64,

    // Aero descent
    pub aero_descent_steer_kp: f64,
    pub aero_descent_max_aoa: f64,

    // Landing burn
    pub landing_burn_steer_kp: f64,
    pub landing_burn_max_aoa: f64,
    pub landing_burn_margin: f64,       // (0, 1), more is safer and costs propellant
    pub landing_burn_speed_gain: f64,   // 1/s on vertical-speed error
    pub landing_burn_min_throttle: f64,
    pub landing_burn_accel_tolerance: f64, // m/s^2 before the ignition height is recomputed
    pub landing_burn_engines: LandingBurnEngines,
    pub ignite_lead_time: f64,          // s, engine spin-up
    pub bailout_descent_speed: f64,     // m/s
    pub upright_bias: f64,

    // Touchdown
    pub touchdown_margin: f64,
    pub touchdown_speed: f64,
    pub no_steer_height: f64,
    pub deploy_landing_gear: bool,
    pub gear_deploy_height: f64,

    // Steering
    pub steer_probe_aoa: f64,
    pub lift_probe_aoa: f64,
    pub attitude_blend: f64, // weight kept on the current attitude

    // Scheduling
    pub max_ticks_per_sec: f64,
    pub low_altitude_height: f64,

    pub predictor: PredictorConfig,
    pub aero_cache: AeroCacheConfig,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            boostback_gain: 20.0,
            boostback_min_accel: 2.0,
            boostback_done_error: 20.0,
            boostback_close_error: 1_000.0,

            reentry_burn_alt: 55_000.0,
            reentry_burn_target_speed: 700.0,
            reentry_burn_steer_kp: 0.0003,
            reentry_burn_max_aoa: 30.0,
            reentry_burn_ramp_height: 5_000.0,

            aero_descent_steer_kp: 10.0,
            aero_descent_max_aoa: 15.0,

            landing_burn_steer_kp: 10.0,
            landing_burn_max_aoa: 15.0,
            landing_burn_margin: 0.8,
            landing_burn_speed_gain: 5.0,
            landing_burn_min_throttle: 0.0,
            landing_burn_accel_tolerance: 0.02,
            landing_burn_engines: LandingBurnEngines::Current,
            ignite_lead_time: 3.0,
            bailout_descent_speed: 20.0,
            upright_bias: 0.5,

            touchdown_margin: 20.0,
            touchdown_speed: 2.0,
            no_steer_height: 200.0,
            deploy_landing_gear: true,
            gear_deploy_height: 500.0,

            steer_probe_aoa: 15.0,
            lift_probe_aoa: 5.0,
            attitude_blend: 0.75,

            max_ticks_per_sec: 10.0,
            low_altitude_height: 500.0,

            predictor: PredictorConfig::default(),
            aero_cache: AeroCacheConfig::default(),
        }
    }
}

impl ControllerConfig {
    pub fn from_json(text: &str) -> Result<Self, GuidanceError> {
        let cfg: Self = serde_json::from_str(text).map_err(|e| GuidanceError::InvalidConfig(e.to_string()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), GuidanceError> {
        let positive = [
            ("reentry_burn_alt", self.reentry_burn_alt),
            ("reentry_burn_ramp_height", self.reentry_burn_ramp_height),
            ("max_ticks_per_sec", self.max_ticks_per_sec),
            ("predictor.coarse_dt", self.predictor.coarse_dt),
            ("predictor.fine_dt", self.predictor.fine_dt),
            ("predictor.max_time", self.predictor.max_time),
            ("predictor.landing_burn_dt", self.predictor.landing_burn_dt),
            ("predictor.landing_burn_max_time", self.predictor.landing_burn_max_time),
        ];
        for (name, v) in positive {
            if !(v.is_finite() && v > 0.0) {
                return Err(GuidanceError::InvalidConfig(format!("{name} must be positive, got {v}")));
            }
        }
        if !(self.landing_burn_margin > 0.0 && self.landing_burn_margin < 1.0) {
            return Err(GuidanceError::InvalidConfig(format!(
                "landing_burn_margin must be in (0, 1), got {}",
                self.landing_burn_margin
            )));
        }
        if !(0.0..=1.0).contains(&self.attitude_blend) {
            return Err(GuidanceError::InvalidConfig(format!(
                "attitude_blend must be in [0, 1], got {}",
                self.attitude_blend
            )));
        }
        if !(0.0..=1.0).contains(&self.landing_burn_min_throttle) {
            return Err(GuidanceError::InvalidConfig("landing_burn_min_throttle must be in [0, 1]".into()));
        }
        for (name, deg) in [
            ("reentry_burn_max_aoa", self.reentry_burn_max_aoa),
            ("aero_descent_max_aoa", self.aero_descent_max_aoa),
            ("landing_burn_max_aoa", self.landing_burn_max_aoa),
            ("steer_probe_aoa", self.steer_probe_aoa),
            ("lift_probe_aoa", self.lift_probe_aoa),
        ] {
            if !(0.0..90.0).contains(&deg) {
                return Err(GuidanceError::InvalidConfig(format!("{name} must be in [0, 90) deg, got {deg}")));
            }
        }
        if self.touchdown_speed < 0.0 || self.touchdown_margin < 0.0 {
            return Err(GuidanceError::InvalidConfig("touchdown speed and margin must not be negative".into()));
        }
        Ok(())
    }
}
