use std::fmt;

use serde::{Deserialize, Serialize};

/// Descent phases in flight order. `Unset` is only ever entered by reset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    #[default]
    Unset,
    BoostBack,
    Coasting,
    ReentryBurn,
    AeroDescent,
    LandingBurn,
}

impl Phase {
    pub fn label(self) -> &'static str {
        match self {
            Phase::Unset => "Unset",
            Phase::BoostBack => "Boostback",
            Phase::Coasting => "Coasting",
            Phase::ReentryBurn => "Re-entry Burn",
            Phase::AeroDescent => "Aero Descent",
            Phase::LandingBurn => "Landing Burn",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
