use serde::{Deserialize, Serialize};
use tracing::info;

use super::provider::{EngineId, EngineInfo};

// ---------------------------------------------------------------------------
// Landing-burn engine selection
// ---------------------------------------------------------------------------

/// Which engines fire during the landing burn.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LandingBurnEngines {
    /// Whatever is active when the burn starts.
    #[default]
    Current,
    /// A saved subset, e.g. only the centre engine.
    Subset(Vec<EngineId>),
}

/// Engines to run for the landing burn.
///
/// A saved subset that names an engine the vehicle no longer has (staging,
/// damage) falls back to the engines currently active.
pub fn resolve_landing_burn_engines(selection: &LandingBurnEngines, engines: &[EngineInfo]) -> Vec<EngineId> {
    let current = || engines.iter().filter(|e| e.active).map(|e| e.id).collect::<Vec<_>>();
    match selection {
        LandingBurnEngines::Current => current(),
        LandingBurnEngines::Subset(ids) => {
            let missing: Vec<EngineId> = ids
                .iter()
                .filter(|id| !engines.iter().any(|e| e.id == **id))
                .copied()
                .collect();
            if ids.is_empty() || !missing.is_empty() {
                info!(?missing, "saved landing-burn engines no longer match, using current engines");
                current()
            } else {
                ids.clone()
            }
        }
    }
}

/// Thrust bounds of a given engine subset.
pub fn subset_thrust_bounds(engines: &[EngineInfo], ids: &[EngineId]) -> (f64, f64) {
    engines
        .iter()
        .filter(|e| ids.contains(&e.id))
        .fold((0.0, 0.0), |(lo, hi), e| (lo + e.min_thrust, hi + e.max_thrust))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn three_engines() -> Vec<EngineInfo> {
        (0..3)
            .map(|i| EngineInfo { id: EngineId(i), min_thrust: 300e3, max_thrust: 850e3, active: i != 2 })
            .collect()
    }

    #[test]
    fn current_uses_active_engines() {
        let ids = resolve_landing_burn_engines(&LandingBurnEngines::Current, &three_engines());
        assert_eq!(ids, vec![EngineId(0), EngineId(1)]);
    }

    #[test]
    fn matching_subset_is_kept() {
        let sel = LandingBurnEngines::Subset(vec![EngineId(2)]);
        assert_eq!(resolve_landing_burn_engines(&sel, &three_engines()), vec![EngineId(2)]);
    }

    #[test]
    fn stale_subset_falls_back_to_current() {
        let sel = LandingBurnEngines::Subset(vec![EngineId(1), EngineId(7)]);
        let ids = resolve_landing_burn_engines(&sel, &three_engines());
        assert_eq!(ids, vec![EngineId(0), EngineId(1)]);
    }

    #[test]
    fn subset_bounds_sum_selected_engines() {
        let (lo, hi) = subset_thrust_bounds(&three_engines(), &[EngineId(0), EngineId(2)]);
        assert_eq!((lo, hi), (600e3, 1_700e3));
    }
}
