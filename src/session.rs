//! Host-owned collection of guided vehicles.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use tracing::info;

use crate::dynamics::state::VehicleState;
use crate::errors::GuidanceError;
use crate::gnc::{BoosterController, ControllerConfig, GuidanceOutput, Phase, Target};
use crate::physics::{AeroForceCache, CentralBodyProvider};
use crate::vehicle::{resolve_landing_burn_engines, subset_thrust_bounds, EngineId, VehicleStateProvider};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VehicleId(pub u64);

impl fmt::Display for VehicleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

struct Guided {
    controller: BoosterController,
    /// Engines saved for the landing burn, resolved on the first tick.
    landing_engines: Option<Vec<EngineId>>,
}

#[derive(Default)]
pub struct GuidanceSession {
    guided: BTreeMap<VehicleId, Guided>,
}

impl GuidanceSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start guiding a vehicle. Fails without touching the session when the
    /// target or config is unusable.
    #[allow(clippy::too_many_arguments)]
    pub fn enable<V, B>(
        &mut self,
        id: VehicleId,
        config: ControllerConfig,
        target: Target,
        vehicle: &V,
        body: &B,
        requested_phase: Option<Phase>,
        aero: Arc<AeroForceCache>,
    ) -> Result<(), GuidanceError>
    where
        V: VehicleStateProvider + ?Sized,
        B: CentralBodyProvider + ?Sized,
    {
        target.validate()?;
        config.validate()?;

        let altitude = body.altitude(&vehicle.position());
        let phase = requested_phase
            .filter(|p| *p != Phase::Unset)
            .unwrap_or_else(|| BoosterController::initial_phase(&config, altitude));
        info!(vehicle = %id, name = vehicle.name(), %phase, altitude, "guidance enabled");

        let controller = BoosterController::new(vehicle.name(), config, target, aero, phase);
        self.guided.insert(id, Guided { controller, landing_engines: None });
        Ok(())
    }

    pub fn disable(&mut self, id: VehicleId) -> Option<BoosterController> {
        let removed = self.guided.remove(&id).map(|g| g.controller);
        if removed.is_some() {
            info!(vehicle = %id, "guidance disabled");
        }
        removed
    }

    pub fn is_enabled(&self, id: VehicleId) -> bool {
        self.guided.contains_key(&id)
    }

    /// `Unset` for vehicles that are not guided.
    pub fn phase(&self, id: VehicleId) -> Phase {
        self.guided.get(&id).map_or(Phase::Unset, |g| g.controller.phase())
    }

    pub fn set_phase(&mut self, id: VehicleId, phase: Phase) -> Result<(), GuidanceError> {
        let g = self.guided.get_mut(&id).ok_or(GuidanceError::UnknownVehicle(id.0))?;
        g.controller.set_phase(phase);
        if phase != Phase::LandingBurn {
            g.landing_engines = None;
        }
        Ok(())
    }

    pub fn controller(&self, id: VehicleId) -> Option<&BoosterController> {
        self.guided.get(&id).map(|g| &g.controller)
    }

    pub fn controller_mut(&mut self, id: VehicleId) -> Option<&mut BoosterController> {
        self.guided.get_mut(&id).map(|g| &mut g.controller)
    }

    pub fn controllers(&self) -> impl Iterator<Item = (VehicleId, &BoosterController)> {
        self.guided.iter().map(|(id, g)| (*id, &g.controller))
    }

    /// Tick one vehicle and act on the result: gear, and the landing-burn
    /// engine subset, which is switched on when the burn starts. Throttle and
    /// steer are left to the host.
    pub fn fly<V, B>(&mut self, id: VehicleId, vehicle: &mut V, body: &B, time: f64) -> Result<GuidanceOutput, GuidanceError>
    where
        V: VehicleStateProvider + ?Sized,
        B: CentralBodyProvider,
    {
        let g = self.guided.get_mut(&id).ok_or(GuidanceError::UnknownVehicle(id.0))?;

        // The ignition height has to be planned with the engines that will fly the burn
        let engines = vehicle.engines();
        let chosen = g.landing_engines.get_or_insert_with(|| {
            resolve_landing_burn_engines(&g.controller.config().landing_burn_engines, &engines)
        });
        g.controller.set_landing_burn_thrust(Some(subset_thrust_bounds(&engines, chosen.as_slice())));

        let state = VehicleState::capture(vehicle, time);
        let out = g.controller.tick(&state, body, false);

        if out.deploy_landing_gear && vehicle.deploy_landing_gear() {
            info!(vehicle = %id, "deploying landing gear");
        }

        if out.phase == Phase::LandingBurn {
            for e in &engines {
                let want = chosen.contains(&e.id);
                if e.active != want {
                    vehicle.set_engine_active(e.id, want);
                }
            }
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physics::{AeroCacheConfig, SlenderBodyModel, SphericalBody};
    use crate::vehicle::{presets, LandingBurnEngines};
    use nalgebra::Vector3;

    fn cache() -> Arc<AeroForceCache> {
        Arc::new(AeroForceCache::new(&AeroCacheConfig::default(), Box::new(SlenderBodyModel::default())))
    }

    #[test]
    fn zero_target_is_refused() {
        let body = SphericalBody::earth().non_rotating();
        let b = presets::returning_booster(Vector3::new(body.radius + 5_000.0, 0.0, 0.0), Vector3::new(-200.0, 0.0, 0.0));
        let mut s = GuidanceSession::new();
        let r = s.enable(VehicleId(1), ControllerConfig::default(), Target::default(), &b, &body, None, cache());
        assert_eq!(r, Err(GuidanceError::NoTarget));
        assert!(!s.is_enabled(VehicleId(1)));
        assert_eq!(s.phase(VehicleId(1)), Phase::Unset);
    }

    #[test]
    fn enable_picks_phase_and_disable_forgets() {
        let body = SphericalBody::earth().non_rotating();
        let b = presets::returning_booster(Vector3::new(body.radius + 5_000.0, 0.0, 0.0), Vector3::new(-200.0, 0.0, 0.0));
        let mut s = GuidanceSession::new();
        s.enable(VehicleId(7), ControllerConfig::default(), Target::new(0.0, 0.0, 1.0), &b, &body, None, cache())
            .unwrap();
        assert_eq!(s.phase(VehicleId(7)), Phase::AeroDescent);
        assert_eq!(s.controllers().count(), 1);
        assert!(s.disable(VehicleId(7)).is_some());
        assert_eq!(s.phase(VehicleId(7)), Phase::Unset);
        assert_eq!(s.set_phase(VehicleId(7), Phase::Coasting), Err(GuidanceError::UnknownVehicle(7)));
    }

    #[test]
    fn landing_burn_runs_only_the_saved_subset() {
        let body = SphericalBody::earth().non_rotating();
        let mut b = presets::returning_booster(Vector3::new(body.radius + 1_500.0, 0.0, 0.0), Vector3::new(-150.0, 0.0, 0.0));
        let cfg = ControllerConfig {
            landing_burn_engines: LandingBurnEngines::Subset(vec![EngineId(1)]),
            ..Default::default()
        };
        let mut s = GuidanceSession::new();
        s.enable(VehicleId(1), cfg, Target::new(0.0, 0.0, 1.0), &b, &body, Some(Phase::LandingBurn), cache())
            .unwrap();
        s.fly(VehicleId(1), &mut b, &body, 0.0).unwrap();
        let active: Vec<EngineId> = b.engines.iter().filter(|e| e.active).map(|e| e.id).collect();
        assert_eq!(active, vec![EngineId(1)]);
    }
}
