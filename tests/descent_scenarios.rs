use std::sync::Arc;

use approx::assert_relative_eq;
use nalgebra::Vector3;

use booster_guidance::dynamics::VehicleState;
use booster_guidance::gnc::{
    suicide_burn_descent_rate, suicide_burn_height, ControllerConfig, Phase, Predictor, PredictorConfig, Target,
};
use booster_guidance::physics::{AeroCacheConfig, AeroForceCache, CentralBodyProvider, SlenderBodyModel, SphericalBody};
use booster_guidance::sim::{fly_descent, SimConfig};
use booster_guidance::vehicle::presets;
use booster_guidance::{GuidanceError, GuidanceSession, VehicleId};

fn cache() -> Arc<AeroForceCache> {
    Arc::new(AeroForceCache::new(&AeroCacheConfig::default(), Box::new(SlenderBodyModel::default())))
}

#[test]
fn enabling_without_a_target_changes_nothing() {
    let body = SphericalBody::earth();
    let booster = presets::returning_booster(
        Vector3::new(body.radius + 40_000.0, 0.0, 0.0),
        Vector3::new(-600.0, 0.0, 0.0),
    );
    let mut session = GuidanceSession::new();
    let r = session.enable(VehicleId(3), ControllerConfig::default(), Target::default(), &booster, &body, None, cache());
    assert_eq!(r, Err(GuidanceError::NoTarget));
    assert_eq!(session.phase(VehicleId(3)), Phase::Unset);
    assert_eq!(session.controllers().count(), 0);
}

#[test]
fn suicide_burn_height_satisfies_the_descent_law() {
    for (speed, a_net, margin, touchdown) in [(200.0, 30.0, 0.9, 3.0), (450.0, 12.0, 0.8, 2.0), (60.0, 0.1, 0.5, 0.0)] {
        let h = suicide_burn_height(speed, a_net, margin, touchdown);
        assert!(h > 0.0);
        assert_relative_eq!(suicide_burn_descent_rate(h, a_net, margin, touchdown), -speed, epsilon = 1e-6);
    }
    assert_relative_eq!(suicide_burn_height(200.0, 30.0, 0.9, 3.0), 197.0 * 197.0 / 57.0, epsilon = 1e-9);
}

#[test]
fn prediction_is_repeatable() {
    let body = SphericalBody::earth();
    let aero = cache();
    let config = PredictorConfig::default();
    let vel = Vector3::new(-300.0, 200.0, 50.0);
    let start = VehicleState {
        time: 0.0,
        pos: Vector3::new(body.radius + 20_000.0, 0.0, 0.0),
        vel,
        att: -vel.normalize(),
        mass: 30_000.0,
        min_thrust: 0.0,
        max_thrust: 0.0,
        lowest_point: 0.0,
    };

    let predictor = Predictor::new(&body, aero.as_ref(), &config);
    let a = predictor.to_ground(&start, 0.0, None, config.max_time, false);
    let b = predictor.to_ground(&start, 0.0, None, config.max_time, false);

    assert!(!a.time_capped);
    assert_eq!(a.impact, b.impact);
    assert_eq!(a.time, b.time);
    assert_relative_eq!(body.altitude(&a.impact), 0.0, epsilon = 1e-3);
}

#[test]
fn full_descent_walks_the_phases_in_order() {
    let mut body = SphericalBody::earth().non_rotating();
    let target = Target::new(0.0, 0.0, 1.0);
    let start = target.resolve(&body) + Vector3::new(80_000.0, 0.0, 0.0);
    let mut booster = presets::returning_booster(start, Vector3::new(-500.0, 0.0, 0.0));
    let model = SlenderBodyModel::default();
    let config = ControllerConfig { reentry_burn_alt: 70_000.0, ..Default::default() };

    let id = VehicleId(1);
    let mut session = GuidanceSession::new();
    session.enable(id, config, target, &booster, &body, None, cache()).unwrap();
    assert_eq!(session.phase(id), Phase::BoostBack);

    let log = fly_descent(
        &mut session,
        id,
        &mut booster,
        &mut body,
        &model,
        &target,
        &SimConfig { dt: 0.2, max_time: 600.0 },
    )
    .unwrap();

    let mut visited: Vec<Phase> = Vec::new();
    for s in &log.steps {
        if visited.last() != Some(&s.phase) {
            visited.push(s.phase);
        }
    }
    assert!(visited.windows(2).all(|w| w[0] < w[1]), "{visited:?}");
    for phase in [Phase::Coasting, Phase::ReentryBurn, Phase::AeroDescent, Phase::LandingBurn] {
        assert!(visited.contains(&phase), "missing {phase} in {visited:?}");
    }

    // The re-entry burn starts on the first tick below the trigger altitude
    let first_burn = log.steps.iter().position(|s| s.phase == Phase::ReentryBurn).unwrap();
    let before = &log.steps[first_burn - 1];
    assert!(body.altitude(&before.pos) < 70_000.0);
    assert!(log.steps[..first_burn - 1].iter().all(|s| body.altitude(&s.pos) >= 70_000.0 - 200.0));
    assert!(log.landed);
}
