//! Closed-loop descent demo: a returning booster flown down to a pad by the
//! guidance session against the simulated truth model.
//!
//! Usage:
//!   cargo run --release -- --altitude 60000 --speed 1000 --downrange 2000
//!   RUST_LOG=booster_guidance=debug cargo run --release -- --tick-log ticks.csv

use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use booster_guidance::gnc::{ControllerConfig, Phase, Target};
use booster_guidance::io::{write_summary_file, CsvTelemetry, LandingSummary};
use booster_guidance::physics::{
    AeroForceCache, AeroModelKind, BallisticModel, CentralBodyProvider, SlenderBodyModel, SphericalBody,
};
use booster_guidance::sim::{fly_descent, FlightLog, SimConfig};
use booster_guidance::vehicle::{presets, EngineId, LandingBurnEngines, SimBooster, VehicleStateProvider};
use booster_guidance::{GuidanceError, GuidanceSession, VehicleId};

#[derive(Parser)]
#[command(name = "booster-guidance")]
#[command(about = "Fly a returning booster down to a landing pad with predictive guidance")]
struct Args {
    /// JSON controller configuration; missing keys take their defaults
    #[arg(long)]
    config: Option<String>,
    /// Pad latitude (deg)
    #[arg(long, default_value_t = 28.5)]
    latitude: f64,
    /// Pad longitude (deg)
    #[arg(long, default_value_t = -80.6)]
    longitude: f64,
    /// Pad altitude (m)
    #[arg(long, default_value_t = 2.0)]
    pad_altitude: f64,
    /// Starting altitude (m)
    #[arg(long, default_value_t = 60_000.0)]
    altitude: f64,
    /// Starting airspeed (m/s)
    #[arg(long, default_value_t = 1_000.0)]
    speed: f64,
    /// Starting flight-path angle below the horizon (deg)
    #[arg(long, default_value_t = 60.0)]
    dive: f64,
    /// Horizontal distance west of the pad at the start (m)
    #[arg(long, default_value_t = 2_000.0)]
    downrange: f64,
    /// Land on the centre engine only
    #[arg(long)]
    centre_engine: bool,
    /// Drag-only aerodynamics instead of the slender-body model
    #[arg(long)]
    ballistic: bool,
    /// Host step (s)
    #[arg(long, default_value_t = 0.1)]
    dt: f64,
    #[arg(long, default_value_t = 900.0)]
    max_time: f64,
    /// Write per-tick CSV telemetry and trajectory dumps here
    #[arg(long)]
    tick_log: Option<String>,
    /// Write a JSON landing summary here
    #[arg(long)]
    summary: Option<String>,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    match run(&args) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(2),
        Err(e) => {
            error!(error = %e, "descent aborted");
            ExitCode::FAILURE
        }
    }
}

fn load_config(args: &Args) -> Result<ControllerConfig, GuidanceError> {
    let mut config = match &args.config {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .map_err(|e| GuidanceError::InvalidConfig(format!("{path}: {e}")))?;
            ControllerConfig::from_json(&text)?
        }
        None => ControllerConfig::default(),
    };
    if args.centre_engine {
        config.landing_burn_engines = LandingBurnEngines::Subset(vec![EngineId(1)]);
    }
    Ok(config)
}

fn run(args: &Args) -> Result<bool, GuidanceError> {
    let config = load_config(args)?;
    let mut body = SphericalBody::earth();
    let target = Target::new(args.latitude, args.longitude, args.pad_altitude);
    target.validate()?;

    // -----------------------------------------------------------------------
    // Initial state: west of the pad, diving east
    // -----------------------------------------------------------------------
    let pad = target.resolve(&body);
    let up = body.up(&pad);
    let north = body.north(&pad);
    let east = north.cross(&up);
    let start = pad + up * (args.altitude - args.pad_altitude) - east * args.downrange;
    let dive = args.dive.to_radians();
    let air = (east * dive.cos() - up * dive.sin()) * args.speed;
    let vel = air + body.surface_velocity(&start);
    let mut booster = presets::returning_booster(start, vel);

    let kind = if args.ballistic {
        AeroModelKind::Ballistic(BallisticModel::default())
    } else {
        AeroModelKind::SlenderBody(SlenderBodyModel::default())
    };
    let model = kind.build();
    let cache = Arc::new(AeroForceCache::new(&config.aero_cache, kind.build()));

    let id = VehicleId(1);
    let mut session = GuidanceSession::new();
    session.enable(id, config, target, &booster, &body, None, cache)?;
    if let Some(path) = &args.tick_log {
        let sink = CsvTelemetry::create(path)
            .map_err(|e| GuidanceError::InvalidConfig(format!("{path}: {e}")))?;
        if let Some(c) = session.controller_mut(id) {
            c.set_telemetry(Box::new(sink));
        }
    }

    print_header(&booster, &target, args);
    let sim = SimConfig { dt: args.dt, max_time: args.max_time };
    let start_alt = body.altitude(&booster.pos);
    let log = fly_descent(&mut session, id, &mut booster, &mut body, model.as_ref(), &target, &sim)?;
    print_report(&log, start_alt, &booster);

    if let Some(path) = &args.summary {
        let summary = LandingSummary::from_log(booster.name(), &log);
        match write_summary_file(path, &summary) {
            Ok(()) => info!(path = %path, "summary written"),
            Err(e) => error!(path = %path, error = %e, "could not write summary"),
        }
    }
    Ok(log.landed)
}

// ---------------------------------------------------------------------------
// Report
// ---------------------------------------------------------------------------

fn print_header(booster: &SimBooster, target: &Target, args: &Args) {
    let (min_thrust, max_thrust) = booster.thrust_bounds();
    println!();
    println!("====================================================================");
    println!("  BOOSTER DESCENT GUIDANCE — {}", booster.name);
    println!("====================================================================");
    println!();
    println!("  Vehicle");
    println!("  ──────────────────────────────────────────────────────────────────");
    println!(
        "  Dry mass:      {:>8.0} kg    Propellant:   {:>8.0} kg",
        booster.dry_mass, booster.propellant_mass
    );
    println!(
        "  Engines:       {:>8}       Thrust:  {:>6.0}–{:<6.0} kN",
        booster.engines.len(),
        min_thrust / 1_000.0,
        max_thrust / 1_000.0
    );
    println!(
        "  Slew rate:     {:>8.1} deg/s Lowest point: {:>8.1} m",
        booster.slew_rate.to_degrees(),
        booster.lowest_point
    );
    println!();
    println!("  Approach");
    println!("  ──────────────────────────────────────────────────────────────────");
    println!(
        "  Pad:           {:>8.3}°N {:>8.3}°E   alt {:.0} m",
        target.latitude, target.longitude, target.altitude
    );
    println!(
        "  Start:         {:>8.0} m alt  {:>7.0} m/s  dive {:.0}°  {:.0} m out",
        args.altitude, args.speed, args.dive, args.downrange
    );
    println!();
}

fn print_report(log: &FlightLog, start_alt: f64, booster: &SimBooster) {
    println!("  Phases");
    println!("  ──────────────────────────────────────────────────────────────────");
    let mut last: Option<Phase> = None;
    for s in &log.steps {
        if last != Some(s.phase) {
            println!("  {:<14} t={:>6.1}s   mass={:>8.0}kg", s.phase.label(), s.time, s.mass);
            last = Some(s.phase);
        }
    }
    println!();

    println!("  Trajectory");
    println!("  ──────────────────────────────────────────────────────────────────");
    println!(
        "  {:>7}  {:>9}  {:>9}  {:>8}  {:>9}  {:>13}",
        "t (s)", "r (km)", "vel (m/s)", "throttle", "mass(kg)", "phase"
    );
    println!("  {}", "─".repeat(64));
    let every = (log.steps.len() / 30).max(1);
    for (i, s) in log.steps.iter().enumerate() {
        if i % every != 0 && i + 1 != log.steps.len() {
            continue;
        }
        println!(
            "  {:>7.1}  {:>9.3}  {:>9.1}  {:>8.2}  {:>9.0}  {:>13}",
            s.time,
            s.pos.norm() / 1_000.0,
            s.vel.norm(),
            s.throttle,
            s.mass,
            s.phase.label()
        );
    }
    println!();

    let worst_ms = log.steps.iter().map(|s| s.compute_ms).fold(0.0_f64, f64::max);
    println!("  Outcome");
    println!("  ──────────────────────────────────────────────────────────────────");
    println!("  Landed:        {:>8}", if log.landed { "yes" } else { "NO" });
    println!(
        "  Touchdown:     {:>8.1} m/s  (vertical {:.1} m/s)",
        log.final_airspeed, log.final_vertical_speed
    );
    println!("  Miss:          {:>8.1} m", log.miss_distance);
    println!(
        "  Flight time:   {:>8.1} s     from {:.1} km",
        log.flight_time,
        start_alt / 1_000.0
    );
    println!(
        "  Propellant:    {:>8.0} kg used, {:.0} kg left",
        log.propellant_used, booster.propellant_mass
    );
    println!("  Worst tick:    {:>8.2} ms", worst_ms);
    println!("====================================================================");
    println!();
}
