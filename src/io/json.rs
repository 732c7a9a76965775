use std::io::{self, Write};

use serde::{Deserialize, Serialize};

use crate::gnc::Phase;
use crate::sim::runner::FlightLog;

/// Outcome of a closed-loop descent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LandingSummary {
    pub vehicle: String,
    pub landed: bool,
    pub touchdown_speed: f64,
    pub touchdown_vertical_speed: f64,
    pub miss_distance: f64,
    pub flight_time: f64,
    pub phases: Vec<Phase>,
    pub propellant_used: f64,
    pub max_compute_ms: f64,
}

impl LandingSummary {
    pub fn from_log(vehicle: &str, log: &FlightLog) -> Self {
        let mut phases: Vec<Phase> = Vec::new();
        for p in log.steps.iter().map(|s| s.phase) {
            if phases.last() != Some(&p) {
                phases.push(p);
            }
        }
        let max_compute_ms = log.steps.iter().map(|s| s.compute_ms).fold(0.0_f64, f64::max);

        LandingSummary {
            vehicle: vehicle.to_string(),
            landed: log.landed,
            touchdown_speed: log.final_airspeed,
            touchdown_vertical_speed: log.final_vertical_speed,
            miss_distance: log.miss_distance,
            flight_time: log.flight_time,
            phases,
            propellant_used: log.propellant_used,
            max_compute_ms,
        }
    }
}

/// Write the summary as pretty JSON.
pub fn write_summary<W: Write>(writer: &mut W, summary: &LandingSummary) -> io::Result<()> {
    serde_json::to_writer_pretty(&mut *writer, summary).map_err(io::Error::other)?;
    writeln!(writer)
}

pub fn write_summary_file(path: &str, summary: &LandingSummary) -> io::Result<()> {
    let mut file = std::fs::File::create(path)?;
    write_summary(&mut file, summary)
}
