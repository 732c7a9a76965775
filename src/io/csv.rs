use std::io::{self, Write};

use nalgebra::Vector3;

use crate::dynamics::state::TrajectorySample;
use crate::gnc::Phase;

/// One live guidance tick, as logged.
#[derive(Debug, Clone)]
pub struct TickRecord {
    pub time: f64,
    pub phase: Phase,
    pub pos: Vector3<f64>,
    pub vel: Vector3<f64>,
    pub accel: Vector3<f64>,
    pub attitude_error_deg: f64,
    pub min_thrust: f64,
    pub max_thrust: f64,
    pub steer_gain: f64,
    pub target_error: f64,
    pub mass: f64,
    pub aoa_deg: Option<f64>,
    /// Lift at the calibration probe angle.
    pub probe_lift: Option<f64>,
}

/// Where the controller sends its tick log and trajectory dumps.
pub trait TelemetrySink {
    fn tick(&mut self, record: &TickRecord) -> io::Result<()>;
    fn trajectory(&mut self, label: &str, samples: &[TrajectorySample]) -> io::Result<()>;
}

const TICK_HEADER: &str = "time,phase,x,y,z,vx,vy,vz,ax,ay,az,att_err_deg,\
                           min_thrust,max_thrust,steer_gain,target_error,mass,aoa_deg,probe_lift";

/// Comma-delimited tick rows, trajectory dumps as `#`-headed blocks.
pub struct CsvTelemetry<W: Write> {
    writer: W,
    header_written: bool,
}

impl<W: Write> CsvTelemetry<W> {
    pub fn new(writer: W) -> Self {
        Self { writer, header_written: false }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl CsvTelemetry<io::BufWriter<std::fs::File>> {
    pub fn create(path: &str) -> io::Result<Self> {
        Ok(Self::new(io::BufWriter::new(std::fs::File::create(path)?)))
    }
}

fn opt(v: Option<f64>) -> String {
    v.map(|x| format!("{x:.3}")).unwrap_or_default()
}

impl<W: Write> TelemetrySink for CsvTelemetry<W> {
    fn tick(&mut self, r: &TickRecord) -> io::Result<()> {
        if !self.header_written {
            writeln!(self.writer, "{TICK_HEADER}")?;
            self.header_written = true;
        }
        writeln!(
            self.writer,
            "{:.3},{:?},{:.2},{:.2},{:.2},{:.3},{:.3},{:.3},{:.3},{:.3},{:.3},{:.2},\
             {:.1},{:.1},{},{:.1},{:.1},{},{}",
            r.time,
            r.phase,
            r.pos.x, r.pos.y, r.pos.z,
            r.vel.x, r.vel.y, r.vel.z,
            r.accel.x, r.accel.y, r.accel.z,
            r.attitude_error_deg,
            r.min_thrust,
            r.max_thrust,
            r.steer_gain,
            r.target_error,
            r.mass,
            opt(r.aoa_deg),
            opt(r.probe_lift),
        )?;
        self.writer.flush()
    }

    fn trajectory(&mut self, label: &str, samples: &[TrajectorySample]) -> io::Result<()> {
        write_trajectory(&mut self.writer, label, samples)?;
        self.writer.flush()
    }
}

/// Write a predicted trajectory as a `#`-headed block.
///
/// Columns: time, x, y, z, vx, vy, vz, ax, ay, az, airspeed, mass, throttle
pub fn write_trajectory<W: Write>(writer: &mut W, label: &str, samples: &[TrajectorySample]) -> io::Result<()> {
    writeln!(writer, "# trajectory {label} ({} samples)", samples.len())?;
    writeln!(writer, "# time,x,y,z,vx,vy,vz,ax,ay,az,airspeed,mass,throttle")?;
    for s in samples {
        writeln!(
            writer,
            "{:.2},{:.2},{:.2},{:.2},{:.3},{:.3},{:.3},{:.3},{:.3},{:.3},{:.2},{:.1},{:.4}",
            s.time,
            s.pos.x, s.pos.y, s.pos.z,
            s.vel.x, s.vel.y, s.vel.z,
            s.accel.x, s.accel.y, s.accel.z,
            s.airspeed,
            s.mass,
            s.throttle,
        )?;
    }
    Ok(())
}

/// Collects everything in memory; handy for tests and post-flight analysis.
#[derive(Debug, Default)]
pub struct MemoryTelemetry {
    pub ticks: Vec<TickRecord>,
    pub trajectories: Vec<(String, Vec<TrajectorySample>)>,
}

impl TelemetrySink for MemoryTelemetry {
    fn tick(&mut self, record: &TickRecord) -> io::Result<()> {
        self.ticks.push(record.clone());
        Ok(())
    }

    fn trajectory(&mut self, label: &str, samples: &[TrajectorySample]) -> io::Result<()> {
        self.trajectories.push((label.to_string(), samples.to_vec()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(time: f64) -> TickRecord {
        TickRecord {
            time,
            phase: Phase::AeroDescent,
            pos: Vector3::new(1.0, 2.0, 3.0),
            vel: Vector3::zeros(),
            accel: Vector3::zeros(),
            attitude_error_deg: 1.5,
            min_thrust: 3e5,
            max_thrust: 9e5,
            steer_gain: 1.0,
            target_error: 42.0,
            mass: 30_000.0,
            aoa_deg: None,
            probe_lift: Some(1_234.5),
        }
    }

    #[test]
    fn csv_output_has_header_and_rows() {
        let mut sink = CsvTelemetry::new(Vec::new());
        sink.tick(&record(0.0)).unwrap();
        sink.tick(&record(0.1)).unwrap();
        let output = String::from_utf8(sink.into_inner()).unwrap();
        let lines: Vec<&str> = output.lines().collect();

        assert!(lines[0].starts_with("time,phase,"));
        assert_eq!(lines.len(), 3); // header + 2 data rows
        assert!(lines[1].starts_with("0.000,AeroDescent,"));
        let cols: Vec<&str> = lines[1].split(',').collect();
        assert_eq!(cols.len(), TICK_HEADER.split(',').count());
        assert_eq!(cols[17], "");
        assert_eq!(cols[18], "1234.500");
    }

    #[test]
    fn trajectory_block_is_commented_header_plus_rows() {
        let samples = vec![
            TrajectorySample {
                time: 0.0,
                pos: Vector3::zeros(),
                vel: Vector3::zeros(),
                accel: Vector3::zeros(),
                airspeed: 0.0,
                mass: 1.0,
                throttle: 0.0,
            };
            3
        ];
        let mut buf = Vec::new();
        write_trajectory(&mut buf, "LandingBurn", &samples).unwrap();
        let output = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines.len(), 5);
        assert!(lines[0].starts_with("# trajectory LandingBurn"));
        assert!(!lines[2].starts_with('#'));
    }
}
