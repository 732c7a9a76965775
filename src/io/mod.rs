pub mod csv;
pub mod json;

pub use csv::{write_trajectory, CsvTelemetry, MemoryTelemetry, TelemetrySink, TickRecord};
pub use json::{write_summary, write_summary_file, LandingSummary};
