//! CosBit Tools library
//!
//! Shared pieces behind the `cosbit` command: WAV I/O, station
//! configuration, file reception, channel simulation and signal analysis.

pub mod analyze;
pub mod common;
pub mod config;
pub mod rx;
pub mod simulate;

pub use analyze::{AnalysisResult, SignalAnalyzer};
pub use config::StationConfig;
pub use rx::{receive_samples, ReceiveReport, ReportEntry};
pub use simulate::{simulate, SimulationConfig};
