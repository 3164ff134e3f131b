//! Loopback through the channel simulator

use anyhow::{Context, Result};
use cosbit_core::channel::{Channel, Impairment};
use cosbit_core::protocol::{BAUD, PREAMBLE_BITS, SYNC_BITS};
use cosbit_link::tx::{Transmitter, CHIRP_SECONDS};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::StationConfig;
use crate::rx::{receive_samples, ReceiveReport, DEFAULT_BLOCK_SIZE};

/// One simulated transmission
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationConfig {
    pub text: String,
    pub sample_rate: f64,
    /// AWGN level against the tone power; `None` for a clean channel
    pub snr_db: Option<f64>,
    /// Payload bytes overwritten by a noise burst
    pub burst_bytes: usize,
    /// First payload byte hit by the burst
    pub burst_offset: usize,
    pub seed: u64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            text: "CQ CQ DE TEST".to_string(),
            sample_rate: 48000.0,
            snr_db: None,
            burst_bytes: 0,
            burst_offset: 20,
            seed: 1,
        }
    }
}

/// Transmit, impair and receive one message
pub fn simulate(station: &StationConfig, sim: &SimulationConfig) -> Result<ReceiveReport> {
    let tx = Transmitter::new(sim.sample_rate, station.modem.clone(), station.transmit.clone())?;
    let mut audio = tx.transmit_text(&sim.text)?;

    let mut channel = Channel::new(sim.seed);
    if sim.burst_bytes > 0 {
        let (start, len) = payload_span(station, sim);
        channel = channel.with(Impairment::NoiseBurst {
            start,
            len,
            amplitude: 2.0 * station.modem.amplitude,
        })?;
    }
    if let Some(snr_db) = sim.snr_db {
        channel = channel.with(Impairment::awgn_for_amplitude(snr_db, station.modem.amplitude))?;
    }
    channel
        .apply(audio.data_mut())
        .context("Failed to apply channel impairments")?;

    info!(
        snr_db = ?sim.snr_db,
        burst_bytes = sim.burst_bytes,
        seed = sim.seed,
        "simulated channel applied"
    );
    receive_samples(&audio, station, DEFAULT_BLOCK_SIZE)
}

/// Sample range covering the burst bytes of the transmitted payload
fn payload_span(station: &StationConfig, sim: &SimulationConfig) -> (usize, usize) {
    let rate = sim.sample_rate;
    let sps = rate / BAUD;
    let mut lead = (rate * station.transmit.lead_silence_ms as f64 / 1000.0) as usize;
    if station.transmit.chirp {
        lead += (rate * CHIRP_SECONDS) as usize;
    }
    let first = PREAMBLE_BITS + SYNC_BITS + 8 * sim.burst_offset;
    let start = lead + (first as f64 * sps).round() as usize;
    let len = (8.0 * sim.burst_bytes as f64 * sps).round() as usize;
    (start, len)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_loopback() {
        let report = simulate(&StationConfig::default(), &SimulationConfig::default()).unwrap();
        assert_eq!(report.delivered().collect::<Vec<_>>(), vec!["CQ CQ DE TEST"]);
    }

    #[test]
    fn test_burst_within_correction() {
        let sim = SimulationConfig {
            burst_bytes: 4,
            ..SimulationConfig::default()
        };
        let report = simulate(&StationConfig::default(), &sim).unwrap();
        assert_eq!(report.delivered().count(), 1);
        assert!(report.stats.corrected_bytes >= 1);
    }

    #[test]
    fn test_burst_span_lands_in_payload() {
        let station = StationConfig::default();
        let sim = SimulationConfig {
            burst_bytes: 2,
            burst_offset: 0,
            ..SimulationConfig::default()
        };
        // 4800 chirp + 960 silence + 96 symbols of 80 samples
        assert_eq!(payload_span(&station, &sim), (4800 + 960 + 7680, 1280));
    }
}
