//! Common modulation traits and utilities

use crate::{ModemError, Result};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Generic modulator trait
pub trait Modulator {
    /// Modulate bits, appending PCM samples to `output`
    fn modulate(&mut self, bits: &[bool], output: &mut Vec<f32>) -> Result<()>;

    /// Get samples per symbol (fractional)
    fn samples_per_symbol(&self) -> f64;

    /// Get symbol rate
    fn symbol_rate(&self) -> f64;

    /// Reset modulator state
    fn reset(&mut self);
}

/// Something the demodulator reports while consuming samples
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DemodEvent {
    /// One decided bit at the locked sampling instant
    Bit { value: bool, confidence: f32 },
    /// Symbol timing acquired; offset is the sampling phase in samples
    LockAcquired { timing_offset: f64 },
    /// Symbol timing lost
    LockLost,
}

/// Reply from a demodulator event sink
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    /// Drop lock and restart timing acquisition
    Resync,
}

/// Generic demodulator trait
///
/// All mutable receive state lives in `State`, owned by the caller and
/// passed into every call, so one demodulator can serve any number of
/// independent sessions.
pub trait Demodulator {
    type State;

    /// Fresh state for a new receive session
    fn new_state(&self) -> Self::State;

    /// Consume samples, delivering events to `sink` as they occur
    fn process(
        &self,
        state: &mut Self::State,
        samples: &[f32],
        sink: &mut dyn FnMut(DemodEvent) -> Flow,
    );

    /// Get signal quality metrics
    fn signal_quality(&self, state: &Self::State) -> SignalQuality;

    /// Reset demodulator state
    fn reset(&self, state: &mut Self::State);
}

/// Signal quality metrics
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SignalQuality {
    pub locked: bool,
    /// Smoothed tone purity at the sampling instants, 0..=1
    pub confidence: f32,
    pub timing_offset_samples: f64,
    /// Tone energy against everything else in the correlation window
    pub snr_db: f64,
}

/// Common modulation configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModulationConfig {
    pub sample_rate: f64,
    pub symbol_rate: f64,
}

impl ModulationConfig {
    /// Create a new modulation configuration
    pub fn new(sample_rate: f64, symbol_rate: f64) -> Result<Self> {
        if !(sample_rate.is_finite() && sample_rate > 0.0) {
            return Err(ModemError::InvalidParameters {
                msg: format!("Invalid sample rate: {}", sample_rate),
            });
        }

        if !(symbol_rate.is_finite() && symbol_rate > 0.0) || symbol_rate > sample_rate / 2.0 {
            return Err(ModemError::InvalidParameters {
                msg: format!("Invalid symbol rate: {}", symbol_rate),
            });
        }

        Ok(Self {
            sample_rate,
            symbol_rate,
        })
    }

    /// Get samples per symbol
    pub fn samples_per_symbol(&self) -> f64 {
        self.sample_rate / self.symbol_rate
    }
}

/// Linear chirp from `start_hz` to `end_hz`, cosine phase, `duration` seconds
pub fn linear_chirp(
    sample_rate: f64,
    start_hz: f64,
    end_hz: f64,
    duration: f64,
    amplitude: f32,
) -> Vec<f32> {
    let len = (sample_rate * duration) as usize;
    let sweep = (end_hz - start_hz) / duration;
    (0..len)
        .map(|i| {
            let t = i as f64 / sample_rate;
            let phase = 2.0 * PI * (start_hz * t + 0.5 * sweep * t * t);
            amplitude * phase.cos() as f32
        })
        .collect()
}
