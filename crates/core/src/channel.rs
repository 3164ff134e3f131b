//! Simulated radio channel for exercising the receive path
//!
//! Impairments are applied in the order they were added. All randomness
//! comes from a seeded generator so a given seed always produces the same
//! waveform.

use crate::{CoreError, Result};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};

/// A single channel impairment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Impairment {
    /// Additive white Gaussian noise over the whole band.
    ///
    /// `snr_db` is measured against `reference_power`, normally the power
    /// of the modulated tone (`amplitude² / 2`).
    Awgn { snr_db: f64, reference_power: f64 },
    /// Replace `len` samples from `start` with uniform noise in `±amplitude`
    NoiseBurst { start: usize, len: usize, amplitude: f32 },
    /// Silence `len` samples from `start`
    Dropout { start: usize, len: usize },
}

impl Impairment {
    /// AWGN at `snr_db` relative to a sine of peak `amplitude`
    pub fn awgn_for_amplitude(snr_db: f64, amplitude: f32) -> Self {
        let a = amplitude as f64;
        Impairment::Awgn {
            snr_db,
            reference_power: a * a / 2.0,
        }
    }

    fn validate(&self) -> Result<()> {
        match self {
            Impairment::Awgn { snr_db, reference_power } => {
                if !snr_db.is_finite() || !(reference_power.is_finite() && *reference_power > 0.0) {
                    return Err(CoreError::InvalidChannel {
                        msg: format!(
                            "AWGN needs finite SNR and positive reference power, got {} dB / {}",
                            snr_db, reference_power
                        ),
                    });
                }
            }
            Impairment::NoiseBurst { amplitude, .. } => {
                if !(amplitude.is_finite() && *amplitude >= 0.0) {
                    return Err(CoreError::InvalidChannel {
                        msg: format!("noise burst amplitude must be non-negative, got {}", amplitude),
                    });
                }
            }
            Impairment::Dropout { .. } => {}
        }
        Ok(())
    }
}

/// Seeded channel simulator
pub struct Channel {
    rng: StdRng,
    impairments: Vec<Impairment>,
}

impl Channel {
    /// Create a clean channel with a fixed seed
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            impairments: Vec::new(),
        }
    }

    /// Add an impairment
    pub fn with(mut self, impairment: Impairment) -> Result<Self> {
        impairment.validate()?;
        self.impairments.push(impairment);
        Ok(self)
    }

    /// Apply every impairment in place
    pub fn apply(&mut self, samples: &mut [f32]) -> Result<()> {
        for impairment in &self.impairments {
            match *impairment {
                Impairment::Awgn { snr_db, reference_power } => {
                    let sigma = (reference_power / 10f64.powf(snr_db / 10.0)).sqrt();
                    let normal = Normal::new(0.0, sigma).map_err(|e| CoreError::InvalidChannel {
                        msg: e.to_string(),
                    })?;
                    for s in samples.iter_mut() {
                        *s += normal.sample(&mut self.rng) as f32;
                    }
                }
                Impairment::NoiseBurst { start, len, amplitude } => {
                    for s in window(samples, start, len) {
                        *s = if amplitude > 0.0 {
                            self.rng.gen_range(-amplitude..amplitude)
                        } else {
                            0.0
                        };
                    }
                }
                Impairment::Dropout { start, len } => {
                    window(samples, start, len).fill(0.0);
                }
            }
        }
        Ok(())
    }
}

fn window(samples: &mut [f32], start: usize, len: usize) -> &mut [f32] {
    let start = start.min(samples.len());
    let end = start.saturating_add(len).min(samples.len());
    &mut samples[start..end]
}
