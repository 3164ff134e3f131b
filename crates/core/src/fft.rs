//! FFT wrapper for spectrum diagnostics

use crate::{CoreError, Result};
use rustfft::{num_complex::Complex64, FftPlanner};
use std::sync::Arc;

/// FFT configuration
#[derive(Debug, Clone)]
pub struct FftConfig {
    pub size: usize,
    pub sample_rate: f64,
}

impl FftConfig {
    pub fn new(size: usize, sample_rate: f64) -> Result<Self> {
        if size < 2 || !size.is_power_of_two() {
            return Err(CoreError::FftError {
                msg: format!("FFT size must be a power of 2, got {}", size),
            });
        }

        if !(sample_rate.is_finite() && sample_rate > 0.0) {
            return Err(CoreError::InvalidSampleRate { rate: sample_rate });
        }

        Ok(Self { size, sample_rate })
    }

    /// Get frequency resolution (Hz per bin)
    pub fn frequency_resolution(&self) -> f64 {
        self.sample_rate / self.size as f64
    }

    /// Convert bin index to frequency in Hz
    pub fn bin_to_frequency(&self, bin: usize) -> f64 {
        bin as f64 * self.frequency_resolution()
    }

    /// Convert frequency in Hz to bin index
    pub fn frequency_to_bin(&self, frequency: f64) -> usize {
        (frequency / self.frequency_resolution()).round() as usize
    }
}

/// Averaged one-sided power spectrum of a real signal
#[derive(Debug, Clone)]
pub struct Spectrum {
    config: FftConfig,
    power: Vec<f64>,
}

impl Spectrum {
    pub fn bins(&self) -> &[f64] {
        &self.power
    }

    /// Frequency of the strongest bin, ignoring DC
    pub fn peak_frequency(&self) -> f64 {
        let peak = self
            .power
            .iter()
            .enumerate()
            .skip(1)
            .fold((0usize, f64::MIN), |best, (i, &p)| if p > best.1 { (i, p) } else { best });
        self.config.bin_to_frequency(peak.0)
    }

    /// Total power in the bins covering `center ± half_width` Hz
    pub fn band_power(&self, center: f64, half_width: f64) -> f64 {
        let lo = self.config.frequency_to_bin((center - half_width).max(0.0));
        let hi = self
            .config
            .frequency_to_bin(center + half_width)
            .min(self.power.len().saturating_sub(1));
        if lo > hi {
            return 0.0;
        }
        self.power[lo..=hi].iter().sum()
    }
}

/// FFT processor for signal analysis
pub struct FftProcessor {
    config: FftConfig,
    fft: Arc<dyn rustfft::Fft<f64>>,
    scratch: Vec<Complex64>,
}

impl FftProcessor {
    /// Create a new FFT processor
    pub fn new(config: FftConfig) -> Result<Self> {
        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(config.size);
        let scratch = vec![Complex64::new(0.0, 0.0); config.size];

        Ok(Self {
            config,
            fft,
            scratch,
        })
    }

    /// Welch-style power spectrum of PCM audio: Hann-windowed frames with
    /// 50% overlap, averaged. A signal shorter than one frame is zero padded.
    pub fn spectrum(&mut self, samples: &[f32]) -> Result<Spectrum> {
        let size = self.config.size;
        let hop = size / 2;
        let window = window::hann(size);
        let mut power = vec![0.0; size / 2 + 1];
        let mut frames = 0usize;

        let mut start = 0;
        loop {
            for (i, dst) in self.scratch.iter_mut().enumerate() {
                let s = samples.get(start + i).copied().unwrap_or(0.0) as f64;
                *dst = Complex64::new(s * window[i], 0.0);
            }
            self.fft.process(&mut self.scratch);
            for (i, p) in power.iter_mut().enumerate() {
                let mut bin = self.scratch[i].norm_sqr();
                // One-sided: double everything except DC and Nyquist
                if i > 0 && i < size / 2 {
                    bin *= 2.0;
                }
                *p += bin;
            }
            frames += 1;
            start += hop;
            if start + size > samples.len() {
                break;
            }
        }

        for p in power.iter_mut() {
            *p /= frames as f64;
        }

        Ok(Spectrum {
            config: self.config.clone(),
            power,
        })
    }
}

/// Windowing functions for FFT processing
pub mod window {
    /// Hann window coefficients
    pub fn hann(n: usize) -> Vec<f64> {
        if n < 2 {
            return vec![1.0; n];
        }
        (0..n)
            .map(|i| 0.5 * (1.0 - (2.0 * std::f64::consts::PI * i as f64 / (n - 1) as f64).cos()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tone(freq: f64, sample_rate: f64, len: usize) -> Vec<f32> {
        (0..len)
            .map(|i| (2.0 * std::f64::consts::PI * freq * i as f64 / sample_rate).sin() as f32)
            .collect()
    }

    #[test]
    fn test_fft_config_creation() {
        let config = FftConfig::new(1024, 48000.0).unwrap();
        assert_eq!(config.size, 1024);
        assert_eq!(config.sample_rate, 48000.0);
        assert!((config.frequency_resolution() - 46.875).abs() < 1e-10);
    }

    #[test]
    fn test_fft_config_invalid_size() {
        assert!(FftConfig::new(1000, 48000.0).is_err());
        assert!(FftConfig::new(1024, 0.0).is_err());
    }

    #[test]
    fn test_peak_frequency_of_tone() {
        let config = FftConfig::new(4096, 48000.0).unwrap();
        let mut processor = FftProcessor::new(config).unwrap();
        let spectrum = processor.spectrum(&tone(2000.0, 48000.0, 48000)).unwrap();
        assert!((spectrum.peak_frequency() - 2000.0).abs() < 12.0);
    }

    #[test]
    fn test_band_power_separates_tones() {
        let config = FftConfig::new(2048, 44100.0).unwrap();
        let mut processor = FftProcessor::new(config).unwrap();
        let spectrum = processor.spectrum(&tone(1200.0, 44100.0, 22050)).unwrap();
        let space = spectrum.band_power(1200.0, 100.0);
        let mark = spectrum.band_power(2000.0, 100.0);
        assert!(space > 100.0 * mark);
    }
}
