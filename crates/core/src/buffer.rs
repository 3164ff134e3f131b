//! Sample buffer management and operations

use crate::{CoreError, Result};
use std::time::Duration;

/// Generic sample buffer tagged with its sample rate
#[derive(Debug, Clone, PartialEq)]
pub struct SampleBuffer<T> {
    data: Vec<T>,
    sample_rate: f64,
}

impl<T> SampleBuffer<T> {
    /// Create a buffer from existing data
    pub fn from_data(data: Vec<T>, sample_rate: f64) -> Result<Self> {
        validate_rate(sample_rate)?;
        Ok(Self { data, sample_rate })
    }

    /// Get the sample rate
    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    /// Get the number of samples
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Check if buffer is empty
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Real-time duration of the buffered samples
    pub fn duration(&self) -> Duration {
        Duration::from_secs_f64(self.data.len() as f64 / self.sample_rate)
    }

    /// Get a reference to the underlying data
    pub fn data(&self) -> &[T] {
        &self.data
    }

    /// Get a mutable reference to the underlying data
    pub fn data_mut(&mut self) -> &mut [T] {
        &mut self.data
    }

    /// Consume the buffer, returning the raw samples
    pub fn into_samples(self) -> Vec<T> {
        self.data
    }
}

impl SampleBuffer<f32> {
    /// Largest absolute sample value
    pub fn peak(&self) -> f32 {
        self.data.iter().fold(0.0f32, |acc, s| acc.max(s.abs()))
    }

    /// Mean power of the buffer
    pub fn mean_power(&self) -> f64 {
        mean_power(&self.data)
    }
}

fn validate_rate(sample_rate: f64) -> Result<()> {
    if !(sample_rate.is_finite() && sample_rate > 0.0) {
        return Err(CoreError::InvalidSampleRate { rate: sample_rate });
    }
    Ok(())
}

/// Mean power of a PCM slice, 0 for an empty slice
pub fn mean_power(samples: &[f32]) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }
    samples.iter().map(|&s| (s as f64) * (s as f64)).sum::<f64>() / samples.len() as f64
}

/// Mono PCM audio exchanged with the capture/playback collaborator
pub type AudioBuffer = SampleBuffer<f32>;
