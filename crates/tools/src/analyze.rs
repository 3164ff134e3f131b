//! Signal analysis: spectrum peak and tone balance of a recording

use anyhow::Result;
use cosbit_core::buffer::AudioBuffer;
use cosbit_core::fft::{FftConfig, FftProcessor};
use cosbit_modem::afsk::AfskConfig;
use serde::Serialize;

/// Bandwidth either side of a tone counted as that tone, in Hz
const TONE_HALF_WIDTH: f64 = 150.0;

/// Signal analyzer
pub struct SignalAnalyzer {
    afsk: AfskConfig,
    fft_processor: FftProcessor,
}

/// Analysis results
#[derive(Debug, Clone, Default, Serialize)]
pub struct AnalysisResult {
    pub sample_count: usize,
    pub duration_secs: f64,
    pub peak_amplitude: f32,
    pub power_db: f64,
    /// Strongest spectral component
    pub peak_frequency: f64,
    pub mark_power: f64,
    pub space_power: f64,
    /// Mark power over space power in dB, `None` if either is zero
    pub tone_balance_db: Option<f64>,
}

impl SignalAnalyzer {
    /// Create a new signal analyzer
    pub fn new(fft_size: usize, sample_rate: f64, afsk: AfskConfig) -> Result<Self> {
        let fft_config = FftConfig::new(fft_size, sample_rate)?;
        let fft_processor = FftProcessor::new(fft_config)?;

        Ok(Self {
            afsk,
            fft_processor,
        })
    }

    /// Analyze signal samples
    pub fn analyze(&mut self, audio: &AudioBuffer) -> Result<AnalysisResult> {
        let spectrum = self.fft_processor.spectrum(audio.data())?;
        let mark_power = spectrum.band_power(self.afsk.mark_frequency, TONE_HALF_WIDTH);
        let space_power = spectrum.band_power(self.afsk.space_frequency, TONE_HALF_WIDTH);

        let tone_balance_db = if mark_power > 0.0 && space_power > 0.0 {
            Some(10.0 * (mark_power / space_power).log10())
        } else {
            None
        };

        Ok(AnalysisResult {
            sample_count: audio.len(),
            duration_secs: audio.duration().as_secs_f64(),
            peak_amplitude: audio.peak(),
            power_db: 10.0 * audio.mean_power().max(1e-12).log10(),
            peak_frequency: spectrum.peak_frequency(),
            mark_power,
            space_power,
            tone_balance_db,
        })
    }
}
