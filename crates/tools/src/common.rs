//! Common utilities for the tools

use anyhow::{bail, Context, Result};
use cosbit_core::buffer::AudioBuffer;
use std::path::Path;
use tracing::info;

/// Install the tracing subscriber
pub fn init_logging(verbose: bool, debug: bool) {
    let log_level = if debug {
        tracing::Level::DEBUG
    } else if verbose {
        tracing::Level::INFO
    } else {
        tracing::Level::WARN
    };

    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_target(false)
        .init();
}

/// Write mono audio as 16-bit PCM WAV
pub fn write_wav_file(audio: &AudioBuffer, path: &Path) -> Result<()> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: audio.sample_rate().round() as u32,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut writer = hound::WavWriter::create(path, spec)
        .with_context(|| format!("Failed to create WAV file: {:?}", path))?;

    for &sample in audio.data() {
        let amplitude = (sample * 32767.0).clamp(-32767.0, 32767.0) as i16;
        writer.write_sample(amplitude)?;
    }

    writer.finalize()?;
    info!("Wrote {} samples to {:?}", audio.len(), path);
    Ok(())
}

/// Read a WAV file as mono audio. Only the first channel of a
/// multi-channel file is kept.
pub fn read_wav_file(path: &Path) -> Result<AudioBuffer> {
    let mut reader = hound::WavReader::open(path)
        .with_context(|| format!("Failed to open WAV file: {:?}", path))?;
    let spec = reader.spec();
    let channels = spec.channels.max(1) as usize;

    let interleaved: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Int => {
            if spec.bits_per_sample == 0 || spec.bits_per_sample > 32 {
                bail!("Unsupported WAV sample width: {} bits", spec.bits_per_sample);
            }
            let scale = (1u64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 / scale))
                .collect::<Result<_, _>>()
                .context("Failed to read audio samples")?
        }
        hound::SampleFormat::Float => reader
            .samples::<f32>()
            .collect::<Result<_, _>>()
            .context("Failed to read audio samples")?,
    };

    let samples: Vec<f32> = interleaved.into_iter().step_by(channels).collect();
    info!("Read {} samples from {:?}", samples.len(), path);
    Ok(AudioBuffer::from_data(samples, spec.sample_rate as f64)?)
}
