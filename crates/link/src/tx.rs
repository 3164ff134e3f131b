//! Transmit pipeline
//!
//! RS-encode, interleave, frame, then modulate into a single audio burst:
//!
//! ```text
//! [chirp 100 ms][silence][preamble 80][sync 16][payload 512][postamble 20][silence]
//! ```

use crate::message::pad_text;
use crate::Result;
use cosbit_core::buffer::AudioBuffer;
use cosbit_core::protocol::DATA_BYTES;
use cosbit_frame::frame::{Frame, Packet};
use cosbit_modem::afsk::{AfskConfig, AfskModulator};
use cosbit_modem::common::{linear_chirp, Modulator};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Lead-in chirp sweep, start and end in Hz
pub const CHIRP_START_HZ: f64 = 800.0;
pub const CHIRP_END_HZ: f64 = 1500.0;
/// Lead-in chirp length in seconds
pub const CHIRP_SECONDS: f64 = 0.1;
/// Chirp level relative to the data tones
pub const CHIRP_LEVEL: f32 = 0.8;

/// Transmit options
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TxConfig {
    /// Prefix each burst with a rising chirp so operators hear it start
    pub chirp: bool,
    /// Silence between the chirp and the preamble
    pub lead_silence_ms: u32,
    /// Silence after the postamble
    pub tail_silence_ms: u32,
}

impl Default for TxConfig {
    fn default() -> Self {
        Self {
            chirp: true,
            lead_silence_ms: 20,
            tail_silence_ms: 40,
        }
    }
}

/// Turns 48-byte messages into audio bursts
pub struct Transmitter {
    sample_rate: f64,
    afsk: AfskConfig,
    config: TxConfig,
}

impl Transmitter {
    pub fn new(sample_rate: f64, afsk: AfskConfig, config: TxConfig) -> Result<Self> {
        afsk.validate(sample_rate)?;
        Ok(Self {
            sample_rate,
            afsk,
            config,
        })
    }

    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    /// Build the complete burst for one packet
    pub fn transmit(&self, data: &[u8; DATA_BYTES]) -> Result<AudioBuffer> {
        let packet = Packet::encode(data)?;
        let bits = Frame::new(packet).to_burst_bits();

        let mut audio = if self.config.chirp {
            linear_chirp(
                self.sample_rate,
                CHIRP_START_HZ,
                CHIRP_END_HZ,
                CHIRP_SECONDS,
                self.afsk.amplitude * CHIRP_LEVEL,
            )
        } else {
            Vec::new()
        };
        audio.resize(audio.len() + self.silence(self.config.lead_silence_ms), 0.0);

        // One burst, one continuous phase track
        let mut modulator = AfskModulator::new(self.sample_rate, self.afsk.clone())?;
        modulator.modulate(&bits, &mut audio)?;

        audio.resize(audio.len() + self.silence(self.config.tail_silence_ms), 0.0);

        let buffer = AudioBuffer::from_data(audio, self.sample_rate)?;
        info!(
            bits = bits.len(),
            samples = buffer.len(),
            seconds = buffer.duration().as_secs_f64(),
            "burst ready"
        );
        Ok(buffer)
    }

    /// Pad and transmit a text message
    pub fn transmit_text(&self, text: &str) -> Result<AudioBuffer> {
        self.transmit(&pad_text(text)?)
    }

    fn silence(&self, ms: u32) -> usize {
        (self.sample_rate * ms as f64 / 1000.0) as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::LinkError;
    use cosbit_core::protocol::{PACKET_BITS, POSTAMBLE_BITS, PREAMBLE_BITS, SYNC_BITS};

    fn burst_samples(sample_rate: f64) -> usize {
        let symbols = PREAMBLE_BITS + SYNC_BITS + PACKET_BITS + POSTAMBLE_BITS;
        (symbols as f64 * sample_rate / 600.0).round() as usize
    }

    #[test]
    fn test_burst_length_with_chirp() {
        let tx = Transmitter::new(48000.0, AfskConfig::default(), TxConfig::default()).unwrap();
        let audio = tx.transmit_text("CQ CQ DE TEST").unwrap();
        // 4800 chirp + 960 lead + symbols + 1920 tail
        assert_eq!(audio.len(), 4800 + 960 + burst_samples(48000.0) + 1920);
        assert_eq!(audio.sample_rate(), 48000.0);
    }

    #[test]
    fn test_burst_without_chirp() {
        let config = TxConfig {
            chirp: false,
            ..TxConfig::default()
        };
        let tx = Transmitter::new(44100.0, AfskConfig::default(), config).unwrap();
        let audio = tx.transmit(&[0x55; DATA_BYTES]).unwrap();
        assert_eq!(audio.len(), 882 + burst_samples(44100.0) + 1764);
        assert!(audio.data()[..882].iter().all(|&s| s == 0.0));
        assert!(audio.data()[audio.len() - 1764..].iter().all(|&s| s == 0.0));
    }

    #[test]
    fn test_amplitude_respected() {
        let afsk = AfskConfig {
            amplitude: 0.25,
            ..AfskConfig::default()
        };
        let tx = Transmitter::new(48000.0, afsk, TxConfig::default()).unwrap();
        let audio = tx.transmit_text("hello").unwrap();
        assert!(audio.peak() <= 0.25 + 1e-6);
        assert!(audio.peak() > 0.24);
        // Chirp runs at 80% of the tone level
        assert!(audio.data()[..4800].iter().all(|s| s.abs() <= 0.2 + 1e-6));
    }

    #[test]
    fn test_message_too_long() {
        let tx = Transmitter::new(48000.0, AfskConfig::default(), TxConfig::default()).unwrap();
        let long = "x".repeat(DATA_BYTES + 1);
        assert!(matches!(
            tx.transmit_text(&long),
            Err(LinkError::MessageTooLong { .. })
        ));
    }

    #[test]
    fn test_invalid_sample_rate() {
        assert!(Transmitter::new(2000.0, AfskConfig::default(), TxConfig::default()).is_err());
    }
}
