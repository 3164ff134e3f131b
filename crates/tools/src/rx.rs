//! Stream a recording through a receive session

use anyhow::Result;
use cosbit_core::buffer::AudioBuffer;
use cosbit_link::rx::{Overrun, ReceiveSession, RxEvent, RxStats};
use serde::Serialize;
use tracing::debug;

use crate::config::StationConfig;

/// Default block size, roughly 20 ms at 48 kHz
pub const DEFAULT_BLOCK_SIZE: usize = 1024;

/// One decode attempt in a report
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum ReportEntry {
    Delivered {
        text: String,
        corrected: usize,
        confidence: f32,
    },
    Failed {
        reason: String,
        confidence: f32,
    },
}

/// What a receive run produced
#[derive(Debug, Clone, Serialize)]
pub struct ReceiveReport {
    pub sample_rate: f64,
    pub messages: Vec<ReportEntry>,
    pub stats: RxStats,
}

impl ReceiveReport {
    pub fn delivered(&self) -> impl Iterator<Item = &str> {
        self.messages.iter().filter_map(|m| match m {
            ReportEntry::Delivered { text, .. } => Some(text.as_str()),
            ReportEntry::Failed { .. } => None,
        })
    }
}

/// Feed `audio` to a fresh session in blocks of `block_size` samples
pub fn receive_samples(
    audio: &AudioBuffer,
    config: &StationConfig,
    block_size: usize,
) -> Result<ReceiveReport> {
    let mut session = ReceiveSession::new(
        audio.sample_rate(),
        config.modem.clone(),
        config.receive.clone(),
    )?;
    session.start();

    let mut messages = Vec::new();
    let mut record = |event: RxEvent| match event {
        RxEvent::Delivered(delivery) => messages.push(ReportEntry::Delivered {
            text: delivery.text(),
            corrected: delivery.corrected,
            confidence: delivery.confidence,
        }),
        RxEvent::Failed(failure) => messages.push(ReportEntry::Failed {
            reason: failure.reason,
            confidence: failure.confidence,
        }),
        // Offline processing has no real-time budget
        RxEvent::BlockOverrun(Overrun::Late { .. }) => {}
        other => debug!(?other, "receive event"),
    };

    for block in audio.data().chunks(block_size.max(1)) {
        session.process_block(block).into_iter().for_each(&mut record);
    }
    session.finish().into_iter().for_each(&mut record);

    Ok(ReceiveReport {
        sample_rate: audio.sample_rate(),
        messages,
        stats: session.stats().clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use cosbit_link::tx::Transmitter;

    #[test]
    fn test_receive_transmitted_audio() {
        let config = StationConfig::default();
        let audio = Transmitter::new(48000.0, config.modem.clone(), config.transmit.clone())
            .unwrap()
            .transmit_text("HELLO")
            .unwrap();

        let report = receive_samples(&audio, &config, 480).unwrap();
        assert_eq!(report.delivered().collect::<Vec<_>>(), vec!["HELLO"]);
        assert_eq!(report.stats.deliveries, 1);

        let json = serde_json::to_string(&report).unwrap();
        assert!(json.contains("\"result\":\"delivered\""));
    }

    #[test]
    fn test_silence_reports_nothing() {
        let audio = AudioBuffer::from_data(vec![0.0; 48000], 48000.0).unwrap();
        let report = receive_samples(&audio, &StationConfig::default(), DEFAULT_BLOCK_SIZE).unwrap();
        assert!(report.messages.is_empty());
        assert_eq!(report.stats.locks, 0);
    }
}
