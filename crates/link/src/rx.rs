//! Receive pipeline controller
//!
//! A [`ReceiveSession`] owns one demodulator state and one receive state
//! machine. Demodulated bits drive the machine:
//!
//! ```text
//! Idle -> SearchingSync -> ReceivingPayload -> Decoding -> Delivered | Failed
//!              ^                  |                            |
//!              +---- lock lost ---+------- next bit -----------+
//! ```
//!
//! After every decode attempt the demodulator is told to drop lock, so the
//! next burst is acquired from scratch.

use crate::message::payload_text;
use crate::{LinkError, Result};
use cosbit_core::protocol::DATA_BYTES;
use cosbit_frame::frame::{Packet, PayloadCollector, ReceivedFrame, SyncCorrelator};
use cosbit_frame::FrameError;
use cosbit_modem::afsk::{AfskConfig, AfskDemodulator, DemodConfig, DemodState};
use cosbit_modem::common::{DemodEvent, Demodulator, Flow, SignalQuality};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Receive options
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RxConfig {
    /// Sync word bit errors tolerated (0..=3)
    pub sync_tolerance: u32,
    pub demod: DemodConfig,
}

impl Default for RxConfig {
    fn default() -> Self {
        Self {
            sync_tolerance: 0,
            demod: DemodConfig::default(),
        }
    }
}

/// A successfully decoded message
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Delivery {
    pub data: [u8; DATA_BYTES],
    /// Bytes repaired by the RS decoder
    pub corrected: usize,
    /// Mean demodulator confidence over the payload
    pub confidence: f32,
}

impl Delivery {
    /// Message text with padding removed
    pub fn text(&self) -> String {
        payload_text(&self.data)
    }
}

/// A payload that was received but could not be decoded
#[derive(Debug, Clone, PartialEq)]
pub struct RxFailure {
    pub reason: String,
    pub confidence: f32,
}

/// Why a block of audio was not handled in real time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Overrun {
    /// Blocks discarded because the capture queue was full
    Dropped { blocks: u64 },
    /// Processing took longer than the audio it covered
    Late { elapsed: Duration, budget: Duration },
}

/// Notifications from a receive session
#[derive(Debug, Clone, PartialEq)]
pub enum RxEvent {
    LockChanged { locked: bool },
    Delivered(Delivery),
    Failed(RxFailure),
    BlockOverrun(Overrun),
}

/// Receive state machine
#[derive(Debug, Clone, PartialEq)]
pub enum RxState {
    Idle,
    SearchingSync(SyncCorrelator),
    ReceivingPayload(PayloadCollector),
    Decoding(Packet),
    Delivered(Delivery),
    Failed(RxFailure),
}

impl RxState {
    pub fn name(&self) -> &'static str {
        match self {
            RxState::Idle => "idle",
            RxState::SearchingSync(_) => "searching-sync",
            RxState::ReceivingPayload(_) => "receiving-payload",
            RxState::Decoding(_) => "decoding",
            RxState::Delivered(_) => "delivered",
            RxState::Failed(_) => "failed",
        }
    }
}

/// Session counters
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RxStats {
    pub blocks: u64,
    pub samples: u64,
    pub locks: u64,
    /// Lock periods that ended without a sync word
    pub sync_not_found: u64,
    pub syncs_found: u64,
    /// Payloads abandoned part way by lock loss or end of stream
    pub payloads_truncated: u64,
    pub deliveries: u64,
    pub failures: u64,
    pub corrected_bytes: u64,
    pub overruns: u64,
}

/// State machine half of a session, borrowed by the demodulator callback
struct Controller {
    state: RxState,
    /// Empty correlator with the configured tolerance
    sync: SyncCorrelator,
    locked: bool,
    stats: RxStats,
    events: Vec<RxEvent>,
}

impl Controller {
    fn searching(&self) -> RxState {
        RxState::SearchingSync(self.sync.clone())
    }

    fn set_locked(&mut self, locked: bool) {
        if self.locked != locked {
            self.locked = locked;
            self.events.push(RxEvent::LockChanged { locked });
        }
    }

    fn on_event(&mut self, event: DemodEvent) -> Flow {
        match event {
            DemodEvent::LockAcquired { timing_offset } => {
                debug!(timing_offset, "lock acquired");
                self.stats.locks += 1;
                self.set_locked(true);
                Flow::Continue
            }
            DemodEvent::LockLost => {
                self.set_locked(false);
                self.abandon("lock lost");
                Flow::Continue
            }
            DemodEvent::Bit { value, confidence } => self.on_bit(value, confidence),
        }
    }

    fn on_bit(&mut self, value: bool, confidence: f32) -> Flow {
        if matches!(self.state, RxState::Delivered(_) | RxState::Failed(_)) {
            // Pass back through Idle before hunting for the next frame
            self.state = RxState::Idle;
            self.state = self.searching();
        }

        match &mut self.state {
            RxState::SearchingSync(sync) => {
                if sync.push(value) {
                    debug!(distance = sync.distance(), "sync word found");
                    self.stats.syncs_found += 1;
                    self.state = RxState::ReceivingPayload(PayloadCollector::new());
                }
                Flow::Continue
            }
            RxState::ReceivingPayload(collector) => match collector.push(value, confidence) {
                Some(frame) => {
                    self.decode(frame);
                    self.set_locked(false);
                    Flow::Resync
                }
                None => Flow::Continue,
            },
            RxState::Idle | RxState::Decoding(_) | RxState::Delivered(_) | RxState::Failed(_) => {
                Flow::Continue
            }
        }
    }

    fn decode(&mut self, frame: ReceivedFrame) {
        self.state = RxState::Decoding(frame.packet);
        self.state = match frame.packet.decode() {
            Ok(decoded) => {
                let delivery = Delivery {
                    data: decoded.data,
                    corrected: decoded.corrected,
                    confidence: frame.confidence,
                };
                info!(
                    corrected = delivery.corrected,
                    confidence = delivery.confidence,
                    text = %delivery.text(),
                    "packet delivered"
                );
                self.stats.deliveries += 1;
                self.stats.corrected_bytes += delivery.corrected as u64;
                self.events.push(RxEvent::Delivered(delivery));
                RxState::Delivered(delivery)
            }
            Err(err) => {
                let reason = match err {
                    FrameError::Uncorrectable { msg } => msg,
                    other => other.to_string(),
                };
                warn!(%reason, confidence = frame.confidence, "uncorrectable packet");
                let failure = RxFailure {
                    reason,
                    confidence: frame.confidence,
                };
                self.stats.failures += 1;
                self.events.push(RxEvent::Failed(failure.clone()));
                RxState::Failed(failure)
            }
        };
    }

    /// Drop any partial frame and go back to hunting for sync
    fn abandon(&mut self, why: &str) {
        match &self.state {
            RxState::Idle => return,
            RxState::ReceivingPayload(collector) => {
                debug!(bits = collector.received(), why, "payload aborted");
                self.stats.payloads_truncated += 1;
            }
            RxState::SearchingSync(_) => {
                debug!(why, "no sync word before lock ended");
                self.stats.sync_not_found += 1;
            }
            RxState::Decoding(_) | RxState::Delivered(_) | RxState::Failed(_) => {}
        }
        self.state = self.searching();
    }
}

/// One receive session: demodulator state plus the receive state machine
pub struct ReceiveSession {
    demod: AfskDemodulator,
    demod_state: DemodState,
    controller: Controller,
    running: bool,
}

impl ReceiveSession {
    /// Create a stopped session for audio at `sample_rate`
    pub fn new(sample_rate: f64, afsk: AfskConfig, config: RxConfig) -> Result<Self> {
        let sync =
            SyncCorrelator::new(config.sync_tolerance).map_err(|e| LinkError::InvalidConfig {
                msg: e.to_string(),
            })?;
        let demod = AfskDemodulator::new(sample_rate, afsk, config.demod)?;
        let demod_state = demod.new_state();

        Ok(Self {
            demod,
            demod_state,
            controller: Controller {
                state: RxState::Idle,
                sync,
                locked: false,
                stats: RxStats::default(),
                events: Vec::new(),
            },
            running: false,
        })
    }

    pub fn state(&self) -> &RxState {
        &self.controller.state
    }

    pub fn stats(&self) -> &RxStats {
        &self.controller.stats
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn sample_rate(&self) -> f64 {
        self.demod.sample_rate()
    }

    pub fn signal_quality(&self) -> SignalQuality {
        self.demod.signal_quality(&self.demod_state)
    }

    /// Begin hunting for sync
    pub fn start(&mut self) {
        if !self.running {
            self.running = true;
            self.controller.state = self.controller.searching();
            info!(sample_rate = self.sample_rate(), "receive session started");
        }
    }

    /// Stop processing audio; any partial frame is dropped
    pub fn stop(&mut self) {
        if self.running {
            self.running = false;
            self.controller.state = RxState::Idle;
            self.controller.locked = false;
            self.demod.reset(&mut self.demod_state);
            info!("receive session stopped");
        }
    }

    /// Clear demodulator state without completing an in-flight frame
    pub fn reset(&mut self) {
        self.demod.reset(&mut self.demod_state);
        self.controller.locked = false;
        self.controller.state = if self.running {
            self.controller.searching()
        } else {
            RxState::Idle
        };
        debug!("receive session reset");
    }

    /// Feed one block of audio and collect the resulting events
    pub fn process_block(&mut self, samples: &[f32]) -> Vec<RxEvent> {
        if !self.running {
            return Vec::new();
        }

        let started = Instant::now();
        let Self {
            demod,
            demod_state,
            controller,
            ..
        } = self;
        demod.process(demod_state, samples, &mut |event| controller.on_event(event));

        controller.stats.blocks += 1;
        controller.stats.samples += samples.len() as u64;

        let elapsed = started.elapsed();
        let budget = Duration::from_secs_f64(samples.len() as f64 / demod.sample_rate());
        if elapsed > budget {
            warn!(?elapsed, ?budget, "block processed slower than real time");
            controller.stats.overruns += 1;
            controller
                .events
                .push(RxEvent::BlockOverrun(Overrun::Late { elapsed, budget }));
        }

        std::mem::take(&mut controller.events)
    }

    /// Report blocks lost upstream of the session
    pub fn record_dropped(&mut self, blocks: u64) -> RxEvent {
        warn!(blocks, "capture blocks dropped");
        self.controller.stats.overruns += 1;
        RxEvent::BlockOverrun(Overrun::Dropped { blocks })
    }

    /// End of stream: abandon a partial frame and return to sync search
    pub fn finish(&mut self) -> Vec<RxEvent> {
        if self.running {
            if matches!(self.controller.state, RxState::ReceivingPayload(_)) {
                self.controller.abandon("end of stream");
            }
            self.demod.reset(&mut self.demod_state);
            self.controller.set_locked(false);
            self.controller.state = self.controller.searching();
        }
        std::mem::take(&mut self.controller.events)
    }
}
