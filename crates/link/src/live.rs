//! Live capture hand-off
//!
//! The audio callback thread pushes fixed-size blocks into a bounded queue
//! and never blocks: when the queue is full the block is dropped and
//! counted. The receive thread drains the queue into a [`ReceiveSession`]
//! and reports dropped blocks as overruns.

use crate::rx::{ReceiveSession, RxEvent};
use crate::{LinkError, Result};
use crossbeam_channel::{
    bounded, Receiver, RecvTimeoutError, SendTimeoutError, Sender, TrySendError,
};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Messages from the capture side to the receive side
#[derive(Debug, Clone, PartialEq)]
pub enum CaptureMessage {
    Samples(Vec<f32>),
    /// Clear demodulator state, e.g. after the input device changed
    Reset,
}

/// Producer half, owned by the audio callback
#[derive(Debug, Clone)]
pub struct CaptureSender {
    tx: Sender<CaptureMessage>,
    dropped: Arc<AtomicU64>,
}

/// Consumer half, owned by the receive thread
#[derive(Debug)]
pub struct CaptureReceiver {
    rx: Receiver<CaptureMessage>,
    dropped: Arc<AtomicU64>,
    reported: u64,
}

/// Bounded queue holding at most `capacity` blocks
pub fn capture_queue(capacity: usize) -> (CaptureSender, CaptureReceiver) {
    let (tx, rx) = bounded(capacity.max(1));
    let dropped = Arc::new(AtomicU64::new(0));
    (
        CaptureSender {
            tx,
            dropped: Arc::clone(&dropped),
        },
        CaptureReceiver {
            rx,
            dropped,
            reported: 0,
        },
    )
}

impl CaptureSender {
    /// Queue a block without blocking. Returns false if it was dropped.
    pub fn send_block(&self, samples: Vec<f32>) -> bool {
        match self.tx.try_send(CaptureMessage::Samples(samples)) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) | Err(TrySendError::Disconnected(_)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                false
            }
        }
    }

    /// Ask the receiver to reset, waiting up to `timeout` for queue space
    pub fn request_reset(&self, timeout: Duration) -> Result<()> {
        self.tx
            .send_timeout(CaptureMessage::Reset, timeout)
            .map_err(|e| match e {
                SendTimeoutError::Timeout(_) => LinkError::QueueTimeout { timeout },
                SendTimeoutError::Disconnected(_) => LinkError::QueueClosed,
            })
    }

    /// Blocks dropped so far
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

impl CaptureReceiver {
    /// Handle one queued message, waiting up to `timeout` for it.
    ///
    /// Returns `Ok(false)` on timeout and `Err(QueueClosed)` once the sender
    /// is gone and the queue is drained.
    pub fn poll(
        &mut self,
        session: &mut ReceiveSession,
        timeout: Duration,
        on_event: &mut impl FnMut(RxEvent),
    ) -> Result<bool> {
        match self.rx.recv_timeout(timeout) {
            Ok(message) => {
                self.handle(session, message, on_event);
                Ok(true)
            }
            Err(RecvTimeoutError::Timeout) => Ok(false),
            Err(RecvTimeoutError::Disconnected) => Err(LinkError::QueueClosed),
        }
    }

    /// Drive `session` until the sender disconnects, then flush it
    pub fn run(&mut self, session: &mut ReceiveSession, mut on_event: impl FnMut(RxEvent)) {
        while let Ok(message) = self.rx.recv() {
            self.handle(session, message, &mut on_event);
        }
        debug!("capture queue closed");
        self.report_dropped(session, &mut on_event);
        session.finish().into_iter().for_each(&mut on_event);
    }

    fn handle(
        &mut self,
        session: &mut ReceiveSession,
        message: CaptureMessage,
        on_event: &mut impl FnMut(RxEvent),
    ) {
        self.report_dropped(session, on_event);
        match message {
            CaptureMessage::Samples(block) => {
                session.process_block(&block).into_iter().for_each(on_event);
            }
            CaptureMessage::Reset => session.reset(),
        }
    }

    fn report_dropped(&mut self, session: &mut ReceiveSession, on_event: &mut impl FnMut(RxEvent)) {
        let dropped = self.dropped.load(Ordering::Relaxed);
        if dropped > self.reported {
            on_event(session.record_dropped(dropped - self.reported));
            self.reported = dropped;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rx::{Overrun, RxConfig};
    use cosbit_modem::afsk::AfskConfig;

    fn session() -> ReceiveSession {
        let mut session =
            ReceiveSession::new(48000.0, AfskConfig::default(), RxConfig::default()).unwrap();
        session.start();
        session
    }

    #[test]
    fn test_full_queue_drops_and_reports() {
        let (tx, mut rx) = capture_queue(1);
        assert!(tx.send_block(vec![0.0; 480]));
        assert!(!tx.send_block(vec![0.0; 480]));
        assert!(!tx.send_block(vec![0.0; 480]));
        assert_eq!(tx.dropped(), 2);
        drop(tx);

        let mut session = session();
        let mut events = Vec::new();
        rx.run(&mut session, |e| events.push(e));

        assert_eq!(
            events.first(),
            Some(&RxEvent::BlockOverrun(Overrun::Dropped { blocks: 2 }))
        );
        assert_eq!(session.stats().blocks, 1);
    }

    #[test]
    fn test_poll_timeout_and_close() {
        let (tx, mut rx) = capture_queue(4);
        let mut session = session();
        let mut sink = |_e: RxEvent| {};

        assert!(!rx.poll(&mut session, Duration::from_millis(1), &mut sink).unwrap());
        tx.request_reset(Duration::from_millis(1)).unwrap();
        assert!(rx.poll(&mut session, Duration::from_millis(1), &mut sink).unwrap());
        drop(tx);
        assert!(matches!(
            rx.poll(&mut session, Duration::from_millis(1), &mut sink),
            Err(LinkError::QueueClosed)
        ));
    }

    #[test]
    fn test_reset_request_times_out_on_full_queue() {
        let (tx, rx) = capture_queue(1);
        assert!(tx.send_block(vec![0.0; 480]));

        let timeout = Duration::from_millis(5);
        assert!(matches!(
            tx.request_reset(timeout),
            Err(LinkError::QueueTimeout { .. })
        ));

        drop(rx);
        assert!(matches!(
            tx.request_reset(timeout),
            Err(LinkError::QueueClosed)
        ));
    }
}
