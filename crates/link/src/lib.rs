//! CosBit Link - transmit and receive pipelines
//!
//! This crate ties the codec, framer and modem together: a [`Transmitter`]
//! turns a 48-byte message into one audio burst, and a [`ReceiveSession`]
//! turns a stream of audio blocks back into delivered messages.
//!
//! [`Transmitter`]: tx::Transmitter
//! [`ReceiveSession`]: rx::ReceiveSession

pub mod error;
pub mod live;
pub mod message;
pub mod rx;
pub mod tx;

pub use error::{LinkError, Result};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::{
        error::{LinkError, Result},
        live::{capture_queue, CaptureMessage, CaptureReceiver, CaptureSender},
        message::{pad_payload, pad_text, payload_text},
        rx::{Delivery, Overrun, ReceiveSession, RxConfig, RxEvent, RxFailure, RxState, RxStats},
        tx::{Transmitter, TxConfig},
    };
}
