//! Error types for CosBit Link

use cosbit_core::protocol::DATA_BYTES;
use std::time::Duration;
use thiserror::Error;

/// Link layer error types
#[derive(Error, Debug)]
pub enum LinkError {
    #[error("Message is {len} bytes, at most {} fit in a packet", DATA_BYTES)]
    MessageTooLong { len: usize },

    #[error("Invalid link configuration: {msg}")]
    InvalidConfig { msg: String },

    #[error("Capture queue closed")]
    QueueClosed,

    #[error("Capture queue still full after {timeout:?}")]
    QueueTimeout { timeout: Duration },

    #[error("Core error: {0}")]
    Core(#[from] cosbit_core::CoreError),

    #[error("Frame error: {0}")]
    Frame(#[from] cosbit_frame::FrameError),

    #[error("Modem error: {0}")]
    Modem(#[from] cosbit_modem::ModemError),
}

/// Result type for CosBit Link operations
pub type Result<T> = std::result::Result<T, LinkError>;
