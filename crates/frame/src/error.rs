//! Error types for CosBit Frame

use thiserror::Error;

/// Frame processing error types
#[derive(Error, Debug)]
pub enum FrameError {
    #[error("Invalid frame format: {msg}")]
    InvalidFormat { msg: String },

    #[error("Frame size mismatch: expected {expected}, got {actual}")]
    SizeMismatch { expected: usize, actual: usize },

    #[error("Uncorrectable block: {msg}")]
    Uncorrectable { msg: String },

    #[error("Invalid FEC parameters: {msg}")]
    InvalidFecParameters { msg: String },

    #[error("Interleaving error: {msg}")]
    InterleavingError { msg: String },
}

/// Result type for CosBit Frame operations
pub type Result<T> = std::result::Result<T, FrameError>;
