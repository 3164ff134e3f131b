//! Error types for CosBit Core

use thiserror::Error;

/// Core error types
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Invalid sample rate: {rate}")]
    InvalidSampleRate { rate: f64 },

    #[error("FFT error: {msg}")]
    FftError { msg: String },

    #[error("Invalid channel parameters: {msg}")]
    InvalidChannel { msg: String },
}

/// Result type for CosBit Core operations
pub type Result<T> = std::result::Result<T, CoreError>;
