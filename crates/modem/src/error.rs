//! Error types for CosBit Modem

use thiserror::Error;

/// Modem error types
#[derive(Error, Debug)]
pub enum ModemError {
    #[error("Invalid modulation parameters: {msg}")]
    InvalidParameters { msg: String },
}

/// Result type for CosBit Modem operations
pub type Result<T> = std::result::Result<T, ModemError>;
