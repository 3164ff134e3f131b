//! CosBit Core - shared primitives for the CosBit AFSK link
//!
//! This crate provides the fixed wire constants, audio sample buffers,
//! an FFT wrapper for diagnostics, and a channel simulator used to
//! impair test transmissions.

pub mod buffer;
pub mod channel;
pub mod fft;
pub mod protocol;
pub mod error;

pub use error::{CoreError, Result};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::{
        buffer::{AudioBuffer, SampleBuffer},
        channel::{Channel, Impairment},
        fft::{FftConfig, FftProcessor, Spectrum},
        protocol,
        error::{CoreError, Result},
    };
}
