//! CosBit Modem - AFSK modulation and demodulation
//!
//! This crate provides the continuous-phase AFSK modulator and the
//! timing-recovering AFSK demodulator used by the CosBit link, behind
//! generic modulator/demodulator traits.

pub mod afsk;
pub mod common;
pub mod error;

pub use error::{ModemError, Result};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::{
        afsk::{AfskConfig, AfskDemodulator, AfskModulator, DemodConfig, DemodState},
        common::{
            linear_chirp, DemodEvent, Demodulator, Flow, ModulationConfig, Modulator,
            SignalQuality,
        },
        error::{ModemError, Result},
    };
}
