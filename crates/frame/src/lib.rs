//! CosBit Frame - Reed-Solomon FEC, interleaving and framing
//!
//! This crate turns 48 data bytes into a 64-byte RS(64,48) packet, spreads
//! it with an 8×8 block interleaver and wraps it in a sync-word frame, and
//! reverses all three on receive.

pub mod error;
pub mod fec;
pub mod frame;
pub mod gf;
pub mod interleave;

pub use error::{FrameError, Result};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::{
        error::{FrameError, Result},
        fec::{Correction, ReedSolomon},
        frame::{
            bits_to_bytes, bytes_to_bits, Decoded, Frame, Packet, PayloadCollector,
            ReceivedFrame, SyncCorrelator, FRAME_BITS, MAX_SYNC_TOLERANCE,
        },
        interleave::{deinterleave_packet, interleave_packet, BlockInterleaver},
    };
}
