//! Wire format constants
//!
//! Every value here must match bit-for-bit between transmitter and
//! receiver. They are fixed for the protocol and are not configurable.

/// Tone for a `1` bit, in Hz
pub const MARK_HZ: f64 = 2000.0;

/// Tone for a `0` bit, in Hz
pub const SPACE_HZ: f64 = 1200.0;

/// Symbols (bits) per second
pub const BAUD: f64 = 600.0;

/// Message bytes carried by one packet
pub const DATA_BYTES: usize = 48;

/// Reed-Solomon parity bytes appended to each packet
pub const ECC_BYTES: usize = 16;

/// Total packet size on the wire
pub const PACKET_BYTES: usize = DATA_BYTES + ECC_BYTES;

/// Payload length in bits
pub const PACKET_BITS: usize = PACKET_BYTES * 8;

/// Byte errors a packet can always correct
pub const CORRECTABLE_BYTES: usize = ECC_BYTES / 2;

/// Primitive polynomial for GF(2^8): x^8 + x^4 + x^3 + x^2 + 1.
///
/// The field generator is `α = 2` and the RS generator polynomial has
/// roots `α^0 .. α^(ECC_BYTES-1)`.
pub const GF_PRIMITIVE_POLY: u16 = 0x11d;

/// Frame synchronization word, sent MSB first.
///
/// `1111 1001 1001 0100` keeps a Hamming distance of at least 7 from every
/// 16-bit window of the alternating preamble running into it, and its
/// aperiodic autocorrelation sidelobes never exceed 2.
pub const SYNC_WORD: u16 = 0xF994;

/// Sync word length in bits
pub const SYNC_BITS: usize = 16;

/// Interleaver matrix rows (bytes are written row by row)
pub const INTERLEAVE_ROWS: usize = 8;

/// Interleaver matrix columns (bytes are read column by column)
pub const INTERLEAVE_COLS: usize = 8;

/// Alternating `1010...` bits sent ahead of the sync word for timing acquisition
pub const PREAMBLE_BITS: usize = 80;

/// Zero bits sent after the payload so the last symbol is fully sampled
pub const POSTAMBLE_BITS: usize = 20;
