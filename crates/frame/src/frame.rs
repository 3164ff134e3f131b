//! Packet and frame structure
//!
//! A [`Packet`] is the 64-byte RS(64,48) codeword. A [`Frame`] is the
//! 16-bit sync word followed by the interleaved packet, 528 bits sent
//! MSB first. On receive, a [`SyncCorrelator`] hunts for the sync word in
//! the demodulated bit stream and a [`PayloadCollector`] gathers the 512
//! payload bits that follow it.

use crate::fec::ReedSolomon;
use crate::interleave::{deinterleave_packet, interleave_packet};
use crate::{FrameError, Result};
use cosbit_core::protocol::{
    DATA_BYTES, PACKET_BITS, PACKET_BYTES, POSTAMBLE_BITS, PREAMBLE_BITS, SYNC_BITS, SYNC_WORD,
};

/// Bits in a frame: sync word plus payload
pub const FRAME_BITS: usize = SYNC_BITS + PACKET_BITS;

/// Largest Hamming distance a sync match may be configured to accept
pub const MAX_SYNC_TOLERANCE: u32 = 3;

/// A 64-byte RS codeword in codeword (not transmission) order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Packet([u8; PACKET_BYTES]);

/// Data recovered from a packet
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decoded {
    pub data: [u8; DATA_BYTES],
    pub corrected: usize,
}

impl Packet {
    /// RS-encode 48 data bytes
    pub fn encode(data: &[u8; DATA_BYTES]) -> Result<Self> {
        let codeword = ReedSolomon::packet().encode(data)?;
        Self::from_bytes(&codeword)
    }

    /// Wrap an existing codeword; any length other than 64 is rejected
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let array: [u8; PACKET_BYTES] =
            bytes.try_into().map_err(|_| FrameError::SizeMismatch {
                expected: PACKET_BYTES,
                actual: bytes.len(),
            })?;
        Ok(Self(array))
    }

    /// Rebuild a packet from bytes in transmission order
    pub fn from_interleaved(received: &[u8; PACKET_BYTES]) -> Self {
        Self(deinterleave_packet(received))
    }

    pub fn as_bytes(&self) -> &[u8; PACKET_BYTES] {
        &self.0
    }

    /// Bytes in transmission order
    pub fn interleaved(&self) -> [u8; PACKET_BYTES] {
        interleave_packet(&self.0)
    }

    /// RS-decode, correcting up to 8 byte errors
    pub fn decode(&self) -> Result<Decoded> {
        let correction = ReedSolomon::packet().decode(&self.0)?;
        let data: [u8; DATA_BYTES] =
            correction
                .data
                .as_slice()
                .try_into()
                .map_err(|_| FrameError::SizeMismatch {
                    expected: DATA_BYTES,
                    actual: correction.data.len(),
                })?;
        Ok(Decoded {
            data,
            corrected: correction.corrected,
        })
    }
}

/// Sync word plus interleaved packet
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Frame {
    packet: Packet,
}

impl Frame {
    pub fn new(packet: Packet) -> Self {
        Self { packet }
    }

    pub fn packet(&self) -> &Packet {
        &self.packet
    }

    /// The 528 frame bits, MSB first
    pub fn to_bits(&self) -> Vec<bool> {
        let mut bits = Vec::with_capacity(FRAME_BITS);
        push_word(&mut bits, SYNC_WORD as u32, SYNC_BITS);
        for byte in self.packet.interleaved() {
            push_word(&mut bits, byte as u32, 8);
        }
        bits
    }

    /// Frame bits wrapped in the alternating preamble and the zero postamble
    pub fn to_burst_bits(&self) -> Vec<bool> {
        let mut bits = Vec::with_capacity(PREAMBLE_BITS + FRAME_BITS + POSTAMBLE_BITS);
        bits.extend(preamble_bits());
        bits.extend(self.to_bits());
        bits.extend(std::iter::repeat(false).take(POSTAMBLE_BITS));
        bits
    }
}

/// `1010...` preamble
pub fn preamble_bits() -> impl Iterator<Item = bool> {
    (0..PREAMBLE_BITS).map(|i| i % 2 == 0)
}

fn push_word(bits: &mut Vec<bool>, word: u32, width: usize) {
    for shift in (0..width).rev() {
        bits.push((word >> shift) & 1 == 1);
    }
}

/// Bytes to MSB-first bits
pub fn bytes_to_bits(bytes: &[u8]) -> Vec<bool> {
    let mut bits = Vec::with_capacity(bytes.len() * 8);
    for &byte in bytes {
        push_word(&mut bits, byte as u32, 8);
    }
    bits
}

/// MSB-first bits to bytes; a trailing partial byte is dropped
pub fn bits_to_bytes(bits: &[bool]) -> Vec<u8> {
    bits.chunks_exact(8)
        .map(|chunk| chunk.iter().fold(0u8, |acc, &b| (acc << 1) | b as u8))
        .collect()
}

/// Sliding sync word detector
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncCorrelator {
    register: u16,
    filled: usize,
    tolerance: u32,
}

impl SyncCorrelator {
    /// Accept windows within `tolerance` bit errors of the sync word
    pub fn new(tolerance: u32) -> Result<Self> {
        if tolerance > MAX_SYNC_TOLERANCE {
            return Err(FrameError::InvalidFormat {
                msg: format!(
                    "sync tolerance {} exceeds maximum {}",
                    tolerance, MAX_SYNC_TOLERANCE
                ),
            });
        }
        Ok(Self {
            register: 0,
            filled: 0,
            tolerance,
        })
    }

    pub fn tolerance(&self) -> u32 {
        self.tolerance
    }

    /// Shift in one bit; true when the last 16 bits match the sync word
    pub fn push(&mut self, bit: bool) -> bool {
        self.register = (self.register << 1) | bit as u16;
        self.filled = (self.filled + 1).min(SYNC_BITS);
        self.distance()
            .map_or(false, |distance| distance <= self.tolerance)
    }

    /// Hamming distance of the current window, once 16 bits have arrived
    pub fn distance(&self) -> Option<u32> {
        (self.filled == SYNC_BITS).then(|| (self.register ^ SYNC_WORD).count_ones())
    }

    /// Forget all shifted-in bits
    pub fn reset(&mut self) {
        self.register = 0;
        self.filled = 0;
    }
}

/// Payload bits gathered after a sync match
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PayloadCollector {
    bytes: [u8; PACKET_BYTES],
    bits: usize,
    confidence_sum: f32,
}

/// A complete payload, deinterleaved back into codeword order
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReceivedFrame {
    pub packet: Packet,
    /// Mean demodulator confidence over the payload bits
    pub confidence: f32,
}

impl Default for PayloadCollector {
    fn default() -> Self {
        Self::new()
    }
}

impl PayloadCollector {
    pub fn new() -> Self {
        Self {
            bytes: [0u8; PACKET_BYTES],
            bits: 0,
            confidence_sum: 0.0,
        }
    }

    /// Bits collected so far
    pub fn received(&self) -> usize {
        self.bits
    }

    pub fn is_complete(&self) -> bool {
        self.bits == PACKET_BITS
    }

    /// Add one bit; returns the frame when the 512th bit arrives.
    /// Bits beyond 512 are ignored.
    pub fn push(&mut self, bit: bool, confidence: f32) -> Option<ReceivedFrame> {
        if self.is_complete() {
            return None;
        }
        let byte = &mut self.bytes[self.bits / 8];
        *byte = (*byte << 1) | bit as u8;
        self.bits += 1;
        self.confidence_sum += confidence;

        self.is_complete().then(|| ReceivedFrame {
            packet: Packet::from_interleaved(&self.bytes),
            confidence: self.confidence_sum / PACKET_BITS as f32,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cq_packet() -> Packet {
        let mut data = [0u8; DATA_BYTES];
        data[..13].copy_from_slice(b"CQ CQ DE TEST");
        Packet::encode(&data).unwrap()
    }

    #[test]
    fn test_packet_size_checked() {
        assert!(matches!(
            Packet::from_bytes(&[0u8; 63]),
            Err(FrameError::SizeMismatch { expected: 64, actual: 63 })
        ));
        assert!(Packet::from_bytes(&[0u8; 64]).is_ok());
    }

    #[test]
    fn test_packet_encode_decode() {
        let packet = cq_packet();
        let decoded = packet.decode().unwrap();
        assert_eq!(&decoded.data[..13], b"CQ CQ DE TEST");
        assert_eq!(decoded.corrected, 0);
    }

    #[test]
    fn test_frame_bits_layout() {
        let frame = Frame::new(cq_packet());
        let bits = frame.to_bits();
        assert_eq!(bits.len(), FRAME_BITS);

        let head = bits_to_bytes(&bits[..SYNC_BITS]);
        assert_eq!(head, vec![0xF9, 0x94]);
        assert_eq!(bits_to_bytes(&bits[SYNC_BITS..]), cq_packet().interleaved().to_vec());
    }

    #[test]
    fn test_burst_bits_layout() {
        let burst = Frame::new(cq_packet()).to_burst_bits();
        assert_eq!(burst.len(), PREAMBLE_BITS + FRAME_BITS + POSTAMBLE_BITS);
        assert!(burst[0] && !burst[1] && burst[78] && !burst[79]);
        assert!(burst[PREAMBLE_BITS..PREAMBLE_BITS + 5].iter().all(|&b| b));
        assert!(burst[burst.len() - POSTAMBLE_BITS..].iter().all(|&b| !b));
    }

    #[test]
    fn test_bit_helpers() {
        let bits = bytes_to_bits(&[0b1000_0001, 0xff]);
        assert_eq!(bits.len(), 16);
        assert!(bits[0] && !bits[1] && bits[7]);
        assert_eq!(bits_to_bytes(&bits), vec![0x81, 0xff]);
        assert_eq!(bits_to_bytes(&bits[..10]), vec![0x81]);
    }

    #[test]
    fn test_sync_exact_match() {
        let mut sync = SyncCorrelator::new(0).unwrap();
        let mut stream: Vec<bool> = preamble_bits().collect();
        stream.extend(bytes_to_bits(&SYNC_WORD.to_be_bytes()));

        let hits: Vec<usize> = stream
            .iter()
            .enumerate()
            .filter_map(|(i, &b)| sync.push(b).then_some(i))
            .collect();
        assert_eq!(hits, vec![stream.len() - 1]);
    }

    #[test]
    fn test_sync_after_noise_bits() {
        let mut sync = SyncCorrelator::new(0).unwrap();
        let noise = bytes_to_bits(&[0x13, 0x37, 0xC0, 0xDE, 0x42]);
        for &bit in &noise {
            sync.push(bit);
        }
        let found = bytes_to_bits(&SYNC_WORD.to_be_bytes())
            .into_iter()
            .map(|b| sync.push(b))
            .last();
        assert_eq!(found, Some(true));
    }

    #[test]
    fn test_sync_tolerance() {
        let flipped = bytes_to_bits(&(SYNC_WORD ^ 0x0100).to_be_bytes());

        let mut strict = SyncCorrelator::new(0).unwrap();
        assert!(!flipped.iter().map(|&b| strict.push(b)).any(|m| m));

        let mut loose = SyncCorrelator::new(1).unwrap();
        assert!(flipped.iter().map(|&b| loose.push(b)).last().unwrap());
        assert_eq!(loose.distance(), Some(1));

        assert!(SyncCorrelator::new(MAX_SYNC_TOLERANCE + 1).is_err());
    }

    #[test]
    fn test_sync_needs_full_window() {
        let mut sync = SyncCorrelator::new(3).unwrap();
        // The low bits of the sync word on their own never match
        for &bit in &bytes_to_bits(&[0x94]) {
            assert!(!sync.push(bit));
        }
        assert_eq!(sync.distance(), None);
        sync.reset();
        assert_eq!(sync.distance(), None);
    }

    #[test]
    fn test_payload_collector() {
        let packet = cq_packet();
        let bits = bytes_to_bits(&packet.interleaved());
        let mut collector = PayloadCollector::new();

        let mut done = None;
        for (i, &bit) in bits.iter().enumerate() {
            let out = collector.push(bit, 0.5);
            if i + 1 < PACKET_BITS {
                assert!(out.is_none());
            } else {
                done = out;
            }
        }
        let frame = done.unwrap();
        assert_eq!(frame.packet, packet);
        assert!((frame.confidence - 0.5).abs() < 1e-6);
        assert!(collector.push(true, 1.0).is_none());
        assert_eq!(collector.received(), PACKET_BITS);
    }
}
