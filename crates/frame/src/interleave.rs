//! Block interleaving for burst error mitigation
//!
//! Bytes are written into a `rows × cols` matrix row by row and read out
//! column by column, so consecutive transmitted bytes come from different
//! rows of the codeword.

use crate::{FrameError, Result};
use cosbit_core::protocol::{INTERLEAVE_COLS, INTERLEAVE_ROWS, PACKET_BYTES};

/// Block interleaver
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockInterleaver {
    rows: usize,
    cols: usize,
}

impl BlockInterleaver {
    /// Create a new block interleaver
    pub fn new(rows: usize, cols: usize) -> Result<Self> {
        if rows == 0 || cols == 0 {
            return Err(FrameError::InterleavingError {
                msg: "Interleaver dimensions must be greater than 0".to_string(),
            });
        }

        Ok(Self { rows, cols })
    }

    /// The 8×8 packet interleaver
    pub fn packet() -> Self {
        Self {
            rows: INTERLEAVE_ROWS,
            cols: INTERLEAVE_COLS,
        }
    }

    /// Get the block size (total elements)
    pub fn block_size(&self) -> usize {
        self.rows * self.cols
    }

    /// Transmitted position of the codeword byte at `index` within a block
    pub fn position_of(&self, index: usize) -> usize {
        let (row, col) = (index / self.cols, index % self.cols);
        col * self.rows + row
    }

    fn check_len(&self, len: usize) -> Result<()> {
        let block_size = self.block_size();
        if len % block_size != 0 {
            return Err(FrameError::InterleavingError {
                msg: format!("Data length {} not multiple of block size {}", len, block_size),
            });
        }
        Ok(())
    }

    /// Interleave data to spread errors
    pub fn interleave(&self, data: &[u8]) -> Result<Vec<u8>> {
        self.check_len(data.len())?;

        let mut result = vec![0u8; data.len()];
        for (block, out) in data
            .chunks_exact(self.block_size())
            .zip(result.chunks_exact_mut(self.block_size()))
        {
            for (index, &byte) in block.iter().enumerate() {
                out[self.position_of(index)] = byte;
            }
        }

        Ok(result)
    }

    /// Deinterleave data to concentrate errors back into codeword order
    pub fn deinterleave(&self, data: &[u8]) -> Result<Vec<u8>> {
        self.check_len(data.len())?;

        let mut result = vec![0u8; data.len()];
        for (block, out) in data
            .chunks_exact(self.block_size())
            .zip(result.chunks_exact_mut(self.block_size()))
        {
            for (index, slot) in out.iter_mut().enumerate() {
                *slot = block[self.position_of(index)];
            }
        }

        Ok(result)
    }
}

/// Interleave one 64-byte packet with the 8×8 matrix
pub fn interleave_packet(packet: &[u8; PACKET_BYTES]) -> [u8; PACKET_BYTES] {
    let interleaver = BlockInterleaver::packet();
    let mut out = [0u8; PACKET_BYTES];
    for (index, &byte) in packet.iter().enumerate() {
        out[interleaver.position_of(index)] = byte;
    }
    out
}

/// Inverse of [`interleave_packet`]
pub fn deinterleave_packet(received: &[u8; PACKET_BYTES]) -> [u8; PACKET_BYTES] {
    let interleaver = BlockInterleaver::packet();
    let mut out = [0u8; PACKET_BYTES];
    for (index, slot) in out.iter_mut().enumerate() {
        *slot = received[interleaver.position_of(index)];
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use quickcheck_macros::quickcheck;

    #[test]
    fn test_block_interleaver_creation() {
        let interleaver = BlockInterleaver::new(4, 8).unwrap();
        assert_eq!(interleaver.block_size(), 32);
        assert_eq!(BlockInterleaver::packet().block_size(), PACKET_BYTES);
    }

    #[test]
    fn test_block_interleaver_pattern() {
        let interleaver = BlockInterleaver::new(2, 2).unwrap();
        // Read column-wise
        assert_eq!(interleaver.interleave(&[0, 1, 2, 3]).unwrap(), vec![0, 2, 1, 3]);

        let interleaver = BlockInterleaver::new(2, 3).unwrap();
        assert_eq!(
            interleaver.interleave(&[0, 1, 2, 3, 4, 5]).unwrap(),
            vec![0, 3, 1, 4, 2, 5]
        );
    }

    #[test]
    fn test_packet_pattern() {
        let packet: [u8; PACKET_BYTES] = std::array::from_fn(|i| i as u8);
        let sent = interleave_packet(&packet);
        // Transmitted index c*8+r carries codeword index r*8+c
        for r in 0..8 {
            for c in 0..8 {
                assert_eq!(sent[c * 8 + r], (r * 8 + c) as u8);
            }
        }
        assert_eq!(&sent[..8], &[0, 8, 16, 24, 32, 40, 48, 56]);
    }

    #[test]
    fn test_burst_spreads_across_rows() {
        let interleaver = BlockInterleaver::packet();
        // Any 8 consecutive transmitted bytes map to 8 distinct codeword rows
        for start in 0..=(PACKET_BYTES - 8) {
            let mut rows: Vec<usize> = (0..PACKET_BYTES)
                .filter(|&i| (start..start + 8).contains(&interleaver.position_of(i)))
                .map(|i| i / INTERLEAVE_COLS)
                .collect();
            rows.sort_unstable();
            rows.dedup();
            assert_eq!(rows.len(), 8, "burst at {}", start);
        }
    }

    #[test]
    fn test_invalid_length() {
        let interleaver = BlockInterleaver::packet();
        assert!(interleaver.interleave(&[0u8; 63]).is_err());
        assert!(interleaver.deinterleave(&[0u8; 65]).is_err());
        assert!(BlockInterleaver::new(0, 4).is_err());
    }

    #[quickcheck]
    fn prop_deinterleave_inverts(data: Vec<u8>) -> bool {
        let interleaver = BlockInterleaver::new(8, 8).unwrap();
        let whole = data.len() - data.len() % 64;
        let data = &data[..whole];
        interleaver.deinterleave(&interleaver.interleave(data).unwrap()).unwrap() == data
    }

    #[quickcheck]
    fn prop_packet_helpers_invert(seed: Vec<u8>) -> bool {
        let packet: [u8; PACKET_BYTES] =
            std::array::from_fn(|i| seed.get(i).copied().unwrap_or(i as u8 ^ 0xa5));
        deinterleave_packet(&interleave_packet(&packet)) == packet
    }
}
