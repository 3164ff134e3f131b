//! Reed-Solomon forward error correction over GF(2^8)
//!
//! Systematic encoding (data followed by parity). Decoding runs syndrome
//! computation, Berlekamp-Massey, Chien search and Forney's algorithm, and
//! verifies the corrected word before accepting it.
//!
//! Byte `i` of an `n`-byte codeword is the coefficient of `x^(n-1-i)`.

use crate::gf;
use crate::{FrameError, Result};
use cosbit_core::protocol::{DATA_BYTES, PACKET_BYTES};
use std::sync::OnceLock;
use tracing::trace;

/// Result of a successful decode
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Correction {
    /// The `k` data bytes
    pub data: Vec<u8>,
    /// Number of byte positions that were repaired
    pub corrected: usize,
}

/// Reed-Solomon encoder/decoder
#[derive(Debug, Clone)]
pub struct ReedSolomon {
    n: usize, // Total symbols
    k: usize, // Data symbols
    /// Generator polynomial, descending degree, monic
    generator: Vec<u8>,
}

impl ReedSolomon {
    /// Create a new Reed-Solomon codec
    pub fn new(n: usize, k: usize) -> Result<Self> {
        if k == 0 || n <= k {
            return Err(FrameError::InvalidFecParameters {
                msg: format!("Invalid RS parameters: n={}, k={}", n, k),
            });
        }

        if n > gf::FIELD_ORDER {
            return Err(FrameError::InvalidFecParameters {
                msg: format!("RS block size too large: {}", n),
            });
        }

        if (n - k) % 2 != 0 {
            return Err(FrameError::InvalidFecParameters {
                msg: format!("RS parity length must be even, got {}", n - k),
            });
        }

        Ok(Self::build(n, k))
    }

    /// RS(64,48): the packet code, built once per process
    pub fn packet() -> &'static Self {
        static PACKET: OnceLock<ReedSolomon> = OnceLock::new();
        PACKET.get_or_init(|| Self::build(PACKET_BYTES, DATA_BYTES))
    }

    fn build(n: usize, k: usize) -> Self {
        // Π (x - α^i) for i in 0..n-k
        let mut generator = vec![1u8];
        for i in 0..(n - k) {
            let root = gf::alpha_pow(i);
            let mut next = vec![0u8; generator.len() + 1];
            for (j, &c) in generator.iter().enumerate() {
                next[j] ^= c;
                next[j + 1] ^= gf::mul(c, root);
            }
            generator = next;
        }
        Self { n, k, generator }
    }

    pub fn n(&self) -> usize {
        self.n
    }

    pub fn k(&self) -> usize {
        self.k
    }

    /// Parity symbols per block
    pub fn parity_len(&self) -> usize {
        self.n - self.k
    }

    /// Byte errors that are always correctable
    pub fn correctable(&self) -> usize {
        self.parity_len() / 2
    }

    /// Get the code rate (k/n)
    pub fn code_rate(&self) -> f64 {
        self.k as f64 / self.n as f64
    }

    /// Encode exactly `k` data bytes into an `n` byte codeword
    pub fn encode(&self, data: &[u8]) -> Result<Vec<u8>> {
        if data.len() != self.k {
            return Err(FrameError::SizeMismatch {
                expected: self.k,
                actual: data.len(),
            });
        }

        // Remainder of data·x^(n-k) divided by the generator
        let mut work = data.to_vec();
        work.resize(self.n, 0);
        for i in 0..self.k {
            let coef = work[i];
            if coef != 0 {
                for (j, &g) in self.generator.iter().enumerate().skip(1) {
                    work[i + j] ^= gf::mul(g, coef);
                }
            }
        }

        let mut encoded = data.to_vec();
        encoded.extend_from_slice(&work[self.k..]);
        Ok(encoded)
    }

    /// Syndromes `S_j = r(α^j)` for `j` in `0..n-k`
    pub fn syndromes(&self, codeword: &[u8]) -> Vec<u8> {
        (0..self.parity_len())
            .map(|j| gf::poly_eval_desc(codeword, gf::alpha_pow(j)))
            .collect()
    }

    /// Decode an `n` byte codeword, correcting up to `(n-k)/2` byte errors
    pub fn decode(&self, codeword: &[u8]) -> Result<Correction> {
        if codeword.len() != self.n {
            return Err(FrameError::SizeMismatch {
                expected: self.n,
                actual: codeword.len(),
            });
        }

        let syndromes = self.syndromes(codeword);
        if syndromes.iter().all(|&s| s == 0) {
            return Ok(Correction {
                data: codeword[..self.k].to_vec(),
                corrected: 0,
            });
        }

        let locator = self.error_locator(&syndromes)?;
        let positions = self.error_positions(&locator)?;
        let magnitudes = self.error_magnitudes(&syndromes, &locator, &positions)?;

        let mut repaired = codeword.to_vec();
        for (&pos, &mag) in positions.iter().zip(&magnitudes) {
            repaired[pos] ^= mag;
        }

        if self.syndromes(&repaired).iter().any(|&s| s != 0) {
            return Err(FrameError::Uncorrectable {
                msg: "corrected word fails syndrome check".to_string(),
            });
        }

        trace!(corrected = positions.len(), "RS block repaired");
        Ok(Correction {
            data: repaired[..self.k].to_vec(),
            corrected: positions.len(),
        })
    }

    /// Berlekamp-Massey. Returns Λ(x) in ascending order, trimmed to its degree.
    fn error_locator(&self, syndromes: &[u8]) -> Result<Vec<u8>> {
        let p = self.parity_len();
        let mut c = vec![0u8; p + 1];
        let mut b = vec![0u8; p + 1];
        c[0] = 1;
        b[0] = 1;
        let mut l = 0usize;
        let mut m = 1usize;
        let mut last_discrepancy = 1u8;

        for step in 0..p {
            let mut d = syndromes[step];
            for i in 1..=l {
                d ^= gf::mul(c[i], syndromes[step - i]);
            }

            if d == 0 {
                m += 1;
                continue;
            }

            let coef = gf::div(d, last_discrepancy).ok_or_else(|| FrameError::Uncorrectable {
                msg: "zero discrepancy in locator update".to_string(),
            })?;
            let previous = c.clone();
            for i in 0..(p + 1).saturating_sub(m) {
                c[i + m] ^= gf::mul(coef, b[i]);
            }

            if 2 * l <= step {
                l = step + 1 - l;
                b = previous;
                last_discrepancy = d;
                m = 1;
            } else {
                m += 1;
            }
        }

        if 2 * l > p {
            return Err(FrameError::Uncorrectable {
                msg: format!("error locator degree {} exceeds {}", l, self.correctable()),
            });
        }

        c.truncate(l + 1);
        Ok(c)
    }

    /// Chien search: byte indices whose locator `α^(n-1-i)` is a root of Λ(x⁻¹)
    fn error_positions(&self, locator: &[u8]) -> Result<Vec<usize>> {
        let degree = locator.len() - 1;
        let positions: Vec<usize> = (0..self.n)
            .filter(|&i| {
                let x_inv = gf::alpha_pow(gf::FIELD_ORDER - (self.n - 1 - i));
                gf::poly_eval_asc(locator, x_inv) == 0
            })
            .collect();

        if positions.len() != degree {
            return Err(FrameError::Uncorrectable {
                msg: format!(
                    "locator degree {} but {} roots found",
                    degree,
                    positions.len()
                ),
            });
        }
        Ok(positions)
    }

    /// Forney: `e = X · Ω(X⁻¹) / Λ'(X⁻¹)` with `Ω = S·Λ mod x^(n-k)`
    fn error_magnitudes(
        &self,
        syndromes: &[u8],
        locator: &[u8],
        positions: &[usize],
    ) -> Result<Vec<u8>> {
        let p = self.parity_len();
        let mut omega = vec![0u8; p];
        for (i, o) in omega.iter_mut().enumerate() {
            for (j, &lambda) in locator.iter().enumerate().take(i + 1) {
                *o ^= gf::mul(syndromes[i - j], lambda);
            }
        }

        positions
            .iter()
            .map(|&pos| {
                let x = gf::alpha_pow(self.n - 1 - pos);
                let x_inv = gf::inv(x).ok_or_else(|| FrameError::Uncorrectable {
                    msg: "zero error locator".to_string(),
                })?;

                let numerator = gf::poly_eval_asc(&omega, x_inv);
                // Formal derivative keeps only the odd-degree terms
                let denominator = locator
                    .iter()
                    .enumerate()
                    .skip(1)
                    .step_by(2)
                    .fold(0u8, |acc, (k, &lambda)| acc ^ gf::mul(lambda, gf::pow(x_inv, k - 1)));

                let ratio = gf::div(numerator, denominator).ok_or_else(|| {
                    FrameError::Uncorrectable {
                        msg: format!("zero locator derivative at byte {}", pos),
                    }
                })?;
                Ok(gf::mul(x, ratio))
            })
            .collect()
    }
}
