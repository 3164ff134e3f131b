//! GF(2^8) arithmetic
//!
//! Log/antilog tables for the field generated by `α = 2` modulo
//! [`GF_PRIMITIVE_POLY`]. The tables are built once per process on first
//! use and are read-only afterwards.

use cosbit_core::protocol::GF_PRIMITIVE_POLY;
use std::sync::OnceLock;

/// Number of non-zero field elements
pub const FIELD_ORDER: usize = 255;

struct Tables {
    exp: [u8; 512],
    log: [u8; 256],
}

fn tables() -> &'static Tables {
    static TABLES: OnceLock<Tables> = OnceLock::new();
    TABLES.get_or_init(|| {
        let mut exp = [0u8; 512];
        let mut log = [0u8; 256];

        let mut x: u16 = 1;
        for i in 0..FIELD_ORDER {
            exp[i] = x as u8;
            log[x as usize] = i as u8;
            x <<= 1;
            if x & 0x100 != 0 {
                x ^= GF_PRIMITIVE_POLY;
            }
        }
        // Doubled so exp[log a + log b] never needs a reduction
        for i in FIELD_ORDER..exp.len() {
            exp[i] = exp[i - FIELD_ORDER];
        }

        Tables { exp, log }
    })
}

/// Field addition (and subtraction)
#[inline]
pub fn add(a: u8, b: u8) -> u8 {
    a ^ b
}

#[inline]
pub fn mul(a: u8, b: u8) -> u8 {
    if a == 0 || b == 0 {
        return 0;
    }
    let t = tables();
    t.exp[t.log[a as usize] as usize + t.log[b as usize] as usize]
}

/// Multiplicative inverse, `None` for zero
#[inline]
pub fn inv(a: u8) -> Option<u8> {
    if a == 0 {
        return None;
    }
    let t = tables();
    Some(t.exp[FIELD_ORDER - t.log[a as usize] as usize])
}

/// `a / b`, `None` when dividing by zero
#[inline]
pub fn div(a: u8, b: u8) -> Option<u8> {
    inv(b).map(|b_inv| mul(a, b_inv))
}

/// `α^e` for any exponent (reduced modulo the field order)
#[inline]
pub fn alpha_pow(e: usize) -> u8 {
    tables().exp[e % FIELD_ORDER]
}

/// `a^e`
pub fn pow(a: u8, e: usize) -> u8 {
    if e == 0 {
        return 1;
    }
    if a == 0 {
        return 0;
    }
    let log_a = tables().log[a as usize] as usize;
    alpha_pow(log_a * e)
}

/// Evaluate a polynomial with coefficients in descending degree order
pub fn poly_eval_desc(coeffs: &[u8], x: u8) -> u8 {
    coeffs.iter().fold(0, |acc, &c| mul(acc, x) ^ c)
}

/// Evaluate a polynomial with coefficients in ascending degree order
pub fn poly_eval_asc(coeffs: &[u8], x: u8) -> u8 {
    coeffs.iter().rev().fold(0, |acc, &c| mul(acc, x) ^ c)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alpha_generates_field() {
        let mut seen = [false; 256];
        for e in 0..FIELD_ORDER {
            let v = alpha_pow(e);
            assert_ne!(v, 0);
            assert!(!seen[v as usize], "alpha^{} repeats", e);
            seen[v as usize] = true;
        }
        assert_eq!(alpha_pow(FIELD_ORDER), 1);
    }

    #[test]
    fn test_primitive_reduction() {
        // α^8 = x^4 + x^3 + x^2 + 1
        assert_eq!(alpha_pow(8), 0x1d);
    }

    #[test]
    fn test_mul_identity_and_zero() {
        for a in 0..=255u8 {
            assert_eq!(mul(a, 1), a);
            assert_eq!(mul(a, 0), 0);
        }
    }

    #[test]
    fn test_inverse_roundtrip() {
        assert_eq!(inv(0), None);
        for a in 1..=255u8 {
            let a_inv = inv(a).unwrap();
            assert_eq!(mul(a, a_inv), 1);
            assert_eq!(div(a, a), Some(1));
        }
    }

    #[test]
    fn test_pow_matches_repeated_mul() {
        for a in [0u8, 1, 2, 3, 0x53, 0xff] {
            let mut acc = 1u8;
            for e in 0..10 {
                assert_eq!(pow(a, e), acc);
                acc = mul(acc, a);
            }
        }
    }

    #[test]
    fn test_poly_eval_orders_agree() {
        let asc = [3u8, 0, 7, 1];
        let desc: Vec<u8> = asc.iter().rev().copied().collect();
        for x in [0u8, 1, 2, 0x80, 0xfe] {
            assert_eq!(poly_eval_asc(&asc, x), poly_eval_desc(&desc, x));
        }
    }
}
