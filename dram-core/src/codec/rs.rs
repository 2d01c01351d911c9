//! Reed-Solomon symbol codec: `RS<p,m>(n,r,t)` from spec.md §4.2.
//!
//! Systematic encoding against a cached generator polynomial; decoding runs
//! syndromes -> Berlekamp-Massey -> Chien search -> Forney, the classic
//! textbook pipeline, generalized over any `(n, r, t)` with symbols in
//! GF(2^8) or GF(2^16) (see [`crate::codec::gf`]).

use std::collections::BTreeSet;
use std::sync::Arc;

use crate::bitblock::BitBlock;
use crate::codec::gf::GaloisField;
use crate::codec::Codec;
use crate::error_type::ErrorType;

/// A Reed-Solomon codec over `n` symbols (`k` data, `r = n - k` parity),
/// correcting up to `t = r / 2` symbol errors.
pub struct ReedSolomon {
    field: Arc<GaloisField>,
    n: usize,
    k: usize,
    t: usize,
    /// Symbol width in bits (8 or 16, matching the field's `m`).
    sym_bits: u32,
    /// Cached generator polynomial, highest-degree term first, length `r+1`.
    generator: Vec<u32>,
    name: String,
}

impl ReedSolomon {
    /// `field` is shared (spec.md: "cache generator polynomial and field
    /// tables") so multiple codec instances over the same symbol field don't
    /// rebuild log/antilog tables.
    pub fn new(field: Arc<GaloisField>, n: usize, r: usize, t: usize) -> Self {
        assert!(n > r, "codeword must carry more symbols than parity");
        assert!(n as u32 <= field.order, "n exceeds field size");
        let k = n - r;
        let generator = Self::build_generator(&field, r);
        let name = format!("RS(2,{},{},{},{})", field.m, n, r, t);
        ReedSolomon {
            field,
            n,
            k,
            t,
            sym_bits: field.m,
            generator,
            name,
        }
    }

    /// `g(x) = prod_{i=0}^{r-1} (x - alpha^i)`, highest-degree term first.
    fn build_generator(field: &GaloisField, r: usize) -> Vec<u32> {
        let mut g = vec![1u32];
        for i in 0..r {
            let root = field.pow(2, i as i64);
            g = field.poly_mul(&g, &[1, root]);
        }
        g
    }

    fn symbol(&self, block: &BitBlock, idx: usize) -> u32 {
        let base = idx * self.sym_bits as usize;
        let mut v = 0u32;
        for b in 0..self.sym_bits as usize {
            if block.get_bit(base + b) {
                v |= 1 << b;
            }
        }
        v
    }

    fn set_symbol(&self, block: &mut BitBlock, idx: usize, value: u32) {
        let base = idx * self.sym_bits as usize;
        for b in 0..self.sym_bits as usize {
            block.set_bit(base + b, (value >> b) & 1 != 0);
        }
    }

    fn syndromes(&self, received: &[u32]) -> Vec<u32> {
        (0..(self.n - self.k))
            .map(|i| {
                let alpha_i = self.field.pow(2, i as i64);
                // Evaluate received(x) at alpha^i; received is stored
                // highest-degree-symbol-first (symbol 0 = most significant).
                self.field.poly_eval(received, alpha_i)
            })
            .collect()
    }

    /// Berlekamp-Massey: returns the error locator polynomial (highest-degree
    /// first), or `None` if it can't determine one within `t` errors.
    fn berlekamp_massey(&self, syndromes: &[u32]) -> Option<Vec<u32>> {
        let f = &self.field;
        let mut c = vec![1u32]; // error locator, low-degree-first internally
        let mut b = vec![1u32];
        let mut l = 0usize;
        let mut m = 1i64;
        let mut bb = 1u32;

        for n_iter in 0..syndromes.len() {
            // discrepancy
            let mut delta = syndromes[n_iter];
            for i in 1..=l {
                if i < c.len() {
                    delta ^= f.mul(c[i], syndromes[n_iter - i]);
                }
            }
            if delta == 0 {
                m += 1;
            } else if 2 * l <= n_iter {
                let t_poly = c.clone();
                let coef = f.div(delta, bb);
                let shifted = Self::shift_right(&b, m as usize);
                c = Self::poly_xor_lowfirst(&c, &self.scale_lowfirst(&shifted, coef));
                l = n_iter + 1 - l;
                b = t_poly;
                bb = delta;
                m = 1;
            } else {
                let coef = f.div(delta, bb);
                let shifted = Self::shift_right(&b, m as usize);
                c = Self::poly_xor_lowfirst(&c, &self.scale_lowfirst(&shifted, coef));
                m += 1;
            }
        }

        if l > self.t {
            return None;
        }
        // convert low-degree-first -> high-degree-first for the caller.
        let mut hi = c.clone();
        hi.reverse();
        Some(hi)
    }

    fn shift_right(poly: &[u32], amount: usize) -> Vec<u32> {
        let mut out = vec![0u32; amount];
        out.extend_from_slice(poly);
        out
    }

    fn scale_lowfirst(&self, poly: &[u32], scalar: u32) -> Vec<u32> {
        poly.iter().map(|&c| self.field.mul(scalar, c)).collect()
    }

    fn poly_xor_lowfirst(a: &[u32], b: &[u32]) -> Vec<u32> {
        let len = a.len().max(b.len());
        let mut out = vec![0u32; len];
        for (i, &v) in a.iter().enumerate() {
            out[i] ^= v;
        }
        for (i, &v) in b.iter().enumerate() {
            out[i] ^= v;
        }
        out
    }

    /// Chien search: roots of the error locator give error positions
    /// (indices from the low end of the codeword, symbol 0 = x^(n-1)).
    fn chien_search(&self, locator_hi_first: &[u32]) -> Option<Vec<usize>> {
        let f = &self.field;
        let deg = locator_hi_first.len() - 1;
        let mut positions = Vec::new();
        for i in 0..self.n {
            // root candidate is alpha^(-i); locator evaluated low-degree-first
            let x_inv = f.pow(2, -(i as i64));
            let val = f.poly_eval(locator_hi_first, x_inv);
            if val == 0 {
                positions.push(i);
            }
        }
        if positions.len() == deg {
            Some(positions)
        } else {
            None
        }
    }

    /// Forney algorithm: compute error magnitudes at the given positions.
    fn forney(&self, syndromes: &[u32], locator_hi_first: &[u32], positions: &[usize]) -> Vec<u32> {
        let f = &self.field;
        // Error evaluator: Omega(x) = S(x) * Lambda(x) mod x^(r)
        let r = syndromes.len();
        let s_lowfirst: Vec<u32> = syndromes.iter().rev().cloned().collect();
        let mut lambda_lowfirst = locator_hi_first.to_vec();
        lambda_lowfirst.reverse();
        let full = f.poly_mul(&Self::rev_to_hi(&s_lowfirst), &Self::rev_to_hi(&lambda_lowfirst));
        // full is high-first; truncate to the low r terms (mod x^r) by
        // keeping the last r coefficients.
        let start = full.len().saturating_sub(r);
        let omega_hi = full[start..].to_vec();

        // Formal derivative of locator (low-degree-first), dropping even-power terms.
        let mut lambda_prime_low = vec![0u32; lambda_lowfirst.len().saturating_sub(1)];
        for (i, coef) in lambda_lowfirst.iter().enumerate().skip(1) {
            if i % 2 == 1 {
                lambda_prime_low[i - 1] = *coef;
            }
        }

        positions
            .iter()
            .map(|&pos| {
                let x_inv = f.pow(2, -(pos as i64));
                let omega_val = f.poly_eval(&omega_hi, x_inv);
                let lp_hi: Vec<u32> = lambda_prime_low.iter().rev().cloned().collect();
                let lp_val = f.poly_eval(&lp_hi, x_inv);
                if lp_val == 0 {
                    0
                } else {
                    f.div(omega_val, lp_val)
                }
            })
            .collect()
    }

    fn rev_to_hi(low_first: &[u32]) -> Vec<u32> {
        let mut v = low_first.to_vec();
        v.reverse();
        v
    }
}

impl Codec for ReedSolomon {
    fn bit_n(&self) -> usize {
        self.n * self.sym_bits as usize
    }

    fn bit_k(&self) -> usize {
        self.k * self.sym_bits as usize
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn encode(&self, data: &BitBlock) -> BitBlock {
        debug_assert_eq!(data.bit_n(), self.bit_k());
        let data_syms: Vec<u32> = (0..self.k).map(|i| self.symbol(data, i)).collect();
        // Systematic encode: message * x^r mod g(x), parity = remainder.
        let r = self.n - self.k;
        let mut shifted = data_syms.clone();
        shifted.extend(std::iter::repeat(0u32).take(r));
        let (_, remainder) = self.field.poly_div(&shifted, &self.generator);

        let mut out = BitBlock::new(self.bit_n());
        for (i, &s) in data_syms.iter().enumerate() {
            self.set_symbol(&mut out, i, s);
        }
        let pad = r - remainder.len();
        for i in 0..r {
            let v = if i < pad { 0 } else { remainder[i - pad] };
            self.set_symbol(&mut out, self.k + i, v);
        }
        out
    }

    fn decode(&self, received: &BitBlock) -> (ErrorType, BitBlock, BTreeSet<usize>) {
        debug_assert_eq!(received.bit_n(), self.bit_n());
        if received.is_zero() {
            return (ErrorType::Ne, received.clone(), BTreeSet::new());
        }

        let syms: Vec<u32> = (0..self.n).map(|i| self.symbol(received, i)).collect();
        let syndromes = self.syndromes(&syms);
        if syndromes.iter().all(|&s| s == 0) {
            return (ErrorType::Ne, received.clone(), BTreeSet::new());
        }

        let locator = match self.berlekamp_massey(&syndromes) {
            Some(l) => l,
            None => return (ErrorType::Due, received.clone(), BTreeSet::new()),
        };
        let num_errors = locator.len() - 1;
        if num_errors == 0 || num_errors > self.t {
            return (ErrorType::Due, received.clone(), BTreeSet::new());
        }

        let positions = match self.chien_search(&locator) {
            Some(p) if p.len() == num_errors => p,
            _ => return (ErrorType::Due, received.clone(), BTreeSet::new()),
        };

        let magnitudes = self.forney(&syndromes, &locator, &positions);
        let mut corrected = received.clone();
        let mut corrected_positions = BTreeSet::new();
        for (&pos, &mag) in positions.iter().zip(magnitudes.iter()) {
            // pos counted from the low end (parity side); convert to
            // symbol index from the high end as stored in the block.
            let sym_idx = self.n - 1 - pos;
            let current = self.symbol(&corrected, sym_idx);
            self.set_symbol(&mut corrected, sym_idx, current ^ mag);
            corrected_positions.insert(sym_idx);
        }

        (ErrorType::Ce, corrected, corrected_positions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rs_8() -> ReedSolomon {
        ReedSolomon::new(Arc::new(GaloisField::gf8()), 18, 2, 1)
    }

    #[test]
    fn encode_decode_roundtrip_no_error() {
        let rs = rs_8();
        let mut data = BitBlock::new(rs.bit_k());
        for i in 0..rs.bit_k() {
            if i % 5 == 0 {
                data.set_bit(i, true);
            }
        }
        let codeword = rs.encode(&data);
        let (et, corrected, positions) = rs.decode(&codeword);
        assert_eq!(et, ErrorType::Ne);
        assert!(positions.is_empty());
        assert_eq!(corrected, codeword);
    }

    #[test]
    fn single_symbol_error_is_corrected() {
        let rs = rs_8();
        let mut data = BitBlock::new(rs.bit_k());
        data.set_bit(3, true);
        data.set_bit(10, true);
        let codeword = rs.encode(&data);

        let mut corrupted = codeword.clone();
        corrupted.inv_bit(4); // flip a bit within symbol 0

        let (et, corrected, positions) = rs.decode(&corrupted);
        assert_eq!(et, ErrorType::Ce);
        assert!(!positions.is_empty());
        assert_eq!(corrected, codeword);
    }

    #[test]
    fn zero_codeword_is_ne() {
        let rs = rs_8();
        let zero = BitBlock::new(rs.bit_n());
        let (et, _, positions) = rs.decode(&zero);
        assert_eq!(et, ErrorType::Ne);
        assert!(positions.is_empty());
    }
}
