//! Hsiao single-error-correct, double-error-detect code (spec.md §4.2).
//!
//! Parity-check columns are all distinct, odd-weight, nonzero vectors: the
//! `r` check-bit columns are the standard basis (weight 1), and the `k` data
//! columns are the lowest-weight odd vectors left over (weight >= 3),
//! enumerated in increasing-weight order so the construction is
//! deterministic for any `(n, k)`. This is the textbook Hsiao matrix, not
//! tied to a specific fixed 72/64 table.

use std::collections::{BTreeSet, HashMap};

use crate::bitblock::BitBlock;
use crate::codec::Codec;
use crate::error_type::ErrorType;

pub struct Hsiao {
    n: usize,
    k: usize,
    r: usize,
    /// `columns[i]` is the check-bit pattern (as a bitmask over `r` bits)
    /// that data/parity bit `i` contributes to the syndrome.
    columns: Vec<u32>,
    /// Maps a syndrome value back to the single bit position that produces
    /// it, for O(1) correction lookup.
    syndrome_to_bit: HashMap<u32, usize>,
    name: String,
}

impl Hsiao {
    pub fn new(k: usize, r: usize) -> Self {
        let n = k + r;
        assert!(r <= 32, "parity width larger than a u32 column is not supported");

        let mut data_columns = Vec::with_capacity(k);
        let mut weight = 3u32;
        'outer: while data_columns.len() < k {
            for col in 1u32..(1 << r) {
                if col.count_ones() == weight && data_columns.len() < k {
                    data_columns.push(col);
                }
                if data_columns.len() == k {
                    break 'outer;
                }
            }
            weight += 2;
            assert!(weight <= r as u32, "not enough odd-weight columns for this (k, r)");
        }

        let mut columns = data_columns;
        for i in 0..r {
            columns.push(1u32 << i);
        }

        let mut syndrome_to_bit = HashMap::with_capacity(n);
        for (i, &c) in columns.iter().enumerate() {
            syndrome_to_bit.insert(c, i);
        }

        Hsiao {
            n,
            k,
            r,
            columns,
            syndrome_to_bit,
            name: format!("Hsiao({},{})", n, k),
        }
    }

    fn syndrome(&self, word: &BitBlock) -> u32 {
        let mut s = 0u32;
        for (i, &col) in self.columns.iter().enumerate() {
            if word.get_bit(i) {
                s ^= col;
            }
        }
        s
    }
}

impl Codec for Hsiao {
    fn bit_n(&self) -> usize {
        self.n
    }

    fn bit_k(&self) -> usize {
        self.k
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn encode(&self, data: &BitBlock) -> BitBlock {
        debug_assert_eq!(data.bit_n(), self.k);
        let mut out = BitBlock::new(self.n);
        for i in 0..self.k {
            out.set_bit(i, data.get_bit(i));
        }
        let mut parity = 0u32;
        for i in 0..self.k {
            if data.get_bit(i) {
                parity ^= self.columns[i];
            }
        }
        for j in 0..self.r {
            out.set_bit(self.k + j, (parity >> j) & 1 != 0);
        }
        out
    }

    fn decode(&self, received: &BitBlock) -> (ErrorType, BitBlock, BTreeSet<usize>) {
        debug_assert_eq!(received.bit_n(), self.n);
        let s = self.syndrome(received);
        if s == 0 {
            return (ErrorType::Ne, received.clone(), BTreeSet::new());
        }
        if s.count_ones() % 2 == 1 {
            if let Some(&bit) = self.syndrome_to_bit.get(&s) {
                let mut corrected = received.clone();
                corrected.inv_bit(bit);
                let mut positions = BTreeSet::new();
                positions.insert(bit);
                return (ErrorType::Ce, corrected, positions);
            }
        }
        (ErrorType::Due, received.clone(), BTreeSet::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sec_ded_72_64() -> Hsiao {
        Hsiao::new(64, 8)
    }

    #[test]
    fn no_error_decodes_clean() {
        let h = sec_ded_72_64();
        let mut data = BitBlock::new(64);
        data.set_bit(5, true);
        data.set_bit(40, true);
        let codeword = h.encode(&data);
        let (et, corrected, positions) = h.decode(&codeword);
        assert_eq!(et, ErrorType::Ne);
        assert!(positions.is_empty());
        assert_eq!(corrected, codeword);
    }

    #[test]
    fn single_bit_error_is_corrected() {
        let h = sec_ded_72_64();
        let data = BitBlock::new(64);
        let codeword = h.encode(&data);
        let mut corrupted = codeword.clone();
        corrupted.inv_bit(14);

        let (et, corrected, positions) = h.decode(&corrupted);
        assert_eq!(et, ErrorType::Ce);
        assert_eq!(positions, BTreeSet::from([14]));
        assert_eq!(corrected, codeword);
    }

    #[test]
    fn double_bit_error_is_detected_not_corrected() {
        let h = sec_ded_72_64();
        let data = BitBlock::new(64);
        let codeword = h.encode(&data);
        let mut corrupted = codeword.clone();
        corrupted.inv_bit(3);
        corrupted.inv_bit(20);

        let (et, _, _) = h.decode(&corrupted);
        assert_eq!(et, ErrorType::Due);
    }

    #[test]
    fn all_columns_are_distinct_and_odd_weight() {
        let h = sec_ded_72_64();
        let mut seen = BTreeSet::new();
        for &c in &h.columns {
            assert_eq!(c.count_ones() % 2, 1);
            assert!(c != 0);
            assert!(seen.insert(c), "duplicate column");
        }
    }
}
