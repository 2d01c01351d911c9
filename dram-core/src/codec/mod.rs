//! Pure encode/decode codec family: Reed-Solomon, Hsiao SEC-DED, CRC-8-ATM.
//!
//! Every codec implements the same contract over fixed-width [`BitBlock`]s
//! and never touches fault-domain or retirement state — that belongs to the
//! `ecc` module, which selects a codec and feeds it cacheline slices.

pub mod crc8;
pub mod gf;
pub mod hsiao;
pub mod rs;

use std::collections::BTreeSet;

use crate::bitblock::BitBlock;
use crate::error_type::ErrorType;

/// Common contract for all codecs (spec.md §4.2).
pub trait Codec {
    /// Total codeword width in bits.
    fn bit_n(&self) -> usize;
    /// Data (message) width in bits.
    fn bit_k(&self) -> usize;
    fn name(&self) -> &str;

    fn encode(&self, data: &BitBlock) -> BitBlock;

    /// Decode a received codeword, returning the classification, the
    /// corrected word, and the set of bit/symbol positions that were
    /// flipped to arrive at it.
    fn decode(&self, received: &BitBlock) -> (ErrorType, BitBlock, BTreeSet<usize>);
}
