//! Error type for configuration and sampling failures.
//!
//! Simulated DRAM outcomes (NE/CE/DUE/SDC, see [`crate::error_type::ErrorType`])
//! are never represented here — they are first-class return values, not
//! failures of the program.

use thiserror::Error;

/// All errors produced by dram-core.
#[derive(Debug, Error)]
pub enum SimError {
    #[error("codec width mismatch: {bit_n} bits does not divide into {chunk} symbol(s)")]
    WidthMismatch { bit_n: usize, chunk: usize },

    #[error("invalid codec parameters: {0}")]
    InvalidCodec(String),

    #[error("unrecognized fault kind: {0}")]
    UnknownFaultKind(String),

    #[error("empty fault domain list")]
    EmptyDomainGroup,

    #[error("empty weighted list: cannot sample")]
    EmptyWeightedList,

    #[error("geometry invariant violated: {0}")]
    InvalidGeometry(String),
}

pub type Result<T> = std::result::Result<T, SimError>;
