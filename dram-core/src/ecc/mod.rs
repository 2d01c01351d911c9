//! ECC schemes: layout descriptor + retirement-aware codec selection +
//! decode pipeline + optional postprocess (spec.md §4.5).

pub mod plain;
pub mod vecc;
pub mod xed;

use crate::bitblock::BitBlock;
use crate::error_type::ErrorType;
use crate::fault_domain::FaultDomain;
use crate::rng::SimRng;

/// Common contract for every ECC scheme. `decode` takes the `FaultDomain`
/// (read-only: codec selection depends on its current retirement state),
/// the already-materialized cacheline, and the run's shared PRNG (XED's
/// catch-word collision draw and diagnosis tie-break need one; spec.md's
/// Design Note threads the generator as a parameter everywhere, never a
/// global).
pub trait Ecc {
    /// Total cacheline width in bits this scheme operates over.
    fn channel_width(&self) -> usize;

    fn decode(&self, fd: &FaultDomain, cacheline: &BitBlock, rng: &mut SimRng) -> ErrorType;

    /// Clear any scratch/postprocess state between iterations.
    fn clear(&mut self);
}
