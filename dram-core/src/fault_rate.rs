//! Per-fault-kind rate tables and weighted sampling (spec.md §4.3).
//!
//! Numeric rate constants are themselves external inputs (spec.md's "OUT OF
//! SCOPE... the fault-rate constant tables"); this module owns the sampling
//! machinery only, taking rates as configuration.

use std::collections::HashMap;

use crate::error::{Result, SimError};
use crate::fault::{FaultKind, INHERENT_KINDS, OPERATIONAL_KINDS};
use crate::rng::SimRng;

/// Operational and inherent fault rates per [`FaultKind`], and the weighted
/// sampler built over them.
#[derive(Debug, Clone, Default)]
pub struct FaultRateInfo {
    operational: HashMap<FaultKind, f64>,
    inherent: HashMap<FaultKind, f64>,
}

impl FaultRateInfo {
    pub fn new() -> Self {
        FaultRateInfo::default()
    }

    pub fn set_operational_rate(&mut self, kind: FaultKind, rate: f64) {
        self.operational.insert(kind, rate);
    }

    pub fn set_inherent_rate(&mut self, kind: FaultKind, rate: f64) {
        self.inherent.insert(kind, rate);
    }

    pub fn operational_rate(&self, kind: FaultKind) -> f64 {
        self.operational.get(&kind).copied().unwrap_or(0.0)
    }

    pub fn inherent_rate(&self, kind: FaultKind) -> f64 {
        self.inherent.get(&kind).copied().unwrap_or(0.0)
    }

    /// Sum of all operational rates; the per-device contribution to a
    /// [`crate::fault_domain::FaultDomain`]'s aggregate fault rate.
    pub fn total_rate(&self) -> f64 {
        OPERATIONAL_KINDS.iter().map(|&k| self.operational_rate(k)).sum()
    }

    pub fn total_inherent_rate(&self) -> f64 {
        INHERENT_KINDS.iter().map(|&k| self.inherent_rate(k)).sum()
    }

    /// Pick an operational [`FaultKind`] with probability proportional to
    /// its rate.
    pub fn sample_kind(&self, rng: &mut SimRng) -> Result<FaultKind> {
        Self::weighted_pick(
            OPERATIONAL_KINDS.iter().map(|&k| (k, self.operational_rate(k))),
            rng,
        )
    }

    pub fn sample_inherent_kind(&self, rng: &mut SimRng) -> Result<FaultKind> {
        Self::weighted_pick(INHERENT_KINDS.iter().map(|&k| (k, self.inherent_rate(k))), rng)
    }

    /// Generic weighted draw: `u` in `[0,1)` scaled by the total weight,
    /// walking the list accumulating weight until it crosses `u`
    /// (spec.md's [`crate::domain_group::DomainGroup::pick_random_fd`] uses
    /// the identical walk).
    pub fn weighted_pick<I>(items: I, rng: &mut SimRng) -> Result<FaultKind>
    where
        I: Iterator<Item = (FaultKind, f64)>,
    {
        let entries: Vec<(FaultKind, f64)> = items.collect();
        let total: f64 = entries.iter().map(|(_, w)| w).sum();
        if total <= 0.0 || entries.is_empty() {
            return Err(SimError::EmptyWeightedList);
        }
        let u = rng.uniform_open01() * total;
        let mut acc = 0.0;
        for (kind, w) in &entries {
            acc += w;
            if u < acc {
                return Ok(*kind);
            }
        }
        // Floating-point drift: fall back to the last nonzero-weight entry.
        entries
            .iter()
            .rev()
            .find(|(_, w)| *w > 0.0)
            .map(|(k, _)| *k)
            .ok_or(SimError::EmptyWeightedList)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sampling_respects_zero_weight_kinds() {
        let mut info = FaultRateInfo::new();
        info.set_operational_rate(FaultKind::Sbit, 1.0);
        let mut rng = SimRng::new(9);
        for _ in 0..100 {
            assert_eq!(info.sample_kind(&mut rng).unwrap(), FaultKind::Sbit);
        }
    }

    #[test]
    fn empty_table_is_an_error() {
        let info = FaultRateInfo::new();
        let mut rng = SimRng::new(1);
        assert!(info.sample_kind(&mut rng).is_err());
    }

    #[test]
    fn total_rate_sums_all_operational_kinds() {
        let mut info = FaultRateInfo::new();
        info.set_operational_rate(FaultKind::Sbit, 0.3);
        info.set_operational_rate(FaultKind::Scol, 0.7);
        assert!((info.total_rate() - 1.0).abs() < 1e-12);
    }
}
