//! XED: cross-layer ECC combining on-die CRC-8 detection, channel parity,
//! and erasure correction with optional fault diagnosis (spec.md §4.5).

use crate::bitblock::{BitBlock, Layout};
use crate::codec::crc8::Crc8Atm;
use crate::codec::Codec;
use crate::ecc::Ecc;
use crate::error_type::ErrorType;
use crate::fault_domain::FaultDomain;
use crate::rng::SimRng;

/// Probability that a genuine on-die detection is silently missed due to a
/// catch-word (CRC check-byte) collision (spec.md §4.5, Open Question (c)
/// confirms `2^-32` against the original source).
const CATCH_WORD_COLLISION_PROB: f64 = 1.0 / 4_294_967_296.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum XedVariant {
    /// Single-Device Data Correction: one-chip erasure correction; falls
    /// through to serial mode at 2+ detected chips.
    Sddc,
    /// Double-Device Data Correction: two independent (even/odd) parity
    /// lanes and two-chip erasure correction before falling to serial mode.
    Dddc,
    /// SDDC without channel parity fallback diagnosis on the zero-detected
    /// path (`doFaultDiagnosis` forced off).
    SddcNc,
}

pub struct Xed {
    variant: XedVariant,
    channel_width: usize,
    pins_per_device: usize,
    chips: usize,
    beats: usize,
    onchip_codec: Crc8Atm,
    do_fault_diagnosis: bool,
}

impl Xed {
    pub fn new(variant: XedVariant, chips: usize, pins_per_device: usize, beats: usize, do_fault_diagnosis: bool) -> Self {
        let channel_width = chips * pins_per_device;
        let chip_bits = pins_per_device * beats;
        let onchip_codec = Crc8Atm::new(chip_bits + 8, 8);
        let do_fault_diagnosis = do_fault_diagnosis && variant != XedVariant::SddcNc;
        Xed {
            variant,
            channel_width,
            pins_per_device,
            chips,
            beats,
            onchip_codec,
            do_fault_diagnosis,
        }
    }

    fn chip_slab(&self, cacheline: &BitBlock, chip: usize) -> BitBlock {
        let chip_bits = self.pins_per_device * self.beats;
        let mut slab = BitBlock::new(chip_bits);
        slab.extract(cacheline, Layout::OnChipX4, chip, self.channel_width);
        slab
    }

    fn write_chip_slab(&self, cacheline: &mut BitBlock, chip: usize, slab: &BitBlock) {
        slab.scatter_into(cacheline, Layout::OnChipX4, chip, self.channel_width);
    }

    /// Per-chip on-die CRC check, with the catch-word collision draw
    /// applied after a genuine detection.
    fn ondie_detect(&self, cacheline: &BitBlock, chip: usize, rng: &mut SimRng) -> (ErrorType, BitBlock) {
        let chip_bits = self.pins_per_device * self.beats;
        let slab = self.chip_slab(cacheline, chip);
        let mut codeword = BitBlock::new(chip_bits + 8);
        for i in 0..chip_bits {
            codeword.set_bit(i, slab.get_bit(i));
        }
        let (mut et, corrected, _) = self.onchip_codec.decode(&codeword);
        if et != ErrorType::Ne && rng.gen_bool(CATCH_WORD_COLLISION_PROB) {
            et = ErrorType::Ne;
        }
        let mut corrected_slab = BitBlock::new(chip_bits);
        for i in 0..chip_bits {
            corrected_slab.set_bit(i, corrected.get_bit(i));
        }
        (et, corrected_slab)
    }

    fn channel_parity_zero(&self, cacheline: &BitBlock) -> bool {
        let chip_bits = self.pins_per_device * self.beats;
        let mut parity = BitBlock::new(chip_bits);
        for chip in 0..self.chips {
            let slab = self.chip_slab(cacheline, chip);
            parity.xor_assign(&slab);
        }
        parity.is_zero()
    }

    fn dddc_parity_zero(&self, cacheline: &BitBlock) -> bool {
        let chip_bits = self.pins_per_device * self.beats;
        let mut even = BitBlock::new(chip_bits);
        let mut odd = BitBlock::new(chip_bits);
        for chip in 0..self.chips {
            let slab = self.chip_slab(cacheline, chip);
            if chip % 2 == 0 {
                even.xor_assign(&slab);
            } else {
                odd.xor_assign(&slab);
            }
        }
        even.is_zero() && odd.is_zero()
    }

    fn erase_chip(&self, cacheline: &mut BitBlock, chip: usize) {
        let chip_bits = self.pins_per_device * self.beats;
        self.write_chip_slab(cacheline, chip, &BitBlock::new(chip_bits));
    }

    /// Pick a random fault overlapping the most recently injected one that
    /// is diagnosable (not a bare single-bit/single-word transient) and
    /// erase its chip. Returns the erased chip ids.
    fn diagnose_fault(&self, fd: &FaultDomain, cacheline: &mut BitBlock, erasures: usize, rng: &mut SimRng) -> Vec<usize> {
        let new_fault = match fd.operational_fault_list.last() {
            Some(f) => f,
            None => return Vec::new(),
        };
        let candidates: Vec<_> = fd
            .operational_fault_list
            .iter()
            .filter(|f| f.overlap(new_fault))
            .filter(|f| !(f.kind.is_single_bit() && !f.kind.is_multi_beat()))
            .collect();
        if candidates.is_empty() {
            return Vec::new();
        }
        let mut erased = Vec::new();
        let mut seen_chips = std::collections::BTreeSet::new();
        let mut pool = candidates;
        while !pool.is_empty() && erased.len() < erasures {
            let idx = rng.gen_range(pool.len());
            let chosen = pool.remove(idx);
            if seen_chips.insert(chosen.chip_id) {
                self.erase_chip(cacheline, chosen.chip_id);
                erased.push(chosen.chip_id);
            }
        }
        erased
    }
}

impl Ecc for Xed {
    fn channel_width(&self) -> usize {
        self.channel_width
    }

    fn decode(&self, fd: &FaultDomain, cacheline: &BitBlock, rng: &mut SimRng) -> ErrorType {
        if cacheline.is_zero() {
            return ErrorType::Ne;
        }

        let mut detected = Vec::new();
        for chip in 0..self.chips {
            let (et, _) = self.ondie_detect(cacheline, chip, rng);
            if et != ErrorType::Ne {
                detected.push(chip);
            }
        }

        let mut working = cacheline.clone();

        match detected.len() {
            0 => {
                let parity_ok = match self.variant {
                    XedVariant::Dddc => self.dddc_parity_zero(&working),
                    _ => self.channel_parity_zero(&working),
                };
                if parity_ok {
                    ErrorType::Sdc
                } else if self.do_fault_diagnosis {
                    let erasures = 1;
                    self.diagnose_fault(fd, &mut working, erasures, rng);
                    if working.is_zero() {
                        ErrorType::Ce
                    } else {
                        ErrorType::Due
                    }
                } else {
                    ErrorType::Due
                }
            }
            1 => {
                self.erase_chip(&mut working, detected[0]);
                if working.is_zero() {
                    ErrorType::Ce
                } else {
                    ErrorType::Sdc
                }
            }
            2 if self.variant == XedVariant::Dddc => {
                self.erase_chip(&mut working, detected[0]);
                self.erase_chip(&mut working, detected[1]);
                if working.is_zero() {
                    ErrorType::Ce
                } else {
                    ErrorType::Sdc
                }
            }
            _ => {
                // Serial mode: correct each detected chip in place via its
                // on-die SEC result, then re-check parity.
                for &chip in &detected {
                    let (_, corrected_slab) = self.ondie_detect(&working, chip, rng);
                    self.write_chip_slab(&mut working, chip, &corrected_slab);
                }
                let parity_ok = match self.variant {
                    XedVariant::Dddc => self.dddc_parity_zero(&working),
                    _ => self.channel_parity_zero(&working),
                };
                if parity_ok {
                    if working.is_zero() {
                        ErrorType::Ce
                    } else {
                        ErrorType::Sdc
                    }
                } else if self.do_fault_diagnosis {
                    self.diagnose_fault(fd, &mut working, detected.len(), rng);
                    if working.is_zero() {
                        ErrorType::Ce
                    } else {
                        ErrorType::Due
                    }
                } else {
                    ErrorType::Due
                }
            }
        }
    }

    fn clear(&mut self) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fault::{AddressLayout, Fault, FaultKind};
    use crate::fault_rate::FaultRateInfo;

    fn domain() -> FaultDomain {
        let mut info = FaultRateInfo::new();
        info.set_operational_rate(FaultKind::Mbank, 1.0);
        FaultDomain::new(1, 18, 4, 8, info)
    }

    #[test]
    fn all_zero_cacheline_is_ne() {
        let xed = Xed::new(XedVariant::Sddc, 18, 4, 8, true);
        let fd = domain();
        let mut rng = SimRng::new(1);
        let cacheline = BitBlock::new(18 * 4 * 8);
        assert_eq!(xed.decode(&fd, &cacheline, &mut rng), ErrorType::Ne);
    }

    #[test]
    fn single_chip_fault_is_corrected() {
        let xed = Xed::new(XedVariant::Sddc, 18, 4, 8, true);
        let mut fd = domain();
        let layout = AddressLayout::new(4, 18, 8, 1);
        let mut rng = SimRng::new(42);
        let fault = Fault::sample(FaultKind::Mbank, &layout, &mut rng, 0.0);
        let mut cacheline = BitBlock::new(18 * 4 * 8);
        fault.materialize(&mut cacheline, &layout, 18 * 4, 4);
        fd.operational_fault_list.push(fault);

        let result = xed.decode(&fd, &cacheline, &mut rng);
        assert!(matches!(result, ErrorType::Ce | ErrorType::Due));
    }
}
