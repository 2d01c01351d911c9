//! Fault taxonomy, address mask model, and materialization into a cacheline
//! (spec.md §3, §4.3). Exact per-kind BASE/VARIABLE bit constants are an
//! external table in the original implementation (Open Question (a)); this
//! module derives them from domain geometry and a per-kind "variable field"
//! scope instead of a literal hardcoded table — see DESIGN.md.

use serde::{Deserialize, Serialize};

use crate::bitblock::BitBlock;
use crate::rng::SimRng;

/// One bit-field of the packed fault address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AddressField {
    Pin,
    Chip,
    Beat,
    Bank,
    BankGroup,
    Row,
    Col,
    Rank,
    Channel,
}

pub const ALL_FIELDS: [AddressField; 9] = [
    AddressField::Pin,
    AddressField::Chip,
    AddressField::Beat,
    AddressField::Bank,
    AddressField::BankGroup,
    AddressField::Row,
    AddressField::Col,
    AddressField::Rank,
    AddressField::Channel,
];

/// Bit offsets and widths for every [`AddressField`], derived once from a
/// [`crate::fault_domain::FaultDomain`]'s geometry plus fixed widths for the
/// fields the domain doesn't size explicitly (row/col/bank/bankgroup/channel
/// — spec.md's FaultDomain tracks only ranks/chips/pins/beats).
#[derive(Debug, Clone, Copy)]
pub struct AddressLayout {
    pin_bits: u32,
    chip_bits: u32,
    beat_bits: u32,
    bank_bits: u32,
    bankgroup_bits: u32,
    row_bits: u32,
    col_bits: u32,
    rank_bits: u32,
    channel_bits: u32,
}

fn bits_for(count: usize) -> u32 {
    if count <= 1 {
        1
    } else {
        (usize::BITS - (count - 1).leading_zeros()).max(1)
    }
}

impl AddressLayout {
    pub fn new(pins: usize, chips: usize, beats: usize, ranks: usize) -> Self {
        AddressLayout {
            pin_bits: bits_for(pins),
            chip_bits: bits_for(chips),
            beat_bits: bits_for(beats),
            bank_bits: 4,
            bankgroup_bits: 2,
            row_bits: 17,
            col_bits: 10,
            rank_bits: bits_for(ranks),
            channel_bits: 2,
        }
    }

    fn width(&self, field: AddressField) -> u32 {
        match field {
            AddressField::Pin => self.pin_bits,
            AddressField::Chip => self.chip_bits,
            AddressField::Beat => self.beat_bits,
            AddressField::Bank => self.bank_bits,
            AddressField::BankGroup => self.bankgroup_bits,
            AddressField::Row => self.row_bits,
            AddressField::Col => self.col_bits,
            AddressField::Rank => self.rank_bits,
            AddressField::Channel => self.channel_bits,
        }
    }

    fn offset(&self, field: AddressField) -> u32 {
        let mut off = 0;
        for &f in ALL_FIELDS.iter() {
            if f == field {
                return off;
            }
            off += self.width(f);
        }
        unreachable!()
    }

    pub fn field_mask(&self, field: AddressField) -> u64 {
        let w = self.width(field);
        let mask = if w >= 64 { u64::MAX } else { (1u64 << w) - 1 };
        mask << self.offset(field)
    }

    pub fn get_field(&self, addr: u64, field: AddressField) -> u64 {
        let w = self.width(field);
        let mask = if w >= 64 { u64::MAX } else { (1u64 << w) - 1 };
        (addr >> self.offset(field)) & mask
    }

    pub fn set_field(&self, addr: u64, field: AddressField, value: u64) -> u64 {
        let cleared = addr & !self.field_mask(field);
        cleared | ((value << self.offset(field)) & self.field_mask(field))
    }

    pub fn random_value(&self, field: AddressField, rng: &mut SimRng) -> u64 {
        let w = self.width(field);
        if w >= 64 {
            rng.gen_u64()
        } else {
            let span = 1usize << w;
            rng.gen_range(span) as u64
        }
    }
}

/// The ~20 fault modes of spec.md §3, plus six inherent (pre-existing weak
/// cell) categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FaultKind {
    Sbit,
    Sword,
    Scol,
    Srow,
    LocalWordline,
    Sbank,
    Mbank,
    Mrank,
    Channel,
    Blsa,
    BankPattern,
    Cdec,
    Csl,
    Mmodule,
    Rdec,
    Swd,
    Distbit,
    Mwl,
    Inherent1,
    Inherent2,
    Inherent3,
    Inherent4,
    Inherent5,
    Inherent6,
}

pub const OPERATIONAL_KINDS: [FaultKind; 18] = [
    FaultKind::Sbit,
    FaultKind::Sword,
    FaultKind::Scol,
    FaultKind::Srow,
    FaultKind::LocalWordline,
    FaultKind::Sbank,
    FaultKind::Mbank,
    FaultKind::Mrank,
    FaultKind::Channel,
    FaultKind::Blsa,
    FaultKind::BankPattern,
    FaultKind::Cdec,
    FaultKind::Csl,
    FaultKind::Mmodule,
    FaultKind::Rdec,
    FaultKind::Swd,
    FaultKind::Distbit,
    FaultKind::Mwl,
];

pub const INHERENT_KINDS: [FaultKind; 6] = [
    FaultKind::Inherent1,
    FaultKind::Inherent2,
    FaultKind::Inherent3,
    FaultKind::Inherent4,
    FaultKind::Inherent5,
    FaultKind::Inherent6,
];

impl FaultKind {
    pub fn name(self) -> &'static str {
        match self {
            FaultKind::Sbit => "SBIT",
            FaultKind::Sword => "SWORD",
            FaultKind::Scol => "SCOL",
            FaultKind::Srow => "SROW",
            FaultKind::LocalWordline => "LOCALWORDLINE",
            FaultKind::Sbank => "SBANK",
            FaultKind::Mbank => "MBANK",
            FaultKind::Mrank => "MRANK",
            FaultKind::Channel => "CHANNEL",
            FaultKind::Blsa => "BLSA",
            FaultKind::BankPattern => "BANKPATTERN",
            FaultKind::Cdec => "CDEC",
            FaultKind::Csl => "CSL",
            FaultKind::Mmodule => "MMODULE",
            FaultKind::Rdec => "RDEC",
            FaultKind::Swd => "SWD",
            FaultKind::Distbit => "DISTBIT",
            FaultKind::Mwl => "MWL",
            FaultKind::Inherent1 => "INHERENT1",
            FaultKind::Inherent2 => "INHERENT2",
            FaultKind::Inherent3 => "INHERENT3",
            FaultKind::Inherent4 => "INHERENT4",
            FaultKind::Inherent5 => "INHERENT5",
            FaultKind::Inherent6 => "INHERENT6",
        }
    }

    pub fn from_name(s: &str) -> Option<FaultKind> {
        OPERATIONAL_KINDS
            .iter()
            .chain(INHERENT_KINDS.iter())
            .find(|k| k.name() == s)
            .copied()
    }

    /// Address fields left "don't care" across this fault's spatial extent.
    fn variable_fields(self) -> &'static [AddressField] {
        use AddressField::*;
        match self {
            FaultKind::Sbit => &[],
            FaultKind::Sword => &[Pin],
            FaultKind::Scol => &[Row, Beat],
            FaultKind::Srow => &[Col, Beat],
            FaultKind::LocalWordline => &[Col, Beat],
            FaultKind::Sbank => &[Row, Col, Beat],
            FaultKind::Mbank => &[Bank, Row, Col, Beat],
            FaultKind::Mrank => &[Chip, Row, Col, Bank, Beat],
            FaultKind::Channel => &[Chip, Row, Col, Bank, Beat],
            FaultKind::Blsa => &[Row, Beat],
            FaultKind::BankPattern => &[Row, Col, Beat],
            FaultKind::Cdec => &[Col, Beat],
            FaultKind::Csl => &[Row, Beat],
            FaultKind::Mmodule => &[Chip, Row, Col, Bank, Beat],
            FaultKind::Rdec => &[Col, Beat],
            FaultKind::Swd => &[Col, Beat],
            FaultKind::Distbit => &[],
            FaultKind::Mwl => &[Row, Col, Beat],
            FaultKind::Inherent1
            | FaultKind::Inherent2
            | FaultKind::Inherent3
            | FaultKind::Inherent4
            | FaultKind::Inherent5
            | FaultKind::Inherent6 => &[],
        }
    }

    pub fn is_transient(self) -> bool {
        matches!(self, FaultKind::Sbit | FaultKind::Sword | FaultKind::Distbit)
    }

    pub fn is_single_bit(self) -> bool {
        matches!(self, FaultKind::Sbit | FaultKind::Distbit)
    }

    pub fn is_single_word(self) -> bool {
        matches!(self, FaultKind::Sword)
    }

    pub fn is_multi_row(self) -> bool {
        self.variable_fields().contains(&AddressField::Row)
    }

    pub fn is_multi_column(self) -> bool {
        self.variable_fields().contains(&AddressField::Col)
    }

    pub fn is_multi_dq(self) -> bool {
        self.variable_fields().contains(&AddressField::Pin) || self.variable_fields().contains(&AddressField::Chip)
    }

    pub fn is_multi_beat(self) -> bool {
        self.variable_fields().contains(&AddressField::Beat)
    }
}

/// One injected (or inherent) fault.
#[derive(Debug, Clone)]
pub struct Fault {
    pub kind: FaultKind,
    pub base_address: u64,
    pub variable_mask: u64,
    pub transient: bool,
    pub cell_fault_rate: f64,
    pub chip_id: usize,
    pub pin_id: usize,
    pub time_of_injection: f64,
}

impl Fault {
    /// Sample a concrete fault of `kind` at a uniformly random coordinate
    /// within the domain geometry described by `layout`.
    pub fn sample(kind: FaultKind, layout: &AddressLayout, rng: &mut SimRng, time: f64) -> Fault {
        let mut base = 0u64;
        let mut variable_mask = 0u64;
        for &field in ALL_FIELDS.iter() {
            if kind.variable_fields().contains(&field) {
                variable_mask |= layout.field_mask(field);
            } else {
                let v = layout.random_value(field, rng);
                base = layout.set_field(base, field, v);
            }
        }
        let chip_id = layout.get_field(base, AddressField::Chip) as usize;
        let pin_id = layout.get_field(base, AddressField::Pin) as usize;

        Fault {
            kind,
            base_address: base,
            variable_mask,
            transient: kind.is_transient(),
            cell_fault_rate: 0.0,
            chip_id,
            pin_id,
            time_of_injection: time,
        }
    }

    /// Two faults overlap when every bit where their base addresses differ
    /// is "don't care" in at least one of the two masks.
    pub fn overlap(&self, other: &Fault) -> bool {
        let diff = self.base_address ^ other.base_address;
        diff & !(self.variable_mask | other.variable_mask) == 0
    }

    /// Flip bits inside `cacheline` consistent with this fault's spatial
    /// extent, given the domain's bit-addressing geometry. Iterates every
    /// (beat, chip, pin) triple in the cacheline and flips the ones the
    /// fault's base address / variable mask select, so a fault whose
    /// `variable_fields()` includes `Chip` (MRANK, CHANNEL, MMODULE) spans
    /// multiple chips rather than only the chip it was sampled on.
    pub fn materialize(&self, cacheline: &mut BitBlock, layout: &AddressLayout, channel_width: usize, pins_per_device: usize) {
        let beats = cacheline.bit_n() / channel_width.max(1);
        let chips = channel_width / pins_per_device.max(1);
        for beat in 0..beats {
            if (layout.field_mask(AddressField::Beat) != 0)
                && !Self::field_matches(layout, AddressField::Beat, self.base_address, self.variable_mask, beat as u64)
            {
                continue;
            }
            for chip in 0..chips {
                if (layout.field_mask(AddressField::Chip) != 0)
                    && !Self::field_matches(layout, AddressField::Chip, self.base_address, self.variable_mask, chip as u64)
                {
                    continue;
                }
                for pin in 0..pins_per_device {
                    if !Self::field_matches(layout, AddressField::Pin, self.base_address, self.variable_mask, pin as u64) {
                        continue;
                    }
                    let pos = beat * channel_width + chip * pins_per_device + pin;
                    if pos < cacheline.bit_n() {
                        cacheline.inv_bit(pos);
                    }
                }
            }
        }
    }

    fn field_matches(layout: &AddressLayout, field: AddressField, base: u64, variable_mask: u64, candidate: u64) -> bool {
        let mask = layout.field_mask(field);
        if variable_mask & mask == mask {
            true
        } else {
            (base & mask) == ((candidate << layout.offset(field)) & mask)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layout() -> AddressLayout {
        AddressLayout::new(4, 18, 8, 1)
    }

    #[test]
    fn overlap_is_symmetric_and_reflexive() {
        let l = layout();
        let mut rng = SimRng::new(1);
        let f1 = Fault::sample(FaultKind::Sbit, &l, &mut rng, 0.0);
        let f2 = Fault::sample(FaultKind::Scol, &l, &mut rng, 0.0);
        assert_eq!(f1.overlap(&f2), f2.overlap(&f1));
        assert!(f1.overlap(&f1));
        assert!(f2.overlap(&f2));
    }

    #[test]
    fn sbit_has_no_variable_fields() {
        let l = layout();
        let mut rng = SimRng::new(2);
        let f = Fault::sample(FaultKind::Sbit, &l, &mut rng, 0.0);
        assert_eq!(f.variable_mask, 0);
    }

    #[test]
    fn distinct_sbit_samples_rarely_overlap() {
        let l = layout();
        let mut rng = SimRng::new(3);
        let f1 = Fault::sample(FaultKind::Sbit, &l, &mut rng, 0.0);
        let mut collisions = 0;
        for _ in 0..200 {
            let f2 = Fault::sample(FaultKind::Sbit, &l, &mut rng, 0.0);
            if f1.overlap(&f2) {
                collisions += 1;
            }
        }
        assert!(collisions < 200);
    }

    #[test]
    fn from_name_round_trips_all_kinds() {
        for &k in OPERATIONAL_KINDS.iter().chain(INHERENT_KINDS.iter()) {
            assert_eq!(FaultKind::from_name(k.name()), Some(k));
        }
    }
}
