//! VECC: two-tier variable-strength ECC. The primary codec decodes first;
//! on DUE, the same extracted word is retried with a stronger secondary
//! codec (spec.md §4.5).

use crate::bitblock::BitBlock;
use crate::ecc::Ecc;
use crate::error_type::ErrorType;
use crate::fault_domain::FaultDomain;
use crate::rng::SimRng;

pub struct Vecc {
    primary: Box<dyn Ecc + Send + Sync>,
    secondary: Box<dyn Ecc + Send + Sync>,
}

impl Vecc {
    pub fn new(primary: Box<dyn Ecc + Send + Sync>, secondary: Box<dyn Ecc + Send + Sync>) -> Self {
        Vecc { primary, secondary }
    }
}

impl Ecc for Vecc {
    fn channel_width(&self) -> usize {
        self.primary.channel_width()
    }

    fn decode(&self, fd: &FaultDomain, cacheline: &BitBlock, rng: &mut SimRng) -> ErrorType {
        let result = self.primary.decode(fd, cacheline, rng);
        if result == ErrorType::Due {
            self.secondary.decode(fd, cacheline, rng)
        } else {
            result
        }
    }

    fn clear(&mut self) {
        self.primary.clear();
        self.secondary.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bitblock::Layout;
    use crate::codec::hsiao::Hsiao;
    use crate::ecc::plain::{ConfigEntry, PlainEcc};
    use crate::fault::FaultKind;
    use crate::fault_rate::FaultRateInfo;
    use std::sync::Arc;

    fn domain() -> FaultDomain {
        let mut info = FaultRateInfo::new();
        info.set_operational_rate(FaultKind::Sbit, 1.0);
        FaultDomain::new(1, 18, 4, 8, info)
    }

    #[test]
    fn falls_back_to_secondary_on_due() {
        let weak_codec = Arc::new(Hsiao::new(64, 8));
        let strong_codec = Arc::new(Hsiao::new(64, 8));
        let primary = PlainEcc::new(Layout::Linear, vec![ConfigEntry::unbounded(weak_codec)]).with_channel_width(72);
        let secondary = PlainEcc::new(Layout::Linear, vec![ConfigEntry::unbounded(strong_codec)]).with_channel_width(72);
        let vecc = Vecc::new(Box::new(primary), Box::new(secondary));

        let fd = domain();
        let mut rng = SimRng::new(1);
        let mut cacheline = BitBlock::new(72 * 8);
        cacheline.set_bit(0, true);
        cacheline.set_bit(1, true);
        let result = vecc.decode(&fd, &cacheline, &mut rng);
        assert_eq!(result, ErrorType::Due);
    }
}
