//! Plain ECC: iterate the cacheline in codec-sized chunks, decode each,
//! fold the results with `worse2` (spec.md §4.5).

use std::sync::Arc;

use crate::bitblock::{BitBlock, Layout};
use crate::codec::Codec;
use crate::ecc::Ecc;
use crate::error_type::{worse2, ErrorType};
use crate::fault_domain::FaultDomain;
use crate::rng::SimRng;

/// One `ECC.configList` entry: a codec is eligible once the domain's
/// retired chip/pin counts no longer exceed these thresholds. Selection
/// picks the LAST eligible entry (spec.md §3 "Open Question (b): last
/// wins", confirmed against the original implementation's configList scan).
pub struct ConfigEntry {
    pub max_device_retirement: usize,
    pub max_pin_retirement: usize,
    pub codec: Arc<dyn Codec + Send + Sync>,
}

impl ConfigEntry {
    pub fn unbounded(codec: Arc<dyn Codec + Send + Sync>) -> Self {
        ConfigEntry {
            max_device_retirement: usize::MAX,
            max_pin_retirement: usize::MAX,
            codec,
        }
    }
}

pub struct PlainEcc {
    layout: Layout,
    channel_width: usize,
    config_list: Vec<ConfigEntry>,
}

impl PlainEcc {
    pub fn new(layout: Layout, config_list: Vec<ConfigEntry>) -> Self {
        PlainEcc {
            layout,
            channel_width: 0,
            config_list,
        }
    }

    pub fn with_channel_width(mut self, channel_width: usize) -> Self {
        self.channel_width = channel_width;
        self
    }

    fn select_codec(&self, fd: &FaultDomain) -> Option<&ConfigEntry> {
        self.config_list
            .iter()
            .rev()
            .find(|c| c.max_device_retirement >= fd.retired_chip_count() && c.max_pin_retirement >= fd.retired_pin_count())
    }
}

impl Ecc for PlainEcc {
    fn channel_width(&self) -> usize {
        self.channel_width
    }

    fn decode(&self, fd: &FaultDomain, cacheline: &BitBlock, _rng: &mut SimRng) -> ErrorType {
        if cacheline.is_zero() {
            return ErrorType::Ne;
        }
        let entry = match self.select_codec(fd) {
            Some(e) => e,
            // No configList entry matches this retirement state: the block
            // is beyond what any codec can protect (spec.md §7 domain 3).
            None => return ErrorType::Sdc,
        };
        let bit_n = entry.codec.bit_n();
        if bit_n == 0 || cacheline.bit_n() % bit_n != 0 {
            return ErrorType::Sdc;
        }

        let num_chunks = cacheline.bit_n() / bit_n;
        let mut result = ErrorType::Ne;
        for i in 0..num_chunks {
            let mut word = BitBlock::new(bit_n);
            word.extract(cacheline, self.layout, i, self.channel_width);
            let (et, _, _) = entry.codec.decode(&word);
            result = worse2(result, et);
        }
        result
    }

    fn clear(&mut self) {}
}
