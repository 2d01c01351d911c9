//! Scrubbing policies: periodic scrub clears transient faults from every
//! domain once a new scrub interval begins (spec.md §4.7).

use crate::domain_group::DomainGroup;

pub trait Scrubber {
    /// Called on every tester step with the current simulated hour count.
    fn scrub(&mut self, dg: &mut DomainGroup, hours: f64);
}

pub struct NoScrubber;

impl Scrubber for NoScrubber {
    fn scrub(&mut self, _dg: &mut DomainGroup, _hours: f64) {}
}

/// Triggers `dg.scrub()` once per `period` hours have elapsed.
pub struct PeriodicScrubber {
    period: f64,
    last_scrub_section: i64,
}

impl PeriodicScrubber {
    pub fn new(period: f64) -> Self {
        PeriodicScrubber {
            period,
            last_scrub_section: -1,
        }
    }
}

impl Scrubber for PeriodicScrubber {
    fn scrub(&mut self, dg: &mut DomainGroup, hours: f64) {
        let section = (hours / self.period).floor() as i64;
        if section > self.last_scrub_section {
            dg.scrub();
            self.last_scrub_section = section;
        }
    }
}
