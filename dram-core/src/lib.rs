//! DRAM fault-and-ECC Monte Carlo simulation core.
//!
//! Three tightly coupled subsystems: an event-driven fault simulator
//! ([`tester`]), the fault domain and fault taxonomy ([`fault_domain`],
//! [`fault`], [`fault_rate`]), and an ECC decode engine ([`codec`],
//! [`ecc`]). [`domain_group`] aggregates fault domains and [`scrubber`]
//! implements periodic scrub policies. See `SPEC_FULL.md` for the full
//! design.

pub mod bitblock;
pub mod codec;
pub mod domain_group;
pub mod ecc;
pub mod error;
pub mod error_type;
pub mod fault;
pub mod fault_domain;
pub mod fault_rate;
pub mod rng;
pub mod scrubber;
pub mod tester;

pub use bitblock::{BitBlock, Layout};
pub use domain_group::DomainGroup;
pub use ecc::Ecc;
pub use error::{Result, SimError};
pub use error_type::{worse2, ErrorType};
pub use fault::{Fault, FaultKind};
pub use fault_domain::FaultDomain;
pub use fault_rate::FaultRateInfo;
pub use rng::SimRng;
pub use scrubber::{NoScrubber, PeriodicScrubber, Scrubber};
pub use tester::{TesterScenario, TesterSystem};
