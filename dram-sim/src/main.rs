//! dram-sim: Monte Carlo driver for the DRAM fault-and-ECC simulation core.
//!
//! Wires a DomainGroup/ECC/Scrubber combination from CLI flags, runs the
//! Tester loop, and prints a per-year summary. The configuration-file
//! reader, output-file formatter, and fault-rate constant tables that a
//! full production driver would own are out of scope here (see
//! SPEC_FULL.md); this binary exists to exercise `dram-core` end to end.

use std::sync::atomic::Ordering;
use std::sync::Arc;

use clap::{Parser, Subcommand, ValueEnum};

use dram_core::bitblock::Layout;
use dram_core::codec::gf::GaloisField;
use dram_core::codec::hsiao::Hsiao;
use dram_core::codec::rs::ReedSolomon;
use dram_core::ecc::plain::{ConfigEntry, PlainEcc};
use dram_core::ecc::vecc::Vecc;
use dram_core::ecc::xed::{Xed, XedVariant};
use dram_core::ecc::Ecc;
use dram_core::fault::FaultKind;
use dram_core::fault_rate::FaultRateInfo;
use dram_core::tester::{TesterScenario, TesterSystem, MAX_YEAR};
use dram_core::{DomainGroup, ErrorType, FaultDomain, NoScrubber, PeriodicScrubber, Scrubber, SimRng};

#[derive(Copy, Clone, Debug, ValueEnum)]
enum EccScheme {
    SecDed7264,
    Rs2_8,
    XedSddc,
    XedDddc,
    /// SEC-DED primary, retried against XED-SDDC on DUE.
    VeccSecDedXed,
}

#[derive(Parser)]
#[command(name = "dram-sim", version, about = "DRAM fault-and-ECC Monte Carlo simulator")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the Monte Carlo simulation and print the per-year summary.
    Run {
        /// ECC scheme to decode under.
        #[arg(long, value_enum, default_value = "sec-ded-72-64")]
        ecc: EccScheme,

        /// Number of chips (devices) per rank.
        #[arg(long, default_value_t = 18)]
        chips: usize,

        /// Pins per chip (chip I/O width).
        #[arg(long, default_value_t = 4)]
        pins: usize,

        /// Beats per cacheline burst.
        #[arg(long, default_value_t = 8)]
        beats: usize,

        /// Ranks per fault domain.
        #[arg(long, default_value_t = 1)]
        ranks: usize,

        /// Number of independent fault domains in the group.
        #[arg(long, default_value_t = 1)]
        domains: usize,

        /// Scrub period in hours; 0 disables scrubbing.
        #[arg(long, default_value_t = 0.0)]
        scrub_period: f64,

        /// Number of independent Monte Carlo iterations.
        #[arg(long, default_value_t = 10_000)]
        run_count: u64,

        /// PRNG seed.
        #[arg(long, default_value_t = 1)]
        seed: u64,

        /// Single-bit fault rate (per device, per hour); a stand-in for the
        /// external fault-rate table.
        #[arg(long, default_value_t = 1e-9)]
        sbit_rate: f64,

        /// Run deterministic scenario mode with exactly this many faults per
        /// trial instead of the time-driven Monte Carlo loop.
        #[arg(long)]
        fault_count: Option<usize>,

        /// Fault kind names to draw from in scenario mode (cycled if fewer
        /// than `fault-count`); ignored otherwise. See spec.md §6 for the
        /// canonical kind names (SBIT, SCOL, MRANK, DISTBIT, ...).
        #[arg(long, value_delimiter = ',')]
        fault_kinds: Vec<String>,

        /// In scenario mode, resample until every injected fault lands on a
        /// distinct chip.
        #[arg(long)]
        chip_overlap_check: bool,
    },
}

fn build_ecc(scheme: EccScheme, chips: usize, pins: usize, beats: usize) -> Box<dyn Ecc + Send + Sync> {
    let channel_width = chips * pins;
    match scheme {
        EccScheme::SecDed7264 => {
            let codec = Arc::new(Hsiao::new(64, 8));
            Box::new(PlainEcc::new(Layout::Linear, vec![ConfigEntry::unbounded(codec)]).with_channel_width(channel_width))
        }
        EccScheme::Rs2_8 => {
            let field = Arc::new(GaloisField::gf8());
            let codec = Arc::new(ReedSolomon::new(field, chips, 2, 1));
            Box::new(PlainEcc::new(Layout::Linear, vec![ConfigEntry::unbounded(codec)]).with_channel_width(channel_width))
        }
        EccScheme::XedSddc => Box::new(Xed::new(XedVariant::Sddc, chips, pins, beats, true)),
        EccScheme::XedDddc => Box::new(Xed::new(XedVariant::Dddc, chips, pins, beats, true)),
        EccScheme::VeccSecDedXed => {
            let codec = Arc::new(Hsiao::new(64, 8));
            let primary = PlainEcc::new(Layout::Linear, vec![ConfigEntry::unbounded(codec)]).with_channel_width(channel_width);
            let secondary = Xed::new(XedVariant::Sddc, chips, pins, beats, true);
            Box::new(Vecc::new(Box::new(primary), Box::new(secondary)))
        }
    }
}

fn parse_kinds(names: &[String]) -> Vec<FaultKind> {
    names
        .iter()
        .filter_map(|s| match FaultKind::from_name(&s.to_uppercase()) {
            Some(k) => Some(k),
            None => {
                eprintln!("warning: unrecognized fault kind {s:?}, skipping");
                None
            }
        })
        .collect()
}

fn main() {
    let cli = Cli::parse();
    let Commands::Run {
        ecc,
        chips,
        pins,
        beats,
        ranks,
        domains,
        scrub_period,
        run_count,
        seed,
        sbit_rate,
        fault_count,
        fault_kinds,
        chip_overlap_check,
    } = cli.command;

    let mut fault_rate_info = FaultRateInfo::new();
    fault_rate_info.set_operational_rate(FaultKind::Sbit, sbit_rate);

    let domain_list = (0..domains)
        .map(|_| FaultDomain::new(ranks, chips, pins, beats, fault_rate_info.clone()))
        .collect();
    let mut dg = DomainGroup::new(domain_list);

    let ecc = build_ecc(ecc, chips, pins, beats);
    let mut rng = SimRng::new(seed);

    if let Some(fault_count) = fault_count {
        let kinds = parse_kinds(&fault_kinds);
        if kinds.is_empty() {
            eprintln!("error: scenario mode requires at least one valid --fault-kinds entry");
            std::process::exit(1);
        }
        let tester = TesterScenario::new();
        let kill_flag = tester.kill_flag();
        if let Err(e) = ctrlc::set_handler(move || {
            kill_flag.store(true, Ordering::Relaxed);
        }) {
            eprintln!("warning: failed to install termination handler: {e}");
        }

        let stats = match tester.test(&mut dg, ecc.as_ref(), run_count, fault_count, &kinds, chip_overlap_check, &mut rng) {
            Ok(s) => s,
            Err(e) => {
                eprintln!("simulation error: {e}");
                std::process::exit(1);
            }
        };

        println!("After {} runs", stats.run_count);
        for et in [ErrorType::Ne, ErrorType::Ce, ErrorType::Due, ErrorType::Sdc] {
            println!("{}: {:.6}", et.name(), stats.probability(et));
        }
        return;
    }

    let mut scrubber: Box<dyn Scrubber> = if scrub_period > 0.0 {
        Box::new(PeriodicScrubber::new(scrub_period))
    } else {
        Box::new(NoScrubber)
    };

    let tester = TesterSystem::new();
    let kill_flag = tester.kill_flag();
    if let Err(e) = ctrlc::set_handler(move || {
        kill_flag.store(true, Ordering::Relaxed);
    }) {
        eprintln!("warning: failed to install termination handler: {e}");
    }

    let stats = match tester.test(&mut dg, ecc.as_ref(), scrubber.as_mut(), run_count, &mut rng) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("simulation error: {e}");
            std::process::exit(1);
        }
    };

    println!("After {} runs", stats.run_count);
    println!("Retire");
    for y in 1..MAX_YEAR {
        print!("{:.6} ", stats.retire_probability(y));
    }
    println!();
    println!("DUE");
    for y in 1..MAX_YEAR {
        print!("{:.6} ", stats.due_probability(y));
    }
    println!();
    println!("SDC");
    for y in 1..MAX_YEAR {
        print!("{:.6} ", stats.sdc_probability(y));
    }
    println!();
}
