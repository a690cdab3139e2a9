//! vm-pager - demand paging simulator
//!
//! Usage:
//!   vm-pager run [OPTIONS] <input_file>
//!   vm-pager compare [OPTIONS] <input_file>
//!
//! `input_file` holds a reference string: page numbers (or, with
//! `--addresses`, virtual byte addresses) separated by commas or whitespace.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use log::{LevelFilter, Log, Metadata, Record};

use vm_pager::io::{read_references, render_summary, render_trace, write_results};
use vm_pager::simulation::{
    address_space_for, belady_anomalies, fault_curve, run_reference_string,
};
use vm_pager::{
    MemoryManagementUnit, MmuConfig, PolicyKind, ReferenceUnit, DEFAULT_NUM_FRAMES,
    DEFAULT_PAGE_SIZE,
};

#[derive(Parser)]
#[command(name = "vm-pager")]
#[command(about = "Demand paging simulator with FIFO, LRU and Optimal replacement")]
#[command(version)]
struct Cli {
    /// Log more (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a reference string and print a step-by-step trace
    Run {
        /// File containing the reference string
        input: PathBuf,

        /// Number of physical frames
        #[arg(short, long, default_value_t = DEFAULT_NUM_FRAMES)]
        frames: usize,

        /// Page size in bytes
        #[arg(short, long, default_value_t = DEFAULT_PAGE_SIZE)]
        page_size: usize,

        /// Replacement policy: fifo, lru or optimal
        #[arg(short = 'a', long = "policy", default_value = "fifo")]
        policy: PolicyKind,

        /// Treat references as virtual byte addresses instead of page numbers
        #[arg(long)]
        addresses: bool,

        /// Size of the process address space in pages (default: fits every reference)
        #[arg(long)]
        pages: Option<usize>,

        /// Write physical addresses (or -1 for the failing step) to this file
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Print only the summary
        #[arg(short, long)]
        quiet: bool,
    },

    /// Fault counts of every policy over a range of frame counts
    Compare {
        /// File containing the page reference string
        input: PathBuf,

        #[arg(long, default_value_t = 1)]
        min_frames: usize,

        #[arg(long, default_value_t = 8)]
        max_frames: usize,
    },
}

/// Writes log records to stderr
struct StderrLogger;

impl Log for StderrLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            eprintln!("[{:<5}] {}", record.level(), record.args());
        }
    }

    fn flush(&self) {}
}

static LOGGER: StderrLogger = StderrLogger;

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    if log::set_logger(&LOGGER).is_ok() {
        log::set_max_level(level);
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Run { input, frames, page_size, policy, addresses, pages, output, quiet } => {
            let unit = if addresses { ReferenceUnit::Address } else { ReferenceUnit::Page };
            let config = MmuConfig::new(frames, page_size, policy);
            cmd_run(&input, config, unit, pages, output.as_deref(), quiet)
        }
        Commands::Compare { input, min_frames, max_frames } => {
            cmd_compare(&input, min_frames, max_frames)
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn cmd_run(
    input: &Path,
    config: MmuConfig,
    unit: ReferenceUnit,
    pages: Option<usize>,
    output: Option<&Path>,
    quiet: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let refs = read_references(input)?;
    let mut mmu = MemoryManagementUnit::new(config)?;

    let largest_page = match pages {
        Some(0) => return Err("--pages must be at least 1".into()),
        Some(n) => n - 1,
        None => refs
            .iter()
            .map(|&r| match unit {
                ReferenceUnit::Page => r,
                ReferenceUnit::Address => r / config.page_size,
            })
            .max()
            .unwrap_or(0),
    };
    let virtual_size = address_space_for(largest_page, config.page_size)?;
    let pid = mmu.create_process(virtual_size, config.page_size)?;

    let report = run_reference_string(&mut mmu, pid, &refs, unit);
    if quiet {
        print!("{}", render_summary(&report));
    } else {
        print!("{}", render_trace(&report));
    }

    if let Some(path) = output {
        write_results(path, &report)?;
        log::info!("results written to {}", path.display());
    }

    match report.error {
        Some(failure) => Err(failure.error.into()),
        None => Ok(()),
    }
}

fn cmd_compare(
    input: &Path,
    min_frames: usize,
    max_frames: usize,
) -> Result<(), Box<dyn std::error::Error>> {
    if min_frames == 0 || min_frames > max_frames {
        return Err(format!("invalid frame range {}..={}", min_frames, max_frames).into());
    }
    let pages = read_references(input)?;

    print!("{:<8}", "Frames");
    for policy in PolicyKind::ALL {
        print!("{:>10}", policy.to_string());
    }
    println!();

    let mut curves = Vec::new();
    for policy in PolicyKind::ALL {
        curves.push((policy, fault_curve(policy, &pages, min_frames..=max_frames)?));
    }
    for (row, frames) in (min_frames..=max_frames).enumerate() {
        print!("{:<8}", frames);
        for (_, curve) in &curves {
            print!("{:>10}", curve[row].faults);
        }
        println!();
    }

    for (policy, curve) in &curves {
        for (fewer, more) in belady_anomalies(curve) {
            println!(
                "Belady's anomaly ({}): {} frames -> {} faults, {} frames -> {} faults",
                policy, fewer.frames, fewer.faults, more.frames, more.faults
            );
        }
    }
    Ok(())
}
