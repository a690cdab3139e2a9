//! Reference-string runs
//!
//! Drives one process of an MMU through a sequence of references, giving
//! step `i` the lookahead `refs[i+1..]`, and records what every step did.
//! A run stops at the first error so later steps never see inconsistent
//! state.

use log::{error, info};

use crate::config::MmuConfig;
use crate::constants::{DEFAULT_PAGE_SIZE, INVALID_ADDRESS};
use crate::error::{MmuError, Result};
use crate::memory::FrameOwner;
use crate::mmu::{AccessOutcome, AccessStatus, MemoryManagementUnit};
use crate::process::Pid;
use crate::replacement::PolicyKind;

/// What the numbers of a reference string mean
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReferenceUnit {
    /// Page numbers
    #[default]
    Page,
    /// Virtual byte addresses
    Address,
}

/// One executed step of a run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepRecord {
    /// 1-based position in the reference string
    pub step: usize,
    /// The reference as given (page number or address)
    pub reference: usize,
    pub outcome: AccessOutcome,
    /// Frame table after the step
    pub frames: Vec<Option<FrameOwner>>,
}

impl StepRecord {
    pub fn status(&self) -> AccessStatus {
        self.outcome.status
    }

    /// Human readable description of the step
    pub fn action(&self) -> String {
        let outcome = &self.outcome;
        match (outcome.status, outcome.evicted) {
            (AccessStatus::Hit, _) => format!("Page {} found", outcome.page),
            (AccessStatus::FaultReplace, Some(victim)) => format!(
                "Replace page {} with {} (frame {})",
                victim.page, outcome.page, outcome.frame
            ),
            _ => format!("Load page {} to frame {}", outcome.page, outcome.frame),
        }
    }
}

/// The step that stopped a run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepFailure {
    pub step: usize,
    pub reference: usize,
    pub error: MmuError,
}

/// Everything a run did
#[derive(Debug, Clone, PartialEq)]
pub struct RunReport {
    pub policy: PolicyKind,
    pub num_frames: usize,
    pub page_size: usize,
    pub unit: ReferenceUnit,
    pub steps: Vec<StepRecord>,
    /// Set when the run stopped early
    pub error: Option<StepFailure>,
}

impl RunReport {
    pub fn hits(&self) -> usize {
        self.steps.iter().filter(|s| s.status() == AccessStatus::Hit).count()
    }

    pub fn faults(&self) -> usize {
        self.steps.iter().filter(|s| s.status().is_fault()).count()
    }

    /// Number of references executed
    pub fn total_references(&self) -> usize {
        self.steps.len()
    }

    /// Percent of executed references that hit
    pub fn hit_rate(&self) -> f64 {
        percent(self.hits(), self.total_references())
    }

    /// Percent of executed references that faulted
    pub fn fault_rate(&self) -> f64 {
        percent(self.faults(), self.total_references())
    }

    pub fn is_complete(&self) -> bool {
        self.error.is_none()
    }

    /// Physical address of every step, plus `INVALID_ADDRESS` for the failing one
    pub fn physical_addresses(&self) -> Vec<i64> {
        let mut out: Vec<i64> =
            self.steps.iter().map(|s| s.outcome.physical_address as i64).collect();
        if self.error.is_some() {
            out.push(INVALID_ADDRESS);
        }
        out
    }
}

fn percent(part: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        part as f64 / total as f64 * 100.0
    }
}

/// Run `refs` against process `pid`, stopping at the first error.
pub fn run_reference_string(
    mmu: &mut MemoryManagementUnit,
    pid: Pid,
    refs: &[usize],
    unit: ReferenceUnit,
) -> RunReport {
    let config = *mmu.config();
    let mut report = RunReport {
        policy: config.policy,
        num_frames: config.num_frames,
        page_size: config.page_size,
        unit,
        steps: Vec::with_capacity(refs.len()),
        error: None,
    };

    for (i, &reference) in refs.iter().enumerate() {
        let future = Some(&refs[i + 1..]);
        let result = match unit {
            ReferenceUnit::Page => mmu.access_page(pid, reference, future),
            ReferenceUnit::Address => mmu.access_virtual_address(pid, reference, future),
        };
        match result {
            Ok(outcome) => report.steps.push(StepRecord {
                step: i + 1,
                reference,
                outcome,
                frames: mmu.memory().frames().to_vec(),
            }),
            Err(err) => {
                if err.is_internal() {
                    error!("step {}: {}", i + 1, err);
                } else {
                    info!("step {}: {}, stopping run", i + 1, err);
                }
                report.error = Some(StepFailure { step: i + 1, reference, error: err });
                break;
            }
        }
    }
    report
}

/// Virtual size in bytes of a process whose highest page is `largest_page`
pub fn address_space_for(largest_page: usize, page_size: usize) -> Result<usize> {
    largest_page
        .checked_add(1)
        .and_then(|num_pages| num_pages.checked_mul(page_size))
        .ok_or_else(|| {
            MmuError::InvalidConfig(format!(
                "page {} of {} bytes is beyond the virtual address range",
                largest_page, page_size
            ))
        })
}

/// Run a page reference string on a fresh MMU with a single process large
/// enough for every referenced page.
pub fn simulate(policy: PolicyKind, num_frames: usize, pages: &[usize]) -> Result<RunReport> {
    let config = MmuConfig::new(num_frames, DEFAULT_PAGE_SIZE, policy);
    let mut mmu = MemoryManagementUnit::new(config)?;
    let largest_page = pages.iter().copied().max().unwrap_or(0);
    let virtual_size = address_space_for(largest_page, DEFAULT_PAGE_SIZE)?;
    let pid = mmu.create_process(virtual_size, DEFAULT_PAGE_SIZE)?;

    let mut report = run_reference_string(&mut mmu, pid, pages, ReferenceUnit::Page);
    match report.error.take() {
        Some(failure) => Err(failure.error),
        None => Ok(report),
    }
}

/// Fault count of one policy at one frame count
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CurvePoint {
    pub frames: usize,
    pub faults: usize,
}

/// Faults of `policy` on `pages` for each frame count
pub fn fault_curve(
    policy: PolicyKind,
    pages: &[usize],
    frame_counts: impl IntoIterator<Item = usize>,
) -> Result<Vec<CurvePoint>> {
    frame_counts
        .into_iter()
        .map(|frames| {
            let report = simulate(policy, frames, pages)?;
            Ok(CurvePoint { frames, faults: report.faults() })
        })
        .collect()
}

/// Neighbouring points where more frames gave more faults
pub fn belady_anomalies(curve: &[CurvePoint]) -> Vec<(CurvePoint, CurvePoint)> {
    let mut sorted = curve.to_vec();
    sorted.sort_by_key(|point| point.frames);
    sorted
        .windows(2)
        .filter(|pair| pair[1].frames > pair[0].frames && pair[1].faults > pair[0].faults)
        .map(|pair| (pair[0], pair[1]))
        .collect()
}
