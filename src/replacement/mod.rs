//! Page replacement policies
//!
//! Every policy sees the same five notifications from the MMU:
//!
//! - [`ReplacementPolicy::page_accessed`] on every hit
//! - [`ReplacementPolicy::page_loaded`] whenever a frame starts holding a page
//! - [`ReplacementPolicy::select_victim`] when a fault finds no free frame
//! - [`ReplacementPolicy::page_removed`] when a frame is freed by process
//!   termination (not an eviction)
//! - [`ReplacementPolicy::reset`] between runs
//!
//! Each occupancy change in [`PhysicalMemory`] is paired with exactly one of
//! these calls, so the policy's resident set always equals the set of
//! occupied frames. Policies keep ordering state only; what a frame holds is
//! looked up in [`PhysicalMemory`].

mod fifo;
mod lru;
mod optimal;

use std::fmt;
use std::str::FromStr;

pub use fifo::FifoPolicy;
pub use lru::LruPolicy;
pub use optimal::OptimalPolicy;

use crate::error::MmuError;
use crate::memory::PhysicalMemory;

/// Which replacement policy to run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PolicyKind {
    Fifo,
    Lru,
    Optimal,
}

impl PolicyKind {
    pub const ALL: [PolicyKind; 3] = [PolicyKind::Fifo, PolicyKind::Lru, PolicyKind::Optimal];

    /// Stack algorithms never fault more when given more frames
    pub fn is_stack_algorithm(&self) -> bool {
        matches!(self, PolicyKind::Lru | PolicyKind::Optimal)
    }

    /// Whether victim selection uses the lookahead
    pub fn needs_lookahead(&self) -> bool {
        matches!(self, PolicyKind::Optimal)
    }
}

impl fmt::Display for PolicyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PolicyKind::Fifo => "FIFO",
            PolicyKind::Lru => "LRU",
            PolicyKind::Optimal => "Optimal",
        };
        f.write_str(name)
    }
}

impl FromStr for PolicyKind {
    type Err = MmuError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fifo" => Ok(PolicyKind::Fifo),
            "lru" => Ok(PolicyKind::Lru),
            "optimal" | "opt" => Ok(PolicyKind::Optimal),
            other => Err(MmuError::InvalidConfig(format!(
                "unknown replacement policy {:?} (expected fifo, lru or optimal)",
                other
            ))),
        }
    }
}

/// A replacement policy instance, sized for one run
#[derive(Debug, Clone)]
pub enum ReplacementPolicy {
    Fifo(FifoPolicy),
    Lru(LruPolicy),
    Optimal(OptimalPolicy),
}

impl ReplacementPolicy {
    pub fn new(kind: PolicyKind, frames_limit: usize) -> Self {
        match kind {
            PolicyKind::Fifo => ReplacementPolicy::Fifo(FifoPolicy::with_capacity(frames_limit)),
            PolicyKind::Lru => ReplacementPolicy::Lru(LruPolicy::with_capacity(frames_limit)),
            PolicyKind::Optimal => ReplacementPolicy::Optimal(OptimalPolicy::new()),
        }
    }

    pub fn kind(&self) -> PolicyKind {
        match self {
            ReplacementPolicy::Fifo(_) => PolicyKind::Fifo,
            ReplacementPolicy::Lru(_) => PolicyKind::Lru,
            ReplacementPolicy::Optimal(_) => PolicyKind::Optimal,
        }
    }

    /// Called on every hit. Only LRU reorders.
    pub fn page_accessed(&mut self, frame: usize, page: usize) {
        if let ReplacementPolicy::Lru(lru) = self {
            lru.page_accessed(frame, page);
        }
    }

    /// Called when `frame` newly holds `page` (fresh load or overwrite)
    pub fn page_loaded(&mut self, frame: usize, page: usize) {
        match self {
            ReplacementPolicy::Fifo(fifo) => fifo.page_loaded(frame, page),
            ReplacementPolicy::Lru(lru) => lru.page_loaded(frame, page),
            ReplacementPolicy::Optimal(opt) => opt.page_loaded(frame),
        }
    }

    /// Pick a resident frame to evict and forget it.
    ///
    /// `future` holds the page numbers referenced after the current step and
    /// is only read by Optimal. `None` only when no frame is tracked.
    pub fn select_victim(
        &mut self,
        future: Option<&[usize]>,
        memory: &PhysicalMemory,
    ) -> Option<usize> {
        match self {
            ReplacementPolicy::Fifo(fifo) => fifo.select_victim(),
            ReplacementPolicy::Lru(lru) => lru.select_victim(),
            ReplacementPolicy::Optimal(opt) => opt.select_victim(future, memory),
        }
    }

    /// Forget a frame freed outside victim selection
    pub fn page_removed(&mut self, frame: usize) {
        match self {
            ReplacementPolicy::Fifo(fifo) => fifo.page_removed(frame),
            ReplacementPolicy::Lru(lru) => lru.page_removed(frame),
            ReplacementPolicy::Optimal(opt) => opt.page_removed(frame),
        }
    }

    pub fn reset(&mut self) {
        match self {
            ReplacementPolicy::Fifo(fifo) => fifo.reset(),
            ReplacementPolicy::Lru(lru) => lru.reset(),
            ReplacementPolicy::Optimal(opt) => opt.reset(),
        }
    }

    /// Tracked frames in the policy's own order: arrival order for FIFO,
    /// least recent first for LRU, ascending for Optimal.
    pub fn resident_frames(&self) -> Vec<usize> {
        match self {
            ReplacementPolicy::Fifo(fifo) => fifo.queue_order().collect(),
            ReplacementPolicy::Lru(lru) => lru.usage_order().collect(),
            ReplacementPolicy::Optimal(opt) => opt.resident().collect(),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            ReplacementPolicy::Fifo(fifo) => fifo.len(),
            ReplacementPolicy::Lru(lru) => lru.len(),
            ReplacementPolicy::Optimal(opt) => opt.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
