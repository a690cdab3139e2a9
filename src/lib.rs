pub mod config;
pub mod constants;
pub mod error;
pub mod io;
pub mod memory;
pub mod mmu;
pub mod process;
pub mod replacement;
pub mod simulation;

// Re-export commonly used items for convenience
pub use config::MmuConfig;
pub use constants::*;
pub use error::{InputError, MmuError, Result};
pub use memory::{FrameOwner, PhysicalMemory};
pub use mmu::{AccessOutcome, AccessStats, AccessStatus, MemoryManagementUnit};
pub use process::{PageTableEntry, Pid, Process, ProcessSnapshot};
pub use replacement::{PolicyKind, ReplacementPolicy};
pub use simulation::{ReferenceUnit, RunReport, StepRecord};
