/// Page (and frame) size used when none is given, in bytes.
pub const DEFAULT_PAGE_SIZE: usize = 4096;

/// Number of physical frames used when none is given.
pub const DEFAULT_NUM_FRAMES: usize = 4;

/// Largest page table a single process may have.
pub const MAX_PROCESS_PAGES: usize = 1 << 20;

/// First pid handed out by a fresh (or reset) MMU.
pub const FIRST_PID: u32 = 0;

/// Output value written in place of a physical address when an access fails.
pub const INVALID_ADDRESS: i64 = -1;

/// Column width used by the trace table renderer.
pub const TRACE_COLUMN_WIDTH: usize = 8;
