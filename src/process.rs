use std::fmt;

/// Process identifier. Handed out by the MMU in increasing order and never
/// reused within a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Pid(pub u32);

impl fmt::Display for Pid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P{}", self.0)
    }
}

/// One page table entry
///
/// `valid` is true exactly when `frame` is `Some` and that frame currently
/// holds this (pid, page) pair in physical memory.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PageTableEntry {
    pub frame: Option<usize>,
    pub valid: bool,
    /// Logical time of the last access (diagnostics only)
    pub last_access: Option<u64>,
}

impl PageTableEntry {
    /// Point the entry at `frame` and mark it valid
    pub(crate) fn map(&mut self, frame: usize) {
        self.frame = Some(frame);
        self.valid = true;
    }

    /// Mark the entry as not resident
    pub(crate) fn invalidate(&mut self) {
        self.frame = None;
        self.valid = false;
    }

    /// Frame number in the classic encoding: -1 when unmapped
    pub fn frame_number(&self) -> i64 {
        match self.frame {
            Some(frame) if self.valid => frame as i64,
            _ => -1,
        }
    }
}

/// A virtual address space, represented by its page table.
///
/// The page table length is fixed at creation.
#[derive(Debug, Clone)]
pub struct Process {
    pid: Pid,
    page_size: usize,
    page_table: Vec<PageTableEntry>,
}

impl Process {
    /// Build a process with ceil(virtual_size / page_size) invalid entries.
    ///
    /// Callers must pass a non-zero page size and virtual size; the MMU checks
    /// both before getting here.
    pub(crate) fn new(pid: Pid, virtual_size: usize, page_size: usize) -> Self {
        let num_pages = virtual_size.div_ceil(page_size);
        debug_assert!(num_pages >= 1);
        Process {
            pid,
            page_size,
            page_table: vec![PageTableEntry::default(); num_pages],
        }
    }

    #[inline]
    pub fn pid(&self) -> Pid {
        self.pid
    }

    #[inline]
    pub fn num_pages(&self) -> usize {
        self.page_table.len()
    }

    /// Bounds-checked page table lookup
    #[inline]
    pub fn get_page_entry(&self, page: usize) -> Option<&PageTableEntry> {
        self.page_table.get(page)
    }

    /// Mutable lookup, reserved for the MMU
    #[inline]
    pub(crate) fn get_page_entry_mut(&mut self, page: usize) -> Option<&mut PageTableEntry> {
        self.page_table.get_mut(page)
    }

    pub fn page_table(&self) -> &[PageTableEntry] {
        &self.page_table
    }

    /// (page, frame) for every resident page
    pub fn resident_pages(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.page_table
            .iter()
            .enumerate()
            .filter_map(|(page, entry)| entry.frame.filter(|_| entry.valid).map(|frame| (page, frame)))
    }

    pub fn snapshot(&self) -> ProcessSnapshot {
        ProcessSnapshot {
            pid: self.pid,
            page_size: self.page_size,
            entries: self.page_table.clone(),
        }
    }
}

/// Read-only copy of a process page table, for display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessSnapshot {
    pub pid: Pid,
    pub page_size: usize,
    pub entries: Vec<PageTableEntry>,
}

impl ProcessSnapshot {
    pub fn num_pages(&self) -> usize {
        self.entries.len()
    }

    pub fn resident_count(&self) -> usize {
        self.entries.iter().filter(|entry| entry.valid).count()
    }
}

impl fmt::Display for ProcessSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{}: {} pages of {} bytes, {} resident",
            self.pid,
            self.num_pages(),
            self.page_size,
            self.resident_count()
        )?;
        for (page, entry) in self.entries.iter().enumerate() {
            if entry.valid {
                writeln!(f, "  page {:<4} -> frame {}", page, entry.frame_number())?;
            } else {
                writeln!(f, "  page {:<4} -> on disk", page)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_count_rounds_up() {
        assert_eq!(Process::new(Pid(0), 32768, 4096).num_pages(), 8);
        assert_eq!(Process::new(Pid(0), 32769, 4096).num_pages(), 9);
        assert_eq!(Process::new(Pid(0), 1, 4096).num_pages(), 1);
    }

    #[test]
    fn test_new_process_is_all_invalid() {
        let process = Process::new(Pid(3), 32768, 4096);
        assert_eq!(process.pid(), Pid(3));
        assert!(process.page_table().iter().all(|entry| !entry.valid));
        assert!(process.page_table().iter().all(|entry| entry.frame_number() == -1));
        assert_eq!(process.resident_pages().count(), 0);
    }

    #[test]
    fn test_get_page_entry_bounds() {
        let process = Process::new(Pid(0), 8 * 512, 512);
        assert!(process.get_page_entry(0).is_some());
        assert!(process.get_page_entry(7).is_some());
        assert!(process.get_page_entry(8).is_none());
        assert!(process.get_page_entry(9).is_none());
    }

    #[test]
    fn test_map_and_invalidate() {
        let mut process = Process::new(Pid(0), 4 * 512, 512);
        process.get_page_entry_mut(2).unwrap().map(5);

        let entry = process.get_page_entry(2).unwrap();
        assert!(entry.valid);
        assert_eq!(entry.frame_number(), 5);
        assert_eq!(process.resident_pages().collect::<Vec<_>>(), vec![(2, 5)]);

        process.get_page_entry_mut(2).unwrap().invalidate();
        let entry = process.get_page_entry(2).unwrap();
        assert!(!entry.valid);
        assert_eq!(entry.frame, None);
    }

    #[test]
    fn test_snapshot_display() {
        let mut process = Process::new(Pid(1), 2 * 512, 512);
        process.get_page_entry_mut(1).unwrap().map(0);
        let snapshot = process.snapshot();

        assert_eq!(snapshot.num_pages(), 2);
        assert_eq!(snapshot.resident_count(), 1);

        let text = snapshot.to_string();
        assert!(text.contains("P1: 2 pages of 512 bytes, 1 resident"));
        assert!(text.contains("page 0    -> on disk"));
        assert!(text.contains("page 1    -> frame 0"));
    }
}
