//! Memory management unit
//!
//! Owns the frame pool, the process table and the replacement policy, and is
//! the only thing that mutates any of them. An access resolves to one of:
//!
//! - **hit**: the page is resident
//! - **fault_free**: the page was loaded into a free frame
//! - **fault_replace**: a resident page was evicted to make room
//! - an error, with no side effects for caller mistakes

use std::collections::BTreeMap;
use std::fmt;

use log::{debug, error, info, trace, warn};

use crate::config::MmuConfig;
use crate::constants::{FIRST_PID, MAX_PROCESS_PAGES};
use crate::error::{MmuError, Result};
use crate::memory::{FrameOwner, PhysicalMemory};
use crate::process::{Pid, Process, ProcessSnapshot};
use crate::replacement::ReplacementPolicy;

/// How an access was resolved
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AccessStatus {
    Hit,
    FaultFree,
    FaultReplace,
}

impl AccessStatus {
    /// Status tag as used by log consumers
    pub fn tag(&self) -> &'static str {
        match self {
            AccessStatus::Hit => "hit",
            AccessStatus::FaultFree => "fault_free",
            AccessStatus::FaultReplace => "fault_replace",
        }
    }

    pub fn is_fault(&self) -> bool {
        !matches!(self, AccessStatus::Hit)
    }
}

impl fmt::Display for AccessStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Result of a successful access
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccessOutcome {
    pub pid: Pid,
    pub page: usize,
    pub offset: usize,
    pub frame: usize,
    pub physical_address: usize,
    pub status: AccessStatus,
    /// Page that was evicted to make room (fault_replace only)
    pub evicted: Option<FrameOwner>,
}

impl fmt::Display for AccessOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.status, self.evicted) {
            (AccessStatus::Hit, _) => write!(
                f,
                "Hit! physical address {} (frame {})",
                self.physical_address, self.frame
            ),
            (AccessStatus::FaultReplace, Some(victim)) => write!(
                f,
                "Page fault! page {} ({}) replaced in frame {}, physical address {}",
                victim.page, victim.pid, self.frame, self.physical_address
            ),
            _ => write!(
                f,
                "Page fault! free frame {} allocated, physical address {}",
                self.frame, self.physical_address
            ),
        }
    }
}

/// Hit and fault counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AccessStats {
    pub hits: u64,
    pub faults: u64,
}

impl AccessStats {
    pub fn total_accesses(&self) -> u64 {
        self.hits + self.faults
    }

    /// hits / (hits + faults) * 100, or 0 before the first access
    pub fn hit_ratio(&self) -> f64 {
        match self.total_accesses() {
            0 => 0.0,
            total => self.hits as f64 / total as f64 * 100.0,
        }
    }

    /// faults / (hits + faults) * 100, or 0 before the first access
    pub fn fault_ratio(&self) -> f64 {
        match self.total_accesses() {
            0 => 0.0,
            total => self.faults as f64 / total as f64 * 100.0,
        }
    }
}

impl fmt::Display for AccessStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "hits={} faults={} total={} hit_ratio={:.2}%",
            self.hits,
            self.faults,
            self.total_accesses(),
            self.hit_ratio()
        )
    }
}

pub struct MemoryManagementUnit {
    config: MmuConfig,
    memory: PhysicalMemory,
    policy: ReplacementPolicy,
    processes: BTreeMap<Pid, Process>,
    next_pid: u32,
    stats: AccessStats,
    /// Logical clock stamped into page table entries on access
    clock: u64,
}

impl MemoryManagementUnit {
    pub fn new(config: MmuConfig) -> Result<Self> {
        config.validate()?;
        info!(
            "mmu: {} frames of {} bytes, {} replacement",
            config.num_frames, config.page_size, config.policy
        );
        Ok(MemoryManagementUnit {
            memory: PhysicalMemory::new(config.num_frames, config.page_size),
            policy: ReplacementPolicy::new(config.policy, config.num_frames),
            config,
            processes: BTreeMap::new(),
            next_pid: FIRST_PID,
            stats: AccessStats::default(),
            clock: 0,
        })
    }

    pub fn config(&self) -> &MmuConfig {
        &self.config
    }

    #[inline]
    pub fn page_size(&self) -> usize {
        self.memory.page_size()
    }

    /// Read-only view of the frame pool
    pub fn memory(&self) -> &PhysicalMemory {
        &self.memory
    }

    /// Read-only view of the replacement policy
    pub fn policy(&self) -> &ReplacementPolicy {
        &self.policy
    }

    pub fn process(&self, pid: Pid) -> Option<&Process> {
        self.processes.get(&pid)
    }

    /// Live processes by ascending pid
    pub fn processes(&self) -> impl Iterator<Item = &Process> + '_ {
        self.processes.values()
    }

    /// Create a process with ceil(virtual_size / page_size) pages, none resident.
    ///
    /// The page size must match the one the MMU was configured with, and the
    /// page table may hold at most `MAX_PROCESS_PAGES` entries.
    pub fn create_process(&mut self, virtual_size: usize, page_size: usize) -> Result<Pid> {
        if page_size != self.page_size() {
            return Err(MmuError::InvalidConfig(format!(
                "process page size {} differs from frame size {}",
                page_size,
                self.page_size()
            )));
        }
        if virtual_size == 0 {
            return Err(MmuError::InvalidConfig(
                "virtual address space must be at least 1 byte".to_string(),
            ));
        }
        let num_pages = virtual_size.div_ceil(page_size);
        if num_pages > MAX_PROCESS_PAGES {
            return Err(MmuError::InvalidConfig(format!(
                "{} pages requested, a process may have at most {}",
                num_pages, MAX_PROCESS_PAGES
            )));
        }

        let pid = Pid(self.next_pid);
        self.next_pid += 1;
        let process = Process::new(pid, virtual_size, page_size);
        info!("{} created with {} pages", pid, process.num_pages());
        self.processes.insert(pid, process);
        Ok(pid)
    }

    /// Free every frame held by `pid` and drop it from the process table.
    ///
    /// Returns false if the pid is unknown.
    pub fn terminate_process(&mut self, pid: Pid) -> bool {
        let Some(process) = self.processes.remove(&pid) else {
            return false;
        };

        let mut freed = 0;
        for (page, frame) in process.resident_pages() {
            debug_assert_eq!(self.memory.owner(frame), Some(FrameOwner::new(pid, page)));
            self.memory.free_frame(frame);
            self.policy.page_removed(frame);
            freed += 1;
        }
        info!("{} terminated, {} frames released", pid, freed);
        true
    }

    /// Access byte `virtual_address` of process `pid`.
    ///
    /// `future` is the lookahead for Optimal, as virtual addresses; it is
    /// converted to page numbers here.
    pub fn access_virtual_address(
        &mut self,
        pid: Pid,
        virtual_address: usize,
        future: Option<&[usize]>,
    ) -> Result<AccessOutcome> {
        let page_size = self.page_size();
        let page = virtual_address / page_size;
        let offset = virtual_address % page_size;
        let future_pages: Option<Vec<usize>> =
            future.map(|addrs| addrs.iter().map(|addr| addr / page_size).collect());
        self.resolve(pid, page, offset, future_pages.as_deref())
    }

    /// Access the start of page `page` of process `pid`.
    ///
    /// `future` is the lookahead for Optimal, as page numbers.
    pub fn access_page(
        &mut self,
        pid: Pid,
        page: usize,
        future: Option<&[usize]>,
    ) -> Result<AccessOutcome> {
        self.resolve(pid, page, 0, future)
    }

    fn resolve(
        &mut self,
        pid: Pid,
        page: usize,
        offset: usize,
        future: Option<&[usize]>,
    ) -> Result<AccessOutcome> {
        let process = self.processes.get(&pid).ok_or(MmuError::UnknownProcess { pid })?;
        let entry = process.get_page_entry(page).ok_or(MmuError::AddressOutOfRange {
            pid,
            page,
            num_pages: process.num_pages(),
        })?;

        if let Some(frame) = entry.frame.filter(|_| entry.valid) {
            self.stats.hits += 1;
            self.policy.page_accessed(frame, page);
            self.touch(pid, page, frame);
            trace!("{} page {}: hit in frame {}", pid, page, frame);
            return Ok(AccessOutcome {
                pid,
                page,
                offset,
                frame,
                physical_address: self.memory.frame_to_address(frame) + offset,
                status: AccessStatus::Hit,
                evicted: None,
            });
        }

        self.stats.faults += 1;
        let (frame, status, evicted) = match self.memory.allocate_frame(pid, page) {
            Some(frame) => (frame, AccessStatus::FaultFree, None),
            None => {
                let (frame, victim) = self.evict(future)?;
                self.memory.update_frame(frame, pid, page);
                (frame, AccessStatus::FaultReplace, Some(victim))
            }
        };
        self.touch(pid, page, frame);
        self.policy.page_loaded(frame, page);
        trace!("{} page {}: {} into frame {}", pid, page, status, frame);

        Ok(AccessOutcome {
            pid,
            page,
            offset,
            frame,
            physical_address: self.memory.frame_to_address(frame) + offset,
            status,
            evicted,
        })
    }

    /// Ask the policy for a victim and unmap it from its owner's page table.
    fn evict(&mut self, future: Option<&[usize]>) -> Result<(usize, FrameOwner)> {
        let Some(frame) = self.policy.select_victim(future, &self.memory) else {
            let err = MmuError::VictimSelectionFailure { frames: self.memory.num_frames() };
            error!("{}", err);
            return Err(err);
        };
        let Some(victim) = self.memory.owner(frame) else {
            let err = MmuError::InconsistentFrame { frame };
            error!("{}", err);
            return Err(err);
        };

        match self
            .processes
            .get_mut(&victim.pid)
            .and_then(|process| process.get_page_entry_mut(victim.page))
        {
            Some(entry) => entry.invalidate(),
            None => warn!(
                "frame {} held {} page {} but that process is gone",
                frame, victim.pid, victim.page
            ),
        }
        debug!("evicting {} page {} from frame {}", victim.pid, victim.page, frame);
        Ok((frame, victim))
    }

    /// Map (pid, page) to `frame` and stamp the access time
    fn touch(&mut self, pid: Pid, page: usize, frame: usize) {
        self.clock += 1;
        if let Some(entry) = self
            .processes
            .get_mut(&pid)
            .and_then(|process| process.get_page_entry_mut(page))
        {
            entry.map(frame);
            entry.last_access = Some(self.clock);
        }
    }

    pub fn get_stats(&self) -> AccessStats {
        self.stats
    }

    /// Copy of a process page table, for display
    pub fn get_process_info(&self, pid: Pid) -> Result<ProcessSnapshot> {
        self.processes
            .get(&pid)
            .map(Process::snapshot)
            .ok_or(MmuError::UnknownProcess { pid })
    }

    /// Terminate every process and start over with fresh counters and pids
    pub fn reset(&mut self) {
        let pids: Vec<Pid> = self.processes.keys().copied().collect();
        for pid in pids {
            self.terminate_process(pid);
        }
        self.stats = AccessStats::default();
        self.policy.reset();
        self.next_pid = FIRST_PID;
        self.clock = 0;
        info!("mmu reset");
    }

    /// Check that the frame pool, every page table and the policy agree.
    ///
    /// - each occupied frame is claimed by exactly one valid entry, and each
    ///   valid entry points at a frame holding its (pid, page)
    /// - the policy tracks exactly the occupied frames
    pub fn is_consistent(&self) -> bool {
        if self.memory.free_count() + self.memory.occupied_count() != self.memory.num_frames() {
            return false;
        }

        for (frame, owner) in self.memory.occupied_frames() {
            let claimed = self
                .processes
                .get(&owner.pid)
                .and_then(|process| process.get_page_entry(owner.page))
                .is_some_and(|entry| entry.valid && entry.frame == Some(frame));
            if !claimed {
                debug!("frame {} held by {} is not mapped back", frame, owner);
                return false;
            }
        }

        let mut valid_entries = 0;
        for process in self.processes.values() {
            for (page, frame) in process.resident_pages() {
                valid_entries += 1;
                if self.memory.owner(frame) != Some(FrameOwner::new(process.pid(), page)) {
                    debug!("{} page {} claims frame {} it does not hold", process.pid(), page, frame);
                    return false;
                }
            }
        }
        if valid_entries != self.memory.occupied_count() {
            return false;
        }

        let mut tracked = self.policy.resident_frames();
        tracked.sort_unstable();
        let occupied: Vec<usize> = self.memory.occupied_frames().map(|(frame, _)| frame).collect();
        tracked == occupied
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::replacement::PolicyKind;

    const PAGE: usize = 4096;

    fn mmu(frames: usize, policy: PolicyKind) -> MemoryManagementUnit {
        MemoryManagementUnit::new(MmuConfig::new(frames, PAGE, policy)).unwrap()
    }

    #[test]
    fn test_rejects_invalid_config() {
        assert!(MemoryManagementUnit::new(MmuConfig::new(0, PAGE, PolicyKind::Fifo)).is_err());
        assert!(MemoryManagementUnit::new(MmuConfig::new(4, 0, PolicyKind::Fifo)).is_err());
    }

    #[test]
    fn test_create_process_builds_invalid_page_table() {
        let mut mmu = mmu(4, PolicyKind::Fifo);
        let pid = mmu.create_process(32768, PAGE).unwrap();

        let info = mmu.get_process_info(pid).unwrap();
        assert_eq!(info.num_pages(), 8);
        assert!(info.entries.iter().all(|entry| !entry.valid && entry.frame_number() == -1));
    }

    #[test]
    fn test_create_process_validation() {
        let mut mmu = mmu(4, PolicyKind::Fifo);
        assert!(matches!(mmu.create_process(32768, 512), Err(MmuError::InvalidConfig(_))));
        assert!(matches!(mmu.create_process(0, PAGE), Err(MmuError::InvalidConfig(_))));
        // Failed creations do not consume pids
        assert_eq!(mmu.create_process(PAGE, PAGE).unwrap(), Pid(0));
    }

    #[test]
    fn test_create_process_rejects_huge_page_table() {
        let mut mmu = mmu(4, PolicyKind::Fifo);
        let too_big = (MAX_PROCESS_PAGES + 1) * PAGE;
        assert!(matches!(mmu.create_process(too_big, PAGE), Err(MmuError::InvalidConfig(_))));
        assert_eq!(mmu.processes().count(), 0);
    }

    #[test]
    fn test_rejects_physical_memory_beyond_address_range() {
        let config = MmuConfig::new(4, usize::MAX / 2, PolicyKind::Fifo);
        assert!(matches!(MemoryManagementUnit::new(config), Err(MmuError::InvalidConfig(_))));
    }

    #[test]
    fn test_highest_physical_address() {
        let page_size = usize::MAX / 2;
        let mut mmu =
            MemoryManagementUnit::new(MmuConfig::new(2, page_size, PolicyKind::Lru)).unwrap();
        let pid = mmu.create_process(2 * page_size, page_size).unwrap();

        mmu.access_page(pid, 0, None).unwrap();
        let last_byte = mmu.access_virtual_address(pid, 2 * page_size - 1, None).unwrap();
        assert_eq!(last_byte.frame, 1);
        assert_eq!(last_byte.offset, page_size - 1);
        assert_eq!(last_byte.physical_address, 2 * page_size - 1);
    }

    #[test]
    fn test_pids_are_never_reused() {
        let mut mmu = mmu(4, PolicyKind::Fifo);
        let first = mmu.create_process(PAGE, PAGE).unwrap();
        assert!(mmu.terminate_process(first));
        let second = mmu.create_process(PAGE, PAGE).unwrap();
        assert_eq!(first, Pid(0));
        assert_eq!(second, Pid(1));
    }

    #[test]
    fn test_hit_after_fault() {
        let mut mmu = mmu(4, PolicyKind::Lru);
        let pid = mmu.create_process(8 * PAGE, PAGE).unwrap();

        let first = mmu.access_virtual_address(pid, 2 * PAGE + 100, None).unwrap();
        assert_eq!(first.status, AccessStatus::FaultFree);
        assert_eq!(first.frame, 0);
        assert_eq!(first.physical_address, 100);

        let second = mmu.access_virtual_address(pid, 2 * PAGE + 7, None).unwrap();
        assert_eq!(second.status, AccessStatus::Hit);
        assert_eq!(second.physical_address, 7);

        let stats = mmu.get_stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.faults, 1);
        assert_eq!(stats.hit_ratio(), 50.0);
        assert!(mmu.is_consistent());
    }

    #[test]
    fn test_unknown_process_has_no_side_effects() {
        let mut mmu = mmu(2, PolicyKind::Fifo);
        let err = mmu.access_page(Pid(42), 0, None).unwrap_err();
        assert_eq!(err, MmuError::UnknownProcess { pid: Pid(42) });
        assert_eq!(mmu.get_stats(), AccessStats::default());
        assert!(mmu.get_process_info(Pid(42)).is_err());
        assert!(!mmu.terminate_process(Pid(42)));
    }

    #[test]
    fn test_out_of_range_has_no_side_effects() {
        let mut mmu = mmu(2, PolicyKind::Fifo);
        let pid = mmu.create_process(8 * PAGE, PAGE).unwrap();

        let err = mmu.access_page(pid, 9, None).unwrap_err();
        assert_eq!(err, MmuError::AddressOutOfRange { pid, page: 9, num_pages: 8 });
        let err = mmu.access_virtual_address(pid, 8 * PAGE, None).unwrap_err();
        assert!(matches!(err, MmuError::AddressOutOfRange { page: 8, .. }));

        assert_eq!(mmu.get_stats().total_accesses(), 0);
        assert_eq!(mmu.memory().free_count(), 2);
    }

    #[test]
    fn test_replacement_invalidates_victim() {
        let mut mmu = mmu(2, PolicyKind::Fifo);
        let pid = mmu.create_process(4 * PAGE, PAGE).unwrap();
        mmu.access_page(pid, 0, None).unwrap();
        mmu.access_page(pid, 1, None).unwrap();

        let outcome = mmu.access_page(pid, 2, None).unwrap();
        assert_eq!(outcome.status, AccessStatus::FaultReplace);
        assert_eq!(outcome.frame, 0);
        assert_eq!(outcome.evicted, Some(FrameOwner::new(pid, 0)));
        assert_eq!(
            outcome.to_string(),
            "Page fault! page 0 (P0) replaced in frame 0, physical address 0"
        );

        let info = mmu.get_process_info(pid).unwrap();
        assert!(!info.entries[0].valid);
        assert_eq!(info.entries[2].frame, Some(0));
        assert!(mmu.is_consistent());
    }

    #[test]
    fn test_eviction_across_processes() {
        let mut mmu = mmu(2, PolicyKind::Lru);
        let a = mmu.create_process(4 * PAGE, PAGE).unwrap();
        let b = mmu.create_process(4 * PAGE, PAGE).unwrap();
        mmu.access_page(a, 0, None).unwrap();
        mmu.access_page(b, 0, None).unwrap();
        mmu.access_page(a, 0, None).unwrap();

        let outcome = mmu.access_page(a, 1, None).unwrap();
        assert_eq!(outcome.evicted, Some(FrameOwner::new(b, 0)));
        assert!(!mmu.process(b).unwrap().get_page_entry(0).unwrap().valid);
        assert!(mmu.is_consistent());
    }

    #[test]
    fn test_virtual_address_lookahead_is_converted_to_pages() {
        let mut mmu = mmu(2, PolicyKind::Optimal);
        let pid = mmu.create_process(8 * PAGE, PAGE).unwrap();
        mmu.access_page(pid, 0, None).unwrap();
        mmu.access_page(pid, 1, None).unwrap();

        // page 0 is needed next, page 1 never again
        let future = [3, 5 * PAGE];
        let outcome = mmu.access_virtual_address(pid, 3 * PAGE, Some(&future)).unwrap();
        assert_eq!(outcome.evicted, Some(FrameOwner::new(pid, 1)));
    }

    #[test]
    fn test_policy_with_no_victim_is_internal_error() {
        let mut mmu = mmu(2, PolicyKind::Fifo);
        let pid = mmu.create_process(4 * PAGE, PAGE).unwrap();
        mmu.access_page(pid, 0, None).unwrap();
        mmu.access_page(pid, 1, None).unwrap();

        // frames stay occupied but the policy forgets them
        mmu.policy.reset();
        let err = mmu.access_page(pid, 2, None).unwrap_err();
        assert_eq!(err, MmuError::VictimSelectionFailure { frames: 2 });
        assert!(err.is_internal());
        assert!(mmu.get_process_info(pid).unwrap().entries[0].valid);
    }

    #[test]
    fn test_policy_naming_empty_frame_is_internal_error() {
        let mut mmu = mmu(2, PolicyKind::Fifo);
        let pid = mmu.create_process(4 * PAGE, PAGE).unwrap();
        mmu.access_page(pid, 0, None).unwrap();
        mmu.access_page(pid, 1, None).unwrap();

        mmu.policy.reset();
        mmu.policy.page_loaded(7, 3);
        let err = mmu.access_page(pid, 2, None).unwrap_err();
        assert_eq!(err, MmuError::InconsistentFrame { frame: 7 });
        assert!(err.is_internal());
        assert_eq!(mmu.memory().occupied_count(), 2);
    }

    #[test]
    fn test_terminate_releases_frames() {
        let mut mmu = mmu(3, PolicyKind::Fifo);
        let a = mmu.create_process(4 * PAGE, PAGE).unwrap();
        let b = mmu.create_process(4 * PAGE, PAGE).unwrap();
        mmu.access_page(a, 0, None).unwrap();
        mmu.access_page(b, 0, None).unwrap();
        mmu.access_page(a, 1, None).unwrap();

        assert!(mmu.terminate_process(a));
        assert_eq!(mmu.memory().free_frames().collect::<Vec<_>>(), vec![0, 2]);
        assert_eq!(mmu.policy().resident_frames(), vec![1]);
        assert!(mmu.is_consistent());
    }

    #[test]
    fn test_last_access_is_stamped() {
        let mut mmu = mmu(2, PolicyKind::Fifo);
        let pid = mmu.create_process(2 * PAGE, PAGE).unwrap();
        mmu.access_page(pid, 0, None).unwrap();
        mmu.access_page(pid, 1, None).unwrap();
        mmu.access_page(pid, 0, None).unwrap();

        let info = mmu.get_process_info(pid).unwrap();
        assert_eq!(info.entries[0].last_access, Some(3));
        assert_eq!(info.entries[1].last_access, Some(2));
    }

    #[test]
    fn test_reset() {
        let mut mmu = mmu(2, PolicyKind::Lru);
        let pid = mmu.create_process(4 * PAGE, PAGE).unwrap();
        for page in [0, 1, 2, 0] {
            mmu.access_page(pid, page, None).unwrap();
        }

        mmu.reset();
        assert_eq!(mmu.get_stats(), AccessStats::default());
        assert_eq!(mmu.processes().count(), 0);
        assert_eq!(mmu.memory().free_count(), 2);
        assert!(mmu.policy().is_empty());
        assert_eq!(mmu.create_process(PAGE, PAGE).unwrap(), Pid(0));
        assert!(mmu.is_consistent());
    }

    #[test]
    fn test_stats_ratios() {
        let empty = AccessStats::default();
        assert_eq!(empty.hit_ratio(), 0.0);
        assert_eq!(empty.fault_ratio(), 0.0);

        let stats = AccessStats { hits: 3, faults: 1 };
        assert_eq!(stats.total_accesses(), 4);
        assert_eq!(stats.hit_ratio(), 75.0);
        assert_eq!(stats.fault_ratio(), 25.0);
        assert_eq!(stats.to_string(), "hits=3 faults=1 total=4 hit_ratio=75.00%");
    }

    #[test]
    fn test_status_tags() {
        assert_eq!(AccessStatus::Hit.tag(), "hit");
        assert_eq!(AccessStatus::FaultFree.tag(), "fault_free");
        assert_eq!(AccessStatus::FaultReplace.tag(), "fault_replace");
        assert!(!AccessStatus::Hit.is_fault());
        assert!(AccessStatus::FaultReplace.is_fault());
    }
}
