use std::collections::BTreeSet;
use std::fmt;

use log::debug;

use crate::process::Pid;

/// The (process, virtual page) pair held by an occupied frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FrameOwner {
    pub pid: Pid,
    pub page: usize,
}

impl FrameOwner {
    pub fn new(pid: Pid, page: usize) -> Self {
        FrameOwner { pid, page }
    }
}

impl fmt::Display for FrameOwner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.pid, self.page)
    }
}

/// Physical memory - a fixed pool of page-sized frames
///
/// This is the single source of truth for "which page does frame X hold".
/// Replacement policies keep only ordering metadata and look page identity
/// up here.
#[derive(Debug, Clone)]
pub struct PhysicalMemory {
    page_size: usize,
    /// frames[i] is None when frame i is empty
    frames: Vec<Option<FrameOwner>>,
    /// Always exactly the indices of the empty frames, ascending
    free_frames: BTreeSet<usize>,
}

impl PhysicalMemory {
    /// Create a pool of `num_frames` empty frames
    pub fn new(num_frames: usize, page_size: usize) -> Self {
        PhysicalMemory {
            page_size,
            frames: vec![None; num_frames],
            free_frames: (0..num_frames).collect(),
        }
    }

    #[inline]
    pub fn num_frames(&self) -> usize {
        self.frames.len()
    }

    #[inline]
    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Take the lowest-numbered free frame and give it to (pid, page).
    ///
    /// `None` means the pool is full. That is not an error: it is what makes
    /// the MMU fall back to eviction.
    pub fn allocate_frame(&mut self, pid: Pid, page: usize) -> Option<usize> {
        let frame = self.free_frames.pop_first()?;
        self.frames[frame] = Some(FrameOwner::new(pid, page));
        debug!("frame {} allocated to {} page {}", frame, pid, page);
        Some(frame)
    }

    /// Empty a frame and put it back in the free set.
    ///
    /// Returns the previous owner, or `None` if the index was out of range or
    /// the frame was already empty (in which case nothing changes).
    pub fn free_frame(&mut self, frame: usize) -> Option<FrameOwner> {
        let owner = self.frames.get_mut(frame)?.take()?;
        self.free_frames.insert(frame);
        debug!("frame {} freed (held {} page {})", frame, owner.pid, owner.page);
        Some(owner)
    }

    /// Overwrite the content of an occupied frame in place.
    ///
    /// Used on replacement so the free set is never touched. Returns the
    /// previous owner; `None` (and no change) if the frame is empty or out of
    /// range.
    pub fn update_frame(&mut self, frame: usize, pid: Pid, page: usize) -> Option<FrameOwner> {
        let slot = self.frames.get_mut(frame)?;
        // an empty frame must go through allocate_frame
        let previous = (*slot)?;
        *slot = Some(FrameOwner::new(pid, page));
        Some(previous)
    }

    /// Who currently holds `frame`
    #[inline]
    pub fn owner(&self, frame: usize) -> Option<FrameOwner> {
        self.frames.get(frame).copied().flatten()
    }

    pub fn free_count(&self) -> usize {
        self.free_frames.len()
    }

    pub fn occupied_count(&self) -> usize {
        self.frames.len() - self.free_frames.len()
    }

    pub fn is_full(&self) -> bool {
        self.free_frames.is_empty()
    }

    /// Free frame indices in ascending order
    pub fn free_frames(&self) -> impl Iterator<Item = usize> + '_ {
        self.free_frames.iter().copied()
    }

    /// Occupied frames and their owners, by ascending frame index
    pub fn occupied_frames(&self) -> impl Iterator<Item = (usize, FrameOwner)> + '_ {
        self.frames
            .iter()
            .enumerate()
            .filter_map(|(frame, slot)| slot.map(|owner| (frame, owner)))
    }

    /// Read-only view of the whole frame table
    pub fn frames(&self) -> &[Option<FrameOwner>] {
        &self.frames
    }

    /// Starting physical address of a frame
    #[inline]
    pub fn frame_to_address(&self, frame: usize) -> usize {
        frame * self.page_size
    }
}
