use std::collections::VecDeque;

use log::{trace, warn};

/// First-in, first-out replacement.
///
/// Evicts the frame that has been resident longest, regardless of hits.
/// Not a stack algorithm, so it can show Belady's anomaly.
#[derive(Debug, Clone, Default)]
pub struct FifoPolicy {
    /// Resident frames in arrival order, oldest at the front
    queue: VecDeque<usize>,
    load_counter: u64,
}

impl FifoPolicy {
    pub fn with_capacity(frames_limit: usize) -> Self {
        FifoPolicy {
            queue: VecDeque::with_capacity(frames_limit),
            load_counter: 0,
        }
    }

    pub fn page_loaded(&mut self, frame: usize, page: usize) {
        if let Some(pos) = self.queue.iter().position(|&f| f == frame) {
            warn!("fifo: frame {} loaded while already queued, requeueing", frame);
            self.queue.remove(pos);
        }
        self.queue.push_back(frame);
        self.load_counter += 1;
        trace!("fifo: frame {} now holds page {} (load #{})", frame, page, self.load_counter);
    }

    pub fn select_victim(&mut self) -> Option<usize> {
        self.queue.pop_front()
    }

    pub fn page_removed(&mut self, frame: usize) {
        self.queue.retain(|&f| f != frame);
    }

    pub fn reset(&mut self) {
        self.queue.clear();
        self.load_counter = 0;
    }

    /// Resident frames, next victim first
    pub fn queue_order(&self) -> impl Iterator<Item = usize> + '_ {
        self.queue.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }
}
