use std::collections::VecDeque;

use log::{trace, warn};

/// Least-recently-used replacement. A stack algorithm: more frames never
/// means more faults.
#[derive(Debug, Clone, Default)]
pub struct LruPolicy {
    /// Least recently used at the front
    usage_order: VecDeque<usize>,
}

impl LruPolicy {
    pub fn with_capacity(frames_limit: usize) -> Self {
        LruPolicy { usage_order: VecDeque::with_capacity(frames_limit) }
    }

    fn position(&self, frame: usize) -> Option<usize> {
        self.usage_order.iter().position(|&f| f == frame)
    }

    pub fn page_accessed(&mut self, frame: usize, page: usize) {
        match self.position(frame) {
            Some(pos) => {
                self.usage_order.remove(pos);
                self.usage_order.push_back(frame);
                trace!("lru: frame {} (page {}) is now most recent", frame, page);
            }
            None => warn!("lru: hit on untracked frame {}", frame),
        }
    }

    pub fn page_loaded(&mut self, frame: usize, page: usize) {
        if let Some(pos) = self.position(frame) {
            self.usage_order.remove(pos);
        }
        self.usage_order.push_back(frame);
        trace!("lru: frame {} loaded with page {}", frame, page);
    }

    pub fn select_victim(&mut self) -> Option<usize> {
        self.usage_order.pop_front()
    }

    pub fn page_removed(&mut self, frame: usize) {
        self.usage_order.retain(|&f| f != frame);
    }

    pub fn reset(&mut self) {
        self.usage_order.clear();
    }

    /// Resident frames, least recently used first
    pub fn usage_order(&self) -> impl Iterator<Item = usize> + '_ {
        self.usage_order.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.usage_order.len()
    }
}
