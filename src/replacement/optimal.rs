use std::cmp::Reverse;
use std::collections::{BTreeSet, HashMap};

use log::{debug, warn};

use crate::memory::PhysicalMemory;

/// Belady's optimal (OPT) replacement.
///
/// Needs the pages that will be referenced after the current step. Only the
/// set of resident frames is kept here; the page each frame holds is read
/// from physical memory when a victim is chosen.
///
/// Victim order:
/// 1. a page that never appears in the lookahead, smallest page number first;
/// 2. otherwise the page whose next use is farthest away.
///
/// Remaining ties go to the smallest page number, then the lowest frame. An
/// empty or missing lookahead makes every page "never used again", so rule 1
/// applies.
#[derive(Debug, Clone, Default)]
pub struct OptimalPolicy {
    resident: BTreeSet<usize>,
}

/// Ranking key; the maximum is evicted.
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord)]
enum Rank {
    Referenced { distance: usize, page: Reverse<usize>, frame: Reverse<usize> },
    NeverReferenced { page: Reverse<usize>, frame: Reverse<usize> },
    /// Frame the policy believes resident but physical memory reports empty
    Orphaned { frame: Reverse<usize> },
}

impl OptimalPolicy {
    pub fn new() -> Self {
        OptimalPolicy::default()
    }

    pub fn page_loaded(&mut self, frame: usize) {
        self.resident.insert(frame);
    }

    pub fn select_victim(
        &mut self,
        future: Option<&[usize]>,
        memory: &PhysicalMemory,
    ) -> Option<usize> {
        let future = future.unwrap_or(&[]);
        if future.is_empty() {
            warn!("optimal: no lookahead available, evicting smallest resident page");
        }

        let mut next_use: HashMap<usize, usize> = HashMap::with_capacity(future.len());
        for (distance, &page) in future.iter().enumerate() {
            next_use.entry(page).or_insert(distance);
        }

        let victim = self
            .resident
            .iter()
            .map(|&frame| {
                let rank = match memory.owner(frame) {
                    None => Rank::Orphaned { frame: Reverse(frame) },
                    Some(owner) => match next_use.get(&owner.page) {
                        None => Rank::NeverReferenced {
                            page: Reverse(owner.page),
                            frame: Reverse(frame),
                        },
                        Some(&distance) => Rank::Referenced {
                            distance,
                            page: Reverse(owner.page),
                            frame: Reverse(frame),
                        },
                    },
                };
                (rank, frame)
            })
            .max_by(|a, b| a.0.cmp(&b.0))
            .map(|(rank, frame)| {
                debug!("optimal: evicting frame {} ({:?})", frame, rank);
                frame
            })?;

        self.resident.remove(&victim);
        Some(victim)
    }

    pub fn page_removed(&mut self, frame: usize) {
        self.resident.remove(&frame);
    }

    pub fn reset(&mut self) {
        self.resident.clear();
    }

    /// Resident frames in ascending order
    pub fn resident(&self) -> impl Iterator<Item = usize> + '_ {
        self.resident.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.resident.len()
    }
}
