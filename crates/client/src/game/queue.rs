// Animation queue - pending frames behind the batch currently in flight
use std::collections::VecDeque;

use crate::render::TransitionId;

/// The batch currently animating, identified by its lead transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InFlight {
    pub frame: usize,
    pub lead: TransitionId,
}

/// FIFO of snapshot frames waiting for the running batch to finish.
/// Idle when nothing is in flight; Busy otherwise.
#[derive(Debug, Default)]
pub struct AnimationQueue {
    pending: VecDeque<usize>,
    in_flight: Option<InFlight>,
}

impl AnimationQueue {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn is_running(&self) -> bool {
        self.in_flight.is_some()
    }

    #[inline]
    pub fn in_flight(&self) -> Option<InFlight> {
        self.in_flight
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn push(&mut self, frame: usize) {
        self.pending.push_back(frame);
    }

    pub fn pop(&mut self) -> Option<usize> {
        self.pending.pop_front()
    }

    /// Frames waiting, oldest first.
    pub fn pending(&self) -> impl Iterator<Item = usize> + '_ {
        self.pending.iter().copied()
    }

    /// Mark a batch as running.
    pub fn start(&mut self, batch: InFlight) {
        debug_assert!(self.in_flight.is_none(), "two batches in flight");
        self.in_flight = Some(batch);
    }

    /// Finish the running batch if `lead` is its lead transition.
    pub fn finish(&mut self, lead: TransitionId) -> bool {
        match self.in_flight {
            Some(batch) if batch.lead == lead => {
                self.in_flight = None;
                true
            }
            _ => false,
        }
    }
}
