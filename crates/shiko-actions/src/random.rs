//! Random draws behind a seam
//!
//! Triggers that pick from an alphabet take a [`Random`] so tests can
//! script the picks.

use parking_lot::Mutex;
use rand::Rng;
use std::collections::VecDeque;

/// Source of uniform indices
pub trait Random: Send + Sync {
    /// Index in `0..len`; `len` is never zero
    fn index(&self, len: usize) -> usize;
}

/// Thread-local generator from `rand`
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadRandom;

impl Random for ThreadRandom {
    fn index(&self, len: usize) -> usize {
        rand::rng().random_range(0..len)
    }
}

/// Replays a fixed sequence of indices, cycling when exhausted
#[derive(Debug)]
pub struct SequenceRandom {
    script: Vec<usize>,
    pending: Mutex<VecDeque<usize>>,
}

impl SequenceRandom {
    pub fn new(script: impl Into<Vec<usize>>) -> Self {
        let script = script.into();
        Self {
            pending: Mutex::new(script.iter().copied().collect()),
            script,
        }
    }
}

impl Random for SequenceRandom {
    fn index(&self, len: usize) -> usize {
        let mut pending = self.pending.lock();
        if pending.is_empty() {
            pending.extend(self.script.iter().copied());
        }
        pending.pop_front().unwrap_or_default() % len
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequence_replays_and_cycles() {
        let random = SequenceRandom::new([2, 0, 1]);
        let drawn: Vec<_> = (0..5).map(|_| random.index(4)).collect();
        assert_eq!(drawn, [2, 0, 1, 2, 0]);
    }

    #[test]
    fn sequence_wraps_into_range() {
        let random = SequenceRandom::new([7]);
        assert_eq!(random.index(4), 3);
    }

    #[test]
    fn empty_sequence_draws_zero() {
        assert_eq!(SequenceRandom::new(Vec::new()).index(4), 0);
    }

    #[test]
    fn thread_random_stays_in_range() {
        let random = ThreadRandom;
        assert!((0..100).all(|_| random.index(4) < 4));
    }
}
