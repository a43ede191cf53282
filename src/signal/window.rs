//! Fixed-capacity FIFO of the most recent samples.
//!
//! The backing `Deque` is sized for [`MAX_WINDOW`]; the runtime capacity is
//! the configured window length.  Pushing into a full window evicts the
//! oldest sample first.

use heapless::Deque;

use super::MAX_WINDOW;
use crate::sensors::Sample;

pub struct ReadingWindow {
    samples: Deque<Sample, MAX_WINDOW>,
    capacity: usize,
}

impl ReadingWindow {
    /// Create an empty window.  `capacity` is clamped to `1..=MAX_WINDOW`;
    /// config validation rejects anything outside that range earlier.
    pub fn new(capacity: usize) -> Self {
        debug_assert!((1..=MAX_WINDOW).contains(&capacity));
        Self {
            samples: Deque::new(),
            capacity: capacity.clamp(1, MAX_WINDOW),
        }
    }

    /// Append a sample, returning the evicted one if the window was full.
    pub fn push(&mut self, sample: Sample) -> Option<Sample> {
        let evicted = if self.samples.len() >= self.capacity {
            self.samples.pop_front()
        } else {
            None
        };
        // Cannot fail: len < capacity <= MAX_WINDOW after the eviction above.
        let _ = self.samples.push_back(sample);
        evicted
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// True once the window holds `capacity` samples (the cold-start gate).
    pub fn is_full(&self) -> bool {
        self.samples.len() >= self.capacity
    }

    /// Oldest-first iterator.
    pub fn iter(&self) -> impl Iterator<Item = &Sample> {
        self.samples.iter()
    }

    /// Sample values, oldest first.
    pub fn values(&self) -> heapless::Vec<f32, MAX_WINDOW> {
        self.samples.iter().map(Sample::value).collect()
    }

    pub fn latest(&self) -> Option<&Sample> {
        self.samples.back()
    }

    /// Arithmetic mean of the window, `None` when empty.
    pub fn average(&self) -> Option<f32> {
        if self.samples.is_empty() {
            return None;
        }
        let sum: f32 = self.samples.iter().map(Sample::value).sum();
        Some(sum / self.samples.len() as f32)
    }

    pub fn clear(&mut self) {
        self.samples.clear();
    }
}
