//! Bounded sliding window over recent readings.
//!
//! Each analyzer owns exactly one window. Readings are appended in arrival
//! order and the oldest is evicted once the bound is exceeded.

use crate::signal::types::Reading;
use std::collections::VecDeque;

/// Default number of readings kept per analyzer.
pub const DEFAULT_WINDOW_SIZE: usize = 30;

/// FIFO window holding at most `capacity` readings.
#[derive(Debug, Clone)]
pub struct SlidingWindow {
    /// Maximum number of readings retained
    capacity: usize,
    /// Readings, oldest first
    readings: VecDeque<Reading>,
}

impl SlidingWindow {
    /// Create an empty window. A zero capacity is raised to one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            readings: VecDeque::with_capacity(capacity + 1),
        }
    }

    /// Append a reading, returning the evicted one when the bound was exceeded.
    pub fn push(&mut self, reading: Reading) -> Option<Reading> {
        self.readings.push_back(reading);
        if self.readings.len() > self.capacity {
            self.readings.pop_front()
        } else {
            None
        }
    }

    /// The most recently appended reading.
    pub fn latest(&self) -> Option<&Reading> {
        self.readings.back()
    }

    pub fn len(&self) -> usize {
        self.readings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.readings.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Project one numeric channel out of every reading in the window.
    pub fn project<F>(&self, f: F) -> Vec<f64>
    where
        F: Fn(&Reading) -> u32,
    {
        self.readings.iter().map(|r| f64::from(f(r))).collect()
    }
}

impl Default for SlidingWindow {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW_SIZE)
    }
}
