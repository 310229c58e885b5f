//! Reusable cycle barrier for the analyzer cohort.
//!
//! Each analyzer arrives once per cycle after computing its result. The last
//! arriver resets the count and wakes everyone; the others block on the
//! condition variable until then. Only after crossing does an analyzer publish
//! to the aggregation queue, so a cycle's results are all computed before any
//! of them is queued.
//!
//! The arrival count is private. A generation number distinguishes cycles so a
//! waiter is released exactly once per cycle even under spurious wakeups.

use std::sync::{Condvar, Mutex};

/// Outcome of crossing the barrier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BarrierCrossing {
    /// Cycle number that was completed, starting at 1
    pub cycle: u64,
    /// Whether this caller was the last arriver that released the others
    pub is_last: bool,
}

/// Errors returned by [`CycleBarrier::arrive_and_wait`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BarrierError {
    /// The barrier was aborted; no further cycles will complete.
    Broken,
}

impl std::fmt::Display for BarrierError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BarrierError::Broken => write!(f, "Barrier is broken"),
        }
    }
}

impl std::error::Error for BarrierError {}

#[derive(Debug, Default)]
struct BarrierState {
    /// Arrivals in the current cycle, always below `parties` outside the reset
    done_count: usize,
    /// Completed cycles
    generation: u64,
    broken: bool,
}

/// Counted rendezvous shared by the `parties` analyzers.
#[derive(Debug)]
pub struct CycleBarrier {
    parties: usize,
    state: Mutex<BarrierState>,
    released: Condvar,
}

impl CycleBarrier {
    /// Create a barrier for `parties` participants. Zero is raised to one.
    pub fn new(parties: usize) -> Self {
        Self {
            parties: parties.max(1),
            state: Mutex::new(BarrierState::default()),
            released: Condvar::new(),
        }
    }

    pub fn parties(&self) -> usize {
        self.parties
    }

    /// Register arrival and block until every party has arrived for this cycle.
    pub fn arrive_and_wait(&self) -> Result<BarrierCrossing, BarrierError> {
        let mut state = self.state.lock().map_err(|_| BarrierError::Broken)?;
        if state.broken {
            return Err(BarrierError::Broken);
        }

        state.done_count += 1;
        if state.done_count == self.parties {
            state.done_count = 0;
            state.generation += 1;
            let cycle = state.generation;
            drop(state);
            self.released.notify_all();
            return Ok(BarrierCrossing {
                cycle,
                is_last: true,
            });
        }

        let waiting_on = state.generation;
        let state = self
            .released
            .wait_while(state, |s| s.generation == waiting_on && !s.broken)
            .map_err(|_| BarrierError::Broken)?;

        if state.generation == waiting_on {
            return Err(BarrierError::Broken);
        }
        Ok(BarrierCrossing {
            cycle: waiting_on + 1,
            is_last: false,
        })
    }

    /// Break the barrier and wake every waiter with [`BarrierError::Broken`].
    ///
    /// Called by a failing party so its siblings never wait on it forever.
    pub fn abort(&self) {
        match self.state.lock() {
            Ok(mut state) => state.broken = true,
            Err(poisoned) => poisoned.into_inner().broken = true,
        }
        self.released.notify_all();
    }

    pub fn is_broken(&self) -> bool {
        match self.state.lock() {
            Ok(state) => state.broken,
            Err(_) => true,
        }
    }

    /// Number of cycles fully completed so far.
    pub fn cycles_completed(&self) -> u64 {
        match self.state.lock() {
            Ok(state) => state.generation,
            Err(poisoned) => poisoned.into_inner().generation,
        }
    }
}
