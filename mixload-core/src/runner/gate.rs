use std::sync::atomic::{AtomicU64, Ordering};

/// Hands out a fixed number of iterations across all VUs.
#[derive(Debug)]
pub struct IterationGate {
    counter: AtomicU64,
    iterations: u64,
}

impl IterationGate {
    pub fn new(iterations: u64) -> Self {
        Self {
            counter: AtomicU64::new(0),
            iterations,
        }
    }

    /// Claims one iteration; `false` once all have been handed out.
    pub fn next(&self) -> bool {
        self.counter.fetch_add(1, Ordering::Relaxed) < self.iterations
    }

    pub fn total(&self) -> u64 {
        self.iterations
    }

    pub fn claimed(&self) -> u64 {
        self.counter.load(Ordering::Relaxed).min(self.iterations)
    }
}
