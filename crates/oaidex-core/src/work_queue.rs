//! Lock-free queue handing batch files to parallel workers

use std::sync::atomic::{AtomicUsize, Ordering};

/// Each worker claims the next unclaimed item; every item goes to exactly
/// one worker.
pub struct WorkQueue<S> {
    items: Vec<S>,
    cursor: AtomicUsize,
}

impl<S> WorkQueue<S> {
    pub fn new(items: Vec<S>) -> Self {
        Self {
            items,
            cursor: AtomicUsize::new(0),
        }
    }

    /// Claim the next item together with its position in the queue
    pub fn next(&self) -> Option<(usize, &S)> {
        let i = self.cursor.fetch_add(1, Ordering::Relaxed);
        self.items.get(i).map(|item| (i, item))
    }

    pub fn total(&self) -> usize {
        self.items.len()
    }
}
