//! Admission gate bounding concurrent index submissions.
//!
//! Shared by every batch worker so the index sees at most `permits`
//! requests at once, however many files are in flight.

use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};

/// Counting semaphore built on `Mutex + Condvar`.
pub struct Semaphore {
    available: Mutex<usize>,
    cond: Condvar,
}

/// Permit released on drop.
pub struct Permit<'a>(&'a Semaphore);

impl Semaphore {
    /// `permits` of zero is treated as one so acquire can never deadlock.
    pub fn new(permits: usize) -> Self {
        Self {
            available: Mutex::new(permits.max(1)),
            cond: Condvar::new(),
        }
    }

    // A panic while holding the lock leaves the counter itself consistent.
    fn lock(&self) -> MutexGuard<'_, usize> {
        self.available.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Block until a permit is free.
    pub fn acquire(&self) -> Permit<'_> {
        let mut count = self.lock();
        while *count == 0 {
            count = self
                .cond
                .wait(count)
                .unwrap_or_else(PoisonError::into_inner);
        }
        *count -= 1;
        Permit(self)
    }

    /// Permits not currently held
    pub fn available(&self) -> usize {
        *self.lock()
    }
}

impl Drop for Permit<'_> {
    fn drop(&mut self) {
        *self.0.lock() += 1;
        self.0.cond.notify_one();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn acquire_and_release() {
        let gate = Semaphore::new(2);
        let p1 = gate.acquire();
        let _p2 = gate.acquire();
        assert_eq!(gate.available(), 0);
        drop(p1);
        assert_eq!(gate.available(), 1);
    }

    #[test]
    fn zero_permits_clamped() {
        let gate = Semaphore::new(0);
        assert_eq!(gate.available(), 1);
        let _p = gate.acquire();
        assert_eq!(gate.available(), 0);
    }

    #[test]
    fn blocking_acquire() {
        let gate = Arc::new(Semaphore::new(1));
        let held = gate.acquire();

        let gate2 = gate.clone();
        let handle = std::thread::spawn(move || {
            let _p = gate2.acquire();
            7
        });

        std::thread::sleep(std::time::Duration::from_millis(50));
        drop(held);

        assert_eq!(handle.join().unwrap(), 7);
        assert_eq!(gate.available(), 1);
    }
}
