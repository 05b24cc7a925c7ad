//! The lock around a [`TrackingHeap`](super::TrackingHeap)'s table of live
//! blocks.

use core::cell::UnsafeCell;
use core::ops::{Deref, DerefMut};
use core::sync::atomic::{AtomicBool, Ordering};

/// Serialises every `aki_alloc` / `aki_free` on the default heap.
///
/// Critical sections are one or two table lookups plus a red-zone check, so
/// waiters spin (test-and-test-and-set) instead of parking. The lock never
/// allocates, which keeps it usable from inside the heap it protects.
pub struct SpinLock<T> {
    locked: AtomicBool,
    data: UnsafeCell<T>,
}

// SAFETY: access to data is serialised by `locked`.
unsafe impl<T: Send> Sync for SpinLock<T> {}
unsafe impl<T: Send> Send for SpinLock<T> {}

impl<T> SpinLock<T> {
    pub const fn new(data: T) -> Self {
        Self {
            locked: AtomicBool::new(false),
            data: UnsafeCell::new(data),
        }
    }

    fn try_acquire(&self) -> bool {
        self.locked
            .compare_exchange_weak(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_ok()
    }

    /// Spin until the table is ours.
    pub fn lock(&self) -> SpinLockGuard<'_, T> {
        while !self.try_acquire() {
            while self.locked.load(Ordering::Relaxed) {
                core::hint::spin_loop();
            }
        }
        SpinLockGuard { lock: self }
    }
}

pub struct SpinLockGuard<'a, T> {
    lock: &'a SpinLock<T>,
}

impl<T> Deref for SpinLockGuard<'_, T> {
    type Target = T;
    fn deref(&self) -> &T {
        // SAFETY: the guard exists only while the lock is held.
        unsafe { &*self.lock.data.get() }
    }
}

impl<T> DerefMut for SpinLockGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        // SAFETY: the guard exists only while the lock is held.
        unsafe { &mut *self.lock.data.get() }
    }
}

impl<T> Drop for SpinLockGuard<'_, T> {
    fn drop(&mut self) {
        self.lock.locked.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn concurrent_increments_are_not_lost() {
        let counter = Arc::new(SpinLock::new(0usize));
        let workers: Vec<_> = (0..4)
            .map(|_| {
                let counter = Arc::clone(&counter);
                thread::spawn(move || {
                    for _ in 0..1000 {
                        *counter.lock() += 1;
                    }
                })
            })
            .collect();
        for worker in workers {
            worker.join().unwrap();
        }
        assert_eq!(*counter.lock(), 4000);
    }

    #[test]
    fn tracker_counters_stay_consistent_across_threads() {
        use crate::heap::AllocKind;
        use crate::sanitize::tracker::Tracker;

        let table = SpinLock::new(Tracker::<256>::new());
        thread::scope(|s| {
            for worker in 0..4usize {
                let table = &table;
                s.spawn(move || {
                    for i in 0..500usize {
                        let addr = (worker << 20) | ((i % 32 + 1) << 4);
                        assert!(table.lock().insert(addr, 8, AllocKind::Buffer));
                        assert_eq!(table.lock().remove(addr).map(|(size, _)| size), Some(8));
                    }
                });
            }
        });
        let table = table.lock();
        assert_eq!(table.live(), 0);
        assert_eq!(table.live_bytes(), 0);
    }
}
