//! Instrumented heap.
//!
//! `TrackingHeap` wraps another heap, surrounds every block with red
//! zones, records it in a `Tracker`, and on release checks the zones,
//! poisons the user bytes, and refuses pointers it never handed out.

pub mod redzone;
pub mod spinlock;
pub mod tracker;

pub use crate::heap::AllocKind;

use crate::diagnostic;
use crate::heap::RawHeap;
use redzone::Corruption;
use spinlock::SpinLock;
use tracker::Tracker;

/// Tracker capacity of the process-wide default heap.
pub const GLOBAL_CAPACITY: usize = 16384;

/// Why a release was refused.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Fault {
    /// Not a live allocation of this heap (double free or foreign pointer).
    InvalidFree { addr: usize },
    /// A red zone was overwritten while the block was live.
    Overflow {
        addr: usize,
        size: usize,
        corruption: Corruption,
    },
}

pub struct TrackingHeap<H, const N: usize> {
    inner: H,
    tracker: SpinLock<Tracker<N>>,
}

impl<H: RawHeap, const N: usize> TrackingHeap<H, N> {
    pub const fn new(inner: H) -> Self {
        Self {
            inner,
            tracker: SpinLock::new(Tracker::new()),
        }
    }

    /// Number of blocks allocated and not yet released.
    pub fn live(&self) -> usize {
        self.tracker.lock().live()
    }

    pub fn live_bytes(&self) -> usize {
        self.tracker.lock().live_bytes()
    }

    pub fn is_live(&self, ptr: *const u8) -> bool {
        self.tracker.lock().lookup(ptr as usize).is_some()
    }

    /// Validate and release `ptr`, or leave it untouched and return the fault.
    ///
    /// The lookup, the red-zone check and the removal happen under one
    /// lock, so two racing releases of the same pointer cannot both pass.
    ///
    /// # Safety
    /// If `ptr` is tracked by this heap it must not be in use elsewhere.
    pub unsafe fn try_release(&self, ptr: *mut u8) -> Result<(), Fault> {
        let addr = ptr as usize;
        let mut tracker = self.tracker.lock();
        let (size, _kind) = tracker.lookup(addr).ok_or(Fault::InvalidFree { addr })?;

        // SAFETY: a tracked pointer sits REDZONE_SIZE past the inner block.
        let base = unsafe { ptr.sub(redzone::REDZONE_SIZE) };
        // SAFETY: base was prepared by redzone::fill in alloc_zeroed.
        unsafe { redzone::check(base, size) }.map_err(|corruption| Fault::Overflow {
            addr,
            size,
            corruption,
        })?;
        tracker.remove(addr);
        drop(tracker);

        // SAFETY: ptr has size user bytes; base came from the inner heap and
        // is no longer reachable through the tracker.
        unsafe {
            redzone::poison(ptr, size);
            self.inner.release(base);
        }
        Ok(())
    }

    /// Write every live block to stderr. Returns the number of leaks.
    pub fn report_leaks(&self) -> usize {
        let tracker = self.tracker.lock();
        let count = tracker.live();
        if count > 0 {
            diagnostic::leak_header();
            tracker.for_each_live(diagnostic::leak);
            diagnostic::leak_footer(count);
        }
        count
    }
}

// SAFETY: the user region lies inside an inner block that is zero-filled
// and stays allocated until release.
unsafe impl<H: RawHeap, const N: usize> RawHeap for TrackingHeap<H, N> {
    fn alloc_zeroed(&self, bytes: usize, kind: AllocKind) -> *mut u8 {
        let Some(total) = bytes.checked_add(2 * redzone::REDZONE_SIZE) else {
            return core::ptr::null_mut();
        };
        let base = self.inner.alloc_zeroed(total, kind);
        if base.is_null() {
            return base;
        }
        // SAFETY: base points to total == redzone::total_size(bytes) bytes.
        let user = unsafe {
            redzone::fill(base, bytes);
            base.add(redzone::REDZONE_SIZE)
        };
        if !self.tracker.lock().insert(user as usize, bytes, kind) {
            // An untracked block could never be released, so the tracker
            // being full is reported as an allocation failure.
            // SAFETY: base came from the inner heap and was never handed out.
            unsafe { self.inner.release(base) };
            return core::ptr::null_mut();
        }
        user
    }

    unsafe fn release(&self, ptr: *mut u8) {
        if ptr.is_null() {
            return;
        }
        // SAFETY: forwarded caller guarantee.
        match unsafe { self.try_release(ptr) } {
            Ok(()) => {}
            Err(Fault::InvalidFree { addr }) => diagnostic::invalid_free(addr),
            Err(Fault::Overflow {
                addr,
                size,
                corruption,
            }) => diagnostic::overflow_detected(addr, size, corruption.prefix, corruption.suffix),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::heap::{ProcessHeap, Scratch, alloc_in, free_in};

    fn tracked() -> TrackingHeap<ProcessHeap, 64> {
        TrackingHeap::new(ProcessHeap)
    }

    #[test]
    fn alloc_free_pair_leaves_nothing_live() {
        let heap = tracked();
        let ptr = alloc_in(&heap, 128, AllocKind::Buffer).unwrap();
        assert_eq!(heap.live(), 1);
        assert_eq!(heap.live_bytes(), 128);
        unsafe { free_in(&heap, ptr) };
        assert_eq!(heap.live(), 0);
        assert_eq!(heap.live_bytes(), 0);
        assert_eq!(heap.report_leaks(), 0);
    }

    #[test]
    fn zero_byte_alloc_is_tracked_like_any_other() {
        let heap = tracked();
        let ptr = alloc_in(&heap, 0, AllocKind::Buffer).unwrap();
        assert!(heap.is_live(ptr.as_ptr()));
        unsafe { free_in(&heap, ptr) };
        assert!(!heap.is_live(ptr.as_ptr()));
    }

    #[test]
    fn scratch_guard_releases_on_drop() {
        let heap = tracked();
        {
            let scratch = Scratch::new_in(&heap, 4096).unwrap();
            assert_eq!(scratch.capacity(), 4096);
            assert_eq!(heap.live(), 1);
        }
        assert_eq!(heap.live(), 0);
    }

    #[test]
    fn second_release_is_refused() {
        let heap = tracked();
        let ptr = alloc_in(&heap, 16, AllocKind::Buffer).unwrap();
        unsafe {
            assert_eq!(heap.try_release(ptr.as_ptr()), Ok(()));
            assert_eq!(
                heap.try_release(ptr.as_ptr()),
                Err(Fault::InvalidFree {
                    addr: ptr.as_ptr() as usize
                })
            );
        }
    }

    #[test]
    fn foreign_pointer_is_refused() {
        let heap = tracked();
        let mut local = 0u8;
        let addr = &mut local as *mut u8;
        assert_eq!(
            unsafe { heap.try_release(addr) },
            Err(Fault::InvalidFree {
                addr: addr as usize
            })
        );
    }

    #[test]
    fn write_past_the_end_is_caught_on_release() {
        let heap = tracked();
        let ptr = alloc_in(&heap, 8, AllocKind::Buffer).unwrap();
        unsafe { *ptr.as_ptr().add(8) = 0 };
        let fault = unsafe { heap.try_release(ptr.as_ptr()) };
        assert_eq!(
            fault,
            Err(Fault::Overflow {
                addr: ptr.as_ptr() as usize,
                size: 8,
                corruption: Corruption {
                    prefix: false,
                    suffix: true
                },
            })
        );
        // The refused block is still live; repair the zone and release it.
        unsafe { *ptr.as_ptr().add(8) = redzone::CANARY_BYTE };
        assert_eq!(unsafe { heap.try_release(ptr.as_ptr()) }, Ok(()));
        assert_eq!(heap.live(), 0);
    }

    #[test]
    fn leaks_are_counted() {
        let heap = tracked();
        let a = alloc_in(&heap, 10, AllocKind::Object).unwrap();
        let b = alloc_in(&heap, 20, AllocKind::Buffer).unwrap();
        assert_eq!(heap.report_leaks(), 2);
        unsafe {
            free_in(&heap, a);
            free_in(&heap, b);
        }
        assert_eq!(heap.report_leaks(), 0);
    }

    #[test]
    fn full_tracker_fails_the_allocation_instead_of_losing_the_block() {
        let heap: TrackingHeap<ProcessHeap, 2> = TrackingHeap::new(ProcessHeap);
        let a = alloc_in(&heap, 8, AllocKind::Buffer).unwrap();
        let b = alloc_in(&heap, 8, AllocKind::Buffer).unwrap();
        assert_eq!(
            alloc_in(&heap, 8, AllocKind::Buffer),
            Err(Error::AllocFailed { bytes: 8 })
        );
        assert_eq!(heap.live(), 2);

        // Every pointer that was handed out can still be released.
        assert_eq!(unsafe { heap.try_release(a.as_ptr()) }, Ok(()));
        let c = alloc_in(&heap, 8, AllocKind::Buffer).unwrap();
        unsafe {
            free_in(&heap, b);
            free_in(&heap, c);
        }
        assert_eq!(heap.live(), 0);
    }

    #[test]
    fn racing_releases_of_one_pointer_free_it_once() {
        use std::sync::Barrier;
        use std::thread;

        let heap = tracked();
        for _ in 0..32 {
            let addr = alloc_in(&heap, 32, AllocKind::Buffer).unwrap().as_ptr() as usize;
            let barrier = &Barrier::new(2);
            let heap = &heap;
            let released = thread::scope(|s| {
                let workers: Vec<_> = (0..2)
                    .map(move |_| {
                        s.spawn(move || {
                            barrier.wait();
                            unsafe { heap.try_release(addr as *mut u8) }.is_ok()
                        })
                    })
                    .collect();
                workers
                    .into_iter()
                    .map(|w| w.join().unwrap_or(false))
                    .filter(|&ok| ok)
                    .count()
            });
            assert_eq!(released, 1);
        }
        assert_eq!(heap.live(), 0);
    }
}
