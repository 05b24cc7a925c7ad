//! Process-wide stream handles, looked up once on first use.

use core::sync::atomic::{AtomicI32, Ordering};

use crate::platform::{self, RawFd, STD_ERROR_HANDLE, STD_OUTPUT_HANDLE};

const UNSET: i32 = i32::MIN;

/// A lazily resolved handle for one standard stream selector.
///
/// Resolution is idempotent, so a race between two first callers only
/// costs a duplicate lookup; both store the same value.
pub struct StdHandle {
    selector: i32,
    cached: AtomicI32,
}

impl StdHandle {
    pub const fn new(selector: i32) -> Self {
        Self {
            selector,
            cached: AtomicI32::new(UNSET),
        }
    }

    pub fn get(&self) -> Option<RawFd> {
        match self.cached.load(Ordering::Acquire) {
            UNSET => {
                let fd = platform::get_std_handle(self.selector)?;
                self.cached.store(fd, Ordering::Release);
                Some(fd)
            }
            fd => Some(fd),
        }
    }
}

static STDOUT: StdHandle = StdHandle::new(STD_OUTPUT_HANDLE);
static STDERR: StdHandle = StdHandle::new(STD_ERROR_HANDLE);

pub fn stdout() -> Option<RawFd> {
    STDOUT.get()
}

pub fn stderr() -> Option<RawFd> {
    STDERR.get()
}
