use core::ffi::c_long;

use crate::platform::{self, Timespec};

/// Block the calling thread for `ms` milliseconds.
///
/// The duration is forwarded unchecked. Returns 0 on success and the
/// platform's status otherwise (negative durations are rejected by the
/// platform, an interrupted sleep returns early with its status).
pub fn sleep(ms: i32) -> i32 {
    platform::nanosleep(&to_timespec(ms))
}

fn to_timespec(ms: i32) -> Timespec {
    Timespec {
        tv_sec: c_long::from(ms / 1000),
        tv_nsec: c_long::from(ms % 1000) * 1_000_000,
    }
}
