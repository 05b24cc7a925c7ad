//! Runtime-adjustable settings.
//!
//! Both settings are process-wide atomics so they can be changed through
//! the C ABI before (or between) calls without any locking.

use core::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// Scratch buffer size used by `print` unless reconfigured.
pub const DEFAULT_SCRATCH_SIZE: usize = 4096;

/// Smallest usable scratch buffer: one content byte or the newline, plus
/// the terminator the formatter always writes.
pub const MIN_SCRATCH_SIZE: usize = 2;

static SCRATCH_SIZE: AtomicUsize = AtomicUsize::new(DEFAULT_SCRATCH_SIZE);
static DIAGNOSTICS: AtomicBool = AtomicBool::new(true);

/// Current scratch buffer size for `print`.
pub fn scratch_size() -> usize {
    SCRATCH_SIZE.load(Ordering::Relaxed)
}

/// Set the scratch buffer size for `print`, clamped to `MIN_SCRATCH_SIZE`.
/// Returns the size actually in effect.
pub fn set_scratch_size(bytes: usize) -> usize {
    let bytes = clamp_scratch_size(bytes);
    SCRATCH_SIZE.store(bytes, Ordering::Relaxed);
    bytes
}

pub const fn clamp_scratch_size(bytes: usize) -> usize {
    if bytes < MIN_SCRATCH_SIZE {
        MIN_SCRATCH_SIZE
    } else {
        bytes
    }
}

/// Whether warnings are written to stderr. Fatal reports ignore this.
pub fn diagnostics_enabled() -> bool {
    DIAGNOSTICS.load(Ordering::Relaxed)
}

pub fn set_diagnostics(enabled: bool) {
    DIAGNOSTICS.store(enabled, Ordering::Relaxed);
}
