//! The C ABI that compiled Aki programs link against.
//!
//! Allocation failure is fatal here: language code has no way to recover,
//! so the runtime reports it and aborts instead of returning null.

use core::ptr::{self, NonNull};

use crate::config;
use crate::diagnostic;
use crate::error::{Error, Result};
use crate::heap;
use crate::io;
use crate::string::{self, AkiStr};
use crate::time;

fn or_abort<T>(res: Result<T>) -> T {
    match res {
        Ok(v) => v,
        Err(Error::AllocFailed { bytes }) => diagnostic::alloc_failed(bytes),
        Err(err) => diagnostic::fatal(&err),
    }
}

/// Allocate `bytes` zeroed bytes. Never returns null.
#[unsafe(no_mangle)]
pub extern "C" fn aki_alloc(bytes: usize) -> *mut u8 {
    or_abort(heap::alloc(bytes)).as_ptr()
}

/// Release a pointer from `aki_alloc`. Null is ignored.
///
/// # Safety
/// `ptr` must be null or a live pointer from `aki_alloc`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn aki_free(ptr: *mut u8) {
    if let Some(ptr) = NonNull::new(ptr) {
        // SAFETY: forwarded caller guarantee.
        unsafe { heap::free(ptr) }
    }
}

/// Print a string object and a newline. Returns the bytes written.
///
/// A write failure returns 0; truncation returns the truncated count.
/// Both are logged. A null string prints an empty line.
///
/// # Safety
/// `s` must be null or a valid string object.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn aki_print(s: *const AkiStr) -> i32 {
    // SAFETY: forwarded caller guarantee.
    let text = unsafe { s.as_ref().map_or(&[][..], |s| s.as_bytes()) };
    let written = match io::print(text) {
        Ok(written) => written,
        Err(Error::AllocFailed { bytes }) => diagnostic::alloc_failed(bytes),
        Err(err) => {
            diagnostic::warn(&err);
            err.written()
        }
    };
    i32::try_from(written).unwrap_or(i32::MAX)
}

#[unsafe(no_mangle)]
pub extern "C" fn aki_sleep(ms: i32) -> i32 {
    time::sleep(ms)
}

/// # Safety
/// `ptr` must point to a NUL-terminated string.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn aki_strlen(ptr: *const u8) -> usize {
    // SAFETY: forwarded caller guarantee.
    unsafe { string::c_strlen(ptr) }
}

/// # Safety
/// `s` must be a valid string object.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn aki_str_len(s: *const AkiStr) -> u64 {
    // SAFETY: forwarded caller guarantee.
    unsafe { (*s).len() }
}

/// Wrap a NUL-terminated buffer in a new string object. Null yields null.
///
/// # Safety
/// `data` must be null or a NUL-terminated string outliving the object.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn aki_str_new(data: *mut u8) -> *mut AkiStr {
    let Some(data) = NonNull::new(data) else {
        return ptr::null_mut();
    };
    // SAFETY: forwarded caller guarantee.
    or_abort(unsafe { string::str_from_raw(data) }).as_ptr()
}

#[unsafe(no_mangle)]
pub extern "C" fn aki_str_from_i32(value: i32) -> *mut AkiStr {
    or_abort(string::str_from_i32(value)).as_ptr()
}

/// # Safety
/// `s` must be a valid string object.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn aki_i32_from_str(s: *const AkiStr) -> i32 {
    // SAFETY: forwarded caller guarantee.
    or_abort(unsafe { string::str_to_i32(&*s) })
}

/// Delete a string object header. Returns false for null.
///
/// # Safety
/// `s` must be null or a live string object.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn aki_str_del(s: *mut AkiStr) -> bool {
    match NonNull::new(s) {
        Some(s) => {
            // SAFETY: forwarded caller guarantee.
            unsafe { string::str_del(s) };
            true
        }
        None => false,
    }
}

/// Delete an array allocation. Returns false for null.
///
/// # Safety
/// `array` must be null or a live pointer from `aki_alloc`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn aki_array_del(array: *mut u8) -> bool {
    match NonNull::new(array) {
        Some(array) => {
            // SAFETY: forwarded caller guarantee.
            unsafe { string::array_del(array) };
            true
        }
        None => false,
    }
}

/// Set the `print` scratch buffer size. Returns the size in effect.
#[unsafe(no_mangle)]
pub extern "C" fn aki_set_scratch_size(bytes: usize) -> usize {
    config::set_scratch_size(bytes)
}

#[unsafe(no_mangle)]
pub extern "C" fn aki_scratch_size() -> usize {
    config::scratch_size()
}

/// Write live allocations of the default heap to stderr; returns the count.
#[cfg(feature = "sanitize")]
#[unsafe(no_mangle)]
pub extern "C" fn aki_report_leaks() -> usize {
    heap::default_heap().report_leaks()
}
