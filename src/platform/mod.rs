//! Layer 0: raw platform primitives.
//!
//! Nothing here validates or translates. Every function reports failure
//! exactly the way the platform does (null pointers, negative counts, raw
//! status codes). This is the only module that knows which platform it
//! is running on.

pub mod syscall;

use core::ffi::{c_char, c_int, c_long};

#[cfg(not(unix))]
compile_error!("aki-rt binds to the Unix C runtime ABI only");

/// Selector for the standard input stream.
pub const STD_INPUT_HANDLE: i32 = -10;
/// Selector for the standard output stream.
pub const STD_OUTPUT_HANDLE: i32 = -11;
/// Selector for the standard error stream.
pub const STD_ERROR_HANDLE: i32 = -12;

/// A raw stream handle (a file descriptor on this platform).
pub type RawFd = c_int;

#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Timespec {
    pub tv_sec: c_long,
    pub tv_nsec: c_long,
}

#[link(name = "c")]
unsafe extern "C" {
    pub fn calloc(count: usize, size: usize) -> *mut u8;
    pub fn free(ptr: *mut u8);
    pub fn snprintf(buf: *mut c_char, size: usize, format: *const c_char, ...) -> c_int;
    pub fn strlen(s: *const c_char) -> usize;
    pub fn atoi(s: *const c_char) -> c_int;
    pub fn abort() -> !;
}

#[cfg(not(all(target_os = "linux", target_arch = "x86_64")))]
mod libc_io {
    use super::{RawFd, Timespec};
    use core::ffi::c_int;

    #[link(name = "c")]
    unsafe extern "C" {
        pub fn write(fd: RawFd, buf: *const u8, len: usize) -> isize;
        pub fn nanosleep(req: *const Timespec, rem: *mut Timespec) -> c_int;
    }
}

/// Map a conventional stream selector to the platform's stream handle.
pub fn get_std_handle(selector: i32) -> Option<RawFd> {
    match selector {
        STD_INPUT_HANDLE => Some(0),
        STD_OUTPUT_HANDLE => Some(1),
        STD_ERROR_HANDLE => Some(2),
        _ => None,
    }
}

/// Write `len` bytes from `buf` to `fd`.
/// Returns the number of bytes written, or a negative value on failure.
///
/// # Safety
/// `buf` must point to `len` readable bytes.
#[inline]
pub unsafe fn write(fd: RawFd, buf: *const u8, len: usize) -> isize {
    #[cfg(all(target_os = "linux", target_arch = "x86_64"))]
    {
        // SAFETY: forwarded caller guarantee.
        unsafe { syscall::sys_write(fd as usize, buf, len) }
    }
    #[cfg(not(all(target_os = "linux", target_arch = "x86_64")))]
    {
        // SAFETY: forwarded caller guarantee.
        unsafe { libc_io::write(fd, buf, len) }
    }
}

/// Suspend the calling thread for the duration in `req`.
/// Returns 0 on success, a nonzero platform status otherwise.
pub fn nanosleep(req: &Timespec) -> i32 {
    #[cfg(all(target_os = "linux", target_arch = "x86_64"))]
    {
        // SAFETY: req is a valid timespec; a null remainder is permitted.
        unsafe { syscall::sys_nanosleep(req, core::ptr::null_mut()) as i32 }
    }
    #[cfg(not(all(target_os = "linux", target_arch = "x86_64")))]
    {
        // SAFETY: req is a valid timespec; a null remainder is permitted.
        unsafe { libc_io::nanosleep(req, core::ptr::null_mut()) }
    }
}
