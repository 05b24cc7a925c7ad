//! Raw Linux x86_64 syscall wrappers.
//!
//! These skip the C runtime entirely and enter the kernel with the
//! `syscall` instruction. Failures come back as a negative errno.

#[cfg(all(target_os = "linux", target_arch = "x86_64"))]
use super::Timespec;

#[cfg(all(target_os = "linux", target_arch = "x86_64"))]
const SYS_WRITE: isize = 1;
#[cfg(all(target_os = "linux", target_arch = "x86_64"))]
const SYS_NANOSLEEP: isize = 35;

/// Write bytes to a file descriptor.
/// Returns the number of bytes written, or a negative errno on failure.
#[cfg(all(target_os = "linux", target_arch = "x86_64"))]
#[inline(always)]
pub unsafe fn sys_write(fd: usize, buf: *const u8, len: usize) -> isize {
    let ret: isize;
    // SAFETY: Caller guarantees buf points to len readable bytes.
    unsafe {
        core::arch::asm!(
            "syscall",
            inlateout("rax") SYS_WRITE => ret,
            in("rdi") fd,
            in("rsi") buf,
            in("rdx") len,
            lateout("rcx") _,
            lateout("r11") _,
            options(nostack),
        );
    }
    ret
}

/// Sleep for the interval in `req`. `rem` may be null.
/// Returns 0 on success, or a negative errno (`-EINVAL` for a negative
/// interval, `-EINTR` when interrupted).
#[cfg(all(target_os = "linux", target_arch = "x86_64"))]
#[inline(always)]
pub unsafe fn sys_nanosleep(req: *const Timespec, rem: *mut Timespec) -> isize {
    let ret: isize;
    // SAFETY: Caller guarantees req is readable and rem is null or writable.
    unsafe {
        core::arch::asm!(
            "syscall",
            inlateout("rax") SYS_NANOSLEEP => ret,
            in("rdi") req,
            in("rsi") rem,
            lateout("rcx") _,
            lateout("r11") _,
            options(nostack),
        );
    }
    ret
}
