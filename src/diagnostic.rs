//! Runtime diagnostics on stderr.
//!
//! Everything here formats into stack buffers and goes straight to the
//! Layer 0 write primitive, so reporting never allocates and still works
//! when the heap is the thing that failed.

use crate::config;
use crate::error::Error;
use crate::handle;
use crate::platform;

const WARN_HEADER: &[u8] = b"\x1b[1;33maki-rt warning:\x1b[0m ";
const FATAL_HEADER: &[u8] = b"\n\x1b[1;31m=== aki-rt fatal ===\x1b[0m\n";

pub fn write_stderr(msg: &[u8]) {
    let Some(fd) = handle::stderr() else {
        return;
    };
    // SAFETY: msg is a live slice; a failed write to stderr is ignored.
    unsafe { platform::write(fd, msg.as_ptr(), msg.len()) };
}

/// Format a usize as a 16-digit zero-padded hex string with 0x prefix.
pub fn format_hex(value: usize, buf: &mut [u8; 18]) -> &[u8] {
    const DIGITS: &[u8; 16] = b"0123456789abcdef";
    buf[0] = b'0';
    buf[1] = b'x';
    let mut v = value;
    for slot in buf[2..].iter_mut().rev() {
        *slot = DIGITS[v & 0xF];
        v >>= 4;
    }
    buf
}

/// Format a usize in decimal, right-aligned in `buf`; returns the digits.
pub fn format_dec(value: usize, buf: &mut [u8; 20]) -> &[u8] {
    let mut v = value;
    let mut i = buf.len();
    loop {
        i -= 1;
        buf[i] = b'0' + (v % 10) as u8;
        v /= 10;
        if v == 0 {
            break;
        }
    }
    &buf[i..]
}

/// Format a possibly negative status code.
pub fn format_status(status: isize, buf: &mut [u8; 21]) -> &[u8] {
    let mut digits = [0u8; 20];
    let magnitude = format_dec(status.unsigned_abs(), &mut digits);
    let start = buf.len() - magnitude.len();
    buf[start..].copy_from_slice(magnitude);
    if status < 0 {
        buf[start - 1] = b'-';
        &buf[start - 1..]
    } else {
        &buf[start..]
    }
}

fn write_dec(value: usize) {
    let mut buf = [0u8; 20];
    write_stderr(format_dec(value, &mut buf));
}

#[cfg(feature = "sanitize")]
fn write_hex(value: usize) {
    let mut buf = [0u8; 18];
    write_stderr(format_hex(value, &mut buf));
}

fn fatal_abort() -> ! {
    write_stderr(b"aborting.\n\n");
    // SAFETY: abort is provided by the C runtime and never returns.
    unsafe { platform::abort() }
}

/// Write the one-line description of `err` to `out`.
fn describe(err: &Error, out: &mut impl FnMut(&[u8])) {
    let mut dec = [0u8; 20];
    match *err {
        Error::AllocFailed { bytes } => {
            out(b"allocation failed, requested ");
            out(format_dec(bytes, &mut dec));
            out(b" bytes\n");
        }
        Error::WriteFailed { status } => {
            let mut buf = [0u8; 21];
            out(b"console write failed, status ");
            out(format_status(status, &mut buf));
            out(b"\n");
        }
        Error::Truncated { written, wanted } => {
            out(b"print output truncated, wrote ");
            out(format_dec(written, &mut dec));
            out(b" of ");
            out(format_dec(wanted, &mut dec));
            out(b" bytes\n");
        }
    }
}

/// Log a non-fatal `print` failure.
pub fn warn(err: &Error) {
    if !config::diagnostics_enabled() {
        return;
    }
    write_stderr(WARN_HEADER);
    describe(err, &mut write_stderr);
}

fn fatal_report(err: &Error, out: &mut impl FnMut(&[u8])) {
    out(FATAL_HEADER);
    out(b"ERROR: ");
    describe(err, out);
}

/// Report `err` and abort. Printed even when diagnostics are off.
pub fn fatal(err: &Error) -> ! {
    fatal_report(err, &mut write_stderr);
    fatal_abort();
}

pub fn alloc_failed(bytes: usize) -> ! {
    write_stderr(FATAL_HEADER);
    write_stderr(b"ERROR: out of memory\n  requested: ");
    write_dec(bytes);
    write_stderr(b" bytes\n");
    fatal_abort();
}

pub fn panicked() -> ! {
    write_stderr(FATAL_HEADER);
    write_stderr(b"ERROR: runtime panic\n");
    fatal_abort();
}

#[cfg(feature = "sanitize")]
pub fn invalid_free(addr: usize) -> ! {
    write_stderr(FATAL_HEADER);
    write_stderr(b"ERROR: invalid free\n  address: ");
    write_hex(addr);
    write_stderr(b"\n  Not a live allocation: double free or foreign pointer.\n");
    fatal_abort();
}

#[cfg(feature = "sanitize")]
pub fn overflow_detected(
    addr: usize,
    size: usize,
    prefix_corrupt: bool,
    suffix_corrupt: bool,
) -> ! {
    write_stderr(FATAL_HEADER);
    write_stderr(b"ERROR: buffer overflow detected (red zone corruption)\n  address: ");
    write_hex(addr);
    write_stderr(b"\n  size:    ");
    write_dec(size);
    write_stderr(b" bytes\n");
    if prefix_corrupt {
        write_stderr(b"  -> underflow: prefix red zone corrupted\n");
    }
    if suffix_corrupt {
        write_stderr(b"  -> overflow: suffix red zone corrupted\n");
    }
    fatal_abort();
}

#[cfg(feature = "sanitize")]
pub fn leak_header() {
    write_stderr(b"\n\x1b[1;33m=== aki-rt sanitizer: leak report ===\x1b[0m\n");
}

#[cfg(feature = "sanitize")]
pub fn leak(addr: usize, size: usize, kind: crate::sanitize::AllocKind) {
    write_stderr(b"  LEAK: ");
    write_hex(addr);
    write_stderr(b"  size=");
    write_dec(size);
    write_stderr(b"  via=");
    write_stderr(kind.name());
    write_stderr(b"\n");
}

#[cfg(feature = "sanitize")]
pub fn leak_footer(count: usize) {
    write_stderr(b"  total leaks: ");
    write_dec(count);
    write_stderr(b"\n\n");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_is_zero_padded() {
        let mut buf = [0u8; 18];
        assert_eq!(format_hex(0xdead_beef, &mut buf), b"0x00000000deadbeef");
        assert_eq!(format_hex(0, &mut buf), b"0x0000000000000000");
    }

    #[test]
    fn dec_has_no_padding() {
        let mut buf = [0u8; 20];
        assert_eq!(format_dec(0, &mut buf), b"0");
        assert_eq!(format_dec(4096, &mut buf), b"4096");
        assert_eq!(
            format_dec(usize::MAX, &mut buf),
            usize::MAX.to_string().as_bytes()
        );
    }

    #[test]
    fn status_keeps_sign() {
        let mut buf = [0u8; 21];
        assert_eq!(format_status(-22, &mut buf), b"-22");
        assert_eq!(format_status(13, &mut buf), b"13");
        assert_eq!(
            format_status(isize::MIN, &mut buf),
            isize::MIN.to_string().as_bytes()
        );
    }

    fn describe_to_string(err: &Error) -> String {
        let mut out = Vec::new();
        describe(err, &mut |bytes: &[u8]| out.extend_from_slice(bytes));
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn errors_are_described_on_one_line() {
        assert_eq!(
            describe_to_string(&Error::WriteFailed { status: -9 }),
            "console write failed, status -9\n"
        );
        assert_eq!(
            describe_to_string(&Error::Truncated {
                written: 4095,
                wanted: 10_001
            }),
            "print output truncated, wrote 4095 of 10001 bytes\n"
        );
    }

    #[test]
    fn fatal_report_carries_the_header_and_the_error() {
        let mut out = Vec::new();
        fatal_report(&Error::WriteFailed { status: -5 }, &mut |bytes: &[u8]| {
            out.extend_from_slice(bytes)
        });
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("=== aki-rt fatal ==="));
        assert!(text.ends_with("ERROR: console write failed, status -5\n"));
    }
}
