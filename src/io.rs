//! Layer 2: line output.
//!
//! Every `print` is an independent allocate / format / write / free cycle.
//! Nothing is buffered between calls.

use core::ffi::{CStr, c_int};

use crate::config;
use crate::error::{Error, Result};
use crate::handle;
use crate::heap::{self, RawHeap, Scratch};
use crate::platform::{self, RawFd};

/// `%s` bounded by an explicit length, followed by the newline.
const LINE_FORMAT: &CStr = c"%.*s\n";

/// Status reported when the standard output selector does not resolve.
const NO_STREAM: isize = -1;

/// A byte sink with the raw write contract: the return value is the number
/// of bytes accepted, or negative on failure.
pub trait RawStream {
    fn write_raw(&self, bytes: &[u8]) -> isize;
}

/// A platform stream handle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Console {
    fd: RawFd,
}

impl Console {
    pub const fn from_raw(fd: RawFd) -> Self {
        Self { fd }
    }

    pub fn stdout() -> Option<Self> {
        handle::stdout().map(Self::from_raw)
    }

    pub fn raw(&self) -> RawFd {
        self.fd
    }
}

impl RawStream for Console {
    fn write_raw(&self, bytes: &[u8]) -> isize {
        // SAFETY: bytes is a live slice.
        unsafe { platform::write(self.fd, bytes.as_ptr(), bytes.len()) }
    }
}

/// The part of `text` that is printed: everything before the first NUL.
fn line_text(text: &[u8]) -> &[u8] {
    let end = text.iter().position(|&b| b == 0).unwrap_or(text.len());
    &text[..end]
}

/// The `%.*s` precision for `len` bytes of text into `capacity` bytes.
///
/// Never more than the buffer can hold, and small enough that the whole
/// line still has a length `snprintf` can report.
fn precision(len: usize, capacity: usize) -> c_int {
    let limit = usize::try_from(c_int::MAX - 1).unwrap_or(usize::MAX);
    c_int::try_from(len.min(capacity).min(limit)).unwrap_or(c_int::MAX - 1)
}

/// Format `text` plus a newline into `scratch`.
///
/// `text` must hold no NUL byte. The buffer ends up with a terminated
/// prefix of the line; a negative return means formatting failed.
fn compose_line<H: RawHeap + ?Sized>(scratch: &mut Scratch<'_, H>, text: &[u8]) -> c_int {
    let capacity = scratch.capacity();
    // SAFETY: the buffer holds `capacity` writable bytes, the format takes
    // exactly an int precision and a pointer readable for that many bytes.
    unsafe {
        platform::snprintf(
            scratch.as_mut_ptr().cast(),
            capacity,
            LINE_FORMAT.as_ptr(),
            precision(text.len(), capacity),
            text.as_ptr(),
        )
    }
}

/// Write `text` and a newline to stdout through the default heap.
///
/// Returns the number of bytes the stream accepted.
pub fn print(text: &[u8]) -> Result<usize> {
    let console = Console::stdout().ok_or(Error::WriteFailed { status: NO_STREAM })?;
    print_in(heap::default_heap(), &console, text, config::scratch_size())
}

/// `print` against an explicit heap, stream and scratch size.
///
/// At most `scratch_size - 1` bytes are written. When the line does not
/// fit, the written prefix is reported as `Error::Truncated`.
pub fn print_in<H, S>(heap: &H, out: &S, text: &[u8], scratch_size: usize) -> Result<usize>
where
    H: RawHeap + ?Sized,
    S: RawStream + ?Sized,
{
    let text = line_text(text);
    let wanted = text.len().saturating_add(1);
    let mut scratch = Scratch::new_in(heap, scratch_size)?;
    let composed = compose_line(&mut scratch, text);
    if composed < 0 {
        return Err(Error::WriteFailed {
            status: composed as isize,
        });
    }
    let len = wanted.min(scratch.capacity().saturating_sub(1));
    let status = out.write_raw(&scratch.as_slice()[..len]);
    drop(scratch);

    let written = usize::try_from(status).map_err(|_| Error::WriteFailed { status })?;
    if wanted > len {
        return Err(Error::Truncated { written, wanted });
    }
    Ok(written)
}
