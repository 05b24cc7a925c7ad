use core::fmt;

/// Every way a Layer 1 or Layer 2 operation can fail.
///
/// Platform failure signals (null pointers, negative counts, errno values)
/// are mapped into one of these at the wrapper boundary. Nothing above the
/// wrappers sees a raw platform code except through `WriteFailed::status`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Error {
    /// The heap returned null for a request of `bytes` bytes.
    AllocFailed { bytes: usize },
    /// The stream write (or the formatter feeding it) reported `status`.
    WriteFailed { status: isize },
    /// The formatted line needed `wanted` bytes but the scratch buffer only
    /// held part of it; `written` bytes were still written.
    Truncated { written: usize, wanted: usize },
}

impl Error {
    /// Bytes that reached the stream despite the failure.
    pub fn written(&self) -> usize {
        match *self {
            Error::Truncated { written, .. } => written,
            Error::AllocFailed { .. } | Error::WriteFailed { .. } => 0,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Error::AllocFailed { bytes } => write!(f, "allocation of {bytes} bytes failed"),
            Error::WriteFailed { status } => write!(f, "write failed with status {status}"),
            Error::Truncated { written, wanted } => {
                write!(f, "output truncated: wrote {written} of {wanted} bytes")
            }
        }
    }
}

impl core::error::Error for Error {}

pub type Result<T> = core::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn written_is_only_nonzero_for_truncation() {
        assert_eq!(Error::AllocFailed { bytes: 8 }.written(), 0);
        assert_eq!(Error::WriteFailed { status: -9 }.written(), 0);
        assert_eq!(
            Error::Truncated {
                written: 15,
                wanted: 40
            }
            .written(),
            15
        );
    }

    #[test]
    fn display_names_the_failure() {
        assert_eq!(
            Error::AllocFailed { bytes: 4096 }.to_string(),
            "allocation of 4096 bytes failed"
        );
        assert_eq!(
            Error::Truncated {
                written: 3,
                wanted: 9
            }
            .to_string(),
            "output truncated: wrote 3 of 9 bytes"
        );
    }
}
