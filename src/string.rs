//! The language string object and its conversions.
//!
//! A string object is a heap-allocated `{ len, data }` header. The header
//! refers to its bytes but does not own them: deleting the object releases
//! the header only.

use core::ffi::{CStr, c_char, c_int};
use core::mem::size_of;
use core::ptr::NonNull;

use crate::error::Result;
use crate::heap::{self, AllocKind, RawHeap, Scratch};
use crate::platform;

const INT_FORMAT: &CStr = c"%i";

/// Room for any formatted i32: four characters per byte plus the terminator.
const INT_BUFFER_SIZE: usize = size_of::<i32>() * 4 + 1;

#[repr(C)]
#[derive(Debug)]
pub struct AkiStr {
    pub len: u64,
    pub data: *mut u8,
}

impl AkiStr {
    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// # Safety
    /// `data` must be readable for `len` bytes for the returned lifetime.
    pub unsafe fn as_bytes(&self) -> &[u8] {
        if self.len == 0 || self.data.is_null() {
            return &[];
        }
        // SAFETY: forwarded caller guarantee.
        unsafe { core::slice::from_raw_parts(self.data, self.len as usize) }
    }
}

/// Length of a NUL-terminated byte string.
///
/// # Safety
/// `ptr` must point to a NUL-terminated string.
pub unsafe fn c_strlen(ptr: *const u8) -> usize {
    // SAFETY: forwarded caller guarantee.
    unsafe { platform::strlen(ptr.cast()) }
}

/// Wrap a NUL-terminated buffer in a new string object.
///
/// # Safety
/// `data` must point to a NUL-terminated string that outlives the object.
pub unsafe fn str_from_raw(data: NonNull<u8>) -> Result<NonNull<AkiStr>> {
    // SAFETY: forwarded caller guarantee.
    unsafe { str_from_raw_in(heap::default_heap(), data) }
}

/// # Safety
/// As for `str_from_raw`.
pub unsafe fn str_from_raw_in<H: RawHeap + ?Sized>(
    heap: &H,
    data: NonNull<u8>,
) -> Result<NonNull<AkiStr>> {
    // SAFETY: forwarded caller guarantee.
    let len = unsafe { c_strlen(data.as_ptr()) };
    let obj = heap::alloc_in(heap, size_of::<AkiStr>(), AllocKind::Object)?.cast::<AkiStr>();
    // SAFETY: obj is a fresh, malloc-aligned block of size_of::<AkiStr>() bytes.
    unsafe {
        obj.write(AkiStr {
            len: len as u64,
            data: data.as_ptr(),
        })
    };
    Ok(obj)
}

/// Format `value` in decimal into a new NUL-terminated heap buffer.
pub fn int_to_c_str(value: i32) -> Result<NonNull<u8>> {
    int_to_c_str_in(heap::default_heap(), value)
}

pub fn int_to_c_str_in<H: RawHeap + ?Sized>(heap: &H, value: i32) -> Result<NonNull<u8>> {
    let buf = heap::alloc_in(heap, INT_BUFFER_SIZE, AllocKind::Buffer)?;
    // SAFETY: buf holds INT_BUFFER_SIZE bytes, enough for any i32.
    unsafe {
        platform::snprintf(
            buf.as_ptr().cast::<c_char>(),
            INT_BUFFER_SIZE,
            INT_FORMAT.as_ptr(),
            value as c_int,
        )
    };
    Ok(buf)
}

/// A new string object holding the decimal form of `value`.
pub fn str_from_i32(value: i32) -> Result<NonNull<AkiStr>> {
    let data = int_to_c_str(value)?;
    // SAFETY: data is a fresh NUL-terminated buffer; the object takes it over.
    unsafe { str_from_raw(data) }.inspect_err(|_| {
        // SAFETY: data came from int_to_c_str and nothing else refers to it.
        unsafe { heap::free(data) }
    })
}

/// Parse a string object the way C `atoi` does: leading whitespace and an
/// optional sign are accepted, parsing stops at the first non-digit, and
/// text without digits yields 0.
///
/// # Safety
/// `s.data` must be readable for `s.len` bytes.
pub unsafe fn str_to_i32(s: &AkiStr) -> Result<i32> {
    // SAFETY: forwarded caller guarantee.
    unsafe { str_to_i32_in(heap::default_heap(), s) }
}

/// # Safety
/// As for `str_to_i32`.
pub unsafe fn str_to_i32_in<H: RawHeap + ?Sized>(heap: &H, s: &AkiStr) -> Result<i32> {
    // SAFETY: forwarded caller guarantee.
    let bytes = unsafe { s.as_bytes() };
    // The object's bytes need not be terminated; parse a terminated copy.
    let mut scratch = Scratch::new_in(heap, bytes.len() + 1)?;
    scratch.as_mut_slice()[..bytes.len()].copy_from_slice(bytes);
    // SAFETY: the scratch copy is zero-filled past the text, so terminated.
    Ok(unsafe { platform::atoi(scratch.as_mut_ptr().cast()) })
}

/// Release a string object header. The bytes it refers to are untouched.
///
/// # Safety
/// `obj` must come from `str_from_raw` / `str_from_i32` and not be deleted.
pub unsafe fn str_del(obj: NonNull<AkiStr>) {
    // SAFETY: forwarded caller guarantee.
    unsafe { heap::free(obj.cast()) }
}

/// Release an array allocation.
///
/// # Safety
/// `array` must come from `alloc` and not have been freed.
pub unsafe fn array_del(array: NonNull<u8>) {
    // SAFETY: forwarded caller guarantee.
    unsafe { heap::free(array) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::heap::ProcessHeap;

    fn object(bytes: &mut [u8]) -> AkiStr {
        AkiStr {
            len: bytes.len() as u64,
            data: bytes.as_mut_ptr(),
        }
    }

    #[test]
    fn strlen_stops_at_the_terminator() {
        assert_eq!(unsafe { c_strlen(b"hello\0world\0".as_ptr()) }, 5);
        assert_eq!(unsafe { c_strlen(b"\0".as_ptr()) }, 0);
    }

    #[test]
    fn raw_buffer_becomes_a_string_object() {
        let mut text = *b"Hello world!\0";
        let data = NonNull::new(text.as_mut_ptr()).unwrap();
        let obj = unsafe { str_from_raw_in(&ProcessHeap, data) }.unwrap();
        let s = unsafe { obj.as_ref() };
        assert_eq!(s.len(), 12);
        assert_eq!(unsafe { s.as_bytes() }, b"Hello world!");
        assert_eq!(s.data, text.as_mut_ptr());
        unsafe { heap::free_in(&ProcessHeap, obj.cast()) };
    }

    #[test]
    fn integers_format_in_decimal() {
        for (value, expected) in [
            (0, "0"),
            (42, "42"),
            (-7, "-7"),
            (i32::MAX, "2147483647"),
            (i32::MIN, "-2147483648"),
        ] {
            let buf = int_to_c_str_in(&ProcessHeap, value).unwrap();
            let text = unsafe { CStr::from_ptr(buf.as_ptr().cast()) };
            assert_eq!(text.to_str(), Ok(expected));
            unsafe { heap::free_in(&ProcessHeap, buf) };
        }
    }

    #[test]
    fn parsing_follows_atoi() {
        for (text, expected) in [
            ("123", 123),
            ("  -45", -45),
            ("+8", 8),
            ("12abc", 12),
            ("abc", 0),
            ("", 0),
        ] {
            let mut bytes = text.as_bytes().to_vec();
            let s = object(&mut bytes);
            assert_eq!(
                unsafe { str_to_i32_in(&ProcessHeap, &s) },
                Ok(expected),
                "{text:?}"
            );
        }
    }

    #[test]
    fn parsing_ignores_bytes_past_the_length() {
        let mut bytes = *b"1234";
        let s = AkiStr {
            len: 2,
            data: bytes.as_mut_ptr(),
        };
        assert_eq!(unsafe { str_to_i32(&s) }, Ok(12));
    }

    #[test]
    fn integer_round_trips_through_a_string_object() {
        let obj = str_from_i32(-90210).unwrap();
        let s = unsafe { obj.as_ref() };
        assert_eq!(unsafe { s.as_bytes() }, b"-90210");
        assert_eq!(unsafe { str_to_i32(s) }, Ok(-90210));
        let data = NonNull::new(s.data).unwrap();
        unsafe {
            str_del(obj);
            array_del(data);
        }
    }

    #[cfg(feature = "sanitize")]
    #[test]
    fn deleting_an_object_leaves_its_data_alone() {
        use crate::sanitize::TrackingHeap;

        let heap: TrackingHeap<ProcessHeap, 16> = TrackingHeap::new(ProcessHeap);
        let data = int_to_c_str_in(&heap, 5).unwrap();
        let obj = unsafe { str_from_raw_in(&heap, data) }.unwrap();
        assert_eq!(heap.live(), 2);

        unsafe { heap::free_in(&heap, obj.cast()) };
        assert_eq!(heap.live(), 1);
        assert!(heap.is_live(data.as_ptr()));

        unsafe { heap::free_in(&heap, data) };
        assert_eq!(heap.live(), 0);
    }

    #[cfg(feature = "sanitize")]
    #[test]
    fn parsing_releases_its_scratch_copy() {
        use crate::sanitize::TrackingHeap;

        let heap: TrackingHeap<ProcessHeap, 16> = TrackingHeap::new(ProcessHeap);
        let mut bytes = *b"77";
        let s = object(&mut bytes);
        assert_eq!(unsafe { str_to_i32_in(&heap, &s) }, Ok(77));
        assert_eq!(heap.live(), 0);
    }
}
