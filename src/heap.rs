//! Layer 1: heap wrappers.
//!
//! `alloc` and `free` hide the "find the process heap, then operate on it"
//! sequence behind a single call. All allocations are zero-initialised.

use core::ptr::NonNull;

use crate::error::{Error, Result};
use crate::platform;

/// What an allocation is for. Only the sanitizer looks at this (leak
/// reports name it); the process heap ignores it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum AllocKind {
    /// A raw buffer requested by language code.
    Buffer = 0,
    /// A single-use buffer owned by one runtime call.
    Scratch = 1,
    /// A runtime object such as a string header.
    Object = 2,
}

impl AllocKind {
    pub fn name(self) -> &'static [u8] {
        match self {
            AllocKind::Buffer => b"alloc",
            AllocKind::Scratch => b"scratch",
            AllocKind::Object => b"object",
        }
    }
}

/// A source of zeroed heap memory.
///
/// # Safety
/// A non-null pointer from `alloc_zeroed` must be valid for `bytes` bytes
/// of reads and writes, zero-filled, and stay valid until it is passed to
/// `release` on the same heap.
pub unsafe trait RawHeap {
    /// Returns null on failure.
    fn alloc_zeroed(&self, bytes: usize, kind: AllocKind) -> *mut u8;

    /// # Safety
    /// `ptr` must come from `alloc_zeroed` on this heap and not have been
    /// released yet.
    unsafe fn release(&self, ptr: *mut u8);
}

/// The C runtime heap.
#[derive(Clone, Copy, Debug, Default)]
pub struct ProcessHeap;

// SAFETY: calloc returns zeroed memory valid until free.
unsafe impl RawHeap for ProcessHeap {
    fn alloc_zeroed(&self, bytes: usize, _kind: AllocKind) -> *mut u8 {
        // SAFETY: calloc has no preconditions.
        unsafe { platform::calloc(1, bytes) }
    }

    unsafe fn release(&self, ptr: *mut u8) {
        // SAFETY: forwarded caller guarantee.
        unsafe { platform::free(ptr) }
    }
}

#[cfg(feature = "sanitize")]
pub type DefaultHeap =
    crate::sanitize::TrackingHeap<ProcessHeap, { crate::sanitize::GLOBAL_CAPACITY }>;
#[cfg(not(feature = "sanitize"))]
pub type DefaultHeap = ProcessHeap;

#[cfg(feature = "sanitize")]
static DEFAULT_HEAP: DefaultHeap = crate::sanitize::TrackingHeap::new(ProcessHeap);
#[cfg(not(feature = "sanitize"))]
static DEFAULT_HEAP: DefaultHeap = ProcessHeap;

/// The heap `alloc` and `free` operate on.
pub fn default_heap() -> &'static DefaultHeap {
    &DEFAULT_HEAP
}

/// Allocate `bytes` zeroed bytes from the default heap.
///
/// A zero-byte request still yields a unique pointer that must be freed.
pub fn alloc(bytes: usize) -> Result<NonNull<u8>> {
    alloc_in(default_heap(), bytes, AllocKind::Buffer)
}

pub fn alloc_in<H: RawHeap + ?Sized>(
    heap: &H,
    bytes: usize,
    kind: AllocKind,
) -> Result<NonNull<u8>> {
    NonNull::new(heap.alloc_zeroed(bytes.max(1), kind)).ok_or(Error::AllocFailed { bytes })
}

/// Release a pointer obtained from `alloc`.
///
/// # Safety
/// `ptr` must come from `alloc` and not have been freed yet.
pub unsafe fn free(ptr: NonNull<u8>) {
    // SAFETY: forwarded caller guarantee.
    unsafe { free_in(default_heap(), ptr) }
}

/// # Safety
/// `ptr` must come from `alloc_in` on `heap` and not have been freed yet.
pub unsafe fn free_in<H: RawHeap + ?Sized>(heap: &H, ptr: NonNull<u8>) {
    // SAFETY: forwarded caller guarantee.
    unsafe { heap.release(ptr.as_ptr()) }
}

/// A single-use buffer that is released when dropped, so it is freed
/// exactly once on every path out of the function that owns it.
pub struct Scratch<'h, H: RawHeap + ?Sized> {
    heap: &'h H,
    ptr: NonNull<u8>,
    len: usize,
}

impl<'h, H: RawHeap + ?Sized> Scratch<'h, H> {
    pub fn new_in(heap: &'h H, len: usize) -> Result<Self> {
        let ptr = alloc_in(heap, len, AllocKind::Scratch)?;
        Ok(Self { heap, ptr, len })
    }

    pub fn capacity(&self) -> usize {
        self.len
    }

    pub fn as_mut_ptr(&mut self) -> *mut u8 {
        self.ptr.as_ptr()
    }

    pub fn as_slice(&self) -> &[u8] {
        // SAFETY: the block holds len initialised (zeroed) bytes.
        unsafe { core::slice::from_raw_parts(self.ptr.as_ptr(), self.len) }
    }

    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        // SAFETY: the block holds len initialised bytes and we own it.
        unsafe { core::slice::from_raw_parts_mut(self.ptr.as_ptr(), self.len) }
    }
}

impl<H: RawHeap + ?Sized> Drop for Scratch<'_, H> {
    fn drop(&mut self) {
        // SAFETY: ptr came from alloc_in on self.heap and is released once.
        unsafe { free_in(self.heap, self.ptr) }
    }
}
