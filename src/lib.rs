//! Aki runtime: the platform layer and core library that compiled Aki
//! programs link against.
//!
//! Layering, bottom to top:
//! - [`platform`]: raw platform primitives, no logic.
//! - [`heap`]: `alloc` / `free` over the process heap.
//! - [`io`], [`time`], [`string`]: `print`, `sleep` and the string object.
//!
//! [`ffi`] exposes these to generated code under `aki_*` symbols.

#![cfg_attr(not(test), no_std)]

pub mod config;
pub mod diagnostic;
pub mod error;
pub mod ffi;
pub mod handle;
pub mod heap;
pub mod io;
pub mod platform;
pub mod string;
pub mod time;

#[cfg(feature = "sanitize")]
pub mod sanitize;

pub use error::{Error, Result};
pub use heap::{alloc, free};
pub use io::print;
pub use time::sleep;

#[cfg(not(test))]
#[panic_handler]
fn panic(_info: &core::panic::PanicInfo) -> ! {
    diagnostic::panicked()
}
