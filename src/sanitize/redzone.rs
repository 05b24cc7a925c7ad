//! Canary bytes around every tracked block.
//!
//! Layout of a tracked block: `[prefix zone][user bytes][suffix zone]`.
//! The pointer handed to callers is `base + REDZONE_SIZE`.

/// Size of each red zone. 16 keeps the user pointer at malloc alignment.
pub const REDZONE_SIZE: usize = 16;

pub const CANARY_BYTE: u8 = 0xAB;

/// Written over user bytes on release so stale reads are recognisable.
pub const POISON_BYTE: u8 = 0xFE;

pub const fn total_size(user_size: usize) -> usize {
    REDZONE_SIZE + user_size + REDZONE_SIZE
}

/// Which red zones were found overwritten.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Corruption {
    pub prefix: bool,
    pub suffix: bool,
}

/// # Safety
/// `base` must point to at least `total_size(user_size)` writable bytes.
pub unsafe fn fill(base: *mut u8, user_size: usize) {
    // SAFETY: both zones lie inside the total_size block.
    unsafe {
        core::ptr::write_bytes(base, CANARY_BYTE, REDZONE_SIZE);
        core::ptr::write_bytes(base.add(REDZONE_SIZE + user_size), CANARY_BYTE, REDZONE_SIZE);
    }
}

/// # Safety
/// `base` must point to a block previously prepared with `fill`.
pub unsafe fn check(base: *const u8, user_size: usize) -> Result<(), Corruption> {
    // SAFETY: both zones lie inside the block.
    let (prefix, suffix) = unsafe {
        (
            core::slice::from_raw_parts(base, REDZONE_SIZE),
            core::slice::from_raw_parts(base.add(REDZONE_SIZE + user_size), REDZONE_SIZE),
        )
    };
    let corruption = Corruption {
        prefix: prefix.iter().any(|&b| b != CANARY_BYTE),
        suffix: suffix.iter().any(|&b| b != CANARY_BYTE),
    };
    if corruption.prefix || corruption.suffix {
        Err(corruption)
    } else {
        Ok(())
    }
}

/// # Safety
/// `user_ptr` must point to at least `user_size` writable bytes.
pub unsafe fn poison(user_ptr: *mut u8, user_size: usize) {
    // SAFETY: forwarded caller guarantee.
    unsafe { core::ptr::write_bytes(user_ptr, POISON_BYTE, user_size) };
}
