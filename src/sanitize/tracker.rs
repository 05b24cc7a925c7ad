use crate::heap::AllocKind;

#[derive(Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
enum SlotState {
    Empty = 0,
    Occupied = 1,
    Tombstone = 2,
}

#[derive(Clone, Copy)]
struct Entry {
    addr: usize,
    size: usize,
    state: SlotState,
    kind: AllocKind,
}

impl Entry {
    const EMPTY: Self = Self {
        addr: 0,
        size: 0,
        state: SlotState::Empty,
        kind: AllocKind::Buffer,
    };
}

/// Fixed-capacity open-addressing table of live allocations, keyed by the
/// user pointer. Never allocates.
pub struct Tracker<const N: usize> {
    entries: [Entry; N],
    live: usize,
    live_bytes: usize,
}

impl<const N: usize> Tracker<N> {
    pub const fn new() -> Self {
        Self {
            entries: [Entry::EMPTY; N],
            live: 0,
            live_bytes: 0,
        }
    }

    /// Fibonacci hashing; pointer addresses share their low bits.
    fn slot(addr: usize) -> usize {
        let h = (addr as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15);
        (h >> 32) as usize % N
    }

    /// Record a live block. Returns false, recording nothing, when all
    /// `N` slots hold live blocks.
    #[must_use]
    pub fn insert(&mut self, addr: usize, size: usize, kind: AllocKind) -> bool {
        let mut idx = Self::slot(addr);
        for _ in 0..N {
            if self.entries[idx].state != SlotState::Occupied {
                self.entries[idx] = Entry {
                    addr,
                    size,
                    state: SlotState::Occupied,
                    kind,
                };
                self.live += 1;
                self.live_bytes += size;
                return true;
            }
            idx = (idx + 1) % N;
        }
        false
    }

    fn find(&self, addr: usize) -> Option<usize> {
        let mut idx = Self::slot(addr);
        for _ in 0..N {
            let entry = &self.entries[idx];
            match entry.state {
                SlotState::Occupied if entry.addr == addr => return Some(idx),
                SlotState::Empty => return None,
                _ => idx = (idx + 1) % N,
            }
        }
        None
    }

    pub fn remove(&mut self, addr: usize) -> Option<(usize, AllocKind)> {
        let idx = self.find(addr)?;
        let entry = &mut self.entries[idx];
        entry.state = SlotState::Tombstone;
        self.live -= 1;
        self.live_bytes -= entry.size;
        Some((entry.size, entry.kind))
    }

    pub fn lookup(&self, addr: usize) -> Option<(usize, AllocKind)> {
        self.find(addr)
            .map(|idx| (self.entries[idx].size, self.entries[idx].kind))
    }

    pub fn live(&self) -> usize {
        self.live
    }

    pub fn live_bytes(&self) -> usize {
        self.live_bytes
    }

    pub fn for_each_live(&self, mut f: impl FnMut(usize, usize, AllocKind)) {
        self.entries
            .iter()
            .filter(|entry| entry.state == SlotState::Occupied)
            .for_each(|entry| f(entry.addr, entry.size, entry.kind));
    }
}

impl<const N: usize> Default for Tracker<N> {
    fn default() -> Self {
        Self::new()
    }
}
