//! Generational slot arena.
//!
//! Every record the engine owns (elements, variable cells and per-type
//! payloads) lives in an [`Arena`]. Records are addressed by [`ArenaIndex`],
//! a slot number paired with the slot's generation at allocation time:
//!
//! - `emplace` reuses the most recently freed slot, or grows the arena.
//! - `pop` drops the record, bumps the slot generation and frees the slot.
//! - A stale index (freed, or freed and reused) never resolves to a record.
//!
//! Slots never move, so indices stay valid for as long as their record lives.

use std::fmt;
use std::ops::{Index, IndexMut};

const WORD_BITS: usize = u64::BITS as usize;

/// Slot number plus generation. Cheap to copy, compared by value.
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ArenaIndex {
    slot: u32,
    generation: u32,
}

impl ArenaIndex {
    #[inline]
    pub(crate) const fn new(slot: u32, generation: u32) -> Self {
        Self { slot, generation }
    }

    #[inline]
    pub const fn slot(self) -> usize {
        self.slot as usize
    }

    #[inline]
    pub const fn generation(self) -> u32 {
        self.generation
    }
}

impl fmt::Debug for ArenaIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}v{}", self.slot, self.generation)
    }
}

impl fmt::Display for ArenaIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

struct Entry<T> {
    generation: u32,
    value: Option<T>,
}

/// Dense slot storage with a free list and a parallel validity bitmap.
pub struct Arena<T> {
    entries: Vec<Entry<T>>,
    free: Vec<u32>,
    occupied: Vec<u64>,
    len: usize,
}

impl<T> Default for Arena<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Arena<T> {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            free: Vec::new(),
            occupied: Vec::new(),
            len: 0,
        }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
            free: Vec::new(),
            occupied: Vec::with_capacity(capacity.div_ceil(WORD_BITS)),
            len: 0,
        }
    }

    /// Stores `value` and returns its index.
    pub fn emplace(&mut self, value: T) -> ArenaIndex {
        self.len += 1;
        if let Some(slot) = self.free.pop() {
            let entry = &mut self.entries[slot as usize];
            debug_assert!(entry.value.is_none(), "free list pointed at a live slot");
            entry.value = Some(value);
            let generation = entry.generation;
            self.set_occupied(slot as usize, true);
            return ArenaIndex::new(slot, generation);
        }

        let slot = u32::try_from(self.entries.len()).expect("arena exceeded u32::MAX slots");
        self.entries.push(Entry {
            generation: 1,
            value: Some(value),
        });
        if self.occupied.len() * WORD_BITS < self.entries.len() {
            self.occupied.push(0);
        }
        self.set_occupied(slot as usize, true);
        ArenaIndex::new(slot, 1)
    }

    /// Removes the record at `index`. Returns `None` for stale indices.
    pub fn pop(&mut self, index: ArenaIndex) -> Option<T> {
        let entry = self.entries.get_mut(index.slot())?;
        if entry.generation != index.generation {
            return None;
        }
        let value = entry.value.take()?;
        entry.generation = entry.generation.wrapping_add(1).max(1);
        self.set_occupied(index.slot(), false);
        self.free.push(index.slot);
        self.len -= 1;
        Some(value)
    }

    #[inline]
    pub fn contains(&self, index: ArenaIndex) -> bool {
        self.get(index).is_some()
    }

    #[inline]
    pub fn get(&self, index: ArenaIndex) -> Option<&T> {
        self.entries
            .get(index.slot())
            .filter(|entry| entry.generation == index.generation)
            .and_then(|entry| entry.value.as_ref())
    }

    #[inline]
    pub fn get_mut(&mut self, index: ArenaIndex) -> Option<&mut T> {
        self.entries
            .get_mut(index.slot())
            .filter(|entry| entry.generation == index.generation)
            .and_then(|entry| entry.value.as_mut())
    }

    /// Number of live records.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of freed slots waiting for reuse.
    #[inline]
    pub fn free_count(&self) -> usize {
        self.free.len()
    }

    /// Total slots ever allocated (live plus free).
    #[inline]
    pub fn capacity(&self) -> usize {
        self.entries.len()
    }

    /// Live records in slot order.
    pub fn iter(&self) -> Iter<'_, T> {
        Iter {
            arena: self,
            word: 0,
            bits: self.occupied.first().copied().unwrap_or(0),
        }
    }

    fn set_occupied(&mut self, slot: usize, live: bool) {
        let mask = 1u64 << (slot % WORD_BITS);
        let word = &mut self.occupied[slot / WORD_BITS];
        if live {
            *word |= mask;
        } else {
            *word &= !mask;
        }
    }
}

impl<T> Index<ArenaIndex> for Arena<T> {
    type Output = T;

    fn index(&self, index: ArenaIndex) -> &T {
        match self.get(index) {
            Some(value) => value,
            None => panic!("arena index {index:?} is stale or was never allocated"),
        }
    }
}

impl<T> IndexMut<ArenaIndex> for Arena<T> {
    fn index_mut(&mut self, index: ArenaIndex) -> &mut T {
        match self.get_mut(index) {
            Some(value) => value,
            None => panic!("arena index {index:?} is stale or was never allocated"),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Arena<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

/// Iterator over live records, driven by the validity bitmap.
pub struct Iter<'a, T> {
    arena: &'a Arena<T>,
    word: usize,
    bits: u64,
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = (ArenaIndex, &'a T);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.bits == 0 {
                self.word += 1;
                self.bits = *self.arena.occupied.get(self.word)?;
                continue;
            }
            let bit = self.bits.trailing_zeros() as usize;
            self.bits &= self.bits - 1;
            let slot = self.word * WORD_BITS + bit;
            let entry = &self.arena.entries[slot];
            let value = entry.value.as_ref()?;
            return Some((ArenaIndex::new(slot as u32, entry.generation), value));
        }
    }
}
