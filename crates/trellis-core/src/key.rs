//! Caller-supplied element keys.

use std::fmt;
use std::hash::{Hash, Hasher};

use crate::hash;

/// Disambiguator for a sibling element.
///
/// Keys only need to be unique among the children of one parent. Elements
/// declared without a key are identified by their ordinal among the unkeyed
/// siblings declared so far in the frame.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Key(u64);

impl Key {
    #[inline]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    #[inline]
    pub const fn raw(self) -> u64 {
        self.0
    }

    /// Hashes any value into a key, e.g. a list item's id or name.
    pub fn of<K: Hash + ?Sized>(value: &K) -> Self {
        let mut hasher = hash::default::new();
        value.hash(&mut hasher);
        Self(hasher.finish())
    }

    /// Key derived from a source location, for call sites that declare a
    /// fixed element from a helper function.
    pub fn location(file: &'static str, line: u32, column: u32) -> Self {
        let mut hasher = hash::default::new();
        file.hash(&mut hasher);
        line.hash(&mut hasher);
        column.hash(&mut hasher);
        Self(hasher.finish())
    }
}

impl From<u64> for Key {
    fn from(raw: u64) -> Self {
        Self(raw)
    }
}

impl From<&str> for Key {
    fn from(value: &str) -> Self {
        Self::of(value)
    }
}

/// How an element is identified among its siblings.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ElementKey {
    /// The root element. It has no siblings.
    Root,
    /// N-th unkeyed child declared under the parent this frame.
    Positional(u32),
    /// Explicit caller key.
    Explicit(Key),
}

impl fmt::Display for ElementKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ElementKey::Root => f.write_str("root"),
            ElementKey::Positional(ordinal) => write!(f, "#{ordinal}"),
            ElementKey::Explicit(key) => write!(f, "key:{:x}", key.raw()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hashed_keys_are_stable_within_a_process() {
        assert_eq!(Key::of("row-1"), Key::of("row-1"));
        assert_ne!(Key::of("row-1"), Key::of("row-2"));
        assert_eq!(Key::from("a"), Key::of("a"));
    }

    #[test]
    fn location_keys_differ_by_column() {
        let a = Key::location(file!(), 10, 1);
        let b = Key::location(file!(), 10, 2);
        assert_ne!(a, b);
    }
}
