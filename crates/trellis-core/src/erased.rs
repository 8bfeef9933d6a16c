//! Type-erased value cell backing variable storage.

use std::any::{Any, TypeId};
use std::fmt;
use std::rc::Rc;

/// One value of a type known only to the code that declared it.
///
/// The value is shared (`Rc`) so a [`Variable`](crate::Variable) can hand the
/// declaring code a snapshot that stays valid for the whole frame, even if a
/// later commit replaces the cell contents.
#[derive(Clone)]
pub struct ErasedCell {
    value: Rc<dyn Any>,
    type_name: &'static str,
}

impl ErasedCell {
    pub fn new<T: 'static>(value: T) -> Self {
        Self::from_rc(Rc::new(value))
    }

    /// Erases an already shared value without copying it.
    pub fn from_rc<T: 'static>(value: Rc<T>) -> Self {
        Self {
            value: value as Rc<dyn Any>,
            type_name: std::any::type_name::<T>(),
        }
    }

    /// Shared typed view of the value, or `None` when `T` is not the stored type.
    pub fn cast<T: 'static>(&self) -> Option<Rc<T>> {
        Rc::clone(&self.value).downcast::<T>().ok()
    }

    pub fn downcast_ref<T: 'static>(&self) -> Option<&T> {
        self.value.downcast_ref::<T>()
    }

    #[inline]
    pub fn is<T: 'static>(&self) -> bool {
        (*self.value).type_id() == TypeId::of::<T>()
    }

    #[inline]
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }
}

impl fmt::Debug for ErasedCell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ErasedCell")
            .field("type", &self.type_name)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cast_checks_the_stored_type() {
        let cell = ErasedCell::new(41u32);
        assert!(cell.is::<u32>());
        assert!(!cell.is::<i32>());
        assert_eq!(cell.cast::<u32>().as_deref(), Some(&41));
        assert!(cell.cast::<String>().is_none());
        assert_eq!(cell.downcast_ref::<u32>(), Some(&41));
        assert_eq!(cell.type_name(), "u32");
    }

    #[test]
    fn snapshots_survive_replacement() {
        let mut cell = ErasedCell::new(String::from("old"));
        let snapshot = cell.cast::<String>().expect("string cell");
        cell = ErasedCell::new(String::from("new"));
        assert_eq!(snapshot.as_str(), "old");
        assert_eq!(cell.downcast_ref::<String>().map(String::as_str), Some("new"));
    }
}
