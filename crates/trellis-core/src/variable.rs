//! Variable store: positional state cells with deferred commit.
//!
//! Every element owns a singly ordered chain of cells, and the graph owns one
//! more "external" chain for cells declared outside any element. A cell is
//! identified by its position in its owner's chain, so the owner must declare
//! the same number of cells, in the same order, every frame it is entered.
//!
//! Writes never touch the cell directly. [`Variable::set`] and
//! [`Variable::update`] push a command onto the graph's [`FrameHandle`];
//! the commands are drained by the next [`ElementGraph::begin`], which
//! commits the value, flags the cell as modified for that one frame and
//! licenses the owner's subtree to rerender.
//!
//! [`ElementGraph::begin`]: crate::ElementGraph::begin

use std::cell::RefCell;
use std::fmt;
use std::marker::PhantomData;
use std::ops::Deref;
use std::rc::Rc;

use crate::arena::{Arena, ArenaIndex};
use crate::erased::ErasedCell;
use crate::ElementId;

/// Handle to a variable cell record.
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VariableId(pub(crate) ArenaIndex);

impl VariableId {
    #[inline]
    pub fn index(self) -> ArenaIndex {
        self.0
    }
}

impl fmt::Debug for VariableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "VariableId({:?})", self.0)
    }
}

impl fmt::Display for VariableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}

/// Scope a variable belongs to.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum VariableOwner {
    Element(ElementId),
    /// Declared at the top level, outside the root element.
    External,
}

impl VariableOwner {
    #[inline]
    pub fn element(self) -> Option<ElementId> {
        match self {
            VariableOwner::Element(id) => Some(id),
            VariableOwner::External => None,
        }
    }
}

pub(crate) struct VariableRecord {
    pub(crate) owner: VariableOwner,
    pub(crate) value: ErasedCell,
    /// Staged value; only set while `begin()` is draining commands.
    pub(crate) pending: Option<ErasedCell>,
    pub(crate) modified: bool,
    pub(crate) is_new: bool,
    pub(crate) next: Option<VariableId>,
}

impl fmt::Debug for VariableRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VariableRecord")
            .field("owner", &self.owner)
            .field("type", &self.value.type_name())
            .field("modified", &self.modified)
            .field("is_new", &self.is_new)
            .finish_non_exhaustive()
    }
}

type UpdateFn = Box<dyn FnOnce(&ErasedCell) -> Option<ErasedCell>>;

/// Deferred mutation, drained at the start of the next frame.
pub(crate) enum Command {
    Revisit(ElementId),
    Write {
        variable: VariableId,
        value: ErasedCell,
    },
    Update {
        variable: VariableId,
        apply: UpdateFn,
    },
}

/// Cloneable handle onto a graph's command queue.
///
/// Event handlers keep one of these (or a [`Variable`]) and stage work
/// through it; nothing staged takes effect before the next `begin()`.
#[derive(Clone, Default)]
pub struct FrameHandle {
    commands: Rc<RefCell<Vec<Command>>>, // FUTURE(no_std): swap for a ring buffer.
}

impl FrameHandle {
    pub(crate) fn push(&self, command: Command) {
        self.commands.borrow_mut().push(command);
    }

    pub(crate) fn take(&self) -> Vec<Command> {
        std::mem::take(&mut *self.commands.borrow_mut())
    }

    /// Asks for `element` and its ancestors to be revisited next frame,
    /// without licensing structural change.
    pub fn request_revisit(&self, element: ElementId) {
        self.push(Command::Revisit(element));
    }

    /// True when a `set`, `update` or revisit request is waiting for `begin()`.
    pub fn has_pending(&self) -> bool {
        !self.commands.borrow().is_empty()
    }

    pub fn pending_count(&self) -> usize {
        self.commands.borrow().len()
    }
}

impl fmt::Debug for FrameHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FrameHandle")
            .field("pending", &self.pending_count())
            .finish()
    }
}

/// Typed view of a state cell for the current frame.
///
/// Dereferencing yields the value committed at the start of the frame; it
/// does not change while the frame runs, however often the cell is set.
pub struct Variable<T: 'static> {
    id: VariableId,
    owner: VariableOwner,
    value: Rc<T>,
    modified: bool,
    is_new: bool,
    handle: FrameHandle,
    _marker: PhantomData<fn() -> T>,
}

impl<T: 'static> Variable<T> {
    pub(crate) fn new(
        id: VariableId,
        record: &VariableRecord,
        value: Rc<T>,
        handle: FrameHandle,
    ) -> Self {
        Self {
            id,
            owner: record.owner,
            value,
            modified: record.modified,
            is_new: record.is_new,
            handle,
            _marker: PhantomData,
        }
    }

    #[inline]
    pub fn id(&self) -> VariableId {
        self.id
    }

    #[inline]
    pub fn owner(&self) -> VariableOwner {
        self.owner
    }

    /// The frame's snapshot of the value.
    #[inline]
    pub fn get(&self) -> &T {
        &self.value
    }

    /// True during the one frame after a staged write was committed.
    #[inline]
    pub fn modified(&self) -> bool {
        self.modified
    }

    /// True during the frame that created the cell.
    #[inline]
    pub fn is_new(&self) -> bool {
        self.is_new
    }

    /// Stages `value`; it becomes visible from the next `begin()` onward.
    pub fn set(&self, value: T) {
        self.handle.push(Command::Write {
            variable: self.id,
            value: ErasedCell::new(value),
        });
    }

    /// Stages `f` applied to whatever the cell holds when the next
    /// `begin()` commits it, including earlier writes staged this frame.
    pub fn update(&self, f: impl FnOnce(&T) -> T + 'static) {
        self.handle.push(Command::Update {
            variable: self.id,
            apply: Box::new(move |current: &ErasedCell| {
                current.downcast_ref::<T>().map(|value| ErasedCell::new(f(value)))
            }),
        });
    }
}

impl<T: 'static> Clone for Variable<T> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            owner: self.owner,
            value: Rc::clone(&self.value),
            modified: self.modified,
            is_new: self.is_new,
            handle: self.handle.clone(),
            _marker: PhantomData,
        }
    }
}

impl<T: 'static> Deref for Variable<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.value
    }
}

impl<T: fmt::Debug + 'static> fmt::Debug for Variable<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Variable")
            .field("id", &self.id)
            .field("value", &*self.value)
            .field("modified", &self.modified)
            .field("is_new", &self.is_new)
            .finish()
    }
}

/// Arena of variable records plus the external chain.
#[derive(Default)]
pub(crate) struct VariableStore {
    pub(crate) arena: Arena<VariableRecord>,
    pub(crate) external_first: Option<VariableId>,
    pub(crate) external_count: usize,
    /// The external chain stops being "new" after the first frame that
    /// declared cells in it.
    pub(crate) external_sealed: bool,
    /// Cells whose `is_new` / `modified` flags must drop at `end()`.
    pub(crate) fresh: Vec<VariableId>,
    pub(crate) touched: Vec<VariableId>,
}

impl VariableStore {
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            arena: Arena::with_capacity(capacity),
            ..Self::default()
        }
    }

    /// Creates a cell and links it after `tail` (or as the chain head).
    pub(crate) fn create(
        &mut self,
        owner: VariableOwner,
        value: ErasedCell,
        tail: Option<VariableId>,
    ) -> VariableId {
        let id = VariableId(self.arena.emplace(VariableRecord {
            owner,
            value,
            pending: None,
            modified: false,
            is_new: true,
            next: None,
        }));
        if let Some(tail) = tail {
            self.arena[tail.0].next = Some(id);
        }
        self.fresh.push(id);
        id
    }

    /// Releases every cell of a chain. Returns how many were freed.
    pub(crate) fn release_chain(&mut self, first: Option<VariableId>) -> usize {
        let mut released = 0;
        let mut cursor = first;
        while let Some(record) = cursor.and_then(|id| self.arena.pop(id.0)) {
            cursor = record.next;
            released += 1;
        }
        released
    }

    /// Moves a staged write into the record. Returns true when this is the
    /// first write staged for the cell in this drain.
    pub(crate) fn stage(&mut self, id: VariableId, value: ErasedCell) -> Option<bool> {
        let record = self.arena.get_mut(id.0)?;
        Some(record.pending.replace(value).is_none())
    }

    pub(crate) fn stage_update(&mut self, id: VariableId, apply: UpdateFn) -> Option<bool> {
        let record = self.arena.get_mut(id.0)?;
        let first = record.pending.is_none();
        let current = record.pending.as_ref().unwrap_or(&record.value);
        let next = apply(current)?;
        record.pending = Some(next);
        Some(first)
    }

    /// Commits the staged value. Returns the owner so the caller can license
    /// its subtree.
    pub(crate) fn commit(&mut self, id: VariableId) -> Option<VariableOwner> {
        let record = self.arena.get_mut(id.0)?;
        let value = record.pending.take()?;
        record.value = value;
        record.modified = true;
        self.touched.push(id);
        Some(record.owner)
    }

    /// Drops the one-frame `is_new` / `modified` flags.
    pub(crate) fn clear_frame_flags(&mut self) {
        for id in self.fresh.drain(..) {
            if let Some(record) = self.arena.get_mut(id.0) {
                record.is_new = false;
            }
        }
        for id in self.touched.drain(..) {
            if let Some(record) = self.arena.get_mut(id.0) {
                record.modified = false;
            }
        }
    }
}
