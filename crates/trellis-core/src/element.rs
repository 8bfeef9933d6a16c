//! Element records and handles.

use std::fmt;

use crate::arena::ArenaIndex;
use crate::variable::VariableId;
use crate::{ElementKey, WidgetType};

/// Handle to an element of an [`ElementGraph`](crate::ElementGraph).
///
/// Ids are generation-checked: once the element is removed the id never
/// resolves again, even after its slot is reused.
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ElementId(pub(crate) ArenaIndex);

impl ElementId {
    #[inline]
    pub fn index(self) -> ArenaIndex {
        self.0
    }
}

impl fmt::Debug for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ElementId({:?})", self.0)
    }
}

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "e{}", self.0)
    }
}

/// Widget payload attached to a typed element.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) struct Payload {
    pub(crate) ty: WidgetType,
    pub(crate) slot: ArenaIndex,
}

#[derive(Debug)]
pub(crate) struct ElementRecord {
    /// `None` only for the implicit root.
    pub(crate) payload: Option<Payload>,
    pub(crate) key: ElementKey,

    pub(crate) parent: Option<ElementId>,
    pub(crate) prev: Option<ElementId>,
    pub(crate) next: Option<ElementId>,
    pub(crate) first_child: Option<ElementId>,
    pub(crate) last_child: Option<ElementId>,

    pub(crate) first_variable: Option<VariableId>,
    pub(crate) variable_count: usize,

    pub(crate) is_new: bool,
    pub(crate) revisit: bool,
    pub(crate) rerender: bool,
    pub(crate) visible: bool,
    /// Unlinked from its parent and waiting in the removal queue.
    pub(crate) detached: bool,
    /// Bumped every time the subtree is marked for rerender.
    pub(crate) generation: u32,
}

impl ElementRecord {
    pub(crate) fn new(key: ElementKey, payload: Option<Payload>) -> Self {
        Self {
            payload,
            key,
            parent: None,
            prev: None,
            next: None,
            first_child: None,
            last_child: None,
            first_variable: None,
            variable_count: 0,
            is_new: true,
            revisit: true,
            rerender: true,
            visible: true,
            detached: false,
            generation: 0,
        }
    }

    #[inline]
    pub(crate) fn widget_type(&self) -> Option<WidgetType> {
        self.payload.map(|payload| payload.ty)
    }

    pub(crate) fn clear_frame_flags(&mut self) {
        self.is_new = false;
        self.revisit = false;
        self.rerender = false;
    }
}
