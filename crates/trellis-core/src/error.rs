use std::fmt;

use crate::{ElementId, ElementKey, WidgetType};

/// Contract violation raised by the declaration protocol.
///
/// None of these are recoverable inside a frame: the graph aborts the
/// current declare pass before returning one (see
/// [`ElementGraph::begin`](crate::ElementGraph::begin)).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UsageError {
    /// `end()` was called while `down()` scopes were still open.
    UnbalancedNesting { open: usize },
    /// `up()` was called with no open `down()` scope.
    UnbalancedUp,
    /// The declared shape differs from the retained one under a parent that
    /// holds no rerender license this frame. `expected` is the retained
    /// child at the cursor, `declared` what the caller asked for (`None`
    /// when the scope was closed early).
    IllegalStructuralEdit {
        parent: ElementId,
        expected: Option<ElementKey>,
        declared: Option<ElementKey>,
    },
    /// An existing scope declared a different number of variables than in
    /// the frame that created it. `owner` is `None` for the external scope.
    UnstableVariableCount {
        owner: Option<ElementId>,
        expected: usize,
        requested: usize,
    },
    /// A retained variable was redeclared with a different value type.
    VariableTypeMismatch {
        owner: Option<ElementId>,
        position: usize,
        expected: &'static str,
        requested: &'static str,
    },
    /// Payload accessed through the wrong Rust type.
    TypeMismatch {
        element: ElementId,
        expected: &'static str,
        actual: Option<&'static str>,
    },
    /// The handle refers to an element that has been removed.
    StaleElement { element: ElementId },
    /// A `WidgetType` that this graph never handed out.
    UnregisteredType { ty: WidgetType },
    /// Declaration call outside `begin()`..`end()`.
    NotDeclaring,
    /// `begin()` or an idle-only operation during a declare pass.
    AlreadyDeclaring,
    /// `root()` called twice in one frame.
    RootAlreadyDeclared,
    /// `root()` called inside an open scope.
    RootBelowTopLevel,
    /// `next()` at the top level, where only `root()` may be declared.
    NoOpenScope,
    /// `down()` before any element was declared in the current scope.
    NoCurrentElement,
}

impl fmt::Display for UsageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UsageError::UnbalancedNesting { open } => {
                write!(f, "end() called with {open} unclosed down() scope(s)")
            }
            UsageError::UnbalancedUp => f.write_str("up() called without a matching down()"),
            UsageError::IllegalStructuralEdit {
                parent,
                expected,
                declared,
            } => {
                write!(
                    f,
                    "children of {parent} changed without a rerender license: "
                )?;
                match (expected, declared) {
                    (Some(expected), Some(declared)) => {
                        write!(f, "expected {expected}, declared {declared}")
                    }
                    (None, Some(declared)) => {
                        write!(f, "declared {declared} past the last retained child")
                    }
                    (Some(expected), None) => {
                        write!(f, "retained child {expected} was not redeclared")
                    }
                    (None, None) => f.write_str("shape mismatch"),
                }
            }
            UsageError::UnstableVariableCount {
                owner,
                expected,
                requested,
            } => {
                match owner {
                    Some(owner) => write!(f, "element {owner}")?,
                    None => f.write_str("external scope")?,
                }
                write!(
                    f,
                    " declared {requested} variable(s) but was created with {expected}"
                )
            }
            UsageError::VariableTypeMismatch {
                owner,
                position,
                expected,
                requested,
            } => {
                match owner {
                    Some(owner) => write!(f, "element {owner}")?,
                    None => f.write_str("external scope")?,
                }
                write!(
                    f,
                    " variable #{position} holds {expected} but was redeclared as {requested}"
                )
            }
            UsageError::TypeMismatch {
                element,
                expected,
                actual,
            } => write!(
                f,
                "element {element} payload type mismatch; expected {expected}, found {}",
                actual.unwrap_or("<untyped>")
            ),
            UsageError::StaleElement { element } => {
                write!(f, "element handle {element} refers to a removed element")
            }
            UsageError::UnregisteredType { ty } => {
                write!(f, "widget type {} is not registered with this graph", ty.raw())
            }
            UsageError::NotDeclaring => f.write_str("declaration call outside begin()/end()"),
            UsageError::AlreadyDeclaring => {
                f.write_str("operation not allowed during a declare pass")
            }
            UsageError::RootAlreadyDeclared => {
                f.write_str("root() may be declared only once per frame")
            }
            UsageError::RootBelowTopLevel => {
                f.write_str("root() called inside an open scope; it belongs at the top level")
            }
            UsageError::NoOpenScope => {
                f.write_str("next() called at the top level; declare root() and down() first")
            }
            UsageError::NoCurrentElement => {
                f.write_str("down() called before any element was declared in this scope")
            }
        }
    }
}

impl std::error::Error for UsageError {}
