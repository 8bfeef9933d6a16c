//! Tree reconciliation and state-cell engine for the Trellis UI toolkit.
//!
//! Application code redeclares its widget tree every frame. The
//! [`ElementGraph`] matches each declaration against the elements it retained
//! from the previous frame (by position, key and widget type), keeps their
//! payloads and [`Variable`] cells alive, and only allows the tree to change
//! shape under elements that hold a rerender license for the frame.
//!
//! ```
//! use trellis_core::ElementGraph;
//!
//! #[derive(Default)]
//! struct Label {
//!     text: String,
//! }
//!
//! let mut ui = ElementGraph::new();
//! let label = ui.register_type::<Label>();
//!
//! ui.begin()?;
//! ui.root()?;
//! ui.down()?;
//! let title = ui.next(label)?;
//! ui.data_mut::<Label>(title).text = String::from("hello");
//! ui.up()?;
//! ui.end()?;
//!
//! assert_eq!(ui.data::<Label>(title).text, "hello");
//! # Ok::<(), trellis_core::UsageError>(())
//! ```

pub mod arena;
mod collections;
mod config;
mod dirty;
mod element;
pub mod erased;
mod error;
mod graph;
mod hash;
mod key;
pub mod payload;
mod variable;
mod walk;

pub use config::GraphConfig;
pub use element::ElementId;
pub use error::UsageError;
pub use graph::ElementGraph;
pub use key::{ElementKey, Key};
pub use payload::{PayloadPool, PayloadRegistry, WidgetType};
pub use variable::{FrameHandle, Variable, VariableId, VariableOwner};
pub use walk::{Children, Element, GraphStats, PoolStats};

/// Builds a [`Key`] from the call site, for helpers that declare a fixed
/// child and want a key that survives reordering of their callers.
#[macro_export]
macro_rules! location_key {
    () => {
        $crate::Key::location(file!(), line!(), column!())
    };
}

#[cfg(test)]
#[path = "tests/graph_tests.rs"]
mod graph_tests;

#[cfg(test)]
#[path = "tests/variable_tests.rs"]
mod variable_tests;

#[cfg(test)]
#[path = "tests/removal_tests.rs"]
mod removal_tests;
