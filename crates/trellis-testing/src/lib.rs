//! Testing utilities and frame harness for Trellis

pub mod assertions;
pub mod shape;
pub mod testing;

pub use assertions::*;
pub use shape::{outline, shape_of, ShapeEntry};
pub use testing::*;

pub mod prelude {
    pub use crate::assertions;
    pub use crate::shape::{outline, shape_of, ShapeEntry};
    pub use crate::testing::*;
    pub use trellis_core::{ElementGraph, ElementId, ElementKey, Key, UsageError, WidgetType};
}
