//! Read-only views over the element tree: element handles, child iteration,
//! the visible-subtree walk used by layout and render passes, and
//! diagnostics.

use std::fmt::Write as _;

use smallvec::{smallvec, SmallVec};

use crate::element::ElementRecord;
use crate::{ElementGraph, ElementId, ElementKey, UsageError, WidgetType};

/// Borrowed view of one live element.
#[derive(Copy, Clone)]
pub struct Element<'a> {
    graph: &'a ElementGraph,
    id: ElementId,
    record: &'a ElementRecord,
}

impl<'a> Element<'a> {
    #[inline]
    pub fn id(&self) -> ElementId {
        self.id
    }

    #[inline]
    pub fn key(&self) -> ElementKey {
        self.record.key
    }

    /// `None` for the root.
    #[inline]
    pub fn widget_type(&self) -> Option<WidgetType> {
        self.record.widget_type()
    }

    /// Payload type name without its module path; `"root"` for the root.
    pub fn type_name(&self) -> &'static str {
        self.record
            .widget_type()
            .and_then(|ty| self.graph.payloads.type_name(ty))
            .map(short_type_name)
            .unwrap_or("root")
    }

    /// Created (or retyped) during the current frame.
    #[inline]
    pub fn is_new(&self) -> bool {
        self.record.is_new
    }

    #[inline]
    pub fn visible(&self) -> bool {
        self.record.visible
    }

    #[inline]
    pub fn is_revisit(&self) -> bool {
        self.record.revisit
    }

    #[inline]
    pub fn is_rerender(&self) -> bool {
        self.record.rerender
    }

    /// How many times the element's subtree has been licensed to rerender.
    #[inline]
    pub fn generation(&self) -> u32 {
        self.record.generation
    }

    #[inline]
    pub fn variable_count(&self) -> usize {
        self.record.variable_count
    }

    pub fn parent(&self) -> Option<Element<'a>> {
        self.record
            .parent
            .and_then(|parent| self.graph.element(parent).ok())
    }

    pub fn children(&self) -> Children<'a> {
        Children {
            graph: self.graph,
            cursor: self.record.first_child,
        }
    }

    pub fn data<D: 'static>(&self) -> Result<&'a D, UsageError> {
        self.graph.try_data::<D>(self.id)
    }
}

impl std::fmt::Debug for Element<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Element")
            .field("id", &self.id)
            .field("key", &self.record.key)
            .field("type", &self.record.widget_type())
            .field("is_new", &self.record.is_new)
            .field("visible", &self.record.visible)
            .finish()
    }
}

/// Children of an element, first to last.
pub struct Children<'a> {
    graph: &'a ElementGraph,
    cursor: Option<ElementId>,
}

impl<'a> Iterator for Children<'a> {
    type Item = Element<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.cursor?;
        let element = self.graph.element(id).ok()?;
        self.cursor = element.record.next;
        Some(element)
    }
}

/// Arena occupancy of one payload pool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolStats {
    pub ty: WidgetType,
    pub type_name: &'static str,
    pub live: usize,
    pub free: usize,
}

/// Arena occupancy snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphStats {
    pub frame: u64,
    pub elements: usize,
    pub free_elements: usize,
    pub variables: usize,
    pub free_variables: usize,
    pub pending_removals: usize,
    pub pools: Vec<PoolStats>,
}

impl GraphStats {
    pub fn pool(&self, ty: WidgetType) -> Option<&PoolStats> {
        self.pools.iter().find(|pool| pool.ty == ty)
    }
}

impl ElementGraph {
    pub fn element(&self, id: ElementId) -> Result<Element<'_>, UsageError> {
        let record = self.record(id)?;
        Ok(Element {
            graph: self,
            id,
            record,
        })
    }

    pub fn contains(&self, id: ElementId) -> bool {
        self.elements.contains(id.0)
    }

    pub fn children(&self, id: ElementId) -> Result<Children<'_>, UsageError> {
        Ok(self.element(id)?.children())
    }

    /// Pre-order walk of the visible part of the subtree at `start`.
    ///
    /// Hidden elements are skipped together with their descendants. The
    /// callback receives each element and its depth relative to `start`.
    pub fn for_each_visible(
        &self,
        start: ElementId,
        mut f: impl FnMut(Element<'_>, usize),
    ) -> Result<(), UsageError> {
        self.record(start)?;
        let mut stack: SmallVec<[(ElementId, usize); 32]> = smallvec![(start, 0)];
        let mut children: SmallVec<[ElementId; 16]> = SmallVec::new();
        while let Some((id, depth)) = stack.pop() {
            let element = self.element(id)?;
            if !element.visible() {
                continue;
            }
            f(element, depth);
            children.extend(element.children().map(|child| child.id()));
            while let Some(child) = children.pop() {
                stack.push((child, depth + 1));
            }
        }
        Ok(())
    }

    /// Indented dump of the attached tree, one element per line.
    pub fn dump_tree(&self) -> String {
        let mut output = String::new();
        let Some(root) = self.root else {
            output.push_str("(no root)\n");
            return output;
        };
        let mut stack: SmallVec<[(ElementId, usize); 32]> = smallvec![(root, 0)];
        let mut children: SmallVec<[ElementId; 16]> = SmallVec::new();
        while let Some((id, depth)) = stack.pop() {
            let Ok(element) = self.element(id) else {
                let _ = writeln!(output, "{}[{id}] (missing)", "  ".repeat(depth));
                continue;
            };
            let type_name = element.type_name();
            let _ = write!(
                output,
                "{}[{id}] {} {type_name}",
                "  ".repeat(depth),
                element.key()
            );
            for (set, flag) in [
                (element.is_new(), "new"),
                (element.is_revisit(), "revisit"),
                (element.is_rerender(), "rerender"),
                (!element.visible(), "hidden"),
            ] {
                if set {
                    let _ = write!(output, " +{flag}");
                }
            }
            if element.variable_count() > 0 {
                let _ = write!(output, " vars={}", element.variable_count());
            }
            output.push('\n');

            children.extend(element.children().map(|child| child.id()));
            while let Some(child) = children.pop() {
                stack.push((child, depth + 1));
            }
        }
        output
    }

    pub fn stats(&self) -> GraphStats {
        GraphStats {
            frame: self.frame(),
            elements: self.elements.len(),
            free_elements: self.elements.free_count(),
            variables: self.variables.arena.len(),
            free_variables: self.variables.arena.free_count(),
            pending_removals: self.removals.len(),
            pools: self
                .payloads
                .iter()
                .map(|(ty, pool)| PoolStats {
                    ty,
                    type_name: pool.type_name(),
                    live: pool.len(),
                    free: pool.free_count(),
                })
                .collect(),
        }
    }
}

/// Strips the module path, keeping generic arguments as written.
fn short_type_name(name: &'static str) -> &'static str {
    let base = name.split('<').next().unwrap_or(name);
    match base.rfind("::") {
        Some(index) => &name[index + 2..],
        None => name,
    }
}
