//! Dirty-flag propagation and subtree teardown.
//!
//! `revisit` means "re-enter this subtree's declarations"; it always holds
//! for every ancestor of a flagged element, which lets ancestor marking stop
//! at the first element that is already flagged. `rerender` additionally
//! licenses structural edits and is only ever set on whole subtrees.

use smallvec::{smallvec, SmallVec};

use crate::{ElementGraph, ElementId, UsageError};

impl ElementGraph {
    /// Flags `id` and its ancestors for revisit in the next frame.
    ///
    /// Only allowed between frames; during a frame use
    /// [`FrameHandle::request_revisit`](crate::FrameHandle::request_revisit).
    pub fn mark_ancestors_revisit(&mut self, id: ElementId) -> Result<(), UsageError> {
        if self.is_declaring() {
            return Err(UsageError::AlreadyDeclaring);
        }
        self.record(id)?;
        self.mark_ancestors(id);
        Ok(())
    }

    /// Licenses the subtree rooted at `id` to change shape in the next frame.
    pub fn mark_subtree_rerender(&mut self, id: ElementId) -> Result<(), UsageError> {
        if self.is_declaring() {
            return Err(UsageError::AlreadyDeclaring);
        }
        self.record(id)?;
        self.mark_subtree(id);
        Ok(())
    }

    pub(crate) fn mark_ancestors(&mut self, id: ElementId) {
        let mut cursor = Some(id);
        while let Some(current) = cursor {
            let record = &mut self.elements[current.0];
            if record.revisit {
                break;
            }
            record.revisit = true;
            cursor = record.parent;
        }
    }

    pub(crate) fn mark_subtree(&mut self, id: ElementId) {
        self.mark_ancestors(id);
        let mut stack: SmallVec<[ElementId; 32]> = smallvec![id];
        while let Some(current) = stack.pop() {
            let record = &mut self.elements[current.0];
            record.revisit = true;
            record.rerender = true;
            record.generation = record.generation.wrapping_add(1);
            let mut child = record.first_child;
            while let Some(next) = child {
                stack.push(next);
                child = self.elements[next.0].next;
            }
        }
    }

    /// Tears down `id` and its whole subtree: variables, payload slots and
    /// element slots all go back to their arenas. Descendants are released
    /// before the element itself is unlinked. Returns the number of
    /// elements released.
    pub(crate) fn remove(&mut self, id: ElementId) -> usize {
        if !self.elements.contains(id.0) {
            return 0;
        }
        let mut stack: SmallVec<[(ElementId, bool); 32]> = smallvec![(id, false)];
        let mut elements = 0;
        let mut variables = 0;
        while let Some((current, expanded)) = stack.pop() {
            if !expanded {
                stack.push((current, true));
                let mut child = self.elements[current.0].first_child;
                while let Some(next) = child {
                    stack.push((next, false));
                    child = self.elements[next.0].next;
                }
                continue;
            }
            if current == id && !self.elements[current.0].detached {
                self.unlink(current);
            }
            let Some(record) = self.elements.pop(current.0) else {
                continue;
            };
            variables += self.variables.release_chain(record.first_variable);
            if let Some(payload) = record.payload {
                self.payloads.pop(payload.ty, payload.slot);
            }
            elements += 1;
        }
        if self.root == Some(id) {
            self.root = None;
        }
        log::trace!("removed {id}: {elements} element(s), {variables} variable(s)");
        elements
    }

    /// Clears `is_new`, `revisit` and `rerender` on every attached element.
    pub(crate) fn clear_tree_flags(&mut self) {
        let Some(root) = self.root else {
            return;
        };
        let mut stack: SmallVec<[ElementId; 32]> = smallvec![root];
        while let Some(current) = stack.pop() {
            let record = &mut self.elements[current.0];
            record.clear_frame_flags();
            let mut child = record.first_child;
            while let Some(next) = child {
                stack.push(next);
                child = self.elements[next.0].next;
            }
        }
    }
}
