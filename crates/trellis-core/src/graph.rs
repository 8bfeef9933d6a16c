//! The element graph and its per-frame declaration protocol.
//!
//! A frame is declared between [`ElementGraph::begin`] and
//! [`ElementGraph::end`]:
//!
//! ```text
//! begin()
//!   root()                 implicit untyped root, once per frame
//!   down_if()?             enter the root only if something below changed
//!     next(ty) / next_keyed(ty, key)
//!     variable(|| ..)      cells of the element we descended into
//!     down() .. up()
//!   up()
//! end()
//! ```
//!
//! Each `next` is matched against the retained child at the scope's cursor.
//! Without a rerender license on the parent the match must be exact; with
//! one, unmatched children are dropped, types may change in place and new
//! children are inserted at the cursor.

use std::fmt;
use std::rc::Rc;

use smallvec::SmallVec;

use crate::arena::Arena;
use crate::element::{ElementRecord, Payload};
use crate::erased::ErasedCell;
use crate::payload::PayloadRegistry;
use crate::variable::{Command, FrameHandle, Variable, VariableId, VariableOwner, VariableStore};
use crate::{ElementId, ElementKey, GraphConfig, Key, UsageError, WidgetType};

/// Declaration state of one open scope.
#[derive(Copy, Clone, Debug)]
struct Scope {
    /// `None` for the top level, where only the root and external
    /// variables are declared.
    parent: Option<ElementId>,
    /// Next retained child to match.
    cursor: Option<ElementId>,
    /// Element declared most recently in this scope; target of `down()`.
    last: Option<ElementId>,
    /// Ordinal handed to the next unkeyed child.
    ordinal: u32,
    var_next: Option<VariableId>,
    var_tail: Option<VariableId>,
    var_requested: usize,
}

impl Scope {
    fn top(first_variable: Option<VariableId>) -> Self {
        Self {
            parent: None,
            cursor: None,
            last: None,
            ordinal: 0,
            var_next: first_variable,
            var_tail: None,
            var_requested: 0,
        }
    }

    fn enter(parent: ElementId, record: &ElementRecord) -> Self {
        Self {
            parent: Some(parent),
            cursor: record.first_child,
            last: None,
            ordinal: 0,
            var_next: record.first_variable,
            var_tail: None,
            var_requested: 0,
        }
    }
}

/// Owner of every element, variable cell and payload of one UI tree.
pub struct ElementGraph {
    pub(crate) elements: Arena<ElementRecord>,
    pub(crate) variables: VariableStore,
    pub(crate) payloads: PayloadRegistry,
    pub(crate) root: Option<ElementId>,
    /// Detached elements whose storage is released by the next `begin()`.
    pub(crate) removals: Vec<ElementId>,
    scopes: SmallVec<[Scope; 16]>,
    declaring: bool,
    root_declared: bool,
    handle: FrameHandle,
    frame: u64,
}

impl Default for ElementGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl ElementGraph {
    pub fn new() -> Self {
        Self::with_config(GraphConfig::default())
    }

    pub fn with_config(config: GraphConfig) -> Self {
        Self {
            elements: Arena::with_capacity(config.element_capacity),
            variables: VariableStore::with_capacity(config.variable_capacity),
            payloads: PayloadRegistry::new(config.payload_capacity),
            root: None,
            removals: Vec::new(),
            scopes: SmallVec::new(),
            declaring: false,
            root_declared: false,
            handle: FrameHandle::default(),
            frame: 0,
        }
    }

    /// Registers the payload type of a widget kind. Idempotent.
    pub fn register_type<D: Default + 'static>(&mut self) -> WidgetType {
        self.payloads.register::<D>()
    }

    pub fn payloads(&self) -> &PayloadRegistry {
        &self.payloads
    }

    /// Command queue handle for event handlers.
    pub fn handle(&self) -> FrameHandle {
        self.handle.clone()
    }

    /// Number of frames begun so far.
    #[inline]
    pub fn frame(&self) -> u64 {
        self.frame
    }

    #[inline]
    pub fn is_declaring(&self) -> bool {
        self.declaring
    }

    #[inline]
    pub fn root_element(&self) -> Option<ElementId> {
        self.root
    }

    // ── frame boundaries ────────────────────────────────────────────────────

    /// Opens a declare pass.
    ///
    /// Before any declaration runs, the work staged since the last frame is
    /// applied in a fixed order: revisit requests mark their ancestors, then
    /// staged variable writes are committed (licensing each owner's subtree
    /// to rerender), then detached elements are torn down.
    pub fn begin(&mut self) -> Result<(), UsageError> {
        if self.declaring {
            return Err(self.abort(UsageError::AlreadyDeclaring));
        }
        self.frame += 1;

        let mut revisited = 0usize;
        let mut staged: Vec<VariableId> = Vec::new();
        for command in self.handle.take() {
            match command {
                Command::Revisit(element) => {
                    if self.elements.contains(element.0) {
                        self.mark_ancestors(element);
                        revisited += 1;
                    } else {
                        log::warn!("dropping revisit request for removed element {element}");
                    }
                }
                Command::Write { variable, value } => {
                    let first = self.variables.stage(variable, value);
                    Self::note_staged(&mut staged, variable, first);
                }
                Command::Update { variable, apply } => {
                    let first = self.variables.stage_update(variable, apply);
                    Self::note_staged(&mut staged, variable, first);
                }
            }
        }

        let committed = staged.len();
        for variable in staged {
            let Some(owner) = self.variables.commit(variable) else {
                continue;
            };
            log::debug!("committed {variable} owned by {owner:?}");
            let target = owner.element().or(self.root);
            if let Some(target) = target.filter(|id| self.elements.contains(id.0)) {
                self.mark_subtree(target);
            }
        }

        let removals = std::mem::take(&mut self.removals);
        let removed = removals.len();
        for element in removals {
            self.remove(element);
        }

        self.scopes.clear();
        self.scopes.push(Scope::top(self.variables.external_first));
        self.declaring = true;
        self.root_declared = false;
        log::debug!(
            "frame {} begin: {revisited} revisit(s), {committed} commit(s), {removed} removal(s)",
            self.frame
        );
        Ok(())
    }

    fn note_staged(staged: &mut Vec<VariableId>, variable: VariableId, first: Option<bool>) {
        match first {
            Some(true) => staged.push(variable),
            Some(false) => {}
            None => log::warn!("dropping staged write to removed variable {variable}"),
        }
    }

    /// Closes the declare pass and clears every frame flag in the tree.
    pub fn end(&mut self) -> Result<(), UsageError> {
        if !self.declaring {
            return Err(UsageError::NotDeclaring);
        }
        if self.scopes.len() > 1 {
            let open = self.scopes.len() - 1;
            return Err(self.abort(UsageError::UnbalancedNesting { open }));
        }
        let top = self.scopes[0];
        if let Err(error) = self.check_variable_count(&top) {
            return Err(self.abort(error));
        }
        self.finish_frame();
        log::debug!(
            "frame {} end: {} element(s), {} variable(s), {} pending removal(s)",
            self.frame,
            self.elements.len(),
            self.variables.arena.len(),
            self.removals.len()
        );
        Ok(())
    }

    fn finish_frame(&mut self) {
        self.clear_tree_flags();
        self.variables.clear_frame_flags();
        if self.variables.external_count > 0 {
            self.variables.external_sealed = true;
        }
        self.scopes.clear();
        self.declaring = false;
        self.root_declared = false;
    }

    /// Drops the declare pass after a usage error.
    fn abort(&mut self, error: UsageError) -> UsageError {
        log::error!("declare pass of frame {} aborted: {error}", self.frame);
        self.finish_frame();
        error
    }

    fn guard<R>(
        &mut self,
        f: impl FnOnce(&mut Self) -> Result<R, UsageError>,
    ) -> Result<R, UsageError> {
        if !self.declaring {
            return Err(UsageError::NotDeclaring);
        }
        let result = f(self);
        result.map_err(|error| self.abort(error))
    }

    // ── declaration ─────────────────────────────────────────────────────────

    /// Declares the implicit root. Allowed once per frame, at the top level.
    pub fn root(&mut self) -> Result<ElementId, UsageError> {
        self.guard(|graph| {
            if graph.scopes.len() != 1 {
                return Err(UsageError::RootBelowTopLevel);
            }
            if graph.root_declared {
                return Err(UsageError::RootAlreadyDeclared);
            }
            let root = match graph.root {
                Some(root) => root,
                None => {
                    let root = ElementId(
                        graph
                            .elements
                            .emplace(ElementRecord::new(ElementKey::Root, None)),
                    );
                    log::trace!("created root {root}");
                    graph.root = Some(root);
                    root
                }
            };
            graph.root_declared = true;
            graph.scopes[0].last = Some(root);
            Ok(root)
        })
    }

    /// Declares the next unkeyed child of the current scope.
    pub fn next(&mut self, ty: WidgetType) -> Result<ElementId, UsageError> {
        self.guard(|graph| graph.declare(ty, None))
    }

    /// Declares the next child of the current scope under an explicit key.
    pub fn next_keyed(
        &mut self,
        ty: WidgetType,
        key: impl Into<Key>,
    ) -> Result<ElementId, UsageError> {
        let key = key.into();
        self.guard(|graph| graph.declare(ty, Some(key)))
    }

    fn declare(&mut self, ty: WidgetType, key: Option<Key>) -> Result<ElementId, UsageError> {
        if !self.payloads.contains(ty) {
            return Err(UsageError::UnregisteredType { ty });
        }
        let depth = self.scopes.len() - 1;
        let parent = self.scopes[depth].parent.ok_or(UsageError::NoOpenScope)?;
        let declared = match key {
            Some(key) => ElementKey::Explicit(key),
            None => {
                let scope = &mut self.scopes[depth];
                scope.ordinal += 1;
                ElementKey::Positional(scope.ordinal - 1)
            }
        };
        let cursor = self.scopes[depth].cursor;

        let id = if self.elements[parent.0].rerender {
            match self.find_sibling(cursor, declared) {
                Some(found) => {
                    let mut skipped = cursor;
                    while let Some(stale) = skipped.filter(|&stale| stale != found) {
                        skipped = self.elements[stale.0].next;
                        self.detach(stale);
                    }
                    if self.elements[found.0].widget_type() != Some(ty) {
                        self.retype(found, ty)?;
                    }
                    found
                }
                None => self.insert_child(parent, cursor, declared, ty)?,
            }
        } else {
            match cursor {
                Some(candidate) if self.matches(candidate, declared, ty) => candidate,
                _ => {
                    return Err(UsageError::IllegalStructuralEdit {
                        parent,
                        expected: cursor.map(|candidate| self.elements[candidate.0].key),
                        declared: Some(declared),
                    })
                }
            }
        };

        let next = self.elements[id.0].next;
        let scope = &mut self.scopes[depth];
        scope.cursor = next;
        scope.last = Some(id);
        Ok(id)
    }

    fn matches(&self, candidate: ElementId, key: ElementKey, ty: WidgetType) -> bool {
        let record = &self.elements[candidate.0];
        record.key == key && record.widget_type() == Some(ty)
    }

    fn find_sibling(&self, from: Option<ElementId>, key: ElementKey) -> Option<ElementId> {
        let mut cursor = from;
        while let Some(id) = cursor {
            let record = &self.elements[id.0];
            if record.key == key {
                return Some(id);
            }
            cursor = record.next;
        }
        None
    }

    fn insert_child(
        &mut self,
        parent: ElementId,
        before: Option<ElementId>,
        key: ElementKey,
        ty: WidgetType,
    ) -> Result<ElementId, UsageError> {
        let slot = self
            .payloads
            .emplace(ty)
            .ok_or(UsageError::UnregisteredType { ty })?;
        let mut record = ElementRecord::new(key, Some(Payload { ty, slot }));
        record.parent = Some(parent);
        let id = ElementId(self.elements.emplace(record));
        self.link_before(parent, id, before);
        log::trace!(
            "created {id} {key} ({}) under {parent}",
            self.payloads.type_name(ty).unwrap_or("?")
        );
        Ok(id)
    }

    /// Swaps the payload of a retained element for a fresh one of `ty`.
    /// The element's variables belong to the old widget kind and are released.
    fn retype(&mut self, id: ElementId, ty: WidgetType) -> Result<(), UsageError> {
        let slot = self
            .payloads
            .emplace(ty)
            .ok_or(UsageError::UnregisteredType { ty })?;
        let record = &mut self.elements[id.0];
        let old = record.payload.replace(Payload { ty, slot });
        let variables = record.first_variable.take();
        record.variable_count = 0;
        record.is_new = true;
        if let Some(old) = old {
            self.payloads.pop(old.ty, old.slot);
        }
        let released = self.variables.release_chain(variables);
        log::trace!(
            "retyped {id} to {} ({released} variable(s) released)",
            self.payloads.type_name(ty).unwrap_or("?")
        );
        Ok(())
    }

    /// Opens the most recently declared element as the current scope.
    pub fn down(&mut self) -> Result<(), UsageError> {
        self.guard(|graph| {
            let current = graph.current_element()?;
            graph.enter(current);
            Ok(())
        })
    }

    /// Like [`down`](Self::down), but only when the element is flagged for
    /// revisit. Returns false, leaving the subtree untouched, otherwise.
    pub fn down_if(&mut self) -> Result<bool, UsageError> {
        self.guard(|graph| {
            let current = graph.current_element()?;
            if !graph.elements[current.0].revisit {
                return Ok(false);
            }
            graph.enter(current);
            Ok(true)
        })
    }

    fn current_element(&self) -> Result<ElementId, UsageError> {
        let current = self
            .scopes
            .last()
            .and_then(|scope| scope.last)
            .ok_or(UsageError::NoCurrentElement)?;
        if !self.elements.contains(current.0) {
            return Err(UsageError::StaleElement { element: current });
        }
        Ok(current)
    }

    fn enter(&mut self, element: ElementId) {
        let scope = Scope::enter(element, &self.elements[element.0]);
        self.scopes.push(scope);
    }

    /// Closes the current scope. Retained children that were not redeclared
    /// are dropped, which requires the parent's rerender license.
    pub fn up(&mut self) -> Result<(), UsageError> {
        self.guard(|graph| {
            if graph.scopes.len() <= 1 {
                return Err(UsageError::UnbalancedUp);
            }
            let scope = graph.scopes[graph.scopes.len() - 1];
            let parent = scope.parent.ok_or(UsageError::UnbalancedUp)?;
            graph.check_variable_count(&scope)?;

            if let Some(trailing) = scope.cursor {
                if !graph.elements[parent.0].rerender {
                    return Err(UsageError::IllegalStructuralEdit {
                        parent,
                        expected: Some(graph.elements[trailing.0].key),
                        declared: None,
                    });
                }
                let mut cursor = Some(trailing);
                while let Some(stale) = cursor {
                    cursor = graph.elements[stale.0].next;
                    graph.detach(stale);
                }
            }
            graph.scopes.pop();
            Ok(())
        })
    }

    // ── variables ───────────────────────────────────────────────────────────

    /// Returns the next state cell of the current scope, creating it with
    /// `factory` the first time the scope declares this position.
    ///
    /// The current scope is the element entered by the innermost open
    /// `down()`, or the graph's external chain at the top level.
    pub fn variable<T: 'static>(
        &mut self,
        factory: impl FnOnce() -> T,
    ) -> Result<Variable<T>, UsageError> {
        self.guard(|graph| graph.declare_variable(factory))
    }

    fn declare_variable<T: 'static>(
        &mut self,
        factory: impl FnOnce() -> T,
    ) -> Result<Variable<T>, UsageError> {
        let depth = self.scopes.len() - 1;
        let scope = self.scopes[depth];
        let owner_id = scope.parent;
        let position = scope.var_requested;

        if let Some(id) = scope.var_next {
            let record = &self.variables.arena[id.0];
            let value = record
                .value
                .cast::<T>()
                .ok_or(UsageError::VariableTypeMismatch {
                    owner: owner_id,
                    position,
                    expected: record.value.type_name(),
                    requested: std::any::type_name::<T>(),
                })?;
            let variable = Variable::new(id, record, value, self.handle.clone());
            let next = record.next;
            let scope = &mut self.scopes[depth];
            scope.var_next = next;
            scope.var_tail = Some(id);
            scope.var_requested += 1;
            return Ok(variable);
        }

        let (owner_is_new, expected) = match owner_id {
            Some(owner) => {
                let record = &self.elements[owner.0];
                (record.is_new, record.variable_count)
            }
            None => (
                !self.variables.external_sealed,
                self.variables.external_count,
            ),
        };
        if !owner_is_new {
            return Err(UsageError::UnstableVariableCount {
                owner: owner_id,
                expected,
                requested: position + 1,
            });
        }

        let owner = owner_id.map_or(VariableOwner::External, VariableOwner::Element);
        let value = Rc::new(factory());
        let id = self.variables.create(
            owner,
            ErasedCell::from_rc(Rc::clone(&value)),
            scope.var_tail,
        );
        match owner_id {
            Some(owner) => {
                let record = &mut self.elements[owner.0];
                if scope.var_tail.is_none() {
                    record.first_variable = Some(id);
                }
                record.variable_count += 1;
            }
            None => {
                if scope.var_tail.is_none() {
                    self.variables.external_first = Some(id);
                }
                self.variables.external_count += 1;
            }
        }

        let variable = Variable::new(id, &self.variables.arena[id.0], value, self.handle.clone());
        let scope = &mut self.scopes[depth];
        scope.var_tail = Some(id);
        scope.var_requested += 1;
        Ok(variable)
    }

    fn check_variable_count(&self, scope: &Scope) -> Result<(), UsageError> {
        let (owner_is_new, expected) = match scope.parent {
            Some(owner) => {
                let record = &self.elements[owner.0];
                (record.is_new, record.variable_count)
            }
            None => (
                !self.variables.external_sealed,
                self.variables.external_count,
            ),
        };
        if !owner_is_new && scope.var_requested != expected {
            return Err(UsageError::UnstableVariableCount {
                owner: scope.parent,
                expected,
                requested: scope.var_requested,
            });
        }
        Ok(())
    }

    // ── tree links ──────────────────────────────────────────────────────────

    fn link_before(&mut self, parent: ElementId, id: ElementId, before: Option<ElementId>) {
        let prev = match before {
            Some(before) => self.elements[before.0].prev,
            None => self.elements[parent.0].last_child,
        };
        {
            let record = &mut self.elements[id.0];
            record.parent = Some(parent);
            record.prev = prev;
            record.next = before;
        }
        match prev {
            Some(prev) => self.elements[prev.0].next = Some(id),
            None => self.elements[parent.0].first_child = Some(id),
        }
        match before {
            Some(before) => self.elements[before.0].prev = Some(id),
            None => self.elements[parent.0].last_child = Some(id),
        }
    }

    pub(crate) fn unlink(&mut self, id: ElementId) {
        let (parent, prev, next) = {
            let record = &self.elements[id.0];
            (record.parent, record.prev, record.next)
        };
        match (prev, parent) {
            (Some(prev), _) => self.elements[prev.0].next = next,
            (None, Some(parent)) => self.elements[parent.0].first_child = next,
            (None, None) => {}
        }
        match (next, parent) {
            (Some(next), _) => self.elements[next.0].prev = prev,
            (None, Some(parent)) => self.elements[parent.0].last_child = prev,
            (None, None) => {}
        }
        let record = &mut self.elements[id.0];
        record.parent = None;
        record.prev = None;
        record.next = None;
    }

    /// Unlinks `id` from the tree and queues it for teardown at the next
    /// `begin()`.
    fn detach(&mut self, id: ElementId) {
        self.unlink(id);
        self.elements[id.0].detached = true;
        self.removals.push(id);
        log::trace!("detached {id}; queued for removal");
    }

    // ── payload access ──────────────────────────────────────────────────────

    pub fn try_data<D: 'static>(&self, id: ElementId) -> Result<&D, UsageError> {
        let payload = self.typed_payload::<D>(id)?;
        self.payloads
            .typed::<D>(payload.ty)
            .and_then(|pool| pool.get(payload.slot))
            .ok_or(UsageError::StaleElement { element: id })
    }

    pub fn try_data_mut<D: 'static>(&mut self, id: ElementId) -> Result<&mut D, UsageError> {
        let payload = self.typed_payload::<D>(id)?;
        self.payloads
            .typed_mut::<D>(payload.ty)
            .and_then(|pool| pool.get_mut(payload.slot))
            .ok_or(UsageError::StaleElement { element: id })
    }

    /// Payload of `id` as `D`.
    ///
    /// # Panics
    ///
    /// When `id` is stale or its widget type does not store `D`.
    pub fn data<D: 'static>(&self, id: ElementId) -> &D {
        match self.try_data::<D>(id) {
            Ok(data) => data,
            Err(error) => panic!("{error}"),
        }
    }

    /// Mutable payload of `id` as `D`.
    ///
    /// # Panics
    ///
    /// When `id` is stale or its widget type does not store `D`.
    pub fn data_mut<D: 'static>(&mut self, id: ElementId) -> &mut D {
        match self.try_data_mut::<D>(id) {
            Ok(data) => data,
            Err(error) => panic!("{error}"),
        }
    }

    fn typed_payload<D: 'static>(&self, id: ElementId) -> Result<Payload, UsageError> {
        let record = self.record(id)?;
        let mismatch = |actual| UsageError::TypeMismatch {
            element: id,
            expected: std::any::type_name::<D>(),
            actual,
        };
        let payload = record.payload.ok_or_else(|| mismatch(None))?;
        if self.payloads.typed::<D>(payload.ty).is_none() {
            return Err(mismatch(self.payloads.type_name(payload.ty)));
        }
        Ok(payload)
    }

    pub(crate) fn record(&self, id: ElementId) -> Result<&ElementRecord, UsageError> {
        self.elements
            .get(id.0)
            .ok_or(UsageError::StaleElement { element: id })
    }

    /// Hides or shows an element. Hidden elements keep their state and
    /// children but are skipped by [`for_each_visible`](Self::for_each_visible).
    pub fn set_visible(&mut self, id: ElementId, visible: bool) -> Result<(), UsageError> {
        self.elements
            .get_mut(id.0)
            .map(|record| record.visible = visible)
            .ok_or(UsageError::StaleElement { element: id })
    }
}

impl fmt::Debug for ElementGraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ElementGraph")
            .field("frame", &self.frame)
            .field("declaring", &self.declaring)
            .field("elements", &self.elements.len())
            .field("variables", &self.variables.arena.len())
            .field("payloads", &self.payloads)
            .field("pending_removals", &self.removals.len())
            .finish()
    }
}
