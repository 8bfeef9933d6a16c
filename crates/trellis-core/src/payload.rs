//! Per-widget-type payload pools.
//!
//! Each widget kind registers its payload type once and receives a
//! [`WidgetType`]. Payloads of that kind live in a dedicated
//! [`TypedPool`], reached by the element graph through the object-safe
//! [`PayloadPool`] trait so it can create and release payloads without
//! knowing the concrete type. Typed access downcasts the pool and fails
//! when the requested type is not the registered one.

use std::any::{Any, TypeId};
use std::fmt;

use crate::arena::{Arena, ArenaIndex};
use crate::collections::map::{Entry, HashMap};

/// Stable id of a registered widget payload type.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WidgetType(u32);

impl WidgetType {
    #[inline]
    pub const fn raw(self) -> u32 {
        self.0
    }

    #[inline]
    fn index(self) -> usize {
        self.0 as usize
    }
}

/// Type-agnostic view of one payload pool.
pub trait PayloadPool: Any {
    /// Allocates a default payload and returns its slot.
    fn emplace(&mut self) -> ArenaIndex;
    /// Drops the payload in `slot`. Returns false when the slot was not live.
    fn pop(&mut self, slot: ArenaIndex) -> bool;
    fn len(&self) -> usize;
    fn free_count(&self) -> usize;
    fn type_name(&self) -> &'static str;
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Arena of payloads of a single type.
pub struct TypedPool<D> {
    arena: Arena<D>,
}

impl<D> TypedPool<D> {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            arena: Arena::with_capacity(capacity),
        }
    }

    pub fn get(&self, slot: ArenaIndex) -> Option<&D> {
        self.arena.get(slot)
    }

    pub fn get_mut(&mut self, slot: ArenaIndex) -> Option<&mut D> {
        self.arena.get_mut(slot)
    }
}

impl<D: Default + 'static> PayloadPool for TypedPool<D> {
    fn emplace(&mut self) -> ArenaIndex {
        self.arena.emplace(D::default())
    }

    fn pop(&mut self, slot: ArenaIndex) -> bool {
        self.arena.pop(slot).is_some()
    }

    fn len(&self) -> usize {
        self.arena.len()
    }

    fn free_count(&self) -> usize {
        self.arena.free_count()
    }

    fn type_name(&self) -> &'static str {
        std::any::type_name::<D>()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// All payload pools of one element graph, indexed by [`WidgetType`].
pub struct PayloadRegistry {
    pools: Vec<Box<dyn PayloadPool>>,
    by_type: HashMap<TypeId, WidgetType>,
    pool_capacity: usize,
}

impl PayloadRegistry {
    pub(crate) fn new(pool_capacity: usize) -> Self {
        Self {
            pools: Vec::new(),
            by_type: HashMap::default(),
            pool_capacity,
        }
    }

    /// Registers `D`, or returns its existing id.
    pub fn register<D: Default + 'static>(&mut self) -> WidgetType {
        match self.by_type.entry(TypeId::of::<D>()) {
            Entry::Occupied(entry) => *entry.get(),
            Entry::Vacant(entry) => {
                let ty = WidgetType(
                    u32::try_from(self.pools.len()).expect("too many registered widget types"),
                );
                self.pools
                    .push(Box::new(TypedPool::<D>::with_capacity(self.pool_capacity)));
                log::debug!(
                    "registered widget type {} as {}",
                    std::any::type_name::<D>(),
                    ty.raw()
                );
                *entry.insert(ty)
            }
        }
    }

    /// Id previously assigned to `D`, if any.
    pub fn lookup<D: 'static>(&self) -> Option<WidgetType> {
        self.by_type.get(&TypeId::of::<D>()).copied()
    }

    pub fn pool(&self, ty: WidgetType) -> Option<&dyn PayloadPool> {
        self.pools.get(ty.index()).map(|pool| &**pool)
    }

    pub(crate) fn pool_mut(&mut self, ty: WidgetType) -> Option<&mut (dyn PayloadPool + 'static)> {
        self.pools.get_mut(ty.index()).map(|pool| &mut **pool)
    }

    pub fn contains(&self, ty: WidgetType) -> bool {
        ty.index() < self.pools.len()
    }

    pub fn type_name(&self, ty: WidgetType) -> Option<&'static str> {
        self.pool(ty).map(PayloadPool::type_name)
    }

    pub(crate) fn emplace(&mut self, ty: WidgetType) -> Option<ArenaIndex> {
        self.pool_mut(ty).map(|pool| pool.emplace())
    }

    pub(crate) fn pop(&mut self, ty: WidgetType, slot: ArenaIndex) -> bool {
        self.pool_mut(ty).is_some_and(|pool| pool.pop(slot))
    }

    pub(crate) fn typed<D: 'static>(&self, ty: WidgetType) -> Option<&TypedPool<D>> {
        self.pool(ty)?.as_any().downcast_ref::<TypedPool<D>>()
    }

    pub(crate) fn typed_mut<D: 'static>(&mut self, ty: WidgetType) -> Option<&mut TypedPool<D>> {
        self.pool_mut(ty)?.as_any_mut().downcast_mut::<TypedPool<D>>()
    }

    pub fn iter(&self) -> impl Iterator<Item = (WidgetType, &dyn PayloadPool)> {
        self.pools
            .iter()
            .enumerate()
            .map(|(index, pool)| (WidgetType(index as u32), &**pool))
    }
}

impl fmt::Debug for PayloadRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.pools.iter().map(|pool| (pool.type_name(), pool.len())))
            .finish()
    }
}
