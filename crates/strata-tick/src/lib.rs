#![allow(clippy::missing_panics_doc)]

//! Ordered update scheduling.
//!
//! A [`System`] is a unit of per-tick logic that reads a [`Registry`] and a
//! caller-supplied context. A [`SystemGroup`] holds at most one system per
//! concrete type, runs them by ascending [`Order`], and is itself a system,
//! so groups nest into a tree that updates depth-first.
//!
//! ```text
//! root (SystemGroup)
//! ├── -10  InputSystem
//! ├──   0  physics (SystemGroup)
//! │        ├── 0  Integrate
//! │        └── 1  Collide
//! └──  10  Report
//! ```
//!
//! The context is only reachable through the reference handed to
//! [`System::update`], so it cannot be touched outside an update call.
//! Systems never get mutable access to the registry; structural changes
//! happen between ticks.

use std::{
    any::{Any, TypeId, type_name},
    collections::hash_map::Entry as MapEntry,
    fmt,
};

use rustc_hash::FxHashMap;
use strata_ecs::Registry;

/// Position of a system within its group. Lower runs first.
pub type Order = i64;

/// A unit of update logic driven by a [`SystemGroup`].
pub trait System<D> {
    fn update(&mut self, registry: &Registry, context: &D);
}

/// Object-safe view of a system that can be recovered by concrete type.
trait ErasedSystem<D>: System<D> {
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<D, S: System<D> + 'static> ErasedSystem<D> for S {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

struct Slot<D> {
    system: Box<dyn ErasedSystem<D>>,
    order: Order,
    /// Insertion sequence, breaks ties between equal orders.
    seq: u64,
    name: &'static str,
}

/// An ordered set of systems, keyed by concrete type.
pub struct SystemGroup<D> {
    slots: FxHashMap<TypeId, Slot<D>>,
    next_seq: u64,
}

impl<D: 'static> Default for SystemGroup<D> {
    fn default() -> Self {
        Self::new()
    }
}

impl<D: 'static> SystemGroup<D> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            slots: FxHashMap::default(),
            next_seq: 0,
        }
    }

    /// Attach `system` at `order`, replacing any system of the same type.
    ///
    /// A replacement counts as a fresh insertion for tie-breaking.
    pub fn attach<S: System<D> + 'static>(&mut self, order: Order, system: S) -> &mut S {
        let slot = Slot {
            system: Box::new(system),
            order,
            seq: self.next_seq,
            name: type_name::<S>(),
        };
        self.next_seq += 1;

        tracing::debug!(system = slot.name, order, "attached system");

        let slot = match self.slots.entry(TypeId::of::<S>()) {
            MapEntry::Occupied(mut occupied) => {
                occupied.insert(slot);
                occupied.into_mut()
            }
            MapEntry::Vacant(vacant) => vacant.insert(slot),
        };

        slot.system
            .as_any_mut()
            .downcast_mut::<S>()
            .expect("slot is keyed by its system's type")
    }

    /// Attach `S::default()` at order 0.
    pub fn attach_default<S: System<D> + Default + 'static>(&mut self) -> &mut S {
        self.attach(0, S::default())
    }

    #[must_use]
    pub fn find<S: System<D> + 'static>(&self) -> Option<&S> {
        self.slots
            .get(&TypeId::of::<S>())
            .and_then(|slot| slot.system.as_any().downcast_ref::<S>())
    }

    #[must_use]
    pub fn find_mut<S: System<D> + 'static>(&mut self) -> Option<&mut S> {
        self.slots
            .get_mut(&TypeId::of::<S>())
            .and_then(|slot| slot.system.as_any_mut().downcast_mut::<S>())
    }

    #[must_use]
    pub fn attached<S: System<D> + 'static>(&self) -> bool {
        self.slots.contains_key(&TypeId::of::<S>())
    }

    /// Remove the system of type `S`. Returns `false` if none was attached.
    pub fn detach<S: System<D> + 'static>(&mut self) -> bool {
        let removed = self.slots.remove(&TypeId::of::<S>()).is_some();
        if removed {
            tracing::debug!(system = type_name::<S>(), "detached system");
        }
        removed
    }

    /// Move the system of type `S` to `order`, keeping its tie-break rank.
    pub fn reorder<S: System<D> + 'static>(&mut self, order: Order) -> bool {
        match self.slots.get_mut(&TypeId::of::<S>()) {
            Some(slot) => {
                tracing::debug!(system = slot.name, from = slot.order, to = order, "reordered system");
                slot.order = order;
                true
            }
            None => false,
        }
    }

    /// Current order of the system of type `S`.
    #[must_use]
    pub fn order_of<S: System<D> + 'static>(&self) -> Option<Order> {
        self.slots.get(&TypeId::of::<S>()).map(|slot| slot.order)
    }

    /// Type names of the attached systems in the order they will run.
    #[must_use]
    pub fn schedule(&self) -> Vec<&'static str> {
        let mut slots: Vec<&Slot<D>> = self.slots.values().collect();
        slots.sort_by_key(|slot| (slot.order, slot.seq));
        slots.into_iter().map(|slot| slot.name).collect()
    }

    pub fn clear(&mut self) {
        self.slots.clear();
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

impl<D: 'static> System<D> for SystemGroup<D> {
    fn update(&mut self, registry: &Registry, context: &D) {
        let mut slots: Vec<&mut Slot<D>> = self.slots.values_mut().collect();
        slots.sort_by_key(|slot| (slot.order, slot.seq));

        for slot in slots {
            let _span = tracing::trace_span!("system", name = slot.name, order = slot.order).entered();
            slot.system.update(registry, context);
        }
    }
}

impl<D: 'static> fmt::Debug for SystemGroup<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SystemGroup")
            .field("schedule", &self.schedule())
            .finish()
    }
}
