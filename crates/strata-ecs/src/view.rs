//! Views - bulk access to every entity carrying a set of component types.
//!
//! ```ignore
//! for row in registry.view::<(Position, Velocity)>().exclude::<(Frozen,)>().collect() {
//!     let (pos, vel) = row.components();
//! }
//! ```
//!
//! A view tests each archetype once (`has_all(include) && !has_any(exclude)`,
//! both sorted merges) and then walks the matching archetypes row by row.

use std::marker::PhantomData;

use crate::{
    archetype::{Archetype, Signature, canonicalize},
    bundle::{ComponentSet, reject_duplicates},
    component::{Component, ComponentId},
    entity::Entity,
    registry::Registry,
};

/// A tuple of component types that can be fetched from one archetype row.
pub trait Fetch: ComponentSet {
    /// Shared references to one row's components.
    type Item<'a>;
    /// Exclusive references to one row's components.
    type ItemMut<'a>;

    /// # Safety
    ///
    /// `archetype` must hold every type of `Self` and `row` must be in bounds.
    unsafe fn fetch(archetype: &Archetype, row: usize) -> Self::Item<'_>;

    /// # Safety
    ///
    /// As for [`fetch`](Self::fetch). In addition the caller must have
    /// exclusive access to the archetype for `'a`, `Self` must not repeat a
    /// type, and no row may be fetched twice within `'a`.
    unsafe fn fetch_mut<'a>(archetype: &Archetype, row: usize) -> Self::ItemMut<'a>;
}

/// Pointer to the `T` stored at `row`.
///
/// # Safety
///
/// `archetype` must hold a `T` column and `row` must be in bounds.
unsafe fn slot<T: Component>(archetype: &Archetype, row: usize) -> *mut T {
    let column = archetype.column::<T>();
    debug_assert!(column.is_some(), "archetype lacks {}", std::any::type_name::<T>());
    // SAFETY: guaranteed by the caller
    unsafe { column.unwrap_unchecked().get_unchecked_raw(row).cast::<T>() }
}

macro_rules! impl_fetch {
    ($($name:ident),*) => {
        impl<$($name: Component),*> Fetch for ($($name,)*) {
            type Item<'a> = ($(&'a $name,)*);
            type ItemMut<'a> = ($(&'a mut $name,)*);

            #[allow(unused_variables, clippy::unused_unit)]
            unsafe fn fetch(archetype: &Archetype, row: usize) -> Self::Item<'_> {
                ($(unsafe { &*slot::<$name>(archetype, row) },)*)
            }

            #[allow(unused_variables, clippy::unused_unit)]
            unsafe fn fetch_mut<'a>(archetype: &Archetype, row: usize) -> Self::ItemMut<'a> {
                ($(unsafe { &mut *slot::<$name>(archetype, row) },)*)
            }
        }
    };
}

impl_fetch!();
impl_fetch!(A);
impl_fetch!(A, B);
impl_fetch!(A, B, C);
impl_fetch!(A, B, C, D);
impl_fetch!(A, B, C, D, E);
impl_fetch!(A, B, C, D, E, F);
impl_fetch!(A, B, C, D, E, F, G);
impl_fetch!(A, B, C, D, E, F, G, H);

/// One matched row: the entity plus references to its components.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntityView<I> {
    entity: Entity,
    components: I,
}

impl<I> EntityView<I> {
    #[must_use]
    pub const fn entity(&self) -> Entity {
        self.entity
    }

    #[must_use]
    pub const fn components(&self) -> &I {
        &self.components
    }

    pub fn components_mut(&mut self) -> &mut I {
        &mut self.components
    }

    #[must_use]
    pub fn into_components(self) -> I {
        self.components
    }

    #[must_use]
    pub fn into_parts(self) -> (Entity, I) {
        (self.entity, self.components)
    }
}

impl<I> From<EntityView<I>> for Entity {
    fn from(view: EntityView<I>) -> Self {
        view.entity
    }
}

fn matches(archetype: &Archetype, include: &[ComponentId], exclude: &[ComponentId]) -> bool {
    archetype.has_all(include) && !archetype.has_any(exclude)
}

fn extend_exclusion<U: ComponentSet>(exclude: &Signature) -> Signature {
    let mut ids: Signature = exclude.clone();
    ids.extend(U::component_ids());
    canonicalize(&ids)
}

/// Shared view builder returned by [`Registry::view`].
#[must_use]
pub struct View<'r, Q: Fetch> {
    registry: &'r Registry,
    include: Signature,
    exclude: Signature,
    _marker: PhantomData<fn() -> Q>,
}

impl<'r, Q: Fetch> View<'r, Q> {
    pub(crate) fn new(registry: &'r Registry) -> Self {
        Self {
            registry,
            include: Q::signature(),
            exclude: Signature::new(),
            _marker: PhantomData,
        }
    }

    /// Skip entities carrying any type in `U`.
    pub fn exclude<U: ComponentSet>(mut self) -> Self {
        self.exclude = extend_exclusion::<U>(&self.exclude);
        self
    }

    fn archetypes(&self) -> impl Iterator<Item = &'r Archetype> + '_ {
        self.registry
            .archetypes()
            .iter()
            .filter(|archetype| matches(archetype, &self.include, &self.exclude))
    }

    /// Number of matching entities.
    #[must_use]
    pub fn count(&self) -> usize {
        self.archetypes().map(Archetype::len).sum()
    }

    /// Handles of every matching entity.
    #[must_use]
    pub fn entities(&self) -> Vec<Entity> {
        self.archetypes()
            .flat_map(|archetype| archetype.entities().iter().copied())
            .collect()
    }

    /// Call `f` on every matching row without building a list.
    pub fn for_each(self, mut f: impl FnMut(Entity, Q::Item<'r>)) {
        for archetype in self.archetypes() {
            for (row, &entity) in archetype.entities().iter().enumerate() {
                // SAFETY: the archetype matched Q's signature and row < len
                f(entity, unsafe { Q::fetch(archetype, row) });
            }
        }
    }

    /// Materialize every matching row.
    #[must_use]
    pub fn collect(self) -> Vec<EntityView<Q::Item<'r>>> {
        let mut rows = Vec::with_capacity(self.count());
        for archetype in self.archetypes() {
            for (row, &entity) in archetype.entities().iter().enumerate() {
                // SAFETY: the archetype matched Q's signature and row < len
                let components = unsafe { Q::fetch(archetype, row) };
                rows.push(EntityView { entity, components });
            }
        }
        rows
    }
}

/// Exclusive view builder returned by [`Registry::view_mut`].
#[must_use]
pub struct ViewMut<'r, Q: Fetch> {
    registry: &'r mut Registry,
    include: Signature,
    exclude: Signature,
    _marker: PhantomData<fn() -> Q>,
}

impl<'r, Q: Fetch> ViewMut<'r, Q> {
    #[track_caller]
    pub(crate) fn new(registry: &'r mut Registry) -> Self {
        reject_duplicates::<Q>();
        Self {
            registry,
            include: Q::signature(),
            exclude: Signature::new(),
            _marker: PhantomData,
        }
    }

    /// Skip entities carrying any type in `U`.
    pub fn exclude<U: ComponentSet>(mut self) -> Self {
        self.exclude = extend_exclusion::<U>(&self.exclude);
        self
    }

    #[must_use]
    pub fn count(&self) -> usize {
        self.registry
            .archetypes()
            .iter()
            .filter(|archetype| matches(archetype, &self.include, &self.exclude))
            .map(Archetype::len)
            .sum()
    }

    #[must_use]
    pub fn entities(&self) -> Vec<Entity> {
        self.registry
            .archetypes()
            .iter()
            .filter(|archetype| matches(archetype, &self.include, &self.exclude))
            .flat_map(|archetype| archetype.entities().iter().copied())
            .collect()
    }

    /// Call `f` on every matching row without building a list.
    pub fn for_each(self, mut f: impl FnMut(Entity, Q::ItemMut<'r>)) {
        let Self {
            registry,
            include,
            exclude,
            ..
        } = self;
        let registry: &'r Registry = registry;

        for archetype in registry.archetypes().iter() {
            if !matches(archetype, &include, &exclude) {
                continue;
            }
            for (row, &entity) in archetype.entities().iter().enumerate() {
                // SAFETY: the registry is exclusively borrowed, Q has no
                // repeated type and each row is visited once
                f(entity, unsafe { Q::fetch_mut(archetype, row) });
            }
        }
    }

    /// Materialize every matching row.
    #[must_use]
    pub fn collect(self) -> Vec<EntityView<Q::ItemMut<'r>>> {
        let Self {
            registry,
            include,
            exclude,
            ..
        } = self;
        let registry: &'r Registry = registry;

        let mut rows = Vec::new();
        for archetype in registry.archetypes().iter() {
            if !matches(archetype, &include, &exclude) {
                continue;
            }
            for (row, &entity) in archetype.entities().iter().enumerate() {
                // SAFETY: the registry stays exclusively borrowed for 'r, Q
                // has no repeated type and each row is fetched once
                let components = unsafe { Q::fetch_mut(archetype, row) };
                rows.push(EntityView { entity, components });
            }
        }
        rows
    }
}
