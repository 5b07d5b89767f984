//! Registry - the entity database.
//!
//! The registry owns every archetype and one record per live entity. A
//! record remembers the entity's display name and, when it carries any
//! components, the archetype and row holding them.

use std::{any::type_name, fmt};

use hashbrown::HashMap;
use rustc_hash::FxBuildHasher;

use crate::{
    archetype::{ArchetypeId, ArchetypeStore},
    bundle::{Bundle, ComponentSet, reject_duplicates},
    component::{Component, ComponentId},
    config::RegistryConfig,
    entity::{Entity, EntityId, RegistryId},
    error::{ContractResult, ContractViolation},
    view::{Fetch, View, ViewMut},
};

/// Where an entity's components live.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Location {
    archetype: ArchetypeId,
    row: usize,
}

/// Per-entity bookkeeping.
#[derive(Debug)]
struct Record {
    name: String,
    /// `None` while the entity carries no components.
    location: Option<Location>,
}

/// An in-process entity-component database.
///
/// Every reference handed out (by [`attach`](Self::attach),
/// [`get`](Self::get), [`find`](Self::find) or a view) borrows the
/// registry, so no structural change can happen while one is alive.
pub struct Registry {
    id: RegistryId,
    /// Last id handed out. Ids are never recycled.
    next_id: EntityId,
    records: HashMap<Entity, Record, FxBuildHasher>,
    archetypes: ArchetypeStore,
    config: RegistryConfig,
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl Registry {
    /// Create an empty registry with the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(RegistryConfig::default())
    }

    #[must_use]
    pub fn with_config(config: RegistryConfig) -> Self {
        let id = RegistryId::next();
        tracing::debug!(registry = id.as_raw(), capacity = config.entity_capacity, "created registry");

        Self {
            id,
            next_id: Entity::NULL_ID,
            records: HashMap::with_capacity_and_hasher(config.entity_capacity, FxBuildHasher),
            archetypes: ArchetypeStore::new(),
            config,
        }
    }

    /// Identity of this registry; every handle it issues carries it.
    #[must_use]
    pub const fn id(&self) -> RegistryId {
        self.id
    }

    #[must_use]
    pub const fn config(&self) -> &RegistryConfig {
        &self.config
    }

    /// Read access to the archetype storage.
    #[must_use]
    pub const fn archetypes(&self) -> &ArchetypeStore {
        &self.archetypes
    }

    // ---------------------------------------------------------------------
    // Entity lifecycle
    // ---------------------------------------------------------------------

    /// Create an entity carrying default values of every type in `B`.
    ///
    /// `create_entity::<()>()` creates a componentless entity.
    #[track_caller]
    pub fn create_entity<B: Bundle + Default>(&mut self) -> Entity {
        self.spawn(B::default())
    }

    /// Create an entity carrying the values in `bundle`.
    ///
    /// # Panics
    ///
    /// Panics if the bundle names a component type twice.
    #[track_caller]
    pub fn spawn<B: Bundle>(&mut self, bundle: B) -> Entity {
        reject_duplicates::<B>();
        let entity = self.allocate();
        let name = self.config.default_name(entity.id());
        self.insert_record(entity, name, bundle);
        entity
    }

    /// Like [`spawn`](Self::spawn), with an explicit display name.
    #[track_caller]
    pub fn spawn_named<B: Bundle>(&mut self, name: impl Into<String>, bundle: B) -> Entity {
        reject_duplicates::<B>();
        let entity = self.allocate();
        self.insert_record(entity, name.into(), bundle);
        entity
    }

    #[track_caller]
    fn allocate(&mut self) -> Entity {
        let Some(id) = self.next_id.checked_add(1) else {
            ContractViolation::IdsExhausted(self.id).raise()
        };
        self.next_id = id;
        Entity::new(id, self.id)
    }

    fn insert_record<B: Bundle>(&mut self, entity: Entity, name: String, bundle: B) {
        let signature = B::signature();
        let location = if signature.is_empty() {
            None
        } else {
            let archetype = self.archetypes.get_or_create(&signature);
            let table = &mut self.archetypes[archetype];
            let row = table.push_row(entity);
            bundle.write_into(table);
            debug_assert!(table.is_consistent());
            Some(Location { archetype, row })
        };

        self.records.insert(entity, Record { name, location });
    }

    /// Destroy an entity and drop all of its components.
    ///
    /// Returns `false` if the registry does not know the handle. The id is
    /// never handed out again.
    pub fn destroy(&mut self, entity: Entity) -> bool {
        let Some(record) = self.records.remove(&entity) else {
            return false;
        };

        if let Some(location) = record.location {
            self.relocate(location, None);
        }

        true
    }

    /// Drop every entity and archetype. Ids keep counting up.
    pub fn clear(&mut self) {
        tracing::debug!(
            registry = self.id.as_raw(),
            entities = self.records.len(),
            archetypes = self.archetypes.len(),
            "clearing registry"
        );
        self.records.clear();
        self.archetypes.clear();
    }

    /// Whether the registry knows this handle.
    #[must_use]
    pub fn contains(&self, entity: Entity) -> bool {
        self.records.contains_key(&entity)
    }

    /// Number of live entities, componentless ones included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Every live entity, in no particular order.
    pub fn entities(&self) -> impl Iterator<Item = Entity> + '_ {
        self.records.keys().copied()
    }

    #[must_use]
    pub fn name(&self, entity: Entity) -> Option<&str> {
        self.records.get(&entity).map(|record| record.name.as_str())
    }

    /// Change an entity's display name. Returns `false` for unknown handles.
    pub fn rename(&mut self, entity: Entity, name: impl Into<String>) -> bool {
        match self.records.get_mut(&entity) {
            Some(record) => {
                record.name = name.into();
                true
            }
            None => false,
        }
    }

    /// Archetype currently holding the entity's components.
    #[must_use]
    pub fn archetype_of(&self, entity: Entity) -> Option<ArchetypeId> {
        self.location(entity).map(|location| location.archetype)
    }

    // ---------------------------------------------------------------------
    // Structural changes
    // ---------------------------------------------------------------------

    /// Attach `value` to `entity`, replacing any existing `T`.
    ///
    /// An unknown handle from this registry (for example one that was
    /// destroyed) gets a fresh record first.
    ///
    /// # Panics
    ///
    /// Panics if the handle is null or belongs to another registry.
    #[track_caller]
    pub fn attach<T: Component>(&mut self, entity: Entity, value: T) -> &mut T {
        match self.try_attach(entity, value) {
            Ok(slot) => slot,
            Err(violation) => violation.raise(),
        }
    }

    /// Attach a default-constructed `T`.
    #[track_caller]
    pub fn attach_default<T: Component + Default>(&mut self, entity: Entity) -> &mut T {
        self.attach(entity, T::default())
    }

    /// Attach default-constructed values of every type in `B`.
    #[track_caller]
    pub fn attach_bundle<B: Bundle + Default>(&mut self, entity: Entity) {
        reject_duplicates::<B>();
        B::default().attach_each(self, entity);
    }

    /// Fallible form of [`attach`](Self::attach).
    pub fn try_attach<T: Component>(&mut self, entity: Entity, value: T) -> ContractResult<&mut T> {
        self.check_handle(entity)?;

        if !self.records.contains_key(&entity) {
            self.next_id = self.next_id.max(entity.id());
            let name = self.config.default_name(entity.id());
            self.records.insert(entity, Record { name, location: None });
        }

        let component = ComponentId::of::<T>();
        let current = self.location(entity);

        let location = match current {
            Some(location) if self.archetypes[location.archetype].contains(component) => {
                if let Some(slot) = self.archetypes[location.archetype].get_mut::<T>(location.row) {
                    *slot = value;
                }
                location
            }
            Some(location) => {
                let target = self.archetypes.with_component(location.archetype, component);
                let moved = self.relocate(location, Some(target));
                self.archetypes[target].push_component(value);
                moved
            }
            None => {
                let archetype = self.archetypes.get_or_create(&[component]);
                let table = &mut self.archetypes[archetype];
                let row = table.push_row(entity);
                table.push_component(value);
                Location { archetype, row }
            }
        };

        debug_assert!(self.archetypes[location.archetype].is_consistent());
        self.set_location(entity, Some(location));

        self.archetypes[location.archetype]
            .get_mut::<T>(location.row)
            .ok_or_else(|| missing::<T>(entity))
    }

    /// Detach every type in `S` from `entity`.
    ///
    /// Returns `true` only if every requested type was attached before the
    /// call. Types that are attached are detached either way.
    pub fn detach<S: ComponentSet>(&mut self, entity: Entity) -> bool {
        S::signature()
            .into_iter()
            .fold(true, |all, component| self.detach_id(entity, component) && all)
    }

    fn detach_id(&mut self, entity: Entity, component: ComponentId) -> bool {
        let Some(location) = self.location(entity) else {
            return false;
        };

        let source = &self.archetypes[location.archetype];
        if !source.contains(component) {
            return false;
        }

        let target = if source.signature().len() == 1 {
            None
        } else {
            Some(self.archetypes.without_component(location.archetype, component))
        };

        let moved = self.relocate(location, target);
        self.set_location(entity, target.map(|_| moved));
        true
    }

    /// Move the row at `from` into `to`, or drop it when `to` is `None`.
    ///
    /// Returns the row's new location in `to` (meaningless without a
    /// destination). Columns only `to` has are left for the caller to fill.
    fn relocate(&mut self, from: Location, to: Option<ArchetypeId>) -> Location {
        self.send_to_back(from);

        match to {
            Some(target) => {
                let (source, destination) = self.archetypes.pair_mut(from.archetype, target);
                let moved = source.migrate_last_row(Some(&mut *destination));
                tracing::trace!(entity = ?moved, from = ?from.archetype, to = ?target, "migrated entity");
                Location {
                    archetype: target,
                    row: destination.len() - 1,
                }
            }
            None => {
                let dropped = self.archetypes[from.archetype].migrate_last_row(None);
                tracing::trace!(entity = ?dropped, from = ?from.archetype, "dropped entity row");
                from
            }
        }
    }

    /// Swap the row at `location` to the back of its archetype and re-point
    /// the record of whichever entity took its place.
    fn send_to_back(&mut self, location: Location) {
        let table = &mut self.archetypes[location.archetype];
        if table.is_last(location.row) {
            return;
        }

        let displaced = table.swap_back(location.row);
        if let Some(moved) = self
            .records
            .get_mut(&displaced)
            .and_then(|record| record.location.as_mut())
        {
            moved.row = location.row;
        }
    }

    fn set_location(&mut self, entity: Entity, location: Option<Location>) {
        if let Some(record) = self.records.get_mut(&entity) {
            record.location = location;
        }
    }

    // ---------------------------------------------------------------------
    // Component access
    // ---------------------------------------------------------------------

    fn location(&self, entity: Entity) -> Option<Location> {
        self.records.get(&entity)?.location
    }

    fn check_handle(&self, entity: Entity) -> ContractResult<()> {
        if entity.registry() != self.id {
            return Err(ContractViolation::ForeignEntity {
                entity,
                registry: self.id,
            });
        }
        if entity.is_null() {
            return Err(ContractViolation::NullEntity);
        }
        Ok(())
    }

    /// The entity's `T`, if it has one.
    #[must_use]
    pub fn find<T: Component>(&self, entity: Entity) -> Option<&T> {
        let location = self.location(entity)?;
        self.archetypes[location.archetype].get::<T>(location.row)
    }

    #[must_use]
    pub fn find_mut<T: Component>(&mut self, entity: Entity) -> Option<&mut T> {
        let location = self.location(entity)?;
        self.archetypes[location.archetype].get_mut::<T>(location.row)
    }

    /// The entity's `T`.
    ///
    /// # Panics
    ///
    /// Panics if the handle is foreign, null or unknown, or the entity has
    /// no `T`.
    #[track_caller]
    #[must_use]
    pub fn get<T: Component>(&self, entity: Entity) -> &T {
        match self.try_get(entity) {
            Ok(value) => value,
            Err(violation) => violation.raise(),
        }
    }

    #[track_caller]
    #[must_use]
    pub fn get_mut<T: Component>(&mut self, entity: Entity) -> &mut T {
        match self.try_get_mut(entity) {
            Ok(value) => value,
            Err(violation) => violation.raise(),
        }
    }

    pub fn try_get<T: Component>(&self, entity: Entity) -> ContractResult<&T> {
        self.check_known(entity)?;
        self.find(entity).ok_or_else(|| missing::<T>(entity))
    }

    pub fn try_get_mut<T: Component>(&mut self, entity: Entity) -> ContractResult<&mut T> {
        self.check_known(entity)?;
        self.find_mut(entity).ok_or_else(|| missing::<T>(entity))
    }

    fn check_known(&self, entity: Entity) -> ContractResult<()> {
        self.check_handle(entity)?;
        if self.contains(entity) {
            Ok(())
        } else {
            Err(ContractViolation::UnknownEntity(entity))
        }
    }

    /// Whether the entity carries a `T`.
    #[must_use]
    pub fn attached<T: Component>(&self, entity: Entity) -> bool {
        self.location(entity)
            .is_some_and(|location| self.archetypes[location.archetype].contains(ComponentId::of::<T>()))
    }

    /// Whether the entity carries every type in `S`.
    #[must_use]
    pub fn all_attached<S: ComponentSet>(&self, entity: Entity) -> bool {
        if !self.contains(entity) {
            return false;
        }
        let wanted = S::signature();
        match self.location(entity) {
            Some(location) => self.archetypes[location.archetype].has_all(&wanted),
            None => wanted.is_empty(),
        }
    }

    /// Whether the entity carries at least one type in `S`.
    #[must_use]
    pub fn any_attached<S: ComponentSet>(&self, entity: Entity) -> bool {
        self.location(entity)
            .is_some_and(|location| self.archetypes[location.archetype].has_any(&S::signature()))
    }

    // ---------------------------------------------------------------------
    // Views
    // ---------------------------------------------------------------------

    /// Shared view over every entity carrying all types in `Q`.
    pub fn view<Q: Fetch>(&self) -> View<'_, Q> {
        View::new(self)
    }

    /// Exclusive view over every entity carrying all types in `Q`.
    ///
    /// # Panics
    ///
    /// Panics if `Q` names a component type twice.
    #[track_caller]
    pub fn view_mut<Q: Fetch>(&mut self) -> ViewMut<'_, Q> {
        ViewMut::new(self)
    }
}

fn missing<T>(entity: Entity) -> ContractViolation {
    ContractViolation::MissingComponent {
        entity,
        component: type_name::<T>(),
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("id", &self.id)
            .field("entity_count", &self.records.len())
            .field("archetype_count", &self.archetypes.len())
            .finish()
    }
}
