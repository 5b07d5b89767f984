//! Archetype storage - tables of entities with identical component sets.
//!
//! An archetype is identified by its signature: the ascending, deduplicated
//! list of its component ids. Every structural change to an entity is
//! expressed as "swap its row to the back, then migrate the back row", so
//! the cost depends on the entity's component count and never on how many
//! rows the archetype holds.

use std::{
    cmp::Ordering,
    fmt,
    ops::{Index, IndexMut},
};

use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use crate::{
    component::{Component, ComponentId, ComponentInfo},
    entity::Entity,
    storage::Column,
};

/// Sorted, deduplicated set of component ids identifying an archetype.
pub type Signature = SmallVec<[ComponentId; 8]>;

/// Sort and dedupe `ids` into a signature.
#[must_use]
pub fn canonicalize(ids: &[ComponentId]) -> Signature {
    let mut signature: Signature = ids.iter().copied().collect();
    signature.sort_unstable();
    signature.dedup();
    signature
}

/// `set ⊇ subset`, by sorted merge. Both slices must be canonical.
fn includes(set: &[ComponentId], subset: &[ComponentId]) -> bool {
    let (mut i, mut j) = (0, 0);
    while j < subset.len() {
        let Some(have) = set.get(i) else {
            return false;
        };
        match have.cmp(&subset[j]) {
            Ordering::Less => i += 1,
            Ordering::Equal => {
                i += 1;
                j += 1;
            }
            Ordering::Greater => return false,
        }
    }
    true
}

/// `a ∩ b ≠ ∅`, by sorted merge. Both slices must be canonical.
fn intersects(a: &[ComponentId], b: &[ComponentId]) -> bool {
    let (mut i, mut j) = (0, 0);
    while i < a.len() && j < b.len() {
        match a[i].cmp(&b[j]) {
            Ordering::Less => i += 1,
            Ordering::Greater => j += 1,
            Ordering::Equal => return true,
        }
    }
    false
}

/// Index of an archetype within its store.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ArchetypeId(u32);

impl ArchetypeId {
    #[must_use]
    pub const fn from_raw(id: u32) -> Self {
        Self(id)
    }

    #[must_use]
    pub const fn as_raw(self) -> u32 {
        self.0
    }

    const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for ArchetypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ArchetypeId({})", self.0)
    }
}

/// A table storing every entity with one exact component set.
///
/// Columns are kept in signature order. The entity list and every column
/// have the same length whenever control is outside this crate.
pub struct Archetype {
    id: ArchetypeId,
    signature: Signature,
    columns: Vec<Column>,
    entities: Vec<Entity>,
}

impl Archetype {
    /// Create an empty archetype for a canonical signature.
    ///
    /// # Panics
    ///
    /// Panics if a component id in `signature` was never registered.
    #[must_use]
    pub fn new(id: ArchetypeId, signature: Signature) -> Self {
        debug_assert!(signature.windows(2).all(|w| w[0] < w[1]), "signature not canonical");

        let columns = signature
            .iter()
            .map(|&component| {
                let info = ComponentInfo::lookup(component).expect("Component must be registered");
                Column::new(info)
            })
            .collect();

        Self {
            id,
            signature,
            columns,
            entities: Vec::new(),
        }
    }

    #[must_use]
    pub const fn id(&self) -> ArchetypeId {
        self.id
    }

    /// Component ids of this archetype, ascending.
    #[must_use]
    pub fn signature(&self) -> &[ComponentId] {
        &self.signature
    }

    /// Number of rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Entity stored in each row.
    #[must_use]
    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }

    #[must_use]
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    #[must_use]
    pub fn contains(&self, component: ComponentId) -> bool {
        self.column_index(component).is_some()
    }

    /// Archetype holds every id in `ids` (canonical).
    #[must_use]
    pub fn has_all(&self, ids: &[ComponentId]) -> bool {
        includes(&self.signature, ids)
    }

    /// Archetype holds at least one id in `ids` (canonical).
    #[must_use]
    pub fn has_any(&self, ids: &[ComponentId]) -> bool {
        intersects(&self.signature, ids)
    }

    #[must_use]
    pub fn column_index(&self, component: ComponentId) -> Option<usize> {
        self.signature.binary_search(&component).ok()
    }

    #[must_use]
    pub fn column_by_id(&self, component: ComponentId) -> Option<&Column> {
        self.column_index(component).map(|idx| &self.columns[idx])
    }

    #[must_use]
    pub fn column_by_id_mut(&mut self, component: ComponentId) -> Option<&mut Column> {
        self.column_index(component).map(|idx| &mut self.columns[idx])
    }

    /// Column holding `T`, if this archetype has one.
    #[must_use]
    pub fn column<T: Component>(&self) -> Option<&Column> {
        self.column_by_id(ComponentId::of::<T>())
    }

    /// Typed access to the `T` stored at `row`.
    #[must_use]
    pub fn get<T: Component>(&self, row: usize) -> Option<&T> {
        self.column::<T>()?.get(row)
    }

    /// Typed mutable access to the `T` stored at `row`.
    #[must_use]
    pub fn get_mut<T: Component>(&mut self, row: usize) -> Option<&mut T> {
        self.column_by_id_mut(ComponentId::of::<T>())?.get_mut(row)
    }

    /// Append an entity to the row list and return its row.
    ///
    /// Does NOT initialize component data - the caller must push one value
    /// into every column before handing control back to user code.
    pub fn push_row(&mut self, entity: Entity) -> usize {
        let row = self.entities.len();
        self.entities.push(entity);
        row
    }

    /// Append a value to `T`'s column and return its index.
    ///
    /// # Panics
    ///
    /// Panics if `T` is not part of this archetype.
    pub fn push_component<T: Component>(&mut self, value: T) -> usize {
        let column = self
            .column_by_id_mut(ComponentId::of::<T>())
            .expect("Component not in archetype");
        column.push(value);
        column.len() - 1
    }

    /// Whether `row` is the last row.
    #[must_use]
    pub fn is_last(&self, row: usize) -> bool {
        row + 1 == self.entities.len()
    }

    /// Swap `row` with the last row, in the entity list and in every column.
    ///
    /// Returns the entity that now occupies `row`; its record must be
    /// re-pointed at `row` by the caller. If `row` already is the last row
    /// nothing moves and the entity at `row` is returned.
    ///
    /// # Panics
    ///
    /// Panics if `row` is out of bounds.
    pub fn swap_back(&mut self, row: usize) -> Entity {
        let len = self.entities.len();
        assert!(row < len, "swap_back({row}) out of bounds for archetype of {len} rows");

        let last = len - 1;
        if row != last {
            self.entities.swap(row, last);
            for column in &mut self.columns {
                column.swap(row, last);
            }
        }
        self.entities[row]
    }

    /// Move the last row into `destination`.
    ///
    /// Every column shared with `destination` hands its last value over;
    /// every other column drops its last value. With no destination all
    /// values are dropped. Columns that exist only in `destination` are
    /// left for the caller to fill.
    ///
    /// Returns the migrated entity, or `None` if the archetype is empty.
    pub fn migrate_last_row(&mut self, mut destination: Option<&mut Self>) -> Option<Entity> {
        let entity = self.entities.pop()?;

        for column in &mut self.columns {
            let target = destination
                .as_deref_mut()
                .and_then(|dst| dst.column_by_id_mut(column.info().id()));
            match target {
                Some(target) => column.move_last_into(target),
                None => column.pop_drop(),
            }
        }

        if let Some(dst) = destination {
            dst.entities.push(entity);
        }

        Some(entity)
    }

    /// Every column has exactly one value per row.
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        self.columns.iter().all(|column| column.len() == self.entities.len())
    }
}

impl fmt::Debug for Archetype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Archetype")
            .field("id", &self.id)
            .field("signature", &self.signature)
            .field("entity_count", &self.entities.len())
            .finish()
    }
}

/// All archetypes of a registry, keyed by signature.
///
/// Archetypes are only ever added; an archetype that empties out stays
/// around so repeated attach/detach churn never rebuilds it.
#[derive(Default)]
pub struct ArchetypeStore {
    archetypes: Vec<Archetype>,
    by_signature: FxHashMap<Signature, ArchetypeId>,
}

impl ArchetypeStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Get or create the archetype for a set of component ids.
    pub fn get_or_create(&mut self, ids: &[ComponentId]) -> ArchetypeId {
        let signature = canonicalize(ids);
        self.get_or_create_canonical(signature)
    }

    fn get_or_create_canonical(&mut self, signature: Signature) -> ArchetypeId {
        if let Some(&id) = self.by_signature.get(&signature) {
            return id;
        }

        let raw = u32::try_from(self.archetypes.len()).unwrap_or_else(|_| panic!("archetype store exhausted"));
        let id = ArchetypeId(raw);
        tracing::trace!(archetype = raw, components = ?signature, "created archetype");

        self.archetypes.push(Archetype::new(id, signature.clone()));
        self.by_signature.insert(signature, id);

        id
    }

    /// Archetype for `base`'s components plus `component`.
    pub fn with_component(&mut self, base: ArchetypeId, component: ComponentId) -> ArchetypeId {
        let base_arch = &self.archetypes[base.index()];
        let Err(pos) = base_arch.signature.binary_search(&component) else {
            return base;
        };

        let mut signature = base_arch.signature.clone();
        signature.insert(pos, component);
        self.get_or_create_canonical(signature)
    }

    /// Archetype for `base`'s components minus `component`.
    pub fn without_component(&mut self, base: ArchetypeId, component: ComponentId) -> ArchetypeId {
        let base_arch = &self.archetypes[base.index()];
        let Ok(pos) = base_arch.signature.binary_search(&component) else {
            return base;
        };

        let mut signature = base_arch.signature.clone();
        signature.remove(pos);
        self.get_or_create_canonical(signature)
    }

    /// Find the archetype for a set of component ids without creating it.
    #[must_use]
    pub fn find(&self, ids: &[ComponentId]) -> Option<ArchetypeId> {
        self.by_signature.get(&canonicalize(ids)).copied()
    }

    #[must_use]
    pub fn get(&self, id: ArchetypeId) -> Option<&Archetype> {
        self.archetypes.get(id.index())
    }

    #[must_use]
    pub fn get_mut(&mut self, id: ArchetypeId) -> Option<&mut Archetype> {
        self.archetypes.get_mut(id.index())
    }

    /// Borrow two distinct archetypes mutably at once.
    ///
    /// # Panics
    ///
    /// Panics if `a == b` or either id is out of range.
    pub fn pair_mut(&mut self, a: ArchetypeId, b: ArchetypeId) -> (&mut Archetype, &mut Archetype) {
        let (ai, bi) = (a.index(), b.index());
        assert_ne!(ai, bi, "pair_mut needs two distinct archetypes");

        if ai < bi {
            let (lo, hi) = self.archetypes.split_at_mut(bi);
            (&mut lo[ai], &mut hi[0])
        } else {
            let (lo, hi) = self.archetypes.split_at_mut(ai);
            (&mut hi[0], &mut lo[bi])
        }
    }

    /// Number of archetypes ever created since the last clear.
    #[must_use]
    pub fn len(&self) -> usize {
        self.archetypes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.archetypes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Archetype> {
        self.archetypes.iter()
    }

    /// Archetypes holding all of `include` and none of `exclude` (both canonical).
    pub fn matching<'a>(
        &'a self,
        include: &'a [ComponentId],
        exclude: &'a [ComponentId],
    ) -> impl Iterator<Item = &'a Archetype> + 'a {
        self.archetypes
            .iter()
            .filter(move |arch| arch.has_all(include) && !arch.has_any(exclude))
    }

    /// Drop every archetype and all stored components.
    pub fn clear(&mut self) {
        self.archetypes.clear();
        self.by_signature.clear();
    }
}

impl Index<ArchetypeId> for ArchetypeStore {
    type Output = Archetype;

    fn index(&self, id: ArchetypeId) -> &Archetype {
        &self.archetypes[id.index()]
    }
}

impl IndexMut<ArchetypeId> for ArchetypeStore {
    fn index_mut(&mut self, id: ArchetypeId) -> &mut Archetype {
        &mut self.archetypes[id.index()]
    }
}

impl fmt::Debug for ArchetypeStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArchetypeStore")
            .field("archetype_count", &self.archetypes.len())
            .finish()
    }
}
