//! Entity handles.
//!
//! A handle pairs a per-registry entity id with the id of the registry that
//! issued it. Ids are never recycled, so there is no generation counter.

use std::{
    fmt,
    sync::atomic::{AtomicU32, Ordering},
};

/// Raw entity id, unique within one registry.
pub type EntityId = u64;

/// Identity of a registry instance, unique for the process lifetime.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RegistryId(u32);

/// Global counter for registry ids. Zero is never handed out.
static NEXT_REGISTRY_ID: AtomicU32 = AtomicU32::new(1);

impl RegistryId {
    /// Allocate the next process-unique registry id.
    pub(crate) fn next() -> Self {
        Self(NEXT_REGISTRY_ID.fetch_add(1, Ordering::Relaxed))
    }

    #[must_use]
    pub const fn from_raw(id: u32) -> Self {
        Self(id)
    }

    #[must_use]
    pub const fn as_raw(self) -> u32 {
        self.0
    }
}

impl fmt::Debug for RegistryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RegistryId({})", self.0)
    }
}

impl fmt::Display for RegistryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Opaque handle to an entity in a specific registry.
///
/// Handles compare by both the entity id and the registry id; a handle is
/// only meaningful to the registry that created it.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Entity {
    id: EntityId,
    registry: RegistryId,
}

impl Entity {
    /// Reserved id that no live entity ever carries.
    pub const NULL_ID: EntityId = 0;

    /// Create a handle from its parts.
    #[must_use]
    pub const fn new(id: EntityId, registry: RegistryId) -> Self {
        Self { id, registry }
    }

    #[must_use]
    pub const fn id(self) -> EntityId {
        self.id
    }

    /// Id of the registry that issued this handle.
    #[must_use]
    pub const fn registry(self) -> RegistryId {
        self.registry
    }

    #[must_use]
    pub const fn is_null(self) -> bool {
        self.id == Self::NULL_ID
    }
}

impl fmt::Debug for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Entity({}@{})", self.id, self.registry.0)
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.id, self.registry.0)
    }
}

impl From<Entity> for EntityId {
    fn from(entity: Entity) -> Self {
        entity.id
    }
}
