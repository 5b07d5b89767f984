//! Component type identities and metadata.
//!
//! Every component type gets a process-wide `ComponentId` the first time
//! any registry touches it. The id indexes a global table of
//! [`ComponentInfo`] records, which is what lets the archetype store build a
//! column for a type it only knows by id.

use std::{alloc::Layout, any::TypeId, fmt, sync::LazyLock};

use parking_lot::RwLock;
use rustc_hash::FxHashMap;

/// Marker trait for types that can be used as components.
///
/// Any owned, thread-safe type qualifies; there is no common base type.
pub trait Component: Send + Sync + 'static {}

impl<T: Send + Sync + 'static> Component for T {}

/// Process-wide identity of a component type.
///
/// Ids are handed out in registration order starting at zero and are never
/// reused, so ordering by id is stable for the lifetime of the process.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ComponentId(u32);

impl ComponentId {
    /// Identity of `T`, registering it on first use.
    #[must_use]
    pub fn of<T: Component>() -> Self {
        TYPES.register::<T>()
    }

    /// Create a component ID from a raw value.
    #[must_use]
    pub const fn from_raw(id: u32) -> Self {
        Self(id)
    }

    /// Get the raw ID value.
    #[must_use]
    pub const fn as_raw(self) -> u32 {
        self.0
    }

    /// Metadata recorded when this id was registered.
    #[must_use]
    pub fn info(self) -> Option<ComponentInfo> {
        ComponentInfo::lookup(self)
    }
}

impl fmt::Debug for ComponentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ComponentId({})", self.0)
    }
}

/// Shorthand for [`ComponentId::of`].
#[must_use]
pub fn component_id<T: Component>() -> ComponentId {
    ComponentId::of::<T>()
}

/// Number of component types registered so far in this process.
#[must_use]
pub fn registered_count() -> usize {
    TYPES.inner.read().infos.len()
}

/// Runtime information about a component type.
///
/// Rust values move by bitwise copy, so layout plus a drop routine is all a
/// type-erased column needs to store, relocate and destroy values.
#[derive(Clone, Copy)]
pub struct ComponentInfo {
    id: ComponentId,
    name: &'static str,
    layout: Layout,
    drop_fn: Option<unsafe fn(*mut u8)>,
    type_id: TypeId,
}

impl ComponentInfo {
    /// Create component info for a concrete type.
    #[must_use]
    pub fn of<T: Component>(id: ComponentId) -> Self {
        Self {
            id,
            name: std::any::type_name::<T>(),
            layout: Layout::new::<T>(),
            drop_fn: if std::mem::needs_drop::<T>() {
                Some(drop_erased::<T> as unsafe fn(*mut u8))
            } else {
                None
            },
            type_id: TypeId::of::<T>(),
        }
    }

    /// Look up the info registered under `id`.
    #[must_use]
    pub fn lookup(id: ComponentId) -> Option<Self> {
        TYPES.inner.read().infos.get(id.0 as usize).copied()
    }

    #[must_use]
    pub const fn id(&self) -> ComponentId {
        self.id
    }

    /// Type name, for diagnostics.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    #[must_use]
    pub const fn layout(&self) -> Layout {
        self.layout
    }

    #[must_use]
    pub const fn size(&self) -> usize {
        self.layout.size()
    }

    #[must_use]
    pub const fn align(&self) -> usize {
        self.layout.align()
    }

    #[must_use]
    pub const fn needs_drop(&self) -> bool {
        self.drop_fn.is_some()
    }

    /// Drop a component at the given pointer.
    ///
    /// # Safety
    ///
    /// - `ptr` must point to a valid, initialized instance of this component type.
    /// - The memory at `ptr` must not be read as a value after this call.
    pub unsafe fn drop_in_place(&self, ptr: *mut u8) {
        if let Some(drop_fn) = self.drop_fn {
            unsafe { drop_fn(ptr) };
        }
    }

    /// Check if this info describes `T`.
    #[must_use]
    pub fn is<T: 'static>(&self) -> bool {
        self.type_id == TypeId::of::<T>()
    }
}

impl fmt::Debug for ComponentInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentInfo")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("size", &self.layout.size())
            .field("align", &self.layout.align())
            .finish()
    }
}

unsafe fn drop_erased<T>(ptr: *mut u8) {
    // SAFETY: caller guarantees ptr holds an initialized T
    unsafe { std::ptr::drop_in_place(ptr.cast::<T>()) }
}

#[derive(Default)]
struct TypeTableInner {
    by_type: FxHashMap<TypeId, ComponentId>,
    infos: Vec<ComponentInfo>,
}

/// The process-wide type table.
///
/// Lookups take the read lock; only a type's first registration takes the
/// write lock.
struct TypeTable {
    inner: RwLock<TypeTableInner>,
}

static TYPES: LazyLock<TypeTable> = LazyLock::new(|| TypeTable {
    inner: RwLock::new(TypeTableInner::default()),
});

impl TypeTable {
    fn register<T: Component>(&self) -> ComponentId {
        let type_id = TypeId::of::<T>();

        if let Some(&id) = self.inner.read().by_type.get(&type_id) {
            return id;
        }

        let mut inner = self.inner.write();
        // Another thread may have won the race between the two locks.
        if let Some(&id) = inner.by_type.get(&type_id) {
            return id;
        }

        let raw = u32::try_from(inner.infos.len()).unwrap_or_else(|_| {
            panic!("component type table exhausted registering {}", std::any::type_name::<T>())
        });
        let id = ComponentId(raw);
        inner.infos.push(ComponentInfo::of::<T>(id));
        inner.by_type.insert(type_id, id);

        tracing::trace!(
            component = std::any::type_name::<T>(),
            id = raw,
            "registered component type"
        );

        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Position {
        _x: f32,
        _y: f32,
    }

    struct Velocity {
        _x: f32,
        _y: f32,
    }

    struct Name(#[allow(dead_code)] String);

    #[test]
    fn test_component_registration() {
        let pos_id = ComponentId::of::<Position>();
        let vel_id = ComponentId::of::<Velocity>();

        assert_ne!(pos_id, vel_id);
        assert_eq!(component_id::<Position>(), pos_id);
        assert_eq!(component_id::<Velocity>(), vel_id);
    }

    #[test]
    fn test_component_info() {
        let pos_id = ComponentId::of::<Position>();
        let info = pos_id.info().unwrap();

        assert_eq!(info.id(), pos_id);
        assert_eq!(info.size(), std::mem::size_of::<Position>());
        assert_eq!(info.align(), std::mem::align_of::<Position>());
        assert!(!info.needs_drop());
        assert!(info.is::<Position>());
        assert!(!info.is::<Velocity>());
    }

    #[test]
    fn test_component_with_drop() {
        let info = ComponentId::of::<Name>().info().unwrap();
        assert!(info.needs_drop());
    }

    #[test]
    fn test_idempotent_registration() {
        struct OnlyHere;

        let id1 = ComponentId::of::<OnlyHere>();
        let id2 = ComponentId::of::<OnlyHere>();

        assert_eq!(id1, id2);
        assert!(registered_count() > id1.as_raw() as usize);
    }

    #[test]
    fn test_ids_are_shared_across_threads() {
        struct Shared;

        let here = ComponentId::of::<Shared>();
        let there = std::thread::spawn(ComponentId::of::<Shared>).join().unwrap();
        assert_eq!(here, there);
    }

    #[test]
    fn test_unknown_id_has_no_info() {
        assert!(ComponentInfo::lookup(ComponentId::from_raw(u32::MAX)).is_none());
    }
}
