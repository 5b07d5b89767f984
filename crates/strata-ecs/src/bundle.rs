//! Static sets of component types.
//!
//! Tuples of component types name a set of types (for `detach`, view
//! exclusion and the `*_attached` checks); tuples of component values are
//! bundles that can be written into an archetype row in one pass.

use smallvec::{SmallVec, smallvec};

use crate::{
    archetype::{Archetype, Signature, canonicalize},
    component::{Component, ComponentId, ComponentInfo},
    entity::Entity,
    error::ContractViolation,
    registry::Registry,
};

/// A compile-time list of component types.
pub trait ComponentSet: 'static {
    /// Component ids in declaration order, repeats included.
    fn component_ids() -> SmallVec<[ComponentId; 8]>;

    /// Canonical (sorted, deduplicated) signature of the set.
    #[must_use]
    fn signature() -> Signature {
        canonicalize(&Self::component_ids())
    }

    /// First component type named more than once, if any.
    #[must_use]
    fn duplicate() -> Option<ComponentId> {
        first_duplicate(&Self::component_ids())
    }
}

/// A tuple of component values.
pub trait Bundle: ComponentSet + Send + Sized {
    /// Push every value onto its column in `archetype`.
    ///
    /// The archetype's signature must be exactly this bundle's signature.
    fn write_into(self, archetype: &mut Archetype);

    /// Attach the values to `entity` one after another.
    fn attach_each(self, registry: &mut Registry, entity: Entity);
}

pub(crate) fn first_duplicate(ids: &[ComponentId]) -> Option<ComponentId> {
    ids.iter()
        .enumerate()
        .find_map(|(i, id)| ids[..i].contains(id).then_some(*id))
}

/// Panic if `S` names a component type twice.
#[track_caller]
pub(crate) fn reject_duplicates<S: ComponentSet>() {
    if let Some(id) = S::duplicate() {
        let name = ComponentInfo::lookup(id).map_or("<unknown>", |info| info.name());
        ContractViolation::DuplicateComponent(name).raise();
    }
}

macro_rules! impl_component_set {
    ($($name:ident),*) => {
        impl<$($name: Component),*> ComponentSet for ($($name,)*) {
            fn component_ids() -> SmallVec<[ComponentId; 8]> {
                smallvec![$(ComponentId::of::<$name>()),*]
            }
        }

        impl<$($name: Component),*> Bundle for ($($name,)*) {
            #[allow(non_snake_case, unused_variables)]
            fn write_into(self, archetype: &mut Archetype) {
                let ($($name,)*) = self;
                $(archetype.push_component($name);)*
            }

            #[allow(non_snake_case, unused_variables)]
            fn attach_each(self, registry: &mut Registry, entity: Entity) {
                let ($($name,)*) = self;
                $(registry.attach(entity, $name);)*
            }
        }
    };
}

impl_component_set!();
impl_component_set!(A);
impl_component_set!(A, B);
impl_component_set!(A, B, C);
impl_component_set!(A, B, C, D);
impl_component_set!(A, B, C, D, E);
impl_component_set!(A, B, C, D, E, F);
impl_component_set!(A, B, C, D, E, F, G);
impl_component_set!(A, B, C, D, E, F, G, H);

#[cfg(test)]
mod tests {
    use super::*;

    struct Health(#[allow(dead_code)] u32);
    struct Armor(#[allow(dead_code)] u32);

    #[test]
    fn test_signature_is_canonical() {
        let a = <(Health, Armor)>::signature();
        let b = <(Armor, Health)>::signature();
        assert_eq!(a, b);
        assert!(a.windows(2).all(|w| w[0] < w[1]));
        assert!(<()>::signature().is_empty());
    }

    #[test]
    fn test_duplicate_detection() {
        assert_eq!(<(Health, Armor)>::duplicate(), None);
        assert_eq!(
            <(Health, Armor, Health)>::duplicate(),
            Some(ComponentId::of::<Health>())
        );
        assert_eq!(<(Health, Health)>::signature().len(), 1);
    }

    #[test]
    #[should_panic(expected = "requested more than once")]
    fn test_reject_duplicates() {
        reject_duplicates::<(Armor, Armor)>();
    }
}
