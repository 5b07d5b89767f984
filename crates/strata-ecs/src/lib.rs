// Column storage is type-erased
#![allow(unsafe_code)]
#![allow(missing_docs)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::missing_safety_doc)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_fields_in_debug)]
#![allow(clippy::ptr_as_ptr)]
#![allow(clippy::cast_ptr_alignment)]
#![allow(clippy::float_cmp)]

//! Strata ECS - an archetype-based entity-component database.
//!
//! # Key Concepts
//!
//! - **Entity**: an opaque handle issued by one [`Registry`]
//! - **Component**: any `Send + Sync + 'static` value attached to an entity
//! - **Archetype**: a table holding every entity with one exact set of
//!   component types, one column per type
//! - **View**: every entity carrying a set of types, optionally excluding
//!   another set
//!
//! # Example
//!
//! ```
//! use strata_ecs::prelude::*;
//!
//! struct Position(f32);
//! struct Velocity(f32);
//!
//! let mut registry = Registry::new();
//! let e = registry.spawn((Position(0.0), Velocity(2.0)));
//!
//! registry
//!     .view_mut::<(Position, Velocity)>()
//!     .for_each(|_, (pos, vel)| pos.0 += vel.0);
//!
//! assert_eq!(registry.get::<Position>(e).0, 2.0);
//! assert!(registry.detach::<(Velocity,)>(e));
//! ```

mod archetype;
mod bundle;
mod component;
mod config;
mod entity;
mod error;
mod registry;
mod storage;
mod view;

pub use archetype::{Archetype, ArchetypeId, ArchetypeStore, Signature, canonicalize};
pub use bundle::{Bundle, ComponentSet};
pub use component::{Component, ComponentId, ComponentInfo, component_id, registered_count};
pub use config::RegistryConfig;
pub use entity::{Entity, EntityId, RegistryId};
pub use error::{ContractResult, ContractViolation};
pub use registry::Registry;
pub use storage::Column;
pub use view::{EntityView, Fetch, View, ViewMut};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::{Component, ComponentSet, Entity, EntityView, Registry, RegistryConfig};
}
