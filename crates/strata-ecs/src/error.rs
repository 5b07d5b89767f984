//! Contract violation types.

use thiserror::Error;

use crate::entity::{Entity, RegistryId};

/// Misuse of the registry API.
///
/// These are caller bugs rather than runtime conditions. Panicking entry
/// points raise them with [`ContractViolation::raise`]; the `try_*`
/// variants hand them back instead.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ContractViolation {
    /// Handle was issued by another registry.
    #[error("entity {entity} does not belong to registry {registry}")]
    ForeignEntity { entity: Entity, registry: RegistryId },

    /// The reserved null id was used as a live entity.
    #[error("null entity handle used as a live entity")]
    NullEntity,

    /// Entity is not known to the registry.
    #[error("entity {0} does not exist")]
    UnknownEntity(Entity),

    /// Non-optional access to a component the entity does not carry.
    #[error("entity {entity} has no `{component}` component")]
    MissingComponent { entity: Entity, component: &'static str },

    /// Every entity id above the null id has been handed out or adopted.
    #[error("registry {0} has no entity ids left")]
    IdsExhausted(RegistryId),

    /// A bundle or mutable view names the same component type twice.
    #[error("component `{0}` requested more than once")]
    DuplicateComponent(&'static str),
}

impl ContractViolation {
    /// Panic with this violation's message.
    #[track_caller]
    pub fn raise(self) -> ! {
        panic!("contract violation: {self}")
    }
}

/// Result type for the fallible registry entry points.
pub type ContractResult<T> = Result<T, ContractViolation>;
