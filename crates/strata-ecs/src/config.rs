//! Registry configuration.

/// Tunables for a [`Registry`](crate::Registry).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryConfig {
    /// Prefix of the default name given to unnamed entities; the entity id
    /// is appended.
    pub name_prefix: String,
    /// Number of entity records to reserve up front.
    pub entity_capacity: usize,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            name_prefix: "entity_".to_owned(),
            entity_capacity: 0,
        }
    }
}

impl RegistryConfig {
    #[must_use]
    pub fn with_name_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.name_prefix = prefix.into();
        self
    }

    #[must_use]
    pub const fn with_entity_capacity(mut self, capacity: usize) -> Self {
        self.entity_capacity = capacity;
        self
    }

    /// Name given to entity `id` when none is supplied.
    #[must_use]
    pub fn default_name(&self, id: u64) -> String {
        format!("{}{id}", self.name_prefix)
    }
}
