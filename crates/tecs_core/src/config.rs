//! # World Configuration
//!
//! Sizing knobs for a [`Coordinator`](crate::Coordinator), loaded once at
//! startup. Every field has a default, so an empty TOML document is valid.
//!
//! ```toml
//! max_entities = 4096
//! recycle_capacity = 200
//! destroy_queue_capacity = 64
//! ```

use serde::Deserialize;

use crate::error::{EcsError, EcsResult};

/// Default capacity of the entity recycle queue.
pub const DEFAULT_RECYCLE_CAPACITY: usize = 200;

/// Default capacity of the deferred destruction queue.
pub const DEFAULT_DESTROY_QUEUE_CAPACITY: usize = 64;

/// Default number of entity slots reserved up front.
pub const DEFAULT_INITIAL_ENTITY_CAPACITY: usize = 256;

/// Configuration for a single ECS world.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WorldConfig {
    /// Upper bound on distinct entity ids. `None` means the full `u32` range.
    pub max_entities: Option<u32>,
    /// How many destroyed entity ids may wait for reuse at once.
    pub recycle_capacity: usize,
    /// How many entities may be queued for deferred destruction at once.
    pub destroy_queue_capacity: usize,
    /// Entity slots reserved when the world is created.
    pub initial_entity_capacity: usize,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            max_entities: None,
            recycle_capacity: DEFAULT_RECYCLE_CAPACITY,
            destroy_queue_capacity: DEFAULT_DESTROY_QUEUE_CAPACITY,
            initial_entity_capacity: DEFAULT_INITIAL_ENTITY_CAPACITY,
        }
    }
}

impl WorldConfig {
    /// Parses and validates a configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::ConfigParse`] for malformed TOML or unknown keys and
    /// [`EcsError::InvalidConfig`] for out-of-range values.
    pub fn from_toml_str(text: &str) -> EcsResult<Self> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks that every value is usable.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::InvalidConfig`] naming the first offending field.
    pub fn validate(&self) -> EcsResult<()> {
        if self.max_entities == Some(0) {
            return Err(EcsError::InvalidConfig("max_entities must be > 0".into()));
        }
        if self.recycle_capacity == 0 {
            return Err(EcsError::InvalidConfig("recycle_capacity must be > 0".into()));
        }
        if self.destroy_queue_capacity == 0 {
            return Err(EcsError::InvalidConfig(
                "destroy_queue_capacity must be > 0".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_document_uses_defaults() {
        let config = WorldConfig::from_toml_str("").unwrap();
        assert_eq!(config, WorldConfig::default());
    }

    #[test]
    fn test_partial_document() {
        let config = WorldConfig::from_toml_str("max_entities = 16\nrecycle_capacity = 8").unwrap();
        assert_eq!(config.max_entities, Some(16));
        assert_eq!(config.recycle_capacity, 8);
        assert_eq!(config.destroy_queue_capacity, DEFAULT_DESTROY_QUEUE_CAPACITY);
    }

    #[test]
    fn test_invalid_values_rejected() {
        let err = WorldConfig::from_toml_str("destroy_queue_capacity = 0").unwrap_err();
        assert!(matches!(err, EcsError::InvalidConfig(_)));

        let err = WorldConfig::from_toml_str("max_entities = 0").unwrap_err();
        assert!(matches!(err, EcsError::InvalidConfig(_)));
    }

    #[test]
    fn test_unknown_key_rejected() {
        let err = WorldConfig::from_toml_str("capacity = 10").unwrap_err();
        assert!(matches!(err, EcsError::ConfigParse(_)));
    }
}
