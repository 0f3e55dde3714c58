//! Item catalog boundary.
//!
//! The catalog resolving a definition id to its static properties lives
//! outside this crate. [`ItemCatalog`] is the seam; [`MemoryCatalog`] is a
//! map-backed implementation for tests and small games.

use crate::error::{ConfigError, GearError};
use crate::ids::DefinitionId;
use crate::item::ItemDefinition;
use std::collections::HashMap;

/// Resolves definition ids to item definitions.
pub trait ItemCatalog: Send + Sync {
    /// Look up a definition.
    ///
    /// # Returns
    ///
    /// * `Ok(&ItemDefinition)` - The definition
    /// * `Err(GearError::DefinitionNotFound)` - If the id is unknown
    fn resolve(&self, id: &DefinitionId) -> Result<&ItemDefinition, GearError>;
}

/// A catalog held entirely in memory.
///
/// # Examples
///
/// ```rust
/// use zzgear::catalog::{ItemCatalog, MemoryCatalog};
/// use zzgear::item::{ItemDefinition, ItemType};
/// use zzgear::DefinitionId;
///
/// let mut catalog = MemoryCatalog::new();
/// catalog.insert(ItemDefinition::new("cap", "Leather Cap", ItemType::Helmet));
///
/// assert!(catalog.resolve(&DefinitionId::new("cap")).is_ok());
/// assert!(catalog.resolve(&DefinitionId::new("crown")).is_err());
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemoryCatalog {
    definitions: HashMap<DefinitionId, ItemDefinition>,
}

impl MemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a JSON array of item definitions.
    ///
    /// Duplicate ids are rejected.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let definitions: Vec<ItemDefinition> = serde_json::from_str(json)?;
        let mut catalog = Self::new();
        for definition in definitions {
            if catalog.definitions.contains_key(&definition.id) {
                return Err(ConfigError::Invalid(format!(
                    "duplicate item definition: {}",
                    definition.id
                )));
            }
            catalog.insert(definition);
        }
        Ok(catalog)
    }

    /// Insert or replace a definition.
    pub fn insert(&mut self, definition: ItemDefinition) {
        self.definitions.insert(definition.id.clone(), definition);
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }
}

impl ItemCatalog for MemoryCatalog {
    fn resolve(&self, id: &DefinitionId) -> Result<&ItemDefinition, GearError> {
        self.definitions
            .get(id)
            .ok_or_else(|| GearError::DefinitionNotFound(id.clone()))
    }
}
