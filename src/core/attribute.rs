// ruletree-core/src/core/attribute.rs
// ============================================================================
// Module: Attribute Catalog
// Description: Attribute metadata and the read-only attribute catalog.
// Purpose: Resolve operands and key attributes against stable metadata.
// Dependencies: crate::interfaces, serde, thiserror
// ============================================================================

//! ## Overview
//! Attributes carry the stable metadata used to resolve rule operands: a
//! numeric identifier, a unique name, the record group the attribute belongs
//! to, its logical kind, and the key flag. The catalog is read-only after
//! construction and may be shared across evaluators; there is no process-wide
//! singleton.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

use crate::interfaces::MetadataProvider;

// ============================================================================
// SECTION: Attribute Metadata
// ============================================================================

/// Logical kind of an attribute value.
///
/// # Invariants
/// - Values are always carried as strings; the kind selects comparison and
///   arithmetic semantics when rules consume them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttrKind {
    /// Free-form text compared byte-wise.
    Text,
    /// Whole number compared numerically.
    Integer,
    /// Decimal number compared numerically.
    Decimal,
    /// Calendar date compared as `YYYYMMDD`.
    Date,
    /// Enumerated code compared byte-wise.
    Enum,
}

impl AttrKind {
    /// Returns true when values of this kind compare numerically.
    #[must_use]
    pub const fn is_numeric(self) -> bool {
        matches!(self, Self::Integer | Self::Decimal)
    }
}

/// Immutable attribute metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attribute {
    /// Stable attribute identifier.
    pub attr_id: u32,
    /// Unique attribute name.
    pub attr_name: String,
    /// Record group the attribute belongs to.
    pub group_id: u32,
    /// Logical value kind.
    pub kind: AttrKind,
    /// Optional maximum value length; longer writes are truncated.
    pub max_length: Option<usize>,
    /// Indicates whether empty values are permitted.
    pub nullable: bool,
    /// Indicates whether the attribute is part of the record key.
    pub is_key: bool,
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Attribute resolution and catalog consistency errors.
#[derive(Debug, Error)]
pub enum MetadataError {
    /// Two attributes share the same name.
    #[error("duplicate attribute name: {0}")]
    DuplicateName(String),
    /// Two attributes share the same identifier.
    #[error("duplicate attribute id: {0}")]
    DuplicateId(u32),
    /// No attribute with the requested name exists.
    #[error("unknown attribute: {0}")]
    UnknownAttribute(String),
    /// No attribute with the requested identifier exists.
    #[error("unknown attribute id: {0}")]
    UnknownAttributeId(u32),
    /// The metadata contract reported an error.
    #[error("metadata provider error: {0}")]
    Provider(String),
}

// ============================================================================
// SECTION: Attribute Catalog
// ============================================================================

/// Read-only catalog of attribute metadata.
///
/// # Invariants
/// - Attribute names and identifiers are unique within the catalog.
/// - The catalog never changes after construction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeCatalog {
    /// Attributes keyed by identifier.
    by_id: BTreeMap<u32, Attribute>,
    /// Attribute identifiers keyed by name.
    name_index: BTreeMap<String, u32>,
}

impl AttributeCatalog {
    /// Builds a catalog from a caller-supplied metadata contract.
    ///
    /// The contract is invoked at most once.
    ///
    /// # Errors
    ///
    /// Returns [`MetadataError`] when the contract fails or the attribute
    /// list contains duplicate names or identifiers.
    pub fn from_provider(provider: &impl MetadataProvider) -> Result<Self, MetadataError> {
        Self::from_attributes(provider.attributes()?)
    }

    /// Builds a catalog from an attribute list.
    ///
    /// # Errors
    ///
    /// Returns [`MetadataError::DuplicateName`] or
    /// [`MetadataError::DuplicateId`] when two attributes collide.
    pub fn from_attributes(attributes: Vec<Attribute>) -> Result<Self, MetadataError> {
        let mut by_id = BTreeMap::new();
        let mut name_index = BTreeMap::new();
        for attribute in attributes {
            if name_index.contains_key(&attribute.attr_name) {
                return Err(MetadataError::DuplicateName(attribute.attr_name));
            }
            if by_id.contains_key(&attribute.attr_id) {
                return Err(MetadataError::DuplicateId(attribute.attr_id));
            }
            name_index.insert(attribute.attr_name.clone(), attribute.attr_id);
            by_id.insert(attribute.attr_id, attribute);
        }
        Ok(Self {
            by_id,
            name_index,
        })
    }

    /// Resolves an attribute by name.
    ///
    /// # Errors
    ///
    /// Returns [`MetadataError::UnknownAttribute`] when the name is absent.
    pub fn by_name(&self, name: &str) -> Result<&Attribute, MetadataError> {
        self.name_index
            .get(name)
            .and_then(|id| self.by_id.get(id))
            .ok_or_else(|| MetadataError::UnknownAttribute(name.to_string()))
    }

    /// Resolves an attribute by identifier.
    ///
    /// # Errors
    ///
    /// Returns [`MetadataError::UnknownAttributeId`] when the id is absent.
    pub fn by_id(&self, attr_id: u32) -> Result<&Attribute, MetadataError> {
        self.by_id.get(&attr_id).ok_or(MetadataError::UnknownAttributeId(attr_id))
    }

    /// Returns the key attributes ordered by identifier.
    #[must_use]
    pub fn keys(&self) -> Vec<&Attribute> {
        self.by_id.values().filter(|attribute| attribute.is_key).collect()
    }

    /// Returns the number of attributes in the catalog.
    #[must_use]
    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    /// Returns true when the catalog holds no attributes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }
}
