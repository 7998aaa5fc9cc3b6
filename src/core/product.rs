// ruletree-core/src/core/product.rs
// ============================================================================
// Module: Product Record Store
// Description: Tabular string-value container evaluated by rule trees.
// Purpose: Hold record values keyed by group, row, and attribute identifier.
// Dependencies: crate::core::attribute, serde
// ============================================================================

//! ## Overview
//! A product is a mapping from group identifier to an ordered list of rows,
//! each row a mapping from attribute identifier to string value. All values
//! are carried as strings; numeric and date semantics live in the rules that
//! consume them. Writes land in row zero of the attribute's group, creating
//! the group and row on demand, and are silently truncated at the attribute's
//! maximum length.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use serde::Deserialize;
use serde::Serialize;

use crate::core::attribute::Attribute;

// ============================================================================
// SECTION: Product
// ============================================================================

/// One row of a record group, keyed by attribute identifier.
pub type Row = BTreeMap<u32, String>;

/// Tabular value container for a single record.
///
/// # Invariants
/// - Rows within a group share the same schema.
/// - Duplicate `(group, row, attribute)` writes overwrite.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    /// Record rows keyed by group identifier.
    groups: BTreeMap<u32, Vec<Row>>,
}

impl Product {
    /// Creates an empty product.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Writes a value into row zero of the attribute's group.
    ///
    /// The group and row are created on demand. Values longer than the
    /// attribute's maximum length are truncated; callers enforce stricter
    /// policy via rules.
    pub fn set(&mut self, attribute: &Attribute, value: impl Into<String>) {
        let mut value = value.into();
        if let Some(max_length) = attribute.max_length
            && value.chars().count() > max_length
        {
            value = value.chars().take(max_length).collect();
        }

        let rows = self.groups.entry(attribute.group_id).or_default();
        if rows.is_empty() {
            rows.push(Row::new());
        }
        rows[0].insert(attribute.attr_id, value);
    }

    /// Reads a value by group, row index, and attribute identifier.
    #[must_use]
    pub fn get(&self, group_id: u32, row: usize, attr_id: u32) -> Option<&str> {
        self.groups
            .get(&group_id)
            .and_then(|rows| rows.get(row))
            .and_then(|columns| columns.get(&attr_id))
            .map(String::as_str)
    }

    /// Reads the row-zero value of an attribute.
    #[must_use]
    pub fn value_of(&self, attribute: &Attribute) -> Option<&str> {
        self.get(attribute.group_id, 0, attribute.attr_id)
    }

    /// Returns the rows of a group, or an empty slice when absent.
    #[must_use]
    pub fn group(&self, group_id: u32) -> &[Row] {
        self.groups.get(&group_id).map_or(&[], Vec::as_slice)
    }

    /// Returns the number of rows in a group.
    #[must_use]
    pub fn row_count(&self, group_id: u32) -> usize {
        self.groups.get(&group_id).map_or(0, Vec::len)
    }

    /// Returns true when the product holds no groups.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}
