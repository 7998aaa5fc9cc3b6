// ruletree-core/src/core/grove.rs
// ============================================================================
// Module: Rule Grove
// Description: Ordered composition of rule tree descriptors.
// Purpose: Aggregate cost and attribute metadata across trees.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! A grove is a pure data container: an ordered list of rule tree descriptors
//! with aggregated cost bounds and the union of required attribute names.
//! The evaluator never consults it.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;

use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Descriptors
// ============================================================================

/// Composition record describing one rule tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeDescriptor {
    /// Tree identifier.
    pub tree_id: String,
    /// Human-readable description.
    pub description: String,
    /// Minimum evaluation cost attributed to the tree.
    pub min_cost: u64,
    /// Maximum evaluation cost attributed to the tree.
    pub max_cost: u64,
    /// Attribute names the tree requires.
    pub required_attributes: Vec<String>,
}

// ============================================================================
// SECTION: Rule Grove
// ============================================================================

/// Ordered collection of rule tree descriptors.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleGrove {
    /// Descriptors in insertion order.
    descriptors: Vec<TreeDescriptor>,
}

impl RuleGrove {
    /// Creates an empty grove.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a tree descriptor.
    pub fn add(&mut self, descriptor: TreeDescriptor) {
        self.descriptors.push(descriptor);
    }

    /// Returns the number of descriptors.
    #[must_use]
    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    /// Returns true when the grove holds no descriptors.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    /// Returns the descriptors in insertion order.
    #[must_use]
    pub fn descriptors(&self) -> &[TreeDescriptor] {
        &self.descriptors
    }

    /// Returns the summed minimum cost across descriptors.
    #[must_use]
    pub fn total_min_cost(&self) -> u64 {
        self.descriptors.iter().fold(0, |total, tree| total.saturating_add(tree.min_cost))
    }

    /// Returns the summed maximum cost across descriptors.
    #[must_use]
    pub fn total_max_cost(&self) -> u64 {
        self.descriptors.iter().fold(0, |total, tree| total.saturating_add(tree.max_cost))
    }

    /// Returns the union of required attribute names.
    #[must_use]
    pub fn required_attributes(&self) -> BTreeSet<String> {
        self.descriptors
            .iter()
            .flat_map(|tree| tree.required_attributes.iter().cloned())
            .collect()
    }
}
