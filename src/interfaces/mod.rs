// ruletree-core/src/interfaces/mod.rs
// ============================================================================
// Module: Rule Tree Interfaces
// Description: Caller-supplied contracts for metadata, records, and sources.
// Purpose: Define the contract surfaces used by the evaluation runtime.
// Dependencies: crate::core, thiserror
// ============================================================================

//! ## Overview
//! Interfaces define how the evaluator integrates with external systems
//! without embedding backend-specific details. Each contract is a small
//! trait with a single method; configuration such as endpoints or
//! credentials stays inside the implementation and is opaque to the core.
//! Implementations may block; the evaluator treats every call as opaque and
//! synchronous.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use thiserror::Error;

use crate::core::attribute::Attribute;
use crate::core::attribute::MetadataError;
use crate::core::product::Product;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Maximum number of operand strings passed to a custom operator.
pub const MAX_CUSTOM_OPERANDS: usize = 4;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors raised by caller-supplied retrieval and callout contracts.
#[derive(Debug, Error)]
pub enum SourceError {
    /// An attribute source failed to produce a value.
    #[error("attribute source error: {0}")]
    Retrieval(String),
    /// A custom operator callout failed.
    #[error("custom operator error: {0}")]
    Operator(String),
    /// The record retrieval contract failed.
    #[error("record retrieval error: {0}")]
    Record(String),
    /// No source is registered under the requested name.
    #[error("source not registered: {0}")]
    NotRegistered(String),
    /// A source is already registered under the name.
    #[error("source already registered: {0}")]
    AlreadyRegistered(String),
}

// ============================================================================
// SECTION: Metadata Contract
// ============================================================================

/// Caller-supplied producer of attribute metadata.
///
/// Invoked at most once per catalog construction.
pub trait MetadataProvider {
    /// Produces the attribute list, key attributes flagged.
    ///
    /// # Errors
    ///
    /// Returns [`MetadataError`] when metadata cannot be produced.
    fn attributes(&self) -> Result<Vec<Attribute>, MetadataError>;
}

// ============================================================================
// SECTION: Record Retrieval Contract
// ============================================================================

/// Caller-supplied retrieval of the current record by key values.
///
/// Invoked once per evaluation when attached.
pub trait RecordRetriever {
    /// Retrieves the current record for the extracted key values.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] when retrieval fails; the failure aborts the
    /// evaluation before the tree walk.
    fn retrieve(&self, keys: &BTreeMap<String, String>) -> Result<Product, SourceError>;
}

// ============================================================================
// SECTION: Source Contracts
// ============================================================================

/// Caller-supplied value producer for one attribute.
pub trait AttributeSource {
    /// Produces the current value of the named attribute.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] when the value cannot be produced.
    fn retrieve(&self, attr_name: &str) -> Result<String, SourceError>;
}

/// Caller-supplied custom operator implementation.
///
/// The evaluator passes at most [`MAX_CUSTOM_OPERANDS`] stringified operands.
/// The returned string is interpreted as a verdict: `"1"` or `"true"` passes,
/// `"0"` or `"false"` fails, anything else is a severe rule failure.
pub trait CustomOperator {
    /// Invokes the operator for the named attribute with resolved operands.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] when the callout fails; the failure aborts
    /// the evaluation.
    fn invoke(&self, attr_name: &str, args: &[String]) -> Result<String, SourceError>;
}
