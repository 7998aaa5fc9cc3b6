// ruletree-core/src/runtime/sources.rs
// ============================================================================
// Module: Source Registry
// Description: Registries for attribute sources and custom operators.
// Purpose: Route value retrievals and operator callouts by name.
// Dependencies: crate::core, crate::interfaces, thiserror
// ============================================================================

//! ## Overview
//! The source registry keeps two maps separately: attribute names bound to
//! value producers used when assembling the current record, and operator
//! names bound to custom operator callouts. Implementations are stored
//! behind shared handles so the evaluator can absorb the bindings a parser
//! registered on the tree without cloning them.
//!
//! The in-memory implementations at the bottom exist for tests and local
//! demos and are not intended for production use.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::core::attribute::Attribute;
use crate::core::attribute::MetadataError;
use crate::core::product::Product;
use crate::core::tree::CustomOperatorHandle;
use crate::core::tree::FailureAction;
use crate::core::tree::RuleOp;
use crate::core::tree::RuleSet;
use crate::core::tree::RuleTree;
use crate::interfaces::AttributeSource;
use crate::interfaces::CustomOperator;
use crate::interfaces::MetadataProvider;
use crate::interfaces::RecordRetriever;
use crate::interfaces::SourceError;

// ============================================================================
// SECTION: Source Registry
// ============================================================================

/// Shared handle to an attribute source implementation.
pub type AttributeSourceHandle = Arc<dyn AttributeSource + Send + Sync>;

/// Registry of attribute sources and custom operators.
///
/// # Invariants
/// - Names are unique per map; explicit registration rejects duplicates.
/// - Tree-registered operator bindings overwrite registry bindings when
///   merged; the parser is authoritative for the tree it built.
#[derive(Clone, Default)]
pub struct SourceRegistry {
    /// Attribute sources keyed by attribute name.
    attributes: BTreeMap<String, AttributeSourceHandle>,
    /// Custom operators keyed by operator name.
    operators: BTreeMap<String, CustomOperatorHandle>,
}

impl SourceRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an attribute source under the given attribute name.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::AlreadyRegistered`] when the name is taken.
    pub fn register_attribute_source(
        &mut self,
        attr_name: impl Into<String>,
        source: impl AttributeSource + Send + Sync + 'static,
    ) -> Result<(), SourceError> {
        let attr_name = attr_name.into();
        if self.attributes.contains_key(&attr_name) {
            return Err(SourceError::AlreadyRegistered(attr_name));
        }
        self.attributes.insert(attr_name, Arc::new(source));
        Ok(())
    }

    /// Registers a custom operator under the given operator name.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::AlreadyRegistered`] when the name is taken.
    pub fn register_custom_operator(
        &mut self,
        op_name: impl Into<String>,
        operator: impl CustomOperator + Send + Sync + 'static,
    ) -> Result<(), SourceError> {
        let op_name = op_name.into();
        if self.operators.contains_key(&op_name) {
            return Err(SourceError::AlreadyRegistered(op_name));
        }
        self.operators.insert(op_name, Arc::new(operator));
        Ok(())
    }

    /// Absorbs custom operator bindings registered on a tree.
    ///
    /// Tree bindings overwrite existing registry bindings of the same name.
    pub fn merge_custom_operators(&mut self, bindings: &BTreeMap<String, CustomOperatorHandle>) {
        for (name, operator) in bindings {
            self.operators.insert(name.clone(), Arc::clone(operator));
        }
    }

    /// Looks up an attribute source by name.
    #[must_use]
    pub fn attribute_source(&self, attr_name: &str) -> Option<&AttributeSourceHandle> {
        self.attributes.get(attr_name)
    }

    /// Looks up a custom operator by name.
    #[must_use]
    pub fn custom_operator(&self, op_name: &str) -> Option<&CustomOperatorHandle> {
        self.operators.get(op_name)
    }

    /// Iterates attribute sources in name order.
    pub fn attribute_sources(&self) -> impl Iterator<Item = (&str, &AttributeSourceHandle)> {
        self.attributes.iter().map(|(name, source)| (name.as_str(), source))
    }

    /// Returns true when any attribute source is registered.
    #[must_use]
    pub fn has_attribute_sources(&self) -> bool {
        !self.attributes.is_empty()
    }

    /// Validates that every custom operator the tree names is bound.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::NotRegistered`] for the first unbound name.
    pub fn validate_operators(&self, tree: &RuleTree) -> Result<(), SourceError> {
        let mut names = Vec::new();
        collect_operator_names(tree.root(), &mut names);
        for name in names {
            if !self.operators.contains_key(&name) && !tree.custom_operators().contains_key(&name) {
                return Err(SourceError::NotRegistered(name));
            }
        }
        Ok(())
    }
}

/// Collects custom operator names referenced by a rule set subtree.
fn collect_operator_names(set: &RuleSet, out: &mut Vec<String>) {
    for rule in &set.rules {
        if let RuleOp::Custom {
            op_name, ..
        } = &rule.op
            && !out.contains(op_name)
        {
            out.push(op_name.clone());
        }
    }
    if let FailureAction::CustomOp {
        op_name, ..
    } = &set.on_failure
        && !out.contains(op_name)
    {
        out.push(op_name.clone());
    }
    for child in &set.children {
        collect_operator_names(child, out);
    }
}

// ============================================================================
// SECTION: In-Memory Source
// ============================================================================

/// In-memory source for tests and examples.
///
/// Attribute retrievals answer from a fixed value table; custom operator
/// invocations answer from a reply table keyed by the first operand.
#[derive(Debug, Clone, Default)]
pub struct InMemorySource {
    /// Attribute values keyed by attribute name.
    values: BTreeMap<String, String>,
    /// Operator replies keyed by first operand.
    replies: BTreeMap<String, String>,
}

impl InMemorySource {
    /// Creates an empty in-memory source.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an attribute value.
    #[must_use]
    pub fn with_value(mut self, attr_name: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(attr_name.into(), value.into());
        self
    }

    /// Adds an operator reply keyed by first operand.
    #[must_use]
    pub fn with_reply(mut self, operand: impl Into<String>, reply: impl Into<String>) -> Self {
        self.replies.insert(operand.into(), reply.into());
        self
    }
}

impl AttributeSource for InMemorySource {
    fn retrieve(&self, attr_name: &str) -> Result<String, SourceError> {
        self.values
            .get(attr_name)
            .cloned()
            .ok_or_else(|| SourceError::Retrieval(format!("no value for attribute: {attr_name}")))
    }
}

impl CustomOperator for InMemorySource {
    fn invoke(&self, attr_name: &str, args: &[String]) -> Result<String, SourceError> {
        let key = args.first().map_or(attr_name, String::as_str);
        self.replies
            .get(key)
            .cloned()
            .ok_or_else(|| SourceError::Operator(format!("no reply for operand: {key}")))
    }
}

// ============================================================================
// SECTION: Static Contracts
// ============================================================================

/// Metadata contract backed by a fixed attribute list.
#[derive(Debug, Clone, Default)]
pub struct StaticMetadataProvider {
    /// Attribute records returned to the catalog.
    attributes: Vec<Attribute>,
}

impl StaticMetadataProvider {
    /// Creates a provider over a fixed attribute list.
    #[must_use]
    pub const fn new(attributes: Vec<Attribute>) -> Self {
        Self {
            attributes,
        }
    }
}

impl MetadataProvider for StaticMetadataProvider {
    fn attributes(&self) -> Result<Vec<Attribute>, MetadataError> {
        Ok(self.attributes.clone())
    }
}

/// Record retrieval contract backed by a fixed product.
#[derive(Debug, Clone, Default)]
pub struct StaticRecordRetriever {
    /// Product returned for every key set.
    record: Product,
}

impl StaticRecordRetriever {
    /// Creates a retriever over a fixed product.
    #[must_use]
    pub const fn new(record: Product) -> Self {
        Self {
            record,
        }
    }
}

impl RecordRetriever for StaticRecordRetriever {
    fn retrieve(&self, _keys: &BTreeMap<String, String>) -> Result<Product, SourceError> {
        Ok(self.record.clone())
    }
}
