// ruletree-core/src/core/mod.rs
// ============================================================================
// Module: Rule Tree Core Types
// Description: Canonical rule tree schema, record, and report structures.
// Purpose: Provide stable, serializable types for rule tree evaluation.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! Core types define the attribute catalog, product record store, rule tree
//! model, evaluation report, transaction state gate, and rule grove. These
//! types are the canonical source of truth for any derived API surfaces.

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod attribute;
pub mod grove;
pub mod identifiers;
pub mod product;
pub mod report;
pub mod transaction;
pub mod tree;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use attribute::AttrKind;
pub use attribute::Attribute;
pub use attribute::AttributeCatalog;
pub use attribute::MetadataError;
pub use grove::RuleGrove;
pub use grove::TreeDescriptor;
pub use identifiers::OwnerId;
pub use identifiers::RuleId;
pub use identifiers::RuleSetId;
pub use product::Product;
pub use product::Row;
pub use report::EvaluationCounters;
pub use report::ReportSeverity;
pub use report::RuleFailure;
pub use report::RuleSetReport;
pub use report::RuleTreeReport;
pub use transaction::MAX_OWNERS;
pub use transaction::PermissionError;
pub use transaction::TransactionState;
pub use tree::ArithExpr;
pub use tree::ArithOp;
pub use tree::ArithStep;
pub use tree::CompareOp;
pub use tree::CustomOperatorHandle;
pub use tree::EvalMode;
pub use tree::FailureAction;
pub use tree::Operand;
pub use tree::Rule;
pub use tree::RuleOp;
pub use tree::RuleSet;
pub use tree::RuleTree;
pub use tree::Severity;
pub use tree::TargetRecord;
pub use tree::TreeError;
