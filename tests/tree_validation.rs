// tests/tree_validation.rs
// ============================================================================
// Module: Rule Tree Validation Tests
// Description: Static validation pass coverage for parsed rule trees.
// Dependencies: ruletree-core
// ============================================================================
//! ## Overview
//! Validates the optional static pass: identifier uniqueness, attribute
//! resolution, operator payload shape, and custom operator binding checks.

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only output and panic-based assertions are permitted."
)]

use std::sync::Arc;

use ruletree_core::AttrKind;
use ruletree_core::Attribute;
use ruletree_core::AttributeCatalog;
use ruletree_core::EvalMode;
use ruletree_core::FailureAction;
use ruletree_core::InMemorySource;
use ruletree_core::Operand;
use ruletree_core::Rule;
use ruletree_core::RuleOp;
use ruletree_core::RuleSet;
use ruletree_core::RuleTree;
use ruletree_core::Severity;
use ruletree_core::SourceError;
use ruletree_core::SourceRegistry;
use ruletree_core::TargetRecord;
use ruletree_core::TreeError;

fn catalog() -> AttributeCatalog {
    AttributeCatalog::from_attributes(vec![Attribute {
        attr_id: 1,
        attr_name: "Name".to_string(),
        group_id: 1,
        kind: AttrKind::Text,
        max_length: None,
        nullable: true,
        is_key: false,
    }])
    .unwrap()
}

fn rule(rule_id: &str, target_attr: &str, op: RuleOp) -> Rule {
    Rule {
        rule_id: rule_id.into(),
        target_attr: target_attr.to_string(),
        op,
        negate: false,
        record: TargetRecord::New,
    }
}

fn set(ruleset_id: &str, rules: Vec<Rule>, children: Vec<RuleSet>) -> RuleSet {
    RuleSet {
        ruleset_id: ruleset_id.into(),
        description: format!("set {ruleset_id}"),
        mode: EvalMode::And,
        severity: Severity::Warning,
        custom_error: None,
        on_failure: FailureAction::Emit,
        rules,
        children,
    }
}

// ============================================================================
// SECTION: Identifier Uniqueness
// ============================================================================

/// Verifies duplicate rule set identifiers are rejected across levels.
#[test]
fn validation_rejects_duplicate_set_ids() {
    let tree = RuleTree::new(set("root", Vec::new(), vec![
        set("child", Vec::new(), Vec::new()),
        set("child", Vec::new(), Vec::new()),
    ]));

    assert!(matches!(
        tree.validate(&catalog()),
        Err(TreeError::DuplicateRuleSetId(id)) if id == "child"
    ));
}

/// Verifies duplicate rule identifiers are rejected across sets.
#[test]
fn validation_rejects_duplicate_rule_ids() {
    let tree = RuleTree::new(set(
        "root",
        vec![rule("r1", "Name", RuleOp::Populated)],
        vec![set("child", vec![rule("r1", "Name", RuleOp::Populated)], Vec::new())],
    ));

    assert!(matches!(
        tree.validate(&catalog()),
        Err(TreeError::DuplicateRuleId(id)) if id == "r1"
    ));
}

// ============================================================================
// SECTION: Attribute Resolution
// ============================================================================

/// Verifies rules targeting unknown attributes are rejected.
#[test]
fn validation_rejects_unknown_target_attributes() {
    let tree =
        RuleTree::new(set("root", vec![rule("r1", "Missing", RuleOp::Populated)], Vec::new()));

    assert!(matches!(
        tree.validate(&catalog()),
        Err(TreeError::UnknownTargetAttribute { attr_name, .. }) if attr_name == "Missing"
    ));
}

// ============================================================================
// SECTION: Operator Payloads
// ============================================================================

/// Verifies empty membership sets are rejected.
#[test]
fn validation_rejects_empty_membership_sets() {
    let tree = RuleTree::new(set(
        "root",
        vec![rule("r1", "Name", RuleOp::InSet {
            values: Vec::new(),
        })],
        Vec::new(),
    ));

    assert!(matches!(tree.validate(&catalog()), Err(TreeError::EmptyMembershipSet(_))));
}

/// Verifies the custom operand limit applies to rules.
#[test]
fn validation_rejects_excess_custom_operands() {
    let args = (0..5).map(|index| Operand::Literal(index.to_string())).collect();
    let tree = RuleTree::new(set(
        "root",
        vec![rule("r1", "Name", RuleOp::Custom {
            op_name: "check".to_string(),
            args,
        })],
        Vec::new(),
    ));

    assert!(matches!(tree.validate(&catalog()), Err(TreeError::TooManyCustomOperands(_))));
}

/// Verifies a well-formed tree passes validation.
#[test]
fn validation_accepts_well_formed_trees() {
    let tree = RuleTree::new(set(
        "root",
        vec![rule("r1", "Name", RuleOp::Populated)],
        vec![set("child", Vec::new(), Vec::new())],
    ));

    assert!(tree.validate(&catalog()).is_ok());
}

// ============================================================================
// SECTION: Operator Binding
// ============================================================================

/// Verifies unbound custom operator names fail registry validation.
#[test]
fn registry_reports_unbound_operators() {
    let tree = RuleTree::new(set(
        "root",
        vec![rule("r1", "Name", RuleOp::Custom {
            op_name: "lookup".to_string(),
            args: Vec::new(),
        })],
        Vec::new(),
    ));

    let registry = SourceRegistry::new();
    assert!(matches!(
        registry.validate_operators(&tree),
        Err(SourceError::NotRegistered(name)) if name == "lookup"
    ));
}

/// Verifies tree-registered bindings satisfy registry validation.
#[test]
fn registry_accepts_tree_registered_operators() {
    let mut tree = RuleTree::new(set(
        "root",
        vec![rule("r1", "Name", RuleOp::Custom {
            op_name: "lookup".to_string(),
            args: Vec::new(),
        })],
        Vec::new(),
    ));
    tree.register_custom_operator("lookup", Arc::new(InMemorySource::new()));

    let registry = SourceRegistry::new();
    assert!(registry.validate_operators(&tree).is_ok());
}
