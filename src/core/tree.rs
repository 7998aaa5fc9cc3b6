// ruletree-core/src/core/tree.rs
// ============================================================================
// Module: Rule Tree Model
// Description: Rule set, rule, and operator specifications for evaluation.
// Purpose: Define the canonical rule tree with validation helpers.
// Dependencies: crate::core, crate::interfaces, serde, thiserror
// ============================================================================

//! ## Overview
//! A rule tree is a purely downward tree of rule sets handed over fully built
//! by an external parser. Each rule set combines a list of rules and a list
//! of child rule sets; rules are tagged operator variants dispatched in one
//! place at evaluation time. The tree is logically immutable after parsing
//! apart from one parser-facing mutation point that binds custom operator
//! names to sources.
//!
//! Static validation (`RuleTree::validate`) is a separate pass that callers
//! may skip; evaluation only checks what it needs.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

use crate::core::attribute::AttributeCatalog;
use crate::core::identifiers::RuleId;
use crate::core::identifiers::RuleSetId;
use crate::interfaces::CustomOperator;
use crate::interfaces::MAX_CUSTOM_OPERANDS;

// ============================================================================
// SECTION: Rule Tree
// ============================================================================

/// Shared handle to a custom operator implementation.
pub type CustomOperatorHandle = Arc<dyn CustomOperator + Send + Sync>;

/// Canonical rule tree evaluated as one unit against a record.
///
/// # Invariants
/// - The root rule set has no parent; the tree has no cycles by construction.
/// - Custom operator bindings are runtime-attached and excluded from
///   serialization; callers re-register them after deserializing.
#[derive(Clone, Serialize, Deserialize)]
pub struct RuleTree {
    /// Root rule set of the tree.
    root: RuleSet,
    /// Custom operator sources keyed by operator name.
    #[serde(skip)]
    custom_operators: BTreeMap<String, CustomOperatorHandle>,
}

impl RuleTree {
    /// Creates a rule tree from a fully built root rule set.
    #[must_use]
    pub fn new(root: RuleSet) -> Self {
        Self {
            root,
            custom_operators: BTreeMap::new(),
        }
    }

    /// Returns the root rule set.
    #[must_use]
    pub const fn root(&self) -> &RuleSet {
        &self.root
    }

    /// Binds a custom operator name to a source.
    ///
    /// This is the only mutation point on the model and is used by the
    /// parser while assembling the tree. Later registrations overwrite
    /// earlier ones.
    pub fn register_custom_operator(
        &mut self,
        name: impl Into<String>,
        operator: CustomOperatorHandle,
    ) {
        self.custom_operators.insert(name.into(), operator);
    }

    /// Returns the custom operator bindings.
    #[must_use]
    pub const fn custom_operators(&self) -> &BTreeMap<String, CustomOperatorHandle> {
        &self.custom_operators
    }

    /// Validates the tree invariants that evaluation does not re-check.
    ///
    /// # Errors
    ///
    /// Returns [`TreeError`] when validation fails.
    pub fn validate(&self, catalog: &AttributeCatalog) -> Result<(), TreeError> {
        let mut set_ids: Vec<&RuleSetId> = Vec::new();
        let mut rule_ids: Vec<&RuleId> = Vec::new();
        validate_set(&self.root, catalog, &mut set_ids, &mut rule_ids)
    }
}

impl fmt::Debug for RuleTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuleTree")
            .field("root", &self.root)
            .field("custom_operators", &self.custom_operators.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl PartialEq for RuleTree {
    /// Trees compare by structure; runtime operator bindings are excluded.
    fn eq(&self, other: &Self) -> bool {
        self.root == other.root
    }
}

// ============================================================================
// SECTION: Rule Sets
// ============================================================================

/// Rule combination mode for a rule set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvalMode {
    /// Every rule must pass; an empty rule list passes.
    And,
    /// At least one rule must pass; an empty rule list fails.
    Or,
}

/// Error severity declared on a rule set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// Failure is advisory.
    Warning,
    /// Failure is severe.
    Severe,
}

/// Remediation performed when a rule set fails.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FailureAction {
    /// Emit the error message only.
    Emit,
    /// Assign a value to an attribute of the incoming record.
    Assign {
        /// Target attribute name.
        attr_name: String,
        /// Literal value to assign.
        value: String,
    },
    /// Invoke a custom operator.
    CustomOp {
        /// Custom operator name.
        op_name: String,
        /// Literal operand strings, at most four.
        args: Vec<String>,
    },
    /// Halt traversal of the parent's remaining children.
    HaltSiblings,
}

/// Rule set combining rules and child rule sets.
///
/// # Invariants
/// - `mode` combines rule verdicts only; child rule sets always combine
///   by conjunction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleSet {
    /// Rule set identifier.
    pub ruleset_id: RuleSetId,
    /// Human-readable description.
    pub description: String,
    /// Rule combination mode.
    pub mode: EvalMode,
    /// Severity applied to failures of this set.
    pub severity: Severity,
    /// Optional custom error message emitted on failure.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_error: Option<String>,
    /// Remediation performed on failure.
    pub on_failure: FailureAction,
    /// Rules evaluated in declaration order.
    pub rules: Vec<Rule>,
    /// Child rule sets traversed left to right.
    pub children: Vec<RuleSet>,
}

// ============================================================================
// SECTION: Rules
// ============================================================================

/// Record selected as a rule's evaluation target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetRecord {
    /// The incoming record under validation.
    New,
    /// The current record supplied by the retrieval contract.
    Current,
}

/// Operand of a rule operator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Operand {
    /// Literal string passed through unchanged.
    Literal(String),
    /// Attribute reference read from the rule's target record.
    AttributeRef(String),
    /// Callout to a registered attribute source.
    SourceCallout(String),
}

/// Ordering comparison applied by a compare rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompareOp {
    /// Equality.
    Eq,
    /// Inequality.
    Ne,
    /// Strictly less than.
    Lt,
    /// Less than or equal.
    Le,
    /// Strictly greater than.
    Gt,
    /// Greater than or equal.
    Ge,
}

impl CompareOp {
    /// Returns the comparison symbol for report output.
    #[must_use]
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::Eq => "==",
            Self::Ne => "!=",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
        }
    }
}

/// Arithmetic operation in an expression step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArithOp {
    /// Addition.
    Add,
    /// Subtraction.
    Sub,
    /// Multiplication.
    Mul,
    /// Division.
    Div,
}

/// One step of a left-to-right arithmetic expression.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArithStep {
    /// Operation applied to the running value.
    pub op: ArithOp,
    /// Right-hand operand of the step.
    pub operand: Operand,
}

/// Arithmetic expression evaluated left to right over decimal operands.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArithExpr {
    /// First operand of the expression.
    pub first: Operand,
    /// Remaining steps applied in order.
    pub rest: Vec<ArithStep>,
}

/// Rule operator with its operand payload.
///
/// # Invariants
/// - Variants are stable for serialization and dispatched in one place at
///   evaluation time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RuleOp {
    /// Target value is non-empty after trimming.
    Populated,
    /// Comparison against a resolved operand.
    Compare {
        /// Comparison applied.
        op: CompareOp,
        /// Right-hand operand.
        rhs: Operand,
    },
    /// Membership in a literal value set, case-sensitive.
    InSet {
        /// Literal member values.
        values: Vec<String>,
    },
    /// Inclusive numeric range check.
    Range {
        /// Lower bound operand.
        lo: Operand,
        /// Upper bound operand.
        hi: Operand,
    },
    /// Arithmetic expression assigned into the target attribute.
    Arith {
        /// Expression evaluated left to right.
        expr: ArithExpr,
    },
    /// Assignment of a resolved operand into the target attribute.
    Assign {
        /// Value operand.
        value: Operand,
    },
    /// Dispatch to a named custom operator source.
    Custom {
        /// Custom operator name.
        op_name: String,
        /// Operand list, at most four.
        args: Vec<Operand>,
    },
}

impl RuleOp {
    /// Returns the operator name used in report output.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Populated => "populated",
            Self::Compare {
                ..
            } => "compare",
            Self::InSet {
                ..
            } => "in_set",
            Self::Range {
                ..
            } => "range",
            Self::Arith {
                ..
            } => "arith",
            Self::Assign {
                ..
            } => "assign",
            Self::Custom {
                op_name, ..
            } => op_name,
        }
    }
}

/// Leaf predicate or action over attributes of a record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rule {
    /// Rule identifier.
    pub rule_id: RuleId,
    /// Target attribute name.
    pub target_attr: String,
    /// Operator with operand payload.
    pub op: RuleOp,
    /// Negates the boolean verdict when set.
    #[serde(default)]
    pub negate: bool,
    /// Record the rule evaluates against.
    pub record: TargetRecord,
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Rule tree validation errors.
#[derive(Debug, Error)]
pub enum TreeError {
    /// Duplicate rule set identifiers detected.
    #[error("duplicate rule set identifier: {0}")]
    DuplicateRuleSetId(String),
    /// Duplicate rule identifiers detected.
    #[error("duplicate rule identifier: {0}")]
    DuplicateRuleId(String),
    /// A rule's target attribute does not resolve in the catalog.
    #[error("rule {rule_id} targets unknown attribute: {attr_name}")]
    UnknownTargetAttribute {
        /// Offending rule identifier.
        rule_id: String,
        /// Unresolved attribute name.
        attr_name: String,
    },
    /// A set-membership rule has no member values.
    #[error("rule {0} has an empty membership set")]
    EmptyMembershipSet(String),
    /// A custom operator rule carries too many operands.
    #[error("rule {0} exceeds the custom operand limit of {MAX_CUSTOM_OPERANDS}")]
    TooManyCustomOperands(String),
    /// An on-failure custom action carries too many operands.
    #[error("rule set {0} exceeds the custom operand limit of {MAX_CUSTOM_OPERANDS}")]
    TooManyActionOperands(String),
}

// ============================================================================
// SECTION: Validation Helpers
// ============================================================================

/// Validates one rule set and recurses into its children.
fn validate_set<'a>(
    set: &'a RuleSet,
    catalog: &AttributeCatalog,
    set_ids: &mut Vec<&'a RuleSetId>,
    rule_ids: &mut Vec<&'a RuleId>,
) -> Result<(), TreeError> {
    if set_ids.contains(&&set.ruleset_id) {
        return Err(TreeError::DuplicateRuleSetId(set.ruleset_id.to_string()));
    }
    set_ids.push(&set.ruleset_id);

    if let FailureAction::CustomOp {
        args, ..
    } = &set.on_failure
        && args.len() > MAX_CUSTOM_OPERANDS
    {
        return Err(TreeError::TooManyActionOperands(set.ruleset_id.to_string()));
    }

    for rule in &set.rules {
        validate_rule(rule, catalog, rule_ids)?;
    }

    for child in &set.children {
        validate_set(child, catalog, set_ids, rule_ids)?;
    }
    Ok(())
}

/// Validates one rule against the catalog and identifier registry.
fn validate_rule<'a>(
    rule: &'a Rule,
    catalog: &AttributeCatalog,
    rule_ids: &mut Vec<&'a RuleId>,
) -> Result<(), TreeError> {
    if rule_ids.contains(&&rule.rule_id) {
        return Err(TreeError::DuplicateRuleId(rule.rule_id.to_string()));
    }
    rule_ids.push(&rule.rule_id);

    if catalog.by_name(&rule.target_attr).is_err() {
        return Err(TreeError::UnknownTargetAttribute {
            rule_id: rule.rule_id.to_string(),
            attr_name: rule.target_attr.clone(),
        });
    }

    match &rule.op {
        RuleOp::InSet {
            values,
        } if values.is_empty() => Err(TreeError::EmptyMembershipSet(rule.rule_id.to_string())),
        RuleOp::Custom {
            args, ..
        } if args.len() > MAX_CUSTOM_OPERANDS => {
            Err(TreeError::TooManyCustomOperands(rule.rule_id.to_string()))
        }
        _ => Ok(()),
    }
}
