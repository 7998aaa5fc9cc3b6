// ruletree-core/src/runtime/evaluator.rs
// ============================================================================
// Module: Rule Tree Evaluator
// Description: Deterministic depth-first evaluation of rule trees.
// Purpose: Execute a rule tree against a record pair and aggregate a report.
// Dependencies: crate::core, crate::interfaces, crate::runtime, thiserror, tracing
// ============================================================================

//! ## Overview
//! The evaluator is the single canonical execution path for rule trees. One
//! `validate` call runs to completion on the invoking thread: key extraction,
//! transaction gate check, current-record acquisition, then a depth-first,
//! left-to-right, pre-order walk over the rule sets. Assignment operators
//! mutate the incoming record mid-walk and their effects are visible to every
//! rule evaluated afterwards; mutations are never rolled back.
//!
//! Rule-level numeric faults and malformed custom verdicts are reported in
//! the walk, never raised. Metadata, key, permission, and source failures
//! unwind `validate` after the guaranteed gate clear.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use thiserror::Error;

use crate::core::attribute::Attribute;
use crate::core::attribute::AttributeCatalog;
use crate::core::attribute::MetadataError;
use crate::core::product::Product;
use crate::core::report::EvaluationCounters;
use crate::core::report::ReportSeverity;
use crate::core::report::RuleFailure;
use crate::core::report::RuleSetReport;
use crate::core::report::RuleTreeReport;
use crate::core::transaction::PermissionError;
use crate::core::transaction::TransactionState;
use crate::core::tree::ArithExpr;
use crate::core::tree::ArithOp;
use crate::core::tree::EvalMode;
use crate::core::tree::FailureAction;
use crate::core::tree::Operand;
use crate::core::tree::Rule;
use crate::core::tree::RuleOp;
use crate::core::tree::RuleSet;
use crate::core::tree::RuleTree;
use crate::core::tree::Severity;
use crate::core::tree::TargetRecord;
use crate::interfaces::MAX_CUSTOM_OPERANDS;
use crate::interfaces::RecordRetriever;
use crate::interfaces::SourceError;
use crate::runtime::operators::apply_polarity;
use crate::runtime::operators::compare;
use crate::runtime::operators::custom_verdict;
use crate::runtime::operators::eval_arith;
use crate::runtime::operators::in_range;
use crate::runtime::operators::in_set;
use crate::runtime::operators::is_populated;
use crate::runtime::sources::SourceRegistry;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Fatal evaluation errors.
///
/// Rule-level failures are carried in the report instead; see the module
/// overview.
#[derive(Debug, Error)]
pub enum EvaluationError {
    /// Attribute resolution or catalog inconsistency.
    #[error(transparent)]
    Metadata(#[from] MetadataError),
    /// The incoming record lacks a required key value.
    #[error("incoming record is missing key attribute value: {0}")]
    MissingKey(String),
    /// The transaction gate rejected the evaluation.
    #[error(transparent)]
    Permission(#[from] PermissionError),
    /// A caller-supplied retrieval or callout failed.
    #[error(transparent)]
    Source(#[from] SourceError),
}

// ============================================================================
// SECTION: Evaluator
// ============================================================================

/// Rule tree evaluator executing validations against record pairs.
pub struct RuleTreeEvaluator<R> {
    /// Rule tree under evaluation.
    tree: RuleTree,
    /// Attribute catalog used for operand resolution.
    catalog: AttributeCatalog,
    /// Source registry for attribute sources and custom operators.
    sources: SourceRegistry,
    /// Optional current-record retrieval contract.
    retriever: Option<R>,
    /// Optional transaction state gate.
    gate: Option<TransactionState>,
}

impl<R> RuleTreeEvaluator<R>
where
    R: RecordRetriever,
{
    /// Creates a new evaluator around a parsed rule tree.
    ///
    /// Custom operator bindings registered on the tree are absorbed into the
    /// source registry.
    #[must_use]
    pub fn new(
        tree: RuleTree,
        catalog: AttributeCatalog,
        mut sources: SourceRegistry,
        retriever: Option<R>,
        gate: Option<TransactionState>,
    ) -> Self {
        sources.merge_custom_operators(tree.custom_operators());
        Self {
            tree,
            catalog,
            sources,
            retriever,
            gate,
        }
    }

    /// Returns the rule tree.
    #[must_use]
    pub const fn tree(&self) -> &RuleTree {
        &self.tree
    }

    /// Returns the attribute catalog.
    #[must_use]
    pub const fn catalog(&self) -> &AttributeCatalog {
        &self.catalog
    }

    /// Returns the source registry.
    #[must_use]
    pub const fn sources(&self) -> &SourceRegistry {
        &self.sources
    }

    /// Returns the transaction gate, when attached.
    #[must_use]
    pub const fn gate(&self) -> Option<&TransactionState> {
        self.gate.as_ref()
    }

    /// Returns mutable access to the transaction gate, when attached.
    ///
    /// Callers confirm owners through this handle between evaluations.
    pub fn gate_mut(&mut self) -> Option<&mut TransactionState> {
        self.gate.as_mut()
    }

    /// Validates an incoming record against the rule tree.
    ///
    /// The record is mutated in place by assignment and arithmetic rules.
    /// The transaction gate's confirmations are cleared on exit whether the
    /// evaluation returns or errors.
    ///
    /// # Errors
    ///
    /// Returns [`EvaluationError`] on missing key values, an unconfirmed
    /// gate, unresolvable attributes, or failed source callouts.
    pub fn validate(&mut self, record: &mut Product) -> Result<RuleTreeReport, EvaluationError> {
        let result = self.validate_inner(record);
        if let Some(gate) = &mut self.gate {
            gate.revoke_all();
        }
        result
    }

    /// Runs the pre-flight checks and the tree walk.
    fn validate_inner(&self, record: &mut Product) -> Result<RuleTreeReport, EvaluationError> {
        let keys = self.extract_keys(record)?;
        tracing::debug!(keys = keys.len(), "rule tree evaluation started");

        if let Some(gate) = &self.gate
            && !gate.is_confirmed()
        {
            return Err(EvaluationError::Permission(PermissionError::NotConfirmed));
        }

        let current = self.current_record(&keys)?;

        let mut walk = WalkState::default();
        self.evaluate_set(self.tree.root(), record, &current, &mut walk)?;

        let severity = if walk.severe {
            ReportSeverity::Severe
        } else if walk.counters.rule_sets_failed > 0 {
            ReportSeverity::Warning
        } else {
            ReportSeverity::Clean
        };

        tracing::debug!(
            rules = walk.counters.rules_evaluated,
            failed = walk.counters.rules_failed,
            "rule tree evaluation finished"
        );

        Ok(RuleTreeReport {
            severity,
            rule_sets: walk.rule_sets,
            counters: walk.counters,
        })
    }

    /// Extracts key values from the incoming record.
    fn extract_keys(&self, record: &Product) -> Result<BTreeMap<String, String>, EvaluationError> {
        let mut keys = BTreeMap::new();
        for attribute in self.catalog.keys() {
            let value = record.value_of(attribute).unwrap_or_default();
            if value.trim().is_empty() {
                return Err(EvaluationError::MissingKey(attribute.attr_name.clone()));
            }
            keys.insert(attribute.attr_name.clone(), value.to_string());
        }
        Ok(keys)
    }

    /// Obtains the current record for the extracted keys.
    ///
    /// The retrieval contract wins when attached; otherwise the attribute
    /// source map assembles the record; otherwise it is empty.
    fn current_record(
        &self,
        keys: &BTreeMap<String, String>,
    ) -> Result<Product, EvaluationError> {
        if let Some(retriever) = &self.retriever {
            return Ok(retriever.retrieve(keys)?);
        }
        if self.sources.has_attribute_sources() {
            return assemble_current(&self.sources, &self.catalog);
        }
        tracing::debug!("no record retrieval attached, using empty current record");
        Ok(Product::new())
    }

    /// Evaluates one rule set and recurses into its children.
    fn evaluate_set(
        &self,
        set: &RuleSet,
        new: &mut Product,
        current: &Product,
        walk: &mut WalkState,
    ) -> Result<SetOutcome, EvaluationError> {
        walk.counters.rule_sets_evaluated += 1;
        let index = walk.rule_sets.len();
        walk.rule_sets.push(RuleSetReport {
            ruleset_id: set.ruleset_id.clone(),
            description: set.description.clone(),
            passed: true,
            severity: set.severity,
            error_message: None,
            failures: Vec::new(),
        });

        let mut failures = Vec::new();
        let mut passes = 0usize;
        for rule in &set.rules {
            walk.counters.rules_evaluated += 1;
            let outcome = self.evaluate_rule(set, rule, new, current)?;
            if outcome.passed {
                passes += 1;
            }
            if let Some(failure) = outcome.failure {
                failures.push(failure);
            }
        }

        let (rules_passed, kept_failures) = combine_rule_verdicts(set.mode, passes, failures);
        walk.counters.rules_failed += kept_failures.len() as u64;
        if kept_failures.iter().any(|failure| failure.severity == Severity::Severe) {
            walk.severe = true;
        }
        let merged_failures = match set.mode {
            EvalMode::And => kept_failures,
            EvalMode::Or => merge_alternatives(kept_failures),
        };

        let mut children_passed = true;
        for child in &set.children {
            let outcome = self.evaluate_set(child, new, current, walk)?;
            if !outcome.passed {
                children_passed = false;
            }
            if outcome.halt {
                break;
            }
        }

        let passed = rules_passed && children_passed;
        let mut halt = false;
        if !passed {
            walk.counters.rule_sets_failed += 1;
            if set.severity == Severity::Severe {
                walk.severe = true;
            }
            halt = self.perform_failure_action(set, new)?;
        }

        let entry = &mut walk.rule_sets[index];
        entry.passed = passed;
        entry.failures = merged_failures;
        if !passed {
            entry.error_message = Some(
                set.custom_error
                    .clone()
                    .unwrap_or_else(|| format!("rule set '{}' failed", set.ruleset_id)),
            );
        }

        Ok(SetOutcome {
            passed,
            halt,
        })
    }

    /// Evaluates one rule against the record pair.
    fn evaluate_rule(
        &self,
        set: &RuleSet,
        rule: &Rule,
        new: &mut Product,
        current: &Product,
    ) -> Result<RuleOutcome, EvaluationError> {
        let attribute = self.catalog.by_name(&rule.target_attr)?;
        let observed = target_record(rule, new, current)
            .value_of(attribute)
            .unwrap_or_default()
            .to_string();

        match &rule.op {
            RuleOp::Populated => {
                let verdict = apply_polarity(is_populated(&observed), rule.negate);
                Ok(verdict_outcome(set, rule, verdict, observed, "populated".to_string()))
            }
            RuleOp::Compare {
                op,
                rhs,
            } => {
                let rhs = self.resolve_operand(rule, rhs, new, current)?;
                let expected = format!("{} {rhs}", op.symbol());
                match compare(attribute.kind, *op, &observed, &rhs) {
                    Ok(raw) => {
                        let verdict = apply_polarity(raw, rule.negate);
                        Ok(verdict_outcome(set, rule, verdict, observed, expected))
                    }
                    Err(fault) => {
                        Ok(severe_outcome(set, rule, observed, fault.to_string()))
                    }
                }
            }
            RuleOp::InSet {
                values,
            } => {
                let verdict = apply_polarity(in_set(&observed, values), rule.negate);
                let expected = format!("in {{{}}}", values.join(", "));
                Ok(verdict_outcome(set, rule, verdict, observed, expected))
            }
            RuleOp::Range {
                lo,
                hi,
            } => {
                let lo = self.resolve_operand(rule, lo, new, current)?;
                let hi = self.resolve_operand(rule, hi, new, current)?;
                let expected = format!("in [{lo}, {hi}]");
                match in_range(&observed, &lo, &hi) {
                    Ok(raw) => {
                        let verdict = apply_polarity(raw, rule.negate);
                        Ok(verdict_outcome(set, rule, verdict, observed, expected))
                    }
                    Err(fault) => {
                        Ok(severe_outcome(set, rule, observed, fault.to_string()))
                    }
                }
            }
            RuleOp::Arith {
                expr,
            } => {
                let (first, steps) = self.resolve_arith(rule, expr, new, current)?;
                match eval_arith(&first, &steps) {
                    Ok(value) => {
                        new.set(attribute, value);
                        Ok(RuleOutcome::pass())
                    }
                    Err(fault) => {
                        Ok(severe_outcome(set, rule, observed, fault.to_string()))
                    }
                }
            }
            RuleOp::Assign {
                value,
            } => {
                let value = self.resolve_operand(rule, value, new, current)?;
                new.set(attribute, value);
                Ok(RuleOutcome::pass())
            }
            RuleOp::Custom {
                op_name,
                args,
            } => {
                let mut resolved = Vec::with_capacity(args.len().min(MAX_CUSTOM_OPERANDS));
                for operand in args.iter().take(MAX_CUSTOM_OPERANDS) {
                    resolved.push(self.resolve_operand(rule, operand, new, current)?);
                }
                let operator = self
                    .sources
                    .custom_operator(op_name)
                    .ok_or_else(|| SourceError::NotRegistered(op_name.clone()))?;
                let reply = operator.invoke(&rule.target_attr, &resolved)?;
                tracing::debug!(operator = %op_name, reply = %reply, "custom operator dispatched");
                match custom_verdict(&reply) {
                    Some(raw) => {
                        let verdict = apply_polarity(raw, rule.negate);
                        let expected = format!("{op_name} returns a passing verdict");
                        Ok(verdict_outcome(set, rule, verdict, observed, expected))
                    }
                    None => {
                        let expected = format!("{op_name} returns 1/true or 0/false");
                        Ok(severe_outcome(set, rule, reply, expected))
                    }
                }
            }
        }
    }

    /// Resolves one operand against the record pair and source registry.
    fn resolve_operand(
        &self,
        rule: &Rule,
        operand: &Operand,
        new: &Product,
        current: &Product,
    ) -> Result<String, EvaluationError> {
        match operand {
            Operand::Literal(value) => Ok(value.clone()),
            Operand::AttributeRef(name) => {
                let attribute = self.catalog.by_name(name)?;
                let record = target_record(rule, new, current);
                Ok(record.value_of(attribute).unwrap_or_default().to_string())
            }
            Operand::SourceCallout(name) => {
                let source = self
                    .sources
                    .attribute_source(name)
                    .ok_or_else(|| SourceError::NotRegistered(name.clone()))?;
                Ok(source.retrieve(name)?)
            }
        }
    }

    /// Resolves every operand of an arithmetic expression.
    fn resolve_arith(
        &self,
        rule: &Rule,
        expr: &ArithExpr,
        new: &Product,
        current: &Product,
    ) -> Result<(String, Vec<(ArithOp, String)>), EvaluationError> {
        let first = self.resolve_operand(rule, &expr.first, new, current)?;
        let mut steps = Vec::with_capacity(expr.rest.len());
        for step in &expr.rest {
            steps.push((step.op, self.resolve_operand(rule, &step.operand, new, current)?));
        }
        Ok((first, steps))
    }

    /// Performs a failed rule set's remediation action.
    ///
    /// Returns true when the parent's remaining children must be skipped.
    fn perform_failure_action(
        &self,
        set: &RuleSet,
        new: &mut Product,
    ) -> Result<bool, EvaluationError> {
        match &set.on_failure {
            FailureAction::Emit => Ok(false),
            FailureAction::Assign {
                attr_name,
                value,
            } => {
                let attribute = self.catalog.by_name(attr_name)?;
                new.set(attribute, value.clone());
                Ok(false)
            }
            FailureAction::CustomOp {
                op_name,
                args,
            } => {
                let operator = self
                    .sources
                    .custom_operator(op_name)
                    .ok_or_else(|| SourceError::NotRegistered(op_name.clone()))?;
                let args: Vec<String> =
                    args.iter().take(MAX_CUSTOM_OPERANDS).cloned().collect();
                let reply = operator.invoke("", &args)?;
                tracing::debug!(operator = %op_name, reply = %reply, "remediation operator dispatched");
                Ok(false)
            }
            FailureAction::HaltSiblings => Ok(true),
        }
    }
}

// ============================================================================
// SECTION: Walk State
// ============================================================================

/// Mutable state accumulated over one tree walk.
#[derive(Default)]
struct WalkState {
    /// Rule set outcome records in visit order.
    rule_sets: Vec<RuleSetReport>,
    /// Evaluation counters.
    counters: EvaluationCounters,
    /// Indicates a severe failure occurred anywhere in the walk.
    severe: bool,
}

/// Decided outcome of one rule set, consulted by the parent.
struct SetOutcome {
    /// Final verdict of the set.
    passed: bool,
    /// Indicates the parent must skip its remaining children.
    halt: bool,
}

/// Outcome of one rule evaluation.
struct RuleOutcome {
    /// Indicates the rule passed.
    passed: bool,
    /// Failure record when the rule failed.
    failure: Option<RuleFailure>,
}

impl RuleOutcome {
    /// Builds a passing outcome.
    const fn pass() -> Self {
        Self {
            passed: true,
            failure: None,
        }
    }

    /// Builds a failing outcome with its failure record.
    const fn fail(failure: RuleFailure) -> Self {
        Self {
            passed: false,
            failure: Some(failure),
        }
    }
}

// ============================================================================
// SECTION: Helper Functions
// ============================================================================

/// Selects the record a rule reads its target attribute from.
fn target_record<'a>(rule: &Rule, new: &'a Product, current: &'a Product) -> &'a Product {
    match rule.record {
        TargetRecord::New => new,
        TargetRecord::Current => current,
    }
}

/// Builds a pass or a set-severity failure outcome from a verdict.
fn verdict_outcome(
    set: &RuleSet,
    rule: &Rule,
    verdict: bool,
    observed: String,
    expected: String,
) -> RuleOutcome {
    if verdict {
        return RuleOutcome::pass();
    }
    let expected = if rule.negate {
        format!("not {expected}")
    } else {
        expected
    };
    RuleOutcome::fail(RuleFailure {
        ruleset_id: set.ruleset_id.clone(),
        rule_id: rule.rule_id.clone(),
        attr_name: rule.target_attr.clone(),
        observed,
        expected,
        operator: rule.op.name().to_string(),
        severity: set.severity,
    })
}

/// Builds a severe failure outcome for a local rule fault.
fn severe_outcome(set: &RuleSet, rule: &Rule, observed: String, expected: String) -> RuleOutcome {
    RuleOutcome::fail(RuleFailure {
        ruleset_id: set.ruleset_id.clone(),
        rule_id: rule.rule_id.clone(),
        attr_name: rule.target_attr.clone(),
        observed,
        expected,
        operator: rule.op.name().to_string(),
        severity: Severity::Severe,
    })
}

/// Combines rule verdicts under the set's mode.
///
/// Under disjunction a passing set discards provisional failures; an empty
/// rule list passes under conjunction and fails under disjunction.
fn combine_rule_verdicts(
    mode: EvalMode,
    passes: usize,
    failures: Vec<RuleFailure>,
) -> (bool, Vec<RuleFailure>) {
    match mode {
        EvalMode::And => {
            let passed = failures.is_empty();
            (passed, failures)
        }
        EvalMode::Or => {
            if passes > 0 {
                (true, Vec::new())
            } else {
                (false, failures)
            }
        }
    }
}

/// Merges a failed disjunction's failures into one record per set.
///
/// The record keeps the first failure's rule and attribute and joins the
/// expected descriptions of every alternative.
fn merge_alternatives(failures: Vec<RuleFailure>) -> Vec<RuleFailure> {
    if failures.len() <= 1 {
        return failures;
    }
    let severity = if failures.iter().any(|failure| failure.severity == Severity::Severe) {
        Severity::Severe
    } else {
        failures[0].severity
    };
    let expected =
        failures.iter().map(|failure| failure.expected.as_str()).collect::<Vec<_>>().join(" or ");
    let mut merged = failures;
    let mut base = merged.swap_remove(0);
    base.expected = expected;
    base.severity = severity;
    vec![base]
}

/// Assembles the current record from the attribute source map.
fn assemble_current(
    sources: &SourceRegistry,
    catalog: &AttributeCatalog,
) -> Result<Product, EvaluationError> {
    let mut product = Product::new();
    for (name, source) in sources.attribute_sources() {
        let attribute: &Attribute = catalog.by_name(name)?;
        let value = source.retrieve(name)?;
        product.set(attribute, value);
    }
    Ok(product)
}
