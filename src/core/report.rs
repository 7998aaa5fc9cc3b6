// ruletree-core/src/core/report.rs
// ============================================================================
// Module: Evaluation Report Model
// Description: Per-rule-set and per-rule outcome records for one evaluation.
// Purpose: Provide the immutable structured report returned by validate.
// Dependencies: crate::core, serde
// ============================================================================

//! ## Overview
//! The report captures one tree walk: an ordered list of rule set outcomes in
//! visit order, the rule failures recorded under each set, evaluation
//! counters, and the overall severity. Reports are plain data and immutable
//! once returned; no wire format is mandated beyond serde.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

use crate::core::identifiers::RuleId;
use crate::core::identifiers::RuleSetId;
use crate::core::tree::Severity;

// ============================================================================
// SECTION: Report Types
// ============================================================================

/// Overall severity of an evaluation report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportSeverity {
    /// No failures occurred.
    Clean,
    /// Failures occurred, none severe.
    Warning,
    /// At least one severe failure occurred.
    Severe,
}

/// One recorded rule failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleFailure {
    /// Rule set the failing rule belongs to.
    pub ruleset_id: RuleSetId,
    /// Failing rule identifier.
    pub rule_id: RuleId,
    /// Target attribute name.
    pub attr_name: String,
    /// Observed attribute value.
    pub observed: String,
    /// Description of the expected outcome.
    pub expected: String,
    /// Operator name.
    pub operator: String,
    /// Severity of the failure.
    pub severity: Severity,
}

/// Outcome record for one visited rule set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleSetReport {
    /// Rule set identifier.
    pub ruleset_id: RuleSetId,
    /// Rule set description.
    pub description: String,
    /// Final verdict of the set.
    pub passed: bool,
    /// Severity declared on the set.
    pub severity: Severity,
    /// Error message emitted on failure.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    /// Rule failures recorded under this set.
    pub failures: Vec<RuleFailure>,
}

/// Counters accumulated over one tree walk.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvaluationCounters {
    /// Rules evaluated.
    pub rules_evaluated: u64,
    /// Rules that failed.
    pub rules_failed: u64,
    /// Rule sets visited.
    pub rule_sets_evaluated: u64,
    /// Rule sets that failed.
    pub rule_sets_failed: u64,
}

/// Structured report produced by one evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleTreeReport {
    /// Overall severity of the evaluation.
    pub severity: ReportSeverity,
    /// Rule set outcomes in visit order; pruned sets are absent.
    pub rule_sets: Vec<RuleSetReport>,
    /// Evaluation counters.
    pub counters: EvaluationCounters,
}

impl RuleTreeReport {
    /// Returns true when every visited rule set passed.
    #[must_use]
    pub fn passed(&self) -> bool {
        self.rule_sets.iter().all(|set| set.passed)
    }

    /// Iterates all recorded rule failures in visit order.
    pub fn failures(&self) -> impl Iterator<Item = &RuleFailure> {
        self.rule_sets.iter().flat_map(|set| set.failures.iter())
    }
}
