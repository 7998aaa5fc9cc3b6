// ruletree-core/src/runtime/operators.rs
// ============================================================================
// Module: Rule Operator Semantics
// Description: Operator application over resolved operand strings.
// Purpose: Convert operand values into rule verdicts deterministically.
// Dependencies: crate::core, rust_decimal, thiserror
// ============================================================================

//! ## Overview
//! Operator semantics convert resolved operand strings into boolean verdicts
//! or computed values. Numeric semantics use decimals, never floats; a value
//! that fails to parse is a numeric fault reported as a severe rule failure
//! by the evaluator, not an evaluation abort. Lexical comparison is
//! byte-wise after kind-respecting normalization: dates compare as
//! `YYYYMMDD`, text compares raw.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::cmp::Ordering;
use std::str::FromStr;

use rust_decimal::Decimal;
use thiserror::Error;

use crate::core::attribute::AttrKind;
use crate::core::tree::ArithOp;
use crate::core::tree::CompareOp;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Local numeric faults reported as severe rule failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NumericFault {
    /// A value could not be parsed as a decimal.
    #[error("value is not numeric: {0:?}")]
    Parse(String),
    /// An arithmetic expression divided by zero.
    #[error("division by zero")]
    DivisionByZero,
}

// ============================================================================
// SECTION: Parsing
// ============================================================================

/// Parses a trimmed value as a decimal.
///
/// # Errors
///
/// Returns [`NumericFault::Parse`] when the value is not numeric.
pub fn parse_decimal(value: &str) -> Result<Decimal, NumericFault> {
    Decimal::from_str(value.trim()).map_err(|_| NumericFault::Parse(value.to_string()))
}

/// Normalizes a date value to `YYYYMMDD` form by stripping separators.
#[must_use]
pub fn normalize_date(value: &str) -> String {
    value.trim().chars().filter(|ch| !matches!(ch, '-' | '/' | '.')).collect()
}

// ============================================================================
// SECTION: Predicates
// ============================================================================

/// Returns true when the value is non-empty after trimming.
#[must_use]
pub fn is_populated(value: &str) -> bool {
    !value.trim().is_empty()
}

/// Compares two values under the attribute kind's semantics.
///
/// # Errors
///
/// Returns [`NumericFault::Parse`] when a numeric comparison receives a
/// non-numeric value on either side.
pub fn compare(kind: AttrKind, op: CompareOp, lhs: &str, rhs: &str) -> Result<bool, NumericFault> {
    let ordering = if kind.is_numeric() {
        parse_decimal(lhs)?.cmp(&parse_decimal(rhs)?)
    } else if kind == AttrKind::Date {
        normalize_date(lhs).cmp(&normalize_date(rhs))
    } else {
        lhs.cmp(rhs)
    };
    Ok(ordering_matches(op, ordering))
}

/// Returns true when the value equals any member, case-sensitive.
#[must_use]
pub fn in_set(value: &str, members: &[String]) -> bool {
    members.iter().any(|member| member == value)
}

/// Returns true when the value lies in the inclusive numeric range.
///
/// An inverted range (`lo > hi`) evaluates false without fault.
///
/// # Errors
///
/// Returns [`NumericFault::Parse`] when any side is not numeric.
pub fn in_range(value: &str, lo: &str, hi: &str) -> Result<bool, NumericFault> {
    let value = parse_decimal(value)?;
    let lo = parse_decimal(lo)?;
    let hi = parse_decimal(hi)?;
    if lo > hi {
        return Ok(false);
    }
    Ok(lo <= value && value <= hi)
}

/// Applies rule polarity to a raw verdict.
#[must_use]
pub const fn apply_polarity(verdict: bool, negate: bool) -> bool {
    verdict != negate
}

// ============================================================================
// SECTION: Arithmetic
// ============================================================================

/// Evaluates an arithmetic expression left to right over decimal operands.
///
/// The result is rendered as a fixed-point string with trailing zeros
/// stripped.
///
/// # Errors
///
/// Returns [`NumericFault`] on non-numeric operands or division by zero.
pub fn eval_arith(first: &str, steps: &[(ArithOp, String)]) -> Result<String, NumericFault> {
    let mut value = parse_decimal(first)?;
    for (op, operand) in steps {
        let rhs = parse_decimal(operand)?;
        value = match op {
            ArithOp::Add => value + rhs,
            ArithOp::Sub => value - rhs,
            ArithOp::Mul => value * rhs,
            ArithOp::Div => value.checked_div(rhs).ok_or(NumericFault::DivisionByZero)?,
        };
    }
    Ok(value.normalize().to_string())
}

// ============================================================================
// SECTION: Custom Verdicts
// ============================================================================

/// Interprets a custom operator reply as a verdict.
///
/// Returns `None` when the reply is neither a pass nor a fail marker; the
/// evaluator reports that as a severe failure of the rule.
#[must_use]
pub fn custom_verdict(reply: &str) -> Option<bool> {
    match reply.trim() {
        "1" | "true" => Some(true),
        "0" | "false" => Some(false),
        _ => None,
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Returns true when the ordering satisfies the comparison.
const fn ordering_matches(op: CompareOp, ordering: Ordering) -> bool {
    match op {
        CompareOp::Eq => ordering.is_eq(),
        CompareOp::Ne => ordering.is_ne(),
        CompareOp::Lt => ordering.is_lt(),
        CompareOp::Le => ordering.is_le(),
        CompareOp::Gt => ordering.is_gt(),
        CompareOp::Ge => ordering.is_ge(),
    }
}
