// tests/operators.rs
// ============================================================================
// Module: Operator Semantics Tests
// Description: Happy-path and fault coverage for rule operator semantics.
// Dependencies: ruletree-core
// ============================================================================
//! ## Overview
//! Validates comparison, membership, range, arithmetic, and custom verdict
//! semantics over resolved operand strings.

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

use ruletree_core::ArithOp;
use ruletree_core::AttrKind;
use ruletree_core::CompareOp;
use ruletree_core::NumericFault;
use ruletree_core::runtime::operators::apply_polarity;
use ruletree_core::runtime::operators::compare;
use ruletree_core::runtime::operators::custom_verdict;
use ruletree_core::runtime::operators::eval_arith;
use ruletree_core::runtime::operators::in_range;
use ruletree_core::runtime::operators::in_set;
use ruletree_core::runtime::operators::is_populated;
use ruletree_core::runtime::operators::normalize_date;

// ============================================================================
// SECTION: Populated
// ============================================================================

/// Verifies populated checks trim before testing emptiness.
#[test]
fn populated_trims_before_testing() {
    assert!(is_populated("value"));
    assert!(is_populated(" v "));
    assert!(!is_populated(""));
    assert!(!is_populated("   "));
}

/// Verifies polarity flips a verdict exactly when negated.
#[test]
fn polarity_flips_verdicts() {
    assert!(apply_polarity(true, false));
    assert!(!apply_polarity(true, true));
    assert!(apply_polarity(false, true));
    assert!(!apply_polarity(false, false));
}

// ============================================================================
// SECTION: Comparison
// ============================================================================

/// Verifies numeric comparison parses both sides as decimals.
#[test]
fn compare_numeric_orders_decimals() {
    assert!(compare(AttrKind::Integer, CompareOp::Ge, "30", "18").unwrap());
    assert!(compare(AttrKind::Decimal, CompareOp::Lt, "2.5", "10").unwrap());
    assert!(compare(AttrKind::Decimal, CompareOp::Eq, "1.50", "1.5").unwrap());
    assert!(!compare(AttrKind::Integer, CompareOp::Gt, "9", "10").unwrap());
}

/// Verifies numeric comparison faults on non-numeric input.
#[test]
fn compare_numeric_faults_on_garbage() {
    let result = compare(AttrKind::Integer, CompareOp::Ge, "abc", "18");
    assert!(matches!(result, Err(NumericFault::Parse(value)) if value == "abc"));

    let result = compare(AttrKind::Decimal, CompareOp::Le, "1", "not-a-number");
    assert!(matches!(result, Err(NumericFault::Parse(_))));
}

/// Verifies text comparison is byte-wise and case-sensitive.
#[test]
fn compare_text_is_byte_wise() {
    assert!(compare(AttrKind::Text, CompareOp::Eq, "US", "US").unwrap());
    assert!(!compare(AttrKind::Text, CompareOp::Eq, "us", "US").unwrap());
    assert!(compare(AttrKind::Text, CompareOp::Lt, "alpha", "beta").unwrap());
    assert!(compare(AttrKind::Enum, CompareOp::Ne, "A", "B").unwrap());
}

/// Verifies dates compare under separator-stripped normalization.
#[test]
fn compare_dates_normalize_separators() {
    assert!(compare(AttrKind::Date, CompareOp::Eq, "2024-06-01", "20240601").unwrap());
    assert!(compare(AttrKind::Date, CompareOp::Lt, "2023/12/31", "2024-01-01").unwrap());
    assert_eq!(normalize_date(" 2024-06-01 "), "20240601");
}

// ============================================================================
// SECTION: Membership and Range
// ============================================================================

/// Verifies set membership is exact and case-sensitive.
#[test]
fn membership_is_exact_and_case_sensitive() {
    let members = vec!["US".to_string(), "CA".to_string()];
    assert!(in_set("CA", &members));
    assert!(!in_set("ca", &members));
    assert!(!in_set("MX", &members));
}

/// Verifies inclusive bounds and the inverted-range rule.
#[test]
fn range_is_inclusive_and_inverted_ranges_fail() {
    assert!(in_range("5", "1", "10").unwrap());
    assert!(in_range("1", "1", "10").unwrap());
    assert!(in_range("10", "1", "10").unwrap());
    assert!(!in_range("11", "1", "10").unwrap());
    assert!(!in_range("5", "10", "1").unwrap());
}

/// Verifies range checks fault on non-numeric bounds.
#[test]
fn range_faults_on_non_numeric_bounds() {
    assert!(matches!(in_range("5", "low", "10"), Err(NumericFault::Parse(_))));
    assert!(matches!(in_range("five", "1", "10"), Err(NumericFault::Parse(_))));
}

// ============================================================================
// SECTION: Arithmetic
// ============================================================================

/// Verifies left-to-right evaluation over decimal operands.
#[test]
fn arith_evaluates_left_to_right() {
    let steps = vec![(ArithOp::Add, "2".to_string()), (ArithOp::Mul, "3".to_string())];
    assert_eq!(eval_arith("4", &steps).unwrap(), "18");

    let steps = vec![(ArithOp::Mul, "4".to_string())];
    assert_eq!(eval_arith("20", &steps).unwrap(), "80");
}

/// Verifies results strip trailing zeros.
#[test]
fn arith_strips_trailing_zeros() {
    let steps = vec![(ArithOp::Div, "4".to_string())];
    assert_eq!(eval_arith("10.00", &steps).unwrap(), "2.5");

    let steps = vec![(ArithOp::Mul, "1.000".to_string())];
    assert_eq!(eval_arith("80.0", &steps).unwrap(), "80");
}

/// Verifies division by zero is a fault, not a panic.
#[test]
fn arith_faults_on_division_by_zero() {
    let steps = vec![(ArithOp::Div, "0".to_string())];
    assert_eq!(eval_arith("10", &steps), Err(NumericFault::DivisionByZero));
}

/// Verifies non-numeric operands fault the expression.
#[test]
fn arith_faults_on_non_numeric_operands() {
    let steps = vec![(ArithOp::Add, "two".to_string())];
    assert!(matches!(eval_arith("1", &steps), Err(NumericFault::Parse(_))));
}

// ============================================================================
// SECTION: Custom Verdicts
// ============================================================================

/// Verifies the pass and fail verdict markers.
#[test]
fn custom_verdict_classifies_markers() {
    assert_eq!(custom_verdict("1"), Some(true));
    assert_eq!(custom_verdict("true"), Some(true));
    assert_eq!(custom_verdict("0"), Some(false));
    assert_eq!(custom_verdict("false"), Some(false));
    assert_eq!(custom_verdict(" true "), Some(true));
}

/// Verifies any other reply is no verdict at all.
#[test]
fn custom_verdict_rejects_other_replies() {
    assert_eq!(custom_verdict("maybe"), None);
    assert_eq!(custom_verdict("TRUE"), None);
    assert_eq!(custom_verdict(""), None);
    assert_eq!(custom_verdict("yes"), None);
}
