//! Property tests for the rule module
//!
//! Checks parsing, operator semantics and logical composition against
//! plain Rust evaluation of the same expressions.

use std::sync::Arc;

use proptest::prelude::*;

use crate::rule::ast::{LogicalOp, Node, Operator, Record, Value};
use crate::rule::cache::check_rule;
use crate::rule::combiner::combine;
use crate::rule::evaluator::evaluate;
use crate::rule::parser::create_rule;

// ═══════════════════════════════════════════════════════════════════════════
// Strategy generators for property tests
// ═══════════════════════════════════════════════════════════════════════════

/// Generate numeric field names
fn field_name_strategy() -> impl Strategy<Value = &'static str> {
    prop_oneof![Just("age"), Just("salary"), Just("experience"), Just("score"),]
}

/// Generate comparison operators
fn comparison_operator_strategy() -> impl Strategy<Value = &'static str> {
    prop_oneof![
        Just(">"),
        Just("<"),
        Just(">="),
        Just("<="),
        Just("="),
        Just("!="),
    ]
}

/// Generate a simple numeric condition string
fn simple_condition_strategy() -> impl Strategy<Value = String> {
    (field_name_strategy(), comparison_operator_strategy(), -100..=100i64)
        .prop_map(|(field, op, val)| format!("{} {} {}", field, op, val))
}

/// Generate a record with every numeric field present
fn record_strategy() -> impl Strategy<Value = Record> {
    (-100..=100i64, -100..=100i64, -100..=100i64, -100..=100i64).prop_map(
        |(age, salary, experience, score)| {
            [
                ("age", age),
                ("salary", salary),
                ("experience", experience),
                ("score", score),
            ]
            .into_iter()
            .map(|(k, v)| (k.to_string(), Value::Integer(v)))
            .collect()
        },
    )
}

/// Generate a small random expression tree over a, b and c
fn tree_strategy() -> impl Strategy<Value = Node> {
    let leaf = (prop_oneof![Just("a"), Just("b"), Just("c")], -5..=5i64)
        .prop_map(|(field, val)| Node::condition(field, Operator::Greater, val));
    leaf.prop_recursive(4, 16, 2, |inner| {
        (inner.clone(), inner, any::<bool>()).prop_map(|(l, r, is_and)| {
            if is_and {
                Node::and(l, r)
            } else {
                Node::or(l, r)
            }
        })
    })
}

/// Generate a literal of any type
///
/// Strings never hold a `"`, since one holding both quote characters has no
/// rule text form.
fn literal_strategy() -> impl Strategy<Value = Value> {
    prop_oneof![
        any::<bool>().prop_map(Value::Boolean),
        any::<i64>().prop_map(Value::Integer),
        any::<f64>()
            .prop_filter("finite", |x| x.is_finite())
            .prop_map(Value::Float),
        "[a-zA-Z0-9 _']{0,8}".prop_map(Value::String),
    ]
}

fn operator_strategy() -> impl Strategy<Value = Operator> {
    prop_oneof![
        Just(Operator::Greater),
        Just(Operator::Less),
        Just(Operator::GreaterEqual),
        Just(Operator::LessEqual),
        Just(Operator::Equal),
        Just(Operator::NotEqual),
    ]
}

/// Generate a tree mixing every operator and literal type
fn mixed_tree_strategy() -> impl Strategy<Value = Node> {
    let leaf = ("[a-z][a-z0-9_.]{0,6}", operator_strategy(), literal_strategy())
        .prop_filter("not a keyword", |(field, _, _)| {
            !matches!(field.as_str(), "true" | "false")
        })
        .prop_map(|(field, op, value)| Node::condition(field, op, value));
    leaf.prop_recursive(5, 24, 3, |inner| {
        (inner.clone(), inner, any::<bool>()).prop_map(|(l, r, is_and)| {
            if is_and {
                Node::and(l, r)
            } else {
                Node::or(l, r)
            }
        })
    })
}

fn abc_record_strategy() -> impl Strategy<Value = Record> {
    (-6..=6i64, -6..=6i64, -6..=6i64).prop_map(|(a, b, c)| {
        [("a", a), ("b", b), ("c", c)]
            .into_iter()
            .map(|(k, v)| (k.to_string(), Value::Integer(v)))
            .collect()
    })
}

fn int(record: &Record, field: &str) -> i64 {
    match record[field] {
        Value::Integer(v) => v,
        _ => unreachable!(),
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Property Tests
// ═══════════════════════════════════════════════════════════════════════════

proptest! {
    /// Simple conditions should parse without error
    #[test]
    fn prop_simple_condition_parses(cond in simple_condition_strategy()) {
        let result = create_rule(&cond);
        prop_assert!(result.is_ok(), "Failed to parse: {}", cond);
    }

    /// Comparison operators should be mathematically correct
    #[test]
    fn prop_comparison_operators(value in -50..=50i64, threshold in -50..=50i64) {
        let record: Record = [("age".to_string(), Value::Integer(value))].into_iter().collect();
        let check = |rule: String| evaluate(&create_rule(&rule).unwrap(), &record).unwrap();

        prop_assert_eq!(check(format!("age > {}", threshold)), value > threshold);
        prop_assert_eq!(check(format!("age < {}", threshold)), value < threshold);
        prop_assert_eq!(check(format!("age >= {}", threshold)), value >= threshold);
        prop_assert_eq!(check(format!("age <= {}", threshold)), value <= threshold);
        prop_assert_eq!(check(format!("age = {}", threshold)), value == threshold);
        prop_assert_eq!(check(format!("age != {}", threshold)), value != threshold);
    }

    /// AND binds tighter than OR
    #[test]
    fn prop_and_binds_tighter(
        ta in -10..=10i64,
        tb in -10..=10i64,
        tc in -10..=10i64,
        record in abc_record_strategy()
    ) {
        let rule = format!("a > {} AND b > {} OR c > {}", ta, tb, tc);
        let result = evaluate(&create_rule(&rule).unwrap(), &record).unwrap();
        let (a, b, c) = (int(&record, "a"), int(&record, "b"), int(&record, "c"));
        prop_assert_eq!(result, (a > ta && b > tb) || c > tc, "Rule: {}", rule);
    }

    /// Parentheses override precedence
    #[test]
    fn prop_parentheses_group(
        ta in -10..=10i64,
        tb in -10..=10i64,
        tc in -10..=10i64,
        record in abc_record_strategy()
    ) {
        let rule = format!("(a > {} OR b > {}) AND c > {}", ta, tb, tc);
        let result = evaluate(&create_rule(&rule).unwrap(), &record).unwrap();
        let (a, b, c) = (int(&record, "a"), int(&record, "b"), int(&record, "c"));
        prop_assert_eq!(result, (a > ta || b > tb) && c > tc, "Rule: {}", rule);
    }

    /// Rendering a tree and parsing it back yields the same tree
    #[test]
    fn prop_display_round_trip(tree in mixed_tree_strategy()) {
        let reparsed = create_rule(&tree.to_string()).unwrap();
        prop_assert_eq!(reparsed, tree);
    }

    /// JSON serialization preserves the tree
    #[test]
    fn prop_json_round_trip(tree in mixed_tree_strategy()) {
        let restored = Node::from_json(&tree.to_json().unwrap()).unwrap();
        prop_assert_eq!(restored, tree);
    }

    /// Combining a single tree evaluates identically to the tree
    #[test]
    fn prop_combine_identity(tree in tree_strategy(), record in abc_record_strategy()) {
        let tree = Arc::new(tree);
        let combined = combine(&[tree.clone()], LogicalOp::And).unwrap();
        prop_assert_eq!(
            evaluate(&combined, &record).unwrap(),
            evaluate(&tree, &record).unwrap()
        );
    }

    /// Combining under AND / OR matches folding the individual verdicts
    #[test]
    fn prop_combine_matches_fold(
        trees in prop::collection::vec(tree_strategy(), 1..=4),
        record in abc_record_strategy()
    ) {
        let trees: Vec<Arc<Node>> = trees.into_iter().map(Arc::new).collect();
        let verdicts: Vec<bool> = trees
            .iter()
            .map(|t| evaluate(t, &record).unwrap())
            .collect();

        let all = combine(&trees, LogicalOp::And).unwrap();
        prop_assert_eq!(evaluate(&all, &record).unwrap(), verdicts.iter().all(|v| *v));

        let any = combine(&trees, LogicalOp::Or).unwrap();
        prop_assert_eq!(evaluate(&any, &record).unwrap(), verdicts.iter().any(|v| *v));
    }

    /// Missing fields fail the condition whatever the operator
    #[test]
    fn prop_missing_field_is_false(cond in simple_condition_strategy()) {
        let record = Record::new();
        prop_assert!(!evaluate(&create_rule(&cond).unwrap(), &record).unwrap());
    }

    /// Cache should return same results as direct parsing
    #[test]
    fn prop_cache_consistency(
        cond in simple_condition_strategy(),
        record in record_strategy()
    ) {
        let direct = evaluate(&create_rule(&cond).unwrap(), &record).unwrap();
        let cached1 = check_rule(&cond, &record).unwrap();
        let cached2 = check_rule(&cond, &record).unwrap();

        prop_assert_eq!(direct, cached1);
        prop_assert_eq!(cached1, cached2);
    }
}
