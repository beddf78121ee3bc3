//! Property-based tests for the liftlogic IR
//!
//! Random formulas and potentials over a handful of atoms check that
//! simplification is idempotent and never changes the value an expression
//! takes once every atom is decided. Ground extensional sets check the set
//! difference and membership laws.

use std::collections::BTreeSet;

use num_rational::BigRational;
use proptest::prelude::*;
use liftlogic_ir::{
    format_rational, membership, parse_rational, set_difference, simplify, union, Context, Expr,
};

// ===== Strategies for generating test data =====

fn arb_term() -> impl Strategy<Value = Expr> {
    prop_oneof![
        Just(Expr::var("X")),
        Just(Expr::var("Y")),
        Just(Expr::constant("a")),
        Just(Expr::constant("b")),
    ]
}

fn arb_atom() -> impl Strategy<Value = Expr> {
    prop_oneof![
        arb_term().prop_map(|t| Expr::rv("p", vec![t])),
        arb_term().prop_map(|t| Expr::rv("q", vec![t])),
        (arb_term(), arb_term()).prop_map(|(a, b)| Expr::eq(a, b)),
    ]
}

fn arb_formula(depth: u32) -> impl Strategy<Value = Expr> {
    arb_atom().prop_recursive(depth, 32, 2, |inner| {
        prop_oneof![
            inner.clone().prop_map(Expr::not),
            (inner.clone(), inner.clone()).prop_map(|(a, b)| Expr::and(a, b)),
            (inner.clone(), inner.clone()).prop_map(|(a, b)| Expr::or(a, b)),
            (inner.clone(), inner).prop_map(|(a, b)| Expr::implies(a, b)),
        ]
    })
}

fn arb_potential() -> impl Strategy<Value = Expr> {
    let leaf = (1i64..10, 1i64..10).prop_map(|(n, d)| Expr::ratio(n, d));
    let conditional = (arb_formula(2), leaf.clone(), leaf.clone())
        .prop_map(|(c, t, e)| Expr::ite(c, t, e));
    prop::collection::vec(conditional, 1..3).prop_map(Expr::times)
}

/// A context deciding every atom the strategies can produce.
fn arb_full_context() -> impl Strategy<Value = Context> {
    (
        prop::bool::ANY,
        prop::bool::ANY,
        prop::collection::vec(prop::bool::ANY, 4),
    )
        .prop_map(|(x_is_a, y_is_a, values)| {
            let pick = |is_a: bool| Expr::constant(if is_a { "a" } else { "b" });
            let mut ctx = Context::default()
                .with_equality(&Expr::var("X"), &pick(x_is_a))
                .and_then(|c| c.with_equality(&Expr::var("Y"), &pick(y_is_a)))
                .unwrap_or_default();
            let grounds = [
                Expr::rv("p", vec![Expr::constant("a")]),
                Expr::rv("p", vec![Expr::constant("b")]),
                Expr::rv("q", vec![Expr::constant("a")]),
                Expr::rv("q", vec![Expr::constant("b")]),
            ];
            for (ground, value) in grounds.iter().zip(values) {
                ctx = ctx.with_assumption(ground, value).unwrap_or(ctx);
            }
            ctx
        })
}

/// Distinct ground constants in arbitrary order.
fn arb_ground_uniset() -> impl Strategy<Value = Vec<String>> {
    prop::collection::btree_set(0usize..6, 0..5)
        .prop_map(|names| names.into_iter().map(|i| format!("c{}", i)).collect::<Vec<_>>())
        .prop_shuffle()
}

fn uniset_of(names: &[String]) -> Expr {
    Expr::uniset(names.iter().map(Expr::constant).collect())
}

fn element_names(set: &Expr) -> BTreeSet<String> {
    set.as_set()
        .and_then(|s| s.elements())
        .unwrap_or(&[])
        .iter()
        .map(|e| e.to_string())
        .collect()
}

// ===== Property Tests =====

proptest! {
    #[test]
    fn prop_simplify_is_idempotent(e in arb_potential()) {
        let ctx = Context::default();
        let once = simplify(&e, &ctx).unwrap();
        let twice = simplify(&once, &ctx).unwrap();
        prop_assert_eq!(once, twice);
    }

    #[test]
    fn prop_simplified_formula_keeps_its_value(f in arb_formula(3), full in arb_full_context()) {
        let simplified = simplify(&f, &Context::default()).unwrap();
        let direct = simplify(&f, &full).unwrap();
        let via_simplified = simplify(&simplified, &full).unwrap();
        prop_assert!(direct.as_bool().is_some());
        prop_assert_eq!(direct, via_simplified);
    }

    #[test]
    fn prop_simplified_potential_keeps_its_value(e in arb_potential(), full in arb_full_context()) {
        let simplified = simplify(&e, &Context::default()).unwrap();
        let direct = simplify(&e, &full).unwrap();
        prop_assert!(direct.as_number().is_some());
        prop_assert_eq!(direct, simplify(&simplified, &full).unwrap());
    }

    #[test]
    fn prop_rationals_print_and_parse_back(n in -10_000i64..10_000, d in 1i64..1_000) {
        let value = BigRational::new(n.into(), d.into());
        prop_assert_eq!(parse_rational(&format_rational(&value)), Some(value));
    }

    #[test]
    fn prop_ground_difference_removes_exactly_the_subtrahend(
        left in arb_ground_uniset(),
        right in arb_ground_uniset(),
    ) {
        let ctx = Context::default();
        let difference = set_difference(&uniset_of(&left), &uniset_of(&right), &ctx).unwrap();
        let expected: BTreeSet<String> = left
            .iter()
            .filter(|name| !right.contains(name))
            .cloned()
            .collect();
        prop_assert!(difference.as_set().map_or(false, |s| s.is_extensional()));
        prop_assert_eq!(element_names(&difference), expected);
    }

    #[test]
    fn prop_difference_of_a_set_with_itself_is_empty(names in arb_ground_uniset()) {
        let set = uniset_of(&names);
        let mut reversed = names.clone();
        reversed.reverse();
        let difference = set_difference(&set, &uniset_of(&reversed), &Context::default()).unwrap();
        prop_assert!(difference.is_empty_set());
    }

    #[test]
    fn prop_union_minus_right_keeps_only_left(
        left in arb_ground_uniset(),
        right in arb_ground_uniset(),
    ) {
        let ctx = Context::default();
        let joined = union(&[uniset_of(&left), uniset_of(&right)], &ctx).unwrap();
        let difference = set_difference(&joined, &uniset_of(&right), &ctx).unwrap();
        let remaining = simplify(
            &Expr::set_difference(difference, uniset_of(&left)),
            &ctx,
        )
        .unwrap();
        prop_assert!(remaining.is_empty_set());
    }

    #[test]
    fn prop_ground_membership_is_decided(names in arb_ground_uniset(), probe in 0usize..6) {
        let element = Expr::constant(format!("c{}", probe));
        let result = membership(&element, &uniset_of(&names), &Context::default()).unwrap();
        let expected = names.contains(&format!("c{}", probe));
        prop_assert_eq!(result, Expr::bool(expected));
    }
}
