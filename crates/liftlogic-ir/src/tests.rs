//! Unit tests for the IR.

use std::sync::Arc;

use crate::{
    context::{Context, Vocabulary},
    domain::{DomainInfo, DomainRegistry},
    expr::Expr,
    set::IndexExpression,
    signature::{RandomVariableSignature, SignatureRegistry},
    simplify::simplify,
    IrError,
};

fn p(arg: Expr) -> Expr {
    Expr::rv("p", vec![arg])
}

fn q(arg: Expr) -> Expr {
    Expr::rv("q", vec![arg])
}

fn vocabulary(size: usize) -> Arc<Vocabulary> {
    let mut domains = DomainRegistry::new();
    domains
        .register(DomainInfo::finite("Universe", size))
        .unwrap();
    let mut signatures = SignatureRegistry::new();
    signatures.register(RandomVariableSignature::new("p", ["Universe"]));
    signatures.register(RandomVariableSignature::new("q", ["Universe"]));
    Arc::new(Vocabulary::new(domains, signatures))
}

#[test]
fn test_message_shaped_sum_of_conditionals() {
    // Sum over q(X) of a factor times an incoming message.
    let factor = Expr::ite(
        Expr::and(p(Expr::var("X")), q(Expr::var("X"))),
        Expr::ratio(6, 10),
        Expr::ratio(4, 10),
    );
    let message = Expr::ite(q(Expr::var("X")), Expr::ratio(3, 10), Expr::ratio(7, 10));
    let ctx = Context::default();
    let mut terms = Vec::new();
    for value in [true, false] {
        let assumed = ctx.with_assumption(&q(Expr::var("X")), value).unwrap();
        let product = Expr::times(vec![factor.clone(), message.clone()]);
        terms.push(simplify(&product, &assumed).unwrap());
    }
    let sum = simplify(&Expr::plus(terms), &ctx).unwrap();
    assert_eq!(sum.to_string(), "if p(X) then 0.46 else 0.4");
}

#[test]
fn test_lifted_product_of_factor_instances() {
    let ctx = Context::new(vocabulary(3));
    let factors = Expr::intensional_multiset(
        vec![IndexExpression::new("X")],
        Expr::ite(
            Expr::and(Expr::rv("r", vec![]), q(Expr::var("X"))),
            Expr::int(2),
            Expr::int(3),
        ),
        Expr::TRUE,
    );
    let given_q = ctx
        .with_assumption(&q(Expr::var("Y")), true)
        .unwrap();
    // Independent of X once q(X) is summed out elsewhere: only r matters.
    let summed = Expr::plus(vec![
        Expr::ite(Expr::rv("r", vec![]), Expr::int(2), Expr::int(3)),
        Expr::int(3),
    ]);
    let product = Expr::product(Expr::intensional_multiset(
        vec![IndexExpression::new("X")],
        summed,
        Expr::TRUE,
    ));
    assert_eq!(
        simplify(&product, &given_q).unwrap().to_string(),
        "if r then 125 else 216"
    );
    let symbolic = simplify(&Expr::product(factors), &ctx).unwrap();
    assert!(symbolic.contains_random_values());
}

#[test]
fn test_contradictory_assumptions_are_rejected() {
    let ctx = Context::default()
        .with_assumption(&p(Expr::constant("a")), true)
        .unwrap()
        .with_equality(&Expr::var("X"), &Expr::constant("a"))
        .unwrap();
    assert!(ctx.with_assumption(&p(Expr::var("X")), false).is_none());
    assert_eq!(simplify(&p(Expr::var("X")), &ctx).unwrap(), Expr::TRUE);
}

#[test]
fn test_division_by_zero_is_reported() {
    let e = Expr::divide(
        Expr::one(),
        Expr::minus(Expr::ratio(1, 2), Expr::ratio(1, 2)),
    );
    assert!(matches!(
        simplify(&e, &Context::default()),
        Err(IrError::DivisionByZero(_))
    ));
}

#[test]
fn test_sort_sizes_flow_into_counts() {
    let ctx = Context::new(vocabulary(4));
    let others = Expr::intensional_multiset(
        vec![IndexExpression::new("Y")],
        Expr::bracket(p(Expr::var("Y"))),
        Expr::neq(Expr::var("Y"), Expr::var("X")),
    );
    assert_eq!(
        simplify(&Expr::cardinality(others), &ctx).unwrap(),
        Expr::int(3)
    );
}

#[test]
fn test_serde_roundtrip_of_expressions() {
    let e = Expr::intensional_multiset(
        vec![IndexExpression::in_sort("X", "People")],
        Expr::bracket(Expr::ite(p(Expr::var("X")), Expr::ratio(1, 3), Expr::int(2))),
        Expr::neq(Expr::var("X"), Expr::constant("a")),
    );
    let json = serde_json::to_string(&e).unwrap();
    let back: Expr = serde_json::from_str(&json).unwrap();
    assert_eq!(back, e);
}
