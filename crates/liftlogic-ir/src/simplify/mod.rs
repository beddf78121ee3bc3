//! Simplification under a contextual constraint.
//!
//! [`simplify`] normalizes an expression into a decision tree whose
//! conditions are atoms (random variable values and equalities between
//! terms), pruning every branch the [`Context`] decides, and then compacts
//! boolean subtrees back into formulas. It is idempotent.

mod arith;
mod compact;
pub mod lifted;
pub mod tree;

use std::fmt::Debug;

use tracing::trace;

use crate::context::Context;
use crate::error::{IrError, Result};
use crate::expr::number::round_to_significant_digits;
use crate::expr::{Expr, Op};
use crate::set::{algebra, intensional, SetExpr};

pub use compact::{compact, is_formula, negate};
pub use tree::{branch_on, branch_on_formula, canonical_equality, is_atom, make_ite, map_leaves};

/// The simplification capability the rewriters call into.
pub trait Simplifier: Send + Sync + Debug {
    fn simplify(&self, expr: &Expr, ctx: &Context) -> Result<Expr>;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct DefaultSimplifier;

impl Simplifier for DefaultSimplifier {
    fn simplify(&self, expr: &Expr, ctx: &Context) -> Result<Expr> {
        simplify(expr, ctx)
    }
}

/// Simplifies `expr` under `ctx`.
pub fn simplify(expr: &Expr, ctx: &Context) -> Result<Expr> {
    let normalized = normalize(expr, ctx)?;
    let compacted = compact(&normalized);
    trace!(input = %expr, output = %compacted, "simplified");
    Ok(compacted)
}

/// Normal form: a decision tree over atoms with conditional-free leaves.
pub(crate) fn normalize(expr: &Expr, ctx: &Context) -> Result<Expr> {
    match expr {
        Expr::Bool(_) | Expr::Number(_) | Expr::Var(_) | Expr::Const(_) | Expr::Bracket(_) => {
            Ok(expr.clone())
        }
        Expr::RandomValue { .. } => {
            branch_on(expr, ctx, &|_| Ok(Expr::TRUE), &|_| Ok(Expr::FALSE))
        }
        Expr::Set(set) => match set.as_ref() {
            SetExpr::Extensional { kind, elements } => {
                let mut distinct: Vec<Expr> = Vec::with_capacity(elements.len());
                for element in elements {
                    if set.is_multiset() || !distinct.contains(element) {
                        distinct.push(element.clone());
                    }
                }
                Ok(Expr::set(SetExpr::Extensional {
                    kind: *kind,
                    elements: distinct,
                }))
            }
            SetExpr::Intensional { .. } => intensional::simplify_intensional(set, ctx),
        },
        Expr::Compound { op, args } => normalize_compound(*op, args, ctx),
    }
}

fn normalize_compound(op: Op, args: &[Expr], ctx: &Context) -> Result<Expr> {
    match (op, args) {
        (Op::Not, [arg]) => {
            let tree = normalize(arg, ctx)?;
            map_leaves(&tree, ctx, &|leaf, _| Ok(negate(leaf)))
        }
        (Op::And, _) => connective(true, args, ctx),
        (Op::Or, _) => connective(false, args, ctx),
        (Op::Implies, [premise, conclusion]) => normalize(
            &Expr::or(Expr::not(premise.clone()), conclusion.clone()),
            ctx,
        ),
        (Op::Equivalence, [left, right]) => {
            let tree = normalize(left, ctx)?;
            map_leaves(&tree, ctx, &|leaf, c| match leaf.as_bool() {
                Some(true) => normalize(right, c),
                Some(false) => normalize(&Expr::not(right.clone()), c),
                None => Err(IrError::Unsupported(format!("non-boolean operand {}", leaf))),
            })
        }
        (Op::IfThenElse, [condition, then_branch, else_branch]) => {
            let tree = normalize(condition, ctx)?;
            map_leaves(&tree, ctx, &|leaf, c| match leaf.as_bool() {
                Some(true) => normalize(then_branch, c),
                Some(false) => normalize(else_branch, c),
                None => Err(IrError::Unsupported(format!("non-boolean condition {}", leaf))),
            })
        }
        (Op::Equal, [_, _]) => {
            map_leaves_all(args, ctx, &|leaves, c| equality_of_leaves(&leaves[0], &leaves[1], c))
        }
        (Op::NotEqual, [left, right]) => {
            let equality = Expr::eq(left.clone(), right.clone());
            normalize(&Expr::not(equality), ctx)
        }
        (Op::Plus, _) => accumulate(Op::Plus, Expr::zero(), args, ctx),
        (Op::Times, _) => accumulate(Op::Times, Expr::one(), args, ctx),
        (Op::Minus | Op::Divide | Op::Exponentiation, [_, _]) => {
            map_leaves_all(args, ctx, &|leaves, c| fold(op, leaves, c))
        }
        (Op::Union, _) => algebra::union(args, ctx),
        (Op::SetDifference, [left, right]) => algebra::set_difference(left, right, ctx),
        (Op::Intersection, [left, right]) => algebra::intersection(left, right, ctx),
        (Op::In, [element, set]) => algebra::membership(element, set, ctx),
        (Op::Cardinality, [Expr::Const(sort)]) => Ok(match ctx.vocabulary().sort_size(sort) {
            Some(size) => Expr::int(size as i64),
            None => Expr::cardinality(Expr::constant(sort.clone())),
        }),
        (Op::Cardinality, [set]) => lifted::cardinality(set, ctx),
        (Op::Product, [set]) => lifted::product(set, ctx).map(|result| rounded(result, ctx)),
        (Op::LambdaApplication, [lambda, argument]) => beta_reduce(lambda, argument, ctx),
        (
            Op::Tuple | Op::MessageTo | Op::PreviousMessageTo | Op::Neighbors | Op::Lambda,
            _,
        ) => Ok(Expr::compound(op, args.to_vec())),
        _ => Err(IrError::IllegalArgument(format!(
            "{} applied to {} arguments",
            op.symbol(),
            args.len()
        ))),
    }
}

/// Normalizes `args` left to right, each under the context of the branch the
/// previous ones were decided in, and hands every combination of leaves to
/// `f`.
pub(crate) fn map_leaves_all(
    args: &[Expr],
    ctx: &Context,
    f: &dyn Fn(Vec<Expr>, &Context) -> Result<Expr>,
) -> Result<Expr> {
    fn go(
        rest: &[Expr],
        done: Vec<Expr>,
        ctx: &Context,
        f: &dyn Fn(Vec<Expr>, &Context) -> Result<Expr>,
    ) -> Result<Expr> {
        match rest.split_first() {
            None => f(done, ctx),
            Some((first, tail)) => {
                let tree = normalize(first, ctx)?;
                map_leaves(&tree, ctx, &|leaf, c| {
                    let mut next = done.clone();
                    next.push(leaf.clone());
                    go(tail, next, c, f)
                })
            }
        }
    }
    go(args, Vec::new(), ctx, f)
}

/// `and` (`conjunction == true`) or `or` with short-circuiting.
fn connective(conjunction: bool, args: &[Expr], ctx: &Context) -> Result<Expr> {
    let absorbing = Expr::Bool(!conjunction);
    let mut acc = Expr::Bool(conjunction);
    for arg in args {
        acc = map_leaves(&acc, ctx, &|leaf, c| match leaf.as_bool() {
            Some(value) if value != conjunction => Ok(absorbing.clone()),
            Some(_) => normalize(arg, c),
            None => {
                let rest = compact(&normalize(arg, c)?);
                Ok(match rest.as_bool() {
                    Some(value) if value == conjunction => leaf.clone(),
                    Some(_) => absorbing.clone(),
                    None if conjunction => Expr::and(leaf.clone(), rest),
                    None => Expr::or(leaf.clone(), rest),
                })
            }
        })?;
    }
    Ok(acc)
}

/// Sums and products folded one argument at a time; a zero factor stops
/// the product from looking at later arguments.
fn accumulate(op: Op, identity: Expr, args: &[Expr], ctx: &Context) -> Result<Expr> {
    let mut acc = identity;
    for arg in args {
        acc = map_leaves(&acc, ctx, &|leaf, c| {
            if op == Op::Times && leaf.is_zero() {
                return Ok(Expr::zero());
            }
            let tree = normalize(arg, c)?;
            map_leaves(&tree, c, &|other, c| fold(op, vec![leaf.clone(), other.clone()], c))
        })?;
    }
    Ok(acc)
}

/// Folds arithmetic on leaves, rounded to the context's numeric precision.
pub(crate) fn fold(op: Op, leaves: Vec<Expr>, ctx: &Context) -> Result<Expr> {
    arith::fold(op, leaves).map(|result| rounded(result, ctx))
}

/// Numbers of `expr` rounded to the context's numeric precision, if any.
fn rounded(expr: Expr, ctx: &Context) -> Expr {
    match ctx.numeric_precision() {
        Some(digits) => expr.replace_all(&|node| match node {
            Expr::Number(n) => Some(Expr::Number(round_to_significant_digits(n, digits))),
            _ => None,
        }),
        None => expr,
    }
}

/// Values whose equality is decided syntactically once their parts are.
fn is_constructed(expr: &Expr) -> bool {
    match expr {
        Expr::Bracket(_) | Expr::RandomValue { .. } => true,
        Expr::Set(set) => set.is_extensional(),
        Expr::Compound { op, .. } => matches!(
            op,
            Op::Tuple | Op::MessageTo | Op::PreviousMessageTo | Op::Neighbors
        ),
        _ => false,
    }
}

fn is_value(expr: &Expr) -> bool {
    matches!(expr, Expr::Bool(_) | Expr::Number(_) | Expr::Const(_))
}

/// `left = right` for two conditional-free leaves.
pub(crate) fn equality_of_leaves(left: &Expr, right: &Expr, ctx: &Context) -> Result<Expr> {
    if left == right {
        return Ok(Expr::TRUE);
    }
    if left.is_term() && right.is_term() {
        let atom = canonical_equality(left, right);
        return branch_on(&atom, ctx, &|_| Ok(Expr::TRUE), &|_| Ok(Expr::FALSE));
    }
    match (left, right) {
        (Expr::Number(_), Expr::Number(_)) | (Expr::Bool(_), Expr::Bool(_)) => Ok(Expr::FALSE),
        _ if is_constructed(left) && is_constructed(right) => {
            match left.unification_equalities(right) {
                None => Ok(Expr::FALSE),
                Some(pairs) => {
                    let equalities = pairs.into_iter().map(|(a, b)| Expr::eq(a, b)).collect();
                    normalize(&Expr::and_all(equalities), ctx)
                }
            }
        }
        _ if (is_value(left) && (is_value(right) || is_constructed(right)))
            || (is_value(right) && is_constructed(left)) =>
        {
            Ok(Expr::FALSE)
        }
        _ => Ok(Expr::eq(left.clone(), right.clone())),
    }
}

/// `(lambda v : body)(value)` once the body no longer waits on messages.
fn beta_reduce(lambda: &Expr, argument: &Expr, ctx: &Context) -> Result<Expr> {
    let (parameter, body) = match lambda.args_of(Op::Lambda) {
        Some([parameter, body]) => (parameter, body),
        _ => {
            return Err(IrError::IllegalArgument(format!(
                "{} is not a lambda expression",
                lambda
            )))
        }
    };
    let pending = body.contains_op(Op::PreviousMessageTo) || body.contains_op(Op::MessageTo);
    let tree = normalize(argument, ctx)?;
    map_leaves(&tree, ctx, &|leaf, c| match (leaf.as_bool(), parameter) {
        (Some(value), Expr::RandomValue { .. }) if !pending => {
            match c.with_assumption(parameter, value) {
                Some(assumed) => normalize(body, &assumed),
                None => Err(IrError::IllegalArgument(format!(
                    "{} cannot be {} here",
                    parameter, value
                ))),
            }
        }
        _ => Ok(Expr::apply_lambda(lambda.clone(), leaf.clone())),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{DomainInfo, DomainRegistry};
    use crate::context::Vocabulary;
    use crate::signature::SignatureRegistry;
    use std::sync::Arc;

    fn p(arg: &str) -> Expr {
        Expr::rv("p", vec![Expr::var(arg)])
    }

    fn q(arg: &str) -> Expr {
        Expr::rv("q", vec![Expr::var(arg)])
    }

    fn s(expr: &Expr) -> Expr {
        simplify(expr, &Context::default()).unwrap()
    }

    #[test]
    fn test_substituting_random_variable_values() {
        let e = Expr::ite(
            Expr::and(p("X"), q("X")),
            Expr::int(1),
            Expr::int(0),
        );
        let ctx = Context::default().with_assumption(&q("X"), true).unwrap();
        assert_eq!(
            simplify(&e, &ctx).unwrap(),
            Expr::ite(p("X"), Expr::int(1), Expr::int(0))
        );
        let ctx = Context::default().with_assumption(&q("X"), false).unwrap();
        assert_eq!(simplify(&e, &ctx).unwrap(), Expr::int(0));
    }

    #[test]
    fn test_sums_of_conditionals_merge_leaves() {
        let e = Expr::plus(vec![
            Expr::ite(p("X"), Expr::ratio(6, 10), Expr::ratio(4, 10)),
            Expr::ratio(4, 10),
        ]);
        assert_eq!(
            s(&e),
            Expr::ite(p("X"), Expr::one(), Expr::ratio(4, 5))
        );
        assert_eq!(s(&e).to_string(), "if p(X) then 1 else 0.8");
    }

    #[test]
    fn test_tautologies_vanish() {
        let e = Expr::ite(
            Expr::and(
                Expr::rv("r", vec![]),
                Expr::or(p("X"), Expr::not(p("X"))),
            ),
            Expr::ratio(2, 10),
            Expr::ratio(3, 10),
        );
        assert_eq!(s(&e).to_string(), "if r then 0.2 else 0.3");
    }

    #[test]
    fn test_simplify_is_idempotent() {
        let e = Expr::ite(
            Expr::or(
                Expr::eq(Expr::var("X"), Expr::constant("a")),
                Expr::and(p("X"), Expr::neq(Expr::var("Y"), Expr::var("X"))),
            ),
            Expr::ite(q("Y"), Expr::int(2), Expr::int(3)),
            Expr::int(3),
        );
        let once = s(&e);
        assert_eq!(s(&once), once);
    }

    #[test]
    fn test_equality_of_brackets_unifies() {
        let e = Expr::eq(
            Expr::rv_ref("p", vec![Expr::var("X")]),
            Expr::rv_ref("p", vec![Expr::constant("a")]),
        );
        assert_eq!(s(&e), Expr::eq(Expr::var("X"), Expr::constant("a")));
        let e = Expr::eq(
            Expr::rv_ref("p", vec![Expr::var("X")]),
            Expr::rv_ref("q", vec![Expr::var("X")]),
        );
        assert_eq!(s(&e), Expr::FALSE);
    }

    #[test]
    fn test_cardinality_of_sorts() {
        let mut domains = DomainRegistry::new();
        domains.register(DomainInfo::finite("People", 10)).unwrap();
        let ctx = Context::new(Arc::new(Vocabulary::new(domains, SignatureRegistry::new())));
        let sized = Expr::cardinality(Expr::constant("People"));
        assert_eq!(simplify(&sized, &ctx).unwrap(), Expr::int(10));
        let unsized_sort = Expr::cardinality(Expr::constant("Cities"));
        assert_eq!(simplify(&unsized_sort, &ctx).unwrap(), unsized_sort);
    }

    #[test]
    fn test_beta_reduction_waits_for_messages() {
        let marker = Expr::previous_message_to(
            Expr::rv_ref("p", vec![Expr::var("X")]),
            Expr::bracket(Expr::ite(p("X"), Expr::int(2), Expr::int(1))),
        );
        let pending = Expr::apply_lambda(Expr::lambda(p("X"), marker), p("X"));
        let ctx = Context::default().with_assumption(&p("X"), true).unwrap();
        let reduced = simplify(&pending, &ctx).unwrap();
        assert!(reduced.contains_previous_messages());
        assert_eq!(reduced.args_of(Op::LambdaApplication).unwrap()[1], Expr::TRUE);

        let ready = Expr::apply_lambda(
            Expr::lambda(p("X"), Expr::ite(p("X"), Expr::ratio(3, 10), Expr::ratio(7, 10))),
            Expr::TRUE,
        );
        assert_eq!(s(&ready), Expr::ratio(3, 10));
    }

    #[test]
    fn test_boolean_arithmetic_is_rejected() {
        let e = Expr::plus(vec![Expr::TRUE, Expr::one()]);
        assert!(matches!(
            simplify(&e, &Context::default()),
            Err(IrError::IllegalArgument(_))
        ));
    }

    #[test]
    fn test_numeric_precision_bounds_arithmetic() {
        let ctx = Context::default().with_numeric_precision(4);
        let third = Expr::divide(Expr::one(), Expr::int(3));
        assert_eq!(simplify(&third, &ctx).unwrap(), Expr::ratio(3333, 10000));
        assert_eq!(s(&third), Expr::ratio(1, 3));

        let tiny = simplify(&Expr::pow(Expr::ratio(3, 10), Expr::int(40)), &ctx).unwrap();
        assert!(!tiny.is_zero());
        assert_eq!(simplify(&tiny, &ctx).unwrap(), tiny);

        let weighted = Expr::ite(
            p("X"),
            Expr::times(vec![Expr::ratio(1, 7), Expr::int(2)]),
            Expr::ratio(5, 7),
        );
        assert_eq!(
            simplify(&weighted, &ctx).unwrap(),
            Expr::ite(p("X"), Expr::ratio(2857, 10000), Expr::ratio(5, 7))
        );
    }
}
