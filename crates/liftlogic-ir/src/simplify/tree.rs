//! Decision trees: branching on atoms under a context.
//!
//! A normalized expression is a tree of `if atom then .. else ..` nodes whose
//! atoms are random variable values or equalities between terms, and whose
//! leaves contain no conditionals.

use crate::context::{Context, Lookup};
use crate::error::IrError;
use crate::expr::{Expr, Op};

use super::normalize;

/// What a context says about an atom.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Decision {
    Known(bool),
    /// Decidable once this equality atom is decided.
    Split(Expr),
    Unknown,
}

/// Atoms are the conditions allowed in a normalized tree.
pub fn is_atom(expr: &Expr) -> bool {
    match expr {
        Expr::RandomValue { .. } => true,
        _ => matches!(
            expr.args_of(Op::Equal),
            Some([a, b]) if a.is_term() && b.is_term()
        ),
    }
}

/// `a = b` with variables first, then in lexicographic order.
pub fn canonical_equality(a: &Expr, b: &Expr) -> Expr {
    let swap = match (a, b) {
        (Expr::Const(_), Expr::Var(_)) => true,
        (Expr::Var(x), Expr::Var(y)) => x > y,
        _ => false,
    };
    if swap {
        Expr::eq(b.clone(), a.clone())
    } else {
        Expr::eq(a.clone(), b.clone())
    }
}

pub fn decide_atom(atom: &Expr, ctx: &Context) -> Decision {
    match atom {
        Expr::RandomValue { .. } => match ctx.lookup_random_value(atom) {
            Lookup::Known(value) => Decision::Known(value),
            Lookup::Split(x, y) => Decision::Split(canonical_equality(&x, &y)),
            Lookup::Unknown => Decision::Unknown,
        },
        _ => match atom.args_of(Op::Equal) {
            Some([a, b]) => match ctx.are_equal(a, b) {
                Some(value) => Decision::Known(value),
                None => Decision::Unknown,
            },
            _ => Decision::Unknown,
        },
    }
}

/// `if atom then t else e`, collapsing identical branches.
pub fn make_ite(atom: Expr, then_branch: Expr, else_branch: Expr) -> Expr {
    if then_branch == else_branch {
        then_branch
    } else {
        Expr::ite(atom, then_branch, else_branch)
    }
}

/// Continue with `then_fn` in the context where `atom` holds and with
/// `else_fn` where it does not, joining both into a conditional when the
/// context does not decide the atom.
pub fn branch_on<E: From<IrError>>(
    atom: &Expr,
    ctx: &Context,
    then_fn: &dyn Fn(&Context) -> Result<Expr, E>,
    else_fn: &dyn Fn(&Context) -> Result<Expr, E>,
) -> Result<Expr, E> {
    match decide_atom(atom, ctx) {
        Decision::Known(true) => then_fn(ctx),
        Decision::Known(false) => else_fn(ctx),
        Decision::Split(equality) => branch_on(
            &equality,
            ctx,
            &|c| branch_on(atom, c, then_fn, else_fn),
            &|c| branch_on(atom, c, then_fn, else_fn),
        ),
        Decision::Unknown => {
            match (ctx.with_literal(atom, true), ctx.with_literal(atom, false)) {
                (Some(positive), Some(negative)) => {
                    let then_branch = then_fn(&positive)?;
                    let else_branch = else_fn(&negative)?;
                    Ok(make_ite(atom.clone(), then_branch, else_branch))
                }
                (Some(positive), None) => then_fn(&positive),
                (None, Some(negative)) => else_fn(&negative),
                (None, None) => Err(IrError::IllegalArgument(format!(
                    "contradictory context {}",
                    ctx.to_formula()
                ))
                .into()),
            }
        }
    }
}

/// Rebuild a tree, replacing every leaf reachable under `ctx` by `f(leaf,
/// context at that leaf)`. Unreachable branches are dropped.
pub fn map_leaves<E: From<IrError>>(
    tree: &Expr,
    ctx: &Context,
    f: &dyn Fn(&Expr, &Context) -> Result<Expr, E>,
) -> Result<Expr, E> {
    match tree.ite_parts() {
        Some((condition, then_branch, else_branch)) if is_atom(condition) => branch_on(
            condition,
            ctx,
            &|c| map_leaves(then_branch, c, f),
            &|c| map_leaves(else_branch, c, f),
        ),
        Some((condition, then_branch, else_branch)) => {
            let condition = normalize(condition, ctx)?;
            map_leaves(&condition, ctx, &|leaf, c| match leaf.as_bool() {
                Some(true) => map_leaves(then_branch, c, f),
                Some(false) => map_leaves(else_branch, c, f),
                None => Err(IrError::Unsupported(format!(
                    "non-boolean condition {}",
                    leaf
                ))
                .into()),
            })
        }
        None => f(tree, ctx),
    }
}

/// Branch on a formula: normalize it, then continue with `then_fn` on its
/// true leaves and `else_fn` on its false leaves.
pub fn branch_on_formula<E: From<IrError>>(
    formula: &Expr,
    ctx: &Context,
    then_fn: &dyn Fn(&Context) -> Result<Expr, E>,
    else_fn: &dyn Fn(&Context) -> Result<Expr, E>,
) -> Result<Expr, E> {
    let tree = normalize(formula, ctx)?;
    map_leaves(&tree, ctx, &|leaf, c| match leaf.as_bool() {
        Some(true) => then_fn(c),
        Some(false) => else_fn(c),
        None => Err(IrError::Unsupported(format!("non-boolean condition {}", leaf)).into()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn x_eq(name: &str) -> Expr {
        Expr::eq(Expr::var("X"), Expr::constant(name))
    }

    #[test]
    fn test_canonical_equality_orients_variables_first() {
        assert_eq!(
            canonical_equality(&Expr::constant("a"), &Expr::var("X")),
            x_eq("a")
        );
        assert_eq!(
            canonical_equality(&Expr::var("Y"), &Expr::var("X")),
            Expr::eq(Expr::var("X"), Expr::var("Y"))
        );
    }

    #[test]
    fn test_branch_on_prunes_decided_atoms() {
        let ctx = Context::default()
            .with_equality(&Expr::var("X"), &Expr::constant("a"))
            .unwrap();
        let result: Result<Expr, IrError> =
            branch_on(&x_eq("a"), &ctx, &|_| Ok(Expr::int(1)), &|_| Ok(Expr::int(2)));
        assert_eq!(result.unwrap(), Expr::int(1));
    }

    #[test]
    fn test_branch_on_builds_conditional() {
        let ctx = Context::default();
        let result: Result<Expr, IrError> =
            branch_on(&x_eq("a"), &ctx, &|_| Ok(Expr::int(1)), &|_| Ok(Expr::int(2)));
        assert_eq!(
            result.unwrap(),
            Expr::ite(x_eq("a"), Expr::int(1), Expr::int(2))
        );
    }

    #[test]
    fn test_map_leaves_sees_path_context() {
        let tree = Expr::ite(x_eq("a"), Expr::var("X"), Expr::var("X"));
        let result: Result<Expr, IrError> = map_leaves(&tree, &Context::default(), &|leaf, c| {
            Ok(Expr::bool(c.are_equal(leaf, &Expr::constant("a")) == Some(true)))
        });
        assert_eq!(result.unwrap(), Expr::ite(x_eq("a"), Expr::TRUE, Expr::FALSE));
    }

    #[test]
    fn test_random_value_aliasing_splits() {
        let ctx = Context::default()
            .with_assumption(&Expr::rv("p", vec![Expr::constant("a")]), true)
            .unwrap();
        let atom = Expr::rv("p", vec![Expr::var("X")]);
        let result: Result<Expr, IrError> =
            branch_on(&atom, &ctx, &|_| Ok(Expr::int(1)), &|_| Ok(Expr::int(0)));
        assert_eq!(
            result.unwrap(),
            Expr::ite(
                x_eq("a"),
                Expr::int(1),
                Expr::ite(atom.clone(), Expr::int(1), Expr::int(0))
            )
        );
    }
}
