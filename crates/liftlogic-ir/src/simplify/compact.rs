//! Turning boolean decision trees back into formulas.

use crate::expr::{Expr, Op};

/// Whether an expression denotes a truth value.
pub fn is_formula(expr: &Expr) -> bool {
    match expr {
        Expr::Bool(_) | Expr::RandomValue { .. } => true,
        Expr::Compound { op, .. } => op.is_boolean(),
        _ => false,
    }
}

/// Logical negation, pushed through equalities.
pub fn negate(expr: &Expr) -> Expr {
    match expr {
        Expr::Bool(value) => Expr::Bool(!value),
        Expr::Compound { op: Op::Equal, args } if args.len() == 2 => {
            Expr::neq(args[0].clone(), args[1].clone())
        }
        Expr::Compound {
            op: Op::NotEqual,
            args,
        } if args.len() == 2 => Expr::eq(args[0].clone(), args[1].clone()),
        Expr::Compound { op: Op::Not, args } if args.len() == 1 => args[0].clone(),
        other => Expr::not(other.clone()),
    }
}

fn flat(op: Op, left: Expr, right: Expr) -> Expr {
    let mut args = Vec::new();
    for side in [left, right] {
        match side {
            Expr::Compound { op: inner, args: inner_args } if inner == op => args.extend(inner_args),
            other => args.push(other),
        }
    }
    Expr::compound(op, args)
}

/// Compacts a normalized tree: boolean subtrees become `and`/`or`/`not`
/// formulas, other conditionals are kept.
pub fn compact(tree: &Expr) -> Expr {
    let Some((atom, then_branch, else_branch)) = tree.ite_parts() else {
        return tree.clone();
    };
    let then_branch = compact(then_branch);
    let else_branch = compact(else_branch);
    let atom = atom.clone();
    match (then_branch.as_bool(), else_branch.as_bool()) {
        (Some(true), Some(false)) => atom,
        (Some(false), Some(true)) => negate(&atom),
        (Some(t), Some(e)) if t == e => Expr::Bool(t),
        (None, Some(false)) if is_formula(&then_branch) => flat(Op::And, atom, then_branch),
        (Some(true), None) if is_formula(&else_branch) => flat(Op::Or, atom, else_branch),
        (Some(false), None) if is_formula(&else_branch) => {
            flat(Op::And, negate(&atom), else_branch)
        }
        (None, Some(true)) if is_formula(&then_branch) => {
            flat(Op::Or, negate(&atom), then_branch)
        }
        (None, None) if is_formula(&then_branch) && is_formula(&else_branch) => flat(
            Op::Or,
            flat(Op::And, atom.clone(), then_branch),
            flat(Op::And, negate(&atom), else_branch),
        ),
        _ => Expr::ite(atom, then_branch, else_branch),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eq(x: &str, c: &str) -> Expr {
        Expr::eq(Expr::var(x), Expr::constant(c))
    }

    #[test]
    fn test_compact_disjunction() {
        let tree = Expr::ite(
            eq("X", "a"),
            Expr::TRUE,
            Expr::ite(eq("X", "b"), Expr::TRUE, Expr::FALSE),
        );
        assert_eq!(compact(&tree), Expr::or(eq("X", "a"), eq("X", "b")));
    }

    #[test]
    fn test_compact_conjunction_of_disequalities() {
        let tree = Expr::ite(
            eq("X", "a"),
            Expr::FALSE,
            Expr::ite(eq("X", "b"), Expr::FALSE, Expr::TRUE),
        );
        assert_eq!(
            compact(&tree).to_string(),
            "X != a and X != b"
        );
    }

    #[test]
    fn test_numeric_trees_are_kept() {
        let tree = Expr::ite(Expr::rv("p", vec![]), Expr::int(1), Expr::int(0));
        assert_eq!(compact(&tree), tree);
    }
}
