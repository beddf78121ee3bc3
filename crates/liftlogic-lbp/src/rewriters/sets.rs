//! Set algebra rewriters: `R_set_diff`, `R_union`, `R_intersection`, `R_in`
//! and `R_card`.
//!
//! Each takes the set expression itself as argument (`A \ B`,
//! `union(A, B)`, ...) and delegates to the set algebra of the IR under the
//! context of the process. Conditional results are kept as decision trees;
//! membership results are compacted back into formulas.

use liftlogic_ir::{compact, Expr, Op};

use crate::error::{LbpError, Result};
use crate::process::RewritingProcess;

fn operands<'e>(argument: &'e Expr, op: Op, arity: Option<usize>, rewriter: &str) -> Result<&'e [Expr]> {
    match argument.args_of(op) {
        Some(args) if arity.map_or(true, |n| args.len() == n) => Ok(args),
        _ => Err(LbpError::IllegalArgument(format!(
            "{} expects an expression of the form {}, got {}",
            rewriter,
            op.symbol(),
            argument
        ))),
    }
}

/// `R_set_diff(S1 \ S2)`
pub fn set_difference(process: &RewritingProcess<'_>, argument: &Expr) -> Result<Expr> {
    let args = operands(argument, Op::SetDifference, Some(2), "R_set_diff")?;
    Ok(liftlogic_ir::set_difference(&args[0], &args[1], process.context())?)
}

/// `R_union(union(S1, ..., Sn))`
pub fn union(process: &RewritingProcess<'_>, argument: &Expr) -> Result<Expr> {
    let args = operands(argument, Op::Union, None, "R_union")?;
    Ok(liftlogic_ir::union(args, process.context())?)
}

/// `R_intersection(S1 intersection S2)`
pub fn intersection(process: &RewritingProcess<'_>, argument: &Expr) -> Result<Expr> {
    let args = operands(argument, Op::Intersection, Some(2), "R_intersection")?;
    Ok(liftlogic_ir::intersection(&args[0], &args[1], process.context())?)
}

/// `R_in(alpha in S)`
pub fn membership(process: &RewritingProcess<'_>, argument: &Expr) -> Result<Expr> {
    let args = operands(argument, Op::In, Some(2), "R_in")?;
    let tree = liftlogic_ir::membership(&args[0], &args[1], process.context())?;
    Ok(compact(&tree))
}

/// `R_card(| S |)`
pub fn cardinality(process: &RewritingProcess<'_>, argument: &Expr) -> Result<Expr> {
    operands(argument, Op::Cardinality, Some(1), "R_card")?;
    process.simplify(argument)
}
