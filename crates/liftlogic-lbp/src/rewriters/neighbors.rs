//! Neighbors in the factor graph: `R_neigh_f` and `R_neigh_v`.

use liftlogic_ir::{
    normalize_uniset, simplify_intensional, standardize_parts, Expr, Op, SetExpr, SetKind,
};
use tracing::debug;

use super::{factor_potential, referenced_value};
use crate::error::{LbpError, Result};
use crate::process::{RewriterName, RewritingProcess};

fn neighbors_argument<'e>(argument: &'e Expr, rewriter: &str) -> Result<&'e Expr> {
    match argument.args_of(Op::Neighbors) {
        Some([reference]) => Ok(reference),
        _ => Err(LbpError::IllegalArgument(format!(
            "{} expects Neigh([ . ]), got {}",
            rewriter, argument
        ))),
    }
}

/// `R_neigh_f(Neigh([Ef]))`: the random variables a factor mentions, as a
/// uniset of references `{ [v1], ..., [vn] }` free of duplicates under every
/// binding of the logical variables.
pub fn of_factor(process: &RewritingProcess<'_>, argument: &Expr) -> Result<Expr> {
    let factor = neighbors_argument(argument, "R_neigh_f")?;
    let potential = factor_potential(factor, "R_neigh_f")?;
    let references: Vec<Expr> = potential
        .random_values()
        .into_iter()
        .filter(|value| process.model().is_random_variable(value))
        .map(Expr::bracket)
        .collect();
    let neighbors = normalize_uniset(&references, process.context())?;
    process.simplify(&neighbors)
}

/// `R_neigh_v(Neigh([v]))`: the factors of the model mentioning `v`, as a
/// union of multisets in model order.
///
/// An intensional parfactor contributes one intensional multiset per
/// occurrence of `v`'s functor in its potential, restricted to the bindings
/// unifying that occurrence with `v` and not an earlier one, so that every
/// factor instance is counted once. An extensional parfactor contributes
/// each factor conditionally on one of its occurrences unifying with `v`.
pub fn of_variable(process: &RewritingProcess<'_>, argument: &Expr) -> Result<Expr> {
    let reference = neighbors_argument(argument, "R_neigh_v")?;
    let value = referenced_value(reference, "R_neigh_v")?;
    process
        .model()
        .vocabulary()
        .signatures
        .validate(value)
        .map_err(|e| LbpError::IllegalArgument(format!("R_neigh_v on {}: {}", reference, e)))?;

    let ctx = process.context();
    let mut parts = Vec::new();
    for parfactor in process.model().parfactors() {
        match parfactor.as_set() {
            Some(SetExpr::Intensional {
                indices,
                head,
                condition,
                ..
            }) => {
                let mut avoid = value.free_variables();
                avoid.extend(ctx.known_variables());
                let (indices, head, condition) = standardize_parts(indices, head, condition, &avoid);
                let potential = factor_potential(&head, "R_neigh_v")?;
                let mut earlier: Vec<Expr> = Vec::new();
                for occurrence in potential.random_values() {
                    let Some(unifier) = unifier(&occurrence, value) else {
                        continue;
                    };
                    let mut conjuncts = vec![condition.clone(), unifier.clone()];
                    conjuncts.extend(earlier.iter().cloned().map(Expr::not));
                    let instances = SetExpr::Intensional {
                        kind: SetKind::MultiSet,
                        indices: indices.clone(),
                        head: head.clone(),
                        condition: Expr::and_all(conjuncts),
                    };
                    parts.push(simplify_intensional(&instances, ctx)?);
                    earlier.push(unifier);
                }
            }
            Some(SetExpr::Extensional { elements, .. }) => {
                for factor in elements {
                    let potential = factor_potential(factor, "R_neigh_v")?;
                    let unifiers: Vec<Expr> = potential
                        .random_values()
                        .iter()
                        .filter_map(|occurrence| unifier(occurrence, value))
                        .collect();
                    if unifiers.is_empty() {
                        continue;
                    }
                    parts.push(Expr::ite(
                        Expr::or_all(unifiers),
                        Expr::multiset(vec![factor.clone()]),
                        Expr::empty_set(),
                    ));
                }
            }
            None => {
                return Err(LbpError::InvalidModel(format!(
                    "parfactor {} is not a set",
                    parfactor
                )))
            }
        }
    }
    debug!(random_variable = %reference, parts = parts.len(), "neighbors of variable");
    process.rewrite(RewriterName::Union, &Expr::union(parts))
}

/// Conjunction of the equalities making `occurrence` and `value` the same
/// random variable value.
fn unifier(occurrence: &Expr, value: &Expr) -> Option<Expr> {
    occurrence.unification_equalities(value).map(|pairs| {
        Expr::and_all(pairs.into_iter().map(|(a, b)| Expr::eq(a, b)).collect())
    })
}
