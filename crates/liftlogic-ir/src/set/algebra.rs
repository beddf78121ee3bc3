//! Set operations on normalized sets.
//!
//! Every operation first normalizes its operands, so conditional operands
//! (`if X = a then { a } else { b }`) are handled by distributing the
//! operation over their branches. Results are decision trees whose leaves
//! are sets or unions of sets. Empty results are always printed `{ }`.

use std::collections::{BTreeMap, BTreeSet};

use crate::context::Context;
use crate::error::{IrError, Result};
use crate::expr::{Expr, Op};
use crate::set::intensional::{simplify_intensional, standardize_parts};
use crate::set::{IndexExpression, SetExpr, SetKind};
use crate::simplify::lifted;
use crate::simplify::{branch_on_formula, compact, map_leaves, map_leaves_all, normalize};

fn extensional(kind: SetKind, elements: Vec<Expr>) -> Expr {
    if elements.is_empty() {
        Expr::empty_set()
    } else {
        Expr::set(SetExpr::Extensional { kind, elements })
    }
}

fn set_of(expr: &Expr) -> Result<&SetExpr> {
    expr.as_set()
        .ok_or_else(|| IrError::IllegalArgument(format!("{} is not a set", expr)))
}

/// Operands of a union whose elements are counted with multiplicity may only
/// be multisets or unisets of at most one element.
pub fn check_union_operands(parts: &[Expr]) -> Result<()> {
    let sets = parts.iter().map(set_of).collect::<Result<Vec<_>>>()?;
    if !sets.iter().any(|set| set.is_multiset()) {
        return Ok(());
    }
    let offending = sets.iter().find(|set| {
        !set.is_multiset() && set.elements().map_or(true, |elements| elements.len() > 1)
    });
    match offending {
        Some(set) => Err(IrError::IllegalSetOperation(format!(
            "uniset {} in a union of multisets",
            set
        ))),
        None => Ok(()),
    }
}

/// `S1 union ... union Sn`, flattened, without empty operands. Adjacent
/// extensional multisets are merged.
pub fn union(args: &[Expr], ctx: &Context) -> Result<Expr> {
    map_leaves_all(args, ctx, &|leaves, _| union_of_leaves(leaves))
}

fn union_of_leaves(leaves: Vec<Expr>) -> Result<Expr> {
    let mut operands: Vec<Expr> = Vec::new();
    let mut pending: Vec<Expr> = leaves.into_iter().rev().collect();
    while let Some(leaf) = pending.pop() {
        if let Some(parts) = leaf.args_of(Op::Union) {
            pending.extend(parts.iter().rev().cloned());
            continue;
        }
        let set = set_of(&leaf)?;
        if set.is_empty_extensional() {
            continue;
        }
        let merged = match (operands.last_mut(), set) {
            (
                Some(Expr::Set(previous)),
                SetExpr::Extensional {
                    kind: SetKind::MultiSet,
                    elements,
                },
            ) => match previous.as_mut() {
                SetExpr::Extensional {
                    kind: SetKind::MultiSet,
                    elements: previous_elements,
                } => {
                    previous_elements.extend(elements.iter().cloned());
                    true
                }
                _ => false,
            },
            _ => false,
        };
        if !merged {
            operands.push(leaf);
        }
    }
    Ok(match operands.len() {
        0 => Expr::empty_set(),
        1 => operands.pop().unwrap_or_else(Expr::empty_set),
        _ => Expr::union(operands),
    })
}

/// `left \ right`.
///
/// Multiset semantics remove one occurrence per element of the subtrahend,
/// which therefore may only be a uniset or a singleton multiset. A
/// singleton multiset `{{ y }}` subtracted from a uniset acts as `{ y }`.
pub fn set_difference(left: &Expr, right: &Expr, ctx: &Context) -> Result<Expr> {
    map_leaves_all(&[left.clone(), right.clone()], ctx, &|leaves, c| {
        difference_of_leaves(&leaves[0], &leaves[1], c)
    })
}

fn difference_of_leaves(a: &Expr, b: &Expr, ctx: &Context) -> Result<Expr> {
    if let Some(parts) = b.args_of(Op::Union) {
        return parts.iter().try_fold(a.clone(), |acc, part| set_difference(&acc, part, ctx));
    }
    if let Some(parts) = a.args_of(Op::Union) {
        check_union_operands(parts)?;
        return union_minus(parts, b, ctx);
    }
    let (sa, sb) = (set_of(a)?, set_of(b)?);
    if sa.is_empty_extensional() {
        return Ok(Expr::empty_set());
    }
    if sb.is_empty_extensional() {
        return Ok(a.clone());
    }
    if sb.is_multiset() && sb.elements().map_or(true, |elements| elements.len() > 1) {
        return Err(IrError::IllegalSetOperation(format!(
            "{} \\ {}: only singleton multisets can be subtracted",
            a, b
        )));
    }
    if !sa.is_multiset() && sb.is_multiset() {
        let removed = sb.elements().map(<[Expr]>::to_vec).unwrap_or_default();
        return difference_of_leaves(a, &Expr::uniset(removed), ctx);
    }
    match (sa, sb) {
        (
            SetExpr::Extensional {
                kind: SetKind::MultiSet,
                elements,
            },
            SetExpr::Extensional {
                elements: removed, ..
            },
        ) => {
            let mut acc = extensional(SetKind::MultiSet, elements.clone());
            for y in removed {
                acc = map_leaves(&acc, ctx, &|leaf, c| {
                    let remaining = leaf.as_set().and_then(SetExpr::elements).unwrap_or(&[]);
                    remove_first(remaining, 0, y, c)
                })?;
            }
            Ok(acc)
        }
        (SetExpr::Extensional { kind, elements }, _) => {
            filter_out_members(*kind, elements, 0, Vec::new(), b, ctx)
        }
        (
            SetExpr::Intensional {
                kind,
                indices,
                head,
                condition,
            },
            SetExpr::Extensional {
                elements: removed, ..
            },
        ) => {
            let mut avoid = b.free_variables();
            avoid.extend(ctx.known_variables());
            let (indices, head, condition) = standardize_parts(indices, head, condition, &avoid);
            let mut conjuncts = vec![condition];
            for y in removed {
                let disequality = Expr::neq(head.clone(), y.clone());
                if !conjuncts.contains(&disequality) {
                    conjuncts.push(disequality);
                }
            }
            simplify_intensional(
                &SetExpr::Intensional {
                    kind: *kind,
                    indices,
                    head,
                    condition: Expr::and_all(conjuncts),
                },
                ctx,
            )
        }
        (
            SetExpr::Intensional {
                kind,
                indices,
                head,
                condition,
            },
            SetExpr::Intensional { .. },
        ) => {
            let mut avoid = b.free_variables();
            avoid.extend(ctx.known_variables());
            let (indices, head, condition) = standardize_parts(indices, head, condition, &avoid);
            let inside = compact(&membership(&head, b, ctx)?);
            simplify_intensional(
                &SetExpr::Intensional {
                    kind: *kind,
                    indices,
                    head,
                    condition: Expr::and(condition, Expr::not(inside)),
                },
                ctx,
            )
        }
    }
}

/// Removes the first element from `start` on that equals `y`.
fn remove_first(elements: &[Expr], start: usize, y: &Expr, ctx: &Context) -> Result<Expr> {
    if start == elements.len() {
        return Ok(extensional(SetKind::MultiSet, elements.to_vec()));
    }
    branch_on_formula(
        &Expr::eq(elements[start].clone(), y.clone()),
        ctx,
        &|_| {
            let mut rest = elements.to_vec();
            rest.remove(start);
            Ok(extensional(SetKind::MultiSet, rest))
        },
        &|c| remove_first(elements, start + 1, y, c),
    )
}

/// Keeps the elements from `start` on that do not belong to `removed`.
fn filter_out_members(
    kind: SetKind,
    elements: &[Expr],
    start: usize,
    kept: Vec<Expr>,
    removed: &Expr,
    ctx: &Context,
) -> Result<Expr> {
    let Some(element) = elements.get(start) else {
        return Ok(extensional(kind, kept));
    };
    branch_on_formula(
        &Expr::is_in(element.clone(), removed.clone()),
        ctx,
        &|c| filter_out_members(kind, elements, start + 1, kept.clone(), removed, c),
        &|c| {
            let mut kept = kept.clone();
            kept.push(element.clone());
            filter_out_members(kind, elements, start + 1, kept, removed, c)
        },
    )
}

fn union_minus(parts: &[Expr], b: &Expr, ctx: &Context) -> Result<Expr> {
    let counts_multiplicity = parts
        .iter()
        .any(|part| part.as_set().is_some_and(SetExpr::is_multiset));
    let sb = set_of(b)?;
    if counts_multiplicity {
        match sb.elements() {
            Some(elements) if elements.len() > 1 => {
                let mut acc = union(parts, ctx)?;
                for y in elements {
                    acc = set_difference(&acc, &Expr::uniset(vec![y.clone()]), ctx)?;
                }
                return Ok(acc);
            }
            Some([y]) => return remove_from_first_holder(parts, y, b, ctx),
            _ => {}
        }
    }
    let differences: Vec<Expr> = parts
        .iter()
        .map(|part| Expr::set_difference(part.clone(), b.clone()))
        .collect();
    union(&differences, ctx)
}

/// `(A1 union ... union An) \ {y}` for multisets: the occurrence removed is
/// the one in the first operand containing `y`.
fn remove_from_first_holder(parts: &[Expr], y: &Expr, b: &Expr, ctx: &Context) -> Result<Expr> {
    let Some((first, rest)) = parts.split_first() else {
        return Ok(Expr::empty_set());
    };
    if rest.is_empty() {
        return set_difference(first, b, ctx);
    }
    branch_on_formula(
        &Expr::is_in(y.clone(), first.clone()),
        ctx,
        &|c| {
            let mut operands = vec![Expr::set_difference(first.clone(), b.clone())];
            operands.extend(rest.iter().cloned());
            union(&operands, c)
        },
        &|c| {
            let remainder = remove_from_first_holder(rest, y, b, c)?;
            union(&[first.clone(), remainder], c)
        },
    )
}

/// Intersection of two intensional multisets.
pub fn intersection(left: &Expr, right: &Expr, ctx: &Context) -> Result<Expr> {
    map_leaves_all(&[left.clone(), right.clone()], ctx, &|leaves, c| {
        intersection_of_leaves(&leaves[0], &leaves[1], c)
    })
}

fn intersection_of_leaves(a: &Expr, b: &Expr, ctx: &Context) -> Result<Expr> {
    let (sa, sb) = (set_of(a)?, set_of(b)?);
    if sa.is_empty_extensional() || sb.is_empty_extensional() {
        return Ok(Expr::empty_set());
    }
    match (sa, sb) {
        (
            SetExpr::Intensional {
                kind: SetKind::MultiSet,
                indices: left_indices,
                head: left_head,
                condition: left_condition,
            },
            SetExpr::Intensional {
                kind: SetKind::MultiSet,
                indices,
                head,
                condition,
            },
        ) => {
            let mut avoid = a.all_variables();
            avoid.extend(ctx.known_variables());
            let (right_indices, right_head, right_condition) =
                standardize_parts(indices, head, condition, &avoid);
            let mut combined: Vec<IndexExpression> = left_indices.clone();
            combined.extend(right_indices);
            simplify_intensional(
                &SetExpr::Intensional {
                    kind: SetKind::MultiSet,
                    indices: combined,
                    head: left_head.clone(),
                    condition: Expr::and_all(vec![
                        Expr::eq(left_head.clone(), right_head),
                        left_condition.clone(),
                        right_condition,
                    ]),
                },
                ctx,
            )
        }
        _ => Err(IrError::IllegalSetOperation(format!(
            "intersection of {} and {}",
            a, b
        ))),
    }
}

/// `element in set` as a normalized boolean tree.
pub fn membership(element: &Expr, set: &Expr, ctx: &Context) -> Result<Expr> {
    map_leaves_all(&[element.clone(), set.clone()], ctx, &|leaves, c| {
        membership_of_leaves(&leaves[0], &leaves[1], c)
    })
}

fn membership_of_leaves(alpha: &Expr, s: &Expr, ctx: &Context) -> Result<Expr> {
    if let Some(parts) = s.args_of(Op::Union) {
        let disjuncts = parts
            .iter()
            .map(|part| Expr::is_in(alpha.clone(), part.clone()))
            .collect();
        return normalize(&Expr::or_all(disjuncts), ctx);
    }
    match set_of(s)? {
        SetExpr::Extensional { elements, .. } => {
            let mut disjuncts: Vec<Expr> = Vec::with_capacity(elements.len());
            for element in elements {
                let equality = Expr::eq(alpha.clone(), element.clone());
                if !disjuncts.contains(&equality) {
                    disjuncts.push(equality);
                }
            }
            normalize(&Expr::or_all(disjuncts), ctx)
        }
        SetExpr::Intensional {
            indices,
            head,
            condition,
            ..
        } => {
            if indices.iter().any(|index| index.domain_set().is_some()) {
                return Err(IrError::Unsupported(format!(
                    "membership in {} with set-valued index domains",
                    s
                )));
            }
            let mut avoid = alpha.free_variables();
            avoid.extend(ctx.known_variables());
            let (indices, head, condition) = standardize_parts(indices, head, condition, &avoid);
            let names: BTreeSet<String> = indices
                .iter()
                .filter_map(|index| index.name().map(str::to_string))
                .collect();
            let Some(pairs) = head.unification_equalities(alpha) else {
                return Ok(Expr::FALSE);
            };
            let mut bindings: BTreeMap<String, Expr> = BTreeMap::new();
            let mut residual = Vec::new();
            for (x, y) in pairs {
                let (x, y) = (x.substitute_all(&bindings), y.substitute_all(&bindings));
                if x == y {
                    continue;
                }
                let free_index = |term: &Expr, other: &Expr| {
                    term.variable_name()
                        .filter(|name| {
                            names.contains(*name)
                                && !bindings.contains_key(*name)
                                && !other.mentions_variable(name)
                        })
                        .map(str::to_string)
                };
                if let Some(name) = free_index(&x, &y) {
                    bindings.insert(name, y);
                } else if let Some(name) = free_index(&y, &x) {
                    bindings.insert(name, x);
                } else {
                    residual.push(Expr::eq(x, y));
                }
            }
            residual.push(condition);
            let formula = Expr::and_all(residual).substitute_all(&bindings);
            if let Some(name) = names
                .iter()
                .find(|name| !bindings.contains_key(*name) && formula.mentions_variable(name))
            {
                return Err(IrError::Unsupported(format!(
                    "membership in {} leaves index {} unbound",
                    s, name
                )));
            }
            normalize(&formula, ctx)
        }
    }
}

/// Whether a set is empty, as a normalized boolean tree.
pub fn is_empty(set: &Expr, ctx: &Context) -> Result<Expr> {
    let tree = normalize(set, ctx)?;
    map_leaves(&tree, ctx, &|leaf, c| {
        if let Some(parts) = leaf.args_of(Op::Union) {
            let conjuncts = parts
                .iter()
                .map(|part| is_empty(part, c).map(|t| compact(&t)))
                .collect::<Result<Vec<_>>>()?;
            return normalize(&Expr::and_all(conjuncts), c);
        }
        match set_of(leaf)? {
            SetExpr::Extensional { elements, .. } => Ok(Expr::bool(elements.is_empty())),
            SetExpr::Intensional { .. } => {
                let size = compact(&lifted::cardinality(leaf, c)?);
                normalize(&Expr::eq(size, Expr::zero()), c)
            }
        }
    })
}

/// Removes duplicates from `{ e1, ..., en }` under every assignment of the
/// logical variables, branching on the equalities that decide them.
pub fn normalize_uniset(elements: &[Expr], ctx: &Context) -> Result<Expr> {
    fn distinct(rest: &[Expr], kept: Vec<Expr>, ctx: &Context) -> Result<Expr> {
        let Some((first, tail)) = rest.split_first() else {
            return Ok(extensional(SetKind::UniSet, kept));
        };
        if kept.contains(first) {
            return distinct(tail, kept, ctx);
        }
        branch_on_formula(
            &Expr::is_in(first.clone(), Expr::uniset(kept.clone())),
            ctx,
            &|c| distinct(tail, kept.clone(), c),
            &|c| {
                let mut kept = kept.clone();
                kept.push(first.clone());
                distinct(tail, kept, c)
            },
        )
    }
    distinct(elements, Vec::new(), ctx)
}
