//! Lifted products and counting over intensional sets.
//!
//! `product({{ (on X in S) f(X) | C(X) }})` is computed without grounding
//! `X`: the condition and the body are split on the equalities that mention
//! `X`, and in each part the body no longer depends on `X`, so the product
//! over the part is the body raised to the number of values of `X` the part
//! admits. Counting uses the same walk with a sum instead of a product.

use crate::context::Context;
use crate::error::{IrError, Result};
use crate::expr::{Expr, Op};
use crate::set::algebra::{check_union_operands, normalize_uniset};
use crate::set::intensional::{standardize_parts, with_inferred_sorts};
use crate::set::{IndexExpression, SetExpr};

use super::{
    branch_on, branch_on_formula, canonical_equality, fold, map_leaves, negate, normalize,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Aggregate {
    Product,
    Sum,
}

impl Aggregate {
    fn identity(self) -> Expr {
        match self {
            Aggregate::Product => Expr::one(),
            Aggregate::Sum => Expr::zero(),
        }
    }

    fn op(self) -> Op {
        match self {
            Aggregate::Product => Op::Times,
            Aggregate::Sum => Op::Plus,
        }
    }

    /// Aggregating `value` over `count` identical copies.
    fn repeat(self, value: &Expr, count: &Expr, ctx: &Context) -> Result<Expr> {
        match self {
            Aggregate::Product => fold(Op::Exponentiation, vec![value.clone(), count.clone()], ctx),
            Aggregate::Sum => fold(Op::Times, vec![count.clone(), value.clone()], ctx),
        }
    }
}

/// Combines already normalized trees leaf by leaf.
fn combine_trees(kind: Aggregate, trees: Vec<Expr>, ctx: &Context) -> Result<Expr> {
    let mut acc = kind.identity();
    for tree in trees {
        acc = map_leaves(&acc, ctx, &|leaf, c| {
            map_leaves(&tree, c, &|other, c| fold(kind.op(), vec![leaf.clone(), other.clone()], c))
        })?;
    }
    Ok(acc)
}

/// Heads that are distinct for distinct index values, so that a uniset
/// counts its elements like a multiset.
fn is_injective_head(head: &Expr, indices: &[IndexExpression]) -> bool {
    fn constructed(expr: &Expr) -> bool {
        match expr {
            Expr::Var(_) | Expr::Const(_) | Expr::Number(_) | Expr::Bool(_) | Expr::Bracket(_) => true,
            Expr::RandomValue { args, .. } => args.iter().all(constructed),
            Expr::Compound { op: Op::Tuple, args } => args.iter().all(constructed),
            _ => false,
        }
    }
    constructed(head)
        && indices
            .iter()
            .filter_map(IndexExpression::name)
            .all(|name| head.mentions_variable(name))
}

/// `product(set)`.
pub fn product(set: &Expr, ctx: &Context) -> Result<Expr> {
    let tree = normalize(set, ctx)?;
    map_leaves(&tree, ctx, &|leaf, c| product_of_leaf(leaf, c))
}

fn product_of_leaf(leaf: &Expr, ctx: &Context) -> Result<Expr> {
    if let Some(parts) = leaf.args_of(Op::Union) {
        check_union_operands(parts)?;
        let factors = parts.iter().cloned().map(Expr::product).collect();
        return normalize(&Expr::times(factors), ctx);
    }
    let set = leaf
        .as_set()
        .ok_or_else(|| IrError::IllegalArgument(format!("product over {}", leaf)))?;
    match set {
        SetExpr::Extensional { elements, .. } if set.is_multiset() => {
            normalize(&Expr::times(elements.clone()), ctx)
        }
        SetExpr::Extensional { elements, .. } => {
            let distinct = normalize_uniset(elements, ctx)?;
            map_leaves(&distinct, ctx, &|unique, c| {
                let elements = unique.as_set().and_then(SetExpr::elements).unwrap_or(&[]);
                normalize(&Expr::times(elements.to_vec()), c)
            })
        }
        SetExpr::Intensional { indices, .. }
            if indices.iter().any(|index| index.domain_set().is_some()) =>
        {
            Ok(Expr::product(leaf.clone()))
        }
        SetExpr::Intensional {
            indices,
            head,
            condition,
            ..
        } => {
            if !set.is_multiset() && !is_injective_head(head, indices) {
                return Err(IrError::Unsupported(format!("product over uniset {}", leaf)));
            }
            aggregate(Aggregate::Product, indices, head, condition, ctx)
        }
    }
}

/// `| set |`.
pub fn cardinality(set: &Expr, ctx: &Context) -> Result<Expr> {
    let tree = normalize(set, ctx)?;
    map_leaves(&tree, ctx, &|leaf, c| cardinality_of_leaf(leaf, c))
}

fn cardinality_of_leaf(leaf: &Expr, ctx: &Context) -> Result<Expr> {
    if let Some(parts) = leaf.args_of(Op::Union) {
        check_union_operands(parts)?;
        let multiset = parts
            .iter()
            .any(|part| part.as_set().is_some_and(SetExpr::is_multiset));
        if multiset || parts.len() < 2 {
            let sizes = parts.iter().cloned().map(Expr::cardinality).collect();
            return normalize(&Expr::plus(sizes), ctx);
        }
        let first = parts[0].clone();
        let new_elements = Expr::set_difference(Expr::union(parts[1..].to_vec()), first.clone());
        return normalize(
            &Expr::plus(vec![Expr::cardinality(first), Expr::cardinality(new_elements)]),
            ctx,
        );
    }
    let set = leaf
        .as_set()
        .ok_or_else(|| IrError::IllegalArgument(format!("cardinality of {}", leaf)))?;
    match set {
        SetExpr::Extensional { elements, .. } if set.is_multiset() => {
            Ok(Expr::int(elements.len() as i64))
        }
        SetExpr::Extensional { elements, .. } => {
            let indicators = elements
                .iter()
                .enumerate()
                .map(|(i, element)| {
                    Expr::ite(
                        Expr::is_in(element.clone(), Expr::uniset(elements[..i].to_vec())),
                        Expr::zero(),
                        Expr::one(),
                    )
                })
                .collect();
            normalize(&Expr::plus(indicators), ctx)
        }
        SetExpr::Intensional { indices, .. }
            if indices.iter().any(|index| index.domain_set().is_some()) =>
        {
            Ok(Expr::cardinality(leaf.clone()))
        }
        SetExpr::Intensional {
            indices,
            head,
            condition,
            ..
        } => {
            if !set.is_multiset() && !is_injective_head(head, indices) {
                return Err(IrError::Unsupported(format!("cardinality of uniset {}", leaf)));
            }
            let typed: Vec<IndexExpression> =
                with_inferred_sorts(indices, head, condition, ctx.vocabulary())
                    .into_iter()
                    .map(|(name, sort)| IndexExpression::in_sort(name, sort))
                    .collect();
            aggregate(Aggregate::Sum, &typed, &Expr::one(), condition, ctx)
        }
    }
}

fn aggregate(
    kind: Aggregate,
    indices: &[IndexExpression],
    head: &Expr,
    condition: &Expr,
    ctx: &Context,
) -> Result<Expr> {
    let (indices, head, condition) =
        standardize_parts(indices, head, condition, &ctx.known_variables());
    let sorts = with_inferred_sorts(&indices, &head, &condition, ctx.vocabulary());
    aggregate_over(kind, &sorts, &head, &condition, ctx)
}

/// Aggregates over the first index, with the remaining ones aggregated
/// inside the body.
fn aggregate_over(
    kind: Aggregate,
    sorts: &[(String, String)],
    head: &Expr,
    condition: &Expr,
    ctx: &Context,
) -> Result<Expr> {
    let Some(((name, sort), inner)) = sorts.split_first() else {
        return branch_on_formula(
            condition,
            ctx,
            &|c| normalize(head, c),
            &|_| Ok(kind.identity()),
        );
    };
    let lifter = Lifter {
        kind,
        name,
        sort,
        inner: inner.iter().map(|(inner_name, _)| inner_name.as_str()).collect(),
        body: &|remaining: &Expr, c: &Context| aggregate_over(kind, inner, head, remaining, c),
    };
    let scoped = ctx.with_index(name.as_str(), sort.as_str());
    let tree = normalize(condition, &scoped)?;
    lifter.walk_condition(&tree, &scoped, &[])
}

struct Lifter<'a> {
    kind: Aggregate,
    name: &'a str,
    sort: &'a str,
    /// Indices aggregated inside the body; atoms on them are left to it.
    inner: Vec<&'a str>,
    body: &'a dyn Fn(&Expr, &Context) -> Result<Expr>,
}

impl Lifter<'_> {
    fn mentions_inner(&self, expr: &Expr) -> bool {
        self.inner.iter().any(|name| expr.mentions_variable(name))
    }

    fn walk_condition(&self, tree: &Expr, ctx: &Context, path: &[Expr]) -> Result<Expr> {
        match tree.ite_parts() {
            Some((atom, _, _)) if self.mentions_inner(atom) => {
                let body = (self.body)(tree, ctx)?;
                self.walk_body(&body, ctx, path)
            }
            Some((atom, _, _)) if atom.is_random_value() && atom.mentions_variable(self.name) => {
                Err(IrError::Unsupported(format!(
                    "condition on {} depends on index {}",
                    atom, self.name
                )))
            }
            Some((atom, then_branch, else_branch)) if atom.mentions_variable(self.name) => self
                .partition(
                    atom,
                    ctx,
                    path,
                    &|c, p| self.walk_condition(then_branch, c, p),
                    &|c, p| self.walk_condition(else_branch, c, p),
                ),
            Some((atom, then_branch, else_branch)) => branch_on(
                atom,
                ctx,
                &|c| self.walk_condition(then_branch, c, path),
                &|c| self.walk_condition(else_branch, c, path),
            ),
            None => match tree.as_bool() {
                Some(false) => Ok(self.kind.identity()),
                Some(true) => {
                    let body = (self.body)(&Expr::TRUE, ctx)?;
                    self.walk_body(&body, ctx, path)
                }
                None => Err(IrError::Unsupported(format!("non-boolean condition {}", tree))),
            },
        }
    }

    fn walk_body(&self, tree: &Expr, ctx: &Context, path: &[Expr]) -> Result<Expr> {
        match tree.ite_parts() {
            Some((atom, then_branch, else_branch))
                if atom.mentions_variable(self.name) && !atom.is_random_value() =>
            {
                self.partition(
                    atom,
                    ctx,
                    path,
                    &|c, p| self.walk_body(then_branch, c, p),
                    &|c, p| self.walk_body(else_branch, c, p),
                )
            }
            Some((atom, _, _)) if atom.mentions_variable(self.name) => self.unlifted(tree, path),
            Some((atom, then_branch, else_branch)) => branch_on(
                atom,
                ctx,
                &|c| self.walk_body(then_branch, c, path),
                &|c| self.walk_body(else_branch, c, path),
            ),
            None if tree.mentions_variable(self.name) => self.unlifted(tree, path),
            None => {
                let count = count_index(self.name, self.sort, ctx)?;
                map_leaves(&count, ctx, &|n, c| self.kind.repeat(tree, n, c))
            }
        }
    }

    /// Aggregates the part where `atom` holds with the part where it fails.
    fn partition(
        &self,
        atom: &Expr,
        ctx: &Context,
        path: &[Expr],
        then_fn: &dyn Fn(&Context, &[Expr]) -> Result<Expr>,
        else_fn: &dyn Fn(&Context, &[Expr]) -> Result<Expr>,
    ) -> Result<Expr> {
        let mut parts = Vec::with_capacity(2);
        for (polarity, walk) in [(true, then_fn), (false, else_fn)] {
            if let Some(narrowed) = ctx.with_literal(atom, polarity) {
                let mut extended = path.to_vec();
                extended.push(if polarity { atom.clone() } else { negate(atom) });
                parts.push(walk(&narrowed, &extended)?);
            }
        }
        combine_trees(self.kind, parts, ctx)
    }

    /// The body depends on the index through random variables: the product
    /// over the current part is kept symbolic.
    fn unlifted(&self, tree: &Expr, path: &[Expr]) -> Result<Expr> {
        match self.kind {
            Aggregate::Product => Ok(Expr::product(Expr::intensional_multiset(
                vec![IndexExpression::in_sort(self.name, self.sort)],
                tree.clone(),
                Expr::and_all(path.to_vec()),
            ))),
            Aggregate::Sum => Err(IrError::Unsupported(format!(
                "sum of {} over {}",
                tree, self.name
            ))),
        }
    }
}

/// Number of values of `name` in `sort` compatible with the constraint,
/// split on equalities among the excluded terms when they are undecided.
fn count_index(name: &str, sort: &str, ctx: &Context) -> Result<Expr> {
    let index = Expr::var(name);
    if ctx.constraint().class_size(&index) > 1 {
        return Ok(Expr::one());
    }
    let excluded = ctx.constraint().disequal_representatives(&index);
    count_excluding(&excluded, sort, ctx)
}

fn count_excluding(excluded: &[Expr], sort: &str, ctx: &Context) -> Result<Expr> {
    for (i, x) in excluded.iter().enumerate() {
        for y in &excluded[i + 1..] {
            if ctx.are_equal(x, y).is_none() {
                return branch_on(
                    &canonical_equality(x, y),
                    ctx,
                    &|c| count_excluding(excluded, sort, c),
                    &|c| count_excluding(excluded, sort, c),
                );
            }
        }
    }
    let distinct = excluded
        .iter()
        .enumerate()
        .filter(|(i, x)| {
            !excluded[..*i]
                .iter()
                .any(|y| ctx.are_equal(x, y) == Some(true))
        })
        .count();
    Ok(match ctx.vocabulary().sort_size(sort) {
        Some(size) => Expr::int(size.saturating_sub(distinct) as i64),
        None => {
            let symbolic = Expr::cardinality(Expr::constant(sort));
            if distinct == 0 {
                symbolic
            } else {
                Expr::minus(symbolic, Expr::int(distinct as i64))
            }
        }
    })
}
