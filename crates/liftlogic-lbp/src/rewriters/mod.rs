//! The rewriters of lifted belief propagation.
//!
//! Every rewriter takes its arguments packed in one expression (usually a
//! tuple built with [`crate::process::args`]) and is reached through
//! [`RewritingProcess::rewrite`](crate::process::RewritingProcess::rewrite).
//! This module holds the shape helpers they share.

pub mod belief;
pub mod messages;
pub mod neighbors;
pub mod normalize;
pub mod product_factor;
pub mod sets;
pub mod sum;

use std::collections::BTreeSet;

use liftlogic_ir::{fresh_variable, Expr, IndexDomain, IndexExpression, Op, SetExpr};

use crate::error::{LbpError, Result};
use crate::process::RewritingProcess;

/// `product({{ (on I in S) head | condition }})` taken apart.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ProductOverSet {
    pub index: String,
    pub domain: Expr,
    pub head: Expr,
    pub condition: Expr,
}

impl ProductOverSet {
    /// Parses a product over a set given by an `in` index.
    pub fn parse(product: &Expr, rewriter: &str) -> Result<Self> {
        let malformed = || {
            LbpError::IllegalArgument(format!(
                "{} expects product({{{{ (on I in S) m }}}}), got {}",
                rewriter, product
            ))
        };
        let set = match product.args_of(Op::Product) {
            Some([set]) => set,
            _ => return Err(malformed()),
        };
        match set.as_set() {
            Some(SetExpr::Intensional {
                indices,
                head,
                condition,
                ..
            }) => match indices.as_slice() {
                [IndexExpression {
                    index: Expr::Var(index),
                    domain: Some(IndexDomain::Set(domain)),
                }] => Ok(Self {
                    index: index.clone(),
                    domain: domain.clone(),
                    head: head.clone(),
                    condition: condition.clone(),
                }),
                _ => Err(malformed()),
            },
            _ => Err(malformed()),
        }
    }

    /// The same product over another domain.
    pub fn over(&self, domain: Expr) -> Expr {
        Expr::product(Expr::intensional_multiset(
            vec![IndexExpression::in_set(self.index.clone(), domain)],
            self.head.clone(),
            self.condition.clone(),
        ))
    }

    /// The head for one element of the domain.
    pub fn instance(&self, element: &Expr) -> Expr {
        self.head.substitute(&self.index, element)
    }

    /// `(target, source)` of the message in the head.
    pub fn message(&self) -> Option<(&Expr, &Expr)> {
        self.head.message_parts()
    }
}

/// `product({{ (on I in domain) head(I) }})` with `I` fresh.
pub(crate) fn product_over(
    domain: Expr,
    base: &str,
    mentioned: &[&Expr],
    head: impl Fn(Expr) -> Expr,
) -> Expr {
    let mut taken: BTreeSet<String> = domain.all_variables();
    for expr in mentioned {
        taken.extend(expr.all_variables());
    }
    let index = if taken.contains(base) {
        fresh_variable(base, &taken)
    } else {
        base.to_string()
    };
    Expr::product(Expr::intensional_multiset(
        vec![IndexExpression::in_set(index.clone(), domain)],
        head(Expr::var(index)),
        Expr::TRUE,
    ))
}

/// The random variable value inside a reference `[ v ]`.
pub(crate) fn referenced_value<'e>(reference: &'e Expr, rewriter: &str) -> Result<&'e Expr> {
    match reference.bracket_content() {
        Some(value) if value.is_random_value() => Ok(value),
        _ => Err(LbpError::IllegalArgument(format!(
            "{} expects a random variable reference, got {}",
            rewriter, reference
        ))),
    }
}

/// The potential inside a factor `[ Ef ]`.
pub(crate) fn factor_potential<'e>(factor: &'e Expr, rewriter: &str) -> Result<&'e Expr> {
    match factor.bracket_content() {
        Some(potential) if !potential.is_random_value() => Ok(potential),
        _ => Err(LbpError::IllegalArgument(format!(
            "{} expects a factor, got {}",
            rewriter, factor
        ))),
    }
}

/// Values of `value` that are consistent with the context and for which
/// `weight` is not identically zero.
pub(crate) fn relevant_range(
    process: &RewritingProcess<'_>,
    value: &Expr,
    weight: &Expr,
) -> Result<Vec<bool>> {
    let mut range = Vec::with_capacity(2);
    for candidate in [true, false] {
        let Some(assumed) = process.context().with_assumption(value, candidate) else {
            continue;
        };
        if !process.with_context(assumed).simplify(weight)?.is_zero() {
            range.push(candidate);
        }
    }
    Ok(range)
}
