//! # liftlogic IR
//!
//! **Symbolic expressions, set algebra and a contextual simplifier for lifted
//! probabilistic inference**
//!
//! This crate provides the expression language the belief propagation
//! rewriters of `liftlogic-lbp` work on, together with the reasoning they
//! need about it: equality constraints over logical variables, decision-tree
//! simplification under a context, set operations and lifted products.
//!
//! ## Core Components
//!
//! ### Expressions ([`Expr`])
//! - **Terms**: logical variables (`X`, `Y'`) and constants (`a`, `bob`)
//! - **Random variable values**: `p(X)`, `r`, and references `[ p(X) ]`
//! - **Formulas**: `and`, `or`, `not`, `=>`, `<=>`, `=`, `!=`, `in`
//! - **Arithmetic** over exact rationals: `+`, `-`, `*`, `/`, `^`
//! - **Conditionals**: `if C then A else B`
//! - **Sets** ([`SetExpr`]): extensional and intensional unisets and multisets
//! - **Message passing**: `message to . from .`, `previous message to . from .`,
//!   `Neigh(.)`, lambda expressions
//!
//! ### Contexts ([`Context`])
//! The logical knowledge holding at a point of a rewrite: an
//! [`EqualityConstraint`] over logical variables, assumed random variable
//! values and index sorts, sharing one [`Vocabulary`] of sorts
//! ([`DomainRegistry`]) and random variable signatures
//! ([`SignatureRegistry`]).
//!
//! ### Simplification ([`simplify()`])
//! Normalizes an expression into a decision tree over atoms, pruning
//! branches the context decides, folding arithmetic exactly and computing
//! products and cardinalities over intensional sets without grounding.
//!
//! ## Quick Start
//!
//! ```rust
//! use liftlogic_ir::{simplify, Context, Expr};
//!
//! let p = Expr::rv("p", vec![Expr::var("X")]);
//! let potential = Expr::plus(vec![
//!     Expr::ite(p.clone(), Expr::ratio(6, 10), Expr::ratio(4, 10)),
//!     Expr::ratio(4, 10),
//! ]);
//! let ctx = Context::default().with_assumption(&p, false).unwrap();
//! assert_eq!(simplify(&potential, &ctx).unwrap(), Expr::ratio(4, 5));
//! ```

pub mod constraint;
pub mod context;
pub mod domain;
pub mod error;
pub mod expr;
pub mod set;
pub mod signature;
pub mod simplify;

#[cfg(test)]
mod tests;

pub use constraint::EqualityConstraint;
pub use context::{Context, Lookup, Vocabulary};
pub use domain::{DomainInfo, DomainRegistry, UNIVERSE};
pub use error::{IrError, Result};
pub use expr::number::{
    format_rational, parse_rational, round_to_decimal_places, round_to_significant_digits,
};
pub use expr::{fresh_variable, Expr, Op};
pub use set::algebra::{
    intersection, is_empty, membership, normalize_uniset, set_difference, union,
};
pub use set::intensional::{simplify_intensional, standardize_apart, standardize_parts};
pub use set::{IndexDomain, IndexExpression, SetExpr, SetKind};
pub use signature::{RandomVariableSignature, SignatureRegistry};
pub use simplify::{
    branch_on, branch_on_formula, compact, map_leaves, simplify, DefaultSimplifier, Simplifier,
};
