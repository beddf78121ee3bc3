//! Contextual constraints.
//!
//! A [`Context`] is the logical knowledge holding at a point of a rewrite:
//! equalities between logical variables, values assumed for random variables
//! while branching, and the sorts of contextual (index) variables. Contexts
//! only grow; every extension returns a new value and `None` when the
//! extension is contradictory.

use std::collections::BTreeSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::constraint::EqualityConstraint;
use crate::domain::{DomainRegistry, UNIVERSE};
use crate::expr::{Expr, Op};
use crate::signature::SignatureRegistry;

/// Sorts and random variable signatures shared by every context of a model.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Vocabulary {
    pub domains: DomainRegistry,
    pub signatures: SignatureRegistry,
}

impl Vocabulary {
    pub fn new(domains: DomainRegistry, signatures: SignatureRegistry) -> Self {
        Self {
            domains,
            signatures,
        }
    }

    pub fn sort_size(&self, sort: &str) -> Option<usize> {
        self.domains.size_of(sort)
    }

    /// Sort of `variable` from the argument positions it fills in random
    /// variable values of `exprs`, or [`UNIVERSE`].
    pub fn infer_sort(&self, variable: &str, exprs: &[&Expr]) -> String {
        let target = Expr::var(variable);
        let mut found: Option<String> = None;
        for expr in exprs {
            expr.visit(&mut |node| {
                if found.is_some() {
                    return;
                }
                if let Expr::RandomValue { functor, args } = node {
                    if let Some(position) = args.iter().position(|arg| arg == &target) {
                        found = self
                            .signatures
                            .arg_sort(functor, position)
                            .map(str::to_string);
                    }
                }
            });
        }
        found.unwrap_or_else(|| UNIVERSE.to_string())
    }
}

/// Outcome of looking a random variable value up among the assumptions.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Lookup {
    Known(bool),
    /// An assumption applies iff the two terms are equal.
    Split(Expr, Expr),
    Unknown,
}

#[derive(Clone, Debug)]
pub struct Context {
    vocabulary: Arc<Vocabulary>,
    constraint: EqualityConstraint,
    assumptions: Vec<(Expr, bool)>,
    index_sorts: Vec<(String, String)>,
    formulas: Vec<Expr>,
    numeric_precision: Option<u32>,
}

impl Default for Context {
    fn default() -> Self {
        Self::new(Arc::new(Vocabulary::default()))
    }
}

impl Context {
    pub fn new(vocabulary: Arc<Vocabulary>) -> Self {
        Self {
            vocabulary,
            constraint: EqualityConstraint::new(),
            assumptions: Vec::new(),
            index_sorts: Vec::new(),
            formulas: Vec::new(),
            numeric_precision: None,
        }
    }

    /// A context whose arithmetic keeps `digits` significant digits instead
    /// of exact values.
    pub fn with_numeric_precision(&self, digits: u32) -> Self {
        Self {
            numeric_precision: Some(digits),
            ..self.clone()
        }
    }

    pub fn numeric_precision(&self) -> Option<u32> {
        self.numeric_precision
    }

    pub fn vocabulary(&self) -> &Vocabulary {
        &self.vocabulary
    }

    pub fn shared_vocabulary(&self) -> Arc<Vocabulary> {
        Arc::clone(&self.vocabulary)
    }

    pub fn constraint(&self) -> &EqualityConstraint {
        &self.constraint
    }

    pub fn assumptions(&self) -> &[(Expr, bool)] {
        &self.assumptions
    }

    pub fn are_equal(&self, a: &Expr, b: &Expr) -> Option<bool> {
        self.constraint.are_equal(a, b)
    }

    pub fn with_equality(&self, a: &Expr, b: &Expr) -> Option<Self> {
        let constraint = self.constraint.with_equality(a, b)?;
        Some(Self {
            constraint,
            ..self.clone()
        })
    }

    pub fn with_disequality(&self, a: &Expr, b: &Expr) -> Option<Self> {
        let constraint = self.constraint.with_disequality(a, b)?;
        Some(Self {
            constraint,
            ..self.clone()
        })
    }

    /// Value assumed for a random variable value.
    pub fn lookup_random_value(&self, value: &Expr) -> Lookup {
        let Expr::RandomValue { functor, args } = value else {
            return Lookup::Unknown;
        };
        for (assumed, truth) in self.assumptions.iter().rev() {
            let Expr::RandomValue {
                functor: other,
                args: other_args,
            } = assumed
            else {
                continue;
            };
            if other != functor || other_args.len() != args.len() {
                continue;
            }
            let mut undecided = None;
            let mut disjoint = false;
            for (x, y) in args.iter().zip(other_args) {
                match self.constraint.are_equal(x, y) {
                    Some(true) => {}
                    Some(false) => {
                        disjoint = true;
                        break;
                    }
                    None => {
                        if undecided.is_none() {
                            undecided = Some((x.clone(), y.clone()));
                        }
                    }
                }
            }
            if disjoint {
                continue;
            }
            return match undecided {
                None => Lookup::Known(*truth),
                Some((x, y)) => Lookup::Split(x, y),
            };
        }
        Lookup::Unknown
    }

    /// Assume `value` for a random variable value.
    pub fn with_assumption(&self, random_value: &Expr, value: bool) -> Option<Self> {
        match self.lookup_random_value(random_value) {
            Lookup::Known(known) if known != value => None,
            Lookup::Known(_) => Some(self.clone()),
            _ => {
                let mut next = self.clone();
                next.assumptions.push((random_value.clone(), value));
                Some(next)
            }
        }
    }

    /// Assume an atom (equality literal or random variable value) holds
    /// (`polarity`) or not. Other formulas are recorded but not reasoned with.
    pub fn with_literal(&self, atom: &Expr, polarity: bool) -> Option<Self> {
        match atom {
            Expr::Bool(value) => (*value == polarity).then(|| self.clone()),
            Expr::RandomValue { .. } => self.with_assumption(atom, polarity),
            Expr::Compound { op, args } if args.len() == 2 && args[0].is_term() && args[1].is_term() => {
                match (op, polarity) {
                    (Op::Equal, true) | (Op::NotEqual, false) => {
                        self.with_equality(&args[0], &args[1])
                    }
                    (Op::Equal, false) | (Op::NotEqual, true) => {
                        self.with_disequality(&args[0], &args[1])
                    }
                    _ => Some(self.with_opaque(atom, polarity)),
                }
            }
            Expr::Compound { op: Op::Not, args } if args.len() == 1 => {
                self.with_literal(&args[0], !polarity)
            }
            _ => Some(self.with_opaque(atom, polarity)),
        }
    }

    /// Conjoin a formula: conjunctions and literals are decomposed.
    pub fn with_formula(&self, formula: &Expr) -> Option<Self> {
        match formula.args_of(Op::And) {
            Some(conjuncts) => conjuncts
                .iter()
                .try_fold(self.clone(), |ctx, conjunct| ctx.with_formula(conjunct)),
            None => self.with_literal(formula, true),
        }
    }

    fn with_opaque(&self, formula: &Expr, polarity: bool) -> Self {
        let mut next = self.clone();
        next.formulas.push(if polarity {
            formula.clone()
        } else {
            Expr::not(formula.clone())
        });
        next
    }

    /// Register a contextual (index) variable.
    pub fn with_index(&self, variable: impl Into<String>, sort: impl Into<String>) -> Self {
        let mut next = self.clone();
        next.index_sorts.push((variable.into(), sort.into()));
        next
    }

    pub fn index_sort(&self, variable: &str) -> Option<&str> {
        self.index_sorts
            .iter()
            .rev()
            .find(|(name, _)| name == variable)
            .map(|(_, sort)| sort.as_str())
    }

    /// Every logical variable the context talks about.
    pub fn known_variables(&self) -> BTreeSet<String> {
        let mut out = self.constraint.variables();
        out.extend(self.index_sorts.iter().map(|(name, _)| name.clone()));
        for (value, _) in &self.assumptions {
            out.extend(value.free_variables());
        }
        for formula in &self.formulas {
            out.extend(formula.free_variables());
        }
        out
    }

    /// The context as a single formula, for display and tracing.
    pub fn to_formula(&self) -> Expr {
        let mut literals = self.constraint.literals();
        for (value, truth) in &self.assumptions {
            literals.push(if *truth {
                value.clone()
            } else {
                Expr::not(value.clone())
            });
        }
        literals.extend(self.formulas.iter().cloned());
        Expr::and_all(literals)
    }
}
