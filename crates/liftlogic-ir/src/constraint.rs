//! Equality constraints over logical variables and constants.
//!
//! A conjunction of literals `X = Y`, `X = a`, `X != b` kept as union-find
//! classes plus a list of disequalities. Distinct constants are always
//! distinct (unique names assumption).

use std::collections::BTreeSet;

use crate::expr::Expr;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EqualityConstraint {
    /// Equivalence classes with at least two members, each kept sorted.
    classes: Vec<Vec<Expr>>,
    disequalities: Vec<(Expr, Expr)>,
}

impl EqualityConstraint {
    pub fn new() -> Self {
        Self::default()
    }

    fn class_of(&self, term: &Expr) -> Option<usize> {
        self.classes.iter().position(|class| class.contains(term))
    }

    /// Canonical member of the class of `term`: its constant if it has one,
    /// otherwise its least variable.
    pub fn representative(&self, term: &Expr) -> Expr {
        match self.class_of(term) {
            Some(i) => {
                let class = &self.classes[i];
                class
                    .iter()
                    .find(|member| !member.is_variable())
                    .or_else(|| class.first())
                    .cloned()
                    .unwrap_or_else(|| term.clone())
            }
            None => term.clone(),
        }
    }

    /// Number of terms known to be equal to `term`, itself included.
    pub fn class_size(&self, term: &Expr) -> usize {
        self.class_of(term).map_or(1, |i| self.classes[i].len())
    }

    /// `Some(true)`/`Some(false)` when the constraint decides `a = b`.
    pub fn are_equal(&self, a: &Expr, b: &Expr) -> Option<bool> {
        let (ra, rb) = (self.representative(a), self.representative(b));
        if ra == rb {
            return Some(true);
        }
        if !ra.is_variable() && !rb.is_variable() {
            return Some(false);
        }
        let separated = self.disequalities.iter().any(|(x, y)| {
            let (rx, ry) = (self.representative(x), self.representative(y));
            (rx == ra && ry == rb) || (rx == rb && ry == ra)
        });
        if separated {
            Some(false)
        } else {
            None
        }
    }

    /// Conjoins `a = b`; `None` if that makes the constraint unsatisfiable.
    pub fn with_equality(&self, a: &Expr, b: &Expr) -> Option<Self> {
        match self.are_equal(a, b) {
            Some(true) => return Some(self.clone()),
            Some(false) => return None,
            None => {}
        }
        let mut next = self.clone();
        match (next.class_of(a), next.class_of(b)) {
            (None, None) => next.classes.push(vec![a.clone(), b.clone()]),
            (Some(i), None) => next.classes[i].push(b.clone()),
            (None, Some(j)) => next.classes[j].push(a.clone()),
            (Some(i), Some(j)) => {
                let merged = next.classes[j].clone();
                next.classes[i].extend(merged);
                next.classes.remove(j);
            }
        }
        for class in &mut next.classes {
            class.sort();
            class.dedup();
        }
        let broken = next
            .disequalities
            .iter()
            .any(|(x, y)| next.representative(x) == next.representative(y));
        if broken {
            None
        } else {
            Some(next)
        }
    }

    /// Conjoins `a != b`; `None` if that makes the constraint unsatisfiable.
    pub fn with_disequality(&self, a: &Expr, b: &Expr) -> Option<Self> {
        match self.are_equal(a, b) {
            Some(true) => None,
            Some(false) => Some(self.clone()),
            None => {
                let mut next = self.clone();
                let pair = if a <= b {
                    (a.clone(), b.clone())
                } else {
                    (b.clone(), a.clone())
                };
                next.disequalities.push(pair);
                Some(next)
            }
        }
    }

    /// Distinct representatives of the terms explicitly constrained to
    /// differ from `term`.
    pub fn disequal_representatives(&self, term: &Expr) -> Vec<Expr> {
        let rep = self.representative(term);
        let mut out: Vec<Expr> = Vec::new();
        for (x, y) in &self.disequalities {
            let (rx, ry) = (self.representative(x), self.representative(y));
            let other = if rx == rep {
                ry
            } else if ry == rep {
                rx
            } else {
                continue;
            };
            if !out.contains(&other) {
                out.push(other);
            }
        }
        out
    }

    pub fn variables(&self) -> BTreeSet<String> {
        let mut out = BTreeSet::new();
        let terms = self
            .classes
            .iter()
            .flatten()
            .chain(self.disequalities.iter().flat_map(|(x, y)| [x, y]));
        for term in terms {
            if let Expr::Var(name) = term {
                out.insert(name.clone());
            }
        }
        out
    }

    /// Literals of the constraint, equalities first.
    pub fn literals(&self) -> Vec<Expr> {
        let mut out = Vec::new();
        for class in &self.classes {
            let rep = self.representative(&class[0]);
            for member in class.iter().filter(|member| **member != rep) {
                out.push(Expr::eq(member.clone(), rep.clone()));
            }
        }
        for (x, y) in &self.disequalities {
            out.push(Expr::neq(x.clone(), y.clone()));
        }
        out
    }

    pub fn is_trivial(&self) -> bool {
        self.classes.is_empty() && self.disequalities.is_empty()
    }
}
