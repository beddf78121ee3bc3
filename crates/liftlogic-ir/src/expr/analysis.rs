//! Structural queries over expressions.

use std::collections::{BTreeSet, HashMap};

use super::{Expr, Op};
use crate::set::SetExpr;

impl Expr {
    /// Logical variables occurring free (not bound by an intensional index).
    pub fn free_variables(&self) -> BTreeSet<String> {
        let mut out = BTreeSet::new();
        collect_free(self, &mut Vec::new(), &mut out);
        out
    }

    pub fn mentions_variable(&self, name: &str) -> bool {
        self.free_variables().contains(name)
    }

    /// Every variable name, free or bound.
    pub fn all_variables(&self) -> BTreeSet<String> {
        let mut out = BTreeSet::new();
        self.visit(&mut |node| {
            if let Expr::Var(name) = node {
                out.insert(name.clone());
            }
        });
        out
    }

    /// Pre-order traversal.
    pub fn visit(&self, f: &mut dyn FnMut(&Expr)) {
        f(self);
        for child in self.children() {
            child.visit(f);
        }
    }

    /// Whether some node satisfies the predicate.
    pub fn any(&self, predicate: &dyn Fn(&Expr) -> bool) -> bool {
        predicate(self) || self.children().into_iter().any(|child| child.any(predicate))
    }

    /// Random variable values in depth-first order of first occurrence.
    /// Their arguments are not descended into.
    pub fn random_values(&self) -> Vec<Expr> {
        let mut out = Vec::new();
        collect_random_values(self, &mut out);
        out
    }

    pub fn contains_random_values(&self) -> bool {
        self.any(&|node| node.is_random_value())
    }

    pub fn contains_op(&self, op: Op) -> bool {
        self.any(&|node| node.has_op(op))
    }

    /// Whether a `previous message to .. from ..` placeholder occurs.
    pub fn contains_previous_messages(&self) -> bool {
        self.contains_op(Op::PreviousMessageTo)
    }

    pub fn contains_subexpression(&self, target: &Expr) -> bool {
        self.any(&|node| node == target)
    }

    /// Whether `self` and `other` coincide up to a bijective renaming of
    /// logical variables.
    pub fn is_variant_of(&self, other: &Expr) -> bool {
        let mut forward = HashMap::new();
        let mut backward = HashMap::new();
        variant(self, other, &mut forward, &mut backward)
    }

    /// Term equalities under which `self` and `other` are syntactically
    /// equal, or `None` when no assignment of constants to logical
    /// variables can make them equal.
    pub fn unification_equalities(&self, other: &Expr) -> Option<Vec<(Expr, Expr)>> {
        let mut out = Vec::new();
        if unify(self, other, &mut out) {
            Some(out)
        } else {
            None
        }
    }
}

fn collect_free(expr: &Expr, bound: &mut Vec<String>, out: &mut BTreeSet<String>) {
    match expr {
        Expr::Var(name) => {
            if !bound.contains(name) {
                out.insert(name.clone());
            }
        }
        Expr::Set(set) => match set.as_ref() {
            SetExpr::Extensional { elements, .. } => {
                for element in elements {
                    collect_free(element, bound, out);
                }
            }
            SetExpr::Intensional {
                indices,
                head,
                condition,
                ..
            } => {
                for index in indices {
                    if let Some(domain) = index.domain_set() {
                        collect_free(domain, bound, out);
                    }
                }
                let before = bound.len();
                bound.extend(indices.iter().filter_map(|i| i.name().map(str::to_string)));
                collect_free(head, bound, out);
                collect_free(condition, bound, out);
                bound.truncate(before);
            }
        },
        _ => {
            for child in expr.children() {
                collect_free(child, bound, out);
            }
        }
    }
}

fn collect_random_values(expr: &Expr, out: &mut Vec<Expr>) {
    if expr.is_random_value() {
        if !out.contains(expr) {
            out.push(expr.clone());
        }
        return;
    }
    for child in expr.children() {
        collect_random_values(child, out);
    }
}

fn variant(
    a: &Expr,
    b: &Expr,
    forward: &mut HashMap<String, String>,
    backward: &mut HashMap<String, String>,
) -> bool {
    match (a, b) {
        (Expr::Var(x), Expr::Var(y)) => {
            let f = forward.entry(x.clone()).or_insert_with(|| y.clone()).clone();
            let g = backward.entry(y.clone()).or_insert_with(|| x.clone()).clone();
            &f == y && &g == x
        }
        (Expr::RandomValue { functor: f, args: xs }, Expr::RandomValue { functor: g, args: ys }) => {
            f == g && xs.len() == ys.len() && pairwise(xs, ys, forward, backward)
        }
        (Expr::Compound { op: o1, args: xs }, Expr::Compound { op: o2, args: ys }) => {
            o1 == o2 && xs.len() == ys.len() && pairwise(xs, ys, forward, backward)
        }
        (Expr::Bracket(x), Expr::Bracket(y)) => variant(x, y, forward, backward),
        (Expr::Set(x), Expr::Set(y)) => {
            let (xs, ys) = (x.children(), y.children());
            x.kind() == y.kind()
                && x.is_extensional() == y.is_extensional()
                && x.indices().len() == y.indices().len()
                && xs.len() == ys.len()
                && x
                    .indices()
                    .iter()
                    .zip(y.indices())
                    .all(|(i, j)| variant(&i.index, &j.index, forward, backward))
                && xs
                    .into_iter()
                    .zip(ys)
                    .all(|(p, q)| variant(p, q, forward, backward))
        }
        _ => a == b,
    }
}

fn pairwise(
    xs: &[Expr],
    ys: &[Expr],
    forward: &mut HashMap<String, String>,
    backward: &mut HashMap<String, String>,
) -> bool {
    xs.iter()
        .zip(ys)
        .all(|(x, y)| variant(x, y, forward, backward))
}

fn unify(a: &Expr, b: &Expr, out: &mut Vec<(Expr, Expr)>) -> bool {
    if a == b {
        return true;
    }
    match (a, b) {
        (Expr::Const(_), Expr::Const(_)) => false,
        (x, y) if x.is_term() && y.is_term() => {
            out.push((x.clone(), y.clone()));
            true
        }
        (Expr::RandomValue { functor: f, args: xs }, Expr::RandomValue { functor: g, args: ys }) => {
            f == g && xs.len() == ys.len() && xs.iter().zip(ys).all(|(x, y)| unify(x, y, out))
        }
        (Expr::Compound { op: o1, args: xs }, Expr::Compound { op: o2, args: ys }) => {
            o1 == o2 && xs.len() == ys.len() && xs.iter().zip(ys).all(|(x, y)| unify(x, y, out))
        }
        (Expr::Bracket(x), Expr::Bracket(y)) => unify(x, y, out),
        (Expr::Set(x), Expr::Set(y)) => match (x.elements(), y.elements()) {
            (Some(xs), Some(ys)) => {
                x.kind() == y.kind()
                    && xs.len() == ys.len()
                    && xs.iter().zip(ys).all(|(p, q)| unify(p, q, out))
            }
            _ => false,
        },
        _ => false,
    }
}
