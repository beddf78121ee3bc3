//! Variable substitution and renaming.

use std::collections::{BTreeMap, BTreeSet};

use super::Expr;
use crate::set::{IndexDomain, IndexExpression, SetExpr};

/// Returns `base` primed (`X'`, `X''`, ...) until it avoids every name in `avoid`.
pub fn fresh_variable(base: &str, avoid: &BTreeSet<String>) -> String {
    let mut candidate = format!("{}'", base);
    while avoid.contains(&candidate) {
        candidate.push('\'');
    }
    candidate
}

impl Expr {
    /// Replaces free occurrences of the logical variable `name`.
    pub fn substitute(&self, name: &str, replacement: &Expr) -> Expr {
        let mut map = BTreeMap::new();
        map.insert(name.to_string(), replacement.clone());
        self.substitute_all(&map)
    }

    /// Simultaneous capture-avoiding substitution of logical variables.
    pub fn substitute_all(&self, map: &BTreeMap<String, Expr>) -> Expr {
        if map.is_empty() {
            return self.clone();
        }
        match self {
            Expr::Var(name) => map.get(name).cloned().unwrap_or_else(|| self.clone()),
            Expr::Bool(_) | Expr::Number(_) | Expr::Const(_) => self.clone(),
            Expr::RandomValue { functor, args } => Expr::RandomValue {
                functor: functor.clone(),
                args: args.iter().map(|a| a.substitute_all(map)).collect(),
            },
            Expr::Bracket(inner) => Expr::bracket(inner.substitute_all(map)),
            Expr::Compound { op, args } => Expr::Compound {
                op: *op,
                args: args.iter().map(|a| a.substitute_all(map)).collect(),
            },
            Expr::Set(set) => Expr::set(substitute_in_set(set, map)),
        }
    }

    /// Renames logical variables according to `renaming`.
    pub fn rename_variables(&self, renaming: &BTreeMap<String, String>) -> Expr {
        let map = renaming
            .iter()
            .map(|(from, to)| (from.clone(), Expr::var(to.clone())))
            .collect();
        self.substitute_all(&map)
    }

    /// Top-down rewrite: nodes for which `f` returns a replacement are
    /// replaced without descending into them.
    pub fn replace_all(&self, f: &dyn Fn(&Expr) -> Option<Expr>) -> Expr {
        if let Some(replacement) = f(self) {
            return replacement;
        }
        match self {
            Expr::Bool(_) | Expr::Number(_) | Expr::Var(_) | Expr::Const(_) => self.clone(),
            Expr::RandomValue { functor, args } => Expr::RandomValue {
                functor: functor.clone(),
                args: args.iter().map(|a| a.replace_all(f)).collect(),
            },
            Expr::Bracket(inner) => Expr::bracket(inner.replace_all(f)),
            Expr::Compound { op, args } => Expr::Compound {
                op: *op,
                args: args.iter().map(|a| a.replace_all(f)).collect(),
            },
            Expr::Set(set) => Expr::set(match set.as_ref() {
                SetExpr::Extensional { kind, elements } => SetExpr::Extensional {
                    kind: *kind,
                    elements: elements.iter().map(|e| e.replace_all(f)).collect(),
                },
                SetExpr::Intensional {
                    kind,
                    indices,
                    head,
                    condition,
                } => SetExpr::Intensional {
                    kind: *kind,
                    indices: indices
                        .iter()
                        .map(|index| IndexExpression {
                            index: index.index.clone(),
                            domain: match &index.domain {
                                Some(IndexDomain::Set(domain)) => {
                                    Some(IndexDomain::Set(domain.replace_all(f)))
                                }
                                other => other.clone(),
                            },
                        })
                        .collect(),
                    head: head.replace_all(f),
                    condition: condition.replace_all(f),
                },
            }),
        }
    }
}

fn substitute_in_set(set: &SetExpr, map: &BTreeMap<String, Expr>) -> SetExpr {
    match set {
        SetExpr::Extensional { kind, elements } => SetExpr::Extensional {
            kind: *kind,
            elements: elements.iter().map(|e| e.substitute_all(map)).collect(),
        },
        SetExpr::Intensional {
            kind,
            indices,
            head,
            condition,
        } => {
            let mut inner: BTreeMap<String, Expr> = map.clone();
            let mut incoming = BTreeSet::new();
            for value in map.values() {
                incoming.extend(value.free_variables());
            }
            let mut avoid = incoming.clone();
            avoid.extend(head.all_variables());
            avoid.extend(condition.all_variables());
            let mut new_indices = Vec::with_capacity(indices.len());
            for index in indices {
                let domain = match &index.domain {
                    Some(IndexDomain::Set(domain)) => {
                        Some(IndexDomain::Set(domain.substitute_all(map)))
                    }
                    other => other.clone(),
                };
                match index.name() {
                    Some(name) => {
                        inner.remove(name);
                        let name = name.to_string();
                        if incoming.contains(&name) {
                            let fresh = fresh_variable(&name, &avoid);
                            avoid.insert(fresh.clone());
                            inner.insert(name, Expr::var(fresh.clone()));
                            new_indices.push(IndexExpression {
                                index: Expr::var(fresh),
                                domain,
                            });
                        } else {
                            new_indices.push(IndexExpression {
                                index: index.index.clone(),
                                domain,
                            });
                        }
                    }
                    None => new_indices.push(IndexExpression {
                        index: index.index.substitute_all(map),
                        domain,
                    }),
                }
            }
            SetExpr::Intensional {
                kind: *kind,
                indices: new_indices,
                head: head.substitute_all(&inner),
                condition: condition.substitute_all(&inner),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fresh_variable() {
        let mut avoid = BTreeSet::new();
        assert_eq!(fresh_variable("X", &avoid), "X'");
        avoid.insert("X'".to_string());
        assert_eq!(fresh_variable("X", &avoid), "X''");
    }

    #[test]
    fn test_substitute_free_occurrences() {
        let e = Expr::and(
            Expr::rv("p", vec![Expr::var("X")]),
            Expr::eq(Expr::var("X"), Expr::var("Y")),
        );
        let replaced = e.substitute("X", &Expr::constant("a"));
        assert_eq!(
            replaced,
            Expr::and(
                Expr::rv("p", vec![Expr::constant("a")]),
                Expr::eq(Expr::constant("a"), Expr::var("Y")),
            )
        );
    }

    #[test]
    fn test_substitute_is_capture_avoiding() {
        // { (on X) p(X, Y) } with Y := X must rename the bound X.
        let set = Expr::intensional_uniset(
            vec![IndexExpression::new("X")],
            Expr::rv("p", vec![Expr::var("X"), Expr::var("Y")]),
            Expr::TRUE,
        );
        let replaced = set.substitute("Y", &Expr::var("X"));
        let expected = Expr::intensional_uniset(
            vec![IndexExpression::new("X'")],
            Expr::rv("p", vec![Expr::var("X'"), Expr::var("X")]),
            Expr::TRUE,
        );
        assert_eq!(replaced, expected);

        // The bound variable itself is never replaced.
        assert_eq!(set.substitute("X", &Expr::constant("a")), set);
    }

    #[test]
    fn test_replace_all_stops_at_replaced_nodes() {
        let marker = Expr::previous_message_to(
            Expr::rv_ref("p", vec![Expr::var("X")]),
            Expr::bracket(Expr::int(1)),
        );
        let e = Expr::times(vec![marker.clone(), Expr::int(2)]);
        let replaced = e.replace_all(&|node| (node == &marker).then(|| Expr::int(3)));
        assert_eq!(replaced, Expr::times(vec![Expr::int(3), Expr::int(2)]));
    }
}
