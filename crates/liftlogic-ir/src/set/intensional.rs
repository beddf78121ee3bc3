//! Intensional sets: standardizing apart and simplification.

use std::collections::{BTreeMap, BTreeSet};

use crate::context::{Context, Vocabulary};
use crate::error::Result;
use crate::expr::{fresh_variable, Expr, Op};
use crate::set::{IndexDomain, IndexExpression, SetExpr, SetKind};
use crate::simplify::{branch_on_formula, compact, normalize};

/// Renames the indices of an intensional set that clash with `avoid`.
///
/// Returns the renamed indices, head and condition. Index domains are left
/// untouched since they are evaluated outside the scope of the indices.
pub fn standardize_parts(
    indices: &[IndexExpression],
    head: &Expr,
    condition: &Expr,
    avoid: &BTreeSet<String>,
) -> (Vec<IndexExpression>, Expr, Expr) {
    let mut taken: BTreeSet<String> = avoid.clone();
    taken.extend(head.all_variables());
    taken.extend(condition.all_variables());
    let mut renaming = BTreeMap::new();
    let mut renamed = Vec::with_capacity(indices.len());
    for index in indices {
        match index.name() {
            Some(name) if avoid.contains(name) => {
                let fresh = fresh_variable(name, &taken);
                taken.insert(fresh.clone());
                renaming.insert(name.to_string(), fresh.clone());
                renamed.push(IndexExpression {
                    index: Expr::var(fresh),
                    domain: index.domain.clone(),
                });
            }
            _ => renamed.push(index.clone()),
        }
    }
    if renaming.is_empty() {
        return (renamed, head.clone(), condition.clone());
    }
    (
        renamed,
        head.rename_variables(&renaming),
        condition.rename_variables(&renaming),
    )
}

/// Same as [`standardize_parts`] for a whole set.
pub fn standardize_apart(set: &SetExpr, avoid: &BTreeSet<String>) -> SetExpr {
    match set {
        SetExpr::Intensional {
            kind,
            indices,
            head,
            condition,
        } => {
            let (indices, head, condition) = standardize_parts(indices, head, condition, avoid);
            SetExpr::Intensional {
                kind: *kind,
                indices,
                head,
                condition,
            }
        }
        extensional => extensional.clone(),
    }
}

/// `(name, sort)` for every index ranging over a sort, with the sort taken
/// from the index expression or inferred from argument positions.
pub fn with_inferred_sorts(
    indices: &[IndexExpression],
    head: &Expr,
    condition: &Expr,
    vocabulary: &Vocabulary,
) -> Vec<(String, String)> {
    indices
        .iter()
        .filter(|index| index.domain_set().is_none())
        .filter_map(|index| {
            let name = index.name()?;
            let sort = match index.sort() {
                Some(sort) => sort.to_string(),
                None => vocabulary.infer_sort(name, &[head, condition]),
            };
            Some((name.to_string(), sort))
        })
        .collect()
}

/// The context inside the scope of the indices.
pub(crate) fn scope(ctx: &Context, sorts: &[(String, String)]) -> Context {
    sorts
        .iter()
        .fold(ctx.clone(), |inner, (name, sort)| inner.with_index(name, sort))
}

/// Simplifies an intensional set. Conditions are simplified in the scope of
/// the indices, indices bound by an equality in the condition are
/// eliminated, and a set without indices becomes a conditional singleton.
pub fn simplify_intensional(set: &SetExpr, ctx: &Context) -> Result<Expr> {
    let SetExpr::Intensional {
        kind,
        indices,
        head,
        condition,
    } = set
    else {
        return Ok(Expr::set(set.clone()));
    };
    if indices.iter().any(|index| index.domain_set().is_some()) {
        return simplify_index_domains(*kind, indices, head, condition, ctx);
    }

    let (mut indices, mut head, mut condition) =
        standardize_parts(indices, head, condition, &ctx.known_variables());
    loop {
        let sorts = with_inferred_sorts(&indices, &head, &condition, ctx.vocabulary());
        let inner = scope(ctx, &sorts);
        let simplified = compact(&normalize(&condition, &inner)?);
        if simplified == Expr::FALSE {
            return Ok(Expr::empty_set());
        }
        if let Some((name, value)) = bound_index(&simplified, &indices) {
            head = head.substitute(&name, &value);
            condition = simplified.substitute(&name, &value);
            indices.retain(|index| index.name() != Some(name.as_str()));
            continue;
        }
        if indices.is_empty() {
            let element = head.clone();
            let kind = *kind;
            return branch_on_formula(
                &simplified,
                ctx,
                &|_| Ok(Expr::set(SetExpr::singleton(kind, element.clone()))),
                &|_| Ok(Expr::empty_set()),
            );
        }
        return Ok(Expr::set(SetExpr::Intensional {
            kind: *kind,
            indices,
            head,
            condition: simplified,
        }));
    }
}

fn simplify_index_domains(
    kind: SetKind,
    indices: &[IndexExpression],
    head: &Expr,
    condition: &Expr,
    ctx: &Context,
) -> Result<Expr> {
    let mut simplified = Vec::with_capacity(indices.len());
    for index in indices {
        match index.domain_set() {
            Some(domain) => {
                let domain = compact(&normalize(domain, ctx)?);
                if domain.is_empty_set() {
                    return Ok(Expr::empty_set());
                }
                simplified.push(IndexExpression {
                    index: index.index.clone(),
                    domain: Some(IndexDomain::Set(domain)),
                });
            }
            None => simplified.push(index.clone()),
        }
    }
    Ok(Expr::set(SetExpr::Intensional {
        kind,
        indices: simplified,
        head: head.clone(),
        condition: condition.clone(),
    }))
}

/// An index fixed by an equality on the conjunctive spine of `condition`.
fn bound_index(condition: &Expr, indices: &[IndexExpression]) -> Option<(String, Expr)> {
    let is_index = |expr: &Expr| {
        expr.variable_name()
            .is_some_and(|name| indices.iter().any(|index| index.name() == Some(name)))
    };
    let conjuncts: Vec<&Expr> = match condition.args_of(Op::And) {
        Some(args) => args.iter().collect(),
        None => vec![condition],
    };
    for conjunct in conjuncts {
        let Some([left, right]) = conjunct.args_of(Op::Equal) else {
            continue;
        };
        for (index, value) in [(right, left), (left, right)] {
            if is_index(index) && !value.any(&|node| node == index) {
                let name = index.variable_name()?.to_string();
                return Some((name, value.clone()));
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn x() -> Expr {
        Expr::var("X")
    }

    fn c(name: &str) -> Expr {
        Expr::constant(name)
    }

    fn simplify_set(e: &Expr, ctx: &Context) -> Expr {
        simplify_intensional(e.as_set().unwrap(), ctx).unwrap()
    }

    #[test]
    fn test_standardize_apart_renames_clashing_indices() {
        let avoid: BTreeSet<String> = ["X".to_string()].into();
        let (indices, head, condition) = standardize_parts(
            &[IndexExpression::new("X")],
            &x(),
            &Expr::neq(x(), c("a")),
            &avoid,
        );
        assert_eq!(indices[0].name(), Some("X'"));
        assert_eq!(head, Expr::var("X'"));
        assert_eq!(condition, Expr::neq(Expr::var("X'"), c("a")));
    }

    #[test]
    fn test_false_condition_gives_empty_set() {
        let set = Expr::intensional_multiset(
            vec![IndexExpression::new("X")],
            c("a"),
            Expr::and(Expr::neq(x(), c("a")), Expr::neq(c("a"), c("a"))),
        );
        assert_eq!(simplify_set(&set, &Context::default()), Expr::empty_set());
    }

    #[test]
    fn test_bound_index_is_eliminated() {
        let set = Expr::intensional_uniset(
            vec![IndexExpression::new("X")],
            x(),
            Expr::and(Expr::neq(x(), c("a")), Expr::eq(x(), c("b"))),
        );
        assert_eq!(
            simplify_set(&set, &Context::default()),
            Expr::uniset(vec![c("b")])
        );
    }

    #[test]
    fn test_free_variables_make_conditional_singletons() {
        let set = Expr::intensional_uniset(
            vec![IndexExpression::new("X")],
            x(),
            Expr::and(Expr::eq(x(), Expr::var("Y")), Expr::neq(Expr::var("Y"), c("a"))),
        );
        assert_eq!(
            simplify_set(&set, &Context::default()).to_string(),
            "if Y = a then { } else { Y }"
        );
    }

    #[test]
    fn test_index_clashing_with_context_is_renamed() {
        let ctx = Context::default().with_index("X", "Universe");
        let set = Expr::intensional_multiset(
            vec![IndexExpression::new("X")],
            x(),
            Expr::neq(x(), c("a")),
        );
        assert_eq!(
            simplify_set(&set, &ctx).to_string(),
            "{{ ( on X' ) X' | X' != a }}"
        );
    }
}
