//! Products of the messages a random variable receives from a set of
//! factors: `R_prod_factor(prod_{F in S} m_V<-F, beingComputed)` and
//! `R_prod_m_and_prod_factor(m, prod_{F in S} m_V<-F, beingComputed)`.

use liftlogic_ir::set::intensional::with_inferred_sorts;
use liftlogic_ir::{
    branch_on_formula, standardize_parts, Expr, IndexExpression, Op, SetExpr, SetKind,
};
use tracing::debug;

use super::{referenced_value, relevant_range, ProductOverSet};
use crate::being_computed::BeingComputed;
use crate::error::{LbpError, Result};
use crate::process::{args, RewriterName, RewritingProcess};

/// `R_prod_factor` by the shape of `S`:
///
/// - `{ }`: 1
/// - `{ F1 }`: the message from `F1`
/// - `{{ (on I) F | C }}`: the message from a generic `F`, raised to the
///   number of instances, computed once for all of them
/// - `S1 union S2`, `{{ F1, ..., Fn }}`: the first part times the rest
/// - `if C then S1 else S2`: split on `C`
pub fn rewrite(process: &RewritingProcess<'_>, argument: &Expr) -> Result<Expr> {
    let parts = args::components(argument, 2, "R_prod_factor")?;
    let registry = BeingComputed::from_expr(&parts[1])?;
    if let Some((condition, then_branch, else_branch)) = parts[0].ite_parts() {
        return split(process, condition, then_branch, else_branch, &registry);
    }
    let product = ProductOverSet::parse(&parts[0], "R_prod_factor")?;

    if let Some((condition, then_branch, else_branch)) = product.domain.ite_parts() {
        return split(
            process,
            condition,
            &product.over(then_branch.clone()),
            &product.over(else_branch.clone()),
            &registry,
        );
    }

    if let Some(operands) = product.domain.args_of(Op::Union) {
        return match operands {
            [] => Ok(Expr::one()),
            [single] => process.rewrite(
                RewriterName::ProductFactor,
                &args::product_factor(product.over(single.clone()), &registry),
            ),
            [first, rest @ ..] => {
                check_union_operands(operands)?;
                let rest = match rest {
                    [only] => only.clone(),
                    _ => Expr::union(rest.to_vec()),
                };
                first_times_rest(process, &product, first.clone(), rest, &registry)
            }
        };
    }

    match product.domain.as_set() {
        Some(SetExpr::Extensional { elements, .. }) => match elements.as_slice() {
            [] => Ok(Expr::one()),
            [factor] => process.rewrite(
                RewriterName::MessageToVariableFromFactor,
                &args::message(product.instance(factor), &registry),
            ),
            [first, rest @ ..] if product.domain.as_set().is_some_and(SetExpr::is_multiset) => {
                first_times_rest(
                    process,
                    &product,
                    Expr::multiset(vec![first.clone()]),
                    Expr::multiset(rest.to_vec()),
                    &registry,
                )
            }
            _ => Err(overlapping_uniset(&product.domain)),
        },
        Some(SetExpr::Intensional {
            kind: SetKind::MultiSet,
            indices,
            head,
            condition,
        }) => over_instances(process, &product, indices, head, condition, &registry),
        _ => Err(LbpError::IllegalArgument(format!(
            "R_prod_factor cannot take the product over {}",
            product.domain
        ))),
    }
}

fn split(
    process: &RewritingProcess<'_>,
    condition: &Expr,
    then_product: &Expr,
    else_product: &Expr,
    registry: &BeingComputed,
) -> Result<Expr> {
    branch_on_formula(
        condition,
        process.context(),
        &|ctx| {
            process.with_context(ctx.clone()).rewrite(
                RewriterName::ProductFactor,
                &args::product_factor(then_product.clone(), registry),
            )
        },
        &|ctx| {
            process.with_context(ctx.clone()).rewrite(
                RewriterName::ProductFactor,
                &args::product_factor(else_product.clone(), registry),
            )
        },
    )
}

fn first_times_rest(
    process: &RewritingProcess<'_>,
    product: &ProductOverSet,
    first: Expr,
    rest: Expr,
    registry: &BeingComputed,
) -> Result<Expr> {
    let message = process.rewrite(
        RewriterName::ProductFactor,
        &args::product_factor(product.over(first), registry),
    )?;
    process.rewrite(
        RewriterName::ProductMessageAndProductFactor,
        &args::message_times_product(message, product.over(rest), registry),
    )
}

/// Product over `{{ (on I) F | C }}`: the message from `F` is computed
/// once, in the scope of the indices, and the lifted product takes care of
/// the number of instances.
fn over_instances(
    process: &RewritingProcess<'_>,
    product: &ProductOverSet,
    indices: &[IndexExpression],
    head: &Expr,
    condition: &Expr,
    registry: &BeingComputed,
) -> Result<Expr> {
    let mut avoid = process.context().known_variables();
    avoid.extend(product.head.free_variables());
    avoid.remove(&product.index);
    let (indices, head, condition) = standardize_parts(indices, head, condition, &avoid);

    let sorts = with_inferred_sorts(&indices, &head, &condition, process.model().vocabulary());
    let scope = sorts
        .iter()
        .fold(process.context().clone(), |ctx, (name, sort)| ctx.with_index(name, sort));
    let Some(scope) = scope.with_formula(&condition) else {
        debug!(set = %product.domain, "no factor instance satisfies the condition");
        return Ok(Expr::one());
    };

    let message = process.with_context(scope).rewrite(
        RewriterName::MessageToVariableFromFactor,
        &args::message(product.instance(&head), registry),
    )?;
    let typed = sorts
        .into_iter()
        .map(|(name, sort)| IndexExpression::in_sort(name, sort))
        .collect();
    process.simplify(&Expr::product(Expr::intensional_multiset(
        typed, message, condition,
    )))
}

fn overlapping_uniset(set: &Expr) -> LbpError {
    LbpError::IllegalArgument(format!(
        "R_prod_factor cannot split the uniset {}, whose elements may coincide",
        set
    ))
}

/// Union operands are multisets, empty or singleton unisets, nested unions
/// or conditionals over such sets. Any other uniset may share elements with
/// the other operands. Nested operands are checked as well, so that no
/// shortcut taken on a partial product can hide an illegal one.
fn check_union_operands(operands: &[Expr]) -> Result<()> {
    operands.iter().try_for_each(check_union_operand)
}

fn check_union_operand(operand: &Expr) -> Result<()> {
    if let Some(nested) = operand.args_of(Op::Union) {
        return check_union_operands(nested);
    }
    if let Some((_, then_branch, else_branch)) = operand.ite_parts() {
        check_union_operand(then_branch)?;
        return check_union_operand(else_branch);
    }
    match operand.as_set() {
        Some(set @ SetExpr::Extensional { elements, .. })
            if !set.is_multiset() && elements.len() > 1 =>
        {
            Err(overlapping_uniset(operand))
        }
        Some(set @ SetExpr::Intensional { .. }) if !set.is_multiset() => {
            Err(overlapping_uniset(operand))
        }
        _ => Ok(()),
    }
}

/// `R_prod_m_and_prod_factor`: `m` times the product over the remaining
/// factors. With `use_forced_message_shortcut`, when `m` alone already forces
/// the value of the variable, the remaining factors cannot change the
/// normalized message and are not visited.
pub fn rewrite_message_times_product(
    process: &RewritingProcess<'_>,
    argument: &Expr,
) -> Result<Expr> {
    let parts = args::components(argument, 3, "R_prod_m_and_prod_factor")?;
    let message = &parts[0];
    let product = ProductOverSet::parse(&parts[1], "R_prod_m_and_prod_factor")?;
    let registry = BeingComputed::from_expr(&parts[2])?;

    check_union_operand(&product.domain)?;

    if process.config().use_forced_message_shortcut {
        let (target, _) = product.message().ok_or_else(|| {
            LbpError::IllegalArgument(format!(
                "R_prod_m_and_prod_factor expects a product of messages, got {}",
                parts[1]
            ))
        })?;
        let value = referenced_value(target, "R_prod_m_and_prod_factor")?;
        if relevant_range(process, value, message)?.len() == 1 {
            debug!(random_variable = %target, "remaining factors skipped, value forced by message");
            return Ok(message.clone());
        }
    }

    let rest = process.rewrite(
        RewriterName::ProductFactor,
        &args::product_factor(parts[1].clone(), &registry),
    )?;
    process.simplify(&Expr::times(vec![message.clone(), rest]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LbpConfig;
    use crate::error::ErrorKind;
    use crate::example_models;
    use crate::model::Model;
    use crate::process::QueryState;
    use crate::rewriters::product_over;

    fn factor(x: Expr) -> Expr {
        let p = Expr::rv("p", vec![x]);
        Expr::bracket(Expr::ite(
            Expr::and(Expr::rv("r", vec![]), Expr::or(p.clone(), Expr::not(p))),
            Expr::ratio(2, 10),
            Expr::ratio(3, 10),
        ))
    }

    fn product_to_r(domain: Expr) -> Expr {
        let r = Expr::rv_ref("r", vec![]);
        product_over(domain, "F", &[&r], |f| Expr::message_to(r.clone(), f))
    }

    fn run(model: &Model, config: &LbpConfig, name: RewriterName, argument: &Expr) -> Result<Expr> {
        let state = QueryState::new(0);
        RewritingProcess::new(model, config, &state).rewrite(name, argument)
    }

    fn product_factor(model: &Model, domain: Expr) -> Result<Expr> {
        run(
            model,
            &LbpConfig::default(),
            RewriterName::ProductFactor,
            &args::product_factor(product_to_r(domain), &BeingComputed::new()),
        )
    }

    #[test]
    fn test_empty_product_is_one() {
        let model = example_models::trivial_pr_with_non_deterministic_factor().unwrap();
        assert_eq!(product_factor(&model, Expr::empty_set()).unwrap(), Expr::one());
    }

    #[test]
    fn test_singleton_is_its_message() {
        let model = example_models::trivial_pr_with_non_deterministic_factor().unwrap();
        let result = product_factor(&model, Expr::uniset(vec![factor(Expr::var("X"))])).unwrap();
        assert_eq!(result.to_string(), "if r then 0.4 else 0.6");
    }

    #[test]
    fn test_intensional_product_is_lifted() {
        let model = example_models::trivial_pr_with_non_deterministic_factor().unwrap();
        let x = Expr::var("X");
        let domain = Expr::intensional_multiset(
            vec![IndexExpression::new("X")],
            factor(x.clone()),
            Expr::or(
                Expr::eq(x.clone(), Expr::constant("a")),
                Expr::eq(x, Expr::constant("b")),
            ),
        );
        let result = product_factor(&model, domain).unwrap();
        assert_eq!(result.to_string(), "if r then 0.16 else 0.36");
    }

    #[test]
    fn test_intensional_product_over_a_sized_universe() {
        let model = example_models::trivial_pr_with_non_deterministic_factor()
            .and_then(|model| model.with_sort_size("Universe", 2))
            .unwrap();
        let domain = Expr::intensional_multiset(
            vec![IndexExpression::new("X")],
            factor(Expr::var("X")),
            Expr::TRUE,
        );
        let result = product_factor(&model, domain).unwrap();
        assert_eq!(result.to_string(), "if r then 0.16 else 0.36");
    }

    #[test]
    fn test_multiset_is_taken_one_factor_at_a_time() {
        let model = example_models::trivial_pr_with_non_deterministic_factor().unwrap();
        let domain = Expr::multiset(vec![
            factor(Expr::constant("a")),
            factor(Expr::constant("b")),
        ]);
        let result = product_factor(&model, domain).unwrap();
        assert_eq!(result.to_string(), "if r then 0.16 else 0.36");
    }

    #[test]
    fn test_union_of_unisets_is_rejected() {
        let model = example_models::trivial_pr_with_non_deterministic_factor().unwrap();
        let domain = Expr::union(vec![
            Expr::uniset(vec![factor(Expr::var("X")), factor(Expr::var("Y"))]),
            Expr::uniset(vec![factor(Expr::var("Z"))]),
        ]);
        let err = product_factor(&model, domain).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedInput);
    }

    /// `{ [if r then 1 else 0] } union rest`, whose first message forces `r`.
    fn after_forcing_factor(rest: Expr) -> Expr {
        let forcing = Expr::bracket(Expr::ite(Expr::rv("r", vec![]), Expr::int(1), Expr::int(0)));
        Expr::union(vec![Expr::uniset(vec![forcing]), rest])
    }

    #[test]
    fn test_intensional_uniset_operand_is_rejected() {
        let model = example_models::trivial_pr_with_non_deterministic_factor().unwrap();
        let instances = Expr::intensional_uniset(
            vec![IndexExpression::new("X")],
            factor(Expr::var("X")),
            Expr::TRUE,
        );
        let domains = [
            after_forcing_factor(instances.clone()),
            after_forcing_factor(Expr::union(vec![
                Expr::multiset(vec![factor(Expr::constant("a"))]),
                instances,
            ])),
        ];
        for domain in &domains {
            for shortcut in [true, false] {
                let config = LbpConfig::default().with_forced_message_shortcut(shortcut);
                let err = run(
                    &model,
                    &config,
                    RewriterName::ProductFactor,
                    &args::product_factor(product_to_r(domain.clone()), &BeingComputed::new()),
                )
                .unwrap_err();
                assert_eq!(err.kind(), ErrorKind::MalformedInput);
            }
        }
    }

    #[test]
    fn test_forced_message_shortcut_keeps_the_normalized_product() {
        let model = example_models::trivial_pr_with_non_deterministic_factor()
            .and_then(|model| model.with_sort_size("Universe", 2))
            .unwrap();
        let domain = after_forcing_factor(Expr::intensional_multiset(
            vec![IndexExpression::new("X")],
            factor(Expr::var("X")),
            Expr::TRUE,
        ));
        let normalized = |shortcut: bool| {
            let config = LbpConfig::default().with_forced_message_shortcut(shortcut);
            let state = QueryState::new(0);
            let process = RewritingProcess::new(&model, &config, &state);
            let product = process
                .rewrite(
                    RewriterName::ProductFactor,
                    &args::product_factor(product_to_r(domain.clone()), &BeingComputed::new()),
                )
                .unwrap();
            process
                .rewrite(
                    RewriterName::Normalize,
                    &args::normalize(Expr::bracket(Expr::rv("r", vec![])), product),
                )
                .unwrap()
        };
        let with_shortcut = normalized(true);
        assert_eq!(with_shortcut.to_string(), "if r then 1 else 0");
        assert_eq!(with_shortcut, normalized(false));
    }

    #[test]
    fn test_message_times_remaining_product() {
        let model = example_models::trivial_pr_with_non_deterministic_factor().unwrap();
        let message = Expr::ite(Expr::rv("r", vec![]), Expr::ratio(7, 10), Expr::ratio(3, 10));
        let argument = args::message_times_product(
            message,
            product_to_r(Expr::uniset(vec![factor(Expr::constant("a"))])),
            &BeingComputed::new(),
        );
        let result = run(
            &model,
            &LbpConfig::default(),
            RewriterName::ProductMessageAndProductFactor,
            &argument,
        )
        .unwrap();
        assert_eq!(result.to_string(), "if r then 0.28 else 0.18");
    }

    #[test]
    fn test_forcing_message_skips_remaining_product() {
        let model = example_models::trivial_pr_with_non_deterministic_factor().unwrap();
        let message = Expr::ite(Expr::rv("r", vec![]), Expr::int(1), Expr::int(0));
        let argument = args::message_times_product(
            message.clone(),
            product_to_r(Expr::uniset(vec![factor(Expr::constant("a"))])),
            &BeingComputed::new(),
        );
        let config = LbpConfig::default();
        let state = QueryState::new(0);
        let process = RewritingProcess::new(&model, &config, &state);
        let result = process
            .rewrite(RewriterName::ProductMessageAndProductFactor, &argument)
            .unwrap();
        assert_eq!(result, message);
        assert_eq!(state.messages_computed(), 0);
    }
}
