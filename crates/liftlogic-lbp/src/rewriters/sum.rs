//! `R_sum(N, E, prod_{V in N'} m_F<-V, T, beingComputed)`
//!
//! Sums `E` times the incoming messages over the values of the random
//! variables in `N`, one variable at a time:
//!
//! 1. `E` conditioned on logical variables only: sum each branch.
//! 2. `N` or `N'` conditional: sum under each branch of the condition.
//! 3. Otherwise pick `V'` in `N` (preferably one with a pending message),
//!    compute its message `M` if needed and replace `E` by
//!    `sum_{v'} E * M`, then continue with `N \ {V'}`.
//!
//! Variables of `N` that `E` does not mention are dropped along with their
//! messages, and once `N` is exhausted the summand is the result.

use liftlogic_ir::{branch_on_formula, Expr, Op, SetExpr};
use tracing::{debug, trace};

use super::{relevant_range, ProductOverSet};
use crate::being_computed::BeingComputed;
use crate::error::{LbpError, Result};
use crate::process::{args, RewriterName, RewritingProcess};

pub fn rewrite(process: &RewritingProcess<'_>, argument: &Expr) -> Result<Expr> {
    let parts = args::components(argument, 5, "R_sum")?;
    let incoming = ProductOverSet::parse(&parts[2], "R_sum")?;
    let registry = BeingComputed::from_expr(&parts[4])?;
    let summation = Summation {
        variables: &parts[0],
        summand: &parts[1],
        incoming: &incoming,
        target: &parts[3],
        registry: &registry,
    };

    if let Some((condition, then_branch, else_branch)) = summation.summand.ite_parts() {
        if !condition.contains_random_values() {
            return branch_on_formula(
                condition,
                process.context(),
                &|ctx| summation.with_summand(then_branch).recurse(&process.with_context(ctx.clone())),
                &|ctx| summation.with_summand(else_branch).recurse(&process.with_context(ctx.clone())),
            );
        }
    }

    let pending_condition = summation
        .variables
        .ite_parts()
        .or_else(|| incoming.domain.ite_parts())
        .map(|(condition, _, _)| condition);
    if let Some(condition) = pending_condition {
        return branch_on_formula(
            condition,
            process.context(),
            &|ctx| summation.resolved(&process.with_context(ctx.clone())),
            &|ctx| summation.resolved(&process.with_context(ctx.clone())),
        );
    }

    summation.eliminate_one(process)
}

#[derive(Clone, Copy)]
struct Summation<'s> {
    variables: &'s Expr,
    summand: &'s Expr,
    incoming: &'s ProductOverSet,
    target: &'s Expr,
    registry: &'s BeingComputed,
}

impl<'s> Summation<'s> {
    fn with_summand(self, summand: &'s Expr) -> Self {
        Self { summand, ..self }
    }

    fn recurse(&self, process: &RewritingProcess<'_>) -> Result<Expr> {
        self.recurse_with(
            process,
            self.variables.clone(),
            self.summand.clone(),
            self.incoming.over(self.incoming.domain.clone()),
        )
    }

    fn recurse_with(
        &self,
        process: &RewritingProcess<'_>,
        variables: Expr,
        summand: Expr,
        incoming: Expr,
    ) -> Result<Expr> {
        process.rewrite(
            RewriterName::Sum,
            &args::sum(variables, summand, incoming, self.target.clone(), self.registry),
        )
    }

    /// Recursion after the conditions on `N` and `N'` were decided by the
    /// context of `process`.
    fn resolved(&self, process: &RewritingProcess<'_>) -> Result<Expr> {
        let variables = process.simplify(self.variables)?;
        let domain = process.simplify(&self.incoming.domain)?;
        if variables == *self.variables && domain == self.incoming.domain {
            return Err(LbpError::IllegalArgument(format!(
                "R_sum cannot decide the summation index {} or the messages over {}",
                self.variables, self.incoming.domain
            )));
        }
        self.recurse_with(
            process,
            variables,
            self.summand.clone(),
            self.incoming.over(domain),
        )
    }

    fn eliminate_one(&self, process: &RewritingProcess<'_>) -> Result<Expr> {
        // Placeholders mention the random variables of their factors, which
        // the summand does not depend on.
        let values = self
            .summand
            .replace_all(&|node| node.has_op(Op::PreviousMessageTo).then(Expr::one))
            .random_values();
        let mentioned = |reference: &Expr| -> Result<bool> {
            for value in &values {
                let equal = Expr::eq(reference.clone(), Expr::bracket(value.clone()));
                if process.simplify(&equal)? != Expr::FALSE {
                    return Ok(true);
                }
            }
            Ok(false)
        };
        let variables = retain(extensional(self.variables)?, &mentioned)?;
        let pending = retain(extensional(&self.incoming.domain)?, &mentioned)?;
        let Some(default_choice) = variables.first() else {
            return Ok(self.summand.clone());
        };

        let chosen = pending
            .iter()
            .find(|reference| variables.contains(reference))
            .unwrap_or(default_choice);
        let has_message = pending.contains(chosen);
        let value = chosen.bracket_content().ok_or_else(|| {
            LbpError::IllegalArgument(format!("{} is not a random variable reference", chosen))
        })?;

        let mut range = relevant_range(process, value, self.summand)?;
        if range.is_empty() {
            return Err(LbpError::ModelInconsistency(format!(
                "{} has no value with nonzero weight in {}",
                value, self.summand
            )));
        }

        let (message, incoming) = if has_message {
            let others = process.rewrite(
                RewriterName::SetDifference,
                &Expr::set_difference(
                    Expr::uniset(pending.clone()),
                    Expr::uniset(vec![chosen.clone()]),
                ),
            )?;
            let incoming = self.incoming.over(others);
            if process.config().use_singleton_relevant_range_heuristic && range.len() == 1 {
                trace!(random_variable = %chosen, "message skipped, value forced by summand");
                (Expr::one(), incoming)
            } else {
                let message = process.rewrite(
                    RewriterName::MessageToFactorFromVariable,
                    &args::message(self.incoming.instance(chosen), self.registry),
                )?;
                if message.previous_message_parts().is_none() {
                    process.state().count_message();
                }
                let message = if message.contains_previous_messages() {
                    Expr::apply_lambda(Expr::lambda(value.clone(), message), value.clone())
                } else {
                    let supported = relevant_range(process, value, &message)?;
                    range.retain(|candidate| supported.contains(candidate));
                    if range.is_empty() {
                        return Err(LbpError::ModelInconsistency(format!(
                            "{} has no value with nonzero weight in both {} and {}",
                            value, self.summand, message
                        )));
                    }
                    message
                };
                (message, incoming)
            }
        } else {
            (Expr::one(), self.incoming.over(Expr::uniset(pending.clone())))
        };

        let mut terms = Vec::with_capacity(range.len());
        for candidate in &range {
            let Some(assumed) = process.context().with_assumption(value, *candidate) else {
                continue;
            };
            let term = Expr::times(vec![self.summand.clone(), message.clone()]);
            terms.push(process.with_context(assumed).simplify(&term)?);
        }
        let summed = process.simplify(&Expr::plus(terms))?;
        debug!(random_variable = %chosen, range = ?range, summand = %summed, "summed out");

        let remaining = process.rewrite(
            RewriterName::SetDifference,
            &Expr::set_difference(Expr::uniset(variables.clone()), Expr::uniset(vec![chosen.clone()])),
        )?;
        self.recurse_with(process, remaining, summed, incoming)
    }
}

fn extensional(set: &Expr) -> Result<&[Expr]> {
    match set.as_set() {
        Some(SetExpr::Extensional { elements, .. }) => Ok(elements),
        _ => Err(LbpError::IllegalArgument(format!(
            "R_sum expects an extensional set of random variable references, got {}",
            set
        ))),
    }
}

fn retain(references: &[Expr], keep: &dyn Fn(&Expr) -> Result<bool>) -> Result<Vec<Expr>> {
    let mut kept = Vec::with_capacity(references.len());
    for reference in references {
        if keep(reference)? {
            kept.push(reference.clone());
        }
    }
    Ok(kept)
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

    fn rv(functor: &str, arg: &str) -> Expr {
        Expr::rv(functor, vec![Expr::var(arg)])
    }

    fn run_sum(
        model: &Model,
        config: &LbpConfig,
        variables: Vec<Expr>,
        potential: Expr,
    ) -> (Result<Expr>, usize) {
        let state = QueryState::new(0);
        let process = RewritingProcess::new(model, config, &state);
        let factor = Expr::bracket(potential.clone());
        let target = Expr::bracket(rv("p", "X"));
        let domain = Expr::uniset(variables);
        let incoming = product_over(domain.clone(), "V", &[&factor, &target], |v| {
            Expr::message_to(factor.clone(), v)
        });
        let registry = BeingComputed::new().with(&target, &factor);
        let result = process.rewrite(
            RewriterName::Sum,
            &args::sum(domain, potential, incoming, target, &registry),
        );
        (result, state.messages_computed())
    }

    #[test]
    fn test_forced_value_skips_the_message() {
        let model = example_models::trivial_pq_with_priors().unwrap();
        let potential = Expr::ite(
            Expr::and(rv("p", "X"), rv("q", "X")),
            Expr::int(1),
            Expr::int(0),
        );
        let (result, messages) = run_sum(
            &model,
            &LbpConfig::default(),
            vec![Expr::bracket(rv("q", "X"))],
            potential,
        );
        assert_eq!(result.unwrap().to_string(), "if p(X) then 1 else 0");
        assert_eq!(messages, 0);
    }

    #[test]
    fn test_message_weighs_the_summand() {
        let model = example_models::weighted_pq_with_priors().unwrap();
        let potential = Expr::ite(
            Expr::and(rv("p", "X"), rv("q", "X")),
            Expr::ratio(6, 10),
            Expr::ratio(4, 10),
        );
        let (result, messages) = run_sum(
            &model,
            &LbpConfig::default(),
            vec![Expr::bracket(rv("q", "X"))],
            potential,
        );
        assert_eq!(result.unwrap().to_string(), "if p(X) then 0.46 else 0.4");
        assert_eq!(messages, 1);
    }

    #[test]
    fn test_zero_message_restricts_the_range() {
        let model = example_models::trivial_pqr_with_priors().unwrap();
        let potential = Expr::ite(
            Expr::and_all(vec![rv("p", "X"), rv("q", "X"), rv("r", "X")]),
            Expr::ratio(6, 10),
            Expr::ratio(4, 10),
        );
        let (result, messages) = run_sum(
            &model,
            &LbpConfig::default(),
            vec![Expr::bracket(rv("q", "X")), Expr::bracket(rv("r", "X"))],
            potential,
        );
        assert_eq!(result.unwrap(), Expr::ratio(4, 10));
        assert_eq!(messages, 1);
    }

    #[test]
    fn test_heuristic_can_be_disabled() {
        let model = example_models::trivial_pq_with_priors().unwrap();
        let config = LbpConfig::default().with_singleton_relevant_range_heuristic(false);
        let potential = Expr::ite(
            Expr::and(rv("p", "X"), rv("q", "X")),
            Expr::int(1),
            Expr::int(0),
        );
        let (result, messages) = run_sum(&model, &config, vec![Expr::bracket(rv("q", "X"))], potential);
        assert_eq!(result.unwrap().to_string(), "if p(X) then 0.3 else 0");
        assert_eq!(messages, 1);
    }

    #[test]
    fn test_unmentioned_variables_are_dropped() {
        let model = example_models::trivial_pq_with_priors().unwrap();
        let potential = Expr::ite(rv("p", "X"), Expr::ratio(1, 5), Expr::ratio(4, 5));
        let (result, messages) = run_sum(
            &model,
            &LbpConfig::default(),
            vec![Expr::bracket(rv("q", "X"))],
            potential.clone(),
        );
        assert_eq!(result.unwrap(), potential);
        assert_eq!(messages, 0);
    }

    #[test]
    fn test_all_zero_summand_is_inconsistent() {
        let model = example_models::trivial_pq_with_priors().unwrap();
        let potential = Expr::ite(rv("q", "X"), Expr::int(0), Expr::int(0));
        let (result, _) = run_sum(
            &model,
            &LbpConfig::default(),
            vec![Expr::bracket(rv("q", "X"))],
            potential,
        );
        assert_eq!(result.unwrap_err().kind(), ErrorKind::ModelInconsistency);
    }

    #[test]
    fn test_summation_index_must_be_a_tuple_of_five() {
        let model = example_models::trivial_pq_with_priors().unwrap();
        let config = LbpConfig::default();
        let state = QueryState::new(0);
        let process = RewritingProcess::new(&model, &config, &state);
        let err = process
            .rewrite(RewriterName::Sum, &Expr::tuple(vec![Expr::empty_set()]))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedInput);
    }
}
