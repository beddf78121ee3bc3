//! Messages between random variables and factors: `R_m_to_v_from_f` and
//! `R_m_to_f_from_v`.
//!
//! Both go through [`BeingComputed::guard`], so a message already being
//! computed further up the stack is answered with its previous-message
//! placeholder instead of being recursed into.

use liftlogic_ir::Expr;
use tracing::debug;

use super::{factor_potential, product_over, referenced_value};
use crate::being_computed::BeingComputed;
use crate::error::{LbpError, Result};
use crate::process::{args, RewriterName, RewritingProcess};

fn message_and_registry<'e>(
    argument: &'e Expr,
    rewriter: &str,
) -> Result<(&'e Expr, &'e Expr, BeingComputed)> {
    let parts = args::components(argument, 2, rewriter)?;
    let (target, source) = parts[0].message_parts().ok_or_else(|| {
        LbpError::IllegalArgument(format!(
            "{} expects (message to . from ., beingComputed), got {}",
            rewriter, argument
        ))
    })?;
    Ok((target, source, BeingComputed::from_expr(&parts[1])?))
}

/// `R_m_to_v_from_f(message to [v] from [Ef], beingComputed)`
///
/// Sums the factor times the messages from its other neighbors over those
/// neighbors:
///
/// ```text
/// N  = Neigh([Ef]) \ { [v] }
/// m  = sum_N Ef * prod_{V' in N} m_[Ef]<-V'
/// ```
pub fn to_variable_from_factor(process: &RewritingProcess<'_>, argument: &Expr) -> Result<Expr> {
    let (target, source, registry) = message_and_registry(argument, "R_m_to_v_from_f")?;
    referenced_value(target, "R_m_to_v_from_f")?;
    let potential = factor_potential(source, "R_m_to_v_from_f")?;

    registry.guard(process, target, source, &|process, registry| {
        let neighbors = process.rewrite(
            RewriterName::NeighborsOfFactor,
            &Expr::neighbors(source.clone()),
        )?;
        let others = process.rewrite(
            RewriterName::SetDifference,
            &Expr::set_difference(neighbors, Expr::uniset(vec![target.clone()])),
        )?;
        debug!(%target, %source, neighbors = %others, "message to variable from factor");
        let incoming = product_over(others.clone(), "V", &[source, target], |v| {
            Expr::message_to(source.clone(), v)
        });
        process.rewrite(
            RewriterName::Sum,
            &args::sum(others, potential.clone(), incoming, target.clone(), registry),
        )
    })
}

/// `R_m_to_f_from_v(message to [Ef] from [v], beingComputed)`
///
/// The product of the messages to the variable from its other factors:
///
/// ```text
/// S = Neigh([v]) \ { [Ef] }
/// m = prod_{F' in S} m_[v]<-F'
/// ```
pub fn to_factor_from_variable(process: &RewritingProcess<'_>, argument: &Expr) -> Result<Expr> {
    let (target, source, registry) = message_and_registry(argument, "R_m_to_f_from_v")?;
    factor_potential(target, "R_m_to_f_from_v")?;
    referenced_value(source, "R_m_to_f_from_v")?;

    registry.guard(process, target, source, &|process, registry| {
        let neighbors = process.rewrite(
            RewriterName::NeighborsOfVariable,
            &Expr::neighbors(source.clone()),
        )?;
        let others = process.rewrite(
            RewriterName::SetDifference,
            &Expr::set_difference(neighbors, Expr::uniset(vec![target.clone()])),
        )?;
        debug!(%target, %source, factors = %others, "message to factor from variable");
        let incoming = product_over(others, "F", &[source, target], |f| {
            Expr::message_to(source.clone(), f)
        });
        process.rewrite(
            RewriterName::ProductFactor,
            &args::product_factor(incoming, registry),
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LbpConfig;
    use crate::error::ErrorKind;
    use crate::example_models;
    use crate::model::Model;
    use crate::process::QueryState;

    fn p(arg: &str) -> Expr {
        Expr::rv("p", vec![Expr::var(arg)])
    }

    fn q(arg: &str) -> Expr {
        Expr::rv("q", vec![Expr::var(arg)])
    }

    fn rewrite(model: &Model, name: RewriterName, argument: &Expr) -> Result<Expr> {
        let config = LbpConfig::default();
        let state = QueryState::new(0);
        RewritingProcess::new(model, &config, &state).rewrite(name, argument)
    }

    #[test]
    fn test_message_to_variable_sums_out_the_other_neighbor() {
        let model = example_models::weighted_pq().unwrap();
        let factor = Expr::bracket(Expr::ite(
            Expr::and(p("X"), q("X")),
            Expr::ratio(2, 10),
            Expr::ratio(3, 10),
        ));
        let message = Expr::message_to(Expr::bracket(p("X")), factor);
        let result = rewrite(
            &model,
            RewriterName::MessageToVariableFromFactor,
            &args::message(message, &BeingComputed::new()),
        )
        .unwrap();
        assert_eq!(result.to_string(), "if p(X) then 0.5 else 0.6");
    }

    #[test]
    fn test_message_to_factor_multiplies_the_other_factors() {
        let model = example_models::prior_and_evidence_on_p().unwrap();
        let p_a = Expr::rv("p", vec![Expr::constant("a")]);
        let prior = Expr::bracket(Expr::ite(p_a.clone(), Expr::ratio(1, 10), Expr::ratio(9, 10)));
        let message = Expr::message_to(prior, Expr::bracket(p_a));
        let result = rewrite(
            &model,
            RewriterName::MessageToFactorFromVariable,
            &args::message(message, &BeingComputed::new()),
        )
        .unwrap();
        assert_eq!(result.to_string(), "if p(a) then 0.2 else 0.3");
    }

    #[test]
    fn test_message_being_computed_is_a_placeholder() {
        let model = example_models::weighted_pq().unwrap();
        let target = Expr::bracket(p("X"));
        let factor = Expr::bracket(Expr::ite(
            Expr::and(p("X"), q("X")),
            Expr::ratio(2, 10),
            Expr::ratio(3, 10),
        ));
        let registry = BeingComputed::new().with(&target, &factor);
        let message = Expr::message_to(target.clone(), factor.clone());
        let result = rewrite(
            &model,
            RewriterName::MessageToVariableFromFactor,
            &args::message(message, &registry),
        )
        .unwrap();
        assert_eq!(result, Expr::previous_message_to(target, factor));
    }

    #[test]
    fn test_messages_require_variable_and_factor() {
        let model = example_models::weighted_pq().unwrap();
        let factor = Expr::bracket(Expr::ite(p("X"), Expr::int(1), Expr::int(2)));
        let swapped = Expr::message_to(factor.clone(), Expr::bracket(p("X")));
        let err = rewrite(
            &model,
            RewriterName::MessageToVariableFromFactor,
            &args::message(swapped, &BeingComputed::new()),
        )
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedInput);

        let not_a_message = Expr::tuple(vec![factor, BeingComputed::new().to_expr()]);
        assert!(rewrite(&model, RewriterName::MessageToFactorFromVariable, &not_a_message).is_err());
    }
}
