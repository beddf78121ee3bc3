//! `R_belief([v])`: the normalized product of the messages `v` receives from
//! all of its factors.
//!
//! The result may still hold previous-message placeholders where the model
//! has loops; the orchestrator iterates those.

use liftlogic_ir::Expr;
use tracing::debug;

use super::{product_over, referenced_value};
use crate::being_computed::BeingComputed;
use crate::error::Result;
use crate::process::{args, RewriterName, RewritingProcess};

pub fn rewrite(process: &RewritingProcess<'_>, reference: &Expr) -> Result<Expr> {
    referenced_value(reference, "R_belief")?;
    let factors = process.rewrite(
        RewriterName::NeighborsOfVariable,
        &Expr::neighbors(reference.clone()),
    )?;
    debug!(random_variable = %reference, factors = %factors, "belief");
    let incoming = product_over(factors, "F", &[reference], |f| {
        Expr::message_to(reference.clone(), f)
    });
    let product = process.rewrite(
        RewriterName::ProductFactor,
        &args::product_factor(incoming, &BeingComputed::new()),
    )?;
    process.rewrite(
        RewriterName::Normalize,
        &args::normalize(reference.clone(), product),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LbpConfig;
    use crate::error::ErrorKind;
    use crate::example_models;
    use crate::process::QueryState;

    #[test]
    fn test_belief_of_deterministic_conjunction() {
        let model = example_models::trivial_pq_with_priors().unwrap();
        let config = LbpConfig::default();
        let state = QueryState::new(0);
        let process = RewritingProcess::new(&model, &config, &state);
        let belief = process
            .rewrite(RewriterName::Belief, &Expr::rv_ref("p", vec![Expr::var("X")]))
            .unwrap();
        assert_eq!(belief.to_string(), "if p(X) then 1 else 0");
    }

    #[test]
    fn test_belief_requires_a_reference() {
        let model = example_models::trivial_pq_with_priors().unwrap();
        let config = LbpConfig::default();
        let state = QueryState::new(0);
        let process = RewritingProcess::new(&model, &config, &state);
        let err = process
            .rewrite(RewriterName::Belief, &Expr::rv("p", vec![Expr::var("X")]))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedInput);
    }
}
