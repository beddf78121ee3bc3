//! `R_normalize(V, E)`: `E / (E[v = true] + E[v = false])`.

use liftlogic_ir::{Expr, IrError};

use super::referenced_value;
use crate::error::{LbpError, Result};
use crate::process::{args, RewritingProcess};

pub fn rewrite(process: &RewritingProcess<'_>, argument: &Expr) -> Result<Expr> {
    let parts = args::components(argument, 2, "R_normalize")?;
    let value = referenced_value(&parts[0], "R_normalize")?;
    let expression = &parts[1];

    let mut total = Vec::with_capacity(2);
    for candidate in [true, false] {
        if let Some(assumed) = process.context().with_assumption(value, candidate) {
            total.push(process.with_context(assumed).simplify(expression)?);
        }
    }
    let normalized = Expr::divide(expression.clone(), Expr::plus(total));
    process.simplify(&normalized).map_err(|e| match e {
        LbpError::Ir(IrError::DivisionByZero(_)) => LbpError::ModelInconsistency(format!(
            "{} has zero weight for every value of {}",
            expression, parts[0]
        )),
        other => other,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LbpConfig;
    use crate::error::ErrorKind;
    use crate::model::Model;
    use crate::process::{QueryState, RewriterName};

    fn normalize(random_variable: Expr, expression: Expr) -> Result<Expr> {
        let model = Model::builder("normalize")
            .random_variable("p", ["Universe"])
            .random_variable("q", Vec::<String>::new())
            .build()?;
        let config = LbpConfig::default();
        let state = QueryState::new(0);
        RewritingProcess::new(&model, &config, &state).rewrite(
            RewriterName::Normalize,
            &args::normalize(random_variable, expression),
        )
    }

    #[test]
    fn test_normalizes_over_the_target() {
        let p = Expr::rv("p", vec![Expr::var("X")]);
        let result = normalize(
            Expr::bracket(p.clone()),
            Expr::ite(p, Expr::ratio(2, 10), Expr::ratio(6, 10)),
        )
        .unwrap();
        assert_eq!(result.to_string(), "if p(X) then 0.25 else 0.75");
    }

    #[test]
    fn test_constant_in_the_target_is_uniform() {
        let q = Expr::rv("q", vec![]);
        let result = normalize(
            Expr::bracket(Expr::rv("p", vec![Expr::var("X")])),
            Expr::ite(q, Expr::int(10), Expr::int(90)),
        )
        .unwrap();
        assert_eq!(result, Expr::ratio(1, 2));
    }

    #[test]
    fn test_normalizes_each_branch_separately() {
        let x = Expr::var("X");
        let p = Expr::rv("p", vec![x.clone()]);
        let expression = Expr::ite(
            Expr::eq(x, Expr::constant("a")),
            Expr::ite(p.clone(), Expr::int(1), Expr::int(3)),
            Expr::ite(p.clone(), Expr::int(1), Expr::int(1)),
        );
        let result = normalize(Expr::bracket(p), expression).unwrap();
        assert_eq!(
            result.to_string(),
            "if X = a then if p(X) then 0.25 else 0.75 else 0.5"
        );
    }

    #[test]
    fn test_zero_weight_everywhere_is_inconsistent() {
        let p = Expr::rv("p", vec![Expr::var("X")]);
        let err = normalize(Expr::bracket(p.clone()), Expr::ite(p, Expr::int(0), Expr::int(0)))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ModelInconsistency);
        assert!(normalize(Expr::int(1), Expr::int(1)).is_err());
    }
}
