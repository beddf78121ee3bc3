//! Messages under computation on the current call stack.
//!
//! Before a message is computed, its `(target, source)` pair is looked up
//! here. A message already being computed is not recursed into; a
//! `previous message to target from source` placeholder stands for it
//! instead, to be resolved by iteration in the belief orchestrator.

use liftlogic_ir::{branch_on_formula, Expr, Op, SetExpr};
use tracing::debug;

use crate::error::{LbpError, Result};
use crate::process::{RewriterName, RewritingProcess};

/// Persistent stack of `(target, source)` pairs. Extending it returns a new
/// registry; the one held by a caller never changes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BeingComputed {
    pairs: Vec<(Expr, Expr)>,
}

impl BeingComputed {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads the registry back from its expression form, a uniset of pairs.
    pub fn from_expr(expr: &Expr) -> Result<Self> {
        let elements = match expr.as_set() {
            Some(set @ SetExpr::Extensional { elements, .. }) if !set.is_multiset() => elements,
            _ => {
                return Err(LbpError::IllegalArgument(format!(
                    "being-computed registry must be a uniset of pairs, got {}",
                    expr
                )))
            }
        };
        let pairs = elements
            .iter()
            .map(|element| match element.args_of(Op::Tuple) {
                Some([target, source]) => Ok((target.clone(), source.clone())),
                _ => Err(LbpError::IllegalArgument(format!(
                    "{} is not a (target, source) pair",
                    element
                ))),
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { pairs })
    }

    pub fn to_expr(&self) -> Expr {
        Expr::uniset(
            self.pairs
                .iter()
                .map(|(target, source)| Expr::tuple(vec![target.clone(), source.clone()]))
                .collect(),
        )
    }

    pub fn with(&self, target: &Expr, source: &Expr) -> Self {
        let mut pairs = self.pairs.clone();
        pairs.push((target.clone(), source.clone()));
        Self { pairs }
    }

    pub fn pairs(&self) -> &[(Expr, Expr)] {
        &self.pairs
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Condition under which the message to `target` from `source` is
    /// already being computed.
    ///
    /// A pair counts when it belongs to the registry under the current
    /// context, or when it renames a registered pair. The second rule stops
    /// lifted recursion that would otherwise keep introducing fresh logical
    /// variables for the same message.
    pub fn condition(
        &self,
        process: &RewritingProcess<'_>,
        target: &Expr,
        source: &Expr,
    ) -> Result<Expr> {
        if self.is_empty() {
            return Ok(Expr::FALSE);
        }
        let pair = Expr::tuple(vec![target.clone(), source.clone()]);
        let renames_registered = self.pairs.iter().any(|(t, s)| {
            Expr::tuple(vec![t.clone(), s.clone()]).is_variant_of(&pair)
        });
        if renames_registered {
            return Ok(Expr::TRUE);
        }
        process.rewrite(RewriterName::In, &Expr::is_in(pair, self.to_expr()))
    }

    /// Runs `compute` with this pair registered, where it is not already
    /// being computed; elsewhere answers with the previous-message
    /// placeholder. Cancellation is checked before computing.
    pub fn guard(
        &self,
        process: &RewritingProcess<'_>,
        target: &Expr,
        source: &Expr,
        compute: &dyn Fn(&RewritingProcess<'_>, &BeingComputed) -> Result<Expr>,
    ) -> Result<Expr> {
        let condition = self.condition(process, target, source)?;
        let registered = self.with(target, source);
        branch_on_formula(
            &condition,
            process.context(),
            &|_| {
                debug!(%target, %source, "message already being computed");
                Ok(Expr::previous_message_to(target.clone(), source.clone()))
            },
            &|ctx| {
                let sub = process.with_context(ctx.clone());
                sub.state().check_cancelled()?;
                compute(&sub, &registered)
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LbpConfig;
    use crate::example_models;
    use crate::process::QueryState;

    fn factor(var: &str) -> Expr {
        Expr::bracket(Expr::ite(
            Expr::and(
                Expr::rv("p", vec![Expr::var(var)]),
                Expr::rv("q", vec![Expr::var("Y")]),
            ),
            Expr::int(2),
            Expr::int(1),
        ))
    }

    #[test]
    fn test_expression_roundtrip() {
        let registry = BeingComputed::new()
            .with(&Expr::rv_ref("p", vec![Expr::var("X")]), &factor("X"));
        assert_eq!(BeingComputed::from_expr(&registry.to_expr()).unwrap(), registry);
        assert!(BeingComputed::from_expr(&BeingComputed::new().to_expr())
            .unwrap()
            .is_empty());
        assert!(BeingComputed::from_expr(&Expr::int(1)).is_err());
        assert!(BeingComputed::from_expr(&Expr::uniset(vec![Expr::int(1)])).is_err());
    }

    #[test]
    fn test_membership_and_renaming() {
        let model = example_models::trivial_loopy_pq().unwrap();
        let config = LbpConfig::default();
        let state = QueryState::new(0);
        let process = RewritingProcess::new(&model, &config, &state);
        let target = Expr::rv_ref("p", vec![Expr::var("X")]);
        let registry = BeingComputed::new().with(&target, &factor("X"));

        let renamed = Expr::rv_ref("p", vec![Expr::var("Z")]);
        assert_eq!(
            registry.condition(&process, &renamed, &factor("Z")).unwrap(),
            Expr::TRUE
        );
        let other = Expr::rv_ref("q", vec![Expr::var("Y")]);
        assert_eq!(
            registry.condition(&process, &other, &factor("X")).unwrap(),
            Expr::FALSE
        );
        let ground = Expr::rv_ref("p", vec![Expr::constant("a")]);
        let condition = registry.condition(&process, &ground, &factor("X")).unwrap();
        assert_eq!(condition, Expr::eq(Expr::var("X"), Expr::constant("a")));
    }
}
