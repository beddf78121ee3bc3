//! The rewriting process.
//!
//! Every rewriter is a function `(&RewritingProcess, &Expr) -> Result<Expr>`
//! registered under a [`RewriterName`]. Rewriters call each other through
//! [`RewritingProcess::rewrite`], which is the only place where tracing,
//! listener events and nesting depth are handled. The process carries the
//! contextual constraint of the current rewrite; narrowing it produces a
//! sub-process sharing the same per-query [`QueryState`].

use std::cell::Cell;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use liftlogic_ir::{Context, DefaultSimplifier, Expr, Simplifier};
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::config::LbpConfig;
use crate::error::{LbpError, Result};
use crate::listener::{QueryListener, RewriteJustification, RewriteStep};
use crate::model::Model;
use crate::rewriters;

static DEFAULT_SIMPLIFIER: DefaultSimplifier = DefaultSimplifier;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RewriterName {
    Sum,
    ProductFactor,
    ProductMessageAndProductFactor,
    NeighborsOfFactor,
    NeighborsOfVariable,
    MessageToVariableFromFactor,
    MessageToFactorFromVariable,
    Belief,
    Normalize,
    SetDifference,
    Union,
    Intersection,
    In,
    Cardinality,
    Simplify,
}

impl RewriterName {
    pub const ALL: [RewriterName; 15] = [
        RewriterName::Sum,
        RewriterName::ProductFactor,
        RewriterName::ProductMessageAndProductFactor,
        RewriterName::NeighborsOfFactor,
        RewriterName::NeighborsOfVariable,
        RewriterName::MessageToVariableFromFactor,
        RewriterName::MessageToFactorFromVariable,
        RewriterName::Belief,
        RewriterName::Normalize,
        RewriterName::SetDifference,
        RewriterName::Union,
        RewriterName::Intersection,
        RewriterName::In,
        RewriterName::Cardinality,
        RewriterName::Simplify,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RewriterName::Sum => "R_sum",
            RewriterName::ProductFactor => "R_prod_factor",
            RewriterName::ProductMessageAndProductFactor => "R_prod_m_and_prod_factor",
            RewriterName::NeighborsOfFactor => "R_neigh_f",
            RewriterName::NeighborsOfVariable => "R_neigh_v",
            RewriterName::MessageToVariableFromFactor => "R_m_to_v_from_f",
            RewriterName::MessageToFactorFromVariable => "R_m_to_f_from_v",
            RewriterName::Belief => "R_belief",
            RewriterName::Normalize => "R_normalize",
            RewriterName::SetDifference => "R_set_diff",
            RewriterName::Union => "R_union",
            RewriterName::Intersection => "R_intersection",
            RewriterName::In => "R_in",
            RewriterName::Cardinality => "R_card",
            RewriterName::Simplify => "R_simplify",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|rewriter| rewriter.as_str() == name)
    }
}

impl fmt::Display for RewriterName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Cooperative cancellation flag, shared between a query and whoever may
/// want to stop it.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Bookkeeping owned by one query and the single thread running it.
pub struct QueryState {
    id: u64,
    messages_computed: Cell<usize>,
    depth: Cell<usize>,
    cancellation: CancellationToken,
    listener: Option<Arc<dyn QueryListener>>,
}

impl fmt::Debug for QueryState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryState")
            .field("id", &self.id)
            .field("messages_computed", &self.messages_computed.get())
            .field("depth", &self.depth.get())
            .field("cancelled", &self.cancellation.is_cancelled())
            .field("listener", &self.listener.is_some())
            .finish()
    }
}

impl QueryState {
    pub fn new(id: u64) -> Self {
        Self {
            id,
            messages_computed: Cell::new(0),
            depth: Cell::new(0),
            cancellation: CancellationToken::new(),
            listener: None,
        }
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }

    pub fn with_listener(mut self, listener: Arc<dyn QueryListener>) -> Self {
        self.listener = Some(listener);
        self
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    /// Incoming messages computed by `R_sum` so far.
    pub fn messages_computed(&self) -> usize {
        self.messages_computed.get()
    }

    pub(crate) fn count_message(&self) {
        self.messages_computed.set(self.messages_computed.get() + 1);
    }

    pub fn listener(&self) -> Option<&dyn QueryListener> {
        self.listener.as_deref()
    }

    pub fn check_cancelled(&self) -> Result<()> {
        if self.cancellation.is_cancelled() {
            Err(LbpError::Cancelled { query_id: self.id })
        } else {
            Ok(())
        }
    }
}

/// A point of a rewrite: the model, the configuration, the per-query state
/// and the contextual constraint holding there.
#[derive(Clone)]
pub struct RewritingProcess<'a> {
    model: &'a Model,
    config: &'a LbpConfig,
    state: &'a QueryState,
    simplifier: &'a dyn Simplifier,
    context: Context,
}

impl fmt::Debug for RewritingProcess<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RewritingProcess")
            .field("model", &self.model.name())
            .field("query", &self.state.id)
            .field("context", &self.context.to_formula().to_string())
            .finish()
    }
}

impl<'a> RewritingProcess<'a> {
    /// A process at the root context of `model`.
    pub fn new(model: &'a Model, config: &'a LbpConfig, state: &'a QueryState) -> Self {
        Self {
            model,
            config,
            state,
            simplifier: &DEFAULT_SIMPLIFIER,
            context: model.context(),
        }
    }

    pub fn with_simplifier(mut self, simplifier: &'a dyn Simplifier) -> Self {
        self.simplifier = simplifier;
        self
    }

    /// A sub-process at `context`, sharing everything else.
    pub fn with_context(&self, context: Context) -> Self {
        Self {
            context,
            ..self.clone()
        }
    }

    pub fn model(&self) -> &'a Model {
        self.model
    }

    pub fn config(&self) -> &'a LbpConfig {
        self.config
    }

    pub fn state(&self) -> &'a QueryState {
        self.state
    }

    pub fn context(&self) -> &Context {
        &self.context
    }

    pub fn simplify(&self, expr: &Expr) -> Result<Expr> {
        Ok(self.simplifier.simplify(expr, &self.context)?)
    }

    /// Runs the rewriter registered as `name` on `argument`.
    pub fn rewrite(&self, name: RewriterName, argument: &Expr) -> Result<Expr> {
        let depth = self.state.depth.get();
        trace!(rewriter = %name, depth, input = %argument, "rewrite");
        if let Some(listener) = self.state.listener() {
            listener.trace_event(&RewriteStep {
                query_id: self.state.id,
                rewriter: name,
                depth,
                input: argument,
            });
        }

        self.state.depth.set(depth + 1);
        let result = dispatch(self, name, argument);
        self.state.depth.set(depth);

        let output = result?;
        if let Some(listener) = self.state.listener() {
            listener.justification_event(&RewriteJustification {
                query_id: self.state.id,
                rewriter: name,
                depth,
                input: argument,
                output: &output,
            });
        }
        Ok(output)
    }
}

fn dispatch(process: &RewritingProcess<'_>, name: RewriterName, argument: &Expr) -> Result<Expr> {
    match name {
        RewriterName::Sum => rewriters::sum::rewrite(process, argument),
        RewriterName::ProductFactor => rewriters::product_factor::rewrite(process, argument),
        RewriterName::ProductMessageAndProductFactor => {
            rewriters::product_factor::rewrite_message_times_product(process, argument)
        }
        RewriterName::NeighborsOfFactor => rewriters::neighbors::of_factor(process, argument),
        RewriterName::NeighborsOfVariable => rewriters::neighbors::of_variable(process, argument),
        RewriterName::MessageToVariableFromFactor => {
            rewriters::messages::to_variable_from_factor(process, argument)
        }
        RewriterName::MessageToFactorFromVariable => {
            rewriters::messages::to_factor_from_variable(process, argument)
        }
        RewriterName::Belief => rewriters::belief::rewrite(process, argument),
        RewriterName::Normalize => rewriters::normalize::rewrite(process, argument),
        RewriterName::SetDifference => rewriters::sets::set_difference(process, argument),
        RewriterName::Union => rewriters::sets::union(process, argument),
        RewriterName::Intersection => rewriters::sets::intersection(process, argument),
        RewriterName::In => rewriters::sets::membership(process, argument),
        RewriterName::Cardinality => rewriters::sets::cardinality(process, argument),
        RewriterName::Simplify => process.simplify(argument),
    }
}

/// Argument tuples of the rewriters.
pub mod args {
    use liftlogic_ir::{Expr, Op};

    use crate::being_computed::BeingComputed;
    use crate::error::{LbpError, Result};

    /// `(N, E, prod_{V in N'} m_F<-V, T, beingComputed)`
    pub fn sum(
        summation_index: Expr,
        summand: Expr,
        incoming_messages: Expr,
        target: Expr,
        being_computed: &BeingComputed,
    ) -> Expr {
        Expr::tuple(vec![
            summation_index,
            summand,
            incoming_messages,
            target,
            being_computed.to_expr(),
        ])
    }

    /// `(prod_{F in S} m_V<-F, beingComputed)`
    pub fn product_factor(product: Expr, being_computed: &BeingComputed) -> Expr {
        Expr::tuple(vec![product, being_computed.to_expr()])
    }

    /// `(m, prod_{F in S} m_V<-F, beingComputed)`
    pub fn message_times_product(
        message: Expr,
        product: Expr,
        being_computed: &BeingComputed,
    ) -> Expr {
        Expr::tuple(vec![message, product, being_computed.to_expr()])
    }

    /// `(message to . from ., beingComputed)` for either message direction.
    pub fn message(message: Expr, being_computed: &BeingComputed) -> Expr {
        Expr::tuple(vec![message, being_computed.to_expr()])
    }

    /// `(V, E)`
    pub fn normalize(random_variable: Expr, expression: Expr) -> Expr {
        Expr::tuple(vec![random_variable, expression])
    }

    /// The `arity` components of a tuple argument of `rewriter`.
    pub fn components<'e>(argument: &'e Expr, arity: usize, rewriter: &str) -> Result<&'e [Expr]> {
        match argument.args_of(Op::Tuple) {
            Some(parts) if parts.len() == arity => Ok(parts),
            _ => Err(LbpError::IllegalArgument(format!(
                "{} expects a tuple of {} components, got {}",
                rewriter, arity, argument
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rewriter_names_roundtrip() {
        for rewriter in RewriterName::ALL {
            assert_eq!(RewriterName::from_name(rewriter.as_str()), Some(rewriter));
        }
        assert_eq!(RewriterName::from_name("R_unknown"), None);
        assert_eq!(RewriterName::Sum.to_string(), "R_sum");
    }

    #[test]
    fn test_cancellation_is_shared() {
        let token = CancellationToken::new();
        let state = QueryState::new(7).with_cancellation(token.clone());
        assert!(state.check_cancelled().is_ok());
        token.cancel();
        assert_eq!(
            state.check_cancelled(),
            Err(LbpError::Cancelled { query_id: 7 })
        );
    }

    #[test]
    fn test_malformed_tuples_are_rejected() {
        let argument = Expr::tuple(vec![Expr::int(1)]);
        assert!(args::components(&argument, 2, "R_prod_factor").is_err());
        assert_eq!(args::components(&argument, 1, "R_x").unwrap().len(), 1);
        assert!(args::components(&Expr::int(1), 1, "R_x").is_err());
    }
}
