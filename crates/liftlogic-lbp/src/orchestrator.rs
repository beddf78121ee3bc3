//! Belief queries.
//!
//! A query moves through the phases
//!
//! ```text
//! Initialized -> (Iterating)* -> Converged | IterationLimitReached -> Normalized
//! ```
//!
//! `R_belief` is run once with an empty being-computed registry. On a model
//! without loops its result is final. Otherwise it holds `previous message`
//! placeholders: each one is expanded into the message it stands for
//! (computed afresh, itself possibly holding placeholders), and the values of
//! all expanded messages are iterated from uniform until they stop changing
//! or the iteration cap is hit. The values are then substituted into the
//! belief, which is normalized once more.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use indexmap::IndexMap;
use liftlogic_ir::{round_to_decimal_places, Expr, Op};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::being_computed::BeingComputed;
use crate::config::{LbpConfig, UpdateSchedule};
use crate::error::{LbpError, Result};
use crate::listener::QueryListener;
use crate::model::Model;
use crate::process::{args, CancellationToken, QueryState, RewriterName, RewritingProcess};

static NEXT_QUERY_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum QueryPhase {
    Initialized,
    Iterating,
    Converged,
    IterationLimitReached,
    Normalized,
}

impl fmt::Display for QueryPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            QueryPhase::Initialized => "INITIALIZED",
            QueryPhase::Iterating => "ITERATING",
            QueryPhase::Converged => "CONVERGED",
            QueryPhase::IterationLimitReached => "ITERATION_LIMIT_REACHED",
            QueryPhase::Normalized => "NORMALIZED",
        };
        f.write_str(name)
    }
}

/// A normalized belief and how it was reached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BeliefResult {
    pub belief: Expr,
    /// `Converged` or `IterationLimitReached`, the phase iteration ended in.
    pub phase: QueryPhase,
    /// Sweeps over iterated messages, 0 when the model has no loops.
    pub iterations: usize,
    /// Incoming messages computed by `R_sum`.
    pub messages_computed: usize,
}

impl BeliefResult {
    /// Weight of `value = observed` in a belief without free variables.
    pub fn probability(&self, value: &Expr, observed: bool) -> Option<f64> {
        let context = liftlogic_ir::Context::default().with_assumption(value, observed)?;
        let weight = liftlogic_ir::simplify(&self.belief, &context).ok()?;
        let number = weight.as_number()?;
        num_traits::ToPrimitive::to_f64(number)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum QueryOutcome {
    Belief(BeliefResult),
    Cancelled,
}

impl QueryOutcome {
    pub fn belief(&self) -> Option<&BeliefResult> {
        match self {
            QueryOutcome::Belief(result) => Some(result),
            QueryOutcome::Cancelled => None,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, QueryOutcome::Cancelled)
    }
}

/// A belief query on one model. Independent queries on the same model may
/// run on different threads.
pub struct BeliefQuery<'m> {
    model: &'m Model,
    config: LbpConfig,
    query_id: u64,
    listener: Option<Arc<dyn QueryListener>>,
    cancellation: CancellationToken,
}

impl<'m> BeliefQuery<'m> {
    pub fn new(model: &'m Model, config: LbpConfig) -> Self {
        Self {
            model,
            config,
            query_id: NEXT_QUERY_ID.fetch_add(1, Ordering::Relaxed),
            listener: None,
            cancellation: CancellationToken::new(),
        }
    }

    pub fn with_listener(mut self, listener: Arc<dyn QueryListener>) -> Self {
        self.listener = Some(listener);
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }

    pub fn with_query_id(mut self, query_id: u64) -> Self {
        self.query_id = query_id;
        self
    }

    pub fn query_id(&self) -> u64 {
        self.query_id
    }

    /// Belief of the random variable `[ v ]`.
    pub fn run(&self, query: &Expr) -> Result<QueryOutcome> {
        self.config.validate()?;
        let mut state = QueryState::new(self.query_id).with_cancellation(self.cancellation.clone());
        if let Some(listener) = &self.listener {
            state = state.with_listener(Arc::clone(listener));
        }
        let process = RewritingProcess::new(self.model, &self.config, &state);

        match self.compute(&process, query) {
            Ok(result) => Ok(QueryOutcome::Belief(result)),
            Err(LbpError::Cancelled { query_id }) => {
                info!(query_id, "belief query cancelled");
                Ok(QueryOutcome::Cancelled)
            }
            Err(e) => Err(e),
        }
    }

    fn compute(&self, process: &RewritingProcess<'_>, query: &Expr) -> Result<BeliefResult> {
        let state = process.state();
        let value = query
            .bracket_content()
            .filter(|value| value.is_random_value())
            .ok_or_else(|| {
                LbpError::IllegalArgument(format!("belief query on {}, not [ v ]", query))
            })?;
        self.model
            .vocabulary()
            .signatures
            .validate(value)
            .map_err(|e| LbpError::IllegalArgument(format!("belief query on {}: {}", query, e)))?;

        self.step_starting(QueryPhase::Initialized);
        info!(query_id = self.query_id, model = self.model.name(), %query, "belief query");
        state.check_cancelled()?;
        let belief = process.rewrite(RewriterName::Belief, query)?;
        self.step_complete(QueryPhase::Initialized);

        let (belief, phase, iterations) = if belief.contains_previous_messages() {
            let evaluation = evaluation_process(process);
            let mut table = MessageTable::expand(process, &belief)?;
            let (phase, iterations) = self.iterate(&evaluation, &mut table)?;
            let substituted = evaluation.simplify(&table.substitute(&belief))?;
            self.step_starting(QueryPhase::Normalized);
            let normalized = evaluation.rewrite(
                RewriterName::Normalize,
                &args::normalize(query.clone(), substituted),
            )?;
            (rounded(normalized, &self.config), phase, iterations)
        } else {
            self.step_starting(QueryPhase::Converged);
            self.step_complete(QueryPhase::Converged);
            self.step_starting(QueryPhase::Normalized);
            let normalized = process.rewrite(
                RewriterName::Normalize,
                &args::normalize(query.clone(), belief),
            )?;
            (normalized, QueryPhase::Converged, 0)
        };
        self.step_complete(QueryPhase::Normalized);
        info!(
            query_id = self.query_id,
            %belief,
            ?phase,
            iterations,
            messages = state.messages_computed(),
            "belief computed"
        );

        Ok(BeliefResult {
            belief,
            phase,
            iterations,
            messages_computed: state.messages_computed(),
        })
    }

    fn iterate(
        &self,
        process: &RewritingProcess<'_>,
        table: &mut MessageTable,
    ) -> Result<(QueryPhase, usize)> {
        for iteration in 1..=self.config.max_iterations {
            process.state().check_cancelled()?;
            self.step_starting(QueryPhase::Iterating);
            let changed = match self.config.update_schedule {
                UpdateSchedule::Synchronous => table.sweep_synchronous(process)?,
                UpdateSchedule::AsynchronousCycleDetecting => table.sweep_in_place(process)?,
            };
            self.step_complete(QueryPhase::Iterating);
            debug!(query_id = self.query_id, iteration, changed, "message sweep");

            if changed == 0 {
                self.step_starting(QueryPhase::Converged);
                self.step_complete(QueryPhase::Converged);
                return Ok((QueryPhase::Converged, iteration));
            }
        }
        warn!(
            query_id = self.query_id,
            max_iterations = self.config.max_iterations,
            "message values did not reach a fixpoint"
        );
        self.step_starting(QueryPhase::IterationLimitReached);
        self.step_complete(QueryPhase::IterationLimitReached);
        Ok((QueryPhase::IterationLimitReached, self.config.max_iterations))
    }

    fn step_starting(&self, phase: QueryPhase) {
        if let Some(listener) = &self.listener {
            listener.query_step_starting(self.query_id, phase);
        }
    }

    fn step_complete(&self, phase: QueryPhase) {
        if let Some(listener) = &self.listener {
            listener.query_step_complete(self.query_id, phase);
        }
    }
}

/// Expansions and current values of the iterated messages, keyed by their
/// placeholders with variables renamed `V1, V2, ...` in order of appearance.
#[derive(Debug, Default)]
struct MessageTable {
    expansions: IndexMap<Expr, Expr>,
    values: IndexMap<Expr, Expr>,
}

impl MessageTable {
    /// Expands every placeholder reachable from `belief`.
    fn expand(process: &RewritingProcess<'_>, belief: &Expr) -> Result<Self> {
        let mut table = Self::default();
        let mut pending: Vec<Expr> = placeholders(belief)
            .iter()
            .map(|placeholder| canonical(placeholder).0)
            .collect();
        while let Some(key) = pending.pop() {
            if table.expansions.contains_key(&key) {
                continue;
            }
            process.state().check_cancelled()?;
            let expansion = expand_placeholder(process, &key)?;
            debug!(placeholder = %key, %expansion, "iterated message");
            for inner in placeholders(&expansion) {
                let (inner_key, _) = canonical(&inner);
                if !table.expansions.contains_key(&inner_key) {
                    pending.push(inner_key);
                }
            }
            table.values.insert(key.clone(), Expr::one());
            table.expansions.insert(key, expansion);
        }
        Ok(table)
    }

    /// Every value recomputed from the previous sweep's values. Returns how
    /// many changed.
    fn sweep_synchronous(&mut self, process: &RewritingProcess<'_>) -> Result<usize> {
        let mut next = IndexMap::with_capacity(self.values.len());
        for (key, expansion) in &self.expansions {
            next.insert(key.clone(), self.evaluate(process, key, expansion)?);
        }
        let changed = next
            .iter()
            .filter(|(key, value)| self.values.get(*key) != Some(*value))
            .count();
        self.values = next;
        Ok(changed)
    }

    /// Values updated one at a time, later ones seeing the earlier updates.
    fn sweep_in_place(&mut self, process: &RewritingProcess<'_>) -> Result<usize> {
        let mut changed = 0;
        for index in 0..self.expansions.len() {
            let Some((key, expansion)) = self.expansions.get_index(index) else {
                continue;
            };
            let value = self.evaluate(process, key, expansion)?;
            if self.values.get(key) != Some(&value) {
                changed += 1;
                self.values.insert(key.clone(), value);
            }
        }
        Ok(changed)
    }

    /// The expansion of `key` under the current values, normalized over the
    /// random variable the message is about and rounded.
    fn evaluate(&self, process: &RewritingProcess<'_>, key: &Expr, expansion: &Expr) -> Result<Expr> {
        process.state().check_cancelled()?;
        let value = process.simplify(&self.substitute(expansion))?;
        let variable = message_variable(key)?;
        let normalized = process.rewrite(
            RewriterName::Normalize,
            &args::normalize(variable.clone(), value),
        )?;
        Ok(rounded(normalized, process.config()))
    }

    /// Replaces every placeholder by its current value.
    fn substitute(&self, expr: &Expr) -> Expr {
        expr.replace_all(&|node| {
            node.previous_message_parts()?;
            let (key, renaming) = canonical(node);
            let value = self.values.get(&key)?;
            let back: BTreeMap<String, String> = renaming
                .into_iter()
                .map(|(original, canonical)| (canonical, original))
                .collect();
            Some(value.rename_variables(&back))
        })
    }
}

/// The process iterated values are computed in. With a message precision,
/// its arithmetic keeps that many significant digits, so values stay small
/// however many instances a lifted product ranges over.
fn evaluation_process<'p>(process: &RewritingProcess<'p>) -> RewritingProcess<'p> {
    match process.config().message_value_precision {
        Some(digits) => process.with_context(process.context().with_numeric_precision(digits)),
        None => process.clone(),
    }
}

/// Numbers of `expr` rounded to `message_value_precision` decimal places.
fn rounded(expr: Expr, config: &LbpConfig) -> Expr {
    match config.message_value_precision {
        Some(places) => expr.replace_all(&|node| match node {
            Expr::Number(n) => Some(Expr::number(round_to_decimal_places(n, places))),
            _ => None,
        }),
        None => expr,
    }
}

fn placeholders(expr: &Expr) -> Vec<Expr> {
    let mut found = Vec::new();
    expr.visit(&mut |node| {
        if node.has_op(Op::PreviousMessageTo) && !found.contains(node) {
            found.push(node.clone());
        }
    });
    found
}

/// The placeholder with its variables renamed `V1, V2, ...` in order of
/// appearance, and the renaming used.
fn canonical(placeholder: &Expr) -> (Expr, BTreeMap<String, String>) {
    let mut order: Vec<String> = Vec::new();
    placeholder.visit(&mut |node| {
        if let Expr::Var(name) = node {
            if !order.contains(name) {
                order.push(name.clone());
            }
        }
    });
    let renaming: BTreeMap<String, String> = order
        .into_iter()
        .enumerate()
        .map(|(i, name)| (name, format!("V{}", i + 1)))
        .collect();
    (placeholder.rename_variables(&renaming), renaming)
}

/// The message a placeholder stands for, computed with nothing being
/// computed yet.
fn expand_placeholder(process: &RewritingProcess<'_>, key: &Expr) -> Result<Expr> {
    let (target, source) = key.previous_message_parts().ok_or_else(|| {
        LbpError::IllegalArgument(format!("{} is not a previous message", key))
    })?;
    let message = Expr::message_to(target.clone(), source.clone());
    let rewriter = if target.is_random_variable_reference() {
        RewriterName::MessageToVariableFromFactor
    } else {
        RewriterName::MessageToFactorFromVariable
    };
    process.rewrite(rewriter, &args::message(message, &BeingComputed::new()))
}

/// The random variable a message is a function of.
fn message_variable(key: &Expr) -> Result<&Expr> {
    let (target, source) = key.previous_message_parts().ok_or_else(|| {
        LbpError::IllegalArgument(format!("{} is not a previous message", key))
    })?;
    Ok(if target.is_random_variable_reference() {
        target
    } else {
        source
    })
}
