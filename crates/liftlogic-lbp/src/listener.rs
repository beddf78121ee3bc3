//! Observers of a running belief query.
//!
//! Listeners see every rewriter boundary and every phase change of a query.
//! They are purely observational: nothing they do can change a result.

use std::sync::Mutex;

use liftlogic_ir::Expr;

use crate::orchestrator::QueryPhase;
use crate::process::RewriterName;

/// A rewriter about to run.
#[derive(Debug, Clone)]
pub struct RewriteStep<'e> {
    pub query_id: u64,
    pub rewriter: RewriterName,
    /// Nesting depth of rewriter calls, 0 for the outermost one.
    pub depth: usize,
    pub input: &'e Expr,
}

/// A rewriter that finished, with the expression it produced.
#[derive(Debug, Clone)]
pub struct RewriteJustification<'e> {
    pub query_id: u64,
    pub rewriter: RewriterName,
    pub depth: usize,
    pub input: &'e Expr,
    pub output: &'e Expr,
}

/// Callbacks fired while a query runs. Every method defaults to doing
/// nothing.
pub trait QueryListener: Send + Sync {
    fn query_step_starting(&self, _query_id: u64, _phase: QueryPhase) {}

    fn query_step_complete(&self, _query_id: u64, _phase: QueryPhase) {}

    fn trace_event(&self, _step: &RewriteStep<'_>) {}

    fn justification_event(&self, _justification: &RewriteJustification<'_>) {}
}

/// What a [`RecordingListener`] saw, in order.
#[derive(Debug, Clone, PartialEq)]
pub enum ListenerEvent {
    StepStarting(QueryPhase),
    StepComplete(QueryPhase),
    Rewrite { rewriter: RewriterName, depth: usize },
    Rewritten { rewriter: RewriterName, output: Expr },
}

/// Listener keeping every event in memory.
#[derive(Debug, Default)]
pub struct RecordingListener {
    events: Mutex<Vec<ListenerEvent>>,
}

impl RecordingListener {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<ListenerEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }

    /// Number of times `rewriter` was entered.
    pub fn count(&self, rewriter: RewriterName) -> usize {
        self.events()
            .iter()
            .filter(|event| matches!(event, ListenerEvent::Rewrite { rewriter: r, .. } if *r == rewriter))
            .count()
    }

    fn record(&self, event: ListenerEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}

impl QueryListener for RecordingListener {
    fn query_step_starting(&self, _query_id: u64, phase: QueryPhase) {
        self.record(ListenerEvent::StepStarting(phase));
    }

    fn query_step_complete(&self, _query_id: u64, phase: QueryPhase) {
        self.record(ListenerEvent::StepComplete(phase));
    }

    fn trace_event(&self, step: &RewriteStep<'_>) {
        self.record(ListenerEvent::Rewrite {
            rewriter: step.rewriter,
            depth: step.depth,
        });
    }

    fn justification_event(&self, justification: &RewriteJustification<'_>) {
        self.record(ListenerEvent::Rewritten {
            rewriter: justification.rewriter,
            output: justification.output.clone(),
        });
    }
}
