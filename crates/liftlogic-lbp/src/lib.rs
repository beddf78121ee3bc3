//! Lifted belief propagation by symbolic rewriting.
//!
//! This crate answers belief queries on first-order probabilistic models
//! without grounding them. Messages of loopy belief propagation are computed
//! as symbolic expressions over whole populations of random variables at
//! once, so a factor shared by `| People |` individuals costs one message
//! computation instead of `| People |`.
//!
//! # Core Concepts
//!
//! - **Parfactors**: sets of bracketed potentials, e.g.
//!   `{{ (on X in People) [if sick(X) then 0.4 else 0.6] }}` ([`Model`])
//! - **Rewriters**: `R_belief`, `R_sum`, `R_prod_factor`, message and
//!   neighbor rewriters, all reached through [`RewritingProcess::rewrite`]
//! - **Being computed**: the message pairs under computation on the current
//!   call path ([`BeingComputed`]); a message needed while already being
//!   computed becomes a `previous message` placeholder
//! - **Iteration**: placeholders are iterated synchronously or in place
//!   until their values stop changing ([`BeliefQuery`])
//!
//! # Architecture
//!
//! ```text
//! BeliefQuery -> R_belief -> R_prod_factor -> R_m_to_v_from_f -> R_sum
//!                    |              |                             |
//!               R_normalize    R_neigh_v                  R_m_to_f_from_v
//! ```
//!
//! # Example
//!
//! ```rust
//! use liftlogic_ir::Expr;
//! use liftlogic_lbp::{example_models, BeliefQuery, LbpConfig};
//!
//! let model = example_models::sick_bob().unwrap();
//! let bob = Expr::rv("sick", vec![Expr::constant("bob")]);
//! let outcome = BeliefQuery::new(&model, LbpConfig::default())
//!     .run(&Expr::bracket(bob.clone()))
//!     .unwrap();
//! let belief = outcome.belief().unwrap();
//! assert_eq!(belief.probability(&bob, true), Some(0.8));
//! ```

pub mod being_computed;
pub mod config;
pub mod error;
pub mod example_models;
pub mod listener;
pub mod logging;
pub mod model;
pub mod orchestrator;
pub mod process;
pub mod rewriters;

#[cfg(test)]
mod tests;

pub use being_computed::BeingComputed;
pub use config::{LbpConfig, UpdateSchedule};
pub use error::{ErrorKind, LbpError, Result};
pub use listener::{ListenerEvent, QueryListener, RecordingListener, RewriteJustification, RewriteStep};
pub use logging::{LogFormat, LogLevel, TracingLogger, TracingLoggerBuilder};
pub use model::{Model, ModelBuilder};
pub use orchestrator::{BeliefQuery, BeliefResult, QueryOutcome, QueryPhase};
pub use process::{CancellationToken, QueryState, RewriterName, RewritingProcess};
