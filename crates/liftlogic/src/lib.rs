//! liftlogic - lifted belief propagation over first-order probabilistic models
//!
//! This is the top-level umbrella crate that re-exports all liftlogic components.
//!
//! # Architecture
//!
//! - **Expression layer**: `ir` (expressions, set algebra, contextual simplification)
//! - **Inference layer**: `lbp` (models, rewriters, belief queries)
//!
//! # Example
//!
//! ```rust
//! use liftlogic::prelude::*;
//!
//! let model = example_models::weighted_pq_with_priors().unwrap();
//! let p = Expr::rv("p", vec![Expr::var("X")]);
//! let outcome = BeliefQuery::new(&model, LbpConfig::default())
//!     .run(&Expr::bracket(p.clone()))
//!     .unwrap();
//! let probability = outcome.belief().unwrap().probability(&p, true).unwrap();
//! assert!((probability - 0.223300971).abs() < 1e-9);
//! ```

pub use liftlogic_ir as ir;
pub use liftlogic_lbp as lbp;

/// The types needed to declare a model and query it.
pub mod prelude {
    pub use liftlogic_ir::{DomainInfo, Expr, IndexExpression};
    pub use liftlogic_lbp::{
        example_models, BeliefQuery, BeliefResult, CancellationToken, LbpConfig, LbpError, Model,
        QueryOutcome, QueryPhase, UpdateSchedule,
    };
}
