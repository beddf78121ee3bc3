//! Small named models for tests, benchmarks and documentation.
//!
//! Every model here keeps its sorts unsized; use [`Model::with_sort_size`] to
//! get numeric answers where a lifted count would otherwise stay symbolic.

use liftlogic_ir::{DomainInfo, Expr, IndexExpression};

use crate::error::Result;
use crate::model::Model;

const UNIVERSE: [&str; 1] = ["Universe"];
const NO_ARGUMENTS: [&str; 0] = [];

fn x() -> Expr {
    Expr::var("X")
}

fn unary(functor: &str, arg: Expr) -> Expr {
    Expr::rv(functor, vec![arg])
}

fn weighted(condition: Expr, if_true: Expr, if_false: Expr) -> Expr {
    Expr::bracket(Expr::ite(condition, if_true, if_false))
}

/// `{{ ( on X ) [potential] }}`
fn for_all_x(potential: Expr) -> Expr {
    Expr::intensional_multiset(vec![IndexExpression::new("X")], potential, Expr::TRUE)
}

fn for_all_x_in(sort: &str, potential: Expr, condition: Expr) -> Expr {
    Expr::intensional_multiset(vec![IndexExpression::in_sort("X", sort)], potential, condition)
}

fn prior(functor: &str, if_true: (i64, i64), if_false: (i64, i64)) -> Expr {
    for_all_x(weighted(
        unary(functor, x()),
        Expr::ratio(if_true.0, if_true.1),
        Expr::ratio(if_false.0, if_false.1),
    ))
}

/// `p(X)` and `q(X)` must both hold.
pub fn trivial_pq() -> Result<Model> {
    Model::builder("TrivialPQ")
        .random_variable("p", UNIVERSE)
        .random_variable("q", UNIVERSE)
        .parfactor(for_all_x(weighted(
            Expr::and(unary("p", x()), unary("q", x())),
            Expr::int(1),
            Expr::int(0),
        )))
        .build()
}

/// [`trivial_pq`] with priors 0.2 on `p(X)` and 0.3 on `q(X)`.
pub fn trivial_pq_with_priors() -> Result<Model> {
    Model::builder("TrivialPQWithPriors")
        .random_variable("p", UNIVERSE)
        .random_variable("q", UNIVERSE)
        .parfactor(for_all_x(weighted(
            Expr::and(unary("p", x()), unary("q", x())),
            Expr::int(1),
            Expr::int(0),
        )))
        .parfactor(prior("p", (2, 10), (8, 10)))
        .parfactor(prior("q", (3, 10), (7, 10)))
        .build()
}

pub fn weighted_pq() -> Result<Model> {
    Model::builder("WeightedPQ")
        .random_variable("p", UNIVERSE)
        .random_variable("q", UNIVERSE)
        .parfactor(for_all_x(weighted(
            Expr::and(unary("p", x()), unary("q", x())),
            Expr::ratio(2, 10),
            Expr::ratio(3, 10),
        )))
        .build()
}

pub fn weighted_pq_with_priors() -> Result<Model> {
    Model::builder("WeightedPQWithPriors")
        .random_variable("p", UNIVERSE)
        .random_variable("q", UNIVERSE)
        .parfactor(for_all_x(weighted(
            Expr::and(unary("p", x()), unary("q", x())),
            Expr::ratio(6, 10),
            Expr::ratio(4, 10),
        )))
        .parfactor(prior("p", (2, 10), (8, 10)))
        .parfactor(prior("q", (3, 10), (7, 10)))
        .build()
}

/// Three-way factor where the prior on `q(X)` rules out `q(X) = true`.
pub fn trivial_pqr_with_priors() -> Result<Model> {
    Model::builder("TrivialPQRWithPriors")
        .random_variable("p", UNIVERSE)
        .random_variable("q", UNIVERSE)
        .random_variable("r", UNIVERSE)
        .parfactor(for_all_x(weighted(
            Expr::and_all(vec![unary("p", x()), unary("q", x()), unary("r", x())]),
            Expr::ratio(6, 10),
            Expr::ratio(4, 10),
        )))
        .parfactor(prior("p", (2, 10), (8, 10)))
        .parfactor(prior("q", (0, 1), (1, 1)))
        .parfactor(prior("r", (1, 2), (1, 2)))
        .build()
}

/// One factor per `X` over the shared propositional `r`; `p(X)` is
/// irrelevant to its weight.
pub fn trivial_pr_with_non_deterministic_factor() -> Result<Model> {
    Model::builder("TrivialPRWithNonDeterministicFactor")
        .random_variable("p", UNIVERSE)
        .random_variable("r", NO_ARGUMENTS)
        .parfactor(for_all_x(weighted(
            Expr::and(
                Expr::rv("r", vec![]),
                Expr::or(unary("p", x()), Expr::not(unary("p", x()))),
            ),
            Expr::ratio(2, 10),
            Expr::ratio(3, 10),
        )))
        .build()
}

/// Prior 0.1 on every `p(X)` plus unnormalized evidence on `p(a)`.
pub fn prior_and_evidence_on_p() -> Result<Model> {
    Model::builder("PriorAndEvidenceOnP")
        .random_variable("p", UNIVERSE)
        .parfactor(prior("p", (1, 10), (9, 10)))
        .parfactor(Expr::multiset(vec![weighted(
            unary("p", Expr::constant("a")),
            Expr::ratio(2, 10),
            Expr::ratio(3, 10),
        )]))
        .build()
}

/// Every `p(X)` is connected to every `q(Y)`, so the factor graph is loopy
/// as soon as the universe has two elements.
pub fn trivial_loopy_pq() -> Result<Model> {
    Model::builder("TrivialLoopyPQ")
        .random_variable("p", UNIVERSE)
        .random_variable("q", UNIVERSE)
        .parfactor(loopy_factor())
        .build()
}

pub fn trivial_loopy_pq_with_priors() -> Result<Model> {
    Model::builder("TrivialLoopyPQWithPriors")
        .random_variable("p", UNIVERSE)
        .random_variable("q", UNIVERSE)
        .parfactor(loopy_factor())
        .parfactor(prior("p", (2, 10), (8, 10)))
        .parfactor(prior("q", (3, 10), (7, 10)))
        .build()
}

fn loopy_factor() -> Expr {
    Expr::intensional_multiset(
        vec![IndexExpression::new("X"), IndexExpression::new("Y")],
        weighted(
            Expr::and(unary("p", x()), unary("q", Expr::var("Y"))),
            Expr::int(2),
            Expr::int(1),
        ),
        Expr::TRUE,
    )
}

/// `{{ (on X, Y) [if p(X) and q(X,Y) then 2 else 3] }}` with a ground factor
/// on `q(a, Y)`.
pub fn pq_pairs_with_ground_q() -> Result<Model> {
    let y = Expr::var("Y");
    Model::builder("PQPairsWithGroundQ")
        .random_variable("p", UNIVERSE)
        .random_variable("q", ["Universe", "Universe"])
        .parfactor(Expr::intensional_multiset(
            vec![IndexExpression::new("X"), IndexExpression::new("Y")],
            weighted(
                Expr::and(unary("p", x()), Expr::rv("q", vec![x(), y.clone()])),
                Expr::int(2),
                Expr::int(3),
            ),
            Expr::TRUE,
        ))
        .parfactor(Expr::intensional_multiset(
            vec![IndexExpression::new("Y")],
            weighted(
                Expr::rv("q", vec![Expr::constant("a"), y]),
                Expr::int(10),
                Expr::int(20),
            ),
            Expr::TRUE,
        ))
        .build()
}

/// Propositional `p` shared by all `q(X)` factors, plus evidence on `q(a)`.
pub fn propositional_p_with_ground_q() -> Result<Model> {
    Model::builder("PropositionalPWithGroundQ")
        .random_variable("p", NO_ARGUMENTS)
        .random_variable("q", UNIVERSE)
        .parfactor(for_all_x(weighted(
            Expr::and(Expr::rv("p", vec![]), unary("q", x())),
            Expr::int(2),
            Expr::int(3),
        )))
        .parfactor(Expr::multiset(vec![weighted(
            unary("q", Expr::constant("a")),
            Expr::int(10),
            Expr::int(20),
        )]))
        .build()
}

/// Prior 0.4 on `sick(X)` for every person, and John is known to be sick.
pub fn sick_john() -> Result<Model> {
    Model::builder("SickJohn")
        .sort(DomainInfo::new("People").with_constants(["john"]))
        .random_variable("sick", ["People"])
        .parfactor(for_all_x_in(
            "People",
            weighted(unary("sick", x()), Expr::ratio(4, 10), Expr::ratio(6, 10)),
            Expr::TRUE,
        ))
        .parfactor(Expr::multiset(vec![weighted(
            unary("sick", Expr::constant("john")),
            Expr::int(1),
            Expr::int(0),
        )]))
        .build()
}

/// Only Bob's health has a factor; everybody else is left uniform.
pub fn sick_bob() -> Result<Model> {
    Model::builder("SickBob")
        .sort(DomainInfo::new("People").with_constants(["bob"]))
        .random_variable("sick", ["People"])
        .parfactor(Expr::multiset(vec![weighted(
            unary("sick", Expr::constant("bob")),
            Expr::ratio(8, 10),
            Expr::ratio(2, 10),
        )]))
        .build()
}

/// An epidemic raises everybody's chance of being sick. Three people are
/// observed sick and everybody else is observed healthy.
pub fn epidemic() -> Result<Model> {
    let observed: Vec<Expr> = ["person1", "person2", "person3"]
        .into_iter()
        .map(Expr::constant)
        .collect();
    let sick = unary("sick", x());
    let epidemic = Expr::rv("epidemic", vec![]);
    Model::builder("Epidemic")
        .sort(DomainInfo::new("People").with_constants(["person1", "person2", "person3"]))
        .random_variable("epidemic", NO_ARGUMENTS)
        .random_variable("sick", ["People"])
        .parfactor(Expr::uniset(vec![weighted(
            epidemic.clone(),
            Expr::ratio(1, 10),
            Expr::ratio(9, 10),
        )]))
        .parfactor(for_all_x_in(
            "People",
            Expr::bracket(Expr::ite(
                epidemic,
                Expr::ite(sick.clone(), Expr::ratio(4, 10), Expr::ratio(6, 10)),
                Expr::ite(sick.clone(), Expr::ratio(1, 100), Expr::ratio(99, 100)),
            )),
            Expr::TRUE,
        ))
        .parfactor(for_all_x_in(
            "People",
            weighted(sick.clone(), Expr::int(1), Expr::int(0)),
            Expr::or_all(observed.iter().map(|c| Expr::eq(x(), c.clone())).collect()),
        ))
        .parfactor(for_all_x_in(
            "People",
            weighted(sick, Expr::int(0), Expr::int(1)),
            Expr::and_all(observed.iter().map(|c| Expr::neq(x(), c.clone())).collect()),
        ))
        .build()
}
