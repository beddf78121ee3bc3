//! End-to-end belief queries on the example models.

use approx::assert_abs_diff_eq;
use liftlogic_ir::{simplify, Context, Expr};

use crate::config::{LbpConfig, UpdateSchedule};
use crate::example_models;
use crate::model::Model;
use crate::orchestrator::{BeliefQuery, BeliefResult, QueryPhase};

fn reference(functor: &str, arg: Expr) -> Expr {
    Expr::rv_ref(functor, vec![arg])
}

fn belief(model: &Model, config: LbpConfig, query: &Expr) -> BeliefResult {
    BeliefQuery::new(model, config)
        .run(query)
        .unwrap()
        .belief()
        .cloned()
        .unwrap()
}

/// Weight of `value = true` in `expr` once `formula` is assumed.
fn weight_where(expr: &Expr, formula: &Expr, value: &Expr) -> f64 {
    let context = Context::default()
        .with_formula(formula)
        .and_then(|ctx| ctx.with_assumption(value, true))
        .unwrap();
    let number = simplify(expr, &context).unwrap();
    num_traits::ToPrimitive::to_f64(number.as_number().unwrap()).unwrap()
}

#[test]
fn test_deterministic_conjunction_forces_both_values() {
    let model = example_models::trivial_pq_with_priors().unwrap();
    for functor in ["p", "q"] {
        let result = belief(&model, LbpConfig::default(), &reference(functor, Expr::var("X")));
        assert_eq!(
            result.belief.to_string(),
            format!("if {}(X) then 1 else 0", functor)
        );
    }
}

#[test]
fn test_weighted_conjunction_with_priors() {
    let model = example_models::weighted_pq_with_priors().unwrap();
    let p = Expr::rv("p", vec![Expr::var("X")]);
    let q = Expr::rv("q", vec![Expr::var("X")]);

    let result = belief(&model, LbpConfig::default(), &Expr::bracket(p.clone()));
    assert_eq!(result.phase, QueryPhase::Converged);
    assert_abs_diff_eq!(result.probability(&p, true).unwrap(), 0.223300971, epsilon = 1e-9);

    let result = belief(&model, LbpConfig::default(), &Expr::bracket(q.clone()));
    assert_abs_diff_eq!(result.probability(&q, true).unwrap(), 0.320388350, epsilon = 1e-9);
    assert_abs_diff_eq!(result.probability(&q, false).unwrap(), 0.679611650, epsilon = 1e-9);
}

#[test]
fn test_evidence_on_one_individual_splits_the_belief() {
    let model = example_models::sick_john().unwrap();
    let x = Expr::var("X");
    let sick = Expr::rv("sick", vec![x.clone()]);
    let result = belief(&model, LbpConfig::default(), &Expr::bracket(sick.clone()));

    let is_john = Expr::eq(x.clone(), Expr::constant("john"));
    let not_john = Expr::neq(x, Expr::constant("john"));
    assert_abs_diff_eq!(weight_where(&result.belief, &is_john, &sick), 1.0);
    assert_abs_diff_eq!(weight_where(&result.belief, &not_john, &sick), 0.4, epsilon = 1e-12);
}

#[test]
fn test_individual_without_factors_is_uniform() {
    let model = example_models::sick_bob().unwrap();
    let bob = Expr::rv("sick", vec![Expr::constant("bob")]);
    let result = belief(&model, LbpConfig::default(), &Expr::bracket(bob.clone()));
    assert_eq!(result.belief.to_string(), "if sick(bob) then 0.8 else 0.2");

    let ann = reference("sick", Expr::constant("ann"));
    let result = belief(&model, LbpConfig::default(), &ann);
    assert_eq!(result.belief, Expr::ratio(1, 2));

    let person = Expr::var("Person");
    let sick = Expr::rv("sick", vec![person.clone()]);
    let result = belief(&model, LbpConfig::default(), &Expr::bracket(sick.clone()));
    let is_bob = Expr::eq(person.clone(), Expr::constant("bob"));
    let not_bob = Expr::neq(person, Expr::constant("bob"));
    assert_abs_diff_eq!(weight_where(&result.belief, &is_bob, &sick), 0.8, epsilon = 1e-12);
    assert_abs_diff_eq!(weight_where(&result.belief, &not_bob, &sick), 0.5, epsilon = 1e-12);
}

#[test]
fn test_epidemic_over_a_sized_population() {
    let model = example_models::epidemic()
        .and_then(|model| model.with_sort_size("People", 20))
        .unwrap();
    let epidemic = Expr::rv("epidemic", vec![]);
    let result = belief(&model, LbpConfig::default(), &Expr::bracket(epidemic.clone()));
    assert_eq!(result.iterations, 0);
    assert_abs_diff_eq!(
        result.probability(&epidemic, true).unwrap(),
        0.588128460,
        epsilon = 1e-8
    );
}

#[test]
fn test_schedules_agree_on_a_tree() {
    let model = example_models::weighted_pq_with_priors().unwrap();
    let query = reference("p", Expr::var("X"));
    let synchronous = belief(&model, LbpConfig::default(), &query);
    let in_place = belief(
        &model,
        LbpConfig::default().with_update_schedule(UpdateSchedule::AsynchronousCycleDetecting),
        &query,
    );
    assert_eq!(synchronous.belief, in_place.belief);
}

#[test]
fn test_loopy_model_with_priors_favors_the_coupling() {
    let model = example_models::trivial_loopy_pq_with_priors()
        .and_then(|model| model.with_sort_size("Universe", 10))
        .unwrap();
    let p = Expr::rv("p", vec![Expr::constant("a")]);
    for schedule in [UpdateSchedule::Synchronous, UpdateSchedule::AsynchronousCycleDetecting] {
        let config = LbpConfig::default()
            .with_update_schedule(schedule)
            .with_max_iterations(4);
        let result = belief(&model, config, &Expr::bracket(p.clone()));
        assert!(result.iterations <= 4);
        let yes = result.probability(&p, true).unwrap();
        let no = result.probability(&p, false).unwrap();
        assert_abs_diff_eq!(yes + no, 1.0, epsilon = 1e-9);
        assert!(yes > 0.5, "{:?}: {}", schedule, result.belief);
    }
}

#[test]
fn test_concurrent_queries_share_one_model() {
    let model = example_models::weighted_pq_with_priors().unwrap();
    let query = reference("q", Expr::var("X"));
    let expected = belief(&model, LbpConfig::default(), &query);

    let results: Vec<BeliefResult> = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..4)
            .map(|_| scope.spawn(|| belief(&model, LbpConfig::default(), &query)))
            .collect();
        handles
            .into_iter()
            .map(|handle| handle.join().unwrap())
            .collect()
    });
    for result in results {
        assert_eq!(result.belief, expected.belief);
        assert_eq!(result.messages_computed, expected.messages_computed);
    }
}
