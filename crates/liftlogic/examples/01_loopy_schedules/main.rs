use anyhow::Result;
use liftlogic::prelude::*;

fn main() -> Result<()> {
    println!("=== liftlogic Example: Loopy Model ===\n");

    // Every p(X) is coupled with every q(Y), so messages are iterated.
    let model = example_models::trivial_loopy_pq_with_priors()?.with_sort_size("Universe", 10)?;
    let p = Expr::rv("p", vec![Expr::constant("a")]);

    for schedule in [UpdateSchedule::Synchronous, UpdateSchedule::AsynchronousCycleDetecting] {
        let config = LbpConfig::default()
            .with_update_schedule(schedule)
            .with_max_iterations(10);
        let outcome = BeliefQuery::new(&model, config).run(&Expr::bracket(p.clone()))?;
        if let Some(result) = outcome.belief() {
            println!("{:?}", schedule);
            println!("  phase: {}", result.phase);
            println!("  iterations: {}", result.iterations);
            println!("  belief: {}", result.belief);
        }
    }

    println!("\n=== Done ===");
    Ok(())
}
