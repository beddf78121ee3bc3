use anyhow::Result;
use liftlogic::lbp::TracingLogger;
use liftlogic::prelude::*;

fn main() -> Result<()> {
    let _logger = TracingLogger::init()?;
    println!("=== liftlogic Example: Epidemic ===\n");

    // Three people are observed sick, everybody else healthy.
    // How likely is an epidemic as the population grows?
    let epidemic = Expr::rv("epidemic", vec![]);
    let query = Expr::bracket(epidemic.clone());

    for people in [5, 20, 100] {
        let model = example_models::epidemic()?.with_sort_size("People", people)?;
        let outcome = BeliefQuery::new(&model, LbpConfig::default()).run(&query)?;
        match outcome.belief() {
            Some(result) => {
                println!("|People| = {}", people);
                println!("  belief: {}", result.belief);
                if let Some(probability) = result.probability(&epidemic, true) {
                    println!("  P(epidemic) = {:.9}", probability);
                }
                println!("  messages computed: {}", result.messages_computed);
            }
            None => println!("|People| = {}: cancelled", people),
        }
    }

    // Without a size the answer stays symbolic in | People |.
    let model = example_models::epidemic()?;
    if let Some(result) = BeliefQuery::new(&model, LbpConfig::default()).run(&query)?.belief() {
        println!("\nSymbolic belief:\n  {}", result.belief);
    }

    println!("\n=== Done ===");
    Ok(())
}
