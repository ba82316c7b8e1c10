use cequil::*;
use std::time::Instant;
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    // RUST_LOG=cequil=debug lists every allocation checked
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt().with_env_filter(env_filter).with_target(false).init();

    let mut unexpected = Vec::new();
    for inst in instances::all()? {
        let now = Instant::now();
        let found = inst.find_equilibrium()?;
        match &found {
            Some(eq) => println!(
                "{}: allocation {} with prices {} of {}",
                inst.name,
                inst.market.describe(&eq.allocation),
                eq.prices,
                inst.market.items().unwrap_or_default()
            ),
            None => println!("{}: no competitive equilibrium", inst.name),
        }
        println!("Time: {:.3} seconds", now.elapsed().as_secs_f64());
        if found.is_some() != inst.has_equilibrium {
            unexpected.push(inst.name);
        }
    }

    let (market, unsupported, supported) = instances::goods4_agents2()?;
    let checker = FeasibilityChecker::default();
    for alloc in [&unsupported, &supported] {
        match checker.find_equilibrium_prices(&market, alloc)? {
            Some(prices) => println!("Allocation {}: prices {}", market.describe(alloc), prices),
            None => println!("Allocation {}: no equilibrium prices", market.describe(alloc)),
        }
    }

    if !unexpected.is_empty() {
        anyhow::bail!("unexpected result for {}", unexpected.join(", "));
    }
    Ok(())
}
