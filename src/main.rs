use std::path::PathBuf;

use ability_fsm::config::AbilityConfig;
use ability_fsm::scene::scenario::{self, Scenario};
use ability_fsm::systems::PHYSICS_DT;
use anyhow::Context;
use clap::Parser;

#[derive(Parser)]
#[command(name = "ability-demo", about = "Headless run of the player ability state machine")]
struct Args {
    /// Scripted input timeline to play
    #[arg(long, value_enum, default_value_t = Scenario::Arena)]
    scenario: Scenario,

    /// Number of fixed simulation steps
    #[arg(long, default_value_t = 300)]
    steps: u32,

    /// Seconds per step
    #[arg(long, default_value_t = PHYSICS_DT)]
    dt: f32,

    /// JSON file overriding the default tuning
    #[arg(long)]
    config: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => AbilityConfig::load(path)
            .map_err(|e| {
                log::error!("[config] {}", e);
                e
            })
            .with_context(|| format!("loading {}", path.display()))?,
        None => AbilityConfig::default(),
    };
    if !(args.dt > 0.0) {
        anyhow::bail!("--dt must be positive, got {}", args.dt);
    }

    log::info!(
        "running {:?} for {} steps of {:.4}s",
        args.scenario,
        args.steps,
        args.dt
    );
    let report = scenario::run(args.scenario, config, args.steps, args.dt)?;

    for (t, kind) in &report.timeline {
        log::info!("{:>6.2}s  {:?}", t, kind);
    }
    log::info!(
        "{} projectile outcomes, final position {:?}",
        report.outcomes.len(),
        report.final_position
    );
    Ok(())
}
