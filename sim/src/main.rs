use anyhow::Result;
use clap::Parser;
use tracing::info;

use sim::scenario::build_demo;
use sim::{load_config, Args, BasicWorld, Config, SimulationManager};

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    let cfg = match &args.config {
        Some(path) => load_config(path)?,
        None => Config::default(),
    };
    info!(?cfg, "Simulation config loaded");

    let world = BasicWorld::new().with_sleeping(cfg.sleeping);
    let mut sim = SimulationManager::new(world, cfg)?;
    sim.initialize()?;
    let demo = build_demo(&mut sim)?;
    if let Some(report) = sim.start()? {
        info!(iterations = report.iterations, elapsed = report.elapsed, "Scene settled");
    }

    let ticks = (args.duration * sim.config().steps_per_second).round().max(0.0) as u64;
    let log_every = args.log_every.max(1);
    for _ in 0..ticks {
        demo.drive(&mut sim)?;
        sim.step()?;
        if sim.tick() % log_every == 0 {
            let auv = sim.solid_pose(demo.auv).map(|p| p.translation);
            let pressure = sim.sensor(demo.depth).and_then(|s| s.last_reading()).and_then(|r| r.data.as_scalar());
            let fix = sim.comms().device(demo.usbl).and_then(|d| d.last_fix()).map(|f| f.estimate);
            info!(tick = sim.tick(), time = sim.time(), ?auv, ?pressure, ?fix, "status");
        }
    }

    let stats = sim.comms().stats();
    info!(ticks, ?stats, "Simulation finished");
    sim.destroy();
    Ok(())
}
