use anyhow::Result;
use hydro::{FlowFieldSpec, Pose, Shape, Vec3};
use sim::actuators::{Thruster, ThrusterParams};
use sim::{Actuator, ActuatorKind, BasicWorld, Config, Mount, SimulationManager, SolidDesc};

const CURRENT: f64 = 0.4;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

fn run_cross_current(throttle: f64, seconds: f64) -> Result<(Vec3, Vec3)> {
    let mut cfg = Config::default();
    cfg.ocean.currents = vec![FlowFieldSpec::Uniform { flow: Vec3::new(0.0, CURRENT, 0.0) }];
    let mut sim = SimulationManager::new(BasicWorld::new(), cfg)?;
    sim.initialize()?;
    let hull = sim.add_solid(
        SolidDesc::new("hull", Shape::Sphere { radius: 0.3 }, "Neutral")
            .at(Pose::from_translation(Vec3::new(0.0, 0.0, -8.0))),
    )?;
    let thruster = sim.add_actuator(Actuator::new(
        "hull_thruster",
        ActuatorKind::Thruster(Thruster::new(ThrusterParams::default())),
        Mount::on_solid(hull, Pose::from_translation(Vec3::new(-0.3, 0.0, 0.0))),
    ))?;
    sim.start()?;
    sim.set_setpoint(thruster, throttle)?;
    sim.run_for(seconds)?;
    let state = sim.solid_state(hull).ok_or_else(|| anyhow::anyhow!("hull has no body"))?;
    Ok((state.pose.translation, state.linear_velocity))
}

#[test]
fn drifting_hull_picks_up_the_current() -> Result<()> {
    init_tracing();
    let (pos, vel) = run_cross_current(0.0, 30.0)?;
    assert!(vel.y > 0.25 && vel.y < CURRENT + 1e-6, "sway {}", vel.y);
    assert!(vel.x.abs() < 1e-3, "surge {}", vel.x);
    assert!((pos.z + 8.0).abs() < 0.05, "neutral hull changed depth to {}", pos.z);
    Ok(())
}

#[test]
fn thrust_does_not_stop_the_drift() -> Result<()> {
    init_tracing();
    let (pos, vel) = run_cross_current(0.8, 30.0)?;
    assert!(vel.x > 0.05, "surge {}", vel.x);
    assert!(pos.x > 1.0, "hull only reached x={}", pos.x);
    assert!(vel.y > 0.25 && vel.y < CURRENT + 1e-6, "sway {}", vel.y);
    Ok(())
}
