use anyhow::Result;
use hydro::{Pose, Shape, Vec3};
use sim::{BasicWorld, Config, SimulationManager, SolidDesc};

const FLOOR_RADIUS: f64 = 1000.0;
const FLOOR_DEPTH: f64 = 30.0;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

fn world(contact: bool) -> BasicWorld {
    if contact {
        BasicWorld::new().with_contact_response(1.0e5, 5.0e3)
    } else {
        BasicWorld::new()
    }
}

fn drop_on_seabed(contact: bool, seconds: f64) -> Result<(f64, bool, u64, Vec<Vec3>)> {
    let mut sim = SimulationManager::new(world(contact), Config::default())?;
    sim.initialize()?;
    let floor = sim.add_solid(
        SolidDesc::new("floor", Shape::Sphere { radius: FLOOR_RADIUS }, "Steel")
            .at(Pose::from_translation(Vec3::new(0.0, 0.0, -FLOOR_DEPTH - FLOOR_RADIUS)))
            .fixed(),
    )?;
    let ball = sim.add_solid(
        SolidDesc::new("ball", Shape::Sphere { radius: 0.2 }, "Steel")
            .at(Pose::from_translation(Vec3::new(0.0, 0.0, -25.0))),
    )?;
    let monitor = sim.add_contact_monitor("ball_floor", floor, ball, 8)?;
    sim.start()?;
    sim.run_for(seconds)?;

    let z = sim.solid_pose(ball).map(|p| p.translation.z).unwrap_or(f64::NAN);
    let m = sim.contact_monitor(monitor).ok_or_else(|| anyhow::anyhow!("monitor missing"))?;
    let normals = m.points().iter().map(|p| p.normal).collect();
    Ok((z, m.in_contact(), m.ticks_in_contact(), normals))
}

#[test]
fn sunk_ball_rests_on_the_seabed() -> Result<()> {
    init_tracing();
    let (z, touching, ticks, normals) = drop_on_seabed(true, 6.0)?;
    assert!(z < -FLOOR_DEPTH + 0.2 && z > -FLOOR_DEPTH + 0.1, "ball at z={z}");
    assert!(touching);
    assert!(ticks > 100, "only {ticks} ticks in contact");
    assert!(!normals.is_empty());
    for n in normals {
        // Reported from the floor towards the ball.
        assert!(n.z > 0.99, "normal {n}");
    }
    Ok(())
}

#[test]
fn without_response_the_ball_falls_through() -> Result<()> {
    init_tracing();
    let (z, touching, ..) = drop_on_seabed(false, 6.0)?;
    assert!(z < -FLOOR_DEPTH - 1.0, "ball at z={z}");
    // Still overlapping the floor sphere, just reported and never resolved.
    assert!(touching);
    Ok(())
}
