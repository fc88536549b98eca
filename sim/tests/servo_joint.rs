use anyhow::Result;
use sim::actuators::{ServoMode, ServoParams};
use sim::{
    Actuator, ActuatorKind, BasicWorld, Config, JointDesc, JointKind, Mount, Sensor, SensorData, SensorKind,
    SimulationManager,
};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

fn arm(mode: ServoMode, setpoint: f64) -> Result<(f64, f64, Option<SensorData>)> {
    let mut sim = SimulationManager::new(BasicWorld::new(), Config::default())?;
    sim.initialize()?;
    let desc = JointDesc { kind: JointKind::Revolute, inertia: 0.1, limits: None, initial_position: 0.0 };
    let elbow = sim.add_joint("elbow", desc, 0.01)?;
    let servo = sim.add_actuator(Actuator::new(
        "elbow_servo",
        ActuatorKind::Servo(ServoParams { mode, ..ServoParams::default() }),
        Mount::Joint(elbow),
    ))?;
    let encoder = sim.add_sensor(Sensor::new("elbow_encoder", SensorKind::RotaryEncoder, Mount::Joint(elbow), 50.0))?;
    sim.start()?;
    sim.set_setpoint(servo, setpoint)?;
    sim.run_for(3.0)?;

    let state = sim.joint_state(elbow).ok_or_else(|| anyhow::anyhow!("elbow has no state"))?;
    let reading = sim.sensor(encoder).and_then(|s| s.last_reading()).map(|r| r.data);
    Ok((state.position, state.velocity, reading))
}

#[test]
fn position_servo_reaches_its_setpoint() -> Result<()> {
    init_tracing();
    let (position, velocity, reading) = arm(ServoMode::Position, 0.5)?;
    assert!((position - 0.5).abs() < 0.01, "position {position}");
    assert!(velocity.abs() < 0.01, "velocity {velocity}");
    match reading {
        Some(SensorData::Encoder { position: p, .. }) => {
            assert!((p - position).abs() < 0.02, "encoder {p} vs {position}")
        }
        other => panic!("unexpected encoder reading {other:?}"),
    }
    Ok(())
}

#[test]
fn velocity_servo_is_speed_limited() -> Result<()> {
    init_tracing();
    let limit = ServoParams::default().max_velocity;
    let (position, velocity, _) = arm(ServoMode::Velocity, 10.0)?;
    assert!((velocity - limit).abs() < 0.05 * limit, "velocity {velocity}");
    assert!(position > 0.0);
    Ok(())
}
