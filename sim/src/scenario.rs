//! Built-in demo scene: a surface buoy with a USBL head tracking a small
//! AUV that cruises above a flat seabed.

use comms::{CommKind, DeviceId, LinkParams, UsblParams, PING};
use hydro::{DragCoefficients, Material, Pose, Quat, Shape, Vec3};
use tracing::debug;

use crate::actuators::{Actuator, ActuatorKind, Rudder, RudderParams, Thruster, ThrusterParams, Vbs, VbsParams};
use crate::arena::Id;
use crate::error::Result;
use crate::manager::SimulationManager;
use crate::mount::Mount;
use crate::sensors::{Sensor, SensorKind};
use crate::solid::{Solid, SolidDesc};
use crate::world::PhysicsWorld;

pub const SEABED_DEPTH: f64 = 30.0;
const SEABED_RADIUS: f64 = 1000.0;
const PING_PERIOD: f64 = 2.0;

/// Handles into a scene built by [`build_demo`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DemoScenario {
    pub seabed: Id<Solid>,
    pub buoy: Id<Solid>,
    pub auv: Id<Solid>,
    pub thruster: Id<Actuator>,
    pub rudder: Id<Actuator>,
    pub vbs: Id<Actuator>,
    pub depth: Id<Sensor>,
    pub dvl: Id<Sensor>,
    pub usbl: DeviceId,
    pub transponder: DeviceId,
}

fn foam() -> Material {
    Material {
        name: "Foam".into(),
        density: 300.0,
        restitution: 0.2,
        static_friction: 0.6,
        dynamic_friction: 0.5,
        magnetic: false,
    }
}

pub fn build_demo<W: PhysicsWorld>(sim: &mut SimulationManager<W>) -> Result<DemoScenario> {
    sim.add_material(foam())?;

    // A huge fixed sphere reads as a flat floor at this scale.
    let seabed = sim.add_solid(
        SolidDesc::new("seabed", Shape::Sphere { radius: SEABED_RADIUS }, "Steel")
            .at(Pose::from_translation(Vec3::new(0.0, 0.0, -SEABED_DEPTH - SEABED_RADIUS)))
            .fixed(),
    )?;

    let buoy_drag = DragCoefficients { viscous: Vec3::splat(400.0), ..DragCoefficients::default() };
    let buoy = sim.add_solid(
        SolidDesc::new("buoy", Shape::Cylinder { radius: 0.4, height: 1.0 }, "Foam")
            .at(Pose::from_translation(Vec3::new(-20.0, 0.0, 0.0)))
            .with_drag(buoy_drag),
    )?;
    let usbl_params = UsblParams { range_std: 0.05, angle_std: 0.005 };
    let usbl = sim.add_comm(
        "usbl",
        DeviceId(1),
        CommKind::Acoustic { link: LinkParams::omni(500.0), auto_ack: false, usbl: Some(usbl_params) },
        // Head looks down
        Mount::on_solid(buoy, Pose::new(Vec3::new(0.0, 0.0, -0.5), Quat::from_rotation_x(std::f64::consts::PI))),
    )?;

    let auv_drag = DragCoefficients {
        viscous: Vec3::new(10.0, 50.0, 50.0),
        quadratic: Vec3::new(0.3, 1.0, 1.0),
        rotational: Vec3::splat(1.0),
    };
    let auv = sim.add_solid(
        SolidDesc::new("auv", Shape::Box { half_extents: Vec3::new(0.8, 0.15, 0.15) }, "Neutral")
            .at(Pose::from_translation(Vec3::new(0.0, 0.0, -10.0)))
            .with_drag(auv_drag)
            .with_added_mass(),
    )?;
    let on_auv = |x: f64, z: f64| Mount::on_solid(auv, Pose::from_translation(Vec3::new(x, 0.0, z)));

    let thruster = sim.add_actuator(
        Actuator::new(
            "auv_thruster",
            ActuatorKind::Thruster(Thruster::new(ThrusterParams::default())),
            on_auv(-0.8, 0.0),
        )
            .with_watchdog(1.0),
    )?;
    let rudder = sim.add_actuator(Actuator::new(
        "auv_rudder",
        ActuatorKind::Rudder(Rudder::new(RudderParams::default())),
        on_auv(-0.75, 0.0),
    ))?;
    // Empty tank leaves the hull neutral; filling it makes the vehicle sink.
    let vbs_params = VbsParams {
        min_volume: 0.0,
        max_volume: 0.004,
        initial_volume: 0.0,
        ..VbsParams::default()
    };
    let vbs = sim.add_actuator(Actuator::new("auv_vbs", ActuatorKind::Vbs(Vbs::new(vbs_params)), on_auv(0.0, 0.0)))?;

    let depth = sim.add_sensor(
        Sensor::new("auv_depth", SensorKind::Pressure { noise: 5.0 }, on_auv(0.0, 0.15), 10.0).with_history(64),
    )?;
    let dvl = sim.add_sensor(Sensor::new(
        "auv_dvl",
        SensorKind::Dvl { max_range: 60.0, velocity_noise: 0.01, altitude_noise: 0.02 },
        on_auv(0.3, -0.15),
        5.0,
    ))?;
    sim.add_sensor(Sensor::new(
        "auv_imu",
        SensorKind::Imu { accel_noise: 0.02, gyro_noise: 0.001, angle_noise: 0.001 },
        on_auv(0.0, 0.0),
        100.0,
    ))?;
    sim.add_sensor(Sensor::new("auv_compass", SensorKind::Compass { noise: 0.01 }, on_auv(0.2, 0.0), 10.0))?;
    sim.add_sensor(Sensor::new(
        "auv_odometry",
        SensorKind::Odometry { position_noise: 0.0, velocity_noise: 0.0 },
        on_auv(0.0, 0.0),
        20.0,
    ))?;

    let transponder = sim.add_comm(
        "auv_transponder",
        DeviceId(2),
        CommKind::Acoustic { link: LinkParams::omni(500.0), auto_ack: true, usbl: None },
        on_auv(0.0, 0.15),
    )?;

    debug!("demo scenario built");
    Ok(DemoScenario { seabed, buoy, auv, thruster, rudder, vbs, depth, dvl, usbl, transponder })
}

impl DemoScenario {
    /// Stand-in for a vehicle controller, called once per tick: cruise ahead,
    /// weave gently, and ping the transponder every couple of seconds.
    pub fn drive<W: PhysicsWorld>(&self, sim: &mut SimulationManager<W>) -> Result<()> {
        let t = sim.time();
        sim.reset_watchdog(self.thruster)?;
        sim.set_setpoint(self.thruster, 0.6)?;
        sim.set_setpoint(self.rudder, 0.2 * (0.3 * t).sin())?;
        sim.set_setpoint(self.vbs, 0.0)?;
        let ping_ticks = (PING_PERIOD / sim.fixed_dt()).round().max(1.0) as u64;
        if sim.tick() % ping_ticks == 0 {
            sim.send(self.usbl, self.transponder, PING.to_vec())?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::world::BasicWorld;

    #[test]
    fn demo_runs_and_tracks_the_vehicle() {
        let mut sim = SimulationManager::new(BasicWorld::new(), Config::default()).unwrap();
        sim.initialize().unwrap();
        let demo = build_demo(&mut sim).unwrap();
        sim.start().unwrap();
        let mut track = Vec::new();
        for _ in 0..1000 {
            demo.drive(&mut sim).unwrap();
            sim.step().unwrap();
            track.push((sim.time(), sim.solid_pose(demo.auv).unwrap().translation));
        }
        let auv = sim.solid_pose(demo.auv).unwrap().translation;
        assert!(auv.x > 0.5, "auv={auv}");
        assert!(!sim.actuator(demo.thruster).unwrap().watchdog_expired());
        assert!(sim.sensor(demo.depth).unwrap().history().count() > 0);
        let fix = sim.comms().device(demo.usbl).unwrap().last_fix().copied();
        let fix = fix.expect("usbl should have a fix after a few pings");

        // The vehicle keeps moving after the fix; compare against where it was then.
        let (_, then) = track
            .iter()
            .copied()
            .min_by(|a, b| (a.0 - fix.time).abs().total_cmp(&(b.0 - fix.time).abs()))
            .unwrap();
        assert!((fix.estimate - then).length() < 2.0, "fix={fix:?} auv then={then}");
    }
}
