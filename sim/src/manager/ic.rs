//! Settling the scene before time starts.
//!
//! Gravity, joint damping and fluid loads act with actuators off, and the
//! solver steps until every body and joint has stayed at rest for
//! `settle_iterations` consecutive steps. Simulated time stays at zero
//! throughout.

use std::time::Instant;

use tracing::{info, warn};

use super::{SimState, SimulationManager, TickTelemetry};
use crate::config::IcConfig;
use crate::error::{Result, SimError};
use crate::world::PhysicsWorld;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IcReport {
    pub iterations: u32,
    /// Wall-clock seconds spent.
    pub elapsed: f64,
}

impl<W: PhysicsWorld> SimulationManager<W> {
    pub(super) fn solve_initial_conditions(&mut self) -> Result<IcReport> {
        let ic = self.config.initial_conditions.clone();
        let settings = self.settings.snapshot();
        let dt = self.config.fixed_dt();
        self.set_state(SimState::IcSolving);
        let started = Instant::now();
        let mut iterations = 0u32;
        let mut settled = 0u32;
        loop {
            let elapsed = started.elapsed().as_secs_f64();
            if iterations >= ic.max_iterations || elapsed > ic.max_seconds {
                warn!(iterations, elapsed, "initial conditions did not converge");
                self.set_state(SimState::SolverReady);
                return Err(SimError::IcNotSolved { iterations, elapsed });
            }
            let mut scratch = TickTelemetry::default();
            self.pre_tick(dt, &settings, false, true, &mut scratch);
            self.world.step_simulation(dt, 1, dt);
            self.update_accelerations(dt);
            iterations += 1;
            settled = if self.at_rest(&ic) { settled + 1 } else { 0 };
            if settled >= ic.settle_iterations.max(1) {
                break;
            }
        }
        let report = IcReport { iterations, elapsed: started.elapsed().as_secs_f64() };
        info!(iterations = report.iterations, elapsed = report.elapsed, "initial conditions solved");
        Ok(report)
    }

    fn at_rest(&self, ic: &IcConfig) -> bool {
        let bodies = self.solids.iter().filter(|(_, s)| !s.fixed).all(|(_, s)| {
            self.world.body_state(s.body).map_or(true, |st| {
                st.linear_velocity.length() < ic.linear_tolerance && st.angular_velocity.length() < ic.angular_tolerance
            })
        });
        let joints = self.joints.iter().all(|(_, j)| {
            self.world.joint_state(j.handle).map_or(true, |st| st.velocity.abs() < ic.joint_tolerance)
        });
        bodies && joints
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::solid::SolidDesc;
    use crate::world::BasicWorld;
    use hydro::{DragCoefficients, Material, Pose, Shape, Vec3};

    fn config(max_iterations: u32) -> Config {
        let mut cfg = Config::default();
        cfg.initial_conditions = IcConfig { enabled: true, max_iterations, ..IcConfig::default() };
        cfg
    }

    #[test]
    fn still_scene_settles_immediately() {
        let mut sim = SimulationManager::new(BasicWorld::new(), config(100)).unwrap();
        sim.initialize().unwrap();
        sim.add_solid(SolidDesc::new("floor", Shape::Sphere { radius: 1.0 }, "Steel").fixed()).unwrap();
        let report = sim.start().unwrap().unwrap();
        assert_eq!(report.iterations, IcConfig::default().settle_iterations);
        assert_eq!(sim.state(), SimState::Running);
        assert_eq!(sim.time(), 0.0);
    }

    #[test]
    fn sinking_body_fails_within_budget() {
        let mut sim = SimulationManager::new(BasicWorld::new(), config(50)).unwrap();
        sim.initialize().unwrap();
        let desc = SolidDesc::new("anchor", Shape::Sphere { radius: 0.2 }, "Steel")
            .at(Pose::from_translation(Vec3::new(0.0, 0.0, -5.0)));
        sim.add_solid(desc).unwrap();
        match sim.start() {
            Err(SimError::IcNotSolved { iterations, .. }) => assert_eq!(iterations, 50),
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(sim.state(), SimState::SolverReady);
        assert_eq!(sim.time(), 0.0);
        assert_eq!(sim.tick(), 0);
    }

    #[test]
    fn floating_body_settles() {
        let mut cfg = config(20_000);
        cfg.initial_conditions.linear_tolerance = 1e-2;
        cfg.initial_conditions.angular_tolerance = 1e-2;
        let mut sim = SimulationManager::new(BasicWorld::new(), cfg).unwrap();
        sim.initialize().unwrap();
        sim.add_material(Material {
            name: "Foam".into(),
            density: 500.0,
            restitution: 0.1,
            static_friction: 0.5,
            dynamic_friction: 0.4,
            magnetic: false,
        })
        .unwrap();
        let drag = DragCoefficients { viscous: Vec3::splat(1000.0), ..DragCoefficients::default() };
        let desc = SolidDesc::new("buoy", Shape::Sphere { radius: 0.5 }, "Foam")
            .at(Pose::from_translation(Vec3::new(0.0, 0.0, 0.2)))
            .with_drag(drag);
        let buoy = sim.add_solid(desc).unwrap();
        let report = sim.start().unwrap().unwrap();
        assert!(report.iterations > 1);
        assert_eq!(sim.time(), 0.0);
        let z = sim.solid_pose(buoy).unwrap().translation.z;
        assert!(z.abs() < 0.02, "z={z}");
    }
}
