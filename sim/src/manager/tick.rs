//! One tick: pre-tick forces, a single solver step, then post-tick updates.

use comms::Occluder;
use hydro::{BodySample, Vec3};
use rayon::prelude::*;
use tracing::{trace, warn};

use super::{SimState, SimulationManager};
use crate::actuators::ActuatorContext;
use crate::arena::Id;
use crate::error::Result;
use crate::mount::SceneRefs;
use crate::render::{RenderFrame, RenderKind, Renderable};
use crate::sensors::SensorContext;
use crate::settings::SimSettings;
use crate::solid::{FluidLoad, Solid};
use crate::world::{BodyHandle, PhysicsWorld};

/// Metres of debug line per newton of buoyancy.
const RENDER_BUOYANCY_SCALE: f64 = 0.001;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    ClearForces,
    Gravity,
    Actuators,
    JointDamping,
    FluidForces,
    SolverStep,
    Accelerations,
    AnimatedEntities,
    SuctionCups,
    Sensors,
    Comms,
    Contacts,
}

/// What the last tick did, in order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickTelemetry {
    pub tick: u64,
    /// Simulated time at the end of the tick.
    pub time: f64,
    pub phases: Vec<Phase>,
    /// Fluid loads were recomputed rather than reused.
    pub fluid_recomputed: bool,
    /// Bodies overlapping the water.
    pub fluid_bodies: usize,
    pub substeps: u32,
}

/// Line-of-sight test against solver bodies, skipping the bodies that carry
/// the devices themselves.
struct WorldOccluder<'a> {
    world: &'a dyn PhysicsWorld,
    ignore: &'a [BodyHandle],
}

impl Occluder for WorldOccluder<'_> {
    fn occluded(&self, from: Vec3, to: Vec3) -> bool {
        self.world.ray_test(from, to, self.ignore).is_some()
    }
}

impl<W: PhysicsWorld> SimulationManager<W> {
    /// Run exactly one tick of `fixed_dt`.
    pub fn step(&mut self) -> Result<&TickTelemetry> {
        self.require(&[SimState::Running], "step")?;
        self.run_tick();
        Ok(&self.telemetry)
    }

    /// Run as many ticks as `seconds` of simulated time needs, ignoring the
    /// realtime factor and sub-step cap.
    pub fn run_for(&mut self, seconds: f64) -> Result<u64> {
        self.require(&[SimState::Running], "run")?;
        let ticks = (seconds * self.config.steps_per_second).round().max(0.0) as u64;
        for _ in 0..ticks {
            self.run_tick();
        }
        Ok(ticks)
    }

    /// Feed wall-clock time. Runs whole ticks out of an accumulator scaled by
    /// the realtime factor, at most `max_substeps` of them; any backlog left
    /// after that is dropped whole.
    pub fn advance(&mut self, delta: f64) -> Result<u32> {
        self.require(&[SimState::Running], "advance")?;
        if !(delta > 0.0 && delta.is_finite()) {
            return Ok(0);
        }
        let dt = self.config.fixed_dt();
        self.accumulator += delta * self.settings.snapshot().realtime_factor;
        let mut ticks = 0;
        while self.accumulator >= dt * (1.0 - 1e-9) && ticks < self.config.max_substeps {
            self.run_tick();
            self.accumulator -= dt;
            ticks += 1;
        }
        if self.accumulator >= dt * (1.0 - 1e-9) {
            let dropped = (self.accumulator / dt).round();
            warn!(dropped, max_substeps = self.config.max_substeps, "simulation falling behind, dropping backlog");
            self.accumulator = 0.0;
        }
        self.accumulator = self.accumulator.max(0.0);
        Ok(ticks)
    }

    pub(super) fn run_tick(&mut self) {
        let settings = self.settings.snapshot();
        let dt = self.config.fixed_dt();
        let mut telemetry = TickTelemetry { tick: self.tick, ..TickTelemetry::default() };

        self.pre_tick(dt, &settings, true, false, &mut telemetry);
        telemetry.substeps = self.world.step_simulation(dt, 1, dt);
        telemetry.phases.push(Phase::SolverStep);
        self.time += dt;
        self.tick += 1;
        self.post_tick(dt, &mut telemetry);

        telemetry.time = self.time;
        trace!(tick = telemetry.tick, fluid = telemetry.fluid_recomputed, "tick done");
        self.telemetry = telemetry;
        self.publish_render();
    }

    /// Forces for the coming solver step. Fluid loads are recomputed every
    /// `fluid_prescaler` ticks, or always with `force_fluid`.
    pub(super) fn pre_tick(
        &mut self,
        dt: f64,
        settings: &SimSettings,
        run_actuators: bool,
        force_fluid: bool,
        telemetry: &mut TickTelemetry,
    ) {
        self.world.clear_forces();
        telemetry.phases.push(Phase::ClearForces);

        self.world.apply_gravity(self.env.gravity);
        telemetry.phases.push(Phase::Gravity);

        // Watchdogs run on simulated time even while actuators are disabled.
        for (_, a) in self.actuators.iter_mut() {
            a.check_watchdog(self.time);
        }
        if run_actuators && settings.actuators_enabled {
            let mut ctx = ActuatorContext {
                world: &mut self.world,
                solids: &self.solids,
                joints: &self.joints,
                animated: &self.animated,
                env: &self.env,
                time: self.time,
            };
            for (_, a) in self.actuators.iter_mut() {
                a.update(dt, &mut ctx);
            }
            telemetry.phases.push(Phase::Actuators);
        }

        for (_, j) in self.joints.iter() {
            if let Some(state) = self.world.joint_state(j.handle) {
                self.world.apply_joint_torque(j.handle, j.damping_torque(state.velocity));
            }
        }
        telemetry.phases.push(Phase::JointDamping);

        let recompute = force_fluid || self.tick % u64::from(settings.fluid_prescaler.max(1)) == 0;
        if recompute {
            self.recompute_fluid_loads();
        }
        telemetry.fluid_recomputed = recompute;
        telemetry.fluid_bodies = self.apply_fluid_loads();
        telemetry.phases.push(Phase::FluidForces);
    }

    /// Per-body fluid computation runs in parallel; results are written back
    /// and applied on this thread.
    fn recompute_fluid_loads(&mut self) {
        let world = &self.world;
        let jobs: Vec<(Id<Solid>, BodySample)> = self
            .solids
            .iter()
            .filter(|(_, s)| s.buoyant && !s.fixed)
            .filter_map(|(id, s)| world.body_state(s.body).map(|state| (id, s.sample(&state))))
            .collect();
        let solids = &self.solids;
        let env = &self.env;
        let time = self.time;
        let loads: Vec<(Id<Solid>, FluidLoad)> = jobs
            .par_iter()
            .filter_map(|(id, sample)| {
                let solid = solids.get(*id)?;
                Some((*id, FluidLoad::compute(&solid.hydro, sample, env, time)))
            })
            .collect();
        for (id, load) in loads {
            if let Some(solid) = self.solids.get_mut(id) {
                solid.fluid = load;
            }
        }
    }

    /// Apply each body's current fluid load at its current pose. Returns how
    /// many bodies are at least partly submerged.
    fn apply_fluid_loads(&mut self) -> usize {
        let mut wet = 0;
        for (_, s) in self.solids.iter() {
            if !s.buoyant || s.fixed {
                continue;
            }
            let Some(state) = self.world.body_state(s.body) else {
                continue;
            };
            s.fluid.apply(&mut self.world, s.body, &state.pose);
            if s.fluid.hydro.submerged_volume > 0.0 {
                wet += 1;
            }
        }
        wet
    }

    /// Finite-difference accelerations from the step just taken.
    pub(super) fn update_accelerations(&mut self, dt: f64) {
        for (_, s) in self.solids.iter_mut() {
            if let Some(state) = self.world.body_state(s.body) {
                let sleeping = self.world.is_sleeping(s.body);
                s.kinematics.update(&state, dt, sleeping);
            }
        }
    }

    fn post_tick(&mut self, dt: f64, telemetry: &mut TickTelemetry) {
        self.update_accelerations(dt);
        telemetry.phases.push(Phase::Accelerations);

        for (_, e) in self.animated.iter_mut() {
            e.update(self.time, dt);
        }
        telemetry.phases.push(Phase::AnimatedEntities);

        let manifolds = self.world.contact_manifolds();
        {
            let mut ctx = ActuatorContext {
                world: &mut self.world,
                solids: &self.solids,
                joints: &self.joints,
                animated: &self.animated,
                env: &self.env,
                time: self.time,
            };
            for (_, a) in self.actuators.iter_mut() {
                a.post_step(&mut ctx, &manifolds);
            }
        }
        telemetry.phases.push(Phase::SuctionCups);

        {
            let ctx = SensorContext {
                scene: SceneRefs {
                    world: &self.world,
                    solids: &self.solids,
                    joints: &self.joints,
                    animated: &self.animated,
                },
                env: &self.env,
                time: self.time,
            };
            for (_, s) in self.sensors.iter_mut() {
                s.update(dt, &ctx);
            }
        }
        telemetry.phases.push(Phase::Sensors);

        self.update_comms(dt);
        telemetry.phases.push(Phase::Comms);

        for (_, m) in self.monitors.iter_mut() {
            m.update(self.time, &manifolds, &self.solids);
        }
        telemetry.phases.push(Phase::Contacts);
    }

    fn update_comms(&mut self, dt: f64) {
        let scene = SceneRefs {
            world: &self.world,
            solids: &self.solids,
            joints: &self.joints,
            animated: &self.animated,
        };
        let mut carriers = Vec::new();
        for (id, cm) in &self.comm_mounts {
            let Some(frame) = scene.frame(&cm.mount) else {
                continue;
            };
            if let Err(e) = self.comms.set_pose(*id, frame.pose) {
                warn!(device = %id, error = %e, "comm device lost");
            }
            carriers.extend(frame.body);
        }
        self.comms.set_surface(self.env.ocean.as_ref().map(|o| o.surface(self.time)));
        let occluder = WorldOccluder { world: &self.world, ignore: &carriers };
        self.comms.update(dt, &occluder);
    }

    fn publish_render(&self) {
        let scene = self.scene();
        let mut items = Vec::new();
        for (_, s) in self.solids.iter() {
            let Some(state) = self.world.body_state(s.body) else {
                continue;
            };
            let mut r = Renderable::new(RenderKind::Solid, &s.name, s.origin_pose(&state.pose));
            let hydro = &s.fluid.hydro;
            if hydro.submerged_volume > 0.0 {
                let from = state.pose.transform_point(hydro.center_of_buoyancy);
                r = r.with_line(from, from + hydro.buoyancy_force * RENDER_BUOYANCY_SCALE);
            }
            items.push(r);
        }
        for (_, e) in self.animated.iter() {
            items.push(Renderable::new(RenderKind::Animated, &e.name, e.pose));
        }
        for (_, a) in self.actuators.iter() {
            items.extend(a.renderable(scene.frame(&a.mount)));
        }
        for (_, s) in self.sensors.iter() {
            items.extend(s.renderable(scene.frame(&s.mount)));
        }
        for d in self.comms.devices() {
            let mut r = Renderable::new(RenderKind::Comm, &d.name, d.pose);
            if let Some(fix) = d.last_fix() {
                r = r.with_line(d.position(), fix.estimate);
            }
            items.push(r);
        }
        self.render.publish(RenderFrame { tick: self.tick, time: self.time, items });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actuators::{Actuator, ActuatorKind, Thruster, ThrusterParams};
    use crate::config::Config;
    use crate::mount::Mount;
    use crate::sensors::{Sensor, SensorKind};
    use crate::solid::SolidDesc;
    use crate::world::BasicWorld;
    use comms::{CommKind, DeviceId, LinkParams};
    use hydro::{Pose, Shape};

    fn running(config: Config) -> SimulationManager<BasicWorld> {
        let mut sim = SimulationManager::new(BasicWorld::new(), config).unwrap();
        sim.initialize().unwrap();
        sim
    }

    fn ball(name: &str, z: f64) -> SolidDesc {
        SolidDesc::new(name, Shape::Sphere { radius: 0.5 }, "Neutral")
            .at(Pose::from_translation(Vec3::new(0.0, 0.0, z)))
    }

    #[test]
    fn phases_run_in_order() {
        let mut sim = running(Config::default());
        sim.add_solid(ball("b", -3.0)).unwrap();
        sim.start().unwrap();
        let t = sim.step().unwrap().clone();
        assert_eq!(
            t.phases,
            vec![
                Phase::ClearForces,
                Phase::Gravity,
                Phase::Actuators,
                Phase::JointDamping,
                Phase::FluidForces,
                Phase::SolverStep,
                Phase::Accelerations,
                Phase::AnimatedEntities,
                Phase::SuctionCups,
                Phase::Sensors,
                Phase::Comms,
                Phase::Contacts,
            ]
        );
        assert_eq!(t.tick, 0);
        assert_eq!(t.fluid_bodies, 1);
        assert_eq!(sim.tick(), 1);
        assert!((sim.time() - sim.fixed_dt()).abs() < 1e-15);
    }

    #[test]
    fn disabled_actuators_skip_their_phase() {
        let mut sim = running(Config::default());
        sim.start().unwrap();
        sim.settings().update(|s| s.actuators_enabled = false);
        assert!(!sim.step().unwrap().phases.contains(&Phase::Actuators));
    }

    #[test]
    fn watchdog_trips_while_actuators_are_disabled() {
        let mut sim = running(Config::default());
        let hull = sim.add_solid(ball("hull", -3.0)).unwrap();
        let thr = sim
            .add_actuator(
                Actuator::new(
                    "thr",
                    ActuatorKind::Thruster(Thruster::new(ThrusterParams::default())),
                    Mount::on_solid(hull, Pose::IDENTITY),
                )
                .with_watchdog(0.5),
            )
            .unwrap();
        sim.start().unwrap();
        sim.set_setpoint(thr, 0.8).unwrap();
        sim.settings().update(|s| s.actuators_enabled = false);
        sim.run_for(2.0).unwrap();
        let a = sim.actuator(thr).unwrap();
        assert!(a.watchdog_expired());
        assert_eq!(a.setpoint(), 0.0);
    }

    #[test]
    fn prescaler_reuses_fluid_loads() {
        let mut sim = running(Config { fluid_prescaler: 3, ..Config::default() });
        sim.add_solid(ball("b", -3.0)).unwrap();
        sim.start().unwrap();
        let recomputed: Vec<bool> = (0..7).map(|_| sim.step().unwrap().fluid_recomputed).collect();
        assert_eq!(recomputed, vec![true, false, false, true, false, false, true]);
    }

    #[test]
    fn advance_caps_substeps_and_drops_backlog() {
        let mut sim = running(Config::default());
        sim.start().unwrap();
        let dt = sim.fixed_dt();
        assert_eq!(sim.advance(dt * 0.5).unwrap(), 0);
        assert_eq!(sim.advance(dt * 0.5).unwrap(), 1);
        assert_eq!(sim.advance(dt * 100.0).unwrap(), sim.config().max_substeps);
        // Backlog was discarded, so a small delta runs nothing.
        assert_eq!(sim.advance(dt * 0.25).unwrap(), 0);
        assert_eq!(sim.advance(0.0).unwrap(), 0);
    }

    #[test]
    fn realtime_factor_scales_advance() {
        let mut sim = running(Config::default());
        sim.start().unwrap();
        sim.settings().update(|s| s.realtime_factor = 2.0);
        let dt = sim.fixed_dt();
        assert_eq!(sim.advance(dt).unwrap(), 2);
    }

    #[test]
    fn paused_simulation_does_not_tick() {
        let mut sim = running(Config::default());
        sim.start().unwrap();
        sim.pause().unwrap();
        assert!(sim.step().is_err());
        assert!(sim.advance(1.0).is_err());
        sim.resume().unwrap();
        sim.step().unwrap();
        assert_eq!(sim.tick(), 1);
    }

    #[test]
    fn sensors_and_actuators_follow_their_solid() {
        let mut sim = running(Config::default());
        let hull = sim.add_solid(ball("hull", -10.0)).unwrap();
        let mount = Mount::on_solid(hull, Pose::IDENTITY);
        let thr = sim
            .add_actuator(Actuator::new("thr", ActuatorKind::Thruster(Thruster::new(ThrusterParams::default())), mount))
            .unwrap();
        let depth = sim.add_sensor(Sensor::new("depth", SensorKind::Pressure { noise: 0.0 }, mount, 0.0)).unwrap();
        sim.start().unwrap();
        sim.set_setpoint(thr, 1.0).unwrap();
        sim.run_for(2.0).unwrap();
        let x = sim.solid_pose(hull).unwrap().translation.x;
        assert!(x > 0.0, "x={x}");
        let p = sim.sensor(depth).unwrap().last_reading().unwrap().data.as_scalar().unwrap();
        let z = sim.solid_pose(hull).unwrap().translation.z;
        assert!((p - 1000.0 * 9.81 * -z).abs() < 1.0, "p={p} z={z}");
    }

    #[test]
    fn render_frame_is_published_each_tick() {
        let mut sim = running(Config::default());
        sim.add_solid(ball("b", -3.0)).unwrap();
        let buffer = sim.render_buffer();
        sim.start().unwrap();
        sim.step().unwrap();
        sim.step().unwrap();
        let frame = buffer.latest();
        assert_eq!(frame.tick, 2);
        assert!(frame.items.iter().any(|r| r.kind == RenderKind::Solid && r.name == "b"));
    }

    #[test]
    fn comm_devices_track_their_mount() {
        let mut sim = running(Config::default());
        let hull = sim.add_solid(ball("hull", -10.0)).unwrap();
        let kind = CommKind::Acoustic { link: LinkParams::omni(500.0), auto_ack: false, usbl: None };
        let mount = Mount::on_solid(hull, Pose::from_translation(Vec3::X));
        let id = sim.add_comm("modem", DeviceId(3), kind, mount).unwrap();
        sim.start().unwrap();
        sim.set_solid_state(hull, Pose::from_translation(Vec3::new(5.0, 0.0, -10.0)), Vec3::ZERO, Vec3::ZERO).unwrap();
        sim.step().unwrap();
        let p = sim.comms().device(id).unwrap().position();
        assert!((p.x - 6.0).abs() < 1e-3, "p={p}");
    }

    #[test]
    fn bodies_block_line_of_sight() {
        let mut world = BasicWorld::new();
        let wall = world.add_rigid_body(crate::world::RigidBodyDesc {
            pose: Pose::from_translation(Vec3::new(5.0, 0.0, 0.0)),
            mass: 0.0,
            inertia: Vec3::ZERO,
            bounding_radius: 1.0,
        });
        let occ = WorldOccluder { world: &world, ignore: &[] };
        assert!(occ.occluded(Vec3::ZERO, Vec3::new(10.0, 0.0, 0.0)));
        assert!(!occ.occluded(Vec3::ZERO, Vec3::new(0.0, 10.0, 0.0)));
        let skip = [wall];
        let occ = WorldOccluder { world: &world, ignore: &skip };
        assert!(!occ.occluded(Vec3::ZERO, Vec3::new(10.0, 0.0, 0.0)));
    }
}
