//! The simulation manager owns every entity and drives the tick.

mod ic;
mod tick;

pub use ic::IcReport;
pub use tick::{Phase, TickTelemetry};

use std::collections::BTreeMap;

use comms::{CommDevice, CommKind, CommPropagationEngine, DeviceId, ReceivedFrame};
use hydro::{Environment, Material, MaterialManager, Pose, Vec3};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, info, warn};

use crate::actuators::{Actuator, ActuatorContext};
use crate::animated::{AnimatedEntity, Trajectory};
use crate::arena::{Arena, Id};
use crate::config::{default_materials, Config};
use crate::contacts::ContactMonitor;
use crate::error::{Result, SimError};
use crate::joint::Joint;
use crate::mount::{Mount, MountFrame, SceneRefs};
use crate::names::NameManager;
use crate::render::RenderBuffer;
use crate::sensors::Sensor;
use crate::settings::SharedSettings;
use crate::solid::{FluidLoad, Kinematics, Solid, SolidDesc};
use crate::world::{BodyState, JointDesc, JointState, PhysicsWorld, RigidBodyDesc};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimState {
    Uninitialized,
    SolverReady,
    IcSolving,
    Running,
    Paused,
    Destroyed,
}

/// A comm device and what carries it.
#[derive(Debug, Clone, PartialEq)]
struct CommMount {
    name: String,
    mount: Mount,
}

pub struct SimulationManager<W: PhysicsWorld> {
    world: W,
    config: Config,
    state: SimState,
    settings: SharedSettings,
    env: Environment,
    materials: MaterialManager,
    names: NameManager,
    solids: Arena<Solid>,
    joints: Arena<Joint>,
    actuators: Arena<Actuator>,
    sensors: Arena<Sensor>,
    animated: Arena<AnimatedEntity>,
    monitors: Arena<ContactMonitor>,
    comms: CommPropagationEngine,
    comm_mounts: BTreeMap<DeviceId, CommMount>,
    time: f64,
    tick: u64,
    accumulator: f64,
    rng: StdRng,
    telemetry: TickTelemetry,
    render: RenderBuffer,
}

impl<W: PhysicsWorld> SimulationManager<W> {
    pub fn new(world: W, config: Config) -> Result<Self> {
        config.validate()?;
        let materials = default_materials();
        let mut names = NameManager::new();
        for m in materials.materials() {
            names.register(&m.name)?;
        }
        Ok(Self {
            world,
            settings: SharedSettings::new(config.settings()),
            comms: CommPropagationEngine::new(config.comms, config.seed),
            rng: StdRng::seed_from_u64(config.seed),
            config,
            state: SimState::Uninitialized,
            env: Environment::default(),
            materials,
            names,
            solids: Arena::new(),
            joints: Arena::new(),
            actuators: Arena::new(),
            sensors: Arena::new(),
            animated: Arena::new(),
            monitors: Arena::new(),
            comm_mounts: BTreeMap::new(),
            time: 0.0,
            tick: 0,
            accumulator: 0.0,
            telemetry: TickTelemetry::default(),
            render: RenderBuffer::new(),
        })
    }

    // ----- Lifecycle -----

    pub fn state(&self) -> SimState {
        self.state
    }

    fn set_state(&mut self, to: SimState) {
        if self.state != to {
            info!(from = ?self.state, to = ?to, time = self.time, "simulation state changed");
            self.state = to;
        }
    }

    fn require(&self, allowed: &[SimState], op: &'static str) -> Result<()> {
        if allowed.contains(&self.state) {
            Ok(())
        } else {
            Err(SimError::InvalidState { op, state: self.state })
        }
    }

    fn require_building(&self, op: &'static str) -> Result<()> {
        self.require(&[SimState::SolverReady, SimState::Running, SimState::Paused], op)
    }

    /// Resolve the environment and get ready for entities.
    pub fn initialize(&mut self) -> Result<()> {
        self.require(&[SimState::Uninitialized], "initialize")?;
        self.env = self.config.environment(&self.materials)?;
        self.set_state(SimState::SolverReady);
        Ok(())
    }

    /// Enter `Running`, solving initial conditions first when configured.
    /// On failure the manager stays in `SolverReady`.
    pub fn start(&mut self) -> Result<Option<IcReport>> {
        self.require(&[SimState::SolverReady], "start")?;
        let report = if self.config.initial_conditions.enabled { Some(self.solve_initial_conditions()?) } else { None };
        self.set_state(SimState::Running);
        Ok(report)
    }

    pub fn pause(&mut self) -> Result<()> {
        self.require(&[SimState::Running], "pause")?;
        self.set_state(SimState::Paused);
        Ok(())
    }

    pub fn resume(&mut self) -> Result<()> {
        self.require(&[SimState::Paused], "resume")?;
        self.accumulator = 0.0;
        self.set_state(SimState::Running);
        Ok(())
    }

    /// Put every body and joint back where it started and return to
    /// `SolverReady`; the next `start` solves initial conditions again.
    pub fn reset(&mut self) -> Result<()> {
        self.require(&[SimState::Running, SimState::Paused], "reset")?;
        self.time = 0.0;
        self.tick = 0;
        self.accumulator = 0.0;
        self.telemetry = TickTelemetry::default();
        for (_, s) in self.solids.iter_mut() {
            self.world.set_body_state(s.body, s.initial_pose, Vec3::ZERO, Vec3::ZERO);
            s.fluid = FluidLoad::default();
            s.kinematics = Kinematics::default();
        }
        for (_, j) in self.joints.iter() {
            self.world.set_joint_state(j.handle, JointState { position: j.initial_position, velocity: 0.0 });
        }
        let mut ctx = ActuatorContext {
            world: &mut self.world,
            solids: &self.solids,
            joints: &self.joints,
            animated: &self.animated,
            env: &self.env,
            time: 0.0,
        };
        for (_, a) in self.actuators.iter_mut() {
            a.restart(&mut *ctx.world);
            a.prime(&mut ctx);
        }
        for (_, e) in self.animated.iter_mut() {
            e.rewind(0.0);
        }
        for (_, s) in self.sensors.iter_mut() {
            s.clear_history();
        }
        let mut engine = CommPropagationEngine::new(self.config.comms, self.config.seed);
        for d in self.comms.devices() {
            let mut fresh = CommDevice::new(d.id, d.name.clone(), d.kind.clone());
            fresh.pose = d.pose;
            engine.add_device(fresh)?;
        }
        self.comms = engine;
        self.set_state(SimState::SolverReady);
        Ok(())
    }

    /// Tear down every entity and release every name.
    pub fn destroy(&mut self) {
        for mut a in self.actuators.drain() {
            a.detach(&mut self.world);
        }
        for s in self.solids.drain() {
            self.world.remove_rigid_body(s.body);
        }
        for j in self.joints.drain() {
            self.world.remove_joint(j.handle);
        }
        self.sensors.drain();
        self.animated.drain();
        self.monitors.drain();
        for id in std::mem::take(&mut self.comm_mounts).into_keys() {
            if let Err(e) = self.comms.remove_device(id) {
                warn!(%id, error = %e, "comm device already gone");
            }
        }
        self.names.clear();
        self.set_state(SimState::Destroyed);
    }

    // ----- Accessors -----

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn time(&self) -> f64 {
        self.time
    }

    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn fixed_dt(&self) -> f64 {
        self.config.fixed_dt()
    }

    pub fn env(&self) -> &Environment {
        &self.env
    }

    pub fn world(&self) -> &W {
        &self.world
    }

    /// Direct solver access. Only safe between ticks.
    pub fn world_mut(&mut self) -> &mut W {
        &mut self.world
    }

    pub fn settings(&self) -> SharedSettings {
        self.settings.clone()
    }

    pub fn render_buffer(&self) -> RenderBuffer {
        self.render.clone()
    }

    pub fn telemetry(&self) -> &TickTelemetry {
        &self.telemetry
    }

    pub fn names(&self) -> &NameManager {
        &self.names
    }

    pub fn materials(&self) -> &MaterialManager {
        &self.materials
    }

    fn scene(&self) -> SceneRefs<'_> {
        SceneRefs { world: &self.world, solids: &self.solids, joints: &self.joints, animated: &self.animated }
    }

    pub fn mount_frame(&self, mount: &Mount) -> Option<MountFrame> {
        self.scene().frame(mount)
    }

    // ----- Materials -----

    pub fn add_material(&mut self, material: Material) -> Result<()> {
        self.names.register(&material.name)?;
        if let Err(e) = self.materials.add_material(material.clone()) {
            self.names.release(&material.name);
            return Err(e.into());
        }
        debug!(name = %material.name, density = material.density, "material added");
        Ok(())
    }

    // ----- Solids -----

    pub fn add_solid(&mut self, desc: SolidDesc) -> Result<Id<Solid>> {
        self.require_building("add solid")?;
        let density = self.materials.material(&desc.material)?.density;
        let hydro = hydro::HydroBody::new(desc.shape.clone(), desc.drag)?.with_added_mass(desc.added_mass);
        let props = hydro.geometry.props;
        let (mass, inertia) = if desc.fixed {
            (0.0, Vec3::ZERO)
        } else {
            let i = props.inertia_for(density);
            (props.mass(density), Vec3::new(i.x_axis.x, i.y_axis.y, i.z_axis.z))
        };
        self.names.register(&desc.name)?;
        let com = props.center_of_mass;
        let com_pose = desc.pose.mul_pose(&Pose::from_translation(com));
        let body = self.world.add_rigid_body(RigidBodyDesc {
            pose: com_pose,
            mass,
            inertia,
            bounding_radius: props.bounding_radius,
        });
        debug!(name = %desc.name, mass, volume = props.volume, "solid added");
        Ok(self.solids.insert(Solid {
            name: desc.name,
            material: desc.material,
            hydro,
            buoyant: desc.buoyant,
            fixed: desc.fixed,
            mass,
            inertia,
            body,
            com,
            initial_pose: com_pose,
            fluid: FluidLoad::default(),
            kinematics: Kinematics::default(),
        }))
    }

    /// Remove a solid; everything mounted on it is detached.
    pub fn remove_solid(&mut self, id: Id<Solid>) -> Result<()> {
        let solid = self.solids.remove(id).ok_or_else(|| unknown("solid", id))?;
        for (_, a) in self.actuators.iter_mut() {
            if a.mount.solid() == Some(id) {
                a.detach(&mut self.world);
            }
            a.release_grip_on(solid.body, &mut self.world);
        }
        for (_, s) in self.sensors.iter_mut().filter(|(_, s)| s.mount.solid() == Some(id)) {
            s.detach();
        }
        for (_, m) in self.monitors.iter_mut() {
            m.forget(id);
        }
        for cm in self.comm_mounts.values_mut().filter(|cm| cm.mount.solid() == Some(id)) {
            cm.mount = Mount::Detached;
        }
        self.world.remove_rigid_body(solid.body);
        self.names.release(&solid.name);
        debug!(name = %solid.name, "solid removed");
        Ok(())
    }

    pub fn solid(&self, id: Id<Solid>) -> Option<&Solid> {
        self.solids.get(id)
    }

    pub fn solids(&self) -> impl Iterator<Item = (Id<Solid>, &Solid)> {
        self.solids.iter()
    }

    pub fn find_solid(&self, name: &str) -> Option<Id<Solid>> {
        self.solids.iter().find(|(_, s)| s.name == name).map(|(id, _)| id)
    }

    /// Solver state at the centre of mass.
    pub fn solid_state(&self, id: Id<Solid>) -> Option<BodyState> {
        let s = self.solids.get(id)?;
        self.world.body_state(s.body)
    }

    /// World pose of the solid's shape origin.
    pub fn solid_pose(&self, id: Id<Solid>) -> Option<Pose> {
        let s = self.solids.get(id)?;
        Some(s.origin_pose(&self.world.body_state(s.body)?.pose))
    }

    pub fn set_solid_state(
        &mut self,
        id: Id<Solid>,
        origin: Pose,
        linear_velocity: Vec3,
        angular_velocity: Vec3,
    ) -> Result<()> {
        let s = self.solids.get_mut(id).ok_or_else(|| unknown("solid", id))?;
        self.world.set_body_state(s.body, s.com_pose(&origin), linear_velocity, angular_velocity);
        s.kinematics = Kinematics {
            prev_linear_velocity: linear_velocity,
            prev_angular_velocity: angular_velocity,
            ..Kinematics::default()
        };
        Ok(())
    }

    // ----- Joints -----

    pub fn add_joint(&mut self, name: &str, desc: JointDesc, damping: f64) -> Result<Id<Joint>> {
        self.require_building("add joint")?;
        self.names.register(name)?;
        let handle = self.world.add_joint(desc);
        debug!(name, kind = ?desc.kind, "joint added");
        Ok(self.joints.insert(Joint {
            name: name.to_string(),
            kind: desc.kind,
            damping: damping.max(0.0),
            initial_position: desc.initial_position,
            handle,
        }))
    }

    pub fn remove_joint(&mut self, id: Id<Joint>) -> Result<()> {
        let joint = self.joints.remove(id).ok_or_else(|| unknown("joint", id))?;
        for (_, a) in self.actuators.iter_mut().filter(|(_, a)| a.mount.joint() == Some(id)) {
            a.detach(&mut self.world);
        }
        for (_, s) in self.sensors.iter_mut().filter(|(_, s)| s.mount.joint() == Some(id)) {
            s.detach();
        }
        self.world.remove_joint(joint.handle);
        self.names.release(&joint.name);
        Ok(())
    }

    pub fn joint(&self, id: Id<Joint>) -> Option<&Joint> {
        self.joints.get(id)
    }

    pub fn joint_state(&self, id: Id<Joint>) -> Option<JointState> {
        self.world.joint_state(self.joints.get(id)?.handle)
    }

    // ----- Animated entities -----

    pub fn add_animated(&mut self, name: &str, trajectory: Trajectory) -> Result<Id<AnimatedEntity>> {
        self.require_building("add animated entity")?;
        self.names.register(name)?;
        let mut entity = AnimatedEntity::new(name, trajectory);
        entity.rewind(self.time);
        Ok(self.animated.insert(entity))
    }

    pub fn remove_animated(&mut self, id: Id<AnimatedEntity>) -> Result<()> {
        let entity = self.animated.remove(id).ok_or_else(|| unknown("animated entity", id))?;
        let on_entity = |m: &Mount| matches!(m, Mount::Animated { entity, .. } if *entity == id);
        for (_, s) in self.sensors.iter_mut().filter(|(_, s)| on_entity(&s.mount)) {
            s.detach();
        }
        for cm in self.comm_mounts.values_mut().filter(|cm| on_entity(&cm.mount)) {
            cm.mount = Mount::Detached;
        }
        self.names.release(&entity.name);
        Ok(())
    }

    pub fn animated(&self, id: Id<AnimatedEntity>) -> Option<&AnimatedEntity> {
        self.animated.get(id)
    }

    // ----- Actuators -----

    fn check_mount(&self, name: &str, mount: &Mount, wants_joint: bool) -> Result<()> {
        let ok = match mount {
            Mount::Joint(j) => wants_joint && self.joints.contains(*j),
            Mount::Solid { solid, .. } => !wants_joint && self.solids.contains(*solid),
            Mount::Animated { entity, .. } => !wants_joint && self.animated.contains(*entity),
            Mount::World(_) => !wants_joint,
            Mount::Detached => false,
        };
        if ok {
            Ok(())
        } else {
            let reason = if wants_joint { "needs an existing joint" } else { "needs an existing solid or frame" };
            Err(SimError::InvalidMount { name: name.to_string(), reason })
        }
    }

    pub fn add_actuator(&mut self, mut actuator: Actuator) -> Result<Id<Actuator>> {
        self.require_building("add actuator")?;
        self.check_mount(&actuator.name, &actuator.mount, actuator.kind.needs_joint())?;
        if matches!(actuator.mount, Mount::Animated { .. } | Mount::World(_)) {
            return Err(SimError::InvalidMount { name: actuator.name, reason: "actuators act on solids or joints" });
        }
        self.names.register(&actuator.name)?;
        let mut ctx = ActuatorContext {
            world: &mut self.world,
            solids: &self.solids,
            joints: &self.joints,
            animated: &self.animated,
            env: &self.env,
            time: self.time,
        };
        actuator.prime(&mut ctx);
        debug!(name = %actuator.name, kind = actuator.kind.type_name(), "actuator added");
        Ok(self.actuators.insert(actuator))
    }

    pub fn remove_actuator(&mut self, id: Id<Actuator>) -> Result<Actuator> {
        let mut actuator = self.actuators.remove(id).ok_or_else(|| unknown("actuator", id))?;
        actuator.detach(&mut self.world);
        self.names.release(&actuator.name);
        Ok(actuator)
    }

    pub fn actuator(&self, id: Id<Actuator>) -> Option<&Actuator> {
        self.actuators.get(id)
    }

    pub fn actuator_mut(&mut self, id: Id<Actuator>) -> Option<&mut Actuator> {
        self.actuators.get_mut(id)
    }

    pub fn find_actuator(&self, name: &str) -> Option<Id<Actuator>> {
        self.actuators.iter().find(|(_, a)| a.name == name).map(|(id, _)| id)
    }

    pub fn set_setpoint(&mut self, id: Id<Actuator>, value: f64) -> Result<()> {
        self.actuators.get_mut(id).ok_or_else(|| unknown("actuator", id))?.set_setpoint(value);
        Ok(())
    }

    /// Feed the actuator's watchdog at the current simulated time.
    pub fn reset_watchdog(&mut self, id: Id<Actuator>) -> Result<()> {
        let now = self.time;
        self.actuators.get_mut(id).ok_or_else(|| unknown("actuator", id))?.reset_watchdog(now);
        Ok(())
    }

    // ----- Sensors -----

    pub fn add_sensor(&mut self, mut sensor: Sensor) -> Result<Id<Sensor>> {
        self.require_building("add sensor")?;
        self.check_mount(&sensor.name, &sensor.mount, sensor.kind.needs_joint())?;
        self.names.register(&sensor.name)?;
        sensor.reseed(self.rng.gen());
        debug!(name = %sensor.name, kind = sensor.kind.type_name(), rate = sensor.rate(), "sensor added");
        Ok(self.sensors.insert(sensor))
    }

    pub fn remove_sensor(&mut self, id: Id<Sensor>) -> Result<Sensor> {
        let sensor = self.sensors.remove(id).ok_or_else(|| unknown("sensor", id))?;
        self.names.release(&sensor.name);
        Ok(sensor)
    }

    pub fn sensor(&self, id: Id<Sensor>) -> Option<&Sensor> {
        self.sensors.get(id)
    }

    pub fn sensor_mut(&mut self, id: Id<Sensor>) -> Option<&mut Sensor> {
        self.sensors.get_mut(id)
    }

    pub fn find_sensor(&self, name: &str) -> Option<Id<Sensor>> {
        self.sensors.iter().find(|(_, s)| s.name == name).map(|(id, _)| id)
    }

    // ----- Contact monitors -----

    pub fn add_contact_monitor(
        &mut self,
        name: &str,
        a: Id<Solid>,
        b: Id<Solid>,
        history: usize,
    ) -> Result<Id<ContactMonitor>> {
        self.require_building("add contact monitor")?;
        if !self.solids.contains(a) || !self.solids.contains(b) {
            return Err(SimError::InvalidMount { name: name.to_string(), reason: "needs two existing solids" });
        }
        self.names.register(name)?;
        Ok(self.monitors.insert(ContactMonitor::new(name, a, b, history)))
    }

    pub fn contact_monitor(&self, id: Id<ContactMonitor>) -> Option<&ContactMonitor> {
        self.monitors.get(id)
    }

    // ----- Communications -----

    pub fn add_comm(&mut self, name: &str, id: DeviceId, kind: CommKind, mount: Mount) -> Result<DeviceId> {
        self.require_building("add comm device")?;
        self.check_mount(name, &mount, false)?;
        self.names.register(name)?;
        let mut device = CommDevice::new(id, name, kind);
        if let Some(frame) = self.scene().frame(&mount) {
            device.pose = frame.pose;
        }
        if let Err(e) = self.comms.add_device(device) {
            self.names.release(name);
            return Err(e.into());
        }
        self.comm_mounts.insert(id, CommMount { name: name.to_string(), mount });
        debug!(name, %id, "comm device added");
        Ok(id)
    }

    pub fn remove_comm(&mut self, id: DeviceId) -> Result<()> {
        self.comms.remove_device(id)?;
        if let Some(cm) = self.comm_mounts.remove(&id) {
            self.names.release(&cm.name);
        }
        Ok(())
    }

    pub fn send(&mut self, source: DeviceId, destination: DeviceId, payload: Vec<u8>) -> Result<u32> {
        Ok(self.comms.send(source, destination, payload)?)
    }

    pub fn receive(&mut self, id: DeviceId) -> Result<Option<ReceivedFrame>> {
        Ok(self.comms.receive(id)?)
    }

    pub fn comms(&self) -> &CommPropagationEngine {
        &self.comms
    }

    pub fn comms_mut(&mut self) -> &mut CommPropagationEngine {
        &mut self.comms
    }
}

fn unknown<T>(kind: &'static str, id: Id<T>) -> SimError {
    SimError::UnknownEntity { kind, name: format!("{id:?}") }
}
