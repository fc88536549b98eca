//! Actuators: command setpoints in, forces and torques out.
//!
//! Every actuator is one [`Actuator`] whose behaviour is picked by
//! [`ActuatorKind`]. An optional [`Watchdog`] zeroes the setpoint when the
//! controller stops calling [`Actuator::reset_watchdog`].

mod push;
mod rudder;
mod servo;
mod suction_cup;
mod thruster;
mod vbs;
mod watchdog;

pub use push::PushParams;
pub use rudder::{FoilForces, Rudder, RudderParams};
pub use servo::{ServoMode, ServoParams};
pub use suction_cup::{SuctionCup, SuctionCupParams};
pub use thruster::{Medium, Thruster, ThrusterParams};
pub use vbs::{Vbs, VbsParams};
pub use watchdog::Watchdog;

use hydro::{Environment, Vec3};
use tracing::warn;

use crate::animated::AnimatedEntity;
use crate::arena::Arena;
use crate::joint::Joint;
use crate::mount::{Mount, MountFrame, SceneRefs};
use crate::render::{RenderKind, Renderable};
use crate::solid::Solid;
use crate::world::{BodyHandle, ContactManifold, PhysicsWorld};

/// Metres of debug line per newton.
const RENDER_FORCE_SCALE: f64 = 0.01;

/// What an actuator applied on its last update, world frame.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct AppliedLoad {
    pub force: Vec3,
    pub torque: Vec3,
    pub point: Vec3,
    pub joint_torque: f64,
}

impl AppliedLoad {
    pub fn is_finite(&self) -> bool {
        self.force.is_finite() && self.torque.is_finite() && self.joint_torque.is_finite()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ActuatorKind {
    Thruster(Thruster),
    Rudder(Rudder),
    Push(PushParams),
    Servo(ServoParams),
    Vbs(Vbs),
    SuctionCup(SuctionCup),
}

impl ActuatorKind {
    pub fn type_name(&self) -> &'static str {
        match self {
            ActuatorKind::Thruster(_) => "thruster",
            ActuatorKind::Rudder(_) => "rudder",
            ActuatorKind::Push(_) => "push",
            ActuatorKind::Servo(_) => "servo",
            ActuatorKind::Vbs(_) => "vbs",
            ActuatorKind::SuctionCup(_) => "suction_cup",
        }
    }

    pub fn needs_joint(&self) -> bool {
        matches!(self, ActuatorKind::Servo(_))
    }

    fn setpoint_range(&self) -> (f64, f64) {
        match self {
            ActuatorKind::Thruster(_) | ActuatorKind::Vbs(_) => (-1.0, 1.0),
            ActuatorKind::Rudder(r) => (-r.params.max_angle, r.params.max_angle),
            ActuatorKind::Push(p) => (-p.max_force, p.max_force),
            ActuatorKind::Servo(_) => (f64::NEG_INFINITY, f64::INFINITY),
            ActuatorKind::SuctionCup(_) => (0.0, 1.0),
        }
    }
}

/// Mutable solver access plus read-only scene state for one update.
pub struct ActuatorContext<'a> {
    pub world: &'a mut dyn PhysicsWorld,
    pub solids: &'a Arena<Solid>,
    pub joints: &'a Arena<Joint>,
    pub animated: &'a Arena<AnimatedEntity>,
    pub env: &'a Environment,
    /// Simulated time.
    pub time: f64,
}

impl ActuatorContext<'_> {
    pub fn frame(&self, mount: &Mount) -> Option<MountFrame> {
        let scene = SceneRefs {
            world: &*self.world,
            solids: self.solids,
            joints: self.joints,
            animated: self.animated,
        };
        scene.frame(mount)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Actuator {
    pub name: String,
    pub kind: ActuatorKind,
    pub(crate) mount: Mount,
    setpoint: f64,
    watchdog: Option<Watchdog>,
    last: AppliedLoad,
}

impl Actuator {
    pub fn new(name: impl Into<String>, kind: ActuatorKind, mount: Mount) -> Self {
        Self { name: name.into(), kind, mount, setpoint: 0.0, watchdog: None, last: AppliedLoad::default() }
    }

    /// Arm a watchdog. The timer starts when the actuator joins a simulation.
    pub fn with_watchdog(mut self, timeout: f64) -> Self {
        self.watchdog = Some(Watchdog::new(timeout, 0.0));
        self
    }

    pub fn mount(&self) -> Mount {
        self.mount
    }

    pub fn setpoint(&self) -> f64 {
        self.setpoint
    }

    /// Ignored while the watchdog is expired.
    pub fn set_setpoint(&mut self, value: f64) {
        if self.watchdog_expired() || !value.is_finite() {
            return;
        }
        let (lo, hi) = self.kind.setpoint_range();
        self.setpoint = value.clamp(lo, hi);
    }

    pub fn watchdog(&self) -> Option<&Watchdog> {
        self.watchdog.as_ref()
    }

    pub fn watchdog_expired(&self) -> bool {
        self.watchdog.is_some_and(|w| w.expired())
    }

    pub fn reset_watchdog(&mut self, now: f64) {
        if let Some(w) = self.watchdog.as_mut() {
            w.reset(now);
        }
    }

    /// Trips the watchdog once `now` is past its timeout and forces the
    /// setpoint to zero while it stays expired.
    pub fn check_watchdog(&mut self, now: f64) {
        if let Some(w) = self.watchdog.as_mut() {
            if w.check(now) {
                warn!(actuator = %self.name, timeout = w.timeout(), "watchdog expired, setpoint zeroed");
            }
            if w.expired() {
                self.setpoint = 0.0;
            }
        }
    }

    pub fn last_load(&self) -> AppliedLoad {
        self.last
    }

    /// One-off work when joining a simulation.
    pub(crate) fn prime(&mut self, ctx: &mut ActuatorContext<'_>) {
        self.reset_watchdog(ctx.time);
        if let ActuatorKind::Vbs(vbs) = &self.kind {
            let solids = ctx.solids;
            if let Some(solid) = self.mount.solid().and_then(|id| solids.get(id)) {
                vbs.sync_mass(solid, ctx);
            }
        }
    }

    pub fn update(&mut self, dt: f64, ctx: &mut ActuatorContext<'_>) {
        if !(dt > 0.0) {
            return;
        }
        self.check_watchdog(ctx.time);
        let frame = ctx.frame(&self.mount);
        let setpoint = self.setpoint;
        let solids = ctx.solids;
        let joints = ctx.joints;
        self.last = match &mut self.kind {
            ActuatorKind::Thruster(t) => t.update(setpoint, dt, frame, ctx),
            ActuatorKind::Rudder(r) => r.update(setpoint, frame, ctx),
            ActuatorKind::Push(p) => push::update(p, setpoint, frame, ctx),
            ActuatorKind::Servo(p) => {
                let joint = self.mount.joint().and_then(|j| joints.get(j)).map(Joint::handle);
                AppliedLoad { joint_torque: servo::update(p, setpoint, joint, &mut *ctx.world), ..Default::default() }
            }
            ActuatorKind::Vbs(v) => {
                let solid = self.mount.solid().and_then(|s| solids.get(s));
                v.update(setpoint, dt, solid, ctx)
            }
            ActuatorKind::SuctionCup(_) => AppliedLoad::default(),
        };
    }

    /// Runs after the solver step; only suction cups act here.
    pub(crate) fn post_step(&mut self, ctx: &mut ActuatorContext<'_>, manifolds: &[ContactManifold]) {
        let frame = ctx.frame(&self.mount);
        let pump_on = self.setpoint > 0.5;
        if let ActuatorKind::SuctionCup(cup) = &mut self.kind {
            cup.post_step(pump_on, frame, &mut *ctx.world, manifolds);
        }
    }

    /// Drop the mount and anything the actuator holds in the solver.
    pub(crate) fn detach(&mut self, world: &mut dyn PhysicsWorld) {
        self.mount = Mount::Detached;
        if let ActuatorKind::SuctionCup(cup) = &mut self.kind {
            cup.release(world);
        }
        self.last = AppliedLoad::default();
    }

    /// Let go of `body` if this is a suction cup holding it.
    pub(crate) fn release_grip_on(&mut self, body: BodyHandle, world: &mut dyn PhysicsWorld) {
        if let ActuatorKind::SuctionCup(cup) = &mut self.kind {
            if cup.gripped_body() == Some(body) {
                cup.release(world);
            }
        }
    }

    /// Back to the state it had when added: rotors stopped, ballast at its
    /// initial fill, nothing gripped.
    pub(crate) fn restart(&mut self, world: &mut dyn PhysicsWorld) {
        match &mut self.kind {
            ActuatorKind::Thruster(t) => *t = Thruster::new(t.params),
            ActuatorKind::Rudder(r) => *r = Rudder::new(r.params),
            ActuatorKind::Vbs(v) => *v = Vbs::new(v.params),
            ActuatorKind::SuctionCup(cup) => cup.release(world),
            ActuatorKind::Push(_) | ActuatorKind::Servo(_) => {}
        }
        self.setpoint = 0.0;
        self.last = AppliedLoad::default();
    }

    pub fn renderable(&self, frame: Option<MountFrame>) -> Option<Renderable> {
        let frame = frame?;
        let mut r = Renderable::new(RenderKind::Actuator, &self.name, frame.pose);
        if self.last.force != Vec3::ZERO {
            r = r.with_line(self.last.point, self.last.point + self.last.force * RENDER_FORCE_SCALE);
        }
        Some(r)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::{BasicWorld, RigidBodyDesc};
    use hydro::{builtins, Ocean, Pose};

    struct Rig {
        world: BasicWorld,
        solids: Arena<Solid>,
        joints: Arena<Joint>,
        animated: Arena<AnimatedEntity>,
        env: Environment,
    }

    impl Rig {
        fn new() -> Self {
            let env = Environment { ocean: Some(Ocean::new(builtins::water(), 10.0)), ..Default::default() };
            Self { world: BasicWorld::new(), solids: Arena::new(), joints: Arena::new(), animated: Arena::new(), env }
        }

        fn ctx(&mut self, time: f64) -> ActuatorContext<'_> {
            ActuatorContext {
                world: &mut self.world,
                solids: &self.solids,
                joints: &self.joints,
                animated: &self.animated,
                env: &self.env,
                time,
            }
        }
    }

    fn thruster() -> Actuator {
        Actuator::new(
            "t",
            ActuatorKind::Thruster(Thruster::new(ThrusterParams::default())),
            Mount::World(Pose::IDENTITY),
        )
    }

    #[test]
    fn watchdog_zeroes_setpoint_and_holds_it() {
        let mut rig = Rig::new();
        let mut a = thruster().with_watchdog(0.5);
        a.prime(&mut rig.ctx(0.0));
        a.set_setpoint(0.8);
        let dt = 0.01;
        let mut t = 0.0;
        for _ in 0..40 {
            t += dt;
            a.update(dt, &mut rig.ctx(t));
        }
        assert_eq!(a.setpoint(), 0.8);
        for _ in 0..20 {
            t += dt;
            a.update(dt, &mut rig.ctx(t));
        }
        assert!(a.watchdog_expired());
        assert_eq!(a.setpoint(), 0.0);
        a.set_setpoint(0.9);
        a.update(dt, &mut rig.ctx(t + dt));
        assert_eq!(a.setpoint(), 0.0);
        a.reset_watchdog(t + dt);
        a.set_setpoint(0.9);
        assert_eq!(a.setpoint(), 0.9);
    }

    #[test]
    fn zero_step_changes_nothing() {
        let mut rig = Rig::new();
        let kinds = vec![
            ActuatorKind::Thruster(Thruster::new(ThrusterParams::default())),
            ActuatorKind::Rudder(Rudder::new(RudderParams::default())),
            ActuatorKind::Push(PushParams::default()),
            ActuatorKind::Servo(ServoParams::default()),
            ActuatorKind::Vbs(Vbs::new(VbsParams::default())),
            ActuatorKind::SuctionCup(SuctionCup::new(SuctionCupParams::default())),
        ];
        for kind in kinds {
            let mut a = Actuator::new("a", kind, Mount::World(Pose::IDENTITY)).with_watchdog(0.1);
            a.set_setpoint(0.7);
            let before = a.clone();
            a.update(0.0, &mut rig.ctx(100.0));
            a.update(-1.0, &mut rig.ctx(100.0));
            assert_eq!(a, before, "{}", a.kind.type_name());
        }
    }

    #[test]
    fn setpoint_is_clamped_per_kind() {
        let mut a = thruster();
        a.set_setpoint(3.0);
        assert_eq!(a.setpoint(), 1.0);
        a.set_setpoint(f64::NAN);
        assert_eq!(a.setpoint(), 1.0);
        let mut r = Actuator::new("r", ActuatorKind::Rudder(Rudder::new(RudderParams::default())), Mount::Detached);
        r.set_setpoint(-2.0);
        assert_eq!(r.setpoint(), -RudderParams::default().max_angle);
    }

    fn add_body(rig: &mut Rig, name: &str, mass: f64) -> crate::arena::Id<Solid> {
        use hydro::{DragCoefficients, HydroBody, Shape};
        let hydro = HydroBody::new(Shape::Box { half_extents: Vec3::splat(0.5) }, DragCoefficients::default()).unwrap();
        let body = rig.world.add_rigid_body(RigidBodyDesc {
            pose: Pose::IDENTITY,
            mass,
            inertia: Vec3::splat(mass / 6.0),
            bounding_radius: 0.87,
        });
        rig.solids.insert(Solid {
            name: name.into(),
            material: "Neutral".into(),
            hydro,
            buoyant: true,
            fixed: mass == 0.0,
            mass,
            inertia: Vec3::splat(mass / 6.0),
            body,
            com: Vec3::ZERO,
            initial_pose: Pose::IDENTITY,
            fluid: Default::default(),
            kinematics: Default::default(),
        })
    }

    #[test]
    fn vbs_fill_and_drain_returns_to_start() {
        let mut rig = Rig::new();
        let id = add_body(&mut rig, "hull", 100.0);
        let body = rig.solids[id].body();
        let vbs = ActuatorKind::Vbs(Vbs::new(VbsParams::default()));
        let mut a = Actuator::new("vbs", vbs, Mount::on_solid(id, Pose::IDENTITY));
        a.prime(&mut rig.ctx(0.0));
        assert!((rig.world.body_state(body).unwrap().mass - 105.0).abs() < 1e-9);
        a.set_setpoint(1.0);
        for i in 0..20 {
            a.update(0.5, &mut rig.ctx(i as f64 * 0.5));
        }
        assert!((rig.world.body_state(body).unwrap().mass - 110.0).abs() < 1e-9);
        a.set_setpoint(-1.0);
        for i in 0..20 {
            a.update(0.5, &mut rig.ctx(i as f64 * 0.5));
        }
        let ActuatorKind::Vbs(v) = &a.kind else { unreachable!() };
        assert!((v.liquid_volume() - 0.005).abs() < 1e-12);
        assert!((rig.world.body_state(body).unwrap().mass - 105.0).abs() < 1e-9);
    }

    #[test]
    fn thruster_pushes_submerged_body_forward() {
        let mut rig = Rig::new();
        let id = add_body(&mut rig, "hull", 100.0);
        let body = rig.solids[id].body();
        let mut a = Actuator::new(
            "thr",
            ActuatorKind::Thruster(Thruster::new(ThrusterParams::default())),
            Mount::on_solid(id, Pose::IDENTITY),
        );
        a.set_setpoint(1.0);
        for i in 0..100 {
            rig.world.clear_forces();
            a.update(0.01, &mut rig.ctx(i as f64 * 0.01));
            rig.world.step_simulation(0.01, 1, 0.01);
        }
        assert!(a.last_load().force.x > 0.0);
        assert!(rig.world.body_state(body).unwrap().linear_velocity.x > 0.0);
    }

    #[test]
    fn thruster_out_of_water_is_idle() {
        let mut rig = Rig::new();
        rig.env.ocean = Some(Ocean::new(builtins::water(), -10.0));
        let id = add_body(&mut rig, "hull", 100.0);
        let mut a = Actuator::new(
            "thr",
            ActuatorKind::Thruster(Thruster::new(ThrusterParams::default())),
            Mount::on_solid(id, Pose::IDENTITY),
        );
        a.set_setpoint(1.0);
        for i in 0..50 {
            a.update(0.01, &mut rig.ctx(i as f64 * 0.01));
        }
        assert_eq!(a.last_load(), AppliedLoad::default());
        let ActuatorKind::Thruster(t) = &a.kind else { unreachable!() };
        assert!(t.omega() > 0.0);
    }

    #[test]
    fn suction_cup_grips_on_contact_and_releases() {
        let mut rig = Rig::new();
        let arm = add_body(&mut rig, "arm", 10.0);
        let wall = add_body(&mut rig, "wall", 0.0);
        let wall_body = rig.solids[wall].body();
        rig.world.set_body_state(wall_body, Pose::from_translation(Vec3::new(1.5, 0.0, 0.0)), Vec3::ZERO, Vec3::ZERO);
        let mut cup = Actuator::new(
            "cup",
            ActuatorKind::SuctionCup(SuctionCup::new(SuctionCupParams::default())),
            Mount::on_solid(arm, Pose::from_translation(Vec3::new(0.5, 0.0, 0.0))),
        );
        cup.set_setpoint(1.0);
        let manifolds = rig.world.contact_manifolds();
        assert_eq!(manifolds.len(), 1);
        cup.post_step(&mut rig.ctx(0.0), &manifolds);
        assert_eq!(rig.world.constraint_count(), 1);
        cup.post_step(&mut rig.ctx(0.0), &manifolds);
        assert_eq!(rig.world.constraint_count(), 1);
        cup.set_setpoint(0.0);
        cup.post_step(&mut rig.ctx(0.0), &manifolds);
        assert_eq!(rig.world.constraint_count(), 0);
    }
}
