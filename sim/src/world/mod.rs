//! Seam to the rigid-body solver. The manager only talks to the solver
//! through [`PhysicsWorld`]; [`BasicWorld`] is a small reference integrator.

mod basic;
pub use basic::BasicWorld;

use hydro::{Pose, Vec3};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BodyHandle(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct JointHandle(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConstraintHandle(pub usize);

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RigidBodyDesc {
    /// Centre-of-mass frame in world.
    pub pose: Pose,
    /// Zero makes the body static.
    pub mass: f64,
    /// Principal moments in the body frame.
    pub inertia: Vec3,
    /// Radius used for contacts and ray tests.
    pub bounding_radius: f64,
}

/// Solver-owned state of one body. Read-only to everything above the solver.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BodyState {
    pub pose: Pose,
    pub linear_velocity: Vec3,
    pub angular_velocity: Vec3,
    pub mass: f64,
}

impl BodyState {
    /// Velocity of a world point rigidly attached to the body.
    pub fn velocity_at(&self, point: Vec3) -> Vec3 {
        self.linear_velocity + self.angular_velocity.cross(point - self.pose.translation)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JointKind {
    Revolute,
    Prismatic,
}

/// One-degree-of-freedom joint. `inertia` is the effective inertia (or mass)
/// seen along the joint coordinate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JointDesc {
    pub kind: JointKind,
    pub inertia: f64,
    pub limits: Option<(f64, f64)>,
    pub initial_position: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct JointState {
    pub position: f64,
    pub velocity: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContactPoint {
    pub position: Vec3,
    /// From body `a` towards body `b`.
    pub normal: Vec3,
    pub depth: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ContactManifold {
    pub a: BodyHandle,
    pub b: BodyHandle,
    pub points: Vec<ContactPoint>,
}

impl ContactManifold {
    pub fn involves(&self, body: BodyHandle) -> bool {
        self.a == body || self.b == body
    }

    pub fn other(&self, body: BodyHandle) -> Option<BodyHandle> {
        if self.a == body {
            Some(self.b)
        } else if self.b == body {
            Some(self.a)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayHit {
    pub body: BodyHandle,
    pub point: Vec3,
    pub distance: f64,
}

/// What the simulation needs from a rigid-body solver. Forces accumulate
/// until `clear_forces` and are consumed by `step_simulation`.
pub trait PhysicsWorld: Send {
    fn add_rigid_body(&mut self, desc: RigidBodyDesc) -> BodyHandle;
    fn remove_rigid_body(&mut self, body: BodyHandle);
    fn body_state(&self, body: BodyHandle) -> Option<BodyState>;
    fn set_body_state(&mut self, body: BodyHandle, pose: Pose, linear_velocity: Vec3, angular_velocity: Vec3);
    fn set_mass(&mut self, body: BodyHandle, mass: f64, inertia: Vec3);

    fn add_joint(&mut self, desc: JointDesc) -> JointHandle;
    fn remove_joint(&mut self, joint: JointHandle);
    fn joint_state(&self, joint: JointHandle) -> Option<JointState>;
    fn set_joint_state(&mut self, joint: JointHandle, state: JointState);
    fn apply_joint_torque(&mut self, joint: JointHandle, torque: f64);

    /// Spring-damper holding a world pivot fixed on both bodies.
    fn add_point_constraint(
        &mut self,
        a: BodyHandle,
        b: BodyHandle,
        pivot: Vec3,
        stiffness: f64,
        damping: f64,
    ) -> ConstraintHandle;
    fn remove_constraint(&mut self, constraint: ConstraintHandle);

    fn clear_forces(&mut self);
    fn apply_gravity(&mut self, gravity: Vec3);
    fn apply_central_force(&mut self, body: BodyHandle, force: Vec3);
    /// Force acting at a world point.
    fn apply_force(&mut self, body: BodyHandle, force: Vec3, point: Vec3);
    fn apply_torque(&mut self, body: BodyHandle, torque: Vec3);
    /// Fractional velocity loss per second, each in [0, 1].
    fn set_damping(&mut self, body: BodyHandle, linear: f64, angular: f64);

    /// Advance by `dt`. With `max_substeps == 0` a single variable step is
    /// taken; otherwise fixed `fixed_substep` steps are taken out of an
    /// internal accumulator, at most `max_substeps` of them. Returns the number
    /// of sub-steps performed.
    fn step_simulation(&mut self, dt: f64, max_substeps: u32, fixed_substep: f64) -> u32;

    fn contact_manifolds(&self) -> Vec<ContactManifold>;
    /// First body hit on the segment, skipping `ignore`.
    fn ray_test(&self, from: Vec3, to: Vec3, ignore: &[BodyHandle]) -> Option<RayHit>;
    fn is_sleeping(&self, body: BodyHandle) -> bool;
}
