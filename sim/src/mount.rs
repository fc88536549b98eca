use hydro::{Pose, Vec3};

use crate::animated::AnimatedEntity;
use crate::arena::{Arena, Id};
use crate::joint::Joint;
use crate::solid::Solid;
use crate::world::{BodyHandle, PhysicsWorld};

/// Where an actuator, sensor or comm device sits. Non-owning; removing the
/// target turns the mount into `Detached`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Mount {
    /// `local` is relative to the solid's shape origin.
    Solid { solid: Id<Solid>, local: Pose },
    Joint(Id<Joint>),
    Animated { entity: Id<AnimatedEntity>, local: Pose },
    World(Pose),
    Detached,
}

impl Mount {
    pub fn on_solid(solid: Id<Solid>, local: Pose) -> Self {
        Mount::Solid { solid, local }
    }

    pub fn solid(&self) -> Option<Id<Solid>> {
        match self {
            Mount::Solid { solid, .. } => Some(*solid),
            _ => None,
        }
    }

    pub fn joint(&self) -> Option<Id<Joint>> {
        match self {
            Mount::Joint(j) => Some(*j),
            _ => None,
        }
    }

    pub fn is_detached(&self) -> bool {
        matches!(self, Mount::Detached)
    }
}

/// World-frame kinematics of a mount point.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MountFrame {
    pub pose: Pose,
    pub linear_velocity: Vec3,
    pub angular_velocity: Vec3,
    pub linear_acceleration: Vec3,
    /// Solver body carrying the mount, if any.
    pub body: Option<BodyHandle>,
}

/// Read-only view of everything a mount can refer to.
#[derive(Clone, Copy)]
pub struct SceneRefs<'a> {
    pub world: &'a dyn PhysicsWorld,
    pub solids: &'a Arena<Solid>,
    pub joints: &'a Arena<Joint>,
    pub animated: &'a Arena<AnimatedEntity>,
}

impl SceneRefs<'_> {
    /// Resolve a mount to world kinematics. Joint mounts have no frame.
    pub fn frame(&self, mount: &Mount) -> Option<MountFrame> {
        match *mount {
            Mount::Solid { solid, local } => {
                let solid = self.solids.get(solid)?;
                let state = self.world.body_state(solid.body)?;
                let pose = solid.origin_pose(&state.pose).mul_pose(&local);
                let r = pose.translation - state.pose.translation;
                let w = state.angular_velocity;
                let k = solid.kinematics();
                let accel = k.linear_acceleration + k.angular_acceleration.cross(r) + w.cross(w.cross(r));
                Some(MountFrame {
                    pose,
                    linear_velocity: state.velocity_at(pose.translation),
                    angular_velocity: w,
                    linear_acceleration: accel,
                    body: Some(solid.body),
                })
            }
            Mount::Animated { entity, local } => {
                let e = self.animated.get(entity)?;
                let pose = e.pose.mul_pose(&local);
                let r = pose.translation - e.pose.translation;
                Some(MountFrame {
                    pose,
                    linear_velocity: e.linear_velocity + e.angular_velocity.cross(r),
                    angular_velocity: e.angular_velocity,
                    linear_acceleration: e.linear_acceleration,
                    body: None,
                })
            }
            Mount::World(pose) => Some(MountFrame { pose, ..Default::default() }),
            Mount::Joint(_) | Mount::Detached => None,
        }
    }
}
