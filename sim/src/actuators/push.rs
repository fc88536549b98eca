use hydro::Vec3;
use serde::{Deserialize, Serialize};

use super::{ActuatorContext, AppliedLoad};
use crate::mount::MountFrame;

/// Force along the mount's +X axis equal to the setpoint in newtons.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PushParams {
    pub max_force: f64,
    /// Push only while the mount point is in water.
    pub underwater_only: bool,
}

impl Default for PushParams {
    fn default() -> Self {
        Self { max_force: 100.0, underwater_only: false }
    }
}

pub(super) fn update(
    params: &PushParams,
    setpoint: f64,
    frame: Option<MountFrame>,
    ctx: &mut ActuatorContext<'_>,
) -> AppliedLoad {
    let Some(frame) = frame else {
        return AppliedLoad::default();
    };
    let Some(body) = frame.body else {
        return AppliedLoad::default();
    };
    let point = frame.pose.translation;
    if params.underwater_only && !ctx.env.in_water(point, ctx.time) {
        return AppliedLoad::default();
    }
    let force = frame.pose.transform_vector(Vec3::X) * setpoint.clamp(-params.max_force, params.max_force);
    ctx.world.apply_force(body, force, point);
    AppliedLoad { force, torque: Vec3::ZERO, point, joint_torque: 0.0 }
}
