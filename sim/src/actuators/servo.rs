use serde::{Deserialize, Serialize};

use crate::world::{JointHandle, PhysicsWorld};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum ServoMode {
    #[default]
    Position,
    Velocity,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServoParams {
    pub mode: ServoMode,
    pub kp: f64,
    pub kd: f64,
    pub max_torque: f64,
    pub max_velocity: f64,
}

impl Default for ServoParams {
    fn default() -> Self {
        Self { mode: ServoMode::Position, kp: 50.0, kd: 5.0, max_torque: 20.0, max_velocity: 2.0 }
    }
}

/// Joint torque from the PD law, clamped to the torque limit.
pub(super) fn update(
    params: &ServoParams,
    setpoint: f64,
    joint: Option<JointHandle>,
    world: &mut dyn PhysicsWorld,
) -> f64 {
    let Some(joint) = joint else {
        return 0.0;
    };
    let Some(state) = world.joint_state(joint) else {
        return 0.0;
    };
    let torque = match params.mode {
        ServoMode::Position => params.kp * (setpoint - state.position) - params.kd * state.velocity,
        ServoMode::Velocity => {
            let target = setpoint.clamp(-params.max_velocity, params.max_velocity);
            params.kd * (target - state.velocity)
        }
    };
    let torque = torque.clamp(-params.max_torque, params.max_torque);
    if torque.is_finite() {
        world.apply_joint_torque(joint, torque);
        torque
    } else {
        0.0
    }
}
