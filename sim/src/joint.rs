use crate::world::{JointHandle, JointKind};

/// A one-degree-of-freedom joint owned by the manager. Damping torque
/// `-damping * velocity` is applied every tick.
#[derive(Debug, Clone, PartialEq)]
pub struct Joint {
    pub name: String,
    pub kind: JointKind,
    pub damping: f64,
    /// Position restored on reset.
    pub initial_position: f64,
    pub(crate) handle: JointHandle,
}

impl Joint {
    pub fn handle(&self) -> JointHandle {
        self.handle
    }

    pub fn damping_torque(&self, velocity: f64) -> f64 {
        -self.damping * velocity
    }
}
