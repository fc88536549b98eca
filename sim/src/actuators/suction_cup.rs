use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::mount::MountFrame;
use crate::world::{BodyHandle, ConstraintHandle, ContactManifold, PhysicsWorld};

/// The pump is on while the setpoint is above one half.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SuctionCupParams {
    pub stiffness: f64,
    pub damping: f64,
    /// Contacts farther than this from the cup do not grip, m.
    pub reach: f64,
}

impl Default for SuctionCupParams {
    fn default() -> Self {
        Self { stiffness: 5000.0, damping: 200.0, reach: 0.5 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SuctionCup {
    pub params: SuctionCupParams,
    constraint: Option<ConstraintHandle>,
    gripped: Option<BodyHandle>,
}

impl SuctionCup {
    pub fn new(params: SuctionCupParams) -> Self {
        Self { params, constraint: None, gripped: None }
    }

    pub fn is_gripping(&self) -> bool {
        self.constraint.is_some()
    }

    pub fn gripped_body(&self) -> Option<BodyHandle> {
        self.gripped
    }

    pub(super) fn release(&mut self, world: &mut dyn PhysicsWorld) {
        if let Some(c) = self.constraint.take() {
            world.remove_constraint(c);
            debug!(?self.gripped, "suction released");
        }
        self.gripped = None;
    }

    pub(super) fn post_step(
        &mut self,
        pump_on: bool,
        frame: Option<MountFrame>,
        world: &mut dyn PhysicsWorld,
        manifolds: &[ContactManifold],
    ) {
        if !pump_on {
            self.release(world);
            return;
        }
        if self.constraint.is_some() {
            return;
        }
        let Some(frame) = frame else {
            return;
        };
        let Some(own) = frame.body else {
            return;
        };
        let cup = frame.pose.translation;
        let grip = manifolds.iter().filter(|m| m.involves(own)).find_map(|m| {
            let other = m.other(own)?;
            let point = m.points.iter().find(|p| (p.position - cup).length() <= self.params.reach)?;
            Some((other, point.position))
        });
        if let Some((other, pivot)) = grip {
            let SuctionCupParams { stiffness, damping, .. } = self.params;
            self.constraint = Some(world.add_point_constraint(own, other, pivot, stiffness, damping));
            self.gripped = Some(other);
            debug!(?other, ?pivot, "suction attached");
        }
    }
}
