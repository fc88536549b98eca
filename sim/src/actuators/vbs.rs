use hydro::Vec3;
use serde::{Deserialize, Serialize};

use super::{ActuatorContext, AppliedLoad};
use crate::solid::Solid;

/// Ballast tank. The setpoint is the pump flow as a fraction of
/// `max_flow_rate` (positive fills).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VbsParams {
    /// m³
    pub min_volume: f64,
    pub max_volume: f64,
    pub initial_volume: f64,
    /// m³/s
    pub max_flow_rate: f64,
    pub liquid_density: f64,
    /// Liquid centre of gravity with an empty and a full tank, in the
    /// solid's shape frame.
    pub empty_cg: Vec3,
    pub full_cg: Vec3,
}

impl Default for VbsParams {
    fn default() -> Self {
        Self {
            min_volume: 0.0,
            max_volume: 0.01,
            initial_volume: 0.005,
            max_flow_rate: 0.0005,
            liquid_density: 1000.0,
            empty_cg: Vec3::ZERO,
            full_cg: Vec3::ZERO,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vbs {
    pub params: VbsParams,
    volume: f64,
}

impl Vbs {
    pub fn new(params: VbsParams) -> Self {
        let volume = clamp_volume(&params, params.initial_volume);
        Self { params, volume }
    }

    pub fn liquid_volume(&self) -> f64 {
        self.volume
    }

    pub fn liquid_mass(&self) -> f64 {
        self.volume * self.params.liquid_density
    }

    fn fill_fraction(&self) -> f64 {
        let span = self.params.max_volume - self.params.min_volume;
        if span > 0.0 {
            (self.volume - self.params.min_volume) / span
        } else {
            0.0
        }
    }

    /// Liquid centre of gravity in the shape frame.
    pub fn liquid_cg(&self) -> Vec3 {
        self.params.empty_cg.lerp(self.params.full_cg, self.fill_fraction())
    }

    /// Push the current total mass to the solver.
    pub(super) fn sync_mass(&self, solid: &Solid, ctx: &mut ActuatorContext<'_>) {
        let mass = solid.mass + self.liquid_mass();
        let scale = if solid.mass > 0.0 { mass / solid.mass } else { 1.0 };
        ctx.world.set_mass(solid.body(), mass, solid.inertia * scale);
    }

    pub(super) fn update(
        &mut self,
        setpoint: f64,
        dt: f64,
        solid: Option<&Solid>,
        ctx: &mut ActuatorContext<'_>,
    ) -> AppliedLoad {
        self.volume = clamp_volume(&self.params, self.volume + setpoint * self.params.max_flow_rate * dt);
        let Some(solid) = solid.filter(|s| !s.fixed) else {
            return AppliedLoad::default();
        };
        let Some(state) = ctx.world.body_state(solid.body()) else {
            return AppliedLoad::default();
        };
        self.sync_mass(solid, ctx);
        // The solver applies the liquid's weight at the centre of mass; add
        // the moment of it acting at the liquid's own centre instead.
        let cg = solid.origin_pose(&state.pose).transform_point(self.liquid_cg());
        let weight = ctx.env.gravity * self.liquid_mass();
        let torque = (cg - state.pose.translation).cross(weight);
        ctx.world.apply_torque(solid.body(), torque);
        AppliedLoad { force: weight, torque, point: cg, joint_torque: 0.0 }
    }
}

fn clamp_volume(params: &VbsParams, v: f64) -> f64 {
    v.clamp(params.min_volume, params.max_volume.max(params.min_volume))
}
