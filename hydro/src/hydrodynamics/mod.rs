//! Fluid forces on a single rigid body: buoyancy, drag, viscous damping and
//! added mass in water, plus drag in air for the emerged part.

mod proxy;
mod terms;

use serde::{Deserialize, Serialize};
use tracing::warn;

pub use proxy::{ellipsoid_added_mass, Axis, HydrodynamicProxy};

use crate::error::Result;
use crate::flow::{Atmosphere, Ocean};
use crate::geometry::{BodyGeometry, Shape};
use crate::math::{finite_or_zero, Pose, Vec3};

/// Per-axis coefficients in the body frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DragCoefficients {
    /// Skin friction, feeds the solver damping.
    pub viscous: Vec3,
    /// Pressure drag, feeds the quadratic force.
    pub quadratic: Vec3,
    pub rotational: Vec3,
}

impl Default for DragCoefficients {
    fn default() -> Self {
        Self { viscous: Vec3::splat(1.0), quadratic: Vec3::splat(0.5), rotational: Vec3::splat(0.5) }
    }
}

/// Everything about a body the force model keeps between ticks. Built once;
/// the proxy is never refitted.
#[derive(Debug, Clone, PartialEq)]
pub struct HydroBody {
    pub geometry: BodyGeometry,
    pub proxy: HydrodynamicProxy,
    pub drag: DragCoefficients,
    pub added_mass: bool,
    added_mass_coefficients: Vec3,
}

impl HydroBody {
    pub fn new(shape: Shape, drag: DragCoefficients) -> Result<Self> {
        let geometry = BodyGeometry::new(shape)?;
        let proxy = HydrodynamicProxy::fit(&geometry);
        let added_mass_coefficients = proxy.added_mass_coefficients();
        Ok(Self { geometry, proxy, drag, added_mass: false, added_mass_coefficients })
    }

    pub fn with_added_mass(mut self, enabled: bool) -> Self {
        self.added_mass = enabled;
        self
    }

    pub fn volume(&self) -> f64 {
        self.geometry.volume()
    }
}

/// Kinematic snapshot of a body read from the solver. `pose` is the
/// centre-of-mass frame.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BodySample {
    pub pose: Pose,
    pub linear_velocity: Vec3,
    pub angular_velocity: Vec3,
    /// Previous tick's estimate, used only by added mass.
    pub linear_acceleration: Vec3,
    pub mass: f64,
}

/// Result of one hydrodynamic evaluation. Vectors are in world frame except
/// `center_of_buoyancy`.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SubmersionResult {
    pub submerged_volume: f64,
    /// Body frame.
    pub center_of_buoyancy: Vec3,
    pub buoyancy_force: Vec3,
    /// World point where `buoyancy_force` acts.
    pub buoyancy_point: Vec3,
    pub drag_force: Vec3,
    pub angular_drag_torque: Vec3,
    pub added_mass_force: Vec3,
    pub linear_damping: f64,
    pub angular_damping: f64,
}

impl SubmersionResult {
    pub fn submerged_fraction(&self, total_volume: f64) -> f64 {
        if total_volume <= 0.0 {
            return 0.0;
        }
        (self.submerged_volume / total_volume).clamp(0.0, 1.0)
    }

    /// Force applied at the centre of mass (everything but buoyancy).
    pub fn central_force(&self) -> Vec3 {
        self.drag_force + self.added_mass_force
    }
}

/// Fraction of the added-mass coefficient allowed relative to the body's own
/// mass. Above the body mass the explicit scheme diverges.
pub const ADDED_MASS_CAP: f64 = 0.9;

pub fn hydrodynamic_forces(
    body: &HydroBody,
    sample: &BodySample,
    ocean: &Ocean,
    gravity: Vec3,
    time: f64,
) -> SubmersionResult {
    let fluid = &ocean.fluid;
    if !fluid.is_active() {
        return SubmersionResult::default();
    }
    let plane = ocean.surface(time).to_local(&sample.pose);
    let sub = body.geometry.submersion(&plane);
    if sub.volume <= 0.0 {
        return SubmersionResult::default();
    }

    let total = body.volume();
    let frac = (sub.volume / total).clamp(0.0, 1.0);
    let rho = fluid.density;
    let pose = &sample.pose;

    let buoyancy_point = pose.transform_point(sub.centroid);
    let buoyancy_force = terms::buoyancy_force(gravity, sub.volume, rho);

    let flow = ocean.current_at(buoyancy_point);
    let v_body = pose.inverse_transform_vector(sample.linear_velocity - flow);
    let w_body = pose.inverse_transform_vector(sample.angular_velocity);
    let areas = body.proxy.cross_sections() * frac;
    let drag_body = terms::quadratic_drag(rho, body.drag.quadratic, areas, v_body);
    let torque_body = terms::angular_drag(rho, body.drag.rotational, areas, body.proxy.lever_arms(), w_body);

    let damping = terms::viscous_damping(frac, fluid.viscosity, body.drag.viscous);

    let added_mass_force = if body.added_mass {
        let a_body = pose.inverse_transform_vector(sample.linear_acceleration);
        let k = body.added_mass_coefficients;
        pose.transform_vector(terms::added_mass_force(rho, sub.volume, k, ADDED_MASS_CAP * sample.mass, a_body))
    } else {
        Vec3::ZERO
    };

    let result = SubmersionResult {
        submerged_volume: sub.volume,
        center_of_buoyancy: sub.centroid,
        buoyancy_force: finite_or_zero(buoyancy_force),
        buoyancy_point,
        drag_force: finite_or_zero(pose.transform_vector(drag_body)),
        angular_drag_torque: finite_or_zero(pose.transform_vector(torque_body)),
        added_mass_force: finite_or_zero(added_mass_force),
        linear_damping: damping,
        angular_damping: damping,
    };
    if !(buoyancy_force.is_finite() && drag_body.is_finite() && torque_body.is_finite()) {
        warn!(pose = ?sample.pose, "non-finite fluid force zeroed");
    }
    result
}

/// Air drag on the part of the body above the water.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct AeroForces {
    pub drag_force: Vec3,
    pub drag_torque: Vec3,
}

pub fn aerodynamic_forces(
    body: &HydroBody,
    sample: &BodySample,
    atmosphere: &Atmosphere,
    submerged_fraction: f64,
) -> AeroForces {
    let fluid = &atmosphere.fluid;
    if !fluid.is_active() {
        return AeroForces::default();
    }
    let emerged = (1.0 - submerged_fraction).clamp(0.0, 1.0);
    if emerged <= 0.0 {
        return AeroForces::default();
    }
    let pose = &sample.pose;
    let wind = atmosphere.wind_at(pose.translation);
    let v_body = pose.inverse_transform_vector(sample.linear_velocity - wind);
    let w_body = pose.inverse_transform_vector(sample.angular_velocity);
    let areas = body.proxy.cross_sections() * emerged;
    let f = terms::quadratic_drag(fluid.density, body.drag.quadratic, areas, v_body);
    let t = terms::angular_drag(fluid.density, body.drag.rotational, areas, body.proxy.lever_arms(), w_body);
    AeroForces {
        drag_force: finite_or_zero(pose.transform_vector(f)),
        drag_torque: finite_or_zero(pose.transform_vector(t)),
    }
}
