use hydro::{Pose, Quat, Vec3};
use serde::{Deserialize, Serialize};

use super::{ActuatorContext, AppliedLoad};
use crate::mount::MountFrame;

/// Foil hinged about the mount's Z axis with the leading edge along +X.
/// The setpoint is the deflection angle in radians.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RudderParams {
    /// Planform area, m².
    pub area: f64,
    /// Lift coefficient per radian of angle of attack.
    pub lift_slope: f64,
    pub drag_coefficient: f64,
    /// Drag growth with the square of the angle of attack.
    pub induced_drag: f64,
    pub stall_angle: f64,
    pub max_angle: f64,
}

impl Default for RudderParams {
    fn default() -> Self {
        Self {
            area: 0.05,
            lift_slope: 2.0 * std::f64::consts::PI,
            drag_coefficient: 0.05,
            induced_drag: 0.5,
            stall_angle: 0.3,
            max_angle: 0.6,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FoilForces {
    /// Foil frame.
    pub lift: Vec3,
    pub drag: Vec3,
    pub angle_of_attack: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rudder {
    pub params: RudderParams,
    angle: f64,
    last: FoilForces,
}

impl Rudder {
    pub fn new(params: RudderParams) -> Self {
        Self { params, angle: 0.0, last: FoilForces::default() }
    }

    pub fn angle(&self) -> f64 {
        self.angle
    }

    pub fn angle_of_attack(&self) -> f64 {
        self.last.angle_of_attack
    }

    /// Lift and drag for a foil-frame velocity through the fluid.
    pub fn foil_forces(&self, rho: f64, velocity: Vec3) -> FoilForces {
        let flow = Vec3::new(-velocity.x, -velocity.y, 0.0);
        let speed = flow.length();
        if speed < 1e-9 {
            return FoilForces::default();
        }
        let dir = flow / speed;
        let aoa = dir.y.atan2(-dir.x);
        let p = &self.params;
        let q = 0.5 * rho * speed * speed * p.area;
        let cl = if aoa.abs() <= p.stall_angle { p.lift_slope * aoa } else { 0.0 };
        let cd = p.drag_coefficient + p.induced_drag * aoa * aoa;
        FoilForces { lift: dir.cross(Vec3::Z) * cl * q, drag: dir * cd * q, angle_of_attack: aoa }
    }

    pub(super) fn update(
        &mut self,
        setpoint: f64,
        frame: Option<MountFrame>,
        ctx: &mut ActuatorContext<'_>,
    ) -> AppliedLoad {
        self.angle = setpoint.clamp(-self.params.max_angle, self.params.max_angle);
        self.last = FoilForces::default();
        let (Some(frame), Some(ocean)) = (frame, ctx.env.ocean.as_ref()) else {
            return AppliedLoad::default();
        };
        let Some(body) = frame.body else {
            return AppliedLoad::default();
        };
        let point = frame.pose.translation;
        if !ocean.surface(ctx.time).is_submerged(point) {
            return AppliedLoad::default();
        }
        let foil = frame.pose.mul_pose(&Pose::new(Vec3::ZERO, Quat::from_rotation_z(self.angle)));
        let relative = frame.linear_velocity - ocean.current_at(point);
        self.last = self.foil_forces(ocean.fluid.density, foil.inverse_transform_vector(relative));
        let force = foil.transform_vector(self.last.lift + self.last.drag);
        if !force.is_finite() {
            return AppliedLoad::default();
        }
        ctx.world.apply_force(body, force, point);
        AppliedLoad { force, torque: Vec3::ZERO, point, joint_torque: 0.0 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn positive_angle_of_attack_lifts_towards_plus_y() {
        let r = Rudder::new(RudderParams::default());
        let delta: f64 = 0.1;
        // Foil pitched by +δ moving along world +X
        let v = Quat::from_rotation_z(-delta) * Vec3::X;
        let f = r.foil_forces(1000.0, v);
        assert!((f.angle_of_attack - delta).abs() < 1e-12);
        let world = Quat::from_rotation_z(delta) * f.lift;
        assert!(world.y > 0.0 && world.x.abs() < 1e-9, "lift={world:?}");
        let drag = Quat::from_rotation_z(delta) * f.drag;
        assert!(drag.x < 0.0);
    }

    #[test]
    fn stall_kills_lift_but_not_drag() {
        let r = Rudder::new(RudderParams::default());
        let v = Quat::from_rotation_z(-0.5) * Vec3::X;
        let f = r.foil_forces(1000.0, v);
        assert_eq!(f.lift, Vec3::ZERO);
        assert!(f.drag.length() > 0.0);
    }

    #[test]
    fn still_water_gives_nothing() {
        let r = Rudder::new(RudderParams::default());
        assert_eq!(r.foil_forces(1000.0, Vec3::ZERO), FoilForces::default());
    }
}
