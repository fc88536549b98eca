use std::f64::consts::TAU;

use hydro::Vec3;
use serde::{Deserialize, Serialize};

use super::{ActuatorContext, AppliedLoad};
use crate::mount::MountFrame;

/// Fluid a propeller works in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Medium {
    #[default]
    Water,
    Air,
}

/// Thrust acts along the mount's +X axis.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThrusterParams {
    /// Propeller diameter, m.
    pub diameter: f64,
    pub thrust_coefficient: f64,
    pub torque_coefficient: f64,
    /// Thrust loss per unit of incoming flow speed.
    pub advance_coefficient: f64,
    /// Rotor speed at setpoint 1, rad/s.
    pub max_omega: f64,
    /// Rotor first-order time constant, s.
    pub time_constant: f64,
    pub kp: f64,
    pub ki: f64,
    /// Reverse-pitch propeller.
    pub inverted: bool,
    pub medium: Medium,
}

impl Default for ThrusterParams {
    fn default() -> Self {
        Self {
            diameter: 0.2,
            thrust_coefficient: 0.5,
            torque_coefficient: 0.05,
            advance_coefficient: -0.1,
            max_omega: 300.0,
            time_constant: 0.1,
            kp: 1.0,
            ki: 5.0,
            inverted: false,
            medium: Medium::Water,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Thruster {
    pub params: ThrusterParams,
    omega: f64,
    integral: f64,
    thrust: f64,
    torque: f64,
}

impl Thruster {
    pub fn new(params: ThrusterParams) -> Self {
        Self { params, omega: 0.0, integral: 0.0, thrust: 0.0, torque: 0.0 }
    }

    pub fn omega(&self) -> f64 {
        self.omega
    }

    pub fn thrust(&self) -> f64 {
        self.thrust
    }

    pub fn torque(&self) -> f64 {
        self.torque
    }

    /// PI loop on rotor speed feeding a first-order rotor.
    fn spin(&mut self, setpoint: f64, dt: f64) {
        let p = &self.params;
        let target = setpoint * p.max_omega;
        let error = target - self.omega;
        if p.ki > 0.0 {
            let limit = 2.0 * p.max_omega / p.ki;
            self.integral = (self.integral + error * dt).clamp(-limit, limit);
        }
        let command = (p.kp * error + p.ki * self.integral).clamp(-p.max_omega, p.max_omega);
        let blend = if p.time_constant > 0.0 { (dt / p.time_constant).min(1.0) } else { 1.0 };
        self.omega += (command - self.omega) * blend;
    }

    /// Thrust and shaft torque for fluid density `rho` and incoming flow
    /// speed `u` along the thrust axis.
    pub fn loads(&self, rho: f64, u: f64) -> (f64, f64) {
        let p = &self.params;
        let n = self.omega / TAU;
        let d = p.diameter;
        let mut thrust = rho * d.powi(3) * n.abs() * (d * p.thrust_coefficient * n + p.advance_coefficient * u);
        if p.inverted {
            thrust = -thrust;
        }
        let torque = p.torque_coefficient * rho * n.abs() * n * d.powi(5);
        (thrust, torque)
    }

    pub(super) fn update(
        &mut self,
        setpoint: f64,
        dt: f64,
        frame: Option<MountFrame>,
        ctx: &mut ActuatorContext<'_>,
    ) -> AppliedLoad {
        self.spin(setpoint, dt);
        self.thrust = 0.0;
        self.torque = 0.0;
        let Some(frame) = frame else {
            return AppliedLoad::default();
        };
        let Some(body) = frame.body else {
            return AppliedLoad::default();
        };
        let point = frame.pose.translation;
        let axis = frame.pose.transform_vector(Vec3::X);
        let in_water = ctx.env.in_water(point, ctx.time);
        let (rho, ambient) = match (self.params.medium, in_water) {
            (Medium::Water, true) => match &ctx.env.ocean {
                Some(ocean) => (ocean.fluid.density, ocean.current_at(point)),
                None => return AppliedLoad::default(),
            },
            (Medium::Air, false) => match &ctx.env.atmosphere {
                Some(atmosphere) => (atmosphere.fluid.density, atmosphere.wind_at(point)),
                None => return AppliedLoad::default(),
            },
            _ => return AppliedLoad::default(),
        };
        let u = (frame.linear_velocity - ambient).dot(axis);
        let (thrust, torque) = self.loads(rho, u);
        self.thrust = thrust;
        self.torque = torque;
        let load = AppliedLoad { force: axis * thrust, torque: -axis * torque, point, joint_torque: 0.0 };
        if load.is_finite() {
            ctx.world.apply_force(body, load.force, point);
            ctx.world.apply_torque(body, load.torque);
            load
        } else {
            AppliedLoad::default()
        }
    }
}
