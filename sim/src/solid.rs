use hydro::{
    aerodynamic_forces, hydrodynamic_forces, AeroForces, BodySample, DragCoefficients, Environment, HydroBody, Pose,
    Shape, SubmersionResult, Vec3,
};
use serde::{Deserialize, Serialize};

use crate::world::{BodyHandle, BodyState, PhysicsWorld};

/// Everything needed to create a solid. `pose` places the shape's own
/// origin in the world; the solver body sits at the centre of mass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolidDesc {
    pub name: String,
    pub shape: Shape,
    pub material: String,
    #[serde(default)]
    pub pose: Pose,
    #[serde(default)]
    pub drag: DragCoefficients,
    #[serde(default)]
    pub added_mass: bool,
    #[serde(default = "yes")]
    pub buoyant: bool,
    /// Static bodies never move; they still block rays and make contacts.
    #[serde(default)]
    pub fixed: bool,
}

fn yes() -> bool {
    true
}

impl SolidDesc {
    pub fn new(name: impl Into<String>, shape: Shape, material: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            shape,
            material: material.into(),
            pose: Pose::IDENTITY,
            drag: DragCoefficients::default(),
            added_mass: false,
            buoyant: true,
            fixed: false,
        }
    }

    pub fn at(mut self, pose: Pose) -> Self {
        self.pose = pose;
        self
    }

    pub fn fixed(mut self) -> Self {
        self.fixed = true;
        self
    }

    pub fn with_drag(mut self, drag: DragCoefficients) -> Self {
        self.drag = drag;
        self
    }

    pub fn with_added_mass(mut self) -> Self {
        self.added_mass = true;
        self
    }
}

/// Fluid forces from the last recompute, re-applied on skipped ticks.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FluidLoad {
    pub hydro: SubmersionResult,
    pub aero: AeroForces,
}

impl FluidLoad {
    pub fn compute(body: &HydroBody, sample: &BodySample, env: &Environment, time: f64) -> Self {
        let hydro = match &env.ocean {
            Some(ocean) => hydrodynamic_forces(body, sample, ocean, env.gravity, time),
            None => SubmersionResult::default(),
        };
        let aero = match &env.atmosphere {
            Some(atmosphere) => {
                aerodynamic_forces(body, sample, atmosphere, hydro.submerged_fraction(body.volume()))
            }
            None => AeroForces::default(),
        };
        Self { hydro, aero }
    }

    /// Apply to a body at its current pose. The buoyancy point follows the
    /// body; world-frame forces are held as computed.
    pub fn apply(&self, world: &mut dyn PhysicsWorld, body: BodyHandle, pose: &Pose) {
        let h = &self.hydro;
        if h.submerged_volume > 0.0 {
            world.apply_force(body, h.buoyancy_force, pose.transform_point(h.center_of_buoyancy));
        }
        world.apply_central_force(body, h.central_force() + self.aero.drag_force);
        world.apply_torque(body, h.angular_drag_torque + self.aero.drag_torque);
        world.set_damping(body, h.linear_damping, h.angular_damping);
    }
}

/// Finite-difference acceleration estimate, refreshed after every step.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Kinematics {
    pub prev_linear_velocity: Vec3,
    pub prev_angular_velocity: Vec3,
    pub linear_acceleration: Vec3,
    pub angular_acceleration: Vec3,
}

impl Kinematics {
    pub fn update(&mut self, state: &BodyState, dt: f64, sleeping: bool) {
        if sleeping || dt <= 0.0 {
            self.linear_acceleration = Vec3::ZERO;
            self.angular_acceleration = Vec3::ZERO;
        } else {
            self.linear_acceleration = (state.linear_velocity - self.prev_linear_velocity) / dt;
            self.angular_acceleration = (state.angular_velocity - self.prev_angular_velocity) / dt;
        }
        self.prev_linear_velocity = state.linear_velocity;
        self.prev_angular_velocity = state.angular_velocity;
    }
}

#[derive(Debug, Clone)]
pub struct Solid {
    pub name: String,
    pub material: String,
    pub hydro: HydroBody,
    pub buoyant: bool,
    pub fixed: bool,
    /// Mass without any ballast liquid.
    pub mass: f64,
    /// Principal moments about the centre of mass.
    pub inertia: Vec3,
    pub(crate) body: BodyHandle,
    /// Centre of mass in the shape frame.
    pub(crate) com: Vec3,
    pub(crate) initial_pose: Pose,
    pub(crate) fluid: FluidLoad,
    pub(crate) kinematics: Kinematics,
}

impl Solid {
    pub fn body(&self) -> BodyHandle {
        self.body
    }

    pub fn fluid_load(&self) -> &FluidLoad {
        &self.fluid
    }

    pub fn kinematics(&self) -> &Kinematics {
        &self.kinematics
    }

    /// World pose of the shape origin given the solver's COM pose.
    pub fn origin_pose(&self, com_pose: &Pose) -> Pose {
        com_pose.mul_pose(&Pose::from_translation(-self.com))
    }

    /// Solver COM pose for a shape-origin pose.
    pub fn com_pose(&self, origin: &Pose) -> Pose {
        origin.mul_pose(&Pose::from_translation(self.com))
    }

    pub fn sample(&self, state: &BodyState) -> BodySample {
        BodySample {
            pose: state.pose,
            linear_velocity: state.linear_velocity,
            angular_velocity: state.angular_velocity,
            linear_acceleration: self.kinematics.linear_acceleration,
            mass: state.mass,
        }
    }

    pub fn submerged_fraction(&self) -> f64 {
        self.fluid.hydro.submerged_fraction(self.hydro.volume())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::{BasicWorld, RigidBodyDesc};
    use hydro::{builtins, Ocean};

    #[test]
    fn dry_body_gets_no_load() {
        let body = HydroBody::new(Shape::Sphere { radius: 0.5 }, DragCoefficients::default()).unwrap();
        let env = Environment { ocean: Some(Ocean::new(builtins::water(), 0.0)), ..Default::default() };
        let sample = BodySample { pose: Pose::from_translation(Vec3::Z * 3.0), mass: 1.0, ..Default::default() };
        assert_eq!(FluidLoad::compute(&body, &sample, &env, 0.0), FluidLoad::default());
    }

    #[test]
    fn buoyancy_point_follows_the_body() {
        let mut world = BasicWorld::new();
        let h = world.add_rigid_body(RigidBodyDesc {
            pose: Pose::IDENTITY,
            mass: 1.0,
            inertia: Vec3::ONE,
            bounding_radius: 1.0,
        });
        let load = FluidLoad {
            hydro: SubmersionResult {
                submerged_volume: 1.0,
                center_of_buoyancy: Vec3::X,
                buoyancy_force: Vec3::Z,
                ..Default::default()
            },
            aero: AeroForces::default(),
        };
        let pose = Pose::new(Vec3::ZERO, hydro::Quat::from_rotation_z(std::f64::consts::PI));
        load.apply(&mut world, h, &pose);
        world.step_simulation(0.1, 1, 0.1);
        // Lever arm now along −X, which pitches the body about +Y
        let w = world.body_state(h).unwrap().angular_velocity;
        assert!(w.y > 0.0, "w={w:?}");
    }

    #[test]
    fn acceleration_zero_while_sleeping() {
        let mut k = Kinematics::default();
        let state = BodyState { linear_velocity: Vec3::X, ..Default::default() };
        k.update(&state, 0.1, false);
        assert!((k.linear_acceleration.x - 10.0).abs() < 1e-12);
        k.update(&BodyState::default(), 0.1, true);
        assert_eq!(k.linear_acceleration, Vec3::ZERO);
    }
}
