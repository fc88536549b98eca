//! Engine-independent fluid physics.
//!
//! Materials and fluids, body geometry and its submerged part, and the
//! hydrodynamic force model. Nothing here talks to a solver: callers hand in
//! a body snapshot and apply the returned forces themselves.

pub mod math;
pub use math::{Mat3, Pose, Quat, Vec3};

mod error;
pub use error::{HydroError, Result};

mod material;
pub use material::{Fluid, FrictionPair, Material, MaterialManager};

pub mod builtins;

pub mod flow;
pub use flow::{sample_flow_at, Atmosphere, Environment, FlowFieldSpec, FluidSurface, Ocean, Plane, Tide};

pub mod geometry;
pub use geometry::{BodyGeometry, GeometryProperties, Shape, Submersion, TriangleMesh};

pub mod hydrodynamics;
pub use hydrodynamics::{
    aerodynamic_forces, hydrodynamic_forces, AeroForces, BodySample, DragCoefficients, HydroBody,
    HydrodynamicProxy, SubmersionResult,
};
