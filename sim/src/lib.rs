//! Underwater multibody simulation.
//!
//! The [`SimulationManager`] owns solids, joints, actuators, sensors and comm
//! devices, and drives a [`PhysicsWorld`] one fixed tick at a time: forces
//! are synthesised before the solver step, sensors and links are updated
//! after it.

pub mod arena;
pub use arena::{Arena, Id};

mod error;
pub use error::{Result, SimError};

mod names;
pub use names::NameManager;

mod settings;
pub use settings::{SharedSettings, SimSettings};

pub mod config;
pub use config::{default_materials, load_config, Args, Config, IcConfig};

pub mod render;
pub use render::{RenderBuffer, RenderFrame, RenderKind, Renderable};

pub mod world;
pub use world::{BasicWorld, BodyHandle, BodyState, JointDesc, JointKind, PhysicsWorld};

mod solid;
pub use solid::{FluidLoad, Kinematics, Solid, SolidDesc};

mod joint;
pub use joint::Joint;

pub mod animated;
pub use animated::{AnimatedEntity, Trajectory, Waypoint};

mod mount;
pub use mount::{Mount, MountFrame, SceneRefs};

pub mod actuators;
pub use actuators::{Actuator, ActuatorKind};

pub mod sensors;
pub use sensors::{Sensor, SensorData, SensorKind, SensorReading};

mod contacts;
pub use contacts::{ContactEvent, ContactMonitor};

mod manager;
pub use manager::{IcReport, Phase, SimState, SimulationManager, TickTelemetry};

pub mod scenario;
