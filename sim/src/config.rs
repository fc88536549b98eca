use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Parser;
use comms::MediumParams;
use hydro::{builtins, Atmosphere, Environment, FlowFieldSpec, MaterialManager, Ocean, Tide, Vec3};
use serde::{Deserialize, Serialize};

use crate::error::{Result, SimError};
use crate::settings::SimSettings;

#[derive(Parser, Debug, Clone)]
#[command(name = "sim")]
#[command(about = "Headless underwater vehicle simulation", long_about = None)]
pub struct Args {
    /// TOML configuration file; built-in defaults when omitted
    #[arg(long)]
    pub config: Option<PathBuf>,
    /// Simulated seconds to run
    #[arg(long, default_value_t = 30.0)]
    pub duration: f64,
    /// Log a status line every N ticks
    #[arg(long, default_value_t = 200)]
    pub log_every: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub steps_per_second: f64,
    pub max_substeps: u32,
    pub fluid_prescaler: u32,
    pub gravity: Vec3,
    pub seed: u64,
    pub sleeping: bool,
    pub initial_conditions: IcConfig,
    pub ocean: OceanConfig,
    pub atmosphere: AtmosphereConfig,
    pub comms: MediumParams,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            steps_per_second: 200.0,
            max_substeps: 5,
            fluid_prescaler: 1,
            gravity: Vec3::new(0.0, 0.0, -9.81),
            seed: 42,
            sleeping: false,
            initial_conditions: IcConfig::default(),
            ocean: OceanConfig::default(),
            atmosphere: AtmosphereConfig::default(),
            comms: MediumParams::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IcConfig {
    pub enabled: bool,
    pub linear_tolerance: f64,
    pub angular_tolerance: f64,
    pub joint_tolerance: f64,
    /// Consecutive at-rest iterations required; one would accept the turning
    /// point of an oscillation.
    pub settle_iterations: u32,
    pub max_iterations: u32,
    /// Wall-clock budget.
    pub max_seconds: f64,
}

impl Default for IcConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            linear_tolerance: 1e-3,
            angular_tolerance: 1e-3,
            joint_tolerance: 1e-3,
            settle_iterations: 20,
            max_iterations: 100_000,
            max_seconds: 30.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OceanConfig {
    pub enabled: bool,
    /// Name of a registered fluid.
    pub fluid: String,
    pub surface_height: f64,
    pub tide: Option<Tide>,
    pub currents: Vec<FlowFieldSpec>,
}

impl Default for OceanConfig {
    fn default() -> Self {
        Self { enabled: true, fluid: "Water".into(), surface_height: 0.0, tide: None, currents: Vec::new() }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AtmosphereConfig {
    pub enabled: bool,
    pub fluid: String,
    pub wind: Vec<FlowFieldSpec>,
}

impl Default for AtmosphereConfig {
    fn default() -> Self {
        Self { enabled: true, fluid: "Air".into(), wind: Vec::new() }
    }
}

impl Config {
    pub fn validate(&self) -> Result<()> {
        if !(self.steps_per_second.is_finite() && self.steps_per_second > 0.0) {
            return Err(SimError::InvalidConfig(format!(
                "steps_per_second must be positive, got {}",
                self.steps_per_second
            )));
        }
        if self.max_substeps == 0 {
            return Err(SimError::InvalidConfig("max_substeps must be at least 1".into()));
        }
        if !self.gravity.is_finite() {
            return Err(SimError::InvalidConfig("gravity must be finite".into()));
        }
        let ic = &self.initial_conditions;
        if ic.enabled && (ic.max_iterations == 0 || !(ic.max_seconds > 0.0)) {
            return Err(SimError::InvalidConfig("initial-condition budget must be positive".into()));
        }
        Ok(())
    }

    pub fn fixed_dt(&self) -> f64 {
        1.0 / self.steps_per_second
    }

    pub fn settings(&self) -> SimSettings {
        SimSettings { fluid_prescaler: self.fluid_prescaler.max(1), ..SimSettings::default() }
    }

    /// Resolve fluid names against the material registry.
    pub fn environment(&self, materials: &MaterialManager) -> Result<Environment> {
        let ocean = if self.ocean.enabled {
            let fluid = materials.fluid(&self.ocean.fluid)?.clone();
            Some(Ocean {
                fluid,
                surface_height: self.ocean.surface_height,
                tide: self.ocean.tide,
                currents: self.ocean.currents.clone(),
            })
        } else {
            None
        };
        let atmosphere = if self.atmosphere.enabled {
            let fluid = materials.fluid(&self.atmosphere.fluid)?.clone();
            Some(Atmosphere { fluid, wind: self.atmosphere.wind.clone() })
        } else {
            None
        };
        Ok(Environment { gravity: self.gravity, ocean, atmosphere })
    }
}

pub fn load_config(path: &Path) -> anyhow::Result<Config> {
    let text = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let cfg: Config = toml::from_str(&text).with_context(|| format!("parsing {}", path.display()))?;
    cfg.validate()?;
    Ok(cfg)
}

/// Registry with the built-in materials and fluids.
pub fn default_materials() -> MaterialManager {
    builtins::standard_materials()
}
