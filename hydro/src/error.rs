use thiserror::Error;

/// Errors raised while building materials, fluids and body geometry.
/// All of these are construction-time failures; nothing in the per-tick force
/// path returns an error.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum HydroError {
    #[error("material '{0}' already exists")]
    DuplicateMaterial(String),

    #[error("unknown material '{0}'")]
    UnknownMaterial(String),

    #[error("fluid '{0}' already exists")]
    DuplicateFluid(String),

    #[error("unknown fluid '{0}'")]
    UnknownFluid(String),

    #[error("'{name}' has invalid density {density} (must be positive and finite)")]
    InvalidDensity { name: String, density: f64 },

    #[error("degenerate mesh: {reason}")]
    DegenerateMesh { reason: String },

    #[error("invalid shape parameter: {reason}")]
    InvalidShape { reason: String },
}

pub type Result<T> = std::result::Result<T, HydroError>;
