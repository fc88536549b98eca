use thiserror::Error;

use crate::manager::SimState;

#[derive(Debug, Error)]
pub enum SimError {
    #[error("name '{0}' is already in use")]
    DuplicateName(String),

    #[error("unknown {kind} '{name}'")]
    UnknownEntity { kind: &'static str, name: String },

    #[error("cannot {op} while {state:?}")]
    InvalidState { op: &'static str, state: SimState },

    #[error("initial conditions not solved after {iterations} iterations ({elapsed:.3} s)")]
    IcNotSolved { iterations: u32, elapsed: f64 },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("'{name}' cannot be mounted there: {reason}")]
    InvalidMount { name: String, reason: &'static str },

    #[error(transparent)]
    Hydro(#[from] hydro::HydroError),

    #[error(transparent)]
    Comm(#[from] comms::CommError),
}

pub type Result<T> = std::result::Result<T, SimError>;
