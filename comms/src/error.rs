use thiserror::Error;

use crate::DeviceId;

#[derive(Debug, Error)]
pub enum CommError {
    #[error("device id 0 is reserved for broadcast")]
    ReservedId,

    #[error("device {0} is already registered")]
    DuplicateId(DeviceId),

    #[error("unknown device {0}")]
    UnknownDevice(DeviceId),

    #[error("frame codec: {0}")]
    Codec(#[from] bincode::Error),
}

pub type Result<T> = std::result::Result<T, CommError>;
