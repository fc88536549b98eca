//! Acoustic, optical and radio links between mobile devices.
//!
//! Frames are queued by a sender, travel through the medium and land in the
//! receiver's buffer. The engine owns every device; callers refresh device
//! poses each tick and call [`CommPropagationEngine::update`].

mod error;
pub use error::{CommError, Result};

mod frame;
pub use frame::{CommDataFrame, DeviceId, ReceivedFrame, ACK, PING};

mod device;
pub use device::{CommDevice, CommKind, LinkParams, FIX_CAPACITY, RX_CAPACITY};

pub mod link;
pub use link::{MediumParams, NoOcclusion, Occluder};

mod usbl;
pub use usbl::{BeaconFix, UsblParams};

mod engine;
pub use engine::{CommPropagationEngine, EngineStats};
