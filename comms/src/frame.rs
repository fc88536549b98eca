use std::fmt;

use hydro::Vec3;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Device address. Zero is the broadcast address and never names a device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceId(pub u32);

impl DeviceId {
    pub const BROADCAST: DeviceId = DeviceId(0);

    pub fn is_broadcast(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

pub const PING: &[u8] = b"PING";
pub const ACK: &[u8] = b"ACK";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommDataFrame {
    /// Simulated time the frame was queued.
    pub timestamp: f64,
    pub seq: u32,
    pub source: DeviceId,
    pub destination: DeviceId,
    pub payload: Vec<u8>,
    /// Sender position when the frame left the tx buffer.
    pub tx_position: Vec3,
    /// Path length covered so far, metres.
    pub travelled: f64,
}

impl CommDataFrame {
    pub fn is_ping(&self) -> bool {
        self.payload == PING
    }

    pub fn is_ack(&self) -> bool {
        self.payload == ACK
    }

    pub fn encode(&self) -> Result<Vec<u8>> {
        Ok(bincode::serialize(self)?)
    }

    pub fn decode(bytes: &[u8]) -> Result<Self> {
        Ok(bincode::deserialize(bytes)?)
    }
}

/// A frame sitting in a receive buffer.
#[derive(Debug, Clone, PartialEq)]
pub struct ReceivedFrame {
    pub frame: CommDataFrame,
    /// Engine time of the delivering update.
    pub received_at: f64,
    /// Link quality the frame arrived with; 1 for acoustic and radio.
    pub quality: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_survives_the_wire() {
        let f = CommDataFrame {
            timestamp: 12.5,
            seq: 7,
            source: DeviceId(3),
            destination: DeviceId::BROADCAST,
            payload: b"hello".to_vec(),
            tx_position: Vec3::new(1.0, -2.0, -30.0),
            travelled: 0.0,
        };
        let back = CommDataFrame::decode(&f.encode().unwrap()).unwrap();
        assert_eq!(back, f);
    }

    #[test]
    fn truncated_bytes_fail_to_decode() {
        let f = CommDataFrame {
            timestamp: 0.0,
            seq: 1,
            source: DeviceId(1),
            destination: DeviceId(2),
            payload: vec![1, 2, 3],
            tx_position: Vec3::ZERO,
            travelled: 0.0,
        };
        let bytes = f.encode().unwrap();
        assert!(CommDataFrame::decode(&bytes[..bytes.len() - 2]).is_err());
    }
}
