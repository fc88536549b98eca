use std::collections::VecDeque;

use hydro::{Pose, Vec3};
use serde::{Deserialize, Serialize};

use crate::frame::{CommDataFrame, DeviceId, ReceivedFrame};
use crate::usbl::{BeaconFix, UsblParams};

/// Frames kept in a receive buffer before the oldest are discarded.
pub const RX_CAPACITY: usize = 256;

/// USBL fixes kept per device; older ones are discarded.
pub const FIX_CAPACITY: usize = 256;

fn full_sphere() -> f64 {
    std::f64::consts::TAU
}

/// Link parameters shared by every device kind.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LinkParams {
    /// Operating range, metres (inclusive).
    pub range: f64,
    /// Full apex angle of the reception cone around the device +Z axis,
    /// radians. 2π accepts every direction.
    #[serde(default = "full_sphere")]
    pub fov: f64,
    #[serde(default)]
    pub occlusion_test: bool,
}

impl LinkParams {
    pub fn omni(range: f64) -> Self {
        Self { range, fov: full_sphere(), occlusion_test: false }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CommKind {
    Acoustic {
        link: LinkParams,
        /// Answer `PING` with `ACK`.
        #[serde(default)]
        auto_ack: bool,
        #[serde(default)]
        usbl: Option<UsblParams>,
    },
    Optical {
        link: LinkParams,
    },
    Radio {
        range: f64,
    },
}

impl CommKind {
    pub fn link(&self) -> LinkParams {
        match self {
            CommKind::Acoustic { link, .. } | CommKind::Optical { link } => *link,
            CommKind::Radio { range } => LinkParams::omni(*range),
        }
    }

    /// Devices only talk to devices of the same medium.
    pub fn same_medium(&self, other: &CommKind) -> bool {
        std::mem::discriminant(self) == std::mem::discriminant(other)
    }

    pub fn is_acoustic(&self) -> bool {
        matches!(self, CommKind::Acoustic { .. })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CommDevice {
    pub id: DeviceId,
    pub name: String,
    pub kind: CommKind,
    /// World pose, refreshed by the owner every tick.
    pub pose: Pose,
    pub(crate) tx: VecDeque<CommDataFrame>,
    pub(crate) rx: VecDeque<ReceivedFrame>,
    pub(crate) next_seq: u32,
    pub(crate) fixes: VecDeque<BeaconFix>,
}

impl CommDevice {
    pub fn new(id: DeviceId, name: impl Into<String>, kind: CommKind) -> Self {
        Self {
            id,
            name: name.into(),
            kind,
            pose: Pose::IDENTITY,
            tx: VecDeque::new(),
            rx: VecDeque::new(),
            next_seq: 0,
            fixes: VecDeque::new(),
        }
    }

    pub fn position(&self) -> Vec3 {
        self.pose.translation
    }

    /// Device +Z in world.
    pub fn axis(&self) -> Vec3 {
        self.pose.transform_vector(Vec3::Z)
    }

    /// Whether `point` lies inside this device's reception cone.
    pub fn sees(&self, point: Vec3) -> bool {
        let fov = self.kind.link().fov;
        if fov >= std::f64::consts::TAU {
            return true;
        }
        let dir = (point - self.position()).normalize_or_zero();
        if dir == Vec3::ZERO {
            return true;
        }
        let angle = self.axis().dot(dir).clamp(-1.0, 1.0).acos();
        angle <= 0.5 * fov
    }

    pub fn pending_tx(&self) -> usize {
        self.tx.len()
    }

    pub fn pending_rx(&self) -> usize {
        self.rx.len()
    }

    /// Oldest first.
    pub fn beacon_fixes(&self) -> impl ExactSizeIterator<Item = &BeaconFix> {
        self.fixes.iter()
    }

    pub fn last_fix(&self) -> Option<&BeaconFix> {
        self.fixes.back()
    }

    pub(crate) fn push_fix(&mut self, fix: BeaconFix) {
        if self.fixes.len() == FIX_CAPACITY {
            self.fixes.pop_front();
        }
        self.fixes.push_back(fix);
    }

    pub(crate) fn next_seq(&mut self) -> u32 {
        self.next_seq = self.next_seq.wrapping_add(1);
        self.next_seq
    }

    /// Push into the receive buffer; returns a discarded frame on overflow.
    pub(crate) fn push_rx(&mut self, frame: ReceivedFrame) -> Option<ReceivedFrame> {
        self.rx.push_back(frame);
        if self.rx.len() > RX_CAPACITY {
            self.rx.pop_front()
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hydro::Quat;

    fn modem(fov: f64) -> CommDevice {
        let link = LinkParams { range: 100.0, fov, occlusion_test: false };
        CommDevice::new(DeviceId(1), "m", CommKind::Acoustic { link, auto_ack: false, usbl: None })
    }

    #[test]
    fn cone_limits_reception() {
        let m = modem(std::f64::consts::FRAC_PI_2);
        // Cone half-angle is 45°
        assert!(m.sees(Vec3::new(1.0, 0.0, 1.01)));
        assert!(!m.sees(Vec3::new(1.0, 0.0, 0.99)));
        assert!(!m.sees(Vec3::new(0.0, 0.0, -1.0)));
    }

    #[test]
    fn cone_follows_rotation() {
        let mut m = modem(0.2);
        m.pose = Pose::new(Vec3::ZERO, Quat::from_rotation_x(std::f64::consts::PI));
        assert!(m.sees(Vec3::new(0.0, 0.0, -10.0)));
        assert!(!m.sees(Vec3::new(0.0, 0.0, 10.0)));
    }

    #[test]
    fn rx_buffer_is_bounded() {
        let mut m = modem(std::f64::consts::TAU);
        let frame = ReceivedFrame {
            frame: CommDataFrame {
                timestamp: 0.0,
                seq: 0,
                source: DeviceId(2),
                destination: DeviceId(1),
                payload: Vec::new(),
                tx_position: Vec3::ZERO,
                travelled: 0.0,
            },
            received_at: 0.0,
            quality: 1.0,
        };
        for _ in 0..RX_CAPACITY {
            assert!(m.push_rx(frame.clone()).is_none());
        }
        assert!(m.push_rx(frame).is_some());
        assert_eq!(m.pending_rx(), RX_CAPACITY);
    }

    #[test]
    fn fix_log_keeps_the_latest() {
        let mut m = modem(std::f64::consts::TAU);
        let total = FIX_CAPACITY + 50;
        for i in 0..total {
            m.push_fix(BeaconFix {
                time: i as f64,
                beacon: DeviceId(2),
                range: 10.0,
                azimuth: 0.0,
                elevation: 0.0,
                estimate: Vec3::new(10.0, 0.0, 0.0),
            });
        }
        assert_eq!(m.beacon_fixes().len(), FIX_CAPACITY);
        assert_eq!(m.beacon_fixes().next().map(|f| f.time), Some(50.0));
        assert_eq!(m.last_fix().map(|f| f.time), Some((total - 1) as f64));
    }
}
