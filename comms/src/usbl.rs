use hydro::{Pose, Vec3};
use rand::Rng;
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};

use crate::frame::DeviceId;

/// Measurement noise of a USBL head (1σ).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UsblParams {
    #[serde(default)]
    pub range_std: f64,
    /// Radians.
    #[serde(default)]
    pub angle_std: f64,
}

/// Position fix of a responding beacon, taken when its ACK arrives.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BeaconFix {
    pub time: f64,
    pub beacon: DeviceId,
    pub range: f64,
    /// Device frame, radians from +X towards +Y.
    pub azimuth: f64,
    /// Device frame, radians above the XY plane.
    pub elevation: f64,
    /// World position implied by the noisy measurement.
    pub estimate: Vec3,
}

pub(crate) fn gaussian(rng: &mut impl Rng, std: f64) -> f64 {
    if std <= 0.0 || !std.is_finite() {
        return 0.0;
    }
    Normal::new(0.0, std).map(|n| n.sample(rng)).unwrap_or(0.0)
}

/// Range from the round-trip path length; bearing from the beacon's current
/// position seen from the head.
pub(crate) fn compute_fix(
    rng: &mut impl Rng,
    params: &UsblParams,
    head: &Pose,
    beacon: DeviceId,
    beacon_position: Vec3,
    round_trip: f64,
    time: f64,
) -> BeaconFix {
    let local = head.inverse_transform_point(beacon_position);
    let range = (0.5 * round_trip + gaussian(rng, params.range_std)).max(0.0);
    let azimuth = local.y.atan2(local.x) + gaussian(rng, params.angle_std);
    let elevation = local.z.atan2(local.x.hypot(local.y)) + gaussian(rng, params.angle_std);
    let dir = Vec3::new(elevation.cos() * azimuth.cos(), elevation.cos() * azimuth.sin(), elevation.sin());
    BeaconFix { time, beacon, range, azimuth, elevation, estimate: head.transform_point(dir * range) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hydro::Quat;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn noiseless_fix_recovers_beacon() {
        let mut rng = StdRng::seed_from_u64(1);
        let head = Pose::new(Vec3::new(5.0, 0.0, -10.0), Quat::from_rotation_z(0.5));
        let beacon = Vec3::new(40.0, 25.0, -60.0);
        let d = (beacon - head.translation).length();
        let exact = UsblParams { range_std: 0.0, angle_std: 0.0 };
        let fix = compute_fix(&mut rng, &exact, &head, DeviceId(9), beacon, 2.0 * d, 3.0);
        assert!((fix.range - d).abs() < 1e-9);
        assert!((fix.estimate - beacon).length() < 1e-9, "estimate {:?}", fix.estimate);
        assert!(fix.elevation < 0.0);
    }
}
