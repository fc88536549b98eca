//! Reception gating and optical link quality.

use hydro::{FluidSurface, Vec3};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::device::{CommDevice, CommKind};

/// Line-of-sight test supplied by whoever owns the scene geometry.
pub trait Occluder {
    fn occluded(&self, from: Vec3, to: Vec3) -> bool;
}

/// Open water: nothing blocks.
pub struct NoOcclusion;

impl Occluder for NoOcclusion {
    fn occluded(&self, _from: Vec3, _to: Vec3) -> bool {
        false
    }
}

/// Medium properties the engine needs besides device poses.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MediumParams {
    /// m/s
    pub speed_of_sound: f64,
    /// Unit vector pointing at the sun.
    pub sun_direction: Vec3,
    /// Ambient light strength in [0, 1] at the surface.
    pub sun_intensity: f64,
    /// Extra attenuation factor from suspended particles, ≥ 0.
    pub turbidity: f64,
    /// Clear-water optical attenuation, 1/m.
    pub optical_attenuation: f64,
}

impl Default for MediumParams {
    fn default() -> Self {
        Self {
            speed_of_sound: 1531.0,
            sun_direction: Vec3::Z,
            sun_intensity: 0.0,
            turbidity: 0.0,
            optical_attenuation: 0.05,
        }
    }
}

/// One-way viability of `from` → `to`: same medium, within `from`'s range,
/// inside both cones, optionally unobstructed. Radio additionally needs both
/// ends above the surface.
pub fn reachable(
    from: &CommDevice,
    to: &CommDevice,
    surface: Option<&FluidSurface>,
    occluder: &dyn Occluder,
) -> bool {
    if from.id == to.id || !from.kind.same_medium(&to.kind) {
        return false;
    }
    let link = from.kind.link();
    let (a, b) = (from.position(), to.position());
    if a.distance(b) > link.range {
        return false;
    }
    if let CommKind::Radio { .. } = from.kind {
        return surface.map(|s| !s.is_submerged(a) && !s.is_submerged(b)).unwrap_or(true);
    }
    if !from.sees(b) || !to.sees(a) {
        return false;
    }
    !(link.occlusion_test && occluder.occluded(a, b))
}

pub fn mutually_reachable(
    a: &CommDevice,
    b: &CommDevice,
    surface: Option<&FluidSurface>,
    occluder: &dyn Occluder,
) -> bool {
    reachable(a, b, surface, occluder) && reachable(b, a, surface, occluder)
}

/// Reception quality in [0, 1] at `receiver` for light from `transmitter`.
///
/// Range decay uses the clear-water attenuation scaled by turbidity. Sunlight
/// reaching the receiver's aperture (it faces +Z) raises the noise floor,
/// weakening with depth.
pub fn optical_quality(
    medium: &MediumParams,
    transmitter: &CommDevice,
    receiver: &CommDevice,
    surface: Option<&FluidSurface>,
) -> f64 {
    let c = medium.optical_attenuation.max(0.0) * (1.0 + medium.turbidity.max(0.0));
    let d = transmitter.position().distance(receiver.position());
    let decay = (-c * d).exp();

    let facing = receiver.axis().dot(medium.sun_direction.normalize_or_zero()).max(0.0);
    let depth = surface.map(|s| s.depth(receiver.position())).unwrap_or(0.0);
    let ambient = medium.sun_intensity.clamp(0.0, 1.0) * facing * (-c * depth).exp();

    let q = decay * (1.0 - ambient);
    if q.is_finite() {
        q.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

/// Each byte is hit with probability `1 - quality`; a hit XORs a non-zero
/// mask so the byte always changes. Returns the number of corrupted bytes.
pub fn corrupt_payload(rng: &mut impl Rng, payload: &mut [u8], quality: f64) -> usize {
    let p = if quality.is_nan() { 1.0 } else { (1.0 - quality).clamp(0.0, 1.0) };
    let mut hits = 0;
    for byte in payload.iter_mut() {
        if rng.gen_bool(p) {
            *byte ^= rng.gen_range(1..=u8::MAX);
            hits += 1;
        }
    }
    hits
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::LinkParams;
    use crate::frame::DeviceId;
    use hydro::Pose;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn optical(id: u32, pos: Vec3) -> CommDevice {
        let mut d = CommDevice::new(DeviceId(id), format!("o{id}"), CommKind::Optical { link: LinkParams::omni(50.0) });
        d.pose = Pose::from_translation(pos);
        d
    }

    #[test]
    fn quality_falls_with_range_and_turbidity() {
        let medium = MediumParams::default();
        let tx = optical(1, Vec3::ZERO);
        let near = optical(2, Vec3::new(1.0, 0.0, 0.0));
        let far = optical(3, Vec3::new(30.0, 0.0, 0.0));
        let qn = optical_quality(&medium, &tx, &near, None);
        let qf = optical_quality(&medium, &tx, &far, None);
        assert!(qn > qf && qf > 0.0, "near={qn} far={qf}");

        let murky = MediumParams { turbidity: 4.0, ..medium };
        assert!(optical_quality(&murky, &tx, &far, None) < qf);
    }

    #[test]
    fn sunlight_hurts_shallow_upward_receivers() {
        let medium = MediumParams { sun_intensity: 0.8, ..MediumParams::default() };
        let surface = FluidSurface::horizontal(0.0);
        let tx = optical(1, Vec3::new(0.0, 0.0, -2.0));
        let shallow = optical(2, Vec3::new(5.0, 0.0, -1.0));
        let deep = optical(3, Vec3::new(5.0, 0.0, -40.0));
        let q_shallow = optical_quality(&medium, &tx, &shallow, Some(&surface));
        let q_dark = optical_quality(&MediumParams::default(), &tx, &shallow, Some(&surface));
        assert!(q_shallow < q_dark);
        // At depth the ambient term is nearly gone, only range decay is left.
        let q_deep = optical_quality(&medium, &tx, &deep, Some(&surface));
        let q_deep_dark = optical_quality(&MediumParams::default(), &tx, &deep, Some(&surface));
        assert!((q_deep - q_deep_dark).abs() / q_deep_dark < 0.2);
    }

    #[test]
    fn corruption_follows_quality() {
        let mut rng = StdRng::seed_from_u64(42);
        let original = vec![0x5Au8; 4000];

        let mut clean = original.clone();
        assert_eq!(corrupt_payload(&mut rng, &mut clean, 1.0), 0);
        assert_eq!(clean, original);

        let mut ruined = original.clone();
        assert_eq!(corrupt_payload(&mut rng, &mut ruined, 0.0), original.len());
        assert!(ruined.iter().zip(&original).all(|(a, b)| a != b));

        let mut partial = original.clone();
        let hits = corrupt_payload(&mut rng, &mut partial, 0.75);
        let rate = hits as f64 / original.len() as f64;
        assert!((rate - 0.25).abs() < 0.03, "rate={rate}");
        let differing = partial.iter().zip(&original).filter(|(a, b)| a != b).count();
        assert_eq!(differing, hits);
    }
}
