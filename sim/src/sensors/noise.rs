use hydro::{Quat, Vec3};
use rand::Rng;
use rand_distr::{Distribution, Normal};

/// Zero-mean Gaussian sample; zero for non-positive or non-finite `std`.
pub fn gaussian(rng: &mut impl Rng, std: f64) -> f64 {
    if !(std > 0.0 && std.is_finite()) {
        return 0.0;
    }
    Normal::new(0.0, std).map(|n| n.sample(rng)).unwrap_or(0.0)
}

pub fn gaussian_vec(rng: &mut impl Rng, std: f64) -> Vec3 {
    Vec3::new(gaussian(rng, std), gaussian(rng, std), gaussian(rng, std))
}

/// Small random rotation applied on top of `q`.
pub fn perturb_rotation(rng: &mut impl Rng, q: Quat, std: f64) -> Quat {
    let tilt = gaussian_vec(rng, std);
    if tilt == Vec3::ZERO {
        return q;
    }
    (Quat::from_scaled_axis(tilt) * q).normalize()
}

/// Clip each component to `±range`; non-positive range disables clipping.
pub fn saturate(v: Vec3, range: f64) -> Vec3 {
    if range > 0.0 {
        v.clamp(Vec3::splat(-range), Vec3::splat(range))
    } else {
        v
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn zero_std_is_exact() {
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(gaussian(&mut rng, 0.0), 0.0);
        assert_eq!(gaussian(&mut rng, f64::NAN), 0.0);
        assert_eq!(perturb_rotation(&mut rng, Quat::IDENTITY, 0.0), Quat::IDENTITY);
    }

    #[test]
    fn sample_spread_matches_std() {
        let mut rng = StdRng::seed_from_u64(7);
        let n = 20_000;
        let samples: Vec<f64> = (0..n).map(|_| gaussian(&mut rng, 2.0)).collect();
        let mean = samples.iter().sum::<f64>() / n as f64;
        let var = samples.iter().map(|s| (s - mean).powi(2)).sum::<f64>() / n as f64;
        assert!(mean.abs() < 0.1, "mean={mean}");
        assert!((var.sqrt() - 2.0).abs() < 0.1, "std={}", var.sqrt());
    }

    #[test]
    fn saturation_clips_components() {
        let v = saturate(Vec3::new(30.0, -30.0, 1.0), 16.0);
        assert_eq!(v, Vec3::new(16.0, -16.0, 1.0));
        assert_eq!(saturate(Vec3::splat(99.0), 0.0), Vec3::splat(99.0));
    }
}
