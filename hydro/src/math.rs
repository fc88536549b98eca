use serde::{Deserialize, Serialize};

// Double precision throughout: the submersion sums and comm travel distances
// accumulate over many terms.
pub use bevy_math::{DMat3 as Mat3, DQuat as Quat, DVec3 as Vec3};

/// Rigid transform (rotation followed by translation), body→world unless noted.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    pub translation: Vec3,
    pub rotation: Quat,
}

impl Default for Pose {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Pose {
    pub const IDENTITY: Self = Self { translation: Vec3::ZERO, rotation: Quat::IDENTITY };

    pub const fn new(translation: Vec3, rotation: Quat) -> Self {
        Self { translation, rotation }
    }

    pub const fn from_translation(translation: Vec3) -> Self {
        Self { translation, rotation: Quat::IDENTITY }
    }

    #[inline]
    pub fn transform_point(&self, p: Vec3) -> Vec3 {
        self.rotation * p + self.translation
    }

    #[inline]
    pub fn transform_vector(&self, v: Vec3) -> Vec3 {
        self.rotation * v
    }

    #[inline]
    pub fn inverse_transform_point(&self, p: Vec3) -> Vec3 {
        self.rotation.inverse() * (p - self.translation)
    }

    #[inline]
    pub fn inverse_transform_vector(&self, v: Vec3) -> Vec3 {
        self.rotation.inverse() * v
    }

    pub fn inverse(&self) -> Self {
        let rot = self.rotation.inverse();
        Self { translation: -(rot * self.translation), rotation: rot }
    }

    /// `self * other`: apply `other` first, then `self`.
    pub fn mul_pose(&self, other: &Pose) -> Self {
        Self {
            translation: self.transform_point(other.translation),
            rotation: (self.rotation * other.rotation).normalize(),
        }
    }
}

/// Outer product `a bᵀ`.
#[inline]
pub fn outer(a: Vec3, b: Vec3) -> Mat3 {
    Mat3::from_cols(a * b.x, a * b.y, a * b.z)
}

/// Component-wise `v * |v|`, the signed square used by quadratic drag.
#[inline]
pub fn signed_square(v: Vec3) -> Vec3 {
    Vec3::new(v.x * v.x.abs(), v.y * v.y.abs(), v.z * v.z.abs())
}

/// Replace NaN/Inf components with zero. Used at the boundary to the solver,
/// which has no NaN recovery.
#[inline]
pub fn finite_or_zero(v: Vec3) -> Vec3 {
    if v.is_finite() {
        v
    } else {
        Vec3::ZERO
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pose_inverse_round_trips_points() {
        let pose = Pose::new(
            Vec3::new(1.0, -2.0, 0.5),
            Quat::from_axis_angle(Vec3::new(0.3, 1.0, -0.2).normalize(), 0.8),
        );
        let p = Vec3::new(0.25, 4.0, -1.5);
        let back = pose.inverse().transform_point(pose.transform_point(p));
        assert!((back - p).length() < 1e-12, "got {back:?}");
        let back2 = pose.inverse_transform_point(pose.transform_point(p));
        assert!((back2 - p).length() < 1e-12);
    }

    #[test]
    fn mul_pose_applies_right_first() {
        let a = Pose::from_translation(Vec3::X);
        let b = Pose::new(Vec3::ZERO, Quat::from_rotation_z(std::f64::consts::FRAC_PI_2));
        let p = a.mul_pose(&b).transform_point(Vec3::X);
        assert!((p - Vec3::new(1.0, 1.0, 0.0)).length() < 1e-12, "got {p:?}");
    }
}
