use std::f64::consts::PI;

use serde::{Deserialize, Serialize};

use crate::geometry::{BodyGeometry, Shape};
use crate::math::Vec3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    fn index(self) -> usize {
        match self {
            Axis::X => 0,
            Axis::Y => 1,
            Axis::Z => 2,
        }
    }

    fn largest(v: Vec3) -> Self {
        if v.x >= v.y && v.x >= v.z {
            Axis::X
        } else if v.y >= v.z {
            Axis::Y
        } else {
            Axis::Z
        }
    }
}

/// Simplified shape for drag and added mass, fitted once per body in its
/// centre-of-mass frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum HydrodynamicProxy {
    Ellipsoid { radii: Vec3 },
    Cylinder { radius: f64, half_length: f64, axis: Axis },
}

impl HydrodynamicProxy {
    pub fn fit(geometry: &BodyGeometry) -> Self {
        match geometry.shape {
            Shape::Sphere { radius } => HydrodynamicProxy::Ellipsoid { radii: Vec3::splat(radius) },
            Shape::Cylinder { radius, height } => {
                HydrodynamicProxy::Cylinder { radius, half_length: 0.5 * height, axis: Axis::Z }
            }
            _ => {
                let volume = geometry.volume();
                let ellipsoid = Self::inertia_ellipsoid(geometry);
                let Some(hull) = geometry.hull() else {
                    return ellipsoid;
                };
                let extents = hull.half_extents();
                let axis = Axis::largest(extents);
                let k = axis.index();
                let radius = hull
                    .vertices
                    .iter()
                    .map(|v| {
                        let mut radial = *v;
                        radial[k] = 0.0;
                        radial.length()
                    })
                    .fold(0.0, f64::max);
                let cylinder = HydrodynamicProxy::Cylinder { radius, half_length: extents[k], axis };
                if (cylinder.volume() - volume).abs() < (ellipsoid.volume() - volume).abs() {
                    cylinder
                } else {
                    ellipsoid
                }
            }
        }
    }

    /// Ellipsoid with the body's principal moments at the body's volume
    /// (unit density, so mass equals volume).
    fn inertia_ellipsoid(geometry: &BodyGeometry) -> Self {
        let m = geometry.volume().max(f64::MIN_POSITIVE);
        let i = geometry.props.principal_moments();
        let r2 = |a: f64, b: f64, c: f64| (2.5 / m * (b + c - a)).max(1e-12);
        let radii = Vec3::new(r2(i.x, i.y, i.z).sqrt(), r2(i.y, i.z, i.x).sqrt(), r2(i.z, i.x, i.y).sqrt());
        HydrodynamicProxy::Ellipsoid { radii }
    }

    pub fn volume(&self) -> f64 {
        match *self {
            HydrodynamicProxy::Ellipsoid { radii } => 4.0 / 3.0 * PI * radii.x * radii.y * radii.z,
            HydrodynamicProxy::Cylinder { radius, half_length, .. } => 2.0 * PI * radius * radius * half_length,
        }
    }

    /// Frontal area seen by flow along each body axis.
    pub fn cross_sections(&self) -> Vec3 {
        match *self {
            HydrodynamicProxy::Ellipsoid { radii: r } => Vec3::new(PI * r.y * r.z, PI * r.x * r.z, PI * r.x * r.y),
            HydrodynamicProxy::Cylinder { radius, half_length, axis } => {
                let mut a = Vec3::splat(4.0 * radius * half_length);
                a[axis.index()] = PI * radius * radius;
                a
            }
        }
    }

    /// Lever arm of the rotational drag about each body axis.
    pub fn lever_arms(&self) -> Vec3 {
        match *self {
            HydrodynamicProxy::Ellipsoid { radii: r } => Vec3::new(r.y.max(r.z), r.x.max(r.z), r.x.max(r.y)),
            HydrodynamicProxy::Cylinder { radius, half_length, axis } => {
                let mut l = Vec3::splat(half_length.max(radius));
                l[axis.index()] = radius;
                l
            }
        }
    }

    /// Dimensionless added-mass coefficients per body axis, as a fraction of
    /// the displaced fluid mass.
    pub fn added_mass_coefficients(&self) -> Vec3 {
        match *self {
            HydrodynamicProxy::Ellipsoid { radii } => ellipsoid_added_mass(radii),
            HydrodynamicProxy::Cylinder { radius, half_length, axis } => {
                // Strip theory: each cross-flow section carries its own displaced mass.
                // Along the axis only the end caps push fluid; take the prolate value.
                let mut radii = Vec3::splat(radius);
                radii[axis.index()] = half_length;
                let k_axial = ellipsoid_added_mass(radii)[axis.index()];
                let mut k = Vec3::ONE;
                k[axis.index()] = k_axial;
                k
            }
        }
    }
}

const LAMB_STEPS: usize = 400;

/// Lamb's coefficients `k_i = α_i / (2 − α_i)` with
/// `α_i = abc ∫₀^∞ dλ / ((r_i² + λ) Δ(λ))`, integrated by Simpson's rule
/// after mapping λ ∈ [0, ∞) onto t ∈ [0, 1).
pub fn ellipsoid_added_mass(radii: Vec3) -> Vec3 {
    let sq = radii * radii;
    let abc = radii.x * radii.y * radii.z;
    let scale = (sq.x + sq.y + sq.z) / 3.0;
    let integrand = |t: f64, r2: f64| -> f64 {
        if t >= 1.0 {
            return 0.0;
        }
        let u = t / (1.0 - t);
        let lambda = scale * u * u;
        let dlambda = 2.0 * scale * t / (1.0 - t).powi(3);
        let delta = ((sq.x + lambda) * (sq.y + lambda) * (sq.z + lambda)).sqrt();
        dlambda / ((r2 + lambda) * delta)
    };
    let alpha = |r2: f64| -> f64 {
        let h = 1.0 / LAMB_STEPS as f64;
        let mut sum = integrand(0.0, r2) + integrand(1.0, r2);
        for i in 1..LAMB_STEPS {
            let w = if i % 2 == 1 { 4.0 } else { 2.0 };
            sum += w * integrand(i as f64 * h, r2);
        }
        abc * sum * h / 3.0
    };
    let k = |a: f64| a / (2.0 - a);
    Vec3::new(k(alpha(sq.x)), k(alpha(sq.y)), k(alpha(sq.z)))
}
