use std::f64::consts::PI;

use super::TriangleMesh;
use crate::flow::Plane;
use crate::math::Vec3;

/// Distances closer to the plane than this are pushed to the dry side so a
/// vertex never sits exactly on the surface.
pub const PLANE_EPSILON: f64 = 1e-9;

/// Part of a body below the fluid plane, in the body frame.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Submersion {
    pub volume: f64,
    pub centroid: Vec3,
}

impl Submersion {
    pub const EMPTY: Self = Self { volume: 0.0, centroid: Vec3::ZERO };
}

/// Spherical cap below the plane. The sphere is centred at the frame origin.
pub fn submerge_sphere(radius: f64, plane: &Plane) -> Submersion {
    let d = plane.offset;
    if d >= radius {
        return Submersion::EMPTY;
    }
    if d <= -radius {
        return Submersion { volume: 4.0 / 3.0 * PI * radius.powi(3), centroid: Vec3::ZERO };
    }
    let h = radius - d;
    let volume = PI * h * h * (3.0 * radius - h) / 3.0;
    let depth = 3.0 * (2.0 * radius - h).powi(2) / (4.0 * (3.0 * radius - h));
    Submersion { volume, centroid: -plane.normal * depth }
}

/// Volume of a closed mesh below the plane.
///
/// Every surface triangle is clipped to the wet side and the remaining
/// polygon is fanned into tetrahedra whose apex lies on the plane. The cut
/// face closing the wet volume lies in that same plane, so its tetrahedra
/// are flat and never need to be built.
///
/// `full` is the whole-body result, returned unchanged when every vertex is
/// wet.
pub fn submerge_mesh(mesh: &TriangleMesh, plane: &Plane, full: Submersion) -> Submersion {
    let distances: Vec<f64> = mesh
        .vertices
        .iter()
        .map(|&v| {
            let d = plane.signed_distance(v);
            if d.abs() < PLANE_EPSILON {
                PLANE_EPSILON
            } else {
                d
            }
        })
        .collect();

    if distances.iter().all(|&d| d > 0.0) {
        return Submersion::EMPTY;
    }
    if distances.iter().all(|&d| d < 0.0) {
        return full;
    }

    let apex = plane.anchor();
    let mut volume = 0.0;
    let mut moment = Vec3::ZERO;
    for face in &mesh.faces {
        let points = mesh.triangle(face);
        let dist = [distances[face[0] as usize], distances[face[1] as usize], distances[face[2] as usize]];
        let (clipped, n) = clip_below(points, dist);
        for i in 1..n.saturating_sub(1) {
            let (a, b, c) = (clipped[0] - apex, clipped[i] - apex, clipped[i + 1] - apex);
            let v = a.dot(b.cross(c)) / 6.0;
            volume += v;
            moment += (apex * 4.0 + a + b + c) * (v / 4.0);
        }
    }

    if volume <= 0.0 {
        return Submersion::EMPTY;
    }
    if volume >= full.volume {
        return full;
    }
    Submersion { volume, centroid: moment / volume }
}

// Sutherland-Hodgman against one plane; a triangle yields at most a quad.
fn clip_below(points: [Vec3; 3], dist: [f64; 3]) -> ([Vec3; 4], usize) {
    let mut out = [Vec3::ZERO; 4];
    let mut n = 0;
    for i in 0..3 {
        let j = (i + 1) % 3;
        let (pi, pj, di, dj) = (points[i], points[j], dist[i], dist[j]);
        if di < 0.0 {
            out[n] = pi;
            n += 1;
        }
        if (di < 0.0) != (dj < 0.0) {
            let t = di / (di - dj);
            out[n] = pi + (pj - pi) * t;
            n += 1;
        }
    }
    (out, n)
}
