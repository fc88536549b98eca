//! Closed tessellations of the primitive shapes. Used by the submersion
//! routine for every shape that has no closed-form partial volume.

use std::f64::consts::TAU;

use super::TriangleMesh;
use crate::math::Vec3;

pub const CYLINDER_SEGMENTS: usize = 48;
pub const TORUS_MAJOR_SEGMENTS: usize = 48;
pub const TORUS_MINOR_SEGMENTS: usize = 24;

// Corner i has +x when bit 0 set, +y for bit 1, +z for bit 2.
const BOX_QUADS: [[u32; 4]; 6] = [
    [0, 4, 6, 2], // -x
    [1, 3, 7, 5], // +x
    [0, 1, 5, 4], // -y
    [2, 6, 7, 3], // +y
    [0, 2, 3, 1], // -z
    [4, 5, 7, 6], // +z
];

fn quads_to_faces(quads: &[[u32; 4]]) -> Vec<[u32; 3]> {
    quads.iter().flat_map(|q| [[q[0], q[1], q[2]], [q[0], q[2], q[3]]]).collect()
}

fn corner(i: u32, half: Vec3) -> Vec3 {
    Vec3::new(
        if i & 1 != 0 { half.x } else { -half.x },
        if i & 2 != 0 { half.y } else { -half.y },
        if i & 4 != 0 { half.z } else { -half.z },
    )
}

pub fn box_mesh(half: Vec3) -> TriangleMesh {
    let vertices = (0..8).map(|i| corner(i, half)).collect();
    TriangleMesh::new(vertices, quads_to_faces(&BOX_QUADS))
}

/// Tapered box standing in for a wing: chord along x, span along y (root at
/// -y, tip at +y), thickness along z as a fraction of the local chord.
pub fn wing_mesh(root_chord: f64, tip_chord: f64, span: f64, thickness_ratio: f64) -> TriangleMesh {
    let vertices = (0..8)
        .map(|i| {
            let chord = if i & 2 != 0 { tip_chord } else { root_chord };
            corner(i, Vec3::new(0.5 * chord, 0.5 * span, 0.5 * chord * thickness_ratio))
        })
        .collect();
    TriangleMesh::new(vertices, quads_to_faces(&BOX_QUADS))
}

/// Cylinder along z.
pub fn cylinder_mesh(radius: f64, half_height: f64, segments: usize) -> TriangleMesh {
    let n = segments.max(3);
    let mut vertices = Vec::with_capacity(2 * n + 2);
    for i in 0..n {
        let (s, c) = (TAU * i as f64 / n as f64).sin_cos();
        vertices.push(Vec3::new(radius * c, radius * s, -half_height));
        vertices.push(Vec3::new(radius * c, radius * s, half_height));
    }
    let bottom_centre = vertices.len() as u32;
    vertices.push(Vec3::new(0.0, 0.0, -half_height));
    let top_centre = vertices.len() as u32;
    vertices.push(Vec3::new(0.0, 0.0, half_height));

    let mut faces = Vec::with_capacity(4 * n);
    for i in 0..n as u32 {
        let j = (i + 1) % n as u32;
        let (b0, t0, b1, t1) = (2 * i, 2 * i + 1, 2 * j, 2 * j + 1);
        faces.push([b0, b1, t1]);
        faces.push([b0, t1, t0]);
        faces.push([top_centre, t0, t1]);
        faces.push([bottom_centre, b1, b0]);
    }
    TriangleMesh::new(vertices, faces)
}

/// Torus around z.
pub fn torus_mesh(major_radius: f64, minor_radius: f64, major_segments: usize, minor_segments: usize) -> TriangleMesh {
    let nu = major_segments.max(3);
    let nv = minor_segments.max(3);
    let mut vertices = Vec::with_capacity(nu * nv);
    for i in 0..nu {
        let (su, cu) = (TAU * i as f64 / nu as f64).sin_cos();
        for j in 0..nv {
            let (sv, cv) = (TAU * j as f64 / nv as f64).sin_cos();
            let rho = major_radius + minor_radius * cv;
            vertices.push(Vec3::new(rho * cu, rho * su, minor_radius * sv));
        }
    }
    let idx = |i: usize, j: usize| ((i % nu) * nv + (j % nv)) as u32;
    let mut faces = Vec::with_capacity(2 * nu * nv);
    for i in 0..nu {
        for j in 0..nv {
            let (a, b, c, d) = (idx(i, j), idx(i + 1, j), idx(i + 1, j + 1), idx(i, j + 1));
            faces.push([a, b, c]);
            faces.push([a, c, d]);
        }
    }
    TriangleMesh::new(vertices, faces)
}
