use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{HydroError, Result};
use crate::math::{outer, Mat3, Vec3};

/// Read-only triangle mesh handed over by the mesh loader.
/// Faces are counter-clockwise when seen from outside.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TriangleMesh {
    pub vertices: Vec<Vec3>,
    pub faces: Vec<[u32; 3]>,
    #[serde(default)]
    pub normals: Option<Vec<Vec3>>,
    #[serde(default)]
    pub uvs: Option<Vec<[f32; 2]>>,
}

/// Unit-density mass properties of a closed mesh.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeshMass {
    pub volume: f64,
    pub centroid: Vec3,
    /// Inertia tensor about the centroid for density 1.
    pub inertia: Mat3,
}

impl TriangleMesh {
    pub fn new(vertices: Vec<Vec3>, faces: Vec<[u32; 3]>) -> Self {
        Self { vertices, faces, normals: None, uvs: None }
    }

    #[inline]
    pub fn triangle(&self, face: &[u32; 3]) -> [Vec3; 3] {
        [
            self.vertices[face[0] as usize],
            self.vertices[face[1] as usize],
            self.vertices[face[2] as usize],
        ]
    }

    pub fn validate(&self) -> Result<()> {
        if self.faces.len() < 4 {
            let reason = format!("{} faces cannot close a volume", self.faces.len());
            return Err(HydroError::DegenerateMesh { reason });
        }
        let n = self.vertices.len() as u32;
        if let Some(f) = self.faces.iter().find(|f| f.iter().any(|&i| i >= n)) {
            return Err(HydroError::DegenerateMesh { reason: format!("face {f:?} indexes past {n} vertices") });
        }
        if self.vertices.iter().any(|v| !v.is_finite()) {
            return Err(HydroError::DegenerateMesh { reason: "non-finite vertex".into() });
        }
        Ok(())
    }

    /// Volume, centroid and inertia by summing signed tetrahedra against the
    /// origin. Each tetrahedron's second moment is the canonical one mapped
    /// through the matrix of its three edge vectors.
    pub fn mass_properties(&self) -> Result<MeshMass> {
        self.validate()?;
        let canonical = Mat3::from_cols(
            Vec3::new(2.0, 1.0, 1.0),
            Vec3::new(1.0, 2.0, 1.0),
            Vec3::new(1.0, 1.0, 2.0),
        ) * (1.0 / 120.0);

        let mut volume = 0.0;
        let mut first_moment = Vec3::ZERO;
        let mut covariance = Mat3::ZERO;
        for face in &self.faces {
            let [a, b, c] = self.triangle(face);
            let m = Mat3::from_cols(a, b, c);
            let det = m.determinant();
            let v = det / 6.0;
            volume += v;
            first_moment += (a + b + c) * (v / 4.0);
            covariance += m * canonical * m.transpose() * det;
        }

        if volume.abs() < 1e-12 {
            return Err(HydroError::DegenerateMesh { reason: format!("enclosed volume {volume:e}") });
        }
        if volume < 0.0 {
            warn!(volume, "mesh winding is inverted; flipping");
            volume = -volume;
            first_moment = -first_moment;
            covariance = covariance * -1.0;
        }

        let centroid = first_moment / volume;
        let c = covariance - outer(centroid, centroid) * volume;
        let trace = c.x_axis.x + c.y_axis.y + c.z_axis.z;
        let inertia = Mat3::from_diagonal(Vec3::splat(trace)) - c;
        Ok(MeshMass { volume, centroid, inertia })
    }

    /// Sum of signed tetrahedra against the origin. Negative when the
    /// faces wind clockwise seen from outside.
    pub fn signed_volume(&self) -> f64 {
        self.faces
            .iter()
            .map(|f| {
                let [a, b, c] = self.triangle(f);
                a.dot(b.cross(c)) / 6.0
            })
            .sum()
    }

    /// Same surface with every face wound the other way.
    pub fn flipped(&self) -> Self {
        let mut out = self.clone();
        for f in &mut out.faces {
            f.swap(1, 2);
        }
        if let Some(normals) = out.normals.as_mut() {
            for n in normals {
                *n = -*n;
            }
        }
        out
    }

    pub fn translated(&self, offset: Vec3) -> Self {
        let mut out = self.clone();
        for v in &mut out.vertices {
            *v += offset;
        }
        out
    }

    /// Largest distance of any vertex from `about`.
    pub fn bounding_radius(&self, about: Vec3) -> f64 {
        self.vertices.iter().map(|v| (*v - about).length()).fold(0.0, f64::max)
    }

    /// Axis-aligned half extents about the origin.
    pub fn half_extents(&self) -> Vec3 {
        self.vertices.iter().fold(Vec3::ZERO, |acc, v| acc.max(v.abs()))
    }
}
