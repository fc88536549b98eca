//! Shape volumes, mass properties and the submerged part of a body.

mod mesh;
pub mod primitives;
mod submersion;

use std::f64::consts::PI;

use serde::{Deserialize, Serialize};
use tracing::debug;

pub use mesh::{MeshMass, TriangleMesh};
pub use submersion::{submerge_mesh, submerge_sphere, Submersion, PLANE_EPSILON};

use crate::error::{HydroError, Result};
use crate::flow::Plane;
use crate::math::{Mat3, Vec3};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Shape {
    Sphere { radius: f64 },
    Box { half_extents: Vec3 },
    /// Axis along z.
    Cylinder { radius: f64, height: f64 },
    /// Ring around z.
    Torus { major_radius: f64, minor_radius: f64 },
    Wing { root_chord: f64, tip_chord: f64, span: f64, thickness_ratio: f64 },
    Mesh(TriangleMesh),
}

/// Unit-density properties of a shape. Multiply volume and inertia by the
/// material density for the physical values.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeometryProperties {
    pub volume: f64,
    /// In the shape's own frame.
    pub center_of_mass: Vec3,
    /// About the centre of mass, axes of the shape frame.
    pub inertia: Mat3,
    /// About the centre of mass.
    pub bounding_radius: f64,
}

impl GeometryProperties {
    pub fn mass(&self, density: f64) -> f64 {
        self.volume * density
    }

    pub fn inertia_for(&self, density: f64) -> Mat3 {
        self.inertia * density
    }

    pub fn principal_moments(&self) -> Vec3 {
        Vec3::new(self.inertia.x_axis.x, self.inertia.y_axis.y, self.inertia.z_axis.z)
    }
}

impl Shape {
    pub fn validate(&self) -> Result<()> {
        let positive = |name: &str, v: f64| {
            if v > 0.0 && v.is_finite() {
                Ok(())
            } else {
                Err(HydroError::InvalidShape { reason: format!("{name} must be positive, got {v}") })
            }
        };
        match self {
            Shape::Sphere { radius } => positive("radius", *radius),
            Shape::Box { half_extents } => {
                positive("half_extents.x", half_extents.x)?;
                positive("half_extents.y", half_extents.y)?;
                positive("half_extents.z", half_extents.z)
            }
            Shape::Cylinder { radius, height } => {
                positive("radius", *radius)?;
                positive("height", *height)
            }
            Shape::Torus { major_radius, minor_radius } => {
                positive("minor_radius", *minor_radius)?;
                if major_radius <= minor_radius {
                    return Err(HydroError::InvalidShape {
                        reason: format!("major radius {major_radius} must exceed minor radius {minor_radius}"),
                    });
                }
                Ok(())
            }
            Shape::Wing { root_chord, tip_chord, span, thickness_ratio } => {
                positive("root_chord", *root_chord)?;
                positive("tip_chord", *tip_chord)?;
                positive("span", *span)?;
                positive("thickness_ratio", *thickness_ratio)
            }
            Shape::Mesh(m) => m.validate(),
        }
    }

    /// Closed surface used for partial submersion. `None` for the sphere,
    /// which has a closed form.
    pub fn tessellate(&self) -> Option<TriangleMesh> {
        match self {
            Shape::Sphere { .. } => None,
            Shape::Box { half_extents } => Some(primitives::box_mesh(*half_extents)),
            Shape::Cylinder { radius, height } => {
                Some(primitives::cylinder_mesh(*radius, 0.5 * height, primitives::CYLINDER_SEGMENTS))
            }
            Shape::Torus { major_radius, minor_radius } => Some(primitives::torus_mesh(
                *major_radius,
                *minor_radius,
                primitives::TORUS_MAJOR_SEGMENTS,
                primitives::TORUS_MINOR_SEGMENTS,
            )),
            Shape::Wing { root_chord, tip_chord, span, thickness_ratio } => {
                Some(primitives::wing_mesh(*root_chord, *tip_chord, *span, *thickness_ratio))
            }
            Shape::Mesh(m) => Some(m.clone()),
        }
    }

    pub fn properties(&self) -> Result<GeometryProperties> {
        self.validate()?;
        let diag = |v: f64, x: f64, y: f64, z: f64| Mat3::from_diagonal(Vec3::new(x, y, z) * v);
        let props = match self {
            Shape::Sphere { radius: r } => {
                let v = 4.0 / 3.0 * PI * r.powi(3);
                let i = 0.4 * r * r;
                GeometryProperties {
                    volume: v,
                    center_of_mass: Vec3::ZERO,
                    inertia: diag(v, i, i, i),
                    bounding_radius: *r,
                }
            }
            Shape::Box { half_extents: h } => {
                let v = 8.0 * h.x * h.y * h.z;
                let (x2, y2, z2) = (h.x * h.x, h.y * h.y, h.z * h.z);
                GeometryProperties {
                    volume: v,
                    center_of_mass: Vec3::ZERO,
                    inertia: diag(v / 3.0, y2 + z2, x2 + z2, x2 + y2),
                    bounding_radius: h.length(),
                }
            }
            Shape::Cylinder { radius: r, height: l } => {
                let v = PI * r * r * l;
                let t = (3.0 * r * r + l * l) / 12.0;
                GeometryProperties {
                    volume: v,
                    center_of_mass: Vec3::ZERO,
                    inertia: diag(v, t, t, 0.5 * r * r),
                    bounding_radius: (r * r + 0.25 * l * l).sqrt(),
                }
            }
            Shape::Torus { major_radius: big, minor_radius: small } => {
                let v = 2.0 * PI * PI * big * small * small;
                let (b2, s2) = (big * big, small * small);
                let t = 0.5 * b2 + 0.625 * s2;
                GeometryProperties {
                    volume: v,
                    center_of_mass: Vec3::ZERO,
                    inertia: diag(v, t, t, b2 + 0.75 * s2),
                    bounding_radius: big + small,
                }
            }
            Shape::Wing { .. } | Shape::Mesh(_) => {
                let mesh = self.tessellate().ok_or_else(|| HydroError::InvalidShape { reason: "no surface".into() })?;
                let mp = mesh.mass_properties()?;
                GeometryProperties {
                    volume: mp.volume,
                    center_of_mass: mp.centroid,
                    inertia: mp.inertia,
                    bounding_radius: mesh.bounding_radius(mp.centroid),
                }
            }
        };
        Ok(props)
    }
}

/// Per-body geometry prepared once at construction. The body frame is the
/// centre-of-mass frame, so the hull is stored recentred.
#[derive(Debug, Clone, PartialEq)]
pub struct BodyGeometry {
    pub shape: Shape,
    pub props: GeometryProperties,
    hull: Option<TriangleMesh>,
    hull_volume: f64,
}

impl BodyGeometry {
    pub fn new(shape: Shape) -> Result<Self> {
        let props = shape.properties()?;
        // Clipping sums signed tetrahedra, so the hull must wind outwards.
        let hull = shape.tessellate().map(|m| {
            let m = m.translated(-props.center_of_mass);
            if m.signed_volume() < 0.0 {
                m.flipped()
            } else {
                m
            }
        });
        let hull_volume = match (&shape, &hull) {
            (Shape::Cylinder { .. } | Shape::Torus { .. }, Some(h)) => h.mass_properties()?.volume,
            _ => props.volume,
        };
        debug!(
            volume = props.volume,
            hull_volume,
            faces = hull.as_ref().map(|h| h.faces.len()).unwrap_or(0),
            "body geometry prepared"
        );
        Ok(Self { shape, props, hull, hull_volume })
    }

    pub fn volume(&self) -> f64 {
        self.props.volume
    }

    pub fn hull(&self) -> Option<&TriangleMesh> {
        self.hull.as_ref()
    }

    /// Submerged part for a plane in the centre-of-mass frame.
    ///
    /// Tessellated curved shapes enclose slightly less than the true
    /// volume, so partial results are rescaled; a fully wet body always
    /// reports exactly its volume.
    pub fn submersion(&self, plane: &Plane) -> Submersion {
        if plane.offset >= self.props.bounding_radius {
            return Submersion::EMPTY;
        }
        let full = Submersion { volume: self.props.volume, centroid: Vec3::ZERO };
        if plane.offset <= -self.props.bounding_radius {
            return full;
        }
        match (&self.shape, &self.hull) {
            (Shape::Sphere { radius }, _) => submerge_sphere(*radius, plane),
            (_, Some(hull)) => {
                let hull_volume = self.hull_volume;
                let scale = if hull_volume > 0.0 { self.props.volume / hull_volume } else { 1.0 };
                let s = submerge_mesh(hull, plane, Submersion { volume: hull_volume, centroid: Vec3::ZERO });
                if s.volume >= hull_volume {
                    full
                } else {
                    Submersion { volume: (s.volume * scale).min(self.props.volume), centroid: s.centroid }
                }
            }
            (_, None) => Submersion::EMPTY,
        }
    }
}
