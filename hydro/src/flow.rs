use serde::{Deserialize, Serialize};

use crate::math::{Pose, Vec3};
use crate::Fluid;

/// A velocity field contributing to the ambient flow (water current or wind).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FlowFieldSpec {
    /// Same velocity everywhere.
    Uniform { flow: Vec3 },
    /// Free jet leaving `origin` along `direction`. The core widens linearly
    /// downstream and its centreline speed drops so momentum flux is kept.
    Jet { origin: Vec3, direction: Vec3, radius: f64, velocity: f64 },
    /// Laminar (parabolic) flow inside the pipe segment `start`→`end`.
    Pipe { start: Vec3, end: Vec3, radius: f64, velocity: f64 },
}

const JET_SPREAD: f64 = 0.1;
const JET_CUTOFF: f64 = 3.0;

impl FlowFieldSpec {
    /// Velocity contributed at `pos`, or `None` outside the field's extent.
    pub fn sample(&self, pos: Vec3) -> Option<Vec3> {
        match *self {
            FlowFieldSpec::Uniform { flow } => Some(flow),
            FlowFieldSpec::Jet { origin, direction, radius, velocity } => {
                let dir = direction.normalize_or_zero();
                if dir == Vec3::ZERO || radius <= 0.0 {
                    return None;
                }
                let d = pos - origin;
                let t = d.dot(dir);
                if t < 0.0 {
                    return None;
                }
                let r = (d - dir * t).length();
                let width = radius + JET_SPREAD * t;
                if r > JET_CUTOFF * width {
                    return None;
                }
                let centreline = velocity * radius / width;
                Some(dir * centreline * (-(r / width).powi(2)).exp())
            }
            FlowFieldSpec::Pipe { start, end, radius, velocity } => {
                let axis = end - start;
                let len = axis.length();
                if len < 1e-9 || radius <= 0.0 {
                    return None;
                }
                let dir = axis / len;
                let d = pos - start;
                let t = d.dot(dir);
                if !(0.0..=len).contains(&t) {
                    return None;
                }
                let r = (d - dir * t).length();
                if r > radius {
                    return None;
                }
                Some(dir * velocity * (1.0 - (r / radius).powi(2)))
            }
        }
    }
}

/// Sum of every field covering `pos`.
pub fn sample_flow_at(fields: &[FlowFieldSpec], pos: Vec3) -> Vec3 {
    fields.iter().filter_map(|f| f.sample(pos)).fold(Vec3::ZERO, |acc, v| acc + v)
}

/// Plane expressed in some local frame: `normal · y + offset` is the signed
/// distance of local point `y` (positive on the dry side).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Plane {
    pub normal: Vec3,
    pub offset: f64,
}

impl Plane {
    #[inline]
    pub fn signed_distance(&self, p: Vec3) -> f64 {
        self.normal.dot(p) + self.offset
    }

    /// Closest point of the plane to the frame origin.
    #[inline]
    pub fn anchor(&self) -> Vec3 {
        -self.normal * self.offset
    }
}

/// Fluid surface half-space. `normal` points out of the fluid.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FluidSurface {
    pub normal: Vec3,
    pub point: Vec3,
}

impl FluidSurface {
    pub fn horizontal(height: f64) -> Self {
        Self { normal: Vec3::Z, point: Vec3::new(0.0, 0.0, height) }
    }

    /// Positive above the surface, negative below.
    #[inline]
    pub fn signed_distance(&self, p: Vec3) -> f64 {
        self.normal.dot(p - self.point)
    }

    /// Depth below the surface (zero when above).
    #[inline]
    pub fn depth(&self, p: Vec3) -> f64 {
        (-self.signed_distance(p)).max(0.0)
    }

    #[inline]
    pub fn is_submerged(&self, p: Vec3) -> bool {
        self.signed_distance(p) < 0.0
    }

    /// The surface seen from a body frame.
    pub fn to_local(&self, pose: &Pose) -> Plane {
        Plane {
            normal: pose.inverse_transform_vector(self.normal),
            offset: self.signed_distance(pose.translation),
        }
    }
}

/// Sinusoidal surface height oscillation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Tide {
    pub amplitude: f64,
    pub period: f64,
}

impl Tide {
    pub fn offset(&self, time: f64) -> f64 {
        if self.period <= 0.0 {
            return 0.0;
        }
        self.amplitude * (std::f64::consts::TAU * time / self.period).sin()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ocean {
    pub fluid: Fluid,
    pub surface_height: f64,
    pub tide: Option<Tide>,
    pub currents: Vec<FlowFieldSpec>,
}

impl Ocean {
    pub fn new(fluid: Fluid, surface_height: f64) -> Self {
        Self { fluid, surface_height, tide: None, currents: Vec::new() }
    }

    pub fn surface(&self, time: f64) -> FluidSurface {
        let tide = self.tide.map(|t| t.offset(time)).unwrap_or(0.0);
        FluidSurface::horizontal(self.surface_height + tide)
    }

    pub fn current_at(&self, pos: Vec3) -> Vec3 {
        sample_flow_at(&self.currents, pos)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Atmosphere {
    pub fluid: Fluid,
    pub wind: Vec<FlowFieldSpec>,
}

impl Atmosphere {
    pub fn wind_at(&self, pos: Vec3) -> Vec3 {
        sample_flow_at(&self.wind, pos)
    }
}

/// Everything the force models need to know about the surroundings.
#[derive(Debug, Clone, PartialEq)]
pub struct Environment {
    pub gravity: Vec3,
    pub ocean: Option<Ocean>,
    pub atmosphere: Option<Atmosphere>,
}

impl Default for Environment {
    fn default() -> Self {
        Self { gravity: Vec3::new(0.0, 0.0, -9.81), ocean: None, atmosphere: None }
    }
}

impl Environment {
    /// Whether `p` lies in the ocean at `time`.
    pub fn in_water(&self, p: Vec3, time: f64) -> bool {
        self.ocean.as_ref().map(|o| o.surface(time).is_submerged(p)).unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builtins;
    use crate::math::Quat;

    #[test]
    fn currents_superpose() {
        let fields = vec![
            FlowFieldSpec::Uniform { flow: Vec3::new(1.0, 0.0, 0.0) },
            FlowFieldSpec::Uniform { flow: Vec3::new(0.0, 0.5, 0.0) },
        ];
        let v = sample_flow_at(&fields, Vec3::new(10.0, -3.0, 2.0));
        assert!((v - Vec3::new(1.0, 0.5, 0.0)).length() < 1e-12);
    }

    #[test]
    fn pipe_profile_is_parabolic_and_bounded() {
        let pipe = FlowFieldSpec::Pipe {
            start: Vec3::ZERO,
            end: Vec3::new(10.0, 0.0, 0.0),
            radius: 1.0,
            velocity: 2.0,
        };
        let centre = pipe.sample(Vec3::new(5.0, 0.0, 0.0)).unwrap();
        assert!((centre.x - 2.0).abs() < 1e-12);
        let half = pipe.sample(Vec3::new(5.0, 0.5, 0.0)).unwrap();
        assert!((half.x - 1.5).abs() < 1e-12);
        assert!(pipe.sample(Vec3::new(5.0, 1.5, 0.0)).is_none());
        assert!(pipe.sample(Vec3::new(-0.1, 0.0, 0.0)).is_none());
    }

    #[test]
    fn jet_decays_downstream() {
        let jet = FlowFieldSpec::Jet { origin: Vec3::ZERO, direction: Vec3::X, radius: 0.5, velocity: 3.0 };
        let near = jet.sample(Vec3::new(0.1, 0.0, 0.0)).unwrap().length();
        let far = jet.sample(Vec3::new(20.0, 0.0, 0.0)).unwrap().length();
        assert!(near > far && far > 0.0, "near={near}, far={far}");
        assert!(jet.sample(Vec3::new(-1.0, 0.0, 0.0)).is_none());
    }

    #[test]
    fn local_plane_matches_world_distance() {
        let surface = FluidSurface::horizontal(1.0);
        let pose = Pose::new(Vec3::new(0.3, -0.2, 0.4), Quat::from_rotation_x(0.7));
        let plane = surface.to_local(&pose);
        let local = Vec3::new(0.1, 0.5, -0.3);
        let world = pose.transform_point(local);
        assert!((plane.signed_distance(local) - surface.signed_distance(world)).abs() < 1e-12);
        assert!(plane.signed_distance(plane.anchor()).abs() < 1e-12);
    }

    #[test]
    fn tide_moves_surface() {
        let mut ocean = Ocean::new(builtins::water(), 0.0);
        ocean.tide = Some(Tide { amplitude: 0.5, period: 4.0 });
        let s = ocean.surface(1.0);
        assert!((s.point.z - 0.5).abs() < 1e-12);
    }
}
