use crate::math::{signed_square, Vec3};

// ----- Hydrostatics -----

/// Archimedes: opposite to gravity, magnitude of the displaced fluid weight.
pub(super) fn buoyancy_force(gravity: Vec3, submerged_volume: f64, density: f64) -> Vec3 {
    -gravity * submerged_volume * density
}

// ----- Drag (body axes) -----

/// `-½ ρ Cd_i A_i v_i |v_i|` per body axis.
pub(super) fn quadratic_drag(density: f64, cd: Vec3, areas: Vec3, v_body: Vec3) -> Vec3 {
    -0.5 * density * cd * areas * signed_square(v_body)
}

/// `-½ ρ Cr_i A_i L_i³ ω_i |ω_i|` per body axis.
pub(super) fn angular_drag(density: f64, cr: Vec3, areas: Vec3, lever: Vec3, w_body: Vec3) -> Vec3 {
    -0.5 * density * cr * areas * lever * lever * lever * signed_square(w_body)
}

// ----- Viscous damping -----

/// Solver damping coefficient from the wet fraction and viscosity, clamped to
/// the solver's valid range.
pub(super) fn viscous_damping(submerged_fraction: f64, viscosity: f64, cf: Vec3) -> f64 {
    let mean_cf = (cf.x + cf.y + cf.z) / 3.0;
    (submerged_fraction * viscosity * mean_cf).clamp(0.0, 1.0)
}

// ----- Added mass -----

/// Reaction of the entrained fluid to the body's acceleration, each axis
/// capped below `max_mass`.
pub(super) fn added_mass_force(density: f64, submerged_volume: f64, k: Vec3, max_mass: f64, a_body: Vec3) -> Vec3 {
    let ma = (k * density * submerged_volume).min(Vec3::splat(max_mass.max(0.0)));
    -ma * a_body
}
