use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{HydroError, Result};

/// Solid material record. Immutable once registered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Material {
    pub name: String,
    /// kg/m³
    pub density: f64,
    pub restitution: f64,
    pub static_friction: f64,
    pub dynamic_friction: f64,
    pub magnetic: bool,
}

/// Fluid record (water, sea water, air, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fluid {
    pub name: String,
    /// kg/m³
    pub density: f64,
    /// Dynamic viscosity, Pa·s
    pub viscosity: f64,
    pub refractive_index: f64,
}

impl Fluid {
    /// A fluid with non-positive density or viscosity exerts no forces.
    pub fn is_active(&self) -> bool {
        self.density > 0.0 && self.viscosity > 0.0 && self.density.is_finite() && self.viscosity.is_finite()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrictionPair {
    pub static_friction: f64,
    pub dynamic_friction: f64,
}

/// Registry of materials and fluids, addressed by name or by index.
///
/// Indices are stable for the registry's lifetime: records are never removed.
#[derive(Debug, Default, Clone)]
pub struct MaterialManager {
    materials: Vec<Material>,
    material_index: HashMap<String, usize>,
    fluids: Vec<Fluid>,
    fluid_index: HashMap<String, usize>,
    interactions: HashMap<(usize, usize), FrictionPair>,
}

impl MaterialManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_material(&mut self, material: Material) -> Result<usize> {
        if self.material_index.contains_key(&material.name) {
            return Err(HydroError::DuplicateMaterial(material.name));
        }
        if !(material.density > 0.0 && material.density.is_finite()) {
            return Err(HydroError::InvalidDensity { name: material.name, density: material.density });
        }
        let idx = self.materials.len();
        debug!(name = %material.name, density = material.density, idx, "material registered");
        self.material_index.insert(material.name.clone(), idx);
        self.materials.push(material);
        Ok(idx)
    }

    pub fn add_fluid(&mut self, fluid: Fluid) -> Result<usize> {
        if self.fluid_index.contains_key(&fluid.name) {
            return Err(HydroError::DuplicateFluid(fluid.name));
        }
        if fluid.density.is_nan() || fluid.viscosity.is_nan() {
            return Err(HydroError::InvalidDensity { name: fluid.name, density: fluid.density });
        }
        let idx = self.fluids.len();
        debug!(name = %fluid.name, density = fluid.density, viscosity = fluid.viscosity, idx, "fluid registered");
        self.fluid_index.insert(fluid.name.clone(), idx);
        self.fluids.push(fluid);
        Ok(idx)
    }

    pub fn material(&self, name: &str) -> Result<&Material> {
        self.material_index
            .get(name)
            .map(|&i| &self.materials[i])
            .ok_or_else(|| HydroError::UnknownMaterial(name.to_string()))
    }

    pub fn material_at(&self, index: usize) -> Option<&Material> {
        self.materials.get(index)
    }

    pub fn material_index(&self, name: &str) -> Option<usize> {
        self.material_index.get(name).copied()
    }

    pub fn fluid(&self, name: &str) -> Result<&Fluid> {
        self.fluid_index
            .get(name)
            .map(|&i| &self.fluids[i])
            .ok_or_else(|| HydroError::UnknownFluid(name.to_string()))
    }

    pub fn fluid_at(&self, index: usize) -> Option<&Fluid> {
        self.fluids.get(index)
    }

    pub fn materials(&self) -> &[Material] {
        &self.materials
    }

    pub fn fluids(&self) -> &[Fluid] {
        &self.fluids
    }

    /// Override friction for a pair of materials (order-independent).
    pub fn set_interaction(&mut self, a: &str, b: &str, static_friction: f64, dynamic_friction: f64) -> Result<()> {
        let ia = self.material_index(a).ok_or_else(|| HydroError::UnknownMaterial(a.to_string()))?;
        let ib = self.material_index(b).ok_or_else(|| HydroError::UnknownMaterial(b.to_string()))?;
        self.interactions.insert(pair_key(ia, ib), FrictionPair { static_friction, dynamic_friction });
        Ok(())
    }

    /// Friction between two materials. Without an explicit entry the pair uses
    /// the lower of each coefficient.
    pub fn interaction(&self, a: &str, b: &str) -> Result<FrictionPair> {
        let ia = self.material_index(a).ok_or_else(|| HydroError::UnknownMaterial(a.to_string()))?;
        let ib = self.material_index(b).ok_or_else(|| HydroError::UnknownMaterial(b.to_string()))?;
        if let Some(p) = self.interactions.get(&pair_key(ia, ib)) {
            return Ok(*p);
        }
        let (ma, mb) = (&self.materials[ia], &self.materials[ib]);
        Ok(FrictionPair {
            static_friction: ma.static_friction.min(mb.static_friction),
            dynamic_friction: ma.dynamic_friction.min(mb.dynamic_friction),
        })
    }
}

fn pair_key(a: usize, b: usize) -> (usize, usize) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builtins;

    #[test]
    fn duplicate_material_rejected() {
        let mut mm = builtins::standard_materials();
        let steel = mm.material("Steel").unwrap().clone();
        let err = mm.add_material(steel).unwrap_err();
        assert_eq!(err, HydroError::DuplicateMaterial("Steel".into()));
    }

    #[test]
    fn lookup_by_name_and_index_agree() {
        let mm = builtins::standard_materials();
        let idx = mm.material_index("Aluminium").unwrap();
        assert_eq!(mm.material_at(idx).unwrap().name, "Aluminium");
        assert!(matches!(mm.material("Unobtanium"), Err(HydroError::UnknownMaterial(_))));
    }

    #[test]
    fn interaction_defaults_to_min_and_is_symmetric() {
        let mut mm = builtins::standard_materials();
        let p = mm.interaction("Steel", "Rubber").unwrap();
        let s = mm.material("Steel").unwrap().static_friction;
        let r = mm.material("Rubber").unwrap().static_friction;
        assert_eq!(p.static_friction, s.min(r));

        mm.set_interaction("Rubber", "Steel", 0.9, 0.7).unwrap();
        let q = mm.interaction("Steel", "Rubber").unwrap();
        assert_eq!(q, FrictionPair { static_friction: 0.9, dynamic_friction: 0.7 });
    }

    #[test]
    fn invalid_density_rejected() {
        let mut mm = MaterialManager::new();
        let err = mm
            .add_material(Material {
                name: "Void".into(),
                density: 0.0,
                restitution: 0.0,
                static_friction: 0.0,
                dynamic_friction: 0.0,
                magnetic: false,
            })
            .unwrap_err();
        assert!(matches!(err, HydroError::InvalidDensity { .. }));
    }
}
