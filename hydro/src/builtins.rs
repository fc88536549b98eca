use crate::{Fluid, Material, MaterialManager};

fn material(
    name: &str,
    density: f64,
    restitution: f64,
    static_friction: f64,
    dynamic_friction: f64,
    magnetic: bool,
) -> Material {
    Material {
        name: name.to_string(),
        density,
        restitution,
        static_friction,
        dynamic_friction,
        magnetic,
    }
}

pub fn water() -> Fluid {
    Fluid { name: "Water".into(), density: 1000.0, viscosity: 0.001, refractive_index: 1.333 }
}

pub fn sea_water() -> Fluid {
    Fluid { name: "SeaWater".into(), density: 1025.0, viscosity: 0.00108, refractive_index: 1.34 }
}

pub fn air() -> Fluid {
    Fluid { name: "Air".into(), density: 1.225, viscosity: 1.81e-5, refractive_index: 1.000293 }
}

/// Registry pre-filled with the materials and fluids most scenarios use.
pub fn standard_materials() -> MaterialManager {
    let mut mm = MaterialManager::new();
    let materials = [
        material("Steel", 7891.0, 0.3, 0.6, 0.4, true),
        material("Aluminium", 2710.0, 0.5, 0.6, 0.5, false),
        material("Plastic", 1500.0, 0.6, 0.5, 0.3, false),
        material("Rubber", 1340.0, 0.8, 1.0, 0.8, false),
        // Neutrally buoyant in fresh water; handy for test rigs
        material("Neutral", 1000.0, 0.5, 0.5, 0.3, false),
    ];
    for m in materials {
        // Names above are distinct and densities positive.
        let _ = mm.add_material(m);
    }
    for f in [water(), sea_water(), air()] {
        let _ = mm.add_fluid(f);
    }
    mm
}
