use hydro::geometry::Submersion;
use hydro::{BodyGeometry, Plane, Quat, Shape, Vec3};

fn shapes() -> Vec<(&'static str, Shape)> {
    vec![
        ("sphere", Shape::Sphere { radius: 0.6 }),
        ("box", Shape::Box { half_extents: Vec3::new(0.8, 0.4, 0.3) }),
        ("cylinder", Shape::Cylinder { radius: 0.3, height: 1.5 }),
        ("torus", Shape::Torus { major_radius: 0.8, minor_radius: 0.2 }),
        ("wing", Shape::Wing { root_chord: 1.0, tip_chord: 0.5, span: 2.0, thickness_ratio: 0.12 }),
    ]
}

fn sweep(g: &BodyGeometry, normal: Vec3, steps: usize) -> Vec<Submersion> {
    let r = g.props.bounding_radius * 1.2;
    (0..=steps)
        .map(|i| {
            let offset = r - 2.0 * r * i as f64 / steps as f64;
            g.submersion(&Plane { normal, offset })
        })
        .collect()
}

#[test]
fn submerged_volume_is_bounded_and_monotonic() {
    let normals = [
        Vec3::Z,
        Vec3::new(0.3, 0.2, 1.0).normalize(),
        Quat::from_rotation_y(1.2) * Vec3::Z,
    ];
    for (name, shape) in shapes() {
        let g = BodyGeometry::new(shape).unwrap();
        let total = g.volume();
        for n in normals {
            let s = sweep(&g, n, 200);
            assert_eq!(s[0].volume, 0.0, "{name}: must start dry");
            assert_eq!(s[200].volume, total, "{name}: must end fully wet");
            for w in s.windows(2) {
                assert!(
                    w[1].volume >= w[0].volume - 1e-9,
                    "{name}: volume decreased {} -> {}",
                    w[0].volume,
                    w[1].volume
                );
                assert!(w[1].volume <= total, "{name}: {} exceeds total {}", w[1].volume, total);
                // The sweep step is small; a jump bigger than a slab of the
                // bounding sphere's cross-section signals a discontinuity.
                let r = g.props.bounding_radius;
                let slab = std::f64::consts::PI * r * r * 2.4 * r / 200.0;
                assert!(w[1].volume - w[0].volume <= slab * 1.01, "{name}: jump {}", w[1].volume - w[0].volume);
            }
        }
    }
}

#[test]
fn half_plane_through_centroid_of_symmetric_shapes_gives_half() {
    for (name, shape) in shapes().into_iter().take(4) {
        let g = BodyGeometry::new(shape).unwrap();
        let s = g.submersion(&Plane { normal: Vec3::Z, offset: 0.0 });
        let rel = (s.volume - 0.5 * g.volume()).abs() / g.volume();
        assert!(rel < 1e-6, "{name}: half volume off by {rel}");
    }
}

#[test]
fn center_of_buoyancy_lies_on_the_wet_side() {
    for (name, shape) in shapes() {
        let g = BodyGeometry::new(shape).unwrap();
        let n = Vec3::new(-0.2, 0.5, 1.0).normalize();
        let s = g.submersion(&Plane { normal: n, offset: 0.1 });
        assert!(s.volume > 0.0, "{name}: expected partial submersion");
        assert!(s.centroid.dot(n) + 0.1 < 0.0, "{name}: centroid {:?} is above the plane", s.centroid);
    }
}

#[test]
fn sphere_cap_matches_mesh_clip_of_fine_tessellation() {
    // A fine UV-sphere as a raw mesh should agree with the closed-form cap.
    let (r, nu, nv) = (0.5_f64, 96, 48);
    let mut vertices = vec![Vec3::new(0.0, 0.0, -r), Vec3::new(0.0, 0.0, r)];
    for j in 1..nv {
        let phi = std::f64::consts::PI * j as f64 / nv as f64 - std::f64::consts::FRAC_PI_2;
        for i in 0..nu {
            let th = std::f64::consts::TAU * i as f64 / nu as f64;
            vertices.push(Vec3::new(r * phi.cos() * th.cos(), r * phi.cos() * th.sin(), r * phi.sin()));
        }
    }
    let ring = |j: usize, i: usize| (2 + (j - 1) * nu + i % nu) as u32;
    let mut faces = Vec::new();
    for i in 0..nu {
        faces.push([0, ring(1, i + 1), ring(1, i)]);
        faces.push([1, ring(nv - 1, i), ring(nv - 1, i + 1)]);
        for j in 1..nv - 1 {
            faces.push([ring(j, i), ring(j, i + 1), ring(j + 1, i + 1)]);
            faces.push([ring(j, i), ring(j + 1, i + 1), ring(j + 1, i)]);
        }
    }
    let mesh = BodyGeometry::new(Shape::Mesh(hydro::TriangleMesh::new(vertices, faces))).unwrap();
    let sphere = BodyGeometry::new(Shape::Sphere { radius: r }).unwrap();
    for offset in [-0.3, -0.1, 0.0, 0.2, 0.4] {
        let plane = Plane { normal: Vec3::Z, offset };
        let a = sphere.submersion(&plane).volume / sphere.volume();
        let b = mesh.submersion(&plane).volume / mesh.volume();
        assert!((a - b).abs() < 5e-3, "offset {offset}: cap fraction {a} vs mesh {b}");
    }
}

#[test]
fn inside_out_mesh_still_floats_partially() {
    let mesh = Shape::Box { half_extents: Vec3::splat(0.5) }.tessellate().unwrap().flipped();
    assert!(mesh.signed_volume() < 0.0);
    let g = BodyGeometry::new(Shape::Mesh(mesh)).unwrap();
    assert!((g.volume() - 1.0).abs() < 1e-9);
    let hull = g.hull().unwrap();
    assert!(hull.signed_volume() > 0.0);

    let mut last = 0.0;
    for offset in [0.6, 0.25, 0.0, -0.25, -0.49, -0.6] {
        let v = g.submersion(&Plane { normal: Vec3::Z, offset }).volume;
        let expected = (0.5 - offset).clamp(0.0, 1.0);
        assert!((v - expected).abs() < 1e-6, "offset {offset}: volume {v}, expected {expected}");
        assert!(v >= last);
        last = v;
    }
}
