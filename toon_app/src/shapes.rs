//! Procedural meshes used when a model file is not shipped

use toon_engine::foundation::math::constants::TAU;
use toon_engine::render::{MeshData, Topology};

/// UV sphere centred on the origin.
///
/// `stacks` rings from pole to pole, `slices` segments around Y. The seam
/// column is duplicated so texture coordinates wrap cleanly.
pub fn uv_sphere(radius: f32, stacks: u32, slices: u32) -> MeshData {
    let stacks = stacks.max(2);
    let slices = slices.max(3);
    let mut mesh = MeshData {
        topology: Some(Topology::Triangles),
        ..Default::default()
    };

    for i in 0..=stacks {
        let v = i as f32 / stacks as f32;
        let phi = v * TAU / 2.0;
        for j in 0..=slices {
            let u = j as f32 / slices as f32;
            let theta = u * TAU;
            let normal = [phi.sin() * theta.cos(), phi.cos(), phi.sin() * theta.sin()];
            mesh.positions.push(normal.map(|c| c * radius));
            mesh.normals.push(normal);
            mesh.tex_coords.push([u, 1.0 - v]);
        }
    }

    let row = slices + 1;
    for i in 0..stacks {
        for j in 0..slices {
            let a = i * row + j;
            let b = a + row;
            mesh.indices.extend_from_slice(&[a, a + 1, b, a + 1, b + 1, b]);
        }
    }
    mesh
}

/// Torus lying in the XZ plane around the Y axis
pub fn torus(major_radius: f32, minor_radius: f32, rings: u32, sides: u32) -> MeshData {
    let rings = rings.max(3);
    let sides = sides.max(3);
    let mut mesh = MeshData {
        topology: Some(Topology::Triangles),
        ..Default::default()
    };

    for i in 0..=rings {
        let u = i as f32 / rings as f32;
        let (sin_u, cos_u) = (u * TAU).sin_cos();
        for j in 0..=sides {
            let v = j as f32 / sides as f32;
            let (sin_v, cos_v) = (v * TAU).sin_cos();
            let normal = [cos_v * cos_u, sin_v, cos_v * sin_u];
            let ring = major_radius + minor_radius * cos_v;
            mesh.positions.push([ring * cos_u, minor_radius * sin_v, ring * sin_u]);
            mesh.normals.push(normal);
            mesh.tex_coords.push([u, v]);
        }
    }

    let row = sides + 1;
    for i in 0..rings {
        for j in 0..sides {
            let a = i * row + j;
            let b = a + row;
            mesh.indices.extend_from_slice(&[a, a + 1, b, a + 1, b + 1, b]);
        }
    }
    mesh
}

/// Square grid of `tiles` x `tiles` quads on y = 0, facing up, `size` wide.
/// Each tile maps the full texture once.
pub fn floor(size: f32, tiles: u32) -> MeshData {
    let tiles = tiles.max(1);
    let step = size / tiles as f32;
    let start = -size / 2.0;
    let mut mesh = MeshData {
        topology: Some(Topology::Quads),
        ..Default::default()
    };

    for row in 0..tiles {
        for col in 0..tiles {
            let x0 = start + col as f32 * step;
            let z0 = start + row as f32 * step;
            let (x1, z1) = (x0 + step, z0 + step);
            let base = mesh.positions.len() as u32;
            // Counter-clockwise seen from above
            mesh.positions
                .extend_from_slice(&[[x0, 0.0, z0], [x0, 0.0, z1], [x1, 0.0, z1], [x1, 0.0, z0]]);
            mesh.tex_coords
                .extend_from_slice(&[[0.0, 1.0], [0.0, 0.0], [1.0, 0.0], [1.0, 1.0]]);
            mesh.normals.extend_from_slice(&[[0.0, 1.0, 0.0]; 4]);
            mesh.indices.extend(base..base + 4);
        }
    }
    mesh
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn length(v: [f32; 3]) -> f32 {
        (v[0] * v[0] + v[1] * v[1] + v[2] * v[2]).sqrt()
    }

    fn face_normal(mesh: &MeshData, tri: &[u32]) -> [f32; 3] {
        let [a, b, c] = [0, 1, 2].map(|k| mesh.positions[tri[k] as usize]);
        let ab = [b[0] - a[0], b[1] - a[1], b[2] - a[2]];
        let ac = [c[0] - a[0], c[1] - a[1], c[2] - a[2]];
        [
            ab[1] * ac[2] - ab[2] * ac[1],
            ab[2] * ac[0] - ab[0] * ac[2],
            ab[0] * ac[1] - ab[1] * ac[0],
        ]
    }

    #[test]
    fn test_sphere_is_valid_and_on_radius() {
        let mesh = uv_sphere(2.0, 8, 12);
        assert!(mesh.validate().is_ok());
        assert_eq!(mesh.vertex_count(), 9 * 13);
        assert_eq!(mesh.indices.len(), (8 * 12 * 6) as usize);
        for &p in &mesh.positions {
            assert_relative_eq!(length(p), 2.0, epsilon = 1e-5);
        }
    }

    #[test]
    fn test_sphere_faces_outward() {
        let mesh = uv_sphere(1.0, 8, 12);
        // Pick a triangle away from the poles
        let start = (3 * 12 * 6) as usize;
        let tri = &mesh.indices[start..start + 3];
        let n = face_normal(&mesh, tri);
        let p = mesh.positions[tri[0] as usize];
        assert!(n[0] * p[0] + n[1] * p[1] + n[2] * p[2] > 0.0);
    }

    #[test]
    fn test_torus_points_lie_on_tube() {
        let mesh = torus(3.0, 1.0, 16, 8);
        assert!(mesh.validate().is_ok());
        for &p in &mesh.positions {
            let ring = (p[0] * p[0] + p[2] * p[2]).sqrt();
            assert_relative_eq!(((ring - 3.0).powi(2) + p[1] * p[1]).sqrt(), 1.0, epsilon = 1e-5);
        }
    }

    #[test]
    fn test_torus_faces_outward() {
        let mesh = torus(3.0, 1.0, 16, 8);
        let tri = &mesh.indices[0..3];
        let n = face_normal(&mesh, tri);
        let normal = mesh.normals[tri[0] as usize];
        assert!(n[0] * normal[0] + n[1] * normal[1] + n[2] * normal[2] > 0.0);
    }

    #[test]
    fn test_floor_is_quads_facing_up() {
        let mesh = floor(40.0, 4);
        assert!(mesh.validate().is_ok());
        assert_eq!(mesh.topology(), Topology::Quads);
        assert_eq!(mesh.indices.len(), 16 * 4);
        assert_eq!(mesh.triangle_indices().len(), 16 * 6);

        let tri = mesh.triangle_indices();
        assert!(face_normal(&mesh, &tri[0..3])[1] > 0.0);

        let bounds = mesh.bounds().unwrap();
        assert_relative_eq!(bounds.extents().x, 20.0);
        assert_relative_eq!(bounds.center().y, 0.0);
    }
}
