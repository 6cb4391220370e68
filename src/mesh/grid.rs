use glam::Vec3;

use crate::mesh::TriangleMesh;

/// Builds a flat grid of `resolution_x * resolution_z` vertices spanning
/// `[-0.5, 0.5] x {0} x [-0.5, 0.5]`, scaled by `size`. Normals all point up;
/// the UV of vertex `(x, z)` is `(x / resolution_x, z / resolution_z)`, so
/// UVs cover `[0, 1)` half-open. Vertex order is x-major: index
/// `i = x * resolution_z + z`. Deterministic; resolutions below 2 are
/// clamped to 2.
pub fn generate_grid(resolution_x: u32, resolution_z: u32, size: Vec3) -> TriangleMesh {
    let rx = resolution_x.max(2);
    let rz = resolution_z.max(2);

    let vertex_count = (rx * rz) as usize;
    let mut positions = Vec::with_capacity(vertex_count * 3);
    let mut normals = Vec::with_capacity(vertex_count * 3);
    let mut uvs = Vec::with_capacity(vertex_count * 2);

    for x in 0..rx {
        for z in 0..rz {
            let fx = x as f32 / (rx - 1) as f32 - 0.5;
            let fz = z as f32 / (rz - 1) as f32 - 0.5;

            positions.push(fx * size.x);
            positions.push(0.0 * size.y);
            positions.push(fz * size.z);

            normals.push(0.0);
            normals.push(1.0);
            normals.push(0.0);

            uvs.push(x as f32 / rx as f32);
            uvs.push(z as f32 / rz as f32);
        }
    }

    let mut indices = Vec::with_capacity(((rx - 1) * (rz - 1) * 6) as usize);
    for x in 0..rx - 1 {
        for z in 0..rz - 1 {
            let i = x * rz + z;
            let next_z = i + 1;
            let next_x = i + rz;
            let diagonal = i + rz + 1;

            // Both triangles wind counter-clockwise seen from +Y.
            indices.push(i);
            indices.push(next_z);
            indices.push(diagonal);

            indices.push(i);
            indices.push(diagonal);
            indices.push(next_x);
        }
    }

    TriangleMesh {
        positions,
        normals,
        uvs,
        indices,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_scene_counts() {
        let mesh = generate_grid(400, 100, Vec3::new(1.0, 0.05, 0.5));
        assert_eq!(mesh.vertex_count(), 40_000);
        assert_eq!(mesh.index_count(), 237_006);
    }

    #[test]
    fn regeneration_is_bit_identical() {
        let size = Vec3::new(1.0, 0.05, 0.5);
        let a = generate_grid(400, 100, size);
        let b = generate_grid(400, 100, size);
        assert_eq!(a.positions, b.positions);
        assert_eq!(a.normals, b.normals);
        assert_eq!(a.uvs, b.uvs);
        assert_eq!(a.indices, b.indices);
    }

    #[test]
    fn indices_stay_in_bounds() {
        let mesh = generate_grid(13, 7, Vec3::ONE);
        let count = mesh.vertex_count() as u32;
        assert!(mesh.indices.iter().all(|&i| i < count));
    }

    #[test]
    fn all_normals_point_up() {
        let mesh = generate_grid(8, 8, Vec3::ONE);
        for n in mesh.normals.chunks_exact(3) {
            assert_eq!(n, [0.0, 1.0, 0.0]);
        }
    }

    #[test]
    fn positions_span_scaled_half_cube() {
        let mesh = generate_grid(16, 9, Vec3::new(2.0, 1.0, 4.0));
        let xs: Vec<f32> = mesh.positions.iter().copied().step_by(3).collect();
        let ys: Vec<f32> = mesh.positions.iter().copied().skip(1).step_by(3).collect();
        let zs: Vec<f32> = mesh.positions.iter().copied().skip(2).step_by(3).collect();

        assert_eq!(xs.iter().copied().fold(f32::MAX, f32::min), -1.0);
        assert_eq!(xs.iter().copied().fold(f32::MIN, f32::max), 1.0);
        assert_eq!(zs.iter().copied().fold(f32::MAX, f32::min), -2.0);
        assert_eq!(zs.iter().copied().fold(f32::MIN, f32::max), 2.0);
        assert!(ys.iter().all(|&y| y == 0.0));
    }

    #[test]
    fn uvs_half_open() {
        let mesh = generate_grid(10, 5, Vec3::ONE);
        for uv in mesh.uvs.chunks_exact(2) {
            assert!((0.0..1.0).contains(&uv[0]));
            assert!((0.0..1.0).contains(&uv[1]));
        }
        // Far corner vertex sits one texel short of 1.
        let last = &mesh.uvs[mesh.uvs.len() - 2..];
        assert_eq!(last, [0.9, 0.8]);
    }

    #[test]
    fn two_by_two_adjacency() {
        let mesh = generate_grid(2, 2, Vec3::ONE);
        assert_eq!(mesh.indices, vec![0, 1, 3, 0, 3, 2]);
    }

    #[test]
    fn first_triangle_faces_up() {
        let mesh = generate_grid(3, 3, Vec3::ONE);
        let p = |i: usize| {
            let base = mesh.indices[i] as usize * 3;
            Vec3::new(
                mesh.positions[base],
                mesh.positions[base + 1],
                mesh.positions[base + 2],
            )
        };
        let (a, b, c) = (p(0), p(1), p(2));
        let n = (b - a).cross(c - a);
        assert!(n.y > 0.0);
    }
}
