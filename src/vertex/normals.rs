//! Per-vertex normal synthesis.

use glam::Vec3;

/// Smooth vertex normals from packed XYZ `positions` and triangle `indices`.
///
/// Each triangle adds its unnormalized face normal to its three corners, so
/// larger faces weigh more; the sums are normalized at the end. Vertices touched by no usable triangle keep a
/// zero normal. Triangles referencing missing vertices are skipped.
pub fn generate_normals(positions: &[f32], indices: &[u32]) -> Vec<f32> {
    let num_vertices = positions.len() / 3;
    let position = |i: usize| Vec3::new(positions[i * 3], positions[i * 3 + 1], positions[i * 3 + 2]);

    let mut sums = vec![Vec3::ZERO; num_vertices];
    for tri in indices.chunks_exact(3) {
        let (i1, i2, i3) = (tri[0] as usize, tri[1] as usize, tri[2] as usize);
        if i1 >= num_vertices || i2 >= num_vertices || i3 >= num_vertices {
            continue;
        }
        let (p1, p2, p3) = (position(i1), position(i2), position(i3));
        let face = (p2 - p1).cross(p3 - p1);
        sums[i1] += face;
        sums[i2] += face;
        sums[i3] += face;
    }

    sums.into_iter()
        .flat_map(|n| n.normalize_or_zero().to_array())
        .collect()
}

/// `0, 1, 2, ...` for non-indexed geometry.
pub fn sequential_indices(count: usize) -> Vec<u32> {
    (0..count as u32).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_triangle() {
        let positions = [0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0];
        let normals = generate_normals(&positions, &sequential_indices(3));
        assert_eq!(normals, vec![0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 0.0, 0.0, 1.0]);
    }

    #[test]
    fn test_shared_vertex_averages() {
        // Two triangles folded 90 degrees along the shared edge 0-1.
        let positions = [
            0.0, 0.0, 0.0, //
            1.0, 0.0, 0.0, //
            0.0, 1.0, 0.0, //
            0.0, 0.0, 1.0, //
        ];
        let normals = generate_normals(&positions, &[0, 1, 2, 1, 0, 3]);
        let n0 = Vec3::new(normals[0], normals[1], normals[2]);
        let expected = Vec3::new(0.0, 1.0, 1.0).normalize();
        assert!((n0 - expected).length() < 1e-6);
    }

    #[test]
    fn test_area_weighted() {
        let positions = [
            0.0, 0.0, 0.0, //
            2.0, 0.0, 0.0, //
            0.0, 2.0, 0.0, //
            0.0, 0.0, 1.0, //
            1.0, 0.0, 0.0, //
        ];
        // Vertex 0 joins a large +Z face and a small +Y face.
        let normals = generate_normals(&positions, &[0, 1, 2, 4, 0, 3]);
        let n0 = Vec3::new(normals[0], normals[1], normals[2]);
        let expected = Vec3::new(0.0, 1.0, 4.0).normalize();
        assert!((n0 - expected).length() < 1e-6);
    }

    #[test]
    fn test_unused_and_degenerate() {
        let positions = [0.0; 12];
        let normals = generate_normals(&positions, &[0, 1, 2, 0, 1, 9]);
        assert_eq!(normals, vec![0.0; 12]);
    }
}
