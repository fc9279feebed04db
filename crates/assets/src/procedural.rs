use glam::{Vec2, Vec3};

use crate::mesh::MeshData;

/// Generate a flat ground plane in the XZ plane, facing +Y.
///
/// `uv_tiles` controls how many times a texture repeats across the full
/// extent; samplers are expected to wrap.
pub fn plane(half_extent: f32, uv_tiles: f32) -> MeshData {
    let e = half_extent;
    let t = uv_tiles;
    MeshData {
        positions: vec![
            Vec3::new(-e, 0.0, -e),
            Vec3::new(-e, 0.0, e),
            Vec3::new(e, 0.0, e),
            Vec3::new(e, 0.0, -e),
        ],
        normals: vec![Vec3::Y; 4],
        texcoords: vec![
            Vec2::new(0.0, 0.0),
            Vec2::new(0.0, t),
            Vec2::new(t, t),
            Vec2::new(t, 0.0),
        ],
        indices: vec![0, 1, 2, 2, 3, 0],
        diffuse_texture: None,
    }
}

/// Generate a cube with per-face normals and UVs, centered on the origin.
pub fn cube(half_extent: f32) -> MeshData {
    let p = half_extent;
    #[rustfmt::skip]
    let positions = vec![
        // +Z face
        Vec3::new(-p, -p,  p), Vec3::new( p, -p,  p), Vec3::new( p,  p,  p), Vec3::new(-p,  p,  p),
        // -Z face
        Vec3::new( p, -p, -p), Vec3::new(-p, -p, -p), Vec3::new(-p,  p, -p), Vec3::new( p,  p, -p),
        // +X face
        Vec3::new( p, -p,  p), Vec3::new( p, -p, -p), Vec3::new( p,  p, -p), Vec3::new( p,  p,  p),
        // -X face
        Vec3::new(-p, -p, -p), Vec3::new(-p, -p,  p), Vec3::new(-p,  p,  p), Vec3::new(-p,  p, -p),
        // +Y face
        Vec3::new(-p,  p,  p), Vec3::new( p,  p,  p), Vec3::new( p,  p, -p), Vec3::new(-p,  p, -p),
        // -Y face
        Vec3::new(-p, -p, -p), Vec3::new( p, -p, -p), Vec3::new( p, -p,  p), Vec3::new(-p, -p,  p),
    ];
    let face_normals = [Vec3::Z, Vec3::NEG_Z, Vec3::X, Vec3::NEG_X, Vec3::Y, Vec3::NEG_Y];
    let mut normals = Vec::with_capacity(24);
    let mut texcoords = Vec::with_capacity(24);
    for n in face_normals {
        normals.extend([n; 4]);
        texcoords.extend([
            Vec2::new(0.0, 1.0),
            Vec2::new(1.0, 1.0),
            Vec2::new(1.0, 0.0),
            Vec2::new(0.0, 0.0),
        ]);
    }
    #[rustfmt::skip]
    let indices = vec![
        0,1,2, 2,3,0,       // +Z
        4,5,6, 6,7,4,       // -Z
        8,9,10, 10,11,8,    // +X
        12,13,14, 14,15,12, // -X
        16,17,18, 18,19,16, // +Y
        20,21,22, 22,23,20, // -Y
    ];
    MeshData {
        positions,
        normals,
        texcoords,
        indices,
        diffuse_texture: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plane_is_two_upward_triangles() {
        let mesh = plane(100.0, 8.0);
        assert_eq!(mesh.vertex_count(), 4);
        assert_eq!(mesh.index_count(), 6);
        assert!(mesh.normals.iter().all(|n| *n == Vec3::Y));
        let max_uv = mesh
            .texcoords
            .iter()
            .fold(0.0f32, |acc, uv| acc.max(uv.x).max(uv.y));
        assert_eq!(max_uv, 8.0);
    }

    #[test]
    fn cube_has_one_normal_per_face_vertex() {
        let mesh = cube(0.5);
        assert_eq!(mesh.vertex_count(), 24);
        assert_eq!(mesh.index_count(), 36);
        assert!(mesh.normals.iter().all(|n| (n.length() - 1.0).abs() < 1e-6));
        assert!(mesh.indices.iter().all(|&i| (i as usize) < mesh.vertex_count()));
    }

    #[test]
    fn cube_winding_faces_outward() {
        let mesh = cube(1.0);
        for tri in mesh.indices.chunks_exact(3) {
            let (a, b, c) = (
                mesh.positions[tri[0] as usize],
                mesh.positions[tri[1] as usize],
                mesh.positions[tri[2] as usize],
            );
            let face = (b - a).cross(c - a).normalize();
            let stated = mesh.normals[tri[0] as usize];
            assert!(face.dot(stated) > 0.99, "face {face:?} vs normal {stated:?}");
        }
    }
}
