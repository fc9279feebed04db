use glam::{Vec2, Vec3};
use std::path::Path;
use tracing::{debug, info, warn};

use crate::AssetError;

/// CPU-side mesh data, ready for upload.
///
/// `positions`, `normals`, and `texcoords` are parallel arrays indexed by
/// `indices` (triangle list). `texcoords` may be empty for meshes without
/// UVs; `normals` never is once the mesh leaves a loader.
#[derive(Debug, Clone, Default)]
pub struct MeshData {
    pub positions: Vec<Vec3>,
    pub normals: Vec<Vec3>,
    pub texcoords: Vec<Vec2>,
    pub indices: Vec<u32>,
    /// Diffuse texture filename named by the first MTL material, if any.
    /// Relative to the OBJ's directory.
    pub diffuse_texture: Option<String>,
}

impl MeshData {
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    pub fn index_count(&self) -> u32 {
        self.indices.len() as u32
    }

    /// Replace `normals` with per-vertex normals averaged from every face
    /// sharing the vertex, then renormalized.
    pub fn synthesize_normals(&mut self) {
        self.normals.clear();
        self.normals.resize(self.positions.len(), Vec3::ZERO);
        for tri in self.indices.chunks_exact(3) {
            let (i0, i1, i2) = (tri[0] as usize, tri[1] as usize, tri[2] as usize);
            let edge1 = self.positions[i1] - self.positions[i0];
            let edge2 = self.positions[i2] - self.positions[i0];
            let face_normal = edge1.cross(edge2).normalize_or_zero();
            self.normals[i0] += face_normal;
            self.normals[i1] += face_normal;
            self.normals[i2] += face_normal;
        }
        for n in &mut self.normals {
            *n = n.normalize_or_zero();
        }
    }
}

/// Load an OBJ file (plus its MTL, resolved relative to the OBJ's
/// directory) into a single triangulated, single-indexed mesh.
///
/// Matching the rasterizer's texture origin, every V coordinate is flipped
/// (`1 - v`). Files without normals get averaged face normals. A missing
/// or broken MTL is not an error; the mesh just comes back untextured.
pub fn load_obj(path: impl AsRef<Path>) -> Result<MeshData, AssetError> {
    let path = path.as_ref();
    let (models, materials) = tobj::load_obj(
        path,
        &tobj::LoadOptions {
            triangulate: true,
            single_index: true,
            ..Default::default()
        },
    )?;

    let mut mesh = MeshData::default();
    for model in &models {
        let m = &model.mesh;
        let base = mesh.positions.len() as u32;
        for xyz in m.positions.chunks_exact(3) {
            mesh.positions.push(Vec3::new(xyz[0], xyz[1], xyz[2]));
        }
        for xyz in m.normals.chunks_exact(3) {
            mesh.normals.push(Vec3::new(xyz[0], xyz[1], xyz[2]));
        }
        for uv in m.texcoords.chunks_exact(2) {
            mesh.texcoords.push(Vec2::new(uv[0], 1.0 - uv[1]));
        }
        mesh.indices.extend(m.indices.iter().map(|&i| base + i));
    }

    match materials {
        Ok(mats) => {
            if let Some(name) = mats.first().and_then(|m| m.diffuse_texture.clone()) {
                debug!(texture = %name, "diffuse texture named by MTL");
                mesh.diffuse_texture = Some(name);
            }
        }
        Err(err) => {
            warn!(obj = %path.display(), error = %err, "MTL unavailable, mesh left untextured");
        }
    }

    if mesh.normals.len() != mesh.positions.len() {
        info!(obj = %path.display(), "no normals in file, synthesizing averaged face normals");
        mesh.synthesize_normals();
    }

    debug!(
        obj = %path.display(),
        vertices = mesh.vertex_count(),
        indices = mesh.indices.len(),
        "loaded OBJ mesh"
    );
    Ok(mesh)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_obj(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".obj").tempfile().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn synthesized_normals_face_up_for_flat_triangle() {
        let mut mesh = MeshData {
            positions: vec![
                Vec3::new(0.0, 0.0, 0.0),
                Vec3::new(1.0, 0.0, 0.0),
                Vec3::new(0.0, 0.0, -1.0),
            ],
            indices: vec![0, 1, 2],
            ..Default::default()
        };
        mesh.synthesize_normals();
        for n in &mesh.normals {
            assert!((n.y - 1.0).abs() < 1e-5, "expected +Y normal, got {n:?}");
        }
    }

    #[test]
    fn shared_vertex_normals_are_averaged() {
        // Two triangles meeting at an edge, one facing +Y and one +Z.
        let mut mesh = MeshData {
            positions: vec![
                Vec3::new(0.0, 0.0, 0.0),
                Vec3::new(1.0, 0.0, 0.0),
                Vec3::new(0.0, 0.0, -1.0),
                Vec3::new(0.0, 1.0, 0.0),
            ],
            indices: vec![0, 1, 2, 0, 3, 1],
            ..Default::default()
        };
        mesh.synthesize_normals();
        let shared = mesh.normals[0];
        assert!(shared.y > 0.0 && shared.z > 0.0);
        assert!((shared.length() - 1.0).abs() < 1e-5);
    }

    #[test]
    fn obj_without_normals_gets_synthesized_ones() {
        let file = write_obj(
            "v 0 0 0\n\
             v 1 0 0\n\
             v 0 0 -1\n\
             f 1 2 3\n",
        );
        let mesh = load_obj(file.path()).unwrap();
        assert_eq!(mesh.vertex_count(), 3);
        assert_eq!(mesh.indices, vec![0, 1, 2]);
        assert_eq!(mesh.normals.len(), 3);
        assert!((mesh.normals[0].y - 1.0).abs() < 1e-5);
        assert!(mesh.diffuse_texture.is_none());
    }

    #[test]
    fn obj_texcoords_are_v_flipped() {
        let file = write_obj(
            "v 0 0 0\n\
             v 1 0 0\n\
             v 0 1 0\n\
             vt 0.0 0.25\n\
             vt 1.0 0.0\n\
             vt 0.0 1.0\n\
             f 1/1 2/2 3/3\n",
        );
        let mesh = load_obj(file.path()).unwrap();
        assert_eq!(mesh.texcoords.len(), 3);
        assert!((mesh.texcoords[0].y - 0.75).abs() < 1e-5);
        assert!((mesh.texcoords[1].y - 1.0).abs() < 1e-5);
        assert!((mesh.texcoords[2].y - 0.0).abs() < 1e-5);
    }

    #[test]
    fn missing_file_is_an_error() {
        assert!(load_obj("definitely/not/here.obj").is_err());
    }
}
