//! Asset loading: OBJ/MTL meshes, image textures, procedural fallbacks.
//!
//! Loaders return plain CPU-side data; the renderer uploads it and hands
//! back opaque handles. A load failure is reported to the caller, who is
//! expected to fall back to procedural geometry or an untextured material
//! rather than abort.
//!
//! # Invariants
//! - Mesh indices always describe a triangle list.
//! - Meshes leave the loader with one normal per vertex, synthesized when
//!   the source file carries none.
//! - Texture V coordinates are flipped at load time, once.

use sha2::{Digest, Sha256};

pub mod mesh;
pub mod procedural;
pub mod texture;

pub use mesh::{load_obj, MeshData};
pub use texture::{load_texture, TextureData};

/// Content-addressed asset ID computed from raw asset bytes. Two loads of
/// identical content yield the same id, which is what upload-side caches
/// key on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AssetId(pub u64);

impl AssetId {
    pub fn of_bytes(bytes: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(bytes);
        let digest = hasher.finalize();
        let mut trunc = [0u8; 8];
        trunc.copy_from_slice(&digest[..8]);
        Self(u64::from_le_bytes(trunc))
    }
}

/// Errors from asset operations.
#[derive(Debug, thiserror::Error)]
pub enum AssetError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("OBJ parse error: {0}")]
    Obj(#[from] tobj::LoadError),
    #[error("image decode error: {0}")]
    Image(#[from] image::ImageError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn asset_id_is_content_addressed() {
        let a = AssetId::of_bytes(b"same bytes");
        let b = AssetId::of_bytes(b"same bytes");
        let c = AssetId::of_bytes(b"other bytes");
        assert_eq!(a, b);
        assert_ne!(a, c);
    }
}
