use std::path::Path;
use tracing::debug;

use crate::{AssetError, AssetId};

/// Decoded RGBA8 pixels, ready for upload.
#[derive(Debug, Clone)]
pub struct TextureData {
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
    /// Content hash of the pixel data, for upload-side dedup.
    pub id: AssetId,
}

impl TextureData {
    pub fn from_rgba(width: u32, height: u32, rgba: Vec<u8>) -> Self {
        debug_assert_eq!(rgba.len(), (width * height * 4) as usize);
        let id = AssetId::of_bytes(&rgba);
        Self {
            width,
            height,
            rgba,
            id,
        }
    }
}

/// Decode an image file into RGBA8.
pub fn load_texture(path: impl AsRef<Path>) -> Result<TextureData, AssetError> {
    let path = path.as_ref();
    let image = image::open(path)?.to_rgba8();
    let (width, height) = image.dimensions();
    debug!(texture = %path.display(), width, height, "decoded texture");
    Ok(TextureData::from_rgba(width, height, image.into_raw()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_rgba_carries_dimensions_and_id() {
        let solid = vec![255u8; 2 * 2 * 4];
        let tex = TextureData::from_rgba(2, 2, solid.clone());
        assert_eq!(tex.width, 2);
        assert_eq!(tex.height, 2);
        assert_eq!(tex.id, AssetId::of_bytes(&solid));
    }

    #[test]
    fn identical_pixels_share_an_id() {
        let a = TextureData::from_rgba(1, 1, vec![10, 20, 30, 255]);
        let b = TextureData::from_rgba(1, 1, vec![10, 20, 30, 255]);
        let c = TextureData::from_rgba(1, 1, vec![10, 20, 31, 255]);
        assert_eq!(a.id, b.id);
        assert_ne!(a.id, c.id);
    }

    #[test]
    fn missing_texture_file_is_an_error() {
        assert!(load_texture("no/such/texture.png").is_err());
    }
}
