//! Source bitmaps.

use crate::types::BitmapId;
use image::RgbaImage;
use serde::{Deserialize, Serialize};

/// A bitmap referenced by mapping layers.
///
/// A bitmap is *file-backed* when it came from an image file on disk that can
/// be copied verbatim; those are the only passthrough candidates. Bitmaps
/// generated inside the host only have pixels.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SourceBitmap {
    pub id: BitmapId,
    pub name: String,
    /// Path of the backing file, relative to the bundle root.
    #[serde(default)]
    pub file: Option<String>,
    /// Decoded pixels; `None` when the bitmap could not be read.
    #[serde(skip)]
    pub image: Option<RgbaImage>,
    /// Encoded bytes of the backing file.
    #[serde(skip)]
    pub encoded: Option<Vec<u8>>,
}

impl SourceBitmap {
    /// A bitmap that only exists as pixels.
    pub fn from_image(id: u32, name: impl Into<String>, image: RgbaImage) -> Self {
        Self {
            id: BitmapId(id),
            name: name.into(),
            file: None,
            image: Some(image),
            encoded: None,
        }
    }

    /// A bitmap backed by a file.
    pub fn from_file(id: u32, file: impl Into<String>, image: RgbaImage) -> Self {
        let file = file.into();
        let name = file
            .rsplit('/')
            .next()
            .map(|n| n.rsplit_once('.').map(|(stem, _)| stem).unwrap_or(n))
            .unwrap_or_default()
            .to_string();
        Self {
            id: BitmapId(id),
            name,
            file: Some(file),
            image: Some(image),
            encoded: None,
        }
    }

    /// A solid-color bitmap, handy for tests and placeholders.
    pub fn solid(id: u32, name: impl Into<String>, width: u32, height: u32, color: [u8; 4]) -> Self {
        Self::from_image(id, name, RgbaImage::from_pixel(width, height, image::Rgba(color)))
    }

    pub fn is_file_backed(&self) -> bool {
        self.file.is_some()
    }

    pub fn dimensions(&self) -> Option<(u32, u32)> {
        self.image.as_ref().map(|img| img.dimensions())
    }

    /// Lowercased extension of the backing file.
    pub fn extension(&self) -> Option<String> {
        let file = self.file.as_deref()?;
        let last = file.rsplit('/').next()?;
        let (_, ext) = last.rsplit_once('.')?;
        Some(ext.to_ascii_lowercase())
    }

    /// Check if any pixel is not fully opaque.
    pub fn has_transparency(&self) -> bool {
        self.image
            .as_ref()
            .map(|img| img.pixels().any(|p| p.0[3] < 255))
            .unwrap_or(false)
    }
}

/// Decode an image file into RGBA8.
pub fn decode_bitmap(data: &[u8]) -> Result<RgbaImage, image::ImageError> {
    let img = image::load_from_memory(data)?;
    Ok(img.to_rgba8())
}
