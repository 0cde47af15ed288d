//! JSON manifest dump of an [`ExportOutput`] plus its texture files.
//!
//! The layout of the output directory is:
//!
//! ```text
//! <dir>/manifest.json
//! <dir>/textures/<file_name>   one per BakedImage
//! ```

use crate::error::{ExportError, Result};
use crate::material::BakedImage;
use crate::scene::ExportOutput;
use crate::source::SourceScene;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::{DynamicImage, ExtendedColorType, ImageEncoder, RgbaImage};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

pub const MANIFEST_FILE: &str = "manifest.json";
pub const TEXTURE_DIR: &str = "textures";

const JPEG_QUALITY: u8 = 90;

#[derive(Serialize)]
struct Manifest<'a> {
    scene: &'a str,
    start_frame: f32,
    end_frame: f32,
    frames_per_second: f32,
    #[serde(flatten)]
    output: &'a ExportOutput,
}

/// Write `manifest.json` and every image of `output` into `dir`.
///
/// Returns the path of the manifest.
pub fn write_manifest<P: AsRef<Path>>(
    output: &ExportOutput,
    scene: &SourceScene,
    dir: P,
) -> Result<PathBuf> {
    let dir = dir.as_ref();
    let textures = dir.join(TEXTURE_DIR);
    fs::create_dir_all(&textures)?;

    for image in &output.images {
        let bytes = image_bytes(image, scene)?;
        fs::write(textures.join(&image.file_name), &bytes)?;
        tracing::debug!("Wrote {} ({} bytes)", image.file_name, bytes.len());
    }

    let manifest = Manifest {
        scene: &scene.name,
        start_frame: scene.start_frame,
        end_frame: scene.end_frame,
        frames_per_second: scene.frames_per_second,
        output,
    };
    let path = dir.join(MANIFEST_FILE);
    fs::write(&path, serde_json::to_vec_pretty(&manifest)?)?;

    tracing::info!(
        "Wrote manifest with {} images to {:?}",
        output.images.len(),
        dir
    );
    Ok(path)
}

/// File contents for a baked image.
///
/// Passthrough images whose source file already has the target format are
/// copied byte for byte; everything else is encoded from pixels.
pub fn image_bytes(image: &BakedImage, scene: &SourceScene) -> Result<Vec<u8>> {
    let pixels = match image.source {
        Some(id) => {
            let bitmap = scene
                .bitmap(id)
                .ok_or_else(|| ExportError::MissingBitmap(image.file_name.clone()))?;
            if let (Some(encoded), Some(ext)) = (&bitmap.encoded, bitmap.extension()) {
                if same_format(&ext, image.extension()) {
                    return Ok(encoded.clone());
                }
            }
            bitmap.image.as_ref()
        }
        None => image.pixels.as_ref(),
    };
    let pixels = pixels.ok_or_else(|| ExportError::MissingBitmap(image.file_name.clone()))?;
    encode_image(pixels, image.extension())
}

/// Encode RGBA pixels as JPEG (`jpg`/`jpeg`, alpha dropped) or PNG.
pub fn encode_image(pixels: &RgbaImage, extension: &str) -> Result<Vec<u8>> {
    let mut bytes = Vec::new();
    match extension {
        "jpg" | "jpeg" => {
            let rgb = DynamicImage::ImageRgba8(pixels.clone()).to_rgb8();
            JpegEncoder::new_with_quality(&mut bytes, JPEG_QUALITY).write_image(
                rgb.as_raw(),
                rgb.width(),
                rgb.height(),
                ExtendedColorType::Rgb8,
            )?;
        }
        _ => {
            PngEncoder::new(&mut bytes).write_image(
                pixels.as_raw(),
                pixels.width(),
                pixels.height(),
                ExtendedColorType::Rgba8,
            )?;
        }
    }
    Ok(bytes)
}

fn same_format(a: &str, b: &str) -> bool {
    let canonical = |ext: &str| if ext == "jpeg" { "jpg".to_string() } else { ext.to_ascii_lowercase() };
    canonical(a) == canonical(b)
}
