//! Scene bundle loading from ZIP files and directories.
//!
//! A bundle holds `scene.json` at its root plus the bitmap files the scene
//! references through [`SourceBitmap::file`](super::SourceBitmap::file).

use super::bitmap::decode_bitmap;
use super::SourceScene;
use crate::error::{ExportError, Result};
use std::collections::HashMap;
use std::io::Read;
use std::path::Path;

/// Name of the scene description inside a bundle.
pub const SCENE_FILE: &str = "scene.json";

/// Load a scene bundle from a file path.
///
/// Supports both ZIP files and directories.
pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<SourceScene> {
    let path = path.as_ref();

    if path.is_dir() {
        load_from_directory(path)
    } else {
        let data = std::fs::read(path)?;
        load_from_bytes(&data)
    }
}

/// Load a scene bundle from bytes (ZIP data).
pub fn load_from_bytes(data: &[u8]) -> Result<SourceScene> {
    let cursor = std::io::Cursor::new(data);
    let mut archive = zip::ZipArchive::new(cursor)?;

    let mut scene_json = None;
    let mut files: HashMap<String, Vec<u8>> = HashMap::new();

    for i in 0..archive.len() {
        let mut file = archive.by_index(i)?;
        if file.is_dir() {
            continue;
        }
        let name = normalize_entry(file.name());
        let mut data = Vec::new();
        file.read_to_end(&mut data)?;

        if name == SCENE_FILE {
            scene_json = Some(data);
        } else {
            files.insert(name, data);
        }
    }

    let scene_json = scene_json.ok_or_else(|| {
        ExportError::InvalidBundle(format!("archive has no {}", SCENE_FILE))
    })?;
    let mut scene: SourceScene = serde_json::from_slice(&scene_json)?;

    attach_bitmaps(&mut scene, |file| files.remove(&normalize_entry(file)));
    Ok(scene)
}

/// Load a scene bundle from a directory.
pub fn load_from_directory(path: &Path) -> Result<SourceScene> {
    let scene_path = path.join(SCENE_FILE);
    if !scene_path.is_file() {
        return Err(ExportError::InvalidBundle(format!(
            "{} not found in {:?}",
            SCENE_FILE, path
        )));
    }
    let contents = std::fs::read_to_string(&scene_path)?;
    let mut scene: SourceScene = serde_json::from_str(&contents)?;

    attach_bitmaps(&mut scene, |file| std::fs::read(path.join(file)).ok());
    Ok(scene)
}

/// Decode the backing file of every file-backed bitmap. Unreadable bitmaps
/// stay without pixels and are skipped later as missing data.
fn attach_bitmaps(scene: &mut SourceScene, mut read: impl FnMut(&str) -> Option<Vec<u8>>) {
    for bitmap in &mut scene.bitmaps {
        let Some(file) = bitmap.file.clone() else {
            continue;
        };
        let Some(data) = read(&file) else {
            tracing::warn!("Bitmap file {} not found in bundle", file);
            continue;
        };
        match decode_bitmap(&data) {
            Ok(image) => {
                bitmap.image = Some(image);
                bitmap.encoded = Some(data);
            }
            Err(e) => {
                tracing::warn!("Failed to decode bitmap {}: {}", file, e);
            }
        }
    }
}

fn normalize_entry(name: &str) -> String {
    name.trim_start_matches("./").replace('\\', "/")
}
