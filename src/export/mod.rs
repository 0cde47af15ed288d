//! Hand-off of the intermediate model to disk.
//!
//! The scene-description writer itself lives outside this crate; the
//! manifest gives it (or a human) everything the translation produced.

pub mod manifest;

pub use manifest::{encode_image, image_bytes, write_manifest, MANIFEST_FILE, TEXTURE_DIR};
