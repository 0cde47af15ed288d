//! # Scene Translator
//!
//! Translates a hierarchical 3D scene into a normalized, deduplicated
//! intermediate model ready for a scene-description writer.
//!
//! ## Overview
//!
//! A [`SourceScene`] (nodes, meshes, layered surfaces, rigs and motion
//! curves) is walked depth-first. Meshes are re-indexed so vertices are only
//! shared where every attribute agrees, layered surfaces are baked into
//! metallic-roughness materials with deduplicated textures, and joint
//! hierarchies become skeletons with merged animation tracks.
//!
//! ## Quick Start
//!
//! ```ignore
//! use scene_translator::{export_scene, load_scene_bundle, write_manifest, ExportOptions};
//!
//! // Load a bundle (scene.json + bitmaps, ZIP or directory)
//! let scene = load_scene_bundle("path/to/bundle.zip")?;
//!
//! // Translate
//! let output = export_scene(&scene, &ExportOptions::default());
//! for warning in &output.warnings {
//!     eprintln!("warning: {}", warning);
//! }
//!
//! // Hand off to disk
//! write_manifest(&output, &scene, "out/")?;
//! ```
//!
//! ## Library Integration
//!
//! Hosts that already hold their scene in memory build a [`SourceScene`]
//! directly. Motion curves can be supplied through the [`MotionSource`]
//! trait; the individual stages ([`MeshNormalizer`], [`MaterialBaker`],
//! [`SkeletonAssembler`]) are usable on their own with an
//! [`ExportContext`].

pub mod animation;
pub mod config;
pub mod error;
pub mod export;
pub mod material;
pub mod mesh;
pub mod naming;
pub mod scene;
pub mod source;
pub mod types;

// Re-export main types for convenience
pub use animation::{SkeletonAssembler, SkeletonDescriptor};
pub use config::{ExportOptions, KeyframeMode, TextureFormat};
pub use error::{ExportError, ExportWarning, MeshError, Result};
pub use export::write_manifest;
pub use material::{BakedImage, MaterialBaker, MaterialDescriptor, TextureCompositor};
pub use mesh::{IndexedMesh, MeshNormalizer};
pub use naming::{NameKind, NameRegistry};
pub use scene::{ExportContext, ExportOutput, SceneAssembler, SceneNode, SceneNodeKind};
pub use source::{MotionSource, SourceNode, SourceScene};
pub use types::{BoundingBox, SurfaceId};

/// Translate a scene into the intermediate model.
///
/// Never fails: unusable data is skipped and reported in
/// [`ExportOutput::warnings`].
pub fn export_scene(scene: &SourceScene, options: &ExportOptions) -> ExportOutput {
    SceneAssembler::new(scene, options.clone()).assemble()
}

/// Load a scene bundle from a file path (ZIP or directory).
pub fn load_scene_bundle<P: AsRef<std::path::Path>>(path: P) -> Result<SourceScene> {
    source::loader::load_from_path(path)
}

/// Load a scene bundle from ZIP bytes.
pub fn load_scene_bundle_from_bytes(data: &[u8]) -> Result<SourceScene> {
    source::loader::load_from_bytes(data)
}
