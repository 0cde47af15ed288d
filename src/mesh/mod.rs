//! Mesh normalization.
//!
//! Converts the host's polygon soup into indexed meshes with per-vertex
//! normals, optionally split per material.

pub mod geometry;
pub mod normalizer;

pub use geometry::IndexedMesh;
pub use normalizer::{MeshNormalizer, NormalizeOptions, Partition};
