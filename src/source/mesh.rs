//! Host-native polygon soup.

use crate::types::JointHandle;
use serde::{Deserialize, Serialize};

/// Per-vertex skin data (up to four influences).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SkinData {
    pub weights: Vec<[f32; 4]>,
    pub joints: Vec<[Option<JointHandle>; 4]>,
}

/// A mesh as the host hands it over: shared positions, per-face-vertex
/// attribute streams and optional face groups.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawMesh {
    pub positions: Vec<[f32; 3]>,
    pub face_vertex_counts: Vec<u32>,
    pub face_indices: Vec<u32>,
    /// Per face-vertex normals.
    pub normals: Vec<[f32; 3]>,
    /// Per face-vertex UVs of set 0.
    pub uv0: Vec<[f32; 2]>,
    /// Per face-vertex UVs of set 1.
    pub uv1: Vec<[f32; 2]>,
    /// Per face-vertex colors.
    pub colors: Vec<[f32; 4]>,
    /// Per face group id; empty when the mesh has no face groups.
    pub face_groups: Vec<Option<u32>>,
    pub skin: Option<SkinData>,
    pub flip_faces: bool,
    pub subdivision: bool,
}

impl RawMesh {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a face, one normal per corner.
    pub fn add_face(&mut self, indices: &[u32], normals: &[[f32; 3]]) {
        self.face_vertex_counts.push(indices.len() as u32);
        self.face_indices.extend_from_slice(indices);
        self.normals.extend_from_slice(normals);
    }

    pub fn face_count(&self) -> usize {
        self.face_vertex_counts.len()
    }

    pub fn face_vertex_count(&self) -> usize {
        self.face_indices.len()
    }

    /// Face-group id of a face, if the mesh is grouped.
    pub fn face_group(&self, face: usize) -> Option<u32> {
        self.face_groups.get(face).copied().flatten()
    }

    pub fn has_face_groups(&self) -> bool {
        self.face_groups.iter().any(Option::is_some)
    }
}
