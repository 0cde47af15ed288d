//! Indexed mesh output type.

use crate::types::{BoundingBox, JointHandle, SurfaceId};
use serde::{Deserialize, Serialize};

/// A polygon mesh whose vertices are shared only where every per-vertex
/// attribute agrees.
///
/// Normals, colors and skin data are per vertex (1:1 with `positions`); UVs
/// are face-varying (1:1 with `face_indices`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IndexedMesh {
    pub positions: Vec<[f32; 3]>,
    /// Per-vertex normals, empty when the source had none.
    pub normals: Vec<[f32; 3]>,
    /// Per-vertex colors, empty when absent or disabled.
    pub colors: Vec<[f32; 4]>,
    /// Per-vertex skin weights, empty when unskinned.
    pub skin_weights: Vec<[f32; 4]>,
    /// Per-vertex joint handles matching `skin_weights`.
    pub skin_joints: Vec<[Option<JointHandle>; 4]>,
    /// Face-varying UVs of set 0.
    pub uv0: Vec<[f32; 2]>,
    /// Face-varying UVs of set 1.
    pub uv1: Vec<[f32; 2]>,
    pub face_vertex_counts: Vec<u32>,
    pub face_indices: Vec<u32>,
    /// Source surface the faces were assigned to.
    pub surface: Option<SurfaceId>,
    /// Index into the exported material list, set during scene assembly.
    pub material: Option<usize>,
    pub subdivision: bool,
    pub bounds: Option<BoundingBox>,
}

impl IndexedMesh {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    pub fn face_count(&self) -> usize {
        self.face_vertex_counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.face_vertex_counts.is_empty()
    }

    pub fn is_skinned(&self) -> bool {
        !self.skin_weights.is_empty()
    }

    /// Recompute the bounding box from the positions.
    pub fn update_bounds(&mut self) {
        self.bounds = BoundingBox::from_points(self.positions.iter().copied());
    }

    /// Uniformly scale all positions (unit conversion).
    pub fn scale_positions(&mut self, factor: f32) {
        for p in &mut self.positions {
            p[0] *= factor;
            p[1] *= factor;
            p[2] *= factor;
        }
        self.update_bounds();
    }

    /// Check the structural invariants: counts match indices, every face
    /// has at least three distinct in-range corners, and every per-vertex or
    /// face-varying stream has the right length.
    pub fn is_well_formed(&self) -> bool {
        let total: usize = self.face_vertex_counts.iter().map(|&c| c as usize).sum();
        if total != self.face_indices.len() {
            return false;
        }

        let mut offset = 0;
        for &count in &self.face_vertex_counts {
            let face = &self.face_indices[offset..offset + count as usize];
            if face.len() < 3 {
                return false;
            }
            for (i, a) in face.iter().enumerate() {
                if *a as usize >= self.positions.len() || face[i + 1..].contains(a) {
                    return false;
                }
            }
            offset += count as usize;
        }

        let vertex_stream_ok = |len: usize| len == 0 || len == self.positions.len();
        let face_stream_ok = |len: usize| len == 0 || len == self.face_indices.len();
        vertex_stream_ok(self.normals.len())
            && vertex_stream_ok(self.colors.len())
            && vertex_stream_ok(self.skin_weights.len())
            && self.skin_joints.len() == self.skin_weights.len()
            && face_stream_ok(self.uv0.len())
            && face_stream_ok(self.uv1.len())
    }
}
