//! Scene assembly and the exported intermediate model.
//!
//! [`ExportOutput`] is the contract handed to a scene-description writer:
//! ordered nodes with unique paths, materials, images and skeletons.

mod assembler;
mod context;

pub use assembler::SceneAssembler;
pub use context::ExportContext;

use crate::animation::SkeletonDescriptor;
use crate::error::ExportWarning;
use crate::material::{BakedImage, MaterialDescriptor};
use crate::mesh::IndexedMesh;
use glam::Mat4;
use serde::Serialize;

/// Binding of a skinned mesh to a skeleton.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkinBinding {
    /// Index into [`ExportOutput::skeletons`].
    pub skeleton: usize,
    /// Per-vertex joint indices into the skeleton's joint list, parallel to
    /// the mesh's skin weights.
    pub joint_indices: Vec<[u32; 4]>,
}

/// Node payload.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SceneNodeKind {
    /// A grouping transform; skeleton roots carry their skeleton index.
    Transform { skeleton: Option<usize> },
    /// A mesh with its material (`mesh.material`) and optional skin.
    Mesh {
        mesh: IndexedMesh,
        skin: Option<SkinBinding>,
    },
    /// A link to another node's sub-tree instead of a copy of it.
    Reference {
        target: String,
        material_override: Option<usize>,
    },
}

/// An exported node.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SceneNode {
    /// Unique prim path.
    pub path: String,
    /// Index of the parent node; `None` for the root.
    pub parent: Option<usize>,
    /// Local transform, unit converted.
    pub transform: Mat4,
    pub kind: SceneNodeKind,
}

impl SceneNode {
    pub fn mesh(&self) -> Option<&IndexedMesh> {
        match &self.kind {
            SceneNodeKind::Mesh { mesh, .. } => Some(mesh),
            _ => None,
        }
    }
}

/// Result of one export run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ExportOutput {
    /// Nodes in traversal order; parents precede their children.
    pub nodes: Vec<SceneNode>,
    pub materials: Vec<MaterialDescriptor>,
    pub images: Vec<BakedImage>,
    pub skeletons: Vec<SkeletonDescriptor>,
    /// Deduplicated non-fatal problems.
    pub warnings: Vec<ExportWarning>,
}

impl ExportOutput {
    pub fn node(&self, path: &str) -> Option<&SceneNode> {
        self.nodes.iter().find(|n| n.path == path)
    }

    pub fn meshes(&self) -> impl Iterator<Item = &IndexedMesh> {
        self.nodes.iter().filter_map(SceneNode::mesh)
    }

    pub fn mesh_count(&self) -> usize {
        self.meshes().count()
    }

    pub fn total_vertices(&self) -> usize {
        self.meshes().map(IndexedMesh::vertex_count).sum()
    }

    pub fn total_faces(&self) -> usize {
        self.meshes().map(IndexedMesh::face_count).sum()
    }
}
