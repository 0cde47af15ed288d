//! The materialized host scene.
//!
//! The host application's node/vertex/face callbacks are replaced by an
//! already-built tree: [`SourceScene`] owns the node hierarchy together with
//! the surface descriptions and bitmaps the nodes refer to by id. Everything
//! here deserializes from the bundle's `scene.json`.

pub mod bitmap;
pub mod loader;
pub mod mesh;
pub mod motion;
pub mod surface;

pub use bitmap::SourceBitmap;
pub use mesh::{RawMesh, SkinData};
pub use motion::{MotionCurve, MotionKey, MotionSource};
pub use surface::{
    AlphaUsage, BlendMode, ChannelMix, LayerKind, MappingLayer, Projection, SurfaceDescription,
    WrapMode,
};

use crate::types::{BitmapId, JointHandle, NodeHandle, SurfaceId};
use glam::{Mat4, Vec3};
use serde::{Deserialize, Serialize};

/// A complete source scene.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceScene {
    /// Scene name, used for the manifest only.
    pub name: String,
    /// First frame of the animation range.
    pub start_frame: f32,
    /// Last frame of the animation range.
    pub end_frame: f32,
    /// Playback rate of the frame numbers.
    pub frames_per_second: f32,
    /// Top-level nodes.
    pub nodes: Vec<SourceNode>,
    /// Surface (material) descriptions referenced by id.
    pub surfaces: Vec<SurfaceDescription>,
    /// Bitmaps referenced by mapping layers.
    pub bitmaps: Vec<SourceBitmap>,
}

impl Default for SourceScene {
    fn default() -> Self {
        Self {
            name: String::new(),
            start_frame: 0.0,
            end_frame: 0.0,
            frames_per_second: 30.0,
            nodes: Vec::new(),
            surfaces: Vec::new(),
            bitmaps: Vec::new(),
        }
    }
}

impl SourceScene {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a surface description by id.
    pub fn surface(&self, id: SurfaceId) -> Option<&SurfaceDescription> {
        self.surfaces.iter().find(|s| s.id == id)
    }

    /// Look up a bitmap by id.
    pub fn bitmap(&self, id: BitmapId) -> Option<&SourceBitmap> {
        self.bitmaps.iter().find(|b| b.id == id)
    }

    /// Visit every node depth-first, parents before children.
    pub fn walk(&self, mut visit: impl FnMut(&SourceNode, usize)) {
        fn recurse(node: &SourceNode, depth: usize, visit: &mut impl FnMut(&SourceNode, usize)) {
            visit(node, depth);
            for child in &node.children {
                recurse(child, depth + 1, visit);
            }
        }
        for node in &self.nodes {
            recurse(node, 0, &mut visit);
        }
    }

    /// Total node count across the hierarchy.
    pub fn node_count(&self) -> usize {
        let mut count = 0;
        self.walk(|_, _| count += 1);
        count
    }
}

/// A node of the source hierarchy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceNode {
    /// Host handle, required for nodes targeted by instances.
    #[serde(default)]
    pub handle: Option<NodeHandle>,
    pub name: String,
    /// Local transform relative to the parent, in source units.
    #[serde(default = "identity")]
    pub transform: Mat4,
    /// Reverse the winding of every mesh below this node.
    #[serde(default)]
    pub flip_faces: bool,
    #[serde(default)]
    pub kind: SourceNodeKind,
    #[serde(default)]
    pub children: Vec<SourceNode>,
}

fn identity() -> Mat4 {
    Mat4::IDENTITY
}

impl SourceNode {
    /// A group node with the given children.
    pub fn group(name: impl Into<String>, children: Vec<SourceNode>) -> Self {
        Self {
            handle: None,
            name: name.into(),
            transform: Mat4::IDENTITY,
            flip_faces: false,
            kind: SourceNodeKind::Group,
            children,
        }
    }

    /// A mesh node using one surface for all faces.
    pub fn mesh(name: impl Into<String>, mesh: RawMesh, surface: Option<SurfaceId>) -> Self {
        Self {
            kind: SourceNodeKind::Mesh {
                mesh,
                surface,
                face_group_surfaces: Vec::new(),
            },
            ..Self::group(name, Vec::new())
        }
    }

    /// A joint node.
    pub fn joint(name: impl Into<String>, joint: JointData, children: Vec<SourceNode>) -> Self {
        Self {
            kind: SourceNodeKind::Joint(joint),
            ..Self::group(name, children)
        }
    }

    pub fn with_handle(mut self, handle: u64) -> Self {
        self.handle = Some(NodeHandle(handle));
        self
    }

    pub fn with_transform(mut self, transform: Mat4) -> Self {
        self.transform = transform;
        self
    }

    pub fn is_joint(&self) -> bool {
        matches!(self.kind, SourceNodeKind::Joint(_))
    }
}

/// Node payload.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SourceNodeKind {
    /// A plain transform / grouping node.
    #[default]
    Group,
    /// A polygon mesh.
    Mesh {
        mesh: RawMesh,
        /// Surface used by faces without a face group.
        #[serde(default)]
        surface: Option<SurfaceId>,
        /// Surface per face-group id; `None` marks an unresolvable group.
        #[serde(default)]
        face_group_surfaces: Vec<Option<SurfaceId>>,
    },
    /// A rig joint.
    Joint(JointData),
    /// A link to another node's sub-tree.
    Instance {
        target: NodeHandle,
        #[serde(default)]
        surface_override: Option<SurfaceId>,
    },
    /// Lights, cameras and anything else the export ignores.
    Other {
        #[serde(default)]
        what: String,
    },
}

/// Joint kinds known to the host rig.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JointKind {
    /// A bone: motion is applied around the bind matrix and center offset.
    #[default]
    Bone,
    /// A ball joint (rotation only).
    Ball,
    /// A slider joint (translation only).
    Slider,
    /// A plain animated transform.
    Transform,
    /// A path-following joint.
    Path,
    #[serde(other)]
    Unknown,
}

impl JointKind {
    /// Kinds whose motion can be expressed as TRS tracks.
    pub fn is_supported(self) -> bool {
        !matches!(self, JointKind::Path | JointKind::Unknown)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            JointKind::Bone => "bone",
            JointKind::Ball => "ball",
            JointKind::Slider => "slider",
            JointKind::Transform => "transform",
            JointKind::Path => "path",
            JointKind::Unknown => "unknown",
        }
    }
}

/// Rig data attached to a joint node.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct JointData {
    pub kind: JointKind,
    /// Handle used by mesh skin data to reference this joint.
    pub handle: Option<JointHandle>,
    /// Offset of the joint center, added to the motion offset of bones.
    pub center: Vec3,
    /// Motion curve, if the joint is animated.
    pub motion: Option<MotionCurve>,
}

impl JointData {
    pub fn bone(handle: u64) -> Self {
        Self {
            kind: JointKind::Bone,
            handle: Some(JointHandle(handle)),
            ..Self::default()
        }
    }

    pub fn with_motion(mut self, motion: MotionCurve) -> Self {
        self.motion = Some(motion);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scene_json() {
        let json = r#"{
            "name": "demo",
            "end_frame": 20,
            "nodes": [
                { "name": "Group", "children": [
                    { "name": "Light", "kind": { "type": "other", "what": "light" } },
                    { "name": "Hip", "handle": 7,
                      "kind": { "type": "joint", "kind": "bone", "handle": 1 } },
                    { "name": "Link", "kind": { "type": "instance", "target": 7 } }
                ]}
            ],
            "surfaces": [ { "id": 3, "name": "Red", "diffuse_color": [1, 0, 0] } ]
        }"#;
        let scene: SourceScene = serde_json::from_str(json).unwrap();
        assert_eq!(scene.node_count(), 4);
        assert_eq!(scene.frames_per_second, 30.0);
        assert!(scene.nodes[0].children[1].is_joint());
        assert_eq!(scene.nodes[0].transform, Mat4::IDENTITY);
        let surface = scene.surface(SurfaceId(3)).unwrap();
        assert_eq!(surface.diffuse_color, [1.0, 0.0, 0.0]);
        assert_eq!(surface.diffuse_intensity, 1.0);
    }

    #[test]
    fn test_unknown_joint_kind() {
        let data: JointData = serde_json::from_str(r#"{ "kind": "ik_chain" }"#).unwrap();
        assert_eq!(data.kind, JointKind::Unknown);
        assert!(!data.kind.is_supported());
    }

    #[test]
    fn test_walk_depth() {
        let scene = SourceScene {
            nodes: vec![SourceNode::group(
                "a",
                vec![SourceNode::group("b", vec![SourceNode::group("c", vec![])])],
            )],
            ..SourceScene::default()
        };
        let mut depths = Vec::new();
        scene.walk(|node, depth| depths.push((node.name.clone(), depth)));
        assert_eq!(
            depths,
            vec![("a".to_string(), 0), ("b".to_string(), 1), ("c".to_string(), 2)]
        );
    }
}
