//! Depth-first walk of a [`SourceScene`] into an [`ExportOutput`].

use super::{ExportContext, ExportOutput, SceneNode, SceneNodeKind, SkinBinding};
use crate::animation::{SkeletonAssembler, SkeletonDescriptor};
use crate::config::ExportOptions;
use crate::error::ExportWarning;
use crate::material::MaterialBaker;
use crate::mesh::{IndexedMesh, MeshNormalizer, NormalizeOptions, Partition};
use crate::naming::NameKind;
use crate::source::{RawMesh, SourceNode, SourceNodeKind, SourceScene};
use crate::types::{convert_units, JointHandle, NodeHandle, SurfaceId};
use glam::Mat4;
use std::collections::HashMap;

/// Where a source node sits in the walk. Passed by value to each child.
#[derive(Debug, Clone)]
struct TraversalContext {
    /// Index of the exported parent node.
    parent: usize,
    parent_path: String,
    /// World transform of the source parent, in source units.
    world: Mat4,
    /// Transform from the exported parent to the source parent. Non-identity
    /// only below joints, which are folded into their skeleton.
    pending: Mat4,
    /// Accumulated face flip of the ancestors.
    flip: bool,
}

/// Orchestrates naming, mesh normalization, material baking and skeleton
/// assembly for one export run.
pub struct SceneAssembler<'s> {
    scene: &'s SourceScene,
    ctx: ExportContext,
    baker: MaterialBaker<'s>,
    normalizer: MeshNormalizer,
    skeleton_assembler: SkeletonAssembler,
    nodes: Vec<SceneNode>,
    skeletons: Vec<SkeletonDescriptor>,
    /// Final path of every exported node that carries a handle.
    exported: HashMap<NodeHandle, String>,
    /// Reference nodes still waiting for their target path.
    references: Vec<(usize, NodeHandle)>,
    /// Mesh nodes whose skin still has to be bound to a skeleton.
    skinned: Vec<usize>,
}

impl<'s> SceneAssembler<'s> {
    pub fn new(scene: &'s SourceScene, options: ExportOptions) -> Self {
        let normalizer = MeshNormalizer::new(NormalizeOptions {
            subdivision: options.subdivision,
            vertex_colors: options.export_vertex_colors,
            skin: options.export_skin,
        });
        let skeleton_assembler =
            SkeletonAssembler::new(&options, scene.start_frame, scene.end_frame);

        Self {
            scene,
            ctx: ExportContext::new(options),
            baker: MaterialBaker::new(scene),
            normalizer,
            skeleton_assembler,
            nodes: Vec::new(),
            skeletons: Vec::new(),
            exported: HashMap::new(),
            references: Vec::new(),
            skinned: Vec::new(),
        }
    }

    /// Walk the whole scene and return the intermediate model.
    pub fn assemble(mut self) -> ExportOutput {
        let scene = self.scene;
        let root_path = self.ctx.options.root_path();
        let root_path = self.ctx.names.allocate(&root_path, NameKind::Node, false);
        let root = self.push(
            root_path.clone(),
            None,
            Mat4::IDENTITY,
            SceneNodeKind::Transform { skeleton: None },
        );

        let traversal = TraversalContext {
            parent: root,
            parent_path: root_path,
            world: Mat4::IDENTITY,
            pending: Mat4::IDENTITY,
            flip: false,
        };
        for node in &scene.nodes {
            self.visit(node, traversal.clone());
        }

        self.resolve_references();
        self.resolve_skins();
        self.ctx.drop_unreferenced_images();

        let warnings = self.ctx.take_warnings();
        for warning in &warnings {
            tracing::warn!("{}", warning);
        }

        let output = ExportOutput {
            nodes: self.nodes,
            materials: self.ctx.materials,
            images: self.ctx.images,
            skeletons: self.skeletons,
            warnings,
        };
        tracing::info!(
            "Exported {} nodes ({} meshes, {} vertices), {} materials, {} images, {} skeletons",
            output.nodes.len(),
            output.mesh_count(),
            output.total_vertices(),
            output.materials.len(),
            output.images.len(),
            output.skeletons.len()
        );
        output
    }

    fn visit(&mut self, node: &'s SourceNode, traversal: TraversalContext) {
        if node.is_joint() {
            self.visit_skeleton(node, traversal);
            return;
        }

        let local = traversal.pending * node.transform;
        let transform = convert_units(local, self.ctx.options.unit_scale);
        let flip = traversal.flip ^ node.flip_faces;

        let (index, path) = match &node.kind {
            SourceNodeKind::Mesh {
                mesh,
                surface,
                face_group_surfaces,
            } => {
                let path = self.allocate(&traversal.parent_path, &node.name, NameKind::Mesh);
                let partition = self.partition(*surface, face_group_surfaces);
                let index =
                    self.emit_mesh(mesh, &partition, &path, traversal.parent, transform, flip);
                (index, path)
            }
            SourceNodeKind::Instance {
                target,
                surface_override,
            } => {
                let path = self.allocate(&traversal.parent_path, &node.name, NameKind::Node);
                let material_override = self.bake_surface(*surface_override);
                let index = self.push(
                    path.clone(),
                    Some(traversal.parent),
                    transform,
                    SceneNodeKind::Reference {
                        target: String::new(),
                        material_override,
                    },
                );
                self.references.push((index, *target));
                (index, path)
            }
            SourceNodeKind::Group | SourceNodeKind::Other { .. } | SourceNodeKind::Joint(_) => {
                if let SourceNodeKind::Other { what } = &node.kind {
                    tracing::debug!("{} ({}) exported as a plain transform", node.name, what);
                }
                let path = self.allocate(&traversal.parent_path, &node.name, NameKind::Node);
                let index = self.push(
                    path.clone(),
                    Some(traversal.parent),
                    transform,
                    SceneNodeKind::Transform { skeleton: None },
                );
                (index, path)
            }
        };

        if let Some(handle) = node.handle {
            self.exported.insert(handle, path.clone());
        }

        let world = traversal.world * node.transform;
        for child in &node.children {
            self.visit(
                child,
                TraversalContext {
                    parent: index,
                    parent_path: path.clone(),
                    world,
                    pending: Mat4::IDENTITY,
                    flip,
                },
            );
        }
    }

    /// Export a joint hierarchy as one skeleton node.
    ///
    /// The skeleton node sits in the frame of the joint's parent; the root
    /// joint's own transform is its rest pose. Non-joint descendants hang
    /// off the skeleton node with the joint chain above them folded into
    /// their transform.
    fn visit_skeleton(&mut self, node: &'s SourceNode, traversal: TraversalContext) {
        let path = self.allocate(&traversal.parent_path, &node.name, NameKind::Bone);
        let skeleton =
            self.skeleton_assembler
                .assemble(&mut self.ctx, node, traversal.world, &path);

        let transform = convert_units(traversal.pending, self.ctx.options.unit_scale);
        let index = self.push(
            path.clone(),
            Some(traversal.parent),
            transform,
            SceneNodeKind::Transform {
                skeleton: Some(self.skeletons.len()),
            },
        );
        self.skeletons.push(skeleton);

        if let Some(handle) = node.handle {
            self.exported.insert(handle, path.clone());
        }

        self.visit_joint_children(
            node,
            index,
            &path,
            traversal.world * node.transform,
            traversal.pending * node.transform,
            traversal.flip ^ node.flip_faces,
        );
    }

    fn visit_joint_children(
        &mut self,
        joint: &'s SourceNode,
        skeleton_node: usize,
        skeleton_path: &str,
        world: Mat4,
        from_skeleton: Mat4,
        flip: bool,
    ) {
        for child in &joint.children {
            if child.is_joint() {
                if let Some(handle) = child.handle {
                    self.exported.insert(handle, skeleton_path.to_string());
                }
                self.visit_joint_children(
                    child,
                    skeleton_node,
                    skeleton_path,
                    world * child.transform,
                    from_skeleton * child.transform,
                    flip ^ child.flip_faces,
                );
            } else {
                self.visit(
                    child,
                    TraversalContext {
                        parent: skeleton_node,
                        parent_path: skeleton_path.to_string(),
                        world,
                        pending: from_skeleton,
                        flip,
                    },
                );
            }
        }
    }

    /// Normalize a mesh and emit it. Several partitions become child meshes
    /// of a transform at `path`; a mesh without usable faces still emits a
    /// transform so its children keep a parent.
    fn emit_mesh(
        &mut self,
        raw: &RawMesh,
        partition: &Partition,
        path: &str,
        parent: usize,
        transform: Mat4,
        flip: bool,
    ) -> usize {
        let meshes = match self.normalizer.normalize(raw, partition, flip) {
            Ok(meshes) => meshes,
            Err(e) => {
                self.ctx.warn(ExportWarning::SkippedMesh {
                    path: path.to_string(),
                    reason: e.to_string(),
                });
                Vec::new()
            }
        };
        let mut meshes: Vec<IndexedMesh> =
            meshes.into_iter().map(|mesh| self.prepare_mesh(mesh)).collect();

        match meshes.len() {
            0 => {
                tracing::debug!("{} has no usable faces", path);
                self.push(
                    path.to_string(),
                    Some(parent),
                    transform,
                    SceneNodeKind::Transform { skeleton: None },
                )
            }
            1 => {
                let mesh = meshes.remove(0);
                self.push_mesh(path.to_string(), parent, transform, mesh)
            }
            _ => {
                let group = self.push(
                    path.to_string(),
                    Some(parent),
                    transform,
                    SceneNodeKind::Transform { skeleton: None },
                );
                for mesh in meshes {
                    let name = mesh
                        .surface
                        .and_then(|id| self.scene.surface(id))
                        .map(|s| s.name.as_str())
                        .unwrap_or("mesh");
                    let child = self.allocate(path, name, NameKind::Mesh);
                    self.push_mesh(child, group, Mat4::IDENTITY, mesh);
                }
                group
            }
        }
    }

    fn prepare_mesh(&mut self, mut mesh: IndexedMesh) -> IndexedMesh {
        mesh.scale_positions(self.ctx.options.unit_scale);
        mesh.material = self.bake_surface(mesh.surface);
        mesh
    }

    fn push_mesh(&mut self, path: String, parent: usize, transform: Mat4, mesh: IndexedMesh) -> usize {
        let skinned = mesh.is_skinned();
        let index = self.push(
            path,
            Some(parent),
            transform,
            SceneNodeKind::Mesh { mesh, skin: None },
        );
        if skinned {
            self.skinned.push(index);
        }
        index
    }

    /// Surfaces that do not exist in the scene count as unresolvable.
    fn partition(&self, surface: Option<SurfaceId>, groups: &[Option<SurfaceId>]) -> Partition {
        let resolve = |id: Option<SurfaceId>| id.filter(|id| self.scene.surface(*id).is_some());
        Partition {
            default_surface: resolve(surface),
            group_surfaces: groups.iter().map(|g| resolve(*g)).collect(),
        }
    }

    fn bake_surface(&mut self, surface: Option<SurfaceId>) -> Option<usize> {
        let scene = self.scene;
        let surface = scene.surface(surface?)?;
        Some(self.baker.bake(&mut self.ctx, surface))
    }

    fn allocate(&mut self, parent_path: &str, name: &str, kind: NameKind) -> String {
        let name = if name.is_empty() {
            kind.fallback().to_string()
        } else {
            name.replace('/', "_")
        };
        self.ctx
            .names
            .allocate(&format!("{}/{}", parent_path, name), kind, false)
    }

    fn push(
        &mut self,
        path: String,
        parent: Option<usize>,
        transform: Mat4,
        kind: SceneNodeKind,
    ) -> usize {
        tracing::debug!("node {}", path);
        self.nodes.push(SceneNode {
            path,
            parent,
            transform,
            kind,
        });
        self.nodes.len() - 1
    }

    fn resolve_references(&mut self) {
        for (index, target) in std::mem::take(&mut self.references) {
            let node = &mut self.nodes[index];
            match self.exported.get(&target) {
                Some(path) => {
                    if let SceneNodeKind::Reference { target, .. } = &mut node.kind {
                        *target = path.clone();
                    }
                }
                None => {
                    self.ctx.warn(ExportWarning::DanglingReference {
                        path: node.path.clone(),
                    });
                    node.kind = SceneNodeKind::Transform { skeleton: None };
                }
            }
        }
    }

    fn resolve_skins(&mut self) {
        let mut joints: HashMap<JointHandle, (usize, u32)> = HashMap::new();
        for (s, skeleton) in self.skeletons.iter().enumerate() {
            for (j, joint) in skeleton.joints.iter().enumerate() {
                if let Some(handle) = joint.handle {
                    joints.entry(handle).or_insert((s, j as u32));
                }
            }
        }

        for index in std::mem::take(&mut self.skinned) {
            let node = &mut self.nodes[index];
            let SceneNodeKind::Mesh { mesh, skin } = &mut node.kind else {
                continue;
            };
            match bind_skin(mesh, &joints) {
                Some(binding) => *skin = Some(binding),
                None => {
                    self.ctx.warn(ExportWarning::UnresolvedJoint {
                        path: node.path.clone(),
                    });
                    mesh.skin_weights.clear();
                    mesh.skin_joints.clear();
                }
            }
        }
    }
}

/// Map a mesh's joint handles to indices of a single skeleton.
///
/// Fails when a handle is unknown, when influences span several skeletons,
/// or when no influence references a joint at all.
fn bind_skin(
    mesh: &IndexedMesh,
    joints: &HashMap<JointHandle, (usize, u32)>,
) -> Option<SkinBinding> {
    let mut skeleton = None;
    let mut joint_indices = Vec::with_capacity(mesh.skin_joints.len());
    for influences in &mesh.skin_joints {
        let mut indices = [0u32; 4];
        for (slot, handle) in influences.iter().enumerate() {
            let Some(handle) = handle else {
                continue;
            };
            let &(s, j) = joints.get(handle)?;
            if *skeleton.get_or_insert(s) != s {
                return None;
            }
            indices[slot] = j;
        }
        joint_indices.push(indices);
    }
    Some(SkinBinding {
        skeleton: skeleton?,
        joint_indices,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::{JointData, MappingLayer, SkinData, SurfaceDescription};
    use crate::types::BitmapId;
    use glam::Vec3;

    fn quad() -> RawMesh {
        let mut mesh = RawMesh::new();
        mesh.positions = vec![
            [0.0, 0.0, 0.0],
            [10.0, 0.0, 0.0],
            [10.0, 10.0, 0.0],
            [0.0, 10.0, 0.0],
        ];
        mesh.add_face(&[0, 1, 2, 3], &[[0.0, 0.0, 1.0]; 4]);
        mesh
    }

    fn export(scene: &SourceScene) -> ExportOutput {
        SceneAssembler::new(scene, ExportOptions::default()).assemble()
    }

    #[test]
    fn test_single_quad() {
        let scene = SourceScene {
            nodes: vec![SourceNode::mesh("Quad", quad(), Some(SurfaceId(1)))],
            surfaces: vec![SurfaceDescription::new(1, "Plain")],
            ..SourceScene::default()
        };
        let output = export(&scene);

        assert_eq!(output.nodes.len(), 2);
        assert_eq!(output.nodes[0].path, "/Root");
        let node = output.node("/Root/Quad").unwrap();
        assert_eq!(node.parent, Some(0));
        let mesh = node.mesh().unwrap();
        assert_eq!(mesh.vertex_count(), 4);
        assert_eq!(mesh.face_vertex_counts, vec![4]);
        assert_eq!(mesh.face_indices, vec![0, 1, 2, 3]);
        assert_eq!(mesh.positions[2], [1.0, 1.0, 0.0]);
        assert_eq!(mesh.material, Some(0));

        assert_eq!(output.materials.len(), 1);
        assert_eq!(output.materials[0].name, "/Root/Materials/Plain");
        assert!(!output.materials[0].has_textures());
        assert!(output.images.is_empty());
        assert!(output.warnings.is_empty());
    }

    #[test]
    fn test_translation_is_unit_converted() {
        let node = SourceNode::group("Offset", vec![])
            .with_transform(Mat4::from_translation(Vec3::new(100.0, 0.0, -20.0)));
        let scene = SourceScene {
            nodes: vec![node],
            ..SourceScene::default()
        };
        let output = export(&scene);
        let (_, _, translation) = output.nodes[1].transform.to_scale_rotation_translation();
        assert!((translation - Vec3::new(10.0, 0.0, -2.0)).length() < 1e-5);
    }

    #[test]
    fn test_sibling_names_are_unique() {
        let scene = SourceScene {
            nodes: vec![
                SourceNode::group("Box", vec![]),
                SourceNode::group("Box", vec![]),
                SourceNode::group("", vec![]),
            ],
            ..SourceScene::default()
        };
        let output = export(&scene);
        let paths: Vec<&str> = output.nodes.iter().map(|n| n.path.as_str()).collect();
        assert_eq!(paths, vec!["/Root", "/Root/Box", "/Root/Box_1", "/Root/node"]);
    }

    #[test]
    fn test_shared_surface_is_baked_once() {
        let scene = SourceScene {
            nodes: vec![
                SourceNode::mesh("A", quad(), Some(SurfaceId(1))),
                SourceNode::mesh("B", quad(), Some(SurfaceId(1))),
            ],
            surfaces: vec![SurfaceDescription::new(1, "Shared")],
            ..SourceScene::default()
        };
        let output = export(&scene);
        assert_eq!(output.materials.len(), 1);
        assert_eq!(output.materials[0].ref_count, 2);
        assert_eq!(output.mesh_count(), 2);
    }

    #[test]
    fn test_face_groups_split_under_transform() {
        let mut mesh = quad();
        mesh.positions.push([20.0, 0.0, 0.0]);
        mesh.add_face(&[1, 4, 2], &[[0.0, 0.0, 1.0]; 3]);
        mesh.face_groups = vec![None, Some(0)];

        let mut node = SourceNode::mesh("Split", mesh, Some(SurfaceId(1)));
        if let SourceNodeKind::Mesh {
            face_group_surfaces,
            ..
        } = &mut node.kind
        {
            *face_group_surfaces = vec![Some(SurfaceId(2))];
        }
        let scene = SourceScene {
            nodes: vec![node],
            surfaces: vec![
                SurfaceDescription::new(1, "Body"),
                SurfaceDescription::new(2, "Trim"),
            ],
            ..SourceScene::default()
        };
        let output = export(&scene);

        let group = output.node("/Root/Split").unwrap();
        assert_eq!(group.kind, SceneNodeKind::Transform { skeleton: None });
        let body = output.node("/Root/Split/Body").unwrap().mesh().unwrap();
        let trim = output.node("/Root/Split/Trim").unwrap().mesh().unwrap();
        assert_eq!(body.vertex_count(), 4);
        assert_eq!(trim.vertex_count(), 3);
        assert_ne!(body.material, trim.material);
        assert_eq!(output.total_faces(), 2);
    }

    #[test]
    fn test_broken_mesh_is_skipped_with_warning() {
        let mut mesh = quad();
        mesh.face_indices[3] = 9;
        let scene = SourceScene {
            nodes: vec![SourceNode::mesh("Broken", mesh, None)],
            ..SourceScene::default()
        };
        let output = export(&scene);
        assert_eq!(output.mesh_count(), 0);
        assert_eq!(
            output.node("/Root/Broken").unwrap().kind,
            SceneNodeKind::Transform { skeleton: None }
        );
        assert!(matches!(
            &output.warnings[..],
            [ExportWarning::SkippedMesh { path, .. }] if path == "/Root/Broken"
        ));
    }

    #[test]
    fn test_instances_become_references() {
        let scene = SourceScene {
            nodes: vec![
                SourceNode::mesh("Prop", quad(), None).with_handle(5),
                SourceNode {
                    kind: SourceNodeKind::Instance {
                        target: NodeHandle(5),
                        surface_override: Some(SurfaceId(1)),
                    },
                    ..SourceNode::group("Copy", vec![])
                },
                SourceNode {
                    kind: SourceNodeKind::Instance {
                        target: NodeHandle(99),
                        surface_override: None,
                    },
                    ..SourceNode::group("Lost", vec![])
                },
            ],
            surfaces: vec![SurfaceDescription::new(1, "Override")],
            ..SourceScene::default()
        };
        let output = export(&scene);

        assert_eq!(output.mesh_count(), 1);
        assert_eq!(
            output.node("/Root/Copy").unwrap().kind,
            SceneNodeKind::Reference {
                target: "/Root/Prop".to_string(),
                material_override: Some(0),
            }
        );
        assert_eq!(
            output.node("/Root/Lost").unwrap().kind,
            SceneNodeKind::Transform { skeleton: None }
        );
        assert_eq!(
            output.warnings,
            vec![ExportWarning::DanglingReference {
                path: "/Root/Lost".to_string()
            }]
        );
    }

    fn rigged_scene(skin_handle: u64) -> SourceScene {
        let mut mesh = quad();
        mesh.skin = Some(SkinData {
            weights: vec![[1.0, 0.0, 0.0, 0.0]; 4],
            joints: vec![
                [Some(JointHandle(1)), None, None, None],
                [Some(JointHandle(1)), None, None, None],
                [Some(JointHandle(skin_handle)), None, None, None],
                [Some(JointHandle(skin_handle)), None, None, None],
            ],
        });
        let hand = SourceNode::joint(
            "Hand",
            JointData::bone(2),
            vec![SourceNode::group("Glove", vec![])],
        )
        .with_transform(Mat4::from_translation(Vec3::new(10.0, 0.0, 0.0)));
        let arm = SourceNode::joint("Arm", JointData::bone(1), vec![hand]);
        SourceScene {
            nodes: vec![
                SourceNode::group("Rig", vec![arm]),
                SourceNode::mesh("Skin", mesh, None),
            ],
            ..SourceScene::default()
        }
    }

    #[test]
    fn test_skeleton_and_skin_binding() {
        let output = export(&rigged_scene(2));

        assert_eq!(output.skeletons.len(), 1);
        let skeleton = &output.skeletons[0];
        assert_eq!(skeleton.root, "/Root/Rig/Arm");
        assert_eq!(skeleton.joints.len(), 2);
        assert_eq!(skeleton.joints[1].name, "Arm/Hand");
        assert_eq!(
            output.node("/Root/Rig/Arm").unwrap().kind,
            SceneNodeKind::Transform { skeleton: Some(0) }
        );

        // Non-joint children of joints hang off the skeleton node.
        let glove = output.node("/Root/Rig/Arm/Glove").unwrap();
        let (_, _, translation) = glove.transform.to_scale_rotation_translation();
        assert!((translation - Vec3::new(1.0, 0.0, 0.0)).length() < 1e-5);

        let SceneNodeKind::Mesh { skin, .. } = &output.node("/Root/Skin").unwrap().kind else {
            panic!("expected a mesh node");
        };
        let skin = skin.as_ref().unwrap();
        assert_eq!(skin.skeleton, 0);
        assert_eq!(skin.joint_indices[0], [0, 0, 0, 0]);
        assert_eq!(skin.joint_indices[2], [1, 0, 0, 0]);
        assert!(output.warnings.is_empty());
    }

    #[test]
    fn test_unresolved_joint_drops_skin() {
        let output = export(&rigged_scene(42));
        let node = output.node("/Root/Skin").unwrap();
        let SceneNodeKind::Mesh { mesh, skin } = &node.kind else {
            panic!("expected a mesh node");
        };
        assert!(skin.is_none());
        assert!(!mesh.is_skinned());
        assert_eq!(
            output.warnings,
            vec![ExportWarning::UnresolvedJoint {
                path: "/Root/Skin".to_string()
            }]
        );
    }

    #[test]
    fn test_skin_disabled() {
        let scene = rigged_scene(2);
        let options = ExportOptions {
            export_skin: false,
            ..ExportOptions::default()
        };
        let output = SceneAssembler::new(&scene, options).assemble();
        let SceneNodeKind::Mesh { mesh, skin } = &output.node("/Root/Skin").unwrap().kind else {
            panic!("expected a mesh node");
        };
        assert!(skin.is_none());
        assert!(!mesh.is_skinned());
        assert!(output.warnings.is_empty());
    }

    #[test]
    fn test_missing_bitmap_is_reported_once() {
        let surface = SurfaceDescription::new(1, "Painted")
            .with_layer(MappingLayer::image(crate::source::LayerKind::Diffuse, BitmapId(7)));
        let scene = SourceScene {
            nodes: vec![
                SourceNode::mesh("A", quad(), Some(SurfaceId(1))),
                SourceNode::mesh("B", quad(), Some(SurfaceId(1))),
            ],
            surfaces: vec![surface],
            ..SourceScene::default()
        };
        let output = export(&scene);
        assert_eq!(output.warnings.len(), 1);
        assert!(matches!(output.warnings[0], ExportWarning::MissingBitmap { .. }));
    }

    #[test]
    fn test_every_image_is_bound() {
        use crate::material::ChannelKind;
        use crate::source::{LayerKind, SourceBitmap};

        let bitmap = |id, file: &str, value| {
            let pixels = image::RgbaImage::from_pixel(2, 2, image::Rgba([value, value, value, 255]));
            SourceBitmap::from_file(id, file, pixels)
        };
        let mut metal = SurfaceDescription::new(1, "Metal")
            .with_layer(MappingLayer::image(LayerKind::Diffuse, BitmapId(1)))
            .with_layer(MappingLayer::image(LayerKind::Reflection, BitmapId(2)));
        metal.reflection = 1.0;
        let paint = SurfaceDescription::new(2, "Paint")
            .with_layer(MappingLayer::image(LayerKind::Diffuse, BitmapId(1)));
        let scene = SourceScene {
            nodes: vec![
                SourceNode::mesh("A", quad(), Some(SurfaceId(1))),
                SourceNode::mesh("B", quad(), Some(SurfaceId(2))),
            ],
            surfaces: vec![metal, paint],
            bitmaps: vec![bitmap(1, "steel.png", 40), bitmap(2, "refl.png", 200)],
            ..SourceScene::default()
        };
        let output = export(&scene);

        // The reflection bitmap only fed the shading remap.
        let names: Vec<&str> = output.images.iter().map(|i| i.file_name.as_str()).collect();
        assert_eq!(names, vec!["steel.png", "steel_basecolor.png", "steel_metallic.png"]);

        let mut bound: Vec<usize> = output
            .materials
            .iter()
            .flat_map(|m| m.textures.values().map(|b| b.image))
            .collect();
        bound.sort_unstable();
        bound.dedup();
        assert_eq!(bound, (0..output.images.len()).collect::<Vec<_>>());

        let paint = &output.materials[1];
        let diffuse = paint.texture(ChannelKind::Diffuse).unwrap();
        assert_eq!(output.images[diffuse.image].file_name, "steel.png");
    }
}
