//! Skeleton assembly: timeline merge and Euler continuity.

use super::sampler::{sample_joint, SamplePolicy};
use super::{JointDescriptor, JointTracks, Keyframe, RotationKey, SkeletonDescriptor};
use crate::config::{ExportOptions, KeyframeMode};
use crate::error::ExportWarning;
use crate::naming::{NameKind, NameRegistry};
use crate::scene::ExportContext;
use crate::source::{SourceNode, SourceNodeKind};
use crate::types::{convert_units, has_shear};
use glam::{EulerRot, Mat4, Quat, Vec3};

/// Merge per-joint keyframes onto one timeline.
///
/// Returns the sorted union of all frames and, per joint, one value per
/// global frame: the native keyframe, an interpolation between the nearest
/// native keyframes on both sides, the nearest one when only one side
/// exists, or `None` for joints without keyframes.
pub fn merge_joint_timelines(joints: &[Vec<Keyframe>]) -> (Vec<f32>, Vec<Vec<Option<Keyframe>>>) {
    let mut frames: Vec<f32> = joints.iter().flatten().map(|k| k.frame).collect();
    frames.sort_by(|a, b| a.total_cmp(b));
    frames.dedup();

    let values = joints
        .iter()
        .map(|keys| frames.iter().map(|&frame| value_at(keys, frame)).collect())
        .collect();
    (frames, values)
}

fn value_at(keys: &[Keyframe], frame: f32) -> Option<Keyframe> {
    if let Some(key) = keys.iter().find(|k| k.frame == frame) {
        return Some(*key);
    }
    let before = keys
        .iter()
        .filter(|k| k.frame < frame)
        .max_by(|a, b| a.frame.total_cmp(&b.frame));
    let after = keys
        .iter()
        .filter(|k| k.frame > frame)
        .min_by(|a, b| a.frame.total_cmp(&b.frame));

    match (before, after) {
        (Some(a), Some(b)) => Some(a.lerp(b, frame)),
        (Some(k), None) | (None, Some(k)) => Some(Keyframe { frame, ..*k }),
        (None, None) => None,
    }
}

/// Convert quaternions to Euler angles (degrees, XYZ) without wrap jumps.
///
/// Whenever an axis jumps by more than 180 degrees between consecutive
/// samples, that sample and every later one are shifted by a full turn in
/// the direction that shortens the jump.
pub fn quaternion_to_continuous_euler(track: &[Quat]) -> Vec<Vec3> {
    let mut out: Vec<Vec3> = Vec::with_capacity(track.len());
    let mut shift = Vec3::ZERO;

    for q in track {
        let (x, y, z) = q.normalize().to_euler(EulerRot::XYZ);
        let raw = Vec3::new(x.to_degrees(), y.to_degrees(), z.to_degrees());
        let mut euler = raw + shift;

        if let Some(prev) = out.last() {
            for axis in 0..3 {
                while euler[axis] - prev[axis] > 180.0 {
                    euler[axis] -= 360.0;
                    shift[axis] -= 360.0;
                }
                while euler[axis] - prev[axis] < -180.0 {
                    euler[axis] += 360.0;
                    shift[axis] += 360.0;
                }
            }
        }
        out.push(euler);
    }
    out
}

/// Builds [`SkeletonDescriptor`]s from joint hierarchies.
#[derive(Debug, Clone)]
pub struct SkeletonAssembler {
    policy: Option<SamplePolicy>,
    unit_scale: f32,
}

/// A joint collected from the hierarchy, before timeline merging.
struct CollectedJoint {
    descriptor: JointDescriptor,
    keyframes: Vec<Keyframe>,
}

impl SkeletonAssembler {
    /// Sample over `[start, end]` following the keyframe mode in `options`.
    pub fn new(options: &ExportOptions, start: f32, end: f32) -> Self {
        let policy = match options.keyframes {
            KeyframeMode::None => None,
            KeyframeMode::Native | KeyframeMode::Step => Some(SamplePolicy {
                step: options.sample_step(),
                ..SamplePolicy::native(start, end)
            }),
        };
        Self {
            policy,
            unit_scale: options.unit_scale,
        }
    }

    /// Build the skeleton rooted at the joint node `root`.
    ///
    /// `parent_world` is the world transform of the root's parent, in source
    /// units; `root_path` the prim path allocated for the root.
    pub fn assemble(
        &self,
        ctx: &mut ExportContext,
        root: &SourceNode,
        parent_world: Mat4,
        root_path: &str,
    ) -> SkeletonDescriptor {
        let parent_path = root_path.rsplit_once('/').map(|(p, _)| p).unwrap_or("");
        let mut names = NameRegistry::new();
        let mut joints = Vec::new();
        self.collect(ctx, root, None, parent_world, parent_path, &mut names, &mut joints);

        let timelines: Vec<Vec<Keyframe>> = joints.iter().map(|j| j.keyframes.clone()).collect();
        let (frames, values) = merge_joint_timelines(&timelines);

        let joints: Vec<JointDescriptor> = joints
            .into_iter()
            .zip(values)
            .map(|(joint, values)| {
                let mut descriptor = joint.descriptor;
                descriptor.tracks = self.tracks(&values);
                descriptor
            })
            .collect();

        tracing::info!(
            "Skeleton {}: {} joints, {} frames",
            root_path,
            joints.len(),
            frames.len()
        );

        SkeletonDescriptor {
            root: root_path.to_string(),
            joints,
            frames,
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn collect(
        &self,
        ctx: &mut ExportContext,
        node: &SourceNode,
        parent_name: Option<&str>,
        parent_world: Mat4,
        parent_path: &str,
        names: &mut NameRegistry,
        out: &mut Vec<CollectedJoint>,
    ) {
        let SourceNodeKind::Joint(data) = &node.kind else {
            return;
        };

        let candidate = match parent_name {
            Some(parent) => format!("{}/{}", parent, node.name),
            None => node.name.clone(),
        };
        let name = names.allocate(&candidate, NameKind::Bone, false);
        let path = format!("{}/{}", parent_path, name);

        let local = node.transform;
        let world = parent_world * local;
        if has_shear(local) || has_shear(world) {
            ctx.warn(ExportWarning::Shear { path: path.clone() });
        }

        let keyframes = match (&data.motion, &self.policy) {
            _ if !data.kind.is_supported() => {
                ctx.warn(ExportWarning::UnsupportedJoint {
                    path: path.clone(),
                    kind: data.kind.as_str().to_string(),
                });
                Vec::new()
            }
            (Some(motion), Some(policy)) => sample_joint(motion, data, local, policy),
            _ => Vec::new(),
        };

        out.push(CollectedJoint {
            descriptor: JointDescriptor {
                name: name.clone(),
                kind: data.kind,
                handle: data.handle,
                bind: convert_units(world, self.unit_scale),
                rest: convert_units(local, self.unit_scale),
                tracks: JointTracks::default(),
            },
            keyframes,
        });

        for child in &node.children {
            self.collect(ctx, child, Some(&name), world, parent_path, names, out);
        }
    }

    fn tracks(&self, values: &[Option<Keyframe>]) -> JointTracks {
        let present: Vec<&Keyframe> = values.iter().flatten().collect();
        if present.is_empty() {
            return JointTracks::default();
        }

        let rotations: Vec<Quat> = present.iter().map(|k| k.rotation).collect();
        let euler = quaternion_to_continuous_euler(&rotations);

        JointTracks {
            translation: present
                .iter()
                .map(|k| (k.frame, k.translation * self.unit_scale))
                .collect(),
            rotation: present
                .iter()
                .zip(euler)
                .map(|(k, euler)| RotationKey {
                    frame: k.frame,
                    rotation: k.rotation,
                    euler,
                })
                .collect(),
            scale: present.iter().map(|k| (k.frame, k.scale)).collect(),
        }
    }
}
