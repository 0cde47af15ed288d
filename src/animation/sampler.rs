//! Per-joint keyframe sampling.

use super::Keyframe;
use crate::source::{JointData, JointKind, MotionKey, MotionSource};
use crate::types::decompose;
use glam::{EulerRot, Mat4, Quat, Vec3};

/// Frame range and optional fixed step for sampling.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SamplePolicy {
    pub start: f32,
    pub end: f32,
    /// Extra samples every `step` frames from `start`.
    pub step: Option<f32>,
}

impl SamplePolicy {
    pub fn native(start: f32, end: f32) -> Self {
        Self {
            start,
            end,
            step: None,
        }
    }

    pub fn with_step(mut self, step: f32) -> Self {
        self.step = (step > 0.0).then_some(step);
        self
    }
}

/// Motion keys of `motion` at the sampled frames, ascending.
///
/// Native keys inside `[start, end]` are read first (the first key wins for
/// equal frames). Step samples at `start + k * step` below `end` are added
/// where no key exists yet.
pub fn sample_keys(motion: &dyn MotionSource, policy: &SamplePolicy) -> Vec<MotionKey> {
    let mut keys: Vec<MotionKey> = Vec::with_capacity(motion.key_count());
    for index in 0..motion.key_count() {
        let Some(key) = motion.key(index) else {
            continue;
        };
        if key.frame < policy.start || key.frame > policy.end {
            continue;
        }
        if keys.iter().any(|k| k.frame == key.frame) {
            continue;
        }
        keys.push(key);
    }

    if let Some(step) = policy.step {
        let mut k = 0u32;
        loop {
            let frame = policy.start + k as f32 * step;
            if frame >= policy.end {
                break;
            }
            if !keys.iter().any(|key| key.frame == frame) {
                if let Some(key) = motion.evaluate(frame) {
                    keys.push(key);
                }
            }
            k += 1;
        }
    }

    keys.sort_by(|a, b| a.frame.total_cmp(&b.frame));
    keys
}

/// Rotation of a motion key (Euler degrees, XYZ).
pub fn motion_rotation(key: &MotionKey) -> Quat {
    let r = key.rotation;
    Quat::from_euler(
        EulerRot::XYZ,
        r.x.to_radians(),
        r.y.to_radians(),
        r.z.to_radians(),
    )
}

/// The joint's composite local transform for one motion key.
///
/// Bones couple motion and bind pose as `rotate(motion) * local *
/// translate(offset + center)`; other joint kinds apply the motion as a TRS
/// after the local transform.
pub fn joint_matrix(joint: &JointData, local: Mat4, key: &MotionKey) -> Mat4 {
    let rotation = motion_rotation(key);
    match joint.kind {
        JointKind::Bone => {
            Mat4::from_quat(rotation)
                * local
                * Mat4::from_translation(key.offset + joint.center)
                * Mat4::from_scale(key.scale)
        }
        _ => local * Mat4::from_scale_rotation_translation(key.scale, rotation, key.offset),
    }
}

/// Sample a joint's motion into decomposed keyframes in source units.
///
/// Returns no keyframes when the joint has no motion or no motion points.
pub fn sample_joint(
    motion: &dyn MotionSource,
    joint: &JointData,
    local: Mat4,
    policy: &SamplePolicy,
) -> Vec<Keyframe> {
    sample_keys(motion, policy)
        .iter()
        .map(|key| {
            let trs = decompose(joint_matrix(joint, local, key));
            Keyframe {
                frame: key.frame,
                translation: trs.translation,
                rotation: trs.rotation,
                scale: trs.scale,
            }
        })
        .collect()
}
