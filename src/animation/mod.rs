//! Skeletons and joint animation.
//!
//! Joint motion curves are sampled per joint ([`sampler`]), merged onto one
//! timeline per skeleton and converted to continuous Euler angles
//! ([`skeleton`]).

pub mod sampler;
pub mod skeleton;

pub use sampler::{sample_joint, sample_keys, SamplePolicy};
pub use skeleton::{merge_joint_timelines, quaternion_to_continuous_euler, SkeletonAssembler};

use crate::source::JointKind;
use crate::types::JointHandle;
use glam::{Mat4, Quat, Vec3, Vec4};
use serde::{Deserialize, Serialize};

/// A decomposed joint pose at one frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Keyframe {
    pub frame: f32,
    pub translation: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Keyframe {
    /// Interpolate towards `other` at `frame`.
    ///
    /// Quaternions are interpolated component-wise and not renormalized.
    pub fn lerp(&self, other: &Keyframe, frame: f32) -> Keyframe {
        let span = other.frame - self.frame;
        let t = if span.abs() < f32::EPSILON {
            0.0
        } else {
            (frame - self.frame) / span
        };
        let rotation = Vec4::from(self.rotation).lerp(Vec4::from(other.rotation), t);
        Keyframe {
            frame,
            translation: self.translation.lerp(other.translation, t),
            rotation: Quat::from_vec4(rotation),
            scale: self.scale.lerp(other.scale, t),
        }
    }
}

/// A rotation sample with its continuity-corrected Euler angles (degrees, XYZ).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RotationKey {
    pub frame: f32,
    pub rotation: Quat,
    pub euler: Vec3,
}

/// Animation tracks of one joint, translations already unit converted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JointTracks {
    pub translation: Vec<(f32, Vec3)>,
    pub rotation: Vec<RotationKey>,
    pub scale: Vec<(f32, Vec3)>,
}

impl JointTracks {
    pub fn is_empty(&self) -> bool {
        self.translation.is_empty() && self.rotation.is_empty() && self.scale.is_empty()
    }
}

/// One joint of a skeleton.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JointDescriptor {
    /// Path relative to the skeleton root, e.g. `Hip/Knee`.
    pub name: String,
    pub kind: JointKind,
    /// Host handle referenced by mesh skin data.
    pub handle: Option<JointHandle>,
    /// World transform, unit converted.
    pub bind: Mat4,
    /// Local transform relative to the parent joint, unit converted.
    pub rest: Mat4,
    pub tracks: JointTracks,
}

/// A skeleton built from one joint hierarchy.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SkeletonDescriptor {
    /// Prim path of the skeleton root, assigned during scene assembly.
    pub root: String,
    /// Joints, parents before children.
    pub joints: Vec<JointDescriptor>,
    /// Merged timeline of all joints.
    pub frames: Vec<f32>,
}

impl SkeletonDescriptor {
    pub fn joint_index(&self, handle: JointHandle) -> Option<usize> {
        self.joints.iter().position(|j| j.handle == Some(handle))
    }

    pub fn is_animated(&self) -> bool {
        self.joints.iter().any(|j| !j.tracks.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keyframe_lerp_is_componentwise() {
        let a = Keyframe {
            frame: 0.0,
            translation: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
        };
        let b = Keyframe {
            frame: 10.0,
            translation: Vec3::new(10.0, 0.0, 0.0),
            rotation: Quat::from_xyzw(0.0, 0.0, 1.0, 0.0),
            scale: Vec3::splat(3.0),
        };
        let mid = a.lerp(&b, 5.0);
        assert_eq!(mid.frame, 5.0);
        assert_eq!(mid.translation, Vec3::new(5.0, 0.0, 0.0));
        assert_eq!(mid.scale, Vec3::splat(2.0));
        // Not renormalized.
        assert_eq!(mid.rotation, Quat::from_xyzw(0.0, 0.0, 0.5, 0.5));
    }
}
