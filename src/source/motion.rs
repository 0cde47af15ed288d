//! Joint motion curves and the host motion interface.

use glam::Vec3;
use serde::{Deserialize, Serialize};

/// One motion keyframe: offset, Euler rotation (degrees, XYZ) and scale.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MotionKey {
    pub frame: f32,
    pub offset: Vec3,
    pub rotation: Vec3,
    pub scale: Vec3,
}

impl Default for MotionKey {
    fn default() -> Self {
        Self {
            frame: 0.0,
            offset: Vec3::ZERO,
            rotation: Vec3::ZERO,
            scale: Vec3::ONE,
        }
    }
}

impl MotionKey {
    pub fn new(frame: f32, offset: Vec3, rotation: Vec3) -> Self {
        Self {
            frame,
            offset,
            rotation,
            scale: Vec3::ONE,
        }
    }

    fn lerp(&self, other: &MotionKey, frame: f32) -> MotionKey {
        let span = other.frame - self.frame;
        let t = if span.abs() < f32::EPSILON {
            0.0
        } else {
            (frame - self.frame) / span
        };
        MotionKey {
            frame,
            offset: self.offset.lerp(other.offset, t),
            rotation: self.rotation.lerp(other.rotation, t),
            scale: self.scale.lerp(other.scale, t),
        }
    }
}

/// The host's motion interface for one joint.
pub trait MotionSource {
    /// Number of native keyframes.
    fn key_count(&self) -> usize;

    /// Native keyframe by index.
    fn key(&self, index: usize) -> Option<MotionKey>;

    /// Evaluate the curve at an arbitrary frame. `None` when the curve has no
    /// motion points.
    fn evaluate(&self, frame: f32) -> Option<MotionKey>;
}

/// A materialized motion curve, evaluated by linear interpolation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MotionCurve {
    pub keys: Vec<MotionKey>,
}

impl MotionCurve {
    pub fn new(keys: Vec<MotionKey>) -> Self {
        Self { keys }
    }
}

impl MotionSource for MotionCurve {
    fn key_count(&self) -> usize {
        self.keys.len()
    }

    fn key(&self, index: usize) -> Option<MotionKey> {
        self.keys.get(index).copied()
    }

    fn evaluate(&self, frame: f32) -> Option<MotionKey> {
        let before = self
            .keys
            .iter()
            .filter(|k| k.frame <= frame)
            .max_by(|a, b| a.frame.total_cmp(&b.frame));
        let after = self
            .keys
            .iter()
            .filter(|k| k.frame >= frame)
            .min_by(|a, b| a.frame.total_cmp(&b.frame));

        match (before, after) {
            (Some(a), Some(b)) => Some(a.lerp(b, frame)),
            (Some(k), None) | (None, Some(k)) => Some(MotionKey { frame, ..*k }),
            (None, None) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn curve() -> MotionCurve {
        MotionCurve::new(vec![
            MotionKey::new(0.0, Vec3::ZERO, Vec3::ZERO),
            MotionKey::new(10.0, Vec3::new(10.0, 0.0, 0.0), Vec3::new(0.0, 90.0, 0.0)),
        ])
    }

    #[test]
    fn test_evaluate_interpolates() {
        let key = curve().evaluate(5.0).unwrap();
        assert_eq!(key.frame, 5.0);
        assert!((key.offset.x - 5.0).abs() < 1e-5);
        assert!((key.rotation.y - 45.0).abs() < 1e-5);
    }

    #[test]
    fn test_evaluate_holds_outside_range() {
        let key = curve().evaluate(20.0).unwrap();
        assert_eq!(key.offset.x, 10.0);
        let key = curve().evaluate(-5.0).unwrap();
        assert_eq!(key.offset.x, 0.0);
    }

    #[test]
    fn test_empty_curve() {
        assert!(MotionCurve::default().evaluate(0.0).is_none());
        assert_eq!(MotionCurve::default().key_count(), 0);
    }
}
