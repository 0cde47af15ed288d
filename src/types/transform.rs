//! Transform helpers: unit conversion and TRS decomposition.

use glam::{Mat4, Quat, Vec3};
use serde::{Deserialize, Serialize};

/// Tolerance for the orthogonality test in [`has_shear`].
const SHEAR_EPSILON: f32 = 1e-3;

/// A decomposed translation / rotation / scale triple.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Trs {
    pub translation: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Default for Trs {
    fn default() -> Self {
        Self {
            translation: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
        }
    }
}

impl Trs {
    pub fn to_matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.translation)
    }
}

/// Scale the translation part of a matrix by `unit_scale`.
///
/// Rotation and scale are left untouched.
pub fn convert_units(matrix: Mat4, unit_scale: f32) -> Mat4 {
    let mut out = matrix;
    out.w_axis.x *= unit_scale;
    out.w_axis.y *= unit_scale;
    out.w_axis.z *= unit_scale;
    out
}

/// Decompose an affine matrix into translation, rotation and scale.
pub fn decompose(matrix: Mat4) -> Trs {
    let (scale, rotation, translation) = matrix.to_scale_rotation_translation();
    Trs {
        translation,
        rotation,
        scale,
    }
}

/// Returns `true` when the upper 3x3 of `matrix` has non-orthogonal axes.
pub fn has_shear(matrix: Mat4) -> bool {
    let axes = [
        matrix.x_axis.truncate(),
        matrix.y_axis.truncate(),
        matrix.z_axis.truncate(),
    ];
    if axes.iter().any(|a| a.length_squared() < f32::EPSILON) {
        return false;
    }
    let [x, y, z] = axes.map(|a| a.normalize());
    x.dot(y).abs() > SHEAR_EPSILON
        || y.dot(z).abs() > SHEAR_EPSILON
        || z.dot(x).abs() > SHEAR_EPSILON
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_convert_units_scales_translation_only() {
        let m = Mat4::from_scale_rotation_translation(
            Vec3::splat(2.0),
            Quat::from_rotation_y(0.5),
            Vec3::new(10.0, 20.0, 30.0),
        );
        let converted = convert_units(m, 0.1);
        let trs = decompose(converted);
        assert!((trs.translation - Vec3::new(1.0, 2.0, 3.0)).length() < 1e-5);
        assert!((trs.scale - Vec3::splat(2.0)).length() < 1e-5);
        assert!(trs.rotation.angle_between(Quat::from_rotation_y(0.5)) < 1e-4);
    }

    #[test]
    fn test_decompose_roundtrip() {
        let trs = Trs {
            translation: Vec3::new(1.0, -2.0, 3.0),
            rotation: Quat::from_rotation_x(1.0),
            scale: Vec3::new(1.0, 2.0, 3.0),
        };
        let back = decompose(trs.to_matrix());
        assert!((back.translation - trs.translation).length() < 1e-5);
        assert!((back.scale - trs.scale).length() < 1e-4);
    }

    #[test]
    fn test_shear_detection() {
        assert!(!has_shear(Mat4::from_rotation_z(0.3)));
        let mut sheared = Mat4::IDENTITY;
        sheared.y_axis.x = 0.5;
        assert!(has_shear(sheared));
    }
}
