// Elementary transform builders for instance composition
//
// Instance primvars arrive in single precision (float3 translations, float4 or
// half quaternions, float3 scales); the composed instance transforms are kept
// in double precision like the instancer transform itself.

use glam::{DMat4, DQuat, DVec4, Mat4, Vec3, Vec4};

/// Translation matrix for a single-precision offset.
pub fn translation_matrix(translation: Vec3) -> DMat4 {
    DMat4::from_translation(translation.as_dvec3())
}

/// Rotation matrix for a quaternion. The quaternion is expected to be normalized.
pub fn rotation_matrix(rotation: DQuat) -> DMat4 {
    DMat4::from_quat(rotation)
}

/// Axis-aligned (possibly non-uniform) scale matrix.
pub fn scale_matrix(scale: Vec3) -> DMat4 {
    DMat4::from_scale(scale.as_dvec3())
}

/// Uniform scale matrix.
pub fn uniform_scale_matrix(scale: f32) -> DMat4 {
    DMat4::from_scale(Vec3::splat(scale).as_dvec3())
}

/// Interpret a raw 4-vector as a quaternion stored as `(real, i, j, k)`.
///
/// Returns `None` for a zero-length vector, which cannot describe a rotation.
pub fn quat_from_real_first(v: Vec4) -> Option<DQuat> {
    let xyzw = DVec4::new(v.y as f64, v.z as f64, v.w as f64, v.x as f64);
    xyzw.try_normalize().map(DQuat::from_vec4)
}

/// Narrow a double-precision matrix for GPU upload.
pub fn to_f32_matrix(matrix: DMat4) -> Mat4 {
    Mat4::from_cols_array(&matrix.to_cols_array().map(|v| v as f32))
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::DVec3;

    #[test]
    fn test_translation_matrix() {
        let mat = translation_matrix(Vec3::new(10.0, 20.0, 30.0));
        let p = mat.transform_point3(DVec3::new(1.0, 2.0, 3.0));

        assert_eq!(p, DVec3::new(11.0, 22.0, 33.0));
    }

    #[test]
    fn test_scale_matrix_non_uniform() {
        let mat = scale_matrix(Vec3::new(1.0, 2.0, 4.0));
        let p = mat.transform_point3(DVec3::ONE);

        assert_eq!(p, DVec3::new(1.0, 2.0, 4.0));
    }

    #[test]
    fn test_uniform_scale_matrix() {
        let mat = uniform_scale_matrix(3.0);
        assert_eq!(mat.transform_point3(DVec3::ONE), DVec3::splat(3.0));
    }

    #[test]
    fn test_quat_from_real_first_ordering() {
        use std::f64::consts::FRAC_PI_2;

        // 90 degrees about Z: real = cos(45), k = sin(45)
        let angle = (FRAC_PI_2 / 2.0) as f32;
        let q = quat_from_real_first(Vec4::new(angle.cos(), 0.0, 0.0, angle.sin())).unwrap();
        let p = rotation_matrix(q).transform_point3(DVec3::X);

        assert!((p - DVec3::Y).length() < 1e-6);
    }

    #[test]
    fn test_quat_from_real_first_normalizes() {
        let q = quat_from_real_first(Vec4::new(2.0, 0.0, 0.0, 0.0)).unwrap();
        assert!(q.abs_diff_eq(DQuat::IDENTITY, 1e-12));
    }

    #[test]
    fn test_quat_from_real_first_rejects_zero() {
        assert!(quat_from_real_first(Vec4::ZERO).is_none());
    }

    #[test]
    fn test_to_f32_matrix() {
        let mat = translation_matrix(Vec3::new(1.5, -2.0, 0.25));
        let narrowed = to_f32_matrix(mat);

        assert_eq!(narrowed, Mat4::from_translation(Vec3::new(1.5, -2.0, 0.25)));
    }
}
