//! Half-precision quaternion.
//!
//! USD authors point-instancer orientations as `quath[]`, so delegates
//! frequently hand back rotation buffers in this layout.

use glam::{DQuat, DVec4};
use half::f16;

/// A quaternion with half-precision components, stored as real part
/// followed by the imaginary `(i, j, k)` vector.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct QuatH {
    /// Real (scalar) part
    pub real: f16,

    /// Imaginary part `(i, j, k)`
    pub imaginary: [f16; 3],
}

impl QuatH {
    /// The identity rotation.
    pub const IDENTITY: QuatH = QuatH {
        real: f16::ONE,
        imaginary: [f16::ZERO; 3],
    };

    /// Create a half quaternion from single-precision components.
    pub fn new(real: f32, i: f32, j: f32, k: f32) -> Self {
        Self {
            real: f16::from_f32(real),
            imaginary: [f16::from_f32(i), f16::from_f32(j), f16::from_f32(k)],
        }
    }

    /// Widen to a normalized double-precision quaternion.
    ///
    /// Half precision rarely round-trips to unit length, so the result is
    /// renormalized. A zero quaternion yields `None`.
    pub fn to_dquat(self) -> Option<DQuat> {
        let [i, j, k] = self.imaginary;
        DVec4::new(i.to_f64(), j.to_f64(), k.to_f64(), self.real.to_f64())
            .try_normalize()
            .map(DQuat::from_vec4)
    }
}

impl Default for QuatH {
    fn default() -> Self {
        Self::IDENTITY
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_widens_to_identity() {
        let q = QuatH::IDENTITY.to_dquat().unwrap();
        assert!(q.abs_diff_eq(DQuat::IDENTITY, 1e-12));
    }

    #[test]
    fn test_half_rotation_is_renormalized() {
        let s = std::f32::consts::FRAC_1_SQRT_2;
        let q = QuatH::new(s, 0.0, s, 0.0).to_dquat().unwrap();

        assert!((q.length() - 1.0).abs() < 1e-12);
        assert!(q.abs_diff_eq(DQuat::from_rotation_y(std::f64::consts::FRAC_PI_2), 1e-3));
    }

    #[test]
    fn test_zero_quaternion() {
        assert!(QuatH::new(0.0, 0.0, 0.0, 0.0).to_dquat().is_none());
    }
}
