//! HdMax Math - linear algebra for the viewport render delegate.
//!
//! Re-exports glam and adds the elementary matrix builders used to compose
//! per-instance transforms, plus the half-precision quaternion type that
//! scene delegates hand out for `instanceRotations`.

// Re-export glam for convenience
pub use glam::*;

// HdMax math types
mod quath;
mod transform;

pub use quath::QuatH;
pub use transform::{
    quat_from_real_first, rotation_matrix, scale_matrix, to_f32_matrix, translation_matrix,
    uniform_scale_matrix,
};
