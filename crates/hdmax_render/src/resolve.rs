//! Instance transform composition.
//!
//! For one instancer level, every slot starts from the instancer transform
//! and then picks up, if authored, the instance's translation, rotation,
//! scale and full transform. Read in point-application order that is:
//!
//! ```text
//! instanceTransform -> scale -> rotation -> translation -> instancerTransform
//! ```
//!
//! glam uses column vectors, so each new factor multiplies on the right of
//! the accumulated matrix. Missing primvars and unsampleable slots are the
//! identity.
//!
//! Nested instancers are flattened by taking the cartesian product of the
//! parent's transforms with the child's, the child's applied first.

use std::collections::HashMap;

use hdmax_core::{InstancerTokens, SdfPath, Token};
use hdmax_math::{
    quat_from_real_first, rotation_matrix, scale_matrix, translation_matrix,
    uniform_scale_matrix, DMat4, DQuat, Quat, QuatH, Vec3, Vec4,
};
use thiserror::Error;

use crate::sampler::{BufferSampler, PrimvarBuffer};

/// Why a nesting level was not flattened.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum NestingError {
    #[error("Instancer {0} is its own ancestor")]
    Cycle(SdfPath),

    #[error("Instancer nesting deeper than {max_depth} levels at {id}")]
    TooDeep { id: SdfPath, max_depth: usize },
}

/// Instancers visited on the way up from the prototype being resolved.
#[derive(Debug, Default)]
pub struct NestingChain {
    ids: Vec<SdfPath>,
}

impl NestingChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `id` is about to recurse into its parent.
    pub fn enter(&mut self, id: &SdfPath, max_depth: usize) -> Result<(), NestingError> {
        if self.ids.contains(id) {
            return Err(NestingError::Cycle(id.clone()));
        }
        if self.ids.len() >= max_depth {
            return Err(NestingError::TooDeep {
                id: id.clone(),
                max_depth,
            });
        }
        self.ids.push(id.clone());
        Ok(())
    }

    pub fn leave(&mut self) {
        self.ids.pop();
    }

    pub fn depth(&self) -> usize {
        self.ids.len()
    }
}

/// Compose the transforms of one instancer level.
///
/// Returns one matrix per entry of `instance_indices`; each index selects the
/// primvar element used for that slot.
pub fn compose_local(
    instancer_transform: DMat4,
    instance_indices: &[i32],
    primvars: &HashMap<Token, PrimvarBuffer>,
    tokens: &InstancerTokens,
) -> Vec<DMat4> {
    let mut transforms = vec![instancer_transform; instance_indices.len()];

    if let Some(buffer) = primvars.get(&tokens.translations) {
        let sampler = BufferSampler::new(buffer);
        apply_factor(&mut transforms, instance_indices, |index| {
            sampler.sample::<Vec3>(index).map(translation_matrix)
        });
    }

    if let Some(buffer) = primvars.get(&tokens.rotations) {
        let sampler = BufferSampler::new(buffer);
        apply_factor(&mut transforms, instance_indices, |index| {
            sample_rotation(&sampler, index).map(rotation_matrix)
        });
    }

    if let Some(buffer) = primvars.get(&tokens.scales) {
        let sampler = BufferSampler::new(buffer);
        apply_factor(&mut transforms, instance_indices, |index| {
            sampler
                .sample::<Vec3>(index)
                .map(scale_matrix)
                .or_else(|| sampler.sample::<f32>(index).map(uniform_scale_matrix))
        });
    }

    if let Some(buffer) = primvars.get(&tokens.transforms) {
        let sampler = BufferSampler::new(buffer);
        apply_factor(&mut transforms, instance_indices, |index| {
            sampler.sample::<DMat4>(index)
        });
    }

    transforms
}

/// Flatten a nesting level: entry `p * local.len() + l` is `local[l]`
/// followed by `parent[p]`.
pub fn compose_nested(parent: &[DMat4], local: &[DMat4]) -> Vec<DMat4> {
    let mut flattened = Vec::with_capacity(parent.len() * local.len());
    for parent_xf in parent {
        for local_xf in local {
            flattened.push(*parent_xf * *local_xf);
        }
    }
    flattened
}

/// Rotation for one slot: a quaternion buffer (float, then half) or a float4
/// buffer holding `(real, i, j, k)`.
fn sample_rotation(sampler: &BufferSampler<'_>, index: i32) -> Option<DQuat> {
    if let Some(q) = sampler.sample::<Quat>(index) {
        return q.as_dvec4_normalized();
    }
    if let Some(q) = sampler.sample::<QuatH>(index) {
        return q.to_dquat();
    }
    sampler
        .sample::<Vec4>(index)
        .and_then(quat_from_real_first)
}

fn apply_factor<F>(transforms: &mut [DMat4], instance_indices: &[i32], factor: F)
where
    F: Fn(i32) -> Option<DMat4>,
{
    for (transform, &index) in transforms.iter_mut().zip(instance_indices) {
        if let Some(factor) = factor(index) {
            *transform *= factor;
        }
    }
}

trait QuatExt {
    fn as_dvec4_normalized(self) -> Option<DQuat>;
}

impl QuatExt for Quat {
    fn as_dvec4_normalized(self) -> Option<DQuat> {
        Vec4::from(self)
            .as_dvec4()
            .try_normalize()
            .map(DQuat::from_vec4)
    }
}
