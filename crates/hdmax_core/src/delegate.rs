//! The scene delegate interface.
//!
//! A scene delegate bridges the live application scene to the render
//! delegate. The render side only ever reads through it.

use hdmax_math::DMat4;

use crate::path::{SdfPath, Token};
use crate::value::Value;

/// How a primvar's elements map onto the geometry or instances.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Interpolation {
    Constant,
    Uniform,
    Varying,
    Vertex,
    FaceVarying,
    /// One element per authored instance
    Instance,
}

/// Describes a primvar authored on a prim.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PrimvarDescriptor {
    pub name: Token,
    pub interpolation: Interpolation,
}

impl PrimvarDescriptor {
    pub fn new(name: impl Into<Token>, interpolation: Interpolation) -> Self {
        Self {
            name: name.into(),
            interpolation,
        }
    }
}

/// Read access to the live scene.
///
/// Implementations are queried concurrently from render sync threads.
pub trait SceneDelegate: Send + Sync {
    /// Local-to-world transform of a render prim (mesh).
    fn transform(&self, id: &SdfPath) -> DMat4;

    /// Instancer-level transform applied to every instance it emits.
    fn instancer_transform(&self, instancer_id: &SdfPath) -> DMat4;

    /// Indices of the authored instances that draw `prototype_id`.
    fn instance_indices(&self, instancer_id: &SdfPath, prototype_id: &SdfPath) -> Vec<i32>;

    /// Primvars authored on `id` with the given interpolation.
    fn primvar_descriptors(
        &self,
        id: &SdfPath,
        interpolation: Interpolation,
    ) -> Vec<PrimvarDescriptor>;

    /// Value of a primvar. Returns [`Value::Empty`] when nothing is authored.
    fn get(&self, id: &SdfPath, key: &Token) -> Value;

    /// The instancer that instances `prim_id`, if any. For an instancer this
    /// is its parent instancer.
    fn instancer_id(&self, prim_id: &SdfPath) -> Option<SdfPath>;
}
