//! HdMax Render - viewport render delegate instancing.
//!
//! Resolves the flattened world transform of every drawn instance from a
//! hierarchy of (possibly nested) instancers and their per-instance
//! primvars, re-pulling primvars only when the change tracker marks them
//! dirty.

mod config;
mod instancer;
mod mesh;
mod primvar_cache;
mod render_index;
mod resolve;
mod sampler;

pub use config::{ConfigError, RenderConfig};
pub use instancer::{InstanceTransforms, Instancer, ViewportInstancer};
pub use mesh::{sync_meshes, DrawBatch, InstanceData, InstancedMesh};
pub use primvar_cache::{PrimvarCache, PrimvarView, SyncOutcome};
pub use render_index::RenderIndex;
pub use resolve::{compose_local, compose_nested, NestingChain, NestingError};
pub use sampler::{BufferSampler, PrimvarBuffer, Sample};

/// Re-export the scene-side types render code works with
pub use hdmax_core::{DirtyBits, SdfPath, Token};
