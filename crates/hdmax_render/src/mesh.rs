//! Draw-item sync for instanced meshes.
//!
//! Each mesh resolves the instance transforms of the instancer that draws
//! it and packs them into GPU-ready instance data. Meshes are independent,
//! so a frame's meshes are synced in parallel on the rayon pool; meshes
//! sharing an instancer meet in that instancer's guarded primvar sync.

use hdmax_core::SdfPath;
use hdmax_math::{to_f32_matrix, DMat4, Mat4};
use rayon::prelude::*;

use crate::render_index::RenderIndex;

/// Instance data for GPU instancing
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct InstanceData {
    pub model_matrix: [[f32; 4]; 4],
}

impl InstanceData {
    pub fn from_matrix(matrix: DMat4) -> Self {
        Self {
            model_matrix: to_f32_matrix(matrix).to_cols_array_2d(),
        }
    }

    pub fn matrix(&self) -> Mat4 {
        Mat4::from_cols_array_2d(&self.model_matrix)
    }
}

/// The instances of one mesh, ready for upload.
#[derive(Clone, Debug)]
pub struct DrawBatch {
    pub mesh_id: SdfPath,
    pub instances: Vec<InstanceData>,
}

impl DrawBatch {
    pub fn instance_count(&self) -> usize {
        self.instances.len()
    }

    /// Raw bytes of the instance buffer.
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.instances)
    }
}

/// A mesh render prim, possibly drawn through an instancer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InstancedMesh {
    id: SdfPath,
}

impl InstancedMesh {
    pub fn new(id: SdfPath) -> Self {
        Self { id }
    }

    pub fn id(&self) -> &SdfPath {
        &self.id
    }

    /// Resolve this mesh's instances.
    ///
    /// The mesh transform is applied first, then each instance transform.
    /// A mesh without an instancer draws once with its own transform.
    pub fn sync(&self, index: &RenderIndex) -> DrawBatch {
        let delegate = index.delegate();
        let mesh_transform = delegate.transform(&self.id);

        let instances = match delegate.instancer_id(&self.id) {
            None => vec![InstanceData::from_matrix(mesh_transform)],
            Some(instancer_id) => {
                let instancer = index.get_or_insert_instancer(&instancer_id);
                match instancer.as_transform_source() {
                    Some(source) => source
                        .compute_instance_transforms(index, &self.id)
                        .into_iter()
                        .map(|xf| InstanceData::from_matrix(xf * mesh_transform))
                        .collect(),
                    None => {
                        log::warn!(
                            "Instancer {} of mesh {} cannot compute instance transforms",
                            instancer_id,
                            self.id
                        );
                        vec![InstanceData::from_matrix(mesh_transform)]
                    }
                }
            }
        };

        DrawBatch {
            mesh_id: self.id.clone(),
            instances,
        }
    }
}

/// Sync every mesh of a frame, in parallel when configured.
///
/// Batches are returned in the order of `meshes`.
pub fn sync_meshes(index: &RenderIndex, meshes: &[InstancedMesh]) -> Vec<DrawBatch> {
    let batches: Vec<DrawBatch> = if index.config().parallel_sync {
        meshes.par_iter().map(|mesh| mesh.sync(index)).collect()
    } else {
        meshes.iter().map(|mesh| mesh.sync(index)).collect()
    };

    let total: usize = batches.iter().map(DrawBatch::instance_count).sum();
    log::info!("Synced {} meshes, {} instances", batches.len(), total);

    batches
}
