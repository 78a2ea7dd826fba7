//! In-memory scene delegate.
//!
//! Holds instancers, meshes and their instance primvars in plain maps, and
//! counts primvar fetches so sync behaviour can be observed. Mutators return
//! the dirty bits the change should raise on the affected instancer.

use std::collections::{BTreeMap, HashMap};

use hdmax_math::DMat4;
use parking_lot::{Mutex, RwLock};
use thiserror::Error;

use crate::change_tracker::DirtyBits;
use crate::delegate::{Interpolation, PrimvarDescriptor, SceneDelegate};
use crate::path::{SdfPath, Token};
use crate::value::Value;

/// Errors from editing an in-memory scene.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum DelegateError {
    #[error("Unknown instancer: {0}")]
    UnknownInstancer(SdfPath),

    #[error("Prim already exists: {0}")]
    DuplicatePrim(SdfPath),

    #[error("Parenting {child} under {parent} would create an instancing cycle")]
    ParentCycle { child: SdfPath, parent: SdfPath },
}

/// Result type for scene edits.
pub type DelegateResult<T> = Result<T, DelegateError>;

#[derive(Clone, Debug)]
struct InstancerData {
    parent: Option<SdfPath>,
    transform: DMat4,
    /// Instance indices per prototype
    indices: HashMap<SdfPath, Vec<i32>>,
    /// Ordered so descriptor lists are deterministic
    primvars: BTreeMap<Token, (Interpolation, Value)>,
}

#[derive(Clone, Debug)]
struct MeshData {
    instancer: Option<SdfPath>,
    transform: DMat4,
}

#[derive(Debug, Default)]
struct SceneData {
    instancers: HashMap<SdfPath, InstancerData>,
    meshes: HashMap<SdfPath, MeshData>,
}

impl SceneData {
    fn contains(&self, id: &SdfPath) -> bool {
        self.instancers.contains_key(id) || self.meshes.contains_key(id)
    }

    fn instancer_mut(&mut self, id: &SdfPath) -> DelegateResult<&mut InstancerData> {
        self.instancers
            .get_mut(id)
            .ok_or_else(|| DelegateError::UnknownInstancer(id.clone()))
    }

    /// Walk up from `parent`; reaching `child` means the edit closes a loop.
    fn would_cycle(&self, child: &SdfPath, parent: &SdfPath) -> bool {
        let mut current = Some(parent.clone());
        let mut steps = 0;
        while let Some(id) = current {
            if &id == child || steps > self.instancers.len() {
                return true;
            }
            current = self.instancers.get(&id).and_then(|data| data.parent.clone());
            steps += 1;
        }
        false
    }
}

/// A [`SceneDelegate`] backed by in-memory maps.
#[derive(Debug, Default)]
pub struct MemorySceneDelegate {
    scene: RwLock<SceneData>,
    fetches: Mutex<HashMap<(SdfPath, Token), usize>>,
}

impl MemorySceneDelegate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an instancer, optionally nested under an existing parent instancer.
    pub fn add_instancer(&self, id: &SdfPath, parent: Option<&SdfPath>) -> DelegateResult<()> {
        let mut scene = self.scene.write();
        if scene.contains(id) {
            return Err(DelegateError::DuplicatePrim(id.clone()));
        }
        if let Some(parent) = parent {
            if !scene.instancers.contains_key(parent) {
                return Err(DelegateError::UnknownInstancer(parent.clone()));
            }
        }

        scene.instancers.insert(
            id.clone(),
            InstancerData {
                parent: parent.cloned(),
                transform: DMat4::IDENTITY,
                indices: HashMap::new(),
                primvars: BTreeMap::new(),
            },
        );
        Ok(())
    }

    /// Add a mesh, optionally instanced by an existing instancer.
    pub fn add_mesh(
        &self,
        id: &SdfPath,
        instancer: Option<&SdfPath>,
        transform: DMat4,
    ) -> DelegateResult<()> {
        let mut scene = self.scene.write();
        if scene.contains(id) {
            return Err(DelegateError::DuplicatePrim(id.clone()));
        }
        if let Some(instancer) = instancer {
            if !scene.instancers.contains_key(instancer) {
                return Err(DelegateError::UnknownInstancer(instancer.clone()));
            }
        }

        scene.meshes.insert(
            id.clone(),
            MeshData {
                instancer: instancer.cloned(),
                transform,
            },
        );
        Ok(())
    }

    /// Re-parent an instancer. `None` makes it a root instancer.
    pub fn set_instancer_parent(
        &self,
        id: &SdfPath,
        parent: Option<&SdfPath>,
    ) -> DelegateResult<DirtyBits> {
        let mut scene = self.scene.write();
        if let Some(parent) = parent {
            if !scene.instancers.contains_key(parent) {
                return Err(DelegateError::UnknownInstancer(parent.clone()));
            }
            if scene.would_cycle(id, parent) {
                return Err(DelegateError::ParentCycle {
                    child: id.clone(),
                    parent: parent.clone(),
                });
            }
        }

        scene.instancer_mut(id)?.parent = parent.cloned();
        Ok(DirtyBits::INSTANCER)
    }

    pub fn set_instancer_transform(
        &self,
        id: &SdfPath,
        transform: DMat4,
    ) -> DelegateResult<DirtyBits> {
        self.scene.write().instancer_mut(id)?.transform = transform;
        Ok(DirtyBits::TRANSFORM)
    }

    /// Set which authored instances draw `prototype_id`.
    pub fn set_instance_indices(
        &self,
        id: &SdfPath,
        prototype_id: &SdfPath,
        indices: Vec<i32>,
    ) -> DelegateResult<DirtyBits> {
        self.scene
            .write()
            .instancer_mut(id)?
            .indices
            .insert(prototype_id.clone(), indices);
        Ok(DirtyBits::INSTANCE_INDEX)
    }

    /// Author a primvar on an instancer, replacing any previous value.
    pub fn set_primvar(
        &self,
        id: &SdfPath,
        name: impl Into<Token>,
        interpolation: Interpolation,
        value: impl Into<Value>,
    ) -> DelegateResult<DirtyBits> {
        self.scene
            .write()
            .instancer_mut(id)?
            .primvars
            .insert(name.into(), (interpolation, value.into()));
        Ok(DirtyBits::PRIMVAR)
    }

    /// Author an instance-rate primvar.
    pub fn set_instance_primvar(
        &self,
        id: &SdfPath,
        name: impl Into<Token>,
        value: impl Into<Value>,
    ) -> DelegateResult<DirtyBits> {
        self.set_primvar(id, name, Interpolation::Instance, value)
    }

    /// Remove an authored primvar.
    pub fn remove_primvar(&self, id: &SdfPath, name: &Token) -> DelegateResult<DirtyBits> {
        let removed = self.scene.write().instancer_mut(id)?.primvars.remove(name);
        Ok(if removed.is_some() {
            DirtyBits::PRIMVAR
        } else {
            DirtyBits::CLEAN
        })
    }

    /// How many times `get` was called for a primvar.
    pub fn fetch_count(&self, id: &SdfPath, name: &Token) -> usize {
        self.fetches
            .lock()
            .get(&(id.clone(), name.clone()))
            .copied()
            .unwrap_or(0)
    }

    /// Total `get` calls across all prims.
    pub fn total_fetches(&self) -> usize {
        self.fetches.lock().values().sum()
    }

    pub fn reset_fetch_counts(&self) {
        self.fetches.lock().clear();
    }
}

impl SceneDelegate for MemorySceneDelegate {
    fn transform(&self, id: &SdfPath) -> DMat4 {
        self.scene
            .read()
            .meshes
            .get(id)
            .map(|mesh| mesh.transform)
            .unwrap_or(DMat4::IDENTITY)
    }

    fn instancer_transform(&self, instancer_id: &SdfPath) -> DMat4 {
        self.scene
            .read()
            .instancers
            .get(instancer_id)
            .map(|data| data.transform)
            .unwrap_or(DMat4::IDENTITY)
    }

    fn instance_indices(&self, instancer_id: &SdfPath, prototype_id: &SdfPath) -> Vec<i32> {
        self.scene
            .read()
            .instancers
            .get(instancer_id)
            .and_then(|data| data.indices.get(prototype_id))
            .cloned()
            .unwrap_or_default()
    }

    fn primvar_descriptors(
        &self,
        id: &SdfPath,
        interpolation: Interpolation,
    ) -> Vec<PrimvarDescriptor> {
        let scene = self.scene.read();
        let Some(data) = scene.instancers.get(id) else {
            return Vec::new();
        };

        data.primvars
            .iter()
            .filter(|(_, (interp, _))| *interp == interpolation)
            .map(|(name, _)| PrimvarDescriptor::new(name.clone(), interpolation))
            .collect()
    }

    fn get(&self, id: &SdfPath, key: &Token) -> Value {
        *self
            .fetches
            .lock()
            .entry((id.clone(), key.clone()))
            .or_insert(0) += 1;

        self.scene
            .read()
            .instancers
            .get(id)
            .and_then(|data| data.primvars.get(key))
            .map(|(_, value)| value.clone())
            .unwrap_or_default()
    }

    fn instancer_id(&self, prim_id: &SdfPath) -> Option<SdfPath> {
        let scene = self.scene.read();
        if let Some(data) = scene.instancers.get(prim_id) {
            return data.parent.clone();
        }
        scene.meshes.get(prim_id).and_then(|mesh| mesh.instancer.clone())
    }
}
