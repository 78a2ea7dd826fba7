//! Viewport instancing of prototype geometry with varying transforms.
//!
//! Nested instancing is handled by recursion: a child instancer is itself a
//! prototype of its parent, so the parent is asked for the transforms of the
//! child's id and the two levels are flattened with a cartesian product.

use hdmax_core::{ChangeTracker, DirtyBits, SdfPath};
use hdmax_math::DMat4;
use parking_lot::RwLock;

use crate::primvar_cache::{PrimvarCache, SyncOutcome};
use crate::render_index::RenderIndex;
use crate::resolve::{compose_local, compose_nested, NestingChain};

/// An instancer registered in the render index.
pub trait Instancer: Send + Sync {
    /// Scene path of this instancer.
    fn id(&self) -> &SdfPath;

    /// Parent instancer, if this instancer is nested.
    fn parent_id(&self) -> Option<SdfPath>;

    /// Dirty bits raised when the instancer is first inserted.
    fn initial_dirty_bits_mask(&self) -> DirtyBits;

    /// Access to instance transform computation, for instancers that support it.
    fn as_transform_source(&self) -> Option<&dyn InstanceTransforms> {
        None
    }
}

/// Computes flattened instance transforms for a prototype.
pub trait InstanceTransforms {
    /// Transforms for `prototype_id`, flattened through the parent levels
    /// already recorded in `chain`.
    fn compute_nested_transforms(
        &self,
        index: &RenderIndex,
        prototype_id: &SdfPath,
        chain: &mut NestingChain,
    ) -> Vec<DMat4>;

    /// One transform per drawn instance of `prototype_id`.
    fn compute_instance_transforms(&self, index: &RenderIndex, prototype_id: &SdfPath) -> Vec<DMat4> {
        let mut chain = NestingChain::new();
        self.compute_nested_transforms(index, prototype_id, &mut chain)
    }
}

/// The viewport's instancer: caches instance primvars and resolves instance
/// transforms from them.
#[derive(Debug)]
pub struct ViewportInstancer {
    id: SdfPath,
    parent_id: RwLock<Option<SdfPath>>,
    primvars: PrimvarCache,
}

impl ViewportInstancer {
    /// Create an instancer, reading its parent from the scene delegate.
    pub fn new(index: &RenderIndex, id: SdfPath) -> Self {
        let parent_id = index.delegate().instancer_id(&id).filter(|p| !p.is_empty());
        Self {
            id,
            parent_id: RwLock::new(parent_id),
            primvars: PrimvarCache::new(),
        }
    }

    /// The cached instance primvars.
    pub fn primvars(&self) -> &PrimvarCache {
        &self.primvars
    }

    /// Pull dirty instance primvars, refreshing the parent id when the
    /// instancer itself is dirty.
    pub fn sync_primvars(&self, index: &RenderIndex) -> SyncOutcome {
        self.primvars.sync(
            &self.id,
            index.delegate(),
            index.change_tracker(),
            |bits| {
                if ChangeTracker::is_instancer_dirty(bits, &self.id) {
                    let parent_id = index
                        .delegate()
                        .instancer_id(&self.id)
                        .filter(|p| !p.is_empty());
                    // A parent new to the scene is created here; nothing else
                    // references it before this instancer resolves.
                    if let Some(parent) = &parent_id {
                        index.get_or_insert_instancer(parent);
                    }
                    *self.parent_id.write() = parent_id;
                }
            },
        )
    }
}

impl Instancer for ViewportInstancer {
    fn id(&self) -> &SdfPath {
        &self.id
    }

    fn parent_id(&self) -> Option<SdfPath> {
        self.parent_id.read().clone()
    }

    fn initial_dirty_bits_mask(&self) -> DirtyBits {
        DirtyBits::PRIMVAR | DirtyBits::TRANSFORM | DirtyBits::INSTANCE_INDEX | DirtyBits::INSTANCER
    }

    fn as_transform_source(&self) -> Option<&dyn InstanceTransforms> {
        Some(self)
    }
}

impl InstanceTransforms for ViewportInstancer {
    fn compute_nested_transforms(
        &self,
        index: &RenderIndex,
        prototype_id: &SdfPath,
        chain: &mut NestingChain,
    ) -> Vec<DMat4> {
        self.sync_primvars(index);

        let delegate = index.delegate();
        let instancer_transform = delegate.instancer_transform(&self.id);
        let instance_indices = delegate.instance_indices(&self.id, prototype_id);

        let transforms = compose_local(
            instancer_transform,
            &instance_indices,
            &self.primvars.view(),
            index.tokens(),
        );

        let Some(parent_id) = self.parent_id() else {
            return transforms;
        };

        let Some(parent) = index.instancer(&parent_id) else {
            log::warn!(
                "Instancer {} has unresolved parent {}; skipping nesting",
                self.id,
                parent_id
            );
            return transforms;
        };

        let Some(parent) = parent.as_transform_source() else {
            log::warn!(
                "Parent {} of instancer {} cannot compute instance transforms; skipping nesting",
                parent_id,
                self.id
            );
            return transforms;
        };

        if let Err(err) = chain.enter(&self.id, index.config().max_nesting_depth) {
            log::error!("{}; skipping nesting", err);
            return transforms;
        }
        let parent_transforms = parent.compute_nested_transforms(index, &self.id, chain);
        chain.leave();

        compose_nested(&parent_transforms, &transforms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use hdmax_core::MemorySceneDelegate;
    use hdmax_math::{DVec3, Vec3};

    use crate::config::RenderConfig;

    #[test]
    fn test_initial_dirty_bits_mask() {
        let delegate = Arc::new(MemorySceneDelegate::new());
        let index = RenderIndex::new(delegate, RenderConfig::default());
        let instancer = ViewportInstancer::new(&index, SdfPath::new("/I"));

        let mask = instancer.initial_dirty_bits_mask();
        assert!(mask.contains(DirtyBits::PRIMVAR));
        assert!(mask.contains(DirtyBits::TRANSFORM));
        assert!(mask.contains(DirtyBits::INSTANCE_INDEX));
        assert!(mask.contains(DirtyBits::INSTANCER));
    }

    #[test]
    fn test_compute_single_level() {
        let delegate = Arc::new(MemorySceneDelegate::new());
        let id = SdfPath::new("/I");
        let proto = SdfPath::new("/I/Proto");
        delegate.add_instancer(&id, None).unwrap();
        delegate
            .set_instancer_transform(&id, DMat4::from_translation(DVec3::new(0.0, 0.0, 10.0)))
            .unwrap();
        delegate.set_instance_indices(&id, &proto, vec![0, 2]).unwrap();
        delegate
            .set_instance_primvar(&id, "instanceTranslations", vec![Vec3::X, Vec3::Y, Vec3::Z])
            .unwrap();

        let index = RenderIndex::new(delegate, RenderConfig::default());
        let instancer = index.get_or_insert_instancer(&id);
        let transforms = instancer
            .as_transform_source()
            .unwrap()
            .compute_instance_transforms(&index, &proto);

        assert_eq!(transforms.len(), 2);
        assert_eq!(transforms[0].transform_point3(DVec3::ZERO), DVec3::new(1.0, 0.0, 10.0));
        assert_eq!(transforms[1].transform_point3(DVec3::ZERO), DVec3::new(0.0, 0.0, 11.0));
    }

    #[test]
    fn test_reparenting_is_picked_up() {
        let delegate = Arc::new(MemorySceneDelegate::new());
        let parent = SdfPath::new("/Parent");
        let child = SdfPath::new("/Child");
        let proto = SdfPath::new("/Child/Proto");
        delegate.add_instancer(&parent, None).unwrap();
        delegate.add_instancer(&child, None).unwrap();
        delegate.set_instance_indices(&child, &proto, vec![0]).unwrap();
        delegate.set_instance_indices(&parent, &child, vec![0, 1]).unwrap();

        let index = RenderIndex::new(delegate.clone(), RenderConfig::default());
        index.get_or_insert_instancer(&parent);
        let instancer = index.get_or_insert_instancer(&child);
        let source = instancer.as_transform_source().unwrap();

        assert_eq!(source.compute_instance_transforms(&index, &proto).len(), 1);

        let bits = delegate.set_instancer_parent(&child, Some(&parent)).unwrap();
        index.change_tracker().mark_instancer_dirty(&child, bits);

        assert_eq!(instancer.parent_id(), None);
        assert_eq!(source.compute_instance_transforms(&index, &proto).len(), 2);
        assert_eq!(instancer.parent_id(), Some(parent));
    }

    #[test]
    fn test_reparenting_under_unregistered_parent() {
        let delegate = Arc::new(MemorySceneDelegate::new());
        let child = SdfPath::new("/Child");
        let proto = SdfPath::new("/Child/Proto");
        delegate.add_instancer(&child, None).unwrap();
        delegate.set_instance_indices(&child, &proto, vec![0, 1, 2]).unwrap();

        let index = RenderIndex::new(delegate.clone(), RenderConfig::default());
        let instancer = index.get_or_insert_instancer(&child);
        let source = instancer.as_transform_source().unwrap();
        assert_eq!(source.compute_instance_transforms(&index, &proto).len(), 3);

        let outer = SdfPath::new("/Outer");
        delegate.add_instancer(&outer, None).unwrap();
        delegate.set_instance_indices(&outer, &child, vec![0, 1]).unwrap();
        let bits = delegate.set_instancer_parent(&child, Some(&outer)).unwrap();
        index.change_tracker().mark_instancer_dirty(&child, bits);

        assert_eq!(source.compute_instance_transforms(&index, &proto).len(), 6);
        assert_eq!(source.compute_instance_transforms(&index, &proto).len(), 6);
        assert!(index.instancer(&outer).is_some());
    }
}
