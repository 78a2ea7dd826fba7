//! Registry of render-side instancers.
//!
//! The render index ties together the scene delegate, the change tracker
//! and every instancer created during sync. Instancers are created the first
//! time a draw item references them and live until removed or until the
//! index is dropped, which frees their cached primvars.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use hdmax_core::{ChangeTracker, InstancerTokens, SceneDelegate, SdfPath};
use parking_lot::RwLock;

use crate::config::RenderConfig;
use crate::instancer::{Instancer, ViewportInstancer};

pub struct RenderIndex {
    delegate: Arc<dyn SceneDelegate>,
    change_tracker: ChangeTracker,
    instancers: RwLock<HashMap<SdfPath, Arc<dyn Instancer>>>,
    config: RenderConfig,
    tokens: InstancerTokens,
}

impl RenderIndex {
    pub fn new(delegate: Arc<dyn SceneDelegate>, config: RenderConfig) -> Self {
        let tokens = InstancerTokens::for_naming(config.primvar_naming);
        Self {
            delegate,
            change_tracker: ChangeTracker::new(),
            instancers: RwLock::new(HashMap::new()),
            config,
            tokens,
        }
    }

    pub fn delegate(&self) -> &dyn SceneDelegate {
        self.delegate.as_ref()
    }

    pub fn change_tracker(&self) -> &ChangeTracker {
        &self.change_tracker
    }

    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    /// Instancer primvar names for the configured naming scheme.
    pub fn tokens(&self) -> &InstancerTokens {
        &self.tokens
    }

    /// Register an instancer, replacing any instancer with the same id, and
    /// start tracking it with its initial dirty mask.
    pub fn insert_instancer(&self, instancer: Arc<dyn Instancer>) {
        let id = instancer.id().clone();
        self.change_tracker
            .instancer_inserted(&id, instancer.initial_dirty_bits_mask());
        if self.instancers.write().insert(id.clone(), instancer).is_some() {
            log::debug!("Replaced instancer {}", id);
        }
    }

    /// Look up a registered instancer.
    pub fn instancer(&self, id: &SdfPath) -> Option<Arc<dyn Instancer>> {
        self.instancers.read().get(id).cloned()
    }

    /// Look up an instancer, creating it (and any unregistered ancestors)
    /// on first reference.
    pub fn get_or_insert_instancer(&self, id: &SdfPath) -> Arc<dyn Instancer> {
        if let Some(existing) = self.instancer(id) {
            return existing;
        }

        // Ancestors are registered before descendants, so any instancer other
        // threads can see already has its parents in place.
        let mut lineage = vec![id.clone()];
        let mut visited: HashSet<SdfPath> = lineage.iter().cloned().collect();
        let mut next = self.delegate.instancer_id(id);
        while let Some(parent) = next.filter(|p| !p.is_empty() && self.instancer(p).is_none()) {
            if !visited.insert(parent.clone()) {
                log::error!("Instancer {} is its own ancestor", parent);
                break;
            }
            next = self.delegate.instancer_id(&parent);
            lineage.push(parent);
        }

        let mut created = None;
        for current in lineage.iter().rev() {
            created = Some(self.create_instancer(current));
        }
        created.unwrap_or_else(|| self.create_instancer(id))
    }

    fn create_instancer(&self, id: &SdfPath) -> Arc<dyn Instancer> {
        let mut instancers = self.instancers.write();
        if let Some(existing) = instancers.get(id) {
            return existing.clone();
        }

        let instancer: Arc<dyn Instancer> = Arc::new(ViewportInstancer::new(self, id.clone()));
        self.change_tracker
            .instancer_inserted(id, instancer.initial_dirty_bits_mask());
        instancers.insert(id.clone(), instancer.clone());
        log::debug!("Created instancer {}", id);
        instancer
    }

    /// Remove an instancer. Its cached primvars are freed once the last
    /// in-flight user drops its handle.
    pub fn remove_instancer(&self, id: &SdfPath) -> Option<Arc<dyn Instancer>> {
        let removed = self.instancers.write().remove(id);
        if removed.is_some() {
            self.change_tracker.instancer_removed(id);
        }
        removed
    }

    pub fn instancer_count(&self) -> usize {
        self.instancers.read().len()
    }

    /// Remove every instancer.
    pub fn clear(&self) {
        let mut instancers = self.instancers.write();
        for id in instancers.keys() {
            self.change_tracker.instancer_removed(id);
        }
        instancers.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hdmax_core::{DirtyBits, MemorySceneDelegate};

    fn nested_delegate() -> Arc<MemorySceneDelegate> {
        let delegate = Arc::new(MemorySceneDelegate::new());
        delegate.add_instancer(&SdfPath::new("/A"), None).unwrap();
        delegate
            .add_instancer(&SdfPath::new("/A/B"), Some(&SdfPath::new("/A")))
            .unwrap();
        delegate
            .add_instancer(&SdfPath::new("/A/B/C"), Some(&SdfPath::new("/A/B")))
            .unwrap();
        delegate
    }

    #[test]
    fn test_get_or_insert_registers_ancestors() {
        let index = RenderIndex::new(nested_delegate(), RenderConfig::default());

        let c = index.get_or_insert_instancer(&SdfPath::new("/A/B/C"));

        assert_eq!(c.id(), &SdfPath::new("/A/B/C"));
        assert_eq!(index.instancer_count(), 3);
        assert!(index.instancer(&SdfPath::new("/A")).is_some());
        assert_eq!(
            index.change_tracker().instancer_dirty_bits(&SdfPath::new("/A/B")),
            c.initial_dirty_bits_mask()
        );
    }

    #[test]
    fn test_get_or_insert_returns_existing() {
        let index = RenderIndex::new(nested_delegate(), RenderConfig::default());
        let first = index.get_or_insert_instancer(&SdfPath::new("/A"));
        let second = index.get_or_insert_instancer(&SdfPath::new("/A"));

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(index.instancer_count(), 1);
    }

    #[test]
    fn test_remove_and_clear() {
        let index = RenderIndex::new(nested_delegate(), RenderConfig::default());
        index.get_or_insert_instancer(&SdfPath::new("/A/B/C"));

        assert!(index.remove_instancer(&SdfPath::new("/A/B")).is_some());
        assert!(index.remove_instancer(&SdfPath::new("/A/B")).is_none());
        assert_eq!(index.instancer_count(), 2);
        assert_eq!(
            index.change_tracker().instancer_dirty_bits(&SdfPath::new("/A/B")),
            DirtyBits::CLEAN
        );

        index.clear();
        assert_eq!(index.instancer_count(), 0);
        assert_eq!(index.change_tracker().instancer_count(), 0);
    }

    #[test]
    fn test_tokens_follow_naming() {
        let config = RenderConfig {
            primvar_naming: hdmax_core::PrimvarNaming::Legacy,
            ..Default::default()
        };
        let index = RenderIndex::new(nested_delegate(), config);

        assert_eq!(index.tokens().translations.as_str(), "translate");
    }
}
