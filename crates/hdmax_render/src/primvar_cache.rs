//! Per-instancer cache of instance primvars.
//!
//! Primvars can only be pulled once per change, and instancers are resolved
//! from many mesh-sync threads at the same time, so pulling is guarded by the
//! cache's write lock using double-checked locking: a cheap unguarded dirty
//! check, then a second check once the lock is held. A thread that loses the
//! race finds the instancer already clean and skips the fetch.

use std::collections::HashMap;
use std::ops::Deref;

use hdmax_core::{ChangeTracker, DirtyBits, Interpolation, SceneDelegate, SdfPath, Token};
use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::sampler::PrimvarBuffer;

/// What a call to [`PrimvarCache::sync`] did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SyncOutcome {
    /// Nothing was dirty; the guard was never taken
    Clean,
    /// Dirty before locking, clean after: another thread synced first
    AlreadySynced,
    /// This call performed the sync and fetched `fetched` primvars
    Synced { fetched: usize },
}

/// Latest buffer per instance primvar name.
#[derive(Debug, Default)]
pub struct PrimvarCache {
    primvars: RwLock<HashMap<Token, PrimvarBuffer>>,
}

/// Read access to a cache after sync.
pub struct PrimvarView<'a> {
    guard: RwLockReadGuard<'a, HashMap<Token, PrimvarBuffer>>,
}

impl Deref for PrimvarView<'_> {
    type Target = HashMap<Token, PrimvarBuffer>;

    fn deref(&self) -> &Self::Target {
        &self.guard
    }
}

fn needs_sync(bits: DirtyBits, id: &SdfPath) -> bool {
    ChangeTracker::is_any_primvar_dirty(bits, id)
        || ChangeTracker::is_instancer_dirty(bits, id)
        || ChangeTracker::is_instance_index_dirty(bits, id)
}

impl PrimvarCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pull dirty instance primvars of instancer `id` from the delegate.
    ///
    /// `on_update` runs inside the critical section with the re-read dirty
    /// bits, before any primvar is fetched; the instancer uses it to refresh
    /// its own state (e.g. its parent id). The instancer is marked clean
    /// before the guard is released.
    pub fn sync<F>(
        &self,
        id: &SdfPath,
        delegate: &dyn SceneDelegate,
        tracker: &ChangeTracker,
        on_update: F,
    ) -> SyncOutcome
    where
        F: FnOnce(DirtyBits),
    {
        if !needs_sync(tracker.instancer_dirty_bits(id), id) {
            return SyncOutcome::Clean;
        }

        self.sync_locked(self.primvars.write(), id, delegate, tracker, on_update)
    }

    fn sync_locked<F>(
        &self,
        mut primvars: RwLockWriteGuard<'_, HashMap<Token, PrimvarBuffer>>,
        id: &SdfPath,
        delegate: &dyn SceneDelegate,
        tracker: &ChangeTracker,
        on_update: F,
    ) -> SyncOutcome
    where
        F: FnOnce(DirtyBits),
    {
        // If not dirty anymore, another thread did the job
        let bits = tracker.instancer_dirty_bits(id);
        if !needs_sync(bits, id) {
            return SyncOutcome::AlreadySynced;
        }

        on_update(bits);

        let mut fetched = 0;
        if ChangeTracker::is_any_primvar_dirty(bits, id) {
            for descriptor in delegate.primvar_descriptors(id, Interpolation::Instance) {
                if !ChangeTracker::is_primvar_dirty(bits, id, &descriptor.name) {
                    continue;
                }

                let value = delegate.get(id, &descriptor.name);
                if value.is_empty() {
                    log::trace!("{}: primvar {} has no value", id, descriptor.name);
                    continue;
                }

                let buffer = PrimvarBuffer::new(descriptor.name, value);
                log::trace!("{}: cached {} ({} elements)", id, buffer.name(), buffer.len());
                primvars.insert(buffer.name().clone(), buffer);
                fetched += 1;
            }
        }

        tracker.mark_instancer_clean(id);
        log::debug!("Synced instancer {}: {} primvar(s) fetched", id, fetched);

        SyncOutcome::Synced { fetched }
    }

    /// Lock the cache for reading.
    pub fn view(&self) -> PrimvarView<'_> {
        PrimvarView {
            guard: self.primvars.read(),
        }
    }

    /// Copy of the buffer under `name`, if cached.
    pub fn lookup(&self, name: &Token) -> Option<PrimvarBuffer> {
        self.primvars.read().get(name).cloned()
    }

    /// Number of cached primvars.
    pub fn len(&self) -> usize {
        self.primvars.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hdmax_core::{MemorySceneDelegate, Value};
    use hdmax_math::Vec3;

    fn setup() -> (MemorySceneDelegate, ChangeTracker, SdfPath) {
        let delegate = MemorySceneDelegate::new();
        let tracker = ChangeTracker::new();
        let id = SdfPath::new("/Instancer");
        delegate.add_instancer(&id, None).unwrap();
        tracker.instancer_inserted(&id, DirtyBits::PRIMVAR | DirtyBits::INSTANCER);
        (delegate, tracker, id)
    }

    #[test]
    fn test_sync_fetches_dirty_instance_primvars() {
        let (delegate, tracker, id) = setup();
        delegate
            .set_instance_primvar(&id, "instanceTranslations", vec![Vec3::X, Vec3::Y])
            .unwrap();
        delegate
            .set_primvar(&id, "displayColor", Interpolation::Constant, vec![Vec3::ONE])
            .unwrap();

        let cache = PrimvarCache::new();
        let outcome = cache.sync(&id, &delegate, &tracker, |_| {});

        assert_eq!(outcome, SyncOutcome::Synced { fetched: 1 });
        assert_eq!(cache.len(), 1);
        assert!(cache.lookup(&Token::new("displayColor")).is_none());
        assert_eq!(tracker.instancer_dirty_bits(&id), DirtyBits::CLEAN);
    }

    #[test]
    fn test_sync_when_clean_does_nothing() {
        let (delegate, tracker, id) = setup();
        delegate.set_instance_primvar(&id, "instanceScales", vec![Vec3::ONE]).unwrap();

        let cache = PrimvarCache::new();
        cache.sync(&id, &delegate, &tracker, |_| {});
        let outcome = cache.sync(&id, &delegate, &tracker, |_| panic!("not dirty"));

        assert_eq!(outcome, SyncOutcome::Clean);
        assert_eq!(delegate.fetch_count(&id, &Token::new("instanceScales")), 1);
    }

    #[test]
    fn test_new_value_replaces_buffer() {
        let (delegate, tracker, id) = setup();
        let name = Token::new("instanceScales");
        delegate.set_instance_primvar(&id, name.clone(), vec![Vec3::ONE]).unwrap();

        let cache = PrimvarCache::new();
        cache.sync(&id, &delegate, &tracker, |_| {});

        let bits = delegate
            .set_instance_primvar(&id, name.clone(), vec![Vec3::splat(2.0), Vec3::ONE])
            .unwrap();
        tracker.mark_instancer_dirty(&id, bits);
        cache.sync(&id, &delegate, &tracker, |_| {});

        let buffer = cache.lookup(&name).unwrap();
        assert_eq!(cache.len(), 1);
        assert_eq!(buffer.len(), 2);
        assert_eq!(buffer.value(), &Value::Float3Array(vec![Vec3::splat(2.0), Vec3::ONE]));
    }

    #[test]
    fn test_empty_value_keeps_previous_buffer() {
        let (delegate, tracker, id) = setup();
        let name = Token::new("instanceScales");
        delegate.set_instance_primvar(&id, name.clone(), vec![Vec3::ONE]).unwrap();

        let cache = PrimvarCache::new();
        cache.sync(&id, &delegate, &tracker, |_| {});

        let bits = delegate.set_instance_primvar(&id, name.clone(), Value::Empty).unwrap();
        tracker.mark_instancer_dirty(&id, bits);
        let outcome = cache.sync(&id, &delegate, &tracker, |_| {});

        assert_eq!(outcome, SyncOutcome::Synced { fetched: 0 });
        assert_eq!(
            cache.lookup(&name).map(|b| b.value().clone()),
            Some(Value::Float3Array(vec![Vec3::ONE]))
        );
    }

    #[test]
    fn test_index_dirty_syncs_without_fetching() {
        let (delegate, tracker, id) = setup();
        delegate.set_instance_primvar(&id, "instanceScales", vec![Vec3::ONE]).unwrap();

        let cache = PrimvarCache::new();
        cache.sync(&id, &delegate, &tracker, |_| {});

        tracker.mark_instancer_dirty(&id, DirtyBits::INSTANCE_INDEX);
        let mut seen = DirtyBits::CLEAN;
        let outcome = cache.sync(&id, &delegate, &tracker, |bits| seen = bits);

        assert_eq!(outcome, SyncOutcome::Synced { fetched: 0 });
        assert_eq!(seen, DirtyBits::INSTANCE_INDEX);
        assert_eq!(delegate.total_fetches(), 1);
    }

    #[test]
    fn test_sync_after_another_thread_cleaned_skips_fetch() {
        let (delegate, tracker, id) = setup();
        delegate.set_instance_primvar(&id, "instanceScales", vec![Vec3::ONE]).unwrap();
        let cache = PrimvarCache::new();

        // Dirty at the unguarded check; another thread syncs before the lock is taken
        assert!(needs_sync(tracker.instancer_dirty_bits(&id), &id));
        std::thread::scope(|s| {
            s.spawn(|| tracker.mark_instancer_clean(&id));
        });

        let outcome = cache.sync_locked(
            cache.primvars.write(),
            &id,
            &delegate,
            &tracker,
            |_| panic!("already synced"),
        );

        assert_eq!(outcome, SyncOutcome::AlreadySynced);
        assert_eq!(delegate.total_fetches(), 0);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_transform_dirty_alone_does_not_sync() {
        let (delegate, tracker, id) = setup();
        let cache = PrimvarCache::new();
        cache.sync(&id, &delegate, &tracker, |_| {});

        tracker.mark_instancer_dirty(&id, DirtyBits::TRANSFORM);
        assert_eq!(cache.sync(&id, &delegate, &tracker, |_| {}), SyncOutcome::Clean);
    }
}
