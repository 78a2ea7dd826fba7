//! Dirty-state tracking for instancers.
//!
//! The scene delegate raises dirty bits when the live scene changes; render
//! prims consume them during sync and mark themselves clean afterwards.

use std::collections::HashMap;

use bitflags::bitflags;
use parking_lot::RwLock;

use crate::path::{SdfPath, Token};

bitflags! {
    /// Categories of data that changed since an entity was last synced.
    ///
    /// Bit positions follow Hydra's `HdChangeTracker` so masks can be logged
    /// and compared against USD tooling output.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct DirtyBits: u32 {
        /// Entity changes every frame and must never be treated as clean
        const VARYING        = 1 << 1;
        /// One or more primvars changed
        const PRIMVAR        = 1 << 6;
        /// Instancer-level transform changed
        const TRANSFORM      = 1 << 9;
        /// Instancer relationships (e.g. parent instancer) changed
        const INSTANCER      = 1 << 16;
        /// Instance index lists changed
        const INSTANCE_INDEX = 1 << 17;
    }
}

impl DirtyBits {
    /// Nothing to sync.
    pub const CLEAN: DirtyBits = DirtyBits::empty();
}

/// Per-instancer dirty bits, shared by all render threads.
#[derive(Debug, Default)]
pub struct ChangeTracker {
    instancer_bits: RwLock<HashMap<SdfPath, DirtyBits>>,
}

impl ChangeTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start tracking an instancer with its initial dirty mask.
    pub fn instancer_inserted(&self, id: &SdfPath, initial_bits: DirtyBits) {
        log::debug!("Tracking instancer {} ({:?})", id, initial_bits);
        self.instancer_bits.write().insert(id.clone(), initial_bits);
    }

    /// Stop tracking an instancer.
    pub fn instancer_removed(&self, id: &SdfPath) {
        self.instancer_bits.write().remove(id);
    }

    /// Current dirty bits of an instancer. Untracked instancers are clean.
    pub fn instancer_dirty_bits(&self, id: &SdfPath) -> DirtyBits {
        self.instancer_bits
            .read()
            .get(id)
            .copied()
            .unwrap_or(DirtyBits::CLEAN)
    }

    /// Raise dirty bits on an instancer.
    pub fn mark_instancer_dirty(&self, id: &SdfPath, bits: DirtyBits) {
        if bits.is_empty() {
            return;
        }

        let mut map = self.instancer_bits.write();
        match map.get_mut(id) {
            Some(current) => *current |= bits,
            None => log::warn!("Marking untracked instancer {} dirty", id),
        }
    }

    /// Mark an instancer clean after a successful sync.
    pub fn mark_instancer_clean(&self, id: &SdfPath) {
        if let Some(current) = self.instancer_bits.write().get_mut(id) {
            *current &= DirtyBits::VARYING;
        }
    }

    /// Number of tracked instancers.
    pub fn instancer_count(&self) -> usize {
        self.instancer_bits.read().len()
    }

    pub fn is_any_primvar_dirty(bits: DirtyBits, id: &SdfPath) -> bool {
        let dirty = bits.contains(DirtyBits::PRIMVAR);
        if dirty {
            log::trace!("{}: primvars dirty", id);
        }
        dirty
    }

    /// Instance primvars have no dedicated bits, so any named primvar is
    /// dirty whenever the primvar bit is raised.
    pub fn is_primvar_dirty(bits: DirtyBits, id: &SdfPath, name: &Token) -> bool {
        let dirty = bits.contains(DirtyBits::PRIMVAR);
        if dirty {
            log::trace!("{}: primvar {} dirty", id, name);
        }
        dirty
    }

    pub fn is_instancer_dirty(bits: DirtyBits, id: &SdfPath) -> bool {
        let dirty = bits.contains(DirtyBits::INSTANCER);
        if dirty {
            log::trace!("{}: instancer dirty", id);
        }
        dirty
    }

    pub fn is_instance_index_dirty(bits: DirtyBits, id: &SdfPath) -> bool {
        let dirty = bits.contains(DirtyBits::INSTANCE_INDEX);
        if dirty {
            log::trace!("{}: instance indices dirty", id);
        }
        dirty
    }
}
