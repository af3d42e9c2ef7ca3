//! Reference-counted directivity store (§4.3, §8 "for every directivity id
//! and every interleaving of request/release, delete(id) succeeds iff the
//! net count of requests minus releases is zero").

use std::collections::HashMap;
use std::sync::atomic::{AtomicI32, AtomicU32, Ordering};

use parking_lot::RwLock;

use va_core::{VaError, VaResult};

use crate::{Directivity, DirectivityId, NearestNeighbor};

struct Entry {
    backend: Box<dyn Directivity>,
    refcount: AtomicU32,
    file_path: Option<String>,
    class_name: String,
}

/// Snapshot of a directivity's bookkeeping, returned by the control-API
/// `get_info` surface (§6).
#[derive(Debug, Clone)]
pub struct DirectivityInfo {
    pub id: DirectivityId,
    pub class_name: String,
    pub file_path: Option<String>,
    pub refcount: u32,
    pub is_head_above_torso: bool,
    pub num_hrir_taps: usize,
}

/// Container indexed by [`DirectivityId`] (§4.3). `request`/`release` manage
/// per-entry reference counts; `delete` only succeeds at zero references.
pub struct DirectivityManager {
    entries: RwLock<HashMap<i32, Entry>>,
    next_id: AtomicI32,
}

impl Default for DirectivityManager {
    fn default() -> Self {
        Self::new()
    }
}

impl DirectivityManager {
    pub fn new() -> Self {
        Self { entries: RwLock::new(HashMap::new()), next_id: AtomicI32::new(0) }
    }

    /// Register a backend built by a loader, returning its fresh id with
    /// reference count zero (the caller must `request` before use).
    pub fn insert(&self, class_name: impl Into<String>, file_path: Option<String>, backend: Box<dyn Directivity>) -> DirectivityId {
        let id = self.next_id.fetch_add(1, Ordering::AcqRel);
        self.entries.write().insert(id, Entry { backend, refcount: AtomicU32::new(0), file_path, class_name: class_name.into() });
        DirectivityId(id)
    }

    /// Bump the reference count and confirm the id is live (§4.3 `request`).
    pub fn request(&self, id: DirectivityId) -> VaResult<()> {
        let entries = self.entries.read();
        let entry = entries.get(&id.0).ok_or_else(|| VaError::invalid_id(id))?;
        entry.refcount.fetch_add(1, Ordering::AcqRel);
        Ok(())
    }

    /// Drop a reference acquired via `request`.
    pub fn release(&self, id: DirectivityId) -> VaResult<()> {
        let entries = self.entries.read();
        let entry = entries.get(&id.0).ok_or_else(|| VaError::invalid_id(id))?;
        let previous = entry.refcount.fetch_update(Ordering::AcqRel, Ordering::Acquire, |c| Some(c.saturating_sub(1)));
        if matches!(previous, Ok(0)) {
            return Err(VaError::invalid_parameter(format!("directivity {id} released without a matching request")));
        }
        Ok(())
    }

    /// Delete an entry. Succeeds only at zero references (§8 invariant);
    /// otherwise returns `false` (S3: "attempt DeleteDirectivity(D) returns
    /// false and D remains valid") rather than an error, matching the
    /// boolean-returning control API described in §8 scenario S3.
    pub fn delete(&self, id: DirectivityId) -> VaResult<bool> {
        let mut entries = self.entries.write();
        let Some(entry) = entries.get(&id.0) else {
            return Err(VaError::invalid_id(id));
        };
        if entry.refcount.load(Ordering::Acquire) != 0 {
            return Ok(false);
        }
        entries.remove(&id.0);
        Ok(true)
    }

    pub fn refcount(&self, id: DirectivityId) -> VaResult<u32> {
        let entries = self.entries.read();
        let entry = entries.get(&id.0).ok_or_else(|| VaError::invalid_id(id))?;
        Ok(entry.refcount.load(Ordering::Acquire))
    }

    pub fn info(&self, id: DirectivityId) -> VaResult<DirectivityInfo> {
        let entries = self.entries.read();
        let entry = entries.get(&id.0).ok_or_else(|| VaError::invalid_id(id))?;
        Ok(DirectivityInfo {
            id,
            class_name: entry.class_name.clone(),
            file_path: entry.file_path.clone(),
            refcount: entry.refcount.load(Ordering::Acquire),
            is_head_above_torso: entry.backend.is_head_above_torso(),
            num_hrir_taps: entry.backend.len_hrir_taps(),
        })
    }

    pub fn list(&self) -> Vec<DirectivityId> {
        self.entries.read().keys().map(|&id| DirectivityId(id)).collect()
    }

    pub fn nearest_neighbor(&self, id: DirectivityId, azimuth_deg: f64, elevation_deg: f64) -> VaResult<NearestNeighbor> {
        let entries = self.entries.read();
        let entry = entries.get(&id.0).ok_or_else(|| VaError::invalid_id(id))?;
        Ok(entry.backend.nearest_neighbor(azimuth_deg, elevation_deg))
    }

    /// Copy the HRIR for `id` at the given direction into the caller's
    /// buffers. Returns `false` (buffers untouched) on a missing id or a
    /// backend with no impulse-response representation — the audio-thread
    /// caller treats this as "render silence" (§4.5 failure semantics)
    /// rather than propagating an error across the block boundary.
    pub fn hrir(&self, id: DirectivityId, azimuth_deg: f64, elevation_deg: f64, distance_m: Option<f64>, out_left: &mut [f32], out_right: &mut [f32]) -> bool {
        let entries = self.entries.read();
        match entries.get(&id.0) {
            Some(entry) => entry.backend.hrir(azimuth_deg, elevation_deg, distance_m, out_left, out_right),
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{DiscreteHrirDirectivity, HrirFrame};

    fn sample_backend() -> Box<dyn Directivity> {
        Box::new(DiscreteHrirDirectivity::new(
            vec![HrirFrame { azimuth_deg: 0.0, elevation_deg: 0.0, left: vec![1.0], right: vec![1.0] }],
            false,
        ))
    }

    #[test]
    fn s3_reference_counted_lifecycle() {
        let mgr = DirectivityManager::new();
        let id = mgr.insert("Discrete", None, sample_backend());
        mgr.request(id).unwrap();

        assert_eq!(mgr.delete(id).unwrap(), false);
        assert!(mgr.info(id).is_ok());

        mgr.release(id).unwrap();
        assert_eq!(mgr.delete(id).unwrap(), true);
        assert!(matches!(mgr.info(id), Err(VaError::InvalidId(_))));
    }

    #[test]
    fn unknown_id_is_invalid_id_error() {
        let mgr = DirectivityManager::new();
        assert!(matches!(mgr.request(DirectivityId(99)), Err(VaError::InvalidId(_))));
    }
}
</content>
