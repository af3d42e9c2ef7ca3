//! Scene manager and the synchronized-update ("sync-mod") protocol (§4.4).

use std::sync::atomic::{AtomicI32, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, ThreadId};
use std::time::Duration;

use parking_lot::{Condvar, Mutex, RwLock};

use va_core::{AuralizationMode, Orientation, Vec3, VaError, VaResult};
use va_directivity::DirectivityId;

use crate::ids::{PortalId, ReceiverId, SoundSourceId};
use crate::state::{PortalState, ReceiverState, SceneStateRecord, SoundSourceState};

struct Transaction {
    owner: Option<ThreadId>,
    depth: u32,
    draft: Option<SceneStateRecord>,
}

/// Construction-time limits and the `Calibration` defaults (§6) a
/// [`SceneManager`] enforces.
#[derive(Debug, Clone, Copy)]
pub struct SceneManagerConfig {
    pub max_sound_sources: usize,
    pub max_receivers: usize,
}

impl Default for SceneManagerConfig {
    fn default() -> Self {
        Self { max_sound_sources: 512, max_receivers: 32 }
    }
}

/// Owns every scene-state record and publishes one as "head" (§4.4).
///
/// The reentrant sync-mod mutex (§9 "an explicit `SceneTransaction` guard")
/// is expressed here as the pair [`SceneManager::lock_update`] /
/// [`SceneManager::unlock_update`] plus an internal spin-counter/owner-thread
/// bookkeeping (`Transaction`); callers that prefer RAII can wrap these in
/// their own guard (`va-server` does, see `SceneTransaction`).
pub struct SceneManager {
    head: RwLock<Arc<SceneStateRecord>>,
    txn: Mutex<Transaction>,
    txn_cv: Condvar,
    generation_lock: Mutex<()>,
    generation: AtomicU64,
    generation_cv: Condvar,
    next_scene_id: AtomicU64,
    next_source_id: AtomicI32,
    next_receiver_id: AtomicI32,
    next_portal_id: AtomicI32,
    config: SceneManagerConfig,
}

impl SceneManager {
    pub fn new(config: SceneManagerConfig) -> Self {
        Self {
            head: RwLock::new(Arc::new(SceneStateRecord::empty(0, 0))),
            txn: Mutex::new(Transaction { owner: None, depth: 0, draft: None }),
            txn_cv: Condvar::new(),
            generation_lock: Mutex::new(()),
            generation: AtomicU64::new(0),
            generation_cv: Condvar::new(),
            next_scene_id: AtomicU64::new(1),
            next_source_id: AtomicI32::new(0),
            next_receiver_id: AtomicI32::new(0),
            next_portal_id: AtomicI32::new(0),
            config,
        }
    }

    /// The currently published, immutable scene state (§3 "head state").
    pub fn head(&self) -> Arc<SceneStateRecord> {
        self.head.read().clone()
    }

    /// Monotonic publish counter; the core thread polls/waits on this to
    /// detect a new head (§4.9 step 2).
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    /// Block until `generation()` differs from `last_seen`, or `timeout`
    /// elapses. Returns the observed generation either way.
    pub fn wait_for_update(&self, last_seen: u64, timeout: Duration) -> u64 {
        let mut guard = self.generation_lock.lock();
        let current = self.generation.load(Ordering::Acquire);
        if current != last_seen {
            return current;
        }
        self.generation_cv.wait_for(&mut guard, timeout);
        self.generation.load(Ordering::Acquire)
    }

    fn current_thread_owns(&self) -> bool {
        self.txn.lock().owner == Some(thread::current().id())
    }

    /// Acquire the sync-mod transaction (§4.4 step 1). Reentrant for the
    /// calling thread: nested calls just bump the spin counter. Blocks if
    /// another thread currently owns the transaction.
    pub fn lock_update(&self) {
        let tid = thread::current().id();
        let mut txn = self.txn.lock();
        loop {
            match txn.owner {
                Some(owner) if owner == tid => {
                    txn.depth += 1;
                    return;
                }
                None => {
                    let head = self.head.read().clone();
                    let scene_id = self.next_scene_id.fetch_add(1, Ordering::AcqRel);
                    txn.owner = Some(tid);
                    txn.depth = 1;
                    txn.draft = Some(head.derive(scene_id, head.timestamp_block + 1));
                    return;
                }
                Some(_) => {
                    self.txn_cv.wait(&mut txn);
                }
            }
        }
    }

    /// Release one level of the sync-mod transaction (§4.4 step 3). On the
    /// final (depth-1 -> 0) unlock, the draft becomes the new immutable head
    /// and every thread waiting in `lock_update`/`wait_for_update` is woken.
    pub fn unlock_update(&self) -> VaResult<()> {
        let tid = thread::current().id();
        let mut txn = self.txn.lock();
        if txn.owner != Some(tid) {
            return Err(VaError::modal("UnlockUpdate called without a matching LockUpdate on this thread"));
        }
        txn.depth -= 1;
        if txn.depth > 0 {
            return Ok(());
        }
        let draft = txn.draft.take().expect("draft present for the owning thread's transaction");
        *self.head.write() = Arc::new(draft);
        txn.owner = None;
        self.txn_cv.notify_all();
        drop(txn);

        self.generation.fetch_add(1, Ordering::AcqRel);
        let _guard = self.generation_lock.lock();
        self.generation_cv.notify_all();
        Ok(())
    }

    /// Run `f` against the live draft, auto-locking/unlocking for the
    /// duration of the call if the current thread isn't already inside a
    /// transaction (§4.4 step 4).
    fn with_draft<R>(&self, f: impl FnOnce(&mut SceneStateRecord) -> R) -> R {
        let auto_locked = !self.current_thread_owns();
        if auto_locked {
            self.lock_update();
        }
        let result = {
            let mut txn = self.txn.lock();
            let draft = txn.draft.as_mut().expect("transaction active for this thread");
            f(draft)
        };
        if auto_locked {
            self.unlock_update().expect("this thread just acquired the transaction it is unlocking");
        }
        result
    }

    // ---- Sound sources --------------------------------------------------

    pub fn create_sound_source(&self, name: impl Into<String>) -> VaResult<SoundSourceId> {
        let name = name.into();
        let cap = self.config.max_sound_sources;
        self.with_draft(|draft| {
            if draft.active_source_count() >= cap {
                return Err(VaError::invalid_parameter(format!("active sound source count at configured cap ({cap})")));
            }
            let id = SoundSourceId(self.next_source_id.fetch_add(1, Ordering::AcqRel));
            draft.sources.insert(id.0, Arc::new(SoundSourceState::new(id, name, draft.timestamp_block)));
            Ok(id)
        })
    }

    pub fn delete_sound_source(&self, id: SoundSourceId) -> VaResult<()> {
        self.with_draft(|draft| {
            draft.sources.remove(&id.0).map(|_| ()).ok_or_else(|| VaError::invalid_id(id))
        })
    }

    pub fn sound_source(&self, id: SoundSourceId) -> VaResult<Arc<SoundSourceState>> {
        self.head.read().sources.get(&id.0).cloned().ok_or_else(|| VaError::invalid_id(id))
    }

    pub fn list_sound_sources(&self) -> Vec<SoundSourceId> {
        self.head.read().sources.keys().map(|&id| SoundSourceId(id)).collect()
    }

    fn modify_source(&self, id: SoundSourceId, f: impl FnOnce(&mut SoundSourceState)) -> VaResult<()> {
        self.with_draft(|draft| {
            let entry = draft.sources.get(&id.0).ok_or_else(|| VaError::invalid_id(id))?;
            let mut next = (**entry).clone();
            f(&mut next);
            draft.sources.insert(id.0, Arc::new(next));
            Ok(())
        })
    }

    pub fn set_sound_source_pose(&self, id: SoundSourceId, position: Vec3, orientation: Orientation) -> VaResult<()> {
        self.modify_source(id, |s| s.motion = s.motion.with_pose(position, orientation))
    }

    pub fn set_sound_source_enabled(&self, id: SoundSourceId, enabled: bool) -> VaResult<()> {
        self.modify_source(id, |s| s.enabled = enabled)
    }

    pub fn set_sound_source_muted(&self, id: SoundSourceId, muted: bool) -> VaResult<()> {
        self.modify_source(id, |s| s.muted = muted)
    }

    pub fn set_sound_source_name(&self, id: SoundSourceId, name: impl Into<String>) -> VaResult<()> {
        let name = name.into();
        self.modify_source(id, |s| s.name = name)
    }

    pub fn set_sound_source_power(&self, id: SoundSourceId, sound_power: f64) -> VaResult<()> {
        if sound_power < 0.0 {
            return Err(VaError::invalid_parameter("sound power must be non-negative"));
        }
        self.modify_source(id, |s| s.sound_power = sound_power)
    }

    pub fn set_sound_source_directivity(&self, id: SoundSourceId, directivity_id: Option<DirectivityId>) -> VaResult<()> {
        self.modify_source(id, |s| s.directivity_id = directivity_id)
    }

    pub fn set_sound_source_signal_source(&self, id: SoundSourceId, signal_source_id: Option<String>) -> VaResult<()> {
        self.modify_source(id, |s| s.signal_source_id = signal_source_id)
    }

    pub fn set_sound_source_auralization_mode(&self, id: SoundSourceId, mode: AuralizationMode) -> VaResult<()> {
        self.modify_source(id, |s| s.auralization_mode = mode)
    }

    // ---- Receivers --------------------------------------------------

    pub fn create_receiver(&self, name: impl Into<String>) -> VaResult<ReceiverId> {
        let name = name.into();
        let cap = self.config.max_receivers;
        self.with_draft(|draft| {
            if draft.active_receiver_count() >= cap {
                return Err(VaError::invalid_parameter(format!("active receiver count at configured cap ({cap})")));
            }
            let id = ReceiverId(self.next_receiver_id.fetch_add(1, Ordering::AcqRel));
            draft.receivers.insert(id.0, Arc::new(ReceiverState::new(id, name, draft.timestamp_block)));
            Ok(id)
        })
    }

    pub fn delete_receiver(&self, id: ReceiverId) -> VaResult<()> {
        self.with_draft(|draft| draft.receivers.remove(&id.0).map(|_| ()).ok_or_else(|| VaError::invalid_id(id)))
    }

    pub fn receiver(&self, id: ReceiverId) -> VaResult<Arc<ReceiverState>> {
        self.head.read().receivers.get(&id.0).cloned().ok_or_else(|| VaError::invalid_id(id))
    }

    pub fn list_receivers(&self) -> Vec<ReceiverId> {
        self.head.read().receivers.keys().map(|&id| ReceiverId(id)).collect()
    }

    fn modify_receiver(&self, id: ReceiverId, f: impl FnOnce(&mut ReceiverState)) -> VaResult<()> {
        self.with_draft(|draft| {
            let entry = draft.receivers.get(&id.0).ok_or_else(|| VaError::invalid_id(id))?;
            let mut next = (**entry).clone();
            f(&mut next);
            draft.receivers.insert(id.0, Arc::new(next));
            Ok(())
        })
    }

    pub fn set_receiver_pose(&self, id: ReceiverId, position: Vec3, orientation: Orientation) -> VaResult<()> {
        self.modify_receiver(id, |r| r.motion = r.motion.with_pose(position, orientation))
    }

    pub fn set_receiver_real_world_pose(&self, id: ReceiverId, position: Vec3, orientation: Orientation) -> VaResult<()> {
        self.modify_receiver(id, |r| {
            r.motion.real_world_position = position;
            r.motion.real_world_orientation = orientation;
        })
    }

    pub fn set_receiver_head_above_torso(&self, id: ReceiverId, orientation: Orientation) -> VaResult<()> {
        self.modify_receiver(id, |r| r.motion.head_above_torso = orientation)
    }

    pub fn set_receiver_enabled(&self, id: ReceiverId, enabled: bool) -> VaResult<()> {
        self.modify_receiver(id, |r| r.enabled = enabled)
    }

    pub fn set_receiver_muted(&self, id: ReceiverId, muted: bool) -> VaResult<()> {
        self.modify_receiver(id, |r| r.muted = muted)
    }

    pub fn set_receiver_name(&self, id: ReceiverId, name: impl Into<String>) -> VaResult<()> {
        let name = name.into();
        self.modify_receiver(id, |r| r.name = name)
    }

    pub fn set_receiver_directivity(&self, id: ReceiverId, directivity_id: Option<DirectivityId>) -> VaResult<()> {
        self.modify_receiver(id, |r| r.directivity_id = directivity_id)
    }

    pub fn set_receiver_auralization_mode(&self, id: ReceiverId, mode: AuralizationMode) -> VaResult<()> {
        self.modify_receiver(id, |r| r.auralization_mode = mode)
    }

    // ---- Portals --------------------------------------------------

    pub fn create_portal(&self, name: impl Into<String>) -> VaResult<PortalId> {
        let name = name.into();
        self.with_draft(|draft| {
            let id = PortalId(self.next_portal_id.fetch_add(1, Ordering::AcqRel));
            draft.portals.insert(id.0, Arc::new(PortalState::new(id, name, draft.timestamp_block)));
            Ok(id)
        })
    }

    pub fn delete_portal(&self, id: PortalId) -> VaResult<()> {
        self.with_draft(|draft| draft.portals.remove(&id.0).map(|_| ()).ok_or_else(|| VaError::invalid_id(id)))
    }

    /// Hard reset (§5 cancellation): drop the head back to an empty scene.
    /// Does not affect the sync-mod transaction machinery — a caller mid
    /// transaction keeps its draft.
    pub fn reset(&self) {
        let scene_id = self.next_scene_id.fetch_add(1, Ordering::AcqRel);
        *self.head.write() = Arc::new(SceneStateRecord::empty(scene_id, 0));
        self.generation.fetch_add(1, Ordering::AcqRel);
        let _guard = self.generation_lock.lock();
        self.generation_cv.notify_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Barrier;

    #[test]
    fn s2_synchronized_update_atomicity() {
        let mgr = SceneManager::new(SceneManagerConfig::default());
        let ids: Vec<_> = (0..10).map(|i| mgr.create_sound_source(format!("s{i}")).unwrap()).collect();

        mgr.lock_update();
        for (i, id) in ids.iter().enumerate() {
            mgr.set_sound_source_pose(*id, Vec3::new(i as f64, 0.0, 0.0), Orientation::identity()).unwrap();
        }
        let before_unlock = mgr.head();
        // No position changed on the *published* head yet.
        assert_eq!(before_unlock.sources[&ids[9].0].motion.position, Vec3::zeros());
        mgr.unlock_update().unwrap();

        let after = mgr.head();
        for (i, id) in ids.iter().enumerate() {
            assert_eq!(after.sources[&id.0].motion.position, Vec3::new(i as f64, 0.0, 0.0));
        }
    }

    #[test]
    fn nested_lock_update_publishes_once() {
        let mgr = SceneManager::new(SceneManagerConfig::default());
        let id = mgr.create_sound_source("s").unwrap();
        let gen_before = mgr.generation();

        mgr.lock_update();
        mgr.lock_update();
        mgr.lock_update();
        mgr.set_sound_source_muted(id, true).unwrap();
        mgr.unlock_update().unwrap();
        assert_eq!(mgr.generation(), gen_before, "still nested, no publish yet");
        mgr.unlock_update().unwrap();
        assert_eq!(mgr.generation(), gen_before, "still nested, no publish yet");
        mgr.unlock_update().unwrap();
        assert_eq!(mgr.generation(), gen_before + 1, "final unlock publishes exactly once");
    }

    #[test]
    fn unlock_without_lock_is_modal_error() {
        let mgr = SceneManager::new(SceneManagerConfig::default());
        assert!(matches!(mgr.unlock_update(), Err(VaError::ModalError(_))));
    }

    #[test]
    fn setter_without_lock_auto_locks_for_one_call() {
        let mgr = SceneManager::new(SceneManagerConfig::default());
        let id = mgr.create_sound_source("s").unwrap();
        mgr.set_sound_source_muted(id, true).unwrap();
        assert!(mgr.sound_source(id).unwrap().muted);
    }

    #[test]
    fn create_beyond_cap_is_invalid_parameter_and_leaves_scene_unchanged() {
        let mgr = SceneManager::new(SceneManagerConfig { max_sound_sources: 1, max_receivers: 32 });
        mgr.create_sound_source("a").unwrap();
        let before = mgr.head().sources.len();
        assert!(matches!(mgr.create_sound_source("b"), Err(VaError::InvalidParameter(_))));
        assert_eq!(mgr.head().sources.len(), before);
    }

    #[test]
    fn concurrent_setter_from_other_thread_blocks_until_unlock() {
        let mgr = Arc::new(SceneManager::new(SceneManagerConfig::default()));
        let id = mgr.create_sound_source("s").unwrap();
        mgr.lock_update();

        let barrier = Arc::new(Barrier::new(2));
        let mgr2 = mgr.clone();
        let barrier2 = barrier.clone();
        let handle = thread::spawn(move || {
            barrier2.wait();
            mgr2.set_sound_source_muted(id, true).unwrap();
        });

        barrier.wait();
        std::thread::sleep(Duration::from_millis(20));
        assert!(!mgr.sound_source(id).unwrap().muted, "other thread must still be blocked");
        mgr.unlock_update().unwrap();
        handle.join().unwrap();
        assert!(mgr.sound_source(id).unwrap().muted);
    }
}
</content>
