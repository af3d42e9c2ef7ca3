//! The RAII sync-mod guard (§9 "an explicit `SceneTransaction` guard that
//! owns the lock for its scope via RAII ... `Drop` performs the
//! final-unlock bookkeeping"). `SceneManager`'s own setters already
//! auto-lock/unlock when called outside a transaction (§4.4 step 4), so
//! this guard exists for callers that need several mutations published
//! together (S2: ten positions set, then one unlock makes all ten visible
//! atomically).

use va_scene::SceneManager;

/// Holds the sync-mod lock for its scope. Reentrant per the owning thread
/// (nested `SceneTransaction::begin` calls on the same thread just bump
/// the manager's internal depth counter); the *final* drop on that thread
/// is what publishes the new head state.
pub struct SceneTransaction<'a> {
    scene: &'a SceneManager,
}

impl<'a> SceneTransaction<'a> {
    pub fn begin(scene: &'a SceneManager) -> Self {
        scene.lock_update();
        Self { scene }
    }

    /// Access the scene manager while the transaction is held. Plain
    /// reborrow — the mutating methods on `SceneManager` already check for
    /// (and reuse) the calling thread's active transaction.
    pub fn scene(&self) -> &SceneManager {
        self.scene
    }
}

impl Drop for SceneTransaction<'_> {
    fn drop(&mut self) {
        self.scene.unlock_update().expect("this guard's begin() call owns the transaction it is dropping");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use va_scene::SceneManagerConfig;

    #[test]
    fn batched_mutations_publish_together() {
        let scene = SceneManager::new(SceneManagerConfig::default());
        let ids: Vec<_> = (0..10).map(|i| scene.create_sound_source(format!("s{i}")).unwrap()).collect();

        let generation_before = scene.generation();
        {
            let txn = SceneTransaction::begin(&scene);
            for (i, id) in ids.iter().enumerate() {
                txn.scene().set_sound_source_pose(*id, va_core::Vec3::new(i as f64, 0.0, 0.0), va_core::Orientation::identity()).unwrap();
            }
        }
        assert_eq!(scene.generation(), generation_before + 1);

        let head = scene.head();
        for (i, id) in ids.iter().enumerate() {
            assert_eq!(head.sources.get(&id.0).unwrap().motion.position.x, i as f64);
        }
    }
}
</content>
