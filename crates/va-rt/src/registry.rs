//! The set of live renderers and reproductions the core thread drives
//! (§4.9). Owned jointly by the core facade (which adds/removes entries as
//! the control API creates and destroys renderers/reproductions) and the
//! core thread (which iterates the current set every tick).

use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

use va_engine::Reproduction;
use va_render::AudioRenderer;
use va_scene::ReceiverId;

/// Pairs a reproduction with the receiver whose head pose/state it tracks.
/// A reproduction's `update_scene` (§4.6) takes a single `ReceiverState`,
/// not the whole scene, so something has to know which receiver that is —
/// the facade assigns this at construction time from the `Renderer:<id>`
/// config, not the reproduction itself.
pub struct ReproductionBinding {
    pub receiver_id: ReceiverId,
    pub reproduction: Arc<Mutex<dyn Reproduction>>,
}

/// Shared between the core facade and the core thread. `Arc`'d so both
/// sides can hold it independently of each other's lifetime.
#[derive(Default)]
pub struct CoreThreadRegistry {
    renderers: RwLock<Vec<Arc<Mutex<dyn AudioRenderer>>>>,
    reproductions: RwLock<Vec<ReproductionBinding>>,
}

impl CoreThreadRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_renderer(&self, renderer: Arc<Mutex<dyn AudioRenderer>>) {
        self.renderers.write().push(renderer);
    }

    /// Removes the renderer matching `predicate`. Comparing trait objects
    /// by identity (pointer equality on the underlying allocation) since
    /// `AudioRenderer` carries no id of its own.
    pub fn remove_renderer(&self, predicate: impl Fn(&Arc<Mutex<dyn AudioRenderer>>) -> bool) {
        self.renderers.write().retain(|r| !predicate(r));
    }

    pub fn add_reproduction(&self, binding: ReproductionBinding) {
        self.reproductions.write().push(binding);
    }

    pub fn remove_reproduction(&self, predicate: impl Fn(&ReproductionBinding) -> bool) {
        self.reproductions.write().retain(|b| !predicate(b));
    }

    pub fn renderers(&self) -> Vec<Arc<Mutex<dyn AudioRenderer>>> {
        self.renderers.read().clone()
    }

    pub fn reproduction_targets(&self) -> Vec<(ReceiverId, Arc<Mutex<dyn Reproduction>>)> {
        self.reproductions.read().iter().map(|b| (b.receiver_id, b.reproduction.clone())).collect()
    }
}
</content>
