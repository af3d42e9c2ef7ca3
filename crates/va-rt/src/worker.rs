//! The core thread itself (§4.9): a dedicated worker that wakes on scene
//! publication (or a periodic timeout), pushes updates to every renderer
//! and reproduction, and drains the event broadcaster.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use va_core::AuralizationMode;
use va_events::EventManager;
use va_scene::SceneManager;

use crate::registry::CoreThreadRegistry;

/// Supplies the current global auralization mode (§5 "global" state):
/// unversioned, read fresh every iteration regardless of whether the scene
/// itself changed. The core facade owns the actual storage; this trait
/// keeps `va-rt` from depending on `va-server`.
pub trait GlobalAuralizationModeSource: Send + Sync {
    fn current(&self) -> AuralizationMode;
}

/// A `GlobalAuralizationModeSource` that never changes, useful for tests
/// and for embedders that do not expose a global mode control.
pub struct FixedAuralizationMode(pub AuralizationMode);

impl GlobalAuralizationModeSource for FixedAuralizationMode {
    fn current(&self) -> AuralizationMode {
        self.0
    }
}

/// Owns the core thread's join handle and shutdown flag (§4.9, §5 thread
/// class 2: "high priority, just below the audio driver's").
pub struct CoreThread {
    shutdown: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl CoreThread {
    pub fn spawn(scene: Arc<SceneManager>, registry: Arc<CoreThreadRegistry>, global_mode: Arc<dyn GlobalAuralizationModeSource>, events: Arc<EventManager>, poll_interval: Duration) -> Self {
        let shutdown = Arc::new(AtomicBool::new(false));
        let worker_shutdown = shutdown.clone();

        let handle = std::thread::Builder::new()
            .name("va-core".into())
            .spawn(move || core_loop(scene, registry, global_mode, events, poll_interval, worker_shutdown))
            .expect("spawning the core thread");

        Self { shutdown, handle: Some(handle) }
    }

    pub fn stop(&mut self) {
        self.shutdown.store(true, Ordering::Release);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for CoreThread {
    fn drop(&mut self) {
        self.stop();
    }
}

fn core_loop(scene: Arc<SceneManager>, registry: Arc<CoreThreadRegistry>, global_mode: Arc<dyn GlobalAuralizationModeSource>, events: Arc<EventManager>, poll_interval: Duration, shutdown: Arc<AtomicBool>) {
    va_driver::set_realtime_priority();

    let mut last_seen = scene.generation();
    loop {
        if shutdown.load(Ordering::Acquire) {
            return;
        }

        let span = tracing::trace_span!("core_tick");
        let _enter = span.enter();
        let started = std::time::Instant::now();

        let observed = scene.wait_for_update(last_seen, poll_interval);
        if observed != last_seen {
            let head = scene.head();

            for renderer in registry.renderers() {
                renderer.lock().update_scene(&head);
            }

            for (receiver_id, reproduction) in registry.reproduction_targets() {
                if let Some(receiver) = head.receivers.get(&receiver_id.0) {
                    reproduction.lock().update_scene(receiver);
                }
            }

            last_seen = observed;
        }

        let mode = global_mode.current();
        for renderer in registry.renderers() {
            renderer.lock().update_global_auralization_mode(mode);
        }

        events.broadcast_events();

        tracing::trace!(elapsed_us = started.elapsed().as_micros() as u64, "core tick complete");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    use parking_lot::Mutex;
    use va_core::{AudioSource, PlanarBlock};
    use va_engine::{HardwareOutput, RecordingSink, Reproduction};
    use va_render::AudioRenderer;
    use va_scene::{ReceiverState, SceneManagerConfig, SceneStateRecord};

    use crate::registry::ReproductionBinding;

    struct CountingRenderer {
        scene_updates: Arc<AtomicUsize>,
        mode_updates: Arc<AtomicUsize>,
    }

    impl AudioSource for CountingRenderer {
        fn num_channels(&self) -> usize {
            2
        }
        fn process(&mut self, _output: &mut PlanarBlock) {}
    }

    impl AudioRenderer for CountingRenderer {
        fn update_scene(&mut self, _scene: &SceneStateRecord) {
            self.scene_updates.fetch_add(1, Ordering::AcqRel);
        }
        fn update_global_auralization_mode(&mut self, _mode: AuralizationMode) {
            self.mode_updates.fetch_add(1, Ordering::AcqRel);
        }
    }

    struct CountingReproduction {
        scene_updates: Arc<AtomicUsize>,
        outputs: Vec<HardwareOutput>,
    }

    impl AudioSource for CountingReproduction {
        fn num_channels(&self) -> usize {
            2
        }
        fn process(&mut self, _output: &mut PlanarBlock) {}
    }

    impl Reproduction for CountingReproduction {
        fn set_input_datasource(&mut self, _source: Box<dyn AudioSource>) -> va_core::VaResult<()> {
            Ok(())
        }
        fn output_datasource(&self) -> &dyn AudioSource {
            self
        }
        fn target_outputs(&self) -> &[HardwareOutput] {
            &self.outputs
        }
        fn update_scene(&mut self, _head: &ReceiverState) {
            self.scene_updates.fetch_add(1, Ordering::AcqRel);
        }
        fn set_recording_sink(&mut self, _sink: Option<Box<dyn RecordingSink>>) -> va_core::VaResult<()> {
            Ok(())
        }
        fn begin_streaming(&mut self) {}
    }

    fn wait_until(poll: impl Fn() -> bool) {
        for _ in 0..400 {
            if poll() {
                return;
            }
            std::thread::sleep(Duration::from_millis(5));
        }
        panic!("condition never became true");
    }

    #[test]
    fn propagates_scene_updates_and_global_mode_every_tick() {
        let scene = Arc::new(SceneManager::new(SceneManagerConfig::default()));
        let registry = Arc::new(CoreThreadRegistry::new());
        let events = Arc::new(EventManager::new());

        let renderer_scene_updates = Arc::new(AtomicUsize::new(0));
        let renderer_mode_updates = Arc::new(AtomicUsize::new(0));
        registry.add_renderer(Arc::new(Mutex::new(CountingRenderer {
            scene_updates: renderer_scene_updates.clone(),
            mode_updates: renderer_mode_updates.clone(),
        })));

        let receiver_id = scene.create_receiver("listener").unwrap();
        let reproduction_scene_updates = Arc::new(AtomicUsize::new(0));
        registry.add_reproduction(ReproductionBinding {
            receiver_id,
            reproduction: Arc::new(Mutex::new(CountingReproduction { scene_updates: reproduction_scene_updates.clone(), outputs: Vec::new() })),
        });

        let mut core = CoreThread::spawn(scene.clone(), registry, Arc::new(FixedAuralizationMode(AuralizationMode::ALL)), events, Duration::from_millis(10));

        wait_until(|| renderer_scene_updates.load(Ordering::Acquire) >= 1);
        wait_until(|| reproduction_scene_updates.load(Ordering::Acquire) >= 1);
        wait_until(|| renderer_mode_updates.load(Ordering::Acquire) >= 2);

        core.stop();
    }
}
</content>
