//! The event broadcaster: a dual-queue handoff from producer threads to a
//! dedicated, low-priority worker thread (§4.10).

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use parking_lot::{Condvar, Mutex, RwLock};

use crate::event::Event;

/// Receives broadcast events, dispatched outside any audio-critical
/// section (§4.10, §4.12). Implementors must not block for long — the
/// worker thread serves every registered handler in turn.
pub trait EventHandler: Send + Sync {
    fn handle(&self, event: &Event);
}

struct HandlerSlot {
    id: u64,
    handler: Arc<dyn EventHandler>,
}

struct Shared {
    outer: Mutex<Vec<Event>>,
    inner: Mutex<Vec<Event>>,
    wake_lock: Mutex<bool>,
    wake_cv: Condvar,
    next_event_id: AtomicU64,
    next_handler_id: AtomicU64,
    handlers: RwLock<Vec<HandlerSlot>>,
    shutdown: AtomicBool,
}

/// Owns the outer/inner queue pair, the registered handler list, and the
/// dedicated event thread. `enqueue_event` is cheap and non-blocking;
/// `broadcast_events` (called from the core thread, §4.9) is what moves
/// events from producer-visible storage to the worker.
pub struct EventManager {
    shared: Arc<Shared>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl Default for EventManager {
    fn default() -> Self {
        Self::new()
    }
}

impl EventManager {
    pub fn new() -> Self {
        let shared = Arc::new(Shared {
            outer: Mutex::new(Vec::new()),
            inner: Mutex::new(Vec::new()),
            wake_lock: Mutex::new(false),
            wake_cv: Condvar::new(),
            next_event_id: AtomicU64::new(1),
            next_handler_id: AtomicU64::new(1),
            handlers: RwLock::new(Vec::new()),
            shutdown: AtomicBool::new(false),
        });

        let worker_shared = shared.clone();
        let handle = std::thread::Builder::new()
            .name("va-event".into())
            .spawn(move || event_worker(worker_shared))
            .expect("spawning the event thread");

        Self { shared, worker: Mutex::new(Some(handle)) }
    }

    /// Register a handler; returns a token usable with
    /// [`Self::unregister_handler`].
    pub fn register_handler(&self, handler: Arc<dyn EventHandler>) -> u64 {
        let id = self.shared.next_handler_id.fetch_add(1, Ordering::AcqRel);
        self.shared.handlers.write().push(HandlerSlot { id, handler });
        id
    }

    pub fn unregister_handler(&self, id: u64) {
        self.shared.handlers.write().retain(|slot| slot.id != id);
    }

    /// Appends to the outer (producer-side) queue. Never blocks and never
    /// touches the inner queue, so it is safe to call from any thread,
    /// including the audio thread's diagnostic-queue drain path in the
    /// core/event threads (but never from the audio callback itself —
    /// see §4.12).
    pub fn enqueue_event(&self, event: Event) {
        self.shared.outer.lock().push(event);
    }

    /// Swap the outer queue into the inner queue and wake the worker
    /// thread (§4.10). Called once per core-thread iteration.
    pub fn broadcast_events(&self) {
        let drained = {
            let mut outer = self.shared.outer.lock();
            if outer.is_empty() {
                return;
            }
            std::mem::take(&mut *outer)
        };

        self.shared.inner.lock().extend(drained);
        *self.shared.wake_lock.lock() = true;
        self.shared.wake_cv.notify_one();
    }

    pub fn pending_count(&self) -> usize {
        self.shared.outer.lock().len() + self.shared.inner.lock().len()
    }
}

impl Drop for EventManager {
    fn drop(&mut self) {
        self.shared.shutdown.store(true, Ordering::Release);
        *self.shared.wake_lock.lock() = true;
        self.shared.wake_cv.notify_one();
        if let Some(handle) = self.worker.lock().take() {
            let _ = handle.join();
        }
    }
}

fn event_worker(shared: Arc<Shared>) {
    loop {
        {
            let mut signaled = shared.wake_lock.lock();
            shared.wake_cv.wait_while(&mut signaled, |signaled| !*signaled);
            *signaled = false;
        }

        if shared.shutdown.load(Ordering::Acquire) {
            return;
        }

        let span = tracing::debug_span!("event_broadcast");
        let _enter = span.enter();

        let batch = std::mem::take(&mut *shared.inner.lock());
        let handlers = shared.handlers.read();
        for mut event in batch {
            event.id = shared.next_event_id.fetch_add(1, Ordering::AcqRel);
            for slot in handlers.iter() {
                slot.handler.handle(&event);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::EventType;
    use std::sync::Mutex as StdMutex;
    use std::time::Duration;

    struct RecordingHandler(Arc<StdMutex<Vec<Event>>>);

    impl EventHandler for RecordingHandler {
        fn handle(&self, event: &Event) {
            self.0.lock().unwrap().push(event.clone());
        }
    }

    fn wait_for(count: usize, seen: &Arc<StdMutex<Vec<Event>>>) {
        for _ in 0..200 {
            if seen.lock().unwrap().len() >= count {
                return;
            }
            std::thread::sleep(Duration::from_millis(5));
        }
        panic!("handler never observed {count} events");
    }

    #[test]
    fn broadcast_assigns_monotonic_ids_and_dispatches() {
        let manager = EventManager::new();
        let seen = Arc::new(StdMutex::new(Vec::new()));
        manager.register_handler(Arc::new(RecordingHandler(seen.clone())));

        manager.enqueue_event(Event::new("test", EventType::ObjectCreated));
        manager.enqueue_event(Event::new("test", EventType::ObjectDeleted));
        manager.broadcast_events();

        wait_for(2, &seen);
        let events = seen.lock().unwrap();
        assert_eq!(events[0].id, 1);
        assert_eq!(events[1].id, 2);
    }

    #[test]
    fn broadcast_with_no_pending_events_is_a_no_op() {
        let manager = EventManager::new();
        assert_eq!(manager.pending_count(), 0);
        manager.broadcast_events();
        assert_eq!(manager.pending_count(), 0);
    }

    #[test]
    fn unregistered_handler_stops_receiving_events() {
        let manager = EventManager::new();
        let seen = Arc::new(StdMutex::new(Vec::new()));
        let token = manager.register_handler(Arc::new(RecordingHandler(seen.clone())));
        manager.unregister_handler(token);

        manager.enqueue_event(Event::new("test", EventType::Reset));
        manager.broadcast_events();
        std::thread::sleep(Duration::from_millis(30));
        assert!(seen.lock().unwrap().is_empty());
    }
}
</content>
