//! The signal source manager: hosts every live signal source, serves
//! `fetch_input_data` from the audio thread, and exposes the control-thread
//! creation/deletion/synchronization surface (§4.2).

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel::{unbounded, Receiver, Sender};
use parking_lot::{Condvar, Mutex, RwLock};
use rtrb::Consumer;

use va_core::{PlanarBlock, Sample, VaError, VaResult};

use crate::audiofile::AudiofileSource;
use crate::device_input::DeviceInputSource;
use crate::id::{IdAllocator, SignalSourceKind};
use crate::network::NetworkStreamSource;
use crate::sequencer::SequencerSource;
use crate::source::SignalSource;
use crate::synth::ParametricSynthSource;
use crate::tts::TextToSpeechSource;

struct Entry {
    source: Box<dyn SignalSource>,
    refcount: AtomicU32,
}

struct DeleteRequest {
    id: String,
    ack: Arc<(Mutex<bool>, Condvar)>,
}

/// Owns every live signal source and the two queues that decouple
/// control-thread creation/deletion from the audio thread's per-block
/// working set (§4.2 lifecycle contract).
pub struct SignalSourceManager {
    alloc: IdAllocator,
    entries: RwLock<HashMap<String, Entry>>,
    outputs: Mutex<HashMap<String, Vec<Sample>>>,
    new_sources_tx: Sender<(String, Box<dyn SignalSource>)>,
    new_sources_rx: Receiver<(String, Box<dyn SignalSource>)>,
    delete_tx: Sender<DeleteRequest>,
    delete_rx: Receiver<DeleteRequest>,
    block_size: usize,
    silence: Vec<Sample>,
    stream_counter: AtomicU64,
    counter_lock: Mutex<()>,
    counter_cv: Condvar,
    streaming: AtomicBool,
}

impl SignalSourceManager {
    pub fn new(block_size: usize) -> Self {
        let (new_sources_tx, new_sources_rx) = unbounded();
        let (delete_tx, delete_rx) = unbounded();
        Self {
            alloc: IdAllocator::new(),
            entries: RwLock::new(HashMap::new()),
            outputs: Mutex::new(HashMap::new()),
            new_sources_tx,
            new_sources_rx,
            delete_tx,
            delete_rx,
            block_size,
            silence: vec![0.0; block_size],
            stream_counter: AtomicU64::new(0),
            counter_lock: Mutex::new(()),
            counter_cv: Condvar::new(),
            streaming: AtomicBool::new(false),
        }
    }

    /// Marks whether the driver is actually streaming; `sync_signal_sources`
    /// short-circuits when it isn't (§4.2).
    pub fn set_streaming(&self, streaming: bool) {
        self.streaming.store(streaming, Ordering::Release);
    }

    fn enqueue(&self, id: String, source: Box<dyn SignalSource>) -> String {
        self.new_sources_tx.send((id.clone(), source)).expect("new-sources channel outlives its manager");
        id
    }

    pub fn create_audiofile(&self, samples: Arc<Vec<Sample>>, looping: bool) -> String {
        let id = self.alloc.next(SignalSourceKind::Audiofile);
        self.enqueue(id.clone(), Box::new(AudiofileSource::new(id.clone(), samples, looping)))
    }

    pub fn create_network_stream(&self, consumer: Consumer<Sample>) -> String {
        let id = self.alloc.next(SignalSourceKind::NetworkStream);
        self.enqueue(id.clone(), Box::new(NetworkStreamSource::new(id.clone(), consumer)))
    }

    pub fn create_engine(&self, sample_rate: f64, initial_rpm: f64) -> String {
        let id = self.alloc.next(SignalSourceKind::Engine);
        self.enqueue(id.clone(), Box::new(ParametricSynthSource::engine(id.clone(), sample_rate, initial_rpm)))
    }

    pub fn create_jet_engine(&self, sample_rate: f64, initial_rpm: f64) -> String {
        let id = self.alloc.next(SignalSourceKind::JetEngine);
        self.enqueue(id.clone(), Box::new(ParametricSynthSource::jet_engine(id.clone(), sample_rate, initial_rpm)))
    }

    pub fn create_machine(&self, sample_rate: f64, initial_rpm: f64) -> String {
        let id = self.alloc.next(SignalSourceKind::Machine);
        self.enqueue(id.clone(), Box::new(ParametricSynthSource::machine(id.clone(), sample_rate, initial_rpm)))
    }

    pub fn create_text_to_speech(&self, utterance_id: impl Into<String>, samples: Arc<Vec<Sample>>) -> String {
        let id = self.alloc.next(SignalSourceKind::TextToSpeech);
        self.enqueue(id.clone(), Box::new(TextToSpeechSource::new(id.clone(), utterance_id, samples)))
    }

    pub fn create_sequencer(&self) -> String {
        let id = self.alloc.next(SignalSourceKind::Sequencer);
        self.enqueue(id.clone(), Box::new(SequencerSource::new(id.clone())))
    }

    pub fn create_device_input(&self, device_channel: usize) -> String {
        let id = self.alloc.next(SignalSourceKind::DeviceInput);
        self.enqueue(id.clone(), Box::new(DeviceInputSource::new(id.clone(), device_channel)))
    }

    /// Bump the reference count for `id` (the scene manager calls this when
    /// a sound source binds to it). Errors if `id` has not yet been drained
    /// into the working set — see [`Self::sync_signal_sources`].
    pub fn request(&self, id: &str) -> VaResult<()> {
        let entries = self.entries.read();
        let entry = entries.get(id).ok_or_else(|| VaError::invalid_id(id))?;
        entry.refcount.fetch_add(1, Ordering::AcqRel);
        Ok(())
    }

    pub fn release(&self, id: &str) -> VaResult<()> {
        let entries = self.entries.read();
        let entry = entries.get(id).ok_or_else(|| VaError::invalid_id(id))?;
        let previous = entry.refcount.fetch_update(Ordering::AcqRel, Ordering::Acquire, |c| Some(c.saturating_sub(1)));
        if matches!(previous, Ok(0)) {
            return Err(VaError::invalid_parameter(format!("signal source {id} released without a matching request")));
        }
        Ok(())
    }

    pub fn refcount(&self, id: &str) -> VaResult<u32> {
        let entries = self.entries.read();
        let entry = entries.get(id).ok_or_else(|| VaError::invalid_id(id))?;
        Ok(entry.refcount.load(Ordering::Acquire))
    }

    /// Request deletion of `id`. Refused while referenced (§4.2
    /// `ResourceInUse`). Otherwise enqueues a delete token and blocks until
    /// the audio thread (the next `fetch_input_data` call) has swept it out
    /// of the working set.
    pub fn delete(&self, id: &str) -> VaResult<()> {
        {
            let entries = self.entries.read();
            let entry = entries.get(id).ok_or_else(|| VaError::invalid_id(id))?;
            if entry.refcount.load(Ordering::Acquire) != 0 {
                return Err(VaError::resource_in_use(format!("signal source {id} is still referenced")));
            }
        }

        let ack = Arc::new((Mutex::new(false), Condvar::new()));
        self.delete_tx
            .send(DeleteRequest { id: id.to_string(), ack: ack.clone() })
            .expect("delete-request channel outlives its manager");

        let (lock, cv) = &*ack;
        let mut observed = lock.lock();
        if !*observed {
            let result = cv.wait_for(&mut observed, Duration::from_secs(2));
            if result.timed_out() && !*observed {
                return Err(VaError::Unspecified(format!("delete request for {id} was not observed by the audio thread")));
            }
        }
        Ok(())
    }

    /// Record the current stream counter and block until it advances, i.e.
    /// until a `fetch_input_data` call on the audio thread has happened at
    /// least once since this call began (§4.2). If the driver isn't
    /// streaming this returns immediately.
    pub fn sync_signal_sources(&self) {
        if !self.streaming.load(Ordering::Acquire) {
            return;
        }
        let observed = self.stream_counter.load(Ordering::Acquire);
        let mut guard = self.counter_lock.lock();
        self.counter_cv
            .wait_while(&mut guard, |_| self.stream_counter.load(Ordering::Acquire) == observed);
    }

    /// Audio-thread entry point (§4.2 per-block protocol): fan device input
    /// into passthrough sources, drain the new-source/delete-request queues,
    /// then produce one block from every active source.
    pub fn fetch_input_data(&self, device_input: Option<&PlanarBlock>) {
        let mut entries = self.entries.write();
        let mut outputs = self.outputs.lock();

        while let Ok((id, source)) = self.new_sources_rx.try_recv() {
            outputs.insert(id.clone(), vec![0.0; self.block_size]);
            entries.insert(id, Entry { source, refcount: AtomicU32::new(0) });
        }

        if let Some(input) = device_input {
            for entry in entries.values_mut() {
                entry.source.accept_device_input(input);
            }
        }

        while let Ok(request) = self.delete_rx.try_recv() {
            entries.remove(&request.id);
            outputs.remove(&request.id);
            let (lock, cv) = &*request.ack;
            *lock.lock() = true;
            cv.notify_all();
        }

        for (id, entry) in entries.iter_mut() {
            let buffer = outputs.get_mut(id).expect("output buffer allocated alongside its entry");
            entry.source.fetch_block(0, buffer);
        }

        drop(outputs);
        drop(entries);

        self.stream_counter.fetch_add(1, Ordering::AcqRel);
        let _guard = self.counter_lock.lock();
        self.counter_cv.notify_all();
    }

    /// Copy the most recently produced block for `id` into `out`. Unknown
    /// or unassigned ids (§4.2 "single global silence block") fill `out`
    /// with silence rather than erroring — signal lookups happen on the
    /// audio thread, which never propagates errors across the block
    /// boundary.
    pub fn output_into(&self, id: &str, out: &mut [Sample]) {
        let outputs = self.outputs.lock();
        match outputs.get(id) {
            Some(buffer) => {
                let take = out.len().min(buffer.len());
                out[..take].copy_from_slice(&buffer[..take]);
                out[take..].fill(0.0);
            }
            None => out.fill(0.0),
        }
    }

    pub fn silence(&self) -> &[Sample] {
        &self.silence
    }

    pub fn is_registered(&self, id: &str) -> bool {
        self.entries.read().contains_key(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Barrier;
    use std::thread;

    #[test]
    fn new_source_is_invisible_until_drained() {
        let mgr = SignalSourceManager::new(4);
        let id = mgr.create_audiofile(Arc::new(vec![1.0, 1.0, 1.0, 1.0]), false);
        assert!(!mgr.is_registered(&id));
        assert!(matches!(mgr.request(&id), Err(VaError::InvalidId(_))));

        mgr.fetch_input_data(None);
        assert!(mgr.is_registered(&id));
        mgr.request(&id).unwrap();
        assert_eq!(mgr.refcount(&id).unwrap(), 1);
    }

    #[test]
    fn fetch_produces_silence_for_unknown_ids() {
        let mgr = SignalSourceManager::new(4);
        let mut out = vec![9.0; 4];
        mgr.output_into("no-such-source", &mut out);
        assert_eq!(out, [0.0; 4]);
    }

    #[test]
    fn delete_is_refused_while_referenced() {
        let mgr = SignalSourceManager::new(4);
        let id = mgr.create_sequencer();
        mgr.fetch_input_data(None);
        mgr.request(&id).unwrap();
        assert!(matches!(mgr.delete(&id), Err(VaError::ResourceInUse(_))));
    }

    #[test]
    fn delete_blocks_until_audio_thread_observes_it() {
        let mgr = Arc::new(SignalSourceManager::new(4));
        let id = mgr.create_sequencer();
        mgr.fetch_input_data(None);
        mgr.set_streaming(true);

        let barrier = Arc::new(Barrier::new(2));
        let mgr2 = mgr.clone();
        let barrier2 = barrier.clone();
        let handle = thread::spawn(move || {
            barrier2.wait();
            std::thread::sleep(Duration::from_millis(20));
            mgr2.fetch_input_data(None);
        });

        barrier.wait();
        mgr.delete(&id).unwrap();
        handle.join().unwrap();
        assert!(!mgr.is_registered(&id));
    }

    #[test]
    fn audiofile_output_is_observable_through_manager() {
        let mgr = SignalSourceManager::new(4);
        let id = mgr.create_audiofile(Arc::new(vec![1.0, 2.0, 3.0, 4.0]), false);
        mgr.fetch_input_data(None);
        // Not playing yet: silent.
        let mut out = vec![9.0; 4];
        mgr.output_into(&id, &mut out);
        assert_eq!(out, [0.0; 4]);
    }
}
