//! The core facade (§2 component 12): the single object an embedder talks
//! to. Owns every manager, the output patchbay, the driver backend, and the
//! core thread, and exposes the lifecycle and control-API surface (§5, §6).

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use va_config::VaConfig;
use va_core::{AudioSource, Vec3, VaError, VaResult};
use va_directivity::DirectivityManager;
use va_driver::{AudioDriverBackend, CpalDriverBackend, StreamProperties, TimeoutDriverBackend, VirtualDriverBackend};
use va_engine::{HardwareOutput, HeadphoneEqReproduction, LowFrequencyMixerReproduction, OutputPatchbay, PatchbayRoute, Reproduction, TalkthroughReproduction};
use va_events::EventManager;
use va_render::{BinauralClusteringRenderer, ClusteringConfig};
use va_rt::{CoreThread, CoreThreadRegistry, GlobalAuralizationModeSource, ReproductionBinding};
use va_scene::{ReceiverId, SceneManager, SceneManagerConfig};
use va_signal::SignalSourceManager;

use crate::global::GlobalState;
use crate::transaction::SceneTransaction;

const CORE_THREAD_POLL_INTERVAL: Duration = Duration::from_millis(10);
const DEFAULT_MAX_IR_TAPS: usize = 512;
const DEFAULT_MAX_DELAY_SAMPLES: usize = 4096;

/// Lifecycle state (§5 "cancellation/timeout semantics"). `Fail` is sticky:
/// once entered, every control call returns an error until the facade is
/// dropped and rebuilt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Lifecycle {
    Created,
    Initialized,
    Finalized,
    Fail,
}

/// Resolve the hardware outputs a `Reproduction` instance feeds (§6
/// `Output:<id>`/`OutputDevice:<id>`) into the flat list its constructor
/// wants, in declared-channel order.
fn resolve_outputs(config: &VaConfig, output_ids: &[String]) -> VaResult<Vec<HardwareOutput>> {
    let mut outputs = Vec::new();
    for output_id in output_ids {
        let output = config.outputs.iter().find(|o| &o.id == output_id).ok_or_else(|| VaError::invalid_id(output_id))?;
        for device_id in &output.devices {
            let device = config.output_device(device_id).ok_or_else(|| VaError::invalid_id(device_id))?;
            let position = Vec3::new(device.position[0], device.position[1], device.position[2]);
            let view = Vec3::new(device.view[0], device.view[1], device.view[2]);
            let up = Vec3::new(device.up[0], device.up[1], device.up[2]);
            for &channel in &device.channels {
                outputs.push(HardwareOutput { driver_channel: channel, position, view, up });
            }
        }
    }
    Ok(outputs)
}

/// Build the one reproduction class this facade can wire up from config
/// alone (§9 design note: richer classes — CTC loudspeaker geometry, the
/// binaural mixdown's directivity dependency — need embedder-supplied
/// parameters this crate has no business inventing, and are left to
/// [`VaServer::add_reproduction`]).
fn build_reproduction(class: &str, outputs: Vec<HardwareOutput>, sample_rate: f64, block_size: usize) -> VaResult<Arc<Mutex<dyn Reproduction>>> {
    match class {
        "Talkthrough" => Ok(Arc::new(Mutex::new(TalkthroughReproduction::new(outputs.len().max(1), sample_rate, block_size, outputs)))),
        "HeadphoneEq" => Ok(Arc::new(Mutex::new(HeadphoneEqReproduction::new(sample_rate, block_size, outputs)))),
        "LowFrequencyMixer" => Ok(Arc::new(Mutex::new(LowFrequencyMixerReproduction::new(1, sample_rate, block_size, outputs)))),
        other => Err(VaError::NotImplemented(format!("reproduction class '{other}' has no config-driven factory; construct it and call add_reproduction instead"))),
    }
}

fn stream_properties(config: &VaConfig) -> StreamProperties {
    StreamProperties {
        sample_rate: config.audio_driver.sample_rate,
        block_size: config.audio_driver.buffer_size,
        num_channels: config.audio_driver.output_channels as usize,
    }
}

fn build_driver_backend(config: &VaConfig) -> Box<dyn AudioDriverBackend> {
    let properties = stream_properties(config);
    match config.audio_driver.driver {
        va_config::DriverKind::Virtual => Box::new(VirtualDriverBackend::new(properties)),
        va_config::DriverKind::Timeout => Box::new(TimeoutDriverBackend::new(properties, properties.sample_rate.as_u32() as f64 / properties.block_size.as_usize() as f64)),
        va_config::DriverKind::Asio | va_config::DriverKind::PortAudio => Box::new(CpalDriverBackend::new(properties, config.audio_driver.device.clone())),
    }
}

/// The virtual acoustics engine's core facade. `new` builds every manager
/// and the reproductions config can express directly; `initialize` starts
/// the core thread and the driver stream.
pub struct VaServer {
    config: VaConfig,
    scene: Arc<SceneManager>,
    signal_sources: Arc<SignalSourceManager>,
    directivities: Arc<DirectivityManager>,
    global: Arc<GlobalState>,
    events: Arc<EventManager>,
    registry: Arc<CoreThreadRegistry>,
    driver: Mutex<Box<dyn AudioDriverBackend>>,
    patchbay: Arc<Mutex<OutputPatchbay>>,
    reproduction_input_slots: HashMap<String, usize>,
    core_thread: Mutex<Option<CoreThread>>,
    state: Mutex<Lifecycle>,
}

impl VaServer {
    /// Build every manager and wire up whatever reproductions the config
    /// describes (§4.11). Does not start streaming — see [`Self::initialize`].
    pub fn new(config: VaConfig) -> VaResult<Self> {
        let properties = stream_properties(&config);
        let sample_rate = properties.sample_rate.as_u32() as f64;
        let block_size = properties.block_size.as_usize();

        let scene = Arc::new(SceneManager::new(SceneManagerConfig::default()));
        let signal_sources = Arc::new(SignalSourceManager::new(block_size));
        let directivities = Arc::new(DirectivityManager::new());
        let global = Arc::new(GlobalState::new(config.homogeneous_medium));
        let events = Arc::new(EventManager::new());
        let registry = Arc::new(CoreThreadRegistry::new());

        let mut reproduction_input_slots = HashMap::new();
        let mut input_channel_counts = Vec::new();
        let mut bound: Vec<(usize, Arc<Mutex<dyn Reproduction>>)> = Vec::new();

        for rep_config in &config.reproductions {
            if !rep_config.enabled {
                continue;
            }
            let outputs = resolve_outputs(&config, &rep_config.outputs)?;
            match build_reproduction(&rep_config.class, outputs, sample_rate, block_size) {
                Ok(reproduction) => {
                    let index = input_channel_counts.len();
                    input_channel_counts.push(reproduction.lock().num_channels());
                    reproduction_input_slots.insert(rep_config.id.clone(), index);
                    bound.push((index, reproduction));
                }
                Err(err) => {
                    tracing::warn!(reproduction = %rep_config.id, class = %rep_config.class, error = %err, "skipping config-driven wiring for this reproduction class");
                }
            }
        }

        let routes: Vec<PatchbayRoute> = bound
            .iter()
            .flat_map(|(index, reproduction)| {
                let reproduction = reproduction.lock();
                reproduction
                    .target_outputs()
                    .iter()
                    .enumerate()
                    .map(|(channel, output)| PatchbayRoute { input_index: *index, input_channel: channel, output_channel: output.driver_channel })
                    .collect::<Vec<_>>()
            })
            .collect();

        let mut patchbay = OutputPatchbay::new(&input_channel_counts, properties.num_channels, routes, sample_rate, block_size);
        for (index, reproduction) in &bound {
            let reproduction = reproduction.clone();
            patchbay.bind_input(*index, Box::new(ReproductionTap(reproduction)));
        }

        let driver = Mutex::new(build_driver_backend(&config));

        Ok(Self {
            config,
            scene,
            signal_sources,
            directivities,
            global,
            events,
            registry,
            driver,
            patchbay: Arc::new(Mutex::new(patchbay)),
            reproduction_input_slots,
            core_thread: Mutex::new(None),
            state: Mutex::new(Lifecycle::Created),
        })
    }

    fn guard_not_failed(&self) -> VaResult<()> {
        if *self.state.lock() == Lifecycle::Fail {
            return Err(VaError::modal("the facade has failed and must be rebuilt"));
        }
        Ok(())
    }

    /// Start the core thread and the driver stream (§4.9, §4.8). Idempotent
    /// only from `Created`; calling it again is a modal error.
    pub fn initialize(&self) -> VaResult<()> {
        self.guard_not_failed()?;
        let mut state = self.state.lock();
        if *state != Lifecycle::Created {
            return Err(VaError::modal("initialize can only be called once, from the Created state"));
        }

        let result = (|| -> VaResult<()> {
            self.signal_sources.set_streaming(true);
            let mut core_thread = self.core_thread.lock();
            let global_mode: Arc<dyn GlobalAuralizationModeSource> = self.global.clone();
            *core_thread = Some(CoreThread::spawn(self.scene.clone(), self.registry.clone(), global_mode, self.events.clone(), CORE_THREAD_POLL_INTERVAL));
            drop(core_thread);

            let source: Arc<Mutex<dyn AudioSource>> = self.patchbay.clone();
            self.driver.lock().initialize()?;
            self.driver.lock().start_streaming(source)?;
            Ok(())
        })();

        match result {
            Ok(()) => {
                *state = Lifecycle::Initialized;
                Ok(())
            }
            Err(err) => {
                *state = Lifecycle::Fail;
                Err(err)
            }
        }
    }

    /// Stop streaming, stop the core thread, then finalize the driver (§5
    /// "finalize"). Idempotent: calling it again once `Finalized` is a no-op.
    /// Failure during any step still leaves the facade in `Fail`, never
    /// partially torn down silently.
    pub fn finalize(&self) -> VaResult<()> {
        self.guard_not_failed()?;
        let mut state = self.state.lock();
        if *state == Lifecycle::Finalized {
            return Ok(());
        }

        let result = (|| -> VaResult<()> {
            self.driver.lock().stop_streaming()?;
            self.core_thread.lock().take();
            self.signal_sources.set_streaming(false);
            self.driver.lock().finalize()
        })();

        match result {
            Ok(()) => {
                *state = Lifecycle::Finalized;
                Ok(())
            }
            Err(err) => {
                *state = Lifecycle::Fail;
                Err(err)
            }
        }
    }

    /// Cooperative reset (§5 "reset"): drops scene state and resets every
    /// manager's working set, but does not stop streaming — the next block
    /// simply renders an empty scene. Only valid once initialized.
    pub fn reset(&self) -> VaResult<()> {
        self.guard_not_failed()?;
        if *self.state.lock() != Lifecycle::Initialized {
            return Err(VaError::modal("reset requires the facade to be initialized"));
        }
        self.scene.reset();
        Ok(())
    }

    pub fn scene(&self) -> &SceneManager {
        &self.scene
    }

    pub fn signal_sources(&self) -> &Arc<SignalSourceManager> {
        &self.signal_sources
    }

    pub fn directivities(&self) -> &Arc<DirectivityManager> {
        &self.directivities
    }

    pub fn events(&self) -> &Arc<EventManager> {
        &self.events
    }

    pub fn global(&self) -> &Arc<GlobalState> {
        &self.global
    }

    pub fn config(&self) -> &VaConfig {
        &self.config
    }

    /// Begin a batched scene mutation (§9 `SceneTransaction`).
    pub fn begin_transaction(&self) -> SceneTransaction<'_> {
        SceneTransaction::begin(&self.scene)
    }

    /// Add a renderer not expressible purely from config (the reference
    /// `BinauralClusteringRenderer` needs a receiver id, a signal-source
    /// manager and a directivity manager this facade already owns — see
    /// [`Self::add_binaural_clustering_renderer`] for the config-free
    /// convenience path; this one is for anything else an embedder builds).
    pub fn add_renderer(&self, renderer: Arc<Mutex<dyn va_render::AudioRenderer>>) {
        self.registry.add_renderer(renderer);
    }

    /// Build and register a [`BinauralClusteringRenderer`] for `receiver_id`
    /// (§4.5), using this facade's own signal-source and directivity
    /// managers. `num_clusters` is the only tuning knob exposed at this
    /// layer; everything else in [`ClusteringConfig`] keeps its default.
    pub fn add_binaural_clustering_renderer(&self, receiver_id: ReceiverId, num_clusters: usize) -> VaResult<()> {
        let properties = stream_properties(&self.config);
        let medium = self.global.homogeneous_medium();
        let renderer = BinauralClusteringRenderer::new(
            receiver_id,
            ClusteringConfig::new(num_clusters),
            properties.block_size.as_usize(),
            properties.sample_rate.as_u32() as f64,
            &medium,
            DEFAULT_MAX_IR_TAPS,
            DEFAULT_MAX_DELAY_SAMPLES,
            self.signal_sources.clone(),
            self.directivities.clone(),
        )?;
        self.registry.add_renderer(Arc::new(Mutex::new(renderer)));
        Ok(())
    }

    /// Bind a reproduction built outside the config-driven factory (CTC,
    /// binaural mixdown) to a receiver and patch it into the output
    /// patchbay's fixed routing table alongside whatever config already
    /// wired up.
    pub fn add_reproduction(&self, receiver_id: ReceiverId, reproduction: Arc<Mutex<dyn Reproduction>>) {
        self.registry.add_reproduction(ReproductionBinding { receiver_id, reproduction });
    }

    /// The input slot index [`Self::new`] assigned a config-declared
    /// reproduction's patchbay input, if it was one of the classes this
    /// facade could build directly.
    pub fn reproduction_input_slot(&self, reproduction_id: &str) -> Option<usize> {
        self.reproduction_input_slots.get(reproduction_id).copied()
    }
}

/// Adapts a shared, lockable reproduction into the unshared, unlocked
/// `AudioSource` the patchbay's input slot expects: the patchbay only ever
/// calls `process` from the single audio thread, so the lock here never
/// contends with anything but a rare control-thread parameter change.
struct ReproductionTap(Arc<Mutex<dyn Reproduction>>);

impl AudioSource for ReproductionTap {
    fn num_channels(&self) -> usize {
        self.0.lock().num_channels()
    }

    fn process(&mut self, output: &mut va_core::PlanarBlock) {
        self.0.lock().process(output);
    }

    fn reset(&mut self) {
        self.0.lock().reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use va_config::{AudioDriverConfig, DriverKind, OutputConfig, OutputDeviceConfig, ReproductionConfig, VaConfig};
    use va_core::{BufferSize, SampleRate};

    fn minimal_config() -> VaConfig {
        let mut config = VaConfig::default();
        config.audio_driver = AudioDriverConfig { driver: DriverKind::Virtual, sample_rate: SampleRate::Hz48000, buffer_size: BufferSize::Samples128, output_channels: 2, ..AudioDriverConfig::default() };
        config.output_devices.push(OutputDeviceConfig {
            id: "dev".into(),
            device_type: "Loudspeaker".into(),
            channels: vec![0, 1],
            position: [0.0, 0.0, 0.0],
            view: [0.0, 0.0, -1.0],
            up: [0.0, 1.0, 0.0],
            data_file_name: None,
        });
        config.outputs.push(OutputConfig { id: "out".into(), devices: vec!["dev".into()], description: None, enabled: true });
        config.reproductions.push(ReproductionConfig { id: "talk".into(), class: "Talkthrough".into(), enabled: true, outputs: vec!["out".into()], extra: Default::default() });
        config
    }

    #[test]
    fn builds_and_initializes_with_a_config_driven_talkthrough_reproduction() {
        let server = VaServer::new(minimal_config()).unwrap();
        assert_eq!(server.reproduction_input_slot("talk"), Some(0));
        server.initialize().unwrap();
        server.finalize().unwrap();
    }

    #[test]
    fn double_initialize_is_a_modal_error() {
        let server = VaServer::new(minimal_config()).unwrap();
        server.initialize().unwrap();
        assert!(matches!(server.initialize(), Err(VaError::ModalError(_))));
        server.finalize().unwrap();
    }

    #[test]
    fn finalize_before_initialize_is_a_no_op_transition() {
        let server = VaServer::new(minimal_config()).unwrap();
        server.finalize().unwrap();
    }

    #[test]
    fn unknown_reproduction_class_is_skipped_not_fatal() {
        let mut config = minimal_config();
        config.reproductions.push(ReproductionConfig { id: "exotic".into(), class: "Ctc".into(), enabled: true, outputs: vec!["out".into()], extra: Default::default() });
        let server = VaServer::new(config).unwrap();
        assert_eq!(server.reproduction_input_slot("exotic"), None);
        assert_eq!(server.reproduction_input_slot("talk"), Some(0));
    }
}
