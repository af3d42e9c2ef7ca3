//! Audio-thread half of the Binaural Clustering Renderer (§4.5 step 3):
//! per-block HRIR convolution and per-wavefront ITD over the
//! [`ClusteringState`] most recently published by `update_scene`.
//!
//! Grounded on `VABinauralClusteringDirection::GetOutput`: one
//! [`ClusterSlot`] per principal direction holds the two convolvers whose IR
//! tracks that direction's nearest HRIR; one [`WavefrontRuntime`] per bound
//! sound source holds the pair of variable delay lines carrying its
//! residual ITD. Both are indexed by stable keys (cluster slot index,
//! source id) rather than pool handles — growth only happens at
//! construction (`K` slots, one runtime per source encountered), so there
//! is nothing to request or release on the audio thread's hot path.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use va_core::{AudioSource, AuralizationMode, HomogeneousMedium, PlanarBlock, Sample, VaError, VaResult, Vec3};
use va_directivity::DirectivityManager;
use va_dsp::{PartitionedConvolver, SphericalHeadModel, VariableDelayLine};
use va_scene::{ReceiverId, SceneStateRecord};
use va_signal::SignalSourceManager;

use super::clustering::{ClusteringConfig, ClusteringState, WavefrontMember};
use crate::AudioRenderer;
use va_core::direction_to_az_el;

/// Per-direction audio-thread state: the two HRIR convolvers (§4.5 "an
/// output two-channel buffer").
struct ClusterSlot {
    left_convolver: PartitionedConvolver,
    right_convolver: PartitionedConvolver,
    last_nearest_index: Option<usize>,
}

impl ClusterSlot {
    fn new(block_size: usize) -> Self {
        Self { left_convolver: PartitionedConvolver::new(block_size), right_convolver: PartitionedConvolver::new(block_size), last_nearest_index: None }
    }
}

/// Per-wavefront audio-thread state: one delay line per ear carrying the
/// residual ITD (geometric + arc delay minus the cluster's principal-
/// direction delay, §4.5 step 3.a).
struct WavefrontRuntime {
    left_delay: VariableDelayLine,
    right_delay: VariableDelayLine,
}

impl WavefrontRuntime {
    fn new(max_delay_samples: usize) -> Self {
        Self { left_delay: VariableDelayLine::new(max_delay_samples), right_delay: VariableDelayLine::new(max_delay_samples) }
    }
}

/// A single receiver's Binaural Clustering Renderer (§4.5): the reference
/// `AudioRenderer` implementation. One instance renders one receiver's
/// two-channel output; a scene with several receivers runs one renderer per
/// receiver.
pub struct BinauralClusteringRenderer {
    receiver_id: ReceiverId,
    config: ClusteringConfig,
    head_model: SphericalHeadModel,
    block_size: usize,
    sample_rate: f64,
    max_delay_samples: usize,

    signal_sources: Arc<SignalSourceManager>,
    directivities: Arc<DirectivityManager>,

    clustering: RwLock<Arc<ClusteringState>>,
    cluster_slots: Vec<ClusterSlot>,
    wavefront_runtimes: HashMap<i32, WavefrontRuntime>,

    mono_scratch: Vec<Sample>,
    hrir_left: Vec<Sample>,
    hrir_right: Vec<Sample>,
    cluster_left: Vec<Sample>,
    cluster_right: Vec<Sample>,

    global_mode: AuralizationMode,
}

impl BinauralClusteringRenderer {
    pub fn new(
        receiver_id: ReceiverId,
        config: ClusteringConfig,
        block_size: usize,
        sample_rate: f64,
        medium: &HomogeneousMedium,
        max_ir_taps: usize,
        max_delay_samples: usize,
        signal_sources: Arc<SignalSourceManager>,
        directivities: Arc<DirectivityManager>,
    ) -> VaResult<Self> {
        if medium.sound_speed_mps <= 0.0 {
            return Err(VaError::invalid_parameter("speed of sound must be positive"));
        }
        let head_model = SphericalHeadModel::from_medium(medium).with_min_distance_m(config.min_distance_m);
        let cluster_slots = (0..config.num_clusters).map(|_| ClusterSlot::new(block_size)).collect();

        Ok(Self {
            receiver_id,
            config,
            head_model,
            block_size,
            sample_rate,
            max_delay_samples: max_delay_samples.max(4),
            signal_sources,
            directivities,
            clustering: RwLock::new(Arc::new(ClusteringState::silent())),
            cluster_slots,
            wavefront_runtimes: HashMap::new(),
            mono_scratch: vec![0.0; block_size],
            hrir_left: vec![0.0; max_ir_taps],
            hrir_right: vec![0.0; max_ir_taps],
            cluster_left: vec![0.0; block_size],
            cluster_right: vec![0.0; block_size],
            global_mode: AuralizationMode::ALL,
        })
    }

    fn load_hrir_if_changed(&mut self, slot_index: usize, azimuth_deg: f64, elevation_deg: f64, directivity_id: va_directivity::DirectivityId) {
        let nearest = self.directivities.nearest_neighbor(directivity_id, azimuth_deg, elevation_deg);
        let Ok(nearest) = nearest else {
            tracing::warn!(receiver = self.receiver_id.0, "binaural renderer: directivity lookup failed, leaving filter unchanged");
            return;
        };
        let slot = &mut self.cluster_slots[slot_index];
        if slot.last_nearest_index == Some(nearest.index) {
            return;
        }
        let has_ir = self.directivities.hrir(directivity_id, azimuth_deg, elevation_deg, None, &mut self.hrir_left, &mut self.hrir_right);
        if !has_ir {
            return;
        }
        let crossfade = self.config.crossfade_samples.min(self.block_size).min(32).max(1);
        if slot.last_nearest_index.is_none() {
            slot.left_convolver.load_ir(&self.hrir_left);
            slot.right_convolver.load_ir(&self.hrir_right);
        } else {
            slot.left_convolver.set_ir_crossfaded(&self.hrir_left, crossfade);
            slot.right_convolver.set_ir_crossfaded(&self.hrir_right, crossfade);
        }
        slot.last_nearest_index = Some(nearest.index);
    }
}

impl AudioRenderer for BinauralClusteringRenderer {
    fn update_scene(&mut self, scene: &SceneStateRecord) {
        let Some(receiver) = scene.receivers.get(&self.receiver_id.0) else {
            *self.clustering.write() = Arc::new(ClusteringState::silent());
            return;
        };

        if !receiver.enabled {
            *self.clustering.write() = Arc::new(ClusteringState::silent());
            return;
        }

        let head_position = receiver.motion.position;
        // `orientation.inverse() * delta` expresses the world-frame offset
        // in the receiver's local frame (`-Z` forward, `+Y` up), matching
        // `MotionState::view`/`up`'s convention.
        let inverse_orientation = receiver.motion.orientation.inverse();

        let members: Vec<WavefrontMember> = scene
            .sources
            .values()
            .filter(|source| source.enabled)
            .map(|source| {
                let delta: Vec3 = source.motion.position - head_position;
                let relative_to_head = inverse_orientation * delta;
                WavefrontMember {
                    source_id: source.id.0,
                    relative_to_head,
                    sound_power: source.sound_power,
                    signal_source_id: source.signal_source_id.clone(),
                    muted: source.muted,
                }
            })
            .collect();

        let active_ids: std::collections::HashSet<i32> = members.iter().map(|m| m.source_id).collect();
        self.wavefront_runtimes.retain(|id, _| active_ids.contains(id));

        let next = ClusteringState::rebuild(&self.config, receiver.enabled, receiver.muted, receiver.directivity_id, members);
        *self.clustering.write() = Arc::new(next);
    }

    fn update_global_auralization_mode(&mut self, mode: AuralizationMode) {
        self.global_mode = mode;
    }
}

impl AudioSource for BinauralClusteringRenderer {
    fn num_channels(&self) -> usize {
        2
    }

    fn process(&mut self, output: &mut PlanarBlock) {
        output.zero();

        let clustering = self.clustering.read().clone();
        if !clustering.receiver_enabled || clustering.receiver_muted {
            return;
        }
        let Some(directivity_id) = clustering.receiver_directivity_id else {
            // Missing directivity: receiver renders silence (§4.5 failure semantics).
            return;
        };

        for (slot_index, direction) in clustering.directions.iter().enumerate().take(self.cluster_slots.len()) {
            self.cluster_left.fill(0.0);
            self.cluster_right.fill(0.0);

            let (azimuth_deg, elevation_deg) = direction_to_az_el(direction.mean_direction);
            self.load_hrir_if_changed(slot_index, azimuth_deg, elevation_deg, directivity_id);

            // Principal-direction ear delay, evaluated at each wavefront's
            // own distance so the geometric distance/c term cancels in the
            // residual below, leaving only the arc-length difference.
            for member in &direction.members {
                if member.muted {
                    continue;
                }
                let distance = member.relative_to_head.norm().max(1e-6);
                let gain_scale = member.sound_power * self.config.calibration;
                let full_delay = self.head_model.ear_delay(member.relative_to_head, gain_scale);
                let principal_at_same_distance = self.head_model.ear_delay(direction.mean_direction * distance, gain_scale);

                let left_residual_s = (full_delay.left_seconds - principal_at_same_distance.left_seconds).max(0.0);
                let right_residual_s = (full_delay.right_seconds - principal_at_same_distance.right_seconds).max(0.0);

                let signal_id = member.signal_source_id.as_deref().unwrap_or("");
                self.signal_sources.output_into(signal_id, &mut self.mono_scratch);

                let max_delay_samples = self.max_delay_samples;
                let runtime = self
                    .wavefront_runtimes
                    .entry(member.source_id)
                    .or_insert_with(|| WavefrontRuntime::new(max_delay_samples));

                runtime.left_delay.set_delay_samples(left_residual_s * self.sample_rate);
                runtime.right_delay.set_delay_samples(right_residual_s * self.sample_rate);

                let gain = full_delay.gain as Sample;
                for (i, &input) in self.mono_scratch.iter().enumerate() {
                    self.cluster_left[i] += runtime.left_delay.process_sample(input) * gain;
                    self.cluster_right[i] += runtime.right_delay.process_sample(input) * gain;
                }
            }

            let slot = &mut self.cluster_slots[slot_index];
            let left_out = slot.left_convolver.process_block(&self.cluster_left);
            let right_out = slot.right_convolver.process_block(&self.cluster_right);
            output.accumulate(0, 1.0, &left_out);
            output.accumulate(1, 1.0, &right_out);
        }
    }

    fn reset(&mut self) {
        *self.clustering.write() = Arc::new(ClusteringState::silent());
        self.wavefront_runtimes.clear();
        for slot in &mut self.cluster_slots {
            slot.left_convolver.reset();
            slot.right_convolver.reset();
            slot.last_nearest_index = None;
        }
    }
}

