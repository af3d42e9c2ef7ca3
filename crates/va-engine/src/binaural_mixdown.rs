//! Binaural Mixdown reproduction (§4.6): converts `V` virtual-loudspeaker
//! signals into two binaural channels by HRIR-convolving each virtual
//! loudspeaker's direction *relative to the tracked listener's head*.
//!
//! Architecturally a simplified sibling of `va-render`'s binaural
//! clustering renderer: the loudspeaker layout is fixed in the room frame,
//! so there is no wavefront clustering to perform — exactly one convolver
//! pair per virtual loudspeaker, re-queried against [`DirectivityManager`]
//! whenever the head rotates enough to change its nearest HRIR, and
//! crossfaded on exchange the same way the renderer crossfades cluster
//! filters (§4.5 step 2.c).

use std::sync::Arc;

use va_core::{AudioSource, PlanarBlock, Sample, VaError, VaResult, Vec3};
use va_directivity::{DirectivityId, DirectivityManager};
use va_dsp::PartitionedConvolver;
use va_scene::ReceiverState;

use crate::recording::RecordingSink;
use crate::reproduction::{HardwareOutput, Reproduction, StreamingGate};

struct VirtualSpeakerSlot {
    /// Fixed room-frame direction of this virtual loudspeaker (unit vector).
    direction_world: Vec3,
    left_convolver: PartitionedConvolver,
    right_convolver: PartitionedConvolver,
    last_nearest_index: Option<usize>,
}

impl VirtualSpeakerSlot {
    fn new(direction_world: Vec3, block_size: usize) -> Self {
        Self {
            direction_world,
            left_convolver: PartitionedConvolver::new(block_size),
            right_convolver: PartitionedConvolver::new(block_size),
            last_nearest_index: None,
        }
    }
}

#[derive(Debug, Clone, Copy, serde::Serialize, serde::Deserialize)]
pub struct BinauralMixdownParameters {
    pub directivity_id: DirectivityId,
    pub calibration: f64,
}

impl Default for BinauralMixdownParameters {
    fn default() -> Self {
        Self { directivity_id: DirectivityId::INVALID, calibration: 1.0 }
    }
}

pub struct BinauralMixdownReproduction {
    block_size: usize,
    directivities: Arc<DirectivityManager>,
    slots: Vec<VirtualSpeakerSlot>,
    directivity_id: Option<DirectivityId>,
    calibration: f64,
    crossfade_samples: usize,
    outputs: Vec<HardwareOutput>,
    input: Option<Box<dyn AudioSource>>,
    scratch: PlanarBlock,
    hrir_left: Vec<Sample>,
    hrir_right: Vec<Sample>,
    recording: Option<Box<dyn RecordingSink>>,
    streaming: StreamingGate,
}

impl BinauralMixdownReproduction {
    /// `virtual_speaker_directions_world`: one fixed room-frame direction
    /// per input channel (the loudspeaker layout this mixdown emulates).
    pub fn new(
        virtual_speaker_directions_world: &[Vec3],
        block_size: usize,
        max_ir_taps: usize,
        directivities: Arc<DirectivityManager>,
        outputs: Vec<HardwareOutput>,
    ) -> Self {
        let slots = virtual_speaker_directions_world.iter().map(|&dir| VirtualSpeakerSlot::new(dir, block_size)).collect();
        Self {
            block_size,
            directivities,
            slots,
            directivity_id: None,
            calibration: 1.0,
            crossfade_samples: block_size.min(32).max(1),
            outputs,
            input: None,
            scratch: PlanarBlock::new(virtual_speaker_directions_world.len(), block_size),
            hrir_left: vec![0.0; max_ir_taps],
            hrir_right: vec![0.0; max_ir_taps],
            recording: None,
            streaming: StreamingGate::default(),
        }
    }

    pub fn set_parameters(&mut self, params: BinauralMixdownParameters) -> VaResult<()> {
        self.streaming.check()?;
        if !params.directivity_id.is_valid() {
            return Err(VaError::invalid_parameter("binaural mixdown requires a valid directivity id"));
        }
        self.directivity_id = Some(params.directivity_id);
        self.calibration = params.calibration;
        Ok(())
    }

    pub fn parameters(&self) -> BinauralMixdownParameters {
        BinauralMixdownParameters { directivity_id: self.directivity_id.unwrap_or(DirectivityId::INVALID), calibration: self.calibration }
    }

    fn load_hrir_if_changed(&mut self, slot_index: usize, azimuth_deg: f64, elevation_deg: f64, directivity_id: DirectivityId) {
        let nearest = self.directivities.nearest_neighbor(directivity_id, azimuth_deg, elevation_deg);
        let Ok(nearest) = nearest else {
            tracing::warn!(slot = slot_index, "binaural mixdown: directivity lookup failed, leaving filter unchanged");
            return;
        };
        let slot = &mut self.slots[slot_index];
        if slot.last_nearest_index == Some(nearest.index) {
            return;
        }
        let has_ir = self.directivities.hrir(directivity_id, azimuth_deg, elevation_deg, None, &mut self.hrir_left, &mut self.hrir_right);
        if !has_ir {
            return;
        }
        if slot.last_nearest_index.is_none() {
            slot.left_convolver.load_ir(&self.hrir_left);
            slot.right_convolver.load_ir(&self.hrir_right);
        } else {
            slot.left_convolver.set_ir_crossfaded(&self.hrir_left, self.crossfade_samples);
            slot.right_convolver.set_ir_crossfaded(&self.hrir_right, self.crossfade_samples);
        }
        slot.last_nearest_index = Some(nearest.index);
    }
}

impl Reproduction for BinauralMixdownReproduction {
    fn set_input_datasource(&mut self, source: Box<dyn AudioSource>) -> VaResult<()> {
        self.streaming.check()?;
        self.input = Some(source);
        Ok(())
    }

    fn output_datasource(&self) -> &dyn AudioSource {
        self
    }

    fn target_outputs(&self) -> &[HardwareOutput] {
        &self.outputs
    }

    fn update_scene(&mut self, head: &ReceiverState) {
        let Some(directivity_id) = self.directivity_id else {
            return;
        };
        let inverse_orientation = head.motion.orientation.inverse();
        for slot_index in 0..self.slots.len() {
            let direction_world = self.slots[slot_index].direction_world;
            let relative_to_head = inverse_orientation * direction_world;
            let (azimuth_deg, elevation_deg) = va_core::direction_to_az_el(relative_to_head);
            self.load_hrir_if_changed(slot_index, azimuth_deg, elevation_deg, directivity_id);
        }
    }

    fn set_recording_sink(&mut self, sink: Option<Box<dyn RecordingSink>>) -> VaResult<()> {
        self.streaming.check()?;
        self.recording = sink;
        Ok(())
    }

    fn begin_streaming(&mut self) {
        self.streaming.start();
    }
}

impl AudioSource for BinauralMixdownReproduction {
    fn num_channels(&self) -> usize {
        2
    }

    fn process(&mut self, output: &mut PlanarBlock) {
        output.zero();
        let Some(input) = self.input.as_mut() else {
            return;
        };
        input.process(&mut self.scratch);

        let gain = self.calibration as Sample;
        for (slot_index, slot) in self.slots.iter_mut().enumerate() {
            let left = slot.left_convolver.process_block(self.scratch.channel(slot_index));
            let right = slot.right_convolver.process_block(self.scratch.channel(slot_index));
            output.accumulate(0, gain, &left);
            output.accumulate(1, gain, &right);
        }

        if let Some(sink) = self.recording.as_mut() {
            sink.write(output);
        }
    }

    fn reset(&mut self) {
        self.scratch.zero();
        for slot in &mut self.slots {
            slot.left_convolver.reset();
            slot.right_convolver.reset();
            slot.last_nearest_index = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_input_produces_silent_output() {
        let directivities = Arc::new(DirectivityManager::new());
        let mut repro = BinauralMixdownReproduction::new(&[Vec3::new(1.0, 0.0, 0.0), Vec3::new(-1.0, 0.0, 0.0)], 8, 16, directivities, vec![]);

        struct Silent;
        impl AudioSource for Silent {
            fn num_channels(&self) -> usize {
                2
            }
            fn process(&mut self, output: &mut PlanarBlock) {
                output.zero();
            }
        }
        repro.set_input_datasource(Box::new(Silent)).unwrap();

        let mut out = PlanarBlock::new(2, 8);
        repro.process(&mut out);
        assert!(out.channel(0).iter().all(|&s| s == 0.0));
        assert!(out.channel(1).iter().all(|&s| s == 0.0));
    }

    #[test]
    fn rejects_invalid_directivity_id() {
        let directivities = Arc::new(DirectivityManager::new());
        let mut repro = BinauralMixdownReproduction::new(&[Vec3::new(0.0, 0.0, -1.0)], 8, 16, directivities, vec![]);
        let result = repro.set_parameters(BinauralMixdownParameters::default());
        assert!(matches!(result, Err(VaError::InvalidParameter(_))));
    }
}
