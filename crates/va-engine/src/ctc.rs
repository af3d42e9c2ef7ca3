//! N-channel crosstalk cancellation reproduction (§4.6): given `N`
//! loudspeaker poses and a head-tracked listener, stream a two-channel
//! binaural program through a regularized CTC filter bank recomputed on
//! head-pose change.
//!
//! The filter-design math itself (FFT, Tikhonov-regularized 2×2 complex
//! inversion) lives in [`va_dsp::design_ctc_filters`] rather than here, so
//! this crate's own dependency list stays free of FFT/complex-number
//! crates — this module only re-derives the loudspeakers' head-relative
//! positions on `update_scene` and streams the resulting taps through
//! [`PartitionedConvolver`] instances, the same pattern the binaural
//! mixdown and renderer use for HRIR convolution.

use va_core::{AudioSource, PlanarBlock, Sample, VaError, VaResult, Vec3};
use va_dsp::{design_ctc_filters, PartitionedConvolver, SphericalHeadModel};
use va_scene::ReceiverState;

use crate::recording::RecordingSink;
use crate::reproduction::{HardwareOutput, Reproduction, StreamingGate};

#[derive(Debug, Clone, Copy, serde::Serialize, serde::Deserialize)]
pub struct CtcParameters {
    pub beta: f64,
    pub sweet_spot_widening: f64,
}

impl Default for CtcParameters {
    fn default() -> Self {
        Self { beta: 0.01, sweet_spot_widening: 0.0 }
    }
}

struct OutputChannel {
    /// Fixed room-frame position of this loudspeaker.
    position_world: Vec3,
    from_left: PartitionedConvolver,
    from_right: PartitionedConvolver,
}

pub struct CtcReproduction {
    block_size: usize,
    sample_rate: f64,
    head_model: SphericalHeadModel,
    channels: Vec<OutputChannel>,
    beta: f64,
    sweet_spot_widening: f64,
    has_designed: bool,
    outputs: Vec<HardwareOutput>,
    input: Option<Box<dyn AudioSource>>,
    scratch: PlanarBlock,
    recording: Option<Box<dyn RecordingSink>>,
    streaming: StreamingGate,
}

impl CtcReproduction {
    pub fn new(loudspeaker_positions_world: &[Vec3], sample_rate: f64, block_size: usize, head_model: SphericalHeadModel, outputs: Vec<HardwareOutput>) -> Self {
        let channels = loudspeaker_positions_world
            .iter()
            .map(|&position_world| OutputChannel {
                position_world,
                from_left: PartitionedConvolver::new(block_size),
                from_right: PartitionedConvolver::new(block_size),
            })
            .collect();
        Self {
            block_size,
            sample_rate,
            head_model,
            channels,
            beta: CtcParameters::default().beta,
            sweet_spot_widening: CtcParameters::default().sweet_spot_widening,
            has_designed: false,
            outputs,
            input: None,
            scratch: PlanarBlock::new(2, block_size),
            recording: None,
            streaming: StreamingGate::default(),
        }
    }

    pub fn set_parameters(&mut self, params: CtcParameters) -> VaResult<()> {
        self.streaming.check()?;
        if params.beta < 0.0 {
            return Err(VaError::invalid_parameter("CTC regularization beta must be non-negative"));
        }
        self.beta = params.beta;
        self.sweet_spot_widening = params.sweet_spot_widening.max(0.0);
        Ok(())
    }

    pub fn parameters(&self) -> CtcParameters {
        CtcParameters { beta: self.beta, sweet_spot_widening: self.sweet_spot_widening }
    }
}

impl Reproduction for CtcReproduction {
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
        let inverse_orientation = head.motion.orientation.inverse();
        let head_position = head.motion.position;
        let relative_positions: Vec<Vec3> = self.channels.iter().map(|c| inverse_orientation * (c.position_world - head_position)).collect();

        let bank = design_ctc_filters(self.block_size, self.sample_rate, &self.head_model, &relative_positions, self.beta, self.sweet_spot_widening);
        let crossfade = self.block_size.min(32).max(1);
        for (index, channel) in self.channels.iter_mut().enumerate() {
            let left_taps = bank.filter(index, 0);
            let right_taps = bank.filter(index, 1);
            if self.has_designed {
                channel.from_left.set_ir_crossfaded(left_taps, crossfade);
                channel.from_right.set_ir_crossfaded(right_taps, crossfade);
            } else {
                channel.from_left.load_ir(left_taps);
                channel.from_right.load_ir(right_taps);
            }
        }
        self.has_designed = true;
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

impl AudioSource for CtcReproduction {
    fn num_channels(&self) -> usize {
        self.channels.len()
    }

    fn process(&mut self, output: &mut PlanarBlock) {
        output.zero();
        let Some(input) = self.input.as_mut() else {
            return;
        };
        input.process(&mut self.scratch);

        if !self.has_designed {
            return;
        }

        let left_in = self.scratch.channel(0).to_vec();
        let right_in = self.scratch.channel(1).to_vec();
        for (index, channel) in self.channels.iter_mut().enumerate() {
            let from_left: Vec<Sample> = channel.from_left.process_block(&left_in);
            let from_right: Vec<Sample> = channel.from_right.process_block(&right_in);
            output.accumulate(index, 1.0, &from_left);
            output.accumulate(index, 1.0, &from_right);
        }

        if let Some(sink) = self.recording.as_mut() {
            sink.write(output);
        }
    }

    fn reset(&mut self) {
        self.scratch.zero();
        for channel in &mut self.channels {
            channel.from_left.reset();
            channel.from_right.reset();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct SilentStereo;

    impl AudioSource for SilentStereo {
        fn num_channels(&self) -> usize {
            2
        }
        fn process(&mut self, output: &mut PlanarBlock) {
            output.zero();
        }
    }

    #[test]
    fn produces_as_many_output_channels_as_loudspeakers() {
        let head_model = SphericalHeadModel::new(0.09, 343.0);
        let mut repro = CtcReproduction::new(&[Vec3::new(-1.0, 0.0, -1.0), Vec3::new(1.0, 0.0, -1.0)], 48000.0, 64, head_model, vec![]);
        assert_eq!(repro.num_channels(), 2);
        repro.set_input_datasource(Box::new(SilentStereo)).unwrap();

        let mut out = PlanarBlock::new(2, 64);
        repro.process(&mut out);
        assert!(out.channel(0).iter().all(|&s| s == 0.0));
    }

    #[test]
    fn rejects_negative_beta() {
        let head_model = SphericalHeadModel::new(0.09, 343.0);
        let mut repro = CtcReproduction::new(&[Vec3::new(-1.0, 0.0, -1.0), Vec3::new(1.0, 0.0, -1.0)], 48000.0, 64, head_model, vec![]);
        let result = repro.set_parameters(CtcParameters { beta: -1.0, sweet_spot_widening: 0.0 });
        assert!(matches!(result, Err(VaError::InvalidParameter(_))));
    }
}
