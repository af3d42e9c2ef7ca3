//! Headphone Equalization reproduction (§4.6): two-channel convolution with
//! an inverse headphone impulse response, plus per-channel gain. Grounded on
//! the same [`PartitionedConvolver`] the binaural clustering renderer uses
//! for its HRIR convolution (`va-render`'s `binaural::renderer`) — here
//! there is exactly one filter per ear rather than one per cluster, loaded
//! once (or crossfaded) rather than re-queried every block.

use va_core::{AudioSource, PlanarBlock, Sample, VaError, VaResult};
use va_dsp::{PartitionedConvolver, SmoothedParam, SmoothingType};
use va_scene::ReceiverState;

use crate::reproduction::{HardwareOutput, Reproduction, StreamingGate};
use crate::recording::RecordingSink;

const GAIN_SMOOTHING_MS: f64 = 10.0;

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct HeadphoneEqParameters {
    pub left_ir: Vec<Sample>,
    pub right_ir: Vec<Sample>,
    pub gain_left: f64,
    pub gain_right: f64,
}

impl Default for HeadphoneEqParameters {
    fn default() -> Self {
        Self { left_ir: Vec::new(), right_ir: Vec::new(), gain_left: 1.0, gain_right: 1.0 }
    }
}

pub struct HeadphoneEqReproduction {
    block_size: usize,
    left_convolver: PartitionedConvolver,
    right_convolver: PartitionedConvolver,
    gain_left: SmoothedParam,
    gain_right: SmoothedParam,
    gain_ramp: Vec<Sample>,
    has_loaded: bool,
    outputs: Vec<HardwareOutput>,
    input: Option<Box<dyn AudioSource>>,
    scratch: PlanarBlock,
    recording: Option<Box<dyn RecordingSink>>,
    streaming: StreamingGate,
}

impl HeadphoneEqReproduction {
    pub fn new(sample_rate: f64, block_size: usize, outputs: Vec<HardwareOutput>) -> Self {
        Self {
            block_size,
            left_convolver: PartitionedConvolver::new(block_size),
            right_convolver: PartitionedConvolver::new(block_size),
            gain_left: SmoothedParam::new(1.0, GAIN_SMOOTHING_MS, sample_rate, SmoothingType::Linear),
            gain_right: SmoothedParam::new(1.0, GAIN_SMOOTHING_MS, sample_rate, SmoothingType::Linear),
            gain_ramp: vec![0.0; block_size],
            has_loaded: false,
            outputs,
            input: None,
            scratch: PlanarBlock::new(2, block_size),
            recording: None,
            streaming: StreamingGate::default(),
        }
    }

    pub fn set_parameters(&mut self, params: HeadphoneEqParameters) -> VaResult<()> {
        self.streaming.check()?;
        if !params.left_ir.is_empty() || !params.right_ir.is_empty() {
            if params.left_ir.is_empty() || params.right_ir.is_empty() {
                return Err(VaError::invalid_parameter("both left_ir and right_ir must be supplied together"));
            }
            let crossfade = self.block_size.min(32).max(1);
            if self.has_loaded {
                self.left_convolver.set_ir_crossfaded(&params.left_ir, crossfade);
                self.right_convolver.set_ir_crossfaded(&params.right_ir, crossfade);
            } else {
                self.left_convolver.load_ir(&params.left_ir);
                self.right_convolver.load_ir(&params.right_ir);
                self.has_loaded = true;
            }
        }
        self.gain_left.set_target(params.gain_left);
        self.gain_right.set_target(params.gain_right);
        Ok(())
    }

    pub fn parameters(&self) -> (f64, f64) {
        (self.gain_left.target(), self.gain_right.target())
    }
}

impl Reproduction for HeadphoneEqReproduction {
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

    fn update_scene(&mut self, _head: &ReceiverState) {
        // The headphone IR is listener-independent.
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

impl AudioSource for HeadphoneEqReproduction {
    fn num_channels(&self) -> usize {
        2
    }

    fn process(&mut self, output: &mut PlanarBlock) {
        output.zero();
        let Some(input) = self.input.as_mut() else {
            return;
        };
        input.process(&mut self.scratch);

        let left = self.left_convolver.process_block(self.scratch.channel(0));
        let right = self.right_convolver.process_block(self.scratch.channel(1));

        self.gain_left.fill_buffer(&mut self.gain_ramp);
        let dst = output.channel_mut(0);
        for ((d, s), g) in dst.iter_mut().zip(left.iter()).zip(self.gain_ramp.iter()) {
            *d = *s * g;
        }
        self.gain_right.fill_buffer(&mut self.gain_ramp);
        let dst = output.channel_mut(1);
        for ((d, s), g) in dst.iter_mut().zip(right.iter()).zip(self.gain_ramp.iter()) {
            *d = *s * g;
        }

        if let Some(sink) = self.recording.as_mut() {
            sink.write(output);
        }
    }

    fn reset(&mut self) {
        self.left_convolver.reset();
        self.right_convolver.reset();
        self.gain_left.reset();
        self.gain_right.reset();
        self.scratch.zero();
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
    fn identity_ir_passes_signal_through() {
        let block = 8;
        let mut repro = HeadphoneEqReproduction::new(48000.0, block, vec![]);
        repro.set_input_datasource(Box::new(SilentStereo)).unwrap();
        let mut ir = vec![0.0 as Sample; block];
        ir[0] = 1.0;
        repro.set_parameters(HeadphoneEqParameters { left_ir: ir.clone(), right_ir: ir, ..Default::default() }).unwrap();

        let mut out = PlanarBlock::new(2, block);
        repro.process(&mut out);
        assert!(out.channel(0).iter().all(|&s| s.abs() < 1e-6));
    }

    #[test]
    fn rejects_ir_change_after_streaming_starts() {
        let mut repro = HeadphoneEqReproduction::new(48000.0, 8, vec![]);
        repro.begin_streaming();
        let result = repro.set_parameters(HeadphoneEqParameters::default());
        assert!(matches!(result, Err(VaError::ModalError(_))));
    }
}
