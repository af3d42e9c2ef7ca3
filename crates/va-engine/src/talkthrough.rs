//! Talkthrough reproduction (§4.6): identity N×N passthrough with optional
//! per-channel gain. The simplest reproduction variant — no filtering, no
//! geometry — useful for driving hardware outputs straight from a
//! renderer's native channel layout (e.g. a pre-mixed N-channel bed).

use va_core::{AudioSource, PlanarBlock, Sample, VaError, VaResult};
use va_dsp::{SmoothedParam, SmoothingType};
use va_scene::ReceiverState;

use crate::reproduction::{HardwareOutput, Reproduction, StreamingGate};
use crate::recording::RecordingSink;

const GAIN_SMOOTHING_MS: f64 = 10.0;

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct TalkthroughParameters {
    /// One linear gain per channel; length must equal `num_channels`.
    pub channel_gains: Vec<f64>,
}

pub struct TalkthroughReproduction {
    num_channels: usize,
    sample_rate: f64,
    block_size: usize,
    gains: Vec<SmoothedParam>,
    gain_ramp: Vec<Sample>,
    outputs: Vec<HardwareOutput>,
    input: Option<Box<dyn AudioSource>>,
    scratch: PlanarBlock,
    recording: Option<Box<dyn RecordingSink>>,
    streaming: StreamingGate,
}

impl TalkthroughReproduction {
    pub fn new(num_channels: usize, sample_rate: f64, block_size: usize, outputs: Vec<HardwareOutput>) -> Self {
        let gains = (0..num_channels).map(|_| SmoothedParam::new(1.0, GAIN_SMOOTHING_MS, sample_rate, SmoothingType::Linear)).collect();
        Self {
            num_channels,
            sample_rate,
            block_size,
            gains,
            gain_ramp: vec![0.0; block_size],
            outputs,
            input: None,
            scratch: PlanarBlock::new(num_channels, block_size),
            recording: None,
            streaming: StreamingGate::default(),
        }
    }

    pub fn set_parameters(&mut self, params: TalkthroughParameters) -> VaResult<()> {
        self.streaming.check()?;
        if params.channel_gains.len() != self.num_channels {
            return Err(VaError::invalid_parameter(format!("expected {} channel gains, got {}", self.num_channels, params.channel_gains.len())));
        }
        for (gain, &value) in self.gains.iter().zip(params.channel_gains.iter()) {
            gain.set_target(value);
        }
        Ok(())
    }

    pub fn parameters(&self) -> TalkthroughParameters {
        TalkthroughParameters { channel_gains: self.gains.iter().map(|g| g.target()).collect() }
    }
}

impl Reproduction for TalkthroughReproduction {
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
        // Identity passthrough carries no head-dependent state.
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

impl AudioSource for TalkthroughReproduction {
    fn num_channels(&self) -> usize {
        self.num_channels
    }

    fn process(&mut self, output: &mut PlanarBlock) {
        output.zero();
        let Some(input) = self.input.as_mut() else {
            return;
        };
        input.process(&mut self.scratch);

        for (ch, gain) in self.gains.iter_mut().enumerate() {
            gain.fill_buffer(&mut self.gain_ramp);
            let src = self.scratch.channel(ch);
            let dst = output.channel_mut(ch);
            for ((d, s), g) in dst.iter_mut().zip(src.iter()).zip(self.gain_ramp.iter()) {
                *d = *s * g;
            }
        }

        if let Some(sink) = self.recording.as_mut() {
            sink.write(output);
        }
    }

    fn reset(&mut self) {
        self.scratch.zero();
        for gain in &mut self.gains {
            gain.reset();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct ConstantSource {
        channels: usize,
        value: Sample,
    }

    impl AudioSource for ConstantSource {
        fn num_channels(&self) -> usize {
            self.channels
        }

        fn process(&mut self, output: &mut PlanarBlock) {
            for ch in 0..self.channels {
                output.channel_mut(ch).fill(self.value);
            }
        }
    }

    #[test]
    fn passes_signal_through_unchanged_at_unity_gain() {
        let mut repro = TalkthroughReproduction::new(2, 48000.0, 4, vec![HardwareOutput::at(0, va_core::Vec3::zeros()), HardwareOutput::at(1, va_core::Vec3::zeros())]);
        repro.set_input_datasource(Box::new(ConstantSource { channels: 2, value: 0.5 })).unwrap();

        let mut out = PlanarBlock::new(2, 4);
        repro.process(&mut out);

        assert!(out.channel(0).iter().all(|&s| (s - 0.5).abs() < 1e-6));
        assert!(out.channel(1).iter().all(|&s| (s - 0.5).abs() < 1e-6));
    }

    #[test]
    fn rejects_parameter_changes_once_streaming_started() {
        let mut repro = TalkthroughReproduction::new(1, 48000.0, 4, vec![]);
        repro.begin_streaming();
        let result = repro.set_parameters(TalkthroughParameters { channel_gains: vec![0.5] });
        assert!(matches!(result, Err(VaError::ModalError(_))));
    }
}
