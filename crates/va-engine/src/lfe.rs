//! Low-frequency mixer reproduction (§4.6): sums a fixed subset of the
//! renderer's channels to a single subwoofer-style output. The simplest
//! non-identity reproduction — no filtering, just a weighted sum, since
//! crossover filtering itself is a driver/loudspeaker concern (§1
//! non-goals).

use va_core::{AudioSource, PlanarBlock, Sample, VaError, VaResult};
use va_dsp::{SmoothedParam, SmoothingType};
use va_scene::ReceiverState;

use crate::recording::RecordingSink;
use crate::reproduction::{HardwareOutput, Reproduction, StreamingGate};

const GAIN_SMOOTHING_MS: f64 = 10.0;

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct LowFrequencyMixerParameters {
    /// Indices (into the input datasource's channels) summed into the
    /// single output channel.
    pub source_channels: Vec<usize>,
    pub gain: f64,
}

impl Default for LowFrequencyMixerParameters {
    fn default() -> Self {
        Self { source_channels: Vec::new(), gain: 1.0 }
    }
}

pub struct LowFrequencyMixerReproduction {
    input_channels: usize,
    source_channels: Vec<usize>,
    gain: SmoothedParam,
    gain_ramp: Vec<Sample>,
    outputs: Vec<HardwareOutput>,
    input: Option<Box<dyn AudioSource>>,
    scratch: PlanarBlock,
    recording: Option<Box<dyn RecordingSink>>,
    streaming: StreamingGate,
}

impl LowFrequencyMixerReproduction {
    pub fn new(input_channels: usize, sample_rate: f64, block_size: usize, outputs: Vec<HardwareOutput>) -> Self {
        Self {
            input_channels,
            source_channels: Vec::new(),
            gain: SmoothedParam::new(1.0, GAIN_SMOOTHING_MS, sample_rate, SmoothingType::Linear),
            gain_ramp: vec![0.0; block_size],
            outputs,
            input: None,
            scratch: PlanarBlock::new(input_channels, block_size),
            recording: None,
            streaming: StreamingGate::default(),
        }
    }

    pub fn set_parameters(&mut self, params: LowFrequencyMixerParameters) -> VaResult<()> {
        self.streaming.check()?;
        for &channel in &params.source_channels {
            if channel >= self.input_channels {
                return Err(VaError::invalid_parameter(format!("source channel {channel} out of range (input has {} channels)", self.input_channels)));
            }
        }
        self.source_channels = params.source_channels;
        self.gain.set_target(params.gain);
        Ok(())
    }

    pub fn parameters(&self) -> LowFrequencyMixerParameters {
        LowFrequencyMixerParameters { source_channels: self.source_channels.clone(), gain: self.gain.target() }
    }
}

impl Reproduction for LowFrequencyMixerReproduction {
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
        // Channel-sum mixdown carries no head-dependent state.
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

impl AudioSource for LowFrequencyMixerReproduction {
    fn num_channels(&self) -> usize {
        1
    }

    fn process(&mut self, output: &mut PlanarBlock) {
        output.zero();
        let Some(input) = self.input.as_mut() else {
            return;
        };
        input.process(&mut self.scratch);

        self.gain.fill_buffer(&mut self.gain_ramp);
        let dst = output.channel_mut(0);
        for &channel in &self.source_channels {
            let src = self.scratch.channel(channel);
            for ((d, s), g) in dst.iter_mut().zip(src.iter()).zip(self.gain_ramp.iter()) {
                *d += *s * g;
            }
        }

        if let Some(sink) = self.recording.as_mut() {
            sink.write(output);
        }
    }

    fn reset(&mut self) {
        self.scratch.zero();
        self.gain.reset();
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
    fn sums_selected_channels() {
        let mut repro = LowFrequencyMixerReproduction::new(4, 48000.0, 4, vec![]);
        repro.set_input_datasource(Box::new(ConstantSource { channels: 4, value: 0.25 })).unwrap();
        repro.set_parameters(LowFrequencyMixerParameters { source_channels: vec![0, 2], gain: 1.0 }).unwrap();

        let mut out = PlanarBlock::new(1, 4);
        repro.process(&mut out);
        assert!(out.channel(0).iter().all(|&s| (s - 0.5).abs() < 1e-5));
    }

    #[test]
    fn rejects_out_of_range_source_channel() {
        let mut repro = LowFrequencyMixerReproduction::new(2, 48000.0, 4, vec![]);
        let result = repro.set_parameters(LowFrequencyMixerParameters { source_channels: vec![5], gain: 1.0 });
        assert!(matches!(result, Err(VaError::InvalidParameter(_))));
    }
}
