//! Output Patchbay (§4.7): a fixed-topology mixer routing `M` reproduction
//! inputs to `O` hardware outputs. Routing is configured once at
//! construction from the hardware description; per-block mixing is
//! additive float accumulation with no clipping (that is a driver/hardware
//! concern, §4.7). Mute is folded into the same [`SmoothedParam`] as gain
//! (its target drops to zero) rather than a hard branch, so muting and
//! unmuting are click-free like every other gain change in this crate.

use va_core::{AudioSource, PlanarBlock, Sample};
use va_dsp::{SmoothedParam, SmoothingType};

const GAIN_SMOOTHING_MS: f64 = 10.0;

/// One entry in the patchbay's fixed routing table: one input channel
/// feeding into one output channel (§4.7 "configured once at
/// initialization from the hardware description").
#[derive(Debug, Clone, Copy)]
pub struct PatchbayRoute {
    pub input_index: usize,
    pub input_channel: usize,
    pub output_channel: usize,
}

struct GainSlot {
    gain: SmoothedParam,
    ramp: Vec<Sample>,
    user_gain: f64,
    muted: bool,
}

impl GainSlot {
    fn new(sample_rate: f64, block_size: usize) -> Self {
        Self { gain: SmoothedParam::new(1.0, GAIN_SMOOTHING_MS, sample_rate, SmoothingType::Linear), ramp: vec![0.0; block_size], user_gain: 1.0, muted: false }
    }

    fn set_gain(&mut self, gain: f64) {
        self.user_gain = gain;
        self.apply();
    }

    fn set_muted(&mut self, muted: bool) {
        self.muted = muted;
        self.apply();
    }

    fn apply(&self) {
        self.gain.set_target(if self.muted { 0.0 } else { self.user_gain });
    }
}

struct PatchbayInputSlot {
    source: Box<dyn AudioSource>,
    gain: GainSlot,
    scratch: PlanarBlock,
}

pub struct OutputPatchbay {
    block_size: usize,
    num_outputs: usize,
    inputs: Vec<PatchbayInputSlot>,
    outputs: Vec<GainSlot>,
    routes: Vec<PatchbayRoute>,
}

impl OutputPatchbay {
    /// `input_channel_counts[i]` is the channel count of the `i`th input
    /// this patchbay will be bound to via [`Self::bind_input`]; `num_outputs`
    /// and `routes` come from the hardware description (§6 `OutputDevice:<id>`
    /// / `Output:<id>` sections).
    pub fn new(input_channel_counts: &[usize], num_outputs: usize, routes: Vec<PatchbayRoute>, sample_rate: f64, block_size: usize) -> Self {
        let inputs = input_channel_counts
            .iter()
            .map(|&channels| PatchbayInputSlot { source: Box::new(SilentSource { channels }), gain: GainSlot::new(sample_rate, block_size), scratch: PlanarBlock::new(channels, block_size) })
            .collect();
        Self {
            block_size,
            num_outputs,
            inputs,
            outputs: (0..num_outputs).map(|_| GainSlot::new(sample_rate, block_size)).collect(),
            routes,
        }
    }

    /// Bind the live `AudioSource` for input slot `index` (e.g. a
    /// reproduction's `output_datasource`). The slot pulls from a silent
    /// placeholder until bound.
    pub fn bind_input(&mut self, index: usize, source: Box<dyn AudioSource>) {
        self.inputs[index].source = source;
    }

    pub fn set_input_gain(&mut self, index: usize, gain: f64) {
        self.inputs[index].gain.set_gain(gain);
    }

    pub fn set_input_muted(&mut self, index: usize, muted: bool) {
        self.inputs[index].gain.set_muted(muted);
    }

    pub fn set_output_gain(&mut self, channel: usize, gain: f64) {
        self.outputs[channel].gain.set_gain(gain);
    }

    pub fn set_output_muted(&mut self, channel: usize, muted: bool) {
        self.outputs[channel].gain.set_muted(muted);
    }
}

struct SilentSource {
    channels: usize,
}

impl AudioSource for SilentSource {
    fn num_channels(&self) -> usize {
        self.channels
    }

    fn process(&mut self, output: &mut PlanarBlock) {
        output.zero();
    }
}

impl AudioSource for OutputPatchbay {
    fn num_channels(&self) -> usize {
        self.num_outputs
    }

    fn process(&mut self, output: &mut PlanarBlock) {
        output.zero();

        for (index, input) in self.inputs.iter_mut().enumerate() {
            input.source.process(&mut input.scratch);

            input.gain.gain.fill_buffer(&mut input.gain.ramp);
            for ch in 0..input.scratch.num_channels() {
                let buf = input.scratch.channel_mut(ch);
                for (s, g) in buf.iter_mut().zip(input.gain.ramp.iter()) {
                    *s *= g;
                }
            }

            for route in self.routes.iter().filter(|r| r.input_index == index) {
                output.accumulate(route.output_channel, 1.0, input.scratch.channel(route.input_channel));
            }
        }

        for (channel, out_slot) in self.outputs.iter_mut().enumerate() {
            out_slot.gain.fill_buffer(&mut out_slot.ramp);
            let buf = output.channel_mut(channel);
            for (s, g) in buf.iter_mut().zip(out_slot.ramp.iter()) {
                *s *= g;
            }
        }
    }

    fn reset(&mut self) {
        for input in &mut self.inputs {
            input.source.reset();
            input.scratch.zero();
            input.gain.gain.reset();
        }
        for out_slot in &mut self.outputs {
            out_slot.gain.reset();
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
    fn routes_input_channel_to_mapped_output() {
        let routes = vec![PatchbayRoute { input_index: 0, input_channel: 0, output_channel: 1 }];
        let mut patchbay = OutputPatchbay::new(&[2], 2, routes, 48000.0, 4);
        patchbay.bind_input(0, Box::new(ConstantSource { channels: 2, value: 0.4 }));

        let mut out = PlanarBlock::new(2, 4);
        patchbay.process(&mut out);
        assert!(out.channel(0).iter().all(|&s| s == 0.0));
        assert!(out.channel(1).iter().all(|&s| (s - 0.4).abs() < 1e-5));
    }

    #[test]
    fn additive_mix_sums_two_inputs_on_same_output() {
        let routes = vec![
            PatchbayRoute { input_index: 0, input_channel: 0, output_channel: 0 },
            PatchbayRoute { input_index: 1, input_channel: 0, output_channel: 0 },
        ];
        let mut patchbay = OutputPatchbay::new(&[1, 1], 1, routes, 48000.0, 4);
        patchbay.bind_input(0, Box::new(ConstantSource { channels: 1, value: 0.2 }));
        patchbay.bind_input(1, Box::new(ConstantSource { channels: 1, value: 0.3 }));

        let mut out = PlanarBlock::new(1, 4);
        patchbay.process(&mut out);
        assert!(out.channel(0).iter().all(|&s| (s - 0.5).abs() < 1e-5));
    }

    #[test]
    fn muted_output_settles_to_silence() {
        let routes = vec![PatchbayRoute { input_index: 0, input_channel: 0, output_channel: 0 }];
        let mut patchbay = OutputPatchbay::new(&[1], 1, routes, 1000.0, 4);
        patchbay.bind_input(0, Box::new(ConstantSource { channels: 1, value: 1.0 }));
        patchbay.set_output_muted(0, true);

        let mut out = PlanarBlock::new(1, 4);
        for _ in 0..20 {
            patchbay.process(&mut out);
        }
        assert!(out.channel(0).iter().all(|&s| s.abs() < 0.05));
    }
}
