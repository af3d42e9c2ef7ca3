//! va-dsp: the DSP primitives the real-time render/reproduction path shares
//! (§2 #13): a cubic-interpolated variable delay line, partitioned
//! convolution, parameter smoothing, and the spherical-head ITD/ILD model the
//! binaural clustering renderer (§4.5) and CTC reproduction (§4.6) both use.

#![allow(dead_code)]

pub mod convolution;
pub mod ctc;
pub mod delay;
pub mod itd;
pub mod smoothing;

pub use convolution::{FilterBank, PartitionedConvolver};
pub use ctc::{design_ctc_filters, CtcFilterBank};
pub use delay::VariableDelayLine;
pub use itd::{EarDelay, SphericalHeadModel};
pub use smoothing::{ParameterBank, SmoothedParam, SmoothedStereoParam, SmoothingType};

use va_core::Sample;

/// Trait for all DSP processors.
pub trait Processor: Send + Sync {
    /// Reset processor state.
    fn reset(&mut self);

    /// Latency introduced by this processor, in samples.
    fn latency(&self) -> usize {
        0
    }
}

/// Mono (single-channel) processor.
pub trait MonoProcessor: Processor {
    fn process_sample(&mut self, input: Sample) -> Sample;

    fn process_block(&mut self, buffer: &mut [Sample]) {
        for sample in buffer.iter_mut() {
            *sample = self.process_sample(*sample);
        }
    }
}

/// Stereo (two-channel) processor.
pub trait StereoProcessor: Processor {
    fn process_sample(&mut self, left: Sample, right: Sample) -> (Sample, Sample);

    fn process_block(&mut self, left: &mut [Sample], right: &mut [Sample]) {
        debug_assert_eq!(left.len(), right.len());
        for (l, r) in left.iter_mut().zip(right.iter_mut()) {
            (*l, *r) = self.process_sample(*l, *r);
        }
    }
}

/// Processors whose internal coefficients depend on the sample rate.
pub trait ProcessorConfig {
    fn set_sample_rate(&mut self, sample_rate: f64);
}
