//! va-engine: the Reproduction Module (§4.6) and the Output Patchbay (§4.7).
//!
//! A reproduction sits between a renderer's output and the patchbay: it is
//! both a consumer of one [`va_core::AudioSource`] (the renderer) and a
//! producer of another (itself), matching the pull-based graph every stage
//! of this workspace implements (§2). The patchbay is the fixed-topology
//! mixer at the very top of that graph, the thing the audio driver (§4.8)
//! pulls from.

#![allow(dead_code)]

mod binaural_mixdown;
mod ctc;
mod hpeq;
mod lfe;
mod patchbay;
mod recording;
mod reproduction;
mod talkthrough;

pub use binaural_mixdown::{BinauralMixdownParameters, BinauralMixdownReproduction};
pub use ctc::{CtcParameters, CtcReproduction};
pub use hpeq::{HeadphoneEqParameters, HeadphoneEqReproduction};
pub use lfe::{LowFrequencyMixerParameters, LowFrequencyMixerReproduction};
pub use patchbay::{OutputPatchbay, PatchbayRoute};
pub use recording::{RecordingEvent, RecordingSink, RingBufferRecordingSink};
pub use reproduction::{HardwareOutput, Reproduction, StreamingGate};
pub use talkthrough::{TalkthroughParameters, TalkthroughReproduction};
