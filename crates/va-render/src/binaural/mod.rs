//! Binaural Clustering Renderer (§4.5) — the reference `AudioRenderer`.
//!
//! Grounded on `VABinauralClusteringDirection`/`VABinauralClusteringEngine`:
//! wavefronts (bound sound sources) are grouped into at most `K` principal
//! directions per receiver, each direction carrying one HRIR-loaded stereo
//! convolver pair. The control-thread half of the algorithm (clustering
//! rebuild) lives in this module; the audio-thread half (per-block
//! convolution/ITD) lives in [`renderer`].

mod clustering;
mod renderer;

pub use clustering::{ClusteringConfig, ClusteringState, PrincipalDirection, WavefrontMember};
pub use renderer::BinauralClusteringRenderer;
