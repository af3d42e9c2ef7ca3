//! The pull-based audio data source contract shared by every stage of the
//! graph described in §2: a renderer is a data source the patchbay's
//! reproductions pull from, a reproduction is a data source the patchbay
//! pulls from, and the patchbay itself is the data source the driver pulls
//! from. Modeling every stage behind one trait object lets the driver (§4.8)
//! stay ignorant of what, concretely, sits at the top of the graph.

use crate::sample::PlanarBlock;

/// A pull-based, fixed-channel-count audio producer.
///
/// `process` is called exactly once per audio block by whichever stage pulls
/// from this source (§5 "within a single block each ... is read exactly
/// once"). Implementations must be infallible here (§7): any internal error
/// is reported out-of-band (a `tracing::warn!` plus an event) and results in
/// a zero-filled `output`.
pub trait AudioSource: Send {
    /// Number of channels this source produces. Stable for the source's
    /// lifetime.
    fn num_channels(&self) -> usize;

    /// Fill `output` (already sized to `num_channels()` planar channels of
    /// the driver's block length) with one block of audio.
    fn process(&mut self, output: &mut PlanarBlock);

    /// Purge any per-scene state (§4.5/§4.6 `reset`).
    fn reset(&mut self) {}
}
