//! The Reproduction Module's shared contract (§4.6): a reproduction is a
//! polymorphic consumer of one renderer's output that is, in turn, itself an
//! [`AudioSource`] the output patchbay (§4.7) pulls from.
//!
//! Grounded on `va-render`'s `AudioRenderer`/`AudioSource` split: renderers
//! add a control-thread surface (`update_scene`) on top of the audio-thread
//! `AudioSource` contract, and reproductions do the same, plus the input
//! binding and modal parameter lock this layer needs that renderers don't.

use va_core::{AudioSource, VaError, VaResult};
use va_scene::ReceiverState;

use crate::recording::RecordingSink;

/// One physical output channel a reproduction's output is destined for
/// (`OutputDevice:<id>` "Channels", §6): a driver channel index plus the
/// pose used by reproductions that need loudspeaker geometry (Binaural
/// Mixdown, CTC).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HardwareOutput {
    pub driver_channel: usize,
    pub position: va_core::Vec3,
    pub view: va_core::Vec3,
    pub up: va_core::Vec3,
}

impl HardwareOutput {
    pub fn at(driver_channel: usize, position: va_core::Vec3) -> Self {
        Self { driver_channel, position, view: va_core::Vec3::new(0.0, 0.0, -1.0), up: va_core::Vec3::new(0.0, 1.0, 0.0) }
    }
}

/// Tracks whether streaming has started for one reproduction instance.
/// Parameter and recording-path changes are rejected with `ModalError` once
/// set (§4.6 "Parameter-set and recording-path changes are accepted only
/// before streaming starts").
#[derive(Debug, Default)]
pub struct StreamingGate(std::sync::atomic::AtomicBool);

impl StreamingGate {
    pub fn start(&self) {
        self.0.store(true, std::sync::atomic::Ordering::Release);
    }

    pub fn is_started(&self) -> bool {
        self.0.load(std::sync::atomic::Ordering::Acquire)
    }

    /// Returns `Err(ModalError)` if streaming has already started; callers
    /// use this to guard every parameter-set / recording-path entry point.
    pub fn check(&self) -> VaResult<()> {
        if self.is_started() {
            Err(VaError::modal("reproduction parameters cannot change once streaming has started"))
        } else {
            Ok(())
        }
    }
}

/// The control-thread surface every reproduction variant adds on top of
/// [`AudioSource`] (§4.6 "Generic contract"). Called from the core thread
/// (§4.9) and the control API, never from the audio callback.
pub trait Reproduction: AudioSource {
    /// Bind the renderer (or upstream reproduction) this instance pulls
    /// from. Rejected once streaming has started.
    fn set_input_datasource(&mut self, source: Box<dyn AudioSource>) -> VaResult<()>;

    /// The data source the output patchbay pulls this reproduction's output
    /// from — itself, since a reproduction is already an `AudioSource`.
    fn output_datasource(&self) -> &dyn AudioSource;

    /// The hardware outputs this reproduction's channels are routed to
    /// (§4.7's patchbay uses this to build its fixed routing table).
    fn target_outputs(&self) -> &[HardwareOutput];

    /// Called at most once per scene publication with the freshly published
    /// receiver (head) state (§4.9 step 2). Not gated by the streaming lock:
    /// head tracking is ordinary runtime operation, not a configuration
    /// change.
    fn update_scene(&mut self, head: &ReceiverState);

    /// Bind (or clear) the optional capture sink for this reproduction's
    /// output (§6 "Persisted state" per-reproduction captures). Rejected
    /// once streaming has started.
    fn set_recording_sink(&mut self, sink: Option<Box<dyn RecordingSink>>) -> VaResult<()>;

    /// Called once by the driver (§4.8) when streaming actually begins;
    /// latches the modal lock every parameter-set entry point checks.
    fn begin_streaming(&mut self);
}
