//! va-driver: the vendor-agnostic audio driver backend shim (§4.8).
//!
//! Device enumeration is donor code (`cpal`'s host/device traits); the
//! backend trait and its three variants (`cpal`-driven, virtual, timeout)
//! are this crate's contribution on top of it.

mod backend;
mod device;
mod error;
mod thread_priority;

pub use backend::{AudioDriverBackend, CpalDriverBackend, DeviceInputSink, SilentInputSource, StreamProperties, TimeoutDriverBackend, VirtualDriverBackend};
pub use device::*;
pub use error::*;
pub use thread_priority::{set_realtime_priority, PriorityResult};

use va_core::{BufferSize, SampleRate};

/// Audio engine configuration
#[derive(Debug, Clone)]
pub struct AudioConfig {
    pub sample_rate: SampleRate,
    pub buffer_size: BufferSize,
    pub input_channels: u16,
    pub output_channels: u16,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sample_rate: SampleRate::Hz48000,
            buffer_size: BufferSize::Samples256,
            input_channels: 2,
            output_channels: 2,
        }
    }
}
</content>
