//! The audio driver backend contract (§4.8): a vendor-agnostic shim
//! providing a fixed-block, fixed-rate pull stream on top of whichever
//! concrete transport a deployment uses.
//!
//! Three variants, matching §4.8:
//!   - [`CpalDriverBackend`]: hardware-driven pull via `cpal` (the donor
//!     stack's audio I/O crate), standing in for the ASIO/PortAudio variant
//!     — `cpal` already selects ASIO on Windows and JACK on Linux when
//!     available (`device::get_host`).
//!   - [`VirtualDriverBackend`]: no hardware thread at all; a caller
//!     explicitly triggers one block at a time (§8 scenario S5, "byte-
//!     identical recorded output across runs").
//!   - [`TimeoutDriverBackend`]: a synthetic wall-clock ticker, not phase-
//!     locked to any audio clock, for GUI-free debug builds.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex as StdMutex};
use std::thread::JoinHandle;
use std::time::Duration;

use cpal::traits::{DeviceTrait, StreamTrait};
use cpal::{BufferSize as CpalBufferSize, SampleFormat, Stream, StreamConfig};
use parking_lot::Mutex;

use va_core::{AudioSource, BufferSize, PlanarBlock, Sample, SampleRate, VaError, VaResult};

use crate::device;
use crate::thread_priority::set_realtime_priority;

/// `(Fs, B, nCh)` as returned by `getOutputStreamProperties` (§4.8).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StreamProperties {
    pub sample_rate: SampleRate,
    pub block_size: BufferSize,
    pub num_channels: usize,
}

/// A place the driver pushes captured device-input blocks so the signal
/// source manager's passthrough source (§4.2) can read the latest one on
/// the audio thread without blocking on the capture stream.
pub trait DeviceInputSink: Send {
    fn accept(&self, block: &PlanarBlock);
}

/// Shared vendor-agnostic contract every backend in this module implements
/// (§4.8 "Contract").
pub trait AudioDriverBackend: Send {
    fn initialize(&mut self) -> VaResult<()>;
    fn finalize(&mut self) -> VaResult<()>;
    fn start_streaming(&mut self, source: Arc<Mutex<dyn AudioSource>>) -> VaResult<()>;
    fn stop_streaming(&mut self) -> VaResult<()>;
    fn is_streaming(&self) -> bool;
    fn output_stream_properties(&self) -> StreamProperties;
    fn set_input_sink(&mut self, sink: Option<Arc<dyn DeviceInputSink>>);
}

/// ASIO/PortAudio-equivalent backend (§4.8): hardware pulls through `cpal`.
pub struct CpalDriverBackend {
    properties: StreamProperties,
    device_name: Option<String>,
    stream: Option<Stream>,
    streaming: Arc<AtomicBool>,
    input_sink: Option<Arc<dyn DeviceInputSink>>,
}

impl CpalDriverBackend {
    pub fn new(properties: StreamProperties, device_name: Option<String>) -> Self {
        Self { properties, device_name, stream: None, streaming: Arc::new(AtomicBool::new(false)), input_sink: None }
    }
}

impl AudioDriverBackend for CpalDriverBackend {
    fn initialize(&mut self) -> VaResult<()> {
        Ok(())
    }

    fn finalize(&mut self) -> VaResult<()> {
        self.stop_streaming()
    }

    fn start_streaming(&mut self, source: Arc<Mutex<dyn AudioSource>>) -> VaResult<()> {
        if self.stream.is_some() {
            return Err(VaError::modal("driver is already streaming"));
        }

        let device = match &self.device_name {
            Some(name) => device::get_output_device_by_name(name).map_err(|e| VaError::Unspecified(e.to_string()))?,
            None => device::get_default_output_device().map_err(|e| VaError::Unspecified(e.to_string()))?,
        };

        let num_channels = self.properties.num_channels;
        let config = StreamConfig {
            channels: num_channels as u16,
            sample_rate: cpal::SampleRate(self.properties.sample_rate.as_u32()),
            buffer_size: CpalBufferSize::Fixed(self.properties.block_size.as_usize() as u32),
        };

        let mut scratch = PlanarBlock::new(num_channels, self.properties.block_size.as_usize());
        let streaming = self.streaming.clone();

        let stream = device
            .build_output_stream(
                &config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    set_realtime_priority();
                    let frames = data.len() / num_channels.max(1);
                    if frames != scratch.block_size() {
                        // Host asked for a different block size than configured; process
                        // what fits and zero the rest rather than resizing on the audio thread.
                    }
                    source.lock().process(&mut scratch);
                    let usable_frames = frames.min(scratch.block_size());
                    for frame in 0..usable_frames {
                        for ch in 0..num_channels {
                            data[frame * num_channels + ch] = scratch.channel(ch)[frame];
                        }
                    }
                    for sample in data[usable_frames * num_channels..].iter_mut() {
                        *sample = 0.0;
                    }
                },
                move |err| log::error!("cpal output stream error: {err}"),
                None,
            )
            .map_err(|e| VaError::Unspecified(format!("failed to build output stream: {e}")))?;

        stream.play().map_err(|e| VaError::Unspecified(format!("failed to start stream: {e}")))?;
        self.streaming.store(true, Ordering::Release);
        self.stream = Some(stream);
        Ok(())
    }

    fn stop_streaming(&mut self) -> VaResult<()> {
        if let Some(stream) = self.stream.take() {
            stream.pause().map_err(|e| VaError::Unspecified(format!("failed to stop stream: {e}")))?;
        }
        self.streaming.store(false, Ordering::Release);
        Ok(())
    }

    fn is_streaming(&self) -> bool {
        self.streaming.load(Ordering::Acquire)
    }

    fn output_stream_properties(&self) -> StreamProperties {
        self.properties
    }

    fn set_input_sink(&mut self, sink: Option<Arc<dyn DeviceInputSink>>) {
        self.input_sink = sink;
    }
}

/// `SampleFormat::F32` is assumed throughout (§1 the driver shim is a thin
/// pull-stream abstraction, not a format-negotiation layer); kept as a
/// free function so a future format probe can reuse it without touching
/// the backend's public surface.
#[allow(dead_code)]
fn assert_f32(format: SampleFormat) -> VaResult<()> {
    if format == SampleFormat::F32 {
        Ok(())
    } else {
        Err(VaError::NotImplemented(format!("sample format {format:?} not supported")))
    }
}

/// No hardware thread: a caller explicitly triggers one block at a time via
/// [`Self::trigger_block`] (§4.8 "Virtual" / §8 scenario S5). Deterministic
/// by construction since nothing but the caller's own thread ever calls
/// `process`.
pub struct VirtualDriverBackend {
    properties: StreamProperties,
    source: Option<Arc<Mutex<dyn AudioSource>>>,
    streaming: bool,
    last_block: PlanarBlock,
}

impl VirtualDriverBackend {
    pub fn new(properties: StreamProperties) -> Self {
        let last_block = PlanarBlock::new(properties.num_channels, properties.block_size.as_usize());
        Self { properties, source: None, streaming: false, last_block }
    }

    /// Pull exactly one block from the bound source. Returns an error if
    /// streaming has not been started (§4.8 contract still applies to the
    /// virtual variant: `is_streaming` gates it).
    pub fn trigger_block(&mut self) -> VaResult<&PlanarBlock> {
        if !self.streaming {
            return Err(VaError::modal("virtual driver is not streaming"));
        }
        let source = self.source.as_ref().expect("streaming implies a bound source");
        source.lock().process(&mut self.last_block);
        Ok(&self.last_block)
    }
}

impl AudioDriverBackend for VirtualDriverBackend {
    fn initialize(&mut self) -> VaResult<()> {
        Ok(())
    }

    fn finalize(&mut self) -> VaResult<()> {
        self.stop_streaming()
    }

    fn start_streaming(&mut self, source: Arc<Mutex<dyn AudioSource>>) -> VaResult<()> {
        self.source = Some(source);
        self.streaming = true;
        Ok(())
    }

    fn stop_streaming(&mut self) -> VaResult<()> {
        self.streaming = false;
        self.source = None;
        Ok(())
    }

    fn is_streaming(&self) -> bool {
        self.streaming
    }

    fn output_stream_properties(&self) -> StreamProperties {
        self.properties
    }

    fn set_input_sink(&mut self, _sink: Option<Arc<dyn DeviceInputSink>>) {}
}

/// A synthetic ticker at a fixed wall-clock rate, not phase-locked to any
/// audio clock (§4.8 "Timeout" — used for GUI-free debug builds where no
/// real output device is desired but the graph should still run).
pub struct TimeoutDriverBackend {
    properties: StreamProperties,
    period: Duration,
    streaming: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl TimeoutDriverBackend {
    pub fn new(properties: StreamProperties, tick_rate_hz: f64) -> Self {
        let period = Duration::from_secs_f64(1.0 / tick_rate_hz.max(1.0));
        Self { properties, period, streaming: Arc::new(AtomicBool::new(false)), thread: None }
    }
}

impl AudioDriverBackend for TimeoutDriverBackend {
    fn initialize(&mut self) -> VaResult<()> {
        Ok(())
    }

    fn finalize(&mut self) -> VaResult<()> {
        self.stop_streaming()
    }

    fn start_streaming(&mut self, source: Arc<Mutex<dyn AudioSource>>) -> VaResult<()> {
        if self.thread.is_some() {
            return Err(VaError::modal("driver is already streaming"));
        }
        self.streaming.store(true, Ordering::Release);
        let streaming = self.streaming.clone();
        let period = self.period;
        let num_channels = self.properties.num_channels;
        let block_size = self.properties.block_size.as_usize();
        let scratch = StdMutex::new(PlanarBlock::new(num_channels, block_size));

        self.thread = Some(
            std::thread::Builder::new()
                .name("va-driver-timeout".into())
                .spawn(move || {
                    set_realtime_priority();
                    while streaming.load(Ordering::Acquire) {
                        let mut block = scratch.lock().expect("timeout ticker owns its scratch block exclusively");
                        source.lock().process(&mut block);
                        std::thread::sleep(period);
                    }
                })
                .expect("spawning the timeout ticker thread"),
        );
        Ok(())
    }

    fn stop_streaming(&mut self) -> VaResult<()> {
        self.streaming.store(false, Ordering::Release);
        if let Some(handle) = self.thread.take() {
            handle.join().map_err(|_| VaError::Unspecified("timeout ticker thread panicked".into()))?;
        }
        Ok(())
    }

    fn is_streaming(&self) -> bool {
        self.streaming.load(Ordering::Acquire)
    }

    fn output_stream_properties(&self) -> StreamProperties {
        self.properties
    }

    fn set_input_sink(&mut self, _sink: Option<Arc<dyn DeviceInputSink>>) {}
}

/// A [`PlanarBlock`]-producing passthrough used as the driver's device-input
/// datasource (§4.8 `getInputStreamDatasource`): it always has data (silence
/// when no capture is bound), matching the audio thread's never-block rule.
pub struct SilentInputSource {
    channels: usize,
}

impl SilentInputSource {
    pub fn new(channels: usize) -> Self {
        Self { channels }
    }
}

impl AudioSource for SilentInputSource {
    fn num_channels(&self) -> usize {
        self.channels
    }

    fn process(&mut self, output: &mut PlanarBlock) {
        output.zero();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex as StdTestMutex;

    struct CountingSource {
        calls: Arc<StdTestMutex<u32>>,
        channels: usize,
    }

    impl AudioSource for CountingSource {
        fn num_channels(&self) -> usize {
            self.channels
        }

        fn process(&mut self, output: &mut PlanarBlock) {
            *self.calls.lock().unwrap() += 1;
            for ch in 0..output.num_channels() {
                output.channel_mut(ch).fill(1.0);
            }
        }
    }

    #[test]
    fn s5_virtual_driver_is_deterministic_across_triggers() {
        let props = StreamProperties { sample_rate: SampleRate::Hz48000, block_size: BufferSize::Samples128, num_channels: 2 };
        let calls = Arc::new(StdTestMutex::new(0));
        let source: Arc<Mutex<dyn AudioSource>> = Arc::new(Mutex::new(CountingSource { calls: calls.clone(), channels: 2 }));

        let mut backend = VirtualDriverBackend::new(props);
        backend.start_streaming(source).unwrap();

        for _ in 0..10 {
            let block = backend.trigger_block().unwrap();
            assert_eq!(block.channel(0), vec![1.0; 128].as_slice());
        }
        assert_eq!(*calls.lock().unwrap(), 10);
    }

    #[test]
    fn virtual_driver_rejects_trigger_before_streaming() {
        let props = StreamProperties { sample_rate: SampleRate::Hz48000, block_size: BufferSize::Samples128, num_channels: 2 };
        let mut backend = VirtualDriverBackend::new(props);
        assert!(backend.trigger_block().is_err());
    }
}
</content>
