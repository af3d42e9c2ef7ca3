//! Per-reproduction capture path (§6 "Persisted state"): the WAV *encoding*
//! is out of scope, but the audio-thread side of the capture — handing
//! finished blocks to something that will eventually write them — is not,
//! since it shapes the reproduction's real-time contract. Modeled as an
//! injected sink trait so a caller can plug a WAV writer in without this
//! crate depending on one.
//!
//! The lock-free ring buffer (`rtrb`) carries samples across the audio/
//! writer-thread boundary; `crossbeam-channel`'s non-blocking `try_send`
//! carries the rare lifecycle/overrun notifications back out, matching the
//! "never block the audio thread" rule in §4.12.

use va_core::{PlanarBlock, Sample};

/// Accepts finished blocks from a reproduction's output. Implementations
/// must not block (§4.12); this method runs on the audio thread.
pub trait RecordingSink: Send {
    fn write(&mut self, block: &PlanarBlock);
}

/// Notifications the writer side of a [`RingBufferRecordingSink`] reports
/// back to the control thread.
#[derive(Debug, Clone, Copy)]
pub enum RecordingEvent {
    Started,
    Stopped,
    Overrun { dropped_samples: usize },
}

/// Interleaves each block's channels into a bounded lock-free ring buffer.
/// Pairs with an `rtrb::Consumer` a background thread drains and encodes;
/// that pairing is returned from [`RingBufferRecordingSink::new`].
pub struct RingBufferRecordingSink {
    producer: rtrb::Producer<Sample>,
    events: crossbeam_channel::Sender<RecordingEvent>,
    num_channels: usize,
}

impl RingBufferRecordingSink {
    pub fn new(capacity_frames: usize, num_channels: usize, events: crossbeam_channel::Sender<RecordingEvent>) -> (Self, rtrb::Consumer<Sample>) {
        let (producer, consumer) = rtrb::RingBuffer::new(capacity_frames.max(1) * num_channels.max(1));
        let _ = events.try_send(RecordingEvent::Started);
        (Self { producer, events, num_channels: num_channels.max(1) }, consumer)
    }
}

impl RecordingSink for RingBufferRecordingSink {
    fn write(&mut self, block: &PlanarBlock) {
        let channels = self.num_channels.min(block.num_channels());
        let mut dropped = 0usize;
        for frame in 0..block.block_size() {
            for ch in 0..channels {
                if self.producer.push(block.channel(ch)[frame]).is_err() {
                    dropped += 1;
                }
            }
        }
        if dropped > 0 {
            let _ = self.events.try_send(RecordingEvent::Overrun { dropped_samples: dropped });
        }
    }
}

impl Drop for RingBufferRecordingSink {
    fn drop(&mut self) {
        let _ = self.events.try_send(RecordingEvent::Stopped);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pushes_interleaved_samples_and_reports_start() {
        let (events_tx, events_rx) = crossbeam_channel::unbounded();
        let (mut sink, mut consumer) = RingBufferRecordingSink::new(4, 2, events_tx);
        assert!(matches!(events_rx.try_recv(), Ok(RecordingEvent::Started)));

        let mut block = PlanarBlock::new(2, 2);
        block.channel_mut(0).copy_from_slice(&[1.0, 2.0]);
        block.channel_mut(1).copy_from_slice(&[10.0, 20.0]);
        sink.write(&block);

        assert_eq!(consumer.pop().unwrap(), 1.0);
        assert_eq!(consumer.pop().unwrap(), 10.0);
        assert_eq!(consumer.pop().unwrap(), 2.0);
        assert_eq!(consumer.pop().unwrap(), 20.0);
    }

    #[test]
    fn overrun_reports_dropped_sample_count() {
        let (events_tx, events_rx) = crossbeam_channel::unbounded();
        let (mut sink, _consumer) = RingBufferRecordingSink::new(1, 1, events_tx);
        let _ = events_rx.try_recv();

        let mut block = PlanarBlock::new(1, 4);
        block.channel_mut(0).copy_from_slice(&[1.0, 2.0, 3.0, 4.0]);
        sink.write(&block);

        let mut saw_overrun = false;
        while let Ok(event) = events_rx.try_recv() {
            if let RecordingEvent::Overrun { dropped_samples } = event {
                assert!(dropped_samples > 0);
                saw_overrun = true;
            }
        }
        assert!(saw_overrun);
    }
}
