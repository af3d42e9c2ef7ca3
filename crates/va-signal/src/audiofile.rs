//! Buffered sample playback (§4.2 "Audiofile").

use std::sync::Arc;

use va_core::Sample;

use crate::source::{BufferPlayback, PlaybackState, SignalSource, TransportAction};

/// Playback of a pre-decoded sample buffer. Decoding the source file itself
/// is out of scope (§1); callers hand in already-decoded samples.
pub struct AudiofileSource {
    id: String,
    playback: BufferPlayback,
    looping: bool,
}

impl AudiofileSource {
    pub fn new(id: impl Into<String>, samples: Arc<Vec<Sample>>, looping: bool) -> Self {
        Self { id: id.into(), playback: BufferPlayback::new(samples, looping), looping }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn state(&self) -> PlaybackState {
        self.playback.state()
    }

    pub fn play(&mut self) {
        self.playback.request(TransportAction::Play);
    }

    pub fn pause(&mut self) {
        self.playback.request(TransportAction::Pause);
    }

    pub fn stop(&mut self) {
        self.playback.request(TransportAction::Stop);
    }

    pub fn set_looping(&mut self, looping: bool) {
        self.looping = looping;
        self.playback.set_looping(looping);
    }

    pub fn is_looping(&self) -> bool {
        self.looping
    }
}

impl SignalSource for AudiofileSource {
    fn fetch_block(&mut self, _channel: usize, output: &mut [Sample]) {
        self.playback.produce(output);
    }

    fn reset(&mut self) {
        self.playback.reset();
    }
}
