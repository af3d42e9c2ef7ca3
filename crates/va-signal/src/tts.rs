//! Text-to-speech playback (§4.2): a pre-rendered buffer source, functionally
//! identical in audio-thread shape to [`crate::audiofile::AudiofileSource`]
//! but never loops, and carries the synthesizer's utterance id for
//! diagnostics/events rather than a file path.

use std::sync::Arc;

use va_core::Sample;

use crate::source::{BufferPlayback, PlaybackState, SignalSource, TransportAction};

pub struct TextToSpeechSource {
    id: String,
    utterance_id: String,
    playback: BufferPlayback,
}

impl TextToSpeechSource {
    pub fn new(id: impl Into<String>, utterance_id: impl Into<String>, samples: Arc<Vec<Sample>>) -> Self {
        Self { id: id.into(), utterance_id: utterance_id.into(), playback: BufferPlayback::new(samples, false) }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn utterance_id(&self) -> &str {
        &self.utterance_id
    }

    pub fn state(&self) -> PlaybackState {
        self.playback.state()
    }

    pub fn play(&mut self) {
        self.playback.request(TransportAction::Play);
    }

    pub fn stop(&mut self) {
        self.playback.request(TransportAction::Stop);
    }
}

impl SignalSource for TextToSpeechSource {
    fn fetch_block(&mut self, _channel: usize, output: &mut [Sample]) {
        self.playback.produce(output);
    }

    fn reset(&mut self) {
        self.playback.reset();
    }
}
