//! The per-block production contract every signal-source variant implements,
//! plus the buffered-playback state machine shared by Audiofile and
//! text-to-speech sources (§4.2).

use std::sync::Arc;

use va_core::{PlanarBlock, Sample};

/// One signal source's per-block contract (§4.2 "serve `fetch_input_data`
/// calls from the audio thread").
///
/// The donor passes callers a raw pointer into the source's internal buffer
/// (`block_pointer`) and a separate `increment_block_pointer` step; here a
/// source instead copies one block directly into a caller-owned slice and
/// advances its own position as part of the same call, which is the
/// equivalent operation under borrow-checked ownership.
pub trait SignalSource: Send {
    /// Number of channels this source produces (most variants are mono).
    fn num_channels(&self) -> usize {
        1
    }

    /// Write one block for `channel` into `output`. Sources with nothing to
    /// produce (stopped, invalid, exhausted) must zero `output` themselves
    /// (§4.2 step 3) rather than leave stale samples.
    fn fetch_block(&mut self, channel: usize, output: &mut [Sample]);

    /// Sources that read the driver's live input (device passthrough) pull
    /// their channel out of the shared device-input block here, before
    /// `fetch_block` is called (§4.2 step 1). No-op for every other variant.
    fn accept_device_input(&mut self, _device_input: &PlanarBlock) {}

    fn reset(&mut self) {}
}

/// Audiofile / text-to-speech playback state (§4.2 "Audiofile signal source
/// state machine").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    Invalid,
    Stopped,
    Paused,
    Playing,
}

/// Control-thread transport action applied at the next block boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportAction {
    None,
    Play,
    Pause,
    Stop,
}

/// Shared buffered-playback engine behind [`crate::audiofile::AudiofileSource`]
/// and [`crate::tts::TextToSpeechSource`]: a pre-decoded sample buffer, a
/// read position, loop behavior, and the `Invalid/Stopped/Paused/Playing`
/// transition table.
#[derive(Debug)]
pub struct BufferPlayback {
    samples: Arc<Vec<Sample>>,
    position: usize,
    state: PlaybackState,
    pending_action: TransportAction,
    looping: bool,
}

impl BufferPlayback {
    pub fn new(samples: Arc<Vec<Sample>>, looping: bool) -> Self {
        let state = if samples.is_empty() { PlaybackState::Invalid } else { PlaybackState::Stopped };
        Self { samples, position: 0, state, pending_action: TransportAction::None, looping }
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    /// Queue a transport action; applied at the top of the next
    /// [`Self::produce`] call, never mid-block.
    pub fn request(&mut self, action: TransportAction) {
        self.pending_action = action;
    }

    /// Apply the pending transition, then fill `output` (§4.2 transition
    /// table, including the preserved `Stopped + Pause -> Playing` quirk).
    pub fn produce(&mut self, output: &mut [Sample]) {
        self.apply_pending();

        match self.state {
            PlaybackState::Playing => {
                let mut written = 0;
                while written < output.len() {
                    let remaining = self.samples.len() - self.position;
                    if remaining == 0 {
                        if self.looping {
                            self.position = 0;
                            continue;
                        } else {
                            self.state = PlaybackState::Stopped;
                            self.position = 0;
                            break;
                        }
                    }
                    let take = remaining.min(output.len() - written);
                    output[written..written + take]
                        .copy_from_slice(&self.samples[self.position..self.position + take]);
                    self.position += take;
                    written += take;
                }
                output[written..].fill(0.0);
            }
            PlaybackState::Invalid | PlaybackState::Stopped | PlaybackState::Paused => {
                output.fill(0.0);
            }
        }
    }

    fn apply_pending(&mut self) {
        if self.state == PlaybackState::Invalid {
            self.pending_action = TransportAction::None;
            return;
        }
        self.state = match (self.state, self.pending_action) {
            (PlaybackState::Stopped, TransportAction::Play) => {
                self.position = 0;
                PlaybackState::Playing
            }
            // Historical quirk, preserved: Pause issued while Stopped starts
            // playback in a paused-equivalent running state.
            (PlaybackState::Stopped, TransportAction::Pause) => PlaybackState::Playing,
            (PlaybackState::Paused, TransportAction::Play) => PlaybackState::Playing,
            (PlaybackState::Paused, TransportAction::Stop) => {
                self.position = 0;
                PlaybackState::Stopped
            }
            (PlaybackState::Playing, TransportAction::Pause) => PlaybackState::Paused,
            (PlaybackState::Playing, TransportAction::Stop) => {
                self.position = 0;
                PlaybackState::Stopped
            }
            (state, _) => state,
        };
        self.pending_action = TransportAction::None;
    }

    pub fn reset(&mut self) {
        self.position = 0;
        self.state = if self.samples.is_empty() { PlaybackState::Invalid } else { PlaybackState::Stopped };
        self.pending_action = TransportAction::None;
    }

    pub fn set_looping(&mut self, looping: bool) {
        self.looping = looping;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn playback(looping: bool) -> BufferPlayback {
        BufferPlayback::new(Arc::new(vec![1.0, 2.0, 3.0, 4.0]), looping)
    }

    #[test]
    fn stopped_play_transitions_to_playing_from_start() {
        let mut p = playback(false);
        p.request(TransportAction::Play);
        let mut out = [0.0; 2];
        p.produce(&mut out);
        assert_eq!(p.state(), PlaybackState::Playing);
        assert_eq!(out, [1.0, 2.0]);
    }

    #[test]
    fn stopped_pause_quirk_starts_playback() {
        let mut p = playback(false);
        p.request(TransportAction::Pause);
        let mut out = [0.0; 2];
        p.produce(&mut out);
        assert_eq!(p.state(), PlaybackState::Playing);
        assert_eq!(out, [1.0, 2.0]);
    }

    #[test]
    fn playing_pause_then_play_resumes_without_rewind() {
        let mut p = playback(false);
        p.request(TransportAction::Play);
        let mut out = [0.0; 2];
        p.produce(&mut out);
        p.request(TransportAction::Pause);
        p.produce(&mut out);
        assert_eq!(p.state(), PlaybackState::Paused);
        assert_eq!(out, [0.0, 0.0]);

        p.request(TransportAction::Play);
        p.produce(&mut out);
        assert_eq!(out, [3.0, 4.0]);
    }

    #[test]
    fn playing_stop_rewinds() {
        let mut p = playback(false);
        p.request(TransportAction::Play);
        let mut out = [0.0; 2];
        p.produce(&mut out);
        p.request(TransportAction::Stop);
        p.produce(&mut out);
        assert_eq!(p.state(), PlaybackState::Stopped);

        p.request(TransportAction::Play);
        p.produce(&mut out);
        assert_eq!(out, [1.0, 2.0]);
    }

    #[test]
    fn eof_without_loop_stops() {
        let mut p = playback(false);
        p.request(TransportAction::Play);
        let mut out = [0.0; 4];
        p.produce(&mut out);
        assert_eq!(p.state(), PlaybackState::Playing);
        p.produce(&mut out);
        assert_eq!(p.state(), PlaybackState::Stopped);
        assert_eq!(out, [0.0; 4]);
    }

    #[test]
    fn eof_with_loop_rewinds_and_stays_playing() {
        let mut p = playback(true);
        p.request(TransportAction::Play);
        let mut out = [0.0; 5];
        p.produce(&mut out);
        assert_eq!(p.state(), PlaybackState::Playing);
        assert_eq!(out, [1.0, 2.0, 3.0, 4.0, 1.0]);
    }

    #[test]
    fn empty_buffer_is_invalid_and_stays_silent() {
        let mut p = BufferPlayback::new(Arc::new(vec![]), false);
        assert_eq!(p.state(), PlaybackState::Invalid);
        p.request(TransportAction::Play);
        let mut out = [1.0, 1.0];
        p.produce(&mut out);
        assert_eq!(p.state(), PlaybackState::Invalid);
        assert_eq!(out, [0.0, 0.0]);
    }
}
