//! va-signal: the signal source manager and its seven concrete source kinds
//! (§2 component 2, §4.2).
//!
//! Every variant implements the same per-block [`SignalSource`] contract;
//! [`SignalSourceManager`] hosts the live set, assigns each a stable
//! `"<mnemonic><n>"` id, and serves `fetch_input_data` from the audio thread
//! while decoupling control-thread create/delete from that thread's working
//! set via the new-source/delete-request queue pair §4.2 describes.

mod audiofile;
mod device_input;
mod id;
mod manager;
mod network;
mod sequencer;
mod source;
mod synth;
mod tts;

pub use audiofile::AudiofileSource;
pub use device_input::DeviceInputSource;
pub use id::{IdAllocator, SignalSourceKind};
pub use manager::SignalSourceManager;
pub use network::NetworkStreamSource;
pub use sequencer::SequencerSource;
pub use source::{BufferPlayback, PlaybackState, SignalSource, TransportAction};
pub use synth::{Harmonic, ParametricSynthSource};
pub use tts::TextToSpeechSource;
</content>
