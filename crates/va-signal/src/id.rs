//! Signal source identity: a string of the form `"<mnemonic><n>"` (§4.2),
//! assigned once at creation and never reused by a later source of the same
//! kind.

use std::sync::atomic::{AtomicU64, Ordering};

/// The signal-source variants the manager hosts (§4.2).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalSourceKind {
    Audiofile,
    NetworkStream,
    Engine,
    JetEngine,
    Machine,
    TextToSpeech,
    Sequencer,
    DeviceInput,
}

impl SignalSourceKind {
    pub fn mnemonic(self) -> &'static str {
        match self {
            Self::Audiofile => "audiofile",
            Self::NetworkStream => "netstream",
            Self::Engine => "engine",
            Self::JetEngine => "jetengine",
            Self::Machine => "machine",
            Self::TextToSpeech => "tts",
            Self::Sequencer => "sequencer",
            Self::DeviceInput => "deviceinput",
        }
    }
}

/// Per-kind monotonic counters backing id assignment. One manager owns one
/// of these; cloning a `SignalSourceKind`'s counter would defeat uniqueness.
#[derive(Debug, Default)]
pub struct IdAllocator {
    audiofile: AtomicU64,
    network_stream: AtomicU64,
    engine: AtomicU64,
    jet_engine: AtomicU64,
    machine: AtomicU64,
    text_to_speech: AtomicU64,
    sequencer: AtomicU64,
    device_input: AtomicU64,
}

impl IdAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next(&self, kind: SignalSourceKind) -> String {
        let counter = match kind {
            SignalSourceKind::Audiofile => &self.audiofile,
            SignalSourceKind::NetworkStream => &self.network_stream,
            SignalSourceKind::Engine => &self.engine,
            SignalSourceKind::JetEngine => &self.jet_engine,
            SignalSourceKind::Machine => &self.machine,
            SignalSourceKind::TextToSpeech => &self.text_to_speech,
            SignalSourceKind::Sequencer => &self.sequencer,
            SignalSourceKind::DeviceInput => &self.device_input,
        };
        let n = counter.fetch_add(1, Ordering::AcqRel);
        format!("{}{n}", kind.mnemonic())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_stable_and_unique_per_kind() {
        let alloc = IdAllocator::new();
        assert_eq!(alloc.next(SignalSourceKind::Audiofile), "audiofile0");
        assert_eq!(alloc.next(SignalSourceKind::Audiofile), "audiofile1");
        assert_eq!(alloc.next(SignalSourceKind::Engine), "engine0");
    }
}
