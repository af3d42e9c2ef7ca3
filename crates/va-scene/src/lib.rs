//! va-scene: the immutable, versioned scene graph and its synchronized-update
//! ("sync-mod") protocol (§3, §4.4).
//!
//! A [`SceneManager`] owns a single published "head" [`SceneStateRecord`].
//! Mutators never touch the head in place: they clone-on-write a draft
//! behind a reentrant per-thread transaction and swap it in atomically on
//! the final `unlock_update`, so every block the audio-rendering side reads
//! a wholly self-consistent snapshot regardless of how many edits a control
//! thread batches into one transaction.

mod ids;
mod manager;
mod motion;
mod state;

pub use ids::{PortalId, ReceiverId, SoundSourceId};
pub use manager::{SceneManager, SceneManagerConfig};
pub use motion::MotionState;
pub use state::{PortalState, ReceiverState, SceneStateRecord, SoundSourceState};
