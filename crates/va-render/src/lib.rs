//! va-render: the real-time audio renderer layer (§4.5).
//!
//! A renderer is the top of the pull-based audio graph (§2): it is itself a
//! [`va_core::AudioSource`], and the generic control surface every renderer
//! implementation adds on top — [`AudioRenderer`] — lets the core thread
//! (§4.9) push scene updates and the global auralization mode down without
//! knowing which concrete renderer it is driving.
//!
//! The only renderer this workspace implements is the
//! [`binaural::BinauralClusteringRenderer`] (§4.5's reference algorithm).

#![allow(dead_code)]

pub mod binaural;

pub use binaural::{BinauralClusteringRenderer, ClusteringConfig, ClusteringState, PrincipalDirection, WavefrontMember};
pub use va_core::{az_el_to_direction, direction_to_az_el};

use va_core::{AudioSource, AuralizationMode};
use va_scene::SceneStateRecord;

/// The control-thread surface every renderer adds on top of
/// [`AudioSource`] (§4.5 "Generic contract"). Called from the core thread
/// (§4.9), never from the audio callback.
pub trait AudioRenderer: AudioSource {
    /// Called at most once per scene publication, with the freshly
    /// published head state. Implementations rebuild whatever per-receiver
    /// state they cache and atomically publish it for `process` to pick up
    /// at the next block.
    fn update_scene(&mut self, scene: &SceneStateRecord);

    /// Called whenever the global auralization mode changes; the mask
    /// itself is not versioned with the scene (§4.9 step 3).
    fn update_global_auralization_mode(&mut self, mode: AuralizationMode);
}
