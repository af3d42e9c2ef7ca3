//! va-render error re-export.
//!
//! The renderer's audio-thread path is infallible by contract (§4.5 "all
//! errors are reported via `tracing::warn!` plus an event, never thrown
//! across the audio-thread boundary"); only construction-time validation
//! (head radius, speed of sound, cluster count) can fail, and it fails with
//! the workspace-shared [`VaError`] rather than a renderer-local type.

pub use va_core::{VaError, VaResult};
