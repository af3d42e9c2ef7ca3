//! Shared error taxonomy for the VA real-time core.

use thiserror::Error;

/// Error kind shared by every crate in this workspace.
///
/// Control-thread API calls propagate these as typed results. Audio-thread code
/// never returns `Err` across the block boundary; see `va-core::audio_thread`
/// docs on the realtime traits for the corresponding infallible contract.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum VaError {
    #[error("unspecified error: {0}")]
    Unspecified(String),

    #[error("modal error: {0}")]
    ModalError(String),

    #[error("network error: {0}")]
    NetworkError(String),

    #[error("protocol error: {0}")]
    ProtocolError(String),

    #[error("not implemented: {0}")]
    NotImplemented(String),

    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("invalid id: {0}")]
    InvalidId(String),

    #[error("resource in use: {0}")]
    ResourceInUse(String),

    #[error("file not found: {name} (search paths: {search_paths:?})")]
    FileNotFound { name: String, search_paths: Vec<String> },
}

impl VaError {
    pub fn invalid_id(id: impl std::fmt::Display) -> Self {
        Self::InvalidId(id.to_string())
    }

    pub fn invalid_parameter(msg: impl Into<String>) -> Self {
        Self::InvalidParameter(msg.into())
    }

    pub fn modal(msg: impl Into<String>) -> Self {
        Self::ModalError(msg.into())
    }

    pub fn resource_in_use(msg: impl Into<String>) -> Self {
        Self::ResourceInUse(msg.into())
    }

    pub fn file_not_found(name: impl Into<String>, search_paths: &[String]) -> Self {
        Self::FileNotFound { name: name.into(), search_paths: search_paths.to_vec() }
    }
}

/// Result type alias used throughout the workspace.
pub type VaResult<T> = Result<T, VaError>;
</content>
