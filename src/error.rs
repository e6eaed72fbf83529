//! Error types for the ambient mixer
//!
//! Lifecycle violations (operating on a context that was never opened or
//! has been closed) are reported as errors. Unknown tracks are not errors;
//! those operations are no-ops on the manager.

use thiserror::Error;

/// Main error type for the mixer
#[derive(Error, Debug)]
pub enum Error {
    /// Operation invoked before `initialize()`
    #[error("Audio context not initialized")]
    Uninitialized,

    /// `initialize()` called on a manager that already owns a context
    #[error("Audio context already initialized")]
    AlreadyInitialized,

    /// Operation invoked after `teardown()`
    #[error("Audio context has been torn down")]
    TornDown,

    /// Empty or otherwise unusable track key
    #[error("Invalid track key: {0:?}")]
    InvalidTrackKey(String),

    /// Network or storage failure while retrieving asset bytes
    #[error("Asset fetch failed: {0}")]
    AssetFetch(String),

    /// Bytes are not decodable audio
    #[error("Audio decode error: {0}")]
    Decode(String),

    /// Audio output device errors
    #[error("Audio output error: {0}")]
    Output(String),

    /// A playback source was started twice, or restarted after stop
    #[error("Playback source can only be started once")]
    SourceAlreadyUsed,

    /// A pending start was superseded or cancelled before it could register
    #[error("Start of track '{0}' was cancelled")]
    StartCancelled(String),

    /// Configuration loading errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// File I/O errors
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience Result type using the mixer Error
pub type Result<T> = std::result::Result<T, Error>;
