//! Error types for xrtour-player
//!
//! Defines module-specific error types using thiserror for clear error propagation.
//! Media failures never reach visual surfaces as errors: the coordinator turns
//! them into state transitions and events. These types cover the service shell.

use thiserror::Error;

use crate::media::MediaError;

/// Main error type for the xrtour-player module
#[derive(Error, Debug)]
pub enum Error {
    /// Errors from the shared library (config, permission store, ...)
    #[error(transparent)]
    Common(#[from] xrtour_common::Error),

    /// Media resource errors surfaced outside the coordinator
    #[error("Media error: {0}")]
    Media(#[from] MediaError),

    /// HTTP server errors
    #[error("HTTP server error: {0}")]
    Http(String),

    /// Invalid state for operation
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Invalid request
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// The coordinator task has stopped and no longer accepts intents
    #[error("Playback coordinator is not running")]
    CoordinatorStopped,

    /// File I/O errors
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience Result type using xrtour-player Error
pub type Result<T> = std::result::Result<T, Error>;
