//! Error handling for the tileboard-sim crate.

use std::{io, path::PathBuf, result};

use thiserror::Error;

/// Convenient result type for simulator operations.
pub type Result<T> = result::Result<T, Error>;

/// Errors that can occur while running a simulated session.
#[derive(Debug, Error)]
pub enum Error {
    /// Wrapper for standard I/O errors.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    /// The dispatcher failed to start, stop or save.
    #[error("dispatcher error: {0}")]
    Dispatch(#[from] tileboard_dispatch::Error),
    /// A command script could not be read or parsed.
    #[error("bad script {path}: {message}")]
    Script {
        /// Script location.
        path: PathBuf,
        /// Parser or reader message.
        message: String,
    },
    /// The host event thread panicked.
    #[error("host event thread panicked")]
    HostPanicked,
}
