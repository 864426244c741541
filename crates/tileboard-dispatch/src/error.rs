use std::{io, path::PathBuf, result::Result as StdResult, time::Duration};

use thiserror::Error;

/// Convenient result type for the dispatch crate.
pub type Result<T> = StdResult<T, Error>;

/// Failure reported by a [`Store`](crate::Store) while persisting a game.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("persist failed: {0}")]
pub struct PersistError(pub String);

/// Unified error type for the dispatcher and its handle.
#[derive(Debug, Error)]
pub enum Error {
    /// Stop was already requested; the command was not queued.
    #[error("dispatcher stopped")]
    Stopped,

    /// The worker did not exit within the configured stop timeout and was abandoned.
    #[error("dispatcher did not stop within {0:?}")]
    StopTimeout(Duration),

    /// The worker thread panicked.
    #[error("dispatcher worker panicked")]
    WorkerPanicked,

    /// The worker thread could not be spawned.
    #[error("failed to spawn dispatcher thread: {0}")]
    Spawn(#[from] io::Error),

    /// Persisting engine state failed during a save pass.
    #[error(transparent)]
    Persist(#[from] PersistError),

    /// Configuration could not be read or parsed.
    #[error("config error{}: {message}", location(path))]
    Config {
        /// Optional path of the offending file.
        path: Option<PathBuf>,
        /// Human-readable message.
        message: String,
    },
}

/// `" at <path>"` when a path is known.
fn location(path: &Option<PathBuf>) -> String {
    path.as_ref()
        .map(|p| format!(" at {}", p.display()))
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_error_names_path_when_known() {
        let err = Error::Config {
            path: Some(PathBuf::from("/etc/tileboard.ron")),
            message: "expected integer".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "config error at /etc/tileboard.ron: expected integer"
        );
        let err = Error::Config {
            path: None,
            message: "expected integer".to_string(),
        };
        assert_eq!(err.to_string(), "config error: expected integer");
    }
}
