//! Dispatcher configuration, loadable from RON.

use std::{fs, path::Path, time::Duration};

use serde::Deserialize;

use crate::error::{Error, Result};

/// Default worker thread name.
const DEFAULT_THREAD_NAME: &str = "tileboard-dispatch";
/// Default bound on how long `request_stop` waits for the worker.
const DEFAULT_STOP_TIMEOUT_MS: u64 = 5_000;

/// What happens to commands still queued when stop is requested.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
pub enum StopPolicy {
    /// Abandon them; the final save sees the state as of the last executed command.
    #[default]
    Discard,
    /// Execute them before the final save.
    Drain,
}

/// Dispatcher settings.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct DispatcherConfig {
    /// Name given to the worker thread.
    pub thread_name: String,
    /// How long `request_stop` waits before abandoning the worker.
    pub stop_timeout_ms: u64,
    /// Handling of queued commands at stop.
    pub stop_policy: StopPolicy,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            thread_name: DEFAULT_THREAD_NAME.to_string(),
            stop_timeout_ms: DEFAULT_STOP_TIMEOUT_MS,
            stop_policy: StopPolicy::Discard,
        }
    }
}

impl DispatcherConfig {
    /// Stop timeout as a `Duration`.
    pub fn stop_timeout(&self) -> Duration {
        Duration::from_millis(self.stop_timeout_ms)
    }

    /// Parse from RON text. Missing fields take their defaults.
    pub fn from_ron(text: &str) -> Result<Self> {
        ron::from_str(text).map_err(|e| Error::Config {
            path: None,
            message: e.to_string(),
        })
    }

    /// Load from a RON file.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|e| Error::Config {
            path: Some(path.to_path_buf()),
            message: e.to_string(),
        })?;
        ron::from_str(&text).map_err(|e| Error::Config {
            path: Some(path.to_path_buf()),
            message: e.to_string(),
        })
    }
}
