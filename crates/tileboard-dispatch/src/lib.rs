//! Tileboard command dispatch
//!
//! Serializes every mutating operation against one non-reentrant game engine:
//! - [`Dispatcher`] owns the engine on a single worker thread and executes
//!   [`Command`]s FIFO, coalescing superseded ones and chaining follow-ons
//! - [`DispatcherHandle`] is the producer side: `enqueue`, snapshot reads,
//!   busy queries and the bounded stop protocol
//! - [`frame_channel`] splits the shared framebuffer into a writer (the
//!   dispatcher) and a presenter (the host surface) behind one lock
//! - [`SaveGate`] skips persistence when the serialized game is unchanged
//!
//! The engine, persistence and host surface are collaborators reached through
//! the [`GameEngine`], [`Store`] and [`Host`] traits.

mod command;
mod config;
mod dispatcher;
mod draw;
mod engine;
mod error;
mod queue;
mod save;
mod snapshot;
pub mod test_support;
mod zoom;

pub use command::{BoardDims, Command, CommandKind, CommonPrefs, CommsAddr, Key, Origin, Rect, Tag};
pub use config::{DispatcherConfig, StopPolicy};
pub use dispatcher::{Dispatcher, DispatcherHandle, Session, StopReport};
pub use draw::{FramePresenter, FrameWriter, Framebuffer, frame_channel};
pub use engine::{
    DeviceRole, GameEngine, GameInfo, GameOverTitle, GameSummary, HintOutcome, Host, HostEvent,
    Store, ZoomOutcome,
};
pub use error::{Error, PersistError, Result};
pub use queue::{CommandQueue, Interrupted};
pub use save::{SaveGate, SaveOutcome};
pub use snapshot::{GameStateInfo, TrayVisState};
pub use zoom::{ZoomDirection, ZoomHysteresis};
