//! One simulated session: scripted engine, in-memory store, a host thread
//! draining events, and the dispatcher in between.

use std::{
    thread,
    time::{Duration, Instant},
};

use crossbeam_channel::{self as chan, Receiver};
use tileboard_dispatch::{
    CommandKind, Dispatcher, DispatcherConfig, FramePresenter, GameStateInfo, HostEvent,
    SaveOutcome, Session, frame_channel,
    test_support::{MemoryStore, ScriptedEngine},
};
use tracing::{debug, info};

use crate::{
    error::{Error, Result},
    script,
};

/// Poll interval while waiting for the dispatcher to go idle.
const SETTLE_POLL: Duration = Duration::from_millis(5);

/// What the host surface saw.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct HostStats {
    /// Frames presented.
    pub frames: usize,
    /// Dialogs opened, by title.
    pub dialogs: Vec<u32>,
    /// End-of-game queries and reports.
    pub game_over_events: usize,
    /// Top-left pixel of the last presented frame.
    pub last_pixel: Option<u32>,
}

/// Result of one simulated session.
#[derive(Debug)]
pub struct Summary {
    /// Commands replayed from the script.
    pub replayed: usize,
    /// Handlers the dispatcher ran, no-ops excluded.
    pub executed: u64,
    /// Commands superseded by their successor.
    pub coalesced: u64,
    /// Final save result, if one ran.
    pub final_save: Option<SaveOutcome>,
    /// Payloads the store holds at exit.
    pub persisted: usize,
    /// Snapshot published after the last redraw.
    pub snapshot: GameStateInfo,
    /// Host side tallies.
    pub host: HostStats,
}

/// Present every frame and tally dialogs until the dispatcher drops its host.
fn host_loop(events: &Receiver<HostEvent>, presenter: &FramePresenter) -> HostStats {
    let mut stats = HostStats::default();
    for ev in events {
        match ev {
            HostEvent::FrameReady => {
                stats.frames += 1;
                stats.last_pixel = presenter.present(|fb| fb.pixels().first().copied());
            }
            HostEvent::Dialog { title, text } => {
                debug!(title, lines = text.lines().count(), "dialog");
                stats.dialogs.push(title);
            }
            HostEvent::QueryEndGame | HostEvent::GameOver { .. } => stats.game_over_events += 1,
            HostEvent::ConnStatusRect(r) => debug!(?r, "conn_status_rect"),
        }
    }
    stats
}

/// Replay `commands` through a fresh dispatcher, wait for it to go idle
/// (bounded by `settle`), then stop it.
pub fn run(
    cfg: &DispatcherConfig,
    commands: Vec<CommandKind>,
    settle: Duration,
    save: bool,
) -> Result<Summary> {
    let (engine, probe) = ScriptedEngine::new();
    let store = MemoryStore::new();
    let dims = script::demo_dims();
    let (writer, presenter) = frame_channel(
        u32::try_from(dims.width).unwrap_or(0),
        u32::try_from(dims.height).unwrap_or(0),
    );
    let (tx, rx) = chan::unbounded();
    let host = thread::Builder::new()
        .name("tileboard-host".to_string())
        .spawn(move || host_loop(&rx, &presenter))?;

    let session = Session::new(probe.serialized(), tx, store.clone(), writer);
    let mut handle = Dispatcher::spawn(engine, session, cfg)?;

    let replayed = commands.len();
    for kind in commands {
        let origin = script::origin_of(&kind);
        handle.enqueue_with(kind, origin)?;
    }

    let deadline = Instant::now() + settle;
    while !handle.idle() && Instant::now() < deadline {
        thread::sleep(SETTLE_POLL);
    }
    info!(idle = handle.idle(), queued = handle.queued(), "settled");

    let snapshot = handle.snapshot();
    let report = handle.request_stop(save)?;
    drop(handle);
    let host = host.join().map_err(|_| Error::HostPanicked)?;

    Ok(Summary {
        replayed,
        executed: report.executed,
        coalesced: report.coalesced,
        final_save: report.final_save,
        persisted: store.save_count(),
        snapshot,
        host,
    })
}
