//! The dispatcher: one worker thread that owns the engine and executes queued
//! commands in order.
//!
//! Producers on any thread call [`DispatcherHandle::enqueue`]. The worker pops
//! commands FIFO, drops a coalescible command when the next queued command has
//! the same tag, runs the handler, and on a redraw draws under the frame lock,
//! refreshes the state snapshot and tells the host. Handlers that imply
//! further work append follow-on commands to the tail instead of running them
//! inline, so the engine sees one total order.

use std::{
    sync::Arc,
    thread::{self, JoinHandle},
    time::Duration,
};

use crossbeam_channel::{self as chan, Receiver, RecvTimeoutError, Sender};
use parking_lot::Mutex;
use tracing::{debug, info, trace, warn};

use crate::{
    command::{BoardDims, Command, CommandKind, Origin},
    config::{DispatcherConfig, StopPolicy},
    draw::FrameWriter,
    engine::{self, DeviceRole, GameEngine, GameOverTitle, Host, HostEvent, Store, ZoomOutcome},
    error::{Error, Result},
    queue::{CommandQueue, Interrupted},
    save::{SaveGate, SaveOutcome},
    snapshot::{GameStateInfo, SnapshotCell, TrayVisState},
    zoom::ZoomHysteresis,
};

/// Columns used when formatting dictionary counts.
const DICT_COUNT_COLUMNS: u32 = 3;
/// Zoom step used by the toggle command.
const TOGGLE_ZOOM_STEP: i32 = 5;

/// Collaborators for one game session.
pub struct Session {
    /// Serialization the game was loaded from; the save gate compares against it.
    pub baseline: Vec<u8>,
    /// Host surface notified of frames and dialogs.
    pub host: Box<dyn Host>,
    /// Persistence for saves.
    pub store: Box<dyn Store>,
    /// Drawing half of the shared framebuffer.
    pub writer: FrameWriter,
}

impl Session {
    /// Bundle session collaborators.
    pub fn new(
        baseline: Vec<u8>,
        host: impl Host + 'static,
        store: impl Store + 'static,
        writer: FrameWriter,
    ) -> Self {
        Self {
            baseline,
            host: Box::new(host),
            store: Box::new(store),
            writer,
        }
    }
}

/// Stop and lifecycle flags shared between handle and worker.
#[derive(Debug, Default)]
struct Control {
    /// `request_stop` was called.
    stop_requested: bool,
    /// Run a final save after the loop.
    save_on_stop: bool,
    /// The worker has left its loop (for any reason).
    exited: bool,
}

/// State shared between the handle and the worker.
#[derive(Default)]
struct Shared {
    /// Pending commands.
    queue: CommandQueue,
    /// Stop flags; also serializes enqueue against stop.
    control: Mutex<Control>,
    /// Latest state snapshot.
    snapshot: SnapshotCell,
    /// Latest published zoom state.
    zoom: Mutex<ZoomHysteresis>,
    /// Replacement dictionary name applied at the next save.
    save_dict: Mutex<Option<String>>,
}

/// Everything the worker hands back when it exits.
#[derive(Debug)]
pub struct StopReport<E> {
    /// The engine, returned to its owner.
    pub engine: E,
    /// Commands whose handler ran. `None` no-ops, the stop sentinel among
    /// them, are not counted.
    pub executed: u64,
    /// Commands dropped because the next queued command superseded them.
    pub coalesced: u64,
    /// Result of the final save pass, if one ran.
    pub final_save: Option<SaveOutcome>,
    /// The loop ended through queue interruption rather than a requested stop.
    pub interrupted: bool,
}

/// Marks the worker as exited and signals the waiting stopper, even on panic.
struct ExitSignal {
    /// Shared state to flag.
    shared: Arc<Shared>,
    /// Completion channel read by `request_stop`.
    done: Sender<()>,
}

impl Drop for ExitSignal {
    fn drop(&mut self) {
        self.shared.control.lock().exited = true;
        let _ignored = self.done.send(());
    }
}

/// The worker side. Constructed only by [`Dispatcher::spawn`].
pub struct Dispatcher<E> {
    /// The engine; touched only on the worker thread.
    engine: E,
    /// State shared with the handle.
    shared: Arc<Shared>,
    /// Host surface.
    host: Box<dyn Host>,
    /// Persistence.
    store: Box<dyn Store>,
    /// Drawing half of the framebuffer.
    writer: FrameWriter,
    /// Dirty check for saves.
    save_gate: SaveGate,
    /// Session zoom state.
    zoom: ZoomHysteresis,
    /// Handling of queued commands at stop.
    stop_policy: StopPolicy,
    /// Handlers run.
    executed: u64,
    /// Commands coalesced away.
    coalesced: u64,
}

impl<E> Dispatcher<E>
where
    E: GameEngine + 'static,
{
    /// Start the worker thread for a session and return its handle.
    pub fn spawn(
        engine: E,
        session: Session,
        cfg: &DispatcherConfig,
    ) -> Result<DispatcherHandle<E>> {
        let shared = Arc::new(Shared::default());
        let (done_tx, done_rx) = chan::bounded(1);
        let worker = Self {
            engine,
            shared: shared.clone(),
            host: session.host,
            store: session.store,
            writer: session.writer,
            save_gate: SaveGate::new(session.baseline),
            zoom: ZoomHysteresis::default(),
            stop_policy: cfg.stop_policy,
            executed: 0,
            coalesced: 0,
        };
        let exit = ExitSignal {
            shared: shared.clone(),
            done: done_tx,
        };
        let handle = thread::Builder::new()
            .name(cfg.thread_name.clone())
            .spawn(move || {
                let _exit = exit;
                worker.run()
            })?;
        info!(thread = %cfg.thread_name, policy = ?cfg.stop_policy, "dispatcher_started");
        Ok(DispatcherHandle {
            shared,
            worker: Some(handle),
            done: done_rx,
            stop_timeout: cfg.stop_timeout(),
        })
    }

    /// The worker loop.
    fn run(mut self) -> Result<StopReport<E>> {
        let mut interrupted = false;
        loop {
            if self.should_exit() {
                break;
            }
            let cmd = match self.shared.queue.pop_blocking() {
                Ok(cmd) => cmd,
                Err(Interrupted) => {
                    warn!("dispatcher interrupted; exiting without final save");
                    interrupted = true;
                    break;
                }
            };

            let step = self.dispatch(cmd);
            self.shared.queue.finish();
            step?;
        }

        let save_on_stop = {
            let c = self.shared.control.lock();
            c.stop_requested && c.save_on_stop
        };
        let final_save = if save_on_stop && !interrupted {
            Some(self.save()?)
        } else {
            None
        };
        info!(
            executed = self.executed,
            coalesced = self.coalesced,
            final_save = ?final_save,
            "dispatcher_stopped"
        );
        Ok(StopReport {
            engine: self.engine,
            executed: self.executed,
            coalesced: self.coalesced,
            final_save,
            interrupted,
        })
    }

    /// Coalesce or execute one popped command, redrawing if needed.
    fn dispatch(&mut self, cmd: Command) -> Result<()> {
        let tag = cmd.tag();
        if tag.is_coalescible() && self.shared.queue.peek_tag() == Some(tag) {
            self.coalesced += 1;
            trace!(tag = ?tag, "coalesced");
            return Ok(());
        }

        debug!(tag = ?tag, origin = ?cmd.origin, "dispatch");
        let noop = matches!(cmd.kind, CommandKind::None);
        let draw = self.execute(cmd.kind)?;
        if !noop {
            self.executed += 1;
        }
        if draw {
            self.redraw();
        }
        Ok(())
    }

    /// Top-of-loop stop check.
    fn should_exit(&self) -> bool {
        if !self.shared.control.lock().stop_requested {
            return false;
        }
        match self.stop_policy {
            StopPolicy::Discard => true,
            StopPolicy::Drain => self.shared.queue.is_empty(),
        }
    }

    /// Run one handler. Returns whether a redraw is needed.
    fn execute(&mut self, kind: CommandKind) -> Result<bool> {
        let e = &mut self.engine;
        let draw = match kind {
            CommandKind::None => false,
            CommandKind::Draw => true,
            CommandKind::InvalAll => {
                e.inval_all();
                true
            }
            CommandKind::Layout(dims) => self.layout(&dims),
            CommandKind::Reset => {
                e.comms_reset_same();
                self.start()
            }
            CommandKind::Start => self.start(),
            CommandKind::SwitchClient => {
                e.server_reset();
                e.init_client_connection();
                e.server_do()
            }
            CommandKind::Save => {
                self.save()?;
                false
            }
            CommandKind::Do => e.server_do(),
            CommandKind::Receive { msg, addr } => {
                let changed = e.receive_message(&msg, &addr);
                self.follow(CommandKind::Do);
                if changed {
                    self.follow(CommandKind::Save);
                }
                changed
            }
            CommandKind::TransportFailed => {
                e.transport_failed();
                false
            }
            CommandKind::PrefsChange(prefs) => {
                // some prefs (colors) are unknown to the engine, so always repaint everything
                e.inval_all();
                e.prefs_changed(&prefs);
                true
            }
            CommandKind::PenDown { x, y } => e.pen_down(x, y),
            CommandKind::PenMove { x, y, ms, drag } => e.pen_move(x, y, ms, drag),
            CommandKind::PenUp { x, y, ms } => e.pen_up(x, y, ms),
            CommandKind::KeyDown(key) => e.key_down(key),
            CommandKind::KeyUp(key) => e.key_up(key),
            CommandKind::TimerFired { why, when, handle } => e.timer_fired(why, when, handle),
            CommandKind::Commit => e.commit_turn(),
            CommandKind::Juggle => e.juggle_tray(),
            CommandKind::Flip => e.flip(),
            CommandKind::ToggleTray => {
                if e.tray_vis_state() == TrayVisState::Revealed {
                    e.hide_tray()
                } else {
                    e.show_tray()
                }
            }
            CommandKind::Trade => e.begin_trade(),
            CommandKind::CancelTrade => e.end_trade(),
            CommandKind::UndoCur => e.replace_tiles() || e.redo_replaced_tiles(),
            CommandKind::UndoLast => {
                e.handle_undo();
                true
            }
            CommandKind::Hint => {
                e.reset_hint_engine();
                self.follow(CommandKind::NextHint);
                false
            }
            CommandKind::NextHint => self.hint(false),
            CommandKind::PrevHint => self.hint(true),
            CommandKind::Zoom(by) => {
                let out = e.zoom(by);
                self.observe_zoom(out)
            }
            CommandKind::ToggleZoom => self.toggle_zoom(),
            CommandKind::Values => e.toggle_show_values(),
            CommandKind::CountsValues { title } => {
                let text = e.format_dict_counts(DICT_COUNT_COLUMNS);
                self.host.notify(HostEvent::Dialog { title, text });
                false
            }
            CommandKind::Remaining { title } => {
                let text = e.format_remaining_tiles();
                self.host.notify(HostEvent::Dialog { title, text });
                false
            }
            CommandKind::Resend { force, show } => {
                e.resend_all(force, show);
                false
            }
            CommandKind::History { title } => {
                let over = e.game_is_over();
                let text = e.write_game_history(over);
                self.host.notify(HostEvent::Dialog { title, text });
                false
            }
            CommandKind::Final => {
                if e.game_is_over() {
                    self.follow(CommandKind::PostOver { auto: false });
                } else {
                    self.host.notify(HostEvent::QueryEndGame);
                }
                false
            }
            CommandKind::EndGame => {
                e.end_game();
                true
            }
            CommandKind::PostOver { auto } => {
                self.post_over(auto);
                false
            }
            CommandKind::SendChat(text) => {
                e.send_chat(&text);
                false
            }
        };
        Ok(draw)
    }

    /// Append a follow-on command behind whatever is already queued.
    fn follow(&self, kind: CommandKind) {
        trace!(tag = ?kind.tag(), "follow_on");
        self.shared.queue.push(Command::new(kind, Origin::Interactive));
    }

    /// Draw, refresh the snapshot, notify the host.
    fn redraw(&mut self) {
        let engine = &mut self.engine;
        let complete = self.writer.draw(|fb| engine.draw(fb));
        if !complete {
            debug!("draw not complete");
        }
        let engine = &self.engine;
        self.shared.snapshot.refresh(|s| engine.fill_state(s));
        self.host.on_frame_ready();
    }

    /// Position scoreboard, board and tray, then re-probe zoom limits.
    fn layout(&mut self, dims: &BoardDims) -> bool {
        let gi = self.engine.game_info();
        let conn = engine::apply_layout(&mut self.engine, &gi, dims);
        self.host.notify(HostEvent::ConnStatusRect(conn));
        match (u32::try_from(dims.width), u32::try_from(dims.height)) {
            (Ok(width), Ok(height)) => {
                self.writer.ensure_size(width, height);
            }
            _ => warn!(
                width = dims.width,
                height = dims.height,
                "layout with negative surface size; framebuffer left unchanged"
            ),
        }

        self.zoom.reset();
        *self.shared.zoom.lock() = self.zoom;
        self.follow(CommandKind::Zoom(0));
        true
    }

    /// Start communications; clients also open their connection to the host.
    fn start(&mut self) -> bool {
        self.engine.comms_start();
        if self.engine.game_info().role == DeviceRole::Client {
            self.engine.init_client_connection();
        }
        self.engine.server_do()
    }

    /// One hint step; a suspended search re-queues itself instead of drawing.
    fn hint(&mut self, prev: bool) -> bool {
        let out = self.engine.request_hint(false, prev);
        if out.work_remains {
            self.follow(if prev {
                CommandKind::PrevHint
            } else {
                CommandKind::NextHint
            });
            return false;
        }
        out.draw
    }

    /// Zoom fully out when possible, otherwise in.
    fn toggle_zoom(&mut self) -> bool {
        let probe = self.engine.zoom(0);
        let by = if probe.can_out {
            -TOGGLE_ZOOM_STEP
        } else if probe.can_in {
            TOGGLE_ZOOM_STEP
        } else {
            0
        };
        let out = self.engine.zoom(by);
        self.observe_zoom(out)
    }

    /// Feed zoom limits into the hysteresis and publish the result.
    fn observe_zoom(&mut self, out: ZoomOutcome) -> bool {
        if self.zoom.observe(out.can_in, out.can_out) {
            debug!(direction = ?self.zoom.direction, "zoom_direction_flipped");
        }
        *self.shared.zoom.lock() = self.zoom;
        out.draw
    }

    /// Report final scores if the game is over.
    fn post_over(&mut self, auto: bool) {
        if !self.engine.game_is_over() {
            return;
        }
        let title = if auto {
            GameOverTitle::Summary
        } else {
            GameOverTitle::FinalScores
        };
        let text = self.engine.write_final_scores();
        self.host.notify(HostEvent::GameOver { title, text });
    }

    /// One save gate pass.
    fn save(&mut self) -> Result<SaveOutcome> {
        let dict = self.shared.save_dict.lock().clone();
        self.save_gate
            .check(&mut self.engine, self.store.as_mut(), dict.as_deref())
    }
}

/// Producer-side handle to a running dispatcher.
///
/// Dropping a handle that was never stopped stops the worker without saving.
pub struct DispatcherHandle<E> {
    /// State shared with the worker.
    shared: Arc<Shared>,
    /// Worker thread; `None` once stopped.
    worker: Option<JoinHandle<Result<StopReport<E>>>>,
    /// Signalled when the worker exits.
    done: Receiver<()>,
    /// Bound on `request_stop`.
    stop_timeout: Duration,
}

impl<E> DispatcherHandle<E> {
    /// Queue an interactive command.
    pub fn enqueue(&self, kind: CommandKind) -> Result<()> {
        self.enqueue_with(kind, Origin::Interactive)
    }

    /// Queue a background command.
    pub fn enqueue_background(&self, kind: CommandKind) -> Result<()> {
        self.enqueue_with(kind, Origin::Background)
    }

    /// Queue a command with an explicit origin. Never blocks on the worker.
    pub fn enqueue_with(&self, kind: CommandKind, origin: Origin) -> Result<()> {
        let control = self.shared.control.lock();
        if control.stop_requested || control.exited {
            debug!(tag = ?kind.tag(), "enqueue after stop; dropped");
            return Err(Error::Stopped);
        }
        self.shared.queue.push(Command::new(kind, origin));
        Ok(())
    }

    /// Latest state snapshot.
    pub fn snapshot(&self) -> GameStateInfo {
        self.shared.snapshot.get()
    }

    /// Latest zoom state.
    pub fn zoom(&self) -> ZoomHysteresis {
        *self.shared.zoom.lock()
    }

    /// True while any interactive command is still queued.
    pub fn busy(&self) -> bool {
        self.shared.queue.has_interactive()
    }

    /// Number of queued commands.
    pub fn queued(&self) -> usize {
        self.shared.queue.len()
    }

    /// True when nothing is queued and the worker is not running a handler.
    /// Follow-ons a handler appends are queued before it counts as done.
    pub fn idle(&self) -> bool {
        self.shared.queue.is_idle()
    }

    /// Save subsequent games with a different dictionary name.
    pub fn set_save_dict(&self, name: impl Into<String>) {
        *self.shared.save_dict.lock() = Some(name.into());
    }

    /// Cancel the worker without a final save.
    pub fn interrupt(&self) {
        self.shared.queue.interrupt();
    }

    /// Stop the worker and wait for it, bounded by the configured timeout.
    ///
    /// Commands queued behind the stop are handled per the configured
    /// [`StopPolicy`]. With `should_save`, exactly one save pass runs after
    /// the last executed command. On timeout the worker is abandoned and
    /// [`Error::StopTimeout`] returned.
    pub fn request_stop(&mut self, should_save: bool) -> Result<StopReport<E>> {
        let Some(worker) = self.worker.take() else {
            return Err(Error::Stopped);
        };
        {
            let mut control = self.shared.control.lock();
            control.stop_requested = true;
            control.save_on_stop = should_save;
        }
        // wake a worker blocked on an empty queue
        self.shared
            .queue
            .push(Command::new(CommandKind::None, Origin::Background));

        match self.done.recv_timeout(self.stop_timeout) {
            Ok(()) | Err(RecvTimeoutError::Disconnected) => {}
            Err(RecvTimeoutError::Timeout) => {
                warn!(timeout = ?self.stop_timeout, "dispatcher did not stop; abandoning worker");
                return Err(Error::StopTimeout(self.stop_timeout));
            }
        }
        worker.join().map_err(|_| Error::WorkerPanicked)?
    }
}

impl<E> Drop for DispatcherHandle<E> {
    fn drop(&mut self) {
        if self.worker.is_some()
            && let Err(e) = self.request_stop(false)
        {
            warn!(error = %e, "dispatcher stop on drop failed");
        }
    }
}
