//! Test support: a scripted engine, an in-memory store and event helpers.
//! These helpers are public so integration tests and the simulator can share them.

use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::{Duration, Instant},
};

use crossbeam_channel::{self as chan, Receiver, RecvTimeoutError, Sender};
use parking_lot::{Mutex, MutexGuard};

use crate::{
    command::{CommonPrefs, CommsAddr, Key, Rect},
    draw::Framebuffer,
    engine::{GameEngine, GameInfo, GameSummary, HintOutcome, HostEvent, Store, ZoomOutcome},
    error::PersistError,
    snapshot::{GameStateInfo, TrayVisState},
};

/// Number of zoom steps between fully out and fully in.
pub const MAX_ZOOM: i32 = 4;
/// Color of the square drawn under the pen.
pub const PEN_COLOR: u32 = 0xffff_cc00;
/// Side of the square drawn under the pen.
pub const PEN_SIZE: i32 = 4;

/// Mutable state behind a [`ScriptedEngine`], shared with its [`EngineProbe`].
#[derive(Debug, Clone)]
pub struct EngineScript {
    /// Every engine call, in order, as `name` or `name args`.
    pub calls: Vec<String>,
    /// Game configuration reported by `game_info`.
    pub info: GameInfo,
    /// Bumped by every mutation that should show up in a save.
    pub revision: u32,
    /// What `receive_message` returns (and whether it mutates).
    pub receive_changes: bool,
    /// What `server_do` returns.
    pub server_do_draws: bool,
    /// Remaining hint requests that report suspended work.
    pub hint_work_remaining: u32,
    /// Current zoom step, `0..=MAX_ZOOM`.
    pub zoom_level: i32,
    /// Tiles placed but not committed.
    pub pending_tiles: u32,
    /// True once a layout has positioned the board.
    pub laid_out: bool,
    /// Reported tray state.
    pub tray: TrayVisState,
    /// Whether the game has ended.
    pub game_over: bool,
    /// In trade mode.
    pub in_trade: bool,
    /// Value `draw` returns.
    pub draw_complete: bool,
    /// Number of times `save_succeeded` was called.
    pub save_succeeded: u32,
    /// Color written by the next draw.
    pub paint: u32,
    /// Last pen position, drawn as a tile under the pen.
    pub pen: Option<(i32, i32)>,
}

impl Default for EngineScript {
    fn default() -> Self {
        Self {
            calls: Vec::new(),
            info: GameInfo {
                dict_name: "CollegeEng_2to8".to_string(),
                ..GameInfo::default()
            },
            revision: 0,
            receive_changes: true,
            server_do_draws: false,
            hint_work_remaining: 0,
            zoom_level: 0,
            pending_tiles: 0,
            laid_out: false,
            tray: TrayVisState::Revealed,
            game_over: false,
            in_trade: false,
            draw_complete: true,
            save_succeeded: 0,
            paint: 0xff00_0000,
            pen: None,
        }
    }
}

impl EngineScript {
    /// Serialization for the current revision and dictionary.
    pub fn serialize(&self, dict: &str) -> Vec<u8> {
        format!("rev={};dict={}", self.revision, dict).into_bytes()
    }

    /// Zoom limit flags for the current level.
    fn zoom_limits(&self) -> (bool, bool) {
        (self.zoom_level < MAX_ZOOM, self.zoom_level > 0)
    }
}

/// Handle used by tests to inspect and adjust a running [`ScriptedEngine`].
#[derive(Clone, Default)]
pub struct EngineProbe {
    /// Shared script.
    shared: Arc<Mutex<EngineScript>>,
}

impl EngineProbe {
    /// Run `f` on the script under its lock.
    pub fn with<R>(&self, f: impl FnOnce(&mut EngineScript) -> R) -> R {
        f(&mut self.shared.lock())
    }

    /// Copy of the call log.
    pub fn calls(&self) -> Vec<String> {
        self.shared.lock().calls.clone()
    }

    /// Call names only (arguments stripped).
    pub fn call_names(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .map(|c| c.split(' ').next().unwrap_or_default().to_string())
            .collect()
    }

    /// Number of calls with the given name.
    pub fn count(&self, name: &str) -> usize {
        self.call_names().iter().filter(|c| *c == name).count()
    }

    /// Serialization the engine would produce right now with its own dictionary.
    pub fn serialized(&self) -> Vec<u8> {
        let s = self.shared.lock();
        s.serialize(&s.info.dict_name)
    }
}

/// Blocks one named engine call until the test releases it.
#[derive(Debug)]
struct Gate {
    /// Call name to block on.
    on: &'static str,
    /// Signalled when the call is entered.
    entered: Sender<()>,
    /// Waited on before the call proceeds.
    release: Receiver<()>,
}

/// Test-side half of a gate.
pub struct GateHandle {
    /// Receives one message per gated call entered.
    entered: Receiver<()>,
    /// Sends one release per gated call.
    release: Sender<()>,
}

impl GateHandle {
    /// Wait until the gated call has been entered.
    pub fn wait_entered(&self, timeout: Duration) -> bool {
        self.entered.recv_timeout(timeout).is_ok()
    }

    /// Let one gated call proceed.
    pub fn release(&self) {
        let _ignored = self.release.send(());
    }
}

/// Deterministic in-memory engine that records every call.
#[derive(Debug)]
pub struct ScriptedEngine {
    /// Shared script.
    shared: Arc<Mutex<EngineScript>>,
    /// Optional blocking point.
    gate: Option<Gate>,
}

impl ScriptedEngine {
    /// Create an engine and its probe.
    pub fn new() -> (Self, EngineProbe) {
        Self::with_script(EngineScript::default())
    }

    /// Create an engine from an explicit script.
    pub fn with_script(script: EngineScript) -> (Self, EngineProbe) {
        let shared = Arc::new(Mutex::new(script));
        (
            Self {
                shared: shared.clone(),
                gate: None,
            },
            EngineProbe { shared },
        )
    }

    /// Block every call named `on` until released through the returned handle.
    pub fn gate_on(&mut self, on: &'static str) -> GateHandle {
        let (entered_tx, entered_rx) = chan::unbounded();
        let (release_tx, release_rx) = chan::unbounded();
        self.gate = Some(Gate {
            on,
            entered: entered_tx,
            release: release_rx,
        });
        GateHandle {
            entered: entered_rx,
            release: release_tx,
        }
    }

    /// Record a call and wait at the gate if it matches.
    fn record(&self, call: String) {
        let name = call.split(' ').next().unwrap_or_default().to_string();
        self.shared.lock().calls.push(call);
        if let Some(gate) = &self.gate
            && gate.on == name
        {
            let _ignored = gate.entered.send(());
            let _ignored = gate.release.recv();
        }
    }

    /// Lock the script.
    fn script(&self) -> MutexGuard<'_, EngineScript> {
        self.shared.lock()
    }
}

impl GameEngine for ScriptedEngine {
    fn game_info(&self) -> GameInfo {
        self.script().info.clone()
    }

    fn commit_turn(&mut self) -> bool {
        self.record("commit_turn".into());
        let mut s = self.script();
        if s.pending_tiles == 0 {
            return false;
        }
        s.pending_tiles = 0;
        s.revision += 1;
        true
    }

    fn server_do(&mut self) -> bool {
        self.record("server_do".into());
        self.script().server_do_draws
    }

    fn inval_all(&mut self) {
        self.record("inval_all".into());
    }

    fn set_timer_loc(&mut self, r: Rect) {
        self.record(format!("set_timer_loc {} {} {} {}", r.left, r.top, r.width, r.height));
    }

    fn set_scoreboard_loc(&mut self, r: Rect, divide_horizontally: bool) {
        self.record(format!(
            "set_scoreboard_loc {} {} {} {} {divide_horizontally}",
            r.left, r.top, r.width, r.height
        ));
    }

    fn set_pos(&mut self, r: Rect, max_cell_size: i32, left_handed: bool) {
        self.record(format!(
            "set_pos {} {} {} {} {max_cell_size} {left_handed}",
            r.left, r.top, r.width, r.height
        ));
        self.script().laid_out = true;
    }

    fn set_tray_loc(&mut self, r: Rect, min_divider_width: i32, tray_steal: i32, tile_inset: i32) {
        self.record(format!(
            "set_tray_loc {} {} {} {} {min_divider_width} {tray_steal} {tile_inset}",
            r.left, r.top, r.width, r.height
        ));
    }

    fn comms_start(&mut self) {
        self.record("comms_start".into());
    }

    fn comms_reset_same(&mut self) {
        self.record("comms_reset_same".into());
    }

    fn init_client_connection(&mut self) {
        self.record("init_client_connection".into());
    }

    fn server_reset(&mut self) {
        self.record("server_reset".into());
    }

    fn receive_message(&mut self, msg: &[u8], _addr: &CommsAddr) -> bool {
        self.record(format!("receive_message {}", msg.len()));
        let mut s = self.script();
        if s.receive_changes {
            s.revision += 1;
        }
        s.receive_changes
    }

    fn transport_failed(&mut self) {
        self.record("transport_failed".into());
    }

    fn resend_all(&mut self, force: bool, show: bool) {
        self.record(format!("resend_all {force} {show}"));
    }

    fn prefs_changed(&mut self, prefs: &CommonPrefs) -> bool {
        self.record(format!("prefs_changed {}", prefs.hide_tile_values));
        true
    }

    fn pen_down(&mut self, x: i32, y: i32) -> bool {
        self.record(format!("pen_down {x} {y}"));
        self.script().pen = Some((x, y));
        true
    }

    fn pen_move(&mut self, x: i32, y: i32, ms: i32, drag: bool) -> bool {
        self.record(format!("pen_move {x} {y} {ms} {drag}"));
        if drag {
            self.script().pen = Some((x, y));
        }
        drag
    }

    fn pen_up(&mut self, x: i32, y: i32, ms: i32) -> bool {
        self.record(format!("pen_up {x} {y} {ms}"));
        let mut s = self.script();
        s.pending_tiles += 1;
        s.pen = None;
        true
    }

    fn key_down(&mut self, key: Key) -> bool {
        self.record(format!("key_down {key:?}"));
        false
    }

    fn key_up(&mut self, key: Key) -> bool {
        self.record(format!("key_up {key:?}"));
        matches!(key, Key::Char(_))
    }

    fn timer_fired(&mut self, why: i32, when: i32, handle: i32) -> bool {
        self.record(format!("timer_fired {why} {when} {handle}"));
        true
    }

    fn juggle_tray(&mut self) -> bool {
        self.record("juggle_tray".into());
        true
    }

    fn flip(&mut self) -> bool {
        self.record("flip".into());
        true
    }

    fn tray_vis_state(&self) -> TrayVisState {
        self.script().tray
    }

    fn show_tray(&mut self) -> bool {
        self.record("show_tray".into());
        self.script().tray = TrayVisState::Revealed;
        true
    }

    fn hide_tray(&mut self) -> bool {
        self.record("hide_tray".into());
        self.script().tray = TrayVisState::Reversed;
        true
    }

    fn begin_trade(&mut self) -> bool {
        self.record("begin_trade".into());
        self.script().in_trade = true;
        true
    }

    fn end_trade(&mut self) -> bool {
        self.record("end_trade".into());
        self.script().in_trade = false;
        true
    }

    fn replace_tiles(&mut self) -> bool {
        self.record("replace_tiles".into());
        let mut s = self.script();
        let had = s.pending_tiles > 0;
        s.pending_tiles = 0;
        had
    }

    fn redo_replaced_tiles(&mut self) -> bool {
        self.record("redo_replaced_tiles".into());
        false
    }

    fn handle_undo(&mut self) {
        self.record("handle_undo".into());
        self.script().revision += 1;
    }

    fn toggle_show_values(&mut self) -> bool {
        self.record("toggle_show_values".into());
        true
    }

    fn reset_hint_engine(&mut self) {
        self.record("reset_hint_engine".into());
    }

    fn request_hint(&mut self, use_tile_limits: bool, prev: bool) -> HintOutcome {
        self.record(format!("request_hint {use_tile_limits} {prev}"));
        let mut s = self.script();
        if s.hint_work_remaining > 0 {
            s.hint_work_remaining -= 1;
            return HintOutcome {
                draw: true,
                work_remains: true,
            };
        }
        HintOutcome {
            draw: true,
            work_remains: false,
        }
    }

    fn zoom(&mut self, by: i32) -> ZoomOutcome {
        self.record(format!("zoom {by}"));
        let mut s = self.script();
        let before = s.zoom_level;
        s.zoom_level = (s.zoom_level + by).clamp(0, MAX_ZOOM);
        let (can_in, can_out) = s.zoom_limits();
        ZoomOutcome {
            draw: s.zoom_level != before,
            can_in,
            can_out,
        }
    }

    fn format_dict_counts(&mut self, columns: u32) -> String {
        self.record(format!("format_dict_counts {columns}"));
        "A: 9 x 1\nB: 2 x 3".to_string()
    }

    fn format_remaining_tiles(&mut self) -> String {
        self.record("format_remaining_tiles".into());
        "A A B".to_string()
    }

    fn write_game_history(&mut self, game_over: bool) -> String {
        self.record(format!("write_game_history {game_over}"));
        "1. you: 12".to_string()
    }

    fn write_final_scores(&mut self) -> String {
        self.record("write_final_scores".into());
        "you: 120\nrobot: 99".to_string()
    }

    fn game_is_over(&self) -> bool {
        self.script().game_over
    }

    fn end_game(&mut self) {
        self.record("end_game".into());
        let mut s = self.script();
        s.game_over = true;
        s.revision += 1;
    }

    fn send_chat(&mut self, text: &str) {
        self.record(format!("send_chat {text}"));
    }

    fn draw(&mut self, fb: &mut Framebuffer) -> bool {
        self.record("draw".into());
        let mut s = self.script();
        fb.clear(s.paint);
        if let Some((x, y)) = s.pen {
            fb.fill_rect(x, y, PEN_SIZE, PEN_SIZE, PEN_COLOR);
        }
        s.paint = s.paint.wrapping_add(1);
        s.draw_complete
    }

    fn fill_state(&self, state: &mut GameStateInfo) {
        let s = self.script();
        *state = GameStateInfo {
            vis_tile_count: if s.laid_out { 7 } else { 0 },
            tray_vis_state: s.tray,
            can_hint: s.laid_out && !s.game_over,
            can_undo: s.pending_tiles > 0,
            can_redo: false,
            in_trade: s.in_trade,
            trade_tiles_selected: false,
            game_is_connected: true,
            can_shuffle: s.tray == TrayVisState::Revealed,
            cur_turn_selected: !s.game_over,
        };
    }

    fn save_to_stream(&mut self, gi: &GameInfo) -> Vec<u8> {
        self.record("save_to_stream".into());
        self.script().serialize(&gi.dict_name)
    }

    fn summarize(&self, gi: &GameInfo) -> GameSummary {
        let s = self.script();
        GameSummary {
            n_moves: s.revision,
            turn: (!s.game_over).then_some(0),
            players: vec!["you".to_string(), "robot".to_string()],
            scores: vec![0, 0],
            missing_players: 0,
            game_over: s.game_over,
            dict_name: gi.dict_name.clone(),
        }
    }

    fn save_succeeded(&mut self) {
        self.record("save_succeeded".into());
        self.script().save_succeeded += 1;
    }
}

/// One persisted payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Persisted {
    /// Serialized game.
    pub state: Vec<u8>,
    /// Summary written with it.
    pub summary: GameSummary,
}

/// Store that keeps persisted payloads in memory. Clones share contents.
#[derive(Clone, Default)]
pub struct MemoryStore {
    /// Everything persisted so far.
    saved: Arc<Mutex<Vec<Persisted>>>,
    /// When set, `persist` fails.
    fail: Arc<AtomicBool>,
}

impl MemoryStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Payloads persisted so far.
    pub fn saved(&self) -> Vec<Persisted> {
        self.saved.lock().clone()
    }

    /// Number of persist calls that succeeded.
    pub fn save_count(&self) -> usize {
        self.saved.lock().len()
    }

    /// Make subsequent `persist` calls fail.
    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }
}

impl Store for MemoryStore {
    fn persist(&mut self, state: &[u8], summary: &GameSummary) -> Result<(), PersistError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(PersistError("disk full".to_string()));
        }
        self.saved.lock().push(Persisted {
            state: state.to_vec(),
            summary: summary.clone(),
        });
        Ok(())
    }
}

/// Receive host events until `pred` matches or `timeout` elapses.
pub fn recv_until<F>(rx: &Receiver<HostEvent>, timeout: Duration, mut pred: F) -> bool
where
    F: FnMut(&HostEvent) -> bool,
{
    let deadline = Instant::now() + timeout;
    loop {
        let left = deadline.saturating_duration_since(Instant::now());
        match rx.recv_timeout(left) {
            Ok(ev) if pred(&ev) => return true,
            Ok(_) => {}
            Err(RecvTimeoutError::Timeout | RecvTimeoutError::Disconnected) => return false,
        }
    }
}

/// Drain every event currently queued without waiting.
pub fn drain_events(rx: &Receiver<HostEvent>) -> Vec<HostEvent> {
    rx.try_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drag_paints_under_the_pen() {
        let (mut engine, probe) = ScriptedEngine::new();
        let mut fb = Framebuffer::new(16, 16);
        engine.pen_down(2, 3);
        engine.pen_move(8, 9, 16, true);
        engine.draw(&mut fb);
        assert_eq!(fb.pixels()[9 * 16 + 8], PEN_COLOR);
        assert_eq!(fb.pixels()[3 * 16 + 2], 0xff00_0000);

        engine.pen_up(8, 9, 32);
        engine.draw(&mut fb);
        assert_eq!(fb.pixels()[9 * 16 + 8], 0xff00_0001);
        assert_eq!(probe.with(|s| s.pen), None);
    }

    #[test]
    fn engine_debug_shows_script() {
        let (mut engine, _probe) = ScriptedEngine::new();
        let _gate = engine.gate_on("flip");
        let text = format!("{engine:?}");
        assert!(text.contains("ScriptedEngine"));
        assert!(text.contains("CollegeEng_2to8"));
    }
}
