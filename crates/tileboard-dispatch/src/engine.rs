//! Collaborator seams: the game engine, the persistence store, and the host surface.
//!
//! The dispatcher never implements game rules. It drives a [`GameEngine`]
//! from its single worker thread, persists through a [`Store`], and reports
//! to the UI through a [`Host`].

use crossbeam_channel::Sender;
use tracing::trace;

use crate::{
    command::{BoardDims, CommonPrefs, CommsAddr, Key, Rect},
    draw::Framebuffer,
    error::PersistError,
    snapshot::{GameStateInfo, TrayVisState},
};

/// Role this device plays in a networked game.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DeviceRole {
    /// All players are local.
    #[default]
    Standalone,
    /// This device hosts the game.
    Host,
    /// This device joins a remote host.
    Client,
}

/// Game configuration the dispatcher needs beyond the engine calls themselves.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct GameInfo {
    /// Network role.
    pub role: DeviceRole,
    /// Whether the game runs a turn timer (it takes space in the scoreboard).
    pub timer_enabled: bool,
    /// Dictionary the game is saved with.
    pub dict_name: String,
}

/// Summary written alongside the saved game for list views.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct GameSummary {
    /// Moves played so far.
    pub n_moves: u32,
    /// Index of the player whose turn it is, if the game is running.
    pub turn: Option<usize>,
    /// Player names.
    pub players: Vec<String>,
    /// Player scores, same order as `players`.
    pub scores: Vec<i32>,
    /// Players still expected to join.
    pub missing_players: u32,
    /// The game has ended.
    pub game_over: bool,
    /// Dictionary in use.
    pub dict_name: String,
}

/// Result of one hint request.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct HintOutcome {
    /// The board changed.
    pub draw: bool,
    /// The search was suspended and should be resumed with another request.
    pub work_remains: bool,
}

/// Result of one zoom request.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ZoomOutcome {
    /// The board changed.
    pub draw: bool,
    /// Zooming in is still possible.
    pub can_in: bool,
    /// Zooming out is still possible.
    pub can_out: bool,
}

/// The non-reentrant game engine.
///
/// Only the dispatcher thread calls these methods. Methods returning `bool`
/// report whether something visible changed.
#[allow(missing_docs)]
pub trait GameEngine: Send {
    fn game_info(&self) -> GameInfo;

    fn commit_turn(&mut self) -> bool;
    fn server_do(&mut self) -> bool;
    fn inval_all(&mut self);

    fn set_timer_loc(&mut self, rect: Rect);
    fn set_scoreboard_loc(&mut self, rect: Rect, divide_horizontally: bool);
    fn set_pos(&mut self, rect: Rect, max_cell_size: i32, left_handed: bool);
    fn set_tray_loc(
        &mut self,
        rect: Rect,
        min_divider_width: i32,
        tray_steal: i32,
        tile_inset: i32,
    );

    fn comms_start(&mut self);
    fn comms_reset_same(&mut self);
    fn init_client_connection(&mut self);
    fn server_reset(&mut self);
    fn receive_message(&mut self, msg: &[u8], addr: &CommsAddr) -> bool;
    fn transport_failed(&mut self);
    fn resend_all(&mut self, force: bool, show: bool);
    fn prefs_changed(&mut self, prefs: &CommonPrefs) -> bool;

    fn pen_down(&mut self, x: i32, y: i32) -> bool;
    fn pen_move(&mut self, x: i32, y: i32, ms: i32, drag: bool) -> bool;
    fn pen_up(&mut self, x: i32, y: i32, ms: i32) -> bool;
    fn key_down(&mut self, key: Key) -> bool;
    fn key_up(&mut self, key: Key) -> bool;
    fn timer_fired(&mut self, why: i32, when: i32, handle: i32) -> bool;

    fn juggle_tray(&mut self) -> bool;
    fn flip(&mut self) -> bool;
    fn tray_vis_state(&self) -> TrayVisState;
    fn show_tray(&mut self) -> bool;
    fn hide_tray(&mut self) -> bool;
    fn begin_trade(&mut self) -> bool;
    fn end_trade(&mut self) -> bool;
    fn replace_tiles(&mut self) -> bool;
    fn redo_replaced_tiles(&mut self) -> bool;
    fn handle_undo(&mut self);
    fn toggle_show_values(&mut self) -> bool;

    fn reset_hint_engine(&mut self);
    fn request_hint(&mut self, use_tile_limits: bool, prev: bool) -> HintOutcome;
    fn zoom(&mut self, by: i32) -> ZoomOutcome;

    fn format_dict_counts(&mut self, columns: u32) -> String;
    fn format_remaining_tiles(&mut self) -> String;
    fn write_game_history(&mut self, game_over: bool) -> String;
    fn write_final_scores(&mut self) -> String;
    fn game_is_over(&self) -> bool;
    fn end_game(&mut self);
    fn send_chat(&mut self, text: &str);

    /// Render invalidated regions into `fb`. Returns false if drawing was incomplete.
    fn draw(&mut self, fb: &mut Framebuffer) -> bool;
    /// Fill the UI state record.
    fn fill_state(&self, state: &mut GameStateInfo);

    /// Byte-exact serialization of the current game.
    fn save_to_stream(&mut self, gi: &GameInfo) -> Vec<u8>;
    fn summarize(&self, gi: &GameInfo) -> GameSummary;
    /// Told after the serialization returned by `save_to_stream` was persisted.
    fn save_succeeded(&mut self);
}

/// Persistence collaborator.
pub trait Store: Send {
    /// Persist a serialized game and its summary.
    fn persist(&mut self, state: &[u8], summary: &GameSummary) -> Result<(), PersistError>;
}

/// Title used for the game-over report.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GameOverTitle {
    /// Shown automatically when the game ends.
    Summary,
    /// Shown when the user asks for final scores.
    FinalScores,
}

/// Notifications from the dispatcher thread to the host surface.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HostEvent {
    /// New pixels and a new state snapshot are ready.
    FrameReady,
    /// Show an informational dialog.
    Dialog {
        /// Title identifier supplied with the command.
        title: u32,
        /// Body text.
        text: String,
    },
    /// Ask the user whether to end the game.
    QueryEndGame,
    /// Present final scores.
    GameOver {
        /// Which title to show.
        title: GameOverTitle,
        /// Body text.
        text: String,
    },
    /// Where to draw the connection status indicator.
    ConnStatusRect(Rect),
}

/// Host surface callback.
///
/// Called on the dispatcher thread; implementations hand the event over to
/// their own thread rather than doing UI work inline.
pub trait Host: Send {
    /// Deliver one event.
    fn notify(&self, event: HostEvent);

    /// New pixels are ready to present.
    fn on_frame_ready(&self) {
        self.notify(HostEvent::FrameReady);
    }
}

impl Host for Sender<HostEvent> {
    fn notify(&self, event: HostEvent) {
        if self.send(event).is_err() {
            trace!("host receiver gone; dropping event");
        }
    }
}

/// Compute and apply a layout, returning the connection status rect for the host.
///
/// The scoreboard takes the full width minus one cell for the connection
/// indicator, and minus the timer when enabled.
pub fn apply_layout<E: GameEngine + ?Sized>(
    engine: &mut E,
    gi: &GameInfo,
    dims: &BoardDims,
) -> Rect {
    let mut score_width = dims.width - dims.cell_size;
    let conn = Rect::new(score_width, 0, dims.cell_size, dims.score_ht);

    if gi.timer_enabled {
        score_width -= dims.timer_width;
        engine.set_timer_loc(Rect::new(score_width, 0, dims.timer_width, dims.score_ht));
    }
    engine.set_scoreboard_loc(Rect::new(0, 0, score_width, dims.score_ht), true);
    engine.set_pos(
        Rect::new(0, dims.score_ht, dims.width, dims.board_ht),
        dims.max_cell_size,
        false,
    );
    // no tray divider
    engine.set_tray_loc(
        Rect::new(0, dims.tray_top, dims.width, dims.tray_ht),
        0,
        dims.tray_steal,
        dims.tile_inset,
    );
    engine.inval_all();
    conn
}
