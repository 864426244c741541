//! Point-in-time summary of engine state used to enable UI affordances.

use parking_lot::Mutex;

/// Visibility of the local player's tray.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TrayVisState {
    /// Tray is hidden.
    #[default]
    Hidden,
    /// Tray is shown face down.
    Reversed,
    /// Tray is shown face up.
    Revealed,
}

/// Flags the engine reports about the current game.
///
/// Handed out by value; a copy never changes after it is returned.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct GameStateInfo {
    /// Number of tiles visible in the tray.
    pub vis_tile_count: u32,
    /// Tray visibility.
    pub tray_vis_state: TrayVisState,
    /// A hint can be requested.
    pub can_hint: bool,
    /// Placed tiles can go back to the tray.
    pub can_undo: bool,
    /// Tiles taken back can be replaced.
    pub can_redo: bool,
    /// Trade mode is active.
    pub in_trade: bool,
    /// At least one tile is selected for trading.
    pub trade_tiles_selected: bool,
    /// All peers are connected.
    pub game_is_connected: bool,
    /// The tray can be shuffled.
    pub can_shuffle: bool,
    /// It is the local player's turn.
    pub cur_turn_selected: bool,
}

/// Shared slot holding the latest snapshot.
#[derive(Default)]
pub struct SnapshotCell {
    /// Latest filled record.
    inner: Mutex<GameStateInfo>,
}

impl SnapshotCell {
    /// Refill the record in place under the lock.
    pub fn refresh(&self, fill: impl FnOnce(&mut GameStateInfo)) {
        let mut g = self.inner.lock();
        fill(&mut g);
    }

    /// Clone the latest record.
    pub fn get(&self) -> GameStateInfo {
        self.inner.lock().clone()
    }
}
