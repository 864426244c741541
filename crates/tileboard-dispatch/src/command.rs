//! Commands: one serialized request against the engine plus its origin.
//!
//! Each [`CommandKind`] variant carries exactly the payload its handler needs,
//! so argument shapes are checked at compile time. [`Tag`] is the fieldless
//! mirror used where only the kind matters (coalescing, logging, tests).

use serde::{Deserialize, Serialize};

/// Whether a command counts toward the "busy with user work" query.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Origin {
    /// Issued on behalf of the user; visible to [`busy`](crate::DispatcherHandle::busy).
    Interactive,
    /// Issued by timers, transports or other background producers.
    Background,
}

/// Pixel rectangle in board coordinates.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rect {
    /// Left edge.
    pub left: i32,
    /// Top edge.
    pub top: i32,
    /// Width in pixels.
    pub width: i32,
    /// Height in pixels.
    pub height: i32,
}

impl Rect {
    /// Construct a rectangle from origin and size.
    pub const fn new(left: i32, top: i32, width: i32, height: i32) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }
}

/// Board geometry computed by the layout collaborator for a given surface size.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardDims {
    /// Surface width.
    pub width: i32,
    /// Surface height.
    pub height: i32,
    /// Current cell size.
    pub cell_size: i32,
    /// Largest cell size the board may zoom to.
    pub max_cell_size: i32,
    /// Height of the scoreboard strip.
    pub score_ht: i32,
    /// Width reserved for the game timer, when enabled.
    pub timer_width: i32,
    /// Height of the board area.
    pub board_ht: i32,
    /// Top edge of the tray.
    pub tray_top: i32,
    /// Height of the tray.
    pub tray_ht: i32,
    /// Pixels the tray may overlap the board.
    pub tray_steal: i32,
    /// Inset applied to tiles drawn in the tray.
    pub tile_inset: i32,
}

/// Transport address of the peer a message arrived from.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CommsAddr {
    /// Relay server room.
    Relay {
        /// Relay host name.
        host: String,
        /// Relay port.
        port: u16,
        /// Room the game lives in.
        room: String,
    },
    /// Bluetooth peer.
    Bluetooth {
        /// Device name.
        name: String,
        /// Hardware address.
        addr: String,
    },
    /// SMS peer.
    Sms {
        /// Phone number.
        phone: String,
        /// Application port.
        port: u16,
    },
}

/// Display preferences the engine needs to know about.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommonPrefs {
    /// Draw the entry arrow on the board.
    pub show_board_arrow: bool,
    /// Show robot scores while the robot plays.
    pub show_robot_scores: bool,
    /// Hide tile face values.
    pub hide_tile_values: bool,
    /// Skip the commit confirmation step.
    pub skip_commit_confirm: bool,
    /// Sort newly drawn tiles into the tray.
    pub sort_new_tiles: bool,
    /// Allow peeking at remote trays.
    pub allow_peek: bool,
    /// Hide crosshairs when dragging.
    pub hide_crosshairs: bool,
    /// Palette, one ARGB entry per color slot.
    pub colors: Vec<u32>,
}

/// Navigation keys forwarded to the engine.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Key {
    /// Cursor up.
    CursorUp,
    /// Cursor down.
    CursorDown,
    /// Cursor left.
    CursorLeft,
    /// Cursor right.
    CursorRight,
    /// Alternate up (jump).
    AltUp,
    /// Alternate down (jump).
    AltDown,
    /// Alternate left (jump).
    AltLeft,
    /// Alternate right (jump).
    AltRight,
    /// Raise the focused tile.
    Raise,
    /// Commit or select.
    Return,
    /// Toggle the entry arrow direction.
    Space,
    /// Take back the last placed tile.
    Backspace,
    /// Move focus to the next region.
    Tab,
    /// A letter typed onto the board.
    Char(char),
}

/// The requested operation together with its arguments.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum CommandKind {
    /// No-op; used as the shutdown sentinel.
    None,
    /// Redraw whatever the engine has invalidated.
    Draw,
    /// Invalidate the whole board, then redraw.
    InvalAll,
    /// Apply new board geometry.
    Layout(BoardDims),
    /// Start communications and let the server advance.
    Start,
    /// Drop back to client role and reconnect.
    SwitchClient,
    /// Reset communications, then start.
    Reset,
    /// Run the save gate.
    Save,
    /// Let the engine advance its internal server state.
    Do,
    /// An incoming message from a peer.
    Receive {
        /// Raw message bytes.
        msg: Vec<u8>,
        /// Sender address.
        addr: CommsAddr,
    },
    /// The transport reported a delivery failure.
    TransportFailed,
    /// Preferences changed.
    PrefsChange(CommonPrefs),
    /// Pointer pressed.
    PenDown {
        /// X coordinate.
        x: i32,
        /// Y coordinate.
        y: i32,
    },
    /// Pointer moved.
    PenMove {
        /// X coordinate.
        x: i32,
        /// Y coordinate.
        y: i32,
        /// Event time in milliseconds.
        ms: i32,
        /// True while a drag is in progress.
        drag: bool,
    },
    /// Pointer released.
    PenUp {
        /// X coordinate.
        x: i32,
        /// Y coordinate.
        y: i32,
        /// Event time in milliseconds.
        ms: i32,
    },
    /// Key pressed.
    KeyDown(Key),
    /// Key released.
    KeyUp(Key),
    /// An engine timer fired.
    TimerFired {
        /// Timer purpose as understood by the engine.
        why: i32,
        /// Scheduled fire time.
        when: i32,
        /// Engine-side timer handle.
        handle: i32,
    },
    /// Commit the current turn.
    Commit,
    /// Shuffle the tray.
    Juggle,
    /// Flip the board.
    Flip,
    /// Show or hide the tray.
    ToggleTray,
    /// Enter trade mode.
    Trade,
    /// Leave trade mode.
    CancelTrade,
    /// Return placed tiles to the tray, or put them back.
    UndoCur,
    /// Undo the last committed move.
    UndoLast,
    /// Reset the hint engine and ask for the first hint.
    Hint,
    /// Zoom by the given number of steps (0 probes limits).
    Zoom(i32),
    /// Zoom fully out if possible, otherwise in.
    ToggleZoom,
    /// Previous hint.
    PrevHint,
    /// Next hint.
    NextHint,
    /// Toggle tile value display.
    Values,
    /// Show dictionary counts and tile values.
    CountsValues {
        /// Dialog title identifier.
        title: u32,
    },
    /// Show remaining tiles.
    Remaining {
        /// Dialog title identifier.
        title: u32,
    },
    /// Resend unacknowledged messages.
    Resend {
        /// Resend even if recently sent.
        force: bool,
        /// Report the number of messages resent.
        show: bool,
    },
    /// Show the game history.
    History {
        /// Dialog title identifier.
        title: u32,
    },
    /// Final scores, or ask whether to end the game.
    Final,
    /// End the game now.
    EndGame,
    /// Report final scores if the game is over.
    PostOver {
        /// True when the report is triggered automatically at game end.
        auto: bool,
    },
    /// Send a chat message to peers.
    SendChat(String),
}

/// Fieldless view of [`CommandKind`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[allow(missing_docs)]
pub enum Tag {
    None,
    Draw,
    InvalAll,
    Layout,
    Start,
    SwitchClient,
    Reset,
    Save,
    Do,
    Receive,
    TransportFailed,
    PrefsChange,
    PenDown,
    PenMove,
    PenUp,
    KeyDown,
    KeyUp,
    TimerFired,
    Commit,
    Juggle,
    Flip,
    ToggleTray,
    Trade,
    CancelTrade,
    UndoCur,
    UndoLast,
    Hint,
    Zoom,
    ToggleZoom,
    PrevHint,
    NextHint,
    Values,
    CountsValues,
    Remaining,
    Resend,
    History,
    Final,
    EndGame,
    PostOver,
    SendChat,
}

impl Tag {
    /// Kinds where only the latest queued instance matters.
    ///
    /// A command of one of these kinds is dropped when the next queued command
    /// has the same tag. Anything not listed here must always execute.
    pub const fn is_coalescible(self) -> bool {
        matches!(
            self,
            Self::Draw | Self::Save | Self::Do | Self::PenMove | Self::PrevHint | Self::NextHint
        )
    }
}

impl CommandKind {
    /// The fieldless tag for this kind.
    pub const fn tag(&self) -> Tag {
        match self {
            Self::None => Tag::None,
            Self::Draw => Tag::Draw,
            Self::InvalAll => Tag::InvalAll,
            Self::Layout(_) => Tag::Layout,
            Self::Start => Tag::Start,
            Self::SwitchClient => Tag::SwitchClient,
            Self::Reset => Tag::Reset,
            Self::Save => Tag::Save,
            Self::Do => Tag::Do,
            Self::Receive { .. } => Tag::Receive,
            Self::TransportFailed => Tag::TransportFailed,
            Self::PrefsChange(_) => Tag::PrefsChange,
            Self::PenDown { .. } => Tag::PenDown,
            Self::PenMove { .. } => Tag::PenMove,
            Self::PenUp { .. } => Tag::PenUp,
            Self::KeyDown(_) => Tag::KeyDown,
            Self::KeyUp(_) => Tag::KeyUp,
            Self::TimerFired { .. } => Tag::TimerFired,
            Self::Commit => Tag::Commit,
            Self::Juggle => Tag::Juggle,
            Self::Flip => Tag::Flip,
            Self::ToggleTray => Tag::ToggleTray,
            Self::Trade => Tag::Trade,
            Self::CancelTrade => Tag::CancelTrade,
            Self::UndoCur => Tag::UndoCur,
            Self::UndoLast => Tag::UndoLast,
            Self::Hint => Tag::Hint,
            Self::Zoom(_) => Tag::Zoom,
            Self::ToggleZoom => Tag::ToggleZoom,
            Self::PrevHint => Tag::PrevHint,
            Self::NextHint => Tag::NextHint,
            Self::Values => Tag::Values,
            Self::CountsValues { .. } => Tag::CountsValues,
            Self::Remaining { .. } => Tag::Remaining,
            Self::Resend { .. } => Tag::Resend,
            Self::History { .. } => Tag::History,
            Self::Final => Tag::Final,
            Self::EndGame => Tag::EndGame,
            Self::PostOver { .. } => Tag::PostOver,
            Self::SendChat(_) => Tag::SendChat,
        }
    }
}

/// One queued request.
#[derive(Clone, Debug, PartialEq)]
pub struct Command {
    /// What to do, with arguments.
    pub kind: CommandKind,
    /// Who asked.
    pub origin: Origin,
}

impl Command {
    /// Build a command with an explicit origin.
    pub const fn new(kind: CommandKind, origin: Origin) -> Self {
        Self { kind, origin }
    }

    /// Build an interactive command.
    pub const fn interactive(kind: CommandKind) -> Self {
        Self::new(kind, Origin::Interactive)
    }

    /// Build a background command.
    pub const fn background(kind: CommandKind) -> Self {
        Self::new(kind, Origin::Background)
    }

    /// Shorthand for `self.kind.tag()`.
    pub const fn tag(&self) -> Tag {
        self.kind.tag()
    }

    /// True when this command came from an interactive producer.
    pub fn is_interactive(&self) -> bool {
        self.origin == Origin::Interactive
    }
}
