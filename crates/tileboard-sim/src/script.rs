//! Command scripts: RON files or the built-in demo burst.

use std::{fs, path::Path};

use tileboard_dispatch::{BoardDims, CommandKind, CommsAddr, Origin};

use crate::error::{Error, Result};

/// Pen moves in the demo drag.
const DEMO_DRAG_STEPS: i32 = 24;

/// Load a script from a RON file.
pub fn load(path: &Path) -> Result<Vec<CommandKind>> {
    let text = fs::read_to_string(path).map_err(|e| Error::Script {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    ron::from_str(&text).map_err(|e| Error::Script {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

/// Origin a replayed command is enqueued with. Peer traffic arrives from the
/// transport, everything else from the player.
pub fn origin_of(kind: &CommandKind) -> Origin {
    match kind {
        CommandKind::Receive { .. } | CommandKind::TransportFailed | CommandKind::Do => {
            Origin::Background
        }
        _ => Origin::Interactive,
    }
}

/// Surface geometry used by the demo.
pub fn demo_dims() -> BoardDims {
    BoardDims {
        width: 320,
        height: 480,
        cell_size: 20,
        max_cell_size: 40,
        score_ht: 24,
        timer_width: 40,
        board_ht: 300,
        tray_top: 330,
        tray_ht: 60,
        tray_steal: 10,
        tile_inset: 2,
    }
}

/// Layout, a pen drag storm, a peer move, a hint search and a save.
pub fn demo() -> Vec<CommandKind> {
    let mut cmds = vec![
        CommandKind::Layout(demo_dims()),
        CommandKind::Start,
        CommandKind::PenDown { x: 40, y: 350 },
    ];
    cmds.extend((1..=DEMO_DRAG_STEPS).map(|i| CommandKind::PenMove {
        x: 40 + i * 2,
        y: 350 - i * 4,
        ms: i * 16,
        drag: true,
    }));
    cmds.extend([
        CommandKind::PenUp {
            x: 40 + DEMO_DRAG_STEPS * 2,
            y: 350 - DEMO_DRAG_STEPS * 4,
            ms: DEMO_DRAG_STEPS * 16 + 8,
        },
        CommandKind::Draw,
        CommandKind::Draw,
        CommandKind::Commit,
        CommandKind::Receive {
            msg: vec![1, 0, 4, 2],
            addr: CommsAddr::Relay {
                host: "relay.example.org".to_string(),
                port: 10997,
                room: "kitchen".to_string(),
            },
        },
        CommandKind::Hint,
        CommandKind::Zoom(1),
        CommandKind::Zoom(1),
        CommandKind::ToggleZoom,
        CommandKind::Save,
    ]);
    cmds
}

#[cfg(test)]
mod tests {
    use std::{env, path::PathBuf};

    use super::*;

    #[test]
    fn bundled_script_parses() {
        let path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("scripts/opening.ron");
        let cmds = load(&path).unwrap();
        assert_eq!(cmds.first(), Some(&CommandKind::Layout(demo_dims())));
        assert_eq!(cmds.last(), Some(&CommandKind::Save));
        assert!(cmds.iter().any(|c| matches!(c, CommandKind::Receive { .. })));
    }

    #[test]
    fn malformed_script_names_file() {
        let dir = env::temp_dir().join("tileboard-sim-script-test");
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join("broken.ron");
        fs::write(&path, "[Layout(, Draw]").unwrap();
        match load(&path).unwrap_err() {
            Error::Script { path: p, .. } => assert_eq!(p, path),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn demo_contains_a_drag_storm() {
        let moves = demo()
            .iter()
            .filter(|c| matches!(c, CommandKind::PenMove { .. }))
            .count();
        assert_eq!(moves, DEMO_DRAG_STEPS as usize);
    }

    #[test]
    fn peer_traffic_is_background() {
        assert_eq!(origin_of(&CommandKind::Do), Origin::Background);
        assert_eq!(origin_of(&CommandKind::Flip), Origin::Interactive);
    }
}
