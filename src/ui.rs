//! Text rendering of boards and match status.

use std::fmt::Write;

use crate::board::{Board, CellState};
use crate::session::MatchSession;

/// `A1`-style label for a cell.
pub fn coord_to_string(row: usize, col: usize) -> String {
    format!("{}{}", column_label(col), row + 1)
}

fn column_label(col: usize) -> char {
    u8::try_from(col)
        .ok()
        .and_then(|c| c.checked_add(b'A'))
        .map(char::from)
        .unwrap_or('?')
}

/// Draw `board` in a box. Vessels are shown only when `reveal` is set.
pub fn render_board(board: &Board, reveal: bool) -> String {
    let n = board.size();
    let inner = 3 + 2 * n;
    let mut out = String::new();
    let _ = writeln!(out, "    ╔{}╗", "═".repeat(inner));
    out.push_str("    ║  ");
    for c in 0..n {
        let _ = write!(out, " {}", column_label(c));
    }
    out.push_str(" ║\n");
    let _ = writeln!(out, "    ╠{}╣", "═".repeat(inner));
    for (r, row) in board.rows().iter().enumerate() {
        let _ = write!(out, "    ║ {:2}", r + 1);
        for &value in row {
            let ch = match CellState::from(value) {
                CellState::Hit(_) => 'X',
                CellState::Miss => 'o',
                CellState::Vessel(_) if reveal => 'S',
                _ => '.',
            };
            let _ = write!(out, " {}", ch);
        }
        out.push_str(" ║\n");
    }
    let _ = writeln!(out, "    ╚{}╝", "═".repeat(inner));
    if reveal {
        out.push_str("    Legend: S=Ship  X=Hit  o=Miss  .=Water\n");
    } else {
        out.push_str("    Legend: X=Hit  o=Miss  .=Unknown\n");
    }
    out
}

/// Both boards, the vessels still to place and the status line.
pub fn render_session(session: &MatchSession) -> String {
    let mut out = String::new();
    if let Some(id) = session.match_id() {
        let _ = writeln!(out, "Match {} ({})", id, session.phase());
    }
    out.push_str("\n  Your fleet:\n");
    out.push_str(&render_board(session.player_board(), true));
    out.push_str("\n  Opponent:\n");
    out.push_str(&render_board(session.opponent_board(), false));

    let available = session.available_vessels();
    if !available.is_empty() {
        out.push_str("\n  To place:");
        for vessel in available {
            let _ = write!(out, " {}(len {})", vessel.vessel_type, vessel.size);
        }
        out.push('\n');
    }
    if let Some(selected) = session.selected_vessel() {
        let _ = writeln!(
            out,
            "  Selected: {} ({})",
            selected.vessel_type,
            if selected.orientation.is_vertical() { "vertical" } else { "horizontal" }
        );
    }
    let _ = writeln!(out, "\n  {}", session.status());
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vessel::Orientation;

    #[test]
    fn labels_cells() {
        assert_eq!(coord_to_string(0, 0), "A1");
        assert_eq!(coord_to_string(9, 9), "J10");
    }

    #[test]
    fn hides_vessels_unless_revealed() {
        let mut board = Board::empty(3);
        board.place(0, 0, 2, Orientation::Horizontal, 5);
        board.mark_hit(0, 1);
        board.mark_miss(2, 2);

        let hidden = render_board(&board, false);
        assert!(!hidden.contains('S'));
        assert!(hidden.contains(" 1 . X ."));
        assert!(hidden.contains(" 3 . . o"));

        let shown = render_board(&board, true);
        assert!(shown.contains(" 1 S X ."));
        assert!(shown.contains("S=Ship"));
    }
}
