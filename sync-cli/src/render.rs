//! Plain-text rendering for the terminal.

use std::fmt::Write;

use boardsync_core::{
    BoardState, ChannelEvent, Color, DisplayClock, Roster, SessionEvent, Square,
};
use boardsync_types::{GameEnd, MoveHistoryEntry, UserId};

/// ASCII board, rank 8 on top unless `flipped`.
pub fn board(board: &BoardState, flipped: bool) -> String {
    let rows: Vec<u8> = if flipped {
        (0..8).collect()
    } else {
        (0..8).rev().collect()
    };
    let cols: Vec<u8> = if flipped {
        (0..8).rev().collect()
    } else {
        (0..8).collect()
    };

    let mut out = String::new();
    for &row in &rows {
        let _ = write!(out, "{} ", row + 1);
        for &col in &cols {
            let cell = Square::new(row, col)
                .and_then(|sq| board.piece_at(sq))
                .map(|p| p.letter())
                .unwrap_or('.');
            out.push(' ');
            out.push(cell);
        }
        out.push('\n');
    }
    out.push_str("  ");
    for &col in &cols {
        out.push(' ');
        out.push(char::from(b'a' + col));
    }
    out.push('\n');
    out
}

/// Position summary printed under the board.
pub fn summary(board: &BoardState) -> String {
    let castling = board.castling();
    let mut rights: String = [
        (castling.white_king_side, 'K'),
        (castling.white_queen_side, 'Q'),
        (castling.black_king_side, 'k'),
        (castling.black_queen_side, 'q'),
    ]
    .iter()
    .filter(|(allowed, _)| *allowed)
    .map(|(_, c)| *c)
    .collect();
    if rights.is_empty() {
        rights.push('-');
    }
    let en_passant = board
        .en_passant()
        .map(|sq| sq.to_string())
        .unwrap_or_else(|| "-".to_string());

    format!(
        "to move: {}  castling: {}  en passant: {}\nfen: {}\n",
        board.active_color(),
        rights,
        en_passant,
        board.fen()
    )
}

/// Both clocks, with player names when the roster is known. The opponent
/// of `me` is labelled.
pub fn clocks(clock: &DisplayClock, roster: Option<&Roster>, me: Option<UserId>) -> String {
    let opponent = roster
        .zip(me)
        .and_then(|(r, me)| r.opponent_of(me))
        .map(|p| p.color);
    [Color::White, Color::Black]
        .iter()
        .map(|&color| {
            let mut name = roster
                .map(|r| r.player(color).username.clone())
                .unwrap_or_else(|| color.to_string());
            if opponent == Some(color) {
                name.push_str(" (opponent)");
            }
            format!("{:<5} {:<28} {}", color.to_string(), name, clock.format(color))
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Index of the half-move shown at `cursor`, counted from the first move.
///
/// The history tip is the last listed move. Counting back from it keeps the
/// two aligned after a resync, when history is shorter than the move list.
/// `None` means the cursor is on a position before any listed move.
pub fn current_half_move(
    entries: &[MoveHistoryEntry],
    history_len: usize,
    cursor: usize,
) -> Option<usize> {
    let played: usize = entries
        .iter()
        .map(|e| 1 + usize::from(e.black.is_some()))
        .sum();
    let behind = history_len.saturating_sub(1).saturating_sub(cursor);
    played.checked_sub(behind)?.checked_sub(1)
}

/// Move list, one line per full move, the `current` half-move in brackets.
pub fn moves(entries: &[MoveHistoryEntry], current: Option<usize>) -> String {
    if entries.is_empty() {
        return "no moves yet\n".to_string();
    }
    let mark = |text: &str, half: usize| {
        if current == Some(half) {
            format!("[{}]", text)
        } else {
            format!(" {} ", text)
        }
    };

    let mut out = String::new();
    let mut half = 0;
    for entry in entries {
        let white = mark(&entry.white, half);
        half += 1;
        let black = match &entry.black {
            Some(text) => {
                let black = mark(text, half);
                half += 1;
                black
            }
            None => String::new(),
        };
        let line = format!("{:>3}. {:<10} {}", entry.move_number, white, black);
        out.push_str(line.trim_end());
        out.push('\n');
    }
    out
}

fn verdict(end: &GameEnd) -> String {
    match end.winner() {
        Some(color) => format!("{} wins", color),
        None if end.is_draw() => "draw".to_string(),
        None => "no result".to_string(),
    }
}

/// One-line description of an event.
pub fn event(event: &SessionEvent) -> String {
    match event {
        SessionEvent::Channel(channel) => match channel {
            ChannelEvent::Connected => "connected, joining room".to_string(),
            ChannelEvent::ConnectionFailed { error } => format!("connection failed: {}", error),
            ChannelEvent::Disconnected { reason } => format!("disconnected: {}", reason),
            ChannelEvent::Reconnecting { attempt, delay } => format!(
                "reconnecting in {:.1}s (attempt {})",
                delay.as_secs_f64(),
                attempt
            ),
            ChannelEvent::ReconnectFailed { attempt, error } => {
                format!("reconnect attempt {} failed: {}", attempt, error)
            }
            ChannelEvent::GaveUp { attempts } => {
                format!("gave up after {} reconnect attempts", attempts)
            }
        },
        SessionEvent::StateSynced { resync: false } => "game state received".to_string(),
        SessionEvent::StateSynced { resync: true } => "game state resynchronized".to_string(),
        SessionEvent::BoardUpdated { ply } => format!("board updated (ply {})", ply),
        SessionEvent::GameEnded(end) => format!(
            "game over: {} by {} ({})",
            end.result,
            end.reason,
            verdict(end)
        ),
        SessionEvent::Notice { message } => format!("server: {}", message),
        SessionEvent::DrawOffered(offer) => format!(
            "draw offered by user {} (type 'accept' or 'decline')",
            offer.player_id
        ),
        SessionEvent::DrawDeclined { .. } => "draw offer declined".to_string(),
        SessionEvent::ProtocolError { reason } => format!("ignored bad message: {}", reason),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use boardsync_core::{ClockState, SessionPlayer};
    use std::time::Duration;

    #[test]
    fn renders_starting_position() {
        let text = board(&BoardState::starting_position(), false);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "8  r n b q k b n r");
        assert_eq!(lines[6], "2  P P P P P P P P");
        assert_eq!(lines[7], "1  R N B Q K B N R");
        assert_eq!(lines[8], "   a b c d e f g h");
    }

    #[test]
    fn flipped_board_puts_rank_one_on_top() {
        let text = board(&BoardState::starting_position(), true);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "1  R N B K Q B N R");
        assert_eq!(lines[8], "   h g f e d c b a");
    }

    #[test]
    fn summary_lists_rights_and_en_passant() {
        let state = BoardState::from_fen(
            "rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b Kq e3 0 1",
        )
        .unwrap();
        let text = summary(&state);
        assert!(text.contains("to move: black"));
        assert!(text.contains("castling: Kq"));
        assert!(text.contains("en passant: e3"));
    }

    #[test]
    fn clocks_without_roster_use_colors() {
        let display = ClockState::from_seconds(65.0, 300.0)
            .interpolate(Color::White, Duration::ZERO);
        let text = clocks(&display, None, None);
        assert!(text.contains("01:05"));
        assert!(text.contains("05:00"));
        assert!(!text.contains("opponent"));
    }

    #[test]
    fn clocks_label_the_opponent() {
        let roster = Roster::new(
            SessionPlayer {
                user_id: UserId::new(1),
                username: "alice".into(),
                color: Color::White,
                rating: None,
                online: true,
            },
            SessionPlayer {
                user_id: UserId::new(2),
                username: "bob".into(),
                color: Color::Black,
                rating: None,
                online: true,
            },
        )
        .unwrap();
        let display = ClockState::from_seconds(60.0, 60.0).interpolate(Color::White, Duration::ZERO);

        let text = clocks(&display, Some(&roster), Some(UserId::new(1)));
        let lines: Vec<&str> = text.lines().collect();
        assert!(lines[0].contains("alice") && !lines[0].contains("opponent"));
        assert!(lines[1].contains("bob (opponent)"));
    }

    fn entry(number: u32, white: &str, black: Option<&str>) -> MoveHistoryEntry {
        MoveHistoryEntry {
            move_number: number,
            white: white.into(),
            black: black.map(Into::into),
        }
    }

    #[test]
    fn move_list_marks_current_half_move() {
        let entries = [entry(1, "e4", Some("e5")), entry(2, "Nf3", None)];
        let text = moves(&entries, Some(1));
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("  1."));
        assert!(lines[0].contains("[e5]"));
        assert!(!lines[0].contains("[e4]"));
        assert_eq!(lines[1], "  2.  Nf3");
        assert_eq!(moves(&[], None), "no moves yet\n");
    }

    #[test]
    fn current_half_move_counts_back_from_tip() {
        let entries = [entry(1, "e4", Some("e5")), entry(2, "Nf3", None)];
        // Following: tip is the last listed move.
        assert_eq!(current_half_move(&entries, 4, 3), Some(2));
        // One back.
        assert_eq!(current_half_move(&entries, 4, 2), Some(1));
        // Start position.
        assert_eq!(current_half_move(&entries, 4, 0), None);
        // After a resync history holds only the tip.
        assert_eq!(current_half_move(&entries, 1, 0), Some(2));
    }

    #[test]
    fn game_end_names_the_winner() {
        let end = GameEnd {
            result: "0-1".into(),
            reason: "resignation".into(),
        };
        assert_eq!(
            event(&SessionEvent::GameEnded(end)),
            "game over: 0-1 by resignation (black wins)"
        );
        let drawn = GameEnd {
            result: "1/2-1/2".into(),
            reason: "agreement".into(),
        };
        assert!(event(&SessionEvent::GameEnded(drawn)).ends_with("(draw)"));
    }

    #[test]
    fn gave_up_event_mentions_attempts() {
        let text = event(&SessionEvent::Channel(ChannelEvent::GaveUp { attempts: 5 }));
        assert_eq!(text, "gave up after 5 reconnect attempts");
    }
}
