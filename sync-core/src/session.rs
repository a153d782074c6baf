//! Game state synchronizer.
//!
//! Holds the local view of one game and applies authoritative pushes to it.
//! The lifecycle only moves forward:
//!
//! ```text
//! Connecting -> AwaitingInitialState -> Live -> Ended
//! ```
//!
//! `gameEnd` may also arrive straight from `AwaitingInitialState`. A
//! `gameState` received while already `Live` is a resync after a reconnect:
//! the board and replay history are rebuilt from it, the roster is kept and
//! only its connectivity flags are refreshed.
//!
//! The synchronizer never performs I/O; the session client feeds it decoded
//! messages and tells it when a join handshake has gone out.

use boardsync_types::{GameEnd, GameStateMessage, GameUpdateMessage, MoveHistoryEntry, WireClocks};
use thiserror::Error;
use tracing::{debug, info};

use crate::board::BoardState;
use crate::clock::ClockState;
use crate::codec::{self, CodecError};
use crate::history::ReplayHistory;
use crate::roster::Roster;

/// Where the session is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SessionLifecycle {
    /// Channel not yet joined to the room.
    Connecting,
    /// Join sent, waiting for the first full snapshot.
    AwaitingInitialState,
    /// Receiving updates.
    Live,
    /// Terminal result recorded. Nothing changes after this.
    Ended,
}

impl std::fmt::Display for SessionLifecycle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Connecting => "connecting",
            Self::AwaitingInitialState => "awaiting initial state",
            Self::Live => "live",
            Self::Ended => "ended",
        };
        f.write_str(name)
    }
}

/// Reasons a push was not applied.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SyncError {
    /// The board payload could not be decoded.
    #[error("malformed board state: {0}")]
    MalformedState(#[from] CodecError),

    /// The roster does not seat one white and one black player.
    #[error("roster must seat one white and one black player")]
    InvalidRoster,

    /// The session has ended.
    #[error("session has ended")]
    SessionEnded,

    /// The message is not valid in the current lifecycle state.
    #[error("not ready: session is {lifecycle}")]
    NotReady {
        /// Lifecycle state at the time.
        lifecycle: SessionLifecycle,
    },

    /// A rejoin is in flight; updates wait for the resync snapshot.
    #[error("resync pending, update dropped")]
    ResyncPending,

    /// The push is older than one already applied.
    #[error("stale update: seq {seq} <= last applied {last}")]
    Stale {
        /// Sequence number of the dropped push.
        seq: u64,
        /// Last applied sequence number.
        last: u64,
    },
}

/// Local view of one game.
#[derive(Debug, Clone)]
pub struct Synchronizer {
    lifecycle: SessionLifecycle,
    live: Option<BoardState>,
    roster: Option<Roster>,
    clocks: Option<ClockState>,
    moves: Vec<MoveHistoryEntry>,
    history: Option<ReplayHistory>,
    outcome: Option<GameEnd>,
    last_seq: Option<u64>,
    resync_pending: bool,
}

impl Synchronizer {
    /// A fresh session in `Connecting`.
    pub fn new() -> Self {
        Self {
            lifecycle: SessionLifecycle::Connecting,
            live: None,
            roster: None,
            clocks: None,
            moves: Vec::new(),
            history: None,
            outcome: None,
            last_seq: None,
            resync_pending: false,
        }
    }

    /// Record that a join handshake went out on a ready channel.
    ///
    /// The first join moves the session to `AwaitingInitialState`. A rejoin
    /// from `Live` holds further updates until the resync snapshot arrives.
    pub fn on_join_sent(&mut self) {
        match self.lifecycle {
            SessionLifecycle::Connecting => {
                info!("join sent, awaiting initial state");
                self.lifecycle = SessionLifecycle::AwaitingInitialState;
            }
            SessionLifecycle::Live => {
                info!("rejoin sent, awaiting resync");
                self.resync_pending = true;
            }
            SessionLifecycle::AwaitingInitialState | SessionLifecycle::Ended => {}
        }
    }

    /// Apply a full snapshot.
    ///
    /// Replaces the live board and resets replay history to that single
    /// snapshot. The roster is set on the first snapshot; later snapshots
    /// only refresh connectivity.
    pub fn apply_initial(&mut self, msg: &GameStateMessage) -> Result<(), SyncError> {
        match self.lifecycle {
            SessionLifecycle::Ended => return Err(SyncError::SessionEnded),
            SessionLifecycle::Connecting => {
                return Err(SyncError::NotReady {
                    lifecycle: self.lifecycle,
                })
            }
            SessionLifecycle::AwaitingInitialState | SessionLifecycle::Live => {}
        }

        let roster = Roster::from_wire(&msg.player1, &msg.player2).ok_or(SyncError::InvalidRoster)?;
        let board = codec::decode(&msg.game_state)?;

        match self.roster.as_mut() {
            Some(existing) => existing.refresh_connectivity(&[&msg.player1, &msg.player2]),
            None => self.roster = Some(roster),
        }

        self.history = Some(ReplayHistory::new(board.clone()));
        self.live = Some(board);
        self.ingest_clocks(&msg.clocks);
        self.last_seq = msg.seq;

        if self.lifecycle == SessionLifecycle::Live {
            info!("resynced from full snapshot");
        } else {
            info!("initial state applied, session live");
            self.lifecycle = SessionLifecycle::Live;
        }
        self.resync_pending = false;
        Ok(())
    }

    /// Apply an incremental snapshot. Returns the history index of the new
    /// snapshot.
    pub fn apply_update(&mut self, msg: &GameUpdateMessage) -> Result<usize, SyncError> {
        match self.lifecycle {
            SessionLifecycle::Ended => return Err(SyncError::SessionEnded),
            SessionLifecycle::Live => {}
            lifecycle => return Err(SyncError::NotReady { lifecycle }),
        }
        if self.resync_pending {
            return Err(SyncError::ResyncPending);
        }
        if let (Some(seq), Some(last)) = (msg.seq, self.last_seq) {
            if seq <= last {
                return Err(SyncError::Stale { seq, last });
            }
        }

        let board = codec::decode(&msg.game_state)?;

        let Some(history) = self.history.as_mut() else {
            // Live always has a history; treat its absence as not ready.
            return Err(SyncError::NotReady {
                lifecycle: self.lifecycle,
            });
        };
        history.record_live(board.clone());
        let index = history.len() - 1;

        self.live = Some(board);
        if let Some(moves) = &msg.move_history {
            self.moves = moves.clone();
        }
        self.ingest_clocks(&msg.clocks);
        if msg.seq.is_some() {
            self.last_seq = msg.seq;
        }
        debug!(index, "update applied");
        Ok(index)
    }

    /// Record the terminal result. The board is left as it is.
    pub fn apply_end(&mut self, end: &GameEnd) -> Result<(), SyncError> {
        match self.lifecycle {
            SessionLifecycle::Ended => Err(SyncError::SessionEnded),
            SessionLifecycle::Connecting => Err(SyncError::NotReady {
                lifecycle: self.lifecycle,
            }),
            SessionLifecycle::AwaitingInitialState | SessionLifecycle::Live => {
                info!(result = %end.result, reason = %end.reason, "game ended");
                self.lifecycle = SessionLifecycle::Ended;
                self.outcome = Some(end.clone());
                self.resync_pending = false;
                Ok(())
            }
        }
    }

    fn ingest_clocks(&mut self, clocks: &WireClocks) {
        if let Some((white, black)) = clocks.both() {
            self.clocks = Some(ClockState::from_seconds(white, black));
        }
    }

    /// Current lifecycle state.
    pub fn lifecycle(&self) -> SessionLifecycle {
        self.lifecycle
    }

    /// The latest authoritative board.
    pub fn board(&self) -> Option<&BoardState> {
        self.live.as_ref()
    }

    /// The seated players.
    pub fn roster(&self) -> Option<&Roster> {
        self.roster.as_ref()
    }

    /// The latest authoritative clocks.
    pub fn clocks(&self) -> Option<&ClockState> {
        self.clocks.as_ref()
    }

    /// The move list as last sent by the authority.
    pub fn moves(&self) -> &[MoveHistoryEntry] {
        &self.moves
    }

    /// Replay history, once the first snapshot has arrived.
    pub fn history(&self) -> Option<&ReplayHistory> {
        self.history.as_ref()
    }

    /// Replay history for cursor navigation.
    pub fn history_mut(&mut self) -> Option<&mut ReplayHistory> {
        self.history.as_mut()
    }

    /// The terminal result, once ended.
    pub fn outcome(&self) -> Option<&GameEnd> {
        self.outcome.as_ref()
    }

    /// Whether updates are being held for a resync.
    pub fn is_resync_pending(&self) -> bool {
        self.resync_pending
    }
}

impl Default for Synchronizer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::{Color, PieceKind};
    use crate::codec::encode;
    use boardsync_types::{UserId, WirePlayer};
    use serde_json::{json, Value};

    fn player(id: u64, color: Color, online: bool) -> WirePlayer {
        WirePlayer {
            user_id: UserId::new(id),
            username: format!("user{}", id),
            color,
            rating: None,
            is_online: online,
        }
    }

    fn wire(fen: &str) -> Value {
        encode(&BoardState::from_fen(fen).unwrap())
    }

    const E4: &str = "rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq e3 0 1";
    const E5: &str = "rnbqkbnr/pppp1ppp/8/4p3/4P3/8/PPPP1PPP/RNBQKBNR w KQkq e6 0 2";

    fn initial() -> GameStateMessage {
        GameStateMessage {
            room_id: None,
            game_state: wire(crate::fen::STARTING_FEN),
            player1: player(1, Color::White, true),
            player2: player(2, Color::Black, true),
            clocks: WireClocks {
                white_time_left: Some(300.0),
                black_time_left: Some(300.0),
            },
            seq: None,
        }
    }

    fn update(fen: &str) -> GameUpdateMessage {
        GameUpdateMessage {
            room_id: None,
            game_state: wire(fen),
            clocks: WireClocks::default(),
            move_history: None,
            seq: None,
        }
    }

    fn live() -> Synchronizer {
        let mut sync = Synchronizer::new();
        sync.on_join_sent();
        sync.apply_initial(&initial()).unwrap();
        sync
    }

    #[test]
    fn lifecycle_moves_forward() {
        let mut sync = Synchronizer::new();
        assert_eq!(sync.lifecycle(), SessionLifecycle::Connecting);

        sync.on_join_sent();
        assert_eq!(sync.lifecycle(), SessionLifecycle::AwaitingInitialState);

        sync.apply_initial(&initial()).unwrap();
        assert_eq!(sync.lifecycle(), SessionLifecycle::Live);
        assert_eq!(sync.history().unwrap().len(), 1);
        assert_eq!(sync.history().unwrap().cursor(), 0);
        assert_eq!(sync.roster().unwrap().player(Color::Black).user_id, UserId::new(2));
    }

    #[test]
    fn initial_clocks_are_milliseconds() {
        let sync = live();
        assert_eq!(sync.clocks().unwrap().remaining_ms(Color::White), 300_000);
    }

    #[test]
    fn update_before_initial_is_not_ready() {
        let mut sync = Synchronizer::new();
        sync.on_join_sent();
        assert_eq!(
            sync.apply_update(&update(E4)),
            Err(SyncError::NotReady {
                lifecycle: SessionLifecycle::AwaitingInitialState
            })
        );
        assert!(sync.board().is_none());
    }

    #[test]
    fn initial_before_join_is_not_ready() {
        let mut sync = Synchronizer::new();
        assert!(matches!(
            sync.apply_initial(&initial()),
            Err(SyncError::NotReady { .. })
        ));
    }

    #[test]
    fn n_updates_make_n_plus_one_snapshots() {
        let mut sync = live();
        for _ in 0..4 {
            sync.apply_update(&update(E4)).unwrap();
        }
        let history = sync.history().unwrap();
        assert_eq!(history.len(), 5);
        assert_eq!(history.cursor(), 4);
    }

    #[test]
    fn consecutive_updates_keep_cursor_at_tip() {
        let mut sync = live();

        assert_eq!(sync.apply_update(&update(E4)).unwrap(), 1);
        assert_eq!(sync.history().unwrap().cursor(), 1);

        assert_eq!(sync.apply_update(&update(E5)).unwrap(), 2);
        assert_eq!(sync.history().unwrap().cursor(), 2);
        assert_eq!(sync.board().unwrap().fen(), E5);
    }

    #[test]
    fn update_replaces_move_list_and_clocks() {
        let mut sync = live();
        let mut msg = update(E4);
        msg.move_history = Some(vec![MoveHistoryEntry {
            move_number: 1,
            white: "e4".into(),
            black: None,
        }]);
        msg.clocks = WireClocks {
            white_time_left: Some(298.0),
            black_time_left: Some(300.0),
        };
        sync.apply_update(&msg).unwrap();

        assert_eq!(sync.moves().len(), 1);
        assert_eq!(sync.clocks().unwrap().remaining_ms(Color::White), 298_000);

        // Absent move list leaves the old one in place.
        sync.apply_update(&update(E5)).unwrap();
        assert_eq!(sync.moves().len(), 1);
    }

    #[test]
    fn game_end_keeps_board() {
        let mut sync = live();
        sync.apply_update(&update(E4)).unwrap();
        let before = sync.board().cloned();

        let end = GameEnd {
            result: "1-0".into(),
            reason: "resignation".into(),
        };
        sync.apply_end(&end).unwrap();

        assert_eq!(sync.lifecycle(), SessionLifecycle::Ended);
        assert_eq!(sync.board().cloned(), before);
        assert_eq!(sync.outcome(), Some(&end));
    }

    #[test]
    fn ended_rejects_everything() {
        let mut sync = live();
        let end = GameEnd {
            result: "0-1".into(),
            reason: "timeout".into(),
        };
        sync.apply_end(&end).unwrap();

        assert_eq!(sync.apply_update(&update(E4)), Err(SyncError::SessionEnded));
        assert_eq!(sync.apply_initial(&initial()), Err(SyncError::SessionEnded));
        assert_eq!(sync.apply_end(&end), Err(SyncError::SessionEnded));
        assert_eq!(sync.history().unwrap().len(), 1);
    }

    #[test]
    fn end_allowed_before_initial_state() {
        let mut sync = Synchronizer::new();
        sync.on_join_sent();
        sync.apply_end(&GameEnd {
            result: "1/2-1/2".into(),
            reason: "abandoned".into(),
        })
        .unwrap();
        assert_eq!(sync.lifecycle(), SessionLifecycle::Ended);
        assert!(sync.board().is_none());
    }

    #[test]
    fn history_navigation_does_not_touch_live_board() {
        let mut sync = live();
        sync.apply_update(&update(E4)).unwrap();
        sync.apply_update(&update(E5)).unwrap();

        let history = sync.history_mut().unwrap();
        history.start();
        assert_eq!(history.current().mask(Color::White, PieceKind::Pawn), 0xFF00);
        assert_eq!(sync.board().unwrap().fen(), E5);
    }

    #[test]
    fn resync_rebuilds_history_and_keeps_roster() {
        let mut sync = live();
        sync.apply_update(&update(E4)).unwrap();
        sync.apply_update(&update(E5)).unwrap();

        sync.on_join_sent();
        assert!(sync.is_resync_pending());
        assert_eq!(sync.apply_update(&update(E4)), Err(SyncError::ResyncPending));

        let mut resync = initial();
        resync.game_state = wire(E5);
        resync.player1 = player(1, Color::White, false);
        resync.player2.username = "renamed".into();
        sync.apply_initial(&resync).unwrap();

        assert_eq!(sync.lifecycle(), SessionLifecycle::Live);
        assert!(!sync.is_resync_pending());
        assert_eq!(sync.history().unwrap().len(), 1);
        assert_eq!(sync.board().unwrap().fen(), E5);

        let roster = sync.roster().unwrap();
        assert!(!roster.player(Color::White).online);
        assert_eq!(roster.player(Color::Black).username, "user2");
    }

    #[test]
    fn invalid_roster_is_rejected() {
        let mut sync = Synchronizer::new();
        sync.on_join_sent();
        let mut msg = initial();
        msg.player2 = player(2, Color::White, true);

        assert_eq!(sync.apply_initial(&msg), Err(SyncError::InvalidRoster));
        assert_eq!(sync.lifecycle(), SessionLifecycle::AwaitingInitialState);
    }

    #[test]
    fn malformed_board_is_rejected() {
        let mut sync = live();
        let mut msg = update(E4);
        msg.game_state = json!("not a board");

        assert!(matches!(
            sync.apply_update(&msg),
            Err(SyncError::MalformedState(_))
        ));
        assert_eq!(sync.history().unwrap().len(), 1);
    }

    #[test]
    fn stale_sequence_numbers_are_dropped() {
        let mut sync = Synchronizer::new();
        sync.on_join_sent();
        let mut msg = initial();
        msg.seq = Some(10);
        sync.apply_initial(&msg).unwrap();

        let mut stale = update(E4);
        stale.seq = Some(10);
        assert_eq!(
            sync.apply_update(&stale),
            Err(SyncError::Stale { seq: 10, last: 10 })
        );

        let mut fresh = update(E4);
        fresh.seq = Some(11);
        sync.apply_update(&fresh).unwrap();

        // Unnumbered updates are always applied.
        sync.apply_update(&update(E5)).unwrap();
        assert_eq!(sync.history().unwrap().len(), 3);
    }
}
