//! Replay history: every authoritative snapshot of a session, in arrival
//! order, plus a viewer cursor.
//!
//! The sequence is never empty and never shrinks; the cursor always points
//! at an existing snapshot. Navigation is read-only with respect to the live
//! game: it neither changes the live board nor produces messages.
//!
//! The viewer is *following* while the cursor sits on the tip. Snapshots
//! recorded with [`ReplayHistory::record_live`] carry a following viewer
//! along to the new tip; a viewer who has navigated away stays put until
//! they navigate back onto the tip.

use crate::board::BoardState;

/// Append-only snapshot sequence with a cursor.
#[derive(Debug, Clone)]
pub struct ReplayHistory {
    snapshots: Vec<BoardState>,
    cursor: usize,
    following: bool,
}

impl ReplayHistory {
    /// A history holding only `initial`, cursor on it.
    pub fn new(initial: BoardState) -> Self {
        Self {
            snapshots: vec![initial],
            cursor: 0,
            following: true,
        }
    }

    /// Number of snapshots (at least 1).
    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    /// Always false; present for API symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Current cursor position.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// The snapshot under the cursor.
    pub fn current(&self) -> &BoardState {
        &self.snapshots[self.cursor]
    }

    /// The newest snapshot.
    pub fn tip(&self) -> &BoardState {
        &self.snapshots[self.snapshots.len() - 1]
    }

    /// Snapshot at an index, if any.
    pub fn get(&self, index: usize) -> Option<&BoardState> {
        self.snapshots.get(index)
    }

    /// Whether new live snapshots will move the cursor.
    pub fn is_following(&self) -> bool {
        self.following
    }

    /// Move to the first snapshot.
    pub fn start(&mut self) -> usize {
        self.seek(0)
    }

    /// Step back one snapshot, stopping at the first.
    pub fn previous(&mut self) -> usize {
        self.seek(self.cursor.saturating_sub(1))
    }

    /// Step forward one snapshot, stopping at the tip.
    #[allow(clippy::should_implement_trait)]
    pub fn next(&mut self) -> usize {
        self.seek(self.cursor + 1)
    }

    /// Move to the tip and resume following.
    pub fn end(&mut self) -> usize {
        self.seek(self.last_index())
    }

    /// Push a snapshot without moving the cursor.
    pub fn append(&mut self, state: BoardState) {
        self.snapshots.push(state);
        if self.cursor != self.last_index() {
            self.following = false;
        }
    }

    /// Push a live snapshot; a following viewer moves to it.
    pub fn record_live(&mut self, state: BoardState) -> usize {
        let follow = self.following;
        self.snapshots.push(state);
        if follow {
            self.cursor = self.last_index();
        }
        self.cursor
    }

    fn seek(&mut self, target: usize) -> usize {
        self.cursor = target.min(self.last_index());
        self.following = self.cursor == self.last_index();
        self.cursor
    }

    fn last_index(&self) -> usize {
        self.snapshots.len() - 1
    }
}
