//! The two players of a session.

use boardsync_types::{UserId, WirePlayer};

use crate::board::Color;

/// One seated player.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionPlayer {
    /// User identifier.
    pub user_id: UserId,
    /// Display name.
    pub username: String,
    /// Assigned color.
    pub color: Color,
    /// Rating, if known.
    pub rating: Option<u32>,
    /// Whether the player currently has a live connection.
    pub online: bool,
}

impl From<&WirePlayer> for SessionPlayer {
    fn from(wire: &WirePlayer) -> Self {
        Self {
            user_id: wire.user_id,
            username: wire.username.clone(),
            color: wire.color,
            rating: wire.rating,
            online: wire.is_online,
        }
    }
}

/// Exactly two players with disjoint colors, white first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Roster {
    players: [SessionPlayer; 2],
}

impl Roster {
    /// Seat two players. Returns `None` unless one is white and the other
    /// black.
    pub fn new(a: SessionPlayer, b: SessionPlayer) -> Option<Self> {
        match (a.color, b.color) {
            (Color::White, Color::Black) => Some(Self { players: [a, b] }),
            (Color::Black, Color::White) => Some(Self { players: [b, a] }),
            _ => None,
        }
    }

    /// Seat the players of an authority push.
    pub fn from_wire(player1: &WirePlayer, player2: &WirePlayer) -> Option<Self> {
        Self::new(player1.into(), player2.into())
    }

    /// The player holding a color.
    pub fn player(&self, color: Color) -> &SessionPlayer {
        match color {
            Color::White => &self.players[0],
            Color::Black => &self.players[1],
        }
    }

    /// Look up a player by user id.
    pub fn by_user(&self, user_id: UserId) -> Option<&SessionPlayer> {
        self.players.iter().find(|p| p.user_id == user_id)
    }

    /// The other player, from the point of view of `user_id`.
    pub fn opponent_of(&self, user_id: UserId) -> Option<&SessionPlayer> {
        let me = self.by_user(user_id)?;
        Some(self.player(me.color.opposite()))
    }

    /// Refresh connectivity flags from a later push, matching by user id.
    /// Identity, names and colors are left alone.
    pub fn refresh_connectivity(&mut self, updates: &[&WirePlayer]) {
        for update in updates {
            if let Some(player) = self.players.iter_mut().find(|p| p.user_id == update.user_id) {
                player.online = update.is_online;
            }
        }
    }

    /// Both players, white first.
    pub fn iter(&self) -> impl Iterator<Item = &SessionPlayer> {
        self.players.iter()
    }
}
