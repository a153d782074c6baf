//! Identity types for boardsync sessions.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a game room, handed out by matchmaking once paired.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomId(String);

impl RoomId {
    /// Create a room id from its textual form.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The textual form of this room id.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RoomId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Numeric user identifier issued by the identity service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(u64);

impl UserId {
    /// Create a user id.
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// The numeric value.
    pub const fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of a draw offer.
///
/// The authority may send it as a string or as an integer; the original
/// representation is preserved so the echo in `drawAccept`/`drawDecline`
/// matches byte for byte.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OfferId(OfferRepr);

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
enum OfferRepr {
    Number(u64),
    Text(String),
}

impl OfferId {
    /// An offer id carried as text.
    pub fn text(id: impl Into<String>) -> Self {
        Self(OfferRepr::Text(id.into()))
    }

    /// An offer id carried as an integer.
    pub const fn number(id: u64) -> Self {
        Self(OfferRepr::Number(id))
    }
}

impl fmt::Display for OfferId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0 {
            OfferRepr::Number(n) => write!(f, "{}", n),
            OfferRepr::Text(s) => f.write_str(s),
        }
    }
}

impl From<&str> for OfferId {
    fn from(id: &str) -> Self {
        Self::text(id)
    }
}

impl From<u64> for OfferId {
    fn from(id: u64) -> Self {
        Self::number(id)
    }
}

/// Side color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Color {
    /// Moves first.
    White,
    /// Moves second.
    Black,
}

impl Color {
    /// The other side.
    pub const fn opposite(self) -> Self {
        match self {
            Self::White => Self::Black,
            Self::Black => Self::White,
        }
    }

    /// Lowercase wire name.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::White => "white",
            Self::Black => "black",
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
