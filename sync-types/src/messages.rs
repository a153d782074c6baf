//! Protocol messages for boardsync.
//!
//! Inbound frames are parsed in two steps: the `type` discriminant is read
//! from the raw JSON object first, then the body is deserialized into the
//! matching struct. This keeps three failure classes apart: a payload that
//! is not JSON, a recognized message missing a required field, and a
//! discriminant this client does not know (which is not an error).

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{Color, OfferId, RoomId, UserId, WireError};

/// Messages pushed by the game authority.
#[derive(Debug, Clone, PartialEq)]
pub enum InboundMessage {
    /// Full snapshot with roster and clocks (`gameState`).
    GameState(GameStateMessage),
    /// Incremental snapshot after a move (`gameUpdate`).
    GameUpdate(GameUpdateMessage),
    /// Application-level failure such as a rejected move (`error`).
    Error(ErrorNotice),
    /// Terminal result (`gameEnd`).
    GameEnd(GameEnd),
    /// The opponent offers a draw (`drawOffer`).
    DrawOffer(DrawOffer),
    /// A draw offer was declined (`drawDeclined`).
    DrawDeclined(DrawDeclined),
    /// A discriminant this client does not handle.
    Unknown(String),
}

impl InboundMessage {
    /// Parse one inbound text frame.
    pub fn parse(text: &str) -> Result<Self, WireError> {
        let value: Value = serde_json::from_str(text).map_err(WireError::MalformedJson)?;
        Self::from_value(value)
    }

    /// Route an already-parsed JSON value by its `type` discriminant.
    pub fn from_value(value: Value) -> Result<Self, WireError> {
        let kind = match &value {
            Value::Object(map) => match map.get("type") {
                Some(Value::String(kind)) => kind.clone(),
                Some(_) => return Err(WireError::InvalidType),
                None => return Err(WireError::MissingType),
            },
            _ => return Err(WireError::NotAnObject),
        };

        let message = match kind.as_str() {
            "gameState" => Self::GameState(decode_body(&kind, value)?),
            "gameUpdate" => Self::GameUpdate(decode_body(&kind, value)?),
            "error" => Self::Error(decode_body(&kind, value)?),
            "gameEnd" => Self::GameEnd(decode_body(&kind, value)?),
            "drawOffer" => Self::DrawOffer(decode_body(&kind, value)?),
            "drawDeclined" => Self::DrawDeclined(decode_body(&kind, value)?),
            _ => Self::Unknown(kind),
        };
        Ok(message)
    }

    /// The wire discriminant of this message.
    pub fn kind(&self) -> &str {
        match self {
            Self::GameState(_) => "gameState",
            Self::GameUpdate(_) => "gameUpdate",
            Self::Error(_) => "error",
            Self::GameEnd(_) => "gameEnd",
            Self::DrawOffer(_) => "drawOffer",
            Self::DrawDeclined(_) => "drawDeclined",
            Self::Unknown(kind) => kind,
        }
    }

    /// The room this message is addressed to, when it says so.
    pub fn room_id(&self) -> Option<&RoomId> {
        match self {
            Self::GameState(m) => m.room_id.as_ref(),
            Self::GameUpdate(m) => m.room_id.as_ref(),
            _ => None,
        }
    }
}

fn decode_body<T: DeserializeOwned>(kind: &str, value: Value) -> Result<T, WireError> {
    serde_json::from_value(value).map_err(|source| WireError::InvalidBody {
        kind: kind.to_string(),
        source,
    })
}

/// A player as described by the authority.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WirePlayer {
    /// User identifier.
    pub user_id: UserId,
    /// Display name.
    pub username: String,
    /// Assigned color.
    pub color: Color,
    /// Rating, when the authority knows one.
    #[serde(default)]
    pub rating: Option<u32>,
    /// Whether the player currently has a live connection.
    #[serde(default)]
    pub is_online: bool,
}

/// Remaining time per side, in seconds, as pushed by the authority.
///
/// These are raw wire values; they are converted to milliseconds exactly
/// once, when the session ingests them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireClocks {
    /// White's remaining time in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub white_time_left: Option<f64>,
    /// Black's remaining time in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub black_time_left: Option<f64>,
}

impl WireClocks {
    /// Both values, when both are present. A push carrying only one side is
    /// ignored rather than half-applied.
    pub fn both(&self) -> Option<(f64, f64)> {
        Some((self.white_time_left?, self.black_time_left?))
    }
}

/// One row of the move list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveHistoryEntry {
    /// Full-move number, starting at 1.
    pub move_number: u32,
    /// White's move text.
    pub white: String,
    /// Black's move text, absent until played.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub black: Option<String>,
}

/// Initial (or resync) snapshot.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameStateMessage {
    /// Room the snapshot belongs to.
    #[serde(default)]
    pub room_id: Option<RoomId>,
    /// Raw board payload, decoded by the board codec.
    pub game_state: Value,
    /// First player.
    pub player1: WirePlayer,
    /// Second player.
    pub player2: WirePlayer,
    /// Clocks in seconds.
    #[serde(flatten)]
    pub clocks: WireClocks,
    /// Optional ordering counter.
    #[serde(default)]
    pub seq: Option<u64>,
}

/// Incremental snapshot after a move.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameUpdateMessage {
    /// Room the update belongs to.
    #[serde(default)]
    pub room_id: Option<RoomId>,
    /// Raw board payload, decoded by the board codec.
    pub game_state: Value,
    /// Clocks in seconds.
    #[serde(flatten)]
    pub clocks: WireClocks,
    /// Complete move list, when sent.
    #[serde(default)]
    pub move_history: Option<Vec<MoveHistoryEntry>>,
    /// Optional ordering counter.
    #[serde(default)]
    pub seq: Option<u64>,
}

/// Application-level error notice.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ErrorNotice {
    /// Human-readable message.
    #[serde(default)]
    pub error: Option<String>,
}

impl ErrorNotice {
    /// The message to show, with a generic fallback.
    pub fn message(&self) -> &str {
        match self.error.as_deref() {
            Some(text) if !text.is_empty() => text,
            _ => "Unknown error",
        }
    }
}

/// Terminal game result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameEnd {
    /// Score notation: `1-0`, `0-1` or `1/2-1/2`.
    pub result: String,
    /// Why the game ended (`checkmate`, `resignation`, `timeout`, ...).
    pub reason: String,
}

impl GameEnd {
    /// The winning side, if the result names one.
    pub fn winner(&self) -> Option<Color> {
        match self.result.as_str() {
            "1-0" => Some(Color::White),
            "0-1" => Some(Color::Black),
            _ => None,
        }
    }

    /// True for a drawn result.
    pub fn is_draw(&self) -> bool {
        matches!(self.result.as_str(), "1/2-1/2" | "½-½")
    }
}

/// A draw offer notification.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DrawOffer {
    /// Offer identifier, echoed back on accept/decline.
    pub offer_id: OfferId,
    /// Player who made the offer.
    pub player_id: UserId,
}

/// Informational: a draw offer was declined.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DrawDeclined {
    /// The declined offer, if the authority says which.
    #[serde(default)]
    pub offer_id: Option<OfferId>,
}

/// Requests sent by the client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum OutboundMessage {
    /// Join handshake (`joinRoom`).
    JoinRoom(JoinRoom),
    /// Move request (`move`).
    Move(MoveRequest),
    /// Resign or draw sub-protocol (`gameAction`).
    GameAction(GameAction),
}

impl OutboundMessage {
    /// Serialize to a JSON text frame.
    pub fn to_json(&self) -> Result<String, WireError> {
        serde_json::to_string(self).map_err(WireError::Serialization)
    }

    /// Parse a JSON text frame (used by tests and tooling).
    pub fn from_json(text: &str) -> Result<Self, WireError> {
        serde_json::from_str(text).map_err(WireError::MalformedJson)
    }
}

/// Join handshake.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinRoom {
    /// Room to join.
    pub room_id: RoomId,
    /// Local user.
    pub user_id: UserId,
    /// Local display name.
    pub username: String,
}

/// Piece chosen for a pawn promotion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Promotion {
    /// Queen.
    #[serde(rename = "q")]
    Queen,
    /// Rook.
    #[serde(rename = "r")]
    Rook,
    /// Bishop.
    #[serde(rename = "b")]
    Bishop,
    /// Knight.
    #[serde(rename = "n")]
    Knight,
}

impl Promotion {
    /// Parse a promotion letter (`q`, `r`, `b`, `n`, either case).
    pub fn from_letter(letter: char) -> Option<Self> {
        match letter.to_ascii_lowercase() {
            'q' => Some(Self::Queen),
            'r' => Some(Self::Rook),
            'b' => Some(Self::Bishop),
            'n' => Some(Self::Knight),
            _ => None,
        }
    }
}

/// Move request. Coordinates are board rows and columns, 0..=7, row 0
/// being rank 1 and column 0 file a.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveRequest {
    /// Origin row.
    pub from_row: u8,
    /// Origin column.
    pub from_col: u8,
    /// Destination row.
    pub to_row: u8,
    /// Destination column.
    pub to_col: u8,
    /// Promotion piece, only for pawn promotions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub promotion: Option<Promotion>,
}

/// Resignation and draw sub-protocol actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum GameActionKind {
    /// Resign the game.
    Resign,
    /// Offer a draw.
    DrawOffer,
    /// Accept the pending draw offer.
    DrawAccept,
    /// Decline the pending draw offer.
    DrawDecline,
}

/// A `gameAction` request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameAction {
    /// Which action.
    pub action: GameActionKind,
    /// The offer being answered, for accept/decline.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offer_id: Option<OfferId>,
}
