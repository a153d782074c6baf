//! Board codec: wire payload to [`BoardState`] and back.
//!
//! The authority pushes positions as a JSON object carrying twelve occupancy
//! masks, the position string, side to move, castling rights and the
//! en-passant target. Decoding is lenient per field: a missing or unusable
//! field falls back to its default and never poisons the rest of the board.
//! Only a payload that is not an object at all is rejected.
//!
//! Masks are exact 64-bit patterns. Backends that store them as signed
//! 64-bit integers send bit 63 as a negative number, so signed values are
//! reinterpreted as their two's-complement pattern rather than rejected.

use serde_json::{json, Map, Value};
use thiserror::Error;
use tracing::warn;

use crate::board::{Bitboards, BoardState, CastlingRights, Color, PieceKind, Square};

/// Errors from [`decode`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    /// The payload is not a JSON object.
    #[error("board payload must be an object, found {found}")]
    MalformedState {
        /// JSON type that was found instead.
        found: &'static str,
    },
}

/// Wire key for each mask, in mask order.
const MASK_KEYS: [(Color, PieceKind, &str); 12] = [
    (Color::White, PieceKind::Pawn, "WhitePawns"),
    (Color::White, PieceKind::Rook, "WhiteRooks"),
    (Color::White, PieceKind::Knight, "WhiteKnights"),
    (Color::White, PieceKind::Bishop, "WhiteBishops"),
    (Color::White, PieceKind::Queen, "WhiteQueens"),
    (Color::White, PieceKind::King, "WhiteKing"),
    (Color::Black, PieceKind::Pawn, "BlackPawns"),
    (Color::Black, PieceKind::Rook, "BlackRooks"),
    (Color::Black, PieceKind::Knight, "BlackKnights"),
    (Color::Black, PieceKind::Bishop, "BlackBishops"),
    (Color::Black, PieceKind::Queen, "BlackQueens"),
    (Color::Black, PieceKind::King, "BlackKing"),
];

/// Decode a wire board payload.
///
/// Deterministic: the same payload always yields an equal [`BoardState`].
pub fn decode(wire: &Value) -> Result<BoardState, CodecError> {
    let obj = wire.as_object().ok_or(CodecError::MalformedState {
        found: json_type(wire),
    })?;

    let mut bitboards = Bitboards::default();
    let masks = obj.get("bitboards").and_then(Value::as_object);
    if let Some(masks) = masks {
        for (color, kind, key) in MASK_KEYS {
            if let Some(value) = masks.get(key) {
                bitboards.set(color, kind, parse_mask(key, value));
            }
        }
    } else if obj.get("bitboards").is_some_and(|v| !v.is_null()) {
        warn!("bitboards field is not an object, using empty board");
    }

    let fen = obj
        .get("currentFen")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    Ok(BoardState {
        bitboards,
        fen,
        active_color: parse_color(obj.get("activeColor")),
        castling: parse_castling(obj.get("castlingRights")),
        en_passant: parse_en_passant(obj.get("enPassantSquare")),
    })
}

/// Encode a board into the wire layout [`decode`] accepts.
pub fn encode(board: &BoardState) -> Value {
    let mut masks = Map::new();
    for (color, kind, key) in MASK_KEYS {
        masks.insert(key.to_string(), json!(board.mask(color, kind)));
    }

    let castling = board.castling();
    let en_passant = match board.en_passant() {
        Some(square) => json!({ "row": square.row(), "col": square.col() }),
        None => Value::Null,
    };

    json!({
        "currentFen": board.fen(),
        "bitboards": masks,
        "activeColor": board.active_color().as_str(),
        "castlingRights": {
            "whiteKingSide": castling.white_king_side,
            "whiteQueenSide": castling.white_queen_side,
            "blackKingSide": castling.black_king_side,
            "blackQueenSide": castling.black_queen_side,
        },
        "enPassantSquare": en_passant,
    })
}

fn parse_mask(key: &str, value: &Value) -> u64 {
    let parsed = match value {
        Value::Null => return 0,
        Value::Number(n) => n.as_u64().or_else(|| n.as_i64().map(|v| v as u64)),
        Value::String(s) => parse_mask_text(s.trim()),
        _ => None,
    };
    parsed.unwrap_or_else(|| {
        warn!(field = key, value = %value, "unreadable mask, treating as empty");
        0
    })
}

fn parse_mask_text(text: &str) -> Option<u64> {
    if let Some(hex) = text
        .strip_prefix("0x")
        .or_else(|| text.strip_prefix("0X"))
    {
        u64::from_str_radix(hex, 16).ok()
    } else if text.starts_with('-') {
        text.parse::<i64>().ok().map(|v| v as u64)
    } else {
        text.parse::<u64>().ok()
    }
}

fn parse_color(value: Option<&Value>) -> Color {
    match value.and_then(Value::as_str) {
        Some("black") | Some("b") => Color::Black,
        _ => Color::White,
    }
}

fn parse_castling(value: Option<&Value>) -> CastlingRights {
    let Some(obj) = value.and_then(Value::as_object) else {
        return CastlingRights::NONE;
    };
    let flag = |key: &str| obj.get(key).and_then(Value::as_bool).unwrap_or(false);
    CastlingRights {
        white_king_side: flag("whiteKingSide"),
        white_queen_side: flag("whiteQueenSide"),
        black_king_side: flag("blackKingSide"),
        black_queen_side: flag("blackQueenSide"),
    }
}

fn parse_en_passant(value: Option<&Value>) -> Option<Square> {
    let obj = value?.as_object()?;
    let coord = |key: &str| {
        obj.get(key)
            .and_then(Value::as_u64)
            .and_then(|v| u8::try_from(v).ok())
    };
    Square::new(coord("row")?, coord("col")?)
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
