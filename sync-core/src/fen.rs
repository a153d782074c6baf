//! Position notation (FEN) parsing.
//!
//! Builds a [`BoardState`] from a position string, deriving the masks from
//! the placement field and keeping the string itself as the cached
//! position. Used for fixtures and for display boards that start from a
//! known position; live positions always come from the authority through
//! the codec.

use thiserror::Error;

use crate::board::{Bitboards, BoardState, CastlingRights, Color, PieceKind, Square};

/// The standard initial position.
pub const STARTING_FEN: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

/// Errors from position-notation parsing.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FenError {
    /// Fewer than the four mandatory fields.
    #[error("expected at least 4 fields, found {found}")]
    FieldCount {
        /// Number of fields present.
        found: usize,
    },

    /// Piece placement field is invalid.
    #[error("invalid piece placement: {reason}")]
    Placement {
        /// What was wrong.
        reason: String,
    },

    /// Side-to-move field is not `w` or `b`.
    #[error("invalid side to move: {0:?}")]
    SideToMove(String),

    /// Castling field has an unexpected character.
    #[error("invalid castling field: {0:?}")]
    Castling(String),

    /// En-passant field is not `-` or a square.
    #[error("invalid en-passant field: {0:?}")]
    EnPassant(String),
}

impl BoardState {
    /// Parse a position string.
    ///
    /// The halfmove and fullmove counters are optional and not interpreted.
    pub fn from_fen(fen: &str) -> Result<Self, FenError> {
        let fen = fen.trim();
        let fields: Vec<&str> = fen.split_whitespace().collect();
        if fields.len() < 4 {
            return Err(FenError::FieldCount {
                found: fields.len(),
            });
        }

        let bitboards = parse_placement(fields[0])?;

        let active_color = match fields[1] {
            "w" => Color::White,
            "b" => Color::Black,
            other => return Err(FenError::SideToMove(other.to_string())),
        };

        let castling = parse_castling(fields[2])?;

        let en_passant = match fields[3] {
            "-" => None,
            text => Some(
                Square::parse(text).ok_or_else(|| FenError::EnPassant(text.to_string()))?,
            ),
        };

        Ok(Self {
            bitboards,
            fen: fen.to_string(),
            active_color,
            castling,
            en_passant,
        })
    }

    /// The standard initial position.
    pub fn starting_position() -> Self {
        // The constant is well-formed; a parse failure here is a bug in this module.
        match Self::from_fen(STARTING_FEN) {
            Ok(board) => board,
            Err(e) => unreachable!("starting position failed to parse: {}", e),
        }
    }
}

fn parse_placement(placement: &str) -> Result<Bitboards, FenError> {
    let ranks: Vec<&str> = placement.split('/').collect();
    if ranks.len() != 8 {
        return Err(FenError::Placement {
            reason: format!("expected 8 ranks, found {}", ranks.len()),
        });
    }

    let mut bitboards = Bitboards::default();
    for (i, rank) in ranks.iter().enumerate() {
        // First rank listed is rank 8.
        let row = 7 - i as u8;
        let mut col: u8 = 0;
        for c in rank.chars() {
            if let Some(skip) = c.to_digit(10) {
                if skip == 0 || skip > 8 {
                    return Err(FenError::Placement {
                        reason: format!("bad empty-square count {:?}", c),
                    });
                }
                col += skip as u8;
            } else {
                let piece = PieceKind::from_letter(c).ok_or_else(|| FenError::Placement {
                    reason: format!("unknown piece letter {:?}", c),
                })?;
                let square = Square::new(row, col).ok_or_else(|| FenError::Placement {
                    reason: format!("rank {} overflows", row + 1),
                })?;
                let mask = bitboards.get(piece.color, piece.kind) | square.mask();
                bitboards.set(piece.color, piece.kind, mask);
                col += 1;
            }
            if col > 8 {
                return Err(FenError::Placement {
                    reason: format!("rank {} overflows", row + 1),
                });
            }
        }
        if col != 8 {
            return Err(FenError::Placement {
                reason: format!("rank {} has {} squares", row + 1, col),
            });
        }
    }
    Ok(bitboards)
}

fn parse_castling(field: &str) -> Result<CastlingRights, FenError> {
    let mut rights = CastlingRights::NONE;
    if field == "-" {
        return Ok(rights);
    }
    for c in field.chars() {
        match c {
            'K' => rights.white_king_side = true,
            'Q' => rights.white_queen_side = true,
            'k' => rights.black_king_side = true,
            'q' => rights.black_queen_side = true,
            _ => return Err(FenError::Castling(field.to_string())),
        }
    }
    Ok(rights)
}
