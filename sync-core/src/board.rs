//! Canonical board state.
//!
//! A [`BoardState`] is immutable once built. Only the board codec
//! ([`crate::codec::decode`]) and the position-notation parser
//! ([`BoardState::from_fen`]) construct one, and both produce the masks and
//! the cached position string from the same input in one pass.
//!
//! Squares are indexed `row * 8 + col`, row 0 being rank 1 and column 0
//! file a, so a1 is bit 0 and h8 is bit 63.

use std::fmt;

pub use boardsync_types::Color;

/// Piece kinds, in the order the authority lists their masks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PieceKind {
    /// Pawn.
    Pawn,
    /// Rook.
    Rook,
    /// Knight.
    Knight,
    /// Bishop.
    Bishop,
    /// Queen.
    Queen,
    /// King.
    King,
}

impl PieceKind {
    /// All kinds, in mask order.
    pub const ALL: [PieceKind; 6] = [
        PieceKind::Pawn,
        PieceKind::Rook,
        PieceKind::Knight,
        PieceKind::Bishop,
        PieceKind::Queen,
        PieceKind::King,
    ];

    const fn index(self) -> usize {
        match self {
            Self::Pawn => 0,
            Self::Rook => 1,
            Self::Knight => 2,
            Self::Bishop => 3,
            Self::Queen => 4,
            Self::King => 5,
        }
    }

    /// Position-notation letter for this kind (uppercase for white).
    pub const fn letter(self, color: Color) -> char {
        let lower = match self {
            Self::Pawn => 'p',
            Self::Rook => 'r',
            Self::Knight => 'n',
            Self::Bishop => 'b',
            Self::Queen => 'q',
            Self::King => 'k',
        };
        match color {
            Color::White => lower.to_ascii_uppercase(),
            Color::Black => lower,
        }
    }

    /// Parse a position-notation letter into a colored piece.
    pub fn from_letter(letter: char) -> Option<Piece> {
        let color = if letter.is_ascii_uppercase() {
            Color::White
        } else {
            Color::Black
        };
        let kind = match letter.to_ascii_lowercase() {
            'p' => Self::Pawn,
            'r' => Self::Rook,
            'n' => Self::Knight,
            'b' => Self::Bishop,
            'q' => Self::Queen,
            'k' => Self::King,
            _ => return None,
        };
        Some(Piece { color, kind })
    }
}

/// A colored piece.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Piece {
    /// Owner.
    pub color: Color,
    /// Kind.
    pub kind: PieceKind,
}

impl Piece {
    /// Position-notation letter.
    pub const fn letter(&self) -> char {
        self.kind.letter(self.color)
    }
}

/// A board square.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Square {
    row: u8,
    col: u8,
}

impl Square {
    /// Create a square, or `None` when off the board.
    pub const fn new(row: u8, col: u8) -> Option<Self> {
        if row < 8 && col < 8 {
            Some(Self { row, col })
        } else {
            None
        }
    }

    /// Parse algebraic coordinates such as `e4`.
    pub fn parse(text: &str) -> Option<Self> {
        let mut chars = text.chars();
        let file = chars.next()?;
        let rank = chars.next()?;
        if chars.next().is_some() || !file.is_ascii() || !rank.is_ascii() {
            return None;
        }
        let col = (file.to_ascii_lowercase() as u8).checked_sub(b'a')?;
        let row = (rank as u8).checked_sub(b'1')?;
        Self::new(row, col)
    }

    /// Row, 0 = rank 1.
    pub const fn row(&self) -> u8 {
        self.row
    }

    /// Column, 0 = file a.
    pub const fn col(&self) -> u8 {
        self.col
    }

    /// Bit index into an occupancy mask.
    pub const fn index(&self) -> u32 {
        self.row as u32 * 8 + self.col as u32
    }

    /// Single-bit mask for this square.
    pub const fn mask(&self) -> u64 {
        1u64 << self.index()
    }
}

impl fmt::Display for Square {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", (b'a' + self.col) as char, self.row + 1)
    }
}

/// Twelve occupancy masks, one per piece kind per color.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Bitboards {
    masks: [u64; 12],
}

impl Bitboards {
    const fn slot(color: Color, kind: PieceKind) -> usize {
        let base = match color {
            Color::White => 0,
            Color::Black => 6,
        };
        base + kind.index()
    }

    /// Mask for one piece kind of one color.
    pub const fn get(&self, color: Color, kind: PieceKind) -> u64 {
        self.masks[Self::slot(color, kind)]
    }

    pub(crate) fn set(&mut self, color: Color, kind: PieceKind, mask: u64) {
        self.masks[Self::slot(color, kind)] = mask;
    }

    /// Union of all masks of one color.
    pub fn color_occupancy(&self, color: Color) -> u64 {
        PieceKind::ALL
            .iter()
            .fold(0, |acc, &kind| acc | self.get(color, kind))
    }

    /// Union of all twelve masks.
    pub fn occupancy(&self) -> u64 {
        self.color_occupancy(Color::White) | self.color_occupancy(Color::Black)
    }

    /// The piece on a square, if any. When corrupt input puts two pieces on
    /// one square, the first in mask order wins.
    pub fn piece_at(&self, square: Square) -> Option<Piece> {
        let bit = square.mask();
        [Color::White, Color::Black].into_iter().find_map(|color| {
            PieceKind::ALL
                .into_iter()
                .find(|&kind| self.get(color, kind) & bit != 0)
                .map(|kind| Piece { color, kind })
        })
    }
}

/// The four independent castling rights.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct CastlingRights {
    /// White may castle king side.
    pub white_king_side: bool,
    /// White may castle queen side.
    pub white_queen_side: bool,
    /// Black may castle king side.
    pub black_king_side: bool,
    /// Black may castle queen side.
    pub black_queen_side: bool,
}

impl CastlingRights {
    /// All four rights.
    pub const ALL: Self = Self {
        white_king_side: true,
        white_queen_side: true,
        black_king_side: true,
        black_queen_side: true,
    };

    /// No rights.
    pub const NONE: Self = Self {
        white_king_side: false,
        white_queen_side: false,
        black_king_side: false,
        black_queen_side: false,
    };
}

/// Canonical decoded position.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BoardState {
    pub(crate) bitboards: Bitboards,
    pub(crate) fen: String,
    pub(crate) active_color: Color,
    pub(crate) castling: CastlingRights,
    pub(crate) en_passant: Option<Square>,
}

impl BoardState {
    /// The twelve occupancy masks.
    pub fn bitboards(&self) -> &Bitboards {
        &self.bitboards
    }

    /// Mask for one piece kind of one color.
    pub fn mask(&self, color: Color, kind: PieceKind) -> u64 {
        self.bitboards.get(color, kind)
    }

    /// Cached position string, as sent by the authority.
    pub fn fen(&self) -> &str {
        &self.fen
    }

    /// Side to move.
    pub fn active_color(&self) -> Color {
        self.active_color
    }

    /// Castling rights.
    pub fn castling(&self) -> CastlingRights {
        self.castling
    }

    /// En-passant target square.
    pub fn en_passant(&self) -> Option<Square> {
        self.en_passant
    }

    /// The piece on a square, if any.
    pub fn piece_at(&self, square: Square) -> Option<Piece> {
        self.bitboards.piece_at(square)
    }
}
